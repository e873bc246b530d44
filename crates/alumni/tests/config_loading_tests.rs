//! Table-driven tests for configuration loading and validation.

mod common;

use alumni::config::load_config_from_str;
use alumni::config::schema::Environment;
use alumni::load_config;
use common::TestHarness;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object_uses_defaults",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "host": "127.0.0.1",
            "port": 8080,
            "databasePath": "/var/lib/alumni/alumni.db",
            "uploadsDir": "/var/lib/alumni/uploads",
            "environment": "production",
            "corsOrigins": ["https://admin.example.com"],
            "publicBaseUrl": "https://api.example.com/",
            "tokenTtlHours": 12,
            "jwtSecret": "s3cret",
            "bootstrapAdmin": { "email": "root@example.com", "password": "longenough" },
            "dashboardYears": { "start": 2015, "end": 2024 }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "production_without_secret",
        config_json: r#"{ "environment": "production" }"#,
        should_succeed: false,
        expected_error: Some("JWT secret is required in production"),
    },
    ConfigTestCase {
        name: "zero_port",
        config_json: r#"{ "port": 0 }"#,
        should_succeed: false,
        expected_error: Some("port must be greater than 0"),
    },
    ConfigTestCase {
        name: "zero_token_ttl",
        config_json: r#"{ "tokenTtlHours": 0 }"#,
        should_succeed: false,
        expected_error: Some("tokenTtlHours must be greater than 0"),
    },
    ConfigTestCase {
        name: "reversed_dashboard_years",
        config_json: r#"{ "dashboardYears": { "start": 2025, "end": 2020 } }"#,
        should_succeed: false,
        expected_error: Some("dashboardYears.start (2025) is after dashboardYears.end (2020)"),
    },
    ConfigTestCase {
        name: "short_bootstrap_password",
        config_json: r#"{ "bootstrapAdmin": { "password": "123" } }"#,
        should_succeed: false,
        expected_error: Some("bootstrapAdmin.password is too short"),
    },
    ConfigTestCase {
        name: "unknown_environment",
        config_json: r#"{ "environment": "staging" }"#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "port": "#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
];

#[test]
fn config_loading_table() {
    for case in CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);
        match (case.should_succeed, result) {
            (true, Ok(_)) => {}
            (true, Err(e)) => panic!("[{}] expected success, got: {}", case.name, e),
            (false, Ok(_)) => panic!("[{}] expected failure", case.name),
            (false, Err(e)) => {
                if let Some(expected) = case.expected_error {
                    assert!(
                        e.to_string().contains(expected),
                        "[{}] error '{}' does not contain '{}'",
                        case.name,
                        e,
                        expected
                    );
                }
            }
        }
    }
}

#[test]
fn config_file_values_are_applied() {
    let harness = TestHarness::new();
    let path = harness.write_file(
        "alumni.json",
        r#"{
            "port": 9100,
            "environment": "production",
            "jwtSecret": "from-file",
            "corsOrigins": ["https://admin.example.com"],
            "dashboardYears": { "start": 2018, "end": 2022 }
        }"#,
    );

    let config = load_config(&path).unwrap();

    assert_eq!(config.port, 9100);
    assert_eq!(config.environment, Environment::Production);
    assert!(!config.allows_any_origin());
    assert_eq!(config.dashboard_years.start, 2018);
    assert_eq!(config.resolved_public_base_url(), "http://localhost:9100");
}

#[test]
fn missing_config_file_names_the_path() {
    let harness = TestHarness::new();
    let path = harness.path().join("missing.json");

    let err = load_config(&path).unwrap_err();

    assert!(err.to_string().contains("missing.json"));
}
