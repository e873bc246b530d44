use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secrets::SecretSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default)]
    pub environment: Environment,
    /// Allowed CORS origins. Empty or `*` allows any.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Origin used in stored photo URLs. Defaults to `http://{host}:{port}`.
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub jwt_secret_file: Option<String>,
    #[serde(default)]
    pub jwt_secret_env_var: Option<String>,
    #[serde(default)]
    pub bootstrap_admin: BootstrapAdmin,
    #[serde(default)]
    pub dashboard_years: DashboardYears,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7100
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_token_ttl_hours() -> u32 {
    168
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            uploads_dir: default_uploads_dir(),
            environment: Environment::default(),
            cors_origins: Vec::new(),
            public_base_url: None,
            token_ttl_hours: default_token_ttl_hours(),
            jwt_secret: None,
            jwt_secret_file: None,
            jwt_secret_env_var: None,
            bootstrap_admin: BootstrapAdmin::default(),
            dashboard_years: DashboardYears::default(),
        }
    }
}

impl ServerConfig {
    pub fn jwt_secret_source(&self) -> SecretSource {
        SecretSource {
            value: self.jwt_secret.clone(),
            file: self.jwt_secret_file.clone(),
            env_var: self.jwt_secret_env_var.clone(),
        }
    }

    /// The configured database path, or `~/.alumni/data/alumni.db`.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }

    pub fn resolved_public_base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => {
                let host = if self.host == "0.0.0.0" { "localhost" } else { &self.host };
                format!("http://{}:{}", host, self.port)
            }
        }
    }

    /// `true` when every origin may call the API.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

/// The admin account created on first start when none exists.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapAdmin {
    #[serde(default = "default_admin_name")]
    pub name: String,
    #[serde(default = "default_admin_email")]
    pub email: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
}

fn default_admin_name() -> String {
    "System Admin".to_string()
}

fn default_admin_email() -> String {
    "admin@alumni.local".to_string()
}

fn default_admin_password() -> String {
    "Admin@123".to_string()
}

impl Default for BootstrapAdmin {
    fn default() -> Self {
        Self {
            name: default_admin_name(),
            email: default_admin_email(),
            password: default_admin_password(),
        }
    }
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("name", &self.name)
            .field("email", &crate::sanitize::redact_email(&self.email))
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Year range the dashboard covers when a request does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardYears {
    #[serde(default = "default_start_year")]
    pub start: i32,
    #[serde(default = "default_end_year")]
    pub end: i32,
}

fn default_start_year() -> i32 {
    2020
}

fn default_end_year() -> i32 {
    2025
}

impl Default for DashboardYears {
    fn default() -> Self {
        Self {
            start: default_start_year(),
            end: default_end_year(),
        }
    }
}
