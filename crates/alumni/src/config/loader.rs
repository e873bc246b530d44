use std::path::{Path, PathBuf};

use crate::config::schema::{Environment, ServerConfig};
use crate::error::ConfigError;

/// Names the JSON config file to load.
pub const CONFIG_ENV_VAR: &str = "ALUMNI_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads the file named by `ALUMNI_CONFIG` (defaults when unset), applies
/// environment overrides and validates the result.
pub fn load_from_env() -> Result<ServerConfig, ConfigError> {
    let mut config = match env_value(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
                path: path.clone(),
                source: e,
            })?;
            serde_json::from_str(&content)?
        }
        None => ServerConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn apply_env_overrides(config: &mut ServerConfig) -> Result<(), ConfigError> {
    if let Some(port) = env_value("PORT") {
        config.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
            name: "PORT".to_string(),
            value: port.clone(),
        })?;
    }
    if let Some(host) = env_value("HOST") {
        config.host = host;
    }
    if let Some(path) = env_value("DATABASE_PATH") {
        config.database_path = Some(PathBuf::from(path));
    }
    if let Some(dir) = env_value("UPLOADS_DIR") {
        config.uploads_dir = PathBuf::from(dir);
    }
    for name in ["ALUMNI_ENV", "NODE_ENV"] {
        if let Some(value) = env_value(name) {
            config.environment =
                Environment::parse(&value).ok_or_else(|| ConfigError::InvalidEnv {
                    name: name.to_string(),
                    value: value.clone(),
                })?;
            break;
        }
    }
    if let Some(origins) = env_value("CORS_ORIGIN") {
        config.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(url) = env_value("PUBLIC_BASE_URL") {
        config.public_base_url = Some(url);
    }
    if let Some(secret) = env_value("JWT_SECRET") {
        config.jwt_secret = Some(secret);
    }
    Ok(())
}

pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(ConfigError::Validation {
            message: "port must be greater than 0".to_string(),
        });
    }

    if config.token_ttl_hours == 0 {
        return Err(ConfigError::Validation {
            message: "tokenTtlHours must be greater than 0".to_string(),
        });
    }

    if config.dashboard_years.start > config.dashboard_years.end {
        return Err(ConfigError::Validation {
            message: format!(
                "dashboardYears.start ({}) is after dashboardYears.end ({})",
                config.dashboard_years.start, config.dashboard_years.end
            ),
        });
    }

    if config.environment == Environment::Production && !config.jwt_secret_source().is_configured()
    {
        return Err(ConfigError::Validation {
            message: "a JWT secret is required in production".to_string(),
        });
    }

    if config.bootstrap_admin.password.chars().count() < crate::services::validate::PASSWORD_MIN {
        return Err(ConfigError::Validation {
            message: "bootstrapAdmin.password is too short".to_string(),
        });
    }

    Ok(())
}
