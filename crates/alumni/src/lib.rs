pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod import;
pub mod model;
pub mod report;
pub mod sanitize;
pub mod secrets;
pub mod services;
pub mod storage;
pub mod xlsx;

pub use auth::{AuthError, TokenSigner};
pub use config::{load_config, load_from_env, ServerConfig};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, ErrorKind, ReportError, Result, ServiceError, StorageError};
pub use filter::{QueryParams, StudentQuery};
pub use secrets::{resolve_secret, SecretError};
