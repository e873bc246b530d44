pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_from_env, CONFIG_ENV_VAR};
pub use schema::{BootstrapAdmin, DashboardYears, Environment, ServerConfig};
