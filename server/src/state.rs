//! Shared application state handed to every handler.

use std::sync::Arc;

use alumni::analytics::DashboardRange;
use alumni::config::ServerConfig;
use alumni::storage::PhotoStore;
use alumni::{Database, TokenSigner};
use secrecy::SecretString;
use tracing::warn;

use crate::error::ApiError;

pub struct AppState {
    pub db: Database,
    pub signer: TokenSigner,
    pub photos: PhotoStore,
    pub config: ServerConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Builds the state from a validated config and an opened database.
    ///
    /// Without a configured token secret a random one is generated, so
    /// tokens do not survive a restart. Config validation already refuses
    /// that in production.
    pub fn new(config: ServerConfig, db: Database) -> alumni::Result<SharedState> {
        let source = config.jwt_secret_source();
        let secret = if source.is_configured() {
            source.resolve()?
        } else {
            warn!("No token secret configured, generating an ephemeral one");
            SecretString::from(uuid::Uuid::new_v4().simple().to_string())
        };

        let photos = PhotoStore::new(&config.uploads_dir, &config.resolved_public_base_url());
        photos.ensure_directories()?;

        Ok(Arc::new(Self {
            db,
            signer: TokenSigner::new(secret, config.token_ttl_hours),
            photos,
            config,
        }))
    }

    pub fn dashboard_defaults(&self) -> DashboardRange {
        DashboardRange {
            start_year: self.config.dashboard_years.start,
            end_year: self.config.dashboard_years.end,
        }
    }

    pub fn is_development(&self) -> bool {
        self.config.environment.is_development()
    }
}

/// Runs a store operation on the blocking pool.
pub async fn blocking<F, T>(state: &SharedState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> alumni::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    Ok(tokio::task::spawn_blocking(move || op(&state)).await??)
}
