use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use alumni::services::admins;
use alumni::Database;
use alumni_server::AppState;

const DEFAULT_LOG_FILTER: &str = "info,alumni=info,alumni_server=info";
const LOG_FORMAT_ENV: &str = "ALUMNI_LOG_FORMAT";

/// `RUST_LOG` picks the filter; `ALUMNI_LOG_FORMAT=json` switches to JSON
/// lines. Records from the `log` facade are forwarded too.
fn init_logging() {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {e}");
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"));
    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Failed to install tracing subscriber: {e}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = alumni::load_from_env()?;
    info!(
        environment = ?config.environment,
        port = config.port,
        "Starting alumni-server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let path = config
        .resolved_database_path()
        .ok_or("Could not determine a database path; set DATABASE_PATH")?;
    let db = Database::open(&path)?;

    if let Some(admin) = admins::ensure_bootstrap_admin(&db, &config.bootstrap_admin)? {
        info!(id = %admin.id, "Created bootstrap admin");
    }

    let state = AppState::new(config, db)?;
    alumni_server::serve(state).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
