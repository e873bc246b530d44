//! HTTP API for the alumni records store.
//!
//! Everything lives under `/api` and, apart from `/api/health` and
//! `/api/auth/login`, requires `Authorization: Bearer <token>`. Stored
//! student photos are served from `/uploads`.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use alumni::config::ServerConfig;

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod stream;

pub use error::ApiError;
pub use state::{AppState, SharedState};

/// Largest request body accepted: a 10 MB import plus form overhead.
pub const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

pub fn build_router(state: SharedState) -> Router {
    let uploads = ServeDir::new(state.photos.root());
    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api", routes::api_router())
        .nest_service("/uploads", uploads)
        .fallback(routes::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::expose_error_detail,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Lower-cased `scheme://host[:port]` with trailing slashes dropped.
fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// `http(s)://localhost` or `http(s)://127.0.0.1`, any port.
fn is_local_origin(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    let (host, port) = match rest.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (rest, None),
    };
    matches!(host, "localhost" | "127.0.0.1")
        && port.map_or(true, |p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .expose_headers([CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(60 * 60));

    if config.allows_any_origin() {
        return layer.allow_origin(Any).allow_headers(Any);
    }

    let allowed: Vec<String> = config.cors_origins.iter().map(|o| normalize_origin(o)).collect();
    let development = config.environment.is_development();
    layer
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _| {
                let origin = origin.to_str().map(normalize_origin).unwrap_or_default();
                allowed.contains(&origin) || (development && is_local_origin(&origin))
            },
        ))
}

/// Binds the configured address and serves until SIGINT or SIGTERM.
pub async fn serve(state: SharedState) -> std::io::Result<()> {
    let address = format!("{}:{}", state.config.host, state.config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
