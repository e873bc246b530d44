use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use alumni::services::backup;

use super::attachment;
use crate::error::ApiError;
use crate::extract::CurrentAdmin;
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new().route("/backup", get(download_backup))
}

async fn download_backup(State(state): State<SharedState>, _: CurrentAdmin) -> Result<Response, ApiError> {
    let file = blocking(&state, |s| backup::backup_file(&s.db, Utc::now())).await?;
    Ok(attachment(file.bytes, "application/json; charset=utf-8", &file.filename))
}
