use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use alumni::services::batches::{self, BatchPayload};

use super::{created, data, message};
use crate::error::ApiError;
use crate::extract::{CurrentAdmin, JsonBody};
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
}

async fn list(State(state): State<SharedState>, _: CurrentAdmin) -> Result<impl IntoResponse, ApiError> {
    let batches = blocking(&state, |s| batches::list(&s.db)).await?;
    Ok(data(batches))
}

async fn show(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = blocking(&state, move |s| batches::get(&s.db, &id)).await?;
    Ok(data(batch))
}

async fn create(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    JsonBody(payload): JsonBody<BatchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = blocking(&state, move |s| batches::create(&s.db, &payload)).await?;
    Ok(created(batch))
}

async fn update(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<BatchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = blocking(&state, move |s| batches::update(&s.db, &id, &payload)).await?;
    Ok(data(batch))
}

async fn remove(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| batches::delete(&s.db, &id)).await?;
    Ok(message("Batch deleted"))
}
