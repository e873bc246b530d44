use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use alumni::services::jobs::{self, JobPayload};

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
    let jobs = blocking(&state, |s| jobs::list(&s.db)).await?;
    Ok(data(jobs))
}

async fn show(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = blocking(&state, move |s| jobs::get(&s.db, &id)).await?;
    Ok(data(job))
}

async fn create(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    JsonBody(payload): JsonBody<JobPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let job = blocking(&state, move |s| jobs::create(&s.db, &payload)).await?;
    Ok(created(job))
}

async fn update(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<JobPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let job = blocking(&state, move |s| jobs::update(&s.db, &id, &payload)).await?;
    Ok(data(job))
}

async fn remove(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| jobs::delete(&s.db, &id)).await?;
    Ok(message("Job deleted"))
}
