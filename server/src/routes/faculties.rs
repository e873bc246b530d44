use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use alumni::services::faculties::{self, FacultyPayload};

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
    let faculties = blocking(&state, |s| faculties::list(&s.db)).await?;
    Ok(data(faculties))
}

async fn show(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let faculty = blocking(&state, move |s| faculties::get(&s.db, &id)).await?;
    Ok(data(faculty))
}

async fn create(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    JsonBody(payload): JsonBody<FacultyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let faculty = blocking(&state, move |s| faculties::create(&s.db, &payload)).await?;
    Ok(created(faculty))
}

async fn update(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<FacultyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let faculty = blocking(&state, move |s| faculties::update(&s.db, &id, &payload)).await?;
    Ok(data(faculty))
}

async fn remove(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| faculties::delete(&s.db, &id)).await?;
    Ok(message("Faculty deleted"))
}
