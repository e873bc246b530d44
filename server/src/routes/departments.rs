use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use alumni::services::departments::{self, DepartmentPayload};

use super::{created, data, message};
use crate::error::ApiError;
use crate::extract::{CurrentAdmin, JsonBody, Params};
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
}

/// `?facultyId=` narrows the list to one faculty.
async fn list(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Params(params): Params,
) -> Result<impl IntoResponse, ApiError> {
    let faculty_id = params.get("facultyId").map(str::to_string);
    let departments =
        blocking(&state, move |s| departments::list(&s.db, faculty_id.as_deref())).await?;
    Ok(data(departments))
}

async fn show(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let department = blocking(&state, move |s| departments::get(&s.db, &id)).await?;
    Ok(data(department))
}

async fn create(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    JsonBody(payload): JsonBody<DepartmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let department = blocking(&state, move |s| departments::create(&s.db, &payload)).await?;
    Ok(created(department))
}

async fn update(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<DepartmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let department = blocking(&state, move |s| departments::update(&s.db, &id, &payload)).await?;
    Ok(data(department))
}

async fn remove(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| departments::delete(&s.db, &id)).await?;
    Ok(message("Department deleted"))
}
