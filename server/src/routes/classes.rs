use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use alumni::db::class_repo::ClassFilter;
use alumni::services::classes::{self, ClassPayload};

use super::{created, data, message};
use crate::error::ApiError;
use crate::extract::{CurrentAdmin, JsonBody, Params};
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
}

async fn list(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Params(params): Params,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ClassFilter {
        department_id: params.get("departmentId").map(str::to_string),
        faculty_id: params.get("facultyId").map(str::to_string),
    };
    let classes = blocking(&state, move |s| classes::list(&s.db, &filter)).await?;
    Ok(data(classes))
}

async fn show(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let class = blocking(&state, move |s| classes::get(&s.db, &id)).await?;
    Ok(data(class))
}

async fn create(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    JsonBody(payload): JsonBody<ClassPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let class = blocking(&state, move |s| classes::create(&s.db, &payload)).await?;
    Ok(created(class))
}

async fn update(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ClassPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let class = blocking(&state, move |s| classes::update(&s.db, &id, &payload)).await?;
    Ok(data(class))
}

async fn remove(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| classes::delete(&s.db, &id)).await?;
    Ok(message("Class deleted"))
}
