use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;

use alumni::import::{self, ImportFile, ImportTarget, TEMPLATE_FILENAME};
use alumni::services::students::{self, Pagination, StudentPayload};
use alumni::{xlsx, StudentQuery};

use super::{attachment, created, data, message};
use crate::error::ApiError;
use crate::extract::{CurrentAdmin, FormInput, Params};
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create).delete(delete_by_filter))
        .route("/filters", get(filters))
        .route("/import-template", get(import_template))
        .route("/import", post(import_students))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/restore", patch(restore))
}

async fn list(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Params(params): Params,
) -> Result<impl IntoResponse, ApiError> {
    let query = StudentQuery::from_params(&params);
    let (page, limit) = Pagination::request(params.get("page"), params.get("limit"));
    let page = blocking(&state, move |s| students::list(&s.db, &query, page, limit)).await?;
    Ok(Json(page))
}

async fn show(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = blocking(&state, move |s| students::get(&s.db, &id)).await?;
    Ok(Json(detail))
}

async fn create(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    mut form: FormInput,
) -> Result<impl IntoResponse, ApiError> {
    let payload: StudentPayload = form.payload()?;
    let photo = form.take_file("photo");
    let student = blocking(&state, move |s| {
        s.photos.with_student_photo(photo.as_ref(), |photo_url| {
            students::create(&s.db, &payload, photo_url)
        })
    })
    .await?;
    Ok(created(student))
}

async fn update(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
    mut form: FormInput,
) -> Result<impl IntoResponse, ApiError> {
    let payload: StudentPayload = form.payload()?;
    let photo = form.take_file("photo");
    let student = blocking(&state, move |s| {
        s.photos.with_student_photo(photo.as_ref(), |photo_url| {
            students::update(&s.db, &id, &payload, photo_url)
        })
    })
    .await?;
    Ok(data(student))
}

/// `?force=true` removes the record for good.
async fn remove(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
    Params(params): Params,
) -> Result<impl IntoResponse, ApiError> {
    let force = params.bool("force", false);
    blocking(&state, move |s| students::delete(&s.db, &id, force)).await?;
    Ok(message(if force {
        "Student deleted permanently"
    } else {
        "Student deleted"
    }))
}

async fn restore(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let student = blocking(&state, move |s| students::restore(&s.db, &id)).await?;
    Ok(Json(json!({ "message": "Student restored", "data": student })))
}

/// Deletes the students under the faculty, department and class criteria
/// in the query string.
async fn delete_by_filter(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Params(params): Params,
) -> Result<impl IntoResponse, ApiError> {
    let query = StudentQuery::from_params(&params);
    let force = params.bool("force", false);
    let outcome = blocking(&state, move |s| students::delete_by_filter(&s.db, &query, force)).await?;
    Ok(Json(outcome))
}

async fn filters(State(state): State<SharedState>, _: CurrentAdmin) -> Result<impl IntoResponse, ApiError> {
    let filters = blocking(&state, |s| students::filters(&s.db)).await?;
    Ok(data(filters))
}

async fn import_template(_: CurrentAdmin) -> Result<Response, ApiError> {
    let bytes = import::import_template().map_err(alumni::ServiceError::from)?;
    Ok(attachment(bytes, xlsx::CONTENT_TYPE, TEMPLATE_FILENAME))
}

/// Multipart upload: `file` plus `facultyId`, `departmentId`, `classId`
/// and `batchId`.
async fn import_students(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    mut form: FormInput,
) -> Result<impl IntoResponse, ApiError> {
    let target = ImportTarget {
        faculty_id: form.text("facultyId"),
        department_id: form.text("departmentId"),
        class_id: form.text("classId"),
        batch_id: form.text("batchId"),
    };
    let upload = form.take_file("file");
    let report = blocking(&state, move |s| {
        let file = upload.as_ref().map(|u| ImportFile {
            file_name: &u.file_name,
            bytes: &u.bytes,
        });
        import::import_students(&s.db, &target, file)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": report.message(),
            "summary": report.summary,
            "skippedRows": report.skipped_rows,
        })),
    ))
}
