//! HTTP routes, organized by domain:
//! - `auth`: login and the current admin
//! - `admin`: profile and password
//! - `faculties`, `departments`, `classes`, `batches`, `jobs`: reference data
//! - `students`: student records, bulk delete and import
//! - `analytics`: dashboard and hub
//! - `reports`: student exports
//! - `settings`: backup

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod batches;
pub mod classes;
pub mod departments;
pub mod faculties;
pub mod jobs;
pub mod reports;
pub mod settings;
pub mod students;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::SharedState;

/// `{data: ...}` response body.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub fn data<T: Serialize>(data: T) -> Json<Data<T>> {
    Json(Data { data })
}

pub fn created<T: Serialize>(value: T) -> (StatusCode, Json<Data<T>>) {
    (StatusCode::CREATED, data(value))
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

pub fn message(text: impl Into<String>) -> Json<Message> {
    Json(Message {
        message: text.into(),
    })
}

/// A file download, buffered or streamed.
pub fn attachment(body: impl Into<Body>, content_type: &str, filename: &str) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    let mut response = Response::new(body.into());
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    response
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

/// Every `/api` route. Handlers that need a signed-in admin take
/// [`CurrentAdmin`](crate::extract::CurrentAdmin).
pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/faculties", faculties::router())
        .nest("/departments", departments::router())
        .nest("/classes", classes::router())
        .nest("/batches", batches::router())
        .nest("/jobs", jobs::router())
        .nest("/students", students::router())
        .nest("/analytics", analytics::router())
        .nest("/reports", reports::router())
        .nest("/settings", settings::router())
}
