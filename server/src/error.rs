//! Maps service errors onto HTTP responses.

use alumni::error::{ErrorKind, FieldError};
use alumni::ServiceError;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::state::SharedState;

/// The error chain behind a 500 response. Travels as a response extension
/// and only reaches the body through [`expose_error_detail`].
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request body or query string could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    #[error("Not Found - {0}")]
    RouteNotFound(String),

    #[error("Request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "no_errors")]
    errors: &'a [FieldError],
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn no_errors(errors: &&[FieldError]) -> bool {
    errors.is_empty()
}

impl ErrorBody<'_> {
    fn message(message: &str) -> ErrorBody<'_> {
        ErrorBody {
            message,
            errors: &[],
            detail: None,
        }
    }
}

fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn server_error(err: &dyn std::error::Error) -> Response {
    error!(error = %err, "Request failed");
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::message("Server error")),
    )
        .into_response();
    response.extensions_mut().insert(ErrorDetail(chain));
    response
}

/// Rewrites 500 bodies to include their [`ErrorDetail`] when the server
/// runs in development.
pub async fn expose_error_detail(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    if !state.is_development() {
        return response;
    }
    let body = ErrorBody {
        message: "Server error",
        errors: &[],
        detail: Some(detail),
    };
    let (parts, _) = response.into_parts();
    (parts, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Service(err) => err,
            ApiError::BadRequest(message) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorBody::message(&message))).into_response()
            }
            ApiError::RouteNotFound(path) => {
                let message = format!("Not Found - {}", path);
                return (StatusCode::NOT_FOUND, Json(ErrorBody::message(&message))).into_response();
            }
            ApiError::Task(ref err) => return server_error(err),
        };

        let status = status_of(err.kind());
        match &err {
            ServiceError::Validation { message, errors } => {
                let body = ErrorBody {
                    message,
                    errors,
                    detail: None,
                };
                (status, Json(body)).into_response()
            }
            ServiceError::ImportRejected { message, report } => (
                status,
                Json(serde_json::json!({
                    "message": message,
                    "summary": report.summary,
                    "skippedRows": report.skipped_rows,
                })),
            )
                .into_response(),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => server_error(&err),
            _ => (status, Json(ErrorBody::message(&err.to_string()))).into_response(),
        }
    }
}
