use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use alumni::report::{self, ExportFormat};
use alumni::{ServiceError, StudentQuery};

use super::attachment;
use crate::error::ApiError;
use crate::extract::{CurrentAdmin, Params};
use crate::state::{blocking, SharedState};
use crate::stream::streamed;

pub fn router() -> Router<SharedState> {
    Router::new().route("/students", get(export_students))
}

/// `?format=csv|xlsx|excel|pdf` plus any student filter.
///
/// Filter errors are answered before the body starts. The body itself is
/// written while it is sent.
async fn export_students(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Params(params): Params,
) -> Result<Response, ApiError> {
    let format = ExportFormat::parse(params.get("format")).map_err(ServiceError::from)?;
    let query = StudentQuery::from_params(&params);
    let export = blocking(&state, move |s| {
        report::prepare_export(&s.db, &query, format, Utc::now())
    })
    .await?;

    let content_type = export.content_type();
    let filename = export.filename();
    let body = streamed(move |sink| export.write_to(sink));
    Ok(attachment(body, content_type, &filename))
}
