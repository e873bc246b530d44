use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use alumni::analytics::{self, DashboardRange};
use alumni::StudentQuery;

use super::data;
use crate::error::ApiError;
use crate::extract::{CurrentAdmin, Params};
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/hub", get(hub))
}

/// `?startYear=&endYear=` pick the batch-year window; the configured
/// window applies otherwise.
async fn dashboard(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Params(params): Params,
) -> Result<impl IntoResponse, ApiError> {
    let range = DashboardRange::parse(
        params.get("startYear"),
        params.get("endYear"),
        state.dashboard_defaults(),
    )?;
    let dashboard = blocking(&state, move |s| analytics::dashboard(&s.db, range)).await?;
    Ok(data(dashboard))
}

async fn hub(
    State(state): State<SharedState>,
    _: CurrentAdmin,
    Params(params): Params,
) -> Result<impl IntoResponse, ApiError> {
    let query = StudentQuery::from_params(&params);
    let hub = blocking(&state, move |s| analytics::hub(&s.db, &query)).await?;
    Ok(data(hub))
}
