use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use alumni::services::admins::{self, LoginPayload, LoginResponse};

use crate::error::ApiError;
use crate::extract::{CurrentAdmin, JsonBody};
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn login(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = blocking(&state, move |s| admins::login(&s.db, &s.signer, &payload)).await?;
    Ok(Json(response))
}

async fn me(CurrentAdmin(admin): CurrentAdmin) -> Json<Value> {
    Json(json!({ "admin": admin }))
}
