use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use alumni::services::admins::{self, PasswordPayload, ProfilePayload};
use alumni::storage;

use super::{message, Message};
use crate::error::ApiError;
use crate::extract::{CurrentAdmin, FormInput, JsonBody};
use crate::state::{blocking, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/password", put(change_password))
        .route("/change-password", put(change_password))
}

async fn get_me(CurrentAdmin(admin): CurrentAdmin) -> Json<Value> {
    Json(json!({ "admin": admin }))
}

/// Accepts JSON or multipart. A `photo` file is stored inline as a
/// `data:` URL.
async fn update_me(
    State(state): State<SharedState>,
    CurrentAdmin(admin): CurrentAdmin,
    mut form: FormInput,
) -> Result<Json<Value>, ApiError> {
    let payload: ProfilePayload = form.payload()?;
    let photo = form.take_file("photo");
    let updated = blocking(&state, move |s| {
        let photo = photo.as_ref().map(storage::data_url).transpose()?;
        admins::update_me(&s.db, &admin.id, &payload, photo)
    })
    .await?;
    Ok(Json(json!({ "admin": updated })))
}

async fn change_password(
    State(state): State<SharedState>,
    CurrentAdmin(admin): CurrentAdmin,
    JsonBody(payload): JsonBody<PasswordPayload>,
) -> Result<Json<Message>, ApiError> {
    blocking(&state, move |s| admins::change_password(&s.db, &admin.id, &payload)).await?;
    Ok(message("Password updated successfully"))
}
