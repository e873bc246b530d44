//! Request extractors: the authenticated admin, loose query parameters,
//! JSON bodies and multipart-or-JSON forms.

use std::collections::HashMap;

use alumni::db::admin_repo::AdminRow;
use alumni::services::admins;
use alumni::storage::Upload;
use alumni::QueryParams;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::state::{blocking, SharedState};

/// The admin named by the request's bearer token.
pub struct CurrentAdmin(pub AdminRow);

impl FromRequestParts<SharedState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let admin = blocking(state, move |s| {
            admins::authenticate(&s.db, &s.signer, header.as_deref())
        })
        .await?;
        Ok(CurrentAdmin(admin))
    }
}

/// Query-string pairs, multi-valued keys kept.
pub struct Params(pub QueryParams);

impl<S: Send + Sync> FromRequestParts<S> for Params {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("Invalid query string".to_string()))?;
        Ok(Params(QueryParams::from_pairs(pairs)))
    }
}

/// `axum::Json` with rejections reported in the API's error shape.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// A form sent either as `multipart/form-data` or as a JSON object.
///
/// Text fields are collected into a JSON object so the same payload types
/// deserialize from both. File parts are kept aside by field name.
#[derive(Default)]
pub struct FormInput {
    fields: Map<String, Value>,
    files: HashMap<String, Upload>,
}

impl FormInput {
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormInput::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // An empty file input still sends a nameless part.
                    if bytes.is_empty() && file_name.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, Value::String(text));
                }
            }
        }
        Ok(form)
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(err.body_text())
}

impl<S: Send + Sync> FromRequest<S> for FormInput {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(FormInput::default());
        }
        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(fields)) => Ok(FormInput {
                fields,
                files: HashMap::new(),
            }),
            Ok(_) => Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
            Err(_) => Err(ApiError::BadRequest("Invalid JSON body".to_string())),
        }
    }
}
