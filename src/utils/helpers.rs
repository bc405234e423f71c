use axum::{Json, http::HeaderMap};
use serde::Serialize;

use crate::utils::error::{AppError, AppResult};

pub fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).expect("Failed to serialize to JSON")
}

pub fn json_response<T: Serialize>(value: &T) -> Json<serde_json::Value> {
    Json(to_json(value))
}

pub fn json_list<T: Serialize>(items: Vec<T>) -> Json<Vec<serde_json::Value>> {
    Json(items.into_iter().map(|item| to_json(&item)).collect())
}

/// The verified caller identity set by the auth middleware. Every handler
/// behind the middleware can rely on the header being present.
pub fn extract_user_id(headers: &HeaderMap) -> AppResult<String> {
    headers
        .get(crate::middleware::auth::AUTH_USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Auth("No verified caller identity".to_string()))
}
