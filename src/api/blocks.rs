use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::services::block::{block_user, is_blocked};
use crate::utils::error::AppResult;
use crate::utils::helpers::{extract_user_id, json_response};

#[derive(Deserialize)]
struct CreateBlockRequest {
    blocked_id: String,
}

async fn create_block(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateBlockRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let blocker_id = extract_user_id(&headers)?;
    let block = block_user(&state.db, &blocker_id, &req.blocked_id).await?;
    Ok(json_response(&block))
}

/// Symmetric check the chat view uses to decide between the composer and
/// the static blocked notice.
async fn check_blocked(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let caller_id = extract_user_id(&headers)?;
    let blocked = is_blocked(&state.db, &caller_id, &user_id).await?;
    Ok(Json(serde_json::json!({ "blocked": blocked })))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(create_block))
        .route("/:user_id", get(check_blocked))
        .with_state(state)
}
