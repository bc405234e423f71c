use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::delete,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::services::message::trash_message;
use crate::utils::error::AppResult;
use crate::utils::helpers::{extract_user_id, json_response};
use crate::websocket::events::ServerMessage;

/// Soft delete by the sender. The row keeps its content in the log; only
/// rendering and unread computation stop seeing it.
async fn trash_message_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let actor_id = extract_user_id(&headers)?;

    let message = trash_message(&state.db, &message_id, &actor_id).await?;

    state.ws_manager.publish(
        &message.conversation_id,
        ServerMessage::MessageTrashed {
            message_id: message.id.clone(),
            conversation_id: message.conversation_id.clone(),
        },
    );

    Ok(json_response(&message))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/:message_id", delete(trash_message_handler))
        .with_state(state)
}
