use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::database::DbPool;
use crate::models::conversation::Conversation;
use crate::services::conversation::{
    get_conversation, get_or_create_conversation, list_conversations,
};
use crate::services::message::{load_messages, send_message};
use crate::services::unread::mark_viewed;
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::{extract_user_id, json_list, json_response};
use crate::websocket::events::ServerMessage;

#[derive(Deserialize)]
struct CreateConversationRequest {
    listing_id: String,
    seller_id: String,
}

#[derive(Deserialize)]
struct SendMessageRequest {
    content: String,
}

/// Conversations are private to their two parties; every read path checks
/// membership the same way the websocket subscribe does.
async fn require_participant(
    pool: &DbPool,
    conversation_id: &str,
    user_id: &str,
) -> AppResult<Conversation> {
    let conversation = get_conversation(pool, conversation_id).await?;

    if !conversation.is_participant(user_id) {
        return Err(AppError::Forbidden(
            "You are not part of this conversation".to_string(),
        ));
    }

    Ok(conversation)
}

/// "Message seller" entry point: the caller is the buyer; the conversation
/// is created lazily on first use and returned unchanged on repeats.
async fn create_or_get_conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateConversationRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let buyer_id = extract_user_id(&headers)?;
    let conversation =
        get_or_create_conversation(&state.db, &req.listing_id, &buyer_id, &req.seller_id).await?;

    Ok(json_response(&conversation))
}

async fn list_user_conversations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let user_id = extract_user_id(&headers)?;
    let summaries = list_conversations(&state.db, &user_id).await?;
    Ok(json_list(summaries))
}

async fn get_conversation_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let user_id = extract_user_id(&headers)?;
    require_participant(&state.db, &conversation_id, &user_id).await?;

    let messages = load_messages(&state.db, &conversation_id).await?;
    Ok(json_list(messages))
}

async fn send_conversation_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let sender_id = extract_user_id(&headers)?;

    let message = send_message(&state.db, &conversation_id, &sender_id, &req.content).await?;

    // Fan-out to live subscribers, including the sender's other sessions.
    state
        .ws_manager
        .publish(&conversation_id, ServerMessage::message_created(&message));

    // Best-effort push; failure is logged inside, never surfaced here.
    state.notifier.notify_new_message(&message);

    Ok(json_response(&message))
}

/// Called when the viewer opens the conversation for reading.
async fn mark_conversation_viewed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let viewer_id = extract_user_id(&headers)?;
    require_participant(&state.db, &conversation_id, &viewer_id).await?;

    mark_viewed(&state.db, &viewer_id, &conversation_id).await?;
    Ok(Json(serde_json::json!({ "viewed": true })))
}

async fn get_active_typists(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = extract_user_id(&headers)?;
    require_participant(&state.db, &conversation_id, &user_id).await?;

    let typists: Vec<String> = state
        .ws_manager
        .typing()
        .active_typists(&conversation_id)
        .into_iter()
        .filter(|typist| typist != &user_id)
        .collect();

    Ok(Json(serde_json::json!({ "typing": typists })))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(create_or_get_conversation))
        .route("/", get(list_user_conversations))
        .route("/:conversation_id/messages", post(send_conversation_message))
        .route("/:conversation_id/messages", get(get_conversation_messages))
        .route("/:conversation_id/viewed", post(mark_conversation_viewed))
        .route("/:conversation_id/typing", get(get_active_typists))
        .with_state(state)
}
