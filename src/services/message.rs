use chrono::Utc;
use crate::database::DbPool;
use crate::models::message::{Message, MessageStatus};
use crate::services::block::is_blocked;
use crate::services::conversation::get_conversation;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_message_content;

/// Appends a message to the conversation's log.
///
/// The sender must be a participant and the pair must not be blocked in
/// either direction. The receiver is always "the other participant"; the
/// listing id is denormalized onto the row for notification routing.
pub async fn send_message(
    pool: &DbPool,
    conversation_id: &str,
    sender_id: &str,
    content: &str,
) -> AppResult<Message> {
    validate_message_content(content)?;

    let conversation = get_conversation(pool, conversation_id).await?;

    let receiver_id = conversation
        .other_participant(sender_id)
        .ok_or_else(|| {
            AppError::Forbidden("You are not part of this conversation".to_string())
        })?
        .to_string();

    if is_blocked(pool, sender_id, &receiver_id).await? {
        return Err(AppError::Blocked);
    }

    let message = Message::new(
        conversation.id.clone(),
        sender_id.to_string(),
        receiver_id,
        conversation.listing_id.clone(),
        content.to_string(),
    );

    sqlx::query(
        "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, listing_id, content, created_at, status)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&message.id)
    .bind(&message.conversation_id)
    .bind(&message.sender_id)
    .bind(&message.receiver_id)
    .bind(&message.listing_id)
    .bind(&message.content)
    .bind(&message.created_at)
    .bind(&message.status)
    .execute(pool.as_ref())
    .await?;

    Ok(message)
}

/// Soft delete by the original sender. The row stays in the log with
/// `status = trashed`; content is never rewritten.
pub async fn trash_message(pool: &DbPool, message_id: &str, actor_id: &str) -> AppResult<Message> {
    let message = get_message(pool, message_id).await?;

    if message.sender_id != actor_id {
        return Err(AppError::Forbidden(
            "Only the sender can trash a message".to_string(),
        ));
    }

    // Re-trashing is a no-op; the original trash timestamp stands.
    if message.is_trashed() {
        return Ok(message);
    }

    let trashed_at = Utc::now().to_rfc3339();

    sqlx::query("UPDATE messages SET status = ?, trashed_at = ? WHERE id = ?")
        .bind(MessageStatus::Trashed.as_str())
        .bind(&trashed_at)
        .bind(message_id)
        .execute(pool.as_ref())
        .await?;

    Ok(Message {
        status: MessageStatus::Trashed.as_str().to_string(),
        trashed_at: Some(trashed_at),
        ..message
    })
}

/// The full visible log for a conversation: trashed rows excluded,
/// ascending by creation time with insertion order breaking ties. Clients
/// re-run this query on every fan-out event instead of patching
/// incrementally, so delivery order never matters.
pub async fn load_messages(pool: &DbPool, conversation_id: &str) -> AppResult<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE conversation_id = ? AND status != 'trashed'
         ORDER BY created_at ASC, rowid ASC",
    )
    .bind(conversation_id)
    .fetch_all(pool.as_ref())
    .await?;

    Ok(messages)
}

/// Direct lookup by id; returns trashed rows too (the log is auditable,
/// never erased).
pub async fn get_message(pool: &DbPool, message_id: &str) -> AppResult<Message> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
        .bind(message_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_test_pool;
    use crate::models::conversation::Conversation;
    use crate::services::block::block_user;
    use crate::services::conversation::get_or_create_conversation;

    async fn setup() -> (DbPool, Conversation) {
        let pool = create_test_pool().await;
        let conversation = get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();
        (pool, conversation)
    }

    #[tokio::test]
    async fn test_send_resolves_receiver() {
        let (pool, conversation) = setup().await;

        let from_buyer = send_message(&pool, &conversation.id, "buyer", "Is this available?")
            .await
            .unwrap();
        assert_eq!(from_buyer.receiver_id, "seller");
        assert_eq!(from_buyer.listing_id, "listing-1");

        let from_seller = send_message(&pool, &conversation.id, "seller", "Yes")
            .await
            .unwrap();
        assert_eq!(from_seller.receiver_id, "buyer");
    }

    #[tokio::test]
    async fn test_non_participant_cannot_send() {
        let (pool, conversation) = setup().await;

        let result = send_message(&pool, &conversation.id, "stranger", "hello").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let (pool, conversation) = setup().await;

        let result = send_message(&pool, &conversation.id, "buyer", "   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_blocked_pair_cannot_send_either_way() {
        let (pool, conversation) = setup().await;

        block_user(&pool, "buyer", "seller").await.unwrap();

        let from_buyer = send_message(&pool, &conversation.id, "buyer", "hi").await;
        assert!(matches!(from_buyer, Err(AppError::Blocked)));

        let from_seller = send_message(&pool, &conversation.id, "seller", "hi").await;
        assert!(matches!(from_seller, Err(AppError::Blocked)));
    }

    #[tokio::test]
    async fn test_load_is_ascending_and_trash_filtered() {
        let (pool, conversation) = setup().await;

        let first = send_message(&pool, &conversation.id, "buyer", "Is this available?")
            .await
            .unwrap();
        send_message(&pool, &conversation.id, "seller", "Yes")
            .await
            .unwrap();

        let messages = load_messages(&pool, &conversation.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(messages[0].content, "Is this available?");
        assert_eq!(messages[1].content, "Yes");

        trash_message(&pool, &first.id, "buyer").await.unwrap();

        let messages = load_messages(&pool, &conversation.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Yes");

        // Trashed but still in the log under direct lookup.
        let trashed = get_message(&pool, &first.id).await.unwrap();
        assert!(trashed.is_trashed());
        assert!(trashed.trashed_at.is_some());
        assert_eq!(trashed.content, "Is this available?");
    }

    #[tokio::test]
    async fn test_retrash_keeps_original_timestamp() {
        let (pool, conversation) = setup().await;

        let message = send_message(&pool, &conversation.id, "buyer", "oops")
            .await
            .unwrap();

        let first = trash_message(&pool, &message.id, "buyer").await.unwrap();
        let first_trashed_at = first.trashed_at.clone().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let second = trash_message(&pool, &message.id, "buyer").await.unwrap();
        assert_eq!(second.trashed_at.as_deref(), Some(first_trashed_at.as_str()));

        let stored = get_message(&pool, &message.id).await.unwrap();
        assert_eq!(stored.trashed_at.as_deref(), Some(first_trashed_at.as_str()));
    }

    #[tokio::test]
    async fn test_only_sender_can_trash() {
        let (pool, conversation) = setup().await;

        let message = send_message(&pool, &conversation.id, "buyer", "Is this available?")
            .await
            .unwrap();

        let result = trash_message(&pool, &message.id, "seller").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
