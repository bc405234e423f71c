use crate::database::DbPool;
use crate::models::conversation::{Conversation, ConversationSummary};
use crate::services::block::is_blocked;
use crate::services::unread::{get_watermark, is_unread, latest_message_at};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_user_id;
use itertools::Itertools;

/// Idempotent get-or-create for the (listing, buyer, seller) triple.
///
/// The unique index on the triple plus `ON CONFLICT DO NOTHING` makes this
/// safe under concurrent callers: two simultaneous "message seller" clicks
/// resolve to the same row via the read after the insert attempt.
pub async fn get_or_create_conversation(
    pool: &DbPool,
    listing_id: &str,
    buyer_id: &str,
    seller_id: &str,
) -> AppResult<Conversation> {
    validate_user_id(buyer_id)?;
    validate_user_id(seller_id)?;

    if buyer_id == seller_id {
        return Err(AppError::Validation(
            "Buyer and seller must be different users".to_string(),
        ));
    }

    if listing_id.is_empty() {
        return Err(AppError::Validation(
            "Listing id cannot be empty".to_string(),
        ));
    }

    let candidate = Conversation::new(
        listing_id.to_string(),
        buyer_id.to_string(),
        seller_id.to_string(),
    );

    sqlx::query(
        "INSERT INTO conversations (id, listing_id, buyer_id, seller_id, created_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (listing_id, buyer_id, seller_id) DO NOTHING",
    )
    .bind(&candidate.id)
    .bind(&candidate.listing_id)
    .bind(&candidate.buyer_id)
    .bind(&candidate.seller_id)
    .bind(&candidate.created_at)
    .execute(pool.as_ref())
    .await?;

    let conversation = sqlx::query_as::<_, Conversation>(
        "SELECT * FROM conversations WHERE listing_id = ? AND buyer_id = ? AND seller_id = ?",
    )
    .bind(listing_id)
    .bind(buyer_id)
    .bind(seller_id)
    .fetch_one(pool.as_ref())
    .await?;

    Ok(conversation)
}

pub async fn get_conversation(pool: &DbPool, conversation_id: &str) -> AppResult<Conversation> {
    sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
        .bind(conversation_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))
}

/// Inbox listing for one user: every conversation they participate in,
/// minus those involving a blocked pair, newest activity first, each row
/// annotated with its unread flag.
pub async fn list_conversations(
    pool: &DbPool,
    user_id: &str,
) -> AppResult<Vec<ConversationSummary>> {
    let conversations = sqlx::query_as::<_, Conversation>(
        "SELECT * FROM conversations WHERE buyer_id = ? OR seller_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool.as_ref())
    .await?;

    // Historical duplicates (rows created before the unique index) collapse
    // to one entry per triple.
    let conversations: Vec<Conversation> = conversations
        .into_iter()
        .unique_by(|c| {
            (
                c.listing_id.clone(),
                c.buyer_id.clone(),
                c.seller_id.clone(),
            )
        })
        .collect();

    let mut summaries = Vec::new();

    for conversation in conversations {
        let other = match conversation.other_participant(user_id) {
            Some(other) => other.to_string(),
            None => continue,
        };

        if is_blocked(pool, user_id, &other).await? {
            continue;
        }

        let latest = latest_message_at(pool, &conversation.id).await?;
        let watermark = get_watermark(pool, user_id, &conversation.id).await?;
        let unread = is_unread(watermark.as_deref(), latest.as_deref());

        summaries.push(ConversationSummary {
            conversation,
            latest_message_at: latest,
            unread,
        });
    }

    summaries.sort_by(|a, b| {
        let a_key = a
            .latest_message_at
            .as_deref()
            .unwrap_or(&a.conversation.created_at);
        let b_key = b
            .latest_message_at
            .as_deref()
            .unwrap_or(&b.conversation.created_at);
        b_key.cmp(a_key)
    });

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_test_pool;
    use crate::services::block::block_user;
    use crate::services::message::send_message;
    use crate::services::unread::mark_viewed;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let pool = create_test_pool().await;

        let first = get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();
        let second = get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(pool.as_ref())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_distinct_listings_get_distinct_conversations() {
        let pool = create_test_pool().await;

        let first = get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();
        let second = get_or_create_conversation(&pool, "listing-2", "buyer", "seller")
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_buyer_cannot_message_self() {
        let pool = create_test_pool().await;
        let result = get_or_create_conversation(&pool, "listing-1", "alice", "alice").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_excludes_blocked_pairs() {
        let pool = create_test_pool().await;

        get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();
        get_or_create_conversation(&pool, "listing-2", "buyer", "other-seller")
            .await
            .unwrap();

        block_user(&pool, "seller", "buyer").await.unwrap();

        // Hidden from both sides of the blocked pair.
        let buyer_list = list_conversations(&pool, "buyer").await.unwrap();
        assert_eq!(buyer_list.len(), 1);
        assert_eq!(buyer_list[0].conversation.listing_id, "listing-2");

        let seller_list = list_conversations(&pool, "seller").await.unwrap();
        assert!(seller_list.is_empty());
    }

    #[tokio::test]
    async fn test_list_carries_unread_flags() {
        let pool = create_test_pool().await;

        let conversation = get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();

        send_message(&pool, &conversation.id, "buyer", "Is this available?")
            .await
            .unwrap();

        let seller_list = list_conversations(&pool, "seller").await.unwrap();
        assert!(seller_list[0].unread);

        mark_viewed(&pool, "seller", &conversation.id).await.unwrap();

        let seller_list = list_conversations(&pool, "seller").await.unwrap();
        assert!(!seller_list[0].unread);
    }
}
