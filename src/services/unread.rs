use chrono::Utc;
use crate::database::DbPool;
use crate::models::watermark::ReadWatermark;
use crate::utils::error::AppResult;

/// Pure watermark comparison. A conversation is unread when its newest
/// visible message is strictly newer than the viewer's watermark, or when
/// the viewer has no watermark and at least one message exists.
pub fn is_unread(watermark: Option<&str>, latest_message_at: Option<&str>) -> bool {
    match (watermark, latest_message_at) {
        (_, None) => false,
        (None, Some(_)) => true,
        // RFC3339 UTC timestamps compare correctly as strings.
        (Some(seen), Some(latest)) => latest > seen,
    }
}

/// Called once when the viewer opens the conversation, not on every
/// message received while it is open.
pub async fn mark_viewed(pool: &DbPool, viewer_id: &str, conversation_id: &str) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO read_watermarks (viewer_id, conversation_id, viewed_at) VALUES (?, ?, ?)
         ON CONFLICT (viewer_id, conversation_id) DO UPDATE SET viewed_at = excluded.viewed_at",
    )
    .bind(viewer_id)
    .bind(conversation_id)
    .bind(&now)
    .execute(pool.as_ref())
    .await?;

    Ok(())
}

pub async fn get_watermark(
    pool: &DbPool,
    viewer_id: &str,
    conversation_id: &str,
) -> AppResult<Option<String>> {
    let watermark = sqlx::query_as::<_, ReadWatermark>(
        "SELECT * FROM read_watermarks WHERE viewer_id = ? AND conversation_id = ?",
    )
    .bind(viewer_id)
    .bind(conversation_id)
    .fetch_optional(pool.as_ref())
    .await?;

    Ok(watermark.map(|w| w.viewed_at))
}

/// Timestamp of the newest non-trashed message, if any.
pub async fn latest_message_at(
    pool: &DbPool,
    conversation_id: &str,
) -> AppResult<Option<String>> {
    let latest: Option<String> = sqlx::query_scalar(
        "SELECT created_at FROM messages WHERE conversation_id = ? AND status != 'trashed'
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .bind(conversation_id)
    .fetch_optional(pool.as_ref())
    .await?;

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_test_pool;
    use crate::services::conversation::get_or_create_conversation;
    use crate::services::message::{send_message, trash_message};

    #[test]
    fn test_is_unread_cases() {
        assert!(!is_unread(None, None));
        assert!(!is_unread(Some("2026-01-01T00:00:00+00:00"), None));
        assert!(is_unread(None, Some("2026-01-01T00:00:00+00:00")));
        assert!(is_unread(
            Some("2026-01-01T00:00:00+00:00"),
            Some("2026-01-01T00:00:01+00:00")
        ));
        assert!(!is_unread(
            Some("2026-01-01T00:00:01+00:00"),
            Some("2026-01-01T00:00:01+00:00")
        ));
        assert!(!is_unread(
            Some("2026-01-01T00:00:02+00:00"),
            Some("2026-01-01T00:00:01+00:00")
        ));
    }

    #[tokio::test]
    async fn test_watermark_tracks_interleaved_sends() {
        let pool = create_test_pool().await;
        let conversation = get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();

        // No messages yet: nothing to read.
        let latest = latest_message_at(&pool, &conversation.id).await.unwrap();
        let watermark = get_watermark(&pool, "seller", &conversation.id)
            .await
            .unwrap();
        assert!(!is_unread(watermark.as_deref(), latest.as_deref()));

        send_message(&pool, &conversation.id, "buyer", "Is this available?")
            .await
            .unwrap();

        let latest = latest_message_at(&pool, &conversation.id).await.unwrap();
        let watermark = get_watermark(&pool, "seller", &conversation.id)
            .await
            .unwrap();
        assert!(is_unread(watermark.as_deref(), latest.as_deref()));

        mark_viewed(&pool, "seller", &conversation.id).await.unwrap();

        let latest = latest_message_at(&pool, &conversation.id).await.unwrap();
        let watermark = get_watermark(&pool, "seller", &conversation.id)
            .await
            .unwrap();
        assert!(!is_unread(watermark.as_deref(), latest.as_deref()));

        send_message(&pool, &conversation.id, "buyer", "Still interested?")
            .await
            .unwrap();

        let latest = latest_message_at(&pool, &conversation.id).await.unwrap();
        let watermark = get_watermark(&pool, "seller", &conversation.id)
            .await
            .unwrap();
        assert!(is_unread(watermark.as_deref(), latest.as_deref()));
    }

    #[tokio::test]
    async fn test_trashed_messages_do_not_count_as_unread() {
        let pool = create_test_pool().await;
        let conversation = get_or_create_conversation(&pool, "listing-1", "buyer", "seller")
            .await
            .unwrap();

        mark_viewed(&pool, "seller", &conversation.id).await.unwrap();

        let message = send_message(&pool, &conversation.id, "buyer", "oops")
            .await
            .unwrap();
        trash_message(&pool, &message.id, "buyer").await.unwrap();

        let latest = latest_message_at(&pool, &conversation.id).await.unwrap();
        assert!(latest.is_none());
    }
}
