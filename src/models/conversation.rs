use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub created_at: String,
}

impl Conversation {
    pub fn new(listing_id: String, buyer_id: String, seller_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            listing_id,
            buyer_id,
            seller_id,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// The participant on the other side of the conversation from `user_id`.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if user_id == self.buyer_id {
            Some(&self.seller_id)
        } else if user_id == self.seller_id {
            Some(&self.buyer_id)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        user_id == self.buyer_id || user_id == self.seller_id
    }
}

/// Conversation list row as rendered in the inbox: the conversation plus
/// the derived unread flag and the timestamp of its newest visible message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub latest_message_at: Option<String>,
    pub unread: bool,
}
