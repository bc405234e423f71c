use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    /// Denormalized from the conversation so notification routing does not
    /// need a second lookup.
    pub listing_id: String,
    pub content: String,
    pub created_at: String,
    pub status: String,
    pub trashed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Active,
    Trashed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MessageStatus::Active => "active",
            MessageStatus::Trashed => "trashed",
        }
    }
}

impl Message {
    pub fn new(
        conversation_id: String,
        sender_id: String,
        receiver_id: String,
        listing_id: String,
        content: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            sender_id,
            receiver_id,
            listing_id,
            content,
            created_at: Utc::now().to_rfc3339(),
            status: MessageStatus::Active.as_str().to_string(),
            trashed_at: None,
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.status == MessageStatus::Trashed.as_str()
    }
}
