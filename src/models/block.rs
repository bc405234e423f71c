use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A unilateral block that is treated as mutual for delivery suppression:
/// a row in either direction hides the conversation from both parties and
/// rejects new sends both ways.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Block {
    pub blocker_id: String,
    pub blocked_id: String,
    pub created_at: String,
}

impl Block {
    pub fn new(blocker_id: String, blocked_id: String) -> Self {
        Self {
            blocker_id,
            blocked_id,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
