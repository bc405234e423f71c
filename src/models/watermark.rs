use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-viewer "read up to here" marker. A conversation is unread when its
/// newest visible message is strictly newer than this timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReadWatermark {
    pub viewer_id: String,
    pub conversation_id: String,
    pub viewed_at: String,
}
