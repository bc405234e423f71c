use serde::{Deserialize, Serialize};

use crate::models::message::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { conversation_id: String },
    Unsubscribe { conversation_id: String },
    Typing { conversation_id: String },
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        user_id: String,
    },
    /// Ack for every subscribe, including re-subscribes after a transport
    /// drop. Carries the newest visible message timestamp so a reconnecting
    /// client knows whether it must reload the log.
    Subscribed {
        conversation_id: String,
        latest_message_at: Option<String>,
    },
    Unsubscribed {
        conversation_id: String,
    },
    MessageCreated {
        message_id: String,
        conversation_id: String,
        sender_id: String,
        receiver_id: String,
        listing_id: String,
        content: String,
        created_at: String,
    },
    MessageTrashed {
        message_id: String,
        conversation_id: String,
    },
    UserTyping {
        conversation_id: String,
        user_id: String,
    },
    Error {
        message: String,
    },
    Pong,
}

impl ServerMessage {
    pub fn message_created(message: &Message) -> Self {
        ServerMessage::MessageCreated {
            message_id: message.id.clone(),
            conversation_id: message.conversation_id.clone(),
            sender_id: message.sender_id.clone(),
            receiver_id: message.receiver_id.clone(),
            listing_id: message.listing_id.clone(),
            content: message.content.clone(),
            created_at: message.created_at.clone(),
        }
    }
}
