use serde::Serialize;

use crate::models::message::Message;

/// Best-effort push side-channel. Delivery is fire-and-forget: a failed or
/// slow webhook call never fails the send that triggered it.
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PushPayload {
    receiver_id: String,
    conversation_id: String,
    listing_id: String,
    preview: String,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("PUSH_WEBHOOK_URL").ok())
    }

    /// Spawns the delivery attempt and returns immediately.
    pub fn notify_new_message(&self, message: &Message) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let client = self.client.clone();
        let payload = PushPayload {
            receiver_id: message.receiver_id.clone(),
            conversation_id: message.conversation_id.clone(),
            listing_id: message.listing_id.clone(),
            preview: message.content.chars().take(80).collect(),
        };

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Push notification delivered to {}", payload.receiver_id);
                }
                Ok(response) => {
                    tracing::warn!(
                        "Push notification for {} rejected: {}",
                        payload.receiver_id,
                        response.status()
                    );
                }
                Err(e) => {
                    tracing::warn!("Push notification for {} failed: {}", payload.receiver_id, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_without_webhook_is_noop() {
        let notifier = Notifier::new(None);
        let message = Message::new(
            "conv-1".to_string(),
            "buyer".to_string(),
            "seller".to_string(),
            "listing-1".to_string(),
            "Is this available?".to_string(),
        );

        // Nothing to assert beyond "does not panic or block".
        notifier.notify_new_message(&message);
    }
}
