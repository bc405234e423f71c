use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::events::ServerMessage;

const CHANNEL_CAPACITY: usize = 256;

struct Channel {
    sender: broadcast::Sender<ServerMessage>,
    subscribers: usize,
}

struct HubInner {
    channels: Mutex<HashMap<String, Channel>>,
}

/// One logical broadcast channel per conversation. Channels are created on
/// first subscribe and torn down when the last subscription is released, so
/// an idle process holds no standing registrations.
#[derive(Clone)]
pub struct ConversationHub {
    inner: Arc<HubInner>,
}

/// Releases the subscription on drop. Holding the guard is the only way to
/// stay subscribed, so every exit path of a connection, error paths
/// included, returns the registration.
pub struct SubscriptionGuard {
    inner: Arc<HubInner>,
    conversation_id: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let mut channels = self.inner.channels.lock().expect("hub lock poisoned");
        if let Some(channel) = channels.get_mut(&self.conversation_id) {
            channel.subscribers -= 1;
            if channel.subscribers == 0 {
                channels.remove(&self.conversation_id);
            }
        }
    }
}

impl ConversationHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(
        &self,
        conversation_id: &str,
    ) -> (broadcast::Receiver<ServerMessage>, SubscriptionGuard) {
        let mut channels = self.inner.channels.lock().expect("hub lock poisoned");

        let channel = channels
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
                Channel {
                    sender,
                    subscribers: 0,
                }
            });
        channel.subscribers += 1;

        let receiver = channel.sender.subscribe();
        let guard = SubscriptionGuard {
            inner: self.inner.clone(),
            conversation_id: conversation_id.to_string(),
        };

        (receiver, guard)
    }

    /// Pushes an event to every live subscriber of the conversation. A
    /// conversation nobody is watching has no channel and the event is
    /// dropped, matching at-least-once delivery to live subscribers only.
    pub fn publish(&self, conversation_id: &str, message: ServerMessage) {
        let channels = self.inner.channels.lock().expect("hub lock poisoned");
        if let Some(channel) = channels.get(conversation_id) {
            let _ = channel.sender.send(message);
        }
    }

    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        let channels = self.inner.channels.lock().expect("hub lock poisoned");
        channels
            .get(conversation_id)
            .map(|c| c.subscribers)
            .unwrap_or(0)
    }
}

impl Default for ConversationHub {
    fn default() -> Self {
        Self::new()
    }
}
