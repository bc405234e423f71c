use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::database::DbPool;
use crate::services::conversation::get_conversation;
use crate::services::unread::latest_message_at;
use crate::utils::error::AppResult;

use super::events::{ClientMessage, ServerMessage};
use super::hub::{ConversationHub, SubscriptionGuard};
use super::typing::TypingTracker;

const OUTBOUND_CAPACITY: usize = 256;

pub struct ConnectionManager {
    hub: ConversationHub,
    typing: Arc<TypingTracker>,
}

/// One live chat-view subscription held by a connection. The guard returns
/// the hub registration when the subscription is dropped, on every exit
/// path.
struct Subscription {
    _guard: SubscriptionGuard,
    forward: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            hub: ConversationHub::new(),
            typing: Arc::new(TypingTracker::new()),
        }
    }

    pub fn hub(&self) -> &ConversationHub {
        &self.hub
    }

    pub fn typing(&self) -> &Arc<TypingTracker> {
        &self.typing
    }

    /// Fan-out entry point for the REST handlers: push an event to every
    /// live subscriber of the conversation.
    pub fn publish(&self, conversation_id: &str, message: ServerMessage) {
        self.hub.publish(conversation_id, message);
    }

    pub async fn handle_connection(&self, socket: WebSocket, user_id: String, db: DbPool) {
        let (mut sink, mut stream) = socket.split();
        let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);

        let send_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Ok(json) = serde_json::to_string(&msg)
                    && sink.send(Message::Text(json)).await.is_err()
                {
                    break;
                }
            }
        });

        let _ = tx
            .send(ServerMessage::Connected {
                user_id: user_id.clone(),
            })
            .await;

        // Keyed by conversation id: one subscription per open chat view.
        let mut subscriptions: HashMap<String, Subscription> = HashMap::new();

        while let Some(Ok(frame)) = stream.next().await {
            let Message::Text(text) = frame else {
                continue;
            };

            let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
                let _ = tx
                    .send(ServerMessage::Error {
                        message: "Unrecognized frame".to_string(),
                    })
                    .await;
                continue;
            };

            match client_msg {
                ClientMessage::Subscribe { conversation_id } => {
                    match get_conversation(&db, &conversation_id).await {
                        Ok(conversation) if conversation.is_participant(&user_id) => {
                            match open_subscription(&self.hub, &db, &conversation_id).await {
                                Ok((receiver, guard, latest)) => {
                                    let forward =
                                        spawn_forwarder(receiver, tx.clone(), user_id.clone());

                                    // Re-subscribing replaces the previous
                                    // registration rather than stacking a
                                    // second one.
                                    subscriptions.insert(
                                        conversation_id.clone(),
                                        Subscription {
                                            _guard: guard,
                                            forward,
                                        },
                                    );

                                    let _ = tx
                                        .send(ServerMessage::Subscribed {
                                            conversation_id,
                                            latest_message_at: latest,
                                        })
                                        .await;
                                }
                                Err(e) => {
                                    tracing::error!(
                                        "Subscribe to {} failed: {}",
                                        conversation_id,
                                        e
                                    );
                                    let _ = tx
                                        .send(ServerMessage::Error {
                                            message: "Subscription failed".to_string(),
                                        })
                                        .await;
                                }
                            }
                        }
                        Ok(_) => {
                            let _ = tx
                                .send(ServerMessage::Error {
                                    message: "You are not part of this conversation"
                                        .to_string(),
                                })
                                .await;
                        }
                        Err(_) => {
                            let _ = tx
                                .send(ServerMessage::Error {
                                    message: "Conversation not found".to_string(),
                                })
                                .await;
                        }
                    }
                }
                ClientMessage::Unsubscribe { conversation_id } => {
                    if subscriptions.remove(&conversation_id).is_some() {
                        let _ = tx
                            .send(ServerMessage::Unsubscribed { conversation_id })
                            .await;
                    }
                }
                ClientMessage::Typing { conversation_id } => {
                    // Typing is ephemeral: only fanned out, never persisted.
                    if subscriptions.contains_key(&conversation_id) {
                        self.typing.announce(&conversation_id, &user_id);
                        self.hub.publish(
                            &conversation_id,
                            ServerMessage::UserTyping {
                                conversation_id: conversation_id.clone(),
                                user_id: user_id.clone(),
                            },
                        );
                    }
                }
                ClientMessage::Heartbeat => {
                    let _ = tx.send(ServerMessage::Pong).await;
                }
            }
        }

        // Teardown: dropping the subscriptions aborts the forwarders and
        // releases every hub registration.
        subscriptions.clear();
        send_task.abort();
    }
}

/// Resolves the `Subscribed` ack payload and takes the hub registration.
/// The watermark read runs first: if the store is unavailable no
/// registration is created and the caller reports the failure, rather than
/// acking a subscription whose reload point is silently missing.
async fn open_subscription(
    hub: &ConversationHub,
    db: &DbPool,
    conversation_id: &str,
) -> AppResult<(
    broadcast::Receiver<ServerMessage>,
    SubscriptionGuard,
    Option<String>,
)> {
    let latest = latest_message_at(db, conversation_id).await?;
    let (receiver, guard) = hub.subscribe(conversation_id);
    Ok((receiver, guard, latest))
}

/// Forwards hub events to this connection's socket. Typing announcements
/// from the connection's own user are filtered here, so a participant never
/// reacts to themselves.
fn spawn_forwarder(
    mut receiver: broadcast::Receiver<ServerMessage>,
    tx: mpsc::Sender<ServerMessage>,
    own_user_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let ServerMessage::UserTyping { ref user_id, .. } = event
                        && *user_id == own_user_id
                    {
                        continue;
                    }
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    })
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
