//! Assistant conversation: runs turns against the remote model and grows the
//! reply in place as fragments arrive.

use crate::api::AssistantProvider;
use crate::consent::ConsentGate;
use crate::gated::GatedValue;
use crate::models::{ChatMessage, ConsentCategory, Sender};
use crate::storage::{keys, StorageManager};
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

pub const GENERIC_ERROR: &str = "Sorry, I'm having trouble connecting right now. Please try again.";

const EVENT_CAPACITY: usize = 1024;

/// Notifications for the view layer; one `Chunk` per received fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    UserMessage(ChatMessage),
    Started { turn_id: Uuid, message_id: Uuid },
    Chunk { turn_id: Uuid, message_id: Uuid, text: String },
    Finished { turn_id: Uuid, message_id: Uuid },
    Failed { turn_id: Uuid, message: ChatMessage },
    Cancelled { turn_id: Uuid },
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed,
    // History was cleared while the reply was streaming
    Cancelled,
    // Nothing to send or retry
    Skipped,
    // Another reply is still streaming
    Busy,
}

pub struct ChatSession {
    provider: Arc<dyn AssistantProvider>,
    history: Mutex<Vec<ChatMessage>>,
    persisted: GatedValue<Vec<ChatMessage>>,
    // turn id -> cancelled
    turns: DashMap<Uuid, bool>,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn AssistantProvider>, storage: StorageManager, consent: ConsentGate) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            history: Mutex::new(Vec::new()),
            persisted: GatedValue::new(
                keys::CHAT_HISTORY,
                ConsentCategory::Functional,
                storage,
                consent,
                Vec::new(),
            ),
            turns: DashMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.turns.iter().any(|t| !*t.value())
    }

    /// Sends a new user message and streams the reply.
    pub async fn send(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Skipped;
        }
        self.run_turn(Some(text.to_string())).await
    }

    /// Drops a trailing error notice and replays the last user message.
    pub async fn retry(&self) -> TurnOutcome {
        self.run_turn(None).await
    }

    /// Empties the conversation. Any reply still streaming is abandoned and
    /// will not touch the new history.
    pub async fn clear(&self) {
        for mut turn in self.turns.iter_mut() {
            log::warn!("Cancelling in-flight turn {}", turn.key());
            *turn.value_mut() = true;
        }
        self.history.lock().await.clear();
        self.persisted.set(Vec::new()).await;
        self.emit(ChatEvent::Cleared);
    }

    /// Picks up a stored conversation when consent allows it, otherwise drops
    /// the stored copy. The live conversation is never discarded here.
    pub async fn reconcile(&self) {
        self.persisted.reconcile().await;
        let mut history = self.history.lock().await;
        if history.is_empty() {
            *history = self.persisted.get();
            log::debug!("Loaded {} stored chat messages", history.len());
        } else if self.persisted.is_granted() {
            let snapshot = history.clone();
            drop(history);
            self.persisted.set(snapshot).await;
        }
    }

    /// One-off question that bypasses the conversation, e.g. a new pet checklist.
    pub async fn ask_once(&self, prompt: &str) -> anyhow::Result<String> {
        self.provider.reply(&[ChatMessage::user(prompt)]).await
    }

    async fn run_turn(&self, new_text: Option<String>) -> TurnOutcome {
        let turn_id = Uuid::new_v4();
        let placeholder = ChatMessage::assistant("");

        // The turn is registered and the history written while the lock is held,
        // so a concurrent clear() either cancels this turn or runs after it.
        let request = {
            let mut history = self.history.lock().await;
            if self.is_streaming() {
                log::warn!("Turn {}: rejected, another reply is still streaming", turn_id);
                return TurnOutcome::Busy;
            }
            match new_text {
                Some(text) => {
                    let message = ChatMessage::user(text);
                    history.push(message.clone());
                    self.emit(ChatEvent::UserMessage(message));
                }
                None => {
                    let end = history.len() - usize::from(history.last().is_some_and(|m| m.is_error));
                    if !history[..end].last().is_some_and(|m| m.sender == Sender::User) {
                        log::debug!("Retry requested but history does not end with a user message");
                        return TurnOutcome::Skipped;
                    }
                    history.truncate(end);
                }
            }
            let request = history.clone();
            self.turns.insert(turn_id, false);
            history.push(placeholder.clone());
            self.persisted.set(request.clone()).await;
            request
        };

        self.emit(ChatEvent::Started {
            turn_id,
            message_id: placeholder.id,
        });
        log::info!("Turn {}: streaming reply to {} messages", turn_id, request.len());

        let result = self.stream_into(turn_id, placeholder.id, &request).await;
        let cancelled = self.turns.remove(&turn_id).map(|(_, c)| c).unwrap_or(true);

        let outcome = match result {
            Ok(TurnOutcome::Completed) => {
                self.persist_history().await;
                self.emit(ChatEvent::Finished {
                    turn_id,
                    message_id: placeholder.id,
                });
                TurnOutcome::Completed
            }
            Ok(other) => other,
            Err(_) if cancelled => TurnOutcome::Cancelled,
            Err(e) => {
                log::error!("Turn {}: assistant request failed: {:?}", turn_id, e);
                let message = ChatMessage::error(GENERIC_ERROR);
                let replaced = {
                    let mut history = self.history.lock().await;
                    let before = history.len();
                    history.retain(|m| m.id != placeholder.id);
                    let replaced = history.len() != before;
                    if replaced {
                        history.push(message.clone());
                    }
                    replaced
                };
                if replaced {
                    self.persist_history().await;
                    self.emit(ChatEvent::Failed { turn_id, message });
                    TurnOutcome::Failed
                } else {
                    // Placeholder is gone, so the history was reset under us
                    TurnOutcome::Cancelled
                }
            }
        };

        if outcome == TurnOutcome::Cancelled {
            log::warn!("Turn {}: cancelled, reply discarded", turn_id);
            self.emit(ChatEvent::Cancelled { turn_id });
        }
        outcome
    }

    async fn stream_into(
        &self,
        turn_id: Uuid,
        message_id: Uuid,
        request: &[ChatMessage],
    ) -> anyhow::Result<TurnOutcome> {
        let mut delta_stream = self.provider.stream_reply(request).await?;
        let mut full_content = String::new();

        while let Some(delta) = delta_stream.next().await {
            let delta = delta?;
            if self.is_cancelled(turn_id) {
                return Ok(TurnOutcome::Cancelled);
            }
            full_content.push_str(&delta);
            if !self.replace_text(message_id, &full_content).await {
                // Placeholder is gone, so the history was reset under us
                return Ok(TurnOutcome::Cancelled);
            }
            self.emit(ChatEvent::Chunk {
                turn_id,
                message_id,
                text: full_content.clone(),
            });
        }

        if self.is_cancelled(turn_id) {
            return Ok(TurnOutcome::Cancelled);
        }
        log::info!("Turn {}: reply complete ({} chars)", turn_id, full_content.len());
        Ok(TurnOutcome::Completed)
    }

    async fn replace_text(&self, message_id: Uuid, text: &str) -> bool {
        let mut history = self.history.lock().await;
        match history.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.text = text.to_string();
                true
            }
            None => false,
        }
    }

    fn is_cancelled(&self, turn_id: Uuid) -> bool {
        self.turns.get(&turn_id).map(|c| *c).unwrap_or(true)
    }

    async fn persist_history(&self) {
        // Held until the write lands so a later clear() is stored after it
        let history = self.history.lock().await;
        let snapshot: Vec<ChatMessage> = history
            .iter()
            .filter(|m| !(m.sender == Sender::Assistant && m.text.is_empty()))
            .cloned()
            .collect();
        self.persisted.set(snapshot).await;
    }

    fn emit(&self, event: ChatEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}
