//! Chat service for presence and message operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lobby_core::{
    ChatConfig, Clock, SystemClock,
    model::{JOIN_NOTICE, Message, MessageKind, Participant},
    traits::{ChatStore, MessageFilter, StoreError},
};

/// Chat service error.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Name already taken: {0}")]
    Conflict(String),
    #[error("Participant not found: {0}")]
    NotFound(String),
    #[error("Unknown sender: {0}")]
    UnknownSender(String),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ChatError> {
    if value.is_empty() {
        return Err(ChatError::InvalidArgument(format!("`{field}` is required")));
    }
    Ok(value)
}

/// Service owning the store handle and the presence rules.
///
/// Every operation is a single call into the store; the store's compound
/// operations carry the atomicity, so the service keeps no locks of its own.
pub struct ChatService<S>
where
    S: ChatStore,
{
    store: S,
    clock: Arc<dyn Clock>,
    config: ChatConfig,
}

impl<S> ChatService<S>
where
    S: ChatStore,
{
    /// Create a service on the wall clock.
    #[must_use]
    pub fn new(store: S, config: ChatConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a service with an explicit time source.
    #[must_use]
    pub fn with_clock(store: S, config: ChatConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Timing configuration.
    #[must_use]
    pub const fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register `name` and announce it to everyone.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty name, `Conflict` if it is taken.
    pub async fn join(&self, name: &str) -> Result<(), ChatError> {
        let name = require("name", name)?;
        let now = self.clock.now();

        let participant = Participant::new(name, now);
        let notice = Message::status(name, JOIN_NOTICE, now);

        if !self.store.insert_participant(&participant, &notice).await? {
            return Err(ChatError::Conflict(name.to_owned()));
        }

        tracing::info!("{name} joined");
        Ok(())
    }

    /// Record that `name` is still around.
    ///
    /// # Errors
    /// `NotFound` if `name` is not registered.
    pub async fn heartbeat(&self, name: &str) -> Result<(), ChatError> {
        let now = self.clock.now().timestamp_millis();
        if !self.store.touch_participant(name, now).await? {
            return Err(ChatError::NotFound(name.to_owned()));
        }

        tracing::debug!(name, last_seen = now, "heartbeat");
        Ok(())
    }

    /// Everyone currently registered.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn participants(&self) -> Result<Vec<Participant>, ChatError> {
        Ok(self.store.list_participants().await?)
    }

    /// Post a message from `from`.
    ///
    /// Input is validated before the sender is looked up.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty field or a kind clients may not send,
    /// `UnknownSender` if `from` is not registered when the message lands.
    pub async fn send(
        &self,
        from: &str,
        to: &str,
        text: &str,
        kind: &str,
    ) -> Result<Message, ChatError> {
        let to = require("to", to)?;
        let text = require("text", text)?;
        let kind = MessageKind::parse_client(kind).ok_or_else(|| {
            ChatError::InvalidArgument(format!(
                "`type` must be `message` or `private_message`, got `{kind}`"
            ))
        })?;

        let message = Message::new(from, to, text, kind, self.clock.now());
        if !self.store.append_from_registered(&message).await? {
            return Err(ChatError::UnknownSender(from.to_owned()));
        }

        tracing::debug!(from, to, kind = kind.as_str(), "message sent");
        Ok(message)
    }

    /// Messages `viewer` may see, oldest first, optionally only the last
    /// `limit` of them.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn messages(
        &self,
        viewer: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, ChatError> {
        let filter = MessageFilter::visible_to(viewer).with_limit(limit.filter(|l| *l > 0));
        Ok(self.store.list_messages(filter).await?)
    }
}
