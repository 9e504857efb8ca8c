//! Storage contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Message, Participant};

/// Message query.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Restrict to messages this participant may see. `None` sees
    /// broadcasts only.
    pub viewer: Option<String>,
    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl MessageFilter {
    /// Filter for everything `viewer` may see.
    #[must_use]
    pub fn visible_to(viewer: Option<&str>) -> Self {
        Self {
            viewer: viewer.map(str::to_owned),
            limit: None,
        }
    }

    /// Set the tail limit.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for chat storage backends.
///
/// The compound operations are atomic: either every write they describe is
/// applied or none is.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Register `participant` and append its join `notice`.
    ///
    /// Returns `false`, writing nothing, if the name is already taken.
    async fn insert_participant(
        &self,
        participant: &Participant,
        notice: &Message,
    ) -> Result<bool, StoreError>;

    /// Set a participant's `last_seen`. Returns `false` if it is not registered.
    async fn touch_participant(&self, name: &str, last_seen: i64) -> Result<bool, StoreError>;

    /// All registered participants.
    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError>;

    /// Append `message` if its sender is registered at the moment of the
    /// append. Returns `false`, writing nothing, otherwise.
    async fn append_from_registered(&self, message: &Message) -> Result<bool, StoreError>;

    /// Messages matching `filter`, in insertion order.
    async fn list_messages(&self, filter: MessageFilter) -> Result<Vec<Message>, StoreError>;

    /// Remove `name` if its `last_seen` is still older than `cutoff`, and
    /// append the departure `notice`.
    ///
    /// Returns `false`, writing nothing, if the participant is gone or has
    /// been seen since.
    async fn evict_if_stale(
        &self,
        name: &str,
        cutoff: i64,
        notice: &Message,
    ) -> Result<bool, StoreError>;
}
