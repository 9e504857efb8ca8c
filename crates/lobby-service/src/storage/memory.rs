//! In-memory chat storage.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use lobby_core::{
    model::{Message, Participant},
    traits::{ChatStore, MessageFilter, StoreError},
    visibility,
};

/// Both collections live under one lock so the compound operations are
/// atomic with respect to each other.
#[derive(Default)]
struct Inner {
    participants: HashMap<String, i64>,
    messages: Vec<Message>,
}

/// In-memory storage implementation.
///
/// Useful for development and single-process deployments.
/// Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_participant(
        &self,
        participant: &Participant,
        notice: &Message,
    ) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        if inner.participants.contains_key(&participant.name) {
            return Ok(false);
        }

        inner
            .participants
            .insert(participant.name.clone(), participant.last_seen);
        inner.messages.push(notice.clone());

        Ok(true)
    }

    async fn touch_participant(&self, name: &str, last_seen: i64) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        let Some(seen) = inner.participants.get_mut(name) else {
            return Ok(false);
        };

        *seen = last_seen;
        Ok(true)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .read()?
            .participants
            .iter()
            .map(|(name, last_seen)| Participant {
                name: name.clone(),
                last_seen: *last_seen,
            })
            .collect())
    }

    async fn append_from_registered(&self, message: &Message) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        if !inner.participants.contains_key(&message.from) {
            return Ok(false);
        }

        inner.messages.push(message.clone());
        Ok(true)
    }

    async fn list_messages(&self, filter: MessageFilter) -> Result<Vec<Message>, StoreError> {
        let inner = self.read()?;
        Ok(visibility::select_visible(
            &inner.messages,
            filter.viewer.as_deref(),
            filter.limit,
        ))
    }

    async fn evict_if_stale(
        &self,
        name: &str,
        cutoff: i64,
        notice: &Message,
    ) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        match inner.participants.get(name) {
            Some(last_seen) if *last_seen < cutoff => {}
            _ => return Ok(false),
        }

        inner.participants.remove(name);
        inner.messages.push(notice.clone());
        Ok(true)
    }
}
