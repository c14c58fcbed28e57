//! In-process backends.
//!
//! `MemorySlotStore` and `MemoryRemoteStore` keep everything in memory behind
//! a shared lock. Clones share state, so a test can hand one clone to a
//! `ConfigStore` and inspect or tamper with the other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{RemoteDocument, RemoteLocation, RemoteStore, Revision, SlotStore};
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, slot: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots.lock().await.get(slot).cloned())
    }

    async fn write(&self, slot: &str, text: &str) -> Result<(), StoreError> {
        self.slots.lock().await.insert(slot.to_string(), text.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RemoteState {
    files: HashMap<RemoteLocation, RemoteDocument>,
    messages: Vec<String>,
    counter: u64,
    unauthorized: bool,
}

impl RemoteState {
    fn next_revision(&mut self) -> Revision {
        self.counter += 1;
        Revision(format!("rev-{}", self.counter))
    }
}

/// Remote repository fake with the same precondition rules as the real one.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every call as if the credential were invalid.
    pub fn unauthorized() -> Self {
        Self {
            state: Arc::new(Mutex::new(RemoteState {
                unauthorized: true,
                ..RemoteState::default()
            })),
        }
    }

    /// Change a file behind the facade's back, as another client would.
    pub async fn insert_external(&self, location: &RemoteLocation, content: &str) -> Revision {
        let mut state = self.state.lock().await;
        let revision = state.next_revision();
        state.files.insert(
            location.clone(),
            RemoteDocument {
                content: content.to_string(),
                revision: revision.clone(),
            },
        );
        revision
    }

    /// Commit messages of every successful `put`, oldest first.
    pub async fn commit_messages(&self) -> Vec<String> {
        self.state.lock().await.messages.clone()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, location: &RemoteLocation) -> Result<RemoteDocument, StoreError> {
        let state = self.state.lock().await;
        if state.unauthorized {
            return Err(StoreError::Auth("credential rejected".into()));
        }
        state
            .files
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    async fn put(
        &self,
        location: &RemoteLocation,
        content: &str,
        message: &str,
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let mut state = self.state.lock().await;
        if state.unauthorized {
            return Err(StoreError::Auth("credential rejected".into()));
        }
        let current = state.files.get(location).map(|doc| &doc.revision);
        if current != expected {
            return Err(StoreError::Conflict {
                location: location.to_string(),
                message: match (current, expected) {
                    (Some(_), None) => "file already exists".into(),
                    (None, Some(_)) => "file no longer exists".into(),
                    _ => "file changed since it was read".into(),
                },
            });
        }
        let revision = state.next_revision();
        state.files.insert(
            location.clone(),
            RemoteDocument {
                content: content.to_string(),
                revision: revision.clone(),
            },
        );
        state.messages.push(message.to_string());
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> RemoteLocation {
        RemoteLocation::new("o", "r", "frigate.yml", "main")
    }

    #[tokio::test]
    async fn slots_are_shared_between_clones() {
        let a = MemorySlotStore::new();
        let b = a.clone();
        a.write("s", "x").await.unwrap();
        assert_eq!(b.read("s").await.unwrap().as_deref(), Some("x"));
        assert_eq!(b.read("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_enforces_preconditions() {
        let remote = MemoryRemoteStore::new();
        assert_eq!(remote.revision(&loc()).await.unwrap(), None);

        let first = remote.put(&loc(), "a", "create", None).await.unwrap();
        let err = remote.put(&loc(), "b", "create again", None).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        let stale = Revision("rev-0".into());
        let err = remote.put(&loc(), "b", "stale", Some(&stale)).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        let second = remote.put(&loc(), "b", "update", Some(&first)).await.unwrap();
        assert_eq!(remote.revision(&loc()).await.unwrap(), Some(second));
        assert_eq!(remote.commit_messages().await, vec!["create", "update"]);
    }

    #[tokio::test]
    async fn unauthorized_rejects_everything() {
        let remote = MemoryRemoteStore::unauthorized();
        assert_eq!(remote.get(&loc()).await.unwrap_err().kind(), "auth");
        assert_eq!(remote.revision(&loc()).await.unwrap_err().kind(), "auth");
        assert_eq!(
            remote.put(&loc(), "a", "m", None).await.unwrap_err().kind(),
            "auth"
        );
    }
}
