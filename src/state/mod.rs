//! Per-browser client state.
//!
//! Every value the browser used to keep between screens (the active plan,
//! the in-progress booking, the recently booked slots, pending intents) is
//! stored here under a client session id. Each key has exactly one value
//! type, enforced through [`StateKey`]. Writes are last-writer-wins.

mod keys;
mod memory;
mod postgres;

pub use keys::*;
pub use memory::MemoryStateStore;
pub use postgres::{init_pool, PgStateStore};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State store error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not encode state value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Raw key/value storage, one namespace per client session.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, session: Uuid, key: &str) -> Result<Option<Value>, StateError>;
    async fn save(&self, session: Uuid, key: &str, value: Value) -> Result<(), StateError>;
    async fn remove(&self, session: Uuid, key: &str) -> Result<(), StateError>;
    /// Drop every key of a session.
    async fn clear(&self, session: Uuid) -> Result<(), StateError>;
    async fn ping(&self) -> Result<(), StateError>;
    fn backend(&self) -> &'static str;
}

/// A named slot in the client state with its value type.
pub trait StateKey {
    const NAME: &'static str;
    type Value: Serialize + DeserializeOwned + Send + Sync;
}

/// Typed view of one client session.
#[derive(Clone)]
pub struct ClientState {
    store: Arc<dyn StateStore>,
    session: Uuid,
}

impl ClientState {
    pub fn new(store: Arc<dyn StateStore>, session: Uuid) -> Self {
        Self { store, session }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Values that no longer decode are treated as absent.
    pub async fn get<K: StateKey>(&self) -> Result<Option<K::Value>, StateError> {
        let Some(raw) = self.store.load(self.session, K::NAME).await? else {
            return Ok(None);
        };
        match serde_json::from_value(raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = K::NAME, session = %self.session, error = %e, "Ignoring unreadable client state");
                Ok(None)
            }
        }
    }

    pub async fn put<K: StateKey>(&self, value: &K::Value) -> Result<(), StateError> {
        let raw = serde_json::to_value(value)?;
        self.store.save(self.session, K::NAME, raw).await
    }

    pub async fn remove<K: StateKey>(&self) -> Result<(), StateError> {
        self.store.remove(self.session, K::NAME).await
    }

    pub async fn clear(&self) -> Result<(), StateError> {
        self.store.clear(self.session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceType;
    use crate::scheduling::{ExclusionCache, RecentlyBookedSlot};
    use serde_json::json;

    fn client(store: &Arc<MemoryStateStore>) -> ClientState {
        ClientState::new(store.clone(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn typed_values_round_trip_per_session() {
        let store = Arc::new(MemoryStateStore::new());
        let alice = client(&store);
        let bob = client(&store);

        alice.put::<SelectedServiceKey>(&ServiceType::TestPrep).await.unwrap();

        assert_eq!(alice.get::<SelectedServiceKey>().await.unwrap(), Some(ServiceType::TestPrep));
        assert_eq!(bob.get::<SelectedServiceKey>().await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_writer_wins() {
        let store = Arc::new(MemoryStateStore::new());
        let state = client(&store);
        state.put::<SelectedServiceKey>(&ServiceType::Tutoring).await.unwrap();
        state.put::<SelectedServiceKey>(&ServiceType::Counseling).await.unwrap();
        assert_eq!(state.get::<SelectedServiceKey>().await.unwrap(), Some(ServiceType::Counseling));
    }

    #[tokio::test]
    async fn corrupt_values_read_as_absent() {
        let store = Arc::new(MemoryStateStore::new());
        let state = client(&store);
        store
            .save(state.session(), ActivePlanKey::NAME, json!({"unexpected": true}))
            .await
            .unwrap();
        assert!(state.get::<ActivePlanKey>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_drops_only_that_session() {
        let store = Arc::new(MemoryStateStore::new());
        let alice = client(&store);
        let bob = client(&store);
        let mut cache = ExclusionCache::default();
        cache.insert(RecentlyBookedSlot::new("t1", "2026-10-20", "10:00"));

        alice.put::<RecentlyBookedSlotsKey>(&cache).await.unwrap();
        bob.put::<RecentlyBookedSlotsKey>(&cache).await.unwrap();
        alice.clear().await.unwrap();

        assert!(alice.get::<RecentlyBookedSlotsKey>().await.unwrap().is_none());
        assert_eq!(bob.get::<RecentlyBookedSlotsKey>().await.unwrap().map(|c| c.len()), Some(1));
    }
}
