use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StateError, StateStore};

/// Process-local store. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    sessions: RwLock<HashMap<Uuid, HashMap<String, Value>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, session: Uuid, key: &str) -> Result<Option<Value>, StateError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session).and_then(|values| values.get(key)).cloned())
    }

    async fn save(&self, session: Uuid, key: &str, value: Value) -> Result<(), StateError> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session).or_default().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, session: Uuid, key: &str) -> Result<(), StateError> {
        let mut sessions = self.sessions.write().await;
        if let Some(values) = sessions.get_mut(&session) {
            values.remove(key);
            if values.is_empty() {
                sessions.remove(&session);
            }
        }
        Ok(())
    }

    async fn clear(&self, session: Uuid) -> Result<(), StateError> {
        self.sessions.write().await.remove(&session);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StateError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
