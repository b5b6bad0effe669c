use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{error::StoreError, id::SessionId, store::SessionStore};

/// In-process reference store: one map from identifier to serialized
/// payload behind its own lock, shared by cloning the handle.
///
/// Safe under concurrent access in isolation — it never relies on the
/// session service's lock. `create` overwrites an existing entry and
/// `delete` of an absent entry succeeds.
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<SessionId, Vec<u8>>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        MemoryStore {
            inner: self.inner.clone(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()).into(),
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl SessionStore for MemoryStore {
    async fn create(&self, id: &SessionId, payload: Vec<u8>) -> Result<(), StoreError> {
        let mut lock = self.inner.write().await;
        lock.insert(id.clone(), payload);
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Vec<u8>, StoreError> {
        let lock = self.inner.read().await;
        lock.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn save(&self, id: &SessionId, payload: Vec<u8>) -> Result<(), StoreError> {
        let mut lock = self.inner.write().await;
        lock.insert(id.clone(), payload);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        let mut lock = self.inner.write().await;
        lock.remove(id);
        Ok(())
    }
}
