//! In-memory connection store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tether_core::ids::ConnectionId;

use crate::{ConnectionRecord, ConnectionStore, StoreError};

/// `RwLock<HashMap>`-backed [`ConnectionStore`] for tests and
/// single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<ConnectionId, ConnectionRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn put(&self, id: &ConnectionId, record: ConnectionRecord) -> Result<(), StoreError> {
        let _ = self.records.write().insert(id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &ConnectionId) -> Result<Option<ConnectionRecord>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn remove(&self, id: &ConnectionId) -> Result<bool, StoreError> {
        Ok(self.records.write().remove(id).is_some())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
