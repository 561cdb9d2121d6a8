//! # tether-store
//!
//! Connection tracking for the tether gateway adapter.
//!
//! The transport delivers each frame of a logical session as a separate
//! invocation, so the association between a connection identifier and its
//! handshake context must live outside the controller. [`ConnectionStore`]
//! is that injected interface: a key-value surface indexed by
//! [`ConnectionId`]. Real deployments back it with an external service;
//! tests and single-process hosts use [`MemoryStore`].

#![deny(unsafe_code)]

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_core::ids::ConnectionId;
use tether_core::types::ConnectionScope;
use thiserror::Error;

/// Snapshot of one tracked connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Scope captured when the handshake was accepted.
    pub scope: ConnectionScope,
    /// When the handshake was accepted.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionRecord {
    /// Record the given scope as connected now.
    #[must_use]
    pub fn new(scope: ConnectionScope) -> Self {
        Self {
            scope,
            connected_at: Utc::now(),
        }
    }
}

/// Store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service failed.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value interface over connection records.
///
/// Implementations must be safe to share across invocations; the
/// controller only ever touches the record for its own connection
/// identifier.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert or replace the record for a connection.
    async fn put(&self, id: &ConnectionId, record: ConnectionRecord) -> Result<(), StoreError>;

    /// Fetch the record for a connection.
    async fn get(&self, id: &ConnectionId) -> Result<Option<ConnectionRecord>, StoreError>;

    /// Remove the record for a connection. Returns whether it existed.
    async fn remove(&self, id: &ConnectionId) -> Result<bool, StoreError>;

    /// Number of tracked connections.
    async fn count(&self) -> Result<usize, StoreError>;
}
