//! Request and result types exchanged with the gateway integration layer.
//!
//! The integration layer parses and authenticates the raw transport event
//! before building a [`ConnectionRequest`]; the adapter hands back a
//! [`CycleResult`] for serialization to the transport. Both directions are
//! plain data — no transport I/O happens inside the adapter.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// Network peer address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Host or IP.
    pub host: String,
    /// Port number.
    pub port: u16,
}

/// Immutable protocol metadata for one logical connection.
///
/// Captured at handshake time and persisted by the connection store so
/// later invocations can rebuild the same context.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionScope {
    /// Request path.
    pub path: String,
    /// Raw query string, possibly empty.
    #[serde(default)]
    pub query_string: String,
    /// Header list in transport order.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Client address, when the transport exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Peer>,
    /// Server address, when the transport exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<Peer>,
    /// Subprotocols offered by the client.
    #[serde(default)]
    pub subprotocols: Vec<String>,
}

impl ConnectionScope {
    /// Scope for the given path with everything else empty.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// First header value matching `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Which discrete gateway message an invocation carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    /// Client is opening the connection.
    Connect,
    /// Client sent one data frame.
    Message,
    /// Client went away.
    Disconnect,
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Message => write!(f, "message"),
            Self::Disconnect => write!(f, "disconnect"),
        }
    }
}

/// Per-invocation input supplied by the gateway integration layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Protocol metadata for the logical connection.
    pub scope: ConnectionScope,
    /// Message-type discriminator.
    pub kind: InvocationKind,
    /// Transport-assigned connection identifier.
    pub connection_id: ConnectionId,
}

impl ConnectionRequest {
    /// Build a request.
    #[must_use]
    pub fn new(kind: InvocationKind, connection_id: ConnectionId, scope: ConnectionScope) -> Self {
        Self {
            scope,
            kind,
            connection_id,
        }
    }
}

/// HTTP-shaped result returned to the gateway for serialization.
///
/// Produced exactly once per invocation, after the application task
/// terminated or a terminal protocol event was observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    /// Status code.
    pub status: u16,
    /// Response headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl CycleResult {
    /// Result with the given status and no headers or body.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// 200 with no headers or body.
    #[must_use]
    pub fn ok() -> Self {
        Self::from_status(200)
    }

    /// 403 — handshake rejection class.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::from_status(403)
    }

    /// 500 — protocol violation or application fault.
    #[must_use]
    pub fn server_error() -> Self {
        Self::from_status(500)
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Default for CycleResult {
    fn default() -> Self {
        Self::ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
