//! Protocol event vocabulary for the application boundary.
//!
//! One [`ProtocolEvent`] is one unit of the bidirectional connection
//! protocol. Inbound events (`connect`, `receive`, `disconnect`) are
//! synthesized by the lifecycle controller from gateway invocations;
//! outbound events (`accept`, `send`, `close`) are emitted by the
//! application and captured by the controller to build the invocation
//! result.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Payload of a data frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameData {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
}

impl FrameData {
    /// Build a payload from raw gateway bytes.
    ///
    /// The gateway hands the adapter a body with no frame-type
    /// discriminator: valid UTF-8 becomes a text frame, anything else is
    /// carried as binary. Payload bytes are preserved exactly either way.
    #[must_use]
    pub fn from_bytes(bytes: Bytes) -> Self {
        match std::str::from_utf8(&bytes) {
            Ok(text) => Self::Text(text.to_owned()),
            Err(_) => Self::Binary(bytes),
        }
    }

    /// Payload bytes regardless of frame type.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Whether this is a text frame.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// One unit of the bidirectional application protocol.
///
/// Tagged for the wire so scripted clients and diagnostics can read
/// captured transcripts as JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Handshake opener, delivered on a `connect` invocation.
    Connect,

    /// Application accepted the handshake.
    Accept {
        /// Negotiated subprotocol, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subprotocol: Option<String>,
        /// Extra response headers to surface to the transport.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        headers: Vec<(String, String)>,
    },

    /// One data frame from the client, delivered on a `message` invocation.
    Receive {
        /// Frame payload.
        data: FrameData,
    },

    /// One data frame from the application to the client.
    Send {
        /// Frame payload.
        data: FrameData,
    },

    /// Close the connection — a rejection during handshake, or teardown.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Optional close reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Peer went away, delivered on a `disconnect` invocation.
    Disconnect {
        /// WebSocket close code.
        code: u16,
    },
}

impl ProtocolEvent {
    /// Plain accept with no subprotocol or extra headers.
    #[must_use]
    pub fn accept() -> Self {
        Self::Accept {
            subprotocol: None,
            headers: Vec::new(),
        }
    }

    /// Accept negotiating the given subprotocol.
    #[must_use]
    pub fn accept_subprotocol(subprotocol: impl Into<String>) -> Self {
        Self::Accept {
            subprotocol: Some(subprotocol.into()),
            headers: Vec::new(),
        }
    }

    /// Close with the given code and no reason.
    #[must_use]
    pub fn close(code: u16) -> Self {
        Self::Close { code, reason: None }
    }

    /// Outbound text frame.
    #[must_use]
    pub fn send_text(text: impl Into<String>) -> Self {
        Self::Send {
            data: FrameData::Text(text.into()),
        }
    }

    /// Outbound binary frame.
    #[must_use]
    pub fn send_binary(bytes: impl Into<Bytes>) -> Self {
        Self::Send {
            data: FrameData::Binary(bytes.into()),
        }
    }

    /// Wire tag of this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Accept { .. } => "accept",
            Self::Receive { .. } => "receive",
            Self::Send { .. } => "send",
            Self::Close { .. } => "close",
            Self::Disconnect { .. } => "disconnect",
        }
    }

    /// Whether the controller synthesizes this event (controller → app).
    #[must_use]
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Self::Connect | Self::Receive { .. } | Self::Disconnect { .. }
        )
    }

    /// Whether the application emits this event (app → controller).
    #[must_use]
    pub fn is_outbound(&self) -> bool {
        !self.is_inbound()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
