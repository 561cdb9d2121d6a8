//! Connection lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The state of one adapted websocket connection.
///
/// Exactly one controller instance owns exactly one state value at a
/// time; transitions are controller-internal and only ever move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Initial state of a `connect` invocation, before the handshake
    /// opener has been delivered to the application.
    Connecting,
    /// Handshake opener delivered; the application answers by accepting
    /// or rejecting. An accepted connection finishes its `connect`
    /// invocation here.
    Handshake,
    /// Initial state of a `message` invocation: the handshake completed
    /// on an earlier invocation and data frames flow.
    Response,
    /// Initial state of a `disconnect` invocation: the peer went away and
    /// the application is being told.
    Disconnecting,
    /// The connection is finished — the application closed it, rejected
    /// the handshake, or acknowledged the disconnect.
    Closed,
}

impl LifecycleState {
    fn rank(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Handshake => 1,
            Self::Response => 2,
            Self::Disconnecting => 3,
            Self::Closed => 4,
        }
    }

    /// Whether `next` is reachable from `self`.
    ///
    /// Transitions only move forward; in particular `Closed` is reachable
    /// directly from `Handshake` when the application rejects the
    /// handshake.
    #[must_use]
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        self.rank() < next.rank()
    }

    /// Whether this is the terminal state.
    #[must_use]
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Handshake => write!(f, "handshake"),
            Self::Response => write!(f, "response"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
