//! Application-boundary error taxonomy.
//!
//! Every way an application run can end is an explicit variant rather
//! than an opaque panic or a raised condition, so the controller can map
//! each exit path to a gateway status code in one place.

use thiserror::Error;

use crate::events::ProtocolEvent;

/// Terminal failure classes an application can signal.
///
/// The lifecycle controller converts these into the invocation result:
/// nothing escapes past the controller boundary, and failure details are
/// logged rather than serialized into the transport response.
#[derive(Debug, Error)]
pub enum AppError {
    /// The connection is closed, or the event was invalid for the current
    /// connection phase. Treated as a handshake-rejection class failure.
    #[error("connection closed (code {code})")]
    Closed {
        /// WebSocket close code.
        code: u16,
    },

    /// The application received an event type it did not expect in its
    /// current internal phase.
    #[error("unexpected {event_type} event")]
    UnexpectedEvent {
        /// Wire tag of the offending event.
        event_type: String,
    },

    /// Any other application failure.
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl AppError {
    /// Closed with the given websocket close code.
    #[must_use]
    pub fn closed(code: u16) -> Self {
        Self::Closed { code }
    }

    /// Unexpected-event error for the given event.
    #[must_use]
    pub fn unexpected(event: &ProtocolEvent) -> Self {
        Self::UnexpectedEvent {
            event_type: event.event_type().to_owned(),
        }
    }

    /// Gateway status code this failure maps to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Closed { .. } => 403,
            Self::UnexpectedEvent { .. } | Self::Fault(_) => 500,
        }
    }

    /// Short classification string for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::UnexpectedEvent { .. } => "unexpected_event",
            Self::Fault(_) => "fault",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
