//! Application boundary.
//!
//! An application is any component implementing the three-argument calling
//! convention: a connection scope plus one receive and one send
//! capability. The capabilities are thin wrappers over the event channel —
//! the underlying queue is never exposed.

use async_trait::async_trait;

use crate::channel::{EventReceiver, EventSender};
use crate::errors::AppError;
use crate::types::ConnectionScope;

/// A websocket application driven by the lifecycle controller.
///
/// `call` runs once per gateway invocation, to completion or failure.
/// `events.recv()` yields the single inbound event synthesized for the
/// invocation — the first receive is guaranteed to observe it if the
/// application receives before sending. `emitter.send(..)` enqueues
/// outbound events, captured by the controller in emission order.
///
/// Each invocation represents one discrete frame, not a continuous
/// session: a receive beyond the injected event suspends until the host
/// deadline ends the invocation, so applications targeting this adapter
/// should return after handling one event.
#[async_trait]
pub trait WsApplication: Send + Sync {
    /// Run the application for one invocation.
    async fn call(
        &self,
        scope: ConnectionScope,
        events: EventReceiver,
        emitter: EventSender,
    ) -> Result<(), AppError>;
}
