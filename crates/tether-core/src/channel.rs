//! Ordered event channel pairing the lifecycle controller with the
//! application task.
//!
//! Strict FIFO, unbounded, destructive single-consumer reads. `recv`
//! suspends while the queue is empty and at least one sender is live. One
//! channel instance carries one direction; the controller and the
//! application each hold exactly one role per instance, and roles never
//! swap mid-invocation.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::ProtocolEvent;

/// Error returned by [`EventSender::send`] once the receiving side is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("event channel closed")]
pub struct ChannelClosed;

/// Create a connected sender/receiver pair.
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Enqueue half of an event channel.
///
/// Cloneable so the controller can retain a handle while the application
/// holds its capability; sending never blocks.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ProtocolEvent>,
}

impl EventSender {
    /// Enqueue one event, waking a suspended receiver.
    pub fn send(&self, event: ProtocolEvent) -> Result<(), ChannelClosed> {
        self.tx.send(event).map_err(|_| ChannelClosed)
    }
}

/// Dequeue half of an event channel.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<ProtocolEvent>,
}

impl EventReceiver {
    /// Next event in insertion order.
    ///
    /// Suspends while the queue is empty; resolves to `None` once every
    /// sender has been dropped and the queue is drained. Within one
    /// gateway invocation only a single inbound event is ever injected,
    /// so a second `recv` on the inbound channel parks until the host
    /// deadline cuts the invocation off.
    pub async fn recv(&mut self) -> Option<ProtocolEvent> {
        self.rx.recv().await
    }

    /// Non-suspending dequeue, used by the controller to drain events the
    /// application emitted before completing.
    pub fn try_recv(&mut self) -> Option<ProtocolEvent> {
        self.rx.try_recv().ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
