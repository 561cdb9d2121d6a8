//! # tether-core
//!
//! Shared vocabulary for the tether gateway adapter.
//!
//! tether adapts a message-oriented gateway transport (one invocation per
//! websocket frame) to applications written against a persistent,
//! bidirectional connection protocol. This crate provides the types both
//! sides agree on:
//!
//! - **Branded IDs**: [`ConnectionId`] (transport-assigned) and
//!   [`InvocationId`] (locally generated, log correlation)
//! - **Events**: [`ProtocolEvent`] — the bidirectional event vocabulary —
//!   and [`FrameData`] for text/binary payloads
//! - **Request/result types**: [`ConnectionScope`], [`ConnectionRequest`],
//!   [`CycleResult`]
//! - **Errors**: [`AppError`], the explicit exit variants of an application
//! - **Event channel**: the ordered FIFO queue pairing the lifecycle
//!   controller with the application task
//! - **Application boundary**: the [`WsApplication`] trait

#![deny(unsafe_code)]

pub mod app;
pub mod channel;
pub mod errors;
pub mod events;
pub mod ids;
pub mod types;

pub use app::WsApplication;
pub use channel::{ChannelClosed, EventReceiver, EventSender, channel};
pub use errors::AppError;
pub use events::{FrameData, ProtocolEvent};
pub use ids::{ConnectionId, InvocationId};
pub use types::{ConnectionRequest, ConnectionScope, CycleResult, InvocationKind, Peer};
