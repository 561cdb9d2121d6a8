//! # tether-runtime
//!
//! The per-invocation lifecycle controller for the tether gateway adapter.
//!
//! A gateway delivers each websocket frame as a discrete invocation with
//! no persistent process state, while the application protocol assumes a
//! continuously running bidirectional session. [`WsCycle`] bridges the
//! two: it owns the connection state machine for one invocation, runs the
//! application cooperatively, and folds the application's protocol events
//! into the single HTTP-shaped result the gateway expects.

#![deny(unsafe_code)]

pub mod config;
pub mod cycle;
pub mod state;

pub use config::CycleConfig;
pub use cycle::WsCycle;
pub use state::LifecycleState;
