//! Cycle configuration.

use std::time::Duration;

use serde::Deserialize;

/// Tuning for one invocation cycle.
///
/// Deserializable so embedding hosts can load it from their own
/// configuration layer; the adapter itself reads no configuration files.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CycleConfig {
    /// Host invocation budget.
    ///
    /// The controller imposes no timeout of its own. An application that
    /// parks on a second receive — each invocation carries exactly one
    /// inbound event — can only be cut off by this deadline, which maps
    /// the hang to a 500 result. Hosts that leave it unset MUST bound the
    /// invocation externally or the wait is unbounded.
    #[serde(default)]
    pub deadline: Option<Duration>,

    /// Copy captured outbound frame bytes into the result body.
    ///
    /// Off by default: most gateway transports cannot push frames in the
    /// HTTP response, so the body stays empty and the captured transcript
    /// is only observable through the controller.
    #[serde(default)]
    pub echo_frames: bool,
}

impl CycleConfig {
    /// Config with the given deadline and defaults otherwise.
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
