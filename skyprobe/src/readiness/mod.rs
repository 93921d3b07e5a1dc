//! Scene readiness tracking.
//!
//! A freshly opened scene is not worth querying until its tiles have
//! streamed in. The [`ReadinessTracker`] drains the tile event stream into
//! the [`crate::scene::SceneAsset`] and resolves exactly once:
//!
//! ```text
//! Unloaded ──► Loading ──┬──► Ready     (pending == 0 and geometry present)
//!                        └──► TimedOut  (deadline elapsed first)
//! ```
//!
//! Resolution is broadcast over a `tokio::sync::watch` channel, so any
//! number of waiters are released together. Streaming continues in the
//! background after resolution.

mod tracker;

pub use tracker::{ReadinessTracker, TrackerClosed};

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Default readiness deadline.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(20);

/// Lifecycle of a scene's readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// Scene created, streaming not started.
    Unloaded,
    /// Tiles are streaming in.
    Loading,
    /// Every requested tile settled and geometry is present.
    Ready,
    /// The deadline elapsed first; queries are best-effort.
    TimedOut,
}

impl ReadinessState {
    /// Whether waiters have been released.
    pub fn is_resolved(self) -> bool {
        matches!(self, ReadinessState::Ready | ReadinessState::TimedOut)
    }

    /// Results produced in this state must be flagged best-effort.
    pub fn is_best_effort(self) -> bool {
        self == ReadinessState::TimedOut
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadinessState::Unloaded => "unloaded",
            ReadinessState::Loading => "loading",
            ReadinessState::Ready => "ready",
            ReadinessState::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}
