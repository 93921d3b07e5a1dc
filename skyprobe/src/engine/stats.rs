//! Engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters updated by the query path.
#[derive(Debug, Default)]
pub struct EngineStats {
    scenes_opened: AtomicU64,
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    best_effort_results: AtomicU64,
}

impl EngineStats {
    pub(crate) fn scene_opened(&self) {
        self.scenes_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn query_executed(&self, best_effort: bool) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
        if best_effort {
            self.best_effort_results.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn query_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            scenes_opened: self.scenes_opened.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            best_effort_results: self.best_effort_results.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatsSnapshot {
    pub scenes_opened: u64,
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub best_effort_results: u64,
}
