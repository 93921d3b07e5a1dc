//! One query against one scene: cast, classify, build the result.

use std::sync::Arc;

use tracing::debug;

use super::result::CollisionResult;
use super::stats::EngineStats;
use crate::classify::CollisionClassifier;
use crate::geodesy::{CoordinateConverter, GeodeticPosition};
use crate::raycast::RayCaster;
use crate::readiness::{ReadinessState, ReadinessTracker};

/// The pure part of a query, shared by both concurrency models.
#[derive(Debug, Clone)]
pub(crate) struct QueryContext {
    pub caster: RayCaster,
    pub classifier: CollisionClassifier,
    pub converter: CoordinateConverter,
    pub stats: Arc<EngineStats>,
}

impl QueryContext {
    /// Run against whatever the scene holds right now.
    pub fn evaluate(
        &self,
        scene: &ReadinessTracker,
        position: GeodeticPosition,
        readiness: ReadinessState,
    ) -> CollisionResult {
        let snapshot = scene.scene().snapshot();
        let outcome = self.caster.cast(&snapshot, &position);
        let (verdict, hit) = self.classifier.classify_outcome(&outcome);

        let result = CollisionResult::new(
            position,
            verdict,
            hit,
            &outcome,
            readiness,
            snapshot.pending(),
            &self.converter,
        );
        self.stats.query_executed(result.best_effort);

        debug!(
            position = %position,
            verdict = %result.verdict,
            strategy = %result.strategy,
            best_effort = result.best_effort,
            pending = result.pending_tiles,
            tiles = snapshot.tiles().len(),
            "Query evaluated"
        );
        result
    }
}
