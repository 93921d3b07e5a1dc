//! Query results.

use serde::Serialize;

use crate::classify::CollisionVerdict;
use crate::geodesy::{CoordinateConverter, GeodeticPosition};
use crate::raycast::{Axis, CastOutcome, CastStrategy, HitKind, Intersection};
use crate::readiness::ReadinessState;
use crate::scene::FeatureAttributes;

/// Answer to one collision query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionResult {
    /// The queried position, echoed back.
    pub position: GeodeticPosition,
    pub verdict: CollisionVerdict,
    /// Distance to the governing hit, even when it is too far to matter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_distance: Option<f64>,
    /// Height above the ellipsoid of the hit point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_point_height: Option<f64>,
    /// Height of the hit object's top; falls back to the hit point height
    /// when the tile does not declare one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_object_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_kind: Option<HitKind>,
    /// Multi-axis casts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<FeatureAttributes>,
    /// The readiness wait timed out and tiles were still loading when the
    /// cast ran. A shared scene that timed out at startup stops producing
    /// best-effort results once its stragglers arrive.
    pub best_effort: bool,
    /// Tiles still loading at cast time.
    pub pending_tiles: usize,
    pub strategy: CastStrategy,
    pub readiness: ReadinessState,
}

impl CollisionResult {
    pub(crate) fn new(
        position: GeodeticPosition,
        verdict: CollisionVerdict,
        hit: Option<&Intersection>,
        outcome: &CastOutcome,
        readiness: ReadinessState,
        pending_tiles: usize,
        converter: &CoordinateConverter,
    ) -> Self {
        let hit_point_height = hit
            .and_then(|h| converter.to_geodetic(&h.point).ok())
            .map(|p| p.height());

        Self {
            position,
            verdict,
            hit_distance: hit.map(|h| h.distance),
            hit_point_height,
            hit_object_height: hit.and_then(|h| h.object_height).or(hit_point_height),
            hit_kind: hit.map(|h| h.kind),
            axis: outcome.axis,
            attributes: hit
                .and_then(|h| h.attributes.as_deref())
                .filter(|a| !a.is_empty())
                .cloned(),
            best_effort: readiness.is_best_effort() && pending_tiles > 0,
            pending_tiles,
            strategy: outcome.strategy,
            readiness,
        }
    }

    /// Legacy boolean: true only when the probe is inside geometry.
    pub fn collision(&self) -> bool {
        self.verdict.is_collision()
    }
}
