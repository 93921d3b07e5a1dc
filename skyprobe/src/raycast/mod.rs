//! Ray casting against scene snapshots.
//!
//! The [`RayCaster`] turns a geodetic query point into one or more rays and
//! intersects them against a [`SceneSnapshot`]. Which rays, and which hits
//! are kept, is decided by the configured [`CastStrategy`]; strategies are
//! never mixed within one cast.
//!
//! Casting is pure: the same snapshot and position always produce the same
//! [`CastOutcome`].

mod strategy;

pub use strategy::{Axis, CastStrategy, UnknownStrategy, DEFAULT_DRILL_MAX_HITS};

use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::geodesy::{CartesianPosition, CoordinateConverter, GeodeticPosition};
use crate::geometry::Ray;
use crate::scene::{FeatureAttributes, LoadedTile, SceneSnapshot, TileId};

/// What a ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Terrain,
    TilesetFeature,
}

/// One ray/surface intersection.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub point: CartesianPosition,
    /// Distance from the query point in metres; zero when the point is
    /// inside geometry.
    pub distance: f64,
    pub kind: HitKind,
    pub tile: Option<TileId>,
    pub attributes: Option<Arc<FeatureAttributes>>,
    /// Declared height of the feature's top, for tileset hits.
    pub object_height: Option<f64>,
}

impl Intersection {
    fn terrain(ray: &Ray, distance: f64) -> Self {
        Self {
            point: ray.at(distance),
            distance,
            kind: HitKind::Terrain,
            tile: None,
            attributes: None,
            object_height: None,
        }
    }

    fn feature(ray: &Ray, distance: f64, tile: &LoadedTile) -> Self {
        Self {
            point: ray.at(distance),
            distance,
            kind: HitKind::TilesetFeature,
            tile: Some(tile.id.clone()),
            attributes: Some(Arc::clone(&tile.payload.attributes)),
            object_height: tile.payload.object_height,
        }
    }
}

/// Result of one cast.
#[derive(Debug, Clone)]
pub struct CastOutcome {
    pub strategy: CastStrategy,
    /// Axis that produced the hit, for multi-axis casts.
    pub axis: Option<Axis>,
    /// Hits ordered by ascending distance. Empty means no hit.
    pub hits: Vec<Intersection>,
}

impl CastOutcome {
    fn empty(strategy: CastStrategy) -> Self {
        Self {
            strategy,
            axis: None,
            hits: Vec::new(),
        }
    }

    pub fn is_hit(&self) -> bool {
        !self.hits.is_empty()
    }

    /// The closest hit.
    pub fn nearest(&self) -> Option<&Intersection> {
        self.hits.iter().min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Builds rays from query points and intersects them with a scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayCaster {
    converter: CoordinateConverter,
    strategy: CastStrategy,
}

impl RayCaster {
    pub fn new(strategy: CastStrategy) -> Self {
        Self {
            converter: CoordinateConverter::default(),
            strategy,
        }
    }

    pub fn with_converter(mut self, converter: CoordinateConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn strategy(&self) -> CastStrategy {
        self.strategy
    }

    /// Cast from `position` into `scene`.
    pub fn cast(&self, scene: &SceneSnapshot, position: &GeodeticPosition) -> CastOutcome {
        let origin = self.converter.to_cartesian(position);
        let down = -self.converter.up(position);

        let outcome = match self.strategy {
            CastStrategy::NearestSurface => match Ray::new(origin, down) {
                Some(ray) => CastOutcome {
                    strategy: self.strategy,
                    axis: None,
                    hits: nearest_hit(scene, &ray).into_iter().collect(),
                },
                None => CastOutcome::empty(self.strategy),
            },
            CastStrategy::MultiAxis => self.cast_axes(scene, origin),
            CastStrategy::Drill { max_hits } => match Ray::new(origin, down) {
                Some(ray) => CastOutcome {
                    strategy: self.strategy,
                    axis: None,
                    hits: all_hits(scene, &ray, max_hits),
                },
                None => CastOutcome::empty(self.strategy),
            },
        };

        trace!(
            strategy = %self.strategy,
            position = %position,
            hits = outcome.hits.len(),
            "Cast complete"
        );
        outcome
    }

    /// Try each axis in [`Axis::ORDER`] and stop at the first one that hits.
    ///
    /// Heuristic: only the six axis lines are sampled, so nearby geometry off
    /// every axis can be missed, and the reported distance is the first
    /// axis hit rather than the true nearest surface.
    fn cast_axes(&self, scene: &SceneSnapshot, origin: CartesianPosition) -> CastOutcome {
        for axis in Axis::ORDER {
            let Some(ray) = Ray::new(origin, axis.direction()) else {
                continue;
            };
            if let Some(hit) = nearest_hit(scene, &ray) {
                return CastOutcome {
                    strategy: self.strategy,
                    axis: Some(axis),
                    hits: vec![hit],
                };
            }
        }
        CastOutcome::empty(self.strategy)
    }
}

/// Every surface the ray meets, one hit per surface, in snapshot order.
fn surface_hits<'a>(
    scene: &'a SceneSnapshot,
    ray: &'a Ray,
) -> impl Iterator<Item = Intersection> + 'a {
    let terrain = scene
        .terrain()
        .and_then(|t| t.intersect(ray))
        .map(|d| Intersection::terrain(ray, d));

    let features = scene
        .tiles()
        .iter()
        .filter(move |tile| tile.bounds.map_or(true, |b| b.intersects(ray)))
        .filter_map(move |tile| {
            tile.payload
                .surface
                .intersect(ray)
                .map(|d| Intersection::feature(ray, d, tile))
        });

    terrain.into_iter().chain(features)
}

fn nearest_hit(scene: &SceneSnapshot, ray: &Ray) -> Option<Intersection> {
    surface_hits(scene, ray).min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn all_hits(scene: &SceneSnapshot, ray: &Ray, max_hits: usize) -> Vec<Intersection> {
    let mut hits: Vec<Intersection> = surface_hits(scene, ray).collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(max_hits);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Ellipsoid;
    use crate::geometry::{EllipsoidTerrain, Surface, TriangleMesh};
    use crate::scene::{SceneAsset, TileEvent, TilePayload};
    use glam::DVec3;

    fn position(lon: f64, lat: f64, h: f64) -> GeodeticPosition {
        GeodeticPosition::new(lon, lat, h).unwrap()
    }

    fn ground() -> Arc<dyn Surface> {
        Arc::new(EllipsoidTerrain::new(Ellipsoid::WGS84, 0.0))
    }

    /// A 50 m building at the anchor, spanning `min..max` local metres.
    fn building(anchor: GeodeticPosition, min: DVec3, max: DVec3) -> TilePayload {
        let frame = CoordinateConverter::default().local_frame(&anchor);
        let mut attributes = FeatureAttributes::new();
        attributes.insert("name".into(), serde_json::json!("Tower"));
        TilePayload::new(Arc::new(TriangleMesh::cuboid(&frame, min, max)))
            .with_attributes(attributes)
            .with_object_height(anchor.height() + max.z)
    }

    fn scene(terrain: Option<Arc<dyn Surface>>, tiles: Vec<(&str, TilePayload)>) -> SceneSnapshot {
        let asset = SceneAsset::new("test", terrain);
        for (id, payload) in tiles {
            asset
                .apply(TileEvent::Loaded {
                    id: id.into(),
                    payload,
                })
                .unwrap();
        }
        asset.snapshot()
    }

    fn city() -> SceneSnapshot {
        let anchor = position(120.26, 30.18, 0.0);
        scene(
            Some(ground()),
            vec![(
                "tower",
                building(anchor, DVec3::new(-10.0, -10.0, 0.0), DVec3::new(10.0, 10.0, 50.0)),
            )],
        )
    }

    #[test]
    fn test_empty_scene_is_no_hit() {
        let caster = RayCaster::new(CastStrategy::NearestSurface);
        let outcome = caster.cast(&SceneSnapshot::default(), &position(0.0, 0.0, 100.0));
        assert!(!outcome.is_hit());
        assert!(outcome.nearest().is_none());
    }

    #[test]
    fn test_nearest_hits_roof() {
        let caster = RayCaster::new(CastStrategy::NearestSurface);
        let outcome = caster.cast(&city(), &position(120.26, 30.18, 130.0));

        let hit = outcome.nearest().unwrap();
        assert_eq!(hit.kind, HitKind::TilesetFeature);
        assert!((hit.distance - 80.0).abs() < 1e-3, "distance = {}", hit.distance);
        assert_eq!(hit.tile.as_ref().unwrap().as_str(), "tower");
        assert_eq!(hit.attributes.as_ref().unwrap()["name"], "Tower");
        assert_eq!(hit.object_height, Some(50.0));
        assert_eq!(outcome.hits.len(), 1);
    }

    #[test]
    fn test_nearest_over_open_ground_hits_terrain() {
        let caster = RayCaster::new(CastStrategy::NearestSurface);
        let outcome = caster.cast(&city(), &position(120.30, 30.18, 300.0));

        let hit = outcome.nearest().unwrap();
        assert_eq!(hit.kind, HitKind::Terrain);
        assert!((hit.distance - 300.0).abs() < 1e-2);
        assert!(hit.attributes.is_none());
    }

    #[test]
    fn test_inside_building_is_zero_distance() {
        let caster = RayCaster::new(CastStrategy::NearestSurface);
        let outcome = caster.cast(&city(), &position(120.26, 30.18, 20.0));
        assert_eq!(outcome.nearest().unwrap().distance, 0.0);
    }

    #[test]
    fn test_drill_returns_all_surfaces_ascending() {
        let caster = RayCaster::new(CastStrategy::drill());
        let outcome = caster.cast(&city(), &position(120.26, 30.18, 130.0));

        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[0].kind, HitKind::TilesetFeature);
        assert_eq!(outcome.hits[1].kind, HitKind::Terrain);
        assert!(outcome.hits[0].distance < outcome.hits[1].distance);
        assert!((outcome.hits[1].distance - 130.0).abs() < 1e-2);
    }

    #[test]
    fn test_drill_respects_cap() {
        let caster = RayCaster::new(CastStrategy::Drill { max_hits: 1 });
        let outcome = caster.cast(&city(), &position(120.26, 30.18, 130.0));
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].kind, HitKind::TilesetFeature);
    }

    #[test]
    fn test_multi_axis_first_hit_wins() {
        // At (0, 0) the Earth axes line up with local directions:
        // +X up, +Y east, +Z north.
        let anchor = position(0.0, 0.0, 0.0);
        let snapshot = scene(
            Some(ground()),
            vec![(
                "east",
                building(anchor, DVec3::new(95.0, -10.0, 0.0), DVec3::new(115.0, 10.0, 50.0)),
            )],
        );

        let caster = RayCaster::new(CastStrategy::MultiAxis);
        let outcome = caster.cast(&snapshot, &position(0.0, 0.0, 10.0));

        assert_eq!(outcome.axis, Some(Axis::PosY));
        assert_eq!(outcome.hits.len(), 1);
        let hit = &outcome.hits[0];
        assert_eq!(hit.kind, HitKind::TilesetFeature);
        assert!((hit.distance - 95.0).abs() < 1e-3, "distance = {}", hit.distance);
    }

    #[test]
    fn test_multi_axis_falls_through_to_ground() {
        let snapshot = scene(Some(ground()), Vec::new());
        let caster = RayCaster::new(CastStrategy::MultiAxis);
        let outcome = caster.cast(&snapshot, &position(0.0, 0.0, 10.0));

        assert_eq!(outcome.axis, Some(Axis::NegX));
        assert!((outcome.hits[0].distance - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_multi_axis_misses_geometry_off_axis() {
        let anchor = position(0.0, 0.0, 0.0);
        let snapshot = scene(
            None,
            vec![(
                "diagonal",
                building(anchor, DVec3::new(60.0, 60.0, 0.0), DVec3::new(80.0, 80.0, 50.0)),
            )],
        );
        let caster = RayCaster::new(CastStrategy::MultiAxis);
        let outcome = caster.cast(&snapshot, &position(0.0, 0.0, 10.0));
        assert!(!outcome.is_hit());
        assert_eq!(outcome.axis, None);
    }

    #[test]
    fn test_cast_is_deterministic() {
        let caster = RayCaster::new(CastStrategy::drill());
        let snapshot = city();
        let p = position(120.26, 30.18, 130.0);
        let a = caster.cast(&snapshot, &p);
        let b = caster.cast(&snapshot, &p);
        let da: Vec<f64> = a.hits.iter().map(|h| h.distance).collect();
        let db: Vec<f64> = b.hits.iter().map(|h| h.distance).collect();
        assert_eq!(da, db);
    }
}
