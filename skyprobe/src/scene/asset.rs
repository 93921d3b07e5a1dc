//! The mutable scene shared between the streaming task and queries.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, trace};

use super::tile::{Tile, TileEvent, TileId, TilePayload, TransitionError};
use super::TileLoadState;
use crate::geometry::{Aabb, Surface};

/// Counts of tiles by load state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    /// Tiles requested but not yet loaded or failed.
    pub pending: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// A streaming 3D scene: optional terrain plus a set of tiles.
///
/// The asset is the only owner of tile state. The readiness tracker feeds it
/// [`TileEvent`]s; queries take an immutable [`SceneSnapshot`] so a cast
/// never observes a tile half-way through an update.
#[derive(Debug)]
pub struct SceneAsset {
    name: String,
    terrain: Option<Arc<dyn Surface>>,
    tiles: RwLock<HashMap<TileId, Tile>>,
}

impl SceneAsset {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>, terrain: Option<Arc<dyn Surface>>) -> Self {
        Self {
            name: name.into(),
            terrain,
            tiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_terrain(&self) -> bool {
        self.terrain.is_some()
    }

    /// Apply one tile event.
    ///
    /// Illegal transitions leave the tile untouched and return an error; the
    /// caller decides whether that is worth more than a log line.
    pub fn apply(&self, event: TileEvent) -> Result<LoadProgress, TransitionError> {
        let next = event.target_state();
        let mut tiles = self.tiles.write();

        let (id, bounds, payload) = match event {
            TileEvent::Requested { id, bounds } => (id, bounds, None),
            TileEvent::Loaded { id, payload } => (id, None, Some(payload)),
            TileEvent::Failed { id, reason } => {
                debug!(tile = %id, reason = %reason, "Tile failed to load");
                (id, None, None)
            }
            TileEvent::Unloaded { id } => (id, None, None),
        };

        match tiles.get_mut(&id) {
            Some(tile) => tile.transition(next, payload)?,
            None => {
                let mut tile = Tile::new(id.clone(), bounds);
                tile.transition(next, payload)?;
                tiles.insert(id.clone(), tile);
            }
        }
        // An evicted tile is indistinguishable from one never seen.
        if next == TileLoadState::Unloaded {
            tiles.remove(&id);
        }
        trace!(tile = %id, state = %next, "Tile transition");

        Ok(Self::count(&tiles))
    }

    /// Current load progress.
    pub fn progress(&self) -> LoadProgress {
        Self::count(&self.tiles.read())
    }

    /// Number of tiles currently loading.
    pub fn pending_tiles(&self) -> usize {
        self.progress().pending
    }

    /// Whether anything is available to intersect.
    pub fn has_geometry(&self) -> bool {
        self.terrain.is_some() || self.progress().loaded > 0
    }

    /// State of a single tile, if the scene is tracking it.
    ///
    /// Evicted tiles are forgotten and report `None`.
    pub fn tile_state(&self, id: &TileId) -> Option<TileLoadState> {
        self.tiles.read().get(id).map(Tile::state)
    }

    /// Consistent view of the terrain and every loaded tile.
    pub fn snapshot(&self) -> SceneSnapshot {
        let tiles = self.tiles.read();
        let mut loaded: Vec<LoadedTile> = tiles
            .values()
            .filter_map(|tile| {
                tile.payload().map(|payload| LoadedTile {
                    id: tile.id().clone(),
                    bounds: tile.bounds(),
                    payload: payload.clone(),
                })
            })
            .collect();
        // HashMap order is random; queries must be reproducible.
        loaded.sort_by(|a, b| a.id.cmp(&b.id));

        SceneSnapshot {
            terrain: self.terrain.clone(),
            tiles: loaded,
            pending: Self::count(&tiles).pending,
        }
    }

    fn count(tiles: &HashMap<TileId, Tile>) -> LoadProgress {
        tiles
            .values()
            .fold(LoadProgress::default(), |mut acc, tile| {
                match tile.state() {
                    TileLoadState::Loading => acc.pending += 1,
                    TileLoadState::Loaded => acc.loaded += 1,
                    TileLoadState::Failed => acc.failed += 1,
                    TileLoadState::Unloaded => {}
                }
                acc
            })
    }
}

/// A tile with geometry, as seen by one query.
#[derive(Debug, Clone)]
pub struct LoadedTile {
    pub id: TileId,
    pub bounds: Option<Aabb>,
    pub payload: TilePayload,
}

/// Immutable view of a scene at one instant.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    terrain: Option<Arc<dyn Surface>>,
    tiles: Vec<LoadedTile>,
    pending: usize,
}

impl SceneSnapshot {
    pub fn terrain(&self) -> Option<&Arc<dyn Surface>> {
        self.terrain.as_ref()
    }

    /// Loaded tiles ordered by id.
    pub fn tiles(&self) -> &[LoadedTile] {
        &self.tiles
    }

    pub fn is_empty(&self) -> bool {
        self.terrain.is_none() && self.tiles.is_empty()
    }

    /// Tiles still loading when the snapshot was taken.
    pub fn pending(&self) -> usize {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::{CoordinateConverter, GeodeticPosition};
    use crate::geometry::{EllipsoidTerrain, TriangleMesh};
    use crate::geodesy::Ellipsoid;
    use glam::DVec3;

    fn payload() -> TilePayload {
        let anchor = GeodeticPosition::new(10.0, 50.0, 0.0).unwrap();
        let frame = CoordinateConverter::default().local_frame(&anchor);
        let mesh = TriangleMesh::cuboid(&frame, DVec3::splat(-5.0), DVec3::splat(5.0));
        TilePayload::new(Arc::new(mesh))
    }

    fn requested(id: &str) -> TileEvent {
        TileEvent::Requested {
            id: TileId::from(id),
            bounds: None,
        }
    }

    fn loaded(id: &str) -> TileEvent {
        TileEvent::Loaded {
            id: TileId::from(id),
            payload: payload(),
        }
    }

    #[test]
    fn test_new_scene_has_no_geometry() {
        let scene = SceneAsset::new("empty", None);
        assert!(!scene.has_geometry());
        assert_eq!(scene.pending_tiles(), 0);
        assert!(scene.snapshot().is_empty());
    }

    #[test]
    fn test_terrain_counts_as_geometry() {
        let terrain = EllipsoidTerrain::new(Ellipsoid::WGS84, 0.0);
        let scene = SceneAsset::new("terrain", Some(Arc::new(terrain)));
        assert!(scene.has_geometry());
        assert!(scene.snapshot().terrain().is_some());
    }

    #[test]
    fn test_pending_tracks_requests_and_loads() {
        let scene = SceneAsset::new("city", None);
        scene.apply(requested("a")).unwrap();
        let progress = scene.apply(requested("b")).unwrap();
        assert_eq!(progress.pending, 2);

        let progress = scene.apply(loaded("a")).unwrap();
        assert_eq!(progress.pending, 1);
        assert_eq!(progress.loaded, 1);
        assert!(scene.has_geometry());

        let progress = scene
            .apply(TileEvent::Failed {
                id: TileId::from("b"),
                reason: "timeout".into(),
            })
            .unwrap();
        assert_eq!(progress.pending, 0);
        assert_eq!(progress.failed, 1);
    }

    #[test]
    fn test_illegal_transition_is_rejected_and_ignored() {
        let scene = SceneAsset::new("city", None);
        scene.apply(loaded("a")).unwrap();

        let err = scene.apply(requested("a")).unwrap_err();
        assert_eq!(err.from, TileLoadState::Loaded);
        assert_eq!(err.to, TileLoadState::Loading);
        assert_eq!(
            scene.tile_state(&TileId::from("a")),
            Some(TileLoadState::Loaded)
        );
    }

    #[test]
    fn test_eviction_drops_geometry() {
        let scene = SceneAsset::new("city", None);
        scene.apply(loaded("a")).unwrap();
        scene
            .apply(TileEvent::Unloaded {
                id: TileId::from("a"),
            })
            .unwrap();
        assert!(!scene.has_geometry());
        assert!(scene.snapshot().tiles().is_empty());
        assert_eq!(scene.tile_state(&TileId::from("a")), None);
    }

    #[test]
    fn test_rejected_event_for_unknown_tile_is_not_tracked() {
        let scene = SceneAsset::new("city", None);
        let err = scene
            .apply(TileEvent::Unloaded {
                id: TileId::from("ghost"),
            })
            .unwrap_err();
        assert_eq!(err.from, TileLoadState::Unloaded);
        assert_eq!(scene.tile_state(&TileId::from("ghost")), None);
        assert_eq!(scene.progress(), LoadProgress::default());
    }

    #[test]
    fn test_eviction_churn_does_not_grow_tile_map() {
        let scene = SceneAsset::new("city", None);
        for round in 0..100 {
            let id = format!("tile-{round}");
            scene.apply(loaded(&id)).unwrap();
            scene
                .apply(TileEvent::Unloaded {
                    id: TileId::new(id),
                })
                .unwrap();
        }
        assert_eq!(scene.tiles.read().len(), 0);

        // An evicted tile can stream in again.
        scene.apply(requested("tile-0")).unwrap();
        scene.apply(loaded("tile-0")).unwrap();
        assert_eq!(
            scene.tile_state(&TileId::from("tile-0")),
            Some(TileLoadState::Loaded)
        );
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_events() {
        let scene = SceneAsset::new("city", None);
        scene.apply(loaded("a")).unwrap();
        let snapshot = scene.snapshot();
        scene.apply(loaded("b")).unwrap();

        assert_eq!(snapshot.tiles().len(), 1);
        assert_eq!(scene.snapshot().tiles().len(), 2);
    }

    #[test]
    fn test_snapshot_records_pending_tiles() {
        let scene = SceneAsset::new("city", None);
        scene.apply(requested("a")).unwrap();
        scene.apply(requested("b")).unwrap();
        let before = scene.snapshot();
        scene.apply(loaded("a")).unwrap();

        assert_eq!(before.pending(), 2);
        assert_eq!(scene.snapshot().pending(), 1);
    }

    #[test]
    fn test_snapshot_is_ordered_by_id() {
        let scene = SceneAsset::new("city", None);
        for id in ["c", "a", "b"] {
            scene.apply(loaded(id)).unwrap();
        }
        let ids: Vec<_> = scene
            .snapshot()
            .tiles()
            .iter()
            .map(|t| t.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_loaded_tile_takes_bounds_from_geometry() {
        let scene = SceneAsset::new("city", None);
        scene.apply(loaded("a")).unwrap();
        assert!(scene.snapshot().tiles()[0].bounds.is_some());
    }
}
