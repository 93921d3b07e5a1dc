//! Tiles and the events that drive their load state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Aabb, Surface};

/// Opaque per-feature attributes, passed through to results untouched.
pub type FeatureAttributes = BTreeMap<String, serde_json::Value>;

/// Identifier of a tile within one scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(String);

impl TileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load state of a tile.
///
/// ```text
/// Unloaded ──► Loading ──► Loaded ──► Unloaded (eviction)
///    │            │
///    │            └──────► Failed
///    └──► Loaded / Failed (completion without a request event)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileLoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl TileLoadState {
    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(self, next: TileLoadState) -> bool {
        use TileLoadState::*;
        matches!(
            (self, next),
            (Unloaded, Loading)
                | (Unloaded, Loaded)
                | (Unloaded, Failed)
                | (Loading, Loaded)
                | (Loading, Failed)
                | (Loaded, Unloaded)
        )
    }
}

impl fmt::Display for TileLoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TileLoadState::Unloaded => "unloaded",
            TileLoadState::Loading => "loading",
            TileLoadState::Loaded => "loaded",
            TileLoadState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Loaded geometry of a tile.
#[derive(Debug, Clone)]
pub struct TilePayload {
    /// Intersectable geometry.
    pub surface: Arc<dyn Surface>,
    /// Feature attributes reported with hits on this tile.
    pub attributes: Arc<FeatureAttributes>,
    /// Height of the feature's top above the ellipsoid, when known.
    pub object_height: Option<f64>,
}

impl TilePayload {
    /// Payload with no attributes and unknown object height.
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            attributes: Arc::new(FeatureAttributes::new()),
            object_height: None,
        }
    }

    pub fn with_attributes(mut self, attributes: FeatureAttributes) -> Self {
        self.attributes = Arc::new(attributes);
        self
    }

    pub fn with_object_height(mut self, height: f64) -> Self {
        self.object_height = Some(height);
        self
    }
}

/// A tile owned by a [`super::SceneAsset`].
#[derive(Debug, Clone)]
pub struct Tile {
    id: TileId,
    bounds: Option<Aabb>,
    state: TileLoadState,
    payload: Option<TilePayload>,
}

impl Tile {
    pub(super) fn new(id: TileId, bounds: Option<Aabb>) -> Self {
        Self {
            id,
            bounds,
            state: TileLoadState::Unloaded,
            payload: None,
        }
    }

    pub fn id(&self) -> &TileId {
        &self.id
    }

    /// Bounding volume, declared up front or taken from the loaded geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn state(&self) -> TileLoadState {
        self.state
    }

    pub fn payload(&self) -> Option<&TilePayload> {
        self.payload.as_ref()
    }

    /// Apply a transition, checking it against the state table.
    pub(super) fn transition(
        &mut self,
        next: TileLoadState,
        payload: Option<TilePayload>,
    ) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                tile: self.id.clone(),
                from: self.state,
                to: next,
            });
        }

        self.state = next;
        match next {
            TileLoadState::Loaded => {
                if let Some(payload) = payload {
                    if self.bounds.is_none() {
                        self.bounds = payload.surface.bounds();
                    }
                    self.payload = Some(payload);
                }
            }
            _ => self.payload = None,
        }
        Ok(())
    }
}

/// A streaming notification about one tile.
#[derive(Debug, Clone)]
pub enum TileEvent {
    /// The collaborator started fetching a tile.
    Requested { id: TileId, bounds: Option<Aabb> },
    /// Geometry arrived.
    Loaded { id: TileId, payload: TilePayload },
    /// The tile could not be loaded.
    Failed { id: TileId, reason: String },
    /// The tile was evicted.
    Unloaded { id: TileId },
}

impl TileEvent {
    pub fn tile_id(&self) -> &TileId {
        match self {
            TileEvent::Requested { id, .. }
            | TileEvent::Loaded { id, .. }
            | TileEvent::Failed { id, .. }
            | TileEvent::Unloaded { id } => id,
        }
    }

    /// State the event moves its tile into.
    pub fn target_state(&self) -> TileLoadState {
        match self {
            TileEvent::Requested { .. } => TileLoadState::Loading,
            TileEvent::Loaded { .. } => TileLoadState::Loaded,
            TileEvent::Failed { .. } => TileLoadState::Failed,
            TileEvent::Unloaded { .. } => TileLoadState::Unloaded,
        }
    }
}

/// A tile event that would move a tile backwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition for tile {tile}: {from} -> {to}")]
pub struct TransitionError {
    pub tile: TileId,
    pub from: TileLoadState,
    pub to: TileLoadState,
}
