//! Collaborators that stream scene geometry into the engine.
//!
//! A [`SceneSource`] is opened once per scene instance. Opening yields the
//! terrain surface (if any) and a channel of [`TileEvent`]s; the readiness
//! tracker drains that channel into a [`super::SceneAsset`].
//!
//! Sources are dyn-compatible so the engine can hold `Arc<dyn SceneSource>`
//! and tests can substitute in-memory scenes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::tile::{TileEvent, TileId, TilePayload};
use crate::geometry::{Aabb, Surface};

/// Errors raised while opening a scene.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Descriptor file could not be read.
    #[error("Failed to read scene descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor could not be fetched over HTTP.
    #[error("Failed to fetch scene descriptor from {url}: {reason}")]
    Http { url: String, reason: String },

    /// Descriptor content is malformed.
    #[error("Invalid scene descriptor: {0}")]
    Invalid(String),

    /// The source refused to open.
    #[error("Scene source unavailable: {0}")]
    Unavailable(String),

    /// Opening took longer than the readiness deadline.
    #[error("Scene source did not open within {0:?}")]
    OpenTimedOut(Duration),
}

/// An opened scene: terrain plus a live stream of tile events.
#[derive(Debug)]
pub struct SceneStream {
    pub name: String,
    pub terrain: Option<Arc<dyn Surface>>,
    pub events: mpsc::UnboundedReceiver<TileEvent>,
}

/// Opens streaming scenes.
pub trait SceneSource: Send + Sync {
    /// Short human-readable description for logs.
    fn describe(&self) -> String;

    /// Open a fresh scene instance.
    ///
    /// Must be called from within a Tokio runtime; implementations may spawn
    /// tasks that keep emitting events after the future resolves.
    fn open(&self) -> BoxFuture<'_, Result<SceneStream, SourceError>>;
}

/// A tile definition for [`StaticSceneSource`].
#[derive(Debug, Clone)]
pub struct StaticTile {
    pub id: TileId,
    pub bounds: Option<Aabb>,
    /// `None` means the tile stays loading forever.
    pub payload: Option<TilePayload>,
    /// Delay between the request event and the load event.
    pub load_delay: Duration,
}

/// In-memory scene source.
///
/// Every open emits a request event for each tile immediately, then a load
/// event after the tile's delay. Stalled tiles never finish, which is how a
/// scene that never becomes ready is modelled.
#[derive(Debug, Default)]
pub struct StaticSceneSource {
    name: String,
    terrain: Option<Arc<dyn Surface>>,
    tiles: Vec<StaticTile>,
    failure: Option<String>,
    opens: AtomicUsize,
}

impl StaticSceneSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_terrain(mut self, terrain: Arc<dyn Surface>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    /// Add a tile that loads immediately.
    pub fn with_tile(self, id: impl Into<String>, payload: TilePayload) -> Self {
        self.with_delayed_tile(id, payload, Duration::ZERO)
    }

    /// Add a tile that loads after `delay`.
    pub fn with_delayed_tile(
        mut self,
        id: impl Into<String>,
        payload: TilePayload,
        delay: Duration,
    ) -> Self {
        self.tiles.push(StaticTile {
            id: TileId::new(id),
            bounds: payload.surface.bounds(),
            payload: Some(payload),
            load_delay: delay,
        });
        self
    }

    /// Add a tile that is requested but never loads.
    pub fn with_stalled_tile(mut self, id: impl Into<String>) -> Self {
        self.tiles.push(StaticTile {
            id: TileId::new(id),
            bounds: None,
            payload: None,
            load_delay: Duration::ZERO,
        });
        self
    }

    /// Make every open fail with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Number of times the source has been opened.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    fn open_stream(&self) -> Result<SceneStream, SourceError> {
        self.opens.fetch_add(1, Ordering::Relaxed);

        if let Some(reason) = &self.failure {
            return Err(SourceError::Unavailable(reason.clone()));
        }

        let (tx, rx) = mpsc::unbounded_channel();

        for tile in &self.tiles {
            // Receiver lives in the returned stream; cannot be closed yet.
            let _ = tx.send(TileEvent::Requested {
                id: tile.id.clone(),
                bounds: tile.bounds,
            });
        }

        let mut delayed = Vec::new();
        for tile in &self.tiles {
            let Some(payload) = tile.payload.clone() else {
                continue;
            };
            let event = TileEvent::Loaded {
                id: tile.id.clone(),
                payload,
            };
            if tile.load_delay.is_zero() {
                let _ = tx.send(event);
            } else {
                delayed.push((tile.load_delay, event));
            }
        }

        let stalled = self.tiles.iter().any(|t| t.payload.is_none());
        if !delayed.is_empty() || stalled {
            tokio::spawn(async move {
                delayed.sort_by_key(|(delay, _)| *delay);
                let start = tokio::time::Instant::now();
                for (delay, event) in delayed {
                    tokio::time::sleep_until(start + delay).await;
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                // Keep the stream open while stalled tiles are outstanding.
                if stalled {
                    tx.closed().await;
                }
            });
        }

        debug!(
            scene = %self.name,
            tiles = self.tiles.len(),
            terrain = self.terrain.is_some(),
            "Opened static scene"
        );

        Ok(SceneStream {
            name: self.name.clone(),
            terrain: self.terrain.clone(),
            events: rx,
        })
    }
}

impl SceneSource for StaticSceneSource {
    fn describe(&self) -> String {
        format!("static:{}", self.name)
    }

    fn open(&self) -> BoxFuture<'_, Result<SceneStream, SourceError>> {
        Box::pin(async move { self.open_stream() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Ellipsoid;
    use crate::geometry::EllipsoidTerrain;
    use crate::scene::TileLoadState;

    fn ground() -> Arc<dyn Surface> {
        Arc::new(EllipsoidTerrain::new(Ellipsoid::WGS84, 0.0))
    }

    #[tokio::test]
    async fn test_open_emits_request_then_load() {
        let source = StaticSceneSource::new("demo").with_tile("a", TilePayload::new(ground()));
        let mut stream = source.open().await.unwrap();

        let first = stream.events.recv().await.unwrap();
        assert_eq!(first.target_state(), TileLoadState::Loading);
        let second = stream.events.recv().await.unwrap();
        assert_eq!(second.target_state(), TileLoadState::Loaded);
        assert_eq!(second.tile_id().as_str(), "a");
    }

    #[tokio::test]
    async fn test_failing_source() {
        let source = StaticSceneSource::new("broken").failing("disk on fire");
        let err = source.open().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
        assert_eq!(source.open_count(), 1);
    }

    #[tokio::test]
    async fn test_delayed_tile_arrives_after_delay() {
        let source = StaticSceneSource::new("slow").with_delayed_tile(
            "a",
            TilePayload::new(ground()),
            Duration::from_millis(50),
        );
        let start = tokio::time::Instant::now();
        let mut stream = source.open().await.unwrap();
        let _requested = stream.events.recv().await.unwrap();

        let loaded = stream.events.recv().await.unwrap();
        assert_eq!(loaded.target_state(), TileLoadState::Loaded);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_each_open_is_independent() {
        let source = StaticSceneSource::new("demo")
            .with_terrain(ground())
            .with_stalled_tile("never");
        let a = source.open().await.unwrap();
        let b = source.open().await.unwrap();
        assert_eq!(source.open_count(), 2);
        assert!(a.terrain.is_some() && b.terrain.is_some());
    }
}
