//! The collision engine.
//!
//! [`CollisionEngine`] composes readiness, ray casting and classification
//! into one request/response cycle and owns the choice between the two
//! concurrency models:
//!
//! - **Shared**: one scene for the engine lifetime. [`CollisionEngine::initialize_scene`]
//!   opens it, waits for readiness once, and starts a query daemon that
//!   answers queries in FIFO order.
//! - **Isolated**: every query opens its own scene from the source, waits
//!   for its own readiness, and runs in parallel with other queries.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use skyprobe::engine::CollisionEngine;
//! use skyprobe::config::EngineConfig;
//! use skyprobe::geodesy::GeodeticInput;
//!
//! let engine = CollisionEngine::new(EngineConfig::default(), Arc::new(source));
//! let scene = engine.initialize_scene().await?;
//! let result = engine
//!     .check_collision(&scene, GeodeticInput { longitude: 120.26, latitude: 30.18, height: 130.0 })
//!     .await?;
//! println!("{}", result.verdict);
//! ```

mod daemon;
mod query;
mod result;
mod stats;

pub use result::CollisionResult;
pub use stats::{EngineStats, EngineStatsSnapshot};

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, OnceCell};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::CollisionClassifier;
use crate::config::{ConcurrencyModel, EngineConfig};
use crate::geodesy::{CoordinateConverter, GeoError, GeodeticInput, GeodeticPosition};
use crate::raycast::RayCaster;
use crate::readiness::{ReadinessState, ReadinessTracker};
use crate::scene::{LoadProgress, SceneSource, SourceError};

use daemon::{QueryDaemon, QueryRequest};
use query::QueryContext;

/// Errors returned by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Position failed validation; the scene was not touched.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] GeoError),

    /// The scene source could not be opened.
    #[error("Scene initialization failed: {0}")]
    SceneInit(#[from] SourceError),

    /// The engine was shut down.
    #[error("Engine is shut down")]
    ShutDown,
}

impl EngineError {
    /// Whether the caller is at fault.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, EngineError::InvalidInput(_))
    }
}

#[derive(Debug, Clone)]
enum HandleKind {
    Shared {
        requests: mpsc::Sender<QueryRequest>,
        scene: Arc<ReadinessTracker>,
    },
    Isolated,
}

/// Token for submitting queries, returned by [`CollisionEngine::initialize_scene`].
///
/// Cheap to clone. In the shared model every clone refers to the same scene.
#[derive(Debug, Clone)]
pub struct SceneHandle {
    kind: HandleKind,
}

impl SceneHandle {
    pub fn model(&self) -> ConcurrencyModel {
        match self.kind {
            HandleKind::Shared { .. } => ConcurrencyModel::Shared,
            HandleKind::Isolated => ConcurrencyModel::Isolated,
        }
    }

    /// Readiness of the shared scene. `None` in the isolated model, where
    /// each query has its own.
    pub fn readiness(&self) -> Option<ReadinessState> {
        match &self.kind {
            HandleKind::Shared { scene, .. } => Some(scene.state()),
            HandleKind::Isolated => None,
        }
    }

    /// Load progress of the shared scene.
    pub fn progress(&self) -> Option<LoadProgress> {
        match &self.kind {
            HandleKind::Shared { scene, .. } => Some(scene.progress()),
            HandleKind::Isolated => None,
        }
    }

    /// Whether two handles refer to the same shared scene.
    pub fn same_scene(&self, other: &SceneHandle) -> bool {
        match (&self.kind, &other.kind) {
            (HandleKind::Shared { scene: a, .. }, HandleKind::Shared { scene: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (HandleKind::Isolated, HandleKind::Isolated) => true,
            _ => false,
        }
    }
}

/// Answers collision queries against a streamed scene.
pub struct CollisionEngine {
    config: EngineConfig,
    source: Arc<dyn SceneSource>,
    context: QueryContext,
    shared: OnceCell<SceneHandle>,
    shutdown: CancellationToken,
    stats: Arc<EngineStats>,
}

impl CollisionEngine {
    pub fn new(config: EngineConfig, source: Arc<dyn SceneSource>) -> Self {
        let stats = Arc::new(EngineStats::default());
        let converter = CoordinateConverter::default();
        let context = QueryContext {
            caster: RayCaster::new(config.strategy).with_converter(converter),
            classifier: CollisionClassifier::new(config.thresholds),
            converter,
            stats: Arc::clone(&stats),
        };

        Self {
            config,
            source,
            context,
            shared: OnceCell::new(),
            shutdown: CancellationToken::new(),
            stats,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Prepare the scene for queries.
    ///
    /// Shared model: opens the scene and resolves once it is `Ready` or
    /// `TimedOut`. Repeated calls return the same handle; a failed attempt
    /// can be retried. Isolated model: returns immediately, since scenes are
    /// opened per query.
    pub async fn initialize_scene(&self) -> Result<SceneHandle, EngineError> {
        if self.shutdown.is_cancelled() {
            return Err(EngineError::ShutDown);
        }

        match self.config.model {
            ConcurrencyModel::Isolated => {
                debug!(source = %self.source.describe(), "Isolated model, scenes open per query");
                Ok(SceneHandle {
                    kind: HandleKind::Isolated,
                })
            }
            ConcurrencyModel::Shared => self
                .shared
                .get_or_try_init(|| self.start_shared())
                .await
                .cloned(),
        }
    }

    async fn start_shared(&self) -> Result<SceneHandle, EngineError> {
        info!(source = %self.source.describe(), "Initializing shared scene");

        let tracker = Arc::new(self.open_scene(self.shutdown.clone()).await?);
        let readiness = tracker.wait().await.map_err(|_| EngineError::ShutDown)?;

        let (daemon, requests) = QueryDaemon::new(
            Arc::clone(&tracker),
            self.context.clone(),
            self.config.queue_capacity,
        );
        tokio::spawn(daemon.run(self.shutdown.clone()));

        info!(
            readiness = %readiness,
            loaded = tracker.progress().loaded,
            "Shared scene initialized"
        );

        Ok(SceneHandle {
            kind: HandleKind::Shared {
                requests,
                scene: tracker,
            },
        })
    }

    /// Open a scene and start tracking its readiness.
    ///
    /// The readiness deadline covers the open as well: a slow source eats
    /// into the time left for tiles, and a source that never answers fails
    /// with [`SourceError::OpenTimedOut`] once the deadline passes.
    async fn open_scene(&self, shutdown: CancellationToken) -> Result<ReadinessTracker, EngineError> {
        let budget = self.config.readiness_timeout;
        let deadline = Instant::now() + budget;

        let opened = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(EngineError::ShutDown),
            opened = tokio::time::timeout_at(deadline, self.source.open()) => opened,
        };
        let stream = opened
            .unwrap_or(Err(SourceError::OpenTimedOut(budget)))
            .map_err(|e| {
                warn!(source = %self.source.describe(), error = %e, "Failed to open scene");
                EngineError::SceneInit(e)
            })?;

        self.stats.scene_opened();
        Ok(ReadinessTracker::start(
            stream,
            deadline.saturating_duration_since(Instant::now()),
            shutdown,
        ))
    }

    /// Validate raw input and run one query.
    pub async fn check_collision(
        &self,
        handle: &SceneHandle,
        input: GeodeticInput,
    ) -> Result<CollisionResult, EngineError> {
        let position = GeodeticPosition::try_from(input).map_err(|e| {
            self.stats.query_rejected();
            debug!(error = %e, "Rejected query");
            EngineError::InvalidInput(e)
        })?;
        self.check_position(handle, position).await
    }

    /// Run one query for an already validated position.
    pub async fn check_position(
        &self,
        handle: &SceneHandle,
        position: GeodeticPosition,
    ) -> Result<CollisionResult, EngineError> {
        if self.shutdown.is_cancelled() {
            return Err(EngineError::ShutDown);
        }

        match &handle.kind {
            HandleKind::Shared { requests, .. } => {
                let (request, reply) = QueryRequest::new(position);
                requests
                    .send(request)
                    .await
                    .map_err(|_| EngineError::ShutDown)?;
                reply.await.map_err(|_| EngineError::ShutDown)
            }
            HandleKind::Isolated => self.check_isolated(position).await,
        }
    }

    async fn check_isolated(&self, position: GeodeticPosition) -> Result<CollisionResult, EngineError> {
        // Stop this query's streaming when it returns.
        let scene_token = self.shutdown.child_token();
        let _stop_streaming = scene_token.clone().drop_guard();

        let tracker = self.open_scene(scene_token).await?;
        let readiness = tracker.wait().await.map_err(|_| EngineError::ShutDown)?;
        Ok(self.context.evaluate(&tracker, position, readiness))
    }

    /// Stop the query daemon and all background streaming.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Collision engine shutting down");
            self.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled by [`CollisionEngine::shutdown`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl Drop for CollisionEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
