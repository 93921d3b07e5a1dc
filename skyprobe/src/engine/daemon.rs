//! Query daemon for the shared-scene model.
//!
//! The [`QueryDaemon`] owns the single shared scene and answers queries one
//! at a time, in arrival order:
//!
//! ```text
//! check_collision ──► QueryRequest ──► mpsc ──► QueryDaemon ──► cast + classify
//!        ▲                                                            │
//!        └─────────────────────── oneshot ◄───────────────────────────┘
//! ```
//!
//! Serialising through one task keeps every query's view of the scene
//! consistent with the order requests were submitted in.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::query::QueryContext;
use super::result::CollisionResult;
use crate::geodesy::GeodeticPosition;
use crate::readiness::ReadinessTracker;

/// A queued query.
#[derive(Debug)]
pub(crate) struct QueryRequest {
    pub position: GeodeticPosition,
    pub reply: oneshot::Sender<CollisionResult>,
}

impl QueryRequest {
    pub fn new(position: GeodeticPosition) -> (Self, oneshot::Receiver<CollisionResult>) {
        let (reply, rx) = oneshot::channel();
        (Self { position, reply }, rx)
    }
}

/// Serial executor for the shared scene.
pub(crate) struct QueryDaemon {
    scene: Arc<ReadinessTracker>,
    context: QueryContext,
    requests: mpsc::Receiver<QueryRequest>,
}

impl QueryDaemon {
    /// Create the daemon and the sender producers submit through.
    pub fn new(
        scene: Arc<ReadinessTracker>,
        context: QueryContext,
        capacity: usize,
    ) -> (Self, mpsc::Sender<QueryRequest>) {
        let (tx, requests) = mpsc::channel(capacity.max(1));
        (
            Self {
                scene,
                context,
                requests,
            },
            tx,
        )
    }

    /// Answer queries until shutdown or until every sender is gone.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(scene = %self.scene.scene().name(), "Query daemon starting");

        let Self {
            scene,
            context,
            mut requests,
        } = self;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Query daemon shutting down");
                    break;
                }

                request = requests.recv() => {
                    let Some(request) = request else {
                        debug!("All query handles dropped");
                        break;
                    };
                    Self::handle_request(&scene, &context, request).await;
                }
            }
        }

        // Pending requests are dropped here; their callers see a closed reply.
        requests.close();
        info!("Query daemon stopped");
    }

    async fn handle_request(scene: &ReadinessTracker, context: &QueryContext, request: QueryRequest) {
        if request.reply.is_closed() {
            debug!(position = %request.position, "Caller gone, skipping query");
            return;
        }

        // Readiness resolved before the daemon started; this returns at once.
        let readiness = match scene.wait().await {
            Ok(state) => state,
            Err(_) => return,
        };

        let result = context.evaluate(scene, request.position, readiness);
        let _ = request.reply.send(result);
    }
}
