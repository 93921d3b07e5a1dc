//! The readiness tracker task.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ReadinessState;
use crate::scene::{LoadProgress, SceneAsset, SceneStream, TileEvent};

/// The tracker stopped (engine shutdown) before the scene resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Readiness tracker stopped before the scene resolved")]
pub struct TrackerClosed;

/// Owns the streaming side of one scene and reports when it is queryable.
#[derive(Debug)]
pub struct ReadinessTracker {
    scene: Arc<SceneAsset>,
    state: watch::Receiver<ReadinessState>,
    deadline: Duration,
    task: JoinHandle<()>,
}

impl ReadinessTracker {
    /// Start tracking an opened scene.
    ///
    /// The deadline is measured from this call. Streaming stops when the
    /// event channel closes or `shutdown` is cancelled.
    pub fn start(stream: SceneStream, deadline: Duration, shutdown: CancellationToken) -> Self {
        let scene = Arc::new(SceneAsset::new(stream.name, stream.terrain));
        let (state_tx, state_rx) = watch::channel(ReadinessState::Unloaded);
        state_tx.send_replace(ReadinessState::Loading);

        debug!(
            scene = %scene.name(),
            deadline_ms = deadline.as_millis() as u64,
            "Scene loading"
        );

        let task = tokio::spawn(run(
            Arc::clone(&scene),
            stream.events,
            state_tx,
            deadline,
            shutdown,
        ));

        Self {
            scene,
            state: state_rx,
            deadline,
            task,
        }
    }

    /// The scene this tracker feeds.
    pub fn scene(&self) -> &Arc<SceneAsset> {
        &self.scene
    }

    /// Current state without waiting.
    pub fn state(&self) -> ReadinessState {
        *self.state.borrow()
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn progress(&self) -> LoadProgress {
        self.scene.progress()
    }

    /// A receiver for observing state changes.
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.state.clone()
    }

    /// Wait until the scene is `Ready` or `TimedOut`.
    ///
    /// Returns immediately once resolved. Every waiter observes the same
    /// outcome.
    pub async fn wait(&self) -> Result<ReadinessState, TrackerClosed> {
        let mut rx = self.state.clone();
        let state = *rx
            .wait_for(|s| s.is_resolved())
            .await
            .map_err(|_| TrackerClosed)?;
        Ok(state)
    }

    /// Whether the background streaming task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    scene: Arc<SceneAsset>,
    mut events: mpsc::UnboundedReceiver<TileEvent>,
    state: watch::Sender<ReadinessState>,
    deadline: Duration,
    shutdown: CancellationToken,
) {
    let started = Instant::now();
    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);
    let mut streaming = true;

    loop {
        let resolved = state.borrow().is_resolved();
        if resolved && !streaming {
            break;
        }

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!(scene = %scene.name(), "Readiness tracker cancelled");
                break;
            }

            _ = &mut timer, if !resolved => {
                let progress = scene.progress();
                if resolve(&state, ReadinessState::TimedOut) {
                    warn!(
                        scene = %scene.name(),
                        pending = progress.pending,
                        loaded = progress.loaded,
                        failed = progress.failed,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Scene readiness timed out, queries will be best-effort"
                    );
                }
            }

            event = events.recv(), if streaming => {
                match event {
                    Some(event) => match scene.apply(event) {
                        Ok(progress) => {
                            debug!(
                                scene = %scene.name(),
                                pending = progress.pending,
                                loaded = progress.loaded,
                                "Tile progress"
                            );
                            if !resolved {
                                try_ready(&scene, &state, progress, started);
                            }
                        }
                        Err(e) => warn!(error = %e, "Ignoring tile event"),
                    },
                    None => {
                        streaming = false;
                        debug!(scene = %scene.name(), "Tile stream closed");
                        if !resolved {
                            try_ready(&scene, &state, scene.progress(), started);
                        }
                    }
                }
            }
        }
    }
}

fn try_ready(
    scene: &SceneAsset,
    state: &watch::Sender<ReadinessState>,
    progress: LoadProgress,
    started: Instant,
) {
    if progress.pending == 0 && scene.has_geometry() && resolve(state, ReadinessState::Ready) {
        info!(
            scene = %scene.name(),
            loaded = progress.loaded,
            failed = progress.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scene ready"
        );
    }
}

/// Resolve at most once. Returns whether this call did it.
fn resolve(state: &watch::Sender<ReadinessState>, outcome: ReadinessState) -> bool {
    state.send_if_modified(|current| {
        if current.is_resolved() {
            false
        } else {
            *current = outcome;
            true
        }
    })
}
