//! HTTP boundary for the collision engine.
//!
//! Two endpoints:
//!
//! - `POST /api/check-collision` with `{"longitude", "latitude", "height"}`
//! - `GET /health`
//!
//! Bad request bodies and out-of-range positions map to `400`, everything
//! else that fails maps to `500`. Error bodies never carry internal detail.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::{CollisionEngine, CollisionResult, SceneHandle};
use crate::geodesy::GeodeticInput;

/// Route for collision queries.
pub const CHECK_COLLISION_PATH: &str = "/api/check-collision";

/// Route for the health probe.
pub const HEALTH_PATH: &str = "/health";

/// State shared by the handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<CollisionEngine>,
    pub handle: SceneHandle,
}

/// Success body: the result plus the legacy `collision` flag.
#[derive(Serialize)]
struct CheckResponse<'a> {
    #[serde(flatten)]
    result: &'a CollisionResult,
    collision: bool,
}

/// Build the router for an engine and an initialized scene.
pub fn router(engine: Arc<CollisionEngine>, handle: SceneHandle) -> Router {
    Router::new()
        .route(CHECK_COLLISION_PATH, post(check_collision_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(ApiState { engine, handle })
}

/// Serve `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("HTTP server shutdown requested");
        })
        .await
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn check_collision_handler(
    State(state): State<ApiState>,
    body: Result<Json<GeodeticInput>, JsonRejection>,
) -> Response {
    let input = match body {
        Ok(Json(input)) => input,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "Malformed collision request");
            return error_response(StatusCode::BAD_REQUEST, "Invalid input");
        }
    };

    match state.engine.check_collision(&state.handle, input).await {
        Ok(result) => {
            let body = CheckResponse {
                result: &result,
                collision: result.collision(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) if e.is_invalid_input() => {
            error_response(StatusCode::BAD_REQUEST, "Invalid input")
        }
        Err(e) => {
            error!(error = %e, "Collision query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let readiness = match state.handle.readiness() {
        Some(readiness) => readiness.to_string(),
        None => state.handle.model().to_string(),
    };

    Json(json!({
        "status": "ok",
        "readiness": readiness,
        "stats": state.engine.stats(),
    }))
}
