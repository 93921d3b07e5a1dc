//! Skyprobe - collision proximity for probes over streamed 3D scenes
//!
//! Given a geodetic position (longitude, latitude, height), Skyprobe reports
//! whether that point is inside, near, or clear of the geometry of a scene
//! whose tiles stream in asynchronously.
//!
//! # Layers
//!
//! - [`geodesy`]: WGS84 geodetic and Earth-centred Cartesian positions
//! - [`geometry`]: rays, bounds and intersectable surfaces
//! - [`scene`]: tiles, their load lifecycle and scene sources
//! - [`readiness`]: deciding when a loading scene can be queried
//! - [`raycast`]: nearest, multi-axis and drill casting strategies
//! - [`classify`]: distance to verdict
//! - [`engine`]: request/response over a shared or per-query scene
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use skyprobe::{CollisionEngine, EngineConfig, GeodeticInput, StaticSceneSource};
//!
//! let engine = CollisionEngine::new(EngineConfig::default(), Arc::new(StaticSceneSource::new("empty")));
//! let scene = engine.initialize_scene().await?;
//! let result = engine
//!     .check_collision(&scene, GeodeticInput { longitude: 0.0, latitude: 0.0, height: 100.0 })
//!     .await?;
//! ```

pub mod classify;
pub mod config;
pub mod engine;
pub mod geodesy;
pub mod geometry;
#[cfg(feature = "http-api")]
pub mod http;
pub mod logging;
pub mod raycast;
pub mod readiness;
pub mod scene;

pub use classify::{CollisionClassifier, CollisionVerdict, Thresholds};
pub use config::{ConcurrencyModel, ConfigFile, EngineConfig};
pub use engine::{CollisionEngine, CollisionResult, EngineError, SceneHandle};
pub use geodesy::{CoordinateConverter, GeodeticInput, GeodeticPosition};
pub use raycast::{CastStrategy, RayCaster};
pub use readiness::{ReadinessState, ReadinessTracker};
pub use scene::{DescriptorSceneSource, SceneSource, StaticSceneSource};

/// Crate version, for banners and logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
