//! Intersectable geometry in the Earth-fixed frame.
//!
//! The engine never interprets asset payloads. Streaming collaborators hand
//! it [`Surface`] trait objects (one per tile, plus an optional terrain
//! surface) and the ray caster only ever asks them one question: how far
//! along this ray is your nearest surface?
//!
//! Two surfaces ship with the crate:
//!
//! - [`TriangleMesh`] - arbitrary triangle soup, optionally closed so that a
//!   ray starting inside it reports a zero-distance hit
//! - [`EllipsoidTerrain`] - the reference ellipsoid offset by a constant
//!   height, used when no real terrain provider is configured

mod bounds;
mod mesh;
mod ray;
mod terrain;

pub use bounds::Aabb;
pub use mesh::{Triangle, TriangleMesh};
pub use ray::Ray;
pub use terrain::EllipsoidTerrain;

use std::fmt::Debug;

/// Geometry the ray caster can intersect.
///
/// Implementations must be `Send + Sync`: snapshots of loaded tiles are
/// shared across the query daemon and background streaming tasks.
pub trait Surface: Send + Sync + Debug {
    /// Distance along `ray` to the nearest surface point at or ahead of its
    /// origin.
    ///
    /// Returns `Some(0.0)` when the origin is already inside a closed volume
    /// (or below terrain), and `None` when the ray never meets the surface.
    fn intersect(&self, ray: &Ray) -> Option<f64>;

    /// Conservative bounding box, if the surface is finite.
    fn bounds(&self) -> Option<Aabb> {
        None
    }
}
