//! Ellipsoid-based terrain surface.

use glam::DVec3;

use super::{Ray, Surface};
use crate::geodesy::Ellipsoid;

/// The reference ellipsoid raised by a constant height.
///
/// Stands in for a real terrain provider: a scene over flat ground at 12 m
/// above the ellipsoid uses `EllipsoidTerrain::new(Ellipsoid::WGS84, 12.0)`.
/// Points below the surface are "inside" the terrain and report a
/// zero-distance hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsoidTerrain {
    radii: DVec3,
    height: f64,
}

impl EllipsoidTerrain {
    pub fn new(ellipsoid: Ellipsoid, height: f64) -> Self {
        Self {
            radii: ellipsoid.offset_radii(height),
            height,
        }
    }

    /// Terrain height above the ellipsoid in metres.
    pub fn height(&self) -> f64 {
        self.height
    }
}

impl Surface for EllipsoidTerrain {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        // Scale into unit-sphere space; the ray parameter is unchanged.
        let o = ray.origin_vec() / self.radii;
        let d = ray.direction() / self.radii;

        let a = d.length_squared();
        let b = 2.0 * o.dot(d);
        let c = o.length_squared() - 1.0;

        if c <= 0.0 {
            return Some(0.0);
        }

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }

        // Numerically stable quadratic roots
        let q = -0.5 * (b + b.signum() * disc.sqrt());
        let (t0, t1) = {
            let r0 = q / a;
            let r1 = c / q;
            if r0 < r1 {
                (r0, r1)
            } else {
                (r1, r0)
            }
        };

        // Origin is outside, so both roots share a sign.
        if t0 >= 0.0 {
            Some(t0)
        } else if t1 >= 0.0 {
            Some(t1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::{to_cartesian, CoordinateConverter, GeodeticPosition};

    fn down_ray(lon: f64, lat: f64, height: f64) -> Ray {
        let p = GeodeticPosition::new(lon, lat, height).unwrap();
        let up = CoordinateConverter::default().up(&p);
        Ray::new(to_cartesian(&p), -up).unwrap()
    }

    #[test]
    fn test_vertical_distance_to_ground() {
        let terrain = EllipsoidTerrain::new(Ellipsoid::WGS84, 0.0);
        let d = terrain.intersect(&down_ray(120.26, 30.18, 300.0)).unwrap();
        assert!((d - 300.0).abs() < 1e-3, "distance = {}", d);
    }

    #[test]
    fn test_raised_terrain() {
        let terrain = EllipsoidTerrain::new(Ellipsoid::WGS84, 25.0);
        let d = terrain.intersect(&down_ray(-3.7, 40.4, 125.0)).unwrap();
        assert!((d - 100.0).abs() < 1e-2, "distance = {}", d);
    }

    #[test]
    fn test_below_ground_is_inside() {
        let terrain = EllipsoidTerrain::new(Ellipsoid::WGS84, 10.0);
        assert_eq!(terrain.intersect(&down_ray(0.0, 0.0, 5.0)), Some(0.0));
    }

    #[test]
    fn test_upward_ray_misses() {
        let terrain = EllipsoidTerrain::new(Ellipsoid::WGS84, 0.0);
        let p = GeodeticPosition::new(0.0, 45.0, 100.0).unwrap();
        let up = CoordinateConverter::default().up(&p);
        let ray = Ray::new(to_cartesian(&p), up).unwrap();
        assert!(terrain.intersect(&ray).is_none());
    }
}
