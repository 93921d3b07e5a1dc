//! Axis-aligned bounding volumes used to cull tiles before mesh tests.

use glam::DVec3;
use serde::Serialize;

use super::Ray;

/// Axis-aligned box in the Earth-fixed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Smallest box enclosing all points. `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = DVec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self { min, max })
    }

    /// Grow the box by `margin` metres on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: self.min - DVec3::splat(margin),
            max: self.max + DVec3::splat(margin),
        }
    }

    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Slab test against the forward half of `ray`.
    pub fn intersects(&self, ray: &Ray) -> bool {
        let origin = ray.origin_vec();
        if self.contains(origin) {
            return true;
        }

        let dir = ray.direction();
        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < f64::EPSILON {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::CartesianPosition;

    fn unit_box() -> Aabb {
        Aabb::from_points([DVec3::ZERO, DVec3::ONE]).unwrap()
    }

    fn ray(origin: DVec3, dir: DVec3) -> Ray {
        Ray::new(CartesianPosition::from_vec(origin), dir).unwrap()
    }

    #[test]
    fn test_from_points() {
        let b = Aabb::from_points([
            DVec3::new(1.0, -2.0, 3.0),
            DVec3::new(-1.0, 5.0, 0.0),
        ])
        .unwrap();
        assert_eq!(b.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, DVec3::new(1.0, 5.0, 3.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_ray_hits_box_ahead() {
        let r = ray(DVec3::new(0.5, 0.5, 5.0), DVec3::NEG_Z);
        assert!(unit_box().intersects(&r));
    }

    #[test]
    fn test_ray_pointing_away_misses() {
        let r = ray(DVec3::new(0.5, 0.5, 5.0), DVec3::Z);
        assert!(!unit_box().intersects(&r));
    }

    #[test]
    fn test_parallel_ray_outside_slab_misses() {
        let r = ray(DVec3::new(2.0, 0.5, 5.0), DVec3::NEG_Z);
        assert!(!unit_box().intersects(&r));
    }

    #[test]
    fn test_origin_inside_always_intersects() {
        let r = ray(DVec3::splat(0.5), DVec3::X);
        assert!(unit_box().intersects(&r));
    }
}
