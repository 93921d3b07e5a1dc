//! Rays in the Earth-fixed frame.

use glam::DVec3;

use crate::geodesy::CartesianPosition;

/// A half-line with an origin and a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: DVec3,
    direction: DVec3,
}

impl Ray {
    /// Build a ray, normalizing `direction`.
    ///
    /// Returns `None` if the direction is zero or not finite.
    pub fn new(origin: CartesianPosition, direction: DVec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self {
            origin: origin.as_vec(),
            direction,
        })
    }

    /// Ray origin.
    pub fn origin(&self) -> CartesianPosition {
        CartesianPosition::from_vec(self.origin)
    }

    /// Unit direction.
    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub(crate) fn origin_vec(&self) -> DVec3 {
        self.origin
    }

    /// Point at distance `t` along the ray.
    pub fn at(&self, t: f64) -> CartesianPosition {
        CartesianPosition::from_vec(self.origin + self.direction * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_is_normalized() {
        let ray = Ray::new(
            CartesianPosition::from_vec(DVec3::ZERO),
            DVec3::new(3.0, 4.0, 0.0),
        )
        .unwrap();
        assert!((ray.direction().length() - 1.0).abs() < 1e-12);
        assert_eq!(ray.at(5.0).as_vec(), DVec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_zero_direction_rejected() {
        let origin = CartesianPosition::from_vec(DVec3::ONE);
        assert!(Ray::new(origin, DVec3::ZERO).is_none());
        assert!(Ray::new(origin, DVec3::new(f64::NAN, 1.0, 0.0)).is_none());
    }
}
