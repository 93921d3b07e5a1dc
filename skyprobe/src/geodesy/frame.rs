//! Local east/north/up tangent frame.

use glam::DVec3;

use super::{CartesianPosition, GeodeticPosition};

/// East/north/up basis anchored at a geodetic position.
///
/// Offsets are in metres; `up` follows the ellipsoid normal, so a positive
/// `up` offset raises the geodetic height by the same amount at the anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: DVec3,
    east: DVec3,
    north: DVec3,
    up: DVec3,
}

impl LocalFrame {
    pub(super) fn new(origin: CartesianPosition, anchor: &GeodeticPosition, up: DVec3) -> Self {
        let lon = anchor.longitude().to_radians();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let east = DVec3::new(-sin_lon, cos_lon, 0.0);
        let north = up.cross(east);
        Self {
            origin: origin.as_vec(),
            east,
            north,
            up,
        }
    }

    /// ECEF position of the anchor.
    pub fn origin(&self) -> CartesianPosition {
        CartesianPosition::from_vec(self.origin)
    }

    pub fn east(&self) -> DVec3 {
        self.east
    }

    pub fn north(&self) -> DVec3 {
        self.north
    }

    pub fn up(&self) -> DVec3 {
        self.up
    }

    /// Convert a local (east, north, up) offset to an ECEF vector.
    pub fn to_world(&self, enu: DVec3) -> DVec3 {
        self.origin + self.east * enu.x + self.north * enu.y + self.up * enu.z
    }

    /// Convert an ECEF point to a local (east, north, up) offset.
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        let d = world - self.origin;
        DVec3::new(d.dot(self.east), d.dot(self.north), d.dot(self.up))
    }
}
