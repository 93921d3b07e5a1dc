//! Position value types and the reference ellipsoid.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors raised while validating or converting positions.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not a number.
    #[error("invalid latitude: {0} (must be within -90..=90)")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not a number.
    #[error("invalid longitude: {0} (must be within -180..=180)")]
    InvalidLongitude(f64),

    /// Height is NaN or infinite.
    #[error("invalid height: {0} (must be finite)")]
    InvalidHeight(f64),

    /// Cartesian point has no geodetic equivalent (non-finite or at the centre).
    #[error("cartesian position {0:?} cannot be converted to geodetic coordinates")]
    Degenerate([f64; 3]),
}

/// A point on or above the reference ellipsoid.
///
/// Longitude and latitude are in degrees, height in metres above the
/// ellipsoid (negative below it). Construct through [`GeodeticPosition::new`],
/// which validates all three fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticPosition {
    longitude: f64,
    latitude: f64,
    height: f64,
}

impl GeodeticPosition {
    /// Create a validated position.
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Result<Self, GeoError> {
        // `contains` is false for NaN, so NaN is rejected here too.
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !height.is_finite() {
            return Err(GeoError::InvalidHeight(height));
        }
        Ok(Self {
            longitude,
            latitude,
            height,
        })
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Height above the ellipsoid in metres.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Same horizontal position at a different height.
    pub fn with_height(&self, height: f64) -> Result<Self, GeoError> {
        Self::new(self.longitude, self.latitude, height)
    }
}

impl fmt::Display for GeodeticPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}°, {:.6}°, {:.2} m)",
            self.longitude, self.latitude, self.height
        )
    }
}

/// Raw, unvalidated input as it arrives from callers (JSON bodies, CLI args).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticInput {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl TryFrom<GeodeticInput> for GeodeticPosition {
    type Error = GeoError;

    fn try_from(input: GeodeticInput) -> Result<Self, Self::Error> {
        GeodeticPosition::new(input.longitude, input.latitude, input.height)
    }
}

/// A point in the Earth-centred, Earth-fixed frame (metres).
///
/// Produced by [`super::to_cartesian`] or by geometry code working in the
/// same frame; query callers never build one by hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CartesianPosition(DVec3);

impl CartesianPosition {
    pub(crate) const fn from_vec(v: DVec3) -> Self {
        Self(v)
    }

    /// Underlying vector.
    pub fn as_vec(&self) -> DVec3 {
        self.0
    }

    /// Straight-line distance to another point in metres.
    pub fn distance(&self, other: &CartesianPosition) -> f64 {
        self.0.distance(other.0)
    }
}

impl From<CartesianPosition> for DVec3 {
    fn from(p: CartesianPosition) -> Self {
        p.0
    }
}

/// Reference ellipsoid (semi-major axis `a`, semi-minor axis `b`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    semi_major: f64,
    semi_minor: f64,
}

impl Ellipsoid {
    /// WGS84 reference ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major: 6_378_137.0,
        semi_minor: 6_356_752.314_245_179,
    };

    /// Custom ellipsoid. Radii must be positive with `semi_minor <= semi_major`.
    pub fn new(semi_major: f64, semi_minor: f64) -> Option<Self> {
        if semi_major > 0.0 && semi_minor > 0.0 && semi_minor <= semi_major {
            Some(Self {
                semi_major,
                semi_minor,
            })
        } else {
            None
        }
    }

    pub fn semi_major(&self) -> f64 {
        self.semi_major
    }

    pub fn semi_minor(&self) -> f64 {
        self.semi_minor
    }

    /// First eccentricity squared.
    pub fn eccentricity_squared(&self) -> f64 {
        let a2 = self.semi_major * self.semi_major;
        (a2 - self.semi_minor * self.semi_minor) / a2
    }

    /// Radii of the surface offset by `height` along each axis.
    ///
    /// This is the ellipsoid scaled outward by `height`. It deviates from the
    /// true constant-height surface by roughly a millimetre per kilometre of
    /// offset.
    pub fn offset_radii(&self, height: f64) -> DVec3 {
        let a = self.semi_major + height;
        let b = self.semi_minor + height;
        DVec3::new(a, a, b)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}
