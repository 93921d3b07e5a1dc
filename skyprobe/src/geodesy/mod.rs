//! Geodetic coordinate conversion module
//!
//! Provides conversions between geodetic positions (longitude, latitude,
//! height above the ellipsoid) and Earth-centred, Earth-fixed (ECEF)
//! Cartesian coordinates, plus the local east/north/up frame used to place
//! geometry and to find the local vertical.
//!
//! All conversions default to the WGS84 ellipsoid; [`CoordinateConverter`]
//! carries a custom [`Ellipsoid`] when one is needed.

mod frame;
mod types;

pub use frame::LocalFrame;
pub use types::{
    CartesianPosition, Ellipsoid, GeoError, GeodeticInput, GeodeticPosition, MAX_LAT, MAX_LON,
    MIN_LAT, MIN_LON,
};

use glam::DVec3;

/// Maximum Bowring iterations for the inverse transform.
const MAX_INVERSE_ITERATIONS: usize = 16;

/// Latitude convergence tolerance in radians (~0.006 mm on the surface).
const LATITUDE_TOLERANCE_RAD: f64 = 1e-15;

/// Converts between geodetic and Cartesian positions on one ellipsoid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinateConverter {
    ellipsoid: Ellipsoid,
}

impl CoordinateConverter {
    /// Converter for a specific ellipsoid.
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    /// The ellipsoid this converter works on.
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Geodetic → ECEF.
    ///
    /// A [`GeodeticPosition`] can only exist in validated form, so this
    /// cannot fail. Use [`CoordinateConverter::from_degrees`] for raw input.
    #[inline]
    pub fn to_cartesian(&self, position: &GeodeticPosition) -> CartesianPosition {
        let lat = position.latitude().to_radians();
        let lon = position.longitude().to_radians();
        let h = position.height();

        let a = self.ellipsoid.semi_major();
        let e2 = self.ellipsoid.eccentricity_squared();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        // Prime vertical radius of curvature
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

        CartesianPosition::from_vec(DVec3::new(
            (n + h) * cos_lat * cos_lon,
            (n + h) * cos_lat * sin_lon,
            (n * (1.0 - e2) + h) * sin_lat,
        ))
    }

    /// Validate raw degrees/metres and convert to ECEF.
    pub fn from_degrees(
        &self,
        longitude: f64,
        latitude: f64,
        height: f64,
    ) -> Result<CartesianPosition, GeoError> {
        let position = GeodeticPosition::new(longitude, latitude, height)?;
        Ok(self.to_cartesian(&position))
    }

    /// ECEF → geodetic.
    ///
    /// Uses Bowring-style fixed-point iteration on latitude with the
    /// pole-stable height formula
    /// `h = p·cosφ + z·sinφ − a·√(1 − e²·sin²φ)`.
    pub fn to_geodetic(&self, position: &CartesianPosition) -> Result<GeodeticPosition, GeoError> {
        let v = position.as_vec();
        if !v.is_finite() || v == DVec3::ZERO {
            return Err(GeoError::Degenerate(v.to_array()));
        }

        let a = self.ellipsoid.semi_major();
        let e2 = self.ellipsoid.eccentricity_squared();
        let p = v.x.hypot(v.y);

        let lon = v.y.atan2(v.x);
        let mut lat = v.z.atan2(p * (1.0 - e2));
        let mut height = 0.0;

        for _ in 0..MAX_INVERSE_ITERATIONS {
            let (sin_lat, cos_lat) = lat.sin_cos();
            let root = (1.0 - e2 * sin_lat * sin_lat).sqrt();
            let n = a / root;
            height = p * cos_lat + v.z * sin_lat - a * root;

            let next = v.z.atan2(p * (1.0 - e2 * n / (n + height)));
            let delta = (next - lat).abs();
            lat = next;
            if delta < LATITUDE_TOLERANCE_RAD {
                let (sin_lat, cos_lat) = lat.sin_cos();
                let root = (1.0 - e2 * sin_lat * sin_lat).sqrt();
                height = p * cos_lat + v.z * sin_lat - a * root;
                break;
            }
        }

        GeodeticPosition::new(lon.to_degrees(), lat.to_degrees(), height)
    }

    /// Unit vector along the ellipsoid normal ("up") at a position.
    pub fn up(&self, position: &GeodeticPosition) -> DVec3 {
        let lat = position.latitude().to_radians();
        let lon = position.longitude().to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
    }

    /// East/north/up frame anchored at a position.
    pub fn local_frame(&self, anchor: &GeodeticPosition) -> LocalFrame {
        LocalFrame::new(self.to_cartesian(anchor), anchor, self.up(anchor))
    }
}

/// Geodetic → ECEF on WGS84.
#[inline]
pub fn to_cartesian(position: &GeodeticPosition) -> CartesianPosition {
    CoordinateConverter::default().to_cartesian(position)
}

/// ECEF → geodetic on WGS84.
#[inline]
pub fn to_geodetic(position: &CartesianPosition) -> Result<GeodeticPosition, GeoError> {
    CoordinateConverter::default().to_geodetic(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn lon_diff(a: f64, b: f64) -> f64 {
        // ±180 describe the same meridian
        let d = (a - b).abs();
        d.min(360.0 - d)
    }

    #[test]
    fn test_equator_prime_meridian() {
        let p = GeodeticPosition::new(0.0, 0.0, 0.0).unwrap();
        let c = to_cartesian(&p).as_vec();
        assert!((c.x - 6_378_137.0).abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);
        assert!(c.z.abs() < 1e-6);
    }

    #[test]
    fn test_north_pole() {
        let p = GeodeticPosition::new(0.0, 90.0, 100.0).unwrap();
        let c = to_cartesian(&p).as_vec();
        assert!((c.z - (Ellipsoid::WGS84.semi_minor() + 100.0)).abs() < 1e-6);
        assert!(c.x.abs() < 1e-6);
    }

    #[test]
    fn test_known_point_xiaoshan() {
        // Hangzhou/Xiaoshan area
        let c = CoordinateConverter::default()
            .from_degrees(120.26, 30.18, 0.0)
            .unwrap()
            .as_vec();
        assert!((c.x - (-2_780_784.019)).abs() < 0.01, "x = {}", c.x);
        assert!((c.y - 4_766_377.304).abs() < 0.01, "y = {}", c.y);
        assert!((c.z - 3_187_638.458).abs() < 0.01, "z = {}", c.z);
    }

    #[test]
    fn test_from_degrees_rejects_out_of_range() {
        let converter = CoordinateConverter::default();
        assert!(matches!(
            converter.from_degrees(200.0, 0.0, 0.0),
            Err(GeoError::InvalidLongitude(_))
        ));
        assert!(matches!(
            converter.from_degrees(0.0, 91.0, 0.0),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            converter.from_degrees(0.0, 0.0, f64::NAN),
            Err(GeoError::InvalidHeight(_))
        ));
    }

    #[test]
    fn test_to_geodetic_rejects_centre_and_nan() {
        let origin = CartesianPosition::from_vec(DVec3::ZERO);
        assert!(matches!(
            to_geodetic(&origin),
            Err(GeoError::Degenerate(_))
        ));
        let nan = CartesianPosition::from_vec(DVec3::new(f64::NAN, 0.0, 0.0));
        assert!(to_geodetic(&nan).is_err());
    }

    #[test]
    fn test_roundtrip_random_positions() {
        let mut rng = StdRng::seed_from_u64(0x5eed_cafe);

        for _ in 0..10_000 {
            let lon = rng.random_range(-180.0..=180.0);
            let lat = rng.random_range(-90.0..=90.0);
            let height = rng.random_range(-1_000.0..50_000.0);
            let original = GeodeticPosition::new(lon, lat, height).unwrap();

            let back = to_geodetic(&to_cartesian(&original)).unwrap();

            assert!(
                (back.latitude() - lat).abs() <= 1e-6,
                "lat {} -> {}",
                lat,
                back.latitude()
            );
            // Longitude is undefined exactly at the poles
            if lat.abs() < 89.999_999 {
                assert!(
                    lon_diff(back.longitude(), lon) <= 1e-6,
                    "lon {} -> {}",
                    lon,
                    back.longitude()
                );
            }
            assert!(
                (back.height() - height).abs() <= 1e-3,
                "height {} -> {}",
                height,
                back.height()
            );
        }
    }

    #[test]
    fn test_up_vector_is_unit_and_outward() {
        let p = GeodeticPosition::new(45.0, 45.0, 0.0).unwrap();
        let converter = CoordinateConverter::default();
        let up = converter.up(&p);
        assert!((up.length() - 1.0).abs() < 1e-12);
        assert!(up.dot(to_cartesian(&p).as_vec()) > 0.0);
    }

    #[test]
    fn test_up_vector_raises_height() {
        let converter = CoordinateConverter::default();
        let p = GeodeticPosition::new(-73.9, 40.7, 10.0).unwrap();
        let raised = CartesianPosition::from_vec(to_cartesian(&p).as_vec() + converter.up(&p) * 50.0);
        let back = converter.to_geodetic(&raised).unwrap();
        assert!((back.height() - 60.0).abs() < 1e-6);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_roundtrip_property(
                lon in -179.999..180.0_f64,
                lat in -89.9..89.9_f64,
                height in -500.0..100_000.0_f64
            ) {
                let original = GeodeticPosition::new(lon, lat, height)?;
                let back = to_geodetic(&to_cartesian(&original))?;

                prop_assert!(lon_diff(back.longitude(), lon) <= 1e-6);
                prop_assert!((back.latitude() - lat).abs() <= 1e-6);
                prop_assert!((back.height() - height).abs() <= 1e-3);
            }

            #[test]
            fn test_invalid_longitude_always_rejected(
                lon in prop_oneof![-1.0e6..-180.000_001_f64, 180.000_001..1.0e6_f64],
                lat in -90.0..=90.0_f64
            ) {
                prop_assert!(GeodeticPosition::new(lon, lat, 0.0).is_err());
            }
        }
    }
}
