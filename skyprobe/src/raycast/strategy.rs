//! Cast strategies and ray directions.

use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::{Serialize, Serializer};

/// Default cap on drill hits.
pub const DEFAULT_DRILL_MAX_HITS: usize = 10;

/// How rays are built from a query point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CastStrategy {
    /// One ray straight down the local vertical; first hit only.
    #[default]
    NearestSurface,
    /// Six rays along the Earth-fixed axes; the first axis that hits wins.
    ///
    /// This is a sampling heuristic, not a nearest-distance search. Geometry
    /// that lies off all six axes is invisible to it, so a probe can report
    /// `Clear` while a structure sits a few metres away diagonally.
    MultiAxis,
    /// One ray down the local vertical; every surface it passes through.
    Drill { max_hits: usize },
}

impl CastStrategy {
    pub fn drill() -> Self {
        CastStrategy::Drill {
            max_hits: DEFAULT_DRILL_MAX_HITS,
        }
    }

    /// Stable name used in config files and results.
    pub fn name(&self) -> &'static str {
        match self {
            CastStrategy::NearestSurface => "nearest",
            CastStrategy::MultiAxis => "multi-axis",
            CastStrategy::Drill { .. } => "drill",
        }
    }
}

impl fmt::Display for CastStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for CastStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Unrecognised strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cast strategy '{0}' (expected nearest, multi-axis or drill)")]
pub struct UnknownStrategy(pub String);

impl FromStr for CastStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" | "nearest-surface" => Ok(CastStrategy::NearestSurface),
            "multi-axis" | "multiaxis" | "axes" => Ok(CastStrategy::MultiAxis),
            "drill" => Ok(CastStrategy::drill()),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Earth-fixed axis directions probed by [`CastStrategy::MultiAxis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    PosX,
    PosY,
    PosZ,
    NegX,
    NegY,
    NegZ,
}

impl Axis {
    /// Evaluation order. Fixed so results are reproducible.
    pub const ORDER: [Axis; 6] = [
        Axis::PosX,
        Axis::PosY,
        Axis::PosZ,
        Axis::NegX,
        Axis::NegY,
        Axis::NegZ,
    ];

    pub fn direction(self) -> DVec3 {
        match self {
            Axis::PosX => DVec3::X,
            Axis::PosY => DVec3::Y,
            Axis::PosZ => DVec3::Z,
            Axis::NegX => DVec3::NEG_X,
            Axis::NegY => DVec3::NEG_Y,
            Axis::NegZ => DVec3::NEG_Z,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::PosX => "+x",
            Axis::PosY => "+y",
            Axis::PosZ => "+z",
            Axis::NegX => "-x",
            Axis::NegY => "-y",
            Axis::NegZ => "-z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Axis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy_names() {
        assert_eq!("nearest".parse(), Ok(CastStrategy::NearestSurface));
        assert_eq!("Multi-Axis".parse(), Ok(CastStrategy::MultiAxis));
        assert_eq!(
            " drill ".parse(),
            Ok(CastStrategy::Drill {
                max_hits: DEFAULT_DRILL_MAX_HITS
            })
        );
        assert!("sideways".parse::<CastStrategy>().is_err());
    }

    #[test]
    fn test_name_roundtrip() {
        for s in [
            CastStrategy::NearestSurface,
            CastStrategy::MultiAxis,
            CastStrategy::drill(),
        ] {
            assert_eq!(s.name().parse::<CastStrategy>().unwrap(), s);
        }
    }

    #[test]
    fn test_axis_order_is_positive_then_negative() {
        let names: Vec<_> = Axis::ORDER.iter().map(|a| a.name()).collect();
        assert_eq!(names, ["+x", "+y", "+z", "-x", "-y", "-z"]);
    }

    #[test]
    fn test_axis_directions_are_unit() {
        for axis in Axis::ORDER {
            assert!((axis.direction().length() - 1.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_strategy_serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&CastStrategy::MultiAxis).unwrap(),
            "\"multi-axis\""
        );
    }
}
