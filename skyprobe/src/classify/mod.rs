//! Distance-based collision classification.
//!
//! Turns the raw distance from a cast into a [`CollisionVerdict`] using a
//! pair of [`Thresholds`]:
//!
//! ```text
//!   0 ────────── inside ────────── nearby ──────────► distance
//!   │   Inside     │     Nearby      │     Clear
//! ```
//!
//! No hit at all is always `Clear`. Classification is pure.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::raycast::{CastOutcome, Intersection};

/// Default distance below which a probe counts as inside geometry (metres).
pub const DEFAULT_INSIDE_THRESHOLD_M: f64 = 120.0;

/// Default distance below which a probe counts as nearby (metres).
pub const DEFAULT_NEARBY_THRESHOLD_M: f64 = 200.0;

/// Threshold pair rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidThresholds {
    #[error("Thresholds must be finite and non-negative (inside={inside}, nearby={nearby})")]
    OutOfRange { inside: f64, nearby: f64 },

    #[error("Inside threshold {inside} must be below nearby threshold {nearby}")]
    NotIncreasing { inside: f64, nearby: f64 },
}

/// Validated `inside < nearby` distance pair in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    inside: f64,
    nearby: f64,
}

impl Thresholds {
    pub fn new(inside: f64, nearby: f64) -> Result<Self, InvalidThresholds> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(inside) || !valid(nearby) {
            return Err(InvalidThresholds::OutOfRange { inside, nearby });
        }
        if inside >= nearby {
            return Err(InvalidThresholds::NotIncreasing { inside, nearby });
        }
        Ok(Self { inside, nearby })
    }

    pub fn inside(&self) -> f64 {
        self.inside
    }

    pub fn nearby(&self) -> f64 {
        self.nearby
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            inside: DEFAULT_INSIDE_THRESHOLD_M,
            nearby: DEFAULT_NEARBY_THRESHOLD_M,
        }
    }
}

/// Outcome of a collision check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "distance", rename_all = "snake_case")]
pub enum CollisionVerdict {
    Clear,
    Nearby(f64),
    Inside(f64),
}

impl CollisionVerdict {
    /// Severity rank: Clear < Nearby < Inside.
    pub fn severity(&self) -> u8 {
        match self {
            CollisionVerdict::Clear => 0,
            CollisionVerdict::Nearby(_) => 1,
            CollisionVerdict::Inside(_) => 2,
        }
    }

    pub fn is_collision(&self) -> bool {
        matches!(self, CollisionVerdict::Inside(_))
    }

    pub fn distance(&self) -> Option<f64> {
        match self {
            CollisionVerdict::Clear => None,
            CollisionVerdict::Nearby(d) | CollisionVerdict::Inside(d) => Some(*d),
        }
    }
}

impl fmt::Display for CollisionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionVerdict::Clear => write!(f, "clear"),
            CollisionVerdict::Nearby(d) => write!(f, "nearby ({:.2} m)", d),
            CollisionVerdict::Inside(d) => write!(f, "inside ({:.2} m)", d),
        }
    }
}

/// Classify a single distance.
pub fn classify(distance: Option<f64>, thresholds: &Thresholds) -> CollisionVerdict {
    match distance {
        None => CollisionVerdict::Clear,
        Some(d) if d < thresholds.inside => CollisionVerdict::Inside(d),
        Some(d) if d < thresholds.nearby => CollisionVerdict::Nearby(d),
        Some(_) => CollisionVerdict::Clear,
    }
}

/// Classifier bound to one threshold pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionClassifier {
    thresholds: Thresholds,
}

impl CollisionClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn classify(&self, distance: Option<f64>) -> CollisionVerdict {
        classify(distance, &self.thresholds)
    }

    /// Classify a cast, returning the verdict and the hit that governed it.
    ///
    /// Drill casts are governed by their closest hit; multi-axis casts carry
    /// only the first successful axis's hit.
    pub fn classify_outcome<'a>(
        &self,
        outcome: &'a CastOutcome,
    ) -> (CollisionVerdict, Option<&'a Intersection>) {
        let governing = outcome.nearest();
        (self.classify(governing.map(|h| h.distance)), governing)
    }
}
