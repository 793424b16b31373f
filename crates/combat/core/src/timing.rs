//! Dial-angle to timing-score transform.
//!
//! The battle dial produces an angle at the moment of the player's gesture.
//! [`TimingCurve::resolve`] maps it onto a bounded [`TimingScore`]: maximal at
//! 0°, decaying along a raised cosine to the floor at 180°, and rising again
//! symmetrically towards 360°. The function is pure so it can be tested without
//! any frame timer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Quality of a timed gesture, always within `[0.0, 1.0]`.
///
/// The engine forwards the score to the backend untouched; damage math lives
/// on the server.
///
/// Deserialized values go through [`TimingScore::new`] and are clamped too.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct TimingScore(f64);

impl TimingScore {
    pub const MIN: Self = Self(0.0);
    pub const MAX: Self = Self(1.0);

    /// Creates a score, clamping into `[0.0, 1.0]`. NaN becomes 0.0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for TimingScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<TimingScore> for f64 {
    fn from(score: TimingScore) -> Self {
        score.0
    }
}

impl fmt::Display for TimingScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Cosine-shaped scoring curve between a floor and a ceiling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingCurve {
    floor: f64,
    ceiling: f64,
}

impl TimingCurve {
    pub const DEFAULT_FLOOR: f64 = 0.0;
    pub const DEFAULT_CEILING: f64 = 1.0;

    pub const fn new() -> Self {
        Self {
            floor: Self::DEFAULT_FLOOR,
            ceiling: Self::DEFAULT_CEILING,
        }
    }

    /// Raises the minimum score reached at 180°.
    #[must_use]
    pub fn with_floor(mut self, floor: f64) -> Self {
        let floor = if floor.is_nan() { 0.0 } else { floor };
        self.floor = floor.clamp(0.0, self.ceiling);
        self
    }

    pub const fn floor(&self) -> f64 {
        self.floor
    }

    pub const fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Resolves a dial angle in degrees to a score.
    ///
    /// Angles wrap at 360 and negative angles are normalized into `[0, 360)`.
    /// Non-finite angles resolve to the floor.
    pub fn resolve(&self, angle_degrees: f64) -> TimingScore {
        if !angle_degrees.is_finite() {
            return TimingScore::new(self.floor);
        }

        let normalized = normalize_degrees(angle_degrees);
        let weight = (1.0 + normalized.to_radians().cos()) / 2.0;
        let score = self.floor + (self.ceiling - self.floor) * weight;

        TimingScore::new(score.clamp(self.floor, self.ceiling))
    }
}

impl Default for TimingCurve {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves an angle with the default curve.
pub fn resolve(angle_degrees: f64) -> TimingScore {
    TimingCurve::new().resolve(angle_degrees)
}

fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
