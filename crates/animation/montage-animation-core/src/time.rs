//! Timeline position in seconds.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::AnimationError;

/// A finite timeline position. Construction rejects NaN and infinities so that
/// keyframe ordering is total.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Time(f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn from_secs(secs: f64) -> Result<Self, AnimationError> {
        if secs.is_finite() {
            // -0.0 + 0.0 == +0.0, so both zeros share one ordering slot.
            Ok(Time(secs + 0.0))
        } else {
            Err(AnimationError::InvalidTime { time: secs })
        }
    }

    pub fn from_millis(ms: i64) -> Self {
        Time(ms as f64 / 1000.0)
    }

    #[inline]
    pub fn as_secs(self) -> f64 {
        self.0
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Time {
    type Error = AnimationError;
    fn try_from(secs: f64) -> Result<Self, Self::Error> {
        Time::from_secs(secs)
    }
}

impl From<Time> for f64 {
    fn from(t: Time) -> f64 {
        t.0
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
