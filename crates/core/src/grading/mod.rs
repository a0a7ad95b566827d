use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::BeatTiming;
use crate::{BeatError, Result, TimingConfig};

/// Accuracy of an action relative to the nearest beat. Ordered from best to
/// worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccuracyGrade {
    Perfect,
    Good,
    Miss,
}

impl AccuracyGrade {
    /// Text shown to the player as timing feedback.
    pub fn label(self) -> &'static str {
        match self {
            AccuracyGrade::Perfect => "PERFECT!",
            AccuracyGrade::Good => "GOOD",
            AccuracyGrade::Miss => "MISS",
        }
    }
}

impl fmt::Display for AccuracyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Grade boundaries in seconds from the nearest beat. Both are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    perfect: f64,
    good: f64,
}

impl Thresholds {
    pub fn new(perfect: f64, good: f64) -> Result<Self> {
        if !(perfect.is_finite() && good.is_finite()) || perfect < 0.0 || perfect > good {
            return Err(BeatError::config(format!(
                "grading thresholds must satisfy 0 <= perfect <= good, got {perfect} / {good}"
            )));
        }
        Ok(Self { perfect, good })
    }

    pub fn from_config(config: &TimingConfig) -> Result<Self> {
        Self::new(config.perfect_threshold_secs, config.good_threshold_secs)
    }

    pub fn perfect(&self) -> f64 {
        self.perfect
    }

    pub fn good(&self) -> f64 {
        self.good
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            perfect: 0.05,
            good: 0.1,
        }
    }
}

/// Grades an offset, in seconds, from the nearest beat boundary.
pub fn classify(offset_secs: f64, thresholds: &Thresholds) -> AccuracyGrade {
    if offset_secs.is_nan() || offset_secs < 0.0 {
        AccuracyGrade::Miss
    } else if offset_secs <= thresholds.perfect {
        AccuracyGrade::Perfect
    } else if offset_secs <= thresholds.good {
        AccuracyGrade::Good
    } else {
        AccuracyGrade::Miss
    }
}

/// Grades an action taken at `now`. Always a miss without a beat grid.
pub fn grade_at(timing: &BeatTiming, now: f64, thresholds: &Thresholds) -> AccuracyGrade {
    timing
        .seconds_to_nearest_beat(now)
        .map(|offset| classify(offset, thresholds))
        .unwrap_or(AccuracyGrade::Miss)
}
