use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::Verdict;

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 0.7;
pub const DEFAULT_MISMATCH_THRESHOLD_KM: f64 = 0.5;

/// Dual distance cutoffs. `max_distance_km` is inclusive-missing (a distance
/// equal to it is missing); `mismatch_threshold_km` is exclusive (a distance
/// equal to it still matches).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_max_distance")]
    pub max_distance_km: f64,
    #[serde(default = "default_mismatch_threshold")]
    pub mismatch_threshold_km: f64,
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE_KM
}

fn default_mismatch_threshold() -> f64 {
    DEFAULT_MISMATCH_THRESHOLD_KM
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            mismatch_threshold_km: DEFAULT_MISMATCH_THRESHOLD_KM,
        }
    }
}

impl Thresholds {
    pub fn new(max_distance_km: f64, mismatch_threshold_km: f64) -> Result<Self, ReconError> {
        let t = Self {
            max_distance_km,
            mismatch_threshold_km,
        };
        t.validate()?;
        Ok(t)
    }

    /// Both positive and finite, mismatch strictly below max.
    pub fn validate(&self) -> Result<(), ReconError> {
        let ok = self.max_distance_km.is_finite()
            && self.mismatch_threshold_km.is_finite()
            && self.mismatch_threshold_km > 0.0
            && self.max_distance_km > 0.0
            && self.mismatch_threshold_km < self.max_distance_km;
        if ok {
            Ok(())
        } else {
            Err(ReconError::InvalidThresholds {
                max_distance_km: self.max_distance_km,
                mismatch_threshold_km: self.mismatch_threshold_km,
            })
        }
    }
}

/// Classify a nearest-neighbor distance.
///
/// `nearest` is `None` when the target pool had no coordinate-bearing
/// candidates, which can never match.
pub fn classify(nearest: Option<f64>, thresholds: &Thresholds) -> Verdict {
    match nearest {
        None => Verdict::MissingInTarget,
        Some(d) if d >= thresholds.max_distance_km => Verdict::MissingInTarget,
        Some(d) if d > thresholds.mismatch_threshold_km => Verdict::Mismatched { distance: d },
        Some(_) => Verdict::Matched,
    }
}
