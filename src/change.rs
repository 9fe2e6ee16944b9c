//! Change attribution between a current period and its lookback window.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};

/// Tolerance for the ratio comparison, so a shift of exactly `min_ratio`
/// counts as significant despite float rounding.
const RATIO_EPSILON: f64 = 1e-9;

/// Trend of a narrative's volume between two windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    New,
    Disappearing,
    Increase,
    Decrease,
    Steady,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::New => "new",
            ChangeStatus::Disappearing => "disappearing",
            ChangeStatus::Increase => "increase",
            ChangeStatus::Decrease => "decrease",
            ChangeStatus::Steady => "steady",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gates for change attribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeThresholds {
    /// Number of prior periods summed into `prior_count`.
    pub lookback: usize,
    /// Minimum sentence count for either window to be considered.
    pub min_count: u64,
    /// Minimum absolute relative shift for increase/decrease.
    pub min_ratio: f64,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            lookback: 4,
            min_count: 3,
            min_ratio: 0.4,
        }
    }
}

impl ChangeThresholds {
    pub fn new(lookback: usize, min_count: u64, min_ratio: f64) -> ConfigResult<Self> {
        let thresholds = Self {
            lookback,
            min_count,
            min_ratio,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// `lookback` and `min_count` must be at least 1; `min_ratio` must be a
    /// non-negative number.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.lookback == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "lookback".to_string(),
                value: 0.0,
            });
        }
        if self.min_count == 0 {
            return Err(ConfigError::InvalidThreshold {
                field: "min_count".to_string(),
                value: 0.0,
            });
        }
        if !self.min_ratio.is_finite() || self.min_ratio < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                field: "min_ratio".to_string(),
                value: self.min_ratio,
            });
        }
        Ok(())
    }
}

/// `(current - prior) / prior`, or `None` when `prior` is zero.
pub fn relative_change(current: u64, prior: u64) -> Option<f64> {
    if prior == 0 {
        return None;
    }
    Some((current as f64 - prior as f64) / prior as f64)
}

/// Classify one narrative's change.
///
/// Checks run in a fixed order and sample-size gating always precedes the
/// ratio test:
/// 1. no prior volume and `current >= min_count` is `New`
/// 2. no current volume and `prior >= min_count` is `Disappearing`
/// 3. both windows under `min_count` is `Steady`
/// 4. otherwise the relative change decides `Increase`, `Decrease` or
///    `Steady` against `min_ratio` (inclusive)
pub fn classify_change(current: u64, prior: u64, thresholds: &ChangeThresholds) -> ChangeStatus {
    let min_count = thresholds.min_count;
    if prior == 0 && current >= min_count {
        return ChangeStatus::New;
    }
    if current == 0 && prior >= min_count {
        return ChangeStatus::Disappearing;
    }
    if current < min_count && prior < min_count {
        return ChangeStatus::Steady;
    }
    match relative_change(current, prior) {
        Some(ratio) if ratio.abs() + RATIO_EPSILON >= thresholds.min_ratio => {
            if ratio > 0.0 {
                ChangeStatus::Increase
            } else {
                ChangeStatus::Decrease
            }
        }
        _ => ChangeStatus::Steady,
    }
}
