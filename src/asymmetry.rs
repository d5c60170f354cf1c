//! Left/right asymmetry
//!
//! Signed percentage imbalance normalized by the larger magnitude:
//!
//! ```text
//! asymmetry = (right − left) / max(|left|, |right|) · 100
//! ```
//!
//! Positive values mean the right side is stronger. When exactly one side is
//! zero the result is ±100 %; that case is reported as-is and not treated as
//! missing data.

use crate::aggregate::DerivedPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Magnitude band of an imbalance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImbalanceBand {
    Normal,
    Moderate,
    High,
}

/// Percentage thresholds separating imbalance bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImbalanceThresholds {
    /// |asymmetry| at or above this is `Moderate`
    pub moderate: f64,
    /// |asymmetry| at or above this is `High`
    pub high: f64,
}

impl Default for ImbalanceThresholds {
    fn default() -> Self {
        Self {
            moderate: 10.0,
            high: 15.0,
        }
    }
}

impl ImbalanceThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.moderate) || !(0.0..=100.0).contains(&self.high) {
            return Err(format!(
                "imbalance thresholds must be within [0, 100], got {} / {}",
                self.moderate, self.high
            ));
        }
        if self.moderate > self.high {
            return Err(format!(
                "moderate threshold {} exceeds high threshold {}",
                self.moderate, self.high
            ));
        }
        Ok(())
    }

    pub fn classify(&self, percent: f64) -> ImbalanceBand {
        let magnitude = percent.abs();
        if magnitude >= self.high {
            ImbalanceBand::High
        } else if magnitude >= self.moderate {
            ImbalanceBand::Moderate
        } else {
            ImbalanceBand::Normal
        }
    }
}

/// Asymmetry of one left/right pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Asymmetry {
    pub percent: f64,
    /// Stronger side; `None` when perfectly balanced or undefined
    pub dominant: Option<Side>,
}

impl Asymmetry {
    pub fn balanced() -> Self {
        Self {
            percent: 0.0,
            dominant: None,
        }
    }
}

/// Signed asymmetry percentage and dominant side
///
/// Both sides zero (or any non-finite input) → 0 % with no dominant side.
pub fn asymmetry(left: f64, right: f64) -> Asymmetry {
    if !(left.is_finite() && right.is_finite()) {
        return Asymmetry::balanced();
    }
    let denominator = left.abs().max(right.abs());
    if denominator == 0.0 {
        return Asymmetry::balanced();
    }

    // Scale before subtracting so huge opposite-sign inputs cannot overflow
    let percent = (right / denominator - left / denominator) * 100.0;
    let dominant = if percent > 0.0 {
        Some(Side::Right)
    } else if percent < 0.0 {
        Some(Side::Left)
    } else {
        None
    };
    Asymmetry { percent, dominant }
}

/// One day of a paired left/right series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedPoint {
    pub date: NaiveDate,
    pub left: f64,
    pub right: f64,
    pub asymmetry: Asymmetry,
    pub band: ImbalanceBand,
}

/// Join two daily series on date
///
/// Days present on only one side are dropped.
pub fn paired_series(
    left: &[DerivedPoint],
    right: &[DerivedPoint],
    thresholds: &ImbalanceThresholds,
) -> Vec<PairedPoint> {
    let right_by_day: BTreeMap<NaiveDate, f64> =
        right.iter().map(|p| (p.date, p.value)).collect();

    left.iter()
        .filter_map(|l| {
            let r = *right_by_day.get(&l.date)?;
            let asym = asymmetry(l.value, r);
            Some(PairedPoint {
                date: l.date,
                left: l.value,
                right: r,
                band: thresholds.classify(asym.percent),
                asymmetry: asym,
            })
        })
        .collect()
}
