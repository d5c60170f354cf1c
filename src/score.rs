//! Standardized scoring
//!
//! Converts a raw value into a T-score against a cohort baseline and remaps
//! it onto a bounded 0-100 display scale:
//!
//! ```text
//! T       = 50 + 10 · (x − μ) / σ          (σ = 0 → 50)
//! display = clamp((T − low) / (high − low) · 100, 0, 100)
//! ```
//!
//! With the default domain [20, 80] the cohort mean always lands on 50.

use crate::cohort::{Baseline, BaselineSource};
use serde::{Deserialize, Serialize};

/// Neutral T-score: exactly the cohort mean
pub const NEUTRAL_T: f64 = 50.0;

/// T-score points per standard deviation
pub const T_PER_SD: f64 = 10.0;

/// T-score domain mapped onto the 0-100 display range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    pub low: f64,
    pub high: f64,
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self {
            low: 20.0,
            high: 80.0,
        }
    }
}

impl ScoreScale {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low >= self.high {
            return Err(format!(
                "score scale must satisfy low < high, got [{}, {}]",
                self.low, self.high
            ));
        }
        if (self.low + self.high - 2.0 * NEUTRAL_T).abs() > 1e-9 {
            return Err(format!(
                "score scale must be centred on {}, got [{}, {}]",
                NEUTRAL_T, self.low, self.high
            ));
        }
        Ok(())
    }

    /// Remap a T-score to the display range and clamp to [0, 100]
    pub fn display(&self, t: f64) -> f64 {
        if !t.is_finite() {
            return 0.0;
        }
        ((t - self.low) / (self.high - self.low) * 100.0).clamp(0.0, 100.0)
    }

    /// Display value of the cohort mean
    pub fn cohort_reference(&self) -> f64 {
        self.display(NEUTRAL_T)
    }
}

/// T-score of `x` against (`mean`, `std`)
///
/// A zero, negative or non-finite `std` yields the neutral midpoint.
pub fn t_score(x: f64, mean: f64, std: f64) -> f64 {
    if !(std.is_finite() && std > 0.0 && x.is_finite() && mean.is_finite()) {
        return NEUTRAL_T;
    }
    NEUTRAL_T + T_PER_SD * (x - mean) / std
}

/// Display score with the default [20, 80] domain
pub fn display_score(t: f64) -> f64 {
    ScoreScale::default().display(t)
}

/// Standardized result for one metric
///
/// `measured == false` marks an absent raw value. Its display score is 0, and
/// the flag keeps it distinguishable from a genuinely low measured result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScore {
    pub raw: Option<f64>,
    pub t_score: Option<f64>,
    pub display: f64,
    pub measured: bool,
    pub baseline: Option<Baseline>,
}

impl StandardScore {
    pub fn absent() -> Self {
        Self {
            raw: None,
            t_score: None,
            display: 0.0,
            measured: false,
            baseline: None,
        }
    }

    pub fn source(&self) -> Option<BaselineSource> {
        self.baseline.map(|b| b.source)
    }
}

/// Standardize a raw value against a baseline
///
/// Lower-is-better metrics are mirrored around the mean so that a better
/// result always scores higher. A missing baseline is treated as neutral.
pub fn standardize(
    raw: Option<f64>,
    baseline: Option<Baseline>,
    lower_is_better: bool,
    scale: &ScoreScale,
) -> StandardScore {
    let Some(x) = raw.filter(|v| v.is_finite() && *v != 0.0) else {
        return StandardScore::absent();
    };

    let t = match baseline {
        Some(b) => {
            let t = t_score(x, b.mean, b.std);
            if lower_is_better {
                2.0 * NEUTRAL_T - t
            } else {
                t
            }
        }
        None => NEUTRAL_T,
    };

    StandardScore {
        raw: Some(x),
        t_score: Some(t),
        display: scale.display(t),
        measured: true,
        baseline,
    }
}

/// One axis of a multi-axis comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisScore {
    pub metric: String,
    pub unit: String,
    pub score: StandardScore,
}

/// Multi-axis comparison against cohort averages
///
/// Every axis is standardized independently. The cohort reference is the
/// display value of the cohort mean, identical on every axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub axes: Vec<AxisScore>,
    pub cohort_reference: f64,
}

impl Comparison {
    pub fn new(axes: Vec<AxisScore>, scale: &ScoreScale) -> Self {
        Self {
            axes,
            cohort_reference: scale.cohort_reference(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort(mean: f64, std: f64) -> Option<Baseline> {
        Some(Baseline {
            mean,
            std,
            sample_count: 100,
            source: BaselineSource::Level,
        })
    }

    #[test]
    fn test_one_sd_above_mean() {
        let t = t_score(110.0, 100.0, 10.0);
        assert_eq!(t, 60.0);
        let display = display_score(t);
        assert!((display - 200.0 / 3.0).abs() < 1e-9);
        assert!((display - 66.7).abs() < 0.05);
    }

    #[test]
    fn test_mean_maps_to_midpoint() {
        assert_eq!(display_score(t_score(100.0, 100.0, 10.0)), 50.0);
    }

    #[test]
    fn test_zero_std_is_neutral() {
        for x in [0.5, 100.0, 1e9] {
            assert_eq!(t_score(x, 100.0, 0.0), NEUTRAL_T);
            assert_eq!(display_score(t_score(x, 100.0, 0.0)), 50.0);
        }
        assert_eq!(t_score(1.0, 1.0, f64::NAN), NEUTRAL_T);
    }

    #[test]
    fn test_display_clamped() {
        assert_eq!(display_score(95.0), 100.0);
        assert_eq!(display_score(5.0), 0.0);
        assert_eq!(display_score(80.0), 100.0);
        assert_eq!(display_score(20.0), 0.0);
        assert_eq!(display_score(f64::NAN), 0.0);
    }

    #[test]
    fn test_absent_raw_is_tagged() {
        let scale = ScoreScale::default();

        let absent = standardize(None, cohort(100.0, 10.0), false, &scale);
        assert_eq!(absent.display, 0.0);
        assert!(!absent.measured);

        let zero = standardize(Some(0.0), cohort(100.0, 10.0), false, &scale);
        assert!(!zero.measured);

        // A measured value far below the mean also displays 0 but is measured
        let low = standardize(Some(1.0), cohort(100.0, 10.0), false, &scale);
        assert_eq!(low.display, 0.0);
        assert!(low.measured);
        assert_ne!(absent, low);
    }

    #[test]
    fn test_lower_is_better_is_mirrored() {
        let scale = ScoreScale::default();
        // Sprint time 0.2 s faster than a 3.0 ± 0.2 s cohort
        let fast = standardize(Some(2.8), cohort(3.0, 0.2), true, &scale);
        assert!((fast.t_score.unwrap() - 60.0).abs() < 1e-9);
        assert!(fast.display > 50.0);

        let slow = standardize(Some(3.2), cohort(3.0, 0.2), true, &scale);
        assert!(slow.display < 50.0);
    }

    #[test]
    fn test_missing_baseline_is_neutral() {
        let score = standardize(Some(12.0), None, false, &ScoreScale::default());
        assert_eq!(score.t_score, Some(NEUTRAL_T));
        assert_eq!(score.display, 50.0);
        assert!(score.measured);
    }

    #[test]
    fn test_scale_validation() {
        assert!(ScoreScale::default().validate().is_ok());
        assert!(ScoreScale { low: 30.0, high: 70.0 }.validate().is_ok());
        assert!(ScoreScale { low: 80.0, high: 20.0 }.validate().is_err());
        assert!(ScoreScale { low: 20.0, high: 90.0 }.validate().is_err());
    }

    #[test]
    fn test_cohort_reference_is_midpoint() {
        assert_eq!(ScoreScale::default().cohort_reference(), 50.0);
        let comparison = Comparison::new(Vec::new(), &ScoreScale { low: 30.0, high: 70.0 });
        assert_eq!(comparison.cohort_reference, 50.0);
    }
}
