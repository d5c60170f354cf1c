//! Linear trendlines
//!
//! Closed-form ordinary least squares over (index, value) pairs. The x axis
//! is sequence position rather than the raw date so that irregular test
//! spacing does not distort the unit of the slope.

use serde::{Deserialize, Serialize};

/// Fitted straight line and its values at each input position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
    pub fitted: Vec<f64>,
}

impl Trendline {
    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a trendline over an ordered value sequence (x = 0, 1, 2, ...)
///
/// Fewer than two points yields no trendline.
pub fn linear_trend(values: &[f64]) -> Option<Trendline> {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();
    fit(&points)
}

/// Ordinary least squares over arbitrary (x, y) points
///
/// Points with non-finite coordinates are ignored. When every x is equal the
/// slope is undefined; the fit falls back to a flat line at the mean of y.
pub fn fit(points: &[(f64, f64)]) -> Option<Trendline> {
    let usable: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if usable.len() < 2 {
        return None;
    }

    let n = usable.len() as f64;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for &(x, y) in &usable {
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }

    let denominator = n * sxx - sx * sx;
    let (slope, intercept) = if denominator.abs() < f64::EPSILON {
        (0.0, sy / n)
    } else {
        let slope = (n * sxy - sx * sy) / denominator;
        (slope, (sy - slope * sx) / n)
    };

    let fitted = points
        .iter()
        .map(|&(x, _)| intercept + slope * x)
        .collect();

    Some(Trendline {
        slope,
        intercept,
        fitted,
    })
}
