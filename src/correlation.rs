//! Pearson correlation over pooled samples
//!
//! Samples for two metrics are pooled across any number of entities and
//! tests. Closed-form sums; no intermediate means.

use serde::{Deserialize, Serialize};

/// Smallest sample count for which a coefficient is reported
pub const MIN_CORRELATION_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub r: f64,
    pub r_squared: f64,
    pub n: usize,
}

/// Pearson r and r² of paired samples
///
/// Needs more than two usable pairs; a constant variable (zero variance)
/// has no defined correlation. Both cases are `None`.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<Correlation> {
    pearson_with_min(pairs, MIN_CORRELATION_SAMPLES)
}

/// Same as [`pearson`] with a caller-chosen minimum sample count
pub fn pearson_with_min(pairs: &[(f64, f64)], min_samples: usize) -> Option<Correlation> {
    let usable: Vec<(f64, f64)> = pairs
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if usable.len() < min_samples.max(MIN_CORRELATION_SAMPLES) {
        return None;
    }

    let n = usable.len() as f64;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for &(x, y) in &usable {
        sx += x;
        sy += y;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
    }

    let var_x = n * sxx - sx * sx;
    let var_y = n * syy - sy * sy;
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    let r = ((n * sxy - sx * sy) / (var_x * var_y).sqrt()).clamp(-1.0, 1.0);
    if !r.is_finite() {
        return None;
    }

    Some(Correlation {
        r,
        r_squared: r * r,
        n: usable.len(),
    })
}

/// One cell of a pairwise correlation matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationCell {
    pub x: String,
    pub y: String,
    pub correlation: Option<Correlation>,
}
