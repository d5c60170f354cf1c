//! Descriptive summary of a derived daily series
//!
//! Uses Trueno SIMD vectors for the spread. Trueno works in f32, so values
//! that must round-trip exactly (extremes, median, mean) stay in f64.

use crate::aggregate::{DerivedPoint, Direction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Best day according to the metric direction
    pub best: f64,
    /// Most recent day
    pub latest: f64,
    /// latest − first; positive means the raw value went up
    pub change: f64,
}

/// Summarize a chronologically ordered daily series
///
/// Order statistics (min, max, median) and the mean are exact in f64. The
/// spread goes through Trueno on mean-centred residuals, where f32 precision
/// is ample.
pub fn summarize(points: &[DerivedPoint], direction: Direction) -> Option<SeriesSummary> {
    let first = points.first()?;
    let latest = points.last()?;

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let n = values.len() as f64;
    let mean = values.iter().map(|v| v / n).sum::<f64>();

    let residuals: Vec<f32> = values.iter().map(|v| (v - mean) as f32).collect();
    let std_dev = trueno::Vector::from_slice(&residuals)
        .stddev()
        .unwrap_or(0.0) as f64;

    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);
    let median = percentile(&sorted, 50.0);

    Some(SeriesSummary {
        count: points.len(),
        mean,
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median,
        best: direction.best(values.iter().copied()).unwrap_or(latest.value),
        latest: latest.value,
        change: latest.value - first.value,
    })
}

/// Linear-interpolated percentile of sorted data
fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let index = (percentile / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn series(values: &[f64]) -> Vec<DerivedPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| DerivedPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                value,
                recorded_at: Utc
                    .with_ymd_and_hms(2024, 1, 1 + i as u32, 9, 0, 0)
                    .unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_empty_series() {
        assert!(summarize(&[], Direction::HigherIsBetter).is_none());
    }

    #[test]
    fn test_basic_summary() {
        let s = summarize(&series(&[2.0, 4.0, 6.0, 8.0]), Direction::HigherIsBetter).unwrap();

        assert_eq!(s.count, 4);
        assert!((s.mean - 5.0).abs() < 1e-4);
        assert!((s.min - 2.0).abs() < 1e-4);
        assert!((s.max - 8.0).abs() < 1e-4);
        assert!((s.median - 5.0).abs() < 1e-4);
        assert_eq!(s.best, 8.0);
        assert_eq!(s.latest, 8.0);
        assert_eq!(s.change, 6.0);
        assert!(s.std_dev > 0.0);
    }

    #[test]
    fn test_best_follows_direction() {
        let s = summarize(&series(&[3.1, 2.9, 3.0]), Direction::LowerIsBetter).unwrap();
        assert_eq!(s.best, 2.9);
        assert!((s.change - (-0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_single_point() {
        let s = summarize(&series(&[42.0]), Direction::HigherIsBetter).unwrap();
        assert_eq!(s.count, 1);
        assert!((s.median - 42.0).abs() < 1e-4);
        assert_eq!(s.change, 0.0);
    }

    #[test]
    fn test_extremes_match_best_exactly() {
        let s = summarize(&series(&[35.3]), Direction::HigherIsBetter).unwrap();
        assert_eq!(s.max, s.best);
        assert_eq!(s.min, 35.3);
        assert_eq!(s.median, 35.3);
        assert_eq!(s.mean, 35.3);
        assert_eq!(s.std_dev, 0.0);

        let s = summarize(&series(&[41.7, 42.3, 40.9]), Direction::HigherIsBetter).unwrap();
        assert_eq!(s.max, s.best);
        assert_eq!(s.max, 42.3);
        assert_eq!(s.min, 40.9);
        assert_eq!(s.median, 41.7);

        let s = summarize(&series(&[3.07, 2.93, 3.01]), Direction::LowerIsBetter).unwrap();
        assert_eq!(s.min, s.best);
    }

    #[test]
    fn test_percentile_interpolation() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.5);
        assert_eq!(percentile(&[7.0], 90.0), 7.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
