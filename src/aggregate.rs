//! Per-entity daily aggregation
//!
//! Collapses repeated same-day trials to one representative value per
//! calendar day. Days are computed in a fixed UTC offset supplied by the
//! caller, never the host time zone, so results are reproducible.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which extreme of a metric counts as the better result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    pub fn from_lower_is_better(lower_is_better: bool) -> Self {
        if lower_is_better {
            Direction::LowerIsBetter
        } else {
            Direction::HigherIsBetter
        }
    }

    /// Strictly better comparison
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::HigherIsBetter => candidate > incumbent,
            Direction::LowerIsBetter => candidate < incumbent,
        }
    }

    /// Best of a set of values, ignoring non-finite entries
    pub fn best<I: IntoIterator<Item = f64>>(self, values: I) -> Option<f64> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |best, v| match best {
                Some(b) if !self.is_better(v, b) => Some(b),
                _ => Some(v),
            })
    }
}

/// One resolved metric value for one entity at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: String,
    pub metric: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Best value of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedPoint {
    pub date: NaiveDate,
    pub value: f64,

    /// Timestamp of the trial that supplied `value`
    pub recorded_at: DateTime<Utc>,
}

/// Series identity for grouped aggregation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SeriesKey {
    pub entity_id: String,
    pub metric: String,
}

/// Calendar date of an instant in a fixed offset
pub fn local_date(instant: &DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Collapse observations of a single series to one best value per day
///
/// Within a day the extremal value per `direction` wins; equal values are
/// broken by the most recent timestamp. Output is strictly ascending by date.
pub fn daily_best<'a, I>(
    observations: I,
    offset: FixedOffset,
    direction: Direction,
) -> Vec<DerivedPoint>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut days: BTreeMap<NaiveDate, DerivedPoint> = BTreeMap::new();

    for obs in observations {
        if !obs.value.is_finite() {
            continue;
        }
        let date = local_date(&obs.recorded_at, offset);
        let candidate = DerivedPoint {
            date,
            value: obs.value,
            recorded_at: obs.recorded_at,
        };
        match days.get_mut(&date) {
            None => {
                days.insert(date, candidate);
            }
            Some(incumbent) => {
                if replaces(&candidate, incumbent, direction) {
                    *incumbent = candidate;
                }
            }
        }
    }

    days.into_values().collect()
}

/// Group observations by (entity, metric) and aggregate each series
pub fn daily_best_by_series(
    observations: &[Observation],
    offset: FixedOffset,
    direction: Direction,
) -> BTreeMap<SeriesKey, Vec<DerivedPoint>> {
    let mut groups: BTreeMap<SeriesKey, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry(SeriesKey {
                entity_id: obs.entity_id.clone(),
                metric: obs.metric.clone(),
            })
            .or_default()
            .push(obs);
    }

    groups
        .into_iter()
        .map(|(key, series)| (key, daily_best(series, offset, direction)))
        .collect()
}

fn replaces(candidate: &DerivedPoint, incumbent: &DerivedPoint, direction: Direction) -> bool {
    if direction.is_better(candidate.value, incumbent.value) {
        return true;
    }
    candidate.value == incumbent.value && candidate.recorded_at > incumbent.recorded_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, TimeZone};

    fn obs(entity: &str, value: f64, ts: DateTime<Utc>) -> Observation {
        Observation {
            entity_id: entity.to_string(),
            metric: "jump_height".to_string(),
            value,
            recorded_at: ts,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_same_day_max_is_better() {
        let data = vec![
            obs("a", 10.0, utc(2024, 5, 1, 9, 0)),
            obs("a", 15.0, utc(2024, 5, 1, 10, 0)),
        ];
        let series = daily_best(&data, Utc.fix(), Direction::HigherIsBetter);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 15.0);
    }

    #[test]
    fn test_same_day_min_is_better() {
        let data = vec![
            obs("a", 10.0, utc(2024, 5, 1, 9, 0)),
            obs("a", 15.0, utc(2024, 5, 1, 10, 0)),
        ];
        let series = daily_best(&data, Utc.fix(), Direction::LowerIsBetter);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 10.0);
    }

    #[test]
    fn test_tie_prefers_most_recent() {
        let data = vec![
            obs("a", 12.0, utc(2024, 5, 1, 11, 0)),
            obs("a", 12.0, utc(2024, 5, 1, 8, 0)),
            obs("a", 12.0, utc(2024, 5, 1, 9, 0)),
        ];
        let series = daily_best(&data, Utc.fix(), Direction::HigherIsBetter);
        assert_eq!(series[0].recorded_at, utc(2024, 5, 1, 11, 0));
    }

    #[test]
    fn test_offset_moves_day_boundary() {
        // 22:00 UTC on May 1st is already May 2nd at UTC+10
        let data = vec![
            obs("a", 10.0, utc(2024, 5, 1, 9, 0)),
            obs("a", 20.0, utc(2024, 5, 1, 22, 0)),
        ];

        let in_utc = daily_best(&data, Utc.fix(), Direction::HigherIsBetter);
        assert_eq!(in_utc.len(), 1);

        let aest = FixedOffset::east_opt(10 * 3600).unwrap();
        let in_aest = daily_best(&data, aest, Direction::HigherIsBetter);
        assert_eq!(in_aest.len(), 2);
        assert_eq!(in_aest[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(in_aest[1].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }

    #[test]
    fn test_output_sorted_and_unique() {
        let data = vec![
            obs("a", 3.0, utc(2024, 5, 3, 9, 0)),
            obs("a", 1.0, utc(2024, 5, 1, 9, 0)),
            obs("a", 2.0, utc(2024, 5, 2, 9, 0)),
            obs("a", 4.0, utc(2024, 5, 1, 12, 0)),
        ];
        let series = daily_best(&data, Utc.fix(), Direction::HigherIsBetter);

        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![4.0, 2.0, 3.0]);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_non_finite_values_skipped() {
        let data = vec![
            obs("a", f64::NAN, utc(2024, 5, 1, 9, 0)),
            obs("a", f64::INFINITY, utc(2024, 5, 2, 9, 0)),
        ];
        assert!(daily_best(&data, Utc.fix(), Direction::HigherIsBetter).is_empty());
    }

    #[test]
    fn test_grouping_by_series() {
        let data = vec![
            obs("b", 5.0, utc(2024, 5, 1, 9, 0)),
            obs("a", 7.0, utc(2024, 5, 1, 9, 0)),
            obs("a", 8.0, utc(2024, 5, 1, 10, 0)),
        ];
        let grouped = daily_best_by_series(&data, Utc.fix(), Direction::HigherIsBetter);

        let keys: Vec<&str> = grouped.keys().map(|k| k.entity_id.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(grouped.values().next().unwrap()[0].value, 8.0);
    }

    #[test]
    fn test_direction_best() {
        assert_eq!(
            Direction::HigherIsBetter.best([1.0, f64::NAN, 3.0, 2.0]),
            Some(3.0)
        );
        assert_eq!(Direction::LowerIsBetter.best([1.0, 3.0, 0.5]), Some(0.5));
        assert_eq!(Direction::LowerIsBetter.best(Vec::new()), None);
    }
}
