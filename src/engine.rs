// End-to-end analysis pipeline
//
// classify → flatten → resolve → daily aggregate → score / pair / fit / correlate
//
// The engine borrows caller-owned snapshots and holds no state of its own.
// Every operation is a pure function of (snapshots, measurements, arguments).

use crate::aggregate::{
    daily_best, daily_best_by_series, DerivedPoint, Direction, Observation, SeriesKey,
};
use crate::asymmetry::{paired_series, PairedPoint};
use crate::classify::{Classification, ClassifierRegistry};
use crate::cohort::{CohortProvider, CohortTable};
use crate::config::EngineConfig;
use crate::correlation::{pearson_with_min, Correlation, CorrelationCell};
use crate::measurement::Measurement;
use crate::resolve::{AliasTable, MetricRef};
use crate::score::{standardize, AxisScore, Comparison, StandardScore};
use crate::summary::{summarize, SeriesSummary};
use crate::trend::{linear_trend, Trendline};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Inclusive calendar-date window; an open end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Per-metric section of an entity report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: String,
    pub unit: String,
    pub lower_is_better: bool,
    pub series: Vec<DerivedPoint>,
    pub trend: Option<Trendline>,
    pub summary: Option<SeriesSummary>,
    pub score: StandardScore,
    /// Only for bilateral composites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asymmetry: Option<Vec<PairedPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub range: DateRange,
    pub metrics: Vec<MetricReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub entity_id: String,
    /// Best daily value in the range
    pub best: f64,
    pub score: StandardScore,
}

/// Stateless analysis engine over borrowed snapshots
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use rendimiento::classify::ClassifierRegistry;
/// use rendimiento::cohort::CohortTable;
/// use rendimiento::config::EngineConfig;
/// use rendimiento::engine::{DateRange, Engine};
/// use rendimiento::measurement::Measurement;
/// use rendimiento::resolve::AliasTable;
/// use serde_json::json;
///
/// let aliases = AliasTable::default_table()?;
/// let rules = ClassifierRegistry::default_rules()?;
/// let cohorts = CohortTable::new();
/// let config = EngineConfig::default();
/// let engine = Engine::new(&aliases, &rules, &cohorts, &config);
///
/// let ms = vec![Measurement::new(
///     "1",
///     "ath-1",
///     Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
///     "CMJ",
///     json!({"jumpHeight": 41.5}),
/// )];
/// let series = engine.series(&ms, "ath-1", "jump_height", &DateRange::all());
/// assert_eq!(series.len(), 1);
/// assert_eq!(series[0].value, 41.5);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    aliases: &'a AliasTable,
    classifier: &'a ClassifierRegistry,
    cohorts: &'a CohortTable,
    config: &'a EngineConfig,
}

impl<'a> Engine<'a> {
    pub fn new(
        aliases: &'a AliasTable,
        classifier: &'a ClassifierRegistry,
        cohorts: &'a CohortTable,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            aliases,
            classifier,
            cohorts,
            config,
        }
    }

    pub fn aliases(&self) -> &'a AliasTable {
        self.aliases
    }

    pub fn classifier(&self) -> &'a ClassifierRegistry {
        self.classifier
    }

    pub fn cohorts(&self) -> &'a CohortTable {
        self.cohorts
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn classify(&self, measurement: &Measurement) -> Classification {
        self.classifier
            .classify(&measurement.test_type, measurement.sub_test.as_deref())
    }

    /// Resolve one metric from every measurement of the matching device
    ///
    /// Records of other device families, malformed payloads and absent
    /// values are skipped. Unknown metric ids produce no observations.
    pub fn observations(&self, measurements: &[Measurement], metric_id: &str) -> Vec<Observation> {
        self.resolve_all(measurements, metric_id)
    }

    fn resolve_all<'m, I>(&self, measurements: I, metric_id: &str) -> Vec<Observation>
    where
        I: IntoIterator<Item = &'m Measurement>,
    {
        let Some(metric) = self.aliases.describe(metric_id) else {
            tracing::debug!("Unknown metric id: {}", metric_id);
            return Vec::new();
        };
        let device = metric.device();

        measurements
            .into_iter()
            .filter(|m| self.classify(m).family == device)
            .filter_map(|m| {
                let Some(flat) = self.aliases.flatten(&m.metrics) else {
                    tracing::debug!("Measurement {} has an unreadable payload", m.id);
                    return None;
                };
                let resolved = self.aliases.resolve(&flat, metric.id())?;
                Some(Observation {
                    entity_id: m.entity_id.clone(),
                    metric: resolved.metric_id,
                    value: resolved.value,
                    recorded_at: m.recorded_at,
                })
            })
            .collect()
    }

    /// Chronological one-point-per-day series for one entity
    pub fn series(
        &self,
        measurements: &[Measurement],
        entity_id: &str,
        metric_id: &str,
        range: &DateRange,
    ) -> Vec<DerivedPoint> {
        let Some(metric) = self.aliases.describe(metric_id) else {
            return Vec::new();
        };
        let own = measurements.iter().filter(|m| m.entity_id == entity_id);
        let observations = self.resolve_all(own, metric_id);
        self.aggregate(&observations, metric, range)
    }

    /// Daily series of every entity that has the metric
    pub fn all_series(
        &self,
        measurements: &[Measurement],
        metric_id: &str,
        range: &DateRange,
    ) -> BTreeMap<String, Vec<DerivedPoint>> {
        let Some(metric) = self.aliases.describe(metric_id) else {
            return BTreeMap::new();
        };
        let observations = self.observations(measurements, metric_id);
        let direction = Direction::from_lower_is_better(metric.lower_is_better());

        daily_best_by_series(&observations, self.config.day_offset(), direction)
            .into_iter()
            .map(|(SeriesKey { entity_id, .. }, points)| {
                let points: Vec<DerivedPoint> =
                    points.into_iter().filter(|p| range.contains(p.date)).collect();
                (entity_id, points)
            })
            .filter(|(_, points)| !points.is_empty())
            .collect()
    }

    /// Standardized score of an entity's best value in the range
    pub fn standard_score(
        &self,
        measurements: &[Measurement],
        entity_id: &str,
        level: Option<&str>,
        metric_id: &str,
        range: &DateRange,
    ) -> StandardScore {
        let series = self.series(measurements, entity_id, metric_id, range);
        self.score_points(metric_id, &series, level)
    }

    /// Score an already-derived series
    ///
    /// The raw value is the best day; it also seeds the self-baseline when
    /// the cohort snapshot has nothing for the metric.
    pub fn score_points(
        &self,
        metric_id: &str,
        points: &[DerivedPoint],
        level: Option<&str>,
    ) -> StandardScore {
        let Some(metric) = self.aliases.describe(metric_id) else {
            return StandardScore::absent();
        };
        let direction = Direction::from_lower_is_better(metric.lower_is_better());
        let best = direction.best(points.iter().map(|p| p.value));
        self.score_value(metric, best, level)
    }

    fn score_value(
        &self,
        metric: MetricRef<'_>,
        raw: Option<f64>,
        level: Option<&str>,
    ) -> StandardScore {
        let baseline = CohortProvider::new(self.cohorts).baseline_for(metric, level, raw);
        standardize(
            raw,
            baseline,
            metric.lower_is_better(),
            &self.config.score_scale,
        )
    }

    /// Multi-axis comparison of one entity against cohort averages
    ///
    /// Unknown metric ids are left out; measured-but-missing axes stay in
    /// the output tagged as absent.
    pub fn comparison<S: AsRef<str>>(
        &self,
        measurements: &[Measurement],
        entity_id: &str,
        level: Option<&str>,
        metric_ids: &[S],
        range: &DateRange,
    ) -> Comparison {
        let axes = metric_ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                let Some(metric) = self.aliases.describe(id) else {
                    tracing::debug!("Skipping unknown comparison axis: {}", id);
                    return None;
                };
                Some(AxisScore {
                    metric: id.to_string(),
                    unit: metric.unit().to_string(),
                    score: self.standard_score(measurements, entity_id, level, id, range),
                })
            })
            .collect();

        Comparison::new(axes, &self.config.score_scale)
    }

    /// Paired left/right series of a bilateral composite
    ///
    /// `None` when the id is not a bilateral composite.
    pub fn asymmetry_series(
        &self,
        measurements: &[Measurement],
        entity_id: &str,
        composite_id: &str,
        range: &DateRange,
    ) -> Option<Vec<PairedPoint>> {
        let (left_id, right_id) = self.aliases.composite(composite_id)?.sides()?;
        let left = self.series(measurements, entity_id, left_id, range);
        let right = self.series(measurements, entity_id, right_id, range);
        Some(paired_series(&left, &right, &self.config.imbalance))
    }

    /// Series, trendline, summary and score for each requested metric
    ///
    /// Metrics without a single data point in the range are omitted.
    pub fn entity_report<S: AsRef<str>>(
        &self,
        measurements: &[Measurement],
        entity_id: &str,
        level: Option<&str>,
        metric_ids: &[S],
        range: &DateRange,
    ) -> EntityReport {
        let metrics = metric_ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                let metric = self.aliases.describe(id)?;
                let series = self.series(measurements, entity_id, id, range);
                if series.is_empty() {
                    return None;
                }
                let direction = Direction::from_lower_is_better(metric.lower_is_better());
                let values: Vec<f64> = series.iter().map(|p| p.value).collect();

                Some(MetricReport {
                    metric: id.to_string(),
                    unit: metric.unit().to_string(),
                    lower_is_better: metric.lower_is_better(),
                    trend: linear_trend(&values),
                    summary: summarize(&series, direction),
                    score: self.score_points(id, &series, level),
                    asymmetry: self.asymmetry_series(measurements, entity_id, id, range),
                    series,
                })
            })
            .collect();

        EntityReport {
            entity_id: entity_id.to_string(),
            level: level.map(str::to_string),
            range: *range,
            metrics,
        }
    }

    /// Entities ranked by their best value, best first
    ///
    /// `levels` maps entity id → cohort level for scoring; entities without
    /// an entry are scored against `ALL`. Equal values rank by entity id.
    pub fn leaderboard(
        &self,
        measurements: &[Measurement],
        levels: &BTreeMap<String, String>,
        metric_id: &str,
        range: &DateRange,
    ) -> Vec<LeaderboardEntry> {
        let Some(metric) = self.aliases.describe(metric_id) else {
            tracing::debug!("Unknown leaderboard metric: {}", metric_id);
            return Vec::new();
        };
        let direction = Direction::from_lower_is_better(metric.lower_is_better());

        let mut bests: Vec<(String, f64)> = self
            .all_series(measurements, metric_id, range)
            .into_iter()
            .filter_map(|(entity, points)| {
                let best = direction.best(points.iter().map(|p| p.value))?;
                Some((entity, best))
            })
            .collect();

        bests.sort_by(|(a_id, a), (b_id, b)| {
            let by_value = match direction {
                Direction::HigherIsBetter => b.total_cmp(a),
                Direction::LowerIsBetter => a.total_cmp(b),
            };
            match by_value {
                Ordering::Equal => a_id.cmp(b_id),
                other => other,
            }
        });

        bests
            .into_iter()
            .enumerate()
            .map(|(i, (entity_id, best))| {
                let level = levels.get(&entity_id).map(String::as_str);
                LeaderboardEntry {
                    rank: i + 1,
                    score: self.score_value(metric, Some(best), level),
                    entity_id,
                    best,
                }
            })
            .collect()
    }

    /// Pearson correlation of two metrics pooled across all entities
    ///
    /// Samples pair up when the same entity has both metrics on the same
    /// day, using each metric's daily best.
    pub fn correlation(
        &self,
        measurements: &[Measurement],
        x_metric: &str,
        y_metric: &str,
        range: &DateRange,
    ) -> Option<Correlation> {
        let xs = self.daily_values(measurements, x_metric, range);
        let ys = self.daily_values(measurements, y_metric, range);
        pearson_with_min(&join_samples(&xs, &ys), self.config.min_correlation_samples)
    }

    /// Correlation for every unordered pair of distinct metrics
    ///
    /// Duplicate ids are collapsed; cells follow first-occurrence order.
    pub fn correlation_matrix<S: AsRef<str>>(
        &self,
        measurements: &[Measurement],
        metric_ids: &[S],
        range: &DateRange,
    ) -> Vec<CorrelationCell> {
        let mut seen = BTreeSet::new();
        let ids: Vec<&str> = metric_ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| seen.insert(*id))
            .collect();

        let samples: Vec<BTreeMap<(String, NaiveDate), f64>> = ids
            .iter()
            .map(|id| self.daily_values(measurements, id, range))
            .collect();

        let mut cells = Vec::new();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let pairs = join_samples(&samples[i], &samples[j]);
                cells.push(CorrelationCell {
                    x: ids[i].to_string(),
                    y: ids[j].to_string(),
                    correlation: pearson_with_min(&pairs, self.config.min_correlation_samples),
                });
            }
        }
        cells
    }

    fn aggregate(
        &self,
        observations: &[Observation],
        metric: MetricRef<'_>,
        range: &DateRange,
    ) -> Vec<DerivedPoint> {
        let direction = Direction::from_lower_is_better(metric.lower_is_better());
        daily_best(observations, self.config.day_offset(), direction)
            .into_iter()
            .filter(|p| range.contains(p.date))
            .collect()
    }

    fn daily_values(
        &self,
        measurements: &[Measurement],
        metric_id: &str,
        range: &DateRange,
    ) -> BTreeMap<(String, NaiveDate), f64> {
        self.all_series(measurements, metric_id, range)
            .into_iter()
            .flat_map(|(entity, points)| {
                points
                    .into_iter()
                    .map(move |p| ((entity.clone(), p.date), p.value))
            })
            .collect()
    }
}

fn join_samples(
    xs: &BTreeMap<(String, NaiveDate), f64>,
    ys: &BTreeMap<(String, NaiveDate), f64>,
) -> Vec<(f64, f64)> {
    xs.iter()
        .filter_map(|(key, x)| ys.get(key).map(|y| (*x, *y)))
        .collect()
}
