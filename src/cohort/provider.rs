use crate::classify::DeviceFamily;
use crate::cohort::table::{CohortStat, CohortTable, ALL_LEVEL};
use crate::resolve::MetricRef;
use serde::{Deserialize, Serialize};

/// Which link of the fallback chain produced a baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    /// Exact cohort level
    Level,
    /// Reserved `ALL` level
    AllLevels,
    /// Entity's own best value (neutral comparison)
    SelfBaseline,
}

/// Mean/std pair a raw value is standardized against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    pub std: f64,
    pub sample_count: u64,
    pub source: BaselineSource,
}

impl Baseline {
    fn from_stat(stat: &CohortStat, source: BaselineSource) -> Self {
        Self {
            mean: stat.mean,
            std: stat.std,
            sample_count: stat.count,
            source,
        }
    }

    /// Neutral baseline centred on the entity's own value
    pub fn self_baseline(own_best: f64) -> Self {
        Self {
            mean: own_best,
            std: 0.0,
            sample_count: 1,
            source: BaselineSource::SelfBaseline,
        }
    }
}

/// Pool independent channel baselines into one composite baseline
///
/// mean = arithmetic mean of channel means
/// std  = sqrt(Σ std² / n)
///
/// This treats the channels as independent; it is an approximation of the
/// pooled-sample statistic, not an exact derivation. The sample count is the
/// smallest channel count and the source the least specific channel source.
pub fn pooled(channels: &[Baseline]) -> Option<Baseline> {
    if channels.is_empty() {
        return None;
    }
    let n = channels.len() as f64;
    let mean = channels.iter().map(|b| b.mean).sum::<f64>() / n;
    let std = (channels.iter().map(|b| b.std * b.std).sum::<f64>() / n).sqrt();
    let sample_count = channels.iter().map(|b| b.sample_count).min().unwrap_or(0);
    let source = channels
        .iter()
        .map(|b| b.source)
        .max()
        .unwrap_or(BaselineSource::Level);

    Some(Baseline {
        mean,
        std,
        sample_count,
        source,
    })
}

/// Fallback-aware view over a cohort snapshot
#[derive(Debug, Clone, Copy)]
pub struct CohortProvider<'a> {
    table: &'a CohortTable,
}

impl<'a> CohortProvider<'a> {
    pub fn new(table: &'a CohortTable) -> Self {
        Self { table }
    }

    /// Cohort lookup: exact level, then `ALL`. Unusable entries are skipped.
    pub fn lookup(
        &self,
        device: DeviceFamily,
        metric: &str,
        level: Option<&str>,
    ) -> Option<Baseline> {
        if let Some(level) = level.filter(|l| *l != ALL_LEVEL) {
            if let Some(stat) = self.table.get(device, metric, level) {
                if stat.is_usable() {
                    return Some(Baseline::from_stat(stat, BaselineSource::Level));
                }
                tracing::warn!(
                    "Unusable cohort statistic for {}/{}/{}: mean={} std={}",
                    device,
                    metric,
                    level,
                    stat.mean,
                    stat.std
                );
            }
        }

        let stat = self.table.get(device, metric, ALL_LEVEL)?;
        if !stat.is_usable() {
            tracing::warn!(
                "Unusable cohort statistic for {}/{}/{}",
                device,
                metric,
                ALL_LEVEL
            );
            return None;
        }
        tracing::debug!(
            "Cohort level {:?} missing for {}/{}; using {}",
            level,
            device,
            metric,
            ALL_LEVEL
        );
        Some(Baseline::from_stat(stat, BaselineSource::AllLevels))
    }

    /// Full fallback chain for a plain metric
    ///
    /// Returns `None` only when the cohort snapshot has nothing for the
    /// metric and the entity has no finite value of its own.
    pub fn baseline(
        &self,
        device: DeviceFamily,
        metric: &str,
        level: Option<&str>,
        own_best: Option<f64>,
    ) -> Option<Baseline> {
        self.lookup(device, metric, level)
            .or_else(|| self_fallback(device, metric, own_best))
    }

    /// Full fallback chain for a composite metric
    ///
    /// Every channel must have a cohort statistic (level or `ALL`); otherwise
    /// the composite falls back to the self-baseline.
    pub fn composite_baseline<S: AsRef<str>>(
        &self,
        device: DeviceFamily,
        composite: &str,
        channels: &[S],
        level: Option<&str>,
        own_best: Option<f64>,
    ) -> Option<Baseline> {
        let stats: Option<Vec<Baseline>> = channels
            .iter()
            .map(|c| self.lookup(device, c.as_ref(), level))
            .collect();

        match stats {
            Some(stats) if !stats.is_empty() => pooled(&stats),
            _ => self_fallback(device, composite, own_best),
        }
    }

    /// Dispatch on metric kind
    pub fn baseline_for(
        &self,
        metric: MetricRef<'_>,
        level: Option<&str>,
        own_best: Option<f64>,
    ) -> Option<Baseline> {
        match metric {
            MetricRef::Plain(m) => self.baseline(m.device, &m.id, level, own_best),
            MetricRef::Composite(c) => {
                self.composite_baseline(c.device, &c.id, &c.channels, level, own_best)
            }
        }
    }
}

fn self_fallback(device: DeviceFamily, metric: &str, own_best: Option<f64>) -> Option<Baseline> {
    let own = own_best.filter(|v| v.is_finite())?;
    tracing::debug!(
        "No cohort statistics for {}/{}; using self-baseline {}",
        device,
        metric,
        own
    );
    Some(Baseline::self_baseline(own))
}
