use crate::classify::DeviceFamily;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Reserved level aggregating every cohort
pub const ALL_LEVEL: &str = "ALL";

/// Snapshot statistic for one (device, metric, level)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortStat {
    pub mean: f64,
    pub std: f64,
    #[serde(default, alias = "sample_count")]
    pub count: u64,
}

impl CohortStat {
    pub fn new(mean: f64, std: f64, count: u64) -> Self {
        Self { mean, std, count }
    }

    /// A statistic that can safely feed a score: finite mean, finite
    /// non-negative std
    pub fn is_usable(&self) -> bool {
        self.mean.is_finite() && self.std.is_finite() && self.std >= 0.0
    }
}

type LevelMap = BTreeMap<String, CohortStat>;
type MetricMap = BTreeMap<String, LevelMap>;

/// Caller-owned cohort statistics snapshot
///
/// # Example JSON
/// ```json
/// {
///   "nordic_rig": {
///     "nordic_force_left": {
///       "ALL":   {"mean": 320.0, "std": 45.0, "count": 812},
///       "Elite": {"mean": 365.0, "std": 38.0, "count": 120}
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CohortTable {
    devices: BTreeMap<String, MetricMap>,
}

impl CohortTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cohort snapshot from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read cohort table: {}", path.as_ref().display())
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse cohort table JSON")
    }

    pub fn insert(&mut self, device: DeviceFamily, metric: &str, level: &str, stat: CohortStat) {
        self.devices
            .entry(device.as_str().to_string())
            .or_default()
            .entry(metric.to_string())
            .or_default()
            .insert(level.to_string(), stat);
    }

    /// Exact lookup, no fallback
    pub fn get(&self, device: DeviceFamily, metric: &str, level: &str) -> Option<&CohortStat> {
        self.devices.get(device.as_str())?.get(metric)?.get(level)
    }

    /// Levels known for a (device, metric), `ALL` included
    pub fn levels(&self, device: DeviceFamily, metric: &str) -> Vec<&str> {
        self.devices
            .get(device.as_str())
            .and_then(|metrics| metrics.get(metric))
            .map(|levels| levels.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.values().all(|m| m.values().all(|l| l.is_empty()))
    }
}
