// Engine configuration
//
// Every tunable of the engine in one serializable struct. Snapshots (alias
// tables, rule packs, cohort tables) are separate inputs; this only holds
// the numeric policy applied to them.

use crate::asymmetry::ImbalanceThresholds;
use crate::correlation::MIN_CORRELATION_SAMPLES;
use crate::error::ConfigError;
use crate::score::ScoreScale;
use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Configuration for the normalization and statistics engine
///
/// # Example
/// ```
/// use rendimiento::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.day_offset_minutes, 0);
/// assert_eq!(config.score_scale.low, 20.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed UTC offset (minutes east) at which calendar days begin
    ///
    /// Daily aggregation never uses the host time zone. Set this to the
    /// organisation's local offset, e.g. 600 for UTC+10.
    pub day_offset_minutes: i32,

    /// T-score domain mapped onto the 0-100 display range
    ///
    /// Must be centred on 50 so that the cohort mean displays as 50.
    pub score_scale: ScoreScale,

    /// Asymmetry percentages separating Normal / Moderate / High
    pub imbalance: ImbalanceThresholds,

    /// Minimum pooled pairs before a correlation is reported (at least 3)
    pub min_correlation_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            day_offset_minutes: 0,
            score_scale: ScoreScale::default(),
            imbalance: ImbalanceThresholds::default(),
            min_correlation_samples: MIN_CORRELATION_SAMPLES,
        }
    }
}

impl EngineConfig {
    /// Default policy with days split at a fixed offset
    pub fn with_day_offset(minutes: i32) -> Self {
        Self {
            day_offset_minutes: minutes,
            ..Self::default()
        }
    }

    /// Tighter banding and larger correlation samples for formal reports
    pub fn strict() -> Self {
        Self {
            imbalance: ImbalanceThresholds {
                moderate: 8.0,
                high: 12.0,
            },
            min_correlation_samples: 10,
            ..Self::default()
        }
    }

    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read engine config: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse engine config TOML")?;
        config.validate().map_err(ConfigError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.day_offset_minutes.unsigned_abs() >= MINUTES_PER_DAY.unsigned_abs() {
            return Err(format!(
                "day_offset_minutes must be within ±{}, got {}",
                MINUTES_PER_DAY - 1,
                self.day_offset_minutes
            ));
        }

        self.score_scale.validate()?;
        self.imbalance.validate()?;

        if self.min_correlation_samples < MIN_CORRELATION_SAMPLES {
            return Err(format!(
                "min_correlation_samples must be >= {}, got {}",
                MIN_CORRELATION_SAMPLES, self.min_correlation_samples
            ));
        }

        Ok(())
    }

    /// Day-boundary offset; an out-of-range value degrades to UTC
    pub fn day_offset(&self) -> FixedOffset {
        self.day_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}
