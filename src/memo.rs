// Memoization decorator around the pure engine
//
// Each decorator is bound to one input snapshot, identified by a SHA-256
// fingerprint of every input. Within it, derived series are cached under
// (entity, metric, device family, date range). The engine itself stays
// cache-agnostic.

use crate::aggregate::DerivedPoint;
use crate::classify::DeviceFamily;
use crate::engine::{DateRange, Engine};
use crate::measurement::Measurement;
use crate::score::StandardScore;
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Cache key for one derived series within a single snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesCacheKey {
    pub entity_id: String,
    pub metric: String,
    pub device: DeviceFamily,
    pub range: DateRange,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Series currently held
    pub entries: usize,
}

impl CacheStats {
    /// Percentage of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits as f64 / total as f64) * 100.0
    }
}

/// SHA-256 over the canonical JSON of every engine input
///
/// Object keys serialize in sorted order, so equal inputs always hash
/// equally regardless of how they were constructed.
pub fn fingerprint(engine: &Engine<'_>, measurements: &[Measurement]) -> Result<String> {
    let mut hasher = Sha256::new();
    absorb(&mut hasher, "measurements", measurements)?;
    absorb(&mut hasher, "aliases", engine.aliases())?;
    absorb(&mut hasher, "classifier", engine.classifier())?;
    absorb(&mut hasher, "cohorts", engine.cohorts())?;
    absorb(&mut hasher, "config", engine.config())?;
    Ok(hex::encode(hasher.finalize()))
}

fn absorb<T: Serialize + ?Sized>(hasher: &mut Sha256, label: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .with_context(|| format!("Failed to serialize {} for fingerprinting", label))?;
    hasher.update(label.as_bytes());
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
    Ok(())
}

/// Engine plus a derived-series cache bound to one measurement snapshot
pub struct MemoizedEngine<'a> {
    engine: Engine<'a>,
    measurements: &'a [Measurement],
    fingerprint: String,
    cache: HashMap<SeriesCacheKey, Vec<DerivedPoint>>,
    hits: u64,
    misses: u64,
}

impl<'a> MemoizedEngine<'a> {
    pub fn new(engine: Engine<'a>, measurements: &'a [Measurement]) -> Result<Self> {
        let fingerprint = fingerprint(&engine, measurements)?;
        tracing::debug!(
            "Memoized engine over {} measurements, fingerprint {}",
            measurements.len(),
            fingerprint
        );
        Ok(Self {
            engine,
            measurements,
            fingerprint,
            cache: HashMap::new(),
            hits: 0,
            misses: 0,
        })
    }

    pub fn engine(&self) -> &Engine<'a> {
        &self.engine
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Cached equivalent of [`Engine::series`]
    pub fn series(
        &mut self,
        entity_id: &str,
        metric_id: &str,
        range: &DateRange,
    ) -> Vec<DerivedPoint> {
        let Some(metric) = self.engine.aliases().describe(metric_id) else {
            return Vec::new();
        };
        let key = SeriesCacheKey {
            entity_id: entity_id.to_string(),
            metric: metric_id.to_string(),
            device: metric.device(),
            range: *range,
        };

        if let Some(points) = self.cache.get(&key) {
            self.hits += 1;
            return points.clone();
        }

        self.misses += 1;
        let points = self
            .engine
            .series(self.measurements, entity_id, metric_id, range);
        self.cache.insert(key, points.clone());
        points
    }

    /// Cached equivalent of [`Engine::standard_score`]
    pub fn standard_score(
        &mut self,
        entity_id: &str,
        level: Option<&str>,
        metric_id: &str,
        range: &DateRange,
    ) -> StandardScore {
        let points = self.series(entity_id, metric_id, range);
        self.engine.score_points(metric_id, &points, level)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
