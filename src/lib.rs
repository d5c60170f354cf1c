//! Rendimiento - metric normalization and cohort statistics engine
//!
//! This library turns heterogeneous athlete test records into canonical,
//! comparable quantities: device classification, alias-based metric
//! resolution, per-day aggregation, cohort-relative T-scores, left/right
//! asymmetry, trendlines and cross-metric correlation.
//!
//! Every analytical operation is a pure function of caller-owned snapshots
//! (measurements, alias table, classifier rules, cohort statistics).

pub mod aggregate;
pub mod asymmetry;
pub mod classify;
pub mod cli;
pub mod cohort;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod measurement;
pub mod memo;
pub mod resolve;
pub mod score;
pub mod summary;
pub mod trend;
