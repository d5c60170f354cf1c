// Cohort Statistics
//
// Precomputed cohort snapshots (`device → metric → level → {mean, std,
// count}`) are supplied by the caller; the engine never recomputes them.
//
// Lookup fallback chain:
//   1. exact (device, metric, level)
//   2. (device, metric, "ALL")
//   3. the entity's own best value as a neutral self-baseline
//
// Composite metrics pool their channel statistics under an independence
// approximation: mean of means, sqrt(Σ std² / n).

mod provider;
mod table;

pub use provider::{pooled, Baseline, BaselineSource, CohortProvider};
pub use table::{CohortStat, CohortTable, ALL_LEVEL};
