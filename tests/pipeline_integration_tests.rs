//! End-to-end pipeline tests over the fixture snapshot
//!
//! Covers the full chain classify → resolve → aggregate → score against
//! realistic mixed-shape payloads, plus the idempotence guarantee.

use rendimiento::asymmetry::{ImbalanceBand, Side};
use rendimiento::classify::ClassifierRegistry;
use rendimiento::cohort::{BaselineSource, CohortTable};
use rendimiento::config::EngineConfig;
use rendimiento::engine::{DateRange, Engine};
use rendimiento::measurement::{load_measurements, Measurement};
use rendimiento::memo::MemoizedEngine;
use rendimiento::resolve::AliasTable;
use std::collections::BTreeMap;

const MEASUREMENTS: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/measurements.json"
);
const COHORTS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/cohorts.json");

struct Snapshot {
    measurements: Vec<Measurement>,
    aliases: AliasTable,
    rules: ClassifierRegistry,
    cohorts: CohortTable,
    config: EngineConfig,
}

impl Snapshot {
    fn load() -> Self {
        Self {
            measurements: load_measurements(MEASUREMENTS).unwrap(),
            aliases: AliasTable::default_table().unwrap(),
            rules: ClassifierRegistry::default_rules().unwrap(),
            cohorts: CohortTable::from_json(COHORTS).unwrap(),
            config: EngineConfig::default(),
        }
    }

    fn engine(&self) -> Engine<'_> {
        Engine::new(&self.aliases, &self.rules, &self.cohorts, &self.config)
    }
}

fn day(d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

/// Everything the CLI can produce, serialized in one document
fn full_pipeline_json(snapshot: &Snapshot) -> String {
    let engine = snapshot.engine();
    let ms = &snapshot.measurements;
    let range = DateRange::all();
    let metrics: Vec<&str> = snapshot.aliases.ids().collect();
    let levels: BTreeMap<String, String> =
        [("ath-002".to_string(), "Elite".to_string())].into_iter().collect();

    let reports: Vec<_> = ["ath-001", "ath-002", "ath-003"]
        .iter()
        .map(|entity| engine.entity_report(ms, entity, None, &metrics, &range))
        .collect();
    let boards: Vec<_> = ["jump_height", "sprint_time", "nordic_force"]
        .iter()
        .map(|metric| engine.leaderboard(ms, &levels, metric, &range))
        .collect();
    let matrix =
        engine.correlation_matrix(ms, &["jump_height", "peak_power", "sprint_time"], &range);
    let comparison = engine.comparison(ms, "ath-001", None, &metrics, &range);

    serde_json::to_string(&(reports, boards, matrix, comparison)).unwrap()
}

#[test]
fn test_pipeline_is_byte_identical_across_runs() {
    let first = full_pipeline_json(&Snapshot::load());
    let second = full_pipeline_json(&Snapshot::load());
    assert_eq!(first, second);
}

#[test]
fn test_mixed_payload_shapes_resolve() {
    let snapshot = Snapshot::load();
    let series = snapshot.engine().series(
        &snapshot.measurements,
        "ath-001",
        "jump_height",
        &DateRange::all(),
    );

    let points: Vec<(chrono::NaiveDate, f64)> =
        series.iter().map(|p| (p.date, p.value)).collect();
    // Plain object (best of two same-day records), JSON string with nested
    // results, and a result-field array
    assert_eq!(points, vec![(day(1), 40.0), (day(8), 42.5), (day(15), 41.0)]);
}

#[test]
fn test_numeric_string_in_result_fields() {
    let snapshot = Snapshot::load();
    let series = snapshot.engine().series(
        &snapshot.measurements,
        "ath-001",
        "peak_power",
        &DateRange::all(),
    );
    assert_eq!(series.last().map(|p| p.value), Some(4350.0));
}

#[test]
fn test_malformed_record_is_excluded() {
    let snapshot = Snapshot::load();
    let series = snapshot.engine().series(
        &snapshot.measurements,
        "ath-003",
        "jump_height",
        &DateRange::all(),
    );
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].value, 35.0);
}

#[test]
fn test_elite_level_score() {
    let snapshot = Snapshot::load();
    let score = snapshot.engine().standard_score(
        &snapshot.measurements,
        "ath-002",
        Some("Elite"),
        "jump_height",
        &DateRange::all(),
    );
    // best 46 against Elite 45 ± 4 → T = 52.5
    assert_eq!(score.raw, Some(46.0));
    assert!((score.t_score.unwrap() - 52.5).abs() < 1e-9);
    assert!((score.display - 54.166_666).abs() < 1e-3);
    assert_eq!(score.source(), Some(BaselineSource::Level));
}

#[test]
fn test_unknown_level_falls_back_to_all() {
    let snapshot = Snapshot::load();
    let score = snapshot.engine().standard_score(
        &snapshot.measurements,
        "ath-001",
        Some("Academy"),
        "jump_height",
        &DateRange::all(),
    );
    assert_eq!(score.source(), Some(BaselineSource::AllLevels));
    // best 42.5 against 40 ± 5 → T = 55
    assert!((score.t_score.unwrap() - 55.0).abs() < 1e-9);
}

#[test]
fn test_missing_cohort_uses_self_baseline() {
    let snapshot = Snapshot::load();
    // Empty cohort snapshot: the entity's own best is the baseline
    let empty = CohortTable::new();
    let engine = Engine::new(&snapshot.aliases, &snapshot.rules, &empty, &snapshot.config);
    let score = engine.standard_score(
        &snapshot.measurements,
        "ath-001",
        None,
        "sprint_time",
        &DateRange::all(),
    );
    assert_eq!(score.source(), Some(BaselineSource::SelfBaseline));
    assert_eq!(score.display, 50.0);
}

#[test]
fn test_composite_nordic_asymmetry() {
    let snapshot = Snapshot::load();
    let paired = snapshot
        .engine()
        .asymmetry_series(
            &snapshot.measurements,
            "ath-001",
            "nordic_force",
            &DateRange::all(),
        )
        .unwrap();

    assert_eq!(paired.len(), 2);
    assert_eq!(paired[0].date, day(2));
    assert_eq!(paired[0].asymmetry.dominant, Some(Side::Right));
    assert_eq!(paired[0].band, ImbalanceBand::High);
    assert_eq!(paired[1].band, ImbalanceBand::Normal);
}

#[test]
fn test_composite_score_uses_pooled_channels() {
    let snapshot = Snapshot::load();
    let score = snapshot.engine().standard_score(
        &snapshot.measurements,
        "ath-001",
        None,
        "nordic_force",
        &DateRange::all(),
    );
    // Daily composite values 330 and 335; pooled baseline 325 ± √1250
    assert_eq!(score.raw, Some(335.0));
    let baseline = score.baseline.unwrap();
    assert_eq!(baseline.mean, 325.0);
    assert!((baseline.std - 1250f64.sqrt()).abs() < 1e-9);
    assert_eq!(baseline.sample_count, 118);
    assert!(score.display > 50.0);
}

#[test]
fn test_sprint_leaderboard_lower_is_better() {
    let snapshot = Snapshot::load();
    let board = snapshot.engine().leaderboard(
        &snapshot.measurements,
        &BTreeMap::new(),
        "sprint_time",
        &DateRange::all(),
    );
    let order: Vec<&str> = board.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(order, vec!["ath-002", "ath-001", "ath-003"]);
    // 2.95 against 3.1 ± 0.1, mirrored: T = 65 → display 75
    assert!((board[0].score.display - 75.0).abs() < 1e-6);
    assert!(board[2].score.display < 50.0);
}

#[test]
fn test_correlation_pools_entities() {
    let snapshot = Snapshot::load();
    let r = snapshot
        .engine()
        .correlation(
            &snapshot.measurements,
            "jump_height",
            "peak_power",
            &DateRange::all(),
        )
        .unwrap();
    assert_eq!(r.n, 7);
    assert!(r.r > 0.9);
    assert!((r.r_squared - r.r * r.r).abs() < 1e-12);
}

#[test]
fn test_date_range_limits_report() {
    let snapshot = Snapshot::load();
    let range = DateRange::new(Some(day(5)), None);
    let report = snapshot.engine().entity_report(
        &snapshot.measurements,
        "ath-001",
        None,
        &["jump_height", "sprint_time"],
        &range,
    );

    assert_eq!(report.metrics.len(), 1);
    let jump = &report.metrics[0];
    assert_eq!(jump.series.len(), 2);
    let summary = jump.summary.as_ref().unwrap();
    assert_eq!(summary.best, 42.5);
    assert_eq!(summary.latest, 41.0);
    assert!((summary.change - -1.5).abs() < 1e-9);
}

#[test]
fn test_day_offset_moves_records_between_days() {
    let snapshot = Snapshot::load();
    // 15:00Z on March 1st is already March 2nd at UTC+10
    let shifted = EngineConfig::with_day_offset(600);
    let engine = Engine::new(
        &snapshot.aliases,
        &snapshot.rules,
        &snapshot.cohorts,
        &shifted,
    );
    let series = engine.series(
        &snapshot.measurements,
        "ath-001",
        "jump_height",
        &DateRange::all(),
    );

    let days: Vec<chrono::NaiveDate> = series.iter().map(|p| p.date).collect();
    assert_eq!(days, vec![day(1), day(2), day(8), day(15)]);
    assert_eq!(series[0].value, 38.0);
    assert_eq!(series[1].value, 40.0);
}

#[test]
fn test_memoized_engine_matches_pure_engine() {
    let snapshot = Snapshot::load();
    let engine = snapshot.engine();
    let mut memo = MemoizedEngine::new(engine, &snapshot.measurements).unwrap();
    let range = DateRange::all();

    for entity in ["ath-001", "ath-002", "ath-003"] {
        for metric in ["jump_height", "peak_power", "sprint_time", "nordic_force"] {
            let pure = engine.standard_score(&snapshot.measurements, entity, None, metric, &range);
            let miss = memo.standard_score(entity, None, metric, &range);
            let hit = memo.standard_score(entity, None, metric, &range);
            assert_eq!(
                serde_json::to_string(&pure).unwrap(),
                serde_json::to_string(&miss).unwrap()
            );
            assert_eq!(
                serde_json::to_string(&miss).unwrap(),
                serde_json::to_string(&hit).unwrap()
            );
        }
    }

    let stats = memo.stats();
    assert_eq!(stats.misses, 12);
    assert_eq!(stats.hits, 12);
}
