use anyhow::{Context, Result};
use clap::Parser;
use rendimiento::aggregate::DerivedPoint;
use rendimiento::cli::{Cli, Command, OutputFormat};
use rendimiento::classify::{Classification, ClassifierRegistry};
use rendimiento::cohort::CohortTable;
use rendimiento::config::EngineConfig;
use rendimiento::correlation::CorrelationCell;
use rendimiento::engine::{DateRange, Engine, EntityReport, LeaderboardEntry};
use rendimiento::error::ConfigError;
use rendimiento::measurement::{load_measurements, Measurement};
use rendimiento::resolve::AliasTable;
use rendimiento::score::Comparison;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Snapshots every analysis command runs against
struct Snapshots {
    aliases: AliasTable,
    rules: ClassifierRegistry,
    cohorts: CohortTable,
    config: EngineConfig,
}

impl Snapshots {
    fn load(cli: &Cli) -> Result<Self> {
        let aliases = match &cli.aliases {
            Some(path) => AliasTable::from_toml(path)?,
            None => AliasTable::default_table()?,
        };
        let rules = match &cli.rules {
            Some(path) => ClassifierRegistry::from_toml(path)?,
            None => ClassifierRegistry::default_rules()?,
        };
        let cohorts = match &cli.cohorts {
            Some(path) => CohortTable::from_json(path)?,
            None => {
                tracing::debug!("No cohort table given; scores use self-baselines");
                CohortTable::new()
            }
        };

        let mut config = match &cli.config {
            Some(path) => EngineConfig::from_toml(path)?,
            None => EngineConfig::default(),
        };
        if let Some(minutes) = cli.day_offset {
            config.day_offset_minutes = minutes;
        }
        config.validate().map_err(ConfigError::InvalidConfig)?;

        Ok(Self {
            aliases,
            rules,
            cohorts,
            config,
        })
    }

    fn engine(&self) -> Engine<'_> {
        Engine::new(&self.aliases, &self.rules, &self.cohorts, &self.config)
    }
}

fn require_measurements(cli: &Cli) -> Result<Vec<Measurement>> {
    let path = cli
        .measurements
        .as_ref()
        .context("This command needs a measurement file (--measurements FILE)")?;
    load_measurements(path)
}

fn load_levels(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read levels file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse levels JSON: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn print_series_text(entity: &str, metric: &str, series: &[DerivedPoint]) {
    println!("{} / {} ({} days)", entity, metric, series.len());
    for point in series {
        println!("{}  {:>12.3}", point.date, point.value);
    }
}

fn print_report_text(report: &EntityReport) {
    println!("Entity: {}", report.entity_id);
    if let Some(level) = &report.level {
        println!("Level:  {}", level);
    }
    if report.metrics.is_empty() {
        println!("No data");
        return;
    }
    for metric in &report.metrics {
        println!();
        println!("{} ({})", metric.metric, metric.unit);
        println!("─────────────────────────────────────────");
        if let Some(summary) = &metric.summary {
            println!(
                "  days={}  best={:.3}  latest={:.3}  mean={:.3}  sd={:.3}",
                summary.count, summary.best, summary.latest, summary.mean, summary.std_dev
            );
        }
        if let Some(trend) = &metric.trend {
            println!("  trend slope={:+.4}/day", trend.slope);
        }
        println!("  score={:.1}", metric.score.display);
        if let Some(pairs) = &metric.asymmetry {
            for pair in pairs {
                println!(
                    "  {}  L={:.1}  R={:.1}  {:+.1}%  {:?}",
                    pair.date, pair.left, pair.right, pair.asymmetry.percent, pair.band
                );
            }
        }
    }
}

fn print_comparison_text(comparison: &Comparison) {
    println!("{:<24} {:>8} {:>8}  baseline", "metric", "score", "T");
    for axis in &comparison.axes {
        let t = axis
            .score
            .t_score
            .map_or_else(|| "-".to_string(), |t| format!("{:.1}", t));
        let source = axis
            .score
            .source()
            .map_or_else(|| "absent".to_string(), |s| format!("{:?}", s));
        println!("{:<24} {:>8.1} {:>8}  {}", axis.metric, axis.score.display, t, source);
    }
    println!("cohort reference: {:.1}", comparison.cohort_reference);
}

fn print_leaderboard_text(entries: &[LeaderboardEntry]) {
    println!("{:>4}  {:<20} {:>12} {:>8}", "rank", "entity", "best", "score");
    for entry in entries {
        println!(
            "{:>4}  {:<20} {:>12.3} {:>8.1}",
            entry.rank, entry.entity_id, entry.best, entry.score.display
        );
    }
}

fn print_correlation_text(cells: &[CorrelationCell]) {
    for cell in cells {
        match &cell.correlation {
            Some(c) => println!(
                "{} ~ {}: r={:.4} r²={:.4} n={}",
                cell.x, cell.y, c.r, c.r_squared, c.n
            ),
            None => println!("{} ~ {}: insufficient data", cell.x, cell.y),
        }
    }
}

fn print_classification_text(class: &Classification) {
    println!("{}  {}  ({:?})", class.family, class.category, class.matched_by);
}

fn run(cli: &Cli) -> Result<()> {
    let snapshots = Snapshots::load(cli)?;
    let engine = snapshots.engine();
    let range = DateRange::new(cli.from, cli.to);
    let text = cli.format == OutputFormat::Text;

    match &cli.command {
        Command::Classify {
            test_type,
            sub_test,
        } => {
            let class = snapshots.rules.classify(test_type, sub_test.as_deref());
            if text {
                print_classification_text(&class);
            } else {
                print_json(&class)?;
            }
        }
        Command::Series { entity, metric } => {
            let measurements = require_measurements(cli)?;
            let series = engine.series(&measurements, entity, metric, &range);
            if text {
                print_series_text(entity, metric, &series);
            } else {
                print_json(&series)?;
            }
        }
        Command::Report {
            entity,
            level,
            metrics,
        } => {
            let measurements = require_measurements(cli)?;
            let metrics: Vec<String> = if metrics.is_empty() {
                snapshots.aliases.ids().map(str::to_string).collect()
            } else {
                metrics.clone()
            };
            let report =
                engine.entity_report(&measurements, entity, level.as_deref(), &metrics, &range);
            if text {
                print_report_text(&report);
            } else {
                print_json(&report)?;
            }
        }
        Command::Compare {
            entity,
            level,
            metrics,
        } => {
            let measurements = require_measurements(cli)?;
            let comparison =
                engine.comparison(&measurements, entity, level.as_deref(), metrics, &range);
            if text {
                print_comparison_text(&comparison);
            } else {
                print_json(&comparison)?;
            }
        }
        Command::Leaderboard {
            metric,
            levels,
            top,
        } => {
            let measurements = require_measurements(cli)?;
            let levels = match levels {
                Some(path) => load_levels(path)?,
                None => BTreeMap::new(),
            };
            let mut board = engine.leaderboard(&measurements, &levels, metric, &range);
            if let Some(n) = top {
                board.truncate(*n);
            }
            if text {
                print_leaderboard_text(&board);
            } else {
                print_json(&board)?;
            }
        }
        Command::Correlate { metrics } => {
            let measurements = require_measurements(cli)?;
            let cells = engine.correlation_matrix(&measurements, metrics, &range);
            if text {
                print_correlation_text(&cells);
            } else {
                print_json(&cells)?;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    run(&cli)
}
