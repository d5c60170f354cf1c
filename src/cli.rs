//! CLI argument parsing for Rendimiento

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    Json,
    /// Human-readable plain-text table
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "rendimiento")]
#[command(version)]
#[command(
    about = "Metric normalization and cohort statistics for athlete testing data",
    long_about = None
)]
pub struct Cli {
    /// Measurement records (JSON array)
    #[arg(short = 'm', long = "measurements", value_name = "FILE", global = true)]
    pub measurements: Option<PathBuf>,

    /// Cohort statistics table (JSON: device → metric → level → {mean, std, count})
    #[arg(short = 'c', long = "cohorts", value_name = "FILE", global = true)]
    pub cohorts: Option<PathBuf>,

    /// Alias table (TOML); defaults to the embedded table
    #[arg(long = "aliases", value_name = "FILE", global = true)]
    pub aliases: Option<PathBuf>,

    /// Classifier rule pack (TOML); defaults to the embedded rules
    #[arg(long = "rules", value_name = "FILE", global = true)]
    pub rules: Option<PathBuf>,

    /// Engine configuration (TOML)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Override the day-boundary UTC offset in minutes (e.g. 600 for UTC+10)
    #[arg(
        long = "day-offset",
        value_name = "MINUTES",
        global = true,
        allow_hyphen_values = true
    )]
    pub day_offset: Option<i32>,

    /// First calendar day to include (YYYY-MM-DD)
    #[arg(long = "from", value_name = "DATE", global = true)]
    pub from: Option<NaiveDate>,

    /// Last calendar day to include (YYYY-MM-DD)
    #[arg(long = "to", value_name = "DATE", global = true)]
    pub to: Option<NaiveDate>,

    /// Output format (json or text)
    #[arg(long = "format", value_enum, default_value = "json", global = true)]
    pub format: OutputFormat,

    /// Enable debug tracing to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Daily best-value series for one entity and metric
    Series {
        #[arg(short = 'e', long = "entity")]
        entity: String,
        #[arg(long = "metric")]
        metric: String,
    },

    /// Series, trend, summary and score for an entity
    Report {
        #[arg(short = 'e', long = "entity")]
        entity: String,
        /// Cohort level to compare against (falls back to ALL)
        #[arg(long = "level")]
        level: Option<String>,
        /// Metrics to include (comma-separated); every known metric when omitted
        #[arg(long = "metrics", value_delimiter = ',')]
        metrics: Vec<String>,
    },

    /// Multi-axis comparison against cohort averages
    Compare {
        #[arg(short = 'e', long = "entity")]
        entity: String,
        #[arg(long = "level")]
        level: Option<String>,
        #[arg(long = "metrics", value_delimiter = ',', required = true)]
        metrics: Vec<String>,
    },

    /// Entities ranked by best value
    Leaderboard {
        #[arg(long = "metric")]
        metric: String,
        /// Entity cohort levels (JSON object: entity id → level)
        #[arg(long = "levels", value_name = "FILE")]
        levels: Option<PathBuf>,
        /// Show only the first N entries
        #[arg(long = "top", value_name = "N")]
        top: Option<usize>,
    },

    /// Pearson correlation for every pair of the given metrics
    Correlate {
        #[arg(long = "metrics", value_delimiter = ',', required = true)]
        metrics: Vec<String>,
    },

    /// Show how a test label is classified
    Classify {
        /// Raw test type label
        test_type: String,
        #[arg(long = "sub-test")]
        sub_test: Option<String>,
    },
}
