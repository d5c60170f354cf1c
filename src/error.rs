//! Structural errors raised while loading configuration snapshots
//!
//! The analytical core never fails; only loading alias tables, rule packs and
//! engine configuration can. Loaders wrap these into `anyhow::Error` with
//! file context.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate metric id '{0}' in alias table")]
    DuplicateMetric(String),

    #[error("Metric '{0}' declares no payload aliases")]
    EmptyAliases(String),

    #[error("Composite metric '{composite}' references unknown channel '{channel}'")]
    UnknownChannel { composite: String, channel: String },

    #[error("Composite metric '{composite}' channel '{channel}' belongs to a different device")]
    ChannelDeviceMismatch { composite: String, channel: String },

    #[error("Composite metric '{0}' needs at least two channels")]
    TooFewChannels(String),

    #[error("Bilateral metric '{0}' must declare exactly two channels (left, right)")]
    BilateralArity(String),

    #[error("Classifier rule '{0}' declares no labels")]
    EmptyRule(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}
