use crate::classify::DeviceFamily;
use crate::error::ConfigError;
use crate::resolve::payload::{FlatPayload, DEFAULT_CONTAINERS};
use crate::resolve::{resolve_aliases, Resolved};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DEFAULT_METRICS_TOML: &str = include_str!("../../metrics-default.toml");

/// Validity predicate applied to a candidate payload value
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    /// Physical magnitudes: strictly greater than zero
    #[default]
    Positive,
    /// Signed quantities: any finite number
    Finite,
}

impl Validity {
    pub fn accepts(self, value: f64) -> bool {
        match self {
            Validity::Positive => value.is_finite() && value > 0.0,
            Validity::Finite => value.is_finite(),
        }
    }
}

/// Device-independent named quantity
///
/// # Example TOML
/// ```toml
/// [[metric]]
/// id = "jump_height"
/// device = "jump_platform"
/// aliases = ["JUMP_HEIGHT_IMP_MOM", "JUMP_HEIGHT", "jumpHeight"]
/// unit = "cm"
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CanonicalMetric {
    pub id: String,

    /// Owning device family; only measurements of this family are consulted
    pub device: DeviceFamily,

    /// Payload keys in priority order (newest firmware spelling first)
    pub aliases: Vec<String>,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub lower_is_better: bool,

    #[serde(default)]
    pub validity: Validity,
}

/// Metric derived from two or more channel metrics of the same device
///
/// The composite value is the arithmetic mean of its channel values and is
/// only defined when every channel resolves. A `bilateral` composite has
/// exactly two channels, `[left, right]`, and supports asymmetry analysis.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CompositeMetric {
    pub id: String,

    pub device: DeviceFamily,

    pub channels: Vec<String>,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub lower_is_better: bool,

    #[serde(default)]
    pub bilateral: bool,
}

impl CompositeMetric {
    /// Left and right channel ids of a bilateral composite
    pub fn sides(&self) -> Option<(&str, &str)> {
        match (self.bilateral, self.channels.as_slice()) {
            (true, [left, right]) => Some((left.as_str(), right.as_str())),
            _ => None,
        }
    }
}

/// Borrowed view over either kind of metric
#[derive(Debug, Clone, Copy)]
pub enum MetricRef<'a> {
    Plain(&'a CanonicalMetric),
    Composite(&'a CompositeMetric),
}

impl<'a> MetricRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            MetricRef::Plain(m) => &m.id,
            MetricRef::Composite(c) => &c.id,
        }
    }

    pub fn device(&self) -> DeviceFamily {
        match self {
            MetricRef::Plain(m) => m.device,
            MetricRef::Composite(c) => c.device,
        }
    }

    pub fn unit(&self) -> &'a str {
        match self {
            MetricRef::Plain(m) => &m.unit,
            MetricRef::Composite(c) => &c.unit,
        }
    }

    pub fn lower_is_better(&self) -> bool {
        match self {
            MetricRef::Plain(m) => m.lower_is_better,
            MetricRef::Composite(c) => c.lower_is_better,
        }
    }
}

#[derive(Deserialize)]
struct AliasFile {
    #[serde(default)]
    version: u32,
    #[serde(default = "default_containers")]
    containers: Vec<String>,
    #[serde(default)]
    metric: Vec<CanonicalMetric>,
    #[serde(default)]
    composite: Vec<CompositeMetric>,
}

fn default_containers() -> Vec<String> {
    DEFAULT_CONTAINERS.iter().map(|s| s.to_string()).collect()
}

/// Versioned alias configuration
///
/// Maps canonical metric ids to ordered payload key aliases. Stored as data so
/// that device firmware key renames are a configuration change.
#[derive(Debug, Clone, Serialize)]
pub struct AliasTable {
    version: u32,
    containers: Vec<String>,
    metrics: Vec<CanonicalMetric>,
    composites: Vec<CompositeMetric>,

    #[serde(skip)]
    index: HashMap<String, Slot>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Plain(usize),
    Composite(usize),
}

impl AliasTable {
    /// Load an alias table from a TOML file
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed, declares a metric
    /// twice, declares a metric without aliases, or declares a composite
    /// whose channels are missing or belong to another device.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read alias table: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: AliasFile =
            toml::from_str(content).context("Failed to parse TOML alias table")?;
        Ok(Self::build(file)?)
    }

    /// Embedded default alias table
    pub fn default_table() -> Result<Self> {
        Self::from_toml_str(DEFAULT_METRICS_TOML)
            .context("Failed to parse embedded metrics-default.toml")
    }

    fn build(file: AliasFile) -> std::result::Result<Self, ConfigError> {
        let mut index = HashMap::new();

        for (idx, metric) in file.metric.iter().enumerate() {
            if metric.aliases.iter().all(|a| a.trim().is_empty()) {
                return Err(ConfigError::EmptyAliases(metric.id.clone()));
            }
            if index.insert(metric.id.clone(), Slot::Plain(idx)).is_some() {
                return Err(ConfigError::DuplicateMetric(metric.id.clone()));
            }
        }

        for (idx, composite) in file.composite.iter().enumerate() {
            if composite.channels.len() < 2 {
                return Err(ConfigError::TooFewChannels(composite.id.clone()));
            }
            if composite.bilateral && composite.channels.len() != 2 {
                return Err(ConfigError::BilateralArity(composite.id.clone()));
            }
            for channel in &composite.channels {
                match index.get(channel) {
                    Some(Slot::Plain(i)) => {
                        if file.metric[*i].device != composite.device {
                            return Err(ConfigError::ChannelDeviceMismatch {
                                composite: composite.id.clone(),
                                channel: channel.clone(),
                            });
                        }
                    }
                    _ => {
                        return Err(ConfigError::UnknownChannel {
                            composite: composite.id.clone(),
                            channel: channel.clone(),
                        })
                    }
                }
            }
            if index
                .insert(composite.id.clone(), Slot::Composite(idx))
                .is_some()
            {
                return Err(ConfigError::DuplicateMetric(composite.id.clone()));
            }
        }

        Ok(Self {
            version: file.version,
            containers: file.containers,
            metrics: file.metric,
            composites: file.composite,
            index,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Nested containers merged into the lookup namespace, in precedence order
    pub fn containers(&self) -> &[String] {
        &self.containers
    }

    pub fn metrics(&self) -> &[CanonicalMetric] {
        &self.metrics
    }

    pub fn composites(&self) -> &[CompositeMetric] {
        &self.composites
    }

    pub fn metric(&self, id: &str) -> Option<&CanonicalMetric> {
        match self.index.get(id)? {
            Slot::Plain(i) => self.metrics.get(*i),
            Slot::Composite(_) => None,
        }
    }

    pub fn composite(&self, id: &str) -> Option<&CompositeMetric> {
        match self.index.get(id)? {
            Slot::Composite(i) => self.composites.get(*i),
            Slot::Plain(_) => None,
        }
    }

    /// Look up any metric, plain or composite
    pub fn describe(&self, id: &str) -> Option<MetricRef<'_>> {
        match self.index.get(id)? {
            Slot::Plain(i) => self.metrics.get(*i).map(MetricRef::Plain),
            Slot::Composite(i) => self.composites.get(*i).map(MetricRef::Composite),
        }
    }

    /// Every metric id, plain metrics first, in declaration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.metrics
            .iter()
            .map(|m| m.id.as_str())
            .chain(self.composites.iter().map(|c| c.id.as_str()))
    }

    /// Flatten a raw payload with this table's container precedence
    pub fn flatten(&self, payload: &Value) -> Option<FlatPayload> {
        FlatPayload::from_value(payload, &self.containers)
    }

    /// Resolve a metric against an already-flattened payload
    ///
    /// Unknown ids resolve to `None`. Composites require every channel.
    pub fn resolve(&self, payload: &FlatPayload, id: &str) -> Option<Resolved> {
        match self.describe(id)? {
            MetricRef::Plain(metric) => {
                resolve_aliases(payload, &metric.aliases, metric.validity).map(|hit| Resolved {
                    metric_id: metric.id.clone(),
                    value: hit.value,
                    key: Some(hit.key.to_string()),
                })
            }
            MetricRef::Composite(composite) => {
                // Divide each channel first so large finite channels cannot sum to inf
                let n = composite.channels.len() as f64;
                let mut mean = 0.0_f64;
                for channel in &composite.channels {
                    mean += self.resolve(payload, channel)?.value / n;
                }
                mean.is_finite().then(|| Resolved {
                    metric_id: composite.id.clone(),
                    value: mean,
                    key: None,
                })
            }
        }
    }

    /// Flatten and resolve in one step
    pub fn resolve_value(&self, payload: &Value, id: &str) -> Option<Resolved> {
        let flat = self.flatten(payload)?;
        self.resolve(&flat, id)
    }
}
