use crate::classify::{
    normalize_label, CategoryRule, Classification, DeviceFamily, KeywordRule, MatchSource,
};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DEFAULT_RULES_TOML: &str = include_str!("../../classifier-default.toml");

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    version: u32,
    default_family: DeviceFamily,
    #[serde(default)]
    category: Vec<CategoryRule>,
    #[serde(default)]
    keyword: Vec<KeywordRule>,
}

/// Ordered, data-driven rule pack for test classification
///
/// New device label spellings are a configuration change, not a code change.
///
/// # Example Usage
/// ```
/// use rendimiento::classify::{ClassifierRegistry, DeviceFamily};
///
/// let registry = ClassifierRegistry::default_rules()?;
/// let class = registry.classify("ForceFrame", Some("Hip AD/AB"));
/// assert_eq!(class.family, DeviceFamily::FrameRig);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierRegistry {
    version: u32,
    default_family: DeviceFamily,
    categories: Vec<CategoryRule>,
    keywords: Vec<KeywordRule>,

    /// Normalized label → index of the first category declaring it
    #[serde(skip)]
    label_index: HashMap<String, usize>,
}

impl ClassifierRegistry {
    /// Load a rule pack from a TOML file
    ///
    /// # Errors
    /// Returns error if the file doesn't exist, has invalid TOML syntax, or
    /// contains a category without any usable label.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read classifier rules file: {}",
                path.as_ref().display()
            )
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RuleFile =
            toml::from_str(content).context("Failed to parse TOML classifier rules")?;
        Ok(Self::build(file)?)
    }

    /// Embedded default rule pack (zero-config operation)
    pub fn default_rules() -> Result<Self> {
        Self::from_toml_str(DEFAULT_RULES_TOML)
            .context("Failed to parse embedded classifier-default.toml")
    }

    fn build(file: RuleFile) -> std::result::Result<Self, ConfigError> {
        let mut label_index: HashMap<String, usize> = HashMap::new();
        for (idx, rule) in file.category.iter().enumerate() {
            let mut usable = false;
            for label in &rule.labels {
                let key = normalize_label(label);
                if key.is_empty() {
                    continue;
                }
                usable = true;
                // First declaration wins; later duplicates are shadowed.
                if let Some(&existing) = label_index.get(&key) {
                    tracing::debug!(
                        "Label '{}' of category '{}' shadowed by earlier category '{}'",
                        label,
                        rule.name,
                        file.category[existing].name
                    );
                    continue;
                }
                label_index.insert(key, idx);
            }
            if !usable {
                return Err(ConfigError::EmptyRule(rule.name.clone()));
            }
        }

        for rule in &file.keyword {
            if rule.keywords.iter().all(|k| normalize_label(k).is_empty()) {
                return Err(ConfigError::EmptyRule(format!(
                    "keyword rule for {}",
                    rule.family
                )));
            }
        }

        Ok(Self {
            version: file.version,
            default_family: file.default_family,
            categories: file.category,
            keywords: file.keyword,
            label_index,
        })
    }

    /// Classify a raw test label with an optional sub-test name
    ///
    /// The sub-test name is more specific than the test type, so it is tried
    /// first at every stage.
    pub fn classify(&self, test_type: &str, sub_test: Option<&str>) -> Classification {
        let candidates: Vec<String> = sub_test
            .into_iter()
            .chain(std::iter::once(test_type))
            .map(normalize_label)
            .filter(|c| !c.is_empty())
            .collect();

        for candidate in &candidates {
            if let Some(&idx) = self.label_index.get(candidate) {
                let rule = &self.categories[idx];
                return Classification {
                    family: rule.family,
                    category: rule.name.clone(),
                    matched_by: MatchSource::Explicit,
                };
            }
        }

        for rule in &self.keywords {
            if candidates.iter().any(|c| rule.matches(c)) {
                return Classification {
                    family: rule.family,
                    category: rule
                        .category
                        .clone()
                        .unwrap_or_else(|| display_label(test_type, sub_test)),
                    matched_by: MatchSource::Keyword,
                };
            }
        }

        tracing::debug!(
            "No classification rule for test '{}' (sub-test {:?}); using {}",
            test_type,
            sub_test,
            self.default_family
        );
        Classification {
            family: self.default_family,
            category: display_label(test_type, sub_test),
            matched_by: MatchSource::Default,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn default_family(&self) -> DeviceFamily {
        self.default_family
    }

    pub fn categories(&self) -> &[CategoryRule] {
        &self.categories
    }

    pub fn keywords(&self) -> &[KeywordRule] {
        &self.keywords
    }

    /// Get a category rule by its canonical name
    pub fn get_category(&self, name: &str) -> Option<&CategoryRule> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Label reported when no explicit category applies
fn display_label(test_type: &str, sub_test: Option<&str>) -> String {
    let label = sub_test
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| test_type.trim());
    if label.is_empty() {
        "Unknown".to_string()
    } else {
        label.to_string()
    }
}
