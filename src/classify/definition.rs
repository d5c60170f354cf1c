use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical measurement device family
///
/// Every measurement resolves to exactly one family.
#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    /// Dual force-plate jump testing platform
    JumpPlatform,
    /// Isometric/eccentric nordic hamstring rig
    NordicRig,
    /// Frame-based isometric strength rig (hip, knee, shoulder)
    FrameRig,
    /// Timing-gate sprint and change-of-direction system
    TimingGates,
    /// Handheld range-of-motion / strength probe
    MotionProbe,
    /// Manually entered record
    Manual,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 6] = [
        DeviceFamily::JumpPlatform,
        DeviceFamily::NordicRig,
        DeviceFamily::FrameRig,
        DeviceFamily::TimingGates,
        DeviceFamily::MotionProbe,
        DeviceFamily::Manual,
    ];

    /// Stable key used in cohort tables and configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceFamily::JumpPlatform => "jump_platform",
            DeviceFamily::NordicRig => "nordic_rig",
            DeviceFamily::FrameRig => "frame_rig",
            DeviceFamily::TimingGates => "timing_gates",
            DeviceFamily::MotionProbe => "motion_probe",
            DeviceFamily::Manual => "manual",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.as_str() == key)
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit category entry
///
/// # Example TOML
/// ```toml
/// [[category]]
/// name = "CMJ"
/// family = "jump_platform"
/// labels = ["CMJ", "Countermovement Jump", "Counter Movement Jump"]
/// ```
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CategoryRule {
    /// Canonical test category reported to callers
    pub name: String,

    /// Device family the category belongs to
    pub family: DeviceFamily,

    /// Known spellings of the category. Compared after normalization.
    pub labels: Vec<String>,
}

/// Keyword heuristic applied when no explicit category matches
///
/// Any keyword found as a substring of the normalized label selects the
/// rule's family.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeywordRule {
    pub keywords: Vec<String>,

    pub family: DeviceFamily,

    /// Category to report. When absent the raw label is reported instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl KeywordRule {
    /// Check the rule against an already-normalized label
    pub fn matches(&self, normalized: &str) -> bool {
        !normalized.is_empty()
            && self
                .keywords
                .iter()
                .map(|k| normalize_label(k))
                .any(|k| !k.is_empty() && normalized.contains(&k))
    }
}

/// Which stage of the rule pack produced a classification
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Explicit,
    Keyword,
    Default,
}

/// Result of classifying a test label
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Classification {
    pub family: DeviceFamily,
    pub category: String,
    pub matched_by: MatchSource,
}

/// Lowercase and strip every non-alphanumeric character
///
/// "Hip AD/AB" and "hip_ad-ab" both normalize to "hipadab".
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
