//! Configuration types for sbom-assembler.
//!
//! [`AppConfig`] is what a config file holds; [`AssembleConfig`] is the
//! fully resolved configuration of one `assemble` run.

use crate::model::{Encoding, SbomSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// File-level configuration, layered under the CLI arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Identity of the synthetic primary component
    pub app: AppIdentity,
    /// Output spec, version, encoding and destination
    pub output: OutputConfig,
    /// Component matcher settings (augment mode)
    pub matching: MatchingConfig,
    /// Merge behavior
    pub assemble: AssembleSection,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// How input documents are combined.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Every input component at the top level
    Flat,
    /// Input primaries nested under the new primary
    Assembly,
    /// Input components nested under their input's primary
    #[default]
    Hierarchical,
    /// Inputs merged into a designated primary document
    Augment,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flat => "flat",
            Self::Assembly => "assembly",
            Self::Hierarchical => "hierarchical",
            Self::Augment => "augment",
        };
        f.write_str(name)
    }
}

/// Field merge policy for matched components in augment mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Fill only fields the primary leaves empty
    #[default]
    IfMissingOrEmpty,
    /// Replace primary fields with any non-empty secondary value
    Overwrite,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IfMissingOrEmpty => f.write_str("if-missing-or-empty"),
            Self::Overwrite => f.write_str("overwrite"),
        }
    }
}

// ============================================================================
// Sub-configuration Types
// ============================================================================

/// A person credited as author of the assembled SBOM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    /// Parse `Name <email>` or a bare name.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match (raw.find('<'), raw.rfind('>')) {
            (Some(open), Some(close)) if open < close => Self {
                name: raw[..open].trim().to_string(),
                email: Some(raw[open + 1..close].trim().to_string()).filter(|e| !e.is_empty()),
            },
            _ => Self {
                name: raw.to_string(),
                email: None,
            },
        }
    }
}

/// Organization supplying the assembled product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Supplier {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A checksum of the assembled product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChecksumConfig {
    /// Algorithm name, e.g. `SHA-256`
    pub algorithm: String,
    pub value: String,
}

impl ChecksumConfig {
    /// Parse `ALG=VALUE`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (algorithm, value) = raw.split_once('=')?;
        let (algorithm, value) = (algorithm.trim(), value.trim());
        (!algorithm.is_empty()).then(|| Self {
            algorithm: algorithm.to_string(),
            value: value.to_string(),
        })
    }
}

/// Identity of the synthetic primary component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppIdentity {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Supplier>,
    /// SPDX license id or expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    pub checksums: Vec<ChecksumConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    /// CycloneDX component type / SPDX primary package purpose
    pub primary_purpose: String,
}

/// Output-related configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Output spec; defaults to the detected input spec
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<SbomSpec>,
    /// Output spec version; defaults to the newest supported version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
    /// Output encoding; defaults to JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Encoding>,
    /// Output file path (None for stdout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Matcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MatchingConfig {
    /// One of `composite`, `purl`, `cpe`, `name-version`
    pub strategy: String,
    /// Compare purl and CPE versions exactly
    pub strict_version: bool,
    /// Accept substring name matches
    pub fuzzy_match: bool,
    /// Require equal component types when both are known
    pub type_match: bool,
    /// Composite matcher threshold
    #[schemars(range(min = 0, max = 100))]
    pub min_confidence: u8,
}

/// Merge behavior defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AssembleSection {
    pub merge_mode: MergeMode,
}

// ============================================================================
// Command-specific Configuration Types
// ============================================================================

/// Configuration for one assemble run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembleConfig {
    /// Input documents in merge order (secondaries in augment mode)
    pub inputs: Vec<PathBuf>,
    /// Designated primary document (augment mode only)
    pub primary_file: Option<PathBuf>,
    pub flat_merge: bool,
    pub assembly_merge: bool,
    pub hierarchical_merge: bool,
    pub augment_merge: bool,
    pub merge_mode: MergeMode,
    pub matching: MatchingConfig,
    pub output: OutputConfig,
    pub app: AppIdentity,
}

impl AssembleConfig {
    /// Start from file-level defaults.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            merge_mode: config.assemble.merge_mode,
            matching: config.matching.clone(),
            output: config.output.clone(),
            app: config.app.clone(),
            ..Self::default()
        }
    }

    /// Strategy flags that are set, in declaration order.
    #[must_use]
    pub fn selected_strategies(&self) -> Vec<MergeStrategy> {
        [
            (self.flat_merge, MergeStrategy::Flat),
            (self.assembly_merge, MergeStrategy::Assembly),
            (self.hierarchical_merge, MergeStrategy::Hierarchical),
            (self.augment_merge, MergeStrategy::Augment),
        ]
        .into_iter()
        .filter_map(|(set, strategy)| set.then_some(strategy))
        .collect()
    }

    /// The selected strategy; hierarchical when no flag is set.
    #[must_use]
    pub fn strategy(&self) -> MergeStrategy {
        self.selected_strategies()
            .first()
            .copied()
            .unwrap_or_default()
    }

    /// Builder-style strategy selection.
    #[must_use]
    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.flat_merge = strategy == MergeStrategy::Flat;
        self.assembly_merge = strategy == MergeStrategy::Assembly;
        self.hierarchical_merge = strategy == MergeStrategy::Hierarchical;
        self.augment_merge = strategy == MergeStrategy::Augment;
        self
    }
}
