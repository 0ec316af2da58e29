//! Configuration validation for sbom-assembler.
//!
//! Provides validation traits and implementations for all configuration types.

use super::types::{AppConfig, AppIdentity, AssembleConfig, MatchingConfig, MergeStrategy, OutputConfig};
use crate::model::{Encoding, SbomSpec};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.output.validate());
        errors.extend(self.matching.validate());
        errors
    }
}

impl Validatable for MatchingConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.min_confidence > 100 {
            errors.push(ConfigError::new(
                "matching.min_confidence",
                format!(
                    "Minimum confidence must be between 0 and 100, got {}",
                    self.min_confidence
                ),
            ));
        }
        errors
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(spec) = self.spec {
            errors.extend(validate_output_for(self, spec));
        }

        if let Some(parent) = self.file.as_deref().and_then(std::path::Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                errors.push(ConfigError::new(
                    "output.file",
                    format!("Parent directory does not exist: {}", parent.display()),
                ));
            }
        }

        errors
    }
}

/// Check the output version and encoding against a concrete spec.
#[must_use]
pub fn validate_output_for(output: &OutputConfig, spec: SbomSpec) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if let Some(version) = output.spec_version.as_deref() {
        let supported = spec.supported_output_versions();
        if !supported.contains(&version) {
            errors.push(ConfigError::new(
                "output.spec_version",
                format!(
                    "Invalid {spec} version '{version}'. Valid options: {}",
                    supported.join(", ")
                ),
            ));
        }
    }

    if let Some(format) = output.format {
        let writable = Encoding::writable_for(spec);
        if !writable.contains(&format) {
            let names: Vec<String> = writable.iter().map(ToString::to_string).collect();
            errors.push(ConfigError::new(
                "output.format",
                format!(
                    "Invalid {spec} format '{format}'. Valid options: {}",
                    names.join(", ")
                ),
            ));
        }
    }

    errors
}

impl Validatable for AppIdentity {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ConfigError::new(
                "app.name",
                "A name for the assembled primary component is required",
            ));
        }
        for (i, checksum) in self.checksums.iter().enumerate() {
            if checksum.algorithm.trim().is_empty() {
                errors.push(ConfigError::new(
                    format!("app.checksums[{i}]"),
                    "Checksum algorithm must not be empty",
                ));
            }
        }
        errors
    }
}

impl Validatable for AssembleConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let selected = self.selected_strategies();
        if selected.len() > 1 {
            let names: Vec<String> = selected.iter().map(ToString::to_string).collect();
            errors.push(ConfigError::new(
                "strategy",
                format!(
                    "Only one merge strategy may be set, got: {}",
                    names.join(", ")
                ),
            ));
        }

        if self.strategy() == MergeStrategy::Augment {
            if self.primary_file.is_none() {
                errors.push(ConfigError::new(
                    "primary_file",
                    "Augment merge requires a primary file",
                ));
            }
            if self.inputs.is_empty() {
                errors.push(ConfigError::new(
                    "inputs",
                    "Augment merge requires at least one secondary input",
                ));
            }
        } else {
            if self.inputs.len() < 2 {
                errors.push(ConfigError::new(
                    "inputs",
                    format!(
                        "{} merge requires at least 2 inputs, got {}",
                        self.strategy(),
                        self.inputs.len()
                    ),
                ));
            }
            if self.primary_file.is_some() {
                errors.push(ConfigError::new(
                    "primary_file",
                    "A primary file is only used by augment merge",
                ));
            }
            errors.extend(self.app.validate());
        }

        errors.extend(self.output.validate());
        errors.extend(self.matching.validate());
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn two_inputs() -> AssembleConfig {
        let mut config = AssembleConfig {
            inputs: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
            ..AssembleConfig::default()
        };
        config.app.name = "app".to_string();
        config
    }

    #[test]
    fn test_default_strategy_is_valid() {
        assert!(two_inputs().is_valid());
    }

    #[test]
    fn test_two_strategies_rejected() {
        let mut config = two_inputs();
        config.flat_merge = true;
        config.assembly_merge = true;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "strategy");
        assert!(errors[0].message.contains("flat, assembly"));
    }

    #[test]
    fn test_single_input_rejected() {
        let mut config = two_inputs();
        config.inputs.pop();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "inputs"));
    }

    #[test]
    fn test_missing_app_name_rejected() {
        let mut config = two_inputs();
        config.app.name.clear();
        assert!(config.validate().iter().any(|e| e.field == "app.name"));
    }

    #[test]
    fn test_augment_rules() {
        let mut config = AssembleConfig {
            inputs: vec![PathBuf::from("s.json")],
            augment_merge: true,
            ..AssembleConfig::default()
        };
        assert!(config.validate().iter().any(|e| e.field == "primary_file"));

        config.primary_file = Some(PathBuf::from("p.json"));
        // app.name is not needed when augmenting
        assert!(config.is_valid());

        config.inputs.clear();
        assert!(config.validate().iter().any(|e| e.field == "inputs"));
    }

    #[test]
    fn test_primary_file_outside_augment() {
        let mut config = two_inputs();
        config.primary_file = Some(PathBuf::from("p.json"));
        assert!(config.validate().iter().any(|e| e.field == "primary_file"));
    }

    #[test]
    fn test_output_version_and_format() {
        let output = OutputConfig {
            spec: Some(SbomSpec::CycloneDx),
            spec_version: Some("2.3".to_string()),
            format: Some(Encoding::TagValue),
            file: None,
        };
        let errors = output.validate();
        assert_eq!(errors.len(), 2);

        let ok = OutputConfig {
            spec: Some(SbomSpec::Spdx),
            spec_version: Some("2.3".to_string()),
            format: Some(Encoding::TagValue),
            file: None,
        };
        assert!(ok.is_valid());
    }

    #[test]
    fn test_min_confidence_range() {
        let matching = MatchingConfig {
            min_confidence: 120,
            ..MatchingConfig::default()
        };
        assert_eq!(matching.validate().len(), 1);
    }
}
