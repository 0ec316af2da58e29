//! Default values for sbom-assembler configuration.

use super::types::{AppIdentity, MatchingConfig};
use crate::matching::DEFAULT_MIN_CONFIDENCE;

/// Default match strategy name
pub const DEFAULT_MATCH_STRATEGY: &str = "composite";

/// Default purpose of the synthetic primary component
pub const DEFAULT_PRIMARY_PURPOSE: &str = "application";

/// Default version of the synthetic primary component
pub const DEFAULT_APP_VERSION: &str = "v0.0.1";

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: DEFAULT_APP_VERSION.to_string(),
            description: None,
            purl: None,
            cpe: None,
            authors: Vec::new(),
            supplier: None,
            license: None,
            checksums: Vec::new(),
            copyright: None,
            primary_purpose: DEFAULT_PRIMARY_PURPOSE.to_string(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_MATCH_STRATEGY.to_string(),
            strict_version: false,
            fuzzy_match: false,
            type_match: false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}
