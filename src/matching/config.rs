//! Matcher configuration and construction.

use super::composite::{CompositeMatcher, DEFAULT_MIN_CONFIDENCE};
use super::cpe::CpeMatcher;
use super::name_version::NameVersionMatcher;
use super::purl::PurlMatcher;
use super::traits::{ComponentMatcher, MatchStrategy};
use crate::error::{AssembleError, Result};

/// Resolved matcher settings for one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    pub strategy: MatchStrategy,
    /// Compare purl versions (purl) and CPE versions (CPE) exactly
    pub strict_version: bool,
    /// Accept substring name matches at reduced confidence
    pub fuzzy_match: bool,
    /// Reject name matches whose known types differ
    pub type_match: bool,
    /// Composite threshold, 0..=100
    pub min_confidence: u8,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Composite,
            strict_version: false,
            fuzzy_match: false,
            type_match: false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl MatcherConfig {
    /// Resolve user-facing settings, rejecting unknown strategy names.
    pub fn from_settings(
        strategy: &str,
        strict_version: bool,
        fuzzy_match: bool,
        type_match: bool,
        min_confidence: u8,
    ) -> Result<Self> {
        let strategy = strategy
            .parse::<MatchStrategy>()
            .map_err(AssembleError::matcher_config)?;
        if min_confidence > 100 {
            return Err(AssembleError::matcher_config(format!(
                "minimum confidence {min_confidence} is above 100"
            )));
        }
        Ok(Self {
            strategy,
            strict_version,
            fuzzy_match,
            type_match,
            min_confidence,
        })
    }
}

/// Build the matcher described by `config`.
#[must_use]
pub fn build_matcher(config: &MatcherConfig) -> Box<dyn ComponentMatcher> {
    let purl = PurlMatcher::new(config.strict_version);
    let cpe = CpeMatcher::new(!config.strict_version);
    let name_version = NameVersionMatcher::new(config.type_match, config.fuzzy_match);
    match config.strategy {
        MatchStrategy::Purl => Box::new(purl),
        MatchStrategy::Cpe => Box::new(cpe),
        MatchStrategy::NameVersion => Box::new(name_version),
        MatchStrategy::Composite => Box::new(CompositeMatcher::new(
            purl,
            cpe,
            name_version,
            config.min_confidence,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_strategy_is_matcher_config_error() {
        let err = MatcherConfig::from_settings("levenshtein", false, false, false, 50).unwrap_err();
        assert!(matches!(err, AssembleError::MatcherConfig(_)));
        assert!(err.to_string().contains("levenshtein"));
    }

    #[test]
    fn test_confidence_out_of_range() {
        let err = MatcherConfig::from_settings("composite", false, false, false, 101).unwrap_err();
        assert!(matches!(err, AssembleError::MatcherConfig(_)));
    }

    #[test]
    fn test_build_each_strategy() {
        for name in MatchStrategy::NAMES {
            let config = MatcherConfig::from_settings(name, false, false, false, 50).unwrap();
            let matcher = build_matcher(&config);
            assert_eq!(matcher.strategy(), config.strategy);
        }
    }

    #[test]
    fn test_defaults() {
        let config = MatcherConfig::default();
        assert_eq!(config.strategy, MatchStrategy::Composite);
        assert!(!config.strict_version);
        assert_eq!(config.min_confidence, 50);
    }
}
