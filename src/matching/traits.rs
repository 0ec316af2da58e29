//! Trait definitions for component matching strategies.
//!
//! Matchers operate on the format-independent [`ComponentView`] so the same
//! strategy stack serves CycloneDX components and SPDX packages.

use crate::model::{ComponentFacts, ComponentView};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Matching strategy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    Purl,
    Cpe,
    NameVersion,
    Composite,
}

impl MatchStrategy {
    /// Every strategy name accepted by [`FromStr`].
    pub const NAMES: &'static [&'static str] = &["composite", "purl", "cpe", "name-version"];

    /// Base confidence of the strategy when it matches.
    #[must_use]
    pub const fn base_confidence(self) -> u8 {
        match self {
            Self::Purl | Self::Composite => 100,
            Self::Cpe => 90,
            Self::NameVersion => 70,
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Purl => "purl",
            Self::Cpe => "cpe",
            Self::NameVersion => "name-version",
            Self::Composite => "composite",
        };
        f.write_str(name)
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "purl" => Ok(Self::Purl),
            "cpe" => Ok(Self::Cpe),
            "name-version" | "name_version" | "nameversion" => Ok(Self::NameVersion),
            "composite" | "" => Ok(Self::Composite),
            other => Err(format!(
                "unknown match strategy '{other}' (expected one of: {})",
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Which index buckets hold plausible candidates for a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateScope {
    /// Same normalized purl, plus version-insensitive neighbors
    Purl,
    /// Same normalized CPE, plus version-insensitive neighbors
    Cpe,
    /// Same normalized name
    Name,
    /// Same normalized version (fuzzy name matching)
    Version,
    /// Union of the purl, CPE and name buckets
    Identity,
    /// Every indexed component
    All,
}

/// Result of matching an indexed component against a target.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<L> {
    /// Confidence 0..=100
    pub confidence: u8,
    /// Strategy that decided the match
    pub strategy: MatchStrategy,
    /// Locator of the indexed (primary-document) component
    pub primary: L,
    /// Identity of the component that was looked up
    pub secondary: ComponentFacts,
}

/// Trait for component matching strategies.
///
/// Implementors decide whether two components represent the same logical
/// package and how confident that decision is.
///
/// # Example
///
/// ```ignore
/// use sbom_assembler::matching::{ComponentMatcher, PurlMatcher};
///
/// let matcher = PurlMatcher::new(false);
/// assert!(matcher.is_match(&lib_a, &lib_b));
/// ```
pub trait ComponentMatcher: Send + Sync {
    /// Whether `a` and `b` are the same component.
    fn is_match(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> bool;

    /// Confidence 0..=100; 0 when the components do not match.
    fn confidence(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> u8;

    /// Strategy tag of this matcher.
    fn strategy(&self) -> MatchStrategy;

    /// Strategy that decided a match, with its confidence.
    fn explain(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> Option<(MatchStrategy, u8)> {
        self.is_match(a, b)
            .then(|| (self.strategy(), self.confidence(a, b)))
    }

    /// Index buckets worth scanning for this matcher.
    fn candidate_scope(&self) -> CandidateScope {
        match self.strategy() {
            MatchStrategy::Purl => CandidateScope::Purl,
            MatchStrategy::Cpe => CandidateScope::Cpe,
            MatchStrategy::NameVersion => CandidateScope::Name,
            MatchStrategy::Composite => CandidateScope::Identity,
        }
    }

    /// Get the name of this matcher for logging/debugging.
    fn name(&self) -> &'static str {
        "ComponentMatcher"
    }
}
