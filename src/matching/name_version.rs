//! Name and version matching.

use super::traits::{CandidateScope, ComponentMatcher, MatchStrategy};
use crate::model::ComponentView;

/// Confidence lost when names only match as substrings
const FUZZY_PENALTY: u8 = 10;
/// Confidence gained when both types are known and equal
const TYPE_BONUS: u8 = 10;

/// Lowercase a name and collapse `_` and `.` to `-`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '.'], "-")
}

/// Lowercase a version and strip a leading `v`, `ver` or `version` marker.
///
/// The marker is only stripped when a digit follows it, so versions like
/// `very-old` are left alone.
#[must_use]
pub fn normalize_version(version: &str) -> String {
    let lower = version.trim().to_lowercase();
    for prefix in ["version", "ver", "v"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            let rest = rest.trim_start_matches([' ', '-', '_', '.', ':']);
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return rest.to_string();
            }
        }
    }
    lower
}

/// Matches components by normalized name and version.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameVersionMatcher {
    type_match: bool,
    fuzzy_match: bool,
}

impl NameVersionMatcher {
    #[must_use]
    pub const fn new(type_match: bool, fuzzy_match: bool) -> Self {
        Self {
            type_match,
            fuzzy_match,
        }
    }

    #[must_use]
    pub const fn fuzzy(&self) -> bool {
        self.fuzzy_match
    }

    /// `Some(exact)` when the names match, `None` otherwise.
    fn names_match(&self, a: &str, b: &str) -> Option<bool> {
        let (na, nb) = (normalize_name(a), normalize_name(b));
        if na.is_empty() || nb.is_empty() {
            return None;
        }
        if na == nb {
            return Some(true);
        }
        (self.fuzzy_match && (na.contains(&nb) || nb.contains(&na))).then_some(false)
    }

    /// Both versions absent, or equal after normalization.
    fn versions_match(a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(va), Some(vb)) => normalize_version(va) == normalize_version(vb),
            _ => false,
        }
    }

    /// `Some(equal)` when both types are known.
    fn types_known_equal(a: &dyn ComponentView, b: &dyn ComponentView) -> Option<bool> {
        match (a.component_type(), b.component_type()) {
            (Some(ta), Some(tb)) => Some(ta.eq_ignore_ascii_case(tb)),
            _ => None,
        }
    }
}

impl ComponentMatcher for NameVersionMatcher {
    fn is_match(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> bool {
        if self.type_match && Self::types_known_equal(a, b) == Some(false) {
            return false;
        }
        self.names_match(a.name(), b.name()).is_some()
            && Self::versions_match(a.version(), b.version())
    }

    fn confidence(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> u8 {
        if !self.is_match(a, b) {
            return 0;
        }
        let mut confidence = MatchStrategy::NameVersion.base_confidence();
        if self.names_match(a.name(), b.name()) == Some(false) {
            confidence -= FUZZY_PENALTY;
        }
        if self.type_match && Self::types_known_equal(a, b) == Some(true) {
            confidence += TYPE_BONUS;
        }
        confidence
    }

    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::NameVersion
    }

    fn candidate_scope(&self) -> CandidateScope {
        if self.fuzzy_match {
            CandidateScope::Version
        } else {
            CandidateScope::Name
        }
    }

    fn name(&self) -> &'static str {
        "NameVersionMatcher"
    }
}
