//! Package URL matching.

use super::traits::{ComponentMatcher, MatchStrategy};
use crate::model::ComponentView;

/// Normalize a purl for comparison: trimmed, lowercased, trailing slashes
/// removed. A `pkg:` prefix is kept as written.
#[must_use]
pub fn normalize_purl(purl: &str) -> String {
    purl.trim().to_lowercase().trim_end_matches('/').to_string()
}

/// Remove the `@version` segment that follows the last path separator,
/// keeping qualifiers (`?...`) and subpath (`#...`).
#[must_use]
pub fn strip_purl_version(purl: &str) -> String {
    let split = purl.find(['?', '#']).unwrap_or(purl.len());
    let (main, rest) = purl.split_at(split);
    let name_start = main.rfind('/').map_or(0, |i| i + 1);
    match main[name_start..].find('@') {
        Some(at) => format!("{}{rest}", &main[..name_start + at]),
        None => purl.to_string(),
    }
}

/// Matches components whose package URLs are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurlMatcher {
    strict_version: bool,
}

impl PurlMatcher {
    /// With `strict_version` off, versions are ignored.
    #[must_use]
    pub const fn new(strict_version: bool) -> Self {
        Self { strict_version }
    }

    fn comparable(&self, purl: &str) -> String {
        let normalized = normalize_purl(purl);
        if self.strict_version {
            normalized
        } else {
            strip_purl_version(&normalized)
        }
    }
}

impl ComponentMatcher for PurlMatcher {
    fn is_match(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> bool {
        match (a.purl(), b.purl()) {
            (Some(pa), Some(pb)) => {
                let (pa, pb) = (self.comparable(pa), self.comparable(pb));
                !pa.is_empty() && pa == pb
            }
            _ => false,
        }
    }

    fn confidence(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> u8 {
        if self.is_match(a, b) {
            MatchStrategy::Purl.base_confidence()
        } else {
            0
        }
    }

    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Purl
    }

    fn name(&self) -> &'static str {
        "PurlMatcher"
    }
}
