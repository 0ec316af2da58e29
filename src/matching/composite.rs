//! Composite matcher: purl, then CPE, then name and version.

use super::cpe::CpeMatcher;
use super::name_version::NameVersionMatcher;
use super::purl::PurlMatcher;
use super::traits::{CandidateScope, ComponentMatcher, MatchStrategy};
use crate::model::ComponentView;

/// Default minimum confidence for a composite match
pub const DEFAULT_MIN_CONFIDENCE: u8 = 50;

/// Tries each identity strategy in priority order.
///
/// A match is reported by the first strategy whose confidence reaches
/// `min_confidence`; [`ComponentMatcher::confidence`] reports the best
/// confidence among all strategies that reach it.
#[derive(Debug, Clone, Copy)]
pub struct CompositeMatcher {
    purl: PurlMatcher,
    cpe: CpeMatcher,
    name_version: NameVersionMatcher,
    min_confidence: u8,
}

impl Default for CompositeMatcher {
    fn default() -> Self {
        Self::new(
            PurlMatcher::default(),
            CpeMatcher::default(),
            NameVersionMatcher::default(),
            DEFAULT_MIN_CONFIDENCE,
        )
    }
}

impl CompositeMatcher {
    #[must_use]
    pub const fn new(
        purl: PurlMatcher,
        cpe: CpeMatcher,
        name_version: NameVersionMatcher,
        min_confidence: u8,
    ) -> Self {
        Self {
            purl,
            cpe,
            name_version,
            min_confidence,
        }
    }

    fn strategies(&self) -> [&dyn ComponentMatcher; 3] {
        [&self.purl, &self.cpe, &self.name_version]
    }

    /// Strategy that would decide a match between `a` and `b`, if any.
    pub fn matching_strategy_used(
        &self,
        a: &dyn ComponentView,
        b: &dyn ComponentView,
    ) -> Option<MatchStrategy> {
        self.explain(a, b).map(|(strategy, _)| strategy)
    }
}

impl ComponentMatcher for CompositeMatcher {
    fn is_match(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> bool {
        self.explain(a, b).is_some()
    }

    fn confidence(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> u8 {
        self.strategies()
            .iter()
            .map(|m| m.confidence(a, b))
            .filter(|c| *c >= self.min_confidence && *c > 0)
            .max()
            .unwrap_or(0)
    }

    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Composite
    }

    fn explain(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> Option<(MatchStrategy, u8)> {
        self.strategies().iter().find_map(|m| {
            let confidence = m.confidence(a, b);
            (confidence > 0 && confidence >= self.min_confidence)
                .then(|| (m.strategy(), confidence))
        })
    }

    fn candidate_scope(&self) -> CandidateScope {
        if self.name_version.fuzzy() {
            CandidateScope::All
        } else {
            CandidateScope::Identity
        }
    }

    fn name(&self) -> &'static str {
        "CompositeMatcher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cyclonedx::Component;
    use crate::model::spdx::{ExternalRef, Package};

    #[test]
    fn test_purl_wins_over_name() {
        let a = Component::new("library", "lodash")
            .with_version("4.17.21")
            .with_purl("pkg:npm/lodash@4.17.21");
        let b = a.clone();
        let matcher = CompositeMatcher::default();
        assert_eq!(matcher.explain(&a, &b), Some((MatchStrategy::Purl, 100)));
        assert_eq!(matcher.confidence(&a, &b), 100);
    }

    #[test]
    fn test_cpe_match_across_formats() {
        let mut a = Component::new("library", "openssl-libs").with_version("3.0.7");
        a.cpe = Some("cpe:/a:openssl:openssl:3.0.7".to_string());
        let mut b = Package::new("SPDXRef-p", "openssl").with_version("3.0.7");
        b.external_refs.push(ExternalRef::cpe23(
            "cpe:2.3:a:openssl:openssl:3.0.7:*:*:*:*:*:*:*",
        ));

        let matcher = CompositeMatcher::default();
        assert_eq!(matcher.matching_strategy_used(&a, &b), Some(MatchStrategy::Cpe));
        assert_eq!(matcher.confidence(&a, &b), 90);
    }

    #[test]
    fn test_falls_back_to_name_version() {
        let a = Component::new("library", "zlib").with_version("1.3");
        let b = Package::new("SPDXRef-z", "zlib").with_version("1.3");
        let matcher = CompositeMatcher::default();
        assert_eq!(matcher.explain(&a, &b), Some((MatchStrategy::NameVersion, 70)));
    }

    #[test]
    fn test_threshold_filters_weak_strategies() {
        let a = Component::new("library", "zlib").with_version("1.3");
        let b = a.clone();
        let strict = CompositeMatcher::new(
            PurlMatcher::default(),
            CpeMatcher::default(),
            NameVersionMatcher::default(),
            80,
        );
        assert!(!strict.is_match(&a, &b));
        assert_eq!(strict.confidence(&a, &b), 0);
    }

    #[test]
    fn test_confidence_is_best_of_matching_strategies() {
        // Purl differs only in version, so the version-strict purl matcher fails
        // while name-version (versions absent on both) matches.
        let a = Component::new("library", "x").with_purl("pkg:npm/x@1");
        let b = Component::new("library", "x").with_purl("pkg:npm/x@2");
        let matcher = CompositeMatcher::new(
            PurlMatcher::new(true),
            CpeMatcher::default(),
            NameVersionMatcher::default(),
            DEFAULT_MIN_CONFIDENCE,
        );
        assert_eq!(matcher.explain(&a, &b), Some((MatchStrategy::NameVersion, 70)));
    }
}
