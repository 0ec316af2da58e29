//! Inverted index over primary-document components.
//!
//! Buckets components by normalized purl, CPE, name and version so that
//! lookups only confirm plausible candidates with the matcher. Candidate
//! order is insertion order, which makes tie-breaking between equally
//! confident matches stable.

use super::cpe::{normalize_cpe, wildcard_cpe_version};
use super::name_version::{normalize_name, normalize_version};
use super::purl::{normalize_purl, strip_purl_version};
use super::traits::{CandidateScope, ComponentMatcher, MatchResult};
use crate::model::{ComponentFacts, ComponentView};
use std::collections::HashMap;

/// Index of components, each carried with a caller-chosen locator `L`.
#[derive(Debug, Clone)]
pub struct ComponentIndex<L> {
    entries: Vec<(ComponentFacts, L)>,
    by_purl: HashMap<String, Vec<usize>>,
    by_purl_base: HashMap<String, Vec<usize>>,
    by_cpe: HashMap<String, Vec<usize>>,
    by_cpe_base: HashMap<String, Vec<usize>>,
    by_name: HashMap<String, Vec<usize>>,
    by_version: HashMap<String, Vec<usize>>,
}

impl<L> Default for ComponentIndex<L> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_purl: HashMap::new(),
            by_purl_base: HashMap::new(),
            by_cpe: HashMap::new(),
            by_cpe_base: HashMap::new(),
            by_name: HashMap::new(),
            by_version: HashMap::new(),
        }
    }
}

fn push_key(map: &mut HashMap<String, Vec<usize>>, key: String, slot: usize) {
    if !key.is_empty() {
        map.entry(key).or_default().push(slot);
    }
}

impl<L: Clone> ComponentIndex<L> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(view, locator)` pairs in order.
    pub fn build<'a, V, I>(items: I) -> Self
    where
        V: ComponentView + 'a + ?Sized,
        I: IntoIterator<Item = (&'a V, L)>,
    {
        let mut index = Self::new();
        for (view, locator) in items {
            index.add_component(view, locator);
        }
        index
    }

    /// Append a component and update every applicable bucket.
    pub fn add_component(&mut self, view: &(impl ComponentView + ?Sized), locator: L) {
        let facts = ComponentFacts::of(view);
        let slot = self.entries.len();

        if let Some(purl) = facts.purl.as_deref() {
            let normalized = normalize_purl(purl);
            push_key(&mut self.by_purl_base, strip_purl_version(&normalized), slot);
            push_key(&mut self.by_purl, normalized, slot);
        }
        if let Some(cpe) = facts.cpe.as_deref() {
            let normalized = normalize_cpe(cpe);
            push_key(&mut self.by_cpe_base, wildcard_cpe_version(&normalized), slot);
            push_key(&mut self.by_cpe, normalized, slot);
        }
        push_key(&mut self.by_name, normalize_name(&facts.name), slot);
        if let Some(version) = facts.version.as_deref() {
            push_key(&mut self.by_version, normalize_version(version), slot);
        }

        self.entries.push((facts, locator));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots of components sharing the normalized version.
    #[must_use]
    pub fn by_version(&self, version: &str) -> &[usize] {
        self.by_version
            .get(&normalize_version(version))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn purl_candidates(&self, target: &dyn ComponentView, out: &mut Vec<usize>) {
        if let Some(purl) = target.purl() {
            let normalized = normalize_purl(purl);
            let base = strip_purl_version(&normalized);
            extend(out, self.by_purl.get(&normalized));
            extend(out, self.by_purl_base.get(&base));
        }
    }

    fn cpe_candidates(&self, target: &dyn ComponentView, out: &mut Vec<usize>) {
        if let Some(cpe) = target.cpe() {
            let normalized = normalize_cpe(cpe);
            let base = wildcard_cpe_version(&normalized);
            extend(out, self.by_cpe.get(&normalized));
            extend(out, self.by_cpe_base.get(&base));
        }
    }

    fn name_candidates(&self, target: &dyn ComponentView, out: &mut Vec<usize>) {
        extend(out, self.by_name.get(&normalize_name(target.name())));
    }

    /// Candidate slots for `target`, deduplicated and in insertion order.
    fn candidates(&self, target: &dyn ComponentView, scope: CandidateScope) -> Vec<usize> {
        let mut slots = Vec::new();
        match scope {
            CandidateScope::Purl => self.purl_candidates(target, &mut slots),
            CandidateScope::Cpe => self.cpe_candidates(target, &mut slots),
            CandidateScope::Name => self.name_candidates(target, &mut slots),
            CandidateScope::Version => match target.version() {
                Some(version) => slots.extend_from_slice(self.by_version(version)),
                None => slots.extend(0..self.entries.len()),
            },
            CandidateScope::Identity => {
                self.purl_candidates(target, &mut slots);
                self.cpe_candidates(target, &mut slots);
                self.name_candidates(target, &mut slots);
            }
            CandidateScope::All => slots.extend(0..self.entries.len()),
        }
        slots.sort_unstable();
        slots.dedup();
        slots
    }

    /// Every indexed component the matcher confirms, in insertion order.
    pub fn find_matches(
        &self,
        target: &dyn ComponentView,
        matcher: &dyn ComponentMatcher,
    ) -> Vec<MatchResult<L>> {
        self.candidates(target, matcher.candidate_scope())
            .into_iter()
            .filter_map(|slot| {
                let (facts, locator) = &self.entries[slot];
                let (strategy, _) = matcher.explain(facts, target)?;
                let confidence = matcher.confidence(facts, target);
                Some(MatchResult {
                    confidence,
                    strategy,
                    primary: locator.clone(),
                    secondary: ComponentFacts::of(target),
                })
            })
            .collect()
    }

    /// Highest-confidence match; ties go to the earliest inserted component.
    pub fn find_best_match(
        &self,
        target: &dyn ComponentView,
        matcher: &dyn ComponentMatcher,
    ) -> Option<MatchResult<L>> {
        let mut best: Option<MatchResult<L>> = None;
        for candidate in self.find_matches(target, matcher) {
            let better = best
                .as_ref()
                .map_or(true, |current| candidate.confidence > current.confidence);
            if better {
                best = Some(candidate);
            }
        }
        best
    }
}

fn extend(out: &mut Vec<usize>, slots: Option<&Vec<usize>>) {
    if let Some(slots) = slots {
        out.extend_from_slice(slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{
        CompositeMatcher, CpeMatcher, MatchStrategy, NameVersionMatcher, PurlMatcher,
    };
    use crate::model::cyclonedx::Component;

    fn sample() -> Vec<Component> {
        vec![
            Component::new("library", "commons-lang3")
                .with_version("3.12.0")
                .with_purl("pkg:maven/org.apache.commons/commons-lang3@3.12.0"),
            Component::new("library", "zlib").with_version("1.3"),
            Component::new("library", "zlib").with_version("1.3"),
            Component::new("library", ""),
        ]
    }

    fn index(components: &[Component]) -> ComponentIndex<usize> {
        ComponentIndex::build(components.iter().enumerate().map(|(i, c)| (c, i)))
    }

    #[test]
    fn test_empty_attributes_not_indexed() {
        let idx = index(&sample());
        assert_eq!(idx.len(), 4);
        assert!(!idx.by_name.contains_key(""));
        assert_eq!(idx.by_purl.len(), 1);
        assert_eq!(idx.by_version("1.3"), &[1, 2]);
    }

    #[test]
    fn test_purl_lookup_ignores_version() {
        let idx = index(&sample());
        let target = Component::new("library", "lang3")
            .with_purl("pkg:maven/org.apache.commons/commons-lang3@3.13.0");
        let found = idx
            .find_best_match(&target, &PurlMatcher::new(false))
            .unwrap();
        assert_eq!(found.primary, 0);
        assert_eq!(found.confidence, 100);
        assert_eq!(found.strategy, MatchStrategy::Purl);

        assert!(idx.find_best_match(&target, &PurlMatcher::new(true)).is_none());
    }

    #[test]
    fn test_tie_goes_to_first_inserted() {
        let idx = index(&sample());
        let target = Component::new("library", "ZLIB").with_version("v1.3");
        let matches = idx.find_matches(&target, &NameVersionMatcher::default());
        assert_eq!(matches.len(), 2);
        let best = idx
            .find_best_match(&target, &CompositeMatcher::default())
            .unwrap();
        assert_eq!(best.primary, 1);
        assert_eq!(best.strategy, MatchStrategy::NameVersion);
    }

    #[test]
    fn test_cpe_bucket() {
        let mut openssl = Component::new("library", "openssl").with_version("3.0.0");
        openssl.cpe = Some("cpe:2.3:a:openssl:openssl:3.0.0:*:*:*:*:*:*:*".to_string());
        let mut idx = ComponentIndex::new();
        idx.add_component(&openssl, "openssl-ref");

        let mut target = Component::new("library", "libssl");
        target.cpe = Some("cpe:/a:openssl:openssl:3.0.1".to_string());
        assert!(idx.find_best_match(&target, &CpeMatcher::new(false)).is_none());
        let found = idx.find_best_match(&target, &CpeMatcher::new(true)).unwrap();
        assert_eq!(found.primary, "openssl-ref");
        assert_eq!(found.confidence, 90);
    }

    #[test]
    fn test_fuzzy_scans_by_version() {
        let idx = index(&sample());
        let target = Component::new("library", "apache-commons-lang3").with_version("3.12.0");
        let found = idx
            .find_best_match(&target, &NameVersionMatcher::new(false, true))
            .unwrap();
        assert_eq!(found.primary, 0);
        assert_eq!(found.confidence, 60);
    }

    #[test]
    fn test_no_match_on_empty_index() {
        let idx: ComponentIndex<usize> = ComponentIndex::new();
        assert!(idx.is_empty());
        let target = Component::new("library", "x");
        assert!(idx.find_best_match(&target, &CompositeMatcher::default()).is_none());
    }
}
