//! Secondary-to-primary reference mapping used by augment merges.

use std::collections::HashMap;

/// `secondary id -> primary id` for every element processed in one augment
/// step. Added elements map to their own (possibly renamed) id.
#[derive(Debug, Clone, Default)]
pub struct ProcessedRefs {
    refs: HashMap<String, String>,
}

impl ProcessedRefs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, secondary: impl Into<String>, primary: impl Into<String>) {
        self.refs.insert(secondary.into(), primary.into());
    }

    #[must_use]
    pub fn contains(&self, secondary: &str) -> bool {
        self.refs.contains_key(secondary)
    }

    /// The primary id for `reference`, or `reference` itself when it was not
    /// processed (document-level ids pass through untouched).
    #[must_use]
    pub fn resolve<'a>(&'a self, reference: &'a str) -> &'a str {
        self.refs.get(reference).map_or(reference, String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
