//! Identifier service.
//!
//! Every element copied from an input gets a fresh id in the output; the
//! service remembers `input id -> output id` per input scope so that
//! dependency edges and relationships can be rewritten afterwards.

use crate::model::cyclonedx::{Component, Service, Vulnerability};
use crate::model::spdx::{File, Package, Snippet};
use indexmap::IndexMap;
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of element an id is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Component,
    Service,
    Vulnerability,
    Package,
    File,
    Snippet,
}

impl IdKind {
    /// A new random id for this kind.
    #[must_use]
    pub fn fresh(self) -> String {
        let token = Uuid::new_v4().simple();
        match self {
            Self::Component => format!("component:{token}"),
            Self::Service => format!("service:{token}"),
            Self::Vulnerability => format!("vulnerability:{token}"),
            Self::Package => format!("SPDXRef-Package-{token}"),
            Self::File => format!("SPDXRef-File-{token}"),
            Self::Snippet => format!("SPDXRef-Snippet-{token}"),
        }
    }
}

/// Elements the id service can re-identify.
pub trait Identified: Clone {
    const KIND: IdKind;

    fn element_id(&self) -> Option<&str>;

    fn set_element_id(&mut self, id: String);

    /// Case-insensitive identity used to collapse duplicates across inputs.
    /// `None` means the element is never deduplicated.
    fn canonical_key(&self) -> Option<String>;
}

fn key_of(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

impl Identified for Component {
    const KIND: IdKind = IdKind::Component;

    fn element_id(&self) -> Option<&str> {
        self.bom_ref.as_deref()
    }

    fn set_element_id(&mut self, id: String) {
        self.bom_ref = Some(id);
    }

    fn canonical_key(&self) -> Option<String> {
        Some(key_of(&[
            self.component_type.as_str(),
            self.name.as_str(),
            self.version.as_deref().unwrap_or_default(),
        ]))
    }
}

impl Identified for Service {
    const KIND: IdKind = IdKind::Service;

    fn element_id(&self) -> Option<&str> {
        self.bom_ref.as_deref()
    }

    fn set_element_id(&mut self, id: String) {
        self.bom_ref = Some(id);
    }

    fn canonical_key(&self) -> Option<String> {
        Some(key_of(&[
            "service",
            self.name.as_str(),
            self.version.as_deref().unwrap_or_default(),
        ]))
    }
}

impl Identified for Vulnerability {
    const KIND: IdKind = IdKind::Vulnerability;

    fn element_id(&self) -> Option<&str> {
        self.bom_ref.as_deref()
    }

    fn set_element_id(&mut self, id: String) {
        self.bom_ref = Some(id);
    }

    fn canonical_key(&self) -> Option<String> {
        let id = self.id.as_deref()?;
        let source = self
            .source
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or_default();
        Some(key_of(&[id, source]))
    }
}

impl Identified for Package {
    const KIND: IdKind = IdKind::Package;

    fn element_id(&self) -> Option<&str> {
        Some(self.spdx_id.as_str()).filter(|id| !id.is_empty())
    }

    fn set_element_id(&mut self, id: String) {
        self.spdx_id = id;
    }

    fn canonical_key(&self) -> Option<String> {
        Some(key_of(&[
            self.primary_package_purpose.as_deref().unwrap_or_default(),
            self.name.as_str(),
            self.version_info.as_deref().unwrap_or_default(),
        ]))
    }
}

impl Identified for File {
    const KIND: IdKind = IdKind::File;

    fn element_id(&self) -> Option<&str> {
        Some(self.spdx_id.as_str()).filter(|id| !id.is_empty())
    }

    fn set_element_id(&mut self, id: String) {
        self.spdx_id = id;
    }

    fn canonical_key(&self) -> Option<String> {
        None
    }
}

impl Identified for Snippet {
    const KIND: IdKind = IdKind::Snippet;

    fn element_id(&self) -> Option<&str> {
        Some(self.spdx_id.as_str()).filter(|id| !id.is_empty())
    }

    fn set_element_id(&mut self, id: String) {
        self.spdx_id = id;
    }

    fn canonical_key(&self) -> Option<String> {
        None
    }
}

/// Maps input element ids to output ids for one merge.
///
/// Ids are looked up by `(scope, id)`; the scope distinguishes inputs whose
/// ids may collide (an input index for CycloneDX, the document namespace for
/// SPDX).
#[derive(Debug, Default)]
pub struct IdService {
    canonical: HashMap<(IdKind, String), String>,
    id_map: IndexMap<String, String>,
}

fn scoped(scope: &str, id: &str) -> String {
    format!("{scope}:{id}")
}

impl IdService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone `item` under a fresh id and record the mapping.
    ///
    /// When an element with the same canonical key was stored before, the
    /// clone carries that element's id instead, the mapping points at it, and
    /// the second value is `true`.
    pub fn store_and_clone_with_new_id<T: Identified>(&mut self, scope: &str, item: &T) -> (T, bool) {
        let mut clone = item.clone();
        if let Some(key) = item.canonical_key() {
            if let Some(prior) = self.canonical.get(&(T::KIND, key.clone())) {
                let prior = prior.clone();
                if let Some(old) = item.element_id() {
                    self.record(scope, old, &prior);
                }
                clone.set_element_id(prior);
                return (clone, true);
            }
            let new_id = self.assign_fresh_id(scope, &mut clone);
            self.canonical.insert((T::KIND, key), new_id);
            return (clone, false);
        }
        self.assign_fresh_id(scope, &mut clone);
        (clone, false)
    }

    /// Give `item` a fresh id, recording `old -> new` when it had one.
    pub fn assign_fresh_id<T: Identified>(&mut self, scope: &str, item: &mut T) -> String {
        let new_id = T::KIND.fresh();
        if let Some(old) = item.element_id().map(str::to_string) {
            self.record(scope, &old, &new_id);
        }
        item.set_element_id(new_id.clone());
        new_id
    }

    /// Record a mapping; the first mapping of an id wins.
    pub fn record(&mut self, scope: &str, old: &str, new: &str) {
        self.id_map
            .entry(scoped(scope, old))
            .or_insert_with(|| new.to_string());
    }

    /// Output id for an input id, if one was recorded.
    #[must_use]
    pub fn resolve_dep_id(&self, scope: &str, old: &str) -> Option<&str> {
        self.id_map.get(&scoped(scope, old)).map(String::as_str)
    }

    /// Output ids for `olds` in order, without unresolvable ids or repeats,
    /// together with the number of ids that could not be resolved.
    #[must_use]
    pub fn resolve_dep_ids(&self, scope: &str, olds: &[String]) -> (Vec<String>, usize) {
        let mut resolved: Vec<String> = Vec::with_capacity(olds.len());
        let mut dangling = 0;
        for old in olds {
            match self.resolve_dep_id(scope, old) {
                Some(new) => {
                    if !resolved.iter().any(|r| r == new) {
                        resolved.push(new.to_string());
                    }
                }
                None => {
                    tracing::debug!(scope, reference = %old, "dropping dangling reference");
                    dangling += 1;
                }
            }
        }
        (resolved, dangling)
    }

    /// Number of recorded mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique_and_tagged() {
        let a = IdKind::Component.fresh();
        let b = IdKind::Component.fresh();
        assert_ne!(a, b);
        assert!(a.starts_with("component:"));
        assert_eq!(a.len(), "component:".len() + 32);
        assert!(IdKind::Package.fresh().starts_with("SPDXRef-Package-"));
    }

    #[test]
    fn test_store_and_clone_records_mapping() {
        let mut ids = IdService::new();
        let comp = Component::new("library", "libx")
            .with_version("2.0")
            .with_bom_ref("libx-ref");
        let (clone, duplicate) = ids.store_and_clone_with_new_id("0", &comp);

        assert!(!duplicate);
        assert_ne!(clone.bom_ref, comp.bom_ref);
        assert_eq!(ids.resolve_dep_id("0", "libx-ref"), clone.bom_ref.as_deref());
        assert_eq!(ids.resolve_dep_id("1", "libx-ref"), None);
    }

    #[test]
    fn test_duplicates_collapse_case_insensitively() {
        let mut ids = IdService::new();
        let first = Component::new("library", "LibX").with_version("2.0").with_bom_ref("a");
        let second = Component::new("Library", "libx").with_version("2.0").with_bom_ref("b");
        let (c1, d1) = ids.store_and_clone_with_new_id("0", &first);
        let (c2, d2) = ids.store_and_clone_with_new_id("1", &second);

        assert!(!d1);
        assert!(d2);
        assert_eq!(c1.bom_ref, c2.bom_ref);
        assert_eq!(ids.resolve_dep_id("1", "b"), c1.bom_ref.as_deref());
    }

    #[test]
    fn test_resolve_dep_ids_drops_dangling() {
        let mut ids = IdService::new();
        ids.record("0", "a", "A");
        ids.record("0", "b", "A");
        let (resolved, dangling) = ids.resolve_dep_ids(
            "0",
            &["a".to_string(), "missing".to_string(), "b".to_string()],
        );
        assert_eq!(resolved, vec!["A".to_string()]);
        assert_eq!(dangling, 1);
    }

    #[test]
    fn test_files_never_deduplicate() {
        let mut ids = IdService::new();
        let file = File {
            spdx_id: "SPDXRef-File-1".to_string(),
            file_name: "./a.c".to_string(),
            ..File::default()
        };
        let (f1, d1) = ids.store_and_clone_with_new_id("ns1", &file);
        let (f2, d2) = ids.store_and_clone_with_new_id("ns2", &file);
        assert!(!d1 && !d2);
        assert_ne!(f1.spdx_id, f2.spdx_id);
    }
}
