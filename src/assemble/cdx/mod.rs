//! CycloneDX merge driver.
//!
//! Builds a new document around a synthetic primary component for the flat,
//! assembly and hierarchical strategies; [`augment`] merges into an existing
//! document instead.

mod augment;

pub use augment::augment;

use super::context::{MergeContext, MergeStats};
use super::ids::{IdKind, IdService};
use super::tools::{now_utc_rfc3339, ToolSet};
use crate::config::{AppIdentity, MergeStrategy};
use crate::model::cyclonedx::{
    Bom, Component, Dependency, Hash, LicenseChoice, Metadata, OrganizationalContact,
    OrganizationalEntity, Vulnerability,
};
use indexmap::IndexMap;
use uuid::Uuid;

/// License of the assembled SBOM data itself
pub const DATA_LICENSE: &str = "CC0-1.0";

/// Ordered dependency edges keyed by source, targets in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct EdgeSet {
    edges: IndexMap<String, Vec<String>>,
}

impl EdgeSet {
    /// Insert `source -> targets`; returns (new edges, self-loops skipped).
    fn insert(&mut self, source: &str, targets: &[String]) -> (usize, usize) {
        let entry = self.edges.entry(source.to_string()).or_default();
        let (mut added, mut loops) = (0, 0);
        for target in targets {
            if target == source {
                loops += 1;
            } else if !entry.contains(target) {
                entry.push(target.clone());
                added += 1;
            }
        }
        (added, loops)
    }

    /// Add `source -> targets`. New edges count as added; a target equal to
    /// its source is dropped.
    pub(crate) fn add(&mut self, source: &str, targets: &[String], stats: &mut MergeStats) {
        let (added, loops) = self.insert(source, targets);
        if loops > 0 {
            tracing::debug!(reference = %source, "dropping self-referencing dependency");
        }
        stats.added_edges += added;
        stats.dropped_edges += loops;
    }

    pub(crate) fn from_dependencies(dependencies: &[Dependency]) -> Self {
        let mut set = Self::default();
        for dep in dependencies {
            set.insert(&dep.dep_ref, &dep.depends_on);
        }
        set
    }

    pub(crate) fn into_dependencies(self) -> Vec<Dependency> {
        self.edges
            .into_iter()
            .map(|(source, targets)| Dependency::new(source, targets))
            .collect()
    }
}

/// A component subtree cloned under fresh ids.
struct ClonedTree {
    /// Output id of the root (the earlier component's id for a duplicate)
    root_id: Option<String>,
    /// The clone, absent when the root duplicates an earlier component
    root: Option<Component>,
    /// Non-duplicate descendants of a duplicate root, needing a new parent
    orphans: Vec<Component>,
}

/// Clone a component and its nested components under fresh ids.
///
/// Nested duplicates are removed from the tree; their non-duplicate
/// descendants move up to the nearest kept ancestor.
fn clone_tree(ids: &mut IdService, scope: &str, component: &Component) -> ClonedTree {
    let (mut clone, duplicate) = ids.store_and_clone_with_new_id(scope, component);
    let root_id = clone.bom_ref.clone();

    let mut kept = Vec::new();
    for child in std::mem::take(&mut clone.components) {
        let subtree = clone_tree(ids, scope, &child);
        kept.extend(subtree.root);
        kept.extend(subtree.orphans);
    }

    if duplicate {
        ClonedTree {
            root_id,
            root: None,
            orphans: kept,
        }
    } else {
        clone.components = kept;
        ClonedTree {
            root_id,
            root: Some(clone),
            orphans: Vec::new(),
        }
    }
}

fn find_in_mut<'a>(list: &'a mut [Component], bom_ref: &str) -> Option<&'a mut Component> {
    list.iter_mut().find_map(|c| c.find_mut(bom_ref))
}

/// The synthetic primary component described by the app identity.
#[must_use]
pub fn app_component(app: &AppIdentity) -> Component {
    let mut component = Component::new(app.primary_purpose.clone(), app.name.clone())
        .with_bom_ref(IdKind::Component.fresh());
    if !app.version.trim().is_empty() {
        component.version = Some(app.version.clone());
    }
    component.description.clone_from(&app.description);
    component.purl.clone_from(&app.purl);
    component.cpe.clone_from(&app.cpe);
    component.copyright.clone_from(&app.copyright);
    component.supplier = app.supplier.as_ref().map(|s| OrganizationalEntity {
        name: Some(s.name.clone()),
        url: s.url.iter().cloned().collect(),
        contact: Vec::new(),
    });
    if let Some(license) = app.license.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        let compound = license.contains(char::is_whitespace) || license.contains('(');
        component.licenses.push(if compound {
            LicenseChoice::expression(license)
        } else {
            LicenseChoice::id(license)
        });
    }
    component.hashes = app
        .checksums
        .iter()
        .filter(|c| !c.value.trim().is_empty())
        .map(|c| Hash {
            alg: c.algorithm.clone(),
            content: c.value.clone(),
        })
        .collect();
    component
}

fn app_metadata(app: &AppIdentity, component: Component, tools: ToolSet, spec_version: &str) -> Metadata {
    Metadata {
        timestamp: Some(now_utc_rfc3339()),
        tools: Some(tools.into_tools(spec_version)),
        authors: app
            .authors
            .iter()
            .map(|a| OrganizationalContact {
                name: Some(a.name.clone()),
                email: a.email.clone(),
                phone: None,
            })
            .collect(),
        supplier: component.supplier.clone(),
        component: Some(component),
        licenses: vec![LicenseChoice::id(DATA_LICENSE)],
        ..Metadata::default()
    }
}

/// Merge `inputs` into a new document under the configured app component.
pub fn merge(inputs: &[Bom], ctx: &mut MergeContext<'_>) -> Bom {
    let settings = ctx.settings;
    let mut ids = IdService::new();
    let mut app = app_component(&settings.app);
    let app_ref = app.bom_ref.clone().unwrap_or_default();

    // Input primaries first, so they keep their place when an input lists
    // another input's primary as a plain component.
    let mut primaries: Vec<Component> = Vec::new();
    let mut input_primary_refs: Vec<Option<String>> = Vec::with_capacity(inputs.len());
    let mut flat: Vec<(usize, Component)> = Vec::new();
    for (i, bom) in inputs.iter().enumerate() {
        let scope = i.to_string();
        match bom.primary_component() {
            Some(primary) => {
                let tree = clone_tree(&mut ids, &scope, primary);
                input_primary_refs.push(tree.root_id);
                primaries.extend(tree.root);
                flat.extend(tree.orphans.into_iter().map(|c| (i, c)));
            }
            None => {
                tracing::warn!(input = i + 1, "input has no primary component");
                input_primary_refs.push(None);
            }
        }
    }

    let mut services = Vec::new();
    let mut tools = ToolSet::new();
    tools.add_self();
    for (i, bom) in inputs.iter().enumerate() {
        let scope = i.to_string();
        for component in &bom.components {
            let tree = clone_tree(&mut ids, &scope, component);
            flat.extend(tree.root.into_iter().chain(tree.orphans).map(|c| (i, c)));
        }
        for service in &bom.services {
            let (clone, duplicate) = ids.store_and_clone_with_new_id(&scope, service);
            if !duplicate {
                services.push(clone);
            }
        }
        if let Some(input_tools) = bom.metadata.as_ref().and_then(|m| m.tools.as_ref()) {
            tools.add_tools(input_tools);
        }
    }
    ctx.stats.added += primaries.iter().chain(flat.iter().map(|(_, c)| c)).map(Component::tree_size).sum::<usize>();

    let mut edges = EdgeSet::default();
    for (i, bom) in inputs.iter().enumerate() {
        let scope = i.to_string();
        for dep in &bom.dependencies {
            let Some(source) = ids.resolve_dep_id(&scope, &dep.dep_ref) else {
                tracing::debug!(input = i + 1, reference = %dep.dep_ref, "dropping edge with dangling source");
                ctx.dangling(1);
                ctx.stats.dropped_edges += dep.depends_on.len();
                continue;
            };
            let (targets, dangling) = ids.resolve_dep_ids(&scope, &dep.depends_on);
            ctx.dangling(dangling);
            ctx.stats.dropped_edges += dangling;
            edges.add(source, &targets, &mut ctx.stats);
        }
    }

    let primary_refs: Vec<String> = {
        let mut refs: Vec<String> = Vec::new();
        for r in input_primary_refs.iter().flatten() {
            if !refs.contains(r) {
                refs.push(r.clone());
            }
        }
        refs
    };

    let components = match settings.strategy {
        MergeStrategy::Assembly => {
            app.components = primaries;
            flat.into_iter().map(|(_, c)| c).collect()
        }
        MergeStrategy::Hierarchical => {
            let mut top_level = Vec::new();
            for (origin, component) in flat {
                let parent = input_primary_refs[origin]
                    .as_deref()
                    .and_then(|r| find_in_mut(&mut primaries, r));
                match parent {
                    Some(parent) => parent.components.push(component),
                    None => top_level.push(component),
                }
            }
            edges.add(&app_ref, &primary_refs, &mut ctx.stats);
            primaries.extend(top_level);
            primaries
        }
        // Flat, and augment which never reaches this driver
        MergeStrategy::Flat | MergeStrategy::Augment => {
            edges.add(&app_ref, &primary_refs, &mut ctx.stats);
            primaries.extend(flat.into_iter().map(|(_, c)| c));
            primaries
        }
    };

    let vulnerabilities = merge_vulnerabilities(inputs, &mut ids, ctx);
    let spec_version = settings.output_spec_version.clone();

    Bom {
        spec_version: spec_version.clone(),
        serial_number: Some(format!("urn:uuid:{}", Uuid::new_v4())),
        version: Some(1),
        metadata: Some(app_metadata(&settings.app, app, tools, &spec_version)),
        components,
        services,
        dependencies: edges.into_dependencies(),
        vulnerabilities,
        ..Bom::default()
    }
}

/// Clone vulnerabilities deduplicated by `(id, source.name)`, with their
/// `affects` references rewritten into the output.
fn merge_vulnerabilities(
    inputs: &[Bom],
    ids: &mut IdService,
    ctx: &mut MergeContext<'_>,
) -> Vec<Vulnerability> {
    let mut merged = Vec::new();
    for (i, bom) in inputs.iter().enumerate() {
        let scope = i.to_string();
        for vulnerability in &bom.vulnerabilities {
            let (mut clone, duplicate) = ids.store_and_clone_with_new_id(&scope, vulnerability);
            if duplicate {
                continue;
            }
            let mut dangling = 0;
            clone.affects.retain_mut(|affect| match ids.resolve_dep_id(&scope, &affect.affect_ref) {
                Some(new_ref) => {
                    affect.affect_ref = new_ref.to_string();
                    true
                }
                None => {
                    dangling += 1;
                    false
                }
            });
            ctx.dangling(dangling);
            merged.push(clone);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::context::MergeSettings;
    use crate::config::ChecksumConfig;
    use crate::model::cyclonedx::{Affect, VulnerabilitySource};
    use crate::model::SbomSpec;

    fn input(primary: (&str, &str), component: (&str, &str)) -> Bom {
        let primary_ref = format!("{}-ref", primary.0);
        let component_ref = format!("{}-ref", component.0);
        Bom {
            spec_version: "1.5".to_string(),
            metadata: Some(Metadata {
                component: Some(
                    Component::new("application", primary.0)
                        .with_version(primary.1)
                        .with_bom_ref(primary_ref.clone()),
                ),
                ..Metadata::default()
            }),
            components: vec![Component::new("library", component.0)
                .with_version(component.1)
                .with_bom_ref(component_ref.clone())],
            dependencies: vec![Dependency::new(primary_ref, vec![component_ref])],
            ..Bom::default()
        }
    }

    fn settings(strategy: MergeStrategy) -> MergeSettings {
        let mut settings = MergeSettings::new(strategy, SbomSpec::CycloneDx);
        settings.app.name = "app".to_string();
        settings.app.version = "1.0".to_string();
        settings
    }

    fn names(components: &[Component]) -> Vec<&str> {
        components.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_assembly_nests_primaries_under_app() {
        let inputs = [input(("alpha", "1.0"), ("libx", "2.0")), input(("beta", "1.0"), ("liby", "3.0"))];
        let settings = settings(MergeStrategy::Assembly);
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&inputs, &mut ctx);

        let app = bom.primary_component().unwrap();
        assert_eq!(names(&app.components), vec!["alpha", "beta"]);
        assert_eq!(names(&bom.components), vec!["libx", "liby"]);
        // Input edges only, no synthetic edge from the app
        assert_eq!(bom.dependencies.len(), 2);
        assert!(bom.dependencies.iter().all(|d| Some(&d.dep_ref) != app.bom_ref.as_ref()));
    }

    #[test]
    fn test_hierarchical_nests_under_input_primary() {
        let inputs = [input(("alpha", "1.0"), ("libx", "2.0")), input(("beta", "1.0"), ("liby", "3.0"))];
        let settings = settings(MergeStrategy::Hierarchical);
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&inputs, &mut ctx);

        assert_eq!(names(&bom.components), vec!["alpha", "beta"]);
        assert_eq!(names(&bom.components[0].components), vec!["libx"]);
        assert_eq!(names(&bom.components[1].components), vec!["liby"]);

        let app_ref = bom.primary_component().unwrap().bom_ref.clone().unwrap();
        let app_dep = bom.dependencies.iter().find(|d| d.dep_ref == app_ref).unwrap();
        assert_eq!(app_dep.depends_on.len(), 2);
        assert_eq!(ctx.stats.added_edges, 4);
    }

    #[test]
    fn test_dependencies_are_rewritten() {
        let inputs = [input(("alpha", "1.0"), ("libx", "2.0")), input(("beta", "1.0"), ("liby", "3.0"))];
        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&inputs, &mut ctx);

        let alpha_ref = bom.components[0].bom_ref.clone().unwrap();
        let libx_ref = bom.components[2].bom_ref.clone().unwrap();
        assert_ne!(alpha_ref, "alpha-ref");
        let alpha_dep = bom.dependencies.iter().find(|d| d.dep_ref == alpha_ref).unwrap();
        assert_eq!(alpha_dep.depends_on, vec![libx_ref]);
        assert_eq!(ctx.stats.skipped, 0);
        assert_eq!(ctx.stats.added, 4);
    }

    #[test]
    fn test_self_loop_is_dropped_and_counted() {
        let mut looped = input(("alpha", "1.0"), ("libx", "2.0"));
        looped.dependencies[0].depends_on.push("alpha-ref".to_string());
        let inputs = [looped, input(("beta", "1.0"), ("liby", "3.0"))];
        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&inputs, &mut ctx);

        let alpha_ref = bom.components[0].bom_ref.clone().unwrap();
        let alpha_dep = bom.dependencies.iter().find(|d| d.dep_ref == alpha_ref).unwrap();
        assert!(!alpha_dep.depends_on.contains(&alpha_ref));
        assert_eq!(alpha_dep.depends_on.len(), 1);
        assert_eq!(ctx.stats.dropped_edges, 1);
        assert_eq!(ctx.stats.skipped, 0);
    }

    #[test]
    fn test_duplicates_fold_and_redirect() {
        let inputs = [input(("alpha", "1.0"), ("shared", "1.0")), input(("beta", "1.0"), ("SHARED", "1.0"))];
        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&inputs, &mut ctx);

        assert_eq!(names(&bom.components), vec!["alpha", "beta", "shared"]);
        let shared_ref = bom.components[2].bom_ref.clone().unwrap();
        let beta_ref = bom.components[1].bom_ref.clone().unwrap();
        let beta_dep = bom.dependencies.iter().find(|d| d.dep_ref == beta_ref).unwrap();
        assert_eq!(beta_dep.depends_on, vec![shared_ref]);
    }

    #[test]
    fn test_metadata_identity() {
        let inputs = [input(("alpha", "1.0"), ("libx", "2.0")), input(("beta", "1.0"), ("liby", "3.0"))];
        let mut settings = settings(MergeStrategy::Hierarchical);
        settings.app.license = Some("Apache-2.0 OR MIT".to_string());
        settings.app.checksums = vec![
            ChecksumConfig { algorithm: "SHA-256".to_string(), value: "abc".to_string() },
            ChecksumConfig { algorithm: "SHA-1".to_string(), value: String::new() },
        ];
        settings.output_spec_version = "1.4".to_string();
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&inputs, &mut ctx);

        assert_eq!(bom.spec_version, "1.4");
        assert!(bom.serial_number.as_deref().unwrap().starts_with("urn:uuid:"));
        let metadata = bom.metadata.as_ref().unwrap();
        assert!(matches!(metadata.tools, Some(crate::model::cyclonedx::Tools::Legacy(_))));
        assert_eq!(metadata.licenses[0], LicenseChoice::id(DATA_LICENSE));
        let app = metadata.component.as_ref().unwrap();
        assert_eq!(app.licenses[0].expression.as_deref(), Some("Apache-2.0 OR MIT"));
        assert_eq!(app.hashes.len(), 1);
    }

    #[test]
    fn test_vulnerabilities_dedup_and_rewrite() {
        let mut a = input(("alpha", "1.0"), ("libx", "2.0"));
        let mut b = input(("beta", "1.0"), ("liby", "3.0"));
        let vuln = |affects: &str| Vulnerability {
            id: Some("CVE-2024-0001".to_string()),
            source: Some(VulnerabilitySource {
                name: Some("NVD".to_string()),
                url: None,
            }),
            affects: vec![
                Affect { affect_ref: affects.to_string(), versions: vec![] },
                Affect { affect_ref: "ghost".to_string(), versions: vec![] },
            ],
            ..Vulnerability::default()
        };
        a.vulnerabilities.push(vuln("libx-ref"));
        b.vulnerabilities.push(vuln("liby-ref"));

        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&[a, b], &mut ctx);

        assert_eq!(bom.vulnerabilities.len(), 1);
        let libx_ref = bom.components[2].bom_ref.clone().unwrap();
        assert_eq!(bom.vulnerabilities[0].affects.len(), 1);
        assert_eq!(bom.vulnerabilities[0].affects[0].affect_ref, libx_ref);
        assert!(bom.vulnerabilities[0].bom_ref.as_deref().unwrap().starts_with("vulnerability:"));
        assert_eq!(ctx.stats.skipped, 1);
    }

    #[test]
    fn test_nested_components_get_fresh_ids() {
        let mut a = input(("alpha", "1.0"), ("libx", "2.0"));
        a.components[0]
            .components
            .push(Component::new("library", "inner").with_version("1").with_bom_ref("inner-ref"));
        a.dependencies.push(Dependency::new("libx-ref", vec!["inner-ref".to_string()]));
        let b = input(("beta", "1.0"), ("liby", "3.0"));

        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let bom = merge(&[a, b], &mut ctx);

        let libx = &bom.components[2];
        let inner_ref = libx.components[0].bom_ref.clone().unwrap();
        assert_ne!(inner_ref, "inner-ref");
        let libx_dep = bom
            .dependencies
            .iter()
            .find(|d| Some(&d.dep_ref) == libx.bom_ref.as_ref())
            .unwrap();
        assert_eq!(libx_dep.depends_on, vec![inner_ref]);
    }
}
