//! CycloneDX augment merge: secondaries are folded into an authoritative
//! primary document.

use super::EdgeSet;
use crate::assemble::context::MergeContext;
use crate::assemble::fields::merge_field;
use crate::assemble::ids::IdKind;
use crate::assemble::refs::ProcessedRefs;
use crate::assemble::tools::{now_utc_rfc3339, ToolSet};
use crate::config::MergeMode;
use crate::matching::{ComponentIndex, ComponentMatcher};
use crate::model::cyclonedx::{Bom, Component, Metadata, Service, Vulnerability};
use std::collections::HashSet;

/// Merge every secondary into `primary`, in order, then stamp the metadata.
pub fn augment(
    primary: &mut Bom,
    secondaries: &[Bom],
    matcher: &dyn ComponentMatcher,
    ctx: &mut MergeContext<'_>,
) {
    assign_missing_refs(primary);
    for (i, secondary) in secondaries.iter().enumerate() {
        let _guard = tracing::debug_span!("secondary", index = i + 1).entered();
        augment_one(primary, secondary, matcher, ctx);
    }
    finish_metadata(primary, &ctx.settings.output_spec_version);
}

fn assign_missing_refs(bom: &mut Bom) {
    fn walk(component: &mut Component) {
        if component.bom_ref.as_deref().map_or(true, |r| r.trim().is_empty()) {
            component.bom_ref = Some(IdKind::Component.fresh());
        }
        component.components.iter_mut().for_each(walk);
    }
    if let Some(component) = bom.metadata.as_mut().and_then(|m| m.component.as_mut()) {
        walk(component);
    }
    bom.components.iter_mut().for_each(walk);
    for service in &mut bom.services {
        if service.bom_ref.as_deref().map_or(true, |r| r.trim().is_empty()) {
            service.bom_ref = Some(IdKind::Service.fresh());
        }
    }
}

fn find_component_mut<'a>(bom: &'a mut Bom, bom_ref: &str) -> Option<&'a mut Component> {
    bom.metadata
        .as_mut()
        .and_then(|m| m.component.as_mut())
        .into_iter()
        .chain(bom.components.iter_mut())
        .find_map(|c| c.find_mut(bom_ref))
}

fn index_tree(index: &mut ComponentIndex<String>, component: &Component) {
    if let Some(r) = component.bom_ref.as_deref() {
        index.add_component(component, r.to_string());
    }
    for child in &component.components {
        index_tree(index, child);
    }
}

/// Per-secondary state of one augment step.
struct AugmentState<'a, 'b> {
    primary: &'a mut Bom,
    index: ComponentIndex<String>,
    known: HashSet<String>,
    refs: ProcessedRefs,
    matcher: &'a dyn ComponentMatcher,
    ctx: &'a mut MergeContext<'b>,
}

impl AugmentState<'_, '_> {
    fn mode(&self) -> MergeMode {
        self.ctx.settings.merge_mode
    }

    /// A free id for an element added from the secondary: its own unless
    /// already taken in the primary.
    fn claim_id(&mut self, kind: IdKind, wanted: Option<&str>) -> String {
        let id = match wanted.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) if !self.known.contains(r) => r.to_string(),
            _ => kind.fresh(),
        };
        self.known.insert(id.clone());
        id
    }

    fn merge_component(&mut self, component: &Component, parent: Option<&str>) {
        let target_ref = match self.index.find_best_match(component, self.matcher) {
            Some(found) => {
                tracing::debug!(
                    name = %component.name,
                    strategy = %found.strategy,
                    confidence = found.confidence,
                    "matched component"
                );
                let mode = self.mode();
                if let Some(target) = find_component_mut(self.primary, &found.primary) {
                    merge_component_fields(target, component, mode);
                }
                self.ctx.stats.matched += 1;
                found.primary
            }
            None => {
                let mut clone = component.clone();
                clone.components.clear();
                let id = self.claim_id(IdKind::Component, component.bom_ref.as_deref());
                clone.bom_ref = Some(id.clone());
                self.index.add_component(&clone, id.clone());
                match parent.and_then(|p| find_component_mut(self.primary, p)) {
                    Some(parent) => parent.components.push(clone),
                    None => self.primary.components.push(clone),
                }
                self.ctx.stats.added += 1;
                id
            }
        };
        if let Some(old) = component.bom_ref.as_deref() {
            self.refs.insert(old, target_ref.clone());
        }
        for child in &component.components {
            self.merge_component(child, Some(&target_ref));
        }
    }

    fn merge_service(&mut self, service: &Service) {
        let key = service_key(service);
        let existing = self
            .primary
            .services
            .iter()
            .position(|s| service_key(s) == key);
        let target_ref = match existing {
            Some(pos) => {
                let mode = self.mode();
                let target = &mut self.primary.services[pos];
                merge_field(&mut target.provider, &service.provider, mode);
                merge_field(&mut target.group, &service.group, mode);
                merge_field(&mut target.description, &service.description, mode);
                merge_field(&mut target.endpoints, &service.endpoints, mode);
                target.bom_ref.clone().unwrap_or_default()
            }
            None => {
                let mut clone = service.clone();
                let id = self.claim_id(IdKind::Service, service.bom_ref.as_deref());
                clone.bom_ref = Some(id.clone());
                self.primary.services.push(clone);
                id
            }
        };
        if let Some(old) = service.bom_ref.as_deref() {
            self.refs.insert(old, target_ref);
        }
    }

    /// Copy the secondary edges touching a processed element, rewritten into
    /// the primary's ids.
    fn copy_dependencies(&mut self, secondary: &Bom) {
        let mut edges = EdgeSet::from_dependencies(&self.primary.dependencies);
        for dep in &secondary.dependencies {
            let relevant = self.refs.contains(&dep.dep_ref)
                || dep.depends_on.iter().any(|t| self.refs.contains(t));
            if !relevant {
                continue;
            }
            let source = self.refs.resolve(&dep.dep_ref);
            if !self.known.contains(source) {
                tracing::debug!(reference = %dep.dep_ref, "dropping edge with dangling source");
                self.ctx.dangling(1);
                self.ctx.stats.dropped_edges += dep.depends_on.len();
                continue;
            }
            let mut targets = Vec::with_capacity(dep.depends_on.len());
            for target in &dep.depends_on {
                let resolved = self.refs.resolve(target);
                if self.known.contains(resolved) {
                    targets.push(resolved.to_string());
                } else {
                    tracing::debug!(reference = %target, "dropping dangling dependency target");
                    self.ctx.dangling(1);
                    self.ctx.stats.dropped_edges += 1;
                }
            }
            edges.add(source, &targets, &mut self.ctx.stats);
        }
        self.primary.dependencies = edges.into_dependencies();
    }

    fn copy_vulnerabilities(&mut self, secondary: &Bom) {
        let mut seen: HashSet<(String, String)> =
            self.primary.vulnerabilities.iter().filter_map(vulnerability_key).collect();
        let mut vulnerability_refs: HashSet<String> = self
            .primary
            .vulnerabilities
            .iter()
            .filter_map(|v| v.bom_ref.clone())
            .collect();
        for vulnerability in &secondary.vulnerabilities {
            if let Some(key) = vulnerability_key(vulnerability) {
                if !seen.insert(key) {
                    continue;
                }
            }
            let mut clone = vulnerability.clone();
            if clone
                .bom_ref
                .as_ref()
                .map_or(false, |r| vulnerability_refs.contains(r))
            {
                clone.bom_ref = Some(IdKind::Vulnerability.fresh());
            }
            vulnerability_refs.extend(clone.bom_ref.clone());
            let mut dangling = 0;
            clone.affects.retain_mut(|affect| {
                let resolved = self.refs.resolve(&affect.affect_ref).to_string();
                if self.known.contains(&resolved) {
                    affect.affect_ref = resolved;
                    true
                } else {
                    dangling += 1;
                    false
                }
            });
            self.ctx.dangling(dangling);
            self.primary.vulnerabilities.push(clone);
        }
    }
}

fn augment_one(
    primary: &mut Bom,
    secondary: &Bom,
    matcher: &dyn ComponentMatcher,
    ctx: &mut MergeContext<'_>,
) {
    let known: HashSet<String> = primary.element_refs().into_iter().map(str::to_string).collect();
    let mut index = ComponentIndex::new();
    if let Some(component) = primary.primary_component() {
        index_tree(&mut index, component);
    }
    for component in &primary.components {
        index_tree(&mut index, component);
    }

    let mut state = AugmentState {
        primary,
        index,
        known,
        refs: ProcessedRefs::new(),
        matcher,
        ctx,
    };
    // The secondary's own subject (metadata.component) is not carried over
    for component in &secondary.components {
        state.merge_component(component, None);
    }
    for service in &secondary.services {
        state.merge_service(service);
    }
    state.copy_dependencies(secondary);
    state.copy_vulnerabilities(secondary);
}

fn merge_component_fields(target: &mut Component, source: &Component, mode: MergeMode) {
    merge_field(&mut target.supplier, &source.supplier, mode);
    merge_field(&mut target.author, &source.author, mode);
    merge_field(&mut target.publisher, &source.publisher, mode);
    merge_field(&mut target.group, &source.group, mode);
    merge_field(&mut target.version, &source.version, mode);
    merge_field(&mut target.description, &source.description, mode);
    merge_field(&mut target.scope, &source.scope, mode);
    merge_field(&mut target.copyright, &source.copyright, mode);
    merge_field(&mut target.cpe, &source.cpe, mode);
    merge_field(&mut target.purl, &source.purl, mode);
    merge_field(&mut target.mime_type, &source.mime_type, mode);
    merge_field(&mut target.hashes, &source.hashes, mode);
    merge_field(&mut target.licenses, &source.licenses, mode);
    merge_field(&mut target.external_references, &source.external_references, mode);
    merge_field(&mut target.properties, &source.properties, mode);
}

fn service_key(service: &Service) -> (String, String) {
    (
        service.name.trim().to_lowercase(),
        service.version.as_deref().unwrap_or_default().trim().to_lowercase(),
    )
}

fn vulnerability_key(vulnerability: &Vulnerability) -> Option<(String, String)> {
    let id = vulnerability.id.as_deref()?.trim().to_lowercase();
    let source = vulnerability
        .source
        .as_ref()
        .and_then(|s| s.name.as_deref())
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    Some((id, source))
}

fn finish_metadata(bom: &mut Bom, spec_version: &str) {
    let metadata = bom.metadata.get_or_insert_with(Metadata::default);
    metadata.timestamp = Some(now_utc_rfc3339());
    let mut tools = ToolSet::new();
    if let Some(existing) = metadata.tools.as_ref() {
        tools.add_tools(existing);
    }
    tools.add_self();
    metadata.tools = Some(tools.into_tools(spec_version));
    bom.spec_version = spec_version.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::context::MergeSettings;
    use crate::assemble::tools::TOOL_NAME;
    use crate::config::MergeStrategy;
    use crate::matching::{build_matcher, MatcherConfig};
    use crate::model::cyclonedx::{Dependency, Tools};
    use crate::model::SbomSpec;

    fn doc(primary: Component, components: Vec<Component>, deps: Vec<Dependency>) -> Bom {
        Bom {
            spec_version: "1.5".to_string(),
            metadata: Some(Metadata {
                component: Some(primary),
                ..Metadata::default()
            }),
            components,
            dependencies: deps,
            ..Bom::default()
        }
    }

    fn lib(name: &str, version: &str, bom_ref: &str) -> Component {
        Component::new("library", name)
            .with_version(version)
            .with_bom_ref(bom_ref)
    }

    fn run(primary: &mut Bom, secondaries: &[Bom], mode: MergeMode) -> crate::assemble::MergeStats {
        let mut settings = MergeSettings::new(MergeStrategy::Augment, SbomSpec::CycloneDx);
        settings.merge_mode = mode;
        settings.output_spec_version = "1.5".to_string();
        let matcher = build_matcher(&MatcherConfig::default());
        let mut ctx = MergeContext::new(&settings);
        augment(primary, secondaries, matcher.as_ref(), &mut ctx);
        ctx.stats
    }

    #[test]
    fn test_fills_missing_fields_and_appends_unmatched() {
        let mut primary = doc(
            Component::new("application", "product").with_bom_ref("p"),
            vec![lib("libz", "1.0", "z")],
            vec![],
        );
        let mut libz = lib("libz", "1.0", "s-z");
        libz.description = Some("Z lib".to_string());
        let secondary = doc(
            Component::new("application", "other").with_bom_ref("s"),
            vec![libz, lib("libw", "1.0", "s-w")],
            vec![Dependency::new("s-z", vec!["s-w".to_string()])],
        );

        let stats = run(&mut primary, &[secondary], MergeMode::IfMissingOrEmpty);

        let names: Vec<_> = primary.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["libz", "libw"]);
        assert_eq!(primary.components[0].description.as_deref(), Some("Z lib"));
        assert_eq!(primary.components[1].bom_ref.as_deref(), Some("s-w"));
        let dep = primary.dependencies.iter().find(|d| d.dep_ref == "z").unwrap();
        assert_eq!(dep.depends_on, vec!["s-w".to_string()]);
        assert_eq!(primary.primary_component().unwrap().name, "product");
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.added, 1);
    }

    #[test]
    fn test_keeps_existing_values_unless_overwrite() {
        let mut existing = lib("libz", "1.0", "z");
        existing.description = Some("primary".to_string());
        let mut incoming = lib("libz", "1.0", "s-z");
        incoming.description = Some("secondary".to_string());
        let secondary = doc(Component::new("application", "s"), vec![incoming], vec![]);

        let mut kept = doc(Component::new("application", "p"), vec![existing.clone()], vec![]);
        run(&mut kept, std::slice::from_ref(&secondary), MergeMode::IfMissingOrEmpty);
        assert_eq!(kept.components[0].description.as_deref(), Some("primary"));

        let mut replaced = doc(Component::new("application", "p"), vec![existing], vec![]);
        run(&mut replaced, &[secondary], MergeMode::Overwrite);
        assert_eq!(replaced.components[0].description.as_deref(), Some("secondary"));
    }

    #[test]
    fn test_colliding_id_gets_fresh_ref() {
        let mut primary = doc(
            Component::new("application", "p").with_bom_ref("p"),
            vec![lib("liba", "1.0", "shared")],
            vec![],
        );
        let secondary = doc(
            Component::new("application", "s").with_bom_ref("s"),
            vec![lib("libc", "3.0", "s-c"), lib("libb", "2.0", "shared")],
            vec![Dependency::new("s-c", vec!["shared".to_string()])],
        );

        run(&mut primary, &[secondary], MergeMode::IfMissingOrEmpty);

        let libb = primary.components.iter().find(|c| c.name == "libb").unwrap();
        let libb_ref = libb.bom_ref.clone().unwrap();
        assert!(libb_ref.starts_with("component:"));
        let dep = primary.dependencies.iter().find(|d| d.dep_ref == "s-c").unwrap();
        assert_eq!(dep.depends_on, vec![libb_ref]);
    }

    #[test]
    fn test_irrelevant_and_dangling_edges() {
        let mut primary = doc(
            Component::new("application", "p").with_bom_ref("p"),
            vec![lib("liba", "1.0", "a")],
            vec![],
        );
        let secondary = doc(
            Component::new("application", "p").with_bom_ref("s"),
            vec![lib("liba", "1.0", "s-a"), lib("libb", "2.0", "s-b")],
            vec![
                Dependency::new("s-a", vec!["s-b".to_string(), "ghost".to_string()]),
                Dependency::new("unrelated", vec!["other".to_string()]),
            ],
        );

        let stats = run(&mut primary, &[secondary], MergeMode::IfMissingOrEmpty);

        assert_eq!(primary.dependencies.len(), 1);
        assert_eq!(primary.dependencies[0].dep_ref, "a");
        assert_eq!(primary.dependencies[0].depends_on, vec!["s-b".to_string()]);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.dropped_edges, 1);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.added, 1);
    }

    #[test]
    fn test_nested_unmatched_children_follow_parent() {
        let mut primary = doc(
            Component::new("application", "p").with_bom_ref("p"),
            vec![lib("liba", "1.0", "a")],
            vec![],
        );
        let mut parent = lib("liba", "1.0", "s-a");
        parent.components.push(lib("inner", "0.1", "s-inner"));
        let secondary = doc(Component::new("application", "s"), vec![parent], vec![]);

        run(&mut primary, &[secondary], MergeMode::IfMissingOrEmpty);

        assert_eq!(primary.components[0].components.len(), 1);
        assert_eq!(primary.components[0].components[0].name, "inner");
    }

    #[test]
    fn test_metadata_stamped_with_tool_once() {
        let mut primary = doc(Component::new("application", "p"), vec![], vec![]);
        let secondary = doc(Component::new("application", "p"), vec![], vec![]);
        run(&mut primary, &[secondary.clone(), secondary], MergeMode::IfMissingOrEmpty);

        let metadata = primary.metadata.as_ref().unwrap();
        assert!(metadata.timestamp.is_some());
        match metadata.tools.as_ref().unwrap() {
            Tools::Modern(tools) => {
                let ours = tools.components.iter().filter(|c| c.name == TOOL_NAME).count();
                assert_eq!(ours, 1);
            }
            Tools::Legacy(_) => panic!("expected 1.5 tools object"),
        }
    }
}
