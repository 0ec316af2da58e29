//! SPDX augment merge.

use super::{is_describes_edge, is_placeholder, split_ref, ExternalDocRefs, RelationshipSet};
use crate::assemble::context::MergeContext;
use crate::assemble::fields::{merge_field, merge_spdx_field};
use crate::assemble::ids::IdKind;
use crate::assemble::refs::ProcessedRefs;
use crate::assemble::tools::{license_refs, now_utc_rfc3339, CreatorSet};
use crate::config::MergeMode;
use crate::matching::{ComponentIndex, ComponentMatcher};
use crate::model::spdx::{File, Package, Relationship, SpdxDocument, DESCRIBED_BY, DESCRIBES, DOCUMENT_ID};
use std::collections::HashSet;

/// Merge every secondary into `primary`, in order, then stamp the creation
/// info and repair the `DESCRIBES` edges.
pub fn augment(
    primary: &mut SpdxDocument,
    secondaries: &[SpdxDocument],
    matcher: &dyn ComponentMatcher,
    ctx: &mut MergeContext<'_>,
) {
    if primary.spdx_id.is_empty() {
        primary.spdx_id = DOCUMENT_ID.to_string();
    }
    for (i, secondary) in secondaries.iter().enumerate() {
        let _guard = tracing::debug_span!("secondary", index = i + 1).entered();
        augment_one(primary, secondary, matcher, ctx);
    }

    primary.creation_info.created = now_utc_rfc3339();
    let mut creators = CreatorSet::new();
    creators.extend(&primary.creation_info.creators);
    creators.add_self();
    primary.creation_info.creators = creators.into_vec();
    primary.spdx_version = format!("SPDX-{}", ctx.settings.output_spec_version);
    repair_describes(primary);
}

/// Make the document describe exactly one package: the target of an existing
/// `DESCRIBES` edge, else the sole package, else the first.
pub fn repair_describes(doc: &mut SpdxDocument) {
    let primary_id = match doc.described_package_ids().first() {
        Some(id) => (*id).to_string(),
        None => match doc.packages.first() {
            Some(package) => package.spdx_id.clone(),
            None => return,
        },
    };
    let doc_id = doc.spdx_id.clone();
    let mut kept_describes = false;
    for rel in std::mem::take(&mut doc.relationships) {
        let forward = rel.relationship_type == DESCRIBES && rel.spdx_element_id == doc_id;
        let inverse = rel.relationship_type == DESCRIBED_BY && rel.related_spdx_element == doc_id;
        if !(forward || inverse) {
            doc.relationships.push(rel);
            continue;
        }
        let subject = if forward { &rel.related_spdx_element } else { &rel.spdx_element_id };
        if kept_describes || *subject != primary_id {
            continue;
        }
        kept_describes = true;
        if forward {
            doc.relationships.push(rel);
        } else {
            // `pkg DESCRIBED_BY DOCUMENT` becomes `DOCUMENT DESCRIBES pkg`
            doc.relationships
                .push(Relationship::new(doc_id.clone(), DESCRIBES, primary_id.clone()));
        }
    }
    if !kept_describes && doc.packages.len() > 1 {
        doc.relationships
            .insert(0, Relationship::new(doc_id, DESCRIBES, primary_id));
    }
}

struct AugmentState<'a, 'b> {
    primary: &'a mut SpdxDocument,
    index: ComponentIndex<String>,
    known: HashSet<String>,
    refs: ProcessedRefs,
    /// Packages created or changed by this secondary
    touched: Vec<String>,
    matcher: &'a dyn ComponentMatcher,
    ctx: &'a mut MergeContext<'b>,
}

impl AugmentState<'_, '_> {
    fn claim_id(&mut self, kind: IdKind, wanted: &str) -> String {
        let wanted = wanted.trim();
        let id = if wanted.is_empty() || self.known.contains(wanted) {
            kind.fresh()
        } else {
            wanted.to_string()
        };
        self.known.insert(id.clone());
        id
    }

    fn merge_files(&mut self, secondary: &SpdxDocument) {
        for file in &secondary.files {
            let existing = self
                .primary
                .files
                .iter()
                .find(|f| same_file(f, file))
                .map(|f| f.spdx_id.clone());
            let target = match existing {
                Some(id) => id,
                None => {
                    let mut clone = file.clone();
                    clone.spdx_id = self.claim_id(IdKind::File, &file.spdx_id);
                    let id = clone.spdx_id.clone();
                    self.primary.files.push(clone);
                    id
                }
            };
            self.refs.insert(file.spdx_id.clone(), target);
        }
        for snippet in &secondary.snippets {
            let file = self.refs.resolve(&snippet.snippet_from_file).to_string();
            if !self.known.contains(&file) {
                self.ctx.dangling(1);
                continue;
            }
            let mut clone = snippet.clone();
            clone.spdx_id = self.claim_id(IdKind::Snippet, &snippet.spdx_id);
            clone.snippet_from_file = file;
            self.refs.insert(snippet.spdx_id.clone(), clone.spdx_id.clone());
            self.primary.snippets.push(clone);
        }
    }

    fn merge_package(&mut self, package: &Package) {
        let mode = self.ctx.settings.merge_mode;
        let target = match self.index.find_best_match(package, self.matcher) {
            Some(found) => {
                tracing::debug!(
                    name = %package.name,
                    strategy = %found.strategy,
                    confidence = found.confidence,
                    "matched package"
                );
                if let Some(existing) = self.primary.packages.iter_mut().find(|p| p.spdx_id == found.primary) {
                    merge_package_fields(existing, package, mode);
                }
                self.ctx.stats.matched += 1;
                found.primary
            }
            None => {
                let mut clone = package.clone();
                clone.spdx_id = self.claim_id(IdKind::Package, &package.spdx_id);
                clone.has_files = package
                    .has_files
                    .iter()
                    .map(|f| self.refs.resolve(f).to_string())
                    .filter(|f| self.known.contains(f))
                    .collect();
                if clone.files_analyzed == Some(false) {
                    clone.package_verification_code = None;
                }
                let id = clone.spdx_id.clone();
                self.index.add_component(&clone, id.clone());
                self.primary.packages.push(clone);
                self.ctx.stats.added += 1;
                id
            }
        };
        self.refs.insert(package.spdx_id.clone(), target.clone());
        if !self.touched.contains(&target) {
            self.touched.push(target);
        }
    }

    /// Whether the secondary's `doc_ref` points at the primary document.
    fn names_primary(&self, secondary: &SpdxDocument, doc_ref: &str) -> bool {
        secondary.external_document_refs.iter().any(|r| {
            r.external_document_id == doc_ref && r.spdx_document == self.primary.document_namespace
        })
    }

    /// Rewrite one relationship end of the secondary, `None` when it does not
    /// exist in the primary.
    fn resolve_end(&self, docrefs: &ExternalDocRefs, secondary: &SpdxDocument, reference: &str) -> Option<String> {
        if is_placeholder(reference) {
            return Some(reference.to_string());
        }
        if reference == secondary.spdx_id {
            return Some(self.primary.spdx_id.clone());
        }
        match split_ref(reference) {
            (Some(doc_ref), id) if self.names_primary(secondary, doc_ref) => {
                self.known.contains(id).then(|| id.to_string())
            }
            (Some(doc_ref), id) => docrefs
                .get(&secondary.document_namespace, doc_ref)
                .map(|renamed| format!("{renamed}:{id}")),
            (None, _) => {
                let resolved = self.refs.resolve(reference);
                self.known.contains(resolved).then(|| resolved.to_string())
            }
        }
    }

    fn copy_relationships(&mut self, secondary: &SpdxDocument) {
        let mut docrefs =
            ExternalDocRefs::from_existing(std::mem::take(&mut self.primary.external_document_refs));
        for r in &secondary.external_document_refs {
            if r.spdx_document != self.primary.document_namespace {
                docrefs.add(&secondary.document_namespace, r);
            }
        }

        let mut relationships =
            RelationshipSet::from_existing(std::mem::take(&mut self.primary.relationships));
        for rel in &secondary.relationships {
            if is_describes_edge(secondary, rel) {
                continue;
            }
            let relevant = self.refs.contains(&rel.spdx_element_id)
                || self.refs.contains(&rel.related_spdx_element);
            if !relevant {
                continue;
            }
            let from = self.resolve_end(&docrefs, secondary, &rel.spdx_element_id);
            let to = self.resolve_end(&docrefs, secondary, &rel.related_spdx_element);
            match (from, to) {
                (Some(from), Some(to)) => {
                    let mut clone = rel.clone();
                    clone.spdx_element_id = from;
                    clone.related_spdx_element = to;
                    if relationships.add(clone) {
                        self.ctx.stats.added_edges += 1;
                    }
                }
                (from, to) => {
                    tracing::debug!(
                        from = %rel.spdx_element_id,
                        to = %rel.related_spdx_element,
                        "dropping relationship with dangling end"
                    );
                    self.ctx
                        .dangling(usize::from(from.is_none()) + usize::from(to.is_none()));
                    self.ctx.stats.dropped_edges += 1;
                }
            }
        }
        self.primary.relationships = relationships.into_vec();
        self.primary.external_document_refs = docrefs.into_vec();
    }

    /// Copy only the extracted licenses the touched packages refer to.
    fn copy_other_licenses(&mut self, secondary: &SpdxDocument) {
        let mut wanted: Vec<String> = Vec::new();
        for package in self.primary.packages.iter().filter(|p| self.touched.contains(&p.spdx_id)) {
            let expressions = [package.license_concluded.as_deref(), package.license_declared.as_deref()];
            for expression in expressions.into_iter().flatten() {
                for id in license_refs(expression) {
                    if !wanted.contains(&id) {
                        wanted.push(id);
                    }
                }
            }
        }
        for license in &secondary.other_licenses {
            let needed = wanted.contains(&license.license_id);
            let present = self
                .primary
                .other_licenses
                .iter()
                .any(|l| l.license_id == license.license_id);
            if needed && !present {
                self.primary.other_licenses.push(license.clone());
            }
        }
    }
}

fn same_file(a: &File, b: &File) -> bool {
    a.file_name == b.file_name
        && !a.checksums.is_empty()
        && a.checksums.iter().any(|c| b.checksums.contains(c))
}

fn augment_one(
    primary: &mut SpdxDocument,
    secondary: &SpdxDocument,
    matcher: &dyn ComponentMatcher,
    ctx: &mut MergeContext<'_>,
) {
    let known: HashSet<String> = primary.element_ids().into_iter().map(str::to_string).collect();
    let mut index = ComponentIndex::new();
    for package in &primary.packages {
        index.add_component(package, package.spdx_id.clone());
    }

    let mut state = AugmentState {
        primary,
        index,
        known,
        refs: ProcessedRefs::new(),
        touched: Vec::new(),
        matcher,
        ctx,
    };
    state.merge_files(secondary);
    for package in &secondary.packages {
        state.merge_package(package);
    }
    state.copy_relationships(secondary);
    state.copy_other_licenses(secondary);
}

fn merge_package_fields(target: &mut Package, source: &Package, mode: MergeMode) {
    for (t, s) in [
        (&mut target.version_info, &source.version_info),
        (&mut target.package_file_name, &source.package_file_name),
        (&mut target.supplier, &source.supplier),
        (&mut target.originator, &source.originator),
        (&mut target.download_location, &source.download_location),
        (&mut target.homepage, &source.homepage),
        (&mut target.source_info, &source.source_info),
        (&mut target.license_concluded, &source.license_concluded),
        (&mut target.license_declared, &source.license_declared),
        (&mut target.license_comments, &source.license_comments),
        (&mut target.copyright_text, &source.copyright_text),
        (&mut target.summary, &source.summary),
        (&mut target.description, &source.description),
        (&mut target.comment, &source.comment),
        (&mut target.primary_package_purpose, &source.primary_package_purpose),
        (&mut target.release_date, &source.release_date),
        (&mut target.built_date, &source.built_date),
        (&mut target.valid_until_date, &source.valid_until_date),
    ] {
        merge_spdx_field(t, s, mode);
    }
    merge_field(&mut target.checksums, &source.checksums, mode);
    merge_field(&mut target.external_refs, &source.external_refs, mode);
    merge_field(&mut target.attribution_texts, &source.attribution_texts, mode);
    merge_field(&mut target.license_info_from_files, &source.license_info_from_files, mode);
}
