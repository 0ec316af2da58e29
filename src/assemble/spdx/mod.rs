//! SPDX merge driver.
//!
//! Packages play the role of components and relationships the role of
//! dependency edges. Element ids are scoped by document namespace.

mod augment;

pub use augment::{augment, repair_describes};

use super::context::{MergeContext, MergeStats};
use super::ids::IdService;
use super::tools::{max_license_list_version, now_utc_rfc3339, CreatorSet, OtherLicenseSet};
use crate::config::{AppIdentity, MergeStrategy};
use crate::model::spdx::{
    Checksum, CreationInfo, ExternalDocumentRef, ExternalRef, Package, Relationship, SpdxDocument,
    CONTAINS, DEPENDS_ON, DESCRIBED_BY, DESCRIBES, DOCUMENT_ID, NOASSERTION, NONE,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Id of the synthetic primary package
pub const ROOT_PACKAGE_ID: &str = "SPDXRef-RootPackage";
pub const DATA_LICENSE: &str = "CC0-1.0";
const NAMESPACE_BASE: &str = "https://spdx.org/spdxdocs";

/// Split `DocumentRef-x:SPDXRef-y` into its document ref and element id.
pub(crate) fn split_ref(reference: &str) -> (Option<&str>, &str) {
    if reference.starts_with("DocumentRef-") {
        if let Some((doc, id)) = reference.split_once(':') {
            return (Some(doc), id);
        }
    }
    (None, reference)
}

pub(crate) fn is_placeholder(reference: &str) -> bool {
    reference == NONE || reference == NOASSERTION
}

/// Whether a relationship states what its own document describes.
pub(crate) fn is_describes_edge(doc: &SpdxDocument, rel: &Relationship) -> bool {
    (rel.relationship_type == DESCRIBES && rel.spdx_element_id == doc.spdx_id)
        || (rel.relationship_type == DESCRIBED_BY && rel.related_spdx_element == doc.spdx_id)
}

/// Relationships deduplicated by `(from, type, to)`, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct RelationshipSet {
    relationships: Vec<Relationship>,
    seen: HashSet<(String, String, String)>,
}

impl RelationshipSet {
    pub(crate) fn from_existing(existing: Vec<Relationship>) -> Self {
        let mut set = Self::default();
        for rel in existing {
            set.add(rel);
        }
        set
    }

    pub(crate) fn add(&mut self, rel: Relationship) -> bool {
        let key = (
            rel.spdx_element_id.clone(),
            rel.relationship_type.clone(),
            rel.related_spdx_element.clone(),
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.relationships.push(rel);
        true
    }

    pub(crate) fn into_vec(self) -> Vec<Relationship> {
        self.relationships
    }
}

/// External document references of the output, one id per namespace.
///
/// Inputs reusing a `DocumentRef-` id for a different namespace get a
/// suffixed id; lookups go through the input scope and the original id.
#[derive(Debug, Default)]
pub(crate) struct ExternalDocRefs {
    refs: Vec<ExternalDocumentRef>,
    by_namespace: HashMap<String, String>,
    renamed: HashMap<(String, String), String>,
}

impl ExternalDocRefs {
    pub(crate) fn from_existing(existing: Vec<ExternalDocumentRef>) -> Self {
        let mut set = Self::default();
        for r in existing {
            set.by_namespace
                .entry(r.spdx_document.clone())
                .or_insert_with(|| r.external_document_id.clone());
            set.refs.push(r);
        }
        set
    }

    pub(crate) fn add(&mut self, scope: &str, r: &ExternalDocumentRef) -> String {
        let id = match self.by_namespace.get(&r.spdx_document) {
            Some(existing) => existing.clone(),
            None => {
                let mut candidate = r.external_document_id.clone();
                let mut n = 1;
                while self.refs.iter().any(|e| e.external_document_id == candidate) {
                    n += 1;
                    candidate = format!("{}-{n}", r.external_document_id);
                }
                let mut renamed = r.clone();
                renamed.external_document_id.clone_from(&candidate);
                self.refs.push(renamed);
                self.by_namespace
                    .insert(r.spdx_document.clone(), candidate.clone());
                candidate
            }
        };
        self.renamed
            .insert((scope.to_string(), r.external_document_id.clone()), id.clone());
        id
    }

    pub(crate) fn get(&self, scope: &str, doc_ref: &str) -> Option<&str> {
        self.renamed
            .get(&(scope.to_string(), doc_ref.to_string()))
            .map(String::as_str)
    }

    pub(crate) fn into_vec(self) -> Vec<ExternalDocumentRef> {
        self.refs
    }
}

/// The packages an input describes; its first package when it names none.
fn input_primary_ids(doc: &SpdxDocument) -> Vec<String> {
    let described = doc.described_package_ids();
    if described.is_empty() {
        doc.packages.iter().take(1).map(|p| p.spdx_id.clone()).collect()
    } else {
        described.into_iter().map(str::to_string).collect()
    }
}

fn spdx_algorithm(algorithm: &str) -> String {
    algorithm.trim().to_uppercase().replacen("SHA-", "SHA", 1)
}

fn spdx_purpose(purpose: &str) -> String {
    purpose.trim().to_uppercase().replace('-', "_")
}

/// The synthetic primary package described by the app identity.
#[must_use]
pub fn root_package(app: &AppIdentity) -> Package {
    let mut package = Package::new(ROOT_PACKAGE_ID, app.name.clone());
    if !app.version.trim().is_empty() {
        package.version_info = Some(app.version.clone());
    }
    package.description.clone_from(&app.description);
    package.supplier = app
        .supplier
        .as_ref()
        .map(|s| format!("Organization: {}", s.name));
    package.homepage = app.supplier.as_ref().and_then(|s| s.url.clone());
    package.download_location = Some(NOASSERTION.to_string());
    package.files_analyzed = Some(false);
    package.license_concluded = Some(NOASSERTION.to_string());
    package.license_declared = Some(
        app.license
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| NOASSERTION.to_string()),
    );
    package.copyright_text = Some(
        app.copyright
            .clone()
            .unwrap_or_else(|| NOASSERTION.to_string()),
    );
    package.checksums = app
        .checksums
        .iter()
        .filter(|c| !c.value.trim().is_empty())
        .map(|c| Checksum {
            algorithm: spdx_algorithm(&c.algorithm),
            checksum_value: c.value.clone(),
        })
        .collect();
    if let Some(purl) = app.purl.as_deref().filter(|p| !p.trim().is_empty()) {
        package.external_refs.push(ExternalRef::purl(purl));
    }
    if let Some(cpe) = app.cpe.as_deref().filter(|c| !c.trim().is_empty()) {
        package.external_refs.push(ExternalRef::cpe23(cpe));
    }
    if !app.primary_purpose.trim().is_empty() {
        package.primary_package_purpose = Some(spdx_purpose(&app.primary_purpose));
    }
    package
}

fn creators(app: &AppIdentity, inputs: &[SpdxDocument]) -> Vec<String> {
    let mut creators = CreatorSet::new();
    creators.add_self();
    if let Some(supplier) = &app.supplier {
        creators.add(&format!("Organization: {}", supplier.name));
    }
    for author in &app.authors {
        match author.email.as_deref() {
            Some(email) => creators.add(&format!("Person: {} ({email})", author.name)),
            None => creators.add(&format!("Person: {}", author.name)),
        };
    }
    for doc in inputs {
        creators.extend(&doc.creation_info.creators);
    }
    creators.into_vec()
}

/// Input scopes: each input's namespace, disambiguated when two inputs
/// share one.
fn input_scopes(inputs: &[SpdxDocument]) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::with_capacity(inputs.len());
    for (i, doc) in inputs.iter().enumerate() {
        let namespace = doc.document_namespace.trim();
        if namespace.is_empty() || scopes.iter().any(|s| s == namespace) {
            scopes.push(format!("{namespace}#{i}"));
        } else {
            scopes.push(namespace.to_string());
        }
    }
    scopes
}

fn clone_package(ids: &mut IdService, scope: &str, package: &Package) -> (Package, bool) {
    let (mut clone, duplicate) = ids.store_and_clone_with_new_id(scope, package);
    let (has_files, _) = ids.resolve_dep_ids(scope, &package.has_files);
    clone.has_files = has_files;
    if clone.files_analyzed == Some(false) {
        clone.package_verification_code = None;
    }
    (clone, duplicate)
}

fn push_edge(relationships: &mut RelationshipSet, stats: &mut MergeStats, rel: Relationship) {
    if relationships.add(rel) {
        stats.added_edges += 1;
    }
}

/// Rewrites one relationship end of an input into the output.
struct EndResolver<'a> {
    ids: &'a IdService,
    docrefs: &'a ExternalDocRefs,
    /// Namespace -> scope for every input of the merge
    merge_set: &'a HashMap<String, String>,
}

impl EndResolver<'_> {
    fn resolve(&self, doc: &SpdxDocument, scope: &str, reference: &str) -> Option<String> {
        if is_placeholder(reference) {
            return Some(reference.to_string());
        }
        if reference == doc.spdx_id {
            return Some(DOCUMENT_ID.to_string());
        }
        match split_ref(reference) {
            (Some(doc_ref), id) => {
                let namespace = doc
                    .external_document_refs
                    .iter()
                    .find(|r| r.external_document_id == doc_ref)
                    .map(|r| r.spdx_document.as_str())?;
                match self.merge_set.get(namespace) {
                    Some(sibling) => self.ids.resolve_dep_id(sibling, id).map(str::to_string),
                    None => self
                        .docrefs
                        .get(scope, doc_ref)
                        .map(|renamed| format!("{renamed}:{id}")),
                }
            }
            (None, id) => self.ids.resolve_dep_id(scope, id).map(str::to_string),
        }
    }
}

/// Merge `inputs` into a new document under the configured root package.
pub fn merge(inputs: &[SpdxDocument], ctx: &mut MergeContext<'_>) -> SpdxDocument {
    let settings = ctx.settings;
    let app = &settings.app;
    let mut ids = IdService::new();
    let scopes = input_scopes(inputs);
    let mut merge_set: HashMap<String, String> = HashMap::new();
    for (doc, scope) in inputs.iter().zip(&scopes) {
        merge_set
            .entry(doc.document_namespace.clone())
            .or_insert_with(|| scope.clone());
    }

    // Files and snippets are never deduplicated; map them first so package
    // `hasFiles` lists can be rewritten while cloning.
    let mut files = Vec::new();
    let mut snippets = Vec::new();
    for (doc, scope) in inputs.iter().zip(&scopes) {
        for file in &doc.files {
            let mut clone = file.clone();
            ids.assign_fresh_id(scope, &mut clone);
            files.push(clone);
        }
    }
    for (doc, scope) in inputs.iter().zip(&scopes) {
        for snippet in &doc.snippets {
            let Some(file_id) = ids
                .resolve_dep_id(scope, &snippet.snippet_from_file)
                .map(str::to_string)
            else {
                tracing::debug!(snippet = %snippet.spdx_id, "dropping snippet of unknown file");
                ctx.dangling(1);
                continue;
            };
            let mut clone = snippet.clone();
            ids.assign_fresh_id(scope, &mut clone);
            clone.snippet_from_file = file_id;
            snippets.push(clone);
        }
    }

    let mut packages = vec![root_package(app)];
    let mut input_primaries: Vec<Vec<String>> = Vec::with_capacity(inputs.len());
    for (i, (doc, scope)) in inputs.iter().zip(&scopes).enumerate() {
        let primary_ids = input_primary_ids(doc);
        if primary_ids.is_empty() {
            tracing::warn!(input = i + 1, "input has no packages");
        }
        let mut resolved = Vec::new();
        for package in doc.packages.iter().filter(|p| primary_ids.contains(&p.spdx_id)) {
            let (clone, duplicate) = clone_package(&mut ids, scope, package);
            resolved.push(clone.spdx_id.clone());
            if !duplicate {
                packages.push(clone);
            }
        }
        input_primaries.push(resolved);
    }

    let mut origin_packages: Vec<Vec<String>> = vec![Vec::new(); inputs.len()];
    for (i, (doc, scope)) in inputs.iter().zip(&scopes).enumerate() {
        let primary_ids = input_primary_ids(doc);
        for package in doc.packages.iter().filter(|p| !primary_ids.contains(&p.spdx_id)) {
            let (clone, duplicate) = clone_package(&mut ids, scope, package);
            if !duplicate {
                origin_packages[i].push(clone.spdx_id.clone());
                packages.push(clone);
            }
        }
    }
    ctx.stats.added += packages.len() - 1;

    let mut docrefs = ExternalDocRefs::default();
    let mut other_licenses = OtherLicenseSet::new();
    for (doc, scope) in inputs.iter().zip(&scopes) {
        for r in &doc.external_document_refs {
            if !merge_set.contains_key(&r.spdx_document) {
                docrefs.add(scope, r);
            }
        }
        for license in &doc.other_licenses {
            other_licenses.add(license);
        }
    }

    let mut relationships = RelationshipSet::default();
    push_edge(
        &mut relationships,
        &mut ctx.stats,
        Relationship::new(DOCUMENT_ID, DESCRIBES, ROOT_PACKAGE_ID),
    );
    let root_edge = match settings.strategy {
        MergeStrategy::Flat => DEPENDS_ON,
        _ => CONTAINS,
    };
    for primary in input_primaries.iter().flatten() {
        push_edge(
            &mut relationships,
            &mut ctx.stats,
            Relationship::new(ROOT_PACKAGE_ID, root_edge, primary.clone()),
        );
    }
    if settings.strategy == MergeStrategy::Hierarchical {
        for (primaries, origin) in input_primaries.iter().zip(&origin_packages) {
            let Some(parent) = primaries.first() else {
                continue;
            };
            for package in origin {
                push_edge(
                    &mut relationships,
                    &mut ctx.stats,
                    Relationship::new(parent.clone(), CONTAINS, package.clone()),
                );
            }
        }
    }

    let resolver = EndResolver {
        ids: &ids,
        docrefs: &docrefs,
        merge_set: &merge_set,
    };
    for (doc, scope) in inputs.iter().zip(&scopes) {
        for rel in &doc.relationships {
            if is_describes_edge(doc, rel) {
                continue;
            }
            let from = resolver.resolve(doc, scope, &rel.spdx_element_id);
            let to = resolver.resolve(doc, scope, &rel.related_spdx_element);
            match (from, to) {
                (Some(from), Some(to)) => {
                    let mut clone = rel.clone();
                    clone.spdx_element_id = from;
                    clone.related_spdx_element = to;
                    push_edge(&mut relationships, &mut ctx.stats, clone);
                }
                (from, to) => {
                    tracing::debug!(
                        from = %rel.spdx_element_id,
                        to = %rel.related_spdx_element,
                        "dropping relationship with dangling end"
                    );
                    ctx.dangling(usize::from(from.is_none()) + usize::from(to.is_none()));
                    ctx.stats.dropped_edges += 1;
                }
            }
        }
    }

    let version = if app.version.trim().is_empty() {
        "unknown".to_string()
    } else {
        app.version.clone()
    };
    SpdxDocument {
        spdx_id: DOCUMENT_ID.to_string(),
        spdx_version: format!("SPDX-{}", settings.output_spec_version),
        data_license: DATA_LICENSE.to_string(),
        name: app.name.clone(),
        document_namespace: format!(
            "{NAMESPACE_BASE}/{}-{version}-{}",
            app.name.trim().replace(char::is_whitespace, "-"),
            Uuid::new_v4()
        ),
        creation_info: CreationInfo {
            created: now_utc_rfc3339(),
            creators: creators(app, inputs),
            license_list_version: max_license_list_version(
                inputs
                    .iter()
                    .map(|d| d.creation_info.license_list_version.as_deref()),
            ),
            comment: None,
        },
        external_document_refs: docrefs.into_vec(),
        packages,
        files,
        snippets,
        relationships: relationships.into_vec(),
        other_licenses: other_licenses.into_vec(),
        ..SpdxDocument::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::context::MergeSettings;
    use crate::model::spdx::{File, OtherLicense};
    use crate::model::SbomSpec;

    fn input(namespace: &str, described: &str, extra: &str) -> SpdxDocument {
        let mut doc = SpdxDocument {
            spdx_id: DOCUMENT_ID.to_string(),
            spdx_version: "SPDX-2.3".to_string(),
            name: namespace.to_string(),
            document_namespace: format!("https://example.com/{namespace}"),
            packages: vec![
                Package::new(described, described.trim_start_matches("SPDXRef-")).with_version("1.0"),
                Package::new(extra, extra.trim_start_matches("SPDXRef-")).with_version("2.0"),
            ],
            ..SpdxDocument::default()
        };
        doc.relationships = vec![
            Relationship::new(DOCUMENT_ID, DESCRIBES, described),
            Relationship::new(described, DEPENDS_ON, extra),
        ];
        doc
    }

    fn settings(strategy: MergeStrategy) -> MergeSettings {
        let mut settings = MergeSettings::new(strategy, SbomSpec::Spdx);
        settings.app.name = "app".to_string();
        settings.app.version = "1.0".to_string();
        settings
    }

    fn has(doc: &SpdxDocument, from: &str, kind: &str, to: &str) -> bool {
        doc.relationships
            .iter()
            .any(|r| r.spdx_element_id == from && r.relationship_type == kind && r.related_spdx_element == to)
    }

    #[test]
    fn test_hierarchical_contains_input_primaries() {
        let inputs = [input("a", "SPDXRef-A", "SPDXRef-X"), input("b", "SPDXRef-B", "SPDXRef-Y")];
        let settings = settings(MergeStrategy::Hierarchical);
        let mut ctx = MergeContext::new(&settings);
        let doc = merge(&inputs, &mut ctx);

        let a = doc.packages.iter().find(|p| p.name == "A").unwrap().spdx_id.clone();
        let b = doc.packages.iter().find(|p| p.name == "B").unwrap().spdx_id.clone();
        let x = doc.packages.iter().find(|p| p.name == "X").unwrap().spdx_id.clone();
        assert!(a.starts_with("SPDXRef-Package-"));
        assert!(has(&doc, DOCUMENT_ID, DESCRIBES, ROOT_PACKAGE_ID));
        assert!(has(&doc, ROOT_PACKAGE_ID, CONTAINS, &a));
        assert!(has(&doc, ROOT_PACKAGE_ID, CONTAINS, &b));
        assert!(has(&doc, &a, CONTAINS, &x));
        assert!(has(&doc, &a, DEPENDS_ON, &x));
        let describes = doc
            .relationships
            .iter()
            .filter(|r| r.relationship_type == DESCRIBES)
            .count();
        assert_eq!(describes, 1);
    }

    #[test]
    fn test_flat_depends_on_primaries() {
        let inputs = [input("a", "SPDXRef-A", "SPDXRef-X"), input("b", "SPDXRef-B", "SPDXRef-Y")];
        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let doc = merge(&inputs, &mut ctx);

        let names: Vec<_> = doc.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["app", "A", "B", "X", "Y"]);
        let a = &doc.packages[1].spdx_id;
        assert!(has(&doc, ROOT_PACKAGE_ID, DEPENDS_ON, a));
        assert_eq!(ctx.stats.added, 4);
        assert_eq!(ctx.stats.skipped, 0);
    }

    #[test]
    fn test_document_identity() {
        let mut a = input("a", "SPDXRef-A", "SPDXRef-X");
        a.creation_info.license_list_version = Some("3.9".to_string());
        a.creation_info.creators = vec!["Tool: scanner-1".to_string()];
        let mut b = input("b", "SPDXRef-B", "SPDXRef-Y");
        b.creation_info.license_list_version = Some("3.21".to_string());
        b.creation_info.creators = vec!["Tool: scanner-1".to_string()];

        let settings = settings(MergeStrategy::Assembly);
        let mut ctx = MergeContext::new(&settings);
        let doc = merge(&[a, b], &mut ctx);

        assert_eq!(doc.spdx_version, "SPDX-2.3");
        assert_eq!(doc.data_license, DATA_LICENSE);
        assert!(doc.document_namespace.starts_with("https://spdx.org/spdxdocs/app-1.0-"));
        assert_eq!(doc.creation_info.license_list_version.as_deref(), Some("3.21"));
        let creators = &doc.creation_info.creators;
        assert!(creators[0].starts_with("Tool: sbom-assembler-"));
        assert_eq!(creators.iter().filter(|c| *c == "Tool: scanner-1").count(), 1);
    }

    #[test]
    fn test_sibling_document_refs_resolve_inside_merge() {
        let mut a = input("a", "SPDXRef-A", "SPDXRef-X");
        let b = input("b", "SPDXRef-B", "SPDXRef-Y");
        a.external_document_refs = vec![
            ExternalDocumentRef {
                external_document_id: "DocumentRef-b".to_string(),
                spdx_document: b.document_namespace.clone(),
                checksum: Checksum::default(),
            },
            ExternalDocumentRef {
                external_document_id: "DocumentRef-os".to_string(),
                spdx_document: "https://example.com/os".to_string(),
                checksum: Checksum::default(),
            },
        ];
        a.relationships.push(Relationship::new("SPDXRef-X", DEPENDS_ON, "DocumentRef-b:SPDXRef-Y"));
        a.relationships.push(Relationship::new("SPDXRef-X", DEPENDS_ON, "DocumentRef-os:SPDXRef-libc"));
        a.relationships.push(Relationship::new("SPDXRef-X", DEPENDS_ON, "SPDXRef-ghost"));

        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let doc = merge(&[a, b], &mut ctx);

        let x = doc.packages.iter().find(|p| p.name == "X").unwrap().spdx_id.clone();
        let y = doc.packages.iter().find(|p| p.name == "Y").unwrap().spdx_id.clone();
        assert!(has(&doc, &x, DEPENDS_ON, &y));
        assert!(has(&doc, &x, DEPENDS_ON, "DocumentRef-os:SPDXRef-libc"));
        assert_eq!(doc.external_document_refs.len(), 1);
        assert_eq!(ctx.stats.skipped, 1);
        assert_eq!(ctx.stats.dropped_edges, 1);
    }

    #[test]
    fn test_files_and_licenses() {
        let mut a = input("a", "SPDXRef-A", "SPDXRef-X");
        a.files.push(File {
            spdx_id: "SPDXRef-File-1".to_string(),
            file_name: "./main.c".to_string(),
            ..File::default()
        });
        a.packages[0].has_files = vec!["SPDXRef-File-1".to_string()];
        a.packages[0].files_analyzed = Some(false);
        a.packages[0].package_verification_code = Some(Default::default());
        let license = OtherLicense {
            license_id: "LicenseRef-custom".to_string(),
            extracted_text: "text".to_string(),
            ..OtherLicense::default()
        };
        a.other_licenses.push(license.clone());
        let mut b = input("b", "SPDXRef-B", "SPDXRef-Y");
        b.other_licenses.push(license);

        let settings = settings(MergeStrategy::Flat);
        let mut ctx = MergeContext::new(&settings);
        let doc = merge(&[a, b], &mut ctx);

        assert_eq!(doc.files.len(), 1);
        let file_id = &doc.files[0].spdx_id;
        assert!(file_id.starts_with("SPDXRef-File-"));
        let a_pkg = doc.packages.iter().find(|p| p.name == "A").unwrap();
        assert_eq!(&a_pkg.has_files, &vec![file_id.clone()]);
        assert!(a_pkg.package_verification_code.is_none());
        assert_eq!(doc.other_licenses.len(), 1);
    }
}
