//! Tool, creator, timestamp and license aggregation across inputs.

use crate::model::cyclonedx::{Component, OrganizationalEntity, Service, Tool, Tools, ToolsObject};
use crate::model::spdx::OtherLicense;
use crate::utils::{max_version, sha256_hex};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Name this tool reports in tool and creator lists
pub const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
/// Version this tool reports in tool and creator lists
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Supplier this tool reports in tool lists
pub const TOOL_SUPPLIER: &str = "sbom-assembler project";

/// Current time as an RFC 3339 UTC timestamp with second precision.
#[must_use]
pub fn now_utc_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// CycloneDX tools
// ============================================================================

/// Tool list deduplicated case-insensitively by `(name, version)`.
#[derive(Debug, Default)]
pub struct ToolSet {
    components: Vec<Component>,
    services: Vec<Service>,
    seen: HashSet<(String, String)>,
}

fn tool_key(name: &str, version: Option<&str>) -> (String, String) {
    (
        name.trim().to_lowercase(),
        version.unwrap_or_default().trim().to_lowercase(),
    )
}

/// This tool as a tools-block component.
#[must_use]
pub fn self_tool() -> Component {
    let mut tool = Component::new("application", TOOL_NAME).with_version(TOOL_VERSION);
    tool.supplier = Some(OrganizationalEntity {
        name: Some(TOOL_SUPPLIER.to_string()),
        ..OrganizationalEntity::default()
    });
    tool
}

fn tool_to_component(tool: &Tool) -> Component {
    let mut component = Component::new("application", tool.name.clone().unwrap_or_default());
    component.version.clone_from(&tool.version);
    component.supplier = tool.vendor.as_ref().map(|vendor| OrganizationalEntity {
        name: Some(vendor.clone()),
        ..OrganizationalEntity::default()
    });
    component.hashes.clone_from(&tool.hashes);
    component.external_references.clone_from(&tool.external_references);
    component
}

fn component_to_tool(component: &Component) -> Tool {
    Tool {
        vendor: component
            .supplier
            .as_ref()
            .and_then(|s| s.name.clone())
            .or_else(|| component.publisher.clone()),
        name: Some(component.name.clone()),
        version: component.version.clone(),
        hashes: component.hashes.clone(),
        external_references: component.external_references.clone(),
    }
}

fn service_to_tool(service: &Service) -> Tool {
    Tool {
        vendor: service.provider.as_ref().and_then(|p| p.name.clone()),
        name: Some(service.name.clone()),
        version: service.version.clone(),
        ..Tool::default()
    }
}

impl ToolSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool component; `false` when an equal tool is already present.
    pub fn add_component(&mut self, component: Component) -> bool {
        let key = tool_key(&component.name, component.version.as_deref());
        if !self.seen.insert(key) {
            return false;
        }
        self.components.push(component);
        true
    }

    /// Add a tool service; `false` when an equal tool is already present.
    pub fn add_service(&mut self, service: Service) -> bool {
        let key = tool_key(&service.name, service.version.as_deref());
        if !self.seen.insert(key) {
            return false;
        }
        self.services.push(service);
        true
    }

    /// Add this tool.
    pub fn add_self(&mut self) -> bool {
        self.add_component(self_tool())
    }

    /// Add every tool of an input tools block, whatever its shape.
    pub fn add_tools(&mut self, tools: &Tools) {
        match tools {
            Tools::Legacy(records) => {
                for record in records {
                    self.add_component(tool_to_component(record));
                }
            }
            Tools::Modern(obj) => {
                for component in &obj.components {
                    self.add_component(component.clone());
                }
                for service in &obj.services {
                    self.add_service(service.clone());
                }
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len() + self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render for an output spec version: the legacy array for 1.4, the
    /// components/services object for 1.5 and later.
    #[must_use]
    pub fn into_tools(self, spec_version: &str) -> Tools {
        if spec_version == "1.4" {
            let mut records: Vec<Tool> = self.components.iter().map(component_to_tool).collect();
            records.extend(self.services.iter().map(service_to_tool));
            Tools::Legacy(records)
        } else {
            Tools::Modern(ToolsObject {
                components: self.components,
                services: self.services,
            })
        }
    }
}

// ============================================================================
// SPDX creators
// ============================================================================

/// The creator line identifying this tool.
#[must_use]
pub fn tool_creator() -> String {
    format!("Tool: {TOOL_NAME}-{TOOL_VERSION}")
}

/// Ordered, exact-match deduplicated creator list.
#[derive(Debug, Default)]
pub struct CreatorSet {
    creators: Vec<String>,
}

impl CreatorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, creator: &str) -> bool {
        let creator = creator.trim();
        if creator.is_empty() || self.creators.iter().any(|c| c == creator) {
            return false;
        }
        self.creators.push(creator.to_string());
        true
    }

    pub fn extend<'a>(&mut self, creators: impl IntoIterator<Item = &'a String>) {
        for creator in creators {
            self.add(creator);
        }
    }

    pub fn add_self(&mut self) -> bool {
        self.add(&tool_creator())
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.creators
    }
}

/// Greatest license-list version among inputs, by dotted-number order.
pub fn max_license_list_version<'a>(
    versions: impl IntoIterator<Item = Option<&'a str>>,
) -> Option<String> {
    max_version(versions.into_iter().flatten()).map(str::to_string)
}

// ============================================================================
// SPDX extracted licenses
// ============================================================================

/// Extracted licenses deduplicated by `sha256(licenseId ++ extractedText)`.
#[derive(Debug, Default)]
pub struct OtherLicenseSet {
    licenses: Vec<OtherLicense>,
    digests: HashSet<String>,
    ids: HashMap<String, String>,
}

impl OtherLicenseSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a license unless an identical one is present.
    pub fn add(&mut self, license: &OtherLicense) -> bool {
        let digest = sha256_hex(format!("{}{}", license.license_id, license.extracted_text).as_bytes());
        if !self.digests.insert(digest.clone()) {
            return false;
        }
        if let Some(previous) = self.ids.get(&license.license_id) {
            if *previous != digest {
                tracing::warn!(
                    license = %license.license_id,
                    "extracted license id is used with different texts"
                );
            }
        } else {
            self.ids.insert(license.license_id.clone(), digest);
        }
        self.licenses.push(license.clone());
        true
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<OtherLicense> {
        self.licenses
    }
}

fn license_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:DocumentRef-[A-Za-z0-9.\-]+:)?LicenseRef-[A-Za-z0-9.\-]+")
            .expect("static regex")
    })
}

/// `LicenseRef-` identifiers referenced by a license expression.
///
/// Expressions the SPDX parser rejects are scanned textually.
#[must_use]
pub fn license_refs(expression: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let mut push = |r: String| {
        if !refs.contains(&r) {
            refs.push(r);
        }
    };

    match spdx::Expression::parse_mode(expression, spdx::ParseMode::LAX) {
        Ok(expr) => {
            for req in expr.requirements() {
                if let spdx::LicenseItem::Other { doc_ref, lic_ref } = &req.req.license {
                    let lic_ref = if lic_ref.starts_with("LicenseRef-") {
                        lic_ref.clone()
                    } else {
                        format!("LicenseRef-{lic_ref}")
                    };
                    match doc_ref {
                        Some(doc) if !doc.starts_with("DocumentRef-") => {
                            push(format!("DocumentRef-{doc}:{lic_ref}"));
                        }
                        Some(doc) => push(format!("{doc}:{lic_ref}")),
                        None => push(lic_ref),
                    }
                }
            }
        }
        Err(_) => {
            for m in license_ref_pattern().find_iter(expression) {
                push(m.as_str().to_string());
            }
        }
    }
    refs
}
