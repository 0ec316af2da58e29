//! Typed SPDX 2.x document (JSON shape).
//!
//! The same structs back the JSON and YAML encodings through serde; the
//! tag-value and RDF readers build them directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Extra keys not modelled explicitly.
pub type Extra = BTreeMap<String, Value>;

/// Document element id used by every SPDX document for itself.
pub const DOCUMENT_ID: &str = "SPDXRef-DOCUMENT";
/// Placeholder values allowed wherever SPDX expects a value.
pub const NOASSERTION: &str = "NOASSERTION";
pub const NONE: &str = "NONE";

pub const DESCRIBES: &str = "DESCRIBES";
pub const DESCRIBED_BY: &str = "DESCRIBED_BY";
pub const CONTAINS: &str = "CONTAINS";
pub const DEPENDS_ON: &str = "DEPENDS_ON";

/// Root SPDX document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxDocument {
    #[serde(rename = "SPDXID", default)]
    pub spdx_id: String,
    #[serde(default)]
    pub spdx_version: String,
    #[serde(default)]
    pub data_license: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub document_namespace: String,
    #[serde(default)]
    pub creation_info: CreationInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_document_refs: Vec<ExternalDocumentRef>,
    /// SPDX 2.2 style describes list; lifted into relationships on load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_describes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<Snippet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
    #[serde(
        rename = "hasExtractedLicensingInfos",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub other_licenses: Vec<OtherLicense>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SpdxDocument {
    /// Convert `documentDescribes` entries into `DESCRIBES` relationships.
    pub fn lift_document_describes(&mut self) {
        let doc_id = if self.spdx_id.is_empty() {
            DOCUMENT_ID.to_string()
        } else {
            self.spdx_id.clone()
        };
        for target in std::mem::take(&mut self.document_describes) {
            let exists = self.relationships.iter().any(|r| {
                r.spdx_element_id == doc_id
                    && r.relationship_type == DESCRIBES
                    && r.related_spdx_element == target
            });
            if !exists {
                self.relationships
                    .push(Relationship::new(doc_id.clone(), DESCRIBES, target));
            }
        }
    }

    /// Ids of the packages this document describes, in relationship order.
    #[must_use]
    pub fn described_package_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for rel in &self.relationships {
            let target = if rel.spdx_element_id == self.spdx_id && rel.relationship_type == DESCRIBES
            {
                Some(rel.related_spdx_element.as_str())
            } else if rel.related_spdx_element == self.spdx_id
                && rel.relationship_type == DESCRIBED_BY
            {
                Some(rel.spdx_element_id.as_str())
            } else {
                None
            };
            if let Some(id) = target {
                if self.packages.iter().any(|p| p.spdx_id == id) && !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Every element id defined by this document.
    #[must_use]
    pub fn element_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.spdx_id.as_str()];
        ids.extend(self.packages.iter().map(|p| p.spdx_id.as_str()));
        ids.extend(self.files.iter().map(|f| f.spdx_id.as_str()));
        ids.extend(self.snippets.iter().map(|s| s.spdx_id.as_str()));
        ids
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationInfo {
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub creators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_list_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDocumentRef {
    pub external_document_id: String,
    pub spdx_document: String,
    #[serde(default)]
    pub checksum: Checksum,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checksum {
    pub algorithm: String,
    pub checksum_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRef {
    pub reference_category: String,
    pub reference_type: String,
    pub reference_locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ExternalRef {
    pub fn purl(locator: impl Into<String>) -> Self {
        Self {
            reference_category: "PACKAGE-MANAGER".to_string(),
            reference_type: "purl".to_string(),
            reference_locator: locator.into(),
            comment: None,
        }
    }

    pub fn cpe23(locator: impl Into<String>) -> Self {
        Self {
            reference_category: "SECURITY".to_string(),
            reference_type: "cpe23Type".to_string(),
            reference_locator: locator.into(),
            comment: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVerificationCode {
    pub package_verification_code_value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_verification_code_excluded_files: Vec<String>,
}

/// An SPDX package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(rename = "SPDXID", default)]
    pub spdx_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_analyzed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_verification_code: Option<PackageVerificationCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checksums: Vec<Checksum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_concluded: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub license_info_from_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_declared: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_refs: Vec<ExternalRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribution_texts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_package_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub has_files: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Package {
    pub fn new(spdx_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            spdx_id: spdx_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version_info = Some(version.into());
        self
    }

    /// First external ref locator of the given reference type.
    #[must_use]
    pub fn external_ref_locator(&self, reference_types: &[&str]) -> Option<&str> {
        self.external_refs
            .iter()
            .find(|r| {
                reference_types
                    .iter()
                    .any(|t| r.reference_type.eq_ignore_ascii_case(t))
            })
            .map(|r| r.reference_locator.as_str())
    }
}

/// An SPDX file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(rename = "SPDXID", default)]
    pub spdx_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checksums: Vec<Checksum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_concluded: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub license_info_in_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_contributors: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// An SPDX snippet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(rename = "SPDXID", default)]
    pub spdx_id: String,
    #[serde(default)]
    pub snippet_from_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_concluded: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub license_info_in_snippets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Relationship triple `spdx_element_id -- relationship_type --> related_spdx_element`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub spdx_element_id: String,
    pub relationship_type: String,
    pub related_spdx_element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Relationship {
    pub fn new(
        from: impl Into<String>,
        relationship_type: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            spdx_element_id: from.into(),
            relationship_type: relationship_type.into(),
            related_spdx_element: to.into(),
            comment: None,
        }
    }

    /// Whether two relationships express the same triple.
    #[must_use]
    pub fn same_edge(&self, other: &Self) -> bool {
        self.spdx_element_id == other.spdx_element_id
            && self.relationship_type == other.relationship_type
            && self.related_spdx_element == other.related_spdx_element
    }
}

/// Extracted (non-SPDX-list) license
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherLicense {
    pub license_id: String,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub see_alsos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Whether an SPDX value is empty or a placeholder.
#[must_use]
pub fn is_unset(value: Option<&str>) -> bool {
    value.map_or(true, |v| {
        let v = v.trim();
        v.is_empty() || v == NOASSERTION
    })
}
