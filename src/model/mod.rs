//! Typed SBOM documents.
//!
//! The assembler works directly on format-specific documents rather than a
//! normalized model: merging must preserve every field an input carries.
//! [`ComponentView`] is the only cross-format abstraction, used by matching.

pub mod cyclonedx;
pub mod spdx;
mod view;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use cyclonedx::Bom;
pub use spdx::SpdxDocument;
pub use view::{ComponentFacts, ComponentView};

/// SBOM specification family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SbomSpec {
    #[serde(rename = "cyclonedx", alias = "cdx")]
    #[value(name = "cyclonedx", alias = "cdx")]
    CycloneDx,
    #[serde(rename = "spdx")]
    #[value(name = "spdx")]
    Spdx,
}

impl SbomSpec {
    /// Versions this tool can emit for the spec.
    #[must_use]
    pub const fn supported_output_versions(self) -> &'static [&'static str] {
        match self {
            Self::CycloneDx => &["1.4", "1.5", "1.6"],
            Self::Spdx => &["2.3"],
        }
    }

    /// Default output version.
    #[must_use]
    pub const fn default_output_version(self) -> &'static str {
        match self {
            Self::CycloneDx => "1.6",
            Self::Spdx => "2.3",
        }
    }
}

impl fmt::Display for SbomSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycloneDx => write!(f, "cyclonedx"),
            Self::Spdx => write!(f, "spdx"),
        }
    }
}

/// Concrete encoding of a document on disk
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    Json,
    Xml,
    #[value(name = "tag-value", alias = "tv")]
    TagValue,
    Yaml,
    Rdf,
}

impl Encoding {
    /// Encodings this tool can emit for a spec.
    #[must_use]
    pub const fn writable_for(spec: SbomSpec) -> &'static [Self] {
        match spec {
            SbomSpec::CycloneDx => &[Self::Json, Self::Xml],
            SbomSpec::Spdx => &[Self::Json, Self::TagValue, Self::Yaml, Self::Rdf],
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::TagValue => "tag-value",
            Self::Yaml => "yaml",
            Self::Rdf => "rdf",
        };
        f.write_str(name)
    }
}

/// A decoded input or assembled output document.
#[derive(Debug, Clone, PartialEq)]
pub enum SbomDocument {
    CycloneDx(Bom),
    Spdx(SpdxDocument),
}

impl SbomDocument {
    #[must_use]
    pub const fn spec(&self) -> SbomSpec {
        match self {
            Self::CycloneDx(_) => SbomSpec::CycloneDx,
            Self::Spdx(_) => SbomSpec::Spdx,
        }
    }

    /// Number of components (CycloneDX, including nested) or packages (SPDX).
    #[must_use]
    pub fn component_count(&self) -> usize {
        match self {
            Self::CycloneDx(bom) => bom.component_count(),
            Self::Spdx(doc) => doc.packages.len(),
        }
    }

    #[must_use]
    pub const fn as_cyclonedx(&self) -> Option<&Bom> {
        match self {
            Self::CycloneDx(bom) => Some(bom),
            Self::Spdx(_) => None,
        }
    }

    #[must_use]
    pub const fn as_spdx(&self) -> Option<&SpdxDocument> {
        match self {
            Self::Spdx(doc) => Some(doc),
            Self::CycloneDx(_) => None,
        }
    }
}
