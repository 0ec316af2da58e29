//! SBOM format parsers.
//!
//! This module provides readers for CycloneDX and SPDX SBOM formats,
//! decoding them into the typed documents of [`crate::model`].
//!
//! ## Format Detection
//!
//! The format of an input is taken from its content, never from its file
//! name: [`detect_format`] inspects the first structural evidence and the
//! matching [`SbomParser`] decodes the document.
//!
//! ## Usage
//!
//! ```no_run
//! use sbom_assembler::parsers::{detect_format, parse_document};
//!
//! let content = std::fs::read_to_string("sbom.json").unwrap();
//! if let Some(detected) = detect_format(&content) {
//!     println!("Detected: {} {}", detected.spec, detected.encoding);
//! }
//! let (document, _) = parse_document(&content).unwrap();
//! println!("{} components", document.component_count());
//! ```

mod cyclonedx;
mod detection;
mod spdx;
mod spdx_rdf;
mod spdx_tagvalue;
mod traits;

pub use cyclonedx::CycloneDxParser;
pub use detection::{detect_format, DetectedFormat};
pub use spdx::SpdxParser;
pub use traits::{ParseError, SbomParser};

use crate::model::{SbomDocument, SbomSpec};
use std::path::Path;

/// Detect the format of `content` and decode it.
pub fn parse_document(content: &str) -> Result<(SbomDocument, DetectedFormat), ParseError> {
    let detected = detect_format(content).ok_or_else(|| {
        ParseError::UnknownFormat(
            "content is not CycloneDX (JSON/XML) or SPDX (JSON/YAML/tag-value/RDF)".to_string(),
        )
    })?;

    let document = match detected.spec {
        SbomSpec::CycloneDx => CycloneDxParser::new().parse_str(content, detected.encoding)?,
        SbomSpec::Spdx => SpdxParser::new().parse_str(content, detected.encoding)?,
    };
    Ok((document, detected))
}

/// Read and decode an SBOM file.
pub fn parse_sbom(path: &Path) -> Result<SbomDocument, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content).map(|(document, _)| document)
}
