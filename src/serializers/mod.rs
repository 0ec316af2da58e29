//! SBOM writers.
//!
//! Each writer turns an assembled [`SbomDocument`] into text in one
//! encoding. The spec version written is the one carried by the document
//! (`specVersion` / `spdxVersion`); drivers set it before serialization.

mod cyclonedx;
mod spdx;

pub use cyclonedx::{cyclonedx_json, cyclonedx_xml};
pub use spdx::{spdx_json, spdx_tag_value, spdx_yaml};

use crate::error::{AssembleError, Result};
use crate::model::{Encoding, SbomDocument};

/// Serialize `document` in `encoding`.
///
/// Fails with [`AssembleError::UnsupportedFormat`] for encodings that have
/// no writer for the document's specification.
pub fn serialize(document: &SbomDocument, encoding: Encoding) -> Result<String> {
    match (document, encoding) {
        (SbomDocument::CycloneDx(bom), Encoding::Json) => cyclonedx_json(bom),
        (SbomDocument::CycloneDx(bom), Encoding::Xml) => cyclonedx_xml(bom),
        (SbomDocument::Spdx(doc), Encoding::Json) => spdx_json(doc),
        (SbomDocument::Spdx(doc), Encoding::Yaml) => spdx_yaml(doc),
        (SbomDocument::Spdx(doc), Encoding::TagValue) => spdx_tag_value(doc),
        (doc, encoding) => Err(AssembleError::unsupported_format(format!(
            "cannot write {} as {encoding}",
            doc.spec()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cyclonedx::Bom;
    use crate::model::spdx::SpdxDocument;

    #[test]
    fn test_unsupported_combinations() {
        let spdx = SbomDocument::Spdx(SpdxDocument::default());
        let err = serialize(&spdx, Encoding::Rdf).unwrap_err();
        assert!(matches!(err, AssembleError::UnsupportedFormat(_)));

        let cdx = SbomDocument::CycloneDx(Bom::default());
        let err = serialize(&cdx, Encoding::TagValue).unwrap_err();
        assert!(matches!(err, AssembleError::UnsupportedFormat(_)));
    }
}
