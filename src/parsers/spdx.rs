//! SPDX SBOM parser.
//!
//! Supports SPDX 2.x in JSON, YAML, tag-value and RDF/XML encodings. JSON and
//! YAML share the serde model; tag-value and RDF have hand-written readers.

use crate::model::spdx::SpdxDocument;
use crate::model::{Encoding, SbomDocument, SbomSpec};
use crate::parsers::spdx_rdf::parse_rdf_xml;
use crate::parsers::spdx_tagvalue::parse_tag_value;
use crate::parsers::traits::{ParseError, SbomParser};

/// Parser for SPDX SBOM format
#[derive(Debug, Default, Clone, Copy)]
pub struct SpdxParser;

impl SpdxParser {
    /// Create a new SPDX parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode without the post-load normalization.
    fn decode(content: &str, encoding: Encoding) -> Result<SpdxDocument, ParseError> {
        match encoding {
            Encoding::Json => Ok(serde_json::from_str(content)?),
            Encoding::Yaml => Ok(serde_yaml::from_str(content)?),
            Encoding::TagValue => parse_tag_value(content),
            Encoding::Rdf => parse_rdf_xml(content),
            Encoding::Xml => Err(ParseError::UnknownFormat(
                "SPDX has no plain XML encoding".to_string(),
            )),
        }
    }
}

impl SbomParser for SpdxParser {
    fn spec(&self) -> SbomSpec {
        SbomSpec::Spdx
    }

    fn supported_encodings(&self) -> &'static [Encoding] {
        &[
            Encoding::Json,
            Encoding::Yaml,
            Encoding::TagValue,
            Encoding::Rdf,
        ]
    }

    fn parse_str(&self, content: &str, encoding: Encoding) -> Result<SbomDocument, ParseError> {
        let mut doc = Self::decode(content, encoding)?;

        if !doc.spdx_id.starts_with("SPDX") {
            return Err(ParseError::InvalidStructure(format!(
                "document SPDXID '{}' does not start with 'SPDX'",
                doc.spdx_id
            )));
        }
        doc.lift_document_describes();

        tracing::debug!(
            "Parsed {} {} with {} packages, {} relationships",
            doc.spdx_version,
            encoding,
            doc.packages.len(),
            doc.relationships.len()
        );
        Ok(SbomDocument::Spdx(doc))
    }

    fn format_name(&self) -> &'static str {
        "SPDX"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::spdx::DESCRIBES;

    fn parse(content: &str, encoding: Encoding) -> SpdxDocument {
        match SpdxParser::new().parse_str(content, encoding).unwrap() {
            SbomDocument::Spdx(doc) => doc,
            SbomDocument::CycloneDx(_) => panic!("expected SPDX"),
        }
    }

    #[test]
    fn test_parse_json_lifts_document_describes() {
        let doc = parse(
            r#"{
                "SPDXID": "SPDXRef-DOCUMENT",
                "spdxVersion": "SPDX-2.2",
                "name": "demo",
                "dataLicense": "CC0-1.0",
                "documentNamespace": "https://example.com/demo",
                "creationInfo": {"created": "2024-01-01T00:00:00Z", "creators": ["Tool: x"]},
                "documentDescribes": ["SPDXRef-app"],
                "packages": [{"SPDXID": "SPDXRef-app", "name": "app", "downloadLocation": "NOASSERTION"}]
            }"#,
            Encoding::Json,
        );
        assert!(doc.document_describes.is_empty());
        assert_eq!(doc.relationships.len(), 1);
        assert_eq!(doc.relationships[0].relationship_type, DESCRIBES);
        assert_eq!(doc.described_package_ids(), vec!["SPDXRef-app"]);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
SPDXID: SPDXRef-DOCUMENT
spdxVersion: SPDX-2.3
name: demo
dataLicense: CC0-1.0
documentNamespace: https://example.com/demo
creationInfo:
  created: "2024-01-01T00:00:00Z"
  creators:
    - "Tool: x"
packages:
  - SPDXID: SPDXRef-lib
    name: lib
    versionInfo: "1.0"
"#;
        let doc = parse(yaml, Encoding::Yaml);
        assert_eq!(doc.packages[0].version_info.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_rejects_bad_document_id() {
        let err = SpdxParser::new()
            .parse_str(r#"{"SPDXID":"doc","spdxVersion":"SPDX-2.3"}"#, Encoding::Json)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidStructure(_)));
    }

    #[test]
    fn test_rejects_plain_xml() {
        let err = SpdxParser::new()
            .parse_str("<x/>", Encoding::Xml)
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownFormat(_)));
    }
}
