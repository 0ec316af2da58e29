//! Format detection for SBOM inputs.
//!
//! Format is detected from the first well-formed structural evidence in the
//! content, never from the file name:
//!
//! | Evidence | Result |
//! |---|---|
//! | JSON object with `bomFormat == "CycloneDX"` | CycloneDX JSON |
//! | JSON object with `SPDXID` starting with `SPDX` | SPDX JSON |
//! | XML root `bom` in a `cyclonedx.org/schema/bom/...` namespace | CycloneDX XML |
//! | XML root `rdf:RDF` carrying SPDX terms | SPDX RDF/XML |
//! | first statement line starting with `SPDX` | SPDX tag-value |
//! | YAML mapping with `SPDXID` starting with `SPDX` | SPDX YAML |

use crate::model::{Encoding, SbomSpec};
use quick_xml::events::Event;
use quick_xml::Reader;

const CDX_XML_NAMESPACE: &str = "cyclonedx.org/schema/bom";
const SPDX_RDF_TERMS: &str = "spdx.org/rdf/terms";

/// Result of format detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    pub spec: SbomSpec,
    pub encoding: Encoding,
    /// Spec version when the evidence carries one (`1.5`, `SPDX-2.3`)
    pub version: Option<String>,
}

impl DetectedFormat {
    const fn new(spec: SbomSpec, encoding: Encoding, version: Option<String>) -> Self {
        Self {
            spec,
            encoding,
            version,
        }
    }
}

/// Detect SBOM format from content without decoding the document.
///
/// Returns `None` when no rule matches.
#[must_use]
pub fn detect_format(content: &str) -> Option<DetectedFormat> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();

    let detected = if trimmed.starts_with('{') {
        detect_json(trimmed)
    } else if trimmed.starts_with('<') {
        detect_xml(trimmed)
    } else {
        detect_tag_value(trimmed).or_else(|| detect_yaml(trimmed))
    };

    match &detected {
        Some(d) => tracing::debug!(
            "Detected {} {} (version {})",
            d.spec,
            d.encoding,
            d.version.as_deref().unwrap_or("unknown")
        ),
        None => tracing::debug!("No SBOM format markers found"),
    }
    detected
}

fn detect_json(content: &str) -> Option<DetectedFormat> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    let obj = value.as_object()?;

    if obj.get("bomFormat").and_then(|v| v.as_str()) == Some("CycloneDX") {
        let version = obj
            .get("specVersion")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        return Some(DetectedFormat::new(
            SbomSpec::CycloneDx,
            Encoding::Json,
            version,
        ));
    }

    let spdx_id = obj.get("SPDXID").and_then(|v| v.as_str())?;
    if spdx_id.starts_with("SPDX") {
        let version = obj
            .get("spdxVersion")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        return Some(DetectedFormat::new(SbomSpec::Spdx, Encoding::Json, version));
    }
    None
}

fn detect_xml(content: &str) -> Option<DetectedFormat> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).ok()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let local = qname.rsplit(':').next().unwrap_or_default().to_string();

                let mut namespaces = Vec::new();
                for attr in e.attributes().filter_map(std::result::Result::ok) {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                    if key == "xmlns" || key.starts_with("xmlns:") {
                        namespaces.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }

                if local == "bom" {
                    let ns = namespaces.iter().find(|ns| ns.contains(CDX_XML_NAMESPACE))?;
                    let version = ns
                        .rsplit('/')
                        .next()
                        .filter(|v| v.chars().next().is_some_and(|c| c.is_ascii_digit()))
                        .map(str::to_string);
                    return Some(DetectedFormat::new(
                        SbomSpec::CycloneDx,
                        Encoding::Xml,
                        version,
                    ));
                }
                if local == "RDF"
                    && (namespaces.iter().any(|ns| ns.contains(SPDX_RDF_TERMS))
                        || content.contains(SPDX_RDF_TERMS))
                {
                    return Some(DetectedFormat::new(SbomSpec::Spdx, Encoding::Rdf, None));
                }
                return None;
            }
            Event::Eof => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn detect_tag_value(content: &str) -> Option<DetectedFormat> {
    let first = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))?;
    if !first.starts_with("SPDX") {
        return None;
    }
    let version = content.lines().find_map(|l| {
        l.trim()
            .strip_prefix("SPDXVersion:")
            .map(|v| v.trim().to_string())
    });
    Some(DetectedFormat::new(
        SbomSpec::Spdx,
        Encoding::TagValue,
        version,
    ))
}

fn detect_yaml(content: &str) -> Option<DetectedFormat> {
    let value: serde_yaml::Value = serde_yaml::from_str(content).ok()?;
    let spdx_id = value.get("SPDXID").and_then(serde_yaml::Value::as_str)?;
    if !spdx_id.starts_with("SPDX") {
        return None;
    }
    let version = value
        .get("spdxVersion")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_string);
    Some(DetectedFormat::new(SbomSpec::Spdx, Encoding::Yaml, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_cyclonedx_json() {
        let d = detect_format(r#"{"bomFormat":"CycloneDX","specVersion":"1.5"}"#).unwrap();
        assert_eq!(d.spec, SbomSpec::CycloneDx);
        assert_eq!(d.encoding, Encoding::Json);
        assert_eq!(d.version.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_detect_spdx_json() {
        let d = detect_format(r#"{"SPDXID":"SPDXRef-DOCUMENT","spdxVersion":"SPDX-2.3"}"#)
            .unwrap();
        assert_eq!(d.spec, SbomSpec::Spdx);
        assert_eq!(d.encoding, Encoding::Json);
    }

    #[test]
    fn test_json_without_markers_is_unknown() {
        assert!(detect_format(r#"{"bomFormat":"Other"}"#).is_none());
        assert!(detect_format(r#"{"SPDXID":"x"}"#).is_none());
        assert!(detect_format("{not json").is_none());
    }

    #[test]
    fn test_detect_cyclonedx_xml() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<bom xmlns="http://cyclonedx.org/schema/bom/1.4" version="1"><components/></bom>"#;
        let d = detect_format(xml).unwrap();
        assert_eq!(d.spec, SbomSpec::CycloneDx);
        assert_eq!(d.encoding, Encoding::Xml);
        assert_eq!(d.version.as_deref(), Some("1.4"));
    }

    #[test]
    fn test_xml_bom_without_namespace_is_unknown() {
        assert!(detect_format("<bom version=\"1\"></bom>").is_none());
    }

    #[test]
    fn test_detect_spdx_rdf() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:spdx="http://spdx.org/rdf/terms#"><spdx:SpdxDocument/></rdf:RDF>"#;
        let d = detect_format(xml).unwrap();
        assert_eq!(d.encoding, Encoding::Rdf);
    }

    #[test]
    fn test_detect_tag_value() {
        let tv = "SPDXVersion: SPDX-2.3\nDataLicense: CC0-1.0\nSPDXID: SPDXRef-DOCUMENT\n";
        let d = detect_format(tv).unwrap();
        assert_eq!(d.encoding, Encoding::TagValue);
        assert_eq!(d.version.as_deref(), Some("SPDX-2.3"));
    }

    #[test]
    fn test_detect_yaml() {
        let yaml = "spdxVersion: SPDX-2.3\nSPDXID: SPDXRef-DOCUMENT\nname: demo\n";
        let d = detect_format(yaml).unwrap();
        assert_eq!(d.spec, SbomSpec::Spdx);
        assert_eq!(d.encoding, Encoding::Yaml);
    }

    #[test]
    fn test_plain_text_is_unknown() {
        assert!(detect_format("hello world").is_none());
        assert!(detect_format("").is_none());
    }
}
