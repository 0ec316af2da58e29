//! CycloneDX SBOM parser.
//!
//! Supports CycloneDX versions 1.4, 1.5, and 1.6 in JSON and XML formats.
//! JSON decodes straight into [`Bom`]; XML goes through mirror structs that
//! model the wrapper elements (`<components><component>...`) and is then
//! converted into the same typed document.

use crate::model::cyclonedx::{
    Affect, Bom, Component, Dependency, ExternalReference, Hash, License, LicenseChoice, Metadata,
    OrganizationalContact, OrganizationalEntity, Property, Rating, Service, Tool, Tools,
    ToolsObject, Vulnerability, VulnerabilitySource,
};
use crate::model::{Encoding, SbomDocument, SbomSpec};
use crate::parsers::traits::{ParseError, SbomParser};
use serde::Deserialize;

const XML_NAMESPACE_PREFIX: &str = "cyclonedx.org/schema/bom/";

/// Parser for CycloneDX SBOM format
#[derive(Debug, Default, Clone, Copy)]
pub struct CycloneDxParser;

impl CycloneDxParser {
    /// Create a new CycloneDX parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parse a CycloneDX BOM from JSON
    fn parse_json(content: &str) -> Result<Bom, ParseError> {
        let bom: Bom = serde_json::from_str(content)?;
        if bom.bom_format != "CycloneDX" {
            return Err(ParseError::InvalidStructure(format!(
                "bomFormat is '{}', expected 'CycloneDX'",
                bom.bom_format
            )));
        }
        Ok(bom)
    }

    /// Parse a CycloneDX BOM from XML
    fn parse_xml(content: &str) -> Result<Bom, ParseError> {
        let xml: BomXml =
            quick_xml::de::from_str(content).map_err(|e| ParseError::Xml(e.to_string()))?;

        // The spec version lives in the namespace URI, not in an attribute
        let spec_version = extract_xml_version(content).unwrap_or_else(|| "1.4".to_string());

        Ok(Bom {
            spec_version,
            serial_number: xml.serial_number,
            version: xml.version,
            metadata: xml.metadata.map(MetadataXml::into_model),
            components: xml.components.map(ComponentsXml::into_model).unwrap_or_default(),
            services: xml.services.map(ServicesXml::into_model).unwrap_or_default(),
            dependencies: xml
                .dependencies
                .map(DependenciesXml::into_model)
                .unwrap_or_default(),
            vulnerabilities: xml
                .vulnerabilities
                .map(|v| v.vulnerability.into_iter().map(VulnerabilityXml::into_model).collect())
                .unwrap_or_default(),
            ..Bom::default()
        })
    }
}

impl SbomParser for CycloneDxParser {
    fn spec(&self) -> SbomSpec {
        SbomSpec::CycloneDx
    }

    fn supported_encodings(&self) -> &'static [Encoding] {
        &[Encoding::Json, Encoding::Xml]
    }

    fn parse_str(&self, content: &str, encoding: Encoding) -> Result<SbomDocument, ParseError> {
        let bom = match encoding {
            Encoding::Json => Self::parse_json(content)?,
            Encoding::Xml => Self::parse_xml(content)?,
            other => {
                return Err(ParseError::UnknownFormat(format!(
                    "CycloneDX cannot be read from {other}"
                )))
            }
        };
        tracing::debug!(
            "Parsed CycloneDX {} with {} components",
            bom.spec_version,
            bom.component_count()
        );
        Ok(SbomDocument::CycloneDx(bom))
    }

    fn format_name(&self) -> &'static str {
        "CycloneDX"
    }
}

/// Extract the spec version from the `xmlns` of the root element.
fn extract_xml_version(content: &str) -> Option<String> {
    let start = content.find(XML_NAMESPACE_PREFIX)? + XML_NAMESPACE_PREFIX.len();
    let version: String = content[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    (!version.is_empty()).then_some(version)
}

// =============================================================================
// CycloneDX XML structures for deserialization
// XML uses wrapper elements for collections (e.g., <components><component>...)
// =============================================================================

/// Root BOM element for XML format
#[derive(Debug, Deserialize)]
#[serde(rename = "bom")]
struct BomXml {
    #[serde(rename = "@serialNumber", default)]
    serial_number: Option<String>,
    /// BOM version attribute (integer, not the spec version)
    #[serde(rename = "@version", default)]
    version: Option<u32>,
    #[serde(default)]
    metadata: Option<MetadataXml>,
    #[serde(default)]
    components: Option<ComponentsXml>,
    #[serde(default)]
    services: Option<ServicesXml>,
    #[serde(default)]
    dependencies: Option<DependenciesXml>,
    #[serde(default)]
    vulnerabilities: Option<VulnerabilitiesXml>,
}

#[derive(Debug, Deserialize)]
struct MetadataXml {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    tools: Option<ToolsXml>,
    #[serde(default)]
    authors: Option<AuthorsXml>,
    #[serde(default)]
    component: Option<ComponentXml>,
    #[serde(default)]
    manufacture: Option<EntityXml>,
    #[serde(default)]
    supplier: Option<EntityXml>,
    #[serde(default)]
    licenses: Option<LicensesXml>,
    #[serde(default)]
    properties: Option<PropertiesXml>,
}

impl MetadataXml {
    fn into_model(self) -> Metadata {
        Metadata {
            timestamp: self.timestamp,
            tools: self.tools.map(ToolsXml::into_model),
            authors: self
                .authors
                .map(|a| a.author.into_iter().map(ContactXml::into_model).collect())
                .unwrap_or_default(),
            component: self.component.map(ComponentXml::into_model),
            manufacture: self.manufacture.map(EntityXml::into_model),
            supplier: self.supplier.map(EntityXml::into_model),
            licenses: self.licenses.map(LicensesXml::into_model).unwrap_or_default(),
            properties: self.properties.map(PropertiesXml::into_model).unwrap_or_default(),
            ..Metadata::default()
        }
    }
}

/// `<tools>` holds either legacy `<tool>` entries or the 1.5+ object form
#[derive(Debug, Deserialize)]
struct ToolsXml {
    #[serde(default)]
    tool: Vec<ToolXml>,
    #[serde(default)]
    components: Option<ComponentsXml>,
    #[serde(default)]
    services: Option<ServicesXml>,
}

impl ToolsXml {
    fn into_model(self) -> Tools {
        if !self.tool.is_empty() {
            return Tools::Legacy(self.tool.into_iter().map(ToolXml::into_model).collect());
        }
        Tools::Modern(ToolsObject {
            components: self.components.map(ComponentsXml::into_model).unwrap_or_default(),
            services: self.services.map(ServicesXml::into_model).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ToolXml {
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    hashes: Option<HashesXml>,
}

impl ToolXml {
    fn into_model(self) -> Tool {
        Tool {
            vendor: self.vendor,
            name: self.name,
            version: self.version,
            hashes: self.hashes.map(HashesXml::into_model).unwrap_or_default(),
            external_references: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthorsXml {
    #[serde(default)]
    author: Vec<ContactXml>,
}

#[derive(Debug, Deserialize)]
struct ContactXml {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

impl ContactXml {
    fn into_model(self) -> OrganizationalContact {
        OrganizationalContact {
            name: self.name,
            email: self.email,
            phone: self.phone,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntityXml {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Vec<String>,
    #[serde(default)]
    contact: Vec<ContactXml>,
}

impl EntityXml {
    fn into_model(self) -> OrganizationalEntity {
        OrganizationalEntity {
            name: self.name,
            url: self.url,
            contact: self.contact.into_iter().map(ContactXml::into_model).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ComponentsXml {
    #[serde(default)]
    component: Vec<ComponentXml>,
}

impl ComponentsXml {
    fn into_model(self) -> Vec<Component> {
        self.component
            .into_iter()
            .map(ComponentXml::into_model)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ComponentXml {
    #[serde(rename = "@type", default)]
    component_type: String,
    #[serde(rename = "@bom-ref", default)]
    bom_ref: Option<String>,
    #[serde(rename = "@mime-type", default)]
    mime_type: Option<String>,
    #[serde(default)]
    supplier: Option<EntityXml>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    hashes: Option<HashesXml>,
    #[serde(default)]
    licenses: Option<LicensesXml>,
    #[serde(default)]
    copyright: Option<String>,
    #[serde(default)]
    cpe: Option<String>,
    #[serde(default)]
    purl: Option<String>,
    #[serde(rename = "externalReferences", default)]
    external_references: Option<ExternalReferencesXml>,
    #[serde(default)]
    properties: Option<PropertiesXml>,
    #[serde(default)]
    components: Option<ComponentsXml>,
}

impl ComponentXml {
    fn into_model(self) -> Component {
        Component {
            component_type: self.component_type,
            bom_ref: self.bom_ref,
            mime_type: self.mime_type,
            supplier: self.supplier.map(EntityXml::into_model),
            author: self.author,
            publisher: self.publisher,
            group: self.group,
            name: self.name,
            version: self.version,
            description: self.description,
            scope: self.scope,
            hashes: self.hashes.map(HashesXml::into_model).unwrap_or_default(),
            licenses: self.licenses.map(LicensesXml::into_model).unwrap_or_default(),
            copyright: self.copyright,
            cpe: self.cpe,
            purl: self.purl,
            external_references: self
                .external_references
                .map(|r| {
                    r.reference
                        .into_iter()
                        .map(|r| ExternalReference {
                            ref_type: r.ref_type,
                            url: r.url,
                            comment: r.comment,
                            hashes: Vec::new(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            properties: self.properties.map(PropertiesXml::into_model).unwrap_or_default(),
            components: self.components.map(ComponentsXml::into_model).unwrap_or_default(),
            ..Component::default()
        }
    }
}

/// `<licenses>` is a choice of `<license>` or `<expression>` children
#[derive(Debug, Deserialize)]
struct LicensesXml {
    #[serde(rename = "$value", default)]
    licenses: Vec<LicenseChoiceXml>,
}

impl LicensesXml {
    fn into_model(self) -> Vec<LicenseChoice> {
        self.licenses
            .into_iter()
            .map(|choice| match choice {
                LicenseChoiceXml::License(l) => LicenseChoice {
                    license: Some(License {
                        id: l.id,
                        name: l.name,
                        url: l.url,
                        ..License::default()
                    }),
                    expression: None,
                },
                LicenseChoiceXml::Expression(expr) => LicenseChoice::expression(expr),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
enum LicenseChoiceXml {
    #[serde(rename = "license")]
    License(LicenseXml),
    #[serde(rename = "expression")]
    Expression(String),
}

#[derive(Debug, Deserialize)]
struct LicenseXml {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HashesXml {
    #[serde(default)]
    hash: Vec<HashXml>,
}

impl HashesXml {
    fn into_model(self) -> Vec<Hash> {
        self.hash
            .into_iter()
            .map(|h| Hash {
                alg: h.alg,
                content: h.content.trim().to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct HashXml {
    #[serde(rename = "@alg")]
    alg: String,
    #[serde(rename = "$text", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExternalReferencesXml {
    #[serde(default)]
    reference: Vec<ExternalReferenceXml>,
}

#[derive(Debug, Deserialize)]
struct ExternalReferenceXml {
    #[serde(rename = "@type")]
    ref_type: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertiesXml {
    #[serde(default)]
    property: Vec<PropertyXml>,
}

impl PropertiesXml {
    fn into_model(self) -> Vec<Property> {
        self.property
            .into_iter()
            .map(|p| Property {
                name: p.name,
                value: p.value,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct PropertyXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ServicesXml {
    #[serde(default)]
    service: Vec<ServiceXml>,
}

impl ServicesXml {
    fn into_model(self) -> Vec<Service> {
        self.service
            .into_iter()
            .map(|s| Service {
                bom_ref: s.bom_ref,
                provider: s.provider.map(EntityXml::into_model),
                group: s.group,
                name: s.name,
                version: s.version,
                description: s.description,
                endpoints: s.endpoints.map(|e| e.endpoint).unwrap_or_default(),
                ..Service::default()
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ServiceXml {
    #[serde(rename = "@bom-ref", default)]
    bom_ref: Option<String>,
    #[serde(default)]
    provider: Option<EntityXml>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    endpoints: Option<EndpointsXml>,
}

#[derive(Debug, Deserialize)]
struct EndpointsXml {
    #[serde(default)]
    endpoint: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DependenciesXml {
    #[serde(default)]
    dependency: Vec<DependencyXml>,
}

impl DependenciesXml {
    /// Flatten nested `<dependency>` elements into one entry per source.
    fn into_model(self) -> Vec<Dependency> {
        let mut out = Vec::new();
        for dep in self.dependency {
            dep.flatten_into(&mut out);
        }
        out
    }
}

/// Dependency element; children are the refs it depends on
#[derive(Debug, Deserialize)]
struct DependencyXml {
    #[serde(rename = "@ref")]
    dep_ref: String,
    #[serde(default)]
    dependency: Vec<DependencyXml>,
}

impl DependencyXml {
    fn flatten_into(self, out: &mut Vec<Dependency>) {
        let depends_on = self.dependency.iter().map(|d| d.dep_ref.clone()).collect();
        out.push(Dependency::new(self.dep_ref, depends_on));
        for child in self.dependency {
            if !child.dependency.is_empty() {
                child.flatten_into(out);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct VulnerabilitiesXml {
    #[serde(default)]
    vulnerability: Vec<VulnerabilityXml>,
}

#[derive(Debug, Deserialize)]
struct VulnerabilityXml {
    #[serde(rename = "@bom-ref", default)]
    bom_ref: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    source: Option<SourceXml>,
    #[serde(default)]
    ratings: Option<RatingsXml>,
    #[serde(default)]
    cwes: Option<CwesXml>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    affects: Option<AffectsXml>,
}

impl VulnerabilityXml {
    fn into_model(self) -> Vulnerability {
        Vulnerability {
            bom_ref: self.bom_ref,
            id: self.id,
            source: self.source.map(SourceXml::into_model),
            ratings: self
                .ratings
                .map(|r| {
                    r.rating
                        .into_iter()
                        .map(|r| Rating {
                            source: r.source.map(SourceXml::into_model),
                            score: r.score,
                            severity: r.severity,
                            method: r.method,
                            vector: r.vector,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            cwes: self.cwes.map(|c| c.cwe).unwrap_or_default(),
            description: self.description,
            recommendation: self.recommendation,
            affects: self
                .affects
                .map(|a| {
                    a.target
                        .into_iter()
                        .map(|t| Affect {
                            affect_ref: t.target_ref,
                            versions: Vec::new(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            ..Vulnerability::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceXml {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl SourceXml {
    fn into_model(self) -> VulnerabilitySource {
        VulnerabilitySource {
            name: self.name,
            url: self.url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatingsXml {
    #[serde(default)]
    rating: Vec<RatingXml>,
}

#[derive(Debug, Deserialize)]
struct RatingXml {
    #[serde(default)]
    source: Option<SourceXml>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    vector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CwesXml {
    #[serde(default)]
    cwe: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct AffectsXml {
    #[serde(default)]
    target: Vec<TargetXml>,
}

#[derive(Debug, Deserialize)]
struct TargetXml {
    #[serde(rename = "ref")]
    target_ref: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str, encoding: Encoding) -> Bom {
        match CycloneDxParser::new().parse_str(content, encoding).unwrap() {
            SbomDocument::CycloneDx(bom) => bom,
            SbomDocument::Spdx(_) => panic!("expected CycloneDX"),
        }
    }

    #[test]
    fn test_parse_json_minimal() {
        let bom = parse(
            r#"{
                "bomFormat": "CycloneDX",
                "specVersion": "1.5",
                "metadata": {"component": {"type": "application", "name": "app", "bom-ref": "app"}},
                "components": [{"type": "library", "name": "lodash", "version": "4.17.21",
                                "purl": "pkg:npm/lodash@4.17.21", "bom-ref": "lodash"}],
                "dependencies": [{"ref": "app", "dependsOn": ["lodash"]}]
            }"#,
            Encoding::Json,
        );
        assert_eq!(bom.spec_version, "1.5");
        assert_eq!(bom.primary_component().unwrap().name, "app");
        assert_eq!(bom.components.len(), 1);
        assert_eq!(bom.dependencies[0].depends_on, vec!["lodash"]);
    }

    #[test]
    fn test_parse_json_rejects_wrong_bom_format() {
        let err = CycloneDxParser::new()
            .parse_str(r#"{"bomFormat":"SWID","specVersion":"1.5"}"#, Encoding::Json)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidStructure(_)));
    }

    #[test]
    fn test_parse_xml() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<bom xmlns="http://cyclonedx.org/schema/bom/1.4" serialNumber="urn:uuid:3e671687-395b-41f5-a30f-a58921a69b79" version="1">
  <metadata>
    <timestamp>2024-01-01T00:00:00Z</timestamp>
    <tools><tool><vendor>acme</vendor><name>scanner</name><version>2.0</version></tool></tools>
    <component type="application" bom-ref="app"><name>app</name><version>1.0</version></component>
  </metadata>
  <components>
    <component type="library" bom-ref="lib-a">
      <name>lib-a</name>
      <version>1.2.3</version>
      <hashes><hash alg="SHA-256">abcd</hash></hashes>
      <licenses><license><id>MIT</id></license><expression>Apache-2.0 OR MIT</expression></licenses>
      <purl>pkg:npm/lib-a@1.2.3</purl>
      <properties><property name="k">v</property></properties>
    </component>
  </components>
  <dependencies>
    <dependency ref="app"><dependency ref="lib-a"/></dependency>
    <dependency ref="lib-a"/>
  </dependencies>
</bom>"#;
        let bom = parse(xml, Encoding::Xml);
        assert_eq!(bom.spec_version, "1.4");
        assert_eq!(bom.version, Some(1));
        let meta = bom.metadata.as_ref().unwrap();
        assert!(matches!(meta.tools, Some(Tools::Legacy(ref t)) if t.len() == 1));
        let lib = &bom.components[0];
        assert_eq!(lib.bom_ref.as_deref(), Some("lib-a"));
        assert_eq!(lib.hashes[0].content, "abcd");
        assert_eq!(lib.licenses.len(), 2);
        assert_eq!(lib.properties[0].value, "v");
        assert_eq!(bom.dependencies.len(), 2);
        assert_eq!(bom.dependencies[0].depends_on, vec!["lib-a"]);
    }

    #[test]
    fn test_extract_xml_version() {
        assert_eq!(
            extract_xml_version(r#"<bom xmlns="http://cyclonedx.org/schema/bom/1.6">"#).as_deref(),
            Some("1.6")
        );
        assert_eq!(extract_xml_version("<bom>"), None);
    }

    #[test]
    fn test_rejects_tag_value() {
        let err = CycloneDxParser::new()
            .parse_str("SPDXVersion: SPDX-2.3", Encoding::TagValue)
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownFormat(_)));
    }
}
