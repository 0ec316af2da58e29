//! CycloneDX writers (JSON and XML).

use crate::error::{AssembleError, Result};
use crate::model::cyclonedx::{
    Bom, Component, Dependency, ExternalReference, Hash, LicenseChoice, Metadata,
    OrganizationalContact, OrganizationalEntity, Property, Service, Tools, Vulnerability,
    VulnerabilitySource,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Pretty-printed CycloneDX JSON.
pub fn cyclonedx_json(bom: &Bom) -> Result<String> {
    serde_json::to_string_pretty(bom)
        .map_err(|e| AssembleError::serialize("CycloneDX JSON", e.to_string()))
}

/// CycloneDX XML in the namespace of the BOM's spec version.
pub fn cyclonedx_xml(bom: &Bom) -> Result<String> {
    let mut out = XmlOut::new();
    write_bom(&mut out, bom).map_err(|e| AssembleError::serialize("CycloneDX XML", e))?;
    String::from_utf8(out.finish())
        .map_err(|e| AssembleError::serialize("CycloneDX XML", e.to_string()))
}

type XmlResult = std::result::Result<(), String>;

/// Thin event writer over an in-memory buffer
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> XmlResult {
        self.writer.write_event(event).map_err(|e| e.to_string())
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.event(Event::Start(elem))
    }

    fn end(&mut self, name: &str) -> XmlResult {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.event(Event::Empty(elem))
    }

    fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> XmlResult {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn opt(&mut self, name: &str, value: Option<&str>) -> XmlResult {
        match value {
            Some(text) => self.text_element(name, &[], text),
            None => Ok(()),
        }
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn write_bom(out: &mut XmlOut, bom: &Bom) -> XmlResult {
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let namespace = format!("http://cyclonedx.org/schema/bom/{}", bom.spec_version);
    let version = bom.version.unwrap_or(1).to_string();
    let mut attrs = vec![("xmlns", namespace.as_str())];
    if let Some(serial) = &bom.serial_number {
        attrs.push(("serialNumber", serial.as_str()));
    }
    attrs.push(("version", version.as_str()));
    out.start("bom", &attrs)?;

    if let Some(metadata) = &bom.metadata {
        write_metadata(out, metadata)?;
    }
    if !bom.components.is_empty() {
        write_components(out, "components", &bom.components)?;
    }
    if !bom.services.is_empty() {
        write_services(out, &bom.services)?;
    }
    if !bom.dependencies.is_empty() {
        write_dependencies(out, &bom.dependencies)?;
    }
    if !bom.vulnerabilities.is_empty() {
        out.start("vulnerabilities", &[])?;
        for vuln in &bom.vulnerabilities {
            write_vulnerability(out, vuln)?;
        }
        out.end("vulnerabilities")?;
    }
    out.end("bom")
}

fn write_metadata(out: &mut XmlOut, metadata: &Metadata) -> XmlResult {
    out.start("metadata", &[])?;
    out.opt("timestamp", metadata.timestamp.as_deref())?;
    if let Some(tools) = metadata.tools.as_ref().filter(|t| !t.is_empty()) {
        out.start("tools", &[])?;
        match tools {
            Tools::Legacy(list) => {
                for tool in list {
                    out.start("tool", &[])?;
                    out.opt("vendor", tool.vendor.as_deref())?;
                    out.opt("name", tool.name.as_deref())?;
                    out.opt("version", tool.version.as_deref())?;
                    write_hashes(out, &tool.hashes)?;
                    out.end("tool")?;
                }
            }
            Tools::Modern(object) => {
                if !object.components.is_empty() {
                    write_components(out, "components", &object.components)?;
                }
                if !object.services.is_empty() {
                    write_services(out, &object.services)?;
                }
            }
        }
        out.end("tools")?;
    }
    if !metadata.authors.is_empty() {
        out.start("authors", &[])?;
        for author in &metadata.authors {
            write_contact(out, "author", author)?;
        }
        out.end("authors")?;
    }
    if let Some(component) = &metadata.component {
        write_component(out, component)?;
    }
    if let Some(manufacture) = &metadata.manufacture {
        write_entity(out, "manufacture", manufacture)?;
    }
    if let Some(supplier) = &metadata.supplier {
        write_entity(out, "supplier", supplier)?;
    }
    write_licenses(out, &metadata.licenses)?;
    write_properties(out, &metadata.properties)?;
    out.end("metadata")
}

fn write_components(out: &mut XmlOut, wrapper: &str, components: &[Component]) -> XmlResult {
    out.start(wrapper, &[])?;
    for component in components {
        write_component(out, component)?;
    }
    out.end(wrapper)
}

fn write_component(out: &mut XmlOut, c: &Component) -> XmlResult {
    let mut attrs = vec![("type", c.component_type.as_str())];
    if let Some(mime) = &c.mime_type {
        attrs.push(("mime-type", mime.as_str()));
    }
    if let Some(bom_ref) = &c.bom_ref {
        attrs.push(("bom-ref", bom_ref.as_str()));
    }
    out.start("component", &attrs)?;
    if let Some(supplier) = &c.supplier {
        write_entity(out, "supplier", supplier)?;
    }
    out.opt("author", c.author.as_deref())?;
    out.opt("publisher", c.publisher.as_deref())?;
    out.opt("group", c.group.as_deref())?;
    out.text_element("name", &[], &c.name)?;
    out.opt("version", c.version.as_deref())?;
    out.opt("description", c.description.as_deref())?;
    out.opt("scope", c.scope.as_deref())?;
    write_hashes(out, &c.hashes)?;
    write_licenses(out, &c.licenses)?;
    out.opt("copyright", c.copyright.as_deref())?;
    out.opt("cpe", c.cpe.as_deref())?;
    out.opt("purl", c.purl.as_deref())?;
    write_external_references(out, &c.external_references)?;
    write_properties(out, &c.properties)?;
    if !c.components.is_empty() {
        write_components(out, "components", &c.components)?;
    }
    out.end("component")
}

fn write_services(out: &mut XmlOut, services: &[Service]) -> XmlResult {
    out.start("services", &[])?;
    for s in services {
        let attrs: Vec<(&str, &str)> = s
            .bom_ref
            .as_deref()
            .map(|r| vec![("bom-ref", r)])
            .unwrap_or_default();
        out.start("service", &attrs)?;
        if let Some(provider) = &s.provider {
            write_entity(out, "provider", provider)?;
        }
        out.opt("group", s.group.as_deref())?;
        out.text_element("name", &[], &s.name)?;
        out.opt("version", s.version.as_deref())?;
        out.opt("description", s.description.as_deref())?;
        if !s.endpoints.is_empty() {
            out.start("endpoints", &[])?;
            for endpoint in &s.endpoints {
                out.text_element("endpoint", &[], endpoint)?;
            }
            out.end("endpoints")?;
        }
        out.end("service")?;
    }
    out.end("services")
}

fn write_dependencies(out: &mut XmlOut, dependencies: &[Dependency]) -> XmlResult {
    out.start("dependencies", &[])?;
    for dep in dependencies {
        if dep.depends_on.is_empty() {
            out.empty("dependency", &[("ref", dep.dep_ref.as_str())])?;
            continue;
        }
        out.start("dependency", &[("ref", dep.dep_ref.as_str())])?;
        for target in &dep.depends_on {
            out.empty("dependency", &[("ref", target.as_str())])?;
        }
        out.end("dependency")?;
    }
    out.end("dependencies")
}

fn write_vulnerability(out: &mut XmlOut, v: &Vulnerability) -> XmlResult {
    let attrs: Vec<(&str, &str)> = v
        .bom_ref
        .as_deref()
        .map(|r| vec![("bom-ref", r)])
        .unwrap_or_default();
    out.start("vulnerability", &attrs)?;
    out.opt("id", v.id.as_deref())?;
    if let Some(source) = &v.source {
        write_source(out, source)?;
    }
    if !v.ratings.is_empty() {
        out.start("ratings", &[])?;
        for rating in &v.ratings {
            out.start("rating", &[])?;
            if let Some(source) = &rating.source {
                write_source(out, source)?;
            }
            if let Some(score) = rating.score {
                out.text_element("score", &[], &score.to_string())?;
            }
            out.opt("severity", rating.severity.as_deref())?;
            out.opt("method", rating.method.as_deref())?;
            out.opt("vector", rating.vector.as_deref())?;
            out.end("rating")?;
        }
        out.end("ratings")?;
    }
    if !v.cwes.is_empty() {
        out.start("cwes", &[])?;
        for cwe in &v.cwes {
            out.text_element("cwe", &[], &cwe.to_string())?;
        }
        out.end("cwes")?;
    }
    out.opt("description", v.description.as_deref())?;
    out.opt("recommendation", v.recommendation.as_deref())?;
    if !v.affects.is_empty() {
        out.start("affects", &[])?;
        for affect in &v.affects {
            out.start("target", &[])?;
            out.text_element("ref", &[], &affect.affect_ref)?;
            out.end("target")?;
        }
        out.end("affects")?;
    }
    out.end("vulnerability")
}

fn write_source(out: &mut XmlOut, source: &VulnerabilitySource) -> XmlResult {
    out.start("source", &[])?;
    out.opt("name", source.name.as_deref())?;
    out.opt("url", source.url.as_deref())?;
    out.end("source")
}

fn write_entity(out: &mut XmlOut, element: &str, entity: &OrganizationalEntity) -> XmlResult {
    out.start(element, &[])?;
    out.opt("name", entity.name.as_deref())?;
    for url in &entity.url {
        out.text_element("url", &[], url)?;
    }
    for contact in &entity.contact {
        write_contact(out, "contact", contact)?;
    }
    out.end(element)
}

fn write_contact(out: &mut XmlOut, element: &str, contact: &OrganizationalContact) -> XmlResult {
    out.start(element, &[])?;
    out.opt("name", contact.name.as_deref())?;
    out.opt("email", contact.email.as_deref())?;
    out.opt("phone", contact.phone.as_deref())?;
    out.end(element)
}

fn write_hashes(out: &mut XmlOut, hashes: &[Hash]) -> XmlResult {
    if hashes.is_empty() {
        return Ok(());
    }
    out.start("hashes", &[])?;
    for hash in hashes {
        out.text_element("hash", &[("alg", hash.alg.as_str())], &hash.content)?;
    }
    out.end("hashes")
}

fn write_licenses(out: &mut XmlOut, licenses: &[LicenseChoice]) -> XmlResult {
    if licenses.is_empty() {
        return Ok(());
    }
    out.start("licenses", &[])?;
    for choice in licenses {
        if let Some(license) = &choice.license {
            out.start("license", &[])?;
            out.opt("id", license.id.as_deref())?;
            out.opt("name", license.name.as_deref())?;
            out.opt("url", license.url.as_deref())?;
            out.end("license")?;
        }
        out.opt("expression", choice.expression.as_deref())?;
    }
    out.end("licenses")
}

fn write_external_references(out: &mut XmlOut, refs: &[ExternalReference]) -> XmlResult {
    if refs.is_empty() {
        return Ok(());
    }
    out.start("externalReferences", &[])?;
    for reference in refs {
        out.start("reference", &[("type", reference.ref_type.as_str())])?;
        out.text_element("url", &[], &reference.url)?;
        out.opt("comment", reference.comment.as_deref())?;
        write_hashes(out, &reference.hashes)?;
        out.end("reference")?;
    }
    out.end("externalReferences")
}

fn write_properties(out: &mut XmlOut, properties: &[Property]) -> XmlResult {
    if properties.is_empty() {
        return Ok(());
    }
    out.start("properties", &[])?;
    for property in properties {
        out.text_element("property", &[("name", property.name.as_str())], &property.value)?;
    }
    out.end("properties")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cyclonedx::{Component, Dependency, Tool};
    use crate::model::{Encoding, SbomDocument};
    use crate::parsers::{CycloneDxParser, SbomParser};

    fn sample() -> Bom {
        let app = Component::new("application", "app")
            .with_version("1.0")
            .with_bom_ref("app-ref");
        let mut lib = Component::new("library", "lib & co")
            .with_version("2.0")
            .with_bom_ref("lib-ref")
            .with_purl("pkg:npm/lib@2.0");
        lib.licenses.push(LicenseChoice::id("MIT"));
        lib.hashes.push(Hash {
            alg: "SHA-256".to_string(),
            content: "abc".to_string(),
        });
        Bom {
            spec_version: "1.4".to_string(),
            serial_number: Some("urn:uuid:00000000-0000-0000-0000-000000000001".to_string()),
            version: Some(1),
            metadata: Some(Metadata {
                timestamp: Some("2024-01-01T00:00:00Z".to_string()),
                tools: Some(Tools::Legacy(vec![Tool {
                    name: Some("sbom-assembler".to_string()),
                    ..Tool::default()
                }])),
                component: Some(app),
                ..Metadata::default()
            }),
            components: vec![lib],
            dependencies: vec![Dependency::new("app-ref", vec!["lib-ref".to_string()])],
            ..Bom::default()
        }
    }

    #[test]
    fn test_json_uses_schema_names() {
        let json = cyclonedx_json(&sample()).unwrap();
        assert!(json.contains("\"bomFormat\": \"CycloneDX\""));
        assert!(json.contains("\"bom-ref\": \"lib-ref\""));
        assert!(json.contains("\"dependsOn\""));
    }

    #[test]
    fn test_xml_escapes_and_reads_back() {
        let bom = sample();
        let xml = cyclonedx_xml(&bom).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("xmlns=\"http://cyclonedx.org/schema/bom/1.4\""));
        assert!(xml.contains("lib &amp; co"));

        let parsed = match CycloneDxParser::new().parse_str(&xml, Encoding::Xml).unwrap() {
            SbomDocument::CycloneDx(b) => b,
            SbomDocument::Spdx(_) => panic!("expected CycloneDX"),
        };
        assert_eq!(parsed.components[0].name, "lib & co");
        assert_eq!(parsed.components[0].licenses, bom.components[0].licenses);
        assert_eq!(parsed.dependencies, bom.dependencies);
        assert_eq!(parsed.primary_component().unwrap().bom_ref.as_deref(), Some("app-ref"));
    }
}
