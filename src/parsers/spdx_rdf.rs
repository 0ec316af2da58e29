//! SPDX RDF/XML reader.
//!
//! RDF nests elements inside their owners, so the reader keeps a stack of
//! open elements and attaches fields to the innermost one. Relationships
//! without an explicit `spdxElementId` belong to the element that encloses
//! them.

use crate::model::spdx::{
    Checksum, ExternalRef, File, Package, Relationship, SpdxDocument, DOCUMENT_ID, NOASSERTION,
    NONE,
};
use crate::parsers::traits::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const URI_SEPARATORS: &[char] = &['#', '/'];

/// Innermost open element the current fields apply to
enum Open {
    Package(Package),
    File(File),
    Relationship(Relationship),
    Checksum(Checksum),
    ExternalRef(ExternalRef),
}

/// Parse an SPDX RDF/XML document.
pub fn parse_rdf_xml(content: &str) -> Result<SpdxDocument, ParseError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut doc = SpdxDocument::default();
    let mut stack: Vec<Open> = Vec::new();
    // Ids of the document/package/file elements currently open
    let mut owners: Vec<String> = Vec::new();
    let mut in_creation_info = false;
    let mut current_text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current_text.clear();
                match local_name(e.name().as_ref()).as_str() {
                    "SpdxDocument" => {
                        if let Some(about) = attribute(e, "about") {
                            let (namespace, id) = split_about(&about);
                            doc.document_namespace = namespace;
                            doc.spdx_id = id.unwrap_or_else(|| DOCUMENT_ID.to_string());
                        }
                        owners.push(doc.spdx_id.clone());
                    }
                    "CreationInfo" => in_creation_info = true,
                    "Package" => {
                        let id = attribute(e, "about")
                            .map(|uri| extract_spdx_id_from_uri(&uri))
                            .unwrap_or_default();
                        link_nested_element(&mut stack, &id);
                        owners.push(id.clone());
                        stack.push(Open::Package(Package {
                            spdx_id: id,
                            ..Package::default()
                        }));
                    }
                    "File" => {
                        let id = attribute(e, "about")
                            .map(|uri| extract_spdx_id_from_uri(&uri))
                            .unwrap_or_default();
                        link_nested_element(&mut stack, &id);
                        owners.push(id.clone());
                        stack.push(Open::File(File {
                            spdx_id: id,
                            ..File::default()
                        }));
                    }
                    "Relationship" => {
                        let owner = owners.last().cloned().unwrap_or_default();
                        stack.push(Open::Relationship(Relationship {
                            spdx_element_id: owner,
                            ..Relationship::default()
                        }));
                    }
                    "Checksum" => stack.push(Open::Checksum(Checksum::default())),
                    "ExternalRef" => stack.push(Open::ExternalRef(ExternalRef::default())),
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name().as_ref());
                if let Some(uri) = attribute(e, "resource") {
                    apply_resource(&mut doc, stack.last_mut(), &name, &uri);
                }
            }
            Ok(Event::Text(ref e)) => {
                current_text = e.unescape().map(|t| t.into_owned()).unwrap_or_default();
            }
            Ok(Event::End(ref e)) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "SpdxDocument" => {
                        owners.pop();
                    }
                    "CreationInfo" => in_creation_info = false,
                    "Package" | "File" | "Relationship" | "Checksum" | "ExternalRef" => {
                        close_element(&mut doc, &mut stack, &mut owners);
                    }
                    _ => apply_text(
                        &mut doc,
                        stack.last_mut(),
                        &name,
                        &current_text,
                        in_creation_info,
                    ),
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::Xml(format!(
                    "Error parsing RDF/XML at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if doc.spdx_id.is_empty() {
        doc.spdx_id = DOCUMENT_ID.to_string();
    }
    if doc.spdx_version.is_empty() {
        doc.spdx_version = "SPDX-2.3".to_string();
    }
    Ok(doc)
}

/// A package or file nested directly in `relatedSpdxElement` is the target.
fn link_nested_element(stack: &mut [Open], id: &str) {
    if let Some(Open::Relationship(rel)) = stack.last_mut() {
        if rel.related_spdx_element.is_empty() {
            rel.related_spdx_element = id.to_string();
        }
    }
}

fn close_element(doc: &mut SpdxDocument, stack: &mut Vec<Open>, owners: &mut Vec<String>) {
    let Some(open) = stack.pop() else {
        return;
    };
    match open {
        Open::Package(pkg) => {
            owners.pop();
            doc.packages.push(pkg);
        }
        Open::File(file) => {
            owners.pop();
            if let Some(Open::Package(pkg)) = stack.last_mut() {
                pkg.has_files.push(file.spdx_id.clone());
            }
            doc.files.push(file);
        }
        Open::Relationship(rel) => {
            if !rel.spdx_element_id.is_empty()
                && !rel.related_spdx_element.is_empty()
                && !rel.relationship_type.is_empty()
            {
                doc.relationships.push(rel);
            }
        }
        Open::Checksum(checksum) => match stack.last_mut() {
            Some(Open::Package(pkg)) => pkg.checksums.push(checksum),
            Some(Open::File(file)) => file.checksums.push(checksum),
            _ => {}
        },
        Open::ExternalRef(ext) => {
            if let Some(Open::Package(pkg)) = stack.last_mut() {
                pkg.external_refs.push(ext);
            }
        }
    }
}

/// Fields carried as `rdf:resource` on empty elements.
fn apply_resource(doc: &mut SpdxDocument, open: Option<&mut Open>, name: &str, uri: &str) {
    match (name, open) {
        ("dataLicense", _) => doc.data_license = extract_license_from_uri(uri),
        ("spdxElementId", Some(Open::Relationship(rel))) => {
            rel.spdx_element_id = extract_spdx_id_from_uri(uri);
        }
        ("relatedSpdxElement", Some(Open::Relationship(rel))) => {
            rel.related_spdx_element = extract_spdx_id_from_uri(uri);
        }
        ("relationshipType", Some(Open::Relationship(rel))) => {
            rel.relationship_type = screaming(suffix_after(uri, "relationshipType_"), '_');
        }
        ("licenseConcluded", Some(Open::Package(pkg))) => {
            pkg.license_concluded = Some(extract_license_from_uri(uri));
        }
        ("licenseDeclared", Some(Open::Package(pkg))) => {
            pkg.license_declared = Some(extract_license_from_uri(uri));
        }
        ("licenseConcluded", Some(Open::File(file))) => {
            file.license_concluded = Some(extract_license_from_uri(uri));
        }
        ("licenseInfoInFile", Some(Open::File(file))) => {
            file.license_info_in_files.push(extract_license_from_uri(uri));
        }
        ("downloadLocation", Some(Open::Package(pkg))) => {
            pkg.download_location = Some(extract_license_from_uri(uri));
        }
        ("primaryPackagePurpose", Some(Open::Package(pkg))) => {
            pkg.primary_package_purpose = Some(screaming(suffix_after(uri, "purpose_"), '-'));
        }
        ("algorithm", Some(Open::Checksum(checksum))) => {
            checksum.algorithm = suffix_after(uri, "checksumAlgorithm_").to_uppercase();
        }
        ("referenceCategory", Some(Open::ExternalRef(ext))) => {
            ext.reference_category = screaming(suffix_after(uri, "referenceCategory_"), '-');
        }
        ("referenceType", Some(Open::ExternalRef(ext))) => {
            ext.reference_type = uri.rsplit(URI_SEPARATORS).next().unwrap_or(uri).to_string();
        }
        _ => {}
    }
}

/// Fields carried as element text.
fn apply_text(
    doc: &mut SpdxDocument,
    open: Option<&mut Open>,
    name: &str,
    text: &str,
    in_creation_info: bool,
) {
    let value = Some(text.to_string());
    match (name, open) {
        ("created", _) if in_creation_info => doc.creation_info.created = text.to_string(),
        ("creator", _) if in_creation_info && !text.is_empty() => {
            doc.creation_info.creators.push(text.to_string());
        }
        ("licenseListVersion", _) if in_creation_info => {
            doc.creation_info.license_list_version = value;
        }
        ("name", Some(Open::Package(pkg))) => pkg.name = text.to_string(),
        ("versionInfo", Some(Open::Package(pkg))) => pkg.version_info = value,
        ("downloadLocation", Some(Open::Package(pkg))) => pkg.download_location = value,
        ("filesAnalyzed", Some(Open::Package(pkg))) => {
            pkg.files_analyzed = Some(text.eq_ignore_ascii_case("true"));
        }
        ("copyrightText", Some(Open::Package(pkg))) => pkg.copyright_text = value,
        ("supplier", Some(Open::Package(pkg))) => pkg.supplier = value,
        ("originator", Some(Open::Package(pkg))) => pkg.originator = value,
        ("homepage", Some(Open::Package(pkg))) => pkg.homepage = value,
        ("summary", Some(Open::Package(pkg))) => pkg.summary = value,
        ("description", Some(Open::Package(pkg))) => pkg.description = value,
        ("licenseConcluded", Some(Open::Package(pkg))) if !text.is_empty() => {
            pkg.license_concluded = value;
        }
        ("licenseDeclared", Some(Open::Package(pkg))) if !text.is_empty() => {
            pkg.license_declared = value;
        }
        ("fileName", Some(Open::File(file))) => file.file_name = text.to_string(),
        ("copyrightText", Some(Open::File(file))) => file.copyright_text = value,
        ("checksumValue", Some(Open::Checksum(checksum))) => {
            checksum.checksum_value = text.to_string();
        }
        ("referenceLocator", Some(Open::ExternalRef(ext))) => {
            ext.reference_locator = text.to_string();
        }
        ("referenceType", Some(Open::ExternalRef(ext))) if !text.is_empty() => {
            ext.reference_type = text.to_string();
        }
        ("relationshipType", Some(Open::Relationship(rel))) if !text.is_empty() => {
            rel.relationship_type = screaming(suffix_after(text, "relationshipType_"), '_');
        }
        ("specVersion" | "spdxVersion", None) => doc.spdx_version = text.to_string(),
        ("name", None) => doc.name = text.to_string(),
        ("dataLicense", None) if doc.data_license.is_empty() => {
            doc.data_license = text.to_string();
        }
        ("comment", None) if !in_creation_info => doc.comment = value,
        _ => {}
    }
}

fn attribute(e: &BytesStart<'_>, wanted: &str) -> Option<String> {
    e.attributes()
        .filter_map(std::result::Result::ok)
        .find(|attr| local_name(attr.key.as_ref()) == wanted)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Strip the namespace prefix from a qualified XML name
fn local_name(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    name.rsplit(':').next().unwrap_or_default().to_string()
}

/// Split `https://ns#SPDXRef-DOCUMENT` into namespace and fragment.
fn split_about(about: &str) -> (String, Option<String>) {
    match about.split_once('#') {
        Some((ns, id)) => (ns.to_string(), Some(id.to_string())),
        None => (about.to_string(), None),
    }
}

/// `http://example.org#SPDXRef-Package` -> `SPDXRef-Package`
fn extract_spdx_id_from_uri(uri: &str) -> String {
    uri.rsplit(URI_SEPARATORS).next().unwrap_or(uri).to_string()
}

fn extract_license_from_uri(uri: &str) -> String {
    let tail = uri.rsplit(URI_SEPARATORS).next().unwrap_or(uri);
    match tail.to_ascii_lowercase().as_str() {
        "noassertion" => NOASSERTION.to_string(),
        "none" => NONE.to_string(),
        _ => tail.to_string(),
    }
}

/// Text after `marker`, or after the last `#` when the marker is absent.
fn suffix_after<'a>(uri: &'a str, marker: &str) -> &'a str {
    uri.rfind(marker).map_or_else(
        || uri.rsplit('#').next().unwrap_or(uri),
        |idx| &uri[idx + marker.len()..],
    )
}

/// `packageManager` -> `PACKAGE-MANAGER`, `dependsOn` -> `DEPENDS_ON`
fn screaming(camel: &str, separator: char) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    let mut prev_lower = false;
    for c in camel.chars() {
        if c == '_' || c == '-' {
            out.push(separator);
        } else {
            if c.is_ascii_uppercase() && prev_lower {
                out.push(separator);
            }
            out.push(c.to_ascii_uppercase());
        }
        prev_lower = c.is_ascii_lowercase();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:spdx="http://spdx.org/rdf/terms#">
  <spdx:SpdxDocument rdf:about="https://example.com/demo#SPDXRef-DOCUMENT">
    <spdx:specVersion>SPDX-2.3</spdx:specVersion>
    <spdx:name>demo</spdx:name>
    <spdx:dataLicense rdf:resource="http://spdx.org/licenses/CC0-1.0"/>
    <spdx:creationInfo>
      <spdx:CreationInfo>
        <spdx:created>2024-01-01T00:00:00Z</spdx:created>
        <spdx:creator>Tool: rdf-writer</spdx:creator>
      </spdx:CreationInfo>
    </spdx:creationInfo>
    <spdx:relationship>
      <spdx:Relationship>
        <spdx:relationshipType rdf:resource="http://spdx.org/rdf/terms#relationshipType_describes"/>
        <spdx:relatedSpdxElement>
          <spdx:Package rdf:about="https://example.com/demo#SPDXRef-app">
            <spdx:name>app</spdx:name>
            <spdx:versionInfo>2.0</spdx:versionInfo>
            <spdx:licenseConcluded rdf:resource="http://spdx.org/rdf/terms#noassertion"/>
            <spdx:checksum>
              <spdx:Checksum>
                <spdx:algorithm rdf:resource="http://spdx.org/rdf/terms#checksumAlgorithm_sha256"/>
                <spdx:checksumValue>abcd</spdx:checksumValue>
              </spdx:Checksum>
            </spdx:checksum>
            <spdx:externalRef>
              <spdx:ExternalRef>
                <spdx:referenceCategory rdf:resource="http://spdx.org/rdf/terms#referenceCategory_packageManager"/>
                <spdx:referenceType rdf:resource="http://spdx.org/rdf/references/purl"/>
                <spdx:referenceLocator>pkg:npm/app@2.0</spdx:referenceLocator>
              </spdx:ExternalRef>
            </spdx:externalRef>
          </spdx:Package>
        </spdx:relatedSpdxElement>
      </spdx:Relationship>
    </spdx:relationship>
  </spdx:SpdxDocument>
</rdf:RDF>"##;

    #[test]
    fn test_parse_sample() {
        let doc = parse_rdf_xml(SAMPLE).unwrap();
        assert_eq!(doc.spdx_id, "SPDXRef-DOCUMENT");
        assert_eq!(doc.document_namespace, "https://example.com/demo");
        assert_eq!(doc.spdx_version, "SPDX-2.3");
        assert_eq!(doc.name, "demo");
        assert_eq!(doc.data_license, "CC0-1.0");
        assert_eq!(doc.creation_info.creators, vec!["Tool: rdf-writer"]);

        let pkg = &doc.packages[0];
        assert_eq!(pkg.spdx_id, "SPDXRef-app");
        assert_eq!(pkg.name, "app");
        assert_eq!(pkg.license_concluded.as_deref(), Some(NOASSERTION));
        assert_eq!(pkg.checksums[0].algorithm, "SHA256");
        assert_eq!(pkg.external_refs[0].reference_type, "purl");
        assert_eq!(pkg.external_refs[0].reference_category, "PACKAGE-MANAGER");

        assert_eq!(doc.relationships.len(), 1);
        let rel = &doc.relationships[0];
        assert_eq!(rel.spdx_element_id, "SPDXRef-DOCUMENT");
        assert_eq!(rel.relationship_type, "DESCRIBES");
        assert_eq!(rel.related_spdx_element, "SPDXRef-app");
    }

    #[test]
    fn test_uri_helpers() {
        assert_eq!(extract_spdx_id_from_uri("http://x.org/doc#SPDXRef-A"), "SPDXRef-A");
        assert_eq!(extract_license_from_uri("http://spdx.org/licenses/MIT"), "MIT");
        assert_eq!(extract_license_from_uri("http://spdx.org/rdf/terms#none"), NONE);
        assert_eq!(suffix_after("terms#relationshipType_contains", "relationshipType_"), "contains");
        assert_eq!(screaming("dependsOn", '_'), "DEPENDS_ON");
        assert_eq!(screaming("packageManager", '-'), "PACKAGE-MANAGER");
        assert_eq!(screaming("DEPENDS_ON", '_'), "DEPENDS_ON");
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_rdf_xml("<rdf:RDF><spdx:Package></rdf:RDF>").is_err());
    }
}
