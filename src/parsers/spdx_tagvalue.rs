//! SPDX tag-value reader.
//!
//! Tag-value documents are a flat sequence of `Tag: value` lines. Elements
//! are opened by their leading tag (`PackageName`, `FileName`,
//! `SnippetSPDXID`, `LicenseID`) and every following tag applies to the
//! most recently opened element. Multi-line values are wrapped in
//! `<text>...</text>`.

use crate::model::spdx::{
    Checksum, ExternalDocumentRef, ExternalRef, File, OtherLicense, Package,
    PackageVerificationCode, Relationship, Snippet, SpdxDocument,
};
use crate::parsers::traits::ParseError;
use serde_json::json;

/// Element that subsequent tags apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Document,
    Package,
    File,
    Snippet,
    License,
}

/// Parse an SPDX tag-value document.
pub fn parse_tag_value(content: &str) -> Result<SpdxDocument, ParseError> {
    let mut doc = SpdxDocument::default();
    let mut section = Section::Document;
    let mut last_package: Option<usize> = None;

    for (line_no, key, value) in logical_lines(content)? {
        let value = value.as_str();
        match (key.as_str(), section) {
            // Element openers
            ("PackageName", _) => {
                doc.packages.push(Package {
                    name: value.to_string(),
                    ..Package::default()
                });
                last_package = Some(doc.packages.len() - 1);
                section = Section::Package;
            }
            ("FileName", _) => {
                doc.files.push(File {
                    file_name: value.to_string(),
                    ..File::default()
                });
                section = Section::File;
            }
            ("SnippetSPDXID", _) => {
                doc.snippets.push(Snippet {
                    spdx_id: value.to_string(),
                    ..Snippet::default()
                });
                section = Section::Snippet;
            }
            ("LicenseID", _) => {
                doc.other_licenses.push(OtherLicense {
                    license_id: value.to_string(),
                    ..OtherLicense::default()
                });
                section = Section::License;
            }

            // Ids: files inherit membership from the package they follow
            ("SPDXID", Section::Document) => doc.spdx_id = value.to_string(),
            ("SPDXID", Section::Package) => {
                if let Some(pkg) = doc.packages.last_mut() {
                    pkg.spdx_id = value.to_string();
                }
            }
            ("SPDXID", Section::File) => {
                if let Some(file) = doc.files.last_mut() {
                    file.spdx_id = value.to_string();
                    if let Some(pkg) = last_package.and_then(|i| doc.packages.get_mut(i)) {
                        pkg.has_files.push(value.to_string());
                    }
                }
            }

            // Relationships may appear anywhere
            ("Relationship", _) => {
                let rel = parse_relationship(value)
                    .ok_or_else(|| ParseError::tag_value(line_no, "malformed Relationship"))?;
                doc.relationships.push(rel);
            }
            ("RelationshipComment", _) => {
                if let Some(rel) = doc.relationships.last_mut() {
                    rel.comment = Some(value.to_string());
                }
            }

            (_, Section::Document) => apply_document_tag(&mut doc, &key, value, line_no)?,
            (_, Section::Package) => {
                if let Some(pkg) = doc.packages.last_mut() {
                    apply_package_tag(pkg, &key, value, line_no)?;
                }
            }
            (_, Section::File) => {
                if let Some(file) = doc.files.last_mut() {
                    apply_file_tag(file, &key, value, line_no)?;
                }
            }
            (_, Section::Snippet) => {
                if let Some(snippet) = doc.snippets.last_mut() {
                    apply_snippet_tag(snippet, &key, value, line_no)?;
                }
            }
            (_, Section::License) => {
                if let Some(license) = doc.other_licenses.last_mut() {
                    apply_license_tag(license, &key, value);
                }
            }
        }
    }

    if doc.spdx_version.is_empty() {
        return Err(ParseError::MissingField("SPDXVersion".to_string()));
    }
    Ok(doc)
}

/// Split content into `(line number, tag, value)` triples, joining
/// `<text>` blocks and skipping comments.
fn logical_lines(content: &str) -> Result<Vec<(usize, String, String)>, ParseError> {
    let mut out = Vec::new();
    let mut lines = content.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::tag_value(line_no, "expected 'Tag: value'"))?;
        let key = key.trim().to_string();
        let mut value = value.trim().to_string();

        if let Some(rest) = value.strip_prefix("<text>") {
            let mut text = rest.to_string();
            while !text.contains("</text>") {
                let (_, next) = lines
                    .next()
                    .ok_or_else(|| ParseError::tag_value(line_no, "unterminated <text> block"))?;
                text.push('\n');
                text.push_str(next);
            }
            let end = text.find("</text>").unwrap_or(text.len());
            text.truncate(end);
            value = text;
        }
        out.push((line_no, key, value));
    }
    Ok(out)
}

fn apply_document_tag(
    doc: &mut SpdxDocument,
    key: &str,
    value: &str,
    line_no: usize,
) -> Result<(), ParseError> {
    match key {
        "SPDXVersion" => doc.spdx_version = value.to_string(),
        "DataLicense" => doc.data_license = value.to_string(),
        "DocumentName" => doc.name = value.to_string(),
        "DocumentNamespace" => doc.document_namespace = value.to_string(),
        "DocumentComment" => doc.comment = Some(value.to_string()),
        "Creator" => doc.creation_info.creators.push(value.to_string()),
        "Created" => doc.creation_info.created = value.to_string(),
        "CreatorComment" => doc.creation_info.comment = Some(value.to_string()),
        "LicenseListVersion" => doc.creation_info.license_list_version = Some(value.to_string()),
        "ExternalDocumentRef" => {
            let ext = parse_external_document_ref(value)
                .ok_or_else(|| ParseError::tag_value(line_no, "malformed ExternalDocumentRef"))?;
            doc.external_document_refs.push(ext);
        }
        other => tracing::debug!("Ignoring document tag '{}' at line {}", other, line_no),
    }
    Ok(())
}

fn apply_package_tag(
    pkg: &mut Package,
    key: &str,
    value: &str,
    line_no: usize,
) -> Result<(), ParseError> {
    let text = Some(value.to_string());
    match key {
        "PackageVersion" => pkg.version_info = text,
        "PackageFileName" => pkg.package_file_name = text,
        "PackageSupplier" => pkg.supplier = text,
        "PackageOriginator" => pkg.originator = text,
        "PackageDownloadLocation" => pkg.download_location = text,
        "FilesAnalyzed" => pkg.files_analyzed = Some(value.eq_ignore_ascii_case("true")),
        "PackageVerificationCode" => {
            pkg.package_verification_code = Some(parse_verification_code(value));
        }
        "PackageChecksum" => {
            let checksum = parse_checksum(value)
                .ok_or_else(|| ParseError::tag_value(line_no, "malformed PackageChecksum"))?;
            pkg.checksums.push(checksum);
        }
        "PackageHomePage" => pkg.homepage = text,
        "PackageSourceInfo" => pkg.source_info = text,
        "PackageLicenseConcluded" => pkg.license_concluded = text,
        "PackageLicenseInfoFromFiles" => pkg.license_info_from_files.push(value.to_string()),
        "PackageLicenseDeclared" => pkg.license_declared = text,
        "PackageLicenseComments" => pkg.license_comments = text,
        "PackageCopyrightText" => pkg.copyright_text = text,
        "PackageSummary" => pkg.summary = text,
        "PackageDescription" => pkg.description = text,
        "PackageComment" => pkg.comment = text,
        "PackageAttributionText" => pkg.attribution_texts.push(value.to_string()),
        "PrimaryPackagePurpose" => pkg.primary_package_purpose = text,
        "ReleaseDate" => pkg.release_date = text,
        "BuiltDate" => pkg.built_date = text,
        "ValidUntilDate" => pkg.valid_until_date = text,
        "ExternalRef" => {
            let ext = parse_external_ref(value)
                .ok_or_else(|| ParseError::tag_value(line_no, "malformed ExternalRef"))?;
            pkg.external_refs.push(ext);
        }
        "ExternalRefComment" => {
            if let Some(ext) = pkg.external_refs.last_mut() {
                ext.comment = text;
            }
        }
        other => tracing::debug!("Ignoring package tag '{}' at line {}", other, line_no),
    }
    Ok(())
}

fn apply_file_tag(
    file: &mut File,
    key: &str,
    value: &str,
    line_no: usize,
) -> Result<(), ParseError> {
    let text = Some(value.to_string());
    match key {
        "FileType" => file.file_types.push(value.to_string()),
        "FileChecksum" => {
            let checksum = parse_checksum(value)
                .ok_or_else(|| ParseError::tag_value(line_no, "malformed FileChecksum"))?;
            file.checksums.push(checksum);
        }
        "LicenseConcluded" => file.license_concluded = text,
        "LicenseInfoInFile" => file.license_info_in_files.push(value.to_string()),
        "FileCopyrightText" => file.copyright_text = text,
        "FileComment" => file.comment = text,
        "FileNotice" => file.notice_text = text,
        "FileContributor" => file.file_contributors.push(value.to_string()),
        other => tracing::debug!("Ignoring file tag '{}' at line {}", other, line_no),
    }
    Ok(())
}

fn apply_snippet_tag(
    snippet: &mut Snippet,
    key: &str,
    value: &str,
    line_no: usize,
) -> Result<(), ParseError> {
    let text = Some(value.to_string());
    match key {
        "SnippetFromFileSPDXID" => snippet.snippet_from_file = value.to_string(),
        "SnippetName" => snippet.name = text,
        "SnippetLicenseConcluded" => snippet.license_concluded = text,
        "LicenseInfoInSnippet" => snippet.license_info_in_snippets.push(value.to_string()),
        "SnippetCopyrightText" => snippet.copyright_text = text,
        "SnippetByteRange" | "SnippetLineRange" => {
            let (start, end) = value
                .split_once(':')
                .and_then(|(s, e)| Some((s.trim().parse::<u64>().ok()?, e.trim().parse::<u64>().ok()?)))
                .ok_or_else(|| ParseError::tag_value(line_no, format!("malformed {key}")))?;
            let field = if key == "SnippetByteRange" {
                "offset"
            } else {
                "lineNumber"
            };
            snippet.ranges.push(json!({
                "startPointer": { field: start, "reference": snippet.snippet_from_file },
                "endPointer": { field: end, "reference": snippet.snippet_from_file },
            }));
        }
        other => tracing::debug!("Ignoring snippet tag '{}' at line {}", other, line_no),
    }
    Ok(())
}

fn apply_license_tag(license: &mut OtherLicense, key: &str, value: &str) {
    match key {
        "ExtractedText" => license.extracted_text = value.to_string(),
        "LicenseName" => license.name = Some(value.to_string()),
        "LicenseCrossReference" => license.see_alsos.push(value.to_string()),
        "LicenseComment" => license.comment = Some(value.to_string()),
        other => tracing::debug!("Ignoring license tag '{}'", other),
    }
}

/// `SPDXRef-A DEPENDS_ON SPDXRef-B`
fn parse_relationship(value: &str) -> Option<Relationship> {
    let mut parts = value.split_whitespace();
    let from = parts.next()?;
    let rel_type = parts.next()?;
    let to = parts.next()?;
    Some(Relationship::new(from, rel_type, to))
}

/// `PACKAGE-MANAGER purl pkg:npm/x@1`
fn parse_external_ref(value: &str) -> Option<ExternalRef> {
    let mut parts = value.split_whitespace();
    Some(ExternalRef {
        reference_category: parts.next()?.to_string(),
        reference_type: parts.next()?.to_string(),
        reference_locator: parts.next()?.to_string(),
        comment: None,
    })
}

/// `SHA256: abcd`
fn parse_checksum(value: &str) -> Option<Checksum> {
    let (algorithm, checksum_value) = value.split_once(':')?;
    Some(Checksum {
        algorithm: algorithm.trim().to_string(),
        checksum_value: checksum_value.trim().to_string(),
    })
}

/// `DocumentRef-x https://ns SHA1: abcd`
fn parse_external_document_ref(value: &str) -> Option<ExternalDocumentRef> {
    let mut parts = value.splitn(3, char::is_whitespace);
    let external_document_id = parts.next()?.trim().to_string();
    let spdx_document = parts.next()?.trim().to_string();
    let checksum = parse_checksum(parts.next()?.trim())?;
    Some(ExternalDocumentRef {
        external_document_id,
        spdx_document,
        checksum,
    })
}

/// `d6a770ba38583ed4bb4525bd96e50461655d2758 (excludes: ./package.spdx)`
fn parse_verification_code(value: &str) -> PackageVerificationCode {
    let (code, excluded) = match value.split_once('(') {
        Some((code, rest)) => {
            let rest = rest.trim_end_matches(')');
            let rest = rest.trim_start_matches("excludes:").trim();
            let files = rest
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
            (code.trim(), files)
        }
        None => (value.trim(), Vec::new()),
    };
    PackageVerificationCode {
        package_verification_code_value: code.to_string(),
        package_verification_code_excluded_files: excluded,
    }
}
