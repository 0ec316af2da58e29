//! SPDX writers (JSON, YAML and tag-value).

use crate::error::{AssembleError, Result};
use crate::model::spdx::{File, Package, Snippet, SpdxDocument};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;

/// Pretty-printed SPDX JSON.
pub fn spdx_json(doc: &SpdxDocument) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(|e| AssembleError::serialize("SPDX JSON", e.to_string()))
}

/// SPDX YAML (same field names as JSON).
pub fn spdx_yaml(doc: &SpdxDocument) -> Result<String> {
    serde_yaml::to_string(doc).map_err(|e| AssembleError::serialize("SPDX YAML", e.to_string()))
}

/// SPDX tag-value. Files are written after the package that lists them in
/// `hasFiles`; files owned by no package precede all packages.
pub fn spdx_tag_value(doc: &SpdxDocument) -> Result<String> {
    write_tag_value(doc).map_err(|e| AssembleError::serialize("SPDX tag-value", e.to_string()))
}

fn write_tag_value(doc: &SpdxDocument) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "SPDXVersion: {}", doc.spdx_version)?;
    writeln!(out, "DataLicense: {}", doc.data_license)?;
    writeln!(out, "SPDXID: {}", doc.spdx_id)?;
    writeln!(out, "DocumentName: {}", doc.name)?;
    writeln!(out, "DocumentNamespace: {}", doc.document_namespace)?;
    tag_opt(&mut out, "DocumentComment", doc.comment.as_deref())?;
    for ext in &doc.external_document_refs {
        writeln!(
            out,
            "ExternalDocumentRef: {} {} {}: {}",
            ext.external_document_id,
            ext.spdx_document,
            ext.checksum.algorithm,
            ext.checksum.checksum_value
        )?;
    }

    writeln!(out, "\n## Creation Information")?;
    tag_opt(
        &mut out,
        "LicenseListVersion",
        doc.creation_info.license_list_version.as_deref(),
    )?;
    for creator in &doc.creation_info.creators {
        writeln!(out, "Creator: {creator}")?;
    }
    writeln!(out, "Created: {}", doc.creation_info.created)?;
    tag_opt(&mut out, "CreatorComment", doc.creation_info.comment.as_deref())?;

    // Files listed before any package are unpackaged
    let packaged: HashSet<&str> = doc
        .packages
        .iter()
        .flat_map(|p| p.has_files.iter().map(String::as_str))
        .collect();
    for file in doc
        .files
        .iter()
        .filter(|f| !packaged.contains(f.spdx_id.as_str()))
    {
        write_file(&mut out, file)?;
    }

    let mut written_files: HashSet<&str> = HashSet::new();
    for pkg in &doc.packages {
        write_package(&mut out, pkg)?;
        for file_id in &pkg.has_files {
            if let Some(file) = doc.files.iter().find(|f| &f.spdx_id == file_id) {
                if written_files.insert(file.spdx_id.as_str()) {
                    write_file(&mut out, file)?;
                }
            }
        }
    }

    for snippet in &doc.snippets {
        write_snippet(&mut out, snippet)?;
    }

    for license in &doc.other_licenses {
        writeln!(out, "\n## License")?;
        writeln!(out, "LicenseID: {}", license.license_id)?;
        writeln!(out, "ExtractedText: {}", text_block(&license.extracted_text))?;
        tag_opt(&mut out, "LicenseName", license.name.as_deref())?;
        for see_also in &license.see_alsos {
            writeln!(out, "LicenseCrossReference: {see_also}")?;
        }
        tag_opt(&mut out, "LicenseComment", license.comment.as_deref())?;
    }

    if !doc.relationships.is_empty() {
        writeln!(out, "\n## Relationships")?;
    }
    for rel in &doc.relationships {
        writeln!(
            out,
            "Relationship: {} {} {}",
            rel.spdx_element_id, rel.relationship_type, rel.related_spdx_element
        )?;
        tag_opt(&mut out, "RelationshipComment", rel.comment.as_deref())?;
    }

    Ok(out)
}

fn write_package(out: &mut String, pkg: &Package) -> std::fmt::Result {
    writeln!(out, "\n## Package")?;
    writeln!(out, "PackageName: {}", pkg.name)?;
    writeln!(out, "SPDXID: {}", pkg.spdx_id)?;
    tag_opt(out, "PackageVersion", pkg.version_info.as_deref())?;
    tag_opt(out, "PackageFileName", pkg.package_file_name.as_deref())?;
    tag_opt(out, "PackageSupplier", pkg.supplier.as_deref())?;
    tag_opt(out, "PackageOriginator", pkg.originator.as_deref())?;
    tag_opt(out, "PackageDownloadLocation", pkg.download_location.as_deref())?;
    if let Some(analyzed) = pkg.files_analyzed {
        writeln!(out, "FilesAnalyzed: {analyzed}")?;
    }
    if let Some(code) = &pkg.package_verification_code {
        if code.package_verification_code_excluded_files.is_empty() {
            writeln!(out, "PackageVerificationCode: {}", code.package_verification_code_value)?;
        } else {
            writeln!(
                out,
                "PackageVerificationCode: {} (excludes: {})",
                code.package_verification_code_value,
                code.package_verification_code_excluded_files.join(", ")
            )?;
        }
    }
    for checksum in &pkg.checksums {
        writeln!(
            out,
            "PackageChecksum: {}: {}",
            checksum.algorithm, checksum.checksum_value
        )?;
    }
    tag_opt(out, "PackageHomePage", pkg.homepage.as_deref())?;
    tag_opt(out, "PackageSourceInfo", pkg.source_info.as_deref())?;
    tag_opt(out, "PackageLicenseConcluded", pkg.license_concluded.as_deref())?;
    for info in &pkg.license_info_from_files {
        writeln!(out, "PackageLicenseInfoFromFiles: {info}")?;
    }
    tag_opt(out, "PackageLicenseDeclared", pkg.license_declared.as_deref())?;
    tag_opt(out, "PackageLicenseComments", pkg.license_comments.as_deref())?;
    tag_opt(out, "PackageCopyrightText", pkg.copyright_text.as_deref())?;
    tag_opt(out, "PackageSummary", pkg.summary.as_deref())?;
    tag_opt(out, "PackageDescription", pkg.description.as_deref())?;
    tag_opt(out, "PackageComment", pkg.comment.as_deref())?;
    for ext in &pkg.external_refs {
        writeln!(
            out,
            "ExternalRef: {} {} {}",
            ext.reference_category, ext.reference_type, ext.reference_locator
        )?;
        tag_opt(out, "ExternalRefComment", ext.comment.as_deref())?;
    }
    for text in &pkg.attribution_texts {
        writeln!(out, "PackageAttributionText: {}", text_block(text))?;
    }
    tag_opt(out, "PrimaryPackagePurpose", pkg.primary_package_purpose.as_deref())?;
    tag_opt(out, "ReleaseDate", pkg.release_date.as_deref())?;
    tag_opt(out, "BuiltDate", pkg.built_date.as_deref())?;
    tag_opt(out, "ValidUntilDate", pkg.valid_until_date.as_deref())
}

fn write_file(out: &mut String, file: &File) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "FileName: {}", file.file_name)?;
    writeln!(out, "SPDXID: {}", file.spdx_id)?;
    for file_type in &file.file_types {
        writeln!(out, "FileType: {file_type}")?;
    }
    for checksum in &file.checksums {
        writeln!(
            out,
            "FileChecksum: {}: {}",
            checksum.algorithm, checksum.checksum_value
        )?;
    }
    tag_opt(out, "LicenseConcluded", file.license_concluded.as_deref())?;
    for info in &file.license_info_in_files {
        writeln!(out, "LicenseInfoInFile: {info}")?;
    }
    tag_opt(out, "FileCopyrightText", file.copyright_text.as_deref())?;
    tag_opt(out, "FileComment", file.comment.as_deref())?;
    tag_opt(out, "FileNotice", file.notice_text.as_deref())?;
    for contributor in &file.file_contributors {
        writeln!(out, "FileContributor: {contributor}")?;
    }
    Ok(())
}

fn write_snippet(out: &mut String, snippet: &Snippet) -> std::fmt::Result {
    writeln!(out, "\n## Snippet")?;
    writeln!(out, "SnippetSPDXID: {}", snippet.spdx_id)?;
    writeln!(out, "SnippetFromFileSPDXID: {}", snippet.snippet_from_file)?;
    for range in &snippet.ranges {
        if let Some((start, end)) = range_bounds(range, "offset") {
            writeln!(out, "SnippetByteRange: {start}:{end}")?;
        } else if let Some((start, end)) = range_bounds(range, "lineNumber") {
            writeln!(out, "SnippetLineRange: {start}:{end}")?;
        }
    }
    tag_opt(out, "SnippetLicenseConcluded", snippet.license_concluded.as_deref())?;
    for info in &snippet.license_info_in_snippets {
        writeln!(out, "LicenseInfoInSnippet: {info}")?;
    }
    tag_opt(out, "SnippetCopyrightText", snippet.copyright_text.as_deref())?;
    tag_opt(out, "SnippetName", snippet.name.as_deref())
}

fn range_bounds(range: &Value, field: &str) -> Option<(u64, u64)> {
    let start = range.get("startPointer")?.get(field)?.as_u64()?;
    let end = range.get("endPointer")?.get(field)?.as_u64()?;
    Some((start, end))
}

fn tag_opt(out: &mut String, tag: &str, value: Option<&str>) -> std::fmt::Result {
    match value {
        Some(v) => writeln!(out, "{tag}: {}", text_block(v)),
        None => Ok(()),
    }
}

/// Wrap multi-line values in `<text>` tags.
fn text_block(value: &str) -> String {
    if value.contains('\n') {
        format!("<text>{value}</text>")
    } else {
        value.to_string()
    }
}
