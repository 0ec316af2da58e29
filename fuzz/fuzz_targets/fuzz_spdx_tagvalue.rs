#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_assembler::model::Encoding;
use sbom_assembler::parsers::{SbomParser, SpdxParser};

/// Fuzz the SPDX tag-value line parser behind a valid header.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let parser = SpdxParser::new();
        let _ = parser.parse_str(s, Encoding::TagValue);

        if s.len() < 10_000 {
            let wrapped = format!(
                "SPDXVersion: SPDX-2.3\nDataLicense: CC0-1.0\nSPDXID: SPDXRef-DOCUMENT\nDocumentName: fuzz\nDocumentNamespace: https://example.com/fuzz\n{s}",
            );
            let _ = parser.parse_str(&wrapped, Encoding::TagValue);
        }
    }
});
