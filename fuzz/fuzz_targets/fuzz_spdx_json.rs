#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_assembler::model::Encoding;
use sbom_assembler::parsers::{SbomParser, SpdxParser};

/// Fuzz the SPDX JSON reader, raw and wrapped as a package list.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let parser = SpdxParser::new();
        let _ = parser.parse_str(s, Encoding::Json);

        if s.len() < 10_000 {
            let wrapped = format!(
                r#"{{"spdxVersion":"SPDX-2.3","SPDXID":"SPDXRef-DOCUMENT","name":"fuzz","documentNamespace":"https://example.com/fuzz","packages":[{s}]}}"#,
            );
            let _ = parser.parse_str(&wrapped, Encoding::Json);
        }
    }
});
