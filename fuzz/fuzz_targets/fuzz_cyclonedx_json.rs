#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_assembler::model::Encoding;
use sbom_assembler::parsers::{CycloneDxParser, SbomParser};

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

/// Fuzz the CycloneDX JSON reader directly.
///
/// Input is also wrapped as a component list so the fuzzer reaches the
/// component decoding rather than failing on the envelope.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let parser = CycloneDxParser::new();
        let _ = parser.parse_str(s, Encoding::Json);

        if s.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped = format!(
                r#"{{"bomFormat":"CycloneDX","specVersion":"1.5","components":[{s}]}}"#,
            );
            let _ = parser.parse_str(&wrapped, Encoding::Json);
        }
    }
});
