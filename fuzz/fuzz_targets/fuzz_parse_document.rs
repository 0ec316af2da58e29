#![no_main]
use libfuzzer_sys::fuzz_target;

/// Fuzz the main document entry point.
///
/// Feeds arbitrary UTF-8 strings to `parse_document`, which runs format
/// detection and dispatches to the matching reader.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = sbom_assembler::parsers::parse_document(s);
    }
});
