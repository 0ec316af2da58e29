#![no_main]
use libfuzzer_sys::fuzz_target;

/// Fuzz format detection on its own, without decoding.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = sbom_assembler::parsers::detect_format(s);
    }
});
