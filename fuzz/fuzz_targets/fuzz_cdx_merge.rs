#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_assembler::assemble::{cdx, MergeContext, MergeSettings};
use sbom_assembler::config::MergeStrategy;
use sbom_assembler::model::{Encoding, SbomDocument, SbomSpec};
use sbom_assembler::parsers::{CycloneDxParser, SbomParser};

/// Fuzz the CycloneDX merge driver.
///
/// The input is split in half and each half decoded as a BOM; whatever
/// decodes is merged against itself and the other half under every
/// strategy, so reference rewriting sees arbitrary dependency graphs.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let mid = (0..=s.len() / 2).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    let parser = CycloneDxParser::new();
    let boms: Vec<_> = [&s[..mid], &s[mid..]]
        .into_iter()
        .filter_map(|half| match parser.parse_str(half, Encoding::Json) {
            Ok(SbomDocument::CycloneDx(bom)) => Some(bom),
            _ => None,
        })
        .collect();
    let Some(first) = boms.first() else {
        return;
    };
    let inputs = vec![first.clone(), boms.last().unwrap_or(first).clone()];

    for strategy in [
        MergeStrategy::Flat,
        MergeStrategy::Assembly,
        MergeStrategy::Hierarchical,
    ] {
        let mut settings = MergeSettings::new(strategy, SbomSpec::CycloneDx);
        settings.app.name = "fuzz".to_string();
        let mut ctx = MergeContext::new(&settings);
        let _ = cdx::merge(&inputs, &mut ctx);
    }
});
