//! Assemble command handler.

use crate::assemble::Assembler;
use crate::config::AssembleConfig;
use crate::pipeline::{write_document, OutputTarget};
use anyhow::{Context, Result};

/// Run the assemble command: merge the inputs and write the result.
#[allow(clippy::needless_pass_by_value)]
pub fn run_assemble(config: AssembleConfig) -> Result<()> {
    let target = OutputTarget::from_option(config.output.file.clone());
    let outcome = Assembler::new(config).run()?;
    tracing::info!("{outcome}");

    write_document(&outcome.document, outcome.encoding, &target)
        .context("failed to write assembled SBOM")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppIdentity, MergeStrategy};

    const SPDX_A: &str = "SPDXVersion: SPDX-2.3\nDataLicense: CC0-1.0\nSPDXID: SPDXRef-DOCUMENT\n\
DocumentName: a\nDocumentNamespace: https://example.com/a\nCreator: Tool: test\n\
Created: 2024-01-01T00:00:00Z\n\nPackageName: a\nSPDXID: SPDXRef-a\nPackageVersion: 1.0\n\
PackageDownloadLocation: NOASSERTION\nRelationship: SPDXRef-DOCUMENT DESCRIBES SPDXRef-a\n";

    #[test]
    fn test_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.spdx");
        let b = dir.path().join("b.spdx");
        std::fs::write(&a, SPDX_A).unwrap();
        std::fs::write(&b, SPDX_A.replace("example.com/a", "example.com/b").replace("PackageName: a", "PackageName: b")).unwrap();
        let out = dir.path().join("out.spdx.json");

        let mut config = AssembleConfig {
            inputs: vec![a, b],
            app: AppIdentity {
                name: "product".to_string(),
                ..AppIdentity::default()
            },
            ..AssembleConfig::default()
        }
        .with_strategy(MergeStrategy::Flat);
        config.output.file = Some(out.clone());

        run_assemble(config).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("\"SPDXRef-RootPackage\""));
    }

    #[test]
    fn test_error_surfaces_cause() {
        let config = AssembleConfig {
            inputs: vec!["only-one.json".into()],
            ..AssembleConfig::default()
        };
        let err = run_assemble(config).unwrap_err();
        assert!(format!("{err:#}").contains("at least 2 inputs"));
    }
}
