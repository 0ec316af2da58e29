//! Assembly orchestrator: validation, loading, spec resolution and driver
//! dispatch for one run.

use super::context::{MergeContext, MergeSettings, MergeStats};
use super::{cdx, spdx};
use crate::config::{validate_output_for, AssembleConfig, MergeStrategy, Validatable};
use crate::error::{AssembleError, OptionContext, Result};
use crate::matching::{build_matcher, MatcherConfig};
use crate::model::{Encoding, SbomDocument, SbomSpec};
use crate::pipeline::{ensure_distinct, load_inputs, LoadedInput};
use std::fmt;

/// Result of a successful run, ready to be written.
#[derive(Debug, Clone)]
pub struct AssembleOutcome {
    pub document: SbomDocument,
    pub encoding: Encoding,
    pub strategy: MergeStrategy,
    pub input_count: usize,
    pub stats: MergeStats,
}

impl fmt::Display for AssembleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} merge of {} inputs: {} {} components, {}",
            self.strategy,
            self.input_count,
            self.document.component_count(),
            self.document.spec(),
            self.stats
        )
    }
}

/// Runs one assembly described by an [`AssembleConfig`].
#[derive(Debug, Clone)]
pub struct Assembler {
    config: AssembleConfig,
}

impl Assembler {
    #[must_use]
    pub const fn new(config: AssembleConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &AssembleConfig {
        &self.config
    }

    /// Validate, load, merge. Nothing is written.
    pub fn run(&self) -> Result<AssembleOutcome> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(AssembleError::config(messages.join("; ")));
        }

        let matching = &self.config.matching;
        let matcher = MatcherConfig::from_settings(
            &matching.strategy,
            matching.strict_version,
            matching.fuzzy_match,
            matching.type_match,
            matching.min_confidence,
        )?;

        match self.config.strategy() {
            MergeStrategy::Augment => self.run_augment(matcher),
            strategy => self.run_build(strategy, matcher),
        }
    }

    fn run_build(&self, strategy: MergeStrategy, matcher: MatcherConfig) -> Result<AssembleOutcome> {
        let inputs = load_inputs(&self.config.inputs, |i| {
            format!("failed to process input SBOM {}", i + 1)
        })?;
        ensure_distinct(&inputs)?;
        let spec = common_spec(&inputs)?;
        let (version, encoding) = self.resolve_output(spec, None)?;

        let settings = self.settings(strategy, matcher, spec, version);
        let mut ctx = MergeContext::new(&settings);
        let document = {
            let _guard = ctx.span().entered();
            match spec {
                SbomSpec::CycloneDx => {
                    let boms: Vec<_> = inputs
                        .into_iter()
                        .filter_map(|i| match i.document {
                            SbomDocument::CycloneDx(bom) => Some(bom),
                            SbomDocument::Spdx(_) => None,
                        })
                        .collect();
                    SbomDocument::CycloneDx(cdx::merge(&boms, &mut ctx))
                }
                SbomSpec::Spdx => {
                    let docs: Vec<_> = inputs
                        .into_iter()
                        .filter_map(|i| match i.document {
                            SbomDocument::Spdx(doc) => Some(doc),
                            SbomDocument::CycloneDx(_) => None,
                        })
                        .collect();
                    SbomDocument::Spdx(spdx::merge(&docs, &mut ctx))
                }
            }
        };
        ctx.stats.log();

        Ok(AssembleOutcome {
            document,
            encoding,
            strategy,
            input_count: self.config.inputs.len(),
            stats: ctx.stats,
        })
    }

    fn run_augment(&self, matcher: MatcherConfig) -> Result<AssembleOutcome> {
        let primary_file = self
            .config
            .primary_file
            .clone()
            .context_none("Augment merge requires a primary file")?;
        let mut paths = Vec::with_capacity(self.config.inputs.len() + 1);
        paths.push(primary_file);
        paths.extend(self.config.inputs.iter().cloned());

        let mut loaded = load_inputs(&paths, |i| {
            if i == 0 {
                "failed to load primary SBOM".to_string()
            } else {
                format!("failed to process secondary SBOM {i}")
            }
        })?;
        ensure_distinct(&loaded)?;
        let spec = common_spec(&loaded)?;
        let primary = loaded.remove(0);
        let (version, encoding) = self.resolve_output(spec, primary.format.version.as_deref())?;

        let settings = self.settings(MergeStrategy::Augment, matcher, spec, version);
        let matcher = build_matcher(&settings.matcher);
        let mut ctx = MergeContext::new(&settings);
        let document = {
            let _guard = ctx.span().entered();
            match primary.document {
                SbomDocument::CycloneDx(mut bom) => {
                    let secondaries: Vec<_> = loaded
                        .into_iter()
                        .filter_map(|i| match i.document {
                            SbomDocument::CycloneDx(bom) => Some(bom),
                            SbomDocument::Spdx(_) => None,
                        })
                        .collect();
                    cdx::augment(&mut bom, &secondaries, matcher.as_ref(), &mut ctx);
                    SbomDocument::CycloneDx(bom)
                }
                SbomDocument::Spdx(mut doc) => {
                    let secondaries: Vec<_> = loaded
                        .into_iter()
                        .filter_map(|i| match i.document {
                            SbomDocument::Spdx(doc) => Some(doc),
                            SbomDocument::CycloneDx(_) => None,
                        })
                        .collect();
                    spdx::augment(&mut doc, &secondaries, matcher.as_ref(), &mut ctx);
                    SbomDocument::Spdx(doc)
                }
            }
        };
        ctx.stats.log();

        Ok(AssembleOutcome {
            document,
            encoding,
            strategy: MergeStrategy::Augment,
            input_count: paths.len(),
            stats: ctx.stats,
        })
    }

    /// Output version and encoding for `spec`.
    ///
    /// Without an explicit version, augment keeps the primary's version when
    /// this tool can write it; otherwise the newest supported version is used.
    fn resolve_output(&self, spec: SbomSpec, primary_version: Option<&str>) -> Result<(String, Encoding)> {
        let output = &self.config.output;
        if let Some(requested) = output.spec {
            if requested != spec {
                return Err(AssembleError::spec_mismatch(format!(
                    "output spec {requested} does not match input spec {spec}"
                )));
            }
        }
        let errors = validate_output_for(output, spec);
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(AssembleError::config(messages.join("; ")));
        }

        let supported = spec.supported_output_versions();
        let inherited = primary_version
            .map(|v| v.trim_start_matches("SPDX-"))
            .filter(|v| supported.contains(v));
        let version = output
            .spec_version
            .clone()
            .or_else(|| inherited.map(str::to_string))
            .unwrap_or_else(|| spec.default_output_version().to_string());
        Ok((version, output.format.unwrap_or(Encoding::Json)))
    }

    fn settings(
        &self,
        strategy: MergeStrategy,
        matcher: MatcherConfig,
        spec: SbomSpec,
        version: String,
    ) -> MergeSettings {
        MergeSettings {
            strategy,
            merge_mode: self.config.merge_mode,
            matcher,
            app: self.config.app.clone(),
            output_spec: spec,
            output_spec_version: version,
        }
    }
}

/// The spec shared by every input.
fn common_spec(inputs: &[LoadedInput]) -> Result<SbomSpec> {
    let first = inputs
        .first()
        .map(|i| i.document.spec())
        .context_none("no inputs")?;
    for input in &inputs[1..] {
        let spec = input.document.spec();
        if spec != first {
            return Err(AssembleError::spec_mismatch(format!(
                "{} is {spec}, expected {first} like {}",
                input.path.display(),
                inputs[0].path.display()
            )));
        }
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppIdentity;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn cdx(name: &str) -> String {
        format!(
            r#"{{"bomFormat":"CycloneDX","specVersion":"1.5","metadata":{{"component":{{"type":"application","name":"{name}","version":"1.0","bom-ref":"{name}"}}}}}}"#
        )
    }

    fn config(inputs: Vec<PathBuf>) -> AssembleConfig {
        AssembleConfig {
            inputs,
            app: AppIdentity {
                name: "app".to_string(),
                ..AppIdentity::default()
            },
            ..AssembleConfig::default()
        }
    }

    #[test]
    fn test_two_strategies_rejected() {
        let mut config = config(vec![PathBuf::from("a"), PathBuf::from("b")]);
        config.flat_merge = true;
        config.assembly_merge = true;
        let err = Assembler::new(config).run().unwrap_err();
        assert!(matches!(err, AssembleError::Config(_)));
    }

    #[test]
    fn test_unknown_match_strategy_rejected() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.json", &cdx("alpha"));
        let b = write(&dir, "b.json", &cdx("beta"));
        let mut config = config(vec![a, b]);
        config.matching.strategy = "levenshtein".to_string();
        let err = Assembler::new(config).run().unwrap_err();
        assert!(matches!(err, AssembleError::MatcherConfig(_)));
    }

    #[test]
    fn test_mixed_specs_rejected() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.json", &cdx("alpha"));
        let b = write(
            &dir,
            "b.spdx",
            "SPDXVersion: SPDX-2.3\nDataLicense: CC0-1.0\nSPDXID: SPDXRef-DOCUMENT\nDocumentName: b\n",
        );
        let err = Assembler::new(config(vec![a, b])).run().unwrap_err();
        assert!(matches!(err, AssembleError::SpecMismatch(_)));
    }

    #[test]
    fn test_output_spec_must_match_inputs() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.json", &cdx("alpha"));
        let b = write(&dir, "b.json", &cdx("beta"));
        let mut config = config(vec![a, b]);
        config.output.spec = Some(SbomSpec::Spdx);
        let err = Assembler::new(config).run().unwrap_err();
        assert!(matches!(err, AssembleError::SpecMismatch(_)));
    }

    #[test]
    fn test_default_run_is_hierarchical_cdx_json() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.json", &cdx("alpha"));
        let b = write(&dir, "b.json", &cdx("beta"));
        let outcome = Assembler::new(config(vec![a, b])).run().unwrap();

        assert_eq!(outcome.strategy, MergeStrategy::Hierarchical);
        assert_eq!(outcome.encoding, Encoding::Json);
        let bom = outcome.document.as_cyclonedx().unwrap();
        assert_eq!(bom.spec_version, "1.6");
        assert_eq!(bom.components.len(), 2);
        assert!(outcome.to_string().starts_with("hierarchical merge of 2 inputs"));
    }

    #[test]
    fn test_augment_keeps_primary_version() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "p.json", &cdx("alpha"));
        let secondary = write(&dir, "s.json", &cdx("beta"));
        let mut config = AssembleConfig {
            inputs: vec![secondary],
            primary_file: Some(primary),
            ..AssembleConfig::default()
        };
        config.augment_merge = true;

        let outcome = Assembler::new(config).run().unwrap();
        let bom = outcome.document.as_cyclonedx().unwrap();
        assert_eq!(bom.spec_version, "1.5");
        assert_eq!(bom.components.len(), 1);
        assert_eq!(outcome.stats.added, 1);
    }

    #[test]
    fn test_absent_values_are_config_errors() {
        let err = common_spec(&[]).unwrap_err();
        assert!(matches!(err, AssembleError::Config(_)));

        let assembler = Assembler::new(config(vec![PathBuf::from("a.json")]));
        let err = assembler.run_augment(MatcherConfig::default()).unwrap_err();
        assert!(err.to_string().contains("requires a primary file"));
    }

    #[test]
    fn test_missing_secondary_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "p.json", &cdx("alpha"));
        let mut config = AssembleConfig {
            inputs: vec![dir.path().join("missing.json")],
            primary_file: Some(primary),
            ..AssembleConfig::default()
        };
        config.augment_merge = true;

        let err = Assembler::new(config).run().unwrap_err();
        assert!(err.to_string().contains("failed to process secondary SBOM 1"));
    }
}
