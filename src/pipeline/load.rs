//! Input loading.
//!
//! Inputs are read, hashed and decoded in parallel; results come back in
//! input order so every ordering guarantee of the merge holds.

use crate::error::{AssembleError, ErrorContext, Result};
use crate::model::SbomDocument;
use crate::parsers::{parse_document, DetectedFormat, ParseError};
use crate::utils::sha256_hex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A decoded input together with what was learned while reading it.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub path: PathBuf,
    pub document: SbomDocument,
    pub format: DetectedFormat,
    /// SHA-256 of the raw bytes
    pub digest: String,
}

/// Read, hash and decode one input.
pub fn load_input(path: &Path) -> Result<LoadedInput> {
    let bytes = std::fs::read(path).map_err(|e| AssembleError::io(path, e))?;
    let digest = sha256_hex(&bytes);
    let content = String::from_utf8(bytes).map_err(|e| {
        AssembleError::load(
            format!("reading {}", path.display()),
            ParseError::InvalidStructure(format!("input is not UTF-8: {e}")),
        )
    })?;
    let (document, format) =
        parse_document(&content).with_context(|| format!("decoding {}", path.display()))?;

    tracing::info!(
        "Loaded {} ({} {}, {} components)",
        path.display(),
        format.spec,
        format.encoding,
        document.component_count()
    );
    Ok(LoadedInput {
        path: path.to_path_buf(),
        document,
        format,
        digest,
    })
}

/// Load every path in parallel; `label(i)` names input `i` in errors.
///
/// The first failure in input order is returned.
pub fn load_inputs<F>(paths: &[PathBuf], label: F) -> Result<Vec<LoadedInput>>
where
    F: Fn(usize) -> String + Sync,
{
    let results: Vec<Result<LoadedInput>> = paths
        .par_iter()
        .enumerate()
        .map(|(i, path)| load_input(path).with_context(|| label(i)))
        .collect();
    results.into_iter().collect()
}

/// Fail when two inputs have byte-identical content.
pub fn ensure_distinct(inputs: &[LoadedInput]) -> Result<()> {
    let mut seen: HashMap<&str, &Path> = HashMap::with_capacity(inputs.len());
    for input in inputs {
        if let Some(first) = seen.insert(input.digest.as_str(), input.path.as_path()) {
            return Err(AssembleError::config(format!(
                "duplicate input: {} and {} have identical content (sha256 {})",
                first.display(),
                input.path.display(),
                input.digest
            )));
        }
    }
    Ok(())
}
