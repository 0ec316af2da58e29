//! Output handling for assembled documents.

use crate::error::{AssembleError, Result};
use crate::model::{Encoding, SbomDocument};
use crate::serializers::serialize;
use std::io::Write;
use std::path::PathBuf;

/// Target for output - either stdout or a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to stdout
    Stdout,
    /// Write to a file
    File(PathBuf),
}

impl OutputTarget {
    /// Create output target from optional path; an empty path means stdout.
    #[must_use]
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) if !p.as_os_str().is_empty() => Self::File(p),
            _ => Self::Stdout,
        }
    }
}

/// Write text to the target (stdout or file)
pub fn write_output(content: &str, target: &OutputTarget) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|()| stdout.write_all(b"\n"))
                .map_err(|e| AssembleError::write("<stdout>", e))
        }
        OutputTarget::File(path) => {
            std::fs::write(path, content).map_err(|e| AssembleError::write(path, e))?;
            tracing::info!("SBOM written to {}", path.display());
            Ok(())
        }
    }
}

/// Serialize `document` in `encoding` and write it to `target`.
pub fn write_document(
    document: &SbomDocument,
    encoding: Encoding,
    target: &OutputTarget,
) -> Result<()> {
    let content = serialize(document, encoding)?;
    write_output(&content, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cyclonedx::Bom;

    #[test]
    fn test_output_target_from_option() {
        assert_eq!(OutputTarget::from_option(None), OutputTarget::Stdout);
        assert_eq!(OutputTarget::from_option(Some(PathBuf::new())), OutputTarget::Stdout);
        let path = PathBuf::from("/tmp/out.json");
        assert_eq!(
            OutputTarget::from_option(Some(path.clone())),
            OutputTarget::File(path)
        );
    }

    #[test]
    fn test_write_document_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let doc = SbomDocument::CycloneDx(Bom::default());

        write_document(&doc, Encoding::Json, &OutputTarget::File(path.clone())).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"bomFormat\": \"CycloneDX\""));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let doc = SbomDocument::CycloneDx(Bom::default());
        let target = OutputTarget::File(PathBuf::from("/nonexistent/dir/out.json"));
        let err = write_document(&doc, Encoding::Json, &target).unwrap_err();
        assert!(matches!(err, AssembleError::Write { .. }));
    }
}
