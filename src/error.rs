//! Unified error types for sbom-assembler.
//!
//! Every fatal condition of an assembly run maps to one variant of
//! [`AssembleError`]. Non-fatal conditions (dangling references, unmatched
//! components) never surface here; they are counted in
//! [`MergeStats`](crate::assemble::MergeStats) instead.

use crate::parsers::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sbom-assembler operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AssembleError {
    /// An input could not be opened or decoded
    #[error("Failed to load SBOM: {context}")]
    Load {
        context: String,
        #[source]
        source: ParseError,
    },

    /// Inputs (or the requested output) do not share one specification
    #[error("SBOM specification mismatch: {0}")]
    SpecMismatch(String),

    /// Invalid combination of options
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The detected or requested format is not implemented
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Unknown matcher strategy or matcher knob out of range
    #[error("Invalid matcher configuration: {0}")]
    MatcherConfig(String),

    /// The output could not be serialized or written
    #[error("Failed to write output: {context}")]
    Write {
        context: String,
        #[source]
        source: WriteErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Specific write error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WriteErrorKind {
    #[error("Serialization failed: {0}")]
    Serialize(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for sbom-assembler operations
pub type Result<T> = std::result::Result<T, AssembleError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl AssembleError {
    /// Create a load error with context
    pub fn load(context: impl Into<String>, source: ParseError) -> Self {
        Self::Load {
            context: context.into(),
            source,
        }
    }

    /// Create a spec mismatch error
    pub fn spec_mismatch(message: impl Into<String>) -> Self {
        Self::SpecMismatch(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an unsupported format error
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(message.into())
    }

    /// Create a matcher configuration error
    pub fn matcher_config(message: impl Into<String>) -> Self {
        Self::MatcherConfig(message.into())
    }

    /// Create a serialization error
    pub fn serialize(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            context: context.into(),
            source: WriteErrorKind::Serialize(message.into()),
        }
    }

    /// Create a write error from an IO failure on the output
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::Write {
            context: format!("writing {}", path.display()),
            source: WriteErrorKind::Io(source),
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let message = format!("{source}");
        Self::Io {
            path: Some(path.into()),
            message,
            source,
        }
    }

    /// Whether this error is a load failure (bad or unreadable input).
    #[must_use]
    pub const fn is_load(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Io { .. })
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for AssembleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<ParseError> for AssembleError {
    fn from(err: ParseError) -> Self {
        Self::load("", err)
    }
}

impl From<serde_json::Error> for AssembleError {
    fn from(err: serde_json::Error) -> Self {
        Self::load("JSON deserialization", ParseError::Json(err.to_string()))
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Context strings are prepended to the existing context of the error, so a
/// failure deep inside a driver reads as a path through the run:
///
/// ```ignore
/// use sbom_assembler::error::ErrorContext;
///
/// augment_one(&mut primary, secondary)
///     .with_context(|| format!("failed to process secondary SBOM {n}"))?;
/// ```
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<AssembleError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: AssembleError, new_ctx: &str) -> AssembleError {
    match err {
        AssembleError::Load {
            context: existing,
            source,
        } => AssembleError::Load {
            context: chain_context(new_ctx, &existing),
            source,
        },
        AssembleError::Write {
            context: existing,
            source,
        } => AssembleError::Write {
            context: chain_context(new_ctx, &existing),
            source,
        },
        AssembleError::Io {
            path,
            message,
            source,
        } => AssembleError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        AssembleError::SpecMismatch(msg) => {
            AssembleError::SpecMismatch(chain_context(new_ctx, &msg))
        }
        AssembleError::Config(msg) => AssembleError::Config(chain_context(new_ctx, &msg)),
        AssembleError::UnsupportedFormat(msg) => {
            AssembleError::UnsupportedFormat(chain_context(new_ctx, &msg))
        }
        AssembleError::MatcherConfig(msg) => {
            AssembleError::MatcherConfig(chain_context(new_ctx, &msg))
        }
    }
}

/// Chain two context strings together.
///
/// Returns "`new`: `existing`", or just `new` when nothing was recorded yet.
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to a configuration error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to a configuration error with context from a closure.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| AssembleError::config(context))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| AssembleError::config(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chains_on_load_errors() {
        let result: std::result::Result<(), ParseError> =
            Err(ParseError::UnknownFormat("no markers".to_string()));
        let err = result
            .context("reading a.json")
            .context("failed to process secondary SBOM 2")
            .unwrap_err();

        match &err {
            AssembleError::Load { context, .. } => {
                assert_eq!(context, "failed to process secondary SBOM 2: reading a.json");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.is_load());
    }

    #[test]
    fn test_context_on_message_variants() {
        let result: Result<()> = Err(AssembleError::config("two strategies set"));
        let err = result.context("validating").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: validating: two strategies set"
        );
    }

    #[test]
    fn test_with_context_is_lazy() {
        let ok: Result<u8> = Ok(1);
        let value = ok
            .with_context(|| -> String { panic!("must not be evaluated") })
            .unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn test_option_context() {
        let none: Option<u8> = None;
        let err = none.context_none("primary file is required").unwrap_err();
        assert!(matches!(err, AssembleError::Config(_)));
        assert_eq!(Some(3).context_none("unused").unwrap(), 3);
    }

    #[test]
    fn test_io_conversion_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AssembleError::io("/tmp/x.json", io);
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_write_error_display() {
        let err = AssembleError::serialize("CycloneDX XML", "bad element");
        assert_eq!(
            err.to_string(),
            "Failed to write output: CycloneDX XML"
        );
    }
}
