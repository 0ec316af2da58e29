//! Parser trait definitions and error types.

use crate::model::{Encoding, SbomDocument, SbomSpec};
use thiserror::Error;

/// Errors that can occur while decoding an SBOM
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("tag-value parse error at line {line}: {message}")]
    TagValue { line: usize, message: String },

    #[error("Invalid SBOM structure: {0}")]
    InvalidStructure(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown SBOM format: {0}")]
    UnknownFormat(String),
}

impl ParseError {
    pub(crate) fn tag_value(line: usize, message: impl Into<String>) -> Self {
        Self::TagValue {
            line,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Trait implemented by each specification's reader
pub trait SbomParser {
    /// Specification this parser reads.
    fn spec(&self) -> SbomSpec;

    /// Encodings this parser can decode.
    fn supported_encodings(&self) -> &'static [Encoding];

    /// Decode `content`, already known to be in `encoding`.
    fn parse_str(&self, content: &str, encoding: Encoding) -> Result<SbomDocument, ParseError>;

    /// Human-readable format name.
    fn format_name(&self) -> &'static str;

    /// Whether this parser can decode `encoding`.
    fn supports(&self, encoding: Encoding) -> bool {
        self.supported_encodings().contains(&encoding)
    }
}
