//! **Assemble multiple Software Bills of Materials (SBOMs) into one.**
//!
//! `sbom-assembler` merges several **CycloneDX** or **SPDX** documents into a
//! single document of the same specification. It powers both the
//! `sbom-assembler` command-line tool and a Rust library for programmatic use.
//!
//! ## Strategies
//!
//! - **flat**: every input component at the top level under a new primary.
//! - **assembly**: each input's primary component nested under the new primary.
//! - **hierarchical** (default): each input's components nested under that
//!   input's primary, which sits under the new primary.
//! - **augment**: a designated primary document is enriched in place with
//!   data from secondary documents, matched component by component.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: typed CycloneDX and SPDX documents. The assembler works on
//!   them directly so that every field an input carries survives the merge.
//! - **[`parsers`]** / **[`serializers`]**: readers with content-based format
//!   detection, and writers for each supported encoding.
//! - **[`matching`]**: purl, CPE, name-version and composite matchers used to
//!   find a secondary component's counterpart in the primary document.
//! - **[`assemble`]**: the merge drivers and the [`Assembler`] orchestrator.
//! - **[`pipeline`]**: parallel input loading and output writing.
//!
//! ## Getting Started
//!
//! ```no_run
//! use sbom_assembler::{AssembleConfig, Assembler};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = AssembleConfig {
//!         inputs: vec!["a.cdx.json".into(), "b.cdx.json".into()],
//!         ..AssembleConfig::default()
//!     };
//!     config.app.name = "my-product".to_string();
//!
//!     let outcome = Assembler::new(config).run()?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::struct_excessive_bools,
    clippy::module_name_repetitions,
    clippy::similar_names
)]

pub mod assemble;
pub mod cli;
pub mod config;
pub mod error;
pub mod matching;
pub mod model;
pub mod parsers;
pub mod pipeline;
pub mod serializers;
pub mod utils;

// Re-export main types for convenience
pub use assemble::{AssembleOutcome, Assembler, MergeContext, MergeStats};
pub use config::{
    AppConfig, AppIdentity, AssembleConfig, ConfigError, MatchingConfig, MergeMode,
    MergeStrategy, OutputConfig, Validatable,
};
pub use error::{AssembleError, ErrorContext, OptionContext, Result};
pub use matching::{build_matcher, ComponentMatcher, MatchResult, MatcherConfig};
pub use model::{Encoding, SbomDocument, SbomSpec};
pub use parsers::{detect_format, parse_document, parse_sbom, SbomParser};
pub use serializers::serialize;
