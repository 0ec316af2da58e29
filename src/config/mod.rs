//! Configuration module for sbom-assembler.
//!
//! - [`AppConfig`]: YAML config file contents, discovered automatically
//! - [`AssembleConfig`]: one assemble run, CLI arguments layered over the file
//! - [`Validatable`]: every section validates itself
//!
//! # Configuration File
//!
//! Place a `.sbom-assembler.yaml` file in your project root or
//! `~/.config/sbom-assembler/`:
//!
//! ```yaml
//! app:
//!   name: my-product
//!   version: v1.0.0
//! assemble:
//!   merge_mode: overwrite
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{DEFAULT_APP_VERSION, DEFAULT_MATCH_STRATEGY, DEFAULT_PRIMARY_PURPOSE};
pub use types::{
    AppConfig, AppIdentity, AssembleConfig, AssembleSection, Author, ChecksumConfig,
    MatchingConfig, MergeMode, MergeStrategy, OutputConfig, Supplier,
};
pub use validation::{validate_output_for, ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, generate_full_example_config, load_config_file,
    load_or_default, ConfigFileError, CONFIG_FILE_NAMES,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// The schema documents every option of `.sbom-assembler.yaml` and can be
/// used by editors for validation and autocompletion.
#[must_use]
pub fn generate_json_schema() -> String {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
