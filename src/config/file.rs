//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::types::AppConfig;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".sbom-assembler.yaml",
    ".sbom-assembler.yml",
    "sbom-assembler.yaml",
    "sbom-assembler.yml",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/sbom-assembler/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    let candidates = [
        std::env::current_dir().ok(),
        find_git_root(),
        dirs::config_dir().map(|d| d.join("sbom-assembler")),
        dirs::home_dir(),
    ];

    candidates
        .iter()
        .flatten()
        .find_map(|dir| find_config_in_dir(dir))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Find the git repository root by walking up the directory tree.
fn find_git_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content from the defaults.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        r"# sbom-assembler configuration
# Place this file at .sbom-assembler.yaml in your project root or ~/.config/sbom-assembler/

{}",
        serde_yaml::to_string(&example).unwrap_or_default()
    )
}

/// Generate a commented example config with all options.
#[must_use]
pub fn generate_full_example_config() -> String {
    r"# sbom-assembler configuration file
# ==================================
#
# Place it at:
#   - .sbom-assembler.yaml in your project root
#   - ~/.config/sbom-assembler/sbom-assembler.yaml for global config
#
# CLI arguments always override file settings.

# Synthetic primary component of the assembled SBOM
app:
  name: my-product
  version: v1.0.0
  # description: Product assembled from per-service SBOMs
  # purl: pkg:generic/acme/my-product@1.0.0
  # cpe: cpe:2.3:a:acme:my-product:1.0.0:*:*:*:*:*:*:*
  authors:
    - name: Jane Doe
      email: jane@example.com
  # supplier:
  #   name: Acme Inc.
  #   url: https://acme.example.com
  # license: Apache-2.0
  checksums: []
  # copyright: (c) Acme Inc.
  primary_purpose: application

# Output document
output:
  # Spec: cyclonedx, spdx (defaults to the input spec)
  # spec: cyclonedx
  # Version: 1.4, 1.5, 1.6 for CycloneDX; 2.3 for SPDX
  # spec_version: '1.6'
  # Format: json, xml (CycloneDX); json, tag-value, yaml (SPDX)
  # format: json
  # Output file path (omit for stdout)
  # file: assembled.cdx.json

# Component matcher used by augment merges
matching:
  # Strategy: composite, purl, cpe, name-version
  strategy: composite
  strict_version: false
  fuzzy_match: false
  type_match: false
  min_confidence: 50

assemble:
  # Merge mode for augment: if-missing-or-empty, overwrite
  merge_mode: if-missing-or-empty
"
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeMode;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".sbom-assembler.yaml");
        std::fs::write(&config_path, "app:\n  name: widget\n").unwrap();

        let found = find_config_in_dir(tmp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");
        let yaml = r"
app:
  name: widget
  version: '2.0'
matching:
  strategy: purl
  strict_version: true
assemble:
  merge_mode: overwrite
";
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.app.name, "widget");
        assert_eq!(config.app.version, "2.0");
        assert_eq!(config.matching.strategy, "purl");
        assert!(config.matching.strict_version);
        assert_eq!(config.assemble.merge_mode, MergeMode::Overwrite);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn test_bad_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("broken.yaml");
        std::fs::write(&config_path, "app: [not, a, mapping").unwrap();

        let (config, loaded_from) = load_or_default(Some(&config_path));
        assert_eq!(config, AppConfig::default());
        assert_eq!(loaded_from, None);
    }

    #[test]
    fn test_full_example_parses() {
        let config: AppConfig = serde_yaml::from_str(&generate_full_example_config()).unwrap();
        assert_eq!(config.app.name, "my-product");
        assert_eq!(config.app.authors.len(), 1);
    }

    #[test]
    fn test_generate_example_config() {
        let example = generate_example_config();
        assert!(example.contains("matching:"));
        assert!(example.contains("merge_mode"));
    }
}
