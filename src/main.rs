//! sbom-assembler: merge multiple SBOMs into one
//!
//! Combines `CycloneDX` or SPDX documents under a new primary component, or
//! augments a primary document with data from secondary ones.

#![allow(clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sbom_assembler::{
    cli,
    config::{
        AssembleConfig, Author, ChecksumConfig, MergeMode, Supplier, CONFIG_FILE_NAMES,
    },
    model::{Encoding, SbomSpec},
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build long version string with format support info
const fn build_long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\nInput Formats:",
        "\n  CycloneDX: 1.0 - 1.6 (JSON, XML)",
        "\n  SPDX:      2.2, 2.3 (JSON, tag-value, YAML, RDF/XML)",
        "\n\nOutput Formats:",
        "\n  CycloneDX: 1.4, 1.5, 1.6 (JSON, XML)",
        "\n  SPDX:      2.3 (JSON, tag-value, YAML)",
        "\n\nStrategies:",
        "\n  flat, assembly, hierarchical (default), augment"
    )
}

#[derive(Parser)]
#[command(name = "sbom-assembler")]
#[command(version, long_version = build_long_version())]
#[command(about = "Merge multiple SBOMs into one", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Assembled SBOM written
    1  Error occurred

EXAMPLES:
    # Nest two service SBOMs under a new product
    sbom-assembler assemble --name product --app-version v2.1.0 a.cdx.json b.cdx.json

    # Flat merge of SPDX documents, written as tag-value
    sbom-assembler assemble --flat-merge --name product --output-format tag-value \\
        -o product.spdx a.spdx.json b.spdx.json

    # Fill gaps in a primary SBOM from a scanner result
    sbom-assembler assemble --augment-merge --primary app.cdx.json scan.cdx.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `assemble` subcommand
#[derive(Parser)]
struct AssembleArgs {
    /// Input SBOMs, in merge order (secondaries with --augment-merge)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Primary SBOM to augment (requires --augment-merge)
    #[arg(long)]
    primary: Option<PathBuf>,

    /// Place every input component at the top level
    #[arg(long)]
    flat_merge: bool,

    /// Nest each input's primary component under the new primary
    #[arg(long)]
    assembly_merge: bool,

    /// Nest each input's components under that input's primary (default)
    #[arg(long)]
    hierarchical_merge: bool,

    /// Merge the inputs into the document given by --primary
    #[arg(long)]
    augment_merge: bool,

    /// Field policy for matched components in augment mode
    #[arg(long, value_enum)]
    merge_mode: Option<MergeMode>,

    /// Component matcher (composite, purl, cpe, name-version)
    #[arg(long)]
    match_strategy: Option<String>,

    /// Compare purl and CPE versions exactly
    #[arg(long)]
    strict_version: bool,

    /// Accept substring name matches
    #[arg(long)]
    fuzzy_match: bool,

    /// Require equal component types when both are known
    #[arg(long)]
    type_match: bool,

    /// Minimum confidence (0-100) for the composite matcher
    #[arg(long)]
    min_confidence: Option<u8>,

    /// Output specification (defaults to the input specification)
    #[arg(long, value_enum)]
    output_spec: Option<SbomSpec>,

    /// Output specification version
    #[arg(long)]
    output_spec_version: Option<String>,

    /// Output encoding
    #[arg(long, value_enum)]
    output_format: Option<Encoding>,

    /// Output file path (stdout if not specified)
    #[arg(short = 'o', long)]
    output_file: Option<PathBuf>,

    /// Name of the new primary component
    #[arg(long)]
    name: Option<String>,

    /// Version of the new primary component
    #[arg(long)]
    app_version: Option<String>,

    /// Description of the new primary component
    #[arg(long)]
    description: Option<String>,

    /// Package URL of the new primary component
    #[arg(long)]
    purl: Option<String>,

    /// CPE of the new primary component
    #[arg(long)]
    cpe: Option<String>,

    /// Author as "Name <email>" (repeatable)
    #[arg(long = "author", value_name = "AUTHOR")]
    authors: Vec<String>,

    /// Supplier name
    #[arg(long)]
    supplier: Option<String>,

    /// Supplier URL (requires --supplier)
    #[arg(long)]
    supplier_url: Option<String>,

    /// SPDX license id or expression of the new primary component
    #[arg(long)]
    license: Option<String>,

    /// Checksum as ALG=VALUE (repeatable)
    #[arg(long = "checksum", value_name = "ALG=VALUE")]
    checksums: Vec<String>,

    /// Copyright text of the new primary component
    #[arg(long)]
    copyright: Option<String>,

    /// Component type / primary package purpose (e.g. application, library)
    #[arg(long)]
    primary_purpose: Option<String>,
}

impl AssembleArgs {
    /// Layer the arguments over the file-level configuration.
    fn into_config(self, mut config: AssembleConfig) -> Result<AssembleConfig> {
        config.inputs = self.inputs;
        config.primary_file = self.primary;
        config.flat_merge = self.flat_merge;
        config.assembly_merge = self.assembly_merge;
        config.hierarchical_merge = self.hierarchical_merge;
        config.augment_merge = self.augment_merge;
        if let Some(mode) = self.merge_mode {
            config.merge_mode = mode;
        }

        let matching = &mut config.matching;
        if let Some(strategy) = self.match_strategy {
            matching.strategy = strategy;
        }
        matching.strict_version |= self.strict_version;
        matching.fuzzy_match |= self.fuzzy_match;
        matching.type_match |= self.type_match;
        if let Some(min) = self.min_confidence {
            matching.min_confidence = min;
        }

        let output = &mut config.output;
        output.spec = self.output_spec.or(output.spec);
        output.spec_version = self.output_spec_version.or(output.spec_version.take());
        output.format = self.output_format.or(output.format);
        output.file = self.output_file.or(output.file.take());

        let app = &mut config.app;
        if let Some(name) = self.name {
            app.name = name;
        }
        if let Some(version) = self.app_version {
            app.version = version;
        }
        app.description = self.description.or(app.description.take());
        app.purl = self.purl.or(app.purl.take());
        app.cpe = self.cpe.or(app.cpe.take());
        if !self.authors.is_empty() {
            app.authors = self.authors.iter().map(|a| Author::parse(a)).collect();
        }
        if let Some(name) = self.supplier {
            app.supplier = Some(Supplier {
                name,
                url: self.supplier_url,
            });
        } else if self.supplier_url.is_some() {
            anyhow::bail!("--supplier-url requires --supplier");
        }
        app.license = self.license.or(app.license.take());
        if !self.checksums.is_empty() {
            app.checksums = self
                .checksums
                .iter()
                .map(|raw| {
                    ChecksumConfig::parse(raw)
                        .with_context(|| format!("invalid checksum '{raw}', expected ALG=VALUE"))
                })
                .collect::<Result<_>>()?;
        }
        app.copyright = self.copyright.or(app.copyright.take());
        if let Some(purpose) = self.primary_purpose {
            app.primary_purpose = purpose;
        }

        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merge SBOMs into a single document
    Assemble(AssembleArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .sbom-assembler.yaml in the current directory
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for the assembled document
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    match cli.command {
        Commands::Assemble(args) => {
            let (file_config, loaded_from) =
                sbom_assembler::config::load_or_default(cli.config.as_deref());
            if let Some(path) = &loaded_from {
                tracing::debug!("Using config file {}", path.display());
            }
            let config = args.into_config(AssembleConfig::from_app_config(&file_config))?;
            cli::run_assemble(config)
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sbom-assembler", &mut io::stdout());
            Ok(())
        }

        Commands::ConfigSchema { output } => {
            let schema = sbom_assembler::config::generate_json_schema();
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => {
                    println!("{schema}");
                }
            }
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (config, loaded_from) =
                    sbom_assembler::config::load_or_default(cli.config.as_deref());
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml = serde_yaml::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(())
            }
            ConfigAction::Path => {
                let search_paths: [Option<String>; 3] = [
                    std::env::current_dir()
                        .ok()
                        .map(|p| p.display().to_string()),
                    dirs::config_dir().map(|p| p.join("sbom-assembler").display().to_string()),
                    dirs::home_dir().map(|p| p.display().to_string()),
                ];
                eprintln!("Config file search paths (in order):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {path}");
                }
                eprintln!();
                eprintln!("Recognized file names:");
                for name in CONFIG_FILE_NAMES {
                    eprintln!("  {name}");
                }
                eprintln!();
                match sbom_assembler::config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
                Ok(())
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".sbom-assembler.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                let content = sbom_assembler::config::generate_full_example_config();
                std::fs::write(&target, content)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(())
            }
        },
    }
}
