//! Command line interface for dpe
//!
//! - `matrix`: Build the CI matrix for one extension
//! - `configs`: Expand a matrix document into configurations
//! - `tags`: Map versions to image tags
//! - `compare`: Compare two versions
//! - `image-name`, `image-ref`, `image-refs`: Resolve image names
//! - `list-extensions`: List buildable extensions
//! - `completions`: Generate shell completions
//!
//! Results go to stdout; logs go to stderr.

pub mod completions;
pub mod extensions;
pub mod image;
pub mod matrix;
pub mod versions;

use crate::builder::{Catalog, ExtRef, IpeData, Target};
use crate::infrastructure::{Config, init_logging};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const DEFAULT_CATALOG: &str = "data/catalog.yaml";
const DEFAULT_IPE_DIR: &str = "data";

/// CLI arguments for dpe
#[derive(Parser, Debug)]
#[command(name = "dpe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level or filter directive; `DPE_LOG` and `RUST_LOG` take precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the CI matrix for an extension
    Matrix {
        /// Extension name
        ext: String,
        /// PHP versions, comma-separated
        php: String,
        /// OS refs, e.g. bookworm,alpine3.20
        os: String,
        /// Platforms, e.g. linux/amd64,linux/arm64
        platform: String,
        /// Catalog of extension versions, bundled extensions and images
        #[arg(long, default_value = DEFAULT_CATALOG)]
        catalog: PathBuf,
        /// Directory with the installer's data files
        #[arg(long, default_value = DEFAULT_IPE_DIR)]
        ipe_dir: PathBuf,
        /// Known failures to exclude
        #[arg(long)]
        fail_list: Option<PathBuf>,
    },

    /// Expand a YAML or JSON matrix document
    Configs {
        /// Matrix document
        file: PathBuf,
    },

    /// Map versions to their image tags
    Tags {
        /// Extension to look up in the catalog
        ext: Option<String>,
        /// Explicit versions instead of an extension
        #[arg(long, value_delimiter = ',')]
        versions: Vec<String>,
        /// Catalog of extension versions
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Compare two versions
    Compare {
        /// Left version
        a: String,
        /// Right version
        b: String,
        /// Operator: <, <=, >, >=, =, !=, ~
        op: Option<String>,
    },

    /// Print the image name of an extension on a target
    ImageName {
        /// Extension reference, e.g. redis-6.0.2
        ext_ref: String,
        /// Target, e.g. 8.3-bookworm
        target: String,
    },

    /// Print the image reference of an extension on a target
    ImageRef {
        /// Extension reference, e.g. redis-6.0.2
        ext_ref: String,
        /// Target, e.g. 8.3-bookworm
        target: String,
    },

    /// Print every image reference a release is published under
    ImageRefs {
        /// Extension reference, e.g. redis or redis-6.0.2
        ext_ref: String,
        /// Target, e.g. 8.3-bookworm
        target: String,
        /// Catalog of extension versions
        #[arg(long, default_value = DEFAULT_CATALOG)]
        catalog: PathBuf,
    },

    /// List extensions the installer can build
    ListExtensions {
        /// Only extensions supported on these comma-separated PHP versions
        php: Option<String>,
        /// Directory with the installer's data files
        #[arg(long, default_value = DEFAULT_IPE_DIR)]
        ipe_dir: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn load_config() -> Result<Config> {
    Config::from_env().context("Failed to load configuration")
}

fn parse_refs(ext_ref: &str, target: &str) -> Result<(ExtRef, Target)> {
    let ext_ref = ext_ref
        .parse()
        .with_context(|| format!("Invalid extension reference: {ext_ref}"))?;
    let target = target
        .parse()
        .with_context(|| format!("Invalid target: {target}"))?;
    Ok((ext_ref, target))
}

/// Parse and execute CLI arguments
pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let output = match args.command {
        Command::Matrix {
            ext,
            php,
            os,
            platform,
            catalog,
            ipe_dir,
            fail_list,
        } => {
            let config = load_config()?;
            matrix::build_matrix(
                &config,
                &matrix::MatrixRequest {
                    ext: &ext,
                    php_versions: &split_list(&php),
                    os_refs: &split_list(&os),
                    platforms: &split_list(&platform),
                    catalog: &catalog,
                    ipe_dir: &ipe_dir,
                    fail_list: fail_list.as_deref(),
                },
            )?
        }
        Command::Configs { file } => matrix::expand_configs(&file)?,
        Command::Tags {
            ext,
            versions,
            catalog,
        } => {
            let catalog = catalog.map(Catalog::from_file).transpose()?;
            versions::tags(catalog.as_ref(), ext.as_deref(), &versions)?
        }
        Command::Compare { a, b, op } => versions::compare(&a, &b, op.as_deref())?,
        Command::ImageName { ext_ref, target } => {
            let (ext_ref, target) = parse_refs(&ext_ref, &target)?;
            image::image_name(&load_config()?, &ext_ref, &target)
        }
        Command::ImageRef { ext_ref, target } => {
            let (ext_ref, target) = parse_refs(&ext_ref, &target)?;
            image::image_ref(&load_config()?, &ext_ref, &target)
        }
        Command::ImageRefs {
            ext_ref,
            target,
            catalog,
        } => {
            let (ext_ref, target) = parse_refs(&ext_ref, &target)?;
            let catalog = Catalog::from_file(&catalog)?;
            image::render_image_refs(&load_config()?, &catalog, &ext_ref, &target)?
        }
        Command::ListExtensions { php, ipe_dir } => {
            let ipe = IpeData::from_dir(&ipe_dir)?;
            let php = php.as_deref().map(split_list).unwrap_or_default();
            extensions::render_extensions(&ipe, &php)?
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };
            let completions = completions::generate_completions(shell)?;
            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
                return Ok(());
            }
            completions
        }
    };

    println!("{output}");
    Ok(())
}
