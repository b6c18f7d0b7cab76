//! `dpe matrix` and `dpe configs`
//!
//! `matrix` runs the build matrix workflow for one extension and prints the
//! `{ "matrix": ..., "count": n }` document. `configs` expands an existing
//! matrix document into its configuration list.
//!
//! ## Usage
//!
//! ```bash
//! dpe matrix redis 8.2,8.3 bookworm,alpine3.20 linux/amd64,linux/arm64 \
//!     --catalog data/catalog.yaml --ipe-dir data --fail-list data/fail-list.tsv
//! dpe configs matrix.yaml
//! ```

use crate::builder::{Catalog, IpeData, MatrixWorkflow, OsId, parse_os_ref};
use crate::infrastructure::Config;
use anyhow::{Context, Result};
use dpe_core::{Configuration, FailList, Matrix};
use std::path::Path;

/// Inputs of the `matrix` command
#[derive(Debug)]
pub struct MatrixRequest<'a> {
    /// Extension name
    pub ext: &'a str,
    /// Requested PHP versions
    pub php_versions: &'a [String],
    /// Requested OS refs
    pub os_refs: &'a [String],
    /// Requested platforms
    pub platforms: &'a [String],
    /// Catalog file
    pub catalog: &'a Path,
    /// Directory holding the installer data files
    pub ipe_dir: &'a Path,
    /// Optional fail list
    pub fail_list: Option<&'a Path>,
}

/// Runs the workflow and renders the output document
pub fn build_matrix(config: &Config, request: &MatrixRequest<'_>) -> Result<String> {
    let catalog = Catalog::from_file(request.catalog)?;
    let ipe = IpeData::from_dir(request.ipe_dir)?;
    let os_targets = request
        .os_refs
        .iter()
        .map(|r| parse_os_ref(r))
        .collect::<Result<Vec<(OsId, String)>, _>>()
        .context("Invalid OS target")?;
    let fail_list = request
        .fail_list
        .map(|path| FailList::from_file(path, Some(request.ext)))
        .transpose()?;

    let mut workflow = MatrixWorkflow::new(config, &catalog, &catalog, &catalog, &ipe);
    if let Some(fail_list) = &fail_list {
        workflow = workflow.with_fail_list(fail_list);
    }
    let output = workflow.build(
        request.ext,
        request.php_versions,
        &os_targets,
        request.platforms,
    )?;
    serde_json::to_string_pretty(&output).context("Failed to render matrix")
}

/// Expands a YAML or JSON matrix document into its configurations
pub fn expand_configs(file: &Path) -> Result<String> {
    let document = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read matrix: {}", file.display()))?;
    let matrix: Matrix = serde_yaml::from_str(&document)
        .with_context(|| format!("Invalid matrix document: {}", file.display()))?;
    let configs: Vec<Configuration> = matrix.configs().collect();
    tracing::debug!(count = configs.len(), "expanded matrix");
    serde_json::to_string_pretty(&configs).context("Failed to render configurations")
}
