//! `dpe tags` and `dpe compare`

use crate::builder::{Catalog, ExtensionSource};
use anyhow::{Context, Result, bail};
use dpe_core::version::{self, CompareOp, DEFAULT_TAG_LEVELS};

/// Renders the version tag mapping of an extension or an explicit list
pub fn tags(catalog: Option<&Catalog>, ext: Option<&str>, versions: &[String]) -> Result<String> {
    let versions = match (ext, catalog) {
        (Some(ext), Some(catalog)) => catalog
            .stable_versions(ext)?
            .with_context(|| format!("Unknown extension {ext}"))?,
        (Some(_), None) => bail!("An extension name requires --catalog"),
        (None, _) if versions.is_empty() => bail!("Pass an extension name or --versions"),
        (None, _) => versions.to_vec(),
    };
    let tags = version::version_tags(&versions, &DEFAULT_TAG_LEVELS);
    serde_json::to_string_pretty(&tags).context("Failed to render tags")
}

/// Compares two versions: the ordering sign without an operator, the
/// operator's verdict with one
pub fn compare(a: &str, b: &str, op: Option<&str>) -> Result<String> {
    match op {
        Some(op) => {
            let op: CompareOp = op.parse()?;
            Ok(version::satisfies(a, op, b).to_string())
        }
        None => Ok(version::compare_sign(a, b).to_string()),
    }
}
