//! `dpe list-extensions` - Extensions the installer can build
//!
//! Prints a sorted JSON list. Extensions that need a thread-safe PHP build
//! are skipped since no such images are produced.

use crate::builder::IpeData;
use anyhow::{Context, Result};
use std::collections::BTreeSet;

/// Extensions supported on any of `php_versions`, or on any version when
/// the list is empty
pub fn list_extensions<'a>(ipe: &'a IpeData, php_versions: &[String]) -> Vec<&'a str> {
    let mut exts: BTreeSet<&str> = BTreeSet::new();
    if php_versions.is_empty() {
        exts.extend(ipe.supported_extensions(None));
    } else {
        for php in php_versions {
            exts.extend(ipe.supported_extensions(Some(php)));
        }
    }

    exts.into_iter()
        .filter(|ext| {
            let needs_zts = ipe
                .special_requirements(ext)
                .iter()
                .any(|r| !r.negated && r.zts);
            if needs_zts {
                tracing::warn!(ext, "skipping extension that requires ZTS");
            }
            !needs_zts
        })
        .collect()
}

/// Renders [`list_extensions`] as JSON
pub fn render_extensions(ipe: &IpeData, php_versions: &[String]) -> Result<String> {
    serde_json::to_string_pretty(&list_extensions(ipe, php_versions))
        .context("Failed to render extensions")
}
