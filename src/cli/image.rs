//! `dpe image-name`, `dpe image-ref` and `dpe image-refs`
//!
//! Resolve the image an extension reference builds for a target, using the
//! naming templates from the environment.

use crate::builder::{Catalog, ExtRef, ExtensionSource, Target};
use crate::infrastructure::Config;
use anyhow::{Context, Result, bail};
use dpe_core::VersionTags;
use dpe_core::version::{DEFAULT_TAG_LEVELS, version_tags};

/// Image name for `ext_ref` on `target`
pub fn image_name(config: &Config, ext_ref: &ExtRef, target: &Target) -> String {
    config.image_name(target, &ext_ref.name, ext_ref.version_or_empty())
}

/// Full image reference for `ext_ref` on `target`
pub fn image_ref(config: &Config, ext_ref: &ExtRef, target: &Target) -> String {
    config.image_ref(target, &ext_ref.name, ext_ref.version_or_empty())
}

/// Every image reference a release is published under.
///
/// Versions come from `source`; each tag of each version becomes an image
/// reference, the empty tag standing for the latest one. With a pinned
/// version only that version's references are returned. A bundled
/// extension has only the latest reference.
pub fn image_refs(
    config: &Config,
    source: &dyn ExtensionSource,
    ext_ref: &ExtRef,
    target: &Target,
) -> Result<serde_json::Value> {
    if ext_ref.is_bundled() {
        return Ok(serde_json::json!([config.image_ref(target, &ext_ref.name, "")]));
    }
    let Some(versions) = source.stable_versions(&ext_ref.name)? else {
        bail!("Unknown extension {}", ext_ref.name);
    };
    let refs: VersionTags = version_tags(&versions, &DEFAULT_TAG_LEVELS)
        .map_tags(|tag| config.image_ref(target, &ext_ref.name, tag));

    let value = match &ext_ref.version {
        Some(version) => {
            let refs = refs
                .get(version)
                .with_context(|| format!("Unknown version {version} of {}", ext_ref.name))?;
            serde_json::to_value(refs)?
        }
        None => serde_json::to_value(&refs)?,
    };
    Ok(value)
}

/// Loads the catalog and renders [`image_refs`]
pub fn render_image_refs(
    config: &Config,
    catalog: &Catalog,
    ext_ref: &ExtRef,
    target: &Target,
) -> Result<String> {
    let refs = image_refs(config, catalog, ext_ref, target)?;
    serde_json::to_string_pretty(&refs).context("Failed to render image refs")
}
