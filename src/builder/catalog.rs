//! Data sources the matrix workflow consults.
//!
//! The traits describe what the workflow needs to know about extensions,
//! PHP-bundled extensions and already-published images. [`Catalog`] is a
//! YAML-file implementation of all three for offline runs:
//!
//! ```yaml
//! extensions:
//!   redis:
//!     versions: ["6.0.2", "5.3.7"]
//!     php_dependencies:
//!       "6.0.2": { min: "7.4.0", max: "8.4.99" }
//!   timezonedb:
//!     versions: ["2024.2", "2024.1"]
//!     version_level: 1
//! bundled:
//!   "8.3-bookworm": [opcache, zip]
//! images:
//!   - namespace: mlocati
//!     name: php-ext-redis
//!     tag: 6.0.2-8.3-bookworm
//!     platforms: [linux/amd64]
//! ```

use super::php_dep::PhpDependency;
use super::target::Target;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Source of published extension releases
pub trait ExtensionSource {
    /// Stable versions of `ext`, or `None` if the index does not know it
    ///
    /// # Errors
    ///
    /// Fails if the index cannot be queried.
    fn stable_versions(&self, ext: &str) -> Result<Option<Vec<String>>>;

    /// PHP constraint of one release
    ///
    /// # Errors
    ///
    /// Fails if the index cannot be queried.
    fn php_dependency(&self, ext: &str, version: &str) -> Result<PhpDependency>;

    /// Prefix length used to narrow the versions of `ext`, if it overrides
    /// the default
    fn version_level(&self, _ext: &str) -> Option<usize> {
        None
    }
}

/// Knows which extensions ship with PHP on a target
pub trait BundledExtensions {
    /// True if `ext` is bundled with PHP on `target`
    ///
    /// # Errors
    ///
    /// Fails if there is no data for `target`.
    fn is_bundled(&self, ext: &str, target: &Target) -> Result<bool>;
}

/// Knows which images are already published
pub trait ImageRegistry {
    /// True if `namespace/name:tag` exists, for `platform` when given
    ///
    /// # Errors
    ///
    /// Fails if the registry cannot be queried.
    fn has_image(&self, namespace: &str, name: &str, tag: &str, platform: Option<&str>)
    -> Result<bool>;
}

/// Catalog entry of one extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogExtension {
    /// Stable versions
    pub versions: Vec<String>,
    /// PHP constraint per version
    pub php_dependencies: BTreeMap<String, PhpDependency>,
    /// Narrowing prefix length override
    pub version_level: Option<usize>,
}

/// A published image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImage {
    /// Registry namespace
    pub namespace: String,
    /// Image name
    pub name: String,
    /// Tag
    pub tag: String,
    /// Platforms the tag was pushed for; empty means any
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// File-backed implementation of every workflow data source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Known extensions
    pub extensions: BTreeMap<String, CatalogExtension>,
    /// Bundled extensions keyed by target string (`8.3-bookworm`)
    pub bundled: BTreeMap<String, Vec<String>>,
    /// Published images
    pub images: Vec<CatalogImage>,
}

impl Catalog {
    /// Parses a YAML catalog
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse catalog")
    }

    /// Reads a YAML catalog file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Invalid catalog: {}", path.display()))
    }
}

impl ExtensionSource for Catalog {
    fn stable_versions(&self, ext: &str) -> Result<Option<Vec<String>>> {
        Ok(self.extensions.get(ext).map(|e| e.versions.clone()))
    }

    fn php_dependency(&self, ext: &str, version: &str) -> Result<PhpDependency> {
        let dependency = self
            .extensions
            .get(ext)
            .and_then(|e| e.php_dependencies.get(version))
            .cloned();
        if dependency.is_none() {
            tracing::debug!(ext, version, "no PHP dependency data, assuming unconstrained");
        }
        Ok(dependency.unwrap_or_default())
    }

    fn version_level(&self, ext: &str) -> Option<usize> {
        self.extensions.get(ext).and_then(|e| e.version_level)
    }
}

impl BundledExtensions for Catalog {
    fn is_bundled(&self, ext: &str, target: &Target) -> Result<bool> {
        let key = target.to_string();
        match self.bundled.get(&key) {
            Some(exts) => Ok(exts.iter().any(|e| e == ext)),
            None => bail!("Missing bundled extensions data for {key}"),
        }
    }
}

impl ImageRegistry for Catalog {
    fn has_image(
        &self,
        namespace: &str,
        name: &str,
        tag: &str,
        platform: Option<&str>,
    ) -> Result<bool> {
        Ok(self.images.iter().any(|image| {
            image.namespace == namespace
                && image.name == name
                && image.tag == tag
                && (image.platforms.is_empty()
                    || platform.is_none_or(|p| image.platforms.iter().any(|ip| ip == p)))
        }))
    }
}
