//! Extension installer data files.
//!
//! Both files list one extension per line as `name value...`, with `#`
//! comments. `supported-extensions` maps an extension to the PHP versions
//! it installs on; `special-requirements` maps it to requirement strings.

use super::errors::RequirementError;
use super::requirement::IpeRequirement;
use super::target::Target;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the supported extensions file
pub const SUPPORTED_EXTENSIONS_FILE: &str = "supported-extensions";
/// Name of the special requirements file
pub const SPECIAL_REQUIREMENTS_FILE: &str = "special-requirements";

fn parse_table(data: &str) -> BTreeMap<String, Vec<String>> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            Some((name.to_string(), fields.map(ToString::to_string).collect()))
        })
        .collect()
}

/// Parsed installer data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpeData {
    supported: BTreeMap<String, Vec<String>>,
    requirements: BTreeMap<String, Vec<IpeRequirement>>,
}

impl IpeData {
    /// Parses the contents of both files
    ///
    /// # Errors
    ///
    /// Fails on a malformed special requirement.
    pub fn parse(supported: &str, special: &str) -> Result<Self, RequirementError> {
        let requirements = parse_table(special)
            .into_iter()
            .map(|(ext, reqs)| {
                let parsed = reqs
                    .iter()
                    .map(|r| r.parse())
                    .collect::<Result<Vec<IpeRequirement>, _>>()?;
                Ok::<_, RequirementError>((ext, parsed))
            })
            .collect::<Result<_, RequirementError>>()?;
        Ok(Self {
            supported: parse_table(supported),
            requirements,
        })
    }

    /// Loads both files from `dir`
    ///
    /// # Errors
    ///
    /// Fails if a file cannot be read or a requirement is malformed.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read installer data: {}", path.display()))
        };
        let data = Self::parse(
            &read(SUPPORTED_EXTENSIONS_FILE)?,
            &read(SPECIAL_REQUIREMENTS_FILE)?,
        )?;
        tracing::debug!(
            extensions = data.supported.len(),
            dir = %dir.display(),
            "loaded installer data"
        );
        Ok(data)
    }

    /// Supported extensions, optionally only those installable on `php`
    #[must_use]
    pub fn supported_extensions(&self, php: Option<&str>) -> Vec<&str> {
        self.supported
            .iter()
            .filter(|(_, versions)| php.is_none_or(|php| versions.iter().any(|v| v == php)))
            .map(|(ext, _)| ext.as_str())
            .collect()
    }

    /// True if the installer knows `ext`
    #[must_use]
    pub fn is_extension_supported(&self, ext: &str) -> bool {
        self.supported.contains_key(ext)
    }

    /// True if the installer can install `ext` on `php`
    #[must_use]
    pub fn is_php_version_supported(&self, ext: &str, php: &str) -> bool {
        self.supported
            .get(ext)
            .is_some_and(|versions| versions.iter().any(|v| v == php))
    }

    /// True if `ext` installs on `target` and meets every special requirement
    #[must_use]
    pub fn is_supported(&self, ext: &str, target: &Target) -> bool {
        self.is_php_version_supported(ext, &target.php_version)
            && self
                .special_requirements(ext)
                .iter()
                .all(|r| r.test_target(target))
    }

    /// Special requirements of `ext`
    #[must_use]
    pub fn special_requirements(&self, ext: &str) -> &[IpeRequirement] {
        self.requirements
            .get(ext)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
