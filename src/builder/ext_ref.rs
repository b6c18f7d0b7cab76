//! Extension references in the installer's `<name>[-[^]<version>[@channel]]` form.

use super::errors::RefError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version string marking an extension that ships with PHP
pub const BUNDLED: &str = "bundled";

static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(bundled|[\d.]+)$").expect("valid regex"));
static VERSION_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?<compatible>\^)?(?<version>[^\-@]+)(?:@(?<channel>alpha|beta|stable|snapshot|devel))?$")
        .expect("valid regex")
});

/// Release channel of an extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Alpha releases
    Alpha,
    /// Beta releases
    Beta,
    /// Stable releases
    Stable,
    /// Snapshots
    Snapshot,
    /// Development builds
    Devel,
}

impl Channel {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Stable => "stable",
            Self::Snapshot => "snapshot",
            Self::Devel => "devel",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "stable" => Ok(Self::Stable),
            "snapshot" => Ok(Self::Snapshot),
            "devel" => Ok(Self::Devel),
            other => Err(RefError::InvalidSpec(other.to_string())),
        }
    }
}

/// A reference to an extension, optionally pinned to a version or channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtRef {
    /// Extension name
    pub name: String,
    /// Exact or `^`-compatible version, or `bundled`
    pub version: Option<String>,
    /// Whether the version was given with `^`; unset when no version
    /// pattern was involved
    pub compatible: Option<bool>,
    /// Release channel
    pub channel: Option<Channel>,
}

impl ExtRef {
    /// Creates a reference to the latest release of `name`
    ///
    /// # Errors
    ///
    /// [`RefError::EmptyName`] for an empty name.
    pub fn new(name: impl Into<String>) -> Result<Self, RefError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RefError::EmptyName);
        }
        Ok(Self {
            name,
            version: None,
            compatible: None,
            channel: None,
        })
    }

    /// Sets the version
    ///
    /// # Errors
    ///
    /// [`RefError::InvalidVersion`] unless the version is `bundled` or dotted
    /// digits.
    pub fn with_version(mut self, version: impl Into<String>) -> Result<Self, RefError> {
        let version = version.into();
        if !VERSION.is_match(&version) {
            return Err(RefError::InvalidVersion(version));
        }
        self.version = Some(version);
        Ok(self)
    }

    /// True for the PHP-bundled version
    #[must_use]
    pub fn is_bundled(&self) -> bool {
        self.version.as_deref() == Some(BUNDLED)
    }

    /// Version or the empty string
    #[must_use]
    pub fn version_or_empty(&self) -> &str {
        self.version.as_deref().unwrap_or_default()
    }
}

impl FromStr for ExtRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, spec)) = s.rsplit_once('-') else {
            return Self::new(s);
        };
        if spec.is_empty() {
            return Self::new(s);
        }
        let ext = Self::new(name)?;
        if spec == BUNDLED {
            return ext.with_version(BUNDLED);
        }
        if let Ok(channel) = spec.parse::<Channel>() {
            return Ok(Self {
                channel: Some(channel),
                ..ext
            });
        }

        let caps = VERSION_SPEC
            .captures(spec)
            .ok_or_else(|| RefError::InvalidSpec(spec.to_string()))?;
        let mut ext = ext.with_version(&caps["version"])?;
        ext.compatible = Some(caps.name("compatible").is_some());
        ext.channel = caps
            .name("channel")
            .map(|m| m.as_str().parse())
            .transpose()?;
        Ok(ext)
    }
}

impl fmt::Display for ExtRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.version.is_none() && self.channel.is_none() {
            return Ok(());
        }
        f.write_str("-")?;
        if let Some(version) = &self.version {
            if self.compatible == Some(true) {
                f.write_str("^")?;
            }
            f.write_str(version)?;
        }
        match (&self.version, self.channel) {
            (Some(_), Some(channel)) => write!(f, "@{channel}"),
            (None, Some(channel)) => write!(f, "{channel}"),
            _ => Ok(()),
        }
    }
}
