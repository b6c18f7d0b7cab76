//! Build targets: a PHP version on an OS release.

use super::errors::TargetError;
use dpe_core::{Configuration, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static PHP_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d\.\d+$").expect("valid regex"));
static ALPINE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^alpine(\d+\.\d+)$").expect("valid regex"));
static DEBIAN_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+$").expect("valid regex"));

/// Supported base operating systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsId {
    /// Debian, versioned by codename
    Debian,
    /// Alpine, versioned by `X.Y` release
    Alpine,
}

impl OsId {
    /// Lowercase id
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debian => "debian",
            Self::Alpine => "alpine",
        }
    }
}

impl fmt::Display for OsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsId {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debian" => Ok(Self::Debian),
            "alpine" => Ok(Self::Alpine),
            other => Err(TargetError::InvalidOsId(other.to_string())),
        }
    }
}

/// Compact OS reference: the codename for Debian, `alpine<version>` for Alpine
#[must_use]
pub fn os_ref(os_id: OsId, os_version: &str) -> String {
    match os_id {
        OsId::Debian => os_version.to_string(),
        OsId::Alpine => format!("alpine{os_version}"),
    }
}

/// Splits an OS reference into id and version
///
/// # Errors
///
/// [`TargetError::InvalidOsRef`] if `reference` is neither `alpineX.Y` nor
/// a lowercase codename.
pub fn parse_os_ref(reference: &str) -> Result<(OsId, String), TargetError> {
    if let Some(caps) = ALPINE_REF.captures(reference) {
        return Ok((OsId::Alpine, caps[1].to_string()));
    }
    if DEBIAN_REF.is_match(reference) {
        return Ok((OsId::Debian, reference.to_string()));
    }
    Err(TargetError::InvalidOsRef(reference.to_string()))
}

/// True if `version` looks like `8.3`
#[must_use]
pub fn is_php_version(version: &str) -> bool {
    PHP_VERSION.is_match(version)
}

/// A PHP version on an OS release
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// PHP `X.Y` version
    pub php_version: String,
    /// Base OS
    pub os_id: OsId,
    /// Codename or release of the base OS
    pub os_version: String,
}

impl Target {
    /// Creates a validated target
    ///
    /// # Errors
    ///
    /// Fails on a malformed PHP version or an empty OS version.
    pub fn new(
        php_version: impl Into<String>,
        os_id: OsId,
        os_version: impl Into<String>,
    ) -> Result<Self, TargetError> {
        let php_version = php_version.into();
        let os_version = os_version.into();
        if !is_php_version(&php_version) {
            return Err(TargetError::InvalidPhpVersion(php_version));
        }
        if os_version.is_empty() {
            return Err(TargetError::EmptyOsVersion);
        }
        Ok(Self {
            php_version,
            os_id,
            os_version,
        })
    }

    /// OS reference of this target
    #[must_use]
    pub fn os_ref(&self) -> String {
        os_ref(self.os_id, &self.os_version)
    }

    /// The `(id, version)` tuple stored in a matrix `os` variable
    #[must_use]
    pub fn os_value(&self) -> Value {
        Value::tuple([self.os_id.as_str(), self.os_version.as_str()])
    }

    /// Reads the target out of a matrix configuration's `php` and `os` keys
    ///
    /// # Errors
    ///
    /// [`TargetError::NotATarget`] if either key is missing or has the wrong
    /// shape, and the validation errors of [`Target::new`].
    pub fn from_config(config: &Configuration) -> Result<Self, TargetError> {
        let not_a_target = || TargetError::NotATarget(config.to_string());
        let php = config.get("php").and_then(Value::as_text).ok_or_else(not_a_target)?;
        let (id, version) = match config.get("os").and_then(Value::as_tuple) {
            Some([id, version]) => (id, version),
            _ => return Err(not_a_target()),
        };
        Self::new(php, id.parse()?, version.as_str())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.php_version, self.os_ref())
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        let [php, reference] = parts.as_slice() else {
            return Err(TargetError::InvalidTarget(s.to_string()));
        };
        let (os_id, os_version) = parse_os_ref(reference)?;
        Self::new(*php, os_id, os_version)
    }
}
