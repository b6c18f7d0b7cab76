//! Special requirements the extension installer declares per extension.
//!
//! A requirement is `[!]part(-part)*` where each part is `zts`, a PHP `X.Y`
//! version, or an OS ref. A plain requirement holds when every present check
//! passes; a negated one holds when any check fails.

use super::errors::RequirementError;
use super::target::{OsId, Target, parse_os_ref};
use dpe_core::version::compare;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

static PHP_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("valid regex"));

/// A parsed special requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpeRequirement {
    /// Inverts the requirement
    pub negated: bool,
    /// Required OS
    pub os_id: Option<OsId>,
    /// Required OS release, only with `os_id`
    pub os_version: Option<String>,
    /// Required PHP version
    pub php_version: Option<String>,
    /// Requires a thread-safe PHP build
    pub zts: bool,
}

impl IpeRequirement {
    /// Tests an OS release and PHP version
    #[must_use]
    pub fn test(&self, os_id: OsId, os_version: &str, php_version: &str) -> bool {
        let mut checks = Vec::with_capacity(3);
        if let Some(id) = self.os_id {
            checks.push(id == os_id);
        }
        if let Some(version) = &self.os_version {
            checks.push(compare(os_version, version) == Ordering::Equal);
        }
        if let Some(version) = &self.php_version {
            checks.push(compare(php_version, version) == Ordering::Equal);
        }

        if self.negated {
            checks.contains(&false)
        } else {
            !checks.contains(&false)
        }
    }

    /// Tests a target
    #[must_use]
    pub fn test_target(&self, target: &Target) -> bool {
        self.test(target.os_id, &target.os_version, &target.php_version)
    }
}

impl FromStr for IpeRequirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negated, body) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut requirement = Self {
            negated,
            os_id: None,
            os_version: None,
            php_version: None,
            zts: false,
        };

        for part in body.split('-') {
            if part == "zts" {
                requirement.zts = true;
            } else if PHP_PART.is_match(part) {
                requirement.php_version = Some(part.to_string());
            } else {
                let (id, version) =
                    parse_os_ref(part).map_err(|source| RequirementError::Unparseable {
                        requirement: s.to_string(),
                        source,
                    })?;
                requirement.os_id = Some(id);
                requirement.os_version = Some(version);
            }
        }

        if requirement.os_id.is_none() && requirement.php_version.is_none() && !requirement.zts {
            return Err(RequirementError::Unconstrained(s.to_string()));
        }
        Ok(requirement)
    }
}

impl fmt::Display for IpeRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(php) = &self.php_version {
            parts.push(php.clone());
        }
        if let (Some(id), Some(version)) = (self.os_id, &self.os_version) {
            parts.push(super::target::os_ref(id, version));
        }
        if self.zts {
            parts.push("zts".to_string());
        }
        if self.negated {
            f.write_str("!")?;
        }
        f.write_str(&parts.join("-"))
    }
}
