//! Configuration management
//!
//! Image naming and registry settings, read from the environment.

use crate::builder::Target;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading the configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("environment variable {0} not set")]
    MissingVar(&'static str),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry host, e.g. `ghcr.io`
    pub image_domain: String,
    /// Registry namespace images are pushed to
    pub image_namespace: String,
    /// Template for image names
    pub image_name_template: String,
    /// Template for versioned image tags
    pub image_tag_template: String,
    /// Template for the tag of the latest release
    pub image_tag_latest_template: String,
    /// Keep configurations whose image already exists
    pub ignore_existing_images: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_domain: "docker.io".to_string(),
            image_namespace: String::new(),
            image_name_template: "php-ext-%ext_name%".to_string(),
            image_tag_template: "%ext_version%-%php_version%-%os%".to_string(),
            image_tag_latest_template: "%php_version%-%os%".to_string(),
            ignore_existing_images: false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Reads the configuration from the process environment
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingVar`] if `IMAGE_DOMAIN` or `IMAGE_NAMESPACE` is
    /// unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; empty values count as unset
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingVar`] if a required variable is missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));
        let defaults = Self::default();

        Ok(Self {
            image_domain: required("IMAGE_DOMAIN")?,
            image_namespace: required("IMAGE_NAMESPACE")?,
            image_name_template: get("IMAGE_NAME_TEMPLATE").unwrap_or(defaults.image_name_template),
            image_tag_template: get("IMAGE_TAG_TEMPLATE").unwrap_or(defaults.image_tag_template),
            image_tag_latest_template: get("IMAGE_TAG_LATEST_TEMPLATE")
                .unwrap_or(defaults.image_tag_latest_template),
            ignore_existing_images: get("DPE_IGNORE_EXISTING_IMAGES")
                .is_some_and(|v| parse_bool(&v)),
        })
    }

    fn format(template: &str, target: &Target, ext_name: &str, ext_version: &str) -> String {
        template
            .replace("%ext_name%", ext_name)
            .replace("%ext_version%", ext_version)
            .replace("%os%", &target.os_ref())
            .replace("%php_version%", &target.php_version)
    }

    /// Image name for an extension
    #[must_use]
    pub fn image_name(&self, target: &Target, ext_name: &str, ext_version: &str) -> String {
        Self::format(&self.image_name_template, target, ext_name, ext_version)
    }

    /// Versioned image tag
    #[must_use]
    pub fn image_tag(&self, target: &Target, ext_name: &str, ext_version: &str) -> String {
        Self::format(&self.image_tag_template, target, ext_name, ext_version)
    }

    /// Tag of the latest release
    #[must_use]
    pub fn image_tag_latest(&self, target: &Target, ext_name: &str) -> String {
        Self::format(&self.image_tag_latest_template, target, ext_name, "")
    }

    /// Full `domain/namespace/name:tag` reference; an empty version selects
    /// the latest tag
    #[must_use]
    pub fn image_ref(&self, target: &Target, ext_name: &str, ext_version: &str) -> String {
        let tag = if ext_version.is_empty() {
            self.image_tag_latest(target, ext_name)
        } else {
            self.image_tag(target, ext_name, ext_version)
        };
        format!(
            "{}/{}/{}:{}",
            self.image_domain,
            self.image_namespace,
            self.image_name(target, ext_name, ext_version),
            tag
        )
    }
}
