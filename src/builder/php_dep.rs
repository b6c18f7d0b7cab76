//! PHP version constraints declared by an extension release.

use dpe_core::version::compare;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Supported PHP range of one extension release.
///
/// Empty bounds are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpDependency {
    /// Lowest supported PHP version
    pub min: String,
    /// Highest supported PHP version
    pub max: String,
    /// Versions within the range that are known not to work
    pub exclude: Vec<String>,
}

impl PhpDependency {
    /// Creates a constraint
    #[must_use]
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
            exclude: Vec::new(),
        }
    }

    /// Adds an excluded version
    #[must_use]
    pub fn excluding(mut self, version: impl Into<String>) -> Self {
        self.exclude.push(version.into());
        self
    }

    /// True if `php` lies within the range and is not excluded
    #[must_use]
    pub fn satisfied_by(&self, php: &str) -> bool {
        if !self.min.is_empty() && compare(php, &self.min) == Ordering::Less {
            return false;
        }
        if !self.max.is_empty() && compare(php, &self.max) == Ordering::Greater {
            return false;
        }
        !self
            .exclude
            .iter()
            .any(|excluded| compare(php, excluded) == Ordering::Equal)
    }
}
