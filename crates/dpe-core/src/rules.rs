//! Exclude and include rules.
//!
//! Both rules are partial configurations with the same storage shape. They
//! differ in how a key missing from the tested configuration is treated:
//! an exclude rule never matches it, an include rule ignores it because the
//! key is meant to be merged in.

use crate::value::{Configuration, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A partial configuration that removes every configuration it matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ExcludeRule(Configuration);

impl ExcludeRule {
    /// Creates an exclude rule
    #[must_use]
    pub fn new(partial: Configuration) -> Self {
        Self(partial)
    }

    /// True if every key of the rule is present in `config` with an equal value
    #[must_use]
    pub fn matches(&self, config: &Configuration) -> bool {
        self.0.iter().all(|(key, value)| config.get(key) == Some(value))
    }

    /// The rule's partial configuration
    #[must_use]
    pub fn partial(&self) -> &Configuration {
        &self.0
    }

    /// Value the rule requires for `key`, if any
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub(crate) fn partial_mut(&mut self) -> &mut Configuration {
        &mut self.0
    }
}

impl From<Configuration> for ExcludeRule {
    fn from(partial: Configuration) -> Self {
        Self(partial)
    }
}

impl fmt::Display for ExcludeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exclude {}", self.0)
    }
}

/// A partial configuration merged into every configuration it matches, or
/// emitted on its own when it matches none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct IncludeRule(Configuration);

impl IncludeRule {
    /// Creates an include rule
    #[must_use]
    pub fn new(partial: Configuration) -> Self {
        Self(partial)
    }

    /// True if every key of the rule that `config` has carries an equal value.
    ///
    /// Keys `config` lacks never cause a mismatch.
    #[must_use]
    pub fn matches(&self, config: &Configuration) -> bool {
        self.0
            .iter()
            .all(|(key, value)| config.get(key).is_none_or(|v| v == value))
    }

    /// Overwrites and extends `config` with the rule's keys
    pub fn merge_into(&self, config: &mut Configuration) {
        for (key, value) in self.0.iter() {
            config.insert(key, value.clone());
        }
    }

    /// The rule's partial configuration
    #[must_use]
    pub fn partial(&self) -> &Configuration {
        &self.0
    }

    /// Value the rule sets for `key`, if any
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub(crate) fn partial_mut(&mut self) -> &mut Configuration {
        &mut self.0
    }
}

impl From<Configuration> for IncludeRule {
    fn from(partial: Configuration) -> Self {
        Self(partial)
    }
}

impl fmt::Display for IncludeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "include {}", self.0)
    }
}
