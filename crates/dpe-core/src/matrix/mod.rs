//! Build matrix resolution.
//!
//! A [`Matrix`] holds named variable domains plus exclude and include rules.
//! Every transformation returns a new matrix and finishes with a cleanup
//! pass, so that:
//!
//! - every domain value appears in at least one produced configuration
//!   (knockout), and
//! - no exclude rule references a value missing from its key's domain.
//!
//! After [`Matrix::implode`] the matrix stops being a free cross product and
//! keeps its configurations as a stored list; later transformations act on
//! that list directly.
//!
//! ## Example
//!
//! ```rust
//! use dpe_core::{Matrix, config};
//!
//! let matrix = Matrix::builder()
//!     .var("php", ["7.4", "8.0", "8.1"])
//!     .var("arch", ["x86", "arm"])
//!     .build()?
//!     .exclude(config! { "php" => "7.4", "arch" => "arm" })?
//!     .implode("arch", ",")?;
//!
//! assert_eq!(matrix.count(), 3);
//! # Ok::<(), dpe_core::MatrixError>(())
//! ```

mod configs;
mod document;

pub use configs::Configs;

use crate::error::{MatrixError, Result};
use crate::product::product;
use crate::rules::{ExcludeRule, IncludeRule};
use crate::value::{Configuration, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Document keys that cannot be used as variable names
pub const RESERVED_NAMES: [&str; 2] = ["exclude", "include"];

/// A named matrix dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Ordered, duplicate-free domain
    pub values: Vec<Value>,
}

impl Variable {
    /// Creates a variable
    pub fn new<V: Into<Value>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    /// Configurations are the filtered cross product of the domains
    Product,
    /// Configurations are exactly this list
    Materialized(Vec<Entry>),
}

/// A produced configuration split into its declared-variable tuple and the
/// include rules merged into it, so a later exclude can take an include
/// back out of a stored list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    base: Configuration,
    merged: Vec<IncludeRule>,
    /// Emitted for include rules that matched no tuple
    standalone: bool,
}

impl Entry {
    fn tuple(base: Configuration, merged: Vec<IncludeRule>) -> Self {
        Self {
            base,
            merged,
            standalone: false,
        }
    }

    fn standalone(rule: IncludeRule) -> Self {
        Self {
            base: Configuration::new(),
            merged: vec![rule],
            standalone: true,
        }
    }

    /// The configuration this entry stands for.
    ///
    /// Keys of the tuple win over keys of merged rules.
    fn render(&self) -> Configuration {
        let mut config = self.base.clone();
        for rule in &self.merged {
            for (key, value) in rule.partial().iter() {
                if !self.base.contains_key(key) {
                    config.insert(key, value.clone());
                }
            }
        }
        config
    }

    fn is_empty(&self) -> bool {
        self.merged.is_empty() && (self.standalone || self.base.is_empty())
    }
}

/// Drops from every stored entry the include rules `keep` rejects, and the
/// entries left with nothing.
fn retain_includes(stored: &mut Vec<Entry>, keep: impl Fn(&IncludeRule) -> bool) {
    for entry in stored.iter_mut() {
        entry.merged.retain(&keep);
    }
    stored.retain(|entry| !entry.is_empty());
}

/// A build matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    variables: Vec<Variable>,
    excludes: Vec<ExcludeRule>,
    includes: Vec<IncludeRule>,
    layout: Layout,
}

/// Builder for [`Matrix`]
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    variables: Vec<Variable>,
    excludes: Vec<ExcludeRule>,
    includes: Vec<IncludeRule>,
}

impl MatrixBuilder {
    /// Declares a variable
    #[must_use]
    pub fn var<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.variables.push(Variable::new(name, values));
        self
    }

    /// Adds an exclude rule
    #[must_use]
    pub fn exclude(mut self, partial: Configuration) -> Self {
        self.excludes.push(ExcludeRule::new(partial));
        self
    }

    /// Adds an include rule
    #[must_use]
    pub fn include(mut self, partial: Configuration) -> Self {
        self.includes.push(IncludeRule::new(partial));
        self
    }

    /// Validates and builds the matrix
    ///
    /// # Errors
    ///
    /// See [`Matrix::with_rules`].
    pub fn build(self) -> Result<Matrix> {
        Matrix::with_rules(self.variables, self.excludes, self.includes)
    }
}

fn validate_variables(variables: &[Variable]) -> Result<()> {
    let mut names = HashSet::new();
    for var in variables {
        if RESERVED_NAMES.contains(&var.name.as_str()) {
            return Err(MatrixError::ReservedName {
                name: var.name.clone(),
            });
        }
        if !names.insert(var.name.as_str()) {
            return Err(MatrixError::DuplicateVariable {
                name: var.name.clone(),
            });
        }
        for (i, value) in var.values.iter().enumerate() {
            if var.values[..i].contains(value) {
                return Err(MatrixError::DuplicateValue {
                    name: var.name.clone(),
                    value: value.to_string(),
                });
            }
        }
    }
    Ok(())
}

impl Matrix {
    /// Creates a matrix without rules
    ///
    /// # Errors
    ///
    /// See [`Matrix::with_rules`].
    pub fn new(variables: impl IntoIterator<Item = Variable>) -> Result<Self> {
        Self::with_rules(variables, Vec::new(), Vec::new())
    }

    /// Creates a matrix with exclude and include rules.
    ///
    /// # Errors
    ///
    /// Fails on a reserved or duplicate variable name, a duplicate value in a
    /// domain, or an exclude rule naming an undeclared variable.
    pub fn with_rules(
        variables: impl IntoIterator<Item = Variable>,
        excludes: Vec<ExcludeRule>,
        includes: Vec<IncludeRule>,
    ) -> Result<Self> {
        let variables: Vec<Variable> = variables.into_iter().collect();
        validate_variables(&variables)?;
        let matrix = Self {
            variables,
            excludes: Vec::new(),
            includes,
            layout: Layout::Product,
        };
        for rule in &excludes {
            matrix.require_keys("exclude", rule.partial())?;
        }
        Ok(Self { excludes, ..matrix })
    }

    /// Starts a [`MatrixBuilder`]
    #[must_use]
    pub fn builder() -> MatrixBuilder {
        MatrixBuilder::default()
    }

    /// Declared variables in declaration order
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Domain of a variable
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&[Value]> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.values.as_slice())
    }

    /// Variable names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// Exclude rules
    #[must_use]
    pub fn excludes(&self) -> &[ExcludeRule] {
        &self.excludes
    }

    /// Include rules
    #[must_use]
    pub fn includes(&self) -> &[IncludeRule] {
        &self.includes
    }

    /// True once [`implode`](Self::implode) has turned the matrix into a stored list
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        matches!(self.layout, Layout::Materialized(_))
    }

    /// Enumerates the configurations
    #[must_use]
    pub fn configs(&self) -> Configs<'_> {
        Configs::new(self)
    }

    /// Number of configurations
    #[must_use]
    pub fn count(&self) -> usize {
        self.configs().count()
    }

    fn is_excluded(&self, config: &Configuration) -> bool {
        self.excludes.iter().any(|rule| rule.matches(config))
    }

    fn require_variable(&self, operation: &'static str, key: &str) -> Result<()> {
        if self.variable(key).is_some() {
            Ok(())
        } else {
            Err(MatrixError::UnknownVariable {
                operation,
                key: key.to_string(),
            })
        }
    }

    fn require_keys(&self, operation: &'static str, partial: &Configuration) -> Result<()> {
        partial
            .keys()
            .try_for_each(|key| self.require_variable(operation, key))
    }

    /// Merges extra variables into the matrix.
    ///
    /// A variable that already exists gets its domain replaced in place; new
    /// variables are appended. Rules are carried over unchanged and no
    /// cleanup runs. On a materialized matrix, stored configurations whose
    /// value for a replaced variable left the domain are dropped, and new
    /// variables multiply the stored list.
    ///
    /// # Errors
    ///
    /// Fails if the extra variables are structurally invalid.
    pub fn with_vars(&self, extra: impl IntoIterator<Item = Variable>) -> Result<Self> {
        let extra: Vec<Variable> = extra.into_iter().collect();
        validate_variables(&extra)?;

        let mut variables = self.variables.clone();
        let mut replaced = Vec::new();
        let mut added = Vec::new();
        for var in extra {
            match variables.iter_mut().find(|v| v.name == var.name) {
                Some(slot) => {
                    slot.values = var.values;
                    replaced.push(slot.name.clone());
                }
                None => {
                    added.push(var.clone());
                    variables.push(var);
                }
            }
        }

        let layout = match &self.layout {
            Layout::Product => Layout::Product,
            Layout::Materialized(stored) => {
                let kept = stored.iter().filter(|entry| {
                    replaced.iter().all(|name| {
                        entry.base.get(name).is_none_or(|value| {
                            variables
                                .iter()
                                .any(|v| v.name == *name && v.values.contains(value))
                        })
                    })
                });
                let fan_out = product(added.iter().map(|v| v.values.as_slice())).len();
                let mut extended = Vec::with_capacity(stored.len() * fan_out.max(1));
                for entry in kept {
                    if added.is_empty() || entry.standalone {
                        extended.push(entry.clone());
                        continue;
                    }
                    for tuple in product(added.iter().map(|v| v.values.as_slice())) {
                        let mut e = entry.clone();
                        for (var, value) in added.iter().zip(tuple) {
                            e.base.insert(var.name.clone(), value.clone());
                        }
                        extended.push(e);
                    }
                }
                Layout::Materialized(extended)
            }
        };

        Ok(Self {
            variables,
            excludes: self.excludes.clone(),
            includes: self.includes.clone(),
            layout,
        })
    }

    /// Restricts `key` to the single value `value`.
    ///
    /// Exclude and include rules that require a different value of `key`
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Fails if `key` is not a declared variable.
    pub fn pin(&self, key: &str, value: impl Into<Value>) -> Result<Self> {
        self.require_variable("pin", key)?;
        let value = value.into();
        debug!(key, value = %value, "pinning matrix variable");

        let keeps = |rule_value: Option<&Value>| rule_value.is_none_or(|v| *v == value);
        let variables = self
            .variables
            .iter()
            .map(|var| {
                if var.name == key {
                    Variable::new(key, [value.clone()])
                } else {
                    var.clone()
                }
            })
            .collect();
        let layout = match &self.layout {
            Layout::Product => Layout::Product,
            Layout::Materialized(stored) => {
                let mut stored = stored.clone();
                retain_includes(&mut stored, |r| keeps(r.get(key)));
                stored.retain(|entry| keeps(entry.render().get(key)));
                Layout::Materialized(stored)
            }
        };

        Ok(Self {
            variables,
            excludes: self
                .excludes
                .iter()
                .filter(|r| keeps(r.get(key)))
                .cloned()
                .collect(),
            includes: self
                .includes
                .iter()
                .filter(|r| keeps(r.get(key)))
                .cloned()
                .collect(),
            layout,
        }
        .cleanup())
    }

    /// Excludes every configuration matching `partial`.
    ///
    /// Include rules that `partial` include-matches are dropped.
    ///
    /// # Errors
    ///
    /// Fails if `partial` names an undeclared variable.
    pub fn exclude(&self, partial: Configuration) -> Result<Self> {
        self.exclude_many([partial])
    }

    /// Same as calling [`exclude`](Self::exclude) for each partial in turn,
    /// with a single cleanup at the end.
    ///
    /// # Errors
    ///
    /// Fails if any partial names an undeclared variable; the matrix is left
    /// untouched.
    pub fn exclude_many(&self, partials: impl IntoIterator<Item = Configuration>) -> Result<Self> {
        let mut excludes = self.excludes.clone();
        let mut includes = self.includes.clone();
        let mut layout = self.layout.clone();

        for partial in partials {
            self.require_keys("exclude", &partial)?;
            debug!(rule = %partial, "excluding matrix configurations");

            let cancelling = IncludeRule::new(partial.clone());
            let keep = |include: &IncludeRule| !cancelling.matches(include.partial());
            includes.retain(keep);

            let rule = ExcludeRule::new(partial);
            if let Layout::Materialized(stored) = &mut layout {
                retain_includes(stored, keep);
                stored.retain(|entry| !rule.matches(&entry.render()));
            }
            excludes.push(rule);
        }

        Ok(Self {
            variables: self.variables.clone(),
            excludes,
            includes,
            layout,
        }
        .cleanup())
    }

    /// Adds an include rule
    #[must_use]
    pub fn include(&self, partial: Configuration) -> Self {
        debug!(rule = %partial, "including matrix configuration");
        let rule = IncludeRule::new(partial);

        let mut layout = self.layout.clone();
        if let Layout::Materialized(stored) = &mut layout {
            let mut matched = false;
            for entry in stored.iter_mut().filter(|e| !e.standalone) {
                if rule.matches(&entry.base) {
                    entry.merged.push(rule.clone());
                    matched = true;
                }
            }
            if !matched {
                stored.push(Entry::standalone(rule.clone()));
            }
        }

        let mut includes = self.includes.clone();
        includes.push(rule);
        Self {
            variables: self.variables.clone(),
            excludes: self.excludes.clone(),
            includes,
            layout,
        }
        .cleanup()
    }

    /// Collapses `key` into one joined value per group of configurations
    /// that agree on every other key.
    ///
    /// Within a group, `key`'s values are joined with `separator` in domain
    /// order. The result is materialized: its configurations are exactly the
    /// collapsed groups, and `key`'s domain lists the distinct joined values.
    ///
    /// # Errors
    ///
    /// Fails if `key` is not a declared variable.
    pub fn implode(&self, key: &str, separator: &str) -> Result<Self> {
        self.require_variable("implode", key)?;
        let domain = self.variable(key).unwrap_or_default();
        let position = |value: &Value| domain.iter().position(|v| v == value);

        struct Group {
            rest: Configuration,
            entry: Entry,
            values: Vec<Value>,
        }

        let mut groups: Vec<Group> = Vec::new();
        let mut configs = self.configs();
        while let Some(entry) = configs.next_entry() {
            let config = entry.render();
            let rest = config.without(key);
            let group = match groups.iter_mut().position(|g| g.rest == rest) {
                Some(i) => {
                    let group = &mut groups[i];
                    for rule in entry.merged {
                        if !group.entry.merged.contains(&rule) {
                            group.entry.merged.push(rule);
                        }
                    }
                    group
                }
                None => {
                    groups.push(Group {
                        rest,
                        entry,
                        values: Vec::new(),
                    });
                    let last = groups.len() - 1;
                    &mut groups[last]
                }
            };
            if let Some(value) = config.get(key) {
                if !group.values.contains(value) {
                    group.values.push(value.clone());
                }
            }
        }

        let mut joined_domain: Vec<Value> = Vec::new();
        let mut stored = Vec::with_capacity(groups.len());
        for mut group in groups {
            if group.values.is_empty() {
                stored.push(group.entry);
                continue;
            }
            // Values outside the domain (from includes) keep their encounter order
            group
                .values
                .sort_by_key(|v| position(v).unwrap_or(usize::MAX));
            let joined = Value::Text(
                group
                    .values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(separator),
            );
            if !joined_domain.contains(&joined) {
                joined_domain.push(joined.clone());
            }
            if group.entry.standalone && group.entry.render().get(key) == Some(&joined) {
                // A standalone include already carries the joined value
                stored.push(group.entry);
                continue;
            }
            group.entry.base.insert(key, joined);
            stored.push(group.entry);
        }

        debug!(key, separator, groups = stored.len(), "imploded matrix variable");
        let variables = self
            .variables
            .iter()
            .map(|var| {
                if var.name == key {
                    Variable {
                        name: var.name.clone(),
                        values: joined_domain.clone(),
                    }
                } else {
                    var.clone()
                }
            })
            .collect();

        Ok(Self {
            variables,
            excludes: self.excludes.clone(),
            includes: self.includes.clone(),
            layout: Layout::Materialized(stored),
        }
        .cleanup())
    }

    /// Rewrites every value of `key`, in its domain, rules and stored
    /// configurations.
    ///
    /// # Errors
    ///
    /// Fails if `key` is not a declared variable.
    pub fn map_values(&self, key: &str, f: impl Fn(&Value) -> Value) -> Result<Self> {
        self.require_variable("map", key)?;
        let rewrite = |config: &mut Configuration| {
            if let Some(value) = config.get_mut(key) {
                *value = f(value);
            }
        };

        let mut matrix = self.clone();
        for var in &mut matrix.variables {
            if var.name == key {
                let mut values: Vec<Value> = Vec::with_capacity(var.values.len());
                for value in var.values.iter().map(&f) {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
                var.values = values;
            }
        }
        for rule in &mut matrix.excludes {
            rewrite(rule.partial_mut());
        }
        for rule in &mut matrix.includes {
            rewrite(rule.partial_mut());
        }
        if let Layout::Materialized(stored) = &mut matrix.layout {
            for entry in stored.iter_mut() {
                rewrite(&mut entry.base);
                for rule in &mut entry.merged {
                    rewrite(rule.partial_mut());
                }
            }
        }
        Ok(matrix)
    }

    /// Removes dead domain values, then exclude rules that can no longer
    /// match. Idempotent.
    #[must_use]
    pub fn cleanup(&self) -> Self {
        self.knockout().without_redundant_excludes()
    }

    fn knockout(&self) -> Self {
        let mut seen: Vec<Vec<bool>> = self
            .variables
            .iter()
            .map(|v| vec![false; v.values.len()])
            .collect();
        for config in self.configs() {
            for (var, seen) in self.variables.iter().zip(seen.iter_mut()) {
                if let Some(i) = config
                    .get(&var.name)
                    .and_then(|value| var.values.iter().position(|v| v == value))
                {
                    seen[i] = true;
                }
            }
        }

        let variables = self
            .variables
            .iter()
            .zip(seen)
            .map(|(var, seen)| Variable {
                name: var.name.clone(),
                values: var
                    .values
                    .iter()
                    .zip(seen)
                    .filter(|(_, seen)| *seen)
                    .map(|(v, _)| v.clone())
                    .collect(),
            })
            .collect();

        Self {
            variables,
            ..self.clone()
        }
    }

    fn without_redundant_excludes(self) -> Self {
        let excludes = self
            .excludes
            .iter()
            .filter(|rule| {
                rule.partial()
                    .iter()
                    .all(|(key, value)| self.variable(key).is_some_and(|d| d.contains(value)))
            })
            .cloned()
            .collect();
        Self { excludes, ..self }
    }

    /// Renders the matrix document as pretty JSON
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::arb_matrix;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn php_ext_arch() -> Matrix {
        Matrix::builder()
            .var("php", ["7.4", "8.0", "8.1"])
            .var("ext", ["extA", "extB"])
            .var("arch", ["x86", "arm"])
            .build()
            .unwrap()
    }

    fn values(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn test_basic_matrix() {
        let m = Matrix::builder()
            .var("version", [10, 12, 14])
            .var("os", ["ubuntu-latest", "windows-latest"])
            .build()
            .unwrap();
        let configs: Vec<_> = m.configs().collect();
        assert_eq!(configs.len(), 6);
        for version in [10, 12, 14] {
            for os in ["ubuntu-latest", "windows-latest"] {
                assert!(configs.contains(&config! { "version" => version, "os" => os }));
            }
        }
    }

    #[test]
    fn test_expanding() {
        let m = Matrix::builder()
            .var("fruit", ["apple", "pear"])
            .var("animal", ["cat", "dog"])
            .include(config! { "color" => "green" })
            .include(config! { "color" => "pink", "animal" => "cat" })
            .include(config! { "fruit" => "apple", "shape" => "circle" })
            .include(config! { "fruit" => "banana" })
            .include(config! { "fruit" => "banana", "animal" => "cat" })
            .build()
            .unwrap();
        let configs: Vec<_> = m.configs().collect();
        assert_eq!(configs.len(), 6);
        assert!(configs.contains(&config! {
            "fruit" => "apple", "animal" => "cat", "color" => "pink", "shape" => "circle"
        }));
        assert!(configs.contains(&config! {
            "fruit" => "apple", "animal" => "dog", "color" => "green", "shape" => "circle"
        }));
        assert!(configs.contains(&config! { "fruit" => "pear", "animal" => "cat", "color" => "pink" }));
        assert!(configs.contains(&config! { "fruit" => "pear", "animal" => "dog", "color" => "green" }));
        assert!(configs.contains(&config! { "fruit" => "banana" }));
        assert!(configs.contains(&config! { "fruit" => "banana", "animal" => "cat" }));
        assert_eq!(
            configs.iter().filter(|c| **c == config! { "fruit" => "banana" }).count(),
            1
        );
    }

    #[test]
    fn test_excluding() {
        let m = Matrix::builder()
            .var("os", ["macos-latest", "windows-latest"])
            .var("version", [12, 14, 16])
            .var("environment", ["staging", "production"])
            .exclude(config! { "os" => "macos-latest", "version" => 12, "environment" => "production" })
            .exclude(config! { "os" => "windows-latest", "version" => 16 })
            .build()
            .unwrap();
        let configs: Vec<_> = m.configs().collect();
        assert_eq!(configs.len(), 9);
        assert!(!configs.iter().any(|c| {
            c.get("os") == Some(&Value::from("windows-latest"))
                && c.get("version") == Some(&Value::Int(16))
        }));
        assert!(configs.contains(&config! {
            "os" => "macos-latest", "version" => 12, "environment" => "staging"
        }));
    }

    #[test]
    fn test_reserved_names() {
        for name in RESERVED_NAMES {
            let err = Matrix::builder().var(name, ["a"]).build().unwrap_err();
            assert_eq!(err, MatrixError::ReservedName { name: name.to_string() });
        }
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = Matrix::builder().var("a", ["x"]).var("a", ["y"]).build().unwrap_err();
        assert!(matches!(err, MatrixError::DuplicateVariable { .. }));

        let err = Matrix::builder().var("a", ["x", "x"]).build().unwrap_err();
        assert!(matches!(err, MatrixError::DuplicateValue { .. }));
    }

    #[test]
    fn test_exclude_rule_must_use_declared_keys() {
        let err = Matrix::builder()
            .var("php", ["8.3"])
            .exclude(config! { "arch" => "arm" })
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MatrixError::UnknownVariable {
                operation: "exclude",
                key: "arch".to_string()
            }
        );
    }

    #[test]
    fn test_exclude_knocks_out_dead_values() {
        let m = Matrix::builder()
            .var("php", ["7.4", "8.0", "8.1"])
            .var("ext", ["extA", "extB"])
            .build()
            .unwrap();
        let m2 = m.exclude(config! { "php" => "8.0", "ext" => "extB" }).unwrap();
        assert_eq!(m2.variables(), m.variables());
        assert_eq!(m2.excludes().len(), 1);

        let m3 = m2.exclude(config! { "php" => "8.0", "ext" => "extA" }).unwrap();
        assert_eq!(m3.variable("php").unwrap(), values(&["7.4", "8.1"]).as_slice());
        assert!(m3.excludes().is_empty());
    }

    #[test]
    fn test_exclude_unknown_key() {
        let err = php_ext_arch().exclude(config! { "os" => "alpine" }).unwrap_err();
        assert!(matches!(err, MatrixError::UnknownVariable { operation: "exclude", .. }));
    }

    #[test]
    fn test_exclude_drops_cancelled_includes() {
        let m = Matrix::builder()
            .var("php", ["8.0", "8.1"])
            .include(config! { "php" => "8.0", "debug" => true })
            .include(config! { "php" => "8.1", "debug" => true })
            .build()
            .unwrap()
            .exclude(config! { "php" => "8.0" })
            .unwrap();
        assert_eq!(m.includes().len(), 1);
        assert_eq!(m.includes()[0].get("php"), Some(&Value::from("8.1")));
        assert_eq!(m.variable("php").unwrap(), values(&["8.1"]).as_slice());
    }

    #[test]
    fn test_exclude_many_matches_sequential() {
        let m = php_ext_arch();
        let partials = [
            config! { "php" => "7.4", "arch" => "arm" },
            config! { "php" => "8.0" },
            config! { "ext" => "extB", "arch" => "arm" },
        ];
        let mut sequential = m.clone();
        for p in partials.clone() {
            sequential = sequential.exclude(p).unwrap();
        }
        assert_eq!(m.exclude_many(partials).unwrap(), sequential);
    }

    #[test]
    fn test_pin() {
        let m = php_ext_arch()
            .exclude(config! { "php" => "8.0", "ext" => "extB" })
            .unwrap()
            .exclude(config! { "php" => "8.1", "arch" => "arm" })
            .unwrap();
        let pinned = m.pin("php", "8.0").unwrap();
        assert_eq!(pinned.variable("php").unwrap(), values(&["8.0"]).as_slice());
        assert_eq!(pinned.count(), 2);
        assert!(pinned.configs().all(|c| c.get("php") == Some(&Value::from("8.0"))));
        // extB only survived in excluded tuples, so its rule goes with it
        assert_eq!(pinned.variable("ext").unwrap(), values(&["extA"]).as_slice());
        assert!(pinned.excludes().is_empty());
    }

    #[test]
    fn test_pin_drops_includes_for_other_values() {
        let m = Matrix::builder()
            .var("php", ["8.0", "8.1"])
            .include(config! { "php" => "8.0", "debug" => true })
            .build()
            .unwrap()
            .pin("php", "8.1")
            .unwrap();
        assert!(m.includes().is_empty());
        assert_eq!(m.configs().collect::<Vec<_>>(), vec![config! { "php" => "8.1" }]);
    }

    #[test]
    fn test_pin_unknown_key() {
        let err = php_ext_arch().pin("os", "alpine").unwrap_err();
        assert_eq!(err.to_string(), "pin key 'os' not in job matrix");
    }

    #[test]
    fn test_include_is_appended() {
        let m = php_ext_arch().include(config! { "php" => "8.4", "ext" => "extA", "arch" => "x86" });
        assert_eq!(m.includes().len(), 1);
        assert_eq!(m.count(), 13);
    }

    #[test]
    fn test_with_vars() {
        let m = Matrix::builder()
            .var("ext_version", ["bundled"])
            .var("php", ["8.3"])
            .build()
            .unwrap()
            .with_vars([
                Variable::new("ext_version", ["bundled", "6.0.2", "5.3.7"]),
                Variable::new("platform", ["linux/amd64"]),
            ])
            .unwrap();
        let names: Vec<_> = m.names().collect();
        assert_eq!(names, vec!["ext_version", "php", "platform"]);
        assert_eq!(m.count(), 3);
    }

    #[test]
    fn test_with_vars_rejects_reserved() {
        let err = php_ext_arch()
            .with_vars([Variable::new("include", ["x"])])
            .unwrap_err();
        assert!(matches!(err, MatrixError::ReservedName { .. }));
    }

    #[test]
    fn test_implode() {
        let m = php_ext_arch();
        assert_eq!(m.count(), 12);
        let m = m.implode("arch", ",").unwrap();
        assert!(m.is_materialized());
        assert_eq!(m.count(), 6);
        assert_eq!(m.variable("arch").unwrap(), values(&["x86,arm"]).as_slice());
        assert!(m.configs().all(|c| c.get("arch") == Some(&Value::from("x86,arm"))));
    }

    #[test]
    fn test_implode_after_exclude() {
        let m = php_ext_arch()
            .exclude(config! { "ext" => "extB", "arch" => "arm" })
            .unwrap();
        assert_eq!(m.count(), 9);
        let configs: Vec<_> = m.implode("arch", "|").unwrap().configs().collect();
        assert_eq!(configs.len(), 6);
        for php in ["7.4", "8.0", "8.1"] {
            assert!(configs.contains(&config! { "php" => php, "ext" => "extA", "arch" => "x86|arm" }));
            assert!(configs.contains(&config! { "php" => php, "ext" => "extB", "arch" => "x86" }));
        }
    }

    #[test]
    fn test_implode_partial_exclude() {
        let m = php_ext_arch()
            .exclude(config! { "ext" => "extB", "arch" => "arm", "php" => "7.4" })
            .unwrap();
        assert_eq!(m.count(), 11);
        let m = m.implode("arch", "|").unwrap();
        let configs: Vec<_> = m.configs().collect();
        assert_eq!(configs.len(), 6);
        assert!(configs.contains(&config! { "php" => "7.4", "ext" => "extA", "arch" => "x86|arm" }));
        assert!(configs.contains(&config! { "php" => "8.0", "ext" => "extA", "arch" => "x86|arm" }));
        assert!(configs.contains(&config! { "php" => "8.1", "ext" => "extA", "arch" => "x86|arm" }));
        assert!(configs.contains(&config! { "php" => "7.4", "ext" => "extB", "arch" => "x86" }));
        assert!(configs.contains(&config! { "php" => "8.0", "ext" => "extB", "arch" => "x86|arm" }));
        assert!(configs.contains(&config! { "php" => "8.1", "ext" => "extB", "arch" => "x86|arm" }));
        assert_eq!(m.variable("arch").unwrap(), values(&["x86|arm", "x86"]).as_slice());
        assert!(m.excludes().is_empty());
    }

    #[test]
    fn test_implode_joins_in_domain_order() {
        let m = Matrix::builder()
            .var("php", ["8.3"])
            .var("arch", ["x86", "arm", "s390x"])
            .exclude(config! { "arch" => "arm" })
            .build()
            .unwrap()
            .implode("arch", ",")
            .unwrap();
        assert_eq!(m.variable("arch").unwrap(), values(&["x86,s390x"]).as_slice());
    }

    #[test]
    fn test_implode_unknown_key() {
        assert!(php_ext_arch().implode("platform", ",").is_err());
    }

    #[test]
    fn test_materialized_exclude_and_pin() {
        let m = php_ext_arch().implode("arch", ",").unwrap();
        let m = m.exclude(config! { "php" => "7.4" }).unwrap();
        assert!(m.is_materialized());
        assert_eq!(m.count(), 4);
        assert_eq!(m.variable("php").unwrap(), values(&["8.0", "8.1"]).as_slice());

        let m = m.pin("ext", "extB").unwrap();
        assert_eq!(m.count(), 2);
        assert!(m.configs().all(|c| c.get("arch") == Some(&Value::from("x86,arm"))));
    }

    #[test]
    fn test_materialized_include() {
        let m = php_ext_arch()
            .implode("arch", ",")
            .unwrap()
            .include(config! { "php" => "8.1", "experimental" => true })
            .include(config! { "php" => "8.4", "ext" => "extA" });
        assert_eq!(m.count(), 7);
        assert_eq!(
            m.configs().filter(|c| c.contains_key("experimental")).count(),
            2
        );
    }

    #[test]
    fn test_materialized_exclude_takes_back_cancelled_include() {
        let m = Matrix::builder()
            .var("php", ["8.0", "8.1"])
            .var("os", ["a", "b"])
            .var("arch", ["x86", "arm"])
            .include(config! { "php" => "8.1", "debug" => true })
            .build()
            .unwrap();

        let imploded_first = m
            .implode("arch", ",")
            .unwrap()
            .exclude(config! { "os" => "a" })
            .unwrap();
        let excluded_first = m
            .exclude(config! { "os" => "a" })
            .unwrap()
            .implode("arch", ",")
            .unwrap();

        assert!(imploded_first.includes().is_empty());
        let configs: Vec<_> = imploded_first.configs().collect();
        assert_eq!(
            configs,
            vec![
                config! { "php" => "8.0", "os" => "b", "arch" => "x86,arm" },
                config! { "php" => "8.1", "os" => "b", "arch" => "x86,arm" },
            ]
        );
        assert_eq!(configs, excluded_first.configs().collect::<Vec<_>>());
    }

    #[test]
    fn test_materialized_exclude_drops_standalone_include() {
        let m = php_ext_arch()
            .implode("arch", ",")
            .unwrap()
            .include(config! { "php" => "8.4", "ext" => "extA" })
            .exclude(config! { "ext" => "extA" })
            .unwrap();
        assert_eq!(m.count(), 3);
        assert!(m.configs().all(|c| c.get("ext") == Some(&Value::from("extB"))));
    }

    #[test]
    fn test_materialized_with_vars() {
        let m = Matrix::builder()
            .var("php", ["8.0", "8.1"])
            .var("arch", ["x86", "arm"])
            .build()
            .unwrap()
            .implode("arch", ",")
            .unwrap()
            .with_vars([
                Variable::new("php", ["8.1"]),
                Variable::new("os", ["bookworm", "alpine3.20"]),
            ])
            .unwrap();
        let configs: Vec<_> = m.configs().collect();
        assert_eq!(
            configs,
            vec![
                config! { "php" => "8.1", "arch" => "x86,arm", "os" => "bookworm" },
                config! { "php" => "8.1", "arch" => "x86,arm", "os" => "alpine3.20" },
            ]
        );
    }

    #[test]
    fn test_map_values() {
        let m = Matrix::builder()
            .var("os", [Value::tuple(["debian", "bookworm"]), Value::tuple(["alpine", "3.20"])])
            .var("php", [Value::from("8.3")])
            .exclude(config! { "os" => Value::tuple(["alpine", "3.20"]) })
            .build()
            .unwrap();
        let mapped = m
            .map_values("os", |v| Value::Text(v.as_tuple().map(|t| t.concat()).unwrap_or_default()))
            .unwrap();
        assert_eq!(
            mapped.variable("os").unwrap(),
            values(&["debianbookworm", "alpine3.20"]).as_slice()
        );
        assert_eq!(mapped.excludes()[0].get("os"), Some(&Value::from("alpine3.20")));
        assert_eq!(mapped.count(), 1);
    }

    #[test]
    fn test_cleanup_idempotent_example() {
        let m = php_ext_arch()
            .exclude(config! { "ext" => "extB" })
            .unwrap();
        assert_eq!(m.cleanup(), m.cleanup().cleanup());
        assert_eq!(m.variable("ext").unwrap(), values(&["extA"]).as_slice());
    }

    proptest! {
        #[test]
        fn prop_cleanup_idempotent(m in arb_matrix()) {
            let once = m.cleanup();
            prop_assert_eq!(once.cleanup(), once);
        }

        #[test]
        fn prop_cleanup_preserves_configs(m in arb_matrix()) {
            let before: Vec<_> = m.configs().collect();
            let after: Vec<_> = m.cleanup().configs().collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_knockout_leaves_no_dead_values(m in arb_matrix()) {
            let m = m.cleanup();
            let configs: Vec<_> = m.configs().collect();
            for var in m.variables() {
                for value in &var.values {
                    prop_assert!(configs.iter().any(|c| c.get(&var.name) == Some(value)));
                }
            }
        }

        #[test]
        fn prop_no_redundant_excludes(m in arb_matrix()) {
            let m = m.cleanup();
            for rule in m.excludes() {
                for (key, value) in rule.partial().iter() {
                    prop_assert!(m.variable(key).unwrap().contains(value));
                }
            }
        }

        #[test]
        fn prop_pin_keeps_matching_configs(m in arb_matrix()) {
            let var = m.variables()[0].clone();
            for value in &var.values {
                let pinned = m.pin(&var.name, value.clone()).unwrap();
                let expected = m.configs().filter(|c| c.get(&var.name) == Some(value)).count();
                prop_assert_eq!(pinned.count(), expected);
                prop_assert!(pinned.configs().all(|c| c.get(&var.name) == Some(value)));
            }
        }
    }
}
