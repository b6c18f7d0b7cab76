//! Matrix document (de)serialization.
//!
//! The document is a map of every variable to its domain, in declaration
//! order, followed by the `exclude` and `include` rule lists.

use super::{Layout, Matrix, Variable};
use crate::product::product;
use crate::rules::{ExcludeRule, IncludeRule};
use crate::value::{Configuration, Value};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

impl Matrix {
    /// Exclude rules a document consumer needs to reproduce `configs()`.
    ///
    /// For a cross-product matrix these are the rules themselves. A
    /// materialized matrix also excludes every nominal product tuple that its
    /// stored list does not contain.
    #[must_use]
    pub fn document_excludes(&self) -> Vec<ExcludeRule> {
        let mut excludes = self.excludes.clone();
        let Layout::Materialized(stored) = &self.layout else {
            return excludes;
        };

        let names: Vec<&str> = self.names().collect();
        let produced: Vec<Configuration> = stored
            .iter()
            .filter(|entry| !entry.standalone)
            .map(|entry| entry.base.project(names.iter().copied()))
            .collect();
        for tuple in product(self.variables.iter().map(|v| v.values.as_slice())) {
            let config: Configuration = names
                .iter()
                .zip(tuple)
                .map(|(name, value)| (*name, value.clone()))
                .collect();
            if !produced.contains(&config) && !self.is_excluded(&config) {
                excludes.push(ExcludeRule::new(config));
            }
        }
        excludes
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.variables.len() + 2))?;
        for var in &self.variables {
            map.serialize_entry(&var.name, &var.values)?;
        }
        map.serialize_entry("exclude", &self.document_excludes())?;
        map.serialize_entry("include", &self.includes)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Matrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MatrixVisitor;

        impl<'de> Visitor<'de> for MatrixVisitor {
            type Value = Matrix;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a matrix document mapping variables to value lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Matrix, A::Error> {
                let mut variables = Vec::new();
                let mut excludes: Option<Vec<ExcludeRule>> = None;
                let mut includes: Option<Vec<IncludeRule>> = None;

                while let Some(key) = access.next_key::<String>()? {
                    match key.as_str() {
                        "exclude" => {
                            if excludes.is_some() {
                                return Err(de::Error::duplicate_field("exclude"));
                            }
                            excludes = Some(access.next_value()?);
                        }
                        "include" => {
                            if includes.is_some() {
                                return Err(de::Error::duplicate_field("include"));
                            }
                            includes = Some(access.next_value()?);
                        }
                        _ => {
                            let values: Vec<Value> = access.next_value()?;
                            variables.push(Variable { name: key, values });
                        }
                    }
                }

                Matrix::with_rules(
                    variables,
                    excludes.unwrap_or_default(),
                    includes.unwrap_or_default(),
                )
                .map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(MatrixVisitor)
    }
}

#[cfg(test)]
mod tests {
    use crate::matrix::Matrix;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_document_shape() {
        let m = Matrix::builder()
            .var("php", ["8.2", "8.3"])
            .var("os", [Value::tuple(["debian", "bookworm"])])
            .exclude(config! { "php" => "8.2" })
            .include(config! { "php" => "8.3", "experimental" => true })
            .build()
            .unwrap();
        let doc = serde_json::to_value(&m).unwrap();
        assert_eq!(
            doc,
            json!({
                "php": ["8.2", "8.3"],
                "os": [["debian", "bookworm"]],
                "exclude": [{ "php": "8.2" }],
                "include": [{ "php": "8.3", "experimental": true }],
            })
        );
    }

    #[test]
    fn test_document_key_order() {
        let m = Matrix::builder()
            .var("zeta", ["z"])
            .var("alpha", ["a"])
            .build()
            .unwrap();
        let json = m.to_json().unwrap();
        let zeta = json.find("\"zeta\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        let exclude = json.find("\"exclude\"").unwrap();
        let include = json.find("\"include\"").unwrap();
        assert!(zeta < alpha && alpha < exclude && exclude < include);
    }

    #[test]
    fn test_materialized_document_reproduces_configs() {
        let m = Matrix::builder()
            .var("php", ["7.4", "8.0", "8.1"])
            .var("ext", ["extA", "extB"])
            .var("arch", ["x86", "arm"])
            .build()
            .unwrap()
            .exclude(config! { "ext" => "extB", "arch" => "arm", "php" => "7.4" })
            .unwrap()
            .implode("arch", "|")
            .unwrap();
        assert_eq!(m.document_excludes().len(), 6);

        let json = m.to_json().unwrap();
        let reloaded: Matrix = serde_json::from_str(&json).unwrap();
        let expected: Vec<_> = m.configs().collect();
        let actual: Vec<_> = reloaded.configs().collect();
        assert_eq!(actual.len(), expected.len());
        for config in &expected {
            assert!(actual.contains(config), "missing {config}");
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let err = serde_json::from_str::<Matrix>(r#"{"php": ["8.3", "8.3"]}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate value"));

        let err =
            serde_json::from_str::<Matrix>(r#"{"php": ["8.3"], "exclude": [{"os": "alpine"}]}"#)
                .unwrap_err();
        assert!(err.to_string().contains("not in job matrix"));
    }

    #[test]
    fn test_deserialize_yaml() {
        let yaml = "
version: [10, 12, 14]
os: [ubuntu-latest, windows-latest]
exclude:
  - version: 10
    os: windows-latest
";
        let m: Matrix = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(m.count(), 5);
        assert_eq!(m.variable("version").unwrap()[0], Value::Int(10));
    }

    #[test]
    fn test_deserialize_decimal_domains() {
        let yaml = "
python: [3.8, 3.9]
php: [7.4, 8.0]
os: [ubuntu]
exclude:
  - python: 3.8
    php: 8.0
";
        let m: Matrix = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(m.count(), 3);
        let php: Vec<String> = m
            .variable("php")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(php, vec!["7.4", "8.0"]);

        let doc = serde_json::to_value(&m).unwrap();
        assert_eq!(doc["php"], json!([7.4, 8.0]));
        assert_eq!(doc["exclude"], json!([{ "python": 3.8, "php": 8.0 }]));
    }

    #[test]
    fn test_materialized_document_drops_cancelled_include() {
        let m = Matrix::builder()
            .var("php", ["8.0", "8.1"])
            .var("os", ["a", "b"])
            .var("arch", ["x86", "arm"])
            .include(config! { "php" => "8.1", "debug" => true })
            .build()
            .unwrap()
            .implode("arch", ",")
            .unwrap()
            .exclude(config! { "os" => "a" })
            .unwrap();

        let reloaded: Matrix = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        let expected: Vec<_> = m.configs().collect();
        let actual: Vec<_> = reloaded.configs().collect();
        assert_eq!(actual, expected);
    }
}
