//! Matrix values and configurations.
//!
//! A [`Value`] is one element of a variable's domain. A [`Configuration`]
//! assigns values to keys; its key set is open, so include rules can add
//! keys the matrix never declared.

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single domain value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Decimal number kept in its textual form, so `8.0` stays `8.0`
    Number(String),
    /// Text value
    Text(String),
    /// Small tuple of text, e.g. an OS id/version pair
    Tuple(Vec<String>),
}

impl Value {
    /// Creates a tuple value
    pub fn tuple<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Creates a decimal number value
    #[must_use]
    pub fn number(n: f64) -> Self {
        Self::Number(format!("{n:?}"))
    }

    /// Returns the text if this is a text value
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items if this is a tuple value
    #[must_use]
    pub fn as_tuple(&self) -> Option<&[String]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Number(n) | Self::Text(n) => f.write_str(n),
            Self::Tuple(items) => f.write_str(&items.join("-")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(items: [&str; N]) -> Self {
        Self::tuple(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::Tuple(items)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Number(n) => match n.parse::<f64>() {
                Ok(n) => serializer.serialize_f64(n),
                Err(_) => serializer.serialize_str(n),
            },
            Self::Text(s) => serializer.serialize_str(s),
            Self::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean, number, string or list of strings")
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
                Ok(Value::Bool(b))
            }

            fn visit_i64<E: de::Error>(self, i: i64) -> Result<Value, E> {
                Ok(Value::Int(i))
            }

            fn visit_u64<E: de::Error>(self, u: u64) -> Result<Value, E> {
                Ok(i64::try_from(u).map_or_else(|_| Value::Number(u.to_string()), Value::Int))
            }

            fn visit_f64<E: de::Error>(self, n: f64) -> Result<Value, E> {
                Ok(Value::number(n))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
                Ok(Value::Text(s.to_string()))
            }

            fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
                Ok(Value::Text(s))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = access.next_element::<String>()? {
                    items.push(item);
                }
                Ok(Value::Tuple(items))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// An insertion-ordered assignment of values to keys.
///
/// Equality is mapping equality: two configurations are equal when they hold
/// the same key/value pairs, regardless of order.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    entries: Vec<(String, Value)>,
}

impl Configuration {
    /// Creates an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Gets the value for a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns true if the key is present
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Sets a key, overwriting in place or appending a new key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy without `key`
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }

    /// Returns a copy restricted to `keys`, in the order of `keys`
    #[must_use]
    pub fn project<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        keys.into_iter()
            .filter_map(|k| self.get(k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    /// Mutable access to a value
    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Configuration {}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Configuration {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut config = Self::new();
        for (k, v) in iter {
            config.insert(k, v);
        }
        config
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Configuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ConfigurationVisitor;

        impl<'de> Visitor<'de> for ConfigurationVisitor {
            type Value = Configuration;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of matrix keys to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut config = Configuration::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    config.insert(key, value);
                }
                Ok(config)
            }
        }

        deserializer.deserialize_map(ConfigurationVisitor)
    }
}

/// Builds a [`Configuration`] from `key => value` pairs.
///
/// ```
/// use dpe_core::config;
///
/// let c = config! { "php" => "8.3", "arch" => "arm64" };
/// assert_eq!(c.len(), 2);
/// ```
#[macro_export]
macro_rules! config {
    () => {
        $crate::Configuration::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut config = $crate::Configuration::new();
        $(config.insert($key, $value);)+
        config
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut c = config! { "fruit" => "apple", "animal" => "cat" };
        c.insert("fruit", "pear");
        c.insert("color", "green");
        let keys: Vec<&str> = c.keys().collect();
        assert_eq!(keys, vec!["fruit", "animal", "color"]);
        assert_eq!(c.get("fruit"), Some(&Value::from("pear")));
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = config! { "os" => "linux", "version" => 10 };
        let b = config! { "version" => 10, "os" => "linux" };
        assert_eq!(a, b);
        assert_ne!(a, config! { "os" => "linux", "version" => "10" });
    }

    #[test]
    fn test_without_and_project() {
        let c = config! { "php" => "8.3", "ext" => "redis", "arch" => "arm" };
        assert_eq!(c.without("arch"), config! { "php" => "8.3", "ext" => "redis" });
        assert_eq!(c.project(["arch", "missing"]), config! { "arch" => "arm" });
    }

    #[test]
    fn test_serialize_keeps_insertion_order() {
        let c = config! { "version" => 10, "os" => ["debian", "bookworm"], "fast" => true };
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"version":10,"os":["debian","bookworm"],"fast":true}"#);
    }

    #[test]
    fn test_deserialize_values() {
        let c: Configuration =
            serde_json::from_str(r#"{"os":["alpine","3.20"],"php":"8.1","n":3}"#).unwrap();
        assert_eq!(c.get("os"), Some(&Value::tuple(["alpine", "3.20"])));
        assert_eq!(c.get("php"), Some(&Value::from("8.1")));
        assert_eq!(c.get("n"), Some(&Value::Int(3)));
        assert_eq!(c.keys().collect::<Vec<_>>(), vec!["os", "php", "n"]);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(12).to_string(), "12");
        assert_eq!(Value::from("x86").to_string(), "x86");
        assert_eq!(Value::tuple(["debian", "bookworm"]).to_string(), "debian-bookworm");
        assert_eq!(Value::number(8.0).to_string(), "8.0");
    }

    #[test]
    fn test_decimal_scalars_keep_their_form() {
        let c: Configuration = serde_yaml::from_str("python: 3.8\nphp: 8.0\nn: 3\n").unwrap();
        assert_eq!(c.get("python"), Some(&Value::Number("3.8".to_string())));
        assert_eq!(c.get("php").unwrap().to_string(), "8.0");
        assert_eq!(c.get("n"), Some(&Value::Int(3)));
        assert_ne!(c.get("php"), Some(&Value::from("8.0")));

        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"python":3.8,"php":8.0,"n":3}"#);
    }
}
