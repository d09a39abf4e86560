//! Open extension bags.
//!
//! Sessions, claims snapshots and authorization details carry fields this
//! crate does not model. They are stored as an [`ExtraMap`] of
//! [`ExtraValue`]s and read back through the `safe_*` accessors, which fall
//! back to a caller-supplied default whenever the stored value has the wrong
//! shape.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A JSON-shaped value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ExtraValue>),
    Map(ExtraMap),
}

impl ExtraValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<Vec<String>> for ExtraValue {
    fn from(values: Vec<String>) -> Self {
        Self::Array(values.into_iter().map(Self::String).collect())
    }
}

impl From<ExtraMap> for ExtraValue {
    fn from(map: ExtraMap) -> Self {
        Self::Map(map)
    }
}

impl From<serde_json::Value> for ExtraValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(object) => Self::Map(
                object
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ExtraValue> for serde_json::Value {
    fn from(value: ExtraValue) -> Self {
        match value {
            ExtraValue::Null => Self::Null,
            ExtraValue::Bool(b) => Self::Bool(b),
            ExtraValue::Number(n) => Self::Number(n),
            ExtraValue::String(s) => Self::String(s),
            ExtraValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            ExtraValue::Map(map) => Self::Object(
                map.0
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Ordered map of extension fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraMap(IndexMap<String, ExtraValue>);

impl ExtraMap {
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ExtraValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ExtraValue> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ExtraValue> {
        self.0.iter()
    }

    /// Returns the string under `key`, or `default` if it is missing, empty,
    /// or not a string.
    #[must_use]
    pub fn safe_string(&self, key: &str, default: &str) -> String {
        match self.0.get(key) {
            Some(ExtraValue::String(s)) if !s.is_empty() => s.clone(),
            _ => default.to_string(),
        }
    }

    /// Returns the nested map under `key`, or `default`.
    #[must_use]
    pub fn safe_map(&self, key: &str, default: ExtraMap) -> ExtraMap {
        match self.0.get(key) {
            Some(ExtraValue::Map(map)) => map.clone(),
            _ => default,
        }
    }

    /// Returns the array under `key`, or `default`.
    #[must_use]
    pub fn safe_slice(&self, key: &str, default: Vec<ExtraValue>) -> Vec<ExtraValue> {
        match self.0.get(key) {
            Some(ExtraValue::Array(items)) => items.clone(),
            _ => default,
        }
    }

    /// Returns the strings under `key`.
    ///
    /// A single string becomes a one-element vector; non-string array
    /// elements are skipped. Falls back to `default` when nothing usable is
    /// stored.
    #[must_use]
    pub fn safe_string_slice(&self, key: &str, default: &[&str]) -> Vec<String> {
        let fallback = || default.iter().map(|s| (*s).to_string()).collect();
        match self.0.get(key) {
            Some(ExtraValue::String(s)) => vec![s.clone()],
            Some(ExtraValue::Array(items)) => {
                let strings: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if strings.is_empty() {
                    fallback()
                } else {
                    strings
                }
            }
            _ => fallback(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, ExtraValue)> for ExtraMap {
    fn from_iter<T: IntoIterator<Item = (K, ExtraValue)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl IntoIterator for ExtraMap {
    type Item = (String, ExtraValue);
    type IntoIter = indexmap::map::IntoIter<String, ExtraValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
