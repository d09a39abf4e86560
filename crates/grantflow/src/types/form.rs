//! Raw request parameters.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Multi-valued, ordered form parameters as received from the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Form(IndexMap<String, Vec<String>>);

impl Form {
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Parses an `application/x-www-form-urlencoded` body or query string.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut form = Self::new();
        for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
            form.add(key.into_owned(), value.into_owned());
        }
        form
    }

    /// Returns the first value of `key`, or `""` when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Returns every value of `key`.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Replaces all values of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Appends `value` to the values of `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.0.shift_remove(key);
    }

    /// Keeps only the keys for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|key, _| keep(key));
    }

    /// Copies every key of `other` into `self`, replacing existing values.
    pub fn merge_from(&mut self, other: &Form) {
        for (key, values) in &other.0 {
            self.0.insert(key.clone(), values.clone());
        }
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Vec<String>> {
        self.0.iter()
    }

    /// Serializes the form back to `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.0 {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Form {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut form = Form::new();
        for (key, value) in iter {
            form.add(key, value);
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_get() {
        let form = Form::parse("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code&scope=a+b&scope=c");
        assert_eq!(
            form.get("grant_type"),
            "urn:ietf:params:oauth:grant-type:device_code"
        );
        assert_eq!(form.get("scope"), "a b");
        assert_eq!(form.get_all("scope").len(), 2);
        assert_eq!(form.get("missing"), "");
    }

    #[test]
    fn test_set_replaces_values() {
        let mut form: Form = [("a", "1"), ("a", "2")].into_iter().collect();
        form.set("a", "3");
        assert_eq!(form.get_all("a"), &["3".to_string()]);
    }

    #[test]
    fn test_retain_and_encode() {
        let mut form: Form = [("client_id", "c"), ("secret", "s"), ("scope", "x y")]
            .into_iter()
            .collect();
        form.retain(|key| key != "secret");
        assert_eq!(form.encode(), "client_id=c&scope=x+y");
    }
}
