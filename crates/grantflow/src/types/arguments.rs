//! Deduplicated, insertion-ordered string sequences.
//!
//! Scopes, audiences, grant types and response types are all carried as
//! [`Arguments`]: appending an element that is already present is a no-op and
//! iteration preserves first-insertion order.

use serde::{Deserialize, Serialize};

/// An ordered set of string arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Vec<String>);

impl Arguments {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Splits a space-delimited parameter (e.g. `scope`) into arguments.
    ///
    /// Empty fragments are dropped and duplicates collapse.
    #[must_use]
    pub fn from_space_delimited(value: &str) -> Self {
        value.split(' ').filter(|s| !s.is_empty()).collect()
    }

    /// Appends an element unless it is already present.
    pub fn append(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !self.0.contains(&value) {
            self.0.push(value);
        }
    }

    /// Appends every element of `values`, skipping duplicates.
    pub fn extend_from<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.append(value);
        }
    }

    /// Returns `true` if all of `values` are present.
    #[must_use]
    pub fn has(&self, values: &[&str]) -> bool {
        values.iter().all(|v| self.0.iter().any(|x| x == v))
    }

    /// Returns `true` if at least one of `values` is present.
    #[must_use]
    pub fn has_one_of(&self, values: &[&str]) -> bool {
        values.iter().any(|v| self.0.iter().any(|x| x == v))
    }

    /// Returns `true` if the sequence consists of exactly `value` and nothing else.
    #[must_use]
    pub fn exact_one(&self, value: &str) -> bool {
        self.0.len() == 1 && self.0[0] == value
    }

    /// Returns `true` if both sequences hold the same elements, ignoring order.
    #[must_use]
    pub fn matches(&self, other: &Arguments) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|v| other.0.contains(v))
    }

    /// Renders the elements joined by a single space.
    #[must_use]
    pub fn to_space_delimited(&self) -> String {
        self.0.join(" ")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Arguments {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut args = Arguments::new();
        args.extend_from(iter);
        args
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<String>> for Arguments {
    fn from(values: Vec<String>) -> Self {
        values.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_deduplicates() {
        let mut args = Arguments::new();
        args.append("openid");
        args.append("offline");
        args.append("openid");
        assert_eq!(args.as_slice(), &["openid", "offline"]);
    }

    #[test]
    fn test_from_space_delimited() {
        let args = Arguments::from_space_delimited("  read write  read ");
        assert_eq!(args.as_slice(), &["read", "write"]);
        assert_eq!(args.to_space_delimited(), "read write");
        assert!(Arguments::from_space_delimited("").is_empty());
    }

    #[test]
    fn test_exact_one() {
        let args: Arguments = ["urn:ietf:params:oauth:grant-type:device_code"]
            .into_iter()
            .collect();
        assert!(args.exact_one("urn:ietf:params:oauth:grant-type:device_code"));

        let args: Arguments = ["refresh_token", "password"].into_iter().collect();
        assert!(!args.exact_one("refresh_token"));
        assert!(args.has_one_of(&["client_credentials", "password"]));
        assert!(args.has(&["password", "refresh_token"]));
        assert!(!args.has(&["password", "implicit"]));
    }

    #[test]
    fn test_matches_ignores_order() {
        let a: Arguments = ["a", "b"].into_iter().collect();
        let b: Arguments = ["b", "a"].into_iter().collect();
        let c: Arguments = ["a"].into_iter().collect();
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }
}
