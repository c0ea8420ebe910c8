//! Convenience builder for HTTP query parameters.
//!
//! Parameters are kept in a sorted map: the provider does not care about their order,
//! and a stable order keeps request URLs comparable in tests and logs.

use std::collections::BTreeMap;
use std::fmt::Display;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: BTreeMap<String, String>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a required key/value pair, replacing any previous value for `key`.
    pub fn push<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Display,
    {
        self.pairs.insert(key.into(), value.to_string());
    }

    /// Builder form of [`QueryParams::push`].
    #[must_use]
    pub fn with<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Display,
    {
        self.push(key, value);
        self
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// Iterate over the pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another set of parameters into this one; `other` wins on conflicts.
    pub fn extend(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.push(key, value);
        }
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;

    #[test]
    fn insertion_order_is_irrelevant() {
        let a = QueryParams::new().with("state", "running").with("limit", 5);
        let b = QueryParams::new().with("limit", 5).with("state", "running");
        assert_eq!(a, b);
        assert_eq!(
            a.iter().collect::<Vec<_>>(),
            vec![("limit", "5"), ("state", "running")]
        );
    }

    #[test]
    fn extend_overrides() {
        let mut params = QueryParams::new().with("action", "stop");
        params.extend(&[("action", "start"), ("force", "true")].into_iter().collect());
        assert_eq!(params.get("action"), Some("start"));
        assert_eq!(params.len(), 2);
    }
}
