//! Query-string parameters.

use serde::Serialize;

/// Ordered query parameters.
///
/// Entries whose value is `None` are kept (so call sites can pass optional
/// filters straight through) but never reach the URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, Option<String>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a present value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), Some(value.to_string())));
        self
    }

    /// Appends a value that may be absent.
    #[must_use]
    pub fn with_opt<V: ToString>(
        mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.pairs
            .push((key.into(), value.map(|v| v.to_string())));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: Option<String>) {
        self.pairs.push((key.into(), value));
    }

    /// Appends every entry of `other`.
    pub fn extend(&mut self, other: QueryParams) {
        self.pairs.extend(other.pairs);
    }

    /// Builds parameters from any struct that serializes to a JSON object.
    ///
    /// `null` members are skipped, strings are used verbatim, and any other
    /// value (numbers, booleans, arrays, nested objects) is JSON-encoded.
    /// Returns `None` when `value` doesn't serialize to an object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Option<Self> {
        let serde_json::Value::Object(map) = serde_json::to_value(value).ok()?
        else {
            return None;
        };
        let pairs = map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                };
                (key, value)
            })
            .collect();
        Some(Self { pairs })
    }

    /// Present entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Percent-encoded `k=v&k=v` string (no leading `?`).
    pub fn to_query_string(&self) -> String {
        self.iter()
            .map(|(k, v)| {
                format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_query_string_skips_absent_values() {
        let params = QueryParams::new()
            .with("page", 2)
            .with_opt("status", None::<String>)
            .with_opt("term", Some("fees"));

        assert_eq!(params.to_query_string(), "page=2&term=fees");
    }

    #[test]
    fn test_to_query_string_percent_encodes() {
        let params = QueryParams::new().with("q", "Ada Lovelace & co");

        assert_eq!(params.to_query_string(), "q=Ada%20Lovelace%20%26%20co");
    }

    #[test]
    fn test_is_empty_when_only_absent_values() {
        let params = QueryParams::new().with_opt("a", None::<u32>);

        assert!(params.is_empty());
    }

    #[test]
    fn test_from_serialize_skips_nulls_and_encodes_values() {
        #[derive(Serialize)]
        struct Filters {
            grade: Option<u8>,
            term: Option<String>,
            active: bool,
        }

        let params = QueryParams::from_serialize(&Filters {
            grade: None,
            term: Some("spring".into()),
            active: true,
        })
        .expect("struct serializes to an object");

        let mut pairs: Vec<_> = params.iter().collect();
        pairs.sort();
        assert_eq!(pairs, vec![("active", "true"), ("term", "spring")]);
    }

    #[test]
    fn test_from_serialize_rejects_non_objects() {
        assert!(QueryParams::from_serialize(&42).is_none());
    }
}
