//! Flat attribute filters
//!
//! An [`AttrFilter`] is the light-weight alternative to a compiled
//! [`Query`](super::Query): a flat map from property name to one allowed
//! value or a list of allowed values. Every entry must hold for an element
//! to match.
//!
//! A key ending in `.regex` is matched differently: its value is compiled
//! as a regular expression that must match at the *start* of the string
//! value of the key without the suffix (prefix match, not full match).
//!
//! ```text
//! {"category": "ALARM", "type": ["nova.host", "nova.instance"], "name.regex": "vm-"}
//! ```

use regex::Regex;

use super::{GraphError, Properties, PropertyBag, PropertyValue, Result};

/// Suffix that turns a filter key into a regex prefix match
pub const REGEX_SUFFIX: &str = ".regex";

#[derive(Debug, Clone)]
enum Condition {
    OneOf(Vec<PropertyValue>),
    Prefix { pattern: String, regex: Regex },
}

#[derive(Debug, Clone)]
struct Entry {
    /// Key as written in the filter (suffix kept)
    key: String,
    /// Property the condition reads
    property: String,
    condition: Condition,
}

/// Flat attribute filter
#[derive(Debug, Clone, Default)]
pub struct AttrFilter {
    entries: Vec<Entry>,
}

impl AttrFilter {
    /// Empty filter; matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to equal `value`. `PropertyValue::List` is treated as a
    /// set of allowed values. A key with the `.regex` suffix compiles the
    /// string value as a prefix-anchored pattern.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Result<Self> {
        self.insert(key.into(), value.into())?;
        Ok(self)
    }

    /// Require `key` to equal one of `values`
    pub fn with_any<V: Into<PropertyValue>>(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let values = values.into_iter().map(Into::into).collect();
        self.insert(key.into(), PropertyValue::List(values))?;
        Ok(self)
    }

    /// Build from a JSON object
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            GraphError::InvalidQuery(format!("attribute filter must be an object: {}", value))
        })?;
        let mut filter = Self::new();
        for (key, value) in map {
            filter.insert(key.clone(), PropertyValue::from_json(value))?;
        }
        Ok(filter)
    }

    /// Use a property bag as a filter: every set property becomes an entry
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let mut filter = Self::new();
        for (key, value) in properties.iter() {
            filter.insert(key.clone(), value.clone())?;
        }
        Ok(filter)
    }

    fn insert(&mut self, key: String, value: PropertyValue) -> Result<()> {
        let lowered = key.to_ascii_lowercase();
        let entry = if lowered.ends_with(REGEX_SUFFIX) && key.len() > REGEX_SUFFIX.len() {
            let pattern = value.as_string().ok_or_else(|| {
                GraphError::InvalidQuery(format!("regex filter `{}` needs a string pattern", key))
            })?;
            let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
                GraphError::InvalidQuery(format!("invalid regex for `{}`: {}", key, e))
            })?;
            Entry {
                property: key[..key.len() - REGEX_SUFFIX.len()].to_string(),
                key,
                condition: Condition::Prefix {
                    pattern: pattern.to_string(),
                    regex,
                },
            }
        } else {
            let allowed = match value {
                PropertyValue::List(values) => values,
                single => vec![single],
            };
            Entry {
                property: key.clone(),
                key,
                condition: Condition::OneOf(allowed),
            }
        };
        self.entries.retain(|e| e.key != entry.key);
        self.entries.push(entry);
        Ok(())
    }

    /// Check if the filter has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Filter keys as written
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Check an element against every entry
    pub fn matches<B: PropertyBag + ?Sized>(&self, element: &B) -> bool {
        self.matches_ignoring(element, &[])
    }

    /// Check an element, skipping entries whose key is listed in `ignore`
    pub fn matches_ignoring<B: PropertyBag + ?Sized>(&self, element: &B, ignore: &[&str]) -> bool {
        self.entries
            .iter()
            .filter(|e| !ignore.contains(&e.key.as_str()))
            .all(|e| Self::entry_matches(e, element))
    }

    fn entry_matches<B: PropertyBag + ?Sized>(entry: &Entry, element: &B) -> bool {
        let actual = element.property(&entry.property);
        match &entry.condition {
            Condition::OneOf(allowed) => {
                let actual = actual.unwrap_or(&PropertyValue::Unset);
                allowed.iter().any(|a| a.loose_eq(actual))
            }
            Condition::Prefix { regex, .. } => match actual {
                Some(value) => regex.is_match(&value.to_plain_string()),
                None => false,
            },
        }
    }

    /// Convert back to the flat JSON form
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|e| {
                let value = match &e.condition {
                    Condition::OneOf(allowed) if allowed.len() == 1 => allowed[0].to_json(),
                    Condition::OneOf(allowed) => {
                        serde_json::Value::Array(allowed.iter().map(|v| v.to_json()).collect())
                    }
                    Condition::Prefix { pattern, .. } => serde_json::Value::String(pattern.clone()),
                };
                (e.key.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Vertex;
    use serde_json::json;

    fn host() -> Vertex {
        Vertex::bare("h1")
            .unwrap()
            .with("category", "RESOURCE")
            .with("type", "nova.host")
            .with("name", "compute-0-1")
            .with("cpus", 8i64)
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(AttrFilter::new().matches(&host()));
    }

    #[test]
    fn test_single_value() {
        let f = AttrFilter::new().with("type", "nova.host").unwrap();
        assert!(f.matches(&host()));

        let f = AttrFilter::new().with("type", "nova.instance").unwrap();
        assert!(!f.matches(&host()));
    }

    #[test]
    fn test_membership() {
        let f = AttrFilter::new()
            .with_any("type", ["nova.instance", "nova.host"])
            .unwrap()
            .with("category", "RESOURCE")
            .unwrap();
        assert!(f.matches(&host()));

        let f = AttrFilter::new()
            .with_any("type", ["cinder.volume", "neutron.port"])
            .unwrap();
        assert!(!f.matches(&host()));
    }

    #[test]
    fn test_numeric_membership_is_loose() {
        let f = AttrFilter::new().with("cpus", 8.0).unwrap();
        assert!(f.matches(&host()));
    }

    #[test]
    fn test_missing_key() {
        let f = AttrFilter::new().with("state", "ACTIVE").unwrap();
        assert!(!f.matches(&host()));

        // An explicit null allows the key to be absent
        let f = AttrFilter::from_json(&json!({"state": null})).unwrap();
        assert!(f.matches(&host()));
    }

    #[test]
    fn test_regex_is_prefix_match() {
        let f = AttrFilter::new().with("name.regex", "compute-0").unwrap();
        assert!(f.matches(&host()));

        let f = AttrFilter::new().with("name.regex", "0-1").unwrap();
        assert!(!f.matches(&host()));

        let f = AttrFilter::new().with("name.REGEX", "comp.*-1$").unwrap();
        assert!(f.matches(&host()));
    }

    #[test]
    fn test_regex_missing_key_fails() {
        let f = AttrFilter::new().with("state.regex", ".*").unwrap();
        assert!(!f.matches(&host()));
    }

    #[test]
    fn test_invalid_regex() {
        let err = AttrFilter::new().with("name.regex", "(unclosed").unwrap_err();
        assert!(matches!(err, GraphError::InvalidQuery(_)));
    }

    #[test]
    fn test_matches_ignoring() {
        let f = AttrFilter::new()
            .with("type", "nova.host")
            .unwrap()
            .with("scratch", "x")
            .unwrap();
        assert!(!f.matches(&host()));
        assert!(f.matches_ignoring(&host(), &["scratch"]));
    }

    #[test]
    fn test_json_round_trip() {
        let source = json!({"type": ["a", "b"], "name.regex": "vm-", "category": "ALARM"});
        let f = AttrFilter::from_json(&source).unwrap();
        assert_eq!(f.len(), 3);
        assert_eq!(f.to_json(), source);
    }

    #[test]
    fn test_from_properties() {
        let pattern = Vertex::bare("p")
            .unwrap()
            .with("type", "nova.host")
            .with("name.regex", "compute")
            .with("ignored", PropertyValue::Unset);
        let f = AttrFilter::from_properties(&pattern.properties).unwrap();
        assert_eq!(f.len(), 2);
        assert!(f.matches(&host()));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(AttrFilter::from_json(&json!([1, 2])).is_err());
    }
}
