//! Property values and property bags
//!
//! Vertices and edges carry a [`Properties`] bag. A value of
//! [`PropertyValue::Unset`] is the explicit "absent" marker: it reads as
//! missing, is ignored by equality, and deletes the key when merged into a
//! stored element.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

/// Property value type
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Point in time
    Timestamp(DateTime<Utc>),
    /// List of values
    List(Vec<PropertyValue>),
    /// Map of values
    Map(HashMap<String, PropertyValue>),
    /// Absent marker; never stored
    Unset,
}

impl PropertyValue {
    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as timestamp. RFC 3339 strings are accepted too.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::Timestamp(t) => Some(*t),
            PropertyValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Check if this is the absent marker
    pub fn is_unset(&self) -> bool {
        matches!(self, PropertyValue::Unset)
    }

    /// Equality across numeric representations (`1 == 1.0`); otherwise
    /// structural.
    pub fn loose_eq(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Integer(a), PropertyValue::Float(b))
            | (PropertyValue::Float(b), PropertyValue::Integer(a)) => (*a as f64) == *b,
            (PropertyValue::Timestamp(_), PropertyValue::String(_))
            | (PropertyValue::String(_), PropertyValue::Timestamp(_)) => {
                match (self.as_timestamp(), other.as_timestamp()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (PropertyValue::List(a), PropertyValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// Ordering between comparable values. Strings order as strings,
    /// numbers numerically, timestamps chronologically. Anything else
    /// (including `Unset`) is incomparable.
    pub fn loose_cmp(&self, other: &PropertyValue) -> Option<std::cmp::Ordering> {
        use PropertyValue::*;
        match (self, other) {
            (String(a), String(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(_) | Float(_), Integer(_) | Float(_)) => {
                self.as_float()?.partial_cmp(&other.as_float()?)
            }
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Timestamp(_), Timestamp(_) | String(_)) | (String(_), Timestamp(_)) => {
                Some(self.as_timestamp()?.cmp(&other.as_timestamp()?))
            }
            (List(a), List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.loose_cmp(y)? {
                        std::cmp::Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Render as the plain string used by regex filters. Strings are not
    /// quoted, unlike `Display`.
    pub fn to_plain_string(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            other => other.to_json().to_string(),
        }
    }

    /// Convert to JSON. `Unset` becomes `null`, timestamps become RFC 3339.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Integer(i) => Value::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::Boolean(b) => Value::Bool(*b),
            PropertyValue::Timestamp(t) => {
                Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            PropertyValue::List(l) => Value::Array(l.iter().map(|v| v.to_json()).collect()),
            PropertyValue::Map(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            PropertyValue::Unset => Value::Null,
        }
    }

    /// Convert from JSON. `null` becomes `Unset`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => PropertyValue::Unset,
            Value::Bool(b) => PropertyValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::Array(a) => PropertyValue::List(a.iter().map(Self::from_json).collect()),
            Value::Object(o) => PropertyValue::Map(
                o.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(t: DateTime<Utc>) -> Self {
        PropertyValue::Timestamp(t)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        PropertyValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Unset)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            PropertyValue::List(l) => write!(f, "[{} items]", l.len()),
            PropertyValue::Map(m) => write!(f, "{{{} entries}}", m.len()),
            PropertyValue::Unset => write!(f, "unset"),
        }
    }
}

/// Property bag of a vertex or edge.
///
/// Entries holding [`PropertyValue::Unset`] are kept so that an element can
/// describe a patch ("delete this key"), but they read as missing and do
/// not take part in equality.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: HashMap<String, PropertyValue>,
}

impl Properties {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property; `Unset` entries read as missing
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key).filter(|v| !v.is_unset())
    }

    /// Set a property. Setting `Unset` records a deletion marker.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove a property entirely (marker included)
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key).filter(|v| !v.is_unset())
    }

    /// Check if property exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of set properties
    pub fn len(&self) -> usize {
        self.entries.values().filter(|v| !v.is_unset()).count()
    }

    /// Check if no property is set
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over set properties
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter().filter(|(_, v)| !v.is_unset())
    }

    /// Iterate over all entries, deletion markers included
    pub fn entries(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter()
    }

    /// Apply `patch` onto this bag. With `overwrite` unset, keys already
    /// present keep their value; `Unset` entries in the patch always delete.
    pub fn merge(&mut self, patch: &Properties, overwrite: bool) {
        for (key, value) in patch.entries() {
            if value.is_unset() {
                self.entries.remove(key);
            } else if overwrite || !self.contains_key(key) {
                self.entries.insert(key.clone(), value.clone());
            }
        }
        self.normalize();
    }

    /// Drop every deletion marker
    pub fn normalize(&mut self) {
        self.entries.retain(|_, v| !v.is_unset());
    }

    /// Convert to a JSON object (markers dropped)
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
    }

    /// Build from a JSON object; `null` values become deletion markers
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        map.iter()
            .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
            .collect()
    }
}

/// Anything carrying a property bag that filters and queries can inspect
pub trait PropertyBag {
    /// Look a property up; missing and `Unset` both read as `None`
    fn property(&self, key: &str) -> Option<&PropertyValue>;
}

impl PropertyBag for Properties {
    fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.get(key)
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, PropertyValue>> for Properties {
    fn from(entries: HashMap<String, PropertyValue>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_value_conversions() {
        let s: PropertyValue = "hello".into();
        assert_eq!(s.as_string(), Some("hello"));

        let i: PropertyValue = 42i64.into();
        assert_eq!(i.as_integer(), Some(42));
        assert_eq!(i.as_float(), Some(42.0));

        let b: PropertyValue = true.into();
        assert_eq!(b.as_boolean(), Some(true));

        let none: PropertyValue = Option::<i64>::None.into();
        assert!(none.is_unset());
    }

    #[test]
    fn test_timestamp_from_string() {
        let v = PropertyValue::from("2024-05-01T10:00:00Z");
        let ts = v.as_timestamp().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_json_conversion() {
        let value = json!({"a": 1, "b": [true, "x"], "c": null, "d": 1.5});
        let prop = PropertyValue::from_json(&value);
        match &prop {
            PropertyValue::Map(m) => {
                assert_eq!(m.get("a"), Some(&PropertyValue::Integer(1)));
                assert_eq!(m.get("c"), Some(&PropertyValue::Unset));
                assert_eq!(m.get("d"), Some(&PropertyValue::Float(1.5)));
            }
            other => panic!("expected map, got {:?}", other),
        }
        assert_eq!(prop.to_json(), value);
    }

    #[test]
    fn test_loose_comparisons() {
        use std::cmp::Ordering;

        assert!(PropertyValue::Integer(1).loose_eq(&PropertyValue::Float(1.0)));
        assert!(!PropertyValue::from("1").loose_eq(&PropertyValue::Integer(1)));
        assert_eq!(
            PropertyValue::Integer(2).loose_cmp(&PropertyValue::Float(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            PropertyValue::from("abc").loose_cmp(&PropertyValue::from("abd")),
            Some(Ordering::Less)
        );
        assert_eq!(PropertyValue::Unset.loose_cmp(&PropertyValue::Integer(1)), None);
        assert_eq!(PropertyValue::from("x").loose_cmp(&PropertyValue::Integer(1)), None);
    }

    #[test]
    fn test_unset_reads_as_missing() {
        let mut props = Properties::new();
        props.set("state", "ACTIVE");
        props.set("gone", PropertyValue::Unset);

        assert!(props.contains_key("state"));
        assert!(!props.contains_key("gone"));
        assert_eq!(props.len(), 1);
        assert_eq!(props.entries().count(), 2);
    }

    #[test]
    fn test_equality_ignores_unset() {
        let a: Properties = [("x", PropertyValue::from(1i64))].into_iter().collect();
        let mut b = a.clone();
        b.set("y", PropertyValue::Unset);
        assert_eq!(a, b);

        b.set("y", 2i64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_merge_semantics() {
        let mut stored: Properties = [
            ("state", PropertyValue::from("ACTIVE")),
            ("name", PropertyValue::from("vm-1")),
            ("flag", PropertyValue::from(true)),
        ]
        .into_iter()
        .collect();

        let patch: Properties = [
            ("state", PropertyValue::from("ERROR")),
            ("flag", PropertyValue::Unset),
        ]
        .into_iter()
        .collect();

        stored.merge(&patch, true);
        assert_eq!(stored.get("state"), Some(&PropertyValue::from("ERROR")));
        assert_eq!(stored.get("name"), Some(&PropertyValue::from("vm-1")));
        assert!(!stored.contains_key("flag"));
        assert_eq!(stored.entries().count(), 2);
    }

    #[test]
    fn test_merge_without_overwrite() {
        let mut stored: Properties = [("state", "ACTIVE")].into_iter().collect();
        let patch: Properties = [("state", "ERROR"), ("name", "vm-1")].into_iter().collect();

        stored.merge(&patch, false);
        assert_eq!(stored.get("state"), Some(&PropertyValue::from("ACTIVE")));
        assert_eq!(stored.get("name"), Some(&PropertyValue::from("vm-1")));
    }
}
