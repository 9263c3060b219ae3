//! Graph vertex type

use super::props;
use super::{GraphError, Properties, PropertyBag, PropertyValue, Result};

/// A vertex (node) in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    id: String,
    /// Property bag
    pub properties: Properties,
}

impl Vertex {
    /// Create a new vertex. Fails with `InvalidArgument` on an empty id.
    pub fn new(id: impl Into<String>, properties: Properties) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(GraphError::InvalidArgument(
                "vertex id must not be empty".to_string(),
            ));
        }
        Ok(Self { id, properties })
    }

    /// Create a vertex without properties
    pub fn bare(id: impl Into<String>) -> Result<Self> {
        Self::new(id, Properties::new())
    }

    /// Vertex for an id already known to be non-empty (an edge endpoint)
    pub(crate) fn from_trusted_id(id: String) -> Self {
        debug_assert!(!id.is_empty());
        Self {
            id,
            properties: Properties::new(),
        }
    }

    /// Builder-style property setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Vertex identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get a property
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Get a property or fall back to `default`
    pub fn get_or<'a>(&'a self, key: &str, default: &'a PropertyValue) -> &'a PropertyValue {
        self.get(key).unwrap_or(default)
    }

    /// Get a string property
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_string())
    }

    /// Get a boolean property
    pub fn get_boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_boolean())
    }

    /// Set a property; `PropertyValue::Unset` marks the key for deletion
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.set(key, value);
    }

    /// Delete a property
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    /// Soft delete flag
    pub fn is_deleted(&self) -> bool {
        self.get_boolean(props::vertex::IS_DELETED).unwrap_or(false)
    }

    /// Placeholder flag
    pub fn is_placeholder(&self) -> bool {
        self.get_boolean(props::vertex::IS_PLACEHOLDER)
            .unwrap_or(false)
    }
}

impl PropertyBag for Vertex {
    fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

impl std::fmt::Display for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vertex({}, {} properties)", self.id, self.properties.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_creation() {
        let v = Vertex::bare("host-1")
            .unwrap()
            .with(props::vertex::TYPE, "nova.host")
            .with(props::vertex::STATE, "AVAILABLE");

        assert_eq!(v.id(), "host-1");
        assert_eq!(v.get_string(props::vertex::TYPE), Some("nova.host"));
        assert!(!v.is_deleted());
        assert!(!v.is_placeholder());
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = Vertex::bare("").unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    fn test_get_or_default() {
        let v = Vertex::bare("a").unwrap().with("x", 1i64);
        let fallback = PropertyValue::from("none");
        assert_eq!(v.get_or("x", &fallback), &PropertyValue::Integer(1));
        assert_eq!(v.get_or("y", &fallback), &fallback);
    }

    #[test]
    fn test_set_unset_removes_visibility() {
        let mut v = Vertex::bare("a").unwrap().with("state", "ACTIVE");
        v.set("state", PropertyValue::Unset);
        assert!(v.get("state").is_none());
        assert_eq!(v, Vertex::bare("a").unwrap());
    }

    #[test]
    fn test_equality_includes_properties() {
        let a = Vertex::bare("a").unwrap().with("state", "ACTIVE");
        let b = Vertex::bare("a").unwrap().with("state", "ERROR");
        let c = Vertex::bare("b").unwrap().with("state", "ACTIVE");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.clone());
    }
}
