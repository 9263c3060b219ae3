//! Graph edge types
//!
//! Edges are directed and labelled. The triple `(source, target, label)` is
//! the edge identity, so two vertices may be joined by several edges as long
//! as their labels differ.

use super::props;
use super::{GraphError, Properties, PropertyBag, PropertyValue, Result};

/// Edge direction relative to a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Outgoing edges (from this vertex)
    Out,
    /// Incoming edges (to this vertex)
    In,
    /// Both directions
    #[default]
    Both,
}

impl Direction {
    /// Includes outgoing edges
    pub fn includes_out(self) -> bool {
        matches!(self, Direction::Out | Direction::Both)
    }

    /// Includes incoming edges
    pub fn includes_in(self) -> bool {
        matches!(self, Direction::In | Direction::Both)
    }
}

/// Edge identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    /// Source vertex id
    pub source: String,
    /// Target vertex id
    pub target: String,
    /// Relationship label
    pub label: String,
}

impl EdgeKey {
    /// Build a key from its parts
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
        }
    }

    /// The endpoint that is not `vertex_id`. Self loops return the vertex itself.
    pub fn other(&self, vertex_id: &str) -> &str {
        if self.source == vertex_id {
            &self.target
        } else {
            &self.source
        }
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.label, self.target)
    }
}

/// An edge (relationship) in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    key: EdgeKey,
    /// Property bag
    pub properties: Properties,
}

impl Edge {
    /// Create a new edge. Fails with `InvalidArgument` when the source,
    /// target or label is empty. `relationship_type` always mirrors the
    /// label; a conflicting value in `properties` is replaced.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
        properties: Properties,
    ) -> Result<Self> {
        let key = EdgeKey::new(source, target, label);
        for (field, value) in [
            ("source", &key.source),
            ("target", &key.target),
            ("label", &key.label),
        ] {
            if value.is_empty() {
                return Err(GraphError::InvalidArgument(format!(
                    "edge {} must not be empty",
                    field
                )));
            }
        }
        let mut edge = Self { key, properties };
        edge.sync_relationship_type();
        Ok(edge)
    }

    /// Reset `relationship_type` to the label
    pub(crate) fn sync_relationship_type(&mut self) {
        if self.properties.get(props::edge::RELATIONSHIP_TYPE).and_then(|v| v.as_string())
            != Some(self.key.label.as_str())
        {
            self.properties
                .set(props::edge::RELATIONSHIP_TYPE, self.key.label.as_str());
        }
    }

    /// Create an edge with only its relationship property
    pub fn bare(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<Self> {
        Self::new(source, target, label, Properties::new())
    }

    /// Builder-style property setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Edge identity
    pub fn key(&self) -> &EdgeKey {
        &self.key
    }

    /// Source vertex id
    pub fn source_id(&self) -> &str {
        &self.key.source
    }

    /// Target vertex id
    pub fn target_id(&self) -> &str {
        &self.key.target
    }

    /// Relationship label
    pub fn label(&self) -> &str {
        &self.key.label
    }

    /// The endpoint that is not `vertex_id`
    pub fn other_vertex(&self, vertex_id: &str) -> &str {
        self.key.other(vertex_id)
    }

    /// Get a property
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Get a property or fall back to `default`
    pub fn get_or<'a>(&'a self, key: &str, default: &'a PropertyValue) -> &'a PropertyValue {
        self.get(key).unwrap_or(default)
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
        self.get(props::edge::IS_DELETED)
            .and_then(|v| v.as_boolean())
            .unwrap_or(false)
    }
}

impl PropertyBag for Edge {
    fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Edge({})", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_creation() {
        let e = Edge::bare("host-1", "vm-1", "contains").unwrap();
        assert_eq!(e.source_id(), "host-1");
        assert_eq!(e.target_id(), "vm-1");
        assert_eq!(e.label(), "contains");
        assert_eq!(
            e.get(props::edge::RELATIONSHIP_TYPE),
            Some(&PropertyValue::from("contains"))
        );
        assert!(!e.is_deleted());
    }

    #[test]
    fn test_empty_identity_rejected() {
        for (s, t, l) in [("", "x", "on"), ("x", "", "on"), ("x", "y", "")] {
            let err = Edge::bare(s, t, l).unwrap_err();
            assert!(matches!(err, GraphError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_other_vertex() {
        let e = Edge::bare("a", "b", "on").unwrap();
        assert_eq!(e.other_vertex("a"), "b");
        assert_eq!(e.other_vertex("b"), "a");

        let looped = Edge::bare("a", "a", "on").unwrap();
        assert_eq!(looped.other_vertex("a"), "a");
    }

    #[test]
    fn test_relationship_type_follows_label() {
        let bag: Properties = [(props::edge::RELATIONSHIP_TYPE, "attached")]
            .into_iter()
            .collect();
        let e = Edge::new("a", "b", "on", bag).unwrap();
        assert_eq!(e.label(), "on");
        assert_eq!(
            e.get(props::edge::RELATIONSHIP_TYPE),
            Some(&PropertyValue::from("on"))
        );
    }

    #[test]
    fn test_direction() {
        assert!(Direction::Both.includes_in());
        assert!(Direction::Both.includes_out());
        assert!(!Direction::In.includes_out());
    }

    #[test]
    fn test_edge_equality() {
        let a = Edge::bare("a", "b", "on").unwrap().with("weight", 1i64);
        let b = Edge::bare("a", "b", "on").unwrap().with("weight", 1i64);
        let c = Edge::bare("a", "b", "attached").unwrap().with("weight", 1i64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
