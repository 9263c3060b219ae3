//! # Entity Graph
//!
//! In-memory property graph holding the infrastructure topology together
//! with the alarms raised on it. Datasource events become vertex and edge
//! updates; downstream consumers (indexers, the scenario evaluator) observe
//! them through subscriptions and query the graph with predicates, bounded
//! BFS extraction and template matching.
//!
//! ## Quick Start
//!
//! ```
//! use topo_graph::graph::{BfsQuery, Direction, Edge, Graph, Query, Vertex};
//! use serde_json::json;
//!
//! let mut graph = Graph::new("entity_graph");
//! graph.add_vertex(Vertex::bare("node")?.with("type", "openstack.cluster"));
//! graph.add_vertex(Vertex::bare("host-1")?.with("type", "nova.host"));
//! graph.add_vertex(Vertex::bare("vm-1")?.with("type", "nova.instance"));
//! graph.add_edge(Edge::bare("node", "host-1", "contains")?);
//! graph.add_edge(Edge::bare("host-1", "vm-1", "contains")?);
//! graph.set_root_id("node");
//!
//! // Everything within one hop of the root
//! let near = graph.graph_query_vertices(&BfsQuery::new().depth(1));
//! assert_eq!(near.num_vertices(), 2);
//!
//! // Only hosts and the cluster itself
//! let query = Query::compile(&json!({"or": [
//!     {"==": {"type": "openstack.cluster"}},
//!     {"==": {"type": "nova.host"}}
//! ]}))?;
//! let hosts = graph.graph_query_vertices(&BfsQuery::new().query(query).direction(Direction::Out));
//! assert_eq!(hosts.num_edges(), 1);
//! # Ok::<(), topo_graph::GraphError>(())
//! ```
//!
//! ## Element lifecycle
//!
//! ```text
//! absent ──add/update──▶ present ──mark_*_deleted──▶ soft-deleted ──remove_*──▶ absent
//! ```
//!
//! Updates merge: new values overwrite, `PropertyValue::Unset` deletes the
//! key, keys not mentioned are untouched. Lookups of missing elements return
//! `None` or an empty result; only hard removal of a missing element and
//! malformed input are errors.
//!
//! ## Concurrency
//!
//! A `Graph` is a single-writer structure without internal locking. Wrap it
//! in a [`SharedGraph`] to serialise writers while letting traversals and
//! matching run concurrently under read locks.

pub mod edge;
pub mod filter;
pub mod pattern;
pub mod properties;
pub mod props;
pub mod query;
pub mod serialization;
pub mod shared;
pub mod storage;
pub mod subscription;
pub mod traversal;
pub mod vertex;

pub use edge::{Direction, Edge, EdgeKey};
pub use filter::AttrFilter;
pub use pattern::{Anchor, MatchOptions, Mapping, SubgraphMatcher};
pub use properties::{Properties, PropertyBag, PropertyValue};
pub use query::{create_predicate, CompareOp, Predicate, Query};
pub use serialization::{ImportStats, NodeLink, NodeLinkGraph, NodeLinkLink, NodeLinkNode};
pub use shared::SharedGraph;
pub use storage::GraphStorage;
pub use subscription::{GraphChange, Subscriber, Subscribers};
pub use traversal::BfsQuery;
pub use vertex::Vertex;

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::GraphSettings;

/// Graph error types
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Malformed element identity
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed query or filter description
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Internal consistency violation detected by an algorithm
    #[error("algorithm error: {0}")]
    AlgorithmError(String),

    /// Vertex not found
    #[error("vertex not found: {0}")]
    VertexNotFound(String),

    /// Edge not found
    #[error("edge not found: {0}")]
    EdgeNotFound(String),

    /// Matching gave up after its step budget
    #[error("matching exceeded its budget of {0} steps")]
    StepBudgetExceeded(u64),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Serialization(err.to_string())
    }
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Graph metrics
#[derive(Debug, Default)]
pub struct GraphMetrics {
    /// Vertex adds and updates
    pub vertex_updates: AtomicU64,
    /// Edge adds and updates
    pub edge_updates: AtomicU64,
    /// Hard removals (vertices and edges)
    pub removals: AtomicU64,
    /// Subscriber invocations
    pub notifications: AtomicU64,
    /// Pre-mutation snapshots taken for subscribers
    pub snapshot_lookups: AtomicU64,
    /// BFS extractions
    pub traversals: AtomicU64,
    /// Matching runs
    pub match_runs: AtomicU64,
}

impl GraphMetrics {
    fn incr(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            vertex_updates: self.vertex_updates.load(Ordering::Relaxed),
            edge_updates: self.edge_updates.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            snapshot_lookups: self.snapshot_lookups.load(Ordering::Relaxed),
            traversals: self.traversals.load(Ordering::Relaxed),
            match_runs: self.match_runs.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`GraphMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub vertex_updates: u64,
    pub edge_updates: u64,
    pub removals: u64,
    pub notifications: u64,
    pub snapshot_lookups: u64,
    pub traversals: u64,
    pub match_runs: u64,
}

/// Named directed multigraph with change notification
#[derive(Debug)]
pub struct Graph {
    name: String,
    root_id: Option<String>,
    storage: GraphStorage,
    subscribers: Subscribers,
    metrics: GraphMetrics,
}

impl Graph {
    /// Create an empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root_id: None,
            storage: GraphStorage::new(),
            subscribers: Subscribers::default(),
            metrics: GraphMetrics::default(),
        }
    }

    /// Create an empty graph from configuration
    pub fn with_config(settings: &GraphSettings) -> Self {
        let mut graph = Self::new(settings.name.clone());
        graph.root_id = settings.root_id.clone();
        graph
    }

    /// Graph name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Designated root vertex id
    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    /// Set the designated root vertex
    pub fn set_root_id(&mut self, root_id: impl Into<String>) {
        self.root_id = Some(root_id.into());
    }

    /// Metrics
    pub fn metrics(&self) -> &GraphMetrics {
        &self.metrics
    }

    /// Register a change subscriber. Finalization subscribers run after all
    /// regular ones.
    pub fn subscribe<F>(&mut self, subscriber: F, finalization: bool)
    where
        F: Fn(&GraphChange<'_>, &Graph) + Send + Sync + 'static,
    {
        self.subscribers.push(Box::new(subscriber), finalization);
    }

    /// Whether any subscriber is registered
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }

    // ---- vertices ----

    /// Add a vertex; an existing vertex with the same id is merged
    pub fn add_vertex(&mut self, vertex: Vertex) {
        self.update_vertex_with(vertex, true);
    }

    /// Add or merge a vertex
    pub fn update_vertex(&mut self, vertex: Vertex) {
        self.update_vertex_with(vertex, true);
    }

    /// Add or merge a vertex. Without `overwrite`, keys already stored keep
    /// their value; `Unset` entries always delete.
    pub fn update_vertex_with(&mut self, vertex: Vertex, overwrite: bool) {
        let before = self.snapshot_vertex(vertex.id());
        let id = vertex.id().to_string();
        match self.storage.vertex_mut(&id) {
            Some(stored) => stored.properties.merge(&vertex.properties, overwrite),
            None => {
                let mut vertex = vertex;
                vertex.properties.normalize();
                self.storage.insert_vertex(vertex);
            }
        }
        GraphMetrics::incr(&self.metrics.vertex_updates, 1);
        tracing::debug!(graph = %self.name, vertex = %id, "vertex updated");

        if let Some(after) = self.storage.vertex(&id) {
            self.notify(&GraphChange::Vertex {
                before: before.as_ref(),
                after,
            });
        }
    }

    /// Get a copy of a vertex
    pub fn get_vertex(&self, id: &str) -> Option<Vertex> {
        self.storage.vertex(id).cloned()
    }

    /// Borrow a vertex
    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.storage.vertex(id)
    }

    /// Check if a vertex exists
    pub fn has_vertex(&self, id: &str) -> bool {
        self.storage.has_vertex(id)
    }

    /// Hard-remove a vertex and every incident edge
    pub fn remove_vertex(&mut self, id: &str) -> Result<Vertex> {
        let (vertex, edges) = self
            .storage
            .remove_vertex(id)
            .ok_or_else(|| GraphError::VertexNotFound(id.to_string()))?;
        GraphMetrics::incr(&self.metrics.removals, 1 + edges.len() as u64);
        tracing::debug!(
            graph = %self.name,
            vertex = %id,
            edges = edges.len(),
            "vertex removed"
        );
        Ok(vertex)
    }

    /// Vertices passing both the attribute filter and the query (each
    /// optional)
    pub fn get_vertices(&self, filter: Option<&AttrFilter>, query: Option<&Query>) -> Vec<Vertex> {
        self.storage
            .vertices()
            .filter(|v| filter.map_or(true, |f| f.matches(*v)))
            .filter(|v| query.map_or(true, |q| q.matches(*v)))
            .cloned()
            .collect()
    }

    /// All vertices in id order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.storage.vertices()
    }

    /// Number of vertices
    pub fn num_vertices(&self) -> usize {
        self.storage.vertex_count()
    }

    // ---- edges ----

    /// Add an edge; missing endpoints are created as bare vertices and an
    /// existing edge with the same identity is merged
    pub fn add_edge(&mut self, edge: Edge) {
        self.update_edge_with(edge, true);
    }

    /// Add or merge an edge
    pub fn update_edge(&mut self, edge: Edge) {
        self.update_edge_with(edge, true);
    }

    /// Add or merge an edge, see [`Graph::update_vertex_with`]
    pub fn update_edge_with(&mut self, edge: Edge, overwrite: bool) {
        let before = self.snapshot_edge(edge.key());
        let key = edge.key().clone();
        match self.storage.edge_mut(&key) {
            Some(stored) => {
                stored.properties.merge(&edge.properties, overwrite);
                stored.sync_relationship_type();
            }
            None => {
                let mut edge = edge;
                edge.properties.normalize();
                edge.sync_relationship_type();
                let created = self.storage.insert_edge(edge);
                if !created.is_empty() {
                    tracing::debug!(graph = %self.name, vertices = ?created, "created edge endpoints");
                }
            }
        }
        GraphMetrics::incr(&self.metrics.edge_updates, 1);
        tracing::debug!(graph = %self.name, edge = %key, "edge updated");

        if let Some(after) = self.storage.edge(&key) {
            self.notify(&GraphChange::Edge {
                before: before.as_ref(),
                after,
            });
        }
    }

    /// Get a copy of an edge. With no label, the first edge between the
    /// pair (in label order) is returned.
    pub fn get_edge(&self, source: &str, target: &str, label: Option<&str>) -> Option<Edge> {
        match label {
            Some(label) => self
                .storage
                .edge(&EdgeKey::new(source, target, label))
                .cloned(),
            None => self.storage.edges_between(source, target).next().cloned(),
        }
    }

    /// Borrow an edge
    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.storage.edge(key)
    }

    /// Hard-remove an edge
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Result<Edge> {
        let edge = self
            .storage
            .remove_edge(key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.to_string()))?;
        GraphMetrics::incr(&self.metrics.removals, 1);
        tracing::debug!(graph = %self.name, edge = %key, "edge removed");
        Ok(edge)
    }

    /// Edges incident to a vertex in `direction` passing `filter`
    pub fn get_edges(
        &self,
        vertex_id: &str,
        direction: Direction,
        filter: Option<&AttrFilter>,
    ) -> Vec<Edge> {
        self.storage
            .incident_edges(vertex_id, direction)
            .filter(|e| filter.map_or(true, |f| f.matches(*e)))
            .cloned()
            .collect()
    }

    /// All edges in key order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.storage.edges()
    }

    /// Number of edges
    pub fn num_edges(&self) -> usize {
        self.storage.edge_count()
    }

    /// Distinct neighbours reached over edges passing `edge_filter` that
    /// themselves pass `vertex_filter`
    pub fn neighbors(
        &self,
        vertex_id: &str,
        vertex_filter: Option<&AttrFilter>,
        edge_filter: Option<&AttrFilter>,
        direction: Direction,
    ) -> Vec<Vertex> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        for edge in self.storage.incident_edges(vertex_id, direction) {
            if !edge_filter.map_or(true, |f| f.matches(edge)) {
                continue;
            }
            let other = edge.other_vertex(vertex_id);
            if seen.contains(other) {
                continue;
            }
            match self.storage.vertex(other) {
                Some(vertex) => {
                    seen.insert(other);
                    if vertex_filter.map_or(true, |f| f.matches(vertex)) {
                        result.push(vertex.clone());
                    }
                }
                None => tracing::warn!(edge = %edge.key(), "edge endpoint missing"),
            }
        }
        result
    }

    // ---- soft delete and placeholders ----

    /// Mark a vertex deleted through the ordinary update path
    pub fn mark_vertex_deleted(&mut self, id: &str, timestamp: DateTime<Utc>) -> Result<()> {
        if !self.storage.has_vertex(id) {
            return Err(GraphError::VertexNotFound(id.to_string()));
        }
        let patch = Vertex::bare(id)?
            .with(props::vertex::IS_DELETED, true)
            .with(props::vertex::UPDATE_TIMESTAMP, timestamp);
        self.update_vertex(patch);
        Ok(())
    }

    /// Mark an edge deleted through the ordinary update path
    pub fn mark_edge_deleted(&mut self, key: &EdgeKey, timestamp: DateTime<Utc>) -> Result<()> {
        if self.storage.edge(key).is_none() {
            return Err(GraphError::EdgeNotFound(key.to_string()));
        }
        let patch = Edge::bare(key.source.as_str(), key.target.as_str(), key.label.as_str())?
            .with(props::edge::IS_DELETED, true)
            .with(props::edge::UPDATE_TIMESTAMP, timestamp);
        self.update_edge(patch);
        Ok(())
    }

    /// Whether `id` is a placeholder with no non-deleted incident edge
    pub fn is_removable_placeholder(&self, id: &str) -> bool {
        match self.storage.vertex(id) {
            Some(vertex) if vertex.is_placeholder() => self
                .storage
                .incident_edges(id, Direction::Both)
                .all(|e| e.is_deleted()),
            _ => false,
        }
    }

    /// Hard-remove a placeholder vertex if it is eligible
    pub fn delete_placeholder_vertex(&mut self, id: &str) -> Result<bool> {
        if !self.is_removable_placeholder(id) {
            return Ok(false);
        }
        self.remove_vertex(id)?;
        Ok(true)
    }

    // ---- whole-graph operations ----

    /// Independent copy with the same name and root; subscribers are not
    /// carried over
    pub fn copy(&self) -> Graph {
        Graph {
            name: self.name.clone(),
            root_id: self.root_id.clone(),
            storage: self.storage.clone(),
            subscribers: Subscribers::default(),
            metrics: GraphMetrics::default(),
        }
    }

    /// Merge every vertex and edge of `other` into this graph
    pub fn union(&mut self, other: &Graph) {
        for vertex in other.vertices() {
            self.update_vertex(vertex.clone());
        }
        for edge in other.edges() {
            self.update_edge(edge.clone());
        }
        if self.root_id.is_none() {
            self.root_id = other.root_id.clone();
        }
    }

    /// Induced subgraph on `ids`: those vertices and every edge with both
    /// endpoints among them. Unknown ids are ignored.
    pub fn subgraph<'a, I>(&self, ids: I) -> Graph
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: BTreeSet<&str> = ids
            .into_iter()
            .filter(|id| self.storage.has_vertex(id))
            .collect();
        self.subgraph_where(&keep, |_| true)
    }

    fn subgraph_where<F>(&self, keep: &BTreeSet<&str>, edge_ok: F) -> Graph
    where
        F: Fn(&Edge) -> bool,
    {
        let mut result = Graph::new(self.name.clone());
        result.root_id = self
            .root_id
            .clone()
            .filter(|root| keep.contains(root.as_str()));
        for id in keep {
            if let Some(vertex) = self.storage.vertex(id) {
                result.storage.insert_vertex(vertex.clone());
            }
        }
        for id in keep {
            for edge in self.storage.incident_edges(id, Direction::Out) {
                if keep.contains(edge.target_id()) && edge_ok(edge) {
                    result.storage.insert_edge(edge.clone());
                }
            }
        }
        result
    }

    fn snapshot_vertex(&self, id: &str) -> Option<Vertex> {
        if self.subscribers.is_empty() {
            return None;
        }
        GraphMetrics::incr(&self.metrics.snapshot_lookups, 1);
        self.storage.vertex(id).cloned()
    }

    fn snapshot_edge(&self, key: &EdgeKey) -> Option<Edge> {
        if self.subscribers.is_empty() {
            return None;
        }
        GraphMetrics::incr(&self.metrics.snapshot_lookups, 1);
        self.storage.edge(key).cloned()
    }

    fn notify(&self, change: &GraphChange<'_>) {
        if self.subscribers.is_empty() {
            return;
        }
        let called = self.subscribers.notify(change, self);
        GraphMetrics::incr(&self.metrics.notifications, called as u64);
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("entity_graph")
    }
}
