//! Bounded BFS subgraph extraction
//!
//! [`Graph::graph_query_vertices`] walks breadth-first from a root vertex,
//! only stepping onto neighbours that satisfy the vertex query, and returns
//! the subgraph *induced* by the visited vertices: every edge between two
//! visited vertices is included, whether or not the walk used it.
//!
//! The root is a gate. If it fails the query the result is empty, no matter
//! what its neighbours look like.

use std::collections::{BTreeSet, VecDeque};

use super::{AttrFilter, Direction, Graph, GraphMetrics, Query, Result};

/// Parameters of a BFS extraction
#[derive(Debug, Clone, Default)]
pub struct BfsQuery {
    query: Option<Query>,
    edge_query: Option<Query>,
    root_id: Option<String>,
    depth: Option<usize>,
    direction: Direction,
}

impl BfsQuery {
    /// Accept-all walk from the graph root in both directions, unbounded
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertex predicate; applied to the root and to every neighbour
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Compile and set the vertex predicate
    pub fn query_json(self, query: &serde_json::Value) -> Result<Self> {
        Ok(self.query(Query::compile(query)?))
    }

    /// Edge predicate; only edges passing it are followed
    pub fn edge_query(mut self, query: Query) -> Self {
        self.edge_query = Some(query);
        self
    }

    /// Start vertex; defaults to the graph root
    pub fn root(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = Some(root_id.into());
        self
    }

    /// Maximum hop count from the root
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Edge direction to follow
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

impl Graph {
    /// Extract the subgraph reachable from the root through vertices that
    /// satisfy the query, at most `depth` hops away
    pub fn graph_query_vertices(&self, bfs: &BfsQuery) -> Graph {
        GraphMetrics::incr(&self.metrics.traversals, 1);

        let root = match bfs.root_id.as_deref().or(self.root_id.as_deref()) {
            Some(root) => root,
            None => {
                tracing::debug!(graph = %self.name, "no root for traversal");
                return self.subgraph_where(&BTreeSet::new(), |_| true);
            }
        };
        let root_vertex = match self.storage.vertex(root) {
            Some(vertex) => vertex,
            None => {
                tracing::debug!(graph = %self.name, root, "traversal root not found");
                return self.subgraph_where(&BTreeSet::new(), |_| true);
            }
        };
        if !bfs.query.as_ref().map_or(true, |q| q.matches(root_vertex)) {
            tracing::info!(graph = %self.name, root, "root does not match query, empty result");
            return self.subgraph_where(&BTreeSet::new(), |_| true);
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        visited.insert(root_vertex.id());
        queue.push_back((root_vertex.id(), 0));

        while let Some((id, current_depth)) = queue.pop_front() {
            if bfs.depth.is_some_and(|max| current_depth >= max) {
                continue;
            }
            for edge in self.storage.incident_edges(id, bfs.direction) {
                if !bfs.edge_query.as_ref().map_or(true, |q| q.matches(edge)) {
                    continue;
                }
                let other = edge.other_vertex(id);
                if visited.contains(other) {
                    continue;
                }
                let Some(neighbor) = self.storage.vertex(other) else {
                    tracing::warn!(edge = %edge.key(), "edge endpoint missing");
                    continue;
                };
                if bfs.query.as_ref().map_or(true, |q| q.matches(neighbor)) {
                    visited.insert(neighbor.id());
                    queue.push_back((neighbor.id(), current_depth + 1));
                }
            }
        }

        tracing::debug!(
            graph = %self.name,
            root,
            vertices = visited.len(),
            "bfs extraction done"
        );
        self.subgraph_where(&visited, |_| true)
    }

    /// Subgraph of every vertex passing both vertex criteria, with the
    /// edges between them that pass `edge_filter`
    pub fn create_graph_from_matching_vertices(
        &self,
        vertex_filter: Option<&AttrFilter>,
        query: Option<&Query>,
        edge_filter: Option<&AttrFilter>,
    ) -> Graph {
        let keep: BTreeSet<&str> = self
            .storage
            .vertices()
            .filter(|v| vertex_filter.map_or(true, |f| f.matches(*v)))
            .filter(|v| query.map_or(true, |q| q.matches(*v)))
            .map(|v| v.id())
            .collect();
        self.subgraph_where(&keep, |e| edge_filter.map_or(true, |f| f.matches(e)))
    }
}
