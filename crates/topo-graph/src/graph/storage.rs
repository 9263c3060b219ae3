//! Graph storage implementation
//!
//! Vertices by id, edges by `(source, target, label)`, plus outgoing and
//! incoming adjacency sets. Ordered maps keep iteration deterministic so
//! that serialization indices and match enumeration are stable.

use std::collections::{BTreeMap, BTreeSet};

use super::{Direction, Edge, EdgeKey, GraphError, Result, Vertex};

/// Graph storage using adjacency sets
#[derive(Debug, Clone, Default)]
pub struct GraphStorage {
    /// Vertices by ID
    vertices: BTreeMap<String, Vertex>,
    /// Edges by identity
    edges: BTreeMap<EdgeKey, Edge>,
    /// Outgoing edges by vertex
    out_edges: BTreeMap<String, BTreeSet<EdgeKey>>,
    /// Incoming edges by vertex
    in_edges: BTreeMap<String, BTreeSet<EdgeKey>>,
}

impl GraphStorage {
    /// Create new storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a vertex
    pub fn insert_vertex(&mut self, vertex: Vertex) {
        let id = vertex.id().to_string();
        self.out_edges.entry(id.clone()).or_default();
        self.in_edges.entry(id.clone()).or_default();
        self.vertices.insert(id, vertex);
    }

    /// Get a vertex reference
    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// Get a mutable vertex reference
    pub fn vertex_mut(&mut self, id: &str) -> Option<&mut Vertex> {
        self.vertices.get_mut(id)
    }

    /// Check if a vertex exists
    pub fn has_vertex(&self, id: &str) -> bool {
        self.vertices.contains_key(id)
    }

    /// Remove a vertex together with every incident edge
    pub fn remove_vertex(&mut self, id: &str) -> Option<(Vertex, Vec<Edge>)> {
        let vertex = self.vertices.remove(id)?;
        let mut incident: BTreeSet<EdgeKey> = BTreeSet::new();
        if let Some(keys) = self.out_edges.remove(id) {
            incident.extend(keys);
        }
        if let Some(keys) = self.in_edges.remove(id) {
            incident.extend(keys);
        }
        let removed = incident
            .iter()
            .filter_map(|key| self.remove_edge(key))
            .collect();
        Some((vertex, removed))
    }

    /// Insert or replace an edge. Missing endpoints are created as bare
    /// vertices; the ids returned are the ones that had to be created.
    pub fn insert_edge(&mut self, edge: Edge) -> Vec<String> {
        let key = edge.key().clone();
        let mut created = Vec::new();
        for id in [&key.source, &key.target] {
            if !self.vertices.contains_key(id.as_str()) {
                self.insert_vertex(Vertex::from_trusted_id(id.clone()));
                created.push(id.clone());
            }
        }
        self.link(&key);
        self.edges.insert(key, edge);
        created
    }

    fn link(&mut self, key: &EdgeKey) {
        self.out_edges
            .entry(key.source.clone())
            .or_default()
            .insert(key.clone());
        self.in_edges
            .entry(key.target.clone())
            .or_default()
            .insert(key.clone());
    }

    /// Get an edge reference
    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// Get a mutable edge reference
    pub fn edge_mut(&mut self, key: &EdgeKey) -> Option<&mut Edge> {
        self.edges.get_mut(key)
    }

    /// Remove an edge
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Option<Edge> {
        let edge = self.edges.remove(key)?;
        if let Some(keys) = self.out_edges.get_mut(&key.source) {
            keys.remove(key);
        }
        if let Some(keys) = self.in_edges.get_mut(&key.target) {
            keys.remove(key);
        }
        Some(edge)
    }

    /// Edges between an ordered pair, any label
    pub fn edges_between<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.out_edges
            .get(source)
            .into_iter()
            .flatten()
            .filter(move |key| key.target == target)
            .filter_map(move |key| self.edges.get(key))
    }

    /// Edges incident to a vertex in the given direction. A self loop is
    /// reported once for `Direction::Both`.
    pub fn incident_edges<'a>(
        &'a self,
        id: &'a str,
        direction: Direction,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        let out = direction
            .includes_out()
            .then(|| self.out_edges.get(id))
            .flatten()
            .into_iter()
            .flatten();
        let incoming = direction
            .includes_in()
            .then(|| self.in_edges.get(id))
            .flatten()
            .into_iter()
            .flatten()
            .filter(move |key| direction != Direction::Both || key.source != key.target);
        out.chain(incoming).filter_map(move |key| self.edges.get(key))
    }

    /// Incident edges paired with the vertex at their other end. An edge
    /// whose other end is not stored is an internal consistency error.
    pub fn checked_neighbors<'a>(
        &'a self,
        id: &'a str,
        direction: Direction,
    ) -> Result<Vec<(&'a Edge, &'a Vertex)>> {
        self.incident_edges(id, direction)
            .map(|edge| {
                let other = edge.other_vertex(id);
                match self.vertices.get(other) {
                    Some(vertex) => Ok((edge, vertex)),
                    None => {
                        tracing::error!(edge = %edge.key(), missing = other, "dangling edge");
                        Err(GraphError::AlgorithmError(format!(
                            "edge {} references missing vertex {}",
                            edge.key(),
                            other
                        )))
                    }
                }
            })
            .collect()
    }

    /// All vertices in id order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    /// All vertex ids in order
    pub fn vertex_ids(&self) -> impl Iterator<Item = &str> {
        self.vertices.keys().map(String::as_str)
    }

    /// All edges in key order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Edge count
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert an edge without creating its endpoints
    #[cfg(test)]
    pub(crate) fn insert_edge_unchecked(&mut self, edge: Edge) {
        let key = edge.key().clone();
        self.link(&key);
        self.edges.insert(key, edge);
    }
}
