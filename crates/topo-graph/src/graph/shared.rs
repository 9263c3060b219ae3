//! Shared graph handle
//!
//! [`Graph`] has no internal locking. `SharedGraph` puts it behind a
//! `parking_lot::RwLock` so that one writer at a time mutates it while any
//! number of readers run traversals or matching against a quiescent graph.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

use super::{Anchor, BfsQuery, Graph, MatchOptions, Mapping, Result};

/// Cloneable, thread-safe handle to a graph
#[derive(Debug, Clone)]
pub struct SharedGraph {
    inner: Arc<RwLock<Graph>>,
}

impl SharedGraph {
    /// Wrap a graph
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Shared access
    pub fn read(&self) -> RwLockReadGuard<'_, Graph> {
        self.inner.read()
    }

    /// Exclusive access
    pub fn write(&self) -> RwLockWriteGuard<'_, Graph> {
        self.inner.write()
    }

    /// Run `f` with shared access
    pub fn with_read<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access
    pub fn with_write<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Independent snapshot of the current state
    pub fn snapshot(&self) -> Graph {
        self.inner.read().copy()
    }

    /// BFS extraction under a read lock
    pub fn graph_query_vertices(&self, bfs: &BfsQuery) -> Graph {
        self.inner.read().graph_query_vertices(bfs)
    }

    /// Template matching under a read lock
    pub fn subgraph_matching(
        &self,
        pattern: &Graph,
        anchors: &[Anchor],
        options: MatchOptions,
    ) -> Result<Vec<Mapping>> {
        self.inner
            .read()
            .subgraph_matching_with(pattern, anchors, options)
    }
}

impl From<Graph> for SharedGraph {
    fn from(graph: Graph) -> Self {
        Self::new(graph)
    }
}
