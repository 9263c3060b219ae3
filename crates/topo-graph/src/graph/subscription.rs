//! Change notification
//!
//! Subscribers are called synchronously on the mutating thread after every
//! add or update of a vertex or edge. Regular subscribers run first, then
//! finalization subscribers, each group in registration order.
//!
//! A callback receives the graph by shared reference, so it can read the
//! graph but cannot mutate it from inside the notification.

use super::{Edge, Graph, Vertex};

/// A single add or update
#[derive(Debug, Clone, Copy)]
pub enum GraphChange<'a> {
    /// Vertex added or updated
    Vertex {
        /// State before the mutation; `None` if newly created
        before: Option<&'a Vertex>,
        /// State after the mutation
        after: &'a Vertex,
    },
    /// Edge added or updated
    Edge {
        /// State before the mutation; `None` if newly created
        before: Option<&'a Edge>,
        /// State after the mutation
        after: &'a Edge,
    },
}

impl<'a> GraphChange<'a> {
    /// Whether the changed element is a vertex
    pub fn is_vertex(&self) -> bool {
        matches!(self, GraphChange::Vertex { .. })
    }

    /// Whether the element did not exist before
    pub fn is_new(&self) -> bool {
        match self {
            GraphChange::Vertex { before, .. } => before.is_none(),
            GraphChange::Edge { before, .. } => before.is_none(),
        }
    }

    /// Changed vertex, if any
    pub fn vertex(&self) -> Option<&'a Vertex> {
        match self {
            GraphChange::Vertex { after, .. } => Some(after),
            GraphChange::Edge { .. } => None,
        }
    }

    /// Changed edge, if any
    pub fn edge(&self) -> Option<&'a Edge> {
        match self {
            GraphChange::Edge { after, .. } => Some(after),
            GraphChange::Vertex { .. } => None,
        }
    }
}

/// Subscriber callback
pub type Subscriber = Box<dyn Fn(&GraphChange<'_>, &Graph) + Send + Sync>;

/// Registered subscribers, split into the two ordered groups
#[derive(Default)]
pub struct Subscribers {
    regular: Vec<Subscriber>,
    finalization: Vec<Subscriber>,
}

impl Subscribers {
    /// Register a callback
    pub fn push(&mut self, subscriber: Subscriber, finalization: bool) {
        if finalization {
            self.finalization.push(subscriber);
        } else {
            self.regular.push(subscriber);
        }
    }

    /// Whether anyone is subscribed
    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.finalization.is_empty()
    }

    /// Total number of subscribers
    pub fn len(&self) -> usize {
        self.regular.len() + self.finalization.len()
    }

    /// Call every subscriber in order; returns how many were called
    pub fn notify(&self, change: &GraphChange<'_>, graph: &Graph) -> usize {
        for subscriber in self.regular.iter().chain(self.finalization.iter()) {
            subscriber(change, graph);
        }
        self.len()
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("regular", &self.regular.len())
            .field("finalization", &self.finalization.len())
            .finish()
    }
}
