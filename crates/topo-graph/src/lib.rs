#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! # topo-graph
//!
//! In-memory topology and alarm graph used for root-cause analysis: a
//! directed property multigraph with change notification, a JSON query
//! compiler, bounded BFS extraction and template (subgraph) matching.

pub mod config;
pub mod graph;
pub mod logging;

pub use config::Config;
pub use graph::{
    AttrFilter, Direction, Edge, Graph, GraphError, Mapping, PropertyValue, Properties, Result,
    SharedGraph, SubgraphMatcher, Vertex,
};
