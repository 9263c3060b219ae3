//! Node-link JSON
//!
//! External representation used to ship a (result) graph to display and
//! reporting consumers:
//!
//! ```json
//! {
//!   "directed": true,
//!   "multigraph": true,
//!   "graph": {"name": "entity_graph", "root_id": "node"},
//!   "nodes": [{"index": 0, "id": "host-1", "properties": {"type": "nova.host"}},
//!             {"index": 1, "id": "vm-1", "properties": {"type": "nova.instance"}}],
//!   "links": [{"source": 0, "target": 1, "key": "contains",
//!              "properties": {"relationship_type": "contains"}}]
//! }
//! ```
//!
//! Nodes are listed in vertex id order, so indices are stable for a given
//! graph. `edges` is accepted as an alias of `links` on import.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Edge, Graph, GraphError, Properties, Result, Vertex};

fn default_true() -> bool {
    true
}

/// Graph-level attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    /// Graph name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Designated root vertex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,
}

/// Serialized vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkNode {
    /// Position referenced by links
    pub index: usize,
    /// Vertex id
    pub id: String,
    /// Property bag
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Serialized edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkLink {
    /// Index of the source node
    pub source: usize,
    /// Index of the target node
    pub target: usize,
    /// Relationship label
    pub key: String,
    /// Property bag
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Node-link document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLink {
    /// Always true for this graph model
    #[serde(default = "default_true")]
    pub directed: bool,
    /// Always true for this graph model
    #[serde(default = "default_true")]
    pub multigraph: bool,
    /// Graph attributes
    #[serde(default)]
    pub graph: NodeLinkGraph,
    /// Vertices
    pub nodes: Vec<NodeLinkNode>,
    /// Edges
    #[serde(default, alias = "edges")]
    pub links: Vec<NodeLinkLink>,
}

/// Import statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Number of vertices imported
    pub vertices_imported: usize,
    /// Number of edges imported
    pub edges_imported: usize,
}

impl NodeLink {
    /// Build the node-link form of a graph
    pub fn from_graph(graph: &Graph) -> Self {
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        let nodes = graph
            .vertices()
            .enumerate()
            .map(|(index, vertex)| {
                index_of.insert(vertex.id(), index);
                NodeLinkNode {
                    index,
                    id: vertex.id().to_string(),
                    properties: vertex.properties.to_json(),
                }
            })
            .collect();
        let links = graph
            .edges()
            .filter_map(|edge| {
                let source = index_of.get(edge.source_id())?;
                let target = index_of.get(edge.target_id())?;
                Some(NodeLinkLink {
                    source: *source,
                    target: *target,
                    key: edge.label().to_string(),
                    properties: edge.properties.to_json(),
                })
            })
            .collect();
        Self {
            directed: true,
            multigraph: true,
            graph: NodeLinkGraph {
                name: Some(graph.name().to_string()),
                root_id: graph.root_id().map(str::to_string),
            },
            nodes,
            links,
        }
    }

    /// Rebuild a graph. Fails on links that reference unknown node indices
    /// and on empty ids or labels.
    pub fn to_graph(&self) -> Result<(Graph, ImportStats)> {
        let mut graph = Graph::new(
            self.graph
                .name
                .clone()
                .unwrap_or_else(|| "entity_graph".to_string()),
        );
        if let Some(root) = &self.graph.root_id {
            graph.set_root_id(root.clone());
        }

        let mut id_of: HashMap<usize, &str> = HashMap::new();
        let mut stats = ImportStats::default();
        for node in &self.nodes {
            if id_of.insert(node.index, node.id.as_str()).is_some() {
                return Err(GraphError::Serialization(format!(
                    "duplicate node index {}",
                    node.index
                )));
            }
            let vertex = Vertex::new(node.id.as_str(), Properties::from_json(&node.properties))?;
            graph.add_vertex(vertex);
            stats.vertices_imported += 1;
        }

        for link in &self.links {
            let resolve = |index: usize| {
                id_of.get(&index).copied().ok_or_else(|| {
                    GraphError::Serialization(format!("link references unknown node {}", index))
                })
            };
            let edge = Edge::new(
                resolve(link.source)?,
                resolve(link.target)?,
                link.key.as_str(),
                Properties::from_json(&link.properties),
            )?;
            graph.add_edge(edge);
            stats.edges_imported += 1;
        }

        tracing::debug!(
            vertices = stats.vertices_imported,
            edges = stats.edges_imported,
            "imported node-link graph"
        );
        Ok((graph, stats))
    }
}

impl Graph {
    /// Node-link form of this graph
    pub fn to_node_link(&self) -> NodeLink {
        NodeLink::from_graph(self)
    }

    /// Node-link JSON text
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let doc = self.to_node_link();
        let text = if pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(text)
    }

    /// Parse node-link JSON text
    pub fn from_json_str(text: &str) -> Result<Graph> {
        let doc: NodeLink = serde_json::from_str(text)?;
        Ok(doc.to_graph()?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Graph {
        let mut g = Graph::new("sample");
        g.add_vertex(Vertex::bare("host-1").unwrap().with("type", "nova.host"));
        g.add_vertex(
            Vertex::bare("vm-1")
                .unwrap()
                .with("type", "nova.instance")
                .with("vcpus", 2i64),
        );
        g.add_edge(Edge::bare("host-1", "vm-1", "contains").unwrap());
        g.add_edge(Edge::bare("host-1", "vm-1", "hosts").unwrap());
        g.set_root_id("host-1");
        g
    }

    #[test]
    fn test_export_shape() {
        let value = serde_json::to_value(sample().to_node_link()).unwrap();
        assert_eq!(value["graph"]["name"], json!("sample"));
        assert_eq!(value["nodes"][0]["id"], json!("host-1"));
        assert_eq!(value["nodes"][1]["properties"]["vcpus"], json!(2));
        assert_eq!(value["links"].as_array().unwrap().len(), 2);
        assert_eq!(value["links"][0]["source"], json!(0));
        assert_eq!(value["links"][0]["target"], json!(1));
        assert_eq!(value["links"][0]["key"], json!("contains"));
    }

    #[test]
    fn test_round_trip() {
        let g = sample();
        let text = g.to_json_string(true).unwrap();
        let back = Graph::from_json_str(&text).unwrap();

        assert_eq!(back.name(), "sample");
        assert_eq!(back.root_id(), Some("host-1"));
        assert_eq!(back.num_vertices(), 2);
        assert_eq!(back.num_edges(), 2);
        assert_eq!(back.get_vertex("vm-1"), g.get_vertex("vm-1"));
        assert_eq!(
            back.get_edge("host-1", "vm-1", Some("hosts")),
            g.get_edge("host-1", "vm-1", Some("hosts"))
        );
    }

    #[test]
    fn test_import_edges_alias_and_defaults() {
        let text = json!({
            "nodes": [
                {"index": 0, "id": "a"},
                {"index": 1, "id": "b", "properties": {"state": "ok"}}
            ],
            "edges": [{"source": 1, "target": 0, "key": "on"}]
        })
        .to_string();
        let doc: NodeLink = serde_json::from_str(&text).unwrap();
        assert!(doc.directed);
        let (g, stats) = doc.to_graph().unwrap();
        assert_eq!(
            stats,
            ImportStats {
                vertices_imported: 2,
                edges_imported: 1
            }
        );
        assert_eq!(g.name(), "entity_graph");
        assert!(g.get_edge("b", "a", Some("on")).is_some());
    }

    #[test]
    fn test_import_errors() {
        let dangling = json!({
            "nodes": [{"index": 0, "id": "a"}],
            "links": [{"source": 0, "target": 5, "key": "on"}]
        })
        .to_string();
        assert!(matches!(
            Graph::from_json_str(&dangling),
            Err(GraphError::Serialization(_))
        ));

        let empty_id = json!({"nodes": [{"index": 0, "id": ""}]}).to_string();
        assert!(matches!(
            Graph::from_json_str(&empty_id),
            Err(GraphError::InvalidArgument(_))
        ));

        assert!(matches!(
            Graph::from_json_str("{\"nodes\": 3}"),
            Err(GraphError::Serialization(_))
        ));
    }
}
