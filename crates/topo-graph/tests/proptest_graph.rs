//! Property-based tests for the entity graph
//!
//! Uses proptest to check store, predicate, traversal and matching
//! behaviour over randomly generated graphs.
#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use proptest::prelude::*;
use serde_json::json;

use topo_graph::graph::{
    AttrFilter, BfsQuery, Direction, Edge, Graph, Properties, PropertyValue, Query, Vertex,
};

// ============================================================================
// Strategies
// ============================================================================

fn id_strategy() -> impl Strategy<Value = String> {
    "v[0-9]{1,2}"
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]"
}

fn label_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("contains".to_string()), Just("on".to_string())]
}

fn value_strategy() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        (-50i64..50).prop_map(PropertyValue::Integer),
        "[a-z]{0,4}".prop_map(PropertyValue::String),
        any::<bool>().prop_map(PropertyValue::Boolean),
    ]
}

fn patch_value_strategy() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        4 => value_strategy(),
        1 => Just(PropertyValue::Unset),
    ]
}

fn properties_strategy() -> impl Strategy<Value = BTreeMap<String, PropertyValue>> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..4)
}

fn patch_strategy() -> impl Strategy<Value = BTreeMap<String, PropertyValue>> {
    prop::collection::btree_map(key_strategy(), patch_value_strategy(), 0..4)
}

fn edges_strategy() -> impl Strategy<Value = Vec<(String, String, String)>> {
    prop::collection::vec((id_strategy(), id_strategy(), label_strategy()), 1..30)
}

fn op_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("<"),
        Just("<="),
        Just("=="),
        Just("!="),
        Just(">="),
        Just(">"),
    ]
}

fn random_graph(edges: &[(String, String, String)], weights: &[i64]) -> Graph {
    let mut g = Graph::new("random");
    for (i, (source, target, label)) in edges.iter().enumerate() {
        g.add_edge(Edge::bare(source.as_str(), target.as_str(), label.as_str()).unwrap());
        let weight = weights.get(i % weights.len().max(1)).copied().unwrap_or(0);
        g.update_vertex(Vertex::bare(source.as_str()).unwrap().with("w", weight));
    }
    g
}

fn to_properties(map: &BTreeMap<String, PropertyValue>) -> Properties {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn compare(op: &str, left: i64, right: i64) -> bool {
    match op {
        "<" => left < right,
        "<=" => left <= right,
        "==" => left == right,
        "!=" => left != right,
        ">=" => left >= right,
        _ => left > right,
    }
}

/// Hop distance from `root` along `direction`, ignoring vertex predicates
fn distances(g: &Graph, root: &str, direction: Direction) -> BTreeMap<String, usize> {
    let mut dist = BTreeMap::new();
    let mut queue = VecDeque::new();
    dist.insert(root.to_string(), 0);
    queue.push_back(root.to_string());
    while let Some(id) = queue.pop_front() {
        let d = dist[&id];
        for edge in g.get_edges(&id, direction, None) {
            let other = edge.other_vertex(&id).to_string();
            if !dist.contains_key(&other) {
                dist.insert(other.clone(), d + 1);
                queue.push_back(other);
            }
        }
    }
    dist
}

// ============================================================================
// Store
// ============================================================================

proptest! {
    /// Mutating a copy never shows up in the original, and vice versa
    #[test]
    fn prop_copy_is_independent(
        edges in edges_strategy(),
        weights in prop::collection::vec(-10i64..10, 1..5),
        extra in id_strategy(),
    ) {
        let mut original = random_graph(&edges, &weights);
        let before = original.to_json_string(false).unwrap();

        let mut copy = original.copy();
        let victim = copy.vertices().next().unwrap().id().to_string();
        copy.update_vertex(Vertex::bare(victim.as_str()).unwrap().with("touched", true));
        copy.add_edge(Edge::bare(victim.as_str(), format!("{}-new", extra), "on").unwrap());
        prop_assert_eq!(original.to_json_string(false).unwrap(), before);

        let snapshot = copy.to_json_string(false).unwrap();
        original.remove_vertex(&victim).unwrap();
        prop_assert_eq!(copy.to_json_string(false).unwrap(), snapshot);
    }

    /// Merge update: patch keys win, Unset deletes, other keys survive
    #[test]
    fn prop_merge_semantics(
        base in properties_strategy(),
        patch in patch_strategy(),
    ) {
        let mut g = Graph::new("g");
        g.add_vertex(Vertex::new("v", to_properties(&base)).unwrap());
        g.update_vertex(Vertex::new("v", to_properties(&patch)).unwrap());
        let stored = g.get_vertex("v").unwrap();

        let keys: BTreeSet<&String> = base.keys().chain(patch.keys()).collect();
        for key in keys {
            let expected = match patch.get(key) {
                Some(PropertyValue::Unset) => None,
                Some(value) => Some(value),
                None => base.get(key),
            };
            prop_assert_eq!(stored.get(key), expected);
        }
        prop_assert!(stored.properties.entries().all(|(_, v)| !v.is_unset()));
    }

    /// Vertex and edge counts agree with what the iterators see
    #[test]
    fn prop_counts_consistent(edges in edges_strategy()) {
        let g = random_graph(&edges, &[0]);
        prop_assert_eq!(g.num_vertices(), g.vertices().count());
        prop_assert_eq!(g.num_edges(), g.edges().count());

        let distinct: BTreeSet<(&str, &str, &str)> = edges
            .iter()
            .map(|(s, t, l)| (s.as_str(), t.as_str(), l.as_str()))
            .collect();
        prop_assert_eq!(g.num_edges(), distinct.len());
        for edge in g.edges() {
            prop_assert!(g.has_vertex(edge.source_id()));
            prop_assert!(g.has_vertex(edge.target_id()));
        }
    }
}

// ============================================================================
// Predicates
// ============================================================================

proptest! {
    /// A compiled comparison agrees with evaluating it directly
    #[test]
    fn prop_predicate_matches_direct_evaluation(
        op in op_strategy(),
        literal in -20i64..20,
        value in prop::option::of(-20i64..20),
    ) {
        let query = Query::compile(&json!({ op: { "w": literal } })).unwrap();
        let mut vertex = Vertex::bare("x").unwrap();
        if let Some(value) = value {
            vertex.set("w", value);
        }
        let expected = match value {
            Some(value) => compare(op, value, literal),
            None => op == "!=",
        };
        prop_assert_eq!(query.matches(&vertex), expected);
    }

    /// and/or combine their parts like boolean && and ||
    #[test]
    fn prop_connectives(
        ops in prop::collection::vec((op_strategy(), -5i64..5), 1..4),
        value in -5i64..5,
        use_and in any::<bool>(),
    ) {
        let parts: Vec<serde_json::Value> = ops
            .iter()
            .map(|(op, literal)| json!({ *op: { "w": literal } }))
            .collect();
        let connective = if use_and { "and" } else { "or" };
        let query = Query::compile(&json!({ connective: parts })).unwrap();
        let vertex = Vertex::bare("x").unwrap().with("w", value);

        let mut results = ops.iter().map(|(op, literal)| compare(op, value, *literal));
        let expected = if use_and { results.all(|r| r) } else { results.any(|r| r) };
        prop_assert_eq!(query.matches(&vertex), expected);
    }

    /// A filter built from a vertex's own properties always accepts it
    #[test]
    fn prop_filter_accepts_source(props in properties_strategy()) {
        let vertex = Vertex::new("x", to_properties(&props)).unwrap();
        let filter = AttrFilter::from_properties(&vertex.properties).unwrap();
        prop_assert!(filter.matches(&vertex));
    }
}

// ============================================================================
// Traversal
// ============================================================================

proptest! {
    /// Every vertex in a depth-bounded result is within `depth` hops of the root
    #[test]
    fn prop_bfs_depth_bound(
        edges in edges_strategy(),
        depth in 0usize..4,
        out in any::<bool>(),
    ) {
        let g = random_graph(&edges, &[0]);
        let root = edges[0].0.clone();
        let direction = if out { Direction::Out } else { Direction::Both };

        let result = g.graph_query_vertices(&BfsQuery::new().root(root.as_str()).depth(depth).direction(direction));
        let dist = distances(&g, &root, direction);

        prop_assert!(result.has_vertex(&root));
        for vertex in result.vertices() {
            let hops = dist.get(vertex.id()).copied();
            prop_assert!(hops.is_some_and(|h| h <= depth));
        }
        // without a predicate every vertex within range is reached
        prop_assert_eq!(
            result.num_vertices(),
            dist.values().filter(|h| **h <= depth).count()
        );
    }

    /// The result is induced and every vertex passes the query
    #[test]
    fn prop_bfs_result_is_induced(
        edges in edges_strategy(),
        weights in prop::collection::vec(-10i64..10, 1..6),
        threshold in -10i64..10,
    ) {
        let g = random_graph(&edges, &weights);
        let root = edges[0].0.clone();
        let query = Query::compile(&json!({">=": {"w": threshold}})).unwrap();
        let result = g.graph_query_vertices(&BfsQuery::new().root(root.as_str()).query(query.clone()));

        for vertex in result.vertices() {
            prop_assert!(query.matches(vertex));
        }
        for edge in g.edges() {
            let both = result.has_vertex(edge.source_id()) && result.has_vertex(edge.target_id());
            prop_assert_eq!(result.edge(edge.key()).is_some(), both);
        }
    }
}

// ============================================================================
// Matching
// ============================================================================

proptest! {
    /// Every returned mapping embeds every pattern edge in the live graph
    #[test]
    fn prop_matching_is_sound(
        edges in edges_strategy(),
        first in label_strategy(),
        second in label_strategy(),
    ) {
        let live = random_graph(&edges, &[0]);
        let anchor = edges[0].0.clone();

        let mut pattern = Graph::new("pattern");
        pattern.add_edge(Edge::bare("a", "b", first.as_str()).unwrap());
        pattern.add_edge(Edge::bare("b", "c", second.as_str()).unwrap());

        let matches = live
            .subgraph_matching(&pattern, &[topo_graph::graph::Anchor::vertex("a", anchor.as_str())])
            .unwrap();
        let unique: BTreeSet<_> = matches.iter().cloned().collect();
        prop_assert_eq!(unique.len(), matches.len());

        for mapping in &matches {
            prop_assert_eq!(mapping.len(), 3);
            prop_assert_eq!(mapping["a"].as_str(), anchor.as_str());
            for edge in pattern.edges() {
                prop_assert!(live
                    .get_edge(&mapping[edge.source_id()], &mapping[edge.target_id()], Some(edge.label()))
                    .is_some());
            }
        }
    }
}
