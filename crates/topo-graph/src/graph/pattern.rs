//! Subgraph (template) matching
//!
//! Finds every embedding of a small pattern graph into the live graph. A
//! pattern vertex matches a live vertex when the live vertex satisfies the
//! pattern vertex's properties used as an [`AttrFilter`]; a pattern edge
//! matches a live edge with the same label, the mapped endpoints in the
//! same direction, and properties satisfying the pattern edge's filter.
//!
//! The search starts from anchors (pattern vertex to live vertex pairs, or
//! pattern edge to live edge pairs) and grows outwards:
//!
//! 1. Pin every anchor. An anchor that fails its filter or contradicts an
//!    edge between already pinned vertices ends the search with no results.
//! 2. Pop a candidate from a FIFO work queue. A fully pinned candidate is a
//!    match.
//! 3. Take a pinned vertex `V` whose neighbours are not all pinned yet. If
//!    it has no unpinned neighbour, close it and re-queue the candidate.
//! 4. Otherwise pick an unpinned neighbour `U` and try each live neighbour
//!    of `V`'s live vertex that passes `U`'s filter. Every try whose pattern
//!    edges to already pinned vertices exist in the live graph is queued as
//!    a fresh copy.
//!
//! Matching scratch (which live vertex a pattern vertex is pinned to and
//! whether its neighbourhood is closed) lives in a side table per
//! candidate, never in the pattern's property bags.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::{AttrFilter, Direction, EdgeKey, Graph, GraphError, GraphMetrics, Result};
use crate::config::MatchingConfig;

/// Pattern vertex id to live vertex id
pub type Mapping = BTreeMap<String, String>;

/// Known correspondence that seeds the search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Pattern vertex pinned to a live vertex
    Vertex {
        /// Pattern vertex id
        pattern: String,
        /// Live vertex id
        live: String,
    },
    /// Pattern edge pinned to a live edge; pins both endpoints
    Edge {
        /// Pattern edge
        pattern: EdgeKey,
        /// Live edge
        live: EdgeKey,
    },
}

impl Anchor {
    /// Vertex anchor
    pub fn vertex(pattern: impl Into<String>, live: impl Into<String>) -> Self {
        Anchor::Vertex {
            pattern: pattern.into(),
            live: live.into(),
        }
    }

    /// Edge anchor
    pub fn edge(pattern: EdgeKey, live: EdgeKey) -> Self {
        Anchor::Edge { pattern, live }
    }
}

/// Matching options. The defaults run the plain anchored search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Give up with `StepBudgetExceeded` after this many candidates
    pub max_steps: Option<u64>,
    /// A live vertex may be mapped by at most one pattern vertex
    pub injective: bool,
    /// When a candidate has no open frontier but is incomplete, pin the
    /// next unpinned pattern vertex by scanning all live vertices instead
    /// of dropping the candidate
    pub seed_unanchored: bool,
}

impl From<&MatchingConfig> for MatchOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            injective: config.injective,
            seed_unanchored: config.seed_unanchored,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MatchState {
    mapped_vertex_id: Option<String>,
    neighbors_mapped: bool,
}

/// One partial mapping under exploration
#[derive(Debug, Clone)]
struct Candidate {
    states: BTreeMap<String, MatchState>,
}

impl Candidate {
    fn new<'a>(pattern_ids: impl Iterator<Item = &'a str>) -> Self {
        Self {
            states: pattern_ids
                .map(|id| (id.to_string(), MatchState::default()))
                .collect(),
        }
    }

    fn mapped(&self, pattern_id: &str) -> Option<&str> {
        self.states
            .get(pattern_id)
            .and_then(|s| s.mapped_vertex_id.as_deref())
    }

    fn pin(&mut self, pattern_id: &str, live_id: &str) {
        if let Some(state) = self.states.get_mut(pattern_id) {
            state.mapped_vertex_id = Some(live_id.to_string());
        }
    }

    fn close(&mut self, pattern_id: &str) {
        if let Some(state) = self.states.get_mut(pattern_id) {
            state.neighbors_mapped = true;
        }
    }

    fn is_complete(&self) -> bool {
        self.states.values().all(|s| s.mapped_vertex_id.is_some())
    }

    fn uses(&self, live_id: &str) -> bool {
        self.states
            .values()
            .any(|s| s.mapped_vertex_id.as_deref() == Some(live_id))
    }

    fn frontier(&self) -> Option<&str> {
        self.states
            .iter()
            .find(|(_, s)| s.mapped_vertex_id.is_some() && !s.neighbors_mapped)
            .map(|(id, _)| id.as_str())
    }

    fn first_unpinned(&self) -> Option<&str> {
        self.states
            .iter()
            .find(|(_, s)| s.mapped_vertex_id.is_none())
            .map(|(id, _)| id.as_str())
    }

    fn into_mapping(self) -> Mapping {
        self.states
            .into_iter()
            .filter_map(|(id, s)| s.mapped_vertex_id.map(|live| (id, live)))
            .collect()
    }
}

/// Subgraph matcher over a pattern graph and a live graph
#[derive(Debug)]
pub struct SubgraphMatcher<'a> {
    pattern: &'a Graph,
    live: &'a Graph,
    options: MatchOptions,
    vertex_filters: HashMap<String, AttrFilter>,
    edge_filters: HashMap<EdgeKey, AttrFilter>,
}

impl<'a> SubgraphMatcher<'a> {
    /// Prepare a matcher. Fails with `InvalidQuery` when a pattern property
    /// cannot be used as a filter (e.g. a malformed `.regex` value).
    pub fn new(pattern: &'a Graph, live: &'a Graph) -> Result<Self> {
        let vertex_filters = pattern
            .vertices()
            .map(|v| -> Result<(String, AttrFilter)> {
                Ok((v.id().to_string(), AttrFilter::from_properties(&v.properties)?))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        let edge_filters = pattern
            .edges()
            .map(|e| -> Result<(EdgeKey, AttrFilter)> {
                Ok((e.key().clone(), AttrFilter::from_properties(&e.properties)?))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self {
            pattern,
            live,
            options: MatchOptions::default(),
            vertex_filters,
            edge_filters,
        })
    }

    /// Set matching options
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Enumerate every mapping of the pattern onto the live graph that
    /// extends `anchors`
    pub fn find_all(&self, anchors: &[Anchor]) -> Result<Vec<Mapping>> {
        GraphMetrics::incr(&self.live.metrics.match_runs, 1);

        let initial = match self.initialize(anchors)? {
            Some(candidate) => candidate,
            None => {
                tracing::debug!(
                    pattern = %self.pattern.name,
                    anchors = anchors.len(),
                    "anchors rejected, no matches"
                );
                return Ok(Vec::new());
            }
        };

        let mut queue = VecDeque::from([initial]);
        let mut matches = Vec::new();
        let mut steps: u64 = 0;

        while let Some(mut candidate) = queue.pop_front() {
            steps += 1;
            if let Some(budget) = self.options.max_steps {
                if steps > budget {
                    tracing::warn!(pattern = %self.pattern.name, budget, "matching budget exhausted");
                    return Err(GraphError::StepBudgetExceeded(budget));
                }
            }

            if candidate.is_complete() {
                matches.push(candidate.into_mapping());
                continue;
            }

            let frontier = match candidate.frontier() {
                Some(id) => id.to_string(),
                None => {
                    if self.options.seed_unanchored {
                        self.seed(&candidate, &mut queue);
                    } else {
                        tracing::trace!("candidate has no open frontier, dropped");
                    }
                    continue;
                }
            };

            let unpinned = self.unpinned_neighbors(&candidate, &frontier)?;
            let next = match unpinned.into_iter().next() {
                Some(id) => id,
                None => {
                    candidate.close(&frontier);
                    queue.push_back(candidate);
                    continue;
                }
            };

            let live_frontier = match candidate.mapped(&frontier) {
                Some(id) => id.to_string(),
                None => continue,
            };
            for live_id in self.live_candidates(&live_frontier, &next)? {
                if self.options.injective && candidate.uses(&live_id) {
                    continue;
                }
                let mut branch = candidate.clone();
                branch.pin(&next, &live_id);
                if self.edges_hold(&branch, &next) {
                    queue.push_back(branch);
                }
            }
        }

        tracing::debug!(
            pattern = %self.pattern.name,
            matches = matches.len(),
            steps,
            "subgraph matching done"
        );
        Ok(matches)
    }

    /// Pin every anchor; `None` when an anchor is rejected
    fn initialize(&self, anchors: &[Anchor]) -> Result<Option<Candidate>> {
        let mut candidate = Candidate::new(self.pattern.storage.vertex_ids());
        for anchor in anchors {
            let accepted = match anchor {
                Anchor::Vertex { pattern, live } => self.pin_anchor(&mut candidate, pattern, live)?,
                Anchor::Edge { pattern, live } => {
                    self.pin_edge_anchor(&mut candidate, pattern, live)?
                }
            };
            if !accepted {
                return Ok(None);
            }
        }
        Ok(Some(candidate))
    }

    fn pin_anchor(&self, candidate: &mut Candidate, pattern_id: &str, live_id: &str) -> Result<bool> {
        let filter = self
            .vertex_filters
            .get(pattern_id)
            .ok_or_else(|| GraphError::InvalidArgument(format!(
                "anchor names unknown pattern vertex {}",
                pattern_id
            )))?;
        if let Some(existing) = candidate.mapped(pattern_id) {
            return Ok(existing == live_id);
        }
        let live_vertex = match self.live.storage.vertex(live_id) {
            Some(vertex) => vertex,
            None => return Ok(false),
        };
        if !filter.matches(live_vertex) {
            return Ok(false);
        }
        if self.options.injective && candidate.uses(live_id) {
            return Ok(false);
        }
        candidate.pin(pattern_id, live_id);
        Ok(self.edges_hold(candidate, pattern_id))
    }

    fn pin_edge_anchor(&self, candidate: &mut Candidate, pattern: &EdgeKey, live: &EdgeKey) -> Result<bool> {
        let filter = self.edge_filters.get(pattern).ok_or_else(|| {
            GraphError::InvalidArgument(format!("anchor names unknown pattern edge {}", pattern))
        })?;
        let live_edge = match self.live.storage.edge(live) {
            Some(edge) => edge,
            None => return Ok(false),
        };
        if pattern.label != live.label || !filter.matches(live_edge) {
            return Ok(false);
        }
        Ok(self.pin_anchor(candidate, &pattern.source, &live.source)?
            && self.pin_anchor(candidate, &pattern.target, &live.target)?)
    }

    /// Pattern neighbours of `pattern_id` not pinned yet, in id order
    fn unpinned_neighbors(&self, candidate: &Candidate, pattern_id: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .pattern
            .storage
            .checked_neighbors(pattern_id, Direction::Both)?
            .into_iter()
            .map(|(_, vertex)| vertex.id())
            .filter(|id| candidate.mapped(id).is_none())
            .map(str::to_string)
            .collect())
    }

    /// Live neighbours of `live_id` passing the filter of `pattern_id`
    fn live_candidates(&self, live_id: &str, pattern_id: &str) -> Result<BTreeSet<String>> {
        let filter = self.vertex_filters.get(pattern_id);
        Ok(self
            .live
            .storage
            .checked_neighbors(live_id, Direction::Both)?
            .into_iter()
            .map(|(_, vertex)| vertex)
            .filter(|vertex| filter.map_or(true, |f| f.matches(*vertex)))
            .map(|vertex| vertex.id().to_string())
            .collect())
    }

    /// Every pattern edge between `pattern_id` and a pinned vertex has a
    /// live counterpart
    fn edges_hold(&self, candidate: &Candidate, pattern_id: &str) -> bool {
        self.pattern
            .storage
            .incident_edges(pattern_id, Direction::Both)
            .all(|edge| {
                let key = edge.key();
                let (source, target) = match (candidate.mapped(&key.source), candidate.mapped(&key.target)) {
                    (Some(s), Some(t)) => (s, t),
                    _ => return true,
                };
                let live_key = EdgeKey::new(source, target, key.label.as_str());
                match self.live.storage.edge(&live_key) {
                    Some(live_edge) => self
                        .edge_filters
                        .get(key)
                        .map_or(true, |f| f.matches(live_edge)),
                    None => false,
                }
            })
    }

    /// Branch on every live vertex for the first unpinned pattern vertex
    fn seed(&self, candidate: &Candidate, queue: &mut VecDeque<Candidate>) {
        let Some(next) = candidate.first_unpinned() else {
            return;
        };
        let filter = self.vertex_filters.get(next);
        for live_vertex in self.live.storage.vertices() {
            if !filter.map_or(true, |f| f.matches(live_vertex)) {
                continue;
            }
            if self.options.injective && candidate.uses(live_vertex.id()) {
                continue;
            }
            let mut branch = candidate.clone();
            branch.pin(next, live_vertex.id());
            if self.edges_hold(&branch, next) {
                queue.push_back(branch);
            }
        }
    }
}

impl Graph {
    /// Match `pattern` against this graph from the given anchors
    pub fn subgraph_matching(&self, pattern: &Graph, anchors: &[Anchor]) -> Result<Vec<Mapping>> {
        SubgraphMatcher::new(pattern, self)?.find_all(anchors)
    }

    /// Match with explicit options
    pub fn subgraph_matching_with(
        &self,
        pattern: &Graph,
        anchors: &[Anchor],
        options: MatchOptions,
    ) -> Result<Vec<Mapping>> {
        SubgraphMatcher::new(pattern, self)?
            .with_options(options)
            .find_all(anchors)
    }
}
