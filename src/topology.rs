//! Graph topology built from a sparse matrix coordinate list
//!
//! Square matrices are read as the symmetric graph of A + Aᵀ, where row and
//! column indices share one identifier space. Rectangular matrices are read
//! as bipartite graphs: row i becomes node "i" and column j becomes node
//! "m + j", so the two node sets never collide.

use crate::ingest::CoordinateList;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::str::FromStr;
use tracing::debug;

/// Node identifier (a DOT node label)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// DOT representation: bare when the label is a plain ID or numeral, quoted otherwise
    pub fn to_dot(&self) -> String {
        let s = self.0.as_str();
        let is_ident = !s.is_empty()
            && !s.starts_with(|c: char| c.is_ascii_digit())
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        let is_numeral = !s.is_empty()
            && s.parse::<f64>().is_ok()
            && !s.contains(['e', 'E', 'n', 'N', 'i', 'I', '+']);
        if is_ident || is_numeral {
            s.to_string()
        } else {
            format!("\"{}\"", s.replace('"', "\\\""))
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Undirected edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub tail: NodeId,
    pub head: NodeId,
}

impl Edge {
    pub fn new(tail: impl Into<NodeId>, head: impl Into<NodeId>) -> Self {
        Self {
            tail: tail.into(),
            head: head.into(),
        }
    }

    /// Order-independent key: {a, b} and {b, a} are the same edge
    pub fn key(&self) -> (NodeId, NodeId) {
        if self.tail <= self.head {
            (self.tail.clone(), self.head.clone())
        } else {
            (self.head.clone(), self.tail.clone())
        }
    }
}

/// How rows and columns map onto nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BipartiteMode {
    /// Bipartite iff the matrix is rectangular
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for BipartiteMode {
    type Err = crate::error::VisError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(BipartiteMode::Auto),
            "always" | "true" | "yes" => Ok(BipartiteMode::Always),
            "never" | "false" | "no" => Ok(BipartiteMode::Never),
            other => Err(crate::error::VisError::Config(format!(
                "unknown bipartite mode `{other}` (expected auto, always or never)"
            ))),
        }
    }
}

/// Decide whether an m x n matrix is drawn as a bipartite graph.
pub fn resolve_bipartite(mode: BipartiteMode, m: usize, n: usize) -> bool {
    match mode {
        BipartiteMode::Auto => m != n,
        BipartiteMode::Always => true,
        BipartiteMode::Never => false,
    }
}

/// Map every nonzero (i, j) to an edge.
///
/// Non-bipartite: (i, j) -> {"i", "j"}. Bipartite: (i, j) -> {"i", "m+j"}.
pub fn edges_from_coordinates(coords: &CoordinateList, bipartite: bool) -> Vec<Edge> {
    let offset = if bipartite { coords.m } else { 0 };
    coords
        .entries
        .iter()
        .map(|&(i, j)| Edge::new(i.to_string(), (offset + j).to_string()))
        .collect()
}

/// Undirected graph topology: node identifiers plus an edge list.
///
/// In strict mode an edge whose unordered endpoint pair is already present
/// is dropped, so duplicate matrix entries (and both (i, j) and (j, i) of a
/// symmetric matrix) collapse into one edge.
#[derive(Debug, Clone)]
pub struct Topology {
    strict: bool,
    nodes: Vec<NodeId>,
    node_set: HashSet<NodeId>,
    edges: Vec<Edge>,
    edge_keys: HashSet<(NodeId, NodeId)>,
    duplicates_dropped: usize,
}

impl Topology {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            nodes: Vec::new(),
            node_set: HashSet::new(),
            edges: Vec::new(),
            edge_keys: HashSet::new(),
            duplicates_dropped: 0,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Add a node, returning false if it was already present
    pub fn add_node(&mut self, id: &NodeId) -> bool {
        if self.node_set.insert(id.clone()) {
            self.nodes.push(id.clone());
            return true;
        }
        false
    }

    /// Add an undirected edge. Returns false if strict mode dropped it.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.add_node(&edge.tail);
        self.add_node(&edge.head);
        if self.strict && !self.edge_keys.insert(edge.key()) {
            self.duplicates_dropped += 1;
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Add many edges, returning how many were inserted
    pub fn add_edges_from(&mut self, edges: impl IntoIterator<Item = Edge>) -> usize {
        let mut inserted = 0;
        for edge in edges {
            if self.add_edge(edge) {
                inserted += 1;
            }
        }
        if self.duplicates_dropped > 0 {
            debug!(
                dropped = self.duplicates_dropped,
                "strict topology collapsed duplicate edges"
            );
        }
        inserted
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Node identifiers in first-seen order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_set.contains(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.nodes.is_empty()
    }

    /// Serialize to DOT with drawing defaults suited to large sparse graphs:
    /// invisible zero-size nodes and unit pen width. Nodes without edges are
    /// written as bare node statements.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let keyword = if self.strict { "strict graph" } else { "graph" };
        let _ = writeln!(out, "{keyword} {{");
        let _ = writeln!(out, "\tnode [height=0, shape=none, width=0];");
        let _ = writeln!(out, "\tedge [penwidth=1];");
        let connected: HashSet<&NodeId> = self
            .edges
            .iter()
            .flat_map(|e| [&e.tail, &e.head])
            .collect();
        for id in self.nodes.iter().filter(|id| !connected.contains(id)) {
            let _ = writeln!(out, "\t{};", id.to_dot());
        }
        for edge in &self.edges {
            let _ = writeln!(out, "\t{} -- {};", edge.tail.to_dot(), edge.head.to_dot());
        }
        out.push_str("}\n");
        out
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(true)
    }
}
