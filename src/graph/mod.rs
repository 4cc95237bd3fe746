//! Sequence graph model
//!
//! A [`Graph`] holds segments keyed by numeric id, canonical bidirected links
//! and the embedded paths (one per input sequence). Link weights are derived
//! from the paths: the weight of a link is the number of distinct paths that
//! traverse it in either direction.

pub mod consensus;
pub mod gfa;
pub mod layout;
pub mod order;
pub mod stats;
pub mod variants;

use crate::MineGraphError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

pub type NodeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    pub fn flip(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }

    /// `+` / `-` as used in GFA links and paths
    pub fn symbol(self) -> char {
        match self {
            Orientation::Forward => '+',
            Orientation::Reverse => '-',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Orientation::Forward),
            '-' => Some(Orientation::Reverse),
            _ => None,
        }
    }

    /// `>` / `<` as used in GFA walks
    pub fn walk_symbol(self) -> char {
        match self {
            Orientation::Forward => '>',
            Orientation::Reverse => '<',
        }
    }

    pub fn from_walk_symbol(c: char) -> Option<Self> {
        match c {
            '>' => Some(Orientation::Forward),
            '<' => Some(Orientation::Reverse),
            _ => None,
        }
    }
}

/// An oriented visit of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    pub node: NodeId,
    pub orientation: Orientation,
}

impl Handle {
    pub fn new(node: NodeId, orientation: Orientation) -> Self {
        Self { node, orientation }
    }

    pub fn forward(node: NodeId) -> Self {
        Self::new(node, Orientation::Forward)
    }

    pub fn reverse(node: NodeId) -> Self {
        Self::new(node, Orientation::Reverse)
    }

    pub fn flip(self) -> Self {
        Self::new(self.node, self.orientation.flip())
    }

    pub fn is_reverse(&self) -> bool {
        self.orientation == Orientation::Reverse
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.node, self.orientation.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub sequence: Vec<u8>,
}

impl Node {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// The bases read when visiting the node in `orientation`
    pub fn oriented_sequence(&self, orientation: Orientation) -> Vec<u8> {
        match orientation {
            Orientation::Forward => self.sequence.clone(),
            Orientation::Reverse => reverse_complement(&self.sequence),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: Handle,
    pub to: Handle,
    pub weight: usize,
}

/// A named walk over the graph; one per input sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPath {
    pub name: String,
    pub steps: Vec<Handle>,
}

impl GraphPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct nodes visited by the path
    pub fn node_set(&self) -> HashSet<NodeId> {
        self.steps.iter().map(|h| h.node).collect()
    }
}

/// Canonical key for a link: `a -> b` is the same link as `b' -> a'`
pub fn canonical_edge(from: Handle, to: Handle) -> (Handle, Handle) {
    let reversed = (to.flip(), from.flip());
    if reversed < (from, to) {
        reversed
    } else {
        (from, to)
    }
}

pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            b'a' => b't',
            b'c' => b'g',
            b'g' => b'c',
            b't' => b'a',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<(Handle, Handle), usize>,
    paths: Vec<GraphPath>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// One node and one single-step path per named sequence
    pub fn from_sequences<I, S>(sequences: I) -> Result<Self, MineGraphError>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        for (i, (name, sequence)) in sequences.into_iter().enumerate() {
            let id = i as NodeId + 1;
            graph.add_node(id, sequence)?;
            graph.add_path(name.into(), vec![Handle::forward(id)])?;
        }
        Ok(graph)
    }

    pub fn add_node(&mut self, id: NodeId, sequence: Vec<u8>) -> Result<(), MineGraphError> {
        if self.nodes.contains_key(&id) {
            return Err(MineGraphError::GraphIntegrity(format!(
                "segment {} is defined more than once",
                id
            )));
        }
        self.nodes.insert(id, Node { id, sequence });
        Ok(())
    }

    pub fn add_edge(&mut self, from: Handle, to: Handle) -> Result<(), MineGraphError> {
        for handle in [from, to] {
            if !self.nodes.contains_key(&handle.node) {
                return Err(MineGraphError::GraphIntegrity(format!(
                    "link {} -> {} references unknown segment {}",
                    from, to, handle.node
                )));
            }
        }
        self.edges.entry(canonical_edge(from, to)).or_insert(0);
        Ok(())
    }

    /// Add a path; every step must name a known node and every pair of
    /// consecutive steps must be joined by a link.
    pub fn add_path(&mut self, name: String, steps: Vec<Handle>) -> Result<(), MineGraphError> {
        if steps.is_empty() {
            return Err(MineGraphError::GraphIntegrity(format!("path {} is empty", name)));
        }
        if self.paths.iter().any(|p| p.name == name) {
            return Err(MineGraphError::GraphIntegrity(format!(
                "path {} is defined more than once",
                name
            )));
        }
        if let Some(step) = steps.iter().find(|h| !self.nodes.contains_key(&h.node)) {
            return Err(MineGraphError::GraphIntegrity(format!(
                "path {} visits unknown segment {}",
                name, step.node
            )));
        }

        let mut traversed = BTreeSet::new();
        for pair in steps.windows(2) {
            let key = canonical_edge(pair[0], pair[1]);
            if !self.edges.contains_key(&key) {
                return Err(MineGraphError::GraphIntegrity(format!(
                    "path {} steps {} -> {} without a link",
                    name, pair[0], pair[1]
                )));
            }
            traversed.insert(key);
        }
        for key in traversed {
            if let Some(weight) = self.edges.get_mut(&key) {
                *weight += 1;
            }
        }

        self.paths.push(GraphPath { name, steps });
        Ok(())
    }

    /// Insert links for consecutive steps that lack one, then add the path
    pub fn add_path_with_links(
        &mut self,
        name: String,
        steps: Vec<Handle>,
    ) -> Result<(), MineGraphError> {
        for pair in steps.windows(2) {
            self.add_edge(pair[0], pair[1])?;
        }
        self.add_path(name, steps)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Links in canonical order with their path weights
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().map(|(&(from, to), &weight)| Edge { from, to, weight })
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_weight(&self, from: Handle, to: Handle) -> Option<usize> {
        self.edges.get(&canonical_edge(from, to)).copied()
    }

    pub fn paths(&self) -> &[GraphPath] {
        &self.paths
    }

    pub fn path(&self, name: &str) -> Option<&GraphPath> {
        self.paths.iter().find(|p| p.name == name)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn total_sequence_length(&self) -> usize {
        self.nodes.values().map(Node::len).sum()
    }

    /// Bases spelled by a path
    pub fn path_sequence(&self, path: &GraphPath) -> Vec<u8> {
        let mut sequence = Vec::new();
        for step in &path.steps {
            if let Some(node) = self.nodes.get(&step.node) {
                sequence.extend(node.oriented_sequence(step.orientation));
            }
        }
        sequence
    }

    pub fn path_length(&self, path: &GraphPath) -> usize {
        path.steps
            .iter()
            .filter_map(|s| self.nodes.get(&s.node))
            .map(Node::len)
            .sum()
    }

    /// Number of links touching `id`, a self-loop counting twice
    pub fn degree(&self, id: NodeId) -> usize {
        self.edges
            .keys()
            .map(|(a, b)| usize::from(a.node == id) + usize::from(b.node == id))
            .sum()
    }

    /// Degree of every node, including isolated ones
    pub fn degrees(&self) -> BTreeMap<NodeId, usize> {
        let mut degrees: BTreeMap<NodeId, usize> = self.nodes.keys().map(|&id| (id, 0)).collect();
        for (a, b) in self.edges.keys() {
            *degrees.entry(a.node).or_insert(0) += 1;
            *degrees.entry(b.node).or_insert(0) += 1;
        }
        degrees
    }

    /// Distinct paths visiting each node; nodes no path visits map to 0
    pub fn node_frequencies(&self) -> BTreeMap<NodeId, usize> {
        let mut frequencies: BTreeMap<NodeId, usize> =
            self.nodes.keys().map(|&id| (id, 0)).collect();
        for path in &self.paths {
            for node in path.node_set() {
                *frequencies.entry(node).or_insert(0) += 1;
            }
        }
        frequencies
    }

    /// Total visits of each node over all paths
    pub fn node_traversals(&self) -> BTreeMap<NodeId, usize> {
        let mut traversals: BTreeMap<NodeId, usize> =
            self.nodes.keys().map(|&id| (id, 0)).collect();
        for path in &self.paths {
            for step in &path.steps {
                *traversals.entry(step.node).or_insert(0) += 1;
            }
        }
        traversals
    }
}
