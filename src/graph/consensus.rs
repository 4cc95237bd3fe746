use super::order::TopologicalOrder;
use super::{Graph, Handle, NodeId};
use crate::bio::Sequence;
use serde::Serialize;
use tracing::info;

pub const CONSENSUS_NAME: &str = "consensus";

/// Minimum number of paths a node needs at `quantile` percent.
///
/// `max(1, ceil(quantile / 100 * path_count))`, so a quantile of 0 still
/// requires the node to be on at least one path.
pub fn quantile_threshold(quantile: f64, path_count: usize) -> usize {
    let raw = quantile.clamp(0.0, 100.0) * path_count as f64 / 100.0;
    // absorb float noise like 7.000000000000001
    let needed = (raw - 1e-9).ceil().max(0.0) as usize;
    needed.max(1)
}

#[derive(Debug, Clone, Serialize)]
pub struct Consensus {
    pub quantile: f64,
    pub threshold: usize,
    pub path_count: usize,
    pub steps: Vec<Handle>,
    #[serde(skip)]
    pub sequence: Vec<u8>,
}

impl Consensus {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.steps.iter().map(|h| h.node).collect()
    }

    pub fn to_fasta(&self) -> Sequence {
        Sequence::new(CONSENSUS_NAME.to_string(), self.sequence.clone()).with_description(format!(
            "nodes={} threshold={}/{}",
            self.steps.len(),
            self.threshold,
            self.path_count
        ))
    }
}

/// Nodes on at least `quantile_threshold` paths, in topological order.
///
/// An empty result is valid; it happens when no node is frequent enough.
pub fn derive_consensus(graph: &Graph, order: &TopologicalOrder, quantile: f64) -> Consensus {
    let path_count = graph.path_count();
    let threshold = quantile_threshold(quantile, path_count);
    let frequencies = graph.node_frequencies();

    let mut steps = Vec::new();
    let mut sequence = Vec::new();
    for &id in order.nodes() {
        if frequencies.get(&id).copied().unwrap_or(0) < threshold {
            continue;
        }
        let handle = Handle::new(id, order.orientation(id));
        if let Some(node) = graph.node(id) {
            sequence.extend(node.oriented_sequence(handle.orientation));
        }
        steps.push(handle);
    }

    info!(
        "Consensus at quantile {}: {} of {} nodes (threshold {} of {} paths), {} bp",
        quantile,
        steps.len(),
        graph.node_count(),
        threshold,
        path_count,
        sequence.len()
    );

    Consensus {
        quantile,
        threshold,
        path_count,
        steps,
        sequence,
    }
}
