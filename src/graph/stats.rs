//! Graph-level statistics: counts, degrees, node frequency table and histograms.

use super::{Edge, Graph, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// One row of the node frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFrequency {
    pub node: NodeId,
    pub length: usize,
    /// Distinct paths visiting the node
    pub paths: usize,
    /// Total visits over all paths
    pub traversals: usize,
    pub degree: usize,
}

/// Half-open `[lower, upper)` bucket; the last bucket also includes `upper`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub path_count: usize,
    pub total_length: usize,
    pub average_degree: f64,
    /// degree -> number of nodes
    pub degree_distribution: BTreeMap<usize, usize>,
    pub node_table: Vec<NodeFrequency>,
    /// distinct path count -> number of nodes
    pub frequency_histogram: BTreeMap<usize, usize>,
    pub size_histogram: Vec<HistogramBin>,
    /// Largest nodes, ties broken by ascending id
    pub top_nodes: Vec<NodeId>,
    #[serde(skip)]
    pub edges: Vec<Edge>,
}

impl GraphStatistics {
    /// Sum of traversals across the frequency table
    pub fn total_traversals(&self) -> usize {
        self.node_table.iter().map(|n| n.traversals).sum()
    }
}

/// `2 |E| / |V|`, 0 for an empty graph
pub fn average_degree(node_count: usize, edge_count: usize) -> f64 {
    if node_count == 0 {
        0.0
    } else {
        2.0 * edge_count as f64 / node_count as f64
    }
}

pub fn node_table(graph: &Graph) -> Vec<NodeFrequency> {
    let frequencies = graph.node_frequencies();
    let traversals = graph.node_traversals();
    let degrees = graph.degrees();

    graph
        .nodes()
        .map(|node| NodeFrequency {
            node: node.id,
            length: node.len(),
            paths: frequencies.get(&node.id).copied().unwrap_or(0),
            traversals: traversals.get(&node.id).copied().unwrap_or(0),
            degree: degrees.get(&node.id).copied().unwrap_or(0),
        })
        .collect()
}

/// Top `n` nodes by sequence length; equal lengths fall back to ascending id
pub fn top_nodes_by_size(table: &[NodeFrequency], n: usize) -> Vec<NodeId> {
    let mut ranked: Vec<&NodeFrequency> = table.iter().collect();
    ranked.sort_by(|a, b| b.length.cmp(&a.length).then(a.node.cmp(&b.node)));
    ranked.into_iter().take(n).map(|f| f.node).collect()
}

/// Equal-width histogram of `values` over `[min, max]`
pub fn histogram(values: &[usize], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    let bins = bins.max(1);
    let (lower, upper) = (min as f64, max as f64);
    if min == max {
        return vec![HistogramBin {
            lower,
            upper,
            count: values.len(),
        }];
    }

    let width = (upper - lower) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let index = (((v as f64 - lower) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lower + i as f64 * width,
            upper: if i + 1 == bins {
                upper
            } else {
                lower + (i + 1) as f64 * width
            },
            count,
        })
        .collect()
}

pub fn compute_statistics(graph: &Graph, top_n: usize, histogram_bins: usize) -> GraphStatistics {
    let table = node_table(graph);

    let mut degree_distribution = BTreeMap::new();
    let mut frequency_histogram = BTreeMap::new();
    for row in &table {
        *degree_distribution.entry(row.degree).or_insert(0) += 1;
        *frequency_histogram.entry(row.paths).or_insert(0) += 1;
    }

    let lengths: Vec<usize> = table.iter().map(|r| r.length).collect();
    let stats = GraphStatistics {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        path_count: graph.path_count(),
        total_length: graph.total_sequence_length(),
        average_degree: average_degree(graph.node_count(), graph.edge_count()),
        degree_distribution,
        frequency_histogram,
        size_histogram: histogram(&lengths, histogram_bins),
        top_nodes: top_nodes_by_size(&table, top_n),
        node_table: table,
        edges: graph.edges().collect(),
    };

    info!(
        "Graph: {} nodes, {} edges, {} paths, {} bp, average degree {:.3}",
        stats.node_count, stats.edge_count, stats.path_count, stats.total_length, stats.average_degree
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::bubble;
    use crate::graph::Handle;

    #[test]
    fn test_average_degree_chain() {
        let mut graph = Graph::new();
        for id in 1..=4 {
            graph.add_node(id, b"AC".to_vec()).unwrap();
        }
        graph
            .add_path_with_links(
                "p".into(),
                (1..=4).map(Handle::forward).collect(),
            )
            .unwrap();
        let stats = compute_statistics(&graph, 10, 5);
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.average_degree, 1.5);
        assert_eq!(stats.degree_distribution[&1], 2);
        assert_eq!(stats.degree_distribution[&2], 2);
    }

    #[test]
    fn test_frequency_table() {
        let stats = compute_statistics(&bubble(), 10, 5);
        assert!(stats.total_traversals() >= stats.path_count);
        assert_eq!(stats.total_traversals(), 9);
        assert_eq!(stats.frequency_histogram[&3], 2);
        assert_eq!(stats.frequency_histogram[&2], 1);
        assert_eq!(stats.frequency_histogram[&1], 1);
    }

    #[test]
    fn test_top_nodes_tie_break() {
        let stats = compute_statistics(&bubble(), 3, 5);
        // nodes 1 and 4 are both 4 bp, 2 and 3 are both 1 bp
        assert_eq!(stats.top_nodes, vec![1, 4, 2]);
    }

    #[test]
    fn test_histogram() {
        let bins = histogram(&[1, 2, 3, 4, 10], 3);
        assert_eq!(bins.len(), 3);
        assert_eq!(bins[0].count, 3);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[2].count, 1);
        assert_eq!(bins[2].upper, 10.0);
        assert!(histogram(&[], 3).is_empty());
        assert_eq!(histogram(&[5, 5], 4)[0].count, 2);
    }
}
