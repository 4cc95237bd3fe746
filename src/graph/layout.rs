//! Circular layout of the top-N node subgraph for plotting.

use super::order::TopologicalOrder;
use super::{Graph, NodeId};
use serde::Serialize;
use std::collections::HashSet;
use std::f64::consts::TAU;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub id: NodeId,
    pub length: usize,
    pub angle: f64,
    pub x: f64,
    pub y: f64,
    /// Length relative to the largest selected node, in (0, 1]
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: usize,
    /// Weight relative to the heaviest selected edge, in [0, 1]; 0 when no
    /// path uses the link
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

/// Place `selected` nodes around the unit circle in topological order and
/// keep the links among them.
pub fn circular_layout(graph: &Graph, order: &TopologicalOrder, selected: &[NodeId]) -> CircularLayout {
    let mut ids: Vec<NodeId> = selected
        .iter()
        .copied()
        .filter(|id| graph.node(*id).is_some())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    ids.sort_by_key(|&id| (order.rank(id).unwrap_or(usize::MAX), id));

    let max_length = ids
        .iter()
        .filter_map(|&id| graph.node(id))
        .map(|n| n.len())
        .max()
        .unwrap_or(0)
        .max(1);

    let count = ids.len().max(1) as f64;
    let nodes: Vec<LayoutNode> = ids
        .iter()
        .enumerate()
        .filter_map(|(i, &id)| {
            let node = graph.node(id)?;
            let angle = TAU * i as f64 / count;
            Some(LayoutNode {
                id,
                length: node.len(),
                angle,
                x: angle.cos(),
                y: angle.sin(),
                size: node.len().max(1) as f64 / max_length as f64,
            })
        })
        .collect();

    let kept: HashSet<NodeId> = ids.iter().copied().collect();
    let links: Vec<(NodeId, NodeId, usize)> = graph
        .edges()
        .filter(|e| kept.contains(&e.from.node) && kept.contains(&e.to.node))
        .map(|e| (e.from.node, e.to.node, e.weight))
        .collect();
    let max_weight = links.iter().map(|l| l.2).max().unwrap_or(0).max(1);
    let edges = links
        .into_iter()
        .map(|(from, to, weight)| LayoutEdge {
            from,
            to,
            weight,
            width: weight as f64 / max_weight as f64,
        })
        .collect();

    CircularLayout { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::bubble;

    #[test]
    fn test_layout_of_selected_nodes() {
        let graph = bubble();
        let order = TopologicalOrder::compute(&graph);
        let layout = circular_layout(&graph, &order, &[4, 1, 2]);

        let ids: Vec<NodeId> = layout.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert!((layout.nodes[0].x - 1.0).abs() < 1e-12);
        assert_eq!(layout.nodes[0].size, 1.0);
        assert_eq!(layout.nodes[1].size, 0.25);

        // 1->2 (2 paths) and 2->4 (2 paths); links through node 3 are dropped
        assert_eq!(layout.edges.len(), 2);
        assert!(layout.edges.iter().all(|e| e.width == 1.0));
    }

    #[test]
    fn test_unused_link_has_zero_width() {
        let text = "S\t1\tACGT\nS\t2\tGG\nS\t3\tTTA\n\
L\t1\t+\t2\t+\t0M\nL\t2\t+\t3\t+\t0M\nL\t1\t+\t3\t+\t0M\n\
P\ta\t1+,2+,3+\t*\nP\tb\t1+,2+,3+\t*\n";
        let graph = crate::graph::gfa::parse_gfa_str(text).unwrap();
        let order = TopologicalOrder::compute(&graph);
        let layout = circular_layout(&graph, &order, &[1, 2, 3]);

        let width = |from: NodeId, to: NodeId| {
            layout
                .edges
                .iter()
                .find(|e| e.from == from && e.to == to)
                .map(|e| (e.weight, e.width))
        };
        assert_eq!(width(1, 2), Some((2, 1.0)));
        assert_eq!(width(1, 3), Some((0, 0.0)));
    }

    #[test]
    fn test_empty_selection() {
        let graph = bubble();
        let order = TopologicalOrder::compute(&graph);
        let layout = circular_layout(&graph, &order, &[]);
        assert!(layout.nodes.is_empty());
        assert!(layout.edges.is_empty());
    }
}
