//! Path-induced topological order of the graph.
//!
//! Paths are first oriented so that most of their bases read forward; the
//! consecutive node pairs of the oriented paths then form a directed graph.
//! Paths may revisit nodes (inverted repeats collapse onto the same segments),
//! so the directed graph is condensed into strongly connected components. The
//! components are ranked topologically and the nodes inside one component by
//! their first occurrence along the paths. Nodes on a cycle have no single
//! position and are flagged so that variant calling does not anchor on them.

use super::{Graph, GraphPath, NodeId, Orientation};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TopologicalOrder {
    paths: Vec<GraphPath>,
    nodes: Vec<NodeId>,
    rank: HashMap<NodeId, usize>,
    orientation: HashMap<NodeId, Orientation>,
    cyclic: HashSet<NodeId>,
}

impl TopologicalOrder {
    pub fn compute(graph: &Graph) -> Self {
        let paths: Vec<GraphPath> = graph.paths().iter().map(|p| orient_path(graph, p)).collect();

        let mut dag: DiGraphMap<NodeId, ()> = DiGraphMap::new();
        let mut first_seen: HashMap<NodeId, usize> = HashMap::new();
        for path in &paths {
            for step in &path.steps {
                dag.add_node(step.node);
                let next = first_seen.len();
                first_seen.entry(step.node).or_insert(next);
            }
            for pair in path.steps.windows(2) {
                dag.add_edge(pair[0].node, pair[1].node, ());
            }
        }

        // tarjan_scc yields components in reverse topological order
        let mut nodes = Vec::with_capacity(graph.node_count());
        let mut cyclic = HashSet::new();
        for mut component in tarjan_scc(&dag).into_iter().rev() {
            if component.len() > 1 || dag.contains_edge(component[0], component[0]) {
                cyclic.extend(component.iter().copied());
            }
            component.sort_by_key(|id| first_seen.get(id).copied().unwrap_or(usize::MAX));
            nodes.extend(component);
        }

        // nodes no path visits go last
        let unvisited: Vec<NodeId> = graph
            .nodes()
            .map(|n| n.id)
            .filter(|id| !dag.contains_node(*id))
            .collect();
        nodes.extend(unvisited);

        let rank = nodes.iter().enumerate().map(|(rank, &id)| (id, rank)).collect();
        let orientation = majority_orientation(&paths);
        debug!(
            "Topological order over {} nodes, {} on cycles",
            nodes.len(),
            cyclic.len()
        );

        Self {
            paths,
            nodes,
            rank,
            orientation,
            cyclic,
        }
    }

    /// Paths after orientation, in graph order
    pub fn paths(&self) -> &[GraphPath] {
        &self.paths
    }

    /// All node ids, ranked
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn rank(&self, id: NodeId) -> Option<usize> {
        self.rank.get(&id).copied()
    }

    /// Whether some path can return to `id`, so its rank is not a position
    pub fn is_cyclic(&self, id: NodeId) -> bool {
        self.cyclic.contains(&id)
    }

    /// Orientation most oriented paths read the node in
    pub fn orientation(&self, id: NodeId) -> Orientation {
        self.orientation
            .get(&id)
            .copied()
            .unwrap_or(Orientation::Forward)
    }
}

/// Reverse a path when more of its bases are read in reverse
pub fn orient_path(graph: &Graph, path: &GraphPath) -> GraphPath {
    let (mut forward, mut reverse) = (0usize, 0usize);
    for step in &path.steps {
        let len = graph.node(step.node).map_or(0, |n| n.len()).max(1);
        if step.is_reverse() {
            reverse += len;
        } else {
            forward += len;
        }
    }

    if reverse > forward {
        GraphPath {
            name: path.name.clone(),
            steps: path.steps.iter().rev().map(|h| h.flip()).collect(),
        }
    } else {
        path.clone()
    }
}

fn majority_orientation(paths: &[GraphPath]) -> HashMap<NodeId, Orientation> {
    let mut votes: HashMap<NodeId, (usize, usize)> = HashMap::new();
    for path in paths {
        for step in &path.steps {
            let entry = votes.entry(step.node).or_insert((0, 0));
            if step.is_reverse() {
                entry.1 += 1;
            } else {
                entry.0 += 1;
            }
        }
    }
    votes
        .into_iter()
        .map(|(id, (fwd, rev))| {
            let o = if rev > fwd {
                Orientation::Reverse
            } else {
                Orientation::Forward
            };
            (id, o)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Handle;

    #[test]
    fn test_bubble_order() {
        let graph = crate::graph::tests::bubble();
        let order = TopologicalOrder::compute(&graph);
        assert_eq!(order.rank(1), Some(0));
        assert_eq!(order.rank(4), Some(3));
        assert!(order.rank(2).unwrap() < order.rank(4).unwrap());
    }

    #[test]
    fn test_reverse_path_is_flipped() {
        let mut graph = Graph::new();
        graph.add_node(1, b"AAAA".to_vec()).unwrap();
        graph.add_node(2, b"CCCC".to_vec()).unwrap();
        graph
            .add_path_with_links("fwd".into(), vec![Handle::forward(1), Handle::forward(2)])
            .unwrap();
        graph
            .add_path_with_links("rev".into(), vec![Handle::reverse(2), Handle::reverse(1)])
            .unwrap();

        let order = TopologicalOrder::compute(&graph);
        assert_eq!(order.nodes(), &[1, 2]);
        assert_eq!(order.paths()[1].steps, vec![Handle::forward(1), Handle::forward(2)]);
        assert_eq!(order.orientation(2), Orientation::Forward);
    }

    #[test]
    fn test_revisits_are_condensed() {
        let mut graph = Graph::new();
        for id in 1..=4 {
            graph.add_node(id, b"ACG".to_vec()).unwrap();
        }
        let steps = vec![
            Handle::forward(1),
            Handle::forward(2),
            Handle::forward(3),
            Handle::reverse(2),
            Handle::forward(4),
        ];
        graph.add_path_with_links("a".into(), steps.clone()).unwrap();
        graph.add_path_with_links("b".into(), steps).unwrap();

        let order = TopologicalOrder::compute(&graph);
        assert_eq!(order.nodes(), &[1, 2, 3, 4]);
        assert!(order.is_cyclic(2) && order.is_cyclic(3));
        assert!(!order.is_cyclic(1) && !order.is_cyclic(4));
    }

    #[test]
    fn test_closed_walk_is_ranked_by_first_visit() {
        let mut graph = Graph::new();
        for id in 1..=3 {
            graph.add_node(id, b"ACG".to_vec()).unwrap();
        }
        graph
            .add_path_with_links(
                "loop".into(),
                vec![
                    Handle::forward(3),
                    Handle::forward(1),
                    Handle::forward(2),
                    Handle::forward(3),
                ],
            )
            .unwrap();

        let order = TopologicalOrder::compute(&graph);
        assert_eq!(order.nodes(), &[3, 1, 2]);
        assert!((1..=3).all(|id| order.is_cyclic(id)));
    }

    #[test]
    fn test_self_loop_is_cyclic() {
        let mut graph = Graph::new();
        graph.add_node(1, b"AT".to_vec()).unwrap();
        graph.add_node(2, b"GC".to_vec()).unwrap();
        graph
            .add_path_with_links(
                "tandem".into(),
                vec![Handle::forward(1), Handle::forward(1), Handle::forward(2)],
            )
            .unwrap();

        let order = TopologicalOrder::compute(&graph);
        assert_eq!(order.nodes(), &[1, 2]);
        assert!(order.is_cyclic(1));
        assert!(!order.is_cyclic(2));
    }
}
