//! Polymorphism calling over the embedded paths.
//!
//! Anchors are nodes every path visits exactly once, in the same orientation,
//! and that lie on no cycle of the path-induced order.
//! Walking the anchors in topological order splits each path into the stretch
//! before the first anchor, the stretches between consecutive anchors and the
//! stretch after the last one. Each stretch is a site; a site where the paths
//! spell different alleles becomes one [`Polymorphism`].
//!
//! Positions are 1-based coordinates on the reference path.

use super::order::TopologicalOrder;
use super::{Graph, GraphPath, Handle, NodeId};
use crate::MineGraphError;
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VariantKind {
    Snp,
    Mnp,
    Indel,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Snp => "SNP",
            VariantKind::Mnp => "MNP",
            VariantKind::Indel => "INDEL",
        }
    }

    /// SNP when every allele is one base, MNP when all share a longer length,
    /// indel when lengths differ
    pub fn classify<A: AsRef<[u8]>>(alleles: &[A]) -> Self {
        let mut lengths = alleles.iter().map(|a| a.as_ref().len());
        let first = lengths.next().unwrap_or(0);
        if lengths.any(|l| l != first) {
            VariantKind::Indel
        } else if first == 1 {
            VariantKind::Snp
        } else {
            VariantKind::Mnp
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polymorphism {
    /// Reference path name
    pub chrom: String,
    /// 1-based position on the reference path
    pub position: usize,
    pub reference: String,
    pub alternates: Vec<String>,
    pub kind: VariantKind,
    /// Allele index per path, in graph path order; 0 is the reference allele
    pub genotypes: Vec<usize>,
    pub left_anchor: Option<NodeId>,
    pub right_anchor: Option<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantCalls {
    pub reference: String,
    pub reference_length: usize,
    pub samples: Vec<String>,
    pub records: Vec<Polymorphism>,
}

impl VariantCalls {
    pub fn empty() -> Self {
        Self {
            reference: String::new(),
            reference_length: 0,
            samples: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn count(&self, kind: VariantKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }
}

/// Anchors in rank order
fn find_anchors(paths: &[GraphPath], order: &TopologicalOrder) -> Vec<Handle> {
    if paths.is_empty() {
        return Vec::new();
    }

    let mut seen: HashMap<NodeId, (Handle, usize, bool)> = HashMap::new();
    for path in paths {
        let mut visits: HashMap<NodeId, (Handle, usize)> = HashMap::new();
        for step in &path.steps {
            let entry = visits.entry(step.node).or_insert((*step, 0));
            entry.1 += 1;
        }
        for (node, (handle, count)) in visits {
            let entry = seen.entry(node).or_insert((handle, 0, true));
            entry.1 += 1;
            entry.2 &= count == 1 && entry.0 == handle;
        }
    }

    let mut anchors: Vec<Handle> = seen
        .into_iter()
        .filter(|(node, (_, paths_seen, unique))| {
            *unique && *paths_seen == paths.len() && !order.is_cyclic(*node)
        })
        .map(|(_, (handle, _, _))| handle)
        .collect();
    anchors.sort_by_key(|h| order.rank(h.node).unwrap_or(usize::MAX));
    anchors
}

/// Per path: the allele spelled in each of the `anchors.len() + 1` sites
fn site_alleles(
    graph: &Graph,
    path: &GraphPath,
    anchors: &[Handle],
) -> Result<Vec<Vec<u8>>, MineGraphError> {
    let index: HashMap<NodeId, usize> = anchors.iter().enumerate().map(|(i, h)| (h.node, i)).collect();
    let mut alleles = vec![Vec::new(); anchors.len() + 1];
    let mut site = 0;

    for step in &path.steps {
        if let Some(&anchor) = index.get(&step.node) {
            if anchor != site {
                return Err(MineGraphError::PathTraversal(format!(
                    "path {} reaches anchor node {} out of order",
                    path.name, step.node
                )));
            }
            site += 1;
            continue;
        }
        if let Some(node) = graph.node(step.node) {
            alleles[site].extend(node.oriented_sequence(step.orientation));
        }
    }

    if site != anchors.len() {
        return Err(MineGraphError::PathTraversal(format!(
            "path {} stops after {} of {} anchors",
            path.name,
            site,
            anchors.len()
        )));
    }
    Ok(alleles)
}

fn trim_shared(alleles: &mut [Vec<u8>]) -> usize {
    let len = alleles.first().map_or(0, Vec::len);
    let column_shared = |i: usize, alleles: &[Vec<u8>]| alleles.iter().all(|a| a[i] == alleles[0][i]);

    let mut suffix = 0;
    while suffix < len && column_shared(len - 1 - suffix, &*alleles) {
        suffix += 1;
    }
    let mut prefix = 0;
    while prefix + suffix < len && column_shared(prefix, &*alleles) {
        prefix += 1;
    }

    for allele in alleles.iter_mut() {
        allele.truncate(len - suffix);
        allele.drain(..prefix);
    }
    prefix
}

/// Call polymorphisms against `reference`, or the first path when not given.
///
/// A graph without paths has nothing to compare and yields no records.
pub fn call_variants(
    graph: &Graph,
    order: &TopologicalOrder,
    reference: Option<&str>,
) -> Result<VariantCalls, MineGraphError> {
    let paths = order.paths();
    let reference_index = match reference {
        Some(name) => paths.iter().position(|p| p.name == name).ok_or_else(|| {
            MineGraphError::Configuration(format!("reference path {} is not in the graph", name))
        })?,
        None if paths.is_empty() => {
            info!("Graph has no paths; no polymorphisms to call");
            return Ok(VariantCalls::empty());
        }
        None => 0,
    };
    let reference_name = paths[reference_index].name.clone();

    let anchors = find_anchors(paths, order);
    debug!("{} anchor nodes shared by all {} paths", anchors.len(), paths.len());

    let per_path: Vec<Vec<Vec<u8>>> = paths
        .iter()
        .map(|p| site_alleles(graph, p, &anchors))
        .collect::<Result<_, _>>()?;

    let anchor_sequences: Vec<Vec<u8>> = anchors
        .iter()
        .map(|h| {
            graph
                .node(h.node)
                .map(|n| n.oriented_sequence(h.orientation))
                .unwrap_or_default()
        })
        .collect();

    let mut records = Vec::new();
    let mut offset = 0usize;
    for site in 0..=anchors.len() {
        let reference_allele = per_path[reference_index][site].clone();

        let mut distinct: IndexSet<Vec<u8>> = IndexSet::new();
        distinct.insert(reference_allele.clone());
        for alleles in &per_path {
            distinct.insert(alleles[site].clone());
        }

        if distinct.len() > 1 {
            let genotypes: Vec<usize> = per_path
                .iter()
                .map(|alleles| distinct.get_index_of(&alleles[site]).unwrap_or(0))
                .collect();
            let mut alleles: Vec<Vec<u8>> = distinct.into_iter().collect();
            let kind = VariantKind::classify(&alleles);

            let position = match kind {
                VariantKind::Indel => {
                    if site > 0 {
                        let pad = anchor_sequences[site - 1].last().copied().unwrap_or(b'N');
                        for allele in alleles.iter_mut() {
                            allele.insert(0, pad);
                        }
                        offset
                    } else {
                        let pad = anchor_sequences
                            .first()
                            .and_then(|s| s.first().copied())
                            .unwrap_or(b'N');
                        for allele in alleles.iter_mut() {
                            allele.push(pad);
                        }
                        offset + 1
                    }
                }
                VariantKind::Snp | VariantKind::Mnp => offset + 1 + trim_shared(&mut alleles),
            };

            let as_text = |a: &Vec<u8>| String::from_utf8_lossy(a).to_string();
            let kind = if kind == VariantKind::Indel {
                kind
            } else {
                VariantKind::classify(&alleles)
            };
            records.push(Polymorphism {
                chrom: reference_name.clone(),
                position,
                reference: as_text(&alleles[0]),
                alternates: alleles[1..].iter().map(as_text).collect(),
                kind,
                genotypes,
                left_anchor: site.checked_sub(1).map(|i| anchors[i].node),
                right_anchor: anchors.get(site).map(|h| h.node),
            });
        }

        offset += reference_allele.len();
        if let Some(anchor) = anchor_sequences.get(site) {
            offset += anchor.len();
        }
    }

    info!(
        "Called {} polymorphisms against {} ({} SNP, {} MNP, {} indel)",
        records.len(),
        reference_name,
        records.iter().filter(|r| r.kind == VariantKind::Snp).count(),
        records.iter().filter(|r| r.kind == VariantKind::Mnp).count(),
        records.iter().filter(|r| r.kind == VariantKind::Indel).count()
    );

    Ok(VariantCalls {
        reference: reference_name,
        reference_length: offset,
        samples: paths.iter().map(|p| p.name.clone()).collect(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::gfa::parse_gfa_str;
    use crate::graph::tests::bubble;

    fn calls(graph: &Graph) -> VariantCalls {
        let order = TopologicalOrder::compute(graph);
        call_variants(graph, &order, None).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(VariantKind::classify(&[b"A", b"G"]), VariantKind::Snp);
        assert_eq!(VariantKind::classify(&[b"AC", b"GT"]), VariantKind::Mnp);
        assert_eq!(VariantKind::classify(&[b"A".to_vec(), b"AT".to_vec()]), VariantKind::Indel);
    }

    #[test]
    fn test_snp_in_bubble() {
        let calls = calls(&bubble());
        assert_eq!(calls.records.len(), 1);
        let snp = &calls.records[0];
        assert_eq!(snp.kind, VariantKind::Snp);
        assert_eq!(snp.position, 5);
        assert_eq!(snp.reference, "A");
        assert_eq!(snp.alternates, vec!["G".to_string()]);
        assert_eq!(snp.genotypes, vec![0, 1, 0]);
        assert_eq!(calls.reference_length, 9);
    }

    #[test]
    fn test_deletion_is_padded() {
        let text = "S\t1\tACGT\nS\t2\tTT\nS\t3\tGCA\n\
L\t1\t+\t2\t+\t0M\nL\t2\t+\t3\t+\t0M\nL\t1\t+\t3\t+\t0M\n\
P\tref\t1+,2+,3+\t*\nP\talt\t1+,3+\t*\n";
        let graph = parse_gfa_str(text).unwrap();
        let calls = calls(&graph);
        assert_eq!(calls.records.len(), 1);
        let indel = &calls.records[0];
        assert_eq!(indel.kind, VariantKind::Indel);
        assert_eq!(indel.position, 4);
        assert_eq!(indel.reference, "TTT");
        assert_eq!(indel.alternates, vec!["T".to_string()]);
    }

    #[test]
    fn test_mnp_is_trimmed_to_differing_block() {
        let text = "S\t1\tAAAA\nS\t2\tCGTAC\nS\t3\tCCATC\nS\t4\tGGGG\n\
L\t1\t+\t2\t+\t0M\nL\t1\t+\t3\t+\t0M\nL\t2\t+\t4\t+\t0M\nL\t3\t+\t4\t+\t0M\n\
P\tx\t1+,2+,4+\t*\nP\ty\t1+,3+,4+\t*\n";
        let graph = parse_gfa_str(text).unwrap();
        let calls = calls(&graph);
        assert_eq!(calls.records.len(), 1);
        let mnp = &calls.records[0];
        assert_eq!(mnp.kind, VariantKind::Mnp);
        assert_eq!(mnp.position, 6);
        assert_eq!(mnp.reference, "GTA");
        assert_eq!(mnp.alternates, vec!["CAT".to_string()]);
    }

    #[test]
    fn test_identical_paths_have_no_variants() {
        let graph = Graph::from_sequences(vec![("a", b"ACGT".to_vec())]).unwrap();
        assert!(calls(&graph).records.is_empty());
    }

    #[test]
    fn test_no_paths_gives_no_records() {
        let graph = parse_gfa_str("S\t1\tACGT\nS\t2\tGG\nL\t1\t+\t2\t+\t0M\n").unwrap();
        let calls = calls(&graph);
        assert!(calls.records.is_empty());
        assert!(calls.samples.is_empty());
        assert_eq!(calls.reference_length, 0);
    }

    #[test]
    fn test_inverted_repeat_is_not_an_anchor() {
        // both paths run 1+,2+,3+,2-,4+ except that y carries a SNP in node 5
        let text = "S\t1\tAAAA\nS\t2\tCCG\nS\t3\tTT\nS\t4\tGA\nS\t5\tGC\n\
L\t1\t+\t2\t+\t0M\nL\t2\t+\t3\t+\t0M\nL\t3\t+\t2\t-\t0M\n\
L\t2\t-\t4\t+\t0M\nL\t2\t-\t5\t+\t0M\n\
P\tx\t1+,2+,3+,2-,4+\t*\nP\ty\t1+,2+,3+,2-,5+\t*\n";
        let graph = parse_gfa_str(text).unwrap();
        let calls = calls(&graph);

        // 1 is the only anchor; the revisited block is identical in both paths
        assert_eq!(calls.records.len(), 1);
        let snp = &calls.records[0];
        assert_eq!(snp.kind, VariantKind::Snp);
        assert_eq!(snp.left_anchor, Some(1));
        assert_eq!(snp.right_anchor, None);
        // AAAA CCG TT CGG G, then A against C
        assert_eq!(snp.position, 14);
        assert_eq!(snp.reference, "A");
        assert_eq!(snp.alternates, vec!["C".to_string()]);
        assert_eq!(calls.reference_length, 14);
    }

    #[test]
    fn test_unknown_reference() {
        let graph = bubble();
        let order = TopologicalOrder::compute(&graph);
        let err = call_variants(&graph, &order, Some("nope#1#chr")).unwrap_err();
        assert!(matches!(err, MineGraphError::Configuration(_)));
    }
}
