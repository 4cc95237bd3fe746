//! Result files written for a completed analysis.

pub mod tables;
pub mod text;
pub mod vcf;

use crate::bio::fasta::write_fasta;
use crate::bio::Sequence;
use crate::core::optimizer::OptimizedParameters;
use crate::graph::consensus::Consensus;
use crate::graph::gfa::{write_gfa, PathStyle};
use crate::graph::layout::CircularLayout;
use crate::graph::stats::GraphStatistics;
use crate::graph::variants::VariantCalls;
use crate::graph::{Edge, Graph, GraphPath, Node};
use crate::MineGraphError;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NODE_TABLE: &str = "node_table.tsv";
pub const EDGE_TABLE: &str = "edge_table.tsv";
pub const FREQUENCY_HISTOGRAM: &str = "node_frequency_histogram.tsv";
pub const SIZE_HISTOGRAM: &str = "node_size_histogram.tsv";
pub const DEGREE_DISTRIBUTION: &str = "degree_distribution.tsv";
pub const STATISTICS_JSON: &str = "graph_statistics.json";
pub const VARIANTS_VCF: &str = "polymorphisms.vcf";
pub const CONSENSUS_FASTA: &str = "consensus.fasta";
pub const LAYOUT_JSON: &str = "top_nodes_layout.json";
pub const TEXT_REPORT: &str = "report.txt";
pub const PATH_SEQUENCES: &str = "path_sequences.fasta";
pub const WALKS_GFA: &str = "graph_walks.gfa";
pub const GRAPH_JSON: &str = "graph.json";

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub graph_path: PathBuf,
    pub parameters: Option<OptimizedParameters>,
    pub statistics: GraphStatistics,
    pub variants: VariantCalls,
    pub consensus: Consensus,
    pub layout: CircularLayout,
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), MineGraphError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn create(dir: &Path, name: &str) -> Result<(PathBuf, BufWriter<File>), MineGraphError> {
    let path = dir.join(name);
    let file = File::create(&path)?;
    Ok((path, BufWriter::new(file)))
}

/// Node and edge tables, histograms and the statistics JSON. These only need
/// the parsed graph.
pub fn write_statistics(stats: &GraphStatistics, dir: &Path) -> Result<Vec<PathBuf>, MineGraphError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let (path, writer) = create(dir, NODE_TABLE)?;
    tables::write_node_table(stats, writer)?;
    written.push(path);

    let (path, writer) = create(dir, EDGE_TABLE)?;
    tables::write_edge_table(stats, writer)?;
    written.push(path);

    let (path, writer) = create(dir, FREQUENCY_HISTOGRAM)?;
    tables::write_frequency_histogram(stats, writer)?;
    written.push(path);

    let (path, writer) = create(dir, SIZE_HISTOGRAM)?;
    tables::write_size_histogram(&stats.size_histogram, writer)?;
    written.push(path);

    let (path, writer) = create(dir, DEGREE_DISTRIBUTION)?;
    tables::write_degree_distribution(stats, writer)?;
    written.push(path);

    let path = dir.join(STATISTICS_JSON);
    write_json(&path, stats)?;
    written.push(path);

    for path in &written {
        debug!("Wrote {}", path.display());
    }
    Ok(written)
}

/// VCF, consensus, layout and the text report
pub fn write_path_reports(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>, MineGraphError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let (path, mut writer) = create(dir, VARIANTS_VCF)?;
    vcf::write_vcf(&report.variants, &mut writer)?;
    writer.flush()?;
    written.push(path);

    let path = dir.join(CONSENSUS_FASTA);
    write_fasta(&path, &[report.consensus.to_fasta()])?;
    written.push(path);

    let path = dir.join(LAYOUT_JSON);
    write_json(&path, &report.layout)?;
    written.push(path);

    let path = dir.join(TEXT_REPORT);
    fs::write(&path, text::generate_text_report(report)?)?;
    written.push(path);

    for path in &written {
        debug!("Wrote {}", path.display());
    }
    Ok(written)
}

/// Serializable view of the whole graph
#[derive(Serialize)]
struct GraphDocument<'a> {
    nodes: Vec<&'a Node>,
    edges: Vec<Edge>,
    paths: &'a [GraphPath],
}

/// The path sequences as FASTA (one record per path)
pub fn path_sequences(graph: &Graph) -> Vec<Sequence> {
    graph
        .paths()
        .iter()
        .map(|p| Sequence::new(p.name.clone(), graph.path_sequence(p)))
        .collect()
}

/// Sequence-only FASTA, GFA 1.1 with walks, and graph JSON
pub fn export_graph(graph: &Graph, dir: &Path) -> Result<Vec<PathBuf>, MineGraphError> {
    fs::create_dir_all(dir)?;

    let fasta = dir.join(PATH_SEQUENCES);
    write_fasta(&fasta, &path_sequences(graph))?;

    let (gfa, mut writer) = create(dir, WALKS_GFA)?;
    write_gfa(graph, PathStyle::Walks, &mut writer)?;
    writer.flush()?;

    let json = dir.join(GRAPH_JSON);
    write_json(
        &json,
        &GraphDocument {
            nodes: graph.nodes().collect(),
            edges: graph.edges().collect(),
            paths: graph.paths(),
        },
    )?;

    Ok(vec![fasta, gfa, json])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::fasta::parse_fasta;
    use crate::graph::gfa::parse_gfa;
    use crate::graph::tests::bubble;
    use tempfile::TempDir;

    #[test]
    fn test_export_graph() {
        let dir = TempDir::new().unwrap();
        let graph = bubble();
        let written = export_graph(&graph, dir.path()).unwrap();
        assert_eq!(written.len(), 3);

        let sequences = parse_fasta(dir.path().join(PATH_SEQUENCES)).unwrap();
        assert_eq!(sequences.len(), 3);
        assert_eq!(sequences[1].sequence, b"ACGTGTTCA".to_vec());

        let reparsed = parse_gfa(dir.path().join(WALKS_GFA)).unwrap();
        assert_eq!(reparsed, graph);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(GRAPH_JSON)).unwrap()).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(json["paths"][0]["name"], "a#1#chr");
    }
}
