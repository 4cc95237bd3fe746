//! Post-construction analysis of one immutable graph snapshot.
//!
//! Graph statistics need only the parsed graph. Ordering, variant calling and
//! consensus need its paths and run alongside the statistics. A failure in the
//! path stage does not discard the statistics: [`run_analysis`] writes the
//! statistics tables before it reports the error.

use crate::core::config::AnalysisConfig;
use crate::core::optimizer::OptimizedParameters;
use crate::graph::consensus::{derive_consensus, Consensus};
use crate::graph::gfa::parse_gfa;
use crate::graph::layout::circular_layout;
use crate::graph::order::TopologicalOrder;
use crate::graph::stats::{compute_statistics, GraphStatistics};
use crate::graph::variants::{call_variants, VariantCalls};
use crate::graph::Graph;
use crate::report::{export_graph, write_path_reports, write_statistics, AnalysisReport};
use crate::MineGraphError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Results derived from the embedded paths
#[derive(Debug, Clone)]
pub struct PathAnalysis {
    pub order: TopologicalOrder,
    pub variants: VariantCalls,
    pub consensus: Consensus,
}

pub fn analyze_paths(graph: &Graph, config: &AnalysisConfig) -> Result<PathAnalysis, MineGraphError> {
    let order = TopologicalOrder::compute(graph);
    let variants = call_variants(graph, &order, config.reference_path.as_deref())?;
    let consensus = derive_consensus(graph, &order, config.consensus_quantile);
    Ok(PathAnalysis {
        order,
        variants,
        consensus,
    })
}

fn statistics_and_paths(
    graph: &Graph,
    config: &AnalysisConfig,
) -> (GraphStatistics, Result<PathAnalysis, MineGraphError>) {
    info!(
        "Analyzing graph: {} nodes, {} edges, {} paths",
        graph.node_count(),
        graph.edge_count(),
        graph.path_count()
    );
    rayon::join(
        || compute_statistics(graph, config.top_n, config.histogram_bins),
        || analyze_paths(graph, config),
    )
}

fn assemble(
    graph: &Graph,
    graph_path: &Path,
    parameters: Option<OptimizedParameters>,
    statistics: GraphStatistics,
    paths: PathAnalysis,
) -> AnalysisReport {
    let layout = circular_layout(graph, &paths.order, &statistics.top_nodes);
    info!(
        "{} polymorphisms, consensus of {} nodes ({} bp)",
        paths.variants.records.len(),
        paths.consensus.steps.len(),
        paths.consensus.sequence.len()
    );

    AnalysisReport {
        graph_path: graph_path.to_path_buf(),
        parameters,
        statistics,
        variants: paths.variants,
        consensus: paths.consensus,
        layout,
    }
}

/// Statistics run alongside ordering, variant calling and consensus
pub fn analyze_graph(
    graph: &Graph,
    graph_path: &Path,
    parameters: Option<OptimizedParameters>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, MineGraphError> {
    let (statistics, paths) = statistics_and_paths(graph, config);
    Ok(assemble(graph, graph_path, parameters, statistics, paths?))
}

/// Outputs of [`run_analysis`]
#[derive(Debug)]
pub struct AnalysisOutputs {
    pub graph: Graph,
    pub report: AnalysisReport,
    pub files: Vec<PathBuf>,
}

/// Parse `gfa_path`, analyze it and write reports to `<out_dir>/analysis` and
/// exports to `<out_dir>/exports`
pub fn run_analysis(
    gfa_path: &Path,
    config: &AnalysisConfig,
    out_dir: &Path,
    parameters: Option<OptimizedParameters>,
) -> Result<AnalysisOutputs, MineGraphError> {
    let graph = parse_gfa(gfa_path)?;
    let analysis_dir = out_dir.join("analysis");

    let (statistics, paths) = statistics_and_paths(&graph, config);
    let mut files = write_statistics(&statistics, &analysis_dir)?;
    let paths = match paths {
        Ok(paths) => paths,
        Err(e) => {
            warn!(
                "Path analysis failed; graph statistics kept in {}",
                analysis_dir.display()
            );
            return Err(e);
        }
    };

    let report = assemble(&graph, gfa_path, parameters, statistics, paths);
    files.extend(write_path_reports(&report, &analysis_dir)?);
    info!("Wrote {} report files to {}", files.len(), analysis_dir.display());
    files.extend(export_graph(&graph, &out_dir.join("exports"))?);

    Ok(AnalysisOutputs {
        graph,
        report,
        files,
    })
}
