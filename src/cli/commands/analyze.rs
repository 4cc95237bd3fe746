use super::load_effective_config;
use crate::cli::output::*;
use crate::core::analysis::run_analysis;
use crate::graph::variants::VariantKind;
use crate::report::AnalysisReport;
use crate::utils::workspace::RunWorkspace;
use anyhow::Context;
use clap::Args;
use comfy_table::Cell;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// GFA graph (plain or gzip)
    #[arg(value_name = "GRAPH")]
    pub graph: PathBuf,

    /// Results directory
    #[arg(short, long, value_name = "DIR", default_value = "minegraph_analysis")]
    pub output: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Consensus quantile: percentage of paths a node must appear in (0-100)
    #[arg(long, value_name = "PERCENT")]
    pub quantile: Option<f64>,

    /// Path used as the VCF reference (defaults to the first path)
    #[arg(long, value_name = "PATH_NAME")]
    pub reference: Option<String>,

    /// Number of largest nodes kept for the layout
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut config = load_effective_config(args.config.as_deref(), args.threads)?;
    if let Some(q) = args.quantile {
        config.analysis.consensus_quantile = q;
    }
    if args.reference.is_some() {
        config.analysis.reference_path = args.reference.clone();
    }
    if let Some(n) = args.top_n {
        config.analysis.top_n = n;
    }
    config.validate()?;

    let mut workspace = RunWorkspace::create(&args.output, "analyze")?;
    let outputs = match run_analysis(&args.graph, &config.analysis, workspace.root(), None) {
        Ok(outputs) => outputs,
        Err(e) => {
            workspace.mark_error(&e.to_string())?;
            return Err(e).with_context(|| format!("Analysis of {} failed", args.graph.display()));
        }
    };
    let results = workspace.finalize(&outputs.report.statistics)?;

    print_analysis(&outputs.report);
    println!();
    success(&format!(
        "{} files written to {}",
        outputs.files.len(),
        results.display()
    ));
    Ok(())
}

fn print_analysis(report: &AnalysisReport) {
    let stats = &report.statistics;
    section_header_with_line("Graph Analysis");

    subsection_header("Graph");
    tree_items(&[
        ("Nodes", format_number(stats.node_count)),
        ("Edges", format_number(stats.edge_count)),
        ("Paths", format_number(stats.path_count)),
        ("Sequence", format!("{} bp", format_number(stats.total_length))),
        ("Average degree", format!("{:.3}", stats.average_degree)),
    ]);

    let calls = &report.variants;
    if calls.samples.is_empty() {
        subsection_header("Polymorphisms (graph has no paths)");
    } else {
        subsection_header(&format!("Polymorphisms against {}", calls.reference));
    }
    tree_items(&[
        ("SNP", format_number(calls.count(VariantKind::Snp))),
        ("MNP", format_number(calls.count(VariantKind::Mnp))),
        ("INDEL", format_number(calls.count(VariantKind::Indel))),
    ]);

    let consensus = &report.consensus;
    subsection_header("Consensus");
    tree_items(&[
        (
            "Threshold",
            format!("{} of {} paths", consensus.threshold, consensus.path_count),
        ),
        ("Nodes", format_number(consensus.steps.len())),
        ("Length", format!("{} bp", format_number(consensus.sequence.len()))),
    ]);
    if consensus.is_empty() {
        warning("No node reaches the consensus threshold");
    }

    if stats.top_nodes.is_empty() {
        return;
    }
    subsection_header("Largest Nodes");
    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Node"),
        header_cell("Length"),
        header_cell("Paths"),
        header_cell("Degree"),
    ]);
    for id in stats.top_nodes.iter().take(10) {
        if let Some(row) = stats.node_table.iter().find(|r| r.node == *id) {
            table.add_row(vec![
                Cell::new(row.node),
                Cell::new(format_number(row.length)),
                Cell::new(row.paths),
                Cell::new(row.degree),
            ]);
        }
    }
    println!("{}", table);
}
