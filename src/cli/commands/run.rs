use super::{build_context, load_effective_config, InputArgs};
use crate::cli::output::*;
use crate::core::context::RunSummary;
use crate::core::pipeline::{Pipeline, ToolSet};
use anyhow::Context;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Consensus quantile: percentage of paths a node must appear in (0-100)
    #[arg(long, value_name = "PERCENT")]
    pub quantile: Option<f64>,

    /// Path used as the VCF reference (defaults to the first path)
    #[arg(long, value_name = "PATH_NAME")]
    pub reference: Option<String>,

    /// Also run MSA and tree inference
    #[arg(long)]
    pub phylogeny: bool,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,

    #[arg(skip)]
    pub quiet: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_effective_config(args.input.config.as_deref(), args.threads)?;
    if let Some(q) = args.quantile {
        config.analysis.consensus_quantile = q;
    }
    if args.reference.is_some() {
        config.analysis.reference_path = args.reference.clone();
    }
    config.analysis.phylogeny |= args.phylogeny;
    config.validate()?;

    let context = build_context(&args.input, config, !args.quiet);
    let tools = ToolSet::from_config(&context.config, context.threads())
        .context("Failed to locate the external tools")?;

    let mut pipeline = Pipeline::new(context, tools);
    let results = pipeline
        .run()
        .with_context(|| format!("Run on {} failed", args.input.data_dir.display()))?;

    print_run_summary(&pipeline.context().summary, &results);
    Ok(())
}

pub(crate) fn print_run_summary(summary: &RunSummary, results: &Path) {
    section_header_with_line("MineGraph Run Summary");

    subsection_header("Inputs");
    tree_items(&[
        ("Files", format_number(summary.inputs.len())),
        ("Sequences", format_number(summary.sequences)),
    ]);

    if let Some(params) = &summary.parameters {
        subsection_header("Parameters");
        let mut items = Vec::new();
        if let Some(d) = summary.max_divergence {
            items.push(("Max divergence", format!("{:.4}", d)));
        }
        items.push(("Mapping identity", format!("{:.1}%", params.identity_percent())));
        if let Some(len) = summary.longest_repeat {
            items.push(("Longest repeat", format!("{} bp", format_number(len))));
        }
        items.push(("Segment length", format!("{} bp", format_number(params.segment_length))));
        tree_items(&items);
    }

    if !summary.excluded_from_repeats.is_empty() {
        warning(&format!(
            "{} sequences excluded from repeat estimation: {}",
            summary.excluded_from_repeats.len(),
            summary.excluded_from_repeats.join(", ")
        ));
    }

    if let (Some(nodes), Some(edges), Some(paths)) =
        (summary.graph_nodes, summary.graph_edges, summary.graph_paths)
    {
        subsection_header("Graph");
        let mut items = vec![
            ("Nodes", format_number(nodes)),
            ("Edges", format_number(edges)),
            ("Paths", format_number(paths)),
        ];
        if let Some(n) = summary.polymorphisms {
            items.push(("Polymorphisms", format_number(n)));
        }
        if let Some(len) = summary.consensus_length {
            items.push(("Consensus", format!("{} bp", format_number(len))));
        }
        tree_items(&items);
    }

    if let Some(tree) = &summary.tree {
        info(&format!("Tree: {}", results.join(tree).display()));
    }

    println!();
    success(&format!("Results written to {}", results.display()));
}
