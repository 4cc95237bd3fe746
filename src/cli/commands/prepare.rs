use super::{build_context, load_effective_config, InputArgs};
use crate::cli::output::*;
use crate::core::pipeline::{Pipeline, ToolSet};
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,
}

pub fn run(args: PrepareArgs) -> anyhow::Result<()> {
    let config = load_effective_config(args.input.config.as_deref(), args.threads)?;
    let context = build_context(&args.input, config, false);
    let tools = ToolSet::for_estimation(&context.config, context.threads())?;

    let mut pipeline = Pipeline::new(context, tools);
    let results = pipeline
        .prepare_only()
        .with_context(|| format!("Preparing {} failed", args.input.data_dir.display()))?;

    let summary = &pipeline.context().summary;
    section_header_with_line("Prepared Sequences");
    tree_items(&[
        ("Files", format_number(summary.inputs.len())),
        ("Sequences", format_number(summary.sequences)),
    ]);
    println!();
    success(&format!(
        "Prepared FASTA written to {}",
        results.join("prepared").display()
    ));
    Ok(())
}
