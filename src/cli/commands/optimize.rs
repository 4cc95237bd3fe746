use super::{build_context, load_effective_config, InputArgs};
use super::run::print_run_summary;
use crate::cli::output::*;
use crate::core::pipeline::{Pipeline, ToolSet, PARAMS_YAML};
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the parameters as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,

    #[arg(skip)]
    pub quiet: bool,
}

pub fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    let config = load_effective_config(args.input.config.as_deref(), args.threads)?;
    let context = build_context(&args.input, config, !args.quiet && !args.json);
    let tools = ToolSet::for_estimation(&context.config, context.threads())?;

    let mut pipeline = Pipeline::new(context, tools);
    let (results, parameters) = pipeline
        .optimize_only()
        .with_context(|| format!("Optimizing {} failed", args.input.data_dir.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parameters)?);
        return Ok(());
    }

    print_run_summary(&pipeline.context().summary, &results);
    info(&format!(
        "pggb parameters: {}",
        results.join("estimation").join(PARAMS_YAML).display()
    ));
    Ok(())
}
