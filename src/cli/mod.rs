pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "minegraph",
    version,
    about = "Parameter optimization and graph statistics for organelle pangenome graphs",
    long_about = "MineGraph derives pggb parameters (mapping identity, segment length) from the \
                  input sequences themselves, builds the pangenome graph, and turns it into \
                  statistics tables, a polymorphism VCF, a consensus sequence and \
                  visualization data."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prepare, optimize, build the graph and analyze it
    Run(commands::run::RunArgs),

    /// Rename, index and compress the input sequences
    Prepare(commands::prepare::PrepareArgs),

    /// Estimate divergence and repeats and print the optimized parameters
    Optimize(commands::optimize::OptimizeArgs),

    /// Analyze an existing GFA graph
    Analyze(commands::analyze::AnalyzeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "minegraph", "-vv", "-j", "4", "run", "data", "--manifest", "data/list.csv",
            "--output", "out",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, 4);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.input.data_dir, std::path::PathBuf::from("data"));
                assert!(args.input.manifest.is_some());
            }
            _ => panic!("expected run"),
        }
    }
}
