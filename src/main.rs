use clap::Parser;
use colored::*;
use minegraph::cli::{Cli, Commands};
use minegraph::utils::parallel::{configure_thread_pool, effective_threads};
use minegraph::MineGraphError;
use std::io::IsTerminal;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins, then MINEGRAPH_LOG, then the -v count
    let log_level = std::env::var("MINEGRAPH_LOG").unwrap_or_else(|_| {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
        .to_string()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = e
            .downcast_ref::<MineGraphError>()
            .map(MineGraphError::exit_code)
            .unwrap_or(1);
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let num_threads = effective_threads(cli.threads);
    configure_thread_pool(num_threads)?;

    if cli.verbose > 0 {
        eprintln!("Using {} threads", num_threads);
    }

    let quiet = cli.quiet || !std::io::stderr().is_terminal();

    match cli.command {
        Commands::Run(mut args) => {
            args.threads = cli.threads;
            args.quiet = quiet;
            minegraph::cli::commands::run::run(args)
        }
        Commands::Prepare(mut args) => {
            args.threads = cli.threads;
            minegraph::cli::commands::prepare::run(args)
        }
        Commands::Optimize(mut args) => {
            args.threads = cli.threads;
            args.quiet = quiet;
            minegraph::cli::commands::optimize::run(args)
        }
        Commands::Analyze(mut args) => {
            args.threads = cli.threads;
            minegraph::cli::commands::analyze::run(args)
        }
    }
}
