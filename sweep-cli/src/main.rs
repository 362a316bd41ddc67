mod commands;
mod output;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use commands::plan::PlanArgs;
use commands::run::RunArgs;
use commands::validate::ValidateArgs;

/// Run an evaluation program across a grid of experiment configurations
#[derive(Parser, Debug)]
#[command(name = "sweep", version, about)]
struct Cli {
    /// Verbose diagnostics (repeat for trace output)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every task of a sweep
    Run(RunArgs),
    /// List the tasks of a sweep and their paths without running anything
    Plan(PlanArgs),
    /// Check a sweep manifest and report the grid shape
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => commands::run::execute(args).await,
        Command::Plan(args) => commands::plan::execute(args),
        Command::Validate(args) => commands::validate::execute(args),
    }
}

/// RUST_LOG wins; otherwise `-v` raises the default level
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
