//! ATF - test automation client
//!
//! Checks out test tasks from a remote service, runs their cases step by
//! step and writes hierarchical pass/fail reports.

use atf::{cli, commands, common::logging};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "atf", about = "Test automation client")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { verbose, .. } => {
            if let Some(path) = logging::init_run(*verbose) {
                tracing::debug!("Writing run log to {}", path.display());
            }
        }
        _ => logging::init_cli(false),
    }

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
