//! API grader - acceptance tests for the stock data REST API
//!
//! Runs the graded service through its versioned endpoints and prints a
//! pass/fail line per step.

use api_grader::common::logging;
use api_grader::{cli, commands};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "api-grader", about = "Acceptance tests for the stock data API")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.command.verbose());

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        if e.is_fatal_config() {
            eprintln!("See 'api-grader run --help' for configuration options");
        }
        std::process::exit(1);
    }
}
