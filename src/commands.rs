//! CLI command definitions
//!
//! Defines the clap commands for the grader CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::testing::Suite;

#[derive(Subcommand)]
pub enum Commands {
    /// Run acceptance suites against a running service
    Run {
        /// Base URL of the service (overrides the config file)
        #[arg(long)]
        base_url: Option<String>,

        /// Suite to run; can be given multiple times: --suite v1 --suite v3
        /// (default: v1 v2 v3 v4 invalid-key backtest-exact)
        #[arg(long, short, value_enum)]
        suite: Vec<Suite>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write a JSON report of every step to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Accepted absolute difference for numeric returns
        #[arg(long)]
        tolerance: Option<f64>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Issue a single request and check its status and schema
    Call {
        /// HTTP method: GET, POST or DELETE
        method: String,

        /// Path below the base URL, e.g. /api/v1/row_count
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Validate a 2xx body against this schema, e.g. year_count
        #[arg(long)]
        schema: Option<String>,

        /// Accepted status; can be given multiple times (default: 200)
        #[arg(long)]
        expect: Vec<u16>,

        /// Base URL of the service (overrides the config file)
        #[arg(long)]
        base_url: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// List the response schemas, or print one
    Schemas {
        /// Schema name, e.g. row_count or price/open
        name: Option<String>,

        /// Print the JSON definition instead of a summary
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub fn verbose(&self) -> bool {
        matches!(
            self,
            Commands::Run { verbose: true, .. } | Commands::Call { verbose: true, .. }
        )
    }
}
