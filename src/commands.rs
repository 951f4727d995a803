//! CLI command definitions
//!
//! Defines the clap commands for the atf CLI.

use clap::{ArgGroup, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a checked-out task (or individual cases) and write a report
    Run {
        /// Workspace directory with checked-out tasks and cases
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Task id to run
        #[arg(long, short = 't', conflicts_with = "cases")]
        task: Option<u32>,

        /// Case id(s) to run without a task; repeatable
        /// (default: every case in the workspace)
        #[arg(long = "case", short = 'c')]
        cases: Vec<String>,

        /// Execution environment tag recorded in the report
        #[arg(long)]
        env: Option<String>,

        /// Number of cases to run concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Per-step timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Cancel the whole run after this many seconds
        #[arg(long)]
        task_timeout: Option<u64>,

        /// Do not compare against or update stored baselines
        #[arg(long)]
        no_baseline: bool,

        /// Show passing steps and checkpoints too
        #[arg(long, short)]
        verbose: bool,
    },

    /// Check out cases from the remote service by task, product/module or suite
    #[command(name = "co", alias = "checkout")]
    #[command(group(ArgGroup::new("selection").required(true).args(["task", "product", "suite"])))]
    Checkout {
        /// Task id to check out, with all of its cases
        #[arg(long, short = 't')]
        task: Option<u32>,

        /// Product whose cases to check out
        #[arg(long, short = 'p')]
        product: Option<String>,

        /// Narrow a product checkout to one module
        #[arg(long, short = 'm', requires = "product")]
        module: Option<String>,

        /// Test suite whose cases to check out
        #[arg(long, short = 's')]
        suite: Option<String>,

        /// Workspace directory to write into
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
    },

    /// Refresh checked-out tasks and cases from the remote service
    Update {
        /// Only refresh this task
        #[arg(long, short = 't')]
        task: Option<u32>,

        /// Workspace directory to refresh
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
    },

    /// Submit a report's case results to the remote service
    Ci {
        /// Path to a report JSON file (default: the most recent one)
        path: Option<PathBuf>,
    },

    /// List products, or the modules of a product, on the remote service
    List {
        /// Product id whose modules to list
        #[arg(long, short = 'p')]
        product: Option<String>,

        /// List the cases checked out in a workspace instead
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
    },

    /// Show a saved report (default: the most recent one)
    View {
        /// Path to a report JSON file
        path: Option<PathBuf>,

        /// Show passing steps and checkpoints too
        #[arg(long, short)]
        verbose: bool,
    },

    /// Compare two saved reports checkpoint by checkpoint
    Diff {
        /// Older report
        base: PathBuf,

        /// Newer report
        head: PathBuf,

        /// Output the differences as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change preferences
    Set {
        /// Interface language: en or zh
        #[arg(long, short = 'l')]
        language: Option<String>,

        /// Remote site URL
        #[arg(long)]
        url: Option<String>,

        /// Remote account name
        #[arg(long)]
        account: Option<String>,

        /// Remote account password
        #[arg(long)]
        password: Option<String>,

        /// Default environment tag for reports
        #[arg(long)]
        env: Option<String>,

        /// Default number of concurrent cases
        #[arg(long)]
        workers: Option<usize>,

        /// Default per-step timeout in seconds
        #[arg(long)]
        step_timeout: Option<u64>,
    },

    /// Print the current configuration
    Config,
}
