//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// FHIR patient search latency benchmark
#[derive(Parser, Debug)]
#[command(name = "fhir-bench")]
#[command(version = "0.1.0")]
#[command(about = "Measure FHIR Patient search latency with and without server caching")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file (default: first of the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the benchmark over a term file
    Run(RunArgs),

    /// Run a single search and print the projected records
    Search(SearchArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Named run profile (reference, smoke, cache-sweep or one from the config file)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Number of iterations
    #[arg(short, long)]
    pub iterations: Option<u32>,

    /// Pause between iterations in seconds
    #[arg(long)]
    pub pause: Option<u64>,

    /// File with one family name per line
    #[arg(short, long)]
    pub names: Option<String>,

    /// FHIR server base URL
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// Print per-term latencies and the projected records of each iteration
    #[arg(short, long)]
    pub display: bool,

    /// Record failed searches and keep going instead of aborting
    #[arg(long)]
    pub continue_on_error: bool,

    /// Iterations that bypass the server cache (comma-separated, 1-based)
    #[arg(long, value_delimiter = ',')]
    pub disable_cache_on: Option<Vec<u32>>,

    /// Number of searches in flight per iteration
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort the run after this many seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Family name match (default, exact, contains)
    #[arg(long)]
    pub match_mode: Option<String>,

    /// Printed in place of a missing birth date
    #[arg(long)]
    pub absent_marker: Option<String>,

    /// Output format (text, json, json-pretty, csv)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Save report to file
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for search command
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Family name to search for
    pub family: String,

    /// FHIR server base URL
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// Send Cache-Control: no-cache
    #[arg(long)]
    pub no_cache: bool,

    /// Family name match (default, exact, contains)
    #[arg(long)]
    pub match_mode: Option<String>,

    /// Printed in place of a missing birth date
    #[arg(long)]
    pub absent_marker: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Write an example configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "./fhir-bench.yaml")]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        file: Option<String>,
    },

    /// List run profiles
    Profiles,

    /// Show environment variables
    Env,
}
