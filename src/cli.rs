use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

#[derive(Parser, Debug)]
#[command(
    name = "stressburst",
    author,
    version,
    about = "Fire a burst of concurrent HTTP requests and watch them land",
    long_about = "stressburst sends one fixed-size burst of simultaneous HTTP requests to a \
                  target, shows success/failure counts and latency while they complete, and \
                  prints every request's outcome at the end."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a burst against a target
    #[command(name = "run")]
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Target URL
    #[arg(required_unless_present = "config")]
    pub url: Option<String>,

    /// Number of simultaneous requests (1-10000)
    #[arg(short = 'c', long)]
    pub concurrency: Option<u32>,

    /// HTTP method (GET or POST)
    #[arg(short = 'm', long)]
    pub method: Option<String>,

    /// JSON request body, sent with POST
    #[arg(short = 'b', long)]
    pub body: Option<String>,

    /// Request body from file
    #[arg(long, value_name = "FILE", conflicts_with = "body")]
    pub body_file: Option<PathBuf>,

    /// Request timeout (e.g., 30s)
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Connection timeout (e.g., 10s)
    #[arg(long, value_parser = parse_duration)]
    pub connect_timeout: Option<Duration>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Load settings from a TOML config file
    #[arg(short = 'f', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write results as JSON to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop the run if it is still going after this long (e.g., 5s)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub stop_after: Option<Duration>,

    /// Include response bodies in the request list
    #[arg(long)]
    pub show_body: bool,

    /// Only print the final summary
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "stressburst.toml")]
    pub output: PathBuf,

    /// Target URL to include in config
    #[arg(short, long)]
    pub url: Option<String>,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}
