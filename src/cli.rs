//! CLI argument parsing for the run puller.
//!
//! Arguments are taken as-is: SHA and platform syntax are not checked here, a bad value
//! simply shows up later as a failed request.
use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Results endpoint queried for run summaries and per-test payloads.
pub const DEFAULT_ENDPOINT: &str = "https://wpt.fyi/results";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "pull-run",
    version,
    about = "Pull a local copy of a run's JSON and per-test results into the static dir",
    long_about = "Pull a local copy of the JSON for a given run and save the files in the \
                  'static' dir. The output pre-populates the dev-data seeding handler, so a \
                  change including content generated by this tool should update that handler \
                  as well.",
    after_help = "Examples:\n  pull-run --reset --sha=b952881825 chrome-63.0-linux edge-15-windows firefox-57.0-linux safari-10-macos\n  pull-run --dry --log=debug chrome-63.0-linux"
)]
pub struct PullArgs {
    /// SHA[0:10] of the run to fetch
    #[arg(long, value_name = "SHA", default_value = "latest")]
    pub sha: String,

    /// Log level to output (DEBUG, INFO, WARNING, ERROR, ...)
    #[arg(long, value_name = "LEVEL", default_value = "INFO")]
    pub log: String,

    /// Clear any existing static/{SHA} directory first
    #[arg(long)]
    pub reset: bool,

    /// Do a dry run (don't actually write any files)
    #[arg(long)]
    pub dry: bool,

    /// Results endpoint to query
    #[arg(long, value_name = "URL", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Static root to mirror into (defaults to ../static next to the executable)
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Platforms to fetch the runs for, e.g. "safari-10.0"
    #[arg(value_name = "platform", required = true, num_args = 1..)]
    pub platforms: Vec<String>,
}

/// Map a classic level name onto a tracing filter.
///
/// Returns `None` for names that are not recognised so the caller can fall back and say so.
pub fn parse_log_level(raw: &str) -> Option<LevelFilter> {
    let level = match raw.trim().to_ascii_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "ERROR" => LevelFilter::ERROR,
        "WARNING" | "WARN" => LevelFilter::WARN,
        "INFO" => LevelFilter::INFO,
        "DEBUG" => LevelFilter::DEBUG,
        "TRACE" | "NOTSET" => LevelFilter::TRACE,
        _ => return None,
    };
    Some(level)
}
