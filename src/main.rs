use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cli;
mod fetch;
mod layout;
mod output;
mod pull;

use cli::PullArgs;
use fetch::{ResultsEndpoint, UreqTransport};
use pull::PullRequest;

fn main() -> Result<()> {
    let args = PullArgs::parse();
    init_tracing(&args.log);

    let static_root = args
        .static_dir
        .clone()
        .unwrap_or_else(layout::default_static_root);
    let endpoint = ResultsEndpoint::parse(&args.endpoint)?;
    let transport = UreqTransport::new();
    let request = PullRequest {
        sha: &args.sha,
        platforms: &args.platforms,
        static_root: &static_root,
        reset: args.reset,
        dry_run: args.dry,
    };

    pull::pull(&transport, &endpoint, &request)?;
    Ok(())
}

/// Install the stderr subscriber. `RUST_LOG`, when set, wins over `--log`.
fn init_tracing(raw_level: &str) {
    let level = cli::parse_log_level(raw_level);
    let filter = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(LevelFilter::WARN).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    if level.is_none() {
        tracing::warn!(level = raw_level, "Unknown log level, using WARNING");
    }
}
