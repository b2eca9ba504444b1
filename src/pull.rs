//! The pull loop: one run lookup per platform, then one request per test key.
//!
//! Everything is sequential. Recoverable problems (unexpected statuses, unreachable hosts,
//! per-test I/O errors) are logged and counted; a malformed run summary or a failed summary
//! write ends the whole pull with an error.
use crate::fetch::{self, HttpResponse, Redirects, ResultsEndpoint, Transport};
use crate::layout;
use crate::output;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Top-level mapping of a run summary. Only the keys matter; document order is kept.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct RunSummary(serde_json::Map<String, serde_json::Value>);

impl RunSummary {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).context("decode run summary as UTF-8")?;
        serde_json::from_str(text).context("parse run summary JSON")
    }

    pub fn test_keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn test_count(&self) -> usize {
        self.0.len()
    }
}

/// Counters reported at the end of a pull.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PullTotals {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PullTotals {
    fn record(&mut self, outcome: TestOutcome) {
        match outcome {
            TestOutcome::Processed => self.processed += 1,
            TestOutcome::Skipped => self.skipped += 1,
            TestOutcome::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for PullTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Completed pull with {} files processed, {} skipped and {} failures.",
            self.processed, self.skipped, self.failed
        )
    }
}

/// How a single platform's run lookup ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformOutcome {
    /// Summary handled and every test key visited.
    Pulled { tests: usize },
    /// The run lookup answered with something other than a redirect.
    NotRedirected { status: u16 },
    /// A redirect without a `Location` header.
    MissingLocation,
    /// The redirect target did not answer 200.
    SummaryUnavailable { status: u16 },
    /// The run lookup could not reach the endpoint at all.
    Unreachable,
}

impl fmt::Display for PlatformOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pulled { tests } => write!(f, "pulled {tests} tests"),
            Self::NotRedirected { status } => write!(f, "no redirect (status {status})"),
            Self::MissingLocation => f.write_str("redirect without location"),
            Self::SummaryUnavailable { status } => {
                write!(f, "summary unavailable (status {status})")
            }
            Self::Unreachable => f.write_str("endpoint unreachable"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    Processed,
    Skipped,
    Failed,
}

/// Inputs for one pull.
pub struct PullRequest<'a> {
    pub sha: &'a str,
    pub platforms: &'a [String],
    pub static_root: &'a Path,
    pub reset: bool,
    pub dry_run: bool,
}

struct Puller<'a, T: Transport> {
    transport: &'a T,
    endpoint: &'a ResultsEndpoint,
    sha: &'a str,
    run_dir: PathBuf,
    dry_run: bool,
}

/// Prepare the run directory and pull every requested platform.
pub fn pull<T: Transport>(
    transport: &T,
    endpoint: &ResultsEndpoint,
    request: &PullRequest<'_>,
) -> Result<PullTotals> {
    let run_dir = layout::run_dir(request.static_root, request.sha);
    tracing::info!(path = %run_dir.display(), "Operating in directory");
    output::prepare_run_dir(&run_dir, request.reset, request.dry_run)?;

    let puller = Puller {
        transport,
        endpoint,
        sha: request.sha,
        run_dir,
        dry_run: request.dry_run,
    };
    let mut totals = PullTotals::default();
    for platform in request.platforms {
        let start = Instant::now();
        let outcome = puller.pull_platform(platform, &mut totals)?;
        let elapsed_ms = start.elapsed().as_millis();
        tracing::info!(platform = %platform, elapsed_ms, "Platform finished: {outcome}");
    }
    tracing::info!("{totals}");
    Ok(totals)
}

impl<T: Transport> Puller<'_, T> {
    fn pull_platform(&self, platform: &str, totals: &mut PullTotals) -> Result<PlatformOutcome> {
        let run_url = self.endpoint.run_url(self.sha, platform);
        let lookup = match self.transport.get(&run_url, Redirects::Manual) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %run_url, "Failed to reach results endpoint: {err:#}");
                return Ok(PlatformOutcome::Unreachable);
            }
        };
        if !lookup.is_redirect() {
            tracing::warn!(
                url = %run_url,
                "Got unexpected non-redirect result {}",
                lookup.status
            );
            return Ok(PlatformOutcome::NotRedirected {
                status: lookup.status,
            });
        }
        let Some(location) = lookup.location.as_deref() else {
            tracing::warn!(url = %run_url, status = lookup.status, "Redirect has no location");
            return Ok(PlatformOutcome::MissingLocation);
        };
        let target = fetch::resolve_location(&run_url, location)?;

        let summary = match self.transport.get(&target, Redirects::Follow) {
            Ok(response) if response.is_ok() => response,
            Ok(response) => {
                tracing::warn!(
                    url = %target,
                    status = response.status,
                    "Failed to fetch {run_url}"
                );
                return Ok(PlatformOutcome::SummaryUnavailable {
                    status: response.status,
                });
            }
            Err(err) => {
                tracing::warn!(url = %target, "Failed to fetch {run_url}: {err:#}");
                return Ok(PlatformOutcome::Unreachable);
            }
        };
        tracing::debug!(url = %target, "Processing JSON");
        let tests = RunSummary::parse(&summary.body)
            .with_context(|| format!("run summary from {target}"))?;

        self.store_summary(&target, &summary)?;

        for key in tests.test_keys() {
            let outcome = self.pull_test(platform, key);
            totals.record(outcome);
        }
        Ok(PlatformOutcome::Pulled {
            tests: tests.test_count(),
        })
    }

    fn store_summary(&self, target: &url::Url, summary: &HttpResponse) -> Result<()> {
        let file_name = fetch::target_file_name(target)
            .ok_or_else(|| anyhow!("redirect target {target} has no file name"))?;
        let path = self.run_dir.join(file_name);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Run summary already present");
            return Ok(());
        }
        output::write_file(&summary.body, &path, self.dry_run)
    }

    fn pull_test(&self, platform: &str, key: &str) -> TestOutcome {
        let test_path = layout::test_path_from_key(key);
        let test_url = self.endpoint.test_url(self.sha, platform, test_path);
        let dest = match layout::test_destination(&self.run_dir, platform, test_path) {
            Ok(dest) => dest,
            Err(err) => {
                tracing::warn!(url = %test_url, "Error processing {key}: {err:#}");
                return TestOutcome::Failed;
            }
        };
        if dest.exists() {
            tracing::info!(path = %dest.display(), "Skipping file which already exists");
            return TestOutcome::Skipped;
        }

        tracing::info!(url = %test_url, "Fetching");
        let response = match self.transport.get(&test_url, Redirects::Follow) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %test_url, "Failed to fetch: {err:#}");
                return TestOutcome::Failed;
            }
        };
        if !response.is_ok() {
            tracing::warn!(url = %test_url, status = response.status, "Failed to fetch");
            return TestOutcome::Failed;
        }

        match output::write_file(&response.body, &dest, self.dry_run) {
            Ok(()) => TestOutcome::Processed,
            Err(err) => {
                tracing::warn!(url = %test_url, "IO error: {err:#}");
                TestOutcome::Failed
            }
        }
    }
}
