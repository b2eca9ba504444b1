//! HTTP access to the results endpoint.
//!
//! The pipeline talks to a [`Transport`] so it can be driven without a network. The real
//! implementation is [`UreqTransport`]; statuses are always returned as values, never as
//! errors, and only transport-level failures surface as `Err`.
use anyhow::{anyhow, Context, Result};
use std::time::Instant;
use url::Url;

/// Whether a GET should follow 3xx responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redirects {
    Follow,
    Manual,
}

/// The parts of a response the puller cares about.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Location` header, if any.
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_redirect(&self) -> bool {
        self.status / 100 == 3
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub trait Transport {
    fn get(&self, url: &Url, redirects: Redirects) -> Result<HttpResponse>;
}

/// Blocking transport on top of two ureq agents.
pub struct UreqTransport {
    manual: ureq::Agent,
    follow: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let manual = ureq::config::Config::builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .build()
            .new_agent();
        let follow = ureq::config::Config::builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { manual, follow }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &Url, redirects: Redirects) -> Result<HttpResponse> {
        let agent = match redirects {
            Redirects::Follow => &self.follow,
            Redirects::Manual => &self.manual,
        };
        let start = Instant::now();
        let mut response = agent
            .get(url.as_str())
            .call()
            .with_context(|| format!("GET {url}"))?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(ureq::http::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        // Redirect bodies are never used.
        let body = if redirects == Redirects::Manual && status / 100 == 3 {
            Vec::new()
        } else {
            response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .with_context(|| format!("read body of {url}"))?
        };

        let elapsed_ms = start.elapsed().as_millis();

        tracing::debug!(
            %url,
            status,
            body_bytes = body.len(),
            elapsed_ms,
            "http get complete"
        );

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

/// Builds request URLs against the results endpoint.
#[derive(Clone, Debug)]
pub struct ResultsEndpoint {
    base: Url,
}

impl ResultsEndpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let base = Url::parse(raw).with_context(|| format!("parse results endpoint {raw}"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("results endpoint {raw} is not a base URL"));
        }
        Ok(Self { base })
    }

    /// `endpoint?sha=..&platform=..`, answered with a redirect to the run summary.
    pub fn run_url(&self, sha: &str, platform: &str) -> Url {
        self.with_query(&[("sha", sha), ("platform", platform)])
    }

    /// `endpoint?sha=..&platform=..&test=..`, answered with one test's results.
    pub fn test_url(&self, sha: &str, platform: &str, test: &str) -> Url {
        self.with_query(&[("sha", sha), ("platform", platform), ("test", test)])
    }

    fn with_query(&self, pairs: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url
    }
}

/// Resolve a `Location` value, absolute or relative, against the request that produced it.
pub fn resolve_location(request: &Url, location: &str) -> Result<Url> {
    request
        .join(location)
        .with_context(|| format!("resolve redirect location {location}"))
}

/// Final path segment of a redirect target, used as the run summary file name.
///
/// The query string is ignored: `/d/s.json.gz?sig=a/b` names `s.json.gz`.
pub fn target_file_name(target: &Url) -> Option<&str> {
    target
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
}
