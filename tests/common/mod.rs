//! Shared test infrastructure for integration tests.
//!
//! A `wiremock::MockServer` plays the results endpoint; `run_pull` drives the built binary
//! against it on a blocking thread so the mock keeps serving.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SHA: &str = "abc123";
pub const PLATFORM: &str = "chrome-63.0-linux";
pub const SUMMARY_PATH: &str = "/download/abc123-summary.json.gz";

pub fn endpoint(server: &MockServer) -> String {
    format!("{}/results", server.uri())
}

/// Mount the run lookup for `platform`, answering 302 to `location`.
pub async fn mount_run_redirect(server: &MockServer, platform: &str, location: &str) {
    Mock::given(method("GET"))
        .and(path("/results"))
        .and(query_param("sha", SHA))
        .and(query_param("platform", platform))
        .and(query_param_is_missing("test"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
        .mount(server)
        .await;
}

/// Mount a payload at `route_path`.
pub async fn mount_body(server: &MockServer, route_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Mount one test's payload, expected to be requested exactly `times` times.
pub async fn mount_test(
    server: &MockServer,
    test: &str,
    status: u16,
    body: &[u8],
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path("/results"))
        .and(query_param("sha", SHA))
        .and(query_param("platform", PLATFORM))
        .and(query_param("test", test))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

/// `test` query values of every request the server has seen, in arrival order.
pub async fn requested_tests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "test")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .len()
}

/// Run the built binary with the given static root plus `args`.
pub async fn run_pull(static_root: &Path, endpoint: &str, args: &[&str]) -> Output {
    let static_root: PathBuf = static_root.to_path_buf();
    let endpoint = endpoint.to_string();
    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_pull-run"))
            .arg(format!("--endpoint={endpoint}"))
            .arg("--static-dir")
            .arg(&static_root)
            .args(&args)
            .env_remove("RUST_LOG")
            .output()
            .expect("run pull-run")
    })
    .await
    .expect("join pull-run")
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
