//! GitHub Actions API client utilities.
//!
//! This crate provides a lightweight client for the three Actions endpoints
//! the relay needs. It focuses on:
//!
//! - Constructing an HTTP client with a bearer credential, the versioned
//!   `Accept` header, and a fixed per-call timeout
//! - Validating the API base URL so enterprise hosts work but plain-text
//!   credentials never leave the machine
//! - Decoding run payloads with useful diagnostics on failure
//!
//! The engine talks to the platform only through the [`ActionsApi`] trait, so
//! tests substitute scripted fakes for [`GitHubClient`].
//!
//! # Example
//!
//! ```ignore
//! use relay_api::{ActionsApi, GitHubClient};
//!
//! let client = GitHubClient::new("https://api.github.com", &token)?;
//! let run = client.get_run(&target, 42).await?;
//! println!("status: {}", run.status);
//! ```

pub mod error;
pub mod response;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use relay_types::{RunSummary, TriggerRequest, WorkflowRunsPage, WorkflowTarget};
use relay_util::redact_sensitive;
use reqwest::{Client, Method, RequestBuilder, Response, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use error::ApiError;
use response::{BODY_PREVIEW_LIMIT, parse_response_json_strict, truncate_response_preview};

/// Per-call timeout. A call that exceeds it fails with a transport error.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Page size used when listing recent runs.
pub const RUNS_PAGE_SIZE: u8 = 10;

const ACCEPT_HEADER: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
/// Hostnames allowed to use plain HTTP for local development.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];
/// RFC 3986 unreserved bytes pass through; everything else is encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// The remote operations the relay performs.
#[async_trait]
pub trait ActionsApi: Send + Sync {
    /// Ask the platform to start the workflow. Any 2xx is success.
    async fn dispatch_workflow(&self, target: &WorkflowTarget, request: &TriggerRequest) -> Result<(), ApiError>;

    /// List the most recent `workflow_dispatch` runs of the workflow on the
    /// target ref, newest first.
    async fn list_dispatch_runs(&self, target: &WorkflowTarget, per_page: u8) -> Result<WorkflowRunsPage, ApiError>;

    /// Read the current state of one run.
    async fn get_run(&self, target: &WorkflowTarget, run_id: i64) -> Result<RunSummary, ApiError>;
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for Actions API access.
///
/// Default headers carry the credential, so it never appears in request logs.
pub struct GitHubClient {
    base_url: String,
    http: Client,
}

impl GitHubClient {
    /// Construct a client for `base_url` authenticated with `token`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, token, REQUEST_TIMEOUT)
    }

    /// Same as [`GitHubClient::new`] with a custom per-call timeout.
    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        let mut authorization = header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ApiError::InvalidCredential)?;
        authorization.set_sensitive(true);
        default_headers.insert(header::AUTHORIZATION, authorization);
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_HEADER));
        default_headers.insert(API_VERSION_HEADER, header::HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .default_headers(default_headers)
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "building request");
        self.http.request(method, url)
    }

    async fn send(&self, builder: RequestBuilder, operation: &'static str) -> Result<Response, ApiError> {
        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(operation, %status, duration_ms = start.elapsed().as_millis(), "request completed");
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body = redact_sensitive(&truncate_response_preview(&text, BODY_PREVIEW_LIMIT));
        warn!(operation, %status, duration_ms = start.elapsed().as_millis(), "request failed");
        Err(ApiError::Status { status, body })
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)], operation: &'static str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::GET, path).query(query), operation).await?;
        let status = response.status();
        let text = response.text().await?;
        Ok(parse_response_json_strict(&text, Some(status))?)
    }
}

#[async_trait]
impl ActionsApi for GitHubClient {
    async fn dispatch_workflow(&self, target: &WorkflowTarget, request: &TriggerRequest) -> Result<(), ApiError> {
        let path = workflow_path(target, "dispatches");
        self.send(self.request(Method::POST, &path).json(request), "dispatch_workflow")
            .await
            .map(|_| ())
    }

    async fn list_dispatch_runs(&self, target: &WorkflowTarget, per_page: u8) -> Result<WorkflowRunsPage, ApiError> {
        let path = workflow_path(target, "runs");
        let query = [
            ("event", "workflow_dispatch".to_string()),
            ("branch", target.git_ref.clone()),
            ("per_page", per_page.to_string()),
        ];
        self.get_json(&path, &query, "list_dispatch_runs").await
    }

    async fn get_run(&self, target: &WorkflowTarget, run_id: i64) -> Result<RunSummary, ApiError> {
        let path = format!("{}/runs/{}", actions_path(target), run_id);
        self.get_json(&path, &[], "get_run").await
    }
}

fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

fn actions_path(target: &WorkflowTarget) -> String {
    format!(
        "/repos/{}/{}/actions",
        encode_segment(&target.owner),
        encode_segment(&target.repo)
    )
}

fn workflow_path(target: &WorkflowTarget, suffix: &str) -> String {
    format!(
        "{}/workflows/{}/{}",
        actions_path(target),
        encode_segment(&target.workflow_file),
        suffix
    )
}

/// Validate that a base URL is acceptable and normalise it.
///
/// Rules:
/// - it must parse and include a host
/// - `localhost` and loopback addresses may use any scheme
/// - every other host must use HTTPS (enterprise hosts are fine)
///
/// Trailing slashes are removed so paths can be appended directly.
fn validate_base_url(base: &str) -> Result<String, ApiError> {
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };
    let parsed = Url::parse(base).map_err(|error| invalid(error.to_string()))?;
    let host_name = parsed.host_str().ok_or_else(|| invalid("URL must include a host".into()))?;

    let is_local = LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed));
    if !is_local && parsed.scheme() != "https" {
        return Err(invalid(format!(
            "must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        )));
    }

    Ok(base.trim_end_matches('/').to_string())
}
