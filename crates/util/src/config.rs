//! Process configuration.
//!
//! Everything the invocation needs is read from the environment exactly once
//! and frozen into a [`RelayConfig`]. The engine receives that value by
//! reference; nothing below this module looks at the environment again.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use relay_types::{CorrelationToken, WorkflowTarget};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::correlation::generate_token;
use crate::payload::{PayloadError, parse_payload, sanitize_payload};

pub const OWNER_ENV: &str = "INPUT_OWNER";
pub const REPO_ENV: &str = "INPUT_REPO";
pub const TOKEN_ENV: &str = "INPUT_GITHUB_TOKEN";
pub const WORKFLOW_FILE_ENV: &str = "INPUT_WORKFLOW_FILE_NAME";
pub const REF_ENV: &str = "INPUT_REF";
pub const PAYLOAD_ENV: &str = "INPUT_CLIENT_PAYLOAD";
pub const WAIT_INTERVAL_ENV: &str = "INPUT_WAIT_INTERVAL";
pub const TRIGGER_TIMEOUT_ENV: &str = "INPUT_TRIGGER_TIMEOUT";
pub const PROPAGATE_FAILURE_ENV: &str = "INPUT_PROPAGATE_FAILURE";
pub const TRIGGER_WORKFLOW_ENV: &str = "INPUT_TRIGGER_WORKFLOW";
pub const WAIT_WORKFLOW_ENV: &str = "INPUT_WAIT_WORKFLOW";
pub const DISTINCT_ID_NAME_ENV: &str = "INPUT_DISTINCT_ID_NAME";
pub const RUN_ID_ENV: &str = "INPUT_RUN_ID";
pub const API_URL_ENV: &str = "GITHUB_API_URL";
pub const SERVER_URL_ENV: &str = "GITHUB_SERVER_URL";
pub const OUTPUT_PATH_ENV: &str = "GITHUB_OUTPUT";

pub const DEFAULT_REF: &str = "main";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";
pub const DEFAULT_WAIT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_TRIGGER_TIMEOUT_SECS: u64 = 120;

/// Error surfaced while building the configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("wait_interval must be at least 1 second")]
    InvalidInterval,
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Where the correlation token goes and what it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationSettings {
    /// Input field name the token is injected under.
    pub field: String,
    pub token: CorrelationToken,
}

/// Frozen configuration for one invocation.
#[derive(Clone)]
pub struct RelayConfig {
    pub target: WorkflowTarget,
    /// Bearer credential. Never printed; see the `Debug` impl.
    pub github_token: String,
    /// Sanitized dispatch inputs, correlation token included when enabled.
    pub inputs: Map<String, Value>,
    /// Present only when a token field name was configured.
    pub correlation: Option<CorrelationSettings>,
    pub wait_interval: Duration,
    pub trigger_timeout: Duration,
    pub propagate_failure: bool,
    pub trigger_workflow: bool,
    pub wait_workflow: bool,
    /// Run to track when dispatch is skipped.
    pub run_id: Option<i64>,
    pub api_base_url: String,
    pub web_base_url: String,
    /// Side-channel output file.
    pub output_path: Option<PathBuf>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("target", &self.target)
            .field("github_token", &"<redacted>")
            .field("input_keys", &self.inputs.keys().collect::<Vec<_>>())
            .field("correlation", &self.correlation)
            .field("wait_interval", &self.wait_interval)
            .field("trigger_timeout", &self.trigger_timeout)
            .field("propagate_failure", &self.propagate_failure)
            .field("trigger_workflow", &self.trigger_workflow)
            .field("wait_workflow", &self.wait_workflow)
            .field("run_id", &self.run_id)
            .field("api_base_url", &self.api_base_url)
            .field("web_base_url", &self.web_base_url)
            .field("output_path", &self.output_path)
            .finish()
    }
}

impl RelayConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Order matters: the payload is parsed and sanitized first, the
    /// correlation token is injected next, and required coordinates are
    /// validated last.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let raw_payload = read(PAYLOAD_ENV).unwrap_or_default();
        let mut inputs = sanitize_payload(&parse_payload(&raw_payload)?);

        let correlation = read(DISTINCT_ID_NAME_ENV).map(|field| {
            let token = generate_token();
            inputs.insert(field.clone(), Value::String(token.as_str().to_string()));
            CorrelationSettings { field, token }
        });

        let wait_interval_secs = read_number(&read, WAIT_INTERVAL_ENV, "wait_interval", DEFAULT_WAIT_INTERVAL_SECS)?;
        if wait_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        let trigger_timeout_secs =
            read_number(&read, TRIGGER_TIMEOUT_ENV, "trigger_timeout", DEFAULT_TRIGGER_TIMEOUT_SECS)?;

        let run_id = match read(RUN_ID_ENV) {
            Some(raw) => Some(parse_run_id(&raw)?),
            None => None,
        };

        let owner = read(OWNER_ENV).ok_or(ConfigError::Missing { name: "owner" })?;
        let repo = read(REPO_ENV).ok_or(ConfigError::Missing { name: "repo" })?;
        let github_token = read(TOKEN_ENV).ok_or(ConfigError::Missing { name: "github_token" })?;
        let workflow_file = read(WORKFLOW_FILE_ENV).ok_or(ConfigError::Missing {
            name: "workflow_file_name",
        })?;

        let config = Self {
            target: WorkflowTarget {
                owner,
                repo,
                workflow_file,
                git_ref: read(REF_ENV).unwrap_or_else(|| DEFAULT_REF.to_string()),
            },
            github_token,
            inputs,
            correlation,
            wait_interval: Duration::from_secs(wait_interval_secs),
            trigger_timeout: Duration::from_secs(trigger_timeout_secs),
            propagate_failure: read_bool(&read, PROPAGATE_FAILURE_ENV, true),
            trigger_workflow: read_bool(&read, TRIGGER_WORKFLOW_ENV, true),
            wait_workflow: read_bool(&read, WAIT_WORKFLOW_ENV, true),
            run_id,
            api_base_url: read(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            web_base_url: read(SERVER_URL_ENV).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            output_path: read(OUTPUT_PATH_ENV).map(PathBuf::from),
        };
        debug!(config = ?config, "configuration loaded");
        Ok(config)
    }

    /// Correlation token for this invocation, if correlation is enabled.
    pub fn correlation_token(&self) -> Option<&CorrelationToken> {
        self.correlation.as_ref().map(|settings| &settings.token)
    }
}

/// Interpret a boolean input. Unset means `default`; otherwise only a
/// case-insensitive `true` is true.
pub fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim) {
        None | Some("") => default,
        Some(value) => value.eq_ignore_ascii_case("true"),
    }
}

fn read_bool<R>(read: &R, name: &str, default: bool) -> bool
where
    R: Fn(&str) -> Option<String>,
{
    parse_bool(read(name).as_deref(), default)
}

fn read_number<R>(read: &R, env_name: &str, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    R: Fn(&str) -> Option<String>,
{
    match read(env_name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

fn parse_run_id(raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ConfigError::InvalidNumber {
            name: "run_id",
            value: raw.to_string(),
        })
}
