//! Models describing what one invocation dispatches and where.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Coordinates of the workflow being dispatched and tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTarget {
    pub owner: String,
    pub repo: String,
    /// Workflow file name (for example `deploy.yml`) or numeric workflow id.
    pub workflow_file: String,
    /// Git ref the workflow runs on. Also used as the `branch` filter when
    /// listing runs.
    pub git_ref: String,
}

impl WorkflowTarget {
    /// Browser URL of a run, built from the web base (not the API base).
    pub fn run_url(&self, web_base_url: &str, run_id: i64) -> String {
        format!(
            "{}/{}/{}/actions/runs/{}",
            web_base_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            run_id
        )
    }
}

impl fmt::Display for WorkflowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} → {} @ {}", self.owner, self.repo, self.workflow_file, self.git_ref)
    }
}

/// Body of the dispatch call.
///
/// `inputs` is expected to be sanitized already: no `null`, no `""`, and no
/// object that is empty after the same rule is applied recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: Map<String, Value>,
}

impl TriggerRequest {
    pub fn new(git_ref: impl Into<String>, inputs: Map<String, Value>) -> Self {
        Self {
            git_ref: git_ref.into(),
            inputs,
        }
    }
}

/// Short opaque value embedded into dispatch inputs so the dispatched run can
/// be recognised by its display title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `title` echoes this token anywhere.
    pub fn appears_in(&self, title: &str) -> bool {
        title.contains(self.0.as_str())
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
