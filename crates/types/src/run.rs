//! Workflow run models as observed through polling.
//!
//! A [`RunSummary`] is always a fresh read from the platform. Nothing in the
//! workspace caches one across polls, since `status` and `conclusion` move
//! independently between reads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One workflow run instance as returned by the runs endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier, unique within the repository.
    pub id: i64,
    /// Creation timestamp. `None` when the platform value could not be parsed;
    /// such runs never qualify during correlation.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Rendered `run-name` of the run. Correlation tokens are matched here.
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_title: String,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Terminal outcome, only present once `status` is completed.
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
}

impl RunSummary {
    /// Conclusion rendered for the output side channel; empty when absent.
    pub fn conclusion_label(&self) -> &str {
        self.conclusion.as_ref().map(RunConclusion::as_str).unwrap_or("")
    }
}

/// Page returned by `GET .../workflows/{file}/runs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunsPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<RunSummary>,
}

/// Run lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Requested,
    Queued,
    Pending,
    Waiting,
    InProgress,
    Completed,
    /// Any status this build does not know about.
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Requested => "requested",
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// No further transition happens from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// True while the run is accepted but nothing is executing yet.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Requested | Self::Queued | Self::Pending | Self::Waiting)
    }

    /// Short label used in progress lines.
    pub fn progress_label(&self) -> &str {
        if self.is_queued() {
            "queued"
        } else if matches!(self, Self::InProgress) {
            "running"
        } else {
            self.as_str()
        }
    }
}

impl From<String> for RunStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "requested" => Self::Requested,
            "queued" => Self::Queued,
            "pending" => Self::Pending,
            "waiting" => Self::Waiting,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Other(raw),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Neutral,
    Stale,
    StartupFailure,
    Other(String),
}

impl RunConclusion {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::ActionRequired => "action_required",
            Self::Neutral => "neutral",
            Self::Stale => "stale",
            Self::StartupFailure => "startup_failure",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<String> for RunConclusion {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "cancelled" => Self::Cancelled,
            "skipped" => Self::Skipped,
            "timed_out" => Self::TimedOut,
            "action_required" => Self::ActionRequired,
            "neutral" => Self::Neutral,
            "stale" => Self::Stale,
            "startup_failure" => Self::StartupFailure,
            _ => Self::Other(raw),
        }
    }
}

impl From<RunConclusion> for String {
    fn from(conclusion: RunConclusion) -> Self {
        conclusion.as_str().to_string()
    }
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of tracking a run to its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: i64,
    pub conclusion: Option<RunConclusion>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.conclusion.as_ref().is_some_and(RunConclusion::is_success)
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
        .map(|parsed| parsed.with_timezone(&Utc)))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
