//! Scripted [`ActionsApi`] used by the engine's unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use relay_api::{ActionsApi, ApiError};
use relay_types::{RunConclusion, RunStatus, RunSummary, TriggerRequest, WorkflowRunsPage, WorkflowTarget};
use reqwest::StatusCode;
use tokio::time::Instant;

pub(crate) fn target() -> WorkflowTarget {
    WorkflowTarget {
        owner: "octo".into(),
        repo: "widgets".into(),
        workflow_file: "deploy.yml".into(),
        git_ref: "main".into(),
    }
}

pub(crate) fn run_state(id: i64, status: RunStatus, conclusion: Option<RunConclusion>) -> RunSummary {
    RunSummary {
        id,
        created_at: None,
        display_title: String::new(),
        status,
        conclusion,
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "<empty>".into(),
    }
}

/// Replays queued responses in order. An exhausted run-list queue falls back
/// to `default_runs`; an exhausted run-state queue repeats the last state.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    dispatch_failure: Option<StatusCode>,
    list_script: Mutex<VecDeque<Option<Vec<RunSummary>>>>,
    default_runs: Vec<RunSummary>,
    run_script: Mutex<VecDeque<Option<RunSummary>>>,
    last_run: Mutex<Option<RunSummary>>,
    dispatched: Mutex<Vec<TriggerRequest>>,
    list_calls: Mutex<Vec<Instant>>,
    get_calls: Mutex<Vec<Instant>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_dispatch_failure(mut self, status: StatusCode) -> Self {
        self.dispatch_failure = Some(status);
        self
    }

    pub(crate) fn with_runs(self, runs: Vec<RunSummary>) -> Self {
        self.list_script.lock().unwrap().push_back(Some(runs));
        self
    }

    pub(crate) fn with_list_error(self) -> Self {
        self.list_script.lock().unwrap().push_back(None);
        self
    }

    pub(crate) fn with_default_runs(mut self, runs: Vec<RunSummary>) -> Self {
        self.default_runs = runs;
        self
    }

    pub(crate) fn with_run(self, run: RunSummary) -> Self {
        self.run_script.lock().unwrap().push_back(Some(run));
        self
    }

    pub(crate) fn with_run_error(self) -> Self {
        self.run_script.lock().unwrap().push_back(None);
        self
    }

    pub(crate) fn dispatched(&self) -> Vec<TriggerRequest> {
        self.dispatched.lock().unwrap().clone()
    }

    /// Whole seconds between `origin` and each run-list call.
    pub(crate) fn list_call_offsets(&self, origin: Instant) -> Vec<u64> {
        offsets(&self.list_calls.lock().unwrap(), origin)
    }

    /// Whole seconds between `origin` and each run-state call.
    pub(crate) fn get_call_offsets(&self, origin: Instant) -> Vec<u64> {
        offsets(&self.get_calls.lock().unwrap(), origin)
    }
}

fn offsets(calls: &[Instant], origin: Instant) -> Vec<u64> {
    calls
        .iter()
        .map(|at| at.saturating_duration_since(origin).as_secs())
        .collect()
}

#[async_trait]
impl ActionsApi for ScriptedApi {
    async fn dispatch_workflow(&self, _target: &WorkflowTarget, request: &TriggerRequest) -> Result<(), ApiError> {
        if let Some(status) = self.dispatch_failure {
            return Err(ApiError::Status {
                status,
                body: r#"{"message":"Workflow does not have 'workflow_dispatch' trigger"}"#.into(),
            });
        }
        self.dispatched.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn list_dispatch_runs(&self, _target: &WorkflowTarget, _per_page: u8) -> Result<WorkflowRunsPage, ApiError> {
        self.list_calls.lock().unwrap().push(Instant::now());
        let next = self.list_script.lock().unwrap().pop_front();
        match next {
            Some(Some(workflow_runs)) => Ok(WorkflowRunsPage {
                total_count: workflow_runs.len() as u64,
                workflow_runs,
            }),
            Some(None) => Err(unavailable()),
            None => Ok(WorkflowRunsPage {
                total_count: self.default_runs.len() as u64,
                workflow_runs: self.default_runs.clone(),
            }),
        }
    }

    async fn get_run(&self, _target: &WorkflowTarget, _run_id: i64) -> Result<RunSummary, ApiError> {
        self.get_calls.lock().unwrap().push(Instant::now());
        let next = self.run_script.lock().unwrap().pop_front();
        match next {
            Some(Some(run)) => {
                *self.last_run.lock().unwrap() = Some(run.clone());
                Ok(run)
            }
            Some(None) => Err(unavailable()),
            None => self.last_run.lock().unwrap().clone().ok_or_else(unavailable),
        }
    }
}
