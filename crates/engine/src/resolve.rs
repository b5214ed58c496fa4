//! Run resolution after an anonymous dispatch.
//!
//! The dispatch call returns no handle, so the resolver polls the list of
//! recent `workflow_dispatch` runs and picks the one this invocation caused.
//!
//! Two mutually exclusive policies decide the match:
//!
//! - **Correlation**: a token was injected into the inputs and the target
//!   workflow echoes it in its `run-name`. Only a run whose display title
//!   contains the token is accepted. There is no fallback to time matching;
//!   without an echo the resolver times out rather than guess.
//! - **Time-based**: the first run in the platform's order whose creation
//!   second is not earlier than the dispatch second is accepted. Concurrent
//!   dispatches against the same workflow and ref can both pick the same run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use relay_api::{ActionsApi, RUNS_PAGE_SIZE};
use relay_types::{CorrelationToken, RunSummary, WorkflowTarget};
use relay_util::RelayConfig;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::progress::{NOTICE_INTERVAL, RateLimiter};

/// Upper bound of the retry interval while searching.
pub const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Timing for one resolve phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSettings {
    /// First sleep before the first lookup.
    pub initial_interval: Duration,
    /// Deadline measured from the moment the dispatch was sent.
    pub timeout: Duration,
}

impl ResolveSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            initial_interval: config.wait_interval,
            timeout: config.trigger_timeout,
        }
    }
}

/// What the resolver needs to know about the dispatch it is chasing.
#[derive(Debug, Clone)]
pub struct DispatchRecord<'a> {
    pub target: &'a WorkflowTarget,
    pub token: Option<&'a CorrelationToken>,
    /// Wall-clock time recorded immediately before the dispatch was sent.
    pub dispatched_at: DateTime<Utc>,
    /// Monotonic time recorded at the same moment; the deadline counts from here.
    pub started: Instant,
}

/// Pick the run this dispatch produced from one page of recent runs.
///
/// Runs are scanned in the order given. A run qualifies when its creation
/// time, at whole-second precision, is not earlier than `dispatched_at`.
/// With a token, a qualifying run must also carry the token in its display
/// title; without one, the first qualifying run wins.
pub fn select_run(runs: &[RunSummary], dispatched_at: DateTime<Utc>, token: Option<&CorrelationToken>) -> Option<i64> {
    let dispatched_second = dispatched_at.timestamp();
    runs.iter()
        .filter(|run| {
            run.created_at
                .is_some_and(|created_at| created_at.timestamp() >= dispatched_second)
        })
        .find(|run| token.is_none_or(|token| token.appears_in(&run.display_title)))
        .map(|run| run.id)
}

/// Doubling backoff capped at [`MAX_RETRY_INTERVAL`].
pub fn next_retry_interval(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_RETRY_INTERVAL)
}

/// Poll until a run matching `record` shows up or the deadline passes.
///
/// Lookup failures are transient: they are logged at most once per
/// [`NOTICE_INTERVAL`] and the next tick retries. Only deadline exhaustion
/// (or cancellation) ends the search with an error.
pub async fn resolve_run(
    api: &dyn ActionsApi,
    record: &DispatchRecord<'_>,
    settings: &ResolveSettings,
    cancel: &CancellationToken,
) -> Result<i64, RelayError> {
    // A timeout too large to represent means the search never gives up.
    let deadline = record.started.checked_add(settings.timeout);
    let mut retry_interval = settings.initial_interval;
    let mut error_notice = RateLimiter::new(NOTICE_INTERVAL, record.started);
    let mut progress_notice = RateLimiter::new(NOTICE_INTERVAL, record.started);
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            _ = sleep(retry_interval) => {}
        }

        attempts += 1;
        match api.list_dispatch_runs(record.target, RUNS_PAGE_SIZE).await {
            Ok(page) => {
                if let Some(run_id) = select_run(&page.workflow_runs, record.dispatched_at, record.token) {
                    info!(run_id, attempts, "triggered run found");
                    return Ok(run_id);
                }
                debug!(attempts, candidates = page.workflow_runs.len(), "no matching run yet");
            }
            Err(error) => {
                if error_notice.ready(Instant::now()) {
                    warn!(error = %error, timed_out = error.is_timeout(), "error checking runs (retrying)");
                } else {
                    debug!(error = %error, "run lookup failed");
                }
            }
        }

        if progress_notice.ready(Instant::now()) {
            info!(elapsed_s = record.started.elapsed().as_secs(), "finding run");
        }

        retry_interval = next_retry_interval(retry_interval);
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!(attempts, timeout_s = settings.timeout.as_secs(), "no matching run before deadline");
            return Err(RelayError::ResolveTimeout {
                timeout: settings.timeout,
            });
        }
    }
}
