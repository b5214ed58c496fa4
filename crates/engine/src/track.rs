//! Completion tracking for a resolved run.
//!
//! The tracker owns a [`TrackerState`] for the duration of one wait loop and
//! polls the run until the platform reports `completed`. There is no
//! deadline of its own; the caller's job timeout bounds it in practice.
//!
//! Polling adapts to what the run is doing: while it sits in a queue the
//! interval is floored at [`QUEUED_POLL_FLOOR`], and once it executes the
//! configured interval applies again.

use std::time::Duration;

use relay_api::ActionsApi;
use relay_types::{RunOutcome, RunStatus, WorkflowTarget};
use relay_util::{OutputSink, RelayConfig};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::progress::{HEARTBEAT_INTERVAL, NOTICE_INTERVAL, ProgressUpdate, RateLimiter, StatusProgress};
use crate::relay::CONCLUSION_OUTPUT;

/// Minimum poll interval while the run is queued.
pub const QUEUED_POLL_FLOOR: Duration = Duration::from_secs(30);

/// Policy for one wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSettings {
    /// Configured poll interval, used as-is while the run executes.
    pub poll_interval: Duration,
    /// Turn a non-success conclusion into an error.
    pub propagate_failure: bool,
}

impl TrackSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            poll_interval: config.wait_interval,
            propagate_failure: config.propagate_failure,
        }
    }
}

/// Mutable state of one wait loop. Discarded when the loop ends.
#[derive(Debug)]
pub struct TrackerState {
    pub poll_interval: Duration,
    pub started: Instant,
    progress: StatusProgress,
    error_notice: RateLimiter,
}

impl TrackerState {
    pub fn new(settings: &TrackSettings, started: Instant) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            started,
            progress: StatusProgress::new(HEARTBEAT_INTERVAL, started),
            error_notice: RateLimiter::new(NOTICE_INTERVAL, started),
        }
    }
}

/// Interval to use after observing `status`.
///
/// Queued-like statuses floor the configured interval at
/// [`QUEUED_POLL_FLOOR`]; `in_progress` restores the configured interval;
/// any other status keeps the current one.
pub fn next_poll_interval(status: &RunStatus, current: Duration, configured: Duration) -> Duration {
    if status.is_queued() {
        configured.max(QUEUED_POLL_FLOOR)
    } else if matches!(status, RunStatus::InProgress) {
        configured
    } else {
        current
    }
}

/// Poll run `run_id` until it completes.
///
/// Writes the `conclusion` output once the run is terminal. A non-success
/// conclusion is an error only when `settings.propagate_failure` is set.
/// Lookup failures are retried indefinitely without touching the interval.
pub async fn track_run(
    api: &dyn ActionsApi,
    target: &WorkflowTarget,
    run_id: i64,
    settings: &TrackSettings,
    outputs: &mut dyn OutputSink,
    cancel: &CancellationToken,
) -> Result<RunOutcome, RelayError> {
    let mut state = TrackerState::new(settings, Instant::now());
    info!(run_id, "waiting for workflow completion");

    loop {
        if cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            _ = sleep(state.poll_interval) => {}
        }

        let run = match api.get_run(target, run_id).await {
            Ok(run) => run,
            Err(error) => {
                if state.error_notice.ready(Instant::now()) {
                    warn!(run_id, error = %error, timed_out = error.is_timeout(), "error fetching status (retrying)");
                } else {
                    debug!(run_id, error = %error, "status lookup failed");
                }
                continue;
            }
        };

        let elapsed_s = state.started.elapsed().as_secs();
        if run.status.is_terminal() {
            outputs.set_output(CONCLUSION_OUTPUT, run.conclusion_label());
            let outcome = RunOutcome {
                run_id,
                conclusion: run.conclusion.clone(),
            };
            if outcome.succeeded() {
                info!(run_id, elapsed_s, "completed successfully");
            } else {
                warn!(run_id, elapsed_s, conclusion = run.conclusion_label(), "run finished without success");
                if settings.propagate_failure {
                    return Err(RelayError::RunFailed {
                        conclusion: run.conclusion_label().to_string(),
                    });
                }
            }
            return Ok(outcome);
        }

        match state.progress.observe(&run.status, Instant::now()) {
            Some(ProgressUpdate::StatusChanged) => {
                info!(run_id, status = run.status.progress_label(), elapsed_s, "status changed");
            }
            Some(ProgressUpdate::Heartbeat) => {
                info!(run_id, status = run.status.progress_label(), elapsed_s, "still waiting");
            }
            None => {}
        }

        state.poll_interval = next_poll_interval(&run.status, state.poll_interval, settings.poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use relay_types::RunConclusion;
    use relay_util::MemoryOutputs;

    use super::*;
    use crate::testing::{ScriptedApi, run_state, target};

    fn settings(propagate_failure: bool) -> TrackSettings {
        TrackSettings {
            poll_interval: Duration::from_secs(10),
            propagate_failure,
        }
    }

    #[test]
    fn queued_statuses_floor_the_interval() {
        let configured = Duration::from_secs(10);
        for status in [RunStatus::Queued, RunStatus::Waiting, RunStatus::Pending, RunStatus::Requested] {
            assert_eq!(next_poll_interval(&status, configured, configured), QUEUED_POLL_FLOOR);
        }
        let slow = Duration::from_secs(45);
        assert_eq!(next_poll_interval(&RunStatus::Queued, slow, slow), slow);
    }

    #[test]
    fn in_progress_restores_configured_and_unknown_keeps_current() {
        let configured = Duration::from_secs(10);
        assert_eq!(
            next_poll_interval(&RunStatus::InProgress, QUEUED_POLL_FLOOR, configured),
            configured
        );
        assert_eq!(
            next_poll_interval(&RunStatus::Other("paused".into()), QUEUED_POLL_FLOOR, configured),
            QUEUED_POLL_FLOOR
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queued_then_running_then_success() {
        let api = ScriptedApi::new()
            .with_run(run_state(7, RunStatus::Queued, None))
            .with_run(run_state(7, RunStatus::InProgress, None))
            .with_run(run_state(7, RunStatus::Completed, Some(RunConclusion::Success)));
        let mut outputs = MemoryOutputs::new();
        let origin = Instant::now();

        let outcome = track_run(&api, &target(), 7, &settings(true), &mut outputs, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outputs.get(CONCLUSION_OUTPUT), Some("success"));
        assert_eq!(api.get_call_offsets(origin), vec![10, 40, 50]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_when_propagating() {
        let api = ScriptedApi::new().with_run(run_state(7, RunStatus::Completed, Some(RunConclusion::Failure)));
        let mut outputs = MemoryOutputs::new();

        let error = track_run(&api, &target(), 7, &settings(true), &mut outputs, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, RelayError::RunFailed { ref conclusion } if conclusion == "failure"));
        assert_eq!(outputs.get(CONCLUSION_OUTPUT), Some("failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_recorded_but_not_raised_without_propagation() {
        let api = ScriptedApi::new().with_run(run_state(7, RunStatus::Completed, Some(RunConclusion::Failure)));
        let mut outputs = MemoryOutputs::new();

        let outcome = track_run(&api, &target(), 7, &settings(false), &mut outputs, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.succeeded());
        assert_eq!(outcome.conclusion, Some(RunConclusion::Failure));
        assert_eq!(outputs.get(CONCLUSION_OUTPUT), Some("failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_keep_the_current_interval() {
        let api = ScriptedApi::new()
            .with_run(run_state(7, RunStatus::Queued, None))
            .with_run_error()
            .with_run_error()
            .with_run(run_state(7, RunStatus::Completed, Some(RunConclusion::Success)));
        let mut outputs = MemoryOutputs::new();
        let origin = Instant::now();

        track_run(&api, &target(), 7, &settings(true), &mut outputs, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(api.get_call_offsets(origin), vec![10, 40, 70, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_without_conclusion_counts_as_failure() {
        let api = ScriptedApi::new().with_run(run_state(7, RunStatus::Completed, None));
        let mut outputs = MemoryOutputs::new();

        let error = track_run(&api, &target(), 7, &settings(true), &mut outputs, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, RelayError::RunFailed { ref conclusion } if conclusion.is_empty()));
        assert_eq!(outputs.get(CONCLUSION_OUTPUT), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let api = ScriptedApi::new().with_run(run_state(7, RunStatus::InProgress, None));
        let mut outputs = MemoryOutputs::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(25)).await;
            trigger.cancel();
        });

        let error = track_run(&api, &target(), 7, &settings(true), &mut outputs, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(error, RelayError::Cancelled));
        assert!(outputs.get(CONCLUSION_OUTPUT).is_none());
    }
}
