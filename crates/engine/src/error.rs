use std::time::Duration;

use relay_api::ApiError;
use thiserror::Error;

/// Fatal outcome of an invocation phase.
///
/// Transient query errors during polling never become a `RelayError`; they
/// are logged and retried on the next tick.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The dispatch call itself failed. It is never retried.
    #[error("failed to trigger workflow: {0}")]
    Dispatch(#[source] ApiError),
    /// No run matched before the trigger deadline.
    #[error("timeout: workflow run did not appear within {timeout:?}")]
    ResolveTimeout { timeout: Duration },
    /// The tracked run completed without success and failures propagate.
    #[error("workflow failed with conclusion: {conclusion}")]
    RunFailed { conclusion: String },
    #[error("cancelled while waiting on the workflow run")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_names_configured_duration() {
        let error = RelayError::ResolveTimeout {
            timeout: Duration::from_secs(120),
        };
        assert_eq!(error.to_string(), "timeout: workflow run did not appear within 120s");
    }

    #[test]
    fn run_failure_names_conclusion() {
        let error = RelayError::RunFailed {
            conclusion: "failure".into(),
        };
        assert_eq!(error.to_string(), "workflow failed with conclusion: failure");
    }
}
