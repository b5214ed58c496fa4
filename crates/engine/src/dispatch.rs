//! Workflow dispatch.

use chrono::{DateTime, SubsecRound, Utc};
use relay_api::ActionsApi;
use relay_types::{CorrelationToken, TriggerRequest, WorkflowTarget};
use relay_util::redact_payload;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{error, info};

use crate::error::RelayError;
use crate::resolve::DispatchRecord;

/// Send one `workflow_dispatch` event for `target`.
///
/// The dispatch time is captured before the request leaves so that the
/// resolver never rejects a run created within the same second. A failure
/// here is fatal and never retried.
pub async fn dispatch_workflow<'a>(
    api: &dyn ActionsApi,
    target: &'a WorkflowTarget,
    request: &TriggerRequest,
    token: Option<&'a CorrelationToken>,
) -> Result<DispatchRecord<'a>, RelayError> {
    let dispatched_at: DateTime<Utc> = Utc::now().trunc_subsecs(0);
    let started = Instant::now();

    let logged_inputs = Value::Object(redact_payload(&request.inputs));
    info!(
        workflow = %target,
        inputs = %logged_inputs,
        correlation = token.map(CorrelationToken::as_str),
        "dispatching workflow"
    );

    if let Err(source) = api.dispatch_workflow(target, request).await {
        error!(workflow = %target, error = %source, "dispatch rejected");
        return Err(RelayError::Dispatch(source));
    }
    info!(workflow = %target, "workflow triggered");

    Ok(DispatchRecord {
        target,
        token,
        dispatched_at,
        started,
    })
}
