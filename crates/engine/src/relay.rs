//! One invocation, end to end: dispatch, resolve, track.
//!
//! Each phase can be switched off through configuration. Outputs are written
//! the moment their value is known, so a caller that aborts the wait still
//! has the run id.

use relay_api::ActionsApi;
use relay_types::{RunOutcome, TriggerRequest};
use relay_util::{OutputSink, RelayConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dispatch::dispatch_workflow;
use crate::error::RelayError;
use crate::resolve::{ResolveSettings, resolve_run};
use crate::track::{TrackSettings, track_run};

pub const DISTINCT_ID_OUTPUT: &str = "distinct_id";
pub const WORKFLOW_ID_OUTPUT: &str = "workflow_id";
pub const WORKFLOW_URL_OUTPUT: &str = "workflow_url";
pub const CONCLUSION_OUTPUT: &str = "conclusion";

/// Run every enabled phase for `config`.
///
/// Returns the tracked outcome, or `None` when waiting is disabled or no run
/// id is known. The first fatal error aborts the remaining phases.
pub async fn run_relay(
    config: &RelayConfig,
    api: &dyn ActionsApi,
    outputs: &mut dyn OutputSink,
    cancel: &CancellationToken,
) -> Result<Option<RunOutcome>, RelayError> {
    let run_id = if config.trigger_workflow {
        let token = config.correlation_token();
        if let Some(token) = token {
            outputs.set_output(DISTINCT_ID_OUTPUT, token.as_str());
        }
        let request = TriggerRequest::new(config.target.git_ref.clone(), config.inputs.clone());
        let record = dispatch_workflow(api, &config.target, &request, token).await?;
        let run_id = resolve_run(api, &record, &ResolveSettings::from_config(config), cancel).await?;
        Some(run_id)
    } else {
        info!("workflow dispatch disabled");
        config.run_id
    };

    let Some(run_id) = run_id else {
        info!("no run id to track");
        return Ok(None);
    };

    let url = config.target.run_url(&config.web_base_url, run_id);
    outputs.set_output(WORKFLOW_ID_OUTPUT, &run_id.to_string());
    outputs.set_output(WORKFLOW_URL_OUTPUT, &url);
    info!(run_id, url = %url, "workflow run resolved");

    if !config.wait_workflow {
        info!(run_id, "waiting disabled");
        return Ok(None);
    }

    let outcome = track_run(
        api,
        &config.target,
        run_id,
        &TrackSettings::from_config(config),
        outputs,
        cancel,
    )
    .await?;
    Ok(Some(outcome))
}
