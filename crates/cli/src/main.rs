use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use relay_api::GitHubClient;
use relay_engine::run_relay;
use relay_util::{FileOutputs, RelayConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Dispatch a GitHub Actions workflow, find the run it produced, and wait for
/// it to finish.
///
/// Inputs are read from the `INPUT_*` environment variables the Actions
/// runner provides; outputs go to the file named by `GITHUB_OUTPUT`.
#[derive(Debug, Parser)]
#[command(name = "relay", version, about)]
struct Cli {
    /// Track this existing run instead of resolving one. Read from INPUT_RUN_ID when omitted.
    #[arg(long, env = "INPUT_RUN_ID", value_name = "ID", value_parser = clap::value_parser!(i64).range(1..))]
    run_id: Option<i64>,

    /// Log filter directive, e.g. `debug` or `relay_engine=trace`. Defaults to RUST_LOG, then `info`.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = level
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = RelayConfig::from_env().context("invalid configuration")?;
    if cli.run_id.is_some() {
        config.run_id = cli.run_id;
    }
    info!(workflow = %config.target, "starting");

    let client = GitHubClient::new(&config.api_base_url, &config.github_token).context("failed to build API client")?;
    let mut outputs = FileOutputs::new(config.output_path.clone());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping");
            on_signal.cancel();
        }
    });

    let outcome = run_relay(&config, &client, &mut outputs, &cancel).await?;
    match outcome {
        Some(outcome) if !outcome.succeeded() => {
            info!(run_id = outcome.run_id, "run failed but failure propagation is disabled");
        }
        Some(outcome) => info!(run_id = outcome.run_id, "done"),
        None => info!("done"),
    }
    Ok(())
}
