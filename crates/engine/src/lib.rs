//! # Relay Engine
//!
//! Drives one workflow invocation against the Actions API: send the
//! dispatch, find the run it produced, and wait for that run to finish.
//!
//! ## Architecture
//!
//! - **`dispatch`**: sends the dispatch event and records when it left
//! - **`resolve`**: polls recent runs with capped doubling backoff until one matches
//! - **`track`**: polls the resolved run with a queue-aware interval until completion
//! - **`progress`**: rate limits the console lines both loops emit
//! - **`relay`**: sequences the phases and writes outputs
//!
//! All waiting goes through `tokio::time`, so every loop can be driven with a
//! paused clock in tests.

pub mod dispatch;
pub mod error;
pub mod progress;
pub mod relay;
pub mod resolve;
pub mod track;

#[cfg(test)]
mod testing;

pub use dispatch::dispatch_workflow;
pub use error::RelayError;
pub use relay::{CONCLUSION_OUTPUT, DISTINCT_ID_OUTPUT, WORKFLOW_ID_OUTPUT, WORKFLOW_URL_OUTPUT, run_relay};
pub use resolve::{DispatchRecord, MAX_RETRY_INTERVAL, ResolveSettings, next_retry_interval, resolve_run, select_run};
pub use track::{QUEUED_POLL_FLOOR, TrackSettings, TrackerState, next_poll_interval, track_run};
