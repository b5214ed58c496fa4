//! Shared type definitions for the relay workspace.
//!
//! The API client, the engine, and the binary all exchange these types. The
//! run models mirror the GitHub Actions REST payloads closely enough to be
//! deserialized directly, while the trigger models describe what a single
//! invocation sends to the platform.

pub mod run;
pub mod trigger;

pub use run::{RunConclusion, RunOutcome, RunStatus, RunSummary, WorkflowRunsPage};
pub use trigger::{CorrelationToken, TriggerRequest, WorkflowTarget};
