//! Rate limiting for console feedback.
//!
//! Polling loops run for minutes; these gates keep their output to a few
//! lines so downstream log consumers are not flooded.

use std::time::Duration;

use relay_types::RunStatus;
use tokio::time::Instant;

/// Minimum gap between "still searching" lines and between transient error
/// notices.
pub const NOTICE_INTERVAL: Duration = Duration::from_secs(10);
/// Minimum gap between progress lines while a run's status is unchanged.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Gate that opens at most once per `interval`, measured from the last time
/// it opened (or from creation).
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last: Instant,
}

impl RateLimiter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self { interval, last: now }
    }

    /// Returns true and restarts the window when more than `interval` has
    /// passed since the gate last opened.
    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) > self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Why a progress line is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// The observed status differs from the previous observation.
    StatusChanged,
    /// Same status, but the heartbeat interval elapsed.
    Heartbeat,
}

/// Emits once per status change, otherwise at most once per heartbeat.
#[derive(Debug, Clone)]
pub struct StatusProgress {
    last_status: Option<RunStatus>,
    heartbeat: RateLimiter,
}

impl StatusProgress {
    pub fn new(heartbeat: Duration, now: Instant) -> Self {
        Self {
            last_status: None,
            heartbeat: RateLimiter::new(heartbeat, now),
        }
    }

    pub fn last_status(&self) -> Option<&RunStatus> {
        self.last_status.as_ref()
    }

    pub fn observe(&mut self, status: &RunStatus, now: Instant) -> Option<ProgressUpdate> {
        if self.last_status.as_ref() != Some(status) {
            self.last_status = Some(status.clone());
            self.heartbeat = RateLimiter::new(self.heartbeat.interval, now);
            return Some(ProgressUpdate::StatusChanged);
        }
        self.heartbeat.ready(now).then_some(ProgressUpdate::Heartbeat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_opens_only_after_interval() {
        let start = Instant::now();
        let mut gate = RateLimiter::new(Duration::from_secs(10), start);
        assert!(!gate.ready(start + Duration::from_secs(5)));
        assert!(!gate.ready(start + Duration::from_secs(10)));
        assert!(gate.ready(start + Duration::from_secs(11)));
        assert!(!gate.ready(start + Duration::from_secs(15)));
        assert!(gate.ready(start + Duration::from_secs(22)));
    }

    #[test]
    fn status_change_always_emits() {
        let start = Instant::now();
        let mut progress = StatusProgress::new(HEARTBEAT_INTERVAL, start);
        assert_eq!(
            progress.observe(&RunStatus::Queued, start),
            Some(ProgressUpdate::StatusChanged)
        );
        assert_eq!(
            progress.observe(&RunStatus::InProgress, start + Duration::from_secs(1)),
            Some(ProgressUpdate::StatusChanged)
        );
        assert_eq!(progress.last_status(), Some(&RunStatus::InProgress));
    }

    #[test]
    fn unchanged_status_emits_at_most_every_heartbeat() {
        let start = Instant::now();
        let mut progress = StatusProgress::new(HEARTBEAT_INTERVAL, start);
        progress.observe(&RunStatus::InProgress, start);

        let emitted: Vec<u64> = (1..=95)
            .filter(|second| {
                progress
                    .observe(&RunStatus::InProgress, start + Duration::from_secs(*second))
                    .is_some()
            })
            .collect();
        assert_eq!(emitted, vec![31, 62, 93]);
    }
}
