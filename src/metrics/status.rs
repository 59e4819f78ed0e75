use serde::Serialize;
use std::time::{Duration, Instant};

/// Periodic snapshot for the status display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Episode currently running, 1-based
    pub episode: usize,
    /// Reward accumulated in the current episode
    pub reward: f32,
    pub attempts: usize,
    pub successes: usize,
    pub elapsed: Duration,
    pub epsilon: f32,
    pub last_action: Option<&'static str>,
}

/// Fires at most once per fixed wall-clock interval.
#[derive(Debug, Clone)]
pub struct StatusTicker {
    interval: Duration,
    started: Instant,
    last_fired: Option<Instant>,
}

impl StatusTicker {
    pub fn new(interval: Duration) -> Self {
        StatusTicker {
            interval,
            started: Instant::now(),
            last_fired: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True when at least one interval has passed since the last firing
    /// (or since construction); the firing is then recorded.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> bool {
        let since = self.last_fired.unwrap_or(self.started);
        if now.saturating_duration_since(since) >= self.interval {
            self.last_fired = Some(now);
            true
        } else {
            false
        }
    }
}
