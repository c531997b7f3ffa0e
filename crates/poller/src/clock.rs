//! Wall-clock sources for target times and snapshot timestamps.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Source of wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall time anchored to `tokio::time::Instant`.
///
/// Advances with tokio's clock, so it follows paused and auto-advanced test
/// time.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall: DateTime<Utc>,
    mono: tokio::time::Instant,
}

impl TokioClock {
    /// Anchors the current system time to tokio's current instant.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Anchors `wall` to tokio's current instant.
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            mono: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.mono.elapsed()).unwrap_or_default();
        self.wall + elapsed
    }
}

/// Time left until `at`, zero if it has passed.
pub fn until(clock: &dyn Clock, at: DateTime<Utc>) -> Duration {
    (at - clock.now()).to_std().unwrap_or(Duration::ZERO)
}

/// Sleeps until the clock reads `at`.
pub async fn sleep_until(clock: &dyn Clock, at: DateTime<Utc>) {
    tokio::time::sleep(until(clock, at)).await;
}
