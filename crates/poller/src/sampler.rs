//! Background task that keeps the scan cache fresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::cache::ScanCache;
use crate::error::PollError;
use crate::session::DeviceSession;

/// Counters reported when the sampler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Snapshots written to the cache.
    pub published: u64,
    /// Queries that failed.
    pub failed: u64,
}

/// Queries the device every `period` and publishes into the cache.
pub struct Sampler<S> {
    session: Arc<S>,
    cache: Arc<ScanCache>,
    oids: Vec<String>,
    period: Duration,
}

/// A running sampler.
pub struct SamplerHandle {
    stop: CancellationToken,
    task: JoinHandle<SamplerStats>,
}

impl<S: DeviceSession> Sampler<S> {
    /// Configures a sampler; nothing runs until [`Sampler::spawn`].
    pub fn new(session: Arc<S>, cache: Arc<ScanCache>, oids: Vec<String>, period: Duration) -> Self {
        Self {
            session,
            cache,
            oids,
            period,
        }
    }

    /// Starts the background task. Fails if the session is not connected.
    ///
    /// The task runs until `stop` is cancelled.
    pub fn spawn(self, stop: CancellationToken) -> Result<SamplerHandle, PollError> {
        if !self.session.is_connected() {
            warn!("device session is not connected");
            return Err(PollError::SamplerStart("device session is not connected".into()));
        }
        if self.oids.is_empty() {
            return Err(PollError::SamplerStart("no identifiers to poll".into()));
        }
        if self.period.is_zero() {
            return Err(PollError::SamplerStart("zero sampling period".into()));
        }

        let task = tokio::spawn(self.run(stop.clone()));
        Ok(SamplerHandle { stop, task })
    }

    async fn run(self, stop: CancellationToken) -> SamplerStats {
        let mut stats = SamplerStats::default();

        // Ticks stay on a fixed grid from the anchor; slow queries are caught up
        // with back-to-back ticks instead of shifting the grid.
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    debug!("cancellation received, shutting down internal polling loop");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.session.query(&self.oids).await {
                Ok(snapshot) => {
                    self.cache.publish(snapshot);
                    stats.published += 1;
                }
                Err(e) => {
                    error!(error = %e, "scan query failed");
                    stats.failed += 1;
                }
            }
        }
        stats
    }
}

impl SamplerHandle {
    /// Cancels the task and waits for it to return.
    ///
    /// A query already in flight completes first; none starts afterwards.
    pub async fn shutdown(self) -> Result<SamplerStats, PollError> {
        self.stop.cancel();
        let stats = self.task.await?;
        debug!(published = stats.published, failed = stats.failed, "internal polling loop stopped");
        Ok(stats)
    }
}
