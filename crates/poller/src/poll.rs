//! The `poll` command: sampler, cadence loop and session lifecycle.

use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tsm_core::config::TsmConfig;
use tsm_core::record::format_record;
use tsm_core::{PollPlan, SampleInterval, Snapshot};

use crate::cache::ScanCache;
use crate::cadence::{CadenceState, CadenceStats, Outcome};
use crate::clock::{self, Clock};
use crate::error::PollError;
use crate::identify::identify;
use crate::sampler::Sampler;
use crate::session::{DeviceSession, SessionTarget};

/// Identifies the device, then polls it until `stop` fires.
///
/// Records go to `out`, one line per emitted cycle.
pub async fn run_poll<S, W>(
    session: Arc<S>,
    target: &SessionTarget,
    cfg: &TsmConfig,
    interval: SampleInterval,
    clock: Arc<dyn Clock>,
    stop: CancellationToken,
    out: &mut W,
) -> Result<CadenceStats, PollError>
where
    S: DeviceSession,
    W: Write,
{
    info!(host = %target, "running poll command");
    let profile = identify(session.as_ref(), target, cfg).await?;
    let plan = PollPlan::new(interval, cfg.general.clone(), profile)?;
    info!(interval_secs = interval.as_secs(), "polling interval");
    poll_session(session, target, &plan, clock, stop, out).await
}

/// Connects, runs the sampler and cadence loop, then tears both down.
///
/// The sampler has stopped and the session is closed by the time this
/// returns, whether the loop ended on `stop` or on an error.
pub async fn poll_session<S, W>(
    session: Arc<S>,
    target: &SessionTarget,
    plan: &PollPlan,
    clock: Arc<dyn Clock>,
    stop: CancellationToken,
    out: &mut W,
) -> Result<CadenceStats, PollError>
where
    S: DeviceSession,
    W: Write,
{
    session.connect(target).await.map_err(PollError::Connect)?;

    let cache = Arc::new(ScanCache::new());
    let sampler = Sampler::new(
        Arc::clone(&session),
        Arc::clone(&cache),
        plan.all_oids().to_vec(),
        plan.interval.sampler_period(),
    )
    .spawn(stop.child_token());
    let sampler = match sampler {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "could not start internal polling loop");
            session.close().await;
            return Err(e);
        }
    };
    info!(
        period_ms = plan.interval.sampler_period().as_millis() as u64,
        "internal polling loop spawned"
    );

    let result = cadence_loop(plan, &cache, clock.as_ref(), &stop, out).await;

    let sampler_stats = sampler.shutdown().await;
    session.close().await;

    let stats = result?;
    let sampler_stats = sampler_stats?;
    info!(
        emitted = stats.emitted,
        repeated = stats.repeated,
        skipped = stats.skipped,
        published = sampler_stats.published,
        failed = sampler_stats.failed,
        "poll exiting"
    );
    Ok(stats)
}

/// Waits for each target time, classifies the cached scan and writes records.
///
/// Returns when `stop` fires.
pub async fn cadence_loop<W: Write>(
    plan: &PollPlan,
    cache: &ScanCache,
    clock: &dyn Clock,
    stop: &CancellationToken,
    out: &mut W,
) -> Result<CadenceStats, PollError> {
    let mut state = CadenceState::new(plan.interval, clock.now());
    let mut stats = CadenceStats::default();

    loop {
        let target = state.target();
        debug!(%target, "next target time");

        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                debug!("got done signal");
                break;
            }
            _ = clock::sleep_until(clock, target) => {}
        }

        let cycle = state.on_wake(cache.take());
        stats.record(&cycle.outcome);

        if let Outcome::Emit { snapshot, fresh_run, .. } = &cycle.outcome {
            if *fresh_run {
                info!("initial scan received");
                log_device_info(plan, snapshot);
            }
            writeln!(out, "{}", format_record(plan, cycle.target, snapshot))?;
            out.flush()?;
        }
    }

    Ok(stats)
}

fn log_device_info(plan: &PollPlan, snapshot: &Snapshot) {
    info!(
        model = %plan.profile.model,
        model_group = %plan.profile.model_group,
        "device"
    );
    for chan in plan.static_channels() {
        info!("{}: {}", chan.label, snapshot.raw(&chan.oid));
    }
}
