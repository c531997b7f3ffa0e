//! The `status` command: the device's current state, once or refreshed live.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tsm_core::channel::ChannelInfo;
use tsm_core::config::TsmConfig;
use tsm_core::{DeviceProfile, Snapshot};

use crate::error::PollError;
use crate::identify::identify;
use crate::session::{DeviceSession, SessionTarget};

/// How often `status --watch` re-reads the device.
pub const STATUS_REFRESH: Duration = Duration::from_secs(1);

/// Current device state, ready for printing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusReport {
    /// Device address.
    pub host: String,
    /// Model name.
    pub model: String,
    /// Model group.
    pub model_group: String,
    /// Answer time.
    pub timestamp: DateTime<Utc>,
    /// Identity channels.
    pub static_channels: Vec<StatusLine>,
    /// Polled channels.
    pub data_channels: Vec<StatusLine>,
}

/// One rendered channel.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusLine {
    /// Human label.
    pub label: String,
    /// Record code.
    pub chancode: String,
    /// Rendered value.
    pub value: String,
    /// Units.
    pub units: String,
}

impl StatusLine {
    fn render(chan: &ChannelInfo, snapshot: &Snapshot) -> Self {
        Self {
            label: chan.label.clone(),
            chancode: chan.chancode.clone(),
            value: chan.value_string(snapshot.raw(&chan.oid)),
            units: chan.units.clone(),
        }
    }
}

impl StatusReport {
    fn build(target: &SessionTarget, profile: &DeviceProfile, snapshot: &Snapshot) -> Self {
        let lines = |chans: &[ChannelInfo]| {
            chans
                .iter()
                .map(|c| StatusLine::render(c, snapshot))
                .collect()
        };
        Self {
            host: target.to_string(),
            model: profile.model.clone(),
            model_group: profile.model_group.clone(),
            timestamp: snapshot.timestamp,
            static_channels: lines(&profile.static_channels),
            data_channels: lines(&profile.data_channels),
        }
    }
}

fn all_oids(profile: &DeviceProfile) -> Vec<String> {
    let mut oids = profile.static_oids();
    oids.extend(profile.data_oids());
    oids
}

/// Identifies the device and reads every channel once.
pub async fn query_status<S: DeviceSession>(
    session: &S,
    target: &SessionTarget,
    cfg: &TsmConfig,
) -> Result<StatusReport, PollError> {
    let profile = identify(session, target, cfg).await?;

    session.connect(target).await.map_err(PollError::Connect)?;
    let snapshot = session.query(&all_oids(&profile)).await;
    session.close().await;
    let snapshot = snapshot.map_err(PollError::Query)?;

    Ok(StatusReport::build(target, &profile, &snapshot))
}

/// Identifies the device, then re-reads every channel each `refresh` and
/// writes a fresh report until `stop` is cancelled.
///
/// One session stays open for the whole watch and is closed on the way out.
/// Failed reads are logged and skipped. Returns the number of reports written.
pub async fn watch_status<S: DeviceSession, W: Write>(
    session: &S,
    target: &SessionTarget,
    cfg: &TsmConfig,
    json: bool,
    refresh: Duration,
    stop: CancellationToken,
    out: &mut W,
) -> Result<u64, PollError> {
    let profile = identify(session, target, cfg).await?;
    let oids = all_oids(&profile);

    session.connect(target).await.map_err(PollError::Connect)?;
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut written: u64 = 0;

    let result = loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                debug!(reports = written, "status watch stopped");
                break Ok(written);
            }
            _ = ticker.tick() => {}
        }

        match session.query(&oids).await {
            Ok(snapshot) => {
                let report = StatusReport::build(target, &profile, &snapshot);
                if let Err(e) = redraw(&report, json, written == 0, out) {
                    break Err(e);
                }
                written += 1;
            }
            Err(e) => warn!(error = %e, "status query failed"),
        }
    };

    session.close().await;
    result
}

fn redraw<W: Write>(report: &StatusReport, json: bool, first: bool, out: &mut W) -> Result<(), PollError> {
    if !first && !json {
        writeln!(out)?;
    }
    write_report(report, json, out)?;
    out.flush()?;
    Ok(())
}

/// Writes a report as `label: value units` text or pretty JSON.
pub fn write_report<W: Write>(report: &StatusReport, json: bool, out: &mut W) -> Result<(), PollError> {
    if json {
        serde_json::to_writer_pretty(&mut *out, report).map_err(std::io::Error::from)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{} ({} / {})", report.host, report.model, report.model_group)?;
    writeln!(out, "{}", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
    let width = report
        .static_channels
        .iter()
        .chain(&report.data_channels)
        .map(|l| l.label.len() + 1)
        .max()
        .unwrap_or(0);
    for line in report.static_channels.iter().chain(&report.data_channels) {
        let key = format!("{}:", line.label);
        let row = format!("{key:<width$} {} {}", line.value, line.units);
        writeln!(out, "{}", row.trim_end())?;
    }
    Ok(())
}
