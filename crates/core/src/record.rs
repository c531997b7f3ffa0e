//! Line-oriented output records.

use std::fmt::Write;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::profile::PollPlan;
use crate::snapshot::Snapshot;

/// Formats one output line for the cycle whose target time is `at`.
///
/// Layout: `YYYY MM DD HH MM SS NET STA LOC SECS` followed by one
/// `code:value` pair per data channel, in configured order.
pub fn format_record(plan: &PollPlan, at: DateTime<Utc>, snapshot: &Snapshot) -> String {
    let mut out = format!(
        "{:04} {:02} {:02} {:02} {:02} {:02} {} {} {} {}",
        at.year(),
        at.month(),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        plan.station.net,
        plan.station.sta,
        plan.station.loc,
        plan.interval.as_secs(),
    );
    for chan in plan.data_channels() {
        let _ = write!(out, " {}:{}", chan.chancode, chan.value_string(snapshot.raw(&chan.oid)));
    }
    out
}
