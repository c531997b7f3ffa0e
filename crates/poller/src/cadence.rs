//! Drift classification and the per-cycle emission policy.
//!
//! [`CadenceState`] is the pure half of the cadence loop: given what the scan
//! cache held when target time `T` arrived, it decides whether to emit, repeat
//! or skip, and where the next target lies. The loop in [`crate::poll`] does
//! the waiting and writing.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, warn};
use tsm_core::{round_to, SampleInterval, Snapshot};

/// Where a snapshot falls relative to its target time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// Within half an interval of the target, both bounds inclusive.
    OnTime,
    /// More than half an interval after the target: the loop fell behind.
    FarFuture,
    /// More than half an interval before the target: data for another cycle.
    TooEarly,
}

/// Classifies `offset = snapshot.timestamp - target`.
pub fn classify(offset: TimeDelta, interval: SampleInterval) -> Drift {
    let half = interval.half_step();
    if offset > half {
        Drift::FarFuture
    } else if offset < -half {
        Drift::TooEarly
    } else {
        Drift::OnTime
    }
}

/// Why a cycle produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The cache was empty.
    Missing,
    /// The snapshot was far in the future; the target was re-anchored.
    Reanchored,
    /// The snapshot was too early and nothing could be repeated.
    Gap,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Write a record for this cycle.
    Emit {
        /// Data to format.
        snapshot: Snapshot,
        /// The previous cycle's snapshot reused to bridge a gap.
        repeated: bool,
        /// First record after start or after a gap.
        fresh_run: bool,
    },
    /// No record this cycle.
    Skip(SkipReason),
}

/// One evaluated cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    /// Target time this cycle was evaluated for.
    pub target: DateTime<Utc>,
    /// What to do.
    pub outcome: Outcome,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceStats {
    /// Records written, repeats included.
    pub emitted: u64,
    /// Records that reused the previous snapshot.
    pub repeated: u64,
    /// Cycles with no record.
    pub skipped: u64,
}

impl CadenceStats {
    /// Accounts for one cycle.
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Emit { repeated, .. } => {
                self.emitted += 1;
                if *repeated {
                    self.repeated += 1;
                }
            }
            Outcome::Skip(_) => self.skipped += 1,
        }
    }
}

/// Loop state carried from one target time to the next.
#[derive(Debug, Clone)]
pub struct CadenceState {
    interval: SampleInterval,
    target: DateTime<Utc>,
    previous: Option<Snapshot>,
    first_not_logged: bool,
    last_missing: bool,
    last_repeated: bool,
}

impl CadenceState {
    /// First target is `round(now, interval) + interval`.
    pub fn new(interval: SampleInterval, now: DateTime<Utc>) -> Self {
        Self {
            interval,
            target: round_to(now, interval.duration()) + interval.step(),
            previous: None,
            first_not_logged: true,
            last_missing: false,
            last_repeated: false,
        }
    }

    /// Target time of the next cycle.
    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    /// Whether the last cycle reused the previous snapshot.
    pub fn last_repeated(&self) -> bool {
        self.last_repeated
    }

    #[cfg(test)]
    fn last_missing(&self) -> bool {
        self.last_missing
    }

    /// Evaluates the cycle for the current target and advances the target.
    pub fn on_wake(&mut self, scan: Option<Snapshot>) -> Cycle {
        let target = self.target;
        self.target = target + self.interval.step();

        let Some(snapshot) = scan else {
            if !self.last_missing {
                error!(%target, "no scan available");
            }
            self.last_missing = true;
            self.first_not_logged = true;
            self.previous = None;
            return Cycle {
                target,
                outcome: Outcome::Skip(SkipReason::Missing),
            };
        };
        self.last_missing = false;

        let outcome = match classify(snapshot.timestamp - target, self.interval) {
            Drift::FarFuture => {
                warn!(
                    scan_time = %snapshot.timestamp,
                    %target,
                    "scan from more than half an interval in the future, re-anchoring and creating a gap"
                );
                self.target = round_to(snapshot.timestamp, self.interval.duration());
                self.first_not_logged = true;
                Outcome::Skip(SkipReason::Reanchored)
            }
            Drift::TooEarly => {
                error!(
                    scan_time = %snapshot.timestamp,
                    %target,
                    "missing scan: no scan within half an interval of target"
                );
                match self.previous.clone() {
                    Some(prev) if !self.last_repeated => {
                        warn!("repeating previous scan");
                        self.last_repeated = true;
                        Outcome::Emit {
                            snapshot: prev,
                            repeated: true,
                            fresh_run: false,
                        }
                    }
                    _ => {
                        self.first_not_logged = true;
                        Outcome::Skip(SkipReason::Gap)
                    }
                }
            }
            Drift::OnTime => {
                self.last_repeated = false;
                let fresh_run = std::mem::replace(&mut self.first_not_logged, false);
                self.previous = Some(snapshot.clone());
                Outcome::Emit {
                    snapshot,
                    repeated: false,
                    fresh_run,
                }
            }
        };

        Cycle { target, outcome }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn interval(secs: u64) -> SampleInterval {
        SampleInterval::from_secs(secs).unwrap()
    }

    fn snap_at(ts: DateTime<Utc>, v: &str) -> Snapshot {
        Snapshot::new(ts, BTreeMap::from([("A".to_string(), v.to_string())]))
    }

    #[test]
    fn first_target_is_rounded_now_plus_interval() {
        let s = CadenceState::new(interval(10), base() + TimeDelta::milliseconds(4_900));
        assert_eq!(s.target(), base() + TimeDelta::seconds(10));
        let s = CadenceState::new(interval(10), base() + TimeDelta::milliseconds(5_000));
        assert_eq!(s.target(), base() + TimeDelta::seconds(20));
    }

    #[test]
    fn classify_boundaries_are_on_time() {
        let i = interval(2);
        let one_ms = TimeDelta::milliseconds(1);
        let half = TimeDelta::seconds(1);
        assert_eq!(classify(TimeDelta::zero(), i), Drift::OnTime);
        assert_eq!(classify(half, i), Drift::OnTime);
        assert_eq!(classify(half + one_ms, i), Drift::FarFuture);
        assert_eq!(classify(-half, i), Drift::OnTime);
        assert_eq!(classify(-half - one_ms, i), Drift::TooEarly);
    }

    #[test]
    fn classify_odd_interval_half() {
        let i = interval(3);
        assert_eq!(classify(TimeDelta::milliseconds(1_500), i), Drift::OnTime);
        assert_eq!(classify(TimeDelta::milliseconds(1_501), i), Drift::FarFuture);
        assert_eq!(classify(TimeDelta::milliseconds(-1_501), i), Drift::TooEarly);
    }

    #[test]
    fn on_time_emits_and_marks_fresh_run_once() {
        let mut s = CadenceState::new(interval(2), base());
        let t1 = s.target();

        let c1 = s.on_wake(Some(snap_at(t1, "1")));
        assert_eq!(c1.target, t1);
        assert!(matches!(c1.outcome, Outcome::Emit { fresh_run: true, repeated: false, .. }));

        let t2 = s.target();
        assert_eq!(t2, t1 + TimeDelta::seconds(2));
        let c2 = s.on_wake(Some(snap_at(t2 - TimeDelta::milliseconds(300), "2")));
        assert!(matches!(c2.outcome, Outcome::Emit { fresh_run: false, repeated: false, .. }));
    }

    #[test]
    fn repeat_at_most_once() {
        let mut s = CadenceState::new(interval(2), base());
        let t1 = s.target();
        s.on_wake(Some(snap_at(t1, "good")));

        // Stale snapshots: timestamps well before each target.
        let t2 = s.target();
        let c2 = s.on_wake(Some(snap_at(t2 - TimeDelta::seconds(3), "stale")));
        assert_eq!(c2.target, t2);
        match c2.outcome {
            Outcome::Emit { snapshot, repeated, .. } => {
                assert!(repeated);
                assert_eq!(snapshot.values["A"], "good");
            }
            other => panic!("expected repeat, got {other:?}"),
        }
        assert!(s.last_repeated());

        let t3 = s.target();
        let c3 = s.on_wake(Some(snap_at(t3 - TimeDelta::seconds(3), "stale")));
        assert_eq!(c3.outcome, Outcome::Skip(SkipReason::Gap));

        // Recovery is treated as a fresh run and clears the repeat flag.
        let t4 = s.target();
        let c4 = s.on_wake(Some(snap_at(t4, "back")));
        assert!(matches!(c4.outcome, Outcome::Emit { fresh_run: true, repeated: false, .. }));
        assert!(!s.last_repeated());
    }

    #[test]
    fn too_early_without_previous_is_a_gap() {
        let mut s = CadenceState::new(interval(5), base());
        let t1 = s.target();
        let c = s.on_wake(Some(snap_at(t1 - TimeDelta::seconds(4), "x")));
        assert_eq!(c.outcome, Outcome::Skip(SkipReason::Gap));
    }

    #[test]
    fn far_future_reanchors_to_rounded_scan_time() {
        let mut s = CadenceState::new(interval(2), base());
        let t1 = s.target();
        let scan_time = t1 + TimeDelta::milliseconds(5_300);
        let c = s.on_wake(Some(snap_at(scan_time, "late")));
        assert_eq!(c.outcome, Outcome::Skip(SkipReason::Reanchored));
        assert_eq!(s.target(), round_to(scan_time, interval(2).duration()));
        assert_ne!(s.target(), t1 + TimeDelta::seconds(2));
        assert_eq!(s.target(), t1 + TimeDelta::seconds(6));

        // Next on-time scan starts a fresh run.
        let t = s.target();
        let c = s.on_wake(Some(snap_at(t, "ok")));
        assert!(matches!(c.outcome, Outcome::Emit { fresh_run: true, .. }));
    }

    #[test]
    fn missing_scan_resets_previous_and_run() {
        let mut s = CadenceState::new(interval(2), base());
        let t1 = s.target();
        s.on_wake(Some(snap_at(t1, "good")));

        let c = s.on_wake(None);
        assert_eq!(c.outcome, Outcome::Skip(SkipReason::Missing));
        assert!(s.last_missing());
        s.on_wake(None);
        assert!(s.last_missing());

        // Nothing left to repeat after a missing cycle.
        let t = s.target();
        let c = s.on_wake(Some(snap_at(t - TimeDelta::seconds(5), "stale")));
        assert_eq!(c.outcome, Outcome::Skip(SkipReason::Gap));
        assert!(!s.last_missing());

        let t = s.target();
        let c = s.on_wake(Some(snap_at(t, "ok")));
        assert!(matches!(c.outcome, Outcome::Emit { fresh_run: true, .. }));
    }

    #[test]
    fn targets_strictly_increase() {
        let mut s = CadenceState::new(interval(1), base());
        let mut last = s.target();
        for i in 0..20 {
            let t = s.target();
            let scan = match i % 4 {
                0 => None,
                1 => Some(snap_at(t, "a")),
                2 => Some(snap_at(t + TimeDelta::milliseconds(2_700), "b")),
                _ => Some(snap_at(t - TimeDelta::seconds(2), "c")),
            };
            s.on_wake(scan);
            assert!(s.target() > last);
            last = s.target();
        }
    }

    #[test]
    fn stats_count_outcomes() {
        let mut stats = CadenceStats::default();
        stats.record(&Outcome::Emit {
            snapshot: snap_at(base(), "a"),
            repeated: true,
            fresh_run: false,
        });
        stats.record(&Outcome::Skip(SkipReason::Missing));
        assert_eq!(
            stats,
            CadenceStats {
                emitted: 1,
                repeated: 1,
                skipped: 1
            }
        );
    }
}
