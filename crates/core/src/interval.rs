//! Sample interval validation.

use std::fmt;
use std::time::Duration;

use chrono::TimeDelta;

use crate::error::IntervalError;

/// Smallest accepted sample interval.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
/// Largest accepted sample interval.
pub const MAX_SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

/// Number of internal sampler ticks per sample interval.
pub const SAMPLER_TICKS_PER_INTERVAL: u32 = 3;

/// Cadence of emitted records, validated to lie in `[1s, 60s]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleInterval(Duration);

impl SampleInterval {
    /// Validates a duration.
    pub fn new(interval: Duration) -> Result<Self, IntervalError> {
        if interval < MIN_SAMPLE_INTERVAL || interval > MAX_SAMPLE_INTERVAL {
            return Err(out_of_range(interval.as_secs_f64()));
        }
        Ok(Self(interval))
    }

    /// Validates a whole number of seconds.
    pub fn from_secs(secs: u64) -> Result<Self, IntervalError> {
        Self::new(Duration::from_secs(secs))
    }

    /// Parses a decimal number of seconds as given on the command line.
    ///
    /// Fractional seconds are truncated after range checking.
    pub fn parse(raw: &str) -> Result<Self, IntervalError> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| IntervalError::NotANumber(raw.to_string()))?;
        if !value.is_finite()
            || value < MIN_SAMPLE_INTERVAL.as_secs_f64()
            || value > MAX_SAMPLE_INTERVAL.as_secs_f64()
        {
            return Err(out_of_range(value));
        }
        Self::from_secs(value.trunc() as u64)
    }

    /// The interval itself.
    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Whole seconds.
    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    /// Half an interval: the drift tolerance band.
    pub fn half(&self) -> Duration {
        self.0 / 2
    }

    /// The interval as a calendar time delta.
    pub fn step(&self) -> TimeDelta {
        delta(self.0)
    }

    /// Half an interval as a calendar time delta.
    pub fn half_step(&self) -> TimeDelta {
        delta(self.half())
    }

    /// Period of the background sampler.
    pub fn sampler_period(&self) -> Duration {
        self.0 / SAMPLER_TICKS_PER_INTERVAL
    }
}

impl fmt::Display for SampleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs())
    }
}

// Bounded by MAX_SAMPLE_INTERVAL, so always representable.
fn delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or_default()
}

fn out_of_range(value: f64) -> IntervalError {
    IntervalError::OutOfRange {
        value,
        min: MIN_SAMPLE_INTERVAL.as_secs(),
        max: MAX_SAMPLE_INTERVAL.as_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_period_is_a_third_for_every_valid_interval() {
        for secs in 1..=60 {
            let interval = SampleInterval::from_secs(secs).unwrap();
            assert_eq!(interval.sampler_period(), Duration::from_secs(secs) / 3);
        }
        assert_eq!(
            SampleInterval::from_secs(3).unwrap().sampler_period(),
            Duration::from_secs(1)
        );
        assert_eq!(
            SampleInterval::from_secs(2).unwrap().sampler_period(),
            Duration::from_nanos(666_666_666)
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(SampleInterval::from_secs(1).is_ok());
        assert!(SampleInterval::from_secs(60).is_ok());
        assert!(SampleInterval::from_secs(0).is_err());
        assert!(SampleInterval::from_secs(61).is_err());
        assert!(SampleInterval::new(Duration::from_millis(999)).is_err());
    }

    #[test]
    fn parse_truncates_fractions() {
        assert_eq!(SampleInterval::parse("2.7").unwrap().as_secs(), 2);
        assert_eq!(SampleInterval::parse(" 10 ").unwrap().as_secs(), 10);
    }

    #[test]
    fn parse_rejects_garbage_and_range() {
        assert_eq!(
            SampleInterval::parse("fast"),
            Err(IntervalError::NotANumber("fast".into()))
        );
        assert!(matches!(
            SampleInterval::parse("0.5"),
            Err(IntervalError::OutOfRange { min: 1, max: 60, .. })
        ));
        assert!(SampleInterval::parse("60.5").is_err());
        assert!(SampleInterval::parse("NaN").is_err());
    }
}
