//! Time source used by the task store and the AI fallback.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use super::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current instant as a domain `Timestamp`.
    fn timestamp(&self) -> Timestamp {
        Timestamp::from_datetime(self.now())
    }

    /// Returns the current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock.
///
/// Every call to `now` returns the current instant and then advances it by
/// `step`, so consecutive creations get strictly increasing timestamps. With
/// a zero step the clock is frozen.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Arc<AtomicI64>,
    step_millis: i64,
}

impl FixedClock {
    /// A frozen clock at `instant`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::stepping(instant, TimeDelta::zero())
    }

    /// A clock that starts at `instant` and advances by `step` per reading.
    #[must_use]
    pub fn stepping(instant: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(instant.timestamp_millis())),
            step_millis: step.num_milliseconds(),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        self.millis
            .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.fetch_add(self.step_millis, Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}
