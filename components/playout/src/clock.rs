//! Wall-clock abstraction with a configurable broadcast-day offset.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike as _};

/// Number of seconds in a civil day.
pub const DAY_IN_SEC: f64 = 86400.0;

/// Wall clock shifted into the broadcast-day reference frame.
///
/// The broadcast day spans `[day_start, day_start + 24h)`: it rolls over
/// at the configured start hour, not at midnight. Timestamps that have
/// wrapped past midnight are mapped back into that frame with
/// [`BroadcastClock::wrap`].
#[derive(Clone, Debug)]
pub struct BroadcastClock {
    /// Hour of day at which the broadcast day starts.
    day_start: u8,

    /// Fixed shift (seconds) applied to the wall clock.
    time_shift: f64,

    /// Frozen time source used by tests; [`None`] in production.
    frozen: Option<Arc<Mutex<NaiveDateTime>>>,
}

impl BroadcastClock {
    /// Creates a new [`BroadcastClock`] ticking with the system clock.
    #[inline]
    #[must_use]
    pub fn new(day_start: u8, time_shift: f64) -> Self {
        Self {
            day_start,
            time_shift,
            frozen: None,
        }
    }

    /// Creates a [`BroadcastClock`] frozen at the given instant, along
    /// with a handle for advancing it.
    #[cfg(test)]
    pub(crate) fn frozen(
        day_start: u8,
        at: NaiveDateTime,
    ) -> (Self, Arc<Mutex<NaiveDateTime>>) {
        let handle = Arc::new(Mutex::new(at));
        let clock = Self {
            day_start,
            time_shift: 0.0,
            frozen: Some(Arc::clone(&handle)),
        };
        (clock, handle)
    }

    /// Current shifted local time.
    fn now(&self) -> NaiveDateTime {
        if let Some(at) = &self.frozen {
            return *at.lock().unwrap();
        }
        Local::now().naive_local()
            + Duration::microseconds((self.time_shift * 1_000_000.0) as i64)
    }

    /// Current hour of day.
    #[must_use]
    pub fn hour(&self) -> u32 {
        self.now().hour()
    }

    /// Current time of day in seconds, with microsecond precision.
    #[must_use]
    pub fn seconds_of_day(&self) -> f64 {
        let now = self.now();
        let sec =
            f64::from(now.hour() * 3600 + now.minute() * 60 + now.second());
        sec + f64::from(now.nanosecond() / 1000) / 1_000_000.0
    }

    /// Current broadcast date.
    ///
    /// With `seek_back`, hours before the day start still belong to the
    /// previous day's broadcast, so the previous civil date is returned.
    #[must_use]
    pub fn date_for(&self, seek_back: bool) -> NaiveDate {
        let now = self.now();
        if seek_back && now.hour() < u32::from(self.day_start) {
            now.date() - Duration::days(1)
        } else {
            now.date()
        }
    }

    /// Start of the broadcast day, in seconds of day.
    #[inline]
    #[must_use]
    pub fn day_start_sec(&self) -> f64 {
        f64::from(self.day_start) * 3600.0
    }

    /// Maps a time of day that has wrapped past midnight into the
    /// broadcast-day frame `[day_start, day_start + 24h)`.
    #[must_use]
    pub fn wrap(&self, t: f64) -> f64 {
        if (0.0..self.day_start_sec()).contains(&t) {
            t + DAY_IN_SEC
        } else {
            t
        }
    }
}
