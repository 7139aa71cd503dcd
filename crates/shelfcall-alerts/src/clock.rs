//! Wall-clock access for scheduling decisions.

use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant, used to filter alerts by creation time.
    fn now(&self) -> DateTime<Utc>;
    /// Local wall-clock time, used for the active-hours window.
    fn local_time(&self) -> NaiveTime;
}

/// The host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_time(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// Clock with a settable local time for tests and demos.
///
/// `now()` follows the host clock unless pinned.
#[derive(Debug)]
pub struct ManualClock {
    local: Mutex<NaiveTime>,
    pinned: Mutex<Option<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(local: NaiveTime) -> Self {
        Self {
            local: Mutex::new(local),
            pinned: Mutex::new(None),
        }
    }

    /// Clock reading `hour:minute` local time. Out-of-range values give midnight.
    pub fn at(hour: u32, minute: u32) -> Self {
        Self::new(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default())
    }

    pub fn set_local(&self, local: NaiveTime) {
        *self.local.lock().unwrap_or_else(|p| p.into_inner()) = local;
    }

    pub fn pin(&self, now: DateTime<Utc>) {
        *self.pinned.lock().unwrap_or_else(|p| p.into_inner()) = Some(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let pinned = *self.pinned.lock().unwrap_or_else(|p| p.into_inner());
        pinned.unwrap_or_else(Utc::now)
    }

    fn local_time(&self) -> NaiveTime {
        *self.local.lock().unwrap_or_else(|p| p.into_inner())
    }
}
