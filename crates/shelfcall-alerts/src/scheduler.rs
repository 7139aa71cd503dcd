//! Periodic announcement scheduler.
//!
//! Every poll interval the scheduler runs one tick: it checks the master
//! switch, the active-hours window and the speech slot, then hands the
//! highest-priority pending alert to the playback engine. At most one alert
//! is dispatched per tick.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use shelfcall_core::events::{AlertEvent, PlayOrigin, SkipReason};
use shelfcall_core::settings::SettingsHandle;

use crate::clock::Clock;
use crate::error::PlaybackError;
use crate::events::EventBus;
use crate::picker;
use crate::playback::{PlaybackEngine, PlaybackTicket};
use crate::store::AlertStore;

/// Result of one scheduler tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// An announcement started.
    Dispatched(PlaybackTicket),
    /// Nothing was dispatched.
    Skipped(SkipReason),
    /// The chosen alert could not be announced; it stays pending.
    Failed(PlaybackError),
}

impl TickOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, TickOutcome::Dispatched(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            TickOutcome::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }
}

struct Timer {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

struct SchedulerShared {
    store: Arc<AlertStore>,
    engine: PlaybackEngine,
    settings: SettingsHandle,
    clock: Arc<dyn Clock>,
    events: EventBus,
    timer: Mutex<Option<Timer>>,
    tick_gate: Mutex<()>,
}

/// Background scheduler that announces pending alerts on a fixed interval.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
}

impl Scheduler {
    pub fn new(
        store: Arc<AlertStore>,
        engine: PlaybackEngine,
        settings: SettingsHandle,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                store,
                engine,
                settings,
                clock,
                events,
                timer: Mutex::new(None),
                tick_gate: Mutex::new(()),
            }),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<Timer>> {
        self.shared
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.shared
            .tick_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one scheduling pass now.
    pub fn tick(&self) -> TickOutcome {
        let _gate = self.gate();
        let settings = self.shared.settings.snapshot();

        if !settings.enabled {
            return self.skip(SkipReason::Disabled);
        }
        let local = self.shared.clock.local_time();
        if !settings.active_hours.contains(local) {
            return self.skip(SkipReason::OutsideActiveHours);
        }
        if self.shared.engine.is_announcing() {
            return self.skip(SkipReason::Busy);
        }

        let pending = self.shared.store.pending(self.shared.clock.now());
        let Some(alert) = picker::select(&pending) else {
            return self.skip(SkipReason::NoPendingAlerts);
        };

        let profile = alert.effective_profile(&settings.default_voice_profile);
        match self.shared.engine.play(alert, profile, PlayOrigin::Scheduled) {
            Ok(ticket) => TickOutcome::Dispatched(ticket),
            Err(PlaybackError::Busy) => self.skip(SkipReason::Busy),
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "Scheduled announcement failed");
                TickOutcome::Failed(e)
            }
        }
    }

    fn skip(&self, reason: SkipReason) -> TickOutcome {
        tracing::debug!(?reason, "Tick skipped");
        self.shared.events.publish(AlertEvent::TickSkipped {
            reason,
            timestamp: Utc::now(),
        });
        TickOutcome::Skipped(reason)
    }

    pub fn is_running(&self) -> bool {
        self.timer()
            .as_ref()
            .is_some_and(|timer| !timer.handle.is_finished())
    }

    /// (Re)start the periodic timer with a fresh interval from the current
    /// settings. The first tick fires one full interval from now.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let period = self.shared.settings.snapshot().poll_interval();
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();
        let scheduler = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let _ = scheduler.tick();
                    }
                    _ = signal.notified() => return,
                }
            }
        });

        let previous = self.timer().replace(Timer { handle, shutdown });
        if let Some(previous) = previous {
            previous.shutdown.notify_one();
        }
        tracing::info!(poll_interval_secs = period.as_secs(), "Scheduler timer started");
    }

    /// Stop the periodic timer. Returns `false` when it was not running.
    pub fn stop(&self) -> bool {
        match self.timer().take() {
            Some(timer) => {
                timer.shutdown.notify_one();
                tracing::info!("Scheduler timer stopped");
                true
            }
            None => false,
        }
    }

    /// Switch announcements on and restart the timer.
    pub fn enable(&self) {
        let current = self.shared.settings.snapshot();
        if let Err(e) = self.shared.settings.replace(current.with_enabled(true)) {
            tracing::warn!(error = %e, "Could not enable announcements");
            return;
        }
        self.resume();
    }

    /// Switch announcements off, stop the timer and cut off any in-flight
    /// announcement. When this returns no tick can dispatch until re-enabled.
    pub fn disable(&self) {
        let current = self.shared.settings.snapshot();
        if let Err(e) = self.shared.settings.replace(current.with_enabled(false)) {
            tracing::warn!(error = %e, "Could not disable announcements");
        }
        self.halt();
    }

    /// Restart the timer for already-enabled settings.
    pub(crate) fn resume(&self) {
        self.start();
        let settings = self.shared.settings.snapshot();
        self.shared.events.publish(AlertEvent::SchedulerEnabled {
            poll_interval_minutes: settings.poll_interval_minutes,
            timestamp: Utc::now(),
        });
    }

    /// Stop the timer and the engine for already-disabled settings.
    pub(crate) fn halt(&self) {
        self.stop();
        // Wait out any tick that read the settings before they changed.
        let _gate = self.gate();
        self.shared.engine.stop();
        self.shared.events.publish(AlertEvent::SchedulerDisabled {
            timestamp: Utc::now(),
        });
    }
}
