//! Repeat policy for critical alerts.
//!
//! After a critical alert finishes playing it is re-admitted to the pending
//! set once the cooldown has passed, until its repeat counter reaches the
//! configured maximum. Each cooldown runs as its own task; a newer cooldown
//! for the same alert replaces the older one. A cooldown remembers the store
//! epoch its announcement started under and re-admits nothing once a bulk
//! resolution has moved the epoch on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::task::AbortHandle;
use uuid::Uuid;

use shelfcall_core::events::AlertEvent;
use shelfcall_core::settings::{AlertSettings, SettingsHandle};
use shelfcall_core::types::{Alert, Priority};

use crate::events::EventBus;
use crate::store::AlertStore;

/// Whether `alert`, just played, should be announced again.
pub fn should_repeat(alert: &Alert, settings: &AlertSettings) -> bool {
    alert.priority == Priority::Critical
        && settings.repeat_critical_enabled
        && alert.repeat_count < settings.max_repeats
}

#[derive(Debug, Default)]
struct Cooldowns {
    next_token: u64,
    pending: HashMap<Uuid, Cooldown>,
}

#[derive(Debug)]
struct Cooldown {
    token: u64,
    epoch: u64,
    handle: AbortHandle,
}

#[derive(Debug, Clone)]
pub struct RepeatPolicy {
    store: Arc<AlertStore>,
    settings: SettingsHandle,
    events: EventBus,
    cooldowns: Arc<Mutex<Cooldowns>>,
}

impl RepeatPolicy {
    pub fn new(store: Arc<AlertStore>, settings: SettingsHandle, events: EventBus) -> Self {
        Self {
            store,
            settings,
            events,
            cooldowns: Arc::new(Mutex::new(Cooldowns::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cooldowns> {
        self.cooldowns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Schedule a re-admission for `alert` if the policy allows one.
    ///
    /// `alert` must reflect the store after the play was recorded, and
    /// `epoch` is the store epoch the announcement started under. Must be
    /// called from within a Tokio runtime. Returns whether a cooldown started.
    pub fn after_play(&self, alert: &Alert, epoch: u64) -> bool {
        let settings = self.settings.snapshot();
        if !should_repeat(alert, &settings) {
            tracing::debug!(
                alert_id = %alert.id,
                repeat_count = alert.repeat_count,
                "No repeat scheduled"
            );
            return false;
        }

        let cooldown = settings.repeat_cooldown();
        let mut cooldowns = self.lock();
        if self.store.epoch() != epoch {
            tracing::debug!(alert_id = %alert.id, "Alert resolved during announcement, no repeat");
            return false;
        }
        cooldowns.next_token = cooldowns.next_token.wrapping_add(1);
        let token = cooldowns.next_token;

        let policy = self.clone();
        let alert_id = alert.id;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            policy.readmit(alert_id, token);
        });

        let entry = Cooldown {
            token,
            epoch,
            handle: handle.abort_handle(),
        };
        if let Some(previous) = cooldowns.pending.insert(alert_id, entry) {
            previous.handle.abort();
        }

        tracing::info!(
            alert_id = %alert_id,
            repeat_count = alert.repeat_count,
            cooldown_secs = cooldown.as_secs(),
            "Critical alert will repeat"
        );
        true
    }

    /// Cooldown expiry. The cooldown lock is held across the store update so
    /// a concurrent `cancel_all` either sees this entry or sees it gone.
    fn readmit(&self, alert_id: Uuid, token: u64) {
        let mut cooldowns = self.lock();
        let epoch = match cooldowns.pending.get(&alert_id) {
            Some(current) if current.token == token => current.epoch,
            _ => return,
        };
        cooldowns.pending.remove(&alert_id);

        match self.store.requeue_since(alert_id, epoch) {
            Ok(true) => {
                let repeat_count = self
                    .store
                    .get(alert_id)
                    .map(|a| a.repeat_count)
                    .unwrap_or_default();
                drop(cooldowns);
                tracing::info!(alert_id = %alert_id, repeat_count, "Alert requeued");
                self.events.publish(AlertEvent::AlertRequeued {
                    alert_id,
                    repeat_count,
                    timestamp: Utc::now(),
                });
            }
            Ok(false) => {
                tracing::debug!(alert_id = %alert_id, "Requeue refused");
            }
            Err(e) => {
                tracing::debug!(alert_id = %alert_id, error = %e, "Requeue skipped");
            }
        }
    }

    /// Drop the pending cooldown for one alert.
    pub fn cancel(&self, alert_id: Uuid) -> bool {
        match self.lock().pending.remove(&alert_id) {
            Some(cooldown) => {
                cooldown.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop every pending cooldown. Returns how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let mut cooldowns = self.lock();
        let count = cooldowns.pending.len();
        for (_, cooldown) in cooldowns.pending.drain() {
            cooldown.handle.abort();
        }
        if count > 0 {
            tracing::debug!(count, "Repeat cooldowns cancelled");
        }
        count
    }

    pub fn pending_cooldowns(&self) -> usize {
        self.lock().pending.len()
    }
}
