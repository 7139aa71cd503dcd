//! In-memory alert store.
//!
//! Holds every alert and its play state. The repeat counter is bounded by the
//! store's repeat limit on every path that writes it, so no caller can push an
//! alert past `max_repeats`.
//!
//! The bulk operations `mark_all_played` and `reset_all` advance a resolution
//! epoch. An announcement or cooldown that started under an older epoch must
//! not record a play or re-admit its alert afterwards.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use shelfcall_core::types::{Alert, Priority};

use crate::error::StoreError;

#[derive(Debug)]
struct StoreInner {
    alerts: Vec<Alert>,
    repeat_limit: u32,
    epoch: u64,
}

impl StoreInner {
    fn find_mut(&mut self, id: Uuid) -> Result<&mut Alert, StoreError> {
        self.alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn record_play(&mut self, id: Uuid) -> Result<Alert, StoreError> {
        let limit = self.repeat_limit;
        let alert = self.find_mut(id)?;
        alert.has_been_played = true;
        alert.repeat_count = alert.repeat_count.saturating_add(1).min(limit);
        Ok(alert.clone())
    }

    fn readmit(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let limit = self.repeat_limit;
        let alert = self.find_mut(id)?;
        if alert.is_pending() || alert.repeat_count >= limit {
            return Ok(false);
        }
        alert.has_been_played = false;
        Ok(true)
    }
}

/// Alert container with play-state mutations.
#[derive(Debug)]
pub struct AlertStore {
    inner: Mutex<StoreInner>,
}

impl AlertStore {
    /// Create an empty store whose repeat counters never exceed `repeat_limit`.
    pub fn new(repeat_limit: u32) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                alerts: Vec::new(),
                repeat_limit,
                epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert an alert. Its repeat counter is clamped to the current limit.
    pub fn add(&self, mut alert: Alert) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.alerts.iter().any(|a| a.id == alert.id) {
            return Err(StoreError::Duplicate(alert.id));
        }
        alert.repeat_count = alert.repeat_count.min(inner.repeat_limit);
        tracing::debug!(alert_id = %alert.id, priority = %alert.priority, "Alert added");
        inner.alerts.push(alert);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<Alert> {
        self.lock().alerts.iter().find(|a| a.id == id).cloned()
    }

    /// All alerts in insertion order.
    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.clone()
    }

    /// Unplayed alerts created at or before `now`, oldest first.
    pub fn pending(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let mut pending: Vec<Alert> = self
            .lock()
            .alerts
            .iter()
            .filter(|a| a.is_pending() && a.created_at <= now)
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        pending
    }

    /// Current resolution epoch.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Record a completed announcement: mark played and bump the counter.
    ///
    /// The counter saturates at the repeat limit. With a limit of zero a
    /// played alert keeps `repeat_count == 0`, so the counter is the number of
    /// plays only while it is below the limit.
    ///
    /// Returns the updated alert.
    pub fn mark_played(&self, id: Uuid) -> Result<Alert, StoreError> {
        self.lock().record_play(id)
    }

    /// Like `mark_played`, but only when no bulk resolution happened since
    /// `epoch`. Returns `Ok(None)` and leaves the alert alone otherwise.
    pub fn mark_played_since(&self, id: Uuid, epoch: u64) -> Result<Option<Alert>, StoreError> {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Ok(None);
        }
        inner.record_play(id).map(Some)
    }

    /// Re-admit a played alert for another announcement.
    ///
    /// Returns `Ok(false)` without changing anything when the alert is already
    /// pending or its counter has reached the repeat limit.
    pub fn requeue(&self, id: Uuid) -> Result<bool, StoreError> {
        self.lock().readmit(id)
    }

    /// Like `requeue`, but refused when a bulk resolution happened since
    /// `epoch`.
    pub fn requeue_since(&self, id: Uuid, epoch: u64) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Ok(false);
        }
        inner.readmit(id)
    }

    /// Mark every alert played. Returns how many were pending.
    pub fn mark_all_played(&self) -> usize {
        let mut inner = self.lock();
        inner.epoch = inner.epoch.wrapping_add(1);
        let mut changed = 0;
        for alert in inner.alerts.iter_mut().filter(|a| a.is_pending()) {
            alert.has_been_played = true;
            changed += 1;
        }
        changed
    }

    /// Make every alert pending again with a zero repeat counter.
    pub fn reset_all(&self) {
        let mut inner = self.lock();
        inner.epoch = inner.epoch.wrapping_add(1);
        for alert in inner.alerts.iter_mut() {
            alert.has_been_played = false;
            alert.repeat_count = 0;
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock().alerts.iter().filter(|a| a.is_pending()).count()
    }

    pub fn critical_pending_count(&self) -> usize {
        self.lock()
            .alerts
            .iter()
            .filter(|a| a.is_pending() && a.priority == Priority::Critical)
            .count()
    }

    pub fn repeat_limit(&self) -> u32 {
        self.lock().repeat_limit
    }

    /// Change the repeat limit, clamping existing counters down to it.
    pub fn set_repeat_limit(&self, limit: u32) {
        let mut inner = self.lock();
        inner.repeat_limit = limit;
        for alert in inner.alerts.iter_mut() {
            alert.repeat_count = alert.repeat_count.min(limit);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().alerts.is_empty()
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(3)
    }
}
