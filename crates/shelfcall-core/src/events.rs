use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Priority;

/// Why a scheduler tick did not dispatch an announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Announcements are switched off.
    Disabled,
    /// Local time is outside the active hours.
    OutsideActiveHours,
    /// Another announcement is still playing.
    Busy,
    /// Nothing is pending.
    NoPendingAlerts,
}

/// Where an announcement request came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayOrigin {
    /// Picked by a scheduler tick.
    Scheduled,
    /// A stored alert played on demand.
    Manual,
    /// A free-text test message that is not part of the alert store.
    Test,
}

/// Events emitted by the voice alert engine.
///
/// Published on a broadcast channel for UI updates and audit logging.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AlertEvent {
    /// An announcement entered the announcing state.
    AnnouncementStarted {
        alert_id: Uuid,
        priority: Priority,
        origin: PlayOrigin,
        timestamp: DateTime<Utc>,
    },

    /// Speech finished successfully.
    AnnouncementCompleted {
        alert_id: Uuid,
        origin: PlayOrigin,
        repeat_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// Speech failed; the alert stays pending.
    AnnouncementFailed {
        alert_id: Uuid,
        origin: PlayOrigin,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The in-flight announcement was stopped.
    AnnouncementCancelled {
        alert_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A critical alert was re-admitted after its cooldown.
    AlertRequeued {
        alert_id: Uuid,
        repeat_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// A scheduler tick ended without dispatching.
    TickSkipped {
        reason: SkipReason,
        timestamp: DateTime<Utc>,
    },

    SchedulerEnabled {
        poll_interval_minutes: u32,
        timestamp: DateTime<Utc>,
    },

    SchedulerDisabled {
        timestamp: DateTime<Utc>,
    },

    /// A new settings snapshot took effect.
    SettingsUpdated {
        enabled: bool,
        poll_interval_minutes: u32,
        max_repeats: u32,
        timestamp: DateTime<Utc>,
    },

    /// A settings snapshot was refused; the previous one stays in effect.
    SettingsRejected {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl AlertEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AlertEvent::AnnouncementStarted { timestamp, .. }
            | AlertEvent::AnnouncementCompleted { timestamp, .. }
            | AlertEvent::AnnouncementFailed { timestamp, .. }
            | AlertEvent::AnnouncementCancelled { timestamp, .. }
            | AlertEvent::AlertRequeued { timestamp, .. }
            | AlertEvent::TickSkipped { timestamp, .. }
            | AlertEvent::SchedulerEnabled { timestamp, .. }
            | AlertEvent::SchedulerDisabled { timestamp, .. }
            | AlertEvent::SettingsUpdated { timestamp, .. }
            | AlertEvent::SettingsRejected { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a stable event name for logging and subscribers.
    pub fn event_name(&self) -> &'static str {
        match self {
            AlertEvent::AnnouncementStarted { .. } => "announcement_started",
            AlertEvent::AnnouncementCompleted { .. } => "announcement_completed",
            AlertEvent::AnnouncementFailed { .. } => "announcement_failed",
            AlertEvent::AnnouncementCancelled { .. } => "announcement_cancelled",
            AlertEvent::AlertRequeued { .. } => "alert_requeued",
            AlertEvent::TickSkipped { .. } => "tick_skipped",
            AlertEvent::SchedulerEnabled { .. } => "scheduler_enabled",
            AlertEvent::SchedulerDisabled { .. } => "scheduler_disabled",
            AlertEvent::SettingsUpdated { .. } => "settings_updated",
            AlertEvent::SettingsRejected { .. } => "settings_rejected",
        }
    }

    /// The alert this event concerns, if any.
    pub fn alert_id(&self) -> Option<Uuid> {
        match self {
            AlertEvent::AnnouncementStarted { alert_id, .. }
            | AlertEvent::AnnouncementCompleted { alert_id, .. }
            | AlertEvent::AnnouncementFailed { alert_id, .. }
            | AlertEvent::AnnouncementCancelled { alert_id, .. }
            | AlertEvent::AlertRequeued { alert_id, .. } => Some(*alert_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_unique() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let events = vec![
            AlertEvent::AnnouncementStarted {
                alert_id: id,
                priority: Priority::High,
                origin: PlayOrigin::Scheduled,
                timestamp: now,
            },
            AlertEvent::AnnouncementCompleted {
                alert_id: id,
                origin: PlayOrigin::Scheduled,
                repeat_count: 1,
                timestamp: now,
            },
            AlertEvent::AnnouncementFailed {
                alert_id: id,
                origin: PlayOrigin::Test,
                reason: "boom".to_string(),
                timestamp: now,
            },
            AlertEvent::AnnouncementCancelled {
                alert_id: id,
                timestamp: now,
            },
            AlertEvent::AlertRequeued {
                alert_id: id,
                repeat_count: 1,
                timestamp: now,
            },
            AlertEvent::TickSkipped {
                reason: SkipReason::Busy,
                timestamp: now,
            },
            AlertEvent::SchedulerEnabled {
                poll_interval_minutes: 15,
                timestamp: now,
            },
            AlertEvent::SchedulerDisabled { timestamp: now },
            AlertEvent::SettingsUpdated {
                enabled: true,
                poll_interval_minutes: 15,
                max_repeats: 3,
                timestamp: now,
            },
            AlertEvent::SettingsRejected {
                reason: "volume".to_string(),
                timestamp: now,
            },
        ];

        let mut names: Vec<&str> = events.iter().map(|e| e.event_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), events.len());
        assert!(events.iter().all(|e| e.timestamp() == now));
    }

    #[test]
    fn test_alert_id_accessor() {
        let id = Uuid::new_v4();
        let event = AlertEvent::AlertRequeued {
            alert_id: id,
            repeat_count: 2,
            timestamp: Utc::now(),
        };
        assert_eq!(event.alert_id(), Some(id));

        let event = AlertEvent::SchedulerDisabled {
            timestamp: Utc::now(),
        };
        assert_eq!(event.alert_id(), None);
    }

    #[test]
    fn test_event_serializes() {
        let event = AlertEvent::TickSkipped {
            reason: SkipReason::OutsideActiveHours,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("TickSkipped"));
        assert!(json.contains("outside_active_hours"));
    }
}
