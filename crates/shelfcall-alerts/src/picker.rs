//! Announcement ordering.
//!
//! Highest priority first; among equal priorities the oldest alert wins, and
//! alerts with identical timestamps keep their store order.

use std::cmp::Ordering;

use shelfcall_core::types::Alert;

/// Ordering used to pick the next announcement: `Less` means `a` goes first.
pub fn announcement_order(a: &Alert, b: &Alert) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// The alert that should be announced next, if any is pending.
pub fn select(alerts: &[Alert]) -> Option<&Alert> {
    alerts
        .iter()
        .filter(|a| a.is_pending())
        .min_by(|a, b| announcement_order(a, b))
}

/// Pending alerts in the order they would be announced.
pub fn queue(alerts: &[Alert]) -> Vec<&Alert> {
    let mut pending: Vec<&Alert> = alerts.iter().filter(|a| a.is_pending()).collect();
    pending.sort_by(|a, b| announcement_order(a, b));
    pending
}
