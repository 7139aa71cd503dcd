//! Built-in sample alerts for `shelfcall run --demo`.

use chrono::{Duration, Utc};

use shelfcall_core::types::{Alert, AlertType, Priority, VoiceProfile};

fn profile(voice: &str, speed: f32, pitch: f32, volume: f32) -> VoiceProfile {
    VoiceProfile {
        voice: voice.to_string(),
        speed,
        pitch,
        volume,
    }
}

/// Five alerts across three business verticals, staggered five minutes apart.
pub fn sample_alerts() -> Vec<Alert> {
    let now = Utc::now();
    let ago = |minutes: i64| now - Duration::minutes(minutes);

    vec![
        Alert::new(
            "Red Peppers",
            AlertType::LowStock,
            Priority::High,
            "The red peppers are running low. Current stock is 8 pounds. Please refill or place an order.",
        )
        .with_domain_tag("Restaurant")
        .with_created_at(ago(10))
        .with_voice_profile(profile("female", 1.0, 1.0, 0.8)),
        Alert::new(
            "Pain Killers (Ibuprofen)",
            AlertType::LowStock,
            Priority::Critical,
            "Check medications: Pain killers are low. Current stock is 25 units. Refill or put in an order immediately.",
        )
        .with_domain_tag("Healthcare")
        .with_created_at(ago(15))
        .with_voice_profile(profile("male", 0.9, 1.1, 0.9)),
        Alert::new(
            "N95 Masks",
            AlertType::OutOfStock,
            Priority::Critical,
            "CRITICAL ALERT: N95 masks are critically low. Only 12 units remaining. Immediate reorder required for patient safety.",
        )
        .with_domain_tag("Healthcare")
        .with_created_at(ago(20))
        .with_voice_profile(profile("female", 0.8, 1.2, 1.0)),
        Alert::new(
            "Safety Hard Hats",
            AlertType::Reorder,
            Priority::High,
            "Safety hard hats need reordering. Current stock is 5 units. Minimum required is 20 for OSHA compliance.",
        )
        .with_domain_tag("Construction")
        .with_created_at(ago(25))
        .with_voice_profile(profile("male", 1.0, 1.0, 0.8)),
        Alert::new(
            "Fresh Milk",
            AlertType::Expiring,
            Priority::Medium,
            "Fresh milk expires today. 15 gallons will expire. Use immediately or mark for disposal.",
        )
        .with_domain_tag("Restaurant")
        .with_created_at(ago(30))
        .with_voice_profile(profile("female", 1.1, 0.9, 0.7)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfcall_alerts::picker;

    #[test]
    fn test_sample_alerts_are_valid() {
        let alerts = sample_alerts();
        assert_eq!(alerts.len(), 5);
        for alert in &alerts {
            assert!(alert.is_pending());
            alert.voice_profile.as_ref().unwrap().validate().unwrap();
        }
    }

    #[test]
    fn test_sample_announcement_order() {
        let alerts = sample_alerts();
        let order: Vec<&str> = picker::queue(&alerts)
            .iter()
            .map(|a| a.subject.as_str())
            .collect();
        assert_eq!(
            order,
            vec![
                "N95 Masks",
                "Pain Killers (Ibuprofen)",
                "Safety Hard Hats",
                "Red Peppers",
                "Fresh Milk",
            ]
        );
    }
}
