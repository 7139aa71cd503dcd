//! JSON alert feed loading.
//!
//! A feed is a JSON array of alert entries. Only the subject, type, priority
//! and message are required; missing ids and timestamps are filled in.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use shelfcall_core::error::Result;
use shelfcall_core::types::{Alert, AlertType, Priority, VoiceProfile};

#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    id: Option<Uuid>,
    subject: String,
    alert_type: AlertType,
    priority: Priority,
    message: String,
    #[serde(default)]
    custom_message: Option<String>,
    #[serde(default)]
    domain_tag: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    sound_effect_enabled: Option<bool>,
    #[serde(default)]
    voice_profile: Option<VoiceProfile>,
}

impl FeedEntry {
    fn into_alert(self) -> Result<Alert> {
        let mut alert = Alert::new(self.subject, self.alert_type, self.priority, self.message);
        if let Some(id) = self.id {
            alert.id = id;
        }
        if let Some(created_at) = self.created_at {
            alert.created_at = created_at;
        }
        if let Some(tag) = self.domain_tag {
            alert.domain_tag = tag;
        }
        if let Some(enabled) = self.sound_effect_enabled {
            alert.sound_effect_enabled = enabled;
        }
        alert.custom_message = self.custom_message;
        if let Some(profile) = self.voice_profile {
            profile.validate()?;
            alert.voice_profile = Some(profile);
        }
        Ok(alert)
    }
}

/// Parse a feed from JSON text.
pub fn parse(json: &str) -> Result<Vec<Alert>> {
    let entries: Vec<FeedEntry> = serde_json::from_str(json)?;
    entries.into_iter().map(FeedEntry::into_alert).collect()
}

/// Read and parse a feed file.
pub fn load(path: &Path) -> Result<Vec<Alert>> {
    let content = std::fs::read_to_string(path)?;
    let alerts = parse(&content)?;
    tracing::info!(path = %path.display(), count = alerts.len(), "Alert feed loaded");
    Ok(alerts)
}
