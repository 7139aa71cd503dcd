use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ShelfcallError};

// =============================================================================
// Enums
// =============================================================================

/// Inventory condition that raised the alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    OutOfStock,
    Expiring,
    Reorder,
    QualityIssue,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertType::LowStock => "low_stock",
            AlertType::OutOfStock => "out_of_stock",
            AlertType::Expiring => "expiring",
            AlertType::Reorder => "reorder",
            AlertType::QualityIssue => "quality_issue",
        };
        f.write_str(s)
    }
}

/// Announcement priority.
///
/// Variants are declared lowest first so the derived `Ord` matches the
/// announcement order: `Critical > High > Medium > Low`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Numeric rank, critical = 4 down to low = 1.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Priority {
    type Err = ShelfcallError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(ShelfcallError::InvalidSettings(format!(
                "unknown priority '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Voice profile
// =============================================================================

/// Allowed speech rate multipliers.
pub const SPEED_RANGE: (f32, f32) = (0.5, 2.0);
/// Allowed pitch multipliers.
pub const PITCH_RANGE: (f32, f32) = (0.5, 2.0);
/// Allowed output volume.
pub const VOLUME_RANGE: (f32, f32) = (0.1, 1.0);

/// Synthesis parameters applied to one spoken message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Voice identity, either a voice name or a hint such as "female".
    pub voice: String,
    pub speed: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            voice: "female".to_string(),
            speed: 1.0,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}

impl VoiceProfile {
    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.voice.trim().is_empty() {
            return Err(ShelfcallError::InvalidSettings(
                "voice must not be empty".to_string(),
            ));
        }
        check_range("speed", self.speed, SPEED_RANGE)?;
        check_range("pitch", self.pitch, PITCH_RANGE)?;
        check_range("volume", self.volume, VOLUME_RANGE)?;
        Ok(())
    }
}

fn check_range(name: &str, value: f32, (min, max): (f32, f32)) -> Result<()> {
    // NaN fails both comparisons, so test for containment rather than exclusion.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ShelfcallError::InvalidSettings(format!(
            "{} {} outside [{}, {}]",
            name, value, min, max
        )))
    }
}

// =============================================================================
// Alert
// =============================================================================

fn default_true() -> bool {
    true
}

/// A business alert waiting to be announced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    /// Human-readable name of the affected item.
    pub subject: String,
    pub alert_type: AlertType,
    pub priority: Priority,
    /// Text spoken when no custom message is set.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
    /// Free-text classification such as the business vertical.
    #[serde(default)]
    pub domain_tag: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub has_been_played: bool,
    #[serde(default)]
    pub repeat_count: u32,
    #[serde(default = "default_true")]
    pub sound_effect_enabled: bool,
    /// Per-alert override of the default voice profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_profile: Option<VoiceProfile>,
}

impl Alert {
    /// Create a pending alert stamped with the current time.
    pub fn new(
        subject: impl Into<String>,
        alert_type: AlertType,
        priority: Priority,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            alert_type,
            priority,
            message: message.into(),
            custom_message: None,
            domain_tag: String::new(),
            created_at: Utc::now(),
            has_been_played: false,
            repeat_count: 0,
            sound_effect_enabled: true,
            voice_profile: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_domain_tag(mut self, tag: impl Into<String>) -> Self {
        self.domain_tag = tag.into();
        self
    }

    pub fn with_custom_message(mut self, message: impl Into<String>) -> Self {
        self.custom_message = Some(message.into());
        self
    }

    pub fn with_voice_profile(mut self, profile: VoiceProfile) -> Self {
        self.voice_profile = Some(profile);
        self
    }

    pub fn with_sound_effect(mut self, enabled: bool) -> Self {
        self.sound_effect_enabled = enabled;
        self
    }

    /// An alert is pending until one announcement of it completes.
    pub fn is_pending(&self) -> bool {
        !self.has_been_played
    }

    /// The text to synthesize: the custom message when it is set and not blank.
    pub fn spoken_text(&self) -> &str {
        match self.custom_message.as_deref() {
            Some(custom) if !custom.trim().is_empty() => custom,
            _ => &self.message,
        }
    }

    /// The per-alert profile, or `default` when the alert carries none.
    pub fn effective_profile<'a>(&'a self, default: &'a VoiceProfile) -> &'a VoiceProfile {
        self.voice_profile.as_ref().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Alert {
        Alert::new(
            "Red Peppers",
            AlertType::LowStock,
            Priority::High,
            "The red peppers are running low.",
        )
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::Critical.rank(), 4);
        assert_eq!(Priority::Low.rank(), 1);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("Critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_enum_serde_snake_case() {
        let json = serde_json::to_string(&AlertType::QualityIssue).unwrap();
        assert_eq!(json, "\"quality_issue\"");
        let p: Priority = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(p, Priority::Critical);
    }

    #[test]
    fn test_new_alert_is_pending() {
        let alert = sample();
        assert!(alert.is_pending());
        assert_eq!(alert.repeat_count, 0);
        assert!(alert.sound_effect_enabled);
        assert!(alert.voice_profile.is_none());
    }

    #[test]
    fn test_spoken_text_prefers_custom_message() {
        let alert = sample().with_custom_message("Restock peppers now");
        assert_eq!(alert.spoken_text(), "Restock peppers now");
    }

    #[test]
    fn test_spoken_text_ignores_blank_custom_message() {
        let alert = sample().with_custom_message("   ");
        assert_eq!(alert.spoken_text(), "The red peppers are running low.");
    }

    #[test]
    fn test_effective_profile() {
        let default = VoiceProfile::default();
        let alert = sample();
        assert_eq!(alert.effective_profile(&default), &default);

        let custom = VoiceProfile {
            voice: "male".to_string(),
            speed: 0.9,
            pitch: 1.1,
            volume: 0.9,
        };
        let alert = sample().with_voice_profile(custom.clone());
        assert_eq!(alert.effective_profile(&default), &custom);
    }

    #[test]
    fn test_voice_profile_bounds() {
        assert!(VoiceProfile::default().validate().is_ok());

        let edges = VoiceProfile {
            voice: "female".to_string(),
            speed: 2.0,
            pitch: 0.5,
            volume: 0.1,
        };
        assert!(edges.validate().is_ok());

        let too_fast = VoiceProfile {
            speed: 2.5,
            ..VoiceProfile::default()
        };
        assert!(too_fast.validate().is_err());

        let too_quiet = VoiceProfile {
            volume: 0.05,
            ..VoiceProfile::default()
        };
        assert!(too_quiet.validate().is_err());

        let nan_pitch = VoiceProfile {
            pitch: f32::NAN,
            ..VoiceProfile::default()
        };
        assert!(nan_pitch.validate().is_err());
    }

    #[test]
    fn test_alert_deserialize_with_defaults() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "subject": "N95 Masks",
            "alert_type": "out_of_stock",
            "priority": "critical",
            "message": "N95 masks are critically low.",
            "created_at": "2024-01-15T14:20:00Z"
        }"#;
        let alert: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.priority, Priority::Critical);
        assert!(alert.is_pending());
        assert!(alert.sound_effect_enabled);
        assert_eq!(alert.domain_tag, "");
        assert!(alert.custom_message.is_none());
    }
}
