//! Validated, immutable settings snapshots.
//!
//! Settings are never patched field by field. A new `AlertSettings` value is
//! validated as a whole and then swapped into the `SettingsHandle`, so every
//! reader observes either the old or the new snapshot.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use crate::config::{ActiveHoursConfig, ToneConfig, VoiceConfig};
use crate::error::{Result, ShelfcallError};
use crate::types::VoiceProfile;

/// Wall-clock window during which automatic announcements may play.
///
/// The window is evaluated at hour granularity and both ends are inclusive:
/// with `08:00`..`18:00`, 18:45 is still inside. When `start` is later than
/// `end` the window wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ActiveHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: parse_hhmm(start)?,
            end: parse_hhmm(end)?,
        })
    }

    /// Whether announcements are allowed at the given local time.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let hour = time.hour();
        let (start, end) = (self.start.hour(), self.end.hour());
        if start <= end {
            hour >= start && hour <= end
        } else {
            hour >= start || hour <= end
        }
    }

    pub fn to_config(&self) -> ActiveHoursConfig {
        ActiveHoursConfig {
            start: self.start.format("%H:%M").to_string(),
            end: self.end.format("%H:%M").to_string(),
        }
    }
}

fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        ShelfcallError::InvalidSettings(format!("invalid time '{}': {}", value, e))
    })
}

/// Immutable snapshot of the voice alert settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    pub enabled: bool,
    pub default_voice_profile: VoiceProfile,
    pub sound_effects_enabled: bool,
    pub poll_interval_minutes: u32,
    pub active_hours: ActiveHours,
    pub repeat_critical_enabled: bool,
    pub max_repeats: u32,
    pub repeat_cooldown_secs: u64,
    pub tone: ToneConfig,
}

impl Default for AlertSettings {
    fn default() -> Self {
        let voice = VoiceConfig::default();
        Self {
            enabled: voice.enabled,
            default_voice_profile: VoiceProfile::default(),
            sound_effects_enabled: voice.sound_effects,
            poll_interval_minutes: voice.poll_interval_minutes,
            active_hours: ActiveHours::new(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            ),
            repeat_critical_enabled: voice.repeat_critical,
            max_repeats: voice.max_repeats,
            repeat_cooldown_secs: voice.repeat_cooldown_secs,
            tone: ToneConfig::default(),
        }
    }
}

impl AlertSettings {
    /// Check every field; a snapshot that fails is never installed.
    pub fn validate(&self) -> Result<()> {
        self.default_voice_profile.validate()?;
        if self.poll_interval_minutes == 0 {
            return Err(ShelfcallError::InvalidSettings(
                "poll interval must be at least one minute".to_string(),
            ));
        }
        if self.repeat_cooldown_secs == 0 {
            return Err(ShelfcallError::InvalidSettings(
                "repeat cooldown must be at least one second".to_string(),
            ));
        }
        self.tone.validate()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.poll_interval_minutes) * 60)
    }

    pub fn repeat_cooldown(&self) -> Duration {
        Duration::from_secs(self.repeat_cooldown_secs)
    }

    /// Copy of this snapshot with a different master switch.
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            ..self.clone()
        }
    }

    /// Persisted form of this snapshot.
    pub fn to_voice_config(&self) -> VoiceConfig {
        VoiceConfig {
            enabled: self.enabled,
            voice: self.default_voice_profile.voice.clone(),
            speed: self.default_voice_profile.speed,
            pitch: self.default_voice_profile.pitch,
            volume: self.default_voice_profile.volume,
            sound_effects: self.sound_effects_enabled,
            poll_interval_minutes: self.poll_interval_minutes,
            active_hours: self.active_hours.to_config(),
            repeat_critical: self.repeat_critical_enabled,
            max_repeats: self.max_repeats,
            repeat_cooldown_secs: self.repeat_cooldown_secs,
        }
    }
}

/// Shared slot holding the current settings snapshot.
///
/// Cloning the handle shares the slot.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    current: Arc<RwLock<Arc<AlertSettings>>>,
}

impl SettingsHandle {
    pub fn new(settings: AlertSettings) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<AlertSettings> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Validate and install a new snapshot, returning the one it replaced.
    ///
    /// On error the previous snapshot stays in effect.
    pub fn replace(&self, settings: AlertSettings) -> Result<Arc<AlertSettings>> {
        settings.validate()?;
        let next = Arc::new(settings);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(std::mem::replace(&mut *guard, next))
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(AlertSettings::default())
    }
}
