use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ShelfcallError};
use crate::settings::{ActiveHours, AlertSettings};
use crate::types::VoiceProfile;

/// Top-level configuration for shelfcall.
///
/// Loaded from `~/.shelfcall/config.toml` by default. Every section falls back
/// to its defaults, so a partial file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfcallConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub tone: ToneConfig,
}

impl ShelfcallConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShelfcallConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Validate the voice and tone sections into an immutable settings snapshot.
    pub fn alert_settings(&self) -> Result<AlertSettings> {
        self.voice.validate(&self.tone)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Wall-clock window for automatic announcements, as `HH:MM` strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveHoursConfig {
    pub start: String,
    pub end: String,
}

impl Default for ActiveHoursConfig {
    fn default() -> Self {
        Self {
            start: "08:00".to_string(),
            end: "18:00".to_string(),
        }
    }
}

/// Persisted form of the voice alert settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Master switch for scheduled announcements.
    pub enabled: bool,
    /// Default voice name or hint ("female", "male").
    pub voice: String,
    /// Speech rate multiplier (0.5 to 2.0).
    pub speed: f32,
    /// Pitch multiplier (0.5 to 2.0).
    pub pitch: f32,
    /// Output volume (0.1 to 1.0).
    pub volume: f32,
    /// Play a tone burst before each announcement.
    pub sound_effects: bool,
    /// Minutes between scheduler ticks.
    pub poll_interval_minutes: u32,
    pub active_hours: ActiveHoursConfig,
    /// Re-announce unresolved critical alerts.
    pub repeat_critical: bool,
    /// Upper bound on the per-alert repeat counter.
    pub max_repeats: u32,
    /// Delay before a critical alert is re-admitted.
    pub repeat_cooldown_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: "female".to_string(),
            speed: 1.0,
            pitch: 1.0,
            volume: 0.8,
            sound_effects: true,
            poll_interval_minutes: 15,
            active_hours: ActiveHoursConfig::default(),
            repeat_critical: true,
            max_repeats: 3,
            repeat_cooldown_secs: 30,
        }
    }
}

impl VoiceConfig {
    /// Build and validate a settings snapshot from this section.
    pub fn validate(&self, tone: &ToneConfig) -> Result<AlertSettings> {
        let settings = AlertSettings {
            enabled: self.enabled,
            default_voice_profile: VoiceProfile {
                voice: self.voice.clone(),
                speed: self.speed,
                pitch: self.pitch,
                volume: self.volume,
            },
            sound_effects_enabled: self.sound_effects,
            poll_interval_minutes: self.poll_interval_minutes,
            active_hours: ActiveHours::parse(&self.active_hours.start, &self.active_hours.end)?,
            repeat_critical_enabled: self.repeat_critical,
            max_repeats: self.max_repeats,
            repeat_cooldown_secs: self.repeat_cooldown_secs,
            tone: tone.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Upper bound for each tone timing field.
pub const MAX_TONE_MS: u64 = 5_000;

/// Shape of the tone burst played before an announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    /// Delay between the starts of consecutive tones.
    pub spacing_ms: u64,
    /// Length of each tone.
    pub duration_ms: u64,
    /// Time for the gain to ramp from silence to `peak_gain`.
    pub attack_ms: u64,
    /// Peak linear gain (0.0 to 1.0].
    pub peak_gain: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            spacing_ms: 200,
            duration_ms: 500,
            attack_ms: 100,
            peak_gain: 0.3,
        }
    }
}

impl ToneConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("spacing", self.spacing_ms),
            ("duration", self.duration_ms),
            ("attack", self.attack_ms),
        ] {
            if value > MAX_TONE_MS {
                return Err(ShelfcallError::InvalidSettings(format!(
                    "tone {field} {value}ms exceeds {MAX_TONE_MS}ms"
                )));
            }
        }
        if self.duration_ms == 0 {
            return Err(ShelfcallError::InvalidSettings(
                "tone duration must be positive".to_string(),
            ));
        }
        if self.attack_ms > self.duration_ms {
            return Err(ShelfcallError::InvalidSettings(format!(
                "tone attack {}ms exceeds duration {}ms",
                self.attack_ms, self.duration_ms
            )));
        }
        if !(self.peak_gain > 0.0 && self.peak_gain <= 1.0) {
            return Err(ShelfcallError::InvalidSettings(format!(
                "tone peak gain {} outside (0, 1]",
                self.peak_gain
            )));
        }
        Ok(())
    }
}
