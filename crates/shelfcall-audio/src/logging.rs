//! Host adapters that report through `tracing` instead of an audio device.
//!
//! Used by the binary on hosts without a speech backend, and for dry runs.

use std::time::Duration;

use async_trait::async_trait;

use shelfcall_core::types::VoiceProfile;

use crate::tone::ToneBurst;
use crate::voice::{match_voice, VoiceInfo};
use crate::{SpeechError, SpeechSynthesizer, ToneError, ToneGenerator};

/// Speaking rate at speed 1.0.
const DEFAULT_WORDS_PER_MINUTE: f32 = 160.0;

/// Synthesizer that logs each utterance and takes as long as reading it
/// aloud would.
#[derive(Debug, Clone)]
pub struct LoggingSynthesizer {
    words_per_minute: f32,
    voices: Vec<VoiceInfo>,
}

impl Default for LoggingSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingSynthesizer {
    pub fn new() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            voices: vec![
                VoiceInfo::new("Console Female", "en-US"),
                VoiceInfo::new("Console Male", "en-US"),
            ],
        }
    }

    pub fn with_words_per_minute(mut self, wpm: f32) -> Self {
        self.words_per_minute = wpm.max(1.0);
        self
    }

    /// How long `text` takes to read at `speed`.
    pub fn utterance_duration(&self, text: &str, speed: f32) -> Duration {
        let words = text.split_whitespace().count() as f32;
        let rate = self.words_per_minute * speed.max(0.1);
        Duration::from_millis((words * 60_000.0 / rate).round() as u64)
    }
}

#[async_trait]
impl SpeechSynthesizer for LoggingSynthesizer {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    async fn speak(&self, text: &str, profile: &VoiceProfile) -> Result<(), SpeechError> {
        let voice = match_voice(&self.voices, &profile.voice)
            .map(|v| v.name.as_str())
            .unwrap_or("default");
        tracing::info!(
            voice,
            speed = profile.speed,
            pitch = profile.pitch,
            volume = profile.volume,
            "Speaking: {}",
            text
        );
        tokio::time::sleep(self.utterance_duration(text, profile.speed)).await;
        Ok(())
    }

    fn cancel(&self) {
        tracing::debug!("Speech cancelled");
    }
}

/// Synthesizer for hosts with no speech support; every call is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NullSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        Vec::new()
    }

    async fn speak(&self, _text: &str, _profile: &VoiceProfile) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable(
            "no speech backend configured".to_string(),
        ))
    }

    fn cancel(&self) {}
}

/// Sample rate the logging tone generator renders at.
const LOG_SAMPLE_RATE: u32 = 44_100;

/// Tone generator that renders the burst and logs it instead of playing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingToneGenerator;

impl ToneGenerator for LoggingToneGenerator {
    fn burst(&self, burst: &ToneBurst) -> Result<(), ToneError> {
        let samples = burst.render(LOG_SAMPLE_RATE);
        tracing::info!(
            priority = %burst.priority,
            frequencies = ?burst.frequencies_hz,
            duration_ms = burst.total_duration().as_millis() as u64,
            samples = samples.len(),
            "Tone burst"
        );
        Ok(())
    }
}
