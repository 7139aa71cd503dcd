//! shelfcall audio crate - speech synthesis and tone output ports.
//!
//! The alert engine never talks to an audio device directly. It drives two
//! injected ports: a `SpeechSynthesizer` that speaks one message at a time and
//! a fire-and-forget `ToneGenerator` for the attention cue. Mock
//! implementations record every call so the engine can be tested without
//! audio hardware.

pub mod logging;
pub mod tone;
pub mod voice;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use shelfcall_core::error::ShelfcallError;
use shelfcall_core::types::VoiceProfile;

pub use logging::{LoggingSynthesizer, LoggingToneGenerator, NullSynthesizer};
pub use tone::{frequencies_for, ToneBurst};
pub use voice::{match_voice, VoiceInfo};

// =============================================================================
// Errors
// =============================================================================

/// Errors reported by a speech synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// The host has no speech support at all.
    #[error("Speech synthesis unavailable: {0}")]
    Unavailable(String),

    /// Speech support exists but this utterance failed.
    #[error("Speech synthesis failed: {0}")]
    Failed(String),

    /// The utterance was cancelled before it finished.
    #[error("Speech synthesis cancelled")]
    Cancelled,
}

/// Errors reported by a tone generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToneError {
    #[error("Audio device not available: {0}")]
    DeviceUnavailable(String),

    #[error("Tone playback failed: {0}")]
    Failed(String),
}

impl From<SpeechError> for ShelfcallError {
    fn from(err: SpeechError) -> Self {
        ShelfcallError::Audio(err.to_string())
    }
}

impl From<ToneError> for ShelfcallError {
    fn from(err: ToneError) -> Self {
        ShelfcallError::Audio(err.to_string())
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Port for speaking text aloud.
///
/// The engine holds at most one outstanding `speak` call at a time. Dropping
/// the returned future abandons the utterance; `cancel` additionally asks the
/// backend to silence any audio already queued.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether the host supports speech at all.
    fn is_available(&self) -> bool;

    /// Voices the backend can speak with.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Speak `text` with `profile`, resolving when the utterance ends.
    async fn speak(&self, text: &str, profile: &VoiceProfile) -> Result<(), SpeechError>;

    /// Stop any in-progress utterance. Safe to call when idle.
    fn cancel(&self);
}

/// Port for short non-speech attention cues.
///
/// `burst` must return without waiting for the tones to finish.
pub trait ToneGenerator: Send + Sync {
    fn burst(&self, burst: &ToneBurst) -> Result<(), ToneError>;
}

// =============================================================================
// Mock implementations
// =============================================================================

/// How `MockSynthesizer::speak` behaves.
#[derive(Debug, Clone, PartialEq)]
pub enum MockSpeech {
    /// Finish after yielding once.
    Complete,
    /// Finish after the given (tokio) time has passed.
    CompleteAfter(Duration),
    /// Fail with the given message.
    Fail(String),
    /// Never finish.
    Hang,
}

/// One recorded `speak` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpokenUtterance {
    pub text: String,
    pub profile: VoiceProfile,
}

#[derive(Debug)]
struct MockSynthState {
    available: AtomicBool,
    behavior: Mutex<MockSpeech>,
    spoken: Mutex<Vec<SpokenUtterance>>,
    cancels: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    voices: Vec<VoiceInfo>,
}

/// Mock speech synthesizer for testing.
///
/// Records every utterance and tracks how many `speak` calls are in flight
/// at once. Clones share state.
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    state: Arc<MockSynthState>,
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::with_behavior(MockSpeech::Complete)
    }

    pub fn with_behavior(behavior: MockSpeech) -> Self {
        Self {
            state: Arc::new(MockSynthState {
                available: AtomicBool::new(true),
                behavior: Mutex::new(behavior),
                spoken: Mutex::new(Vec::new()),
                cancels: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                voices: vec![
                    VoiceInfo::new("Mock Female", "en-US"),
                    VoiceInfo::new("Mock Male", "en-US"),
                ],
            }),
        }
    }

    /// A synthesizer that reports no speech support.
    pub fn unavailable() -> Self {
        let mock = Self::new();
        mock.state.available.store(false, Ordering::SeqCst);
        mock
    }

    pub fn set_behavior(&self, behavior: MockSpeech) {
        let mut guard = self
            .state
            .behavior
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = behavior;
    }

    pub fn set_available(&self, available: bool) {
        self.state.available.store(available, Ordering::SeqCst);
    }

    /// Every utterance passed to `speak`, in call order.
    pub fn spoken(&self) -> Vec<SpokenUtterance> {
        self.state
            .spoken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn speak_count(&self) -> usize {
        self.spoken().len()
    }

    pub fn cancel_count(&self) -> usize {
        self.state.cancels.load(Ordering::SeqCst)
    }

    /// `speak` calls currently in flight.
    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Highest number of `speak` calls ever in flight together.
    pub fn max_concurrent(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    fn behavior(&self) -> MockSpeech {
        self.state
            .behavior
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Decrements the in-flight counter even when the speak future is dropped.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn is_available(&self) -> bool {
        self.state.available.load(Ordering::SeqCst)
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.state.voices.clone()
    }

    async fn speak(&self, text: &str, profile: &VoiceProfile) -> Result<(), SpeechError> {
        if !self.is_available() {
            return Err(SpeechError::Unavailable("mock speech disabled".to_string()));
        }

        let now_active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(&self.state.active);
        self.state.max_active.fetch_max(now_active, Ordering::SeqCst);

        self.state
            .spoken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SpokenUtterance {
                text: text.to_string(),
                profile: profile.clone(),
            });
        tracing::debug!(text_len = text.len(), voice = %profile.voice, "Mock speech started");

        match self.behavior() {
            MockSpeech::Complete => {
                tokio::task::yield_now().await;
                Ok(())
            }
            MockSpeech::CompleteAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            MockSpeech::Fail(message) => Err(SpeechError::Failed(message)),
            MockSpeech::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn cancel(&self) {
        self.state.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock tone generator for testing.
///
/// Records every burst; can be switched into a failing mode.
#[derive(Debug, Clone, Default)]
pub struct MockToneGenerator {
    bursts: Arc<Mutex<Vec<ToneBurst>>>,
    failing: Arc<AtomicBool>,
}

impl MockToneGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose every burst fails.
    pub fn failing() -> Self {
        let mock = Self::default();
        mock.failing.store(true, Ordering::SeqCst);
        mock
    }

    pub fn bursts(&self) -> Vec<ToneBurst> {
        self.bursts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ToneGenerator for MockToneGenerator {
    fn burst(&self, burst: &ToneBurst) -> Result<(), ToneError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ToneError::DeviceUnavailable("mock tone device".to_string()));
        }
        self.bursts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(burst.clone());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shelfcall_core::config::ToneConfig;
    use shelfcall_core::types::Priority;

    #[tokio::test]
    async fn test_mock_synthesizer_records_utterances() {
        let synth = MockSynthesizer::new();
        let profile = VoiceProfile::default();

        synth.speak("first", &profile).await.unwrap();
        synth.speak("second", &profile).await.unwrap();

        let spoken = synth.spoken();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[0].text, "first");
        assert_eq!(spoken[1].profile, profile);
        assert_eq!(synth.active(), 0);
        assert_eq!(synth.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_mock_synthesizer_failure() {
        let synth = MockSynthesizer::with_behavior(MockSpeech::Fail("no audio".to_string()));
        let err = synth
            .speak("hello", &VoiceProfile::default())
            .await
            .unwrap_err();
        assert_eq!(err, SpeechError::Failed("no audio".to_string()));
        assert_eq!(synth.active(), 0);
    }

    #[tokio::test]
    async fn test_mock_synthesizer_unavailable() {
        let synth = MockSynthesizer::unavailable();
        assert!(!synth.is_available());
        let err = synth
            .speak("hello", &VoiceProfile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Unavailable(_)));
        assert_eq!(synth.speak_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_synthesizer_delay_uses_tokio_time() {
        let synth = MockSynthesizer::with_behavior(MockSpeech::CompleteAfter(Duration::from_secs(5)));
        let start = tokio::time::Instant::now();
        synth.speak("slow", &VoiceProfile::default()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_speak_releases_active_slot() {
        let synth = MockSynthesizer::with_behavior(MockSpeech::Hang);
        let profile = VoiceProfile::default();
        let result =
            tokio::time::timeout(Duration::from_secs(1), synth.speak("stuck", &profile)).await;
        assert!(result.is_err());
        assert_eq!(synth.active(), 0);
        assert_eq!(synth.speak_count(), 1);
    }

    #[test]
    fn test_mock_synthesizer_cancel_counts() {
        let synth = MockSynthesizer::new();
        synth.cancel();
        synth.cancel();
        assert_eq!(synth.cancel_count(), 2);
    }

    #[test]
    fn test_mock_tone_generator() {
        let tones = MockToneGenerator::new();
        let burst = ToneBurst::for_priority(Priority::High, &ToneConfig::default());
        tones.burst(&burst).unwrap();
        assert_eq!(tones.bursts(), vec![burst]);

        let broken = MockToneGenerator::failing();
        let burst = ToneBurst::for_priority(Priority::Low, &ToneConfig::default());
        assert!(broken.burst(&burst).is_err());
        assert!(broken.bursts().is_empty());
    }

    #[test]
    fn test_error_conversion() {
        let err: ShelfcallError = SpeechError::Failed("x".to_string()).into();
        assert!(matches!(err, ShelfcallError::Audio(_)));
        assert_eq!(err.to_string(), "Audio error: Speech synthesis failed: x");

        let err: ShelfcallError = ToneError::Failed("y".to_string()).into();
        assert_eq!(err.to_string(), "Audio error: Tone playback failed: y");
    }
}
