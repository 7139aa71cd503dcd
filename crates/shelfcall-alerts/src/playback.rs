//! Playback engine: turns one alert into a tone burst followed by speech.
//!
//! The engine owns the single speech slot. A play request either claims the
//! slot or is refused with `PlaybackError::Busy`; it never queues. Speech runs
//! on a spawned task so callers get a `PlaybackTicket` back immediately.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::oneshot;
use uuid::Uuid;

use shelfcall_audio::{SpeechError, SpeechSynthesizer, ToneBurst, ToneError, ToneGenerator, VoiceInfo};
use shelfcall_core::events::{AlertEvent, PlayOrigin};
use shelfcall_core::settings::SettingsHandle;
use shelfcall_core::types::{Alert, Priority, VoiceProfile};

use crate::error::PlaybackError;
use crate::events::EventBus;
use crate::repeat::RepeatPolicy;
use crate::state::{PlaybackSlot, PlaybackState};
use crate::store::AlertStore;

/// How an announcement ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Speech finished. Carries the alert's repeat counter after recording
    /// the play (zero for test messages).
    Completed { repeat_count: u32 },
    /// Speech failed; the alert stays pending.
    Failed(String),
    /// The announcement was stopped before it finished.
    Cancelled,
}

/// Handle to a started announcement.
#[derive(Debug)]
pub struct PlaybackTicket {
    alert_id: Uuid,
    outcome: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackTicket {
    pub fn alert_id(&self) -> Uuid {
        self.alert_id
    }

    /// Wait for the announcement to end.
    pub async fn wait(self) -> PlaybackOutcome {
        self.outcome.await.unwrap_or(PlaybackOutcome::Cancelled)
    }
}

struct EngineShared {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    tones: Arc<dyn ToneGenerator>,
    store: Arc<AlertStore>,
    repeat: RepeatPolicy,
    settings: SettingsHandle,
    events: EventBus,
    slot: Mutex<PlaybackSlot>,
}

#[derive(Clone)]
pub struct PlaybackEngine {
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("state", &self.state())
            .field("current", &self.current_alert_id())
            .finish()
    }
}

impl PlaybackEngine {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        tones: Arc<dyn ToneGenerator>,
        store: Arc<AlertStore>,
        repeat: RepeatPolicy,
        settings: SettingsHandle,
        events: EventBus,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                synthesizer,
                tones,
                store,
                repeat,
                settings,
                events,
                slot: Mutex::new(PlaybackSlot::new()),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, PlaybackSlot> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> PlaybackState {
        self.slot().state()
    }

    pub fn is_announcing(&self) -> bool {
        self.state() == PlaybackState::Announcing
    }

    pub fn current_alert_id(&self) -> Option<Uuid> {
        self.slot().current()
    }

    pub fn is_speech_available(&self) -> bool {
        self.shared.synthesizer.is_available()
    }

    pub fn available_voices(&self) -> Vec<VoiceInfo> {
        self.shared.synthesizer.voices()
    }

    /// Start announcing `alert` with `profile`.
    ///
    /// Plays the priority tone burst first when both the alert and the
    /// settings allow it; a tone failure is logged and speech goes ahead.
    /// Must be called from within a Tokio runtime.
    pub fn play(
        &self,
        alert: &Alert,
        profile: &VoiceProfile,
        origin: PlayOrigin,
    ) -> Result<PlaybackTicket, PlaybackError> {
        let mut slot = self.slot();
        if slot.state() == PlaybackState::Announcing {
            tracing::debug!(alert_id = %alert.id, ?origin, "Announcement refused: busy");
            return Err(PlaybackError::Busy);
        }
        if !self.shared.synthesizer.is_available() {
            tracing::warn!(alert_id = %alert.id, "Speech synthesis unavailable");
            return Err(PlaybackError::SynthesisUnavailable(
                "speech synthesizer reports no support".to_string(),
            ));
        }
        let generation = slot.begin(alert.id)?;
        let epoch = self.shared.store.epoch();

        tracing::info!(
            alert_id = %alert.id,
            priority = %alert.priority,
            ?origin,
            subject = %alert.subject,
            "Announcement started"
        );
        self.shared.events.publish(AlertEvent::AnnouncementStarted {
            alert_id: alert.id,
            priority: alert.priority,
            origin,
            timestamp: Utc::now(),
        });

        let settings = self.shared.settings.snapshot();
        if alert.sound_effect_enabled && settings.sound_effects_enabled {
            let burst = ToneBurst::for_priority(alert.priority, &settings.tone);
            if let Err(e) = self.shared.tones.burst(&burst) {
                tracing::warn!(alert_id = %alert.id, error = %e, "Tone burst failed");
            }
        }

        let (tx, rx) = oneshot::channel();
        let engine = self.clone();
        let alert_id = alert.id;
        let text = alert.spoken_text().to_string();
        let profile = profile.clone();
        let handle = tokio::spawn(async move {
            let result = engine.shared.synthesizer.speak(&text, &profile).await;
            let outcome = engine.finish(generation, epoch, alert_id, origin, result);
            let _ = tx.send(outcome);
        });
        slot.attach(generation, handle.abort_handle());

        Ok(PlaybackTicket {
            alert_id,
            outcome: rx,
        })
    }

    /// Record the end of announcement `generation`, started under store
    /// `epoch`. A play that overlapped `mark_all_played` or `reset_all` is
    /// not recorded and never repeats.
    fn finish(
        &self,
        generation: u64,
        epoch: u64,
        alert_id: Uuid,
        origin: PlayOrigin,
        result: Result<(), SpeechError>,
    ) -> PlaybackOutcome {
        let mut slot = self.slot();
        if slot.finish(generation).is_none() {
            return PlaybackOutcome::Cancelled;
        }

        match result {
            Ok(()) => {
                // Recorded before the slot is released so no tick can pick
                // this alert again in between.
                let played = match origin {
                    PlayOrigin::Test => None,
                    PlayOrigin::Scheduled | PlayOrigin::Manual => {
                        match self.shared.store.mark_played_since(alert_id, epoch) {
                            Ok(Some(alert)) => Some(alert),
                            Ok(None) => {
                                tracing::debug!(alert_id = %alert_id, "Alert resolved during announcement");
                                None
                            }
                            Err(e) => {
                                tracing::warn!(alert_id = %alert_id, error = %e, "Played alert left the store");
                                None
                            }
                        }
                    }
                };
                drop(slot);

                let repeat_count = match (&played, origin) {
                    (Some(alert), _) => alert.repeat_count,
                    (None, PlayOrigin::Test) => 0,
                    (None, _) => self
                        .shared
                        .store
                        .get(alert_id)
                        .map(|a| a.repeat_count)
                        .unwrap_or(0),
                };
                tracing::info!(alert_id = %alert_id, repeat_count, "Announcement completed");
                self.shared.events.publish(AlertEvent::AnnouncementCompleted {
                    alert_id,
                    origin,
                    repeat_count,
                    timestamp: Utc::now(),
                });
                if let Some(alert) = played {
                    self.shared.repeat.after_play(&alert, epoch);
                }
                PlaybackOutcome::Completed { repeat_count }
            }
            Err(e) => {
                drop(slot);
                let reason = e.to_string();
                tracing::warn!(alert_id = %alert_id, error = %reason, "Announcement failed");
                self.shared.events.publish(AlertEvent::AnnouncementFailed {
                    alert_id,
                    origin,
                    reason: reason.clone(),
                    timestamp: Utc::now(),
                });
                PlaybackOutcome::Failed(reason)
            }
        }
    }

    /// Stop the in-flight announcement. Returns `false` when idle.
    ///
    /// The stopped alert is not marked played.
    pub fn stop(&self) -> bool {
        let mut slot = self.slot();
        let Some(alert_id) = slot.cancel() else {
            return false;
        };
        self.shared.synthesizer.cancel();
        drop(slot);

        tracing::info!(alert_id = %alert_id, "Announcement stopped");
        self.shared.events.publish(AlertEvent::AnnouncementCancelled {
            alert_id,
            timestamp: Utc::now(),
        });
        true
    }

    /// Play the tone burst for `priority` on its own, outside the speech slot.
    pub fn preview_tone(&self, priority: Priority) -> Result<(), ToneError> {
        let settings = self.shared.settings.snapshot();
        let burst = ToneBurst::for_priority(priority, &settings.tone);
        tracing::debug!(%priority, "Tone preview");
        self.shared.tones.burst(&burst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use shelfcall_audio::{MockSpeech, MockSynthesizer, MockToneGenerator};
    use shelfcall_core::settings::AlertSettings;
    use shelfcall_core::types::AlertType;

    struct Harness {
        engine: PlaybackEngine,
        store: Arc<AlertStore>,
        synth: MockSynthesizer,
        tones: MockToneGenerator,
        events: EventBus,
    }

    fn harness(settings: AlertSettings, behavior: MockSpeech) -> Harness {
        let store = Arc::new(AlertStore::new(settings.max_repeats));
        let handle = SettingsHandle::new(settings);
        let events = EventBus::new();
        let repeat = RepeatPolicy::new(store.clone(), handle.clone(), events.clone());
        let synth = MockSynthesizer::with_behavior(behavior);
        let tones = MockToneGenerator::new();
        let engine = PlaybackEngine::new(
            Arc::new(synth.clone()),
            Arc::new(tones.clone()),
            store.clone(),
            repeat,
            handle,
            events.clone(),
        );
        Harness {
            engine,
            store,
            synth,
            tones,
            events,
        }
    }

    fn stored(h: &Harness, priority: Priority) -> Alert {
        let alert = Alert::new("Red Peppers", AlertType::LowStock, priority, "Red peppers are low");
        h.store.add(alert.clone()).unwrap();
        alert
    }

    #[tokio::test]
    async fn test_play_marks_alert_played() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        let alert = stored(&h, Priority::High);

        let ticket = h
            .engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Scheduled)
            .unwrap();
        assert_eq!(ticket.alert_id(), alert.id);
        assert!(h.engine.is_announcing());

        assert_eq!(ticket.wait().await, PlaybackOutcome::Completed { repeat_count: 1 });
        assert!(!h.engine.is_announcing());
        assert!(!h.store.get(alert.id).unwrap().is_pending());
        assert_eq!(h.synth.spoken()[0].text, "Red peppers are low");
    }

    #[tokio::test]
    async fn test_tone_precedes_speech() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        let alert = stored(&h, Priority::Critical);
        let ticket = h
            .engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Manual)
            .unwrap();
        assert_eq!(h.tones.bursts().len(), 1);
        assert_eq!(h.tones.bursts()[0].frequencies_hz, vec![800.0, 1000.0, 1200.0]);
        ticket.wait().await;
    }

    #[tokio::test]
    async fn test_tone_skipped_when_settings_disable_it() {
        let settings = AlertSettings {
            sound_effects_enabled: false,
            ..AlertSettings::default()
        };
        let h = harness(settings, MockSpeech::Complete);
        let alert = stored(&h, Priority::Critical);
        h.engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Manual)
            .unwrap()
            .wait()
            .await;
        assert!(h.tones.bursts().is_empty());
        assert_eq!(h.synth.speak_count(), 1);
    }

    #[tokio::test]
    async fn test_tone_skipped_when_alert_disables_it() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        let quiet = Alert::new("Milk", AlertType::Expiring, Priority::Medium, "Milk expires")
            .with_sound_effect(false);
        h.store.add(quiet.clone()).unwrap();
        h.engine
            .play(&quiet, &VoiceProfile::default(), PlayOrigin::Manual)
            .unwrap()
            .wait()
            .await;
        assert!(h.tones.bursts().is_empty());
    }

    #[tokio::test]
    async fn test_tone_failure_does_not_block_speech() {
        let store = Arc::new(AlertStore::new(3));
        let handle = SettingsHandle::default();
        let events = EventBus::new();
        let synth = MockSynthesizer::new();
        let engine = PlaybackEngine::new(
            Arc::new(synth.clone()),
            Arc::new(MockToneGenerator::failing()),
            store.clone(),
            RepeatPolicy::new(store.clone(), handle.clone(), events.clone()),
            handle,
            events,
        );
        let alert = Alert::new("Hats", AlertType::Reorder, Priority::High, "Reorder hats");
        store.add(alert.clone()).unwrap();

        let outcome = engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Scheduled)
            .unwrap()
            .wait()
            .await;
        assert_eq!(outcome, PlaybackOutcome::Completed { repeat_count: 1 });
        assert_eq!(synth.speak_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_play_is_busy() {
        let h = harness(
            AlertSettings::default(),
            MockSpeech::CompleteAfter(Duration::from_secs(5)),
        );
        let first = stored(&h, Priority::Low);
        let second = stored(&h, Priority::Critical);

        let ticket = h
            .engine
            .play(&first, &VoiceProfile::default(), PlayOrigin::Scheduled)
            .unwrap();
        let err = h
            .engine
            .play(&second, &VoiceProfile::default(), PlayOrigin::Manual)
            .unwrap_err();
        assert_eq!(err, PlaybackError::Busy);
        assert_eq!(h.engine.current_alert_id(), Some(first.id));

        ticket.wait().await;
        assert!(h.store.get(second.id).unwrap().is_pending());
        assert_eq!(h.synth.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_synthesizer_refuses() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        h.synth.set_available(false);
        let alert = stored(&h, Priority::High);

        let err = h
            .engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Scheduled)
            .unwrap_err();
        assert!(matches!(err, PlaybackError::SynthesisUnavailable(_)));
        assert!(!h.engine.is_announcing());
        assert!(h.tones.bursts().is_empty());
    }

    #[tokio::test]
    async fn test_speech_failure_leaves_alert_pending() {
        let h = harness(
            AlertSettings::default(),
            MockSpeech::Fail("audio device lost".to_string()),
        );
        let mut rx = h.events.subscribe();
        let alert = stored(&h, Priority::High);

        let outcome = h
            .engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Scheduled)
            .unwrap()
            .wait()
            .await;
        assert!(matches!(outcome, PlaybackOutcome::Failed(ref m) if m.contains("audio device lost")));
        assert!(!h.engine.is_announcing());
        let stored = h.store.get(alert.id).unwrap();
        assert!(stored.is_pending());
        assert_eq!(stored.repeat_count, 0);

        assert_eq!(rx.recv().await.unwrap().event_name(), "announcement_started");
        assert_eq!(rx.recv().await.unwrap().event_name(), "announcement_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_without_marking() {
        let h = harness(AlertSettings::default(), MockSpeech::Hang);
        let alert = stored(&h, Priority::Critical);

        let ticket = h
            .engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Scheduled)
            .unwrap();
        tokio::task::yield_now().await;

        assert!(h.engine.stop());
        assert!(!h.engine.is_announcing());
        assert_eq!(h.synth.cancel_count(), 1);
        assert_eq!(ticket.wait().await, PlaybackOutcome::Cancelled);
        assert!(h.store.get(alert.id).unwrap().is_pending());
        assert!(!h.engine.stop());
    }

    #[tokio::test]
    async fn test_test_origin_does_not_touch_store() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        let message_alert = Alert::new("Test Product", AlertType::LowStock, Priority::Medium, "hello");

        let outcome = h
            .engine
            .play(&message_alert, &VoiceProfile::default(), PlayOrigin::Test)
            .unwrap()
            .wait()
            .await;
        assert_eq!(outcome, PlaybackOutcome::Completed { repeat_count: 0 });
        assert!(h.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_completion_schedules_repeat() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        let alert = stored(&h, Priority::Critical);

        h.engine
            .play(&alert, &VoiceProfile::default(), PlayOrigin::Scheduled)
            .unwrap()
            .wait()
            .await;
        assert!(!h.store.get(alert.id).unwrap().is_pending());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(h.store.get(alert.id).unwrap().is_pending());
    }

    #[test]
    fn test_preview_tone_uses_priority_frequencies() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        h.engine.preview_tone(Priority::Low).unwrap();
        assert_eq!(h.tones.bursts()[0].frequencies_hz, vec![300.0, 400.0]);
        assert!(!h.engine.is_announcing());
    }

    #[test]
    fn test_available_voices() {
        let h = harness(AlertSettings::default(), MockSpeech::Complete);
        assert_eq!(h.engine.available_voices().len(), 2);
        assert!(h.engine.is_speech_available());
    }
}
