//! Control surface for the voice alert engine.
//!
//! `VoiceAlertController` wires the store, playback engine, repeat policy and
//! scheduler together and exposes the operations a UI or CLI needs.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use shelfcall_audio::{SpeechSynthesizer, ToneError, ToneGenerator, VoiceInfo};
use shelfcall_core::error::Result;
use shelfcall_core::events::{AlertEvent, PlayOrigin};
use shelfcall_core::settings::{AlertSettings, SettingsHandle};
use shelfcall_core::types::{Alert, AlertType, Priority};

use crate::clock::{Clock, SystemClock};
use crate::error::{ControlError, PlaybackError, StoreError};
use crate::events::EventBus;
use crate::playback::{PlaybackEngine, PlaybackTicket};
use crate::repeat::RepeatPolicy;
use crate::scheduler::{Scheduler, TickOutcome};
use crate::store::AlertStore;

/// Subject used for free-text test announcements.
pub const TEST_SUBJECT: &str = "Test Product";

pub struct VoiceAlertController {
    store: Arc<AlertStore>,
    settings: SettingsHandle,
    engine: PlaybackEngine,
    repeat: RepeatPolicy,
    scheduler: Scheduler,
    events: EventBus,
}

impl VoiceAlertController {
    /// Build a controller on the host clock.
    pub fn new(
        settings: AlertSettings,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        tones: Arc<dyn ToneGenerator>,
    ) -> Result<Self> {
        Self::with_clock(settings, synthesizer, tones, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: AlertSettings,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        tones: Arc<dyn ToneGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        settings.validate()?;
        let store = Arc::new(AlertStore::new(settings.max_repeats));
        let settings = SettingsHandle::new(settings);
        let events = EventBus::new();
        let repeat = RepeatPolicy::new(store.clone(), settings.clone(), events.clone());
        let engine = PlaybackEngine::new(
            synthesizer,
            tones,
            store.clone(),
            repeat.clone(),
            settings.clone(),
            events.clone(),
        );
        let scheduler = Scheduler::new(
            store.clone(),
            engine.clone(),
            settings.clone(),
            clock,
            events.clone(),
        );

        Ok(Self {
            store,
            settings,
            engine,
            repeat,
            scheduler,
            events,
        })
    }

    /// Start the periodic timer if announcements are enabled.
    pub fn start(&self) {
        if self.settings.snapshot().enabled {
            self.scheduler.resume();
        } else {
            tracing::info!("Voice alerts disabled; scheduler not started");
        }
    }

    /// Stop the timer, any in-flight announcement and pending repeats.
    pub fn shutdown(&self) {
        self.scheduler.stop();
        self.engine.stop();
        self.repeat.cancel_all();
        tracing::info!("Voice alert controller shut down");
    }

    pub fn add_alert(&self, alert: Alert) -> std::result::Result<(), StoreError> {
        self.store.add(alert)
    }

    pub fn enable(&self) {
        tracing::info!("Voice alerts enabled");
        self.scheduler.enable();
    }

    pub fn disable(&self) {
        tracing::info!("Voice alerts disabled");
        self.scheduler.disable();
    }

    pub fn settings(&self) -> Arc<AlertSettings> {
        self.settings.snapshot()
    }

    /// Install a new settings snapshot.
    ///
    /// An invalid snapshot is rejected whole and the previous one stays in
    /// effect. Turning announcements off behaves like `disable`; turning them
    /// on or changing the poll interval restarts the timer.
    pub fn update_settings(&self, next: AlertSettings) -> Result<()> {
        let previous = match self.settings.replace(next) {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(error = %e, "Settings update rejected");
                self.events.publish(AlertEvent::SettingsRejected {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        };
        let current = self.settings.snapshot();
        self.store.set_repeat_limit(current.max_repeats);

        tracing::info!(
            enabled = current.enabled,
            poll_interval_minutes = current.poll_interval_minutes,
            max_repeats = current.max_repeats,
            "Settings updated"
        );
        self.events.publish(AlertEvent::SettingsUpdated {
            enabled: current.enabled,
            poll_interval_minutes: current.poll_interval_minutes,
            max_repeats: current.max_repeats,
            timestamp: Utc::now(),
        });

        if !current.enabled {
            if previous.enabled {
                self.scheduler.halt();
            }
        } else if !previous.enabled
            || previous.poll_interval_minutes != current.poll_interval_minutes
            || !self.scheduler.is_running()
        {
            self.scheduler.resume();
        }
        Ok(())
    }

    /// Announce a free-text message outside the store.
    ///
    /// Works even when announcements are disabled, but still respects the
    /// single speech slot.
    pub fn test_play(&self, message: &str) -> std::result::Result<PlaybackTicket, PlaybackError> {
        let settings = self.settings.snapshot();
        let message_alert = Alert::new(TEST_SUBJECT, AlertType::LowStock, Priority::Medium, message)
            .with_sound_effect(settings.sound_effects_enabled);
        tracing::info!("Test announcement requested");
        self.engine
            .play(&message_alert, &settings.default_voice_profile, PlayOrigin::Test)
    }

    /// Announce one stored alert now, whether or not it is pending.
    pub fn play_alert(&self, id: Uuid) -> std::result::Result<PlaybackTicket, ControlError> {
        let alert = self.store.get(id).ok_or(StoreError::NotFound(id))?;
        let settings = self.settings.snapshot();
        let profile = alert.effective_profile(&settings.default_voice_profile);
        Ok(self.engine.play(&alert, profile, PlayOrigin::Manual)?)
    }

    pub fn preview_tone(&self, priority: Priority) -> std::result::Result<(), ToneError> {
        self.engine.preview_tone(priority)
    }

    /// Stop the in-flight announcement. Returns `false` when idle.
    pub fn stop_current(&self) -> bool {
        self.engine.stop()
    }

    /// Mark everything played and drop pending repeats.
    ///
    /// An announcement already in flight finishes speaking but is neither
    /// counted nor repeated.
    pub fn mark_all_played(&self) -> usize {
        self.repeat.cancel_all();
        let count = self.store.mark_all_played();
        tracing::info!(count, "All alerts marked played");
        count
    }

    /// Make every alert pending again with a zero repeat counter.
    ///
    /// Pending repeats are dropped and an announcement in flight is not
    /// counted.
    pub fn reset_all(&self) {
        self.repeat.cancel_all();
        self.store.reset_all();
        tracing::info!("All alerts reset");
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_announcing()
    }

    pub fn currently_playing_id(&self) -> Option<Uuid> {
        self.engine.current_alert_id()
    }

    pub fn pending_count(&self) -> usize {
        self.store.pending_count()
    }

    pub fn critical_pending_count(&self) -> usize {
        self.store.critical_pending_count()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.store.alerts()
    }

    pub fn get_alert(&self, id: Uuid) -> Option<Alert> {
        self.store.get(id)
    }

    pub fn available_voices(&self) -> Vec<VoiceInfo> {
        self.engine.available_voices()
    }

    pub fn is_speech_available(&self) -> bool {
        self.engine.is_speech_available()
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    /// Run one scheduler tick immediately.
    pub fn tick_now(&self) -> TickOutcome {
        self.scheduler.tick()
    }
}

impl Drop for VoiceAlertController {
    fn drop(&mut self) {
        self.scheduler.stop();
        self.repeat.cancel_all();
    }
}
