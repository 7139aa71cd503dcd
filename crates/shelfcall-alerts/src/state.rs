//! Playback state machine.
//!
//! The speech channel is either idle or announcing one alert:
//! - Idle -> Announcing (announcement started)
//! - Announcing -> Idle (speech finished, failed, or was stopped)
//!
//! Each announcement gets a generation number so a late completion from a
//! stopped announcement cannot release a newer one.

use std::fmt;

use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::error::PlaybackError;

/// Operational state of the speech channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Idle,
    Announcing,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Announcing => write!(f, "Announcing"),
        }
    }
}

impl PlaybackState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &PlaybackState) -> bool {
        matches!(
            (self, target),
            (PlaybackState::Idle, PlaybackState::Announcing)
                | (PlaybackState::Announcing, PlaybackState::Idle)
        )
    }
}

/// The single speech slot. Guarded by the engine's mutex.
#[derive(Debug)]
pub(crate) struct PlaybackSlot {
    state: PlaybackState,
    current: Option<Uuid>,
    generation: u64,
    task: Option<AbortHandle>,
}

impl PlaybackSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            current: None,
            generation: 0,
            task: None,
        }
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.state
    }

    pub(crate) fn current(&self) -> Option<Uuid> {
        self.current
    }

    /// Claim the slot for `alert_id`. Returns the announcement's generation.
    pub(crate) fn begin(&mut self, alert_id: Uuid) -> Result<u64, PlaybackError> {
        if !self.state.can_transition_to(&PlaybackState::Announcing) {
            return Err(PlaybackError::Busy);
        }
        self.generation = self.generation.wrapping_add(1);
        self.state = PlaybackState::Announcing;
        self.current = Some(alert_id);
        self.task = None;
        Ok(self.generation)
    }

    /// Attach the speech task so `cancel` can abort it.
    pub(crate) fn attach(&mut self, generation: u64, task: AbortHandle) {
        if self.owns(generation) {
            self.task = Some(task);
        } else {
            task.abort();
        }
    }

    /// Whether `generation` is the announcement currently holding the slot.
    pub(crate) fn owns(&self, generation: u64) -> bool {
        self.state == PlaybackState::Announcing && self.generation == generation
    }

    /// Release the slot at the end of announcement `generation`.
    ///
    /// Returns `None` when that announcement was already stopped.
    pub(crate) fn finish(&mut self, generation: u64) -> Option<Uuid> {
        if !self.owns(generation) {
            return None;
        }
        self.state = PlaybackState::Idle;
        self.task = None;
        self.current.take()
    }

    /// Release the slot from outside, aborting the speech task.
    ///
    /// Returns the alert that was announcing, or `None` when idle.
    pub(crate) fn cancel(&mut self) -> Option<Uuid> {
        if self.state == PlaybackState::Idle {
            return None;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state = PlaybackState::Idle;
        self.current.take()
    }
}
