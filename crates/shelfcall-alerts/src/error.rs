//! Error types for the alert engine.

use shelfcall_core::error::ShelfcallError;
use uuid::Uuid;

/// Errors from starting an announcement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// Another announcement holds the speech channel.
    #[error("An announcement is already playing")]
    Busy,
    /// The host has no speech support.
    #[error("Speech synthesis unavailable: {0}")]
    SynthesisUnavailable(String),
    /// The synthesizer accepted the request but could not speak it.
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailure(String),
}

/// Errors from alert store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Alert not found: {0}")]
    NotFound(Uuid),
    #[error("Alert already exists: {0}")]
    Duplicate(Uuid),
}

/// Errors from the control surface.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Settings(#[from] ShelfcallError),
}

impl From<PlaybackError> for ShelfcallError {
    fn from(err: PlaybackError) -> Self {
        ShelfcallError::Playback(err.to_string())
    }
}

impl From<StoreError> for ShelfcallError {
    fn from(err: StoreError) -> Self {
        ShelfcallError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_error_display() {
        assert_eq!(
            PlaybackError::Busy.to_string(),
            "An announcement is already playing"
        );
        assert_eq!(
            PlaybackError::SynthesisUnavailable("no backend".to_string()).to_string(),
            "Speech synthesis unavailable: no backend"
        );
        assert_eq!(
            PlaybackError::SynthesisFailure("device lost".to_string()).to_string(),
            "Speech synthesis failed: device lost"
        );
    }

    #[test]
    fn test_store_error_preserves_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(
            StoreError::NotFound(id).to_string(),
            "Alert not found: 550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(
            StoreError::Duplicate(id).to_string(),
            "Alert already exists: 550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_conversions_into_shelfcall_error() {
        let err: ShelfcallError = PlaybackError::Busy.into();
        assert!(matches!(err, ShelfcallError::Playback(_)));

        let err: ShelfcallError = StoreError::NotFound(Uuid::new_v4()).into();
        assert!(matches!(err, ShelfcallError::Store(_)));
    }

    #[test]
    fn test_control_error_is_transparent() {
        let err: ControlError = PlaybackError::Busy.into();
        assert_eq!(err.to_string(), "An announcement is already playing");

        let id = Uuid::new_v4();
        let err: ControlError = StoreError::NotFound(id).into();
        assert!(matches!(err, ControlError::Store(StoreError::NotFound(_))));
    }
}
