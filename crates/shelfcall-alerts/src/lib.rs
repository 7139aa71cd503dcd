//! shelfcall alerts crate - scheduling, playback and repeat policy for
//! spoken inventory alerts.

pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod picker;
pub mod playback;
pub mod repeat;
pub mod scheduler;
pub mod state;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{VoiceAlertController, TEST_SUBJECT};
pub use error::{ControlError, PlaybackError, StoreError};
pub use events::EventBus;
pub use playback::{PlaybackEngine, PlaybackOutcome, PlaybackTicket};
pub use repeat::RepeatPolicy;
pub use scheduler::{Scheduler, TickOutcome};
pub use state::PlaybackState;
pub use store::AlertStore;
