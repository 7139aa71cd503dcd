pub mod config;
pub mod error;
pub mod events;
pub mod settings;
pub mod types;

pub use config::ShelfcallConfig;
pub use error::{Result, ShelfcallError};
pub use events::{AlertEvent, PlayOrigin, SkipReason};
pub use settings::{ActiveHours, AlertSettings, SettingsHandle};
pub use types::*;
