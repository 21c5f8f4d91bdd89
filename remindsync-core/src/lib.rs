//! Core library for remindsync.
//!
//! Mirrors upcoming calendar events into reminder lists:
//! - `source` reads events for a window and discovers their calendars
//! - `selection` narrows events to the calendars a user picked
//! - `engine` replaces each calendar's reminder list with one reminder per event
//! - `session` ties authorization, loading and syncing into one state machine
//!
//! Storage lives behind the `provider::Provider` trait.

pub mod cancel;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod model;
pub mod provider;
pub mod selection;
pub mod session;
pub mod source;
pub mod window;

pub use cancel::CancelToken;
pub use engine::{CalendarFailure, CalendarOutcome, SyncEngine, SyncReport};
pub use error::{SyncError, SyncResult};
pub use model::*;
pub use selection::Selection;
pub use session::{Session, SessionState};
pub use window::SyncWindow;
