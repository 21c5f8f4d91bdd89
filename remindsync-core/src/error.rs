//! Error types for remindsync.

use thiserror::Error;

/// Errors that can occur while authorizing, reading or syncing.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Access to calendars and reminders was not granted")]
    PermissionDenied,

    #[error("Could not read from provider: {0}")]
    ProviderRead(String),

    #[error("Could not create reminder list '{calendar}': {reason}")]
    TaskListCreate { calendar: String, reason: String },

    #[error("Could not delete reminder {task}: {reason}")]
    TaskDelete { task: String, reason: String },

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Calendar colors still unavailable after {attempts} attempts")]
    ColorResolutionTimeout { attempts: u32 },

    #[error("A sync run is already in progress")]
    AlreadyRunning,

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH. Install remindsync-provider-{0} and try again")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot handle {event} while {from}")]
    InvalidTransition { from: String, event: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for remindsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
