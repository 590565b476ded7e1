//! Error types for weft.

use crate::notify::NotifyError;
use crate::object::ObjectError;

/// The main error type for weft operations.
#[derive(Debug, thiserror::Error)]
pub enum WeftError {
    /// Object-related error.
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),
    /// Notification wiring error.
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
    /// Window-related error.
    #[error("Window error: {0}")]
    Window(#[from] WindowError),
    /// Display backend error.
    #[error("Display error: {0}")]
    Display(#[from] DisplayError),
    /// Timer-related error.
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),
    /// A window or setup hook failed while the application was being wired up.
    #[error("Setup of '{name}' failed: {message}")]
    Setup {
        /// Name of the window or hook that failed.
        name: String,
        /// Description of the failure.
        message: String,
    },
    /// `run()` was called while the main loop is already running or has finished.
    #[error("The main loop has already been started")]
    AlreadyStarted,
}

impl WeftError {
    /// Create a setup error.
    pub fn setup(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Window-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// The window ID is invalid or the window has been removed.
    #[error("Invalid or removed window ID")]
    InvalidWindowId,
    /// The operation requires an open window.
    #[error("Window is not open")]
    NotOpen,
}

/// Display backend errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayError {
    /// The backend failed to create a surface for a window.
    #[error("Failed to open surface: {0}")]
    OpenFailed(String),
    /// The backend has shut down and can no longer deliver input.
    #[error("Display has been disconnected")]
    Disconnected,
}

/// Timer-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// The timer ID is invalid or has already been removed.
    #[error("Invalid or expired timer ID")]
    InvalidTimerId,
}

/// A specialized Result type for weft operations.
pub type Result<T> = std::result::Result<T, WeftError>;
