use std::time::Duration;

use thiserror::Error;

/// Failures reported by the browser engine behind a [`crate::page::Page`].
#[derive(Debug, Clone, Error)]
pub enum PageError {
    /// The script-evaluation context was torn down, usually by a navigation.
    #[error("execution context was destroyed: {0}")]
    ContextDestroyed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The page script threw.
    #[error("page script failed: {0}")]
    Script(String),

    /// The page script returned something the worker cannot decode.
    #[error("unexpected page script result: {0}")]
    Protocol(String),

    #[error("browser error: {0}")]
    Engine(String),
}

impl PageError {
    pub fn is_context_destroyed(&self) -> bool {
        matches!(self, PageError::ContextDestroyed(_))
    }
}

/// Per-command failures. The `Display` output is what the controller sees
/// in the `message` field of an error response.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Element not found")]
    ElementNotFound,

    #[error("No visible inputs found on page")]
    NoInputAvailable,

    #[error(transparent)]
    Page(#[from] PageError),

    #[error("worker task failed: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        WorkerError::MalformedCommand(reason.into())
    }
}
