use std::time::Duration;

use serde_json::Value;

use crate::dom::Script;
use crate::error::PageError;

/// The single browser page the worker drives.
///
/// Implementations are blocking. The command loop calls them from a
/// blocking task and never from two commands at once.
pub trait Page: Send + Sync {
    /// Loads `url` and returns once the new document can be queried.
    fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// Runs one of the worker's page scripts and returns its decoded value.
    fn evaluate(&self, script: &Script) -> Result<Value, PageError>;

    /// Waits for the current document to reach DOMContentLoaded.
    /// Returns [`PageError::Timeout`] once `timeout` has elapsed.
    fn wait_for_dom_content_loaded(&self, timeout: Duration) -> Result<(), PageError>;

    fn pause(&self, duration: Duration);

    fn current_url(&self) -> String;
}
