//! The Chrome side of the worker: launching or attaching to a browser and
//! exposing its tab as a [`Page`].

use std::ffi::OsStr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::dom::{Script, ScriptOutcome};
use crate::error::PageError;
use crate::page::Page;

/// Also the tab's default timeout, so it bounds every single CDP call.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Gap between `document.readyState` reads in
/// [`ChromePage::wait_for_dom_content_loaded`]. The deadline is only checked
/// between reads: one read that hangs is bounded by [`NAVIGATION_TIMEOUT`],
/// not by the caller's load timeout, so a wait can overrun by up to that much.
const READY_STATE_POLL: Duration = Duration::from_millis(50);
/// The controller may sit idle for a long time between commands.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// CDP messages that mean the document was swapped under a running script.
const CONTEXT_DESTROYED_MARKERS: [&str; 3] = [
    "Execution context was destroyed",
    "Cannot find context with specified id",
    "Inspected target navigated or closed",
];

/// The browser process and the one tab the worker drives. Created once at
/// startup and closed once at shutdown.
pub struct BrowserSession {
    browser: Browser,
    page: Arc<ChromePage>,
}

impl BrowserSession {
    pub fn launch(config: &Config) -> Result<Self> {
        if let Some(endpoint) = &config.attach {
            return Self::attach(endpoint);
        }

        let profile = config.profile_dir();
        if let Some(dir) = &profile {
            std::fs::create_dir_all(dir)?;
            info!(profile = %dir.display(), "using browser profile");
        }

        let options = LaunchOptions {
            headless: config.headless,
            path: config.chrome_path.clone(),
            user_data_dir: profile,
            window_size: Some((config.window_size.width, config.window_size.height)),
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
                OsStr::new("--disable-infobars"),
            ],
            idle_browser_timeout: IDLE_BROWSER_TIMEOUT,
            ..Default::default()
        };

        info!(headless = config.headless, "launching Chrome");
        let browser =
            Browser::new(options).map_err(|e| anyhow!("Browser launch failed: {e}"))?;
        let tab = browser.new_tab()?;
        tab.navigate_to("about:blank")?;
        info!("Chrome ready");

        Ok(Self {
            browser,
            page: Arc::new(ChromePage::new(tab)),
        })
    }

    /// Reuses the first tab of an already running Chrome.
    fn attach(endpoint: &str) -> Result<Self> {
        info!(%endpoint, "attaching to running Chrome");
        let browser = Browser::connect_with_timeout(endpoint.to_string(), IDLE_BROWSER_TIMEOUT)
            .map_err(|e| anyhow!("Could not attach to {endpoint}: {e}"))?;

        let existing = {
            let tabs = browser.get_tabs();
            let tabs = tabs.lock().map_err(|_| anyhow!("browser tab list is poisoned"))?;
            tabs.first().cloned()
        };
        let tab = match existing {
            Some(tab) => {
                info!("using existing tab");
                tab
            }
            None => {
                info!("no tabs found, creating one");
                browser.new_tab()?
            }
        };

        Ok(Self {
            browser,
            page: Arc::new(ChromePage::new(tab)),
        })
    }

    pub fn page(&self) -> Arc<dyn Page> {
        self.page.clone()
    }

    /// Closes a launched browser; an attached one is only disconnected.
    pub fn close(self) {
        info!("closing browser session");
        drop(self.page);
        drop(self.browser);
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        tab.set_default_timeout(NAVIGATION_TIMEOUT);
        Self { tab }
    }

    fn ready_state(&self) -> Result<String, PageError> {
        let result = self
            .tab
            .evaluate("document.readyState", false)
            .map_err(classify)?;
        Ok(result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default())
    }
}

impl Page for ChromePage {
    /// Returns once the new document fires `DOMContentLoaded`, without
    /// waiting for the network to go quiet.
    fn navigate(&self, url: &str) -> Result<(), PageError> {
        let (fired, dom_content_loaded) = mpsc::channel();
        let listener = self
            .tab
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageDomContentEventFired(_) = event {
                    let _ = fired.send(());
                }
            }))
            .map_err(|e| PageError::Engine(format!("{e:#}")))?;

        let outcome = self
            .tab
            .navigate_to(url)
            .map_err(|e| PageError::Navigation(format!("{e:#}")))
            .and_then(|_| {
                match await_signal(&dom_content_loaded, NAVIGATION_TIMEOUT) {
                    Err(PageError::Timeout(waited)) => {
                        // Same-document navigations never fire the event.
                        match self.ready_state() {
                            Ok(state) if state == "interactive" || state == "complete" => {
                                debug!(%url, %state, "no DOMContentLoaded, document already usable");
                                Ok(())
                            }
                            _ => Err(PageError::Navigation(format!(
                                "DOMContentLoaded not fired within {waited:?}"
                            ))),
                        }
                    }
                    other => other,
                }
            });

        if let Err(err) = self.tab.remove_event_listener(&listener) {
            debug!(error = %format!("{err:#}"), "failed to remove load listener");
        }
        outcome
    }

    fn evaluate(&self, script: &Script) -> Result<Value, PageError> {
        let result = self
            .tab
            .evaluate(&script.source(), false)
            .map_err(classify)?;
        let raw = result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| PageError::Protocol("script did not return a JSON string".into()))?;
        let outcome: ScriptOutcome =
            serde_json::from_str(&raw).map_err(|e| PageError::Protocol(e.to_string()))?;
        outcome.into_result()
    }

    fn wait_for_dom_content_loaded(&self, timeout: Duration) -> Result<(), PageError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.ready_state() {
                Ok(state) if state == "interactive" || state == "complete" => return Ok(()),
                Ok(_) => {}
                Err(PageError::ContextDestroyed(reason)) => {
                    debug!(%reason, "document swapped while waiting for load");
                }
                Err(err) => return Err(err),
            }
            if Instant::now() >= deadline {
                return Err(PageError::Timeout(timeout));
            }
            std::thread::sleep(READY_STATE_POLL);
        }
    }

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }
}

/// Blocks until the listener behind `signal` reports, or `timeout` passes.
fn await_signal(signal: &Receiver<()>, timeout: Duration) -> Result<(), PageError> {
    match signal.recv_timeout(timeout) {
        Ok(()) => Ok(()),
        Err(RecvTimeoutError::Timeout) => Err(PageError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(PageError::Engine("event listener dropped".into()))
        }
    }
}

fn classify(err: anyhow::Error) -> PageError {
    let message = format!("{err:#}");
    if CONTEXT_DESTROYED_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        PageError::ContextDestroyed(message)
    } else {
        PageError::Engine(message)
    }
}
