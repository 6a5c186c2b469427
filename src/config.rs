use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::Parser;

use crate::heuristic::ScoringRules;

/// Drives one browser page over a JSON-lines protocol on stdin/stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "browser-worker", version, about)]
pub struct Config {
    /// Run Chrome without a visible window.
    #[arg(long, env = "BROWSER_WORKER_HEADLESS")]
    pub headless: bool,

    /// Chrome/Chromium executable. Auto-detected when omitted.
    #[arg(long, env = "BROWSER_WORKER_CHROME")]
    pub chrome_path: Option<PathBuf>,

    /// DevTools WebSocket URL of a running Chrome to attach to instead of
    /// launching one, e.g. ws://127.0.0.1:9222/devtools/browser/<id>
    #[arg(long, env = "BROWSER_WORKER_ATTACH")]
    pub attach: Option<String>,

    /// Profile directory for the launched browser.
    #[arg(long, env = "BROWSER_WORKER_PROFILE")]
    pub user_data_dir: Option<PathBuf>,

    /// Keep logins between runs in a profile under the local data dir.
    #[arg(long, env = "BROWSER_WORKER_PERSIST_PROFILE", conflicts_with = "user_data_dir")]
    pub persist_profile: bool,

    /// Window size as WIDTHxHEIGHT.
    #[arg(long, env = "BROWSER_WORKER_WINDOW", default_value = "1280x900")]
    pub window_size: WindowSize,

    /// JSON file replacing the built-in input scoring table.
    #[arg(long, env = "BROWSER_WORKER_INPUT_RULES")]
    pub input_rules: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset. Logs go to stderr.
    #[arg(long, env = "BROWSER_WORKER_LOG", default_value = "info")]
    pub log: String,
}

impl Config {
    pub fn profile_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.user_data_dir {
            return Some(dir.clone());
        }
        if self.persist_profile {
            return dirs::data_local_dir().map(|dir| dir.join("browser-worker").join("profile"));
        }
        None
    }

    pub fn scoring_rules(&self) -> Result<ScoringRules> {
        match &self.input_rules {
            Some(path) => ScoringRules::from_path(path),
            None => Ok(ScoringRules::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for WindowSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let size = WindowSize {
            width: width.trim().parse()?,
            height: height.trim().parse()?,
        };
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window dimensions must be greater than 0"));
        }
        Ok(size)
    }
}
