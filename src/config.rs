use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Named pacing delays, in milliseconds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Delays {
    pub after_send_ms: u64,
    pub between_actions_ms: u64,
    pub typing_simulation_ms: u64,
    pub new_chat_search_ms: u64,
    pub select_result_ms: u64,
    pub post_send_ms: u64,
    pub teardown_ms: u64,
    /// Upper bound of a random extra wait added to every delay.
    pub jitter_ms: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Delays {
            after_send_ms: 1000,
            between_actions_ms: 1000,
            typing_simulation_ms: 500,
            new_chat_search_ms: 1000,
            select_result_ms: 800,
            post_send_ms: 100,
            teardown_ms: 3000,
            jitter_ms: 0,
        }
    }
}

impl Delays {
    /// All waits disabled. Used by unattended test runs.
    pub fn none() -> Self {
        Delays {
            after_send_ms: 0,
            between_actions_ms: 0,
            typing_simulation_ms: 0,
            new_chat_search_ms: 0,
            select_result_ms: 0,
            post_send_ms: 0,
            teardown_ms: 0,
            jitter_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub profile_dir: PathBuf,
    pub delays: Delays,
    pub resume: bool,
    pub screenshots: bool,
    pub screenshot_dir: PathBuf,
    pub webdriver_url: String,
    pub messaging_url: String,
    pub element_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from("contacts.xlsx"),
            profile_dir: PathBuf::from("session_data"),
            delays: Delays::default(),
            resume: true,
            screenshots: false,
            screenshot_dir: PathBuf::from("./screenshots"),
            webdriver_url: "http://localhost:9515".to_string(),
            messaging_url: "https://web.whatsapp.com".to_string(),
            element_timeout_ms: 15_000,
        }
    }
}

impl Config {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {:?}: {}", path, e)))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {:?}: {}", path, e)))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(Error::Config("store path is empty".to_string()));
        }
        if self.profile_dir.as_os_str().is_empty() {
            return Err(Error::Config("profile directory is empty".to_string()));
        }
        if self.screenshots && self.screenshot_dir.as_os_str().is_empty() {
            return Err(Error::Config("screenshots enabled without a directory".to_string()));
        }
        if self.webdriver_url.trim().is_empty() {
            return Err(Error::Config("WebDriver URL is empty".to_string()));
        }
        Ok(())
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
}
