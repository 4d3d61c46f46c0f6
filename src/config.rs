//! Client configuration and user settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_VERSION: &str = "3";
const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

/// Process-level configuration, read once at startup
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Assistant endpoint every round is posted to
    pub api_url: Option<String>,
    pub api_version: String,
    /// JSON settings file; re-read at the start of every round
    pub settings_path: PathBuf,
    /// Upper bound on a single command handler. `None` waits forever.
    pub handler_timeout: Option<Duration>,
    /// Chunks a channel may queue before the stream reader waits
    pub channel_capacity: usize,
    pub search_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            settings_path: default_settings_path(),
            handler_timeout: None,
            channel_capacity: 1,
            search_url: DEFAULT_SEARCH_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("APRIL_API_URL").ok().filter(|u| !u.is_empty()),
            api_version: std::env::var("APRIL_API_VERSION").unwrap_or(defaults.api_version),
            settings_path: std::env::var("APRIL_SETTINGS_PATH")
                .map_or(defaults.settings_path, PathBuf::from),
            handler_timeout: std::env::var("APRIL_HANDLER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            channel_capacity: std::env::var("APRIL_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.channel_capacity),
            search_url: std::env::var("APRIL_SEARCH_URL").unwrap_or(defaults.search_url),
        }
    }
}

fn default_settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{home}/.april/settings.json"))
}

/// User-editable settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub username: String,
    /// Shared secret for one-time codes
    pub token: String,
    pub python_custom_interpreter: bool,
    pub python_path: String,
    /// 0-100. Scripts rated below this run without asking; 100 runs
    /// everything unreviewed.
    pub risk_acceptance: u8,
    /// Identifiers of the reminder lists the assistant may touch
    pub reminders_lists: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: String::new(),
            token: String::new(),
            python_custom_interpreter: false,
            python_path: "python3".to_string(),
            risk_acceptance: 0,
            reminders_lists: Vec::new(),
        }
    }
}

impl Settings {
    pub fn accepts_all_risk(&self) -> bool {
        self.risk_acceptance >= 100
    }

    pub fn python_interpreter(&self) -> &str {
        if self.python_custom_interpreter {
            &self.python_path
        } else {
            "python3"
        }
    }
}

/// Read-only access to the current settings
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Settings;
}

/// Fixed settings for tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub Settings);

#[cfg(test)]
impl SettingsStore for StaticSettings {
    fn load(&self) -> Settings {
        self.0.clone()
    }
}

/// Settings stored as JSON on disk, read fresh on every access
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for FileSettings {
    fn load(&self) -> Settings {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "No settings file, using defaults");
                return Settings::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Invalid settings file, using defaults");
            Settings::default()
        })
    }
}
