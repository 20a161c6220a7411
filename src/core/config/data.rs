use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::conversation::HISTORY_LIMIT;
use crate::core::probe::DEFAULT_HEALTH_POLL_INTERVAL;
use crate::core::session::{SessionOptions, DEFAULT_ASSISTANT_TAG, DEFAULT_USER_TAG};
use crate::core::storage::Namespace;
use crate::utils::url::{backend_base_url, normalize_base_url};

/// Environment variable that overrides the configured backend URL.
pub const BACKEND_URL_ENV: &str = "CHATOPS_BACKEND_URL";

/// Host the backend is assumed to run on when nothing else is configured.
pub const DEFAULT_BACKEND_HOST: &str = "localhost";

/// Keys accepted by `set`/`unset` that live in `config.toml` rather than in
/// the preference store.
pub const CONFIG_KEYS: [&str; 8] = [
    "backend-url",
    "backend-host",
    "namespace",
    "storage-dir",
    "user-tag",
    "assistant-tag",
    "history-limit",
    "health-poll-secs",
];

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Full backend URL, e.g. `http://10.0.0.5:8000`
    pub backend_url: Option<String>,
    /// Host name the backend URL is derived from when `backend_url` is unset
    pub backend_host: Option<String>,
    /// Prefix for every stored key
    pub namespace: Option<String>,
    /// Where preferences and history are kept; defaults to the data dir
    pub storage_dir: Option<PathBuf>,
    pub user_tag: Option<String>,
    pub assistant_tag: Option<String>,
    /// Number of trailing conversation entries that are persisted
    pub history_limit: Option<usize>,
    pub health_poll_secs: Option<u64>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.local/share/chatops` → `~/.local/share/chatops`
/// - Windows: `C:\\Users\\user\\AppData\\Roaming\\chatops` → unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Backend base URL: explicit flag, then environment, then config, then
    /// a URL derived from the configured host on port 8000.
    pub fn resolve_backend_url(&self, flag: Option<&str>, env: Option<&str>) -> String {
        let explicit = flag
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or_else(|| env.map(str::trim).filter(|value| !value.is_empty()))
            .or_else(|| non_empty(&self.backend_url));

        match explicit {
            Some(url) => normalize_base_url(url),
            None => backend_base_url(non_empty(&self.backend_host).unwrap_or(DEFAULT_BACKEND_HOST)),
        }
    }

    pub fn namespace(&self, flag: Option<&str>) -> Namespace {
        Namespace::new(flag.or(self.namespace.as_deref()).unwrap_or_default())
    }

    pub fn user_tag(&self) -> &str {
        non_empty(&self.user_tag).unwrap_or(DEFAULT_USER_TAG)
    }

    pub fn assistant_tag(&self) -> &str {
        non_empty(&self.assistant_tag).unwrap_or(DEFAULT_ASSISTANT_TAG)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
            .filter(|limit| *limit > 0)
            .unwrap_or(HISTORY_LIMIT)
    }

    pub fn health_poll_interval(&self) -> Duration {
        self.health_poll_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HEALTH_POLL_INTERVAL)
    }

    pub fn session_options(&self, namespace: Option<&str>) -> SessionOptions {
        SessionOptions {
            namespace: self.namespace(namespace),
            user_tag: self.user_tag().to_string(),
            assistant_tag: self.assistant_tag().to_string(),
            history_limit: self.history_limit(),
        }
    }

    pub fn is_config_key(key: &str) -> bool {
        CONFIG_KEYS.contains(&key)
    }

    /// Set one of [`CONFIG_KEYS`] from its command-line spelling.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("a value is required for '{key}'"));
        }
        match key {
            "backend-url" => self.backend_url = Some(normalize_base_url(value)),
            "backend-host" => self.backend_host = Some(value.to_string()),
            "namespace" => self.namespace = Some(value.to_string()),
            "storage-dir" => self.storage_dir = Some(PathBuf::from(value)),
            "user-tag" => self.user_tag = Some(value.to_string()),
            "assistant-tag" => self.assistant_tag = Some(value.to_string()),
            "history-limit" => self.history_limit = Some(parse_positive(key, value)?),
            "health-poll-secs" => self.health_poll_secs = Some(parse_positive(key, value)?),
            _ => return Err(format!("unknown config key '{key}'")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "backend-url" => self.backend_url = None,
            "backend-host" => self.backend_host = None,
            "namespace" => self.namespace = None,
            "storage-dir" => self.storage_dir = None,
            "user-tag" => self.user_tag = None,
            "assistant-tag" => self.assistant_tag = None,
            "history-limit" => self.history_limit = None,
            "health-poll-secs" => self.health_poll_secs = None,
            _ => return Err(format!("unknown config key '{key}'")),
        }
        Ok(())
    }
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(format!("'{key}' must be a positive whole number")),
    }
}
