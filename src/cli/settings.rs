//! `set` / `unset` for preferences and configuration values.
//!
//! Preferences (provider, models, key, temperature) live in the namespaced
//! store next to the conversation. Everything else is written to
//! `config.toml`.

use std::fmt;

use crate::cli::CliContext;
use crate::core::config::data::CONFIG_KEYS;
use crate::core::config::Config;
use crate::core::preferences::{PreferenceKey, PreferenceStore};

/// Errors that can occur when changing a setting.
#[derive(Debug)]
pub enum SettingError {
    /// The provided setting key is not recognized.
    UnknownKey(String),
    /// The value could not be used for the key.
    InvalidValue { key: String, reason: String },
    /// An error occurred while persisting the configuration.
    ConfigError(String),
}

impl SettingError {
    /// Print the error message to stderr with appropriate formatting.
    pub fn print(&self) {
        match self {
            SettingError::UnknownKey(key) => {
                eprintln!("❌ Unknown setting: {key}");
                eprintln!("   Known settings: {}", known_keys().join(", "));
            }
            SettingError::InvalidValue { key, reason } => {
                eprintln!("❌ Invalid value for {key}: {reason}");
            }
            SettingError::ConfigError(msg) => {
                eprintln!("❌ Failed to save configuration: {msg}");
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown setting: {key}"),
            SettingError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for {key}: {reason}")
            }
            SettingError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for SettingError {}

pub fn format_preferences(prefs: &PreferenceStore) -> Vec<String> {
    PreferenceKey::ALL
        .iter()
        .map(|key| format!("  {key}: {}", prefs.display_value(*key)))
        .collect()
}

fn print_all(ctx: &CliContext) {
    println!("Preferences ({}):", ctx.session.status().namespace);
    for line in ctx.session.with_state(|state| format_preferences(&state.preferences)) {
        println!("{line}");
    }
    println!();
    ctx.config.print_all();
}

fn apply_config_change(
    config: &Config,
    key: &str,
    change: impl FnOnce(&mut Config) -> Result<(), String>,
) -> Result<(), SettingError> {
    let mut updated = config.clone();
    change(&mut updated).map_err(|reason| SettingError::InvalidValue {
        key: key.to_string(),
        reason,
    })?;
    updated
        .save()
        .map_err(|err| SettingError::ConfigError(err.to_string()))
}

pub fn run_set(ctx: &CliContext, key: Option<&str>, value: Option<&str>) -> Result<(), SettingError> {
    let (Some(key), Some(value)) = (key, value.filter(|value| !value.trim().is_empty())) else {
        print_all(ctx);
        return Ok(());
    };

    if let Ok(pref) = key.parse::<PreferenceKey>() {
        ctx.session
            .update_preferences(|prefs| prefs.apply(pref, value))
            .map_err(|reason| SettingError::InvalidValue {
                key: pref.to_string(),
                reason,
            })?;
        let shown = ctx
            .session
            .with_state(|state| state.preferences.display_value(pref));
        println!("✅ Set {pref} to: {shown}");
        return Ok(());
    }

    if Config::is_config_key(key) {
        apply_config_change(&ctx.config, key, |config| config.set_value(key, value))?;
        println!("✅ Set {key} to: {}", value.trim());
        return Ok(());
    }

    Err(SettingError::UnknownKey(key.to_string()))
}

pub fn run_unset(ctx: &CliContext, key: &str) -> Result<(), SettingError> {
    if let Ok(pref) = key.parse::<PreferenceKey>() {
        ctx.session.update_preferences(|prefs| prefs.unset(pref));
        println!("✅ Unset {pref}");
        return Ok(());
    }

    if Config::is_config_key(key) {
        apply_config_change(&ctx.config, key, |config| config.unset_value(key))?;
        println!("✅ Unset {key}");
        return Ok(());
    }

    Err(SettingError::UnknownKey(key.to_string()))
}

/// Every key `set` and `unset` understand.
pub fn known_keys() -> Vec<&'static str> {
    PreferenceKey::ALL
        .iter()
        .map(|key| key.as_str())
        .chain(CONFIG_KEYS)
        .collect()
}
