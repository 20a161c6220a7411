use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::core::providers::Provider;
use crate::core::storage::{Namespace, SharedStore};

pub const DEFAULT_HOSTED_MODEL: &str = "gpt-4o";
pub const DEFAULT_LOCAL_SERVER_URL: &str = "http://localhost:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub provider: Provider,
    pub hosted_api_key: String,
    pub hosted_model: String,
    pub local_server_url: String,
    pub local_model: String,
    /// Sampling temperature, always within `[0, 1]`.
    pub temperature: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            provider: Provider::Hosted,
            hosted_api_key: String::new(),
            hosted_model: DEFAULT_HOSTED_MODEL.to_string(),
            local_server_url: DEFAULT_LOCAL_SERVER_URL.to_string(),
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    Provider,
    HostedApiKey,
    HostedModel,
    LocalServerUrl,
    LocalModel,
    Temperature,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 6] = [
        PreferenceKey::Provider,
        PreferenceKey::HostedApiKey,
        PreferenceKey::HostedModel,
        PreferenceKey::LocalServerUrl,
        PreferenceKey::LocalModel,
        PreferenceKey::Temperature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceKey::Provider => "provider",
            PreferenceKey::HostedApiKey => "hosted-api-key",
            PreferenceKey::HostedModel => "hosted-model",
            PreferenceKey::LocalServerUrl => "local-server-url",
            PreferenceKey::LocalModel => "local-model",
            PreferenceKey::Temperature => "temperature",
        }
    }

    fn storage_name(self) -> &'static str {
        match self {
            PreferenceKey::Provider => "provider",
            PreferenceKey::HostedApiKey => "hostedApiKey",
            PreferenceKey::HostedModel => "hostedModel",
            PreferenceKey::LocalServerUrl => "localServerUrl",
            PreferenceKey::LocalModel => "localModel",
            PreferenceKey::Temperature => "temperature",
        }
    }

    pub fn is_secret(self) -> bool {
        self == PreferenceKey::HostedApiKey
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        PreferenceKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<_> = PreferenceKey::ALL.iter().map(|k| k.as_str()).collect();
                format!(
                    "unknown preference '{value}' (expected one of: {})",
                    known.join(", ")
                )
            })
    }
}

/// Preferences backed by a key-value store, one key per field.
///
/// Reads happen once in [`PreferenceStore::load`]; every setter writes only
/// its own key. Write failures are logged and otherwise ignored so the
/// in-memory value still changes.
pub struct PreferenceStore {
    store: SharedStore,
    namespace: Namespace,
    values: Preferences,
}

impl PreferenceStore {
    pub fn load(store: SharedStore, namespace: Namespace) -> Self {
        let mut prefs = Self {
            store,
            namespace,
            values: Preferences::default(),
        };
        let defaults = Preferences::default();

        let provider = prefs.get(PreferenceKey::Provider, defaults.provider.as_str());
        prefs.values.provider = provider.parse().unwrap_or_else(|err| {
            warn!("Ignoring stored provider: {err}");
            defaults.provider
        });
        prefs.values.hosted_api_key = prefs.get(PreferenceKey::HostedApiKey, "");
        prefs.values.hosted_model = prefs.get(PreferenceKey::HostedModel, DEFAULT_HOSTED_MODEL);
        prefs.values.local_server_url =
            prefs.get(PreferenceKey::LocalServerUrl, DEFAULT_LOCAL_SERVER_URL);
        prefs.values.local_model = prefs.get(PreferenceKey::LocalModel, DEFAULT_LOCAL_MODEL);

        let temperature = prefs.get(PreferenceKey::Temperature, "");
        prefs.values.temperature = if temperature.is_empty() {
            DEFAULT_TEMPERATURE
        } else {
            parse_temperature(&temperature).unwrap_or_else(|err| {
                warn!("Ignoring stored temperature: {err}");
                DEFAULT_TEMPERATURE
            })
        };

        prefs
    }

    pub fn preferences(&self) -> &Preferences {
        &self.values
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Read the raw stored value for `key`, or `default` when it is absent
    /// or unreadable.
    pub fn get(&self, key: PreferenceKey, default: &str) -> String {
        let storage_key = self.namespace.key(key.storage_name());
        match self.store.get(&storage_key) {
            Ok(Some(value)) => value,
            Ok(None) => default.to_string(),
            Err(err) => {
                warn!("Failed to read preference {storage_key}: {err}");
                default.to_string()
            }
        }
    }

    /// Write the raw value for `key`. Failures are logged, never returned.
    pub fn set(&self, key: PreferenceKey, value: &str) {
        let storage_key = self.namespace.key(key.storage_name());
        if let Err(err) = self.store.set(&storage_key, value) {
            warn!("Failed to persist preference {storage_key}: {err}");
        }
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.values.provider = provider;
        self.set(PreferenceKey::Provider, provider.as_str());
    }

    pub fn set_hosted_api_key(&mut self, api_key: impl Into<String>) {
        self.values.hosted_api_key = api_key.into().trim().to_string();
        self.set(PreferenceKey::HostedApiKey, &self.values.hosted_api_key);
    }

    pub fn set_hosted_model(&mut self, model: impl Into<String>) {
        self.values.hosted_model = model.into();
        self.set(PreferenceKey::HostedModel, &self.values.hosted_model);
    }

    pub fn set_local_server_url(&mut self, url: impl Into<String>) {
        self.values.local_server_url = url.into();
        self.set(PreferenceKey::LocalServerUrl, &self.values.local_server_url);
    }

    pub fn set_local_model(&mut self, model: impl Into<String>) {
        self.values.local_model = model.into();
        self.set(PreferenceKey::LocalModel, &self.values.local_model);
    }

    /// Store a temperature, clamped into `[0, 1]`. Returns the stored value.
    pub fn set_temperature(&mut self, temperature: f32) -> f32 {
        let clamped = if temperature.is_nan() {
            DEFAULT_TEMPERATURE
        } else {
            temperature.clamp(0.0, 1.0)
        };
        self.values.temperature = clamped;
        self.set(PreferenceKey::Temperature, &clamped.to_string());
        clamped
    }

    /// Parse a user-supplied value and store it under `key`.
    pub fn apply(&mut self, key: PreferenceKey, raw: &str) -> Result<(), String> {
        let value = raw.trim();
        match key {
            PreferenceKey::Provider => self.set_provider(value.parse()?),
            PreferenceKey::HostedApiKey => self.set_hosted_api_key(value),
            PreferenceKey::HostedModel => self.set_hosted_model(value),
            PreferenceKey::LocalServerUrl => self.set_local_server_url(value),
            PreferenceKey::LocalModel => self.set_local_model(value),
            PreferenceKey::Temperature => {
                self.set_temperature(parse_temperature(value)?);
            }
        }
        Ok(())
    }

    /// Remove the stored value so the default applies again.
    pub fn unset(&mut self, key: PreferenceKey) {
        let storage_key = self.namespace.key(key.storage_name());
        if let Err(err) = self.store.remove(&storage_key) {
            warn!("Failed to remove preference {storage_key}: {err}");
        }

        let defaults = Preferences::default();
        match key {
            PreferenceKey::Provider => self.values.provider = defaults.provider,
            PreferenceKey::HostedApiKey => self.values.hosted_api_key = defaults.hosted_api_key,
            PreferenceKey::HostedModel => self.values.hosted_model = defaults.hosted_model,
            PreferenceKey::LocalServerUrl => {
                self.values.local_server_url = defaults.local_server_url
            }
            PreferenceKey::LocalModel => self.values.local_model = defaults.local_model,
            PreferenceKey::Temperature => self.values.temperature = defaults.temperature,
        }
    }

    /// Human-readable value for listings; the credential is masked.
    pub fn display_value(&self, key: PreferenceKey) -> String {
        match key {
            PreferenceKey::Provider => self.values.provider.to_string(),
            PreferenceKey::HostedApiKey => mask_secret(&self.values.hosted_api_key),
            PreferenceKey::HostedModel => self.values.hosted_model.clone(),
            PreferenceKey::LocalServerUrl => self.values.local_server_url.clone(),
            PreferenceKey::LocalModel => self.values.local_model.clone(),
            PreferenceKey::Temperature => format!("{:.2}", self.values.temperature),
        }
    }
}

fn parse_temperature(value: &str) -> Result<f32, String> {
    let parsed: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if parsed.is_nan() {
        return Err(format!("'{value}' is not a number"));
    }
    Ok(parsed.clamp(0.0, 1.0))
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{visible}")
}
