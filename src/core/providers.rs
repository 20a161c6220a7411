//! Provider selection.
//!
//! The stored preference says which provider the user wants; the resolver
//! decides which one a single request actually goes to. Resolution never
//! writes back to the stored preferences.

use std::fmt;
use std::str::FromStr;

use crate::core::preferences::Preferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    /// The hosted completion API, reached with a credential and model name.
    #[default]
    Hosted,
    /// A self-hosted model server, reached with a URL and model name.
    Local,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Hosted => "hosted",
            Provider::Local => "local",
        }
    }

    /// Name the backend expects in the `provider` field of a chat request.
    pub fn wire_name(self) -> &'static str {
        match self {
            Provider::Hosted => "openai",
            Provider::Local => "ollama",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Hosted => "Hosted API",
            Provider::Local => "Local server",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hosted" | "openai" => Ok(Provider::Hosted),
            "local" | "ollama" => Ok(Provider::Local),
            other => Err(format!(
                "unknown provider '{other}' (expected 'hosted' or 'local')"
            )),
        }
    }
}

/// Provider and model used for one outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub provider: Provider,
    pub model: String,
}

pub fn resolve(preferences: &Preferences, available_local_models: &[String]) -> Resolution {
    let mut provider = preferences.provider;
    if provider == Provider::Hosted && preferences.hosted_api_key.is_empty() {
        provider = Provider::Local;
    }

    let candidate = match provider {
        Provider::Hosted => &preferences.hosted_model,
        Provider::Local => &preferences.local_model,
    };

    if provider == Provider::Local
        && (candidate.is_empty() || !available_local_models.contains(candidate))
    {
        return Resolution {
            provider: Provider::Hosted,
            model: preferences.hosted_model.clone(),
        };
    }

    Resolution {
        provider,
        model: candidate.clone(),
    }
}

/// Reachability of the local model server as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalServerStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

impl LocalServerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LocalServerStatus::Unknown => "unknown",
            LocalServerStatus::Online => "online",
            LocalServerStatus::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBadge {
    MissingKey,
    Ok,
    Failed,
    Waiting,
    Down,
}

impl ProviderBadge {
    pub fn label(self) -> &'static str {
        match self {
            ProviderBadge::MissingKey => "KEY?",
            ProviderBadge::Ok => "OK",
            ProviderBadge::Failed => "FAIL",
            ProviderBadge::Waiting => "WAIT",
            ProviderBadge::Down => "DOWN",
        }
    }
}

/// Short status label for the stored provider, shown next to its name.
pub fn provider_badge(
    preferences: &Preferences,
    last_call_ok: Option<bool>,
    local_status: LocalServerStatus,
) -> ProviderBadge {
    match preferences.provider {
        Provider::Hosted => {
            if preferences.hosted_api_key.is_empty() {
                return ProviderBadge::MissingKey;
            }
            match last_call_ok {
                Some(true) => ProviderBadge::Ok,
                Some(false) => ProviderBadge::Failed,
                None => ProviderBadge::Waiting,
            }
        }
        Provider::Local => match local_status {
            LocalServerStatus::Online => ProviderBadge::Ok,
            LocalServerStatus::Offline => ProviderBadge::Down,
            LocalServerStatus::Unknown => ProviderBadge::Waiting,
        },
    }
}
