use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::preferences::Preferences;
use crate::core::providers::{Provider, Resolution};

pub mod client;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub provider: String,
    pub temperature: f32,
    pub config: ProviderConfig,
}

/// Connection settings forwarded to the backend for the effective provider.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ProviderConfig {
    Hosted {
        #[serde(skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        model: String,
    },
    Local {
        base_url: String,
        model: String,
    },
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, resolution: &Resolution, preferences: &Preferences) -> Self {
        let config = match resolution.provider {
            Provider::Hosted => ProviderConfig::Hosted {
                api_key: Some(preferences.hosted_api_key.clone()).filter(|key| !key.is_empty()),
                model: resolution.model.clone(),
            },
            Provider::Local => ProviderConfig::Local {
                base_url: preferences.local_server_url.clone(),
                model: resolution.model.clone(),
            },
        };

        Self {
            message: message.into(),
            provider: resolution.provider.wire_name().to_string(),
            temperature: preferences.temperature,
            config,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct HealthResponse {
    #[serde(rename = "providerStatuses", default)]
    pub provider_statuses: ProviderStatuses,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ProviderStatuses {
    pub openai: Option<String>,
    pub ollama: Option<String>,
}

/// Backends return numeric or string identifiers depending on the store.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(id) => write!(f, "{id}"),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Moderator,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStatus {
    Online,
    Away,
    Offline,
    Other(String),
}

impl UserRecord {
    pub fn role(&self) -> UserRole {
        let raw = self.role.as_deref().unwrap_or("member");
        match raw.to_ascii_lowercase().as_str() {
            "admin" => UserRole::Admin,
            "moderator" => UserRole::Moderator,
            _ => UserRole::Other(raw.to_string()),
        }
    }

    pub fn status(&self) -> UserStatus {
        let raw = self.status.as_deref().unwrap_or("unknown");
        match raw.to_ascii_lowercase().as_str() {
            "online" => UserStatus::Online,
            "away" => UserStatus::Away,
            "offline" => UserStatus::Offline,
            _ => UserStatus::Other(raw.to_string()),
        }
    }
}

impl UserRole {
    pub fn label(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Moderator => "moderator",
            UserRole::Other(raw) => raw,
        }
    }
}

impl UserStatus {
    pub fn label(&self) -> &str {
        match self {
            UserStatus::Online => "Online",
            UserStatus::Away => "Away",
            UserStatus::Offline => "Offline",
            UserStatus::Other(raw) => raw,
        }
    }
}
