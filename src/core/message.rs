use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::providers::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntryRole {
    User,
    Assistant,
}

impl EntryRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryRole::User => "user",
            EntryRole::Assistant => "assistant",
        }
    }
}

impl TryFrom<&str> for EntryRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(EntryRole::User),
            "assistant" => Ok(EntryRole::Assistant),
            _ => Err(format!("invalid entry role: {value}")),
        }
    }
}

impl TryFrom<String> for EntryRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<EntryRole> for String {
    fn from(value: EntryRole) -> Self {
        value.as_str().to_string()
    }
}

/// Session-only details about the request that produced an assistant entry.
///
/// Never written to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyMeta {
    pub provider: Provider,
    pub model: String,
    pub temperature: f32,
}

impl ReplyMeta {
    pub fn label(&self) -> String {
        format!(
            "{}:{} • temp={:.2}",
            self.provider.wire_name(),
            self.model,
            self.temperature
        )
    }
}

/// One message in the conversation. Entries are never edited after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: String,
    pub role: EntryRole,
    pub author_tag: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub meta: Option<ReplyMeta>,
}

/// The subset of a [`ChatEntry`] that survives persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub id: String,
    pub role: EntryRole,
    pub author_tag: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(role: EntryRole, author_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: new_entry_id(),
            role,
            author_tag: author_tag.into(),
            text: text.into(),
            created_at: Utc::now(),
            meta: None,
        }
    }

    pub fn user(author_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EntryRole::User, author_tag, text)
    }

    pub fn assistant(author_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EntryRole::Assistant, author_tag, text)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_meta(mut self, meta: ReplyMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn to_stored(&self) -> StoredEntry {
        StoredEntry {
            id: self.id.clone(),
            role: self.role,
            author_tag: self.author_tag.clone(),
            text: self.text.clone(),
            created_at: self.created_at,
        }
    }
}

impl From<StoredEntry> for ChatEntry {
    fn from(stored: StoredEntry) -> Self {
        Self {
            id: stored.id,
            role: stored.role,
            author_tag: stored.author_tag,
            text: stored.text,
            created_at: stored.created_at,
            meta: None,
        }
    }
}

/// Generate an opaque entry id from 16 random bytes, falling back to a
/// timestamp when the OS source is unavailable.
pub fn new_entry_id() -> String {
    let mut bytes = [0u8; 16];
    match getrandom::fill(&mut bytes) {
        Ok(()) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
        Err(_) => {
            let now = Utc::now();
            format!(
                "{}-{}",
                now.timestamp_millis(),
                now.timestamp_subsec_nanos()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(EntryRole::try_from("system").is_err());
        assert_eq!(EntryRole::try_from("user"), Ok(EntryRole::User));
    }

    #[test]
    fn stored_entry_uses_camel_case_fields() {
        let entry = ChatEntry::assistant("AI", "hi").with_id("abc");
        let json = serde_json::to_value(entry.to_stored()).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["authorTag"], "AI");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn entry_ids_are_unique() {
        let a = new_entry_id();
        let b = new_entry_id();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn reply_meta_label_includes_provider_and_temperature() {
        let meta = ReplyMeta {
            provider: Provider::Local,
            model: "llama3".to_string(),
            temperature: 0.7,
        };
        assert_eq!(meta.label(), "ollama:llama3 • temp=0.70");
    }
}
