use tracing::warn;

use crate::core::message::{ChatEntry, StoredEntry};
use crate::core::storage::{Namespace, SharedStore};

/// Number of trailing entries mirrored to storage.
pub const HISTORY_LIMIT: usize = 200;

pub const WELCOME_ENTRY_ID: &str = "welcome";
pub const WELCOME_TEXT: &str =
    "Hey! Welcome to the console. Ask me anything, or type /help to see what I can do.";

const MESSAGES_KEY: &str = "chatMessages";

/// Ordered, append-only chat history mirrored to a key-value store.
///
/// Metadata attached to entries stays in memory; only the persisted fields
/// of the newest [`HISTORY_LIMIT`] entries are written.
pub struct ConversationStore {
    store: SharedStore,
    namespace: Namespace,
    assistant_tag: String,
    limit: usize,
    entries: Vec<ChatEntry>,
}

impl ConversationStore {
    pub fn new(store: SharedStore, namespace: Namespace, assistant_tag: impl Into<String>) -> Self {
        Self {
            store,
            namespace,
            assistant_tag: assistant_tag.into(),
            limit: HISTORY_LIMIT,
            entries: Vec::new(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Load persisted entries, replacing anything in memory. Missing,
    /// malformed or empty data yields the single welcome entry.
    pub fn restore(&mut self) -> &[ChatEntry] {
        self.entries = match self.read_persisted() {
            Some(entries) if !entries.is_empty() => {
                entries.into_iter().map(ChatEntry::from).collect()
            }
            _ => vec![self.welcome_entry()],
        };
        &self.entries
    }

    pub fn append(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
        self.flush();
    }

    pub fn all(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    /// Drop all history and start over from the welcome entry.
    pub fn reset(&mut self) {
        self.entries = vec![self.welcome_entry()];
        self.flush();
    }

    /// Mirror the newest entries to storage. Failures are logged only.
    pub fn flush(&self) {
        let start = self.entries.len().saturating_sub(self.limit);
        let snapshot: Vec<StoredEntry> = self.entries[start..]
            .iter()
            .map(ChatEntry::to_stored)
            .collect();

        let key = self.storage_key();
        let serialized = match serde_json::to_string(&snapshot) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("Failed to serialize chat messages: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(&key, &serialized) {
            warn!("Failed to persist chat messages: {err}");
        }
    }

    fn read_persisted(&self) -> Option<Vec<StoredEntry>> {
        let key = self.storage_key();
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("Failed to read stored messages: {err}");
                return None;
            }
        };
        match serde_json::from_str::<Vec<StoredEntry>>(&raw) {
            Ok(entries) => Some(entries),
            Err(err) => {
                warn!("Failed to parse stored messages: {err}");
                None
            }
        }
    }

    fn welcome_entry(&self) -> ChatEntry {
        ChatEntry::assistant(self.assistant_tag.clone(), WELCOME_TEXT).with_id(WELCOME_ENTRY_ID)
    }

    fn storage_key(&self) -> String {
        self.namespace.key(MESSAGES_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{EntryRole, ReplyMeta};
    use crate::core::providers::Provider;
    use crate::core::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn store_for(backing: &Arc<MemoryStore>) -> ConversationStore {
        ConversationStore::new(backing.clone(), Namespace::new("test"), "AI")
    }

    fn persisted(backing: &Arc<MemoryStore>) -> Vec<StoredEntry> {
        let raw = backing
            .get("test.chatMessages")
            .unwrap()
            .expect("messages should be persisted");
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn restore_seeds_welcome_when_storage_is_empty() {
        let backing = MemoryStore::shared();
        let mut conversation = store_for(&backing);
        let entries = conversation.restore();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, WELCOME_ENTRY_ID);
        assert_eq!(entries[0].role, EntryRole::Assistant);
        assert_eq!(entries[0].text, WELCOME_TEXT);
    }

    #[test]
    fn restore_seeds_welcome_for_corrupt_or_empty_data() {
        for raw in ["not json", "{\"id\":1}", "[]", "[{\"id\":\"x\"}]"] {
            let backing = MemoryStore::shared();
            backing.set("test.chatMessages", raw).unwrap();
            let mut conversation = store_for(&backing);
            let entries = conversation.restore();
            assert_eq!(entries.len(), 1, "input {raw:?}");
            assert_eq!(entries[0].id, WELCOME_ENTRY_ID);
        }
    }

    #[test]
    fn persisted_entries_round_trip() {
        let backing = MemoryStore::shared();
        let mut conversation = store_for(&backing);
        conversation.restore();
        conversation.append(ChatEntry::user("ME", "ping"));
        conversation.append(
            ChatEntry::assistant("AI", "pong").with_meta(ReplyMeta {
                provider: Provider::Local,
                model: "llama3".to_string(),
                temperature: 0.5,
            }),
        );
        let expected: Vec<StoredEntry> =
            conversation.all().iter().map(ChatEntry::to_stored).collect();

        let mut reloaded = store_for(&backing);
        let restored: Vec<StoredEntry> =
            reloaded.restore().iter().map(ChatEntry::to_stored).collect();
        assert_eq!(restored, expected);
        assert!(reloaded.all().iter().all(|entry| entry.meta.is_none()));
        // Metadata stays available for the current session.
        assert!(conversation.last().unwrap().meta.is_some());
    }

    #[test]
    fn only_trailing_entries_are_persisted() {
        let backing = MemoryStore::shared();
        let mut conversation = store_for(&backing);
        for i in 0..250 {
            conversation.append(ChatEntry::user("ME", format!("message {i}")).with_id(i.to_string()));
        }

        assert_eq!(conversation.len(), 250);
        let stored = persisted(&backing);
        assert_eq!(stored.len(), HISTORY_LIMIT);
        let ids: Vec<String> = stored.iter().map(|entry| entry.id.clone()).collect();
        let expected: Vec<String> = (50..250).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn reset_reseeds_and_persists() {
        let backing = MemoryStore::shared();
        let mut conversation = store_for(&backing);
        conversation.restore();
        conversation.append(ChatEntry::user("ME", "hello"));
        conversation.reset();

        assert_eq!(conversation.len(), 1);
        let stored = persisted(&backing);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, WELCOME_ENTRY_ID);
    }

    #[test]
    fn append_survives_storage_failure() {
        let backing = MemoryStore::shared();
        backing.set_reject_writes(true);
        let mut conversation = store_for(&backing);
        conversation.restore();
        conversation.append(ChatEntry::user("ME", "still here"));
        assert_eq!(conversation.len(), 2);
        assert!(backing.is_empty());
    }

    #[test]
    fn custom_limit_is_honoured() {
        let backing = MemoryStore::shared();
        let mut conversation = store_for(&backing).with_limit(3);
        for i in 0..5 {
            conversation.append(ChatEntry::user("ME", i.to_string()));
        }
        let texts: Vec<String> = persisted(&backing).into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["2", "3", "4"]);
    }
}
