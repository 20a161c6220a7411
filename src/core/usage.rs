//! Session counters shown by `status`: delivered replies and recent errors.

use std::collections::VecDeque;

use tracing::warn;

use crate::core::storage::{Namespace, SharedStore};

pub const REQUEST_COUNT_KEY: &str = "aiRequestCount";
pub const RECENT_ERROR_LIMIT: usize = 10;

/// Number of delivered replies, persisted under `<namespace>.aiRequestCount`.
pub struct RequestCounter {
    store: SharedStore,
    key: String,
    count: u64,
}

impl RequestCounter {
    /// Read the stored count. Missing or unparsable values start at zero.
    pub fn load(store: SharedStore, namespace: &Namespace) -> Self {
        let key = namespace.key(REQUEST_COUNT_KEY);
        let count = match store.get(&key) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|err| {
                warn!("Ignoring stored request count '{raw}': {err}");
                0
            }),
            Ok(None) => 0,
            Err(err) => {
                warn!("Failed to read {key}: {err}");
                0
            }
        };
        Self { store, key, count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn increment(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        if let Err(err) = self.store.set(&self.key, &self.count.to_string()) {
            warn!("Failed to persist {}: {err}", self.key);
        }
        self.count
    }
}

/// The newest [`RECENT_ERROR_LIMIT`] notices, newest first. Session only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentErrors(VecDeque<String>);

impl RecentErrors {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push_front(message.into());
        self.0.truncate(RECENT_ERROR_LIMIT);
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
