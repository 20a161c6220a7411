//! One console session: the stores, probe results and dispatcher for a
//! single namespace.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::client::{BackendError, ChatBackend};
use crate::api::UserRecord;
use crate::core::conversation::{ConversationStore, HISTORY_LIMIT};
use crate::core::dispatcher::{MessageDispatcher, SendOutcome};
use crate::core::message::ChatEntry;
use crate::core::preferences::PreferenceStore;
use crate::core::probe::{self, LocalModels, ProbeOutcome};
use crate::core::providers::{provider_badge, resolve, Provider, ProviderBadge, Resolution};
use crate::core::storage::{Namespace, SharedStore};
use crate::core::usage::{RecentErrors, RequestCounter};

pub const DEFAULT_USER_TAG: &str = "YOU";
pub const DEFAULT_ASSISTANT_TAG: &str = "AI";

/// Everything the session mutates. Guarded by one mutex that is only ever
/// held between await points.
pub struct ConsoleState {
    pub preferences: PreferenceStore,
    pub conversation: ConversationStore,
    pub local: LocalModels,
    /// Outcome of the most recent chat call, if any happened yet.
    pub last_call_ok: Option<bool>,
    /// Reason of the most recent chat failure, cleared by the next send.
    pub error: Option<String>,
    pub requests: RequestCounter,
    pub recent_errors: RecentErrors,
}

pub type SharedState = Arc<Mutex<ConsoleState>>;

pub fn lock_state(state: &SharedState) -> MutexGuard<'_, ConsoleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub namespace: Namespace,
    pub user_tag: String,
    pub assistant_tag: String,
    pub history_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            namespace: Namespace::default(),
            user_tag: DEFAULT_USER_TAG.to_string(),
            assistant_tag: DEFAULT_ASSISTANT_TAG.to_string(),
            history_limit: HISTORY_LIMIT,
        }
    }
}

/// Point-in-time view used by status output.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub namespace: String,
    pub stored_provider: Provider,
    pub badge: ProviderBadge,
    pub resolution: Resolution,
    pub local: LocalModels,
    pub last_call_ok: Option<bool>,
    pub error: Option<String>,
    pub entries: usize,
    pub request_count: u64,
    /// Newest first.
    pub recent_errors: Vec<String>,
}

pub struct ConsoleSession {
    backend: Arc<dyn ChatBackend>,
    state: SharedState,
    dispatcher: MessageDispatcher,
}

impl ConsoleSession {
    /// Load preferences and restore the conversation for `options.namespace`.
    pub fn open(store: SharedStore, backend: Arc<dyn ChatBackend>, options: SessionOptions) -> Self {
        let preferences = PreferenceStore::load(store.clone(), options.namespace.clone());
        let requests = RequestCounter::load(store.clone(), &options.namespace);
        let mut conversation =
            ConversationStore::new(store, options.namespace, options.assistant_tag.clone())
                .with_limit(options.history_limit);
        conversation.restore();

        let state = Arc::new(Mutex::new(ConsoleState {
            preferences,
            conversation,
            local: LocalModels::default(),
            last_call_ok: None,
            error: None,
            requests,
            recent_errors: RecentErrors::default(),
        }));
        let dispatcher = MessageDispatcher::new(
            backend.clone(),
            state.clone(),
            options.user_tag,
            options.assistant_tag,
        );

        Self {
            backend,
            state,
            dispatcher,
        }
    }

    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        self.backend.clone()
    }

    pub fn shared_state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&ConsoleState) -> R) -> R {
        f(&lock_state(&self.state))
    }

    pub fn update_preferences<R>(&self, f: impl FnOnce(&mut PreferenceStore) -> R) -> R {
        f(&mut lock_state(&self.state).preferences)
    }

    pub fn entries(&self) -> Vec<ChatEntry> {
        self.with_state(|state| state.conversation.all().to_vec())
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    pub async fn send(&self, draft: &mut String) -> SendOutcome {
        self.dispatcher.send(draft).await
    }

    pub async fn refresh_models(&self) -> ProbeOutcome {
        probe::refresh_models(self.backend.as_ref(), &self.state).await
    }

    pub async fn poll_health(&self) {
        probe::poll_health(self.backend.as_ref(), &self.state).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        self.backend.list_users().await
    }

    /// Start the conversation over. A reply still in flight is dropped when
    /// it arrives.
    pub fn reset(&self) {
        self.dispatcher.invalidate_pending();
        let mut state = lock_state(&self.state);
        state.conversation.reset();
        state.error = None;
        state.recent_errors.push("Chat history cleared");
    }

    pub fn status(&self) -> StatusSnapshot {
        self.with_state(|state| {
            let preferences = state.preferences.preferences();
            StatusSnapshot {
                namespace: state.preferences.namespace().to_string(),
                stored_provider: preferences.provider,
                badge: provider_badge(preferences, state.last_call_ok, state.local.status),
                resolution: resolve(preferences, &state.local.available),
                local: state.local.clone(),
                last_call_ok: state.last_call_ok,
                error: state.error.clone(),
                entries: state.conversation.len(),
                request_count: state.requests.count(),
                recent_errors: state.recent_errors.to_vec(),
            }
        })
    }
}
