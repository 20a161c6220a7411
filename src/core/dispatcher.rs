use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::client::ChatBackend;
use crate::api::ChatRequest;
use crate::core::message::{new_entry_id, ChatEntry, ReplyMeta};
use crate::core::providers::resolve;
use crate::core::reply::normalize_reply;
use crate::core::session::{lock_state, SharedState};

/// What happened to one call of [`MessageDispatcher::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was appended to the conversation.
    Delivered,
    /// The backend call failed; a failure entry was appended.
    Failed(String),
    /// Another send is still pending. Nothing changed.
    Busy,
    /// The draft was empty or whitespace only. Nothing changed.
    Empty,
    /// The conversation was reset while the request was pending.
    Discarded,
}

pub struct MessageDispatcher {
    backend: Arc<dyn ChatBackend>,
    state: SharedState,
    user_tag: String,
    assistant_tag: String,
    busy: AtomicBool,
    current_request: AtomicU64,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MessageDispatcher {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        state: SharedState,
        user_tag: impl Into<String>,
        assistant_tag: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            state,
            user_tag: user_tag.into(),
            assistant_tag: assistant_tag.into(),
            busy: AtomicBool::new(false),
            current_request: AtomicU64::new(0),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Make any pending request stale so its reply is dropped.
    pub fn invalidate_pending(&self) {
        self.current_request.fetch_add(1, Ordering::AcqRel);
    }

    /// Send `draft` to the backend and record the exchange.
    ///
    /// The draft is cleared once the user entry has been appended. Busy and
    /// empty drafts leave it untouched.
    pub async fn send(&self, draft: &mut String) -> SendOutcome {
        let message = draft.trim().to_string();
        if message.is_empty() {
            return SendOutcome::Empty;
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("Ignoring send while a request is pending");
            return SendOutcome::Busy;
        }
        let _busy = BusyGuard(&self.busy);
        let request_id = self.current_request.fetch_add(1, Ordering::AcqRel) + 1;

        let (request, meta) = {
            let mut state = lock_state(&self.state);
            state.error = None;
            state
                .conversation
                .append(ChatEntry::user(self.user_tag.clone(), message.clone()));
            draft.clear();

            let preferences = state.preferences.preferences();
            let resolution = resolve(preferences, &state.local.available);
            debug!(
                provider = resolution.provider.wire_name(),
                model = %resolution.model,
                "dispatching chat request"
            );
            let meta = ReplyMeta {
                provider: resolution.provider,
                model: resolution.model.clone(),
                temperature: preferences.temperature,
            };
            (ChatRequest::new(message, &resolution, preferences), meta)
        };

        let result = self.backend.send_chat(&request).await;

        let mut state = lock_state(&self.state);
        if self.current_request.load(Ordering::Acquire) != request_id {
            debug!("Dropping reply for a conversation that was reset");
            return SendOutcome::Discarded;
        }

        match result {
            Ok(payload) => {
                let text = normalize_reply(&payload);
                state.conversation.append(
                    ChatEntry::assistant(self.assistant_tag.clone(), text).with_meta(meta),
                );
                state.last_call_ok = Some(true);
                state.requests.increment();
                SendOutcome::Delivered
            }
            Err(err) => {
                warn!("Chat request failed: {err}");
                let reason = err.to_string();
                state.conversation.append(
                    ChatEntry::assistant(self.assistant_tag.clone(), format!("Failed: {reason}"))
                        .with_id(format!("err-{}", new_entry_id())),
                );
                state.last_call_ok = Some(false);
                state.error = Some(reason.clone());
                state.recent_errors.push(reason.clone());
                SendOutcome::Failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::BackendError;
    use crate::api::{HealthResponse, ProviderConfig, UserRecord};
    use crate::core::message::EntryRole;
    use crate::core::preferences::PreferenceKey;
    use crate::core::providers::Provider;
    use crate::core::session::{ConsoleSession, SessionOptions};
    use crate::core::storage::MemoryStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    enum Scripted {
        Reply(Value),
        Status(u16),
        Malformed,
    }

    /// Plays back scripted replies and records every request it saw. When
    /// `gate` is set each call waits for a notification before answering.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<ChatRequest>>,
        models: Vec<String>,
        gate: Option<Arc<Notify>>,
        entered: Arc<Notify>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Scripted>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                models: Vec::new(),
                gate: None,
                entered: Arc::new(Notify::new()),
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn with_models(mut self, models: &[&str]) -> Self {
            self.models = models.iter().map(|m| m.to_string()).collect();
            self
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn list_local_models(&self, _server_url: &str) -> Result<Vec<String>, BackendError> {
            Ok(self.models.clone())
        }

        async fn send_chat(&self, request: &ChatRequest) -> Result<Value, BackendError> {
            self.requests.lock().unwrap().push(request.clone());
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply left");
            match next {
                Scripted::Reply(value) => Ok(value),
                Scripted::Status(code) => Err(BackendError::Status {
                    status: reqwest::StatusCode::from_u16(code).unwrap(),
                    body: String::new(),
                }),
                Scripted::Malformed => Err(BackendError::Decode(
                    serde_json::from_str::<Value>("<html>").unwrap_err(),
                )),
            }
        }

        async fn health(&self, _server_url: &str) -> Result<HealthResponse, BackendError> {
            Ok(HealthResponse::default())
        }

        async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
            Ok(Vec::new())
        }
    }

    fn open(backend: Arc<ScriptedBackend>) -> ConsoleSession {
        ConsoleSession::open(MemoryStore::shared(), backend, SessionOptions::default())
    }

    #[tokio::test]
    async fn delivered_reply_is_appended_with_meta() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Reply(json!({
            "choices": [{ "message": { "content": "pong" } }]
        }))]));
        let session = open(backend.clone());
        session.update_preferences(|prefs| prefs.set_hosted_api_key("sk-test"));

        let mut draft = "  ping  ".to_string();
        assert_eq!(session.send(&mut draft).await, SendOutcome::Delivered);
        assert!(draft.is_empty());

        let entries = session.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].role, EntryRole::User);
        assert_eq!(entries[1].text, "ping");
        assert_eq!(entries[1].author_tag, "YOU");
        assert_eq!(entries[2].role, EntryRole::Assistant);
        assert_eq!(entries[2].text, "pong");
        let meta = entries[2].meta.as_ref().expect("reply should carry meta");
        assert_eq!(meta.provider, Provider::Hosted);
        assert_eq!(meta.model, "gpt-4o");

        let requests = backend.requests();
        assert_eq!(requests[0].message, "ping");
        assert_eq!(requests[0].provider, "openai");
        session.with_state(|state| {
            assert_eq!(state.last_call_ok, Some(true));
            assert_eq!(state.requests.count(), 1);
        });
    }

    #[tokio::test]
    async fn empty_draft_is_rejected_without_side_effects() {
        let backend = Arc::new(ScriptedBackend::new(Vec::new()));
        let session = open(backend.clone());

        let mut draft = " \n\t ".to_string();
        assert_eq!(session.send(&mut draft).await, SendOutcome::Empty);
        assert_eq!(draft, " \n\t ");
        assert_eq!(session.entries().len(), 1);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn failure_appends_entry_and_sets_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Status(500)]));
        let session = open(backend);

        let mut draft = "hello".to_string();
        let outcome = session.send(&mut draft).await;
        assert_eq!(outcome, SendOutcome::Failed("HTTP 500".to_string()));

        let entries = session.entries();
        let last = entries.last().unwrap();
        assert_eq!(last.role, EntryRole::Assistant);
        assert_eq!(last.text, "Failed: HTTP 500");
        assert!(last.id.starts_with("err-"));
        session.with_state(|state| {
            assert_eq!(state.last_call_ok, Some(false));
            assert_eq!(state.error.as_deref(), Some("HTTP 500"));
            assert_eq!(state.requests.count(), 0);
        });
    }

    #[tokio::test]
    async fn repeated_failures_get_distinct_ids_and_are_listed() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Scripted::Status(503),
            Scripted::Status(502),
        ]));
        let session = open(backend);

        for text in ["one", "two"] {
            let mut draft = text.to_string();
            assert!(matches!(session.send(&mut draft).await, SendOutcome::Failed(_)));
        }

        let failure_ids: Vec<String> = session
            .entries()
            .into_iter()
            .filter(|entry| entry.text.starts_with("Failed: "))
            .map(|entry| entry.id)
            .collect();
        assert_eq!(failure_ids.len(), 2);
        assert!(failure_ids.iter().all(|id| id.starts_with("err-")));
        assert_ne!(failure_ids[0], failure_ids[1]);
        assert_eq!(
            session.status().recent_errors,
            vec!["HTTP 502".to_string(), "HTTP 503".to_string()]
        );
    }

    #[tokio::test]
    async fn next_send_clears_previous_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Scripted::Malformed,
            Scripted::Reply(json!("fine")),
        ]));
        let session = open(backend);

        let mut draft = "one".to_string();
        assert!(matches!(session.send(&mut draft).await, SendOutcome::Failed(_)));
        let mut draft = "two".to_string();
        assert_eq!(session.send(&mut draft).await, SendOutcome::Delivered);
        session.with_state(|state| {
            assert_eq!(state.error, None);
            assert_eq!(state.last_call_ok, Some(true));
        });
    }

    #[tokio::test]
    async fn second_send_while_pending_is_a_no_op() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            ScriptedBackend::new(vec![Scripted::Reply(json!({ "text": "first" }))])
                .gated(gate.clone()),
        );
        let session = open(backend.clone());

        let mut first = "first".to_string();
        let mut second = "second".to_string();
        let (first_outcome, second_outcome) = tokio::join!(session.send(&mut first), async {
            backend.entered.notified().await;
            let outcome = session.send(&mut second).await;
            gate.notify_one();
            outcome
        });

        assert_eq!(first_outcome, SendOutcome::Delivered);
        assert_eq!(second_outcome, SendOutcome::Busy);
        assert_eq!(second, "second");
        assert_eq!(backend.requests().len(), 1);
        let texts: Vec<String> = session.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(texts[1..], ["first".to_string(), "first".to_string()]);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn reply_after_reset_is_discarded() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            ScriptedBackend::new(vec![Scripted::Reply(json!({ "text": "late" }))])
                .gated(gate.clone()),
        );
        let session = open(backend.clone());

        let mut draft = "question".to_string();
        let (outcome, ()) = tokio::join!(session.send(&mut draft), async {
            backend.entered.notified().await;
            session.reset();
            gate.notify_one();
        });

        assert_eq!(outcome, SendOutcome::Discarded);
        let entries = session.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "welcome");
        session.with_state(|state| assert_eq!(state.last_call_ok, None));
    }

    #[tokio::test]
    async fn missing_key_routes_to_local_server() {
        let backend = Arc::new(
            ScriptedBackend::new(vec![Scripted::Reply(json!({ "answer": "local" }))])
                .with_models(&["llama3"]),
        );
        let session = open(backend.clone());
        session.refresh_models().await;
        session.update_preferences(|prefs| {
            prefs.apply(PreferenceKey::Temperature, "0.2").unwrap();
        });

        let mut draft = "hi".to_string();
        assert_eq!(session.send(&mut draft).await, SendOutcome::Delivered);

        let request = &backend.requests()[0];
        assert_eq!(request.provider, "ollama");
        assert_eq!(request.temperature, 0.2);
        assert_eq!(
            request.config,
            ProviderConfig::Local {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
            }
        );
        // Routing never rewrites the stored provider.
        session.with_state(|state| {
            assert_eq!(state.preferences.preferences().provider, Provider::Hosted)
        });
    }
}
