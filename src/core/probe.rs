//! Local model discovery and backend health polling.
//!
//! Both run independently of chat sends and may overlap with one.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::client::ChatBackend;
use crate::api::ProviderStatuses;
use crate::core::providers::LocalServerStatus;
use crate::core::session::{lock_state, ConsoleState, SharedState};

pub const DEFAULT_HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// What the last model listing told us about the local server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalModels {
    pub available: Vec<String>,
    pub status: LocalServerStatus,
}

impl LocalModels {
    pub fn mark_offline(&mut self) {
        self.status = LocalServerStatus::Offline;
        self.available.clear();
    }

    pub fn contains(&self, model: &str) -> bool {
        self.available.iter().any(|name| name == model)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Online {
        models: Vec<String>,
        /// Set when the preferred local model had to be replaced.
        selected: Option<String>,
    },
    Offline {
        reason: String,
    },
}

impl ConsoleState {
    /// Record a successful listing. If the preferred local model is missing
    /// from a non-empty list, the first listed model becomes the preference.
    pub fn apply_model_listing(&mut self, models: Vec<String>) -> Option<String> {
        self.local.available = models;
        self.local.status = LocalServerStatus::Online;

        let preferred = &self.preferences.preferences().local_model;
        match self.local.available.first() {
            Some(first) if !self.local.contains(preferred) => {
                let first = first.clone();
                self.preferences.set_local_model(first.clone());
                Some(first)
            }
            _ => None,
        }
    }

    pub fn apply_health(&mut self, statuses: &ProviderStatuses) {
        match statuses.openai.as_deref() {
            Some("ok") if self.last_call_ok.is_none() => self.last_call_ok = Some(true),
            Some("key-missing") => self.last_call_ok = Some(false),
            _ => {}
        }
        match statuses.ollama.as_deref() {
            Some("ok") => self.local.status = LocalServerStatus::Online,
            Some("offline") => self.local.status = LocalServerStatus::Offline,
            Some("error") => self.local.status = LocalServerStatus::Unknown,
            _ => {}
        }
    }
}

/// Ask the backend which models the configured local server exposes.
pub async fn refresh_models(backend: &dyn ChatBackend, state: &SharedState) -> ProbeOutcome {
    let server_url = lock_state(state)
        .preferences
        .preferences()
        .local_server_url
        .clone();

    match backend.list_local_models(&server_url).await {
        Ok(models) => {
            let mut state = lock_state(state);
            let selected = state.apply_model_listing(models);
            if let Some(model) = &selected {
                debug!("Preferred local model switched to {model}");
            }
            ProbeOutcome::Online {
                models: state.local.available.clone(),
                selected,
            }
        }
        Err(err) => {
            warn!("Failed to fetch local models from {server_url}: {err}");
            lock_state(state).local.mark_offline();
            ProbeOutcome::Offline {
                reason: err.to_string(),
            }
        }
    }
}

/// One health check. Failures are expected while the backend restarts and
/// are only logged.
pub async fn poll_health(backend: &dyn ChatBackend, state: &SharedState) {
    let server_url = lock_state(state)
        .preferences
        .preferences()
        .local_server_url
        .clone();

    match backend.health(&server_url).await {
        Ok(health) => lock_state(state).apply_health(&health.provider_statuses),
        Err(err) => debug!("Health poll failed: {err}"),
    }
}

/// Poll health immediately and then every `interval` until `cancel` fires.
pub fn spawn_health_poller(
    backend: Arc<dyn ChatBackend>,
    state: SharedState,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => poll_health(backend.as_ref(), &state).await,
            }
        }
    })
}
