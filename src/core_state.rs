//! Shared service state: completion-backend readiness plus the article
//! history store.
//!
//! Backend readiness is an explicit state machine — `Uninitialized`,
//! `Ready`, `Failed` — queried by the health endpoint and checked by every
//! stage handler before work starts. No boolean flags.

use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::config::AppConfig;
use crate::history::HistoryStore;
use crate::pipeline::completion::GeminiClient;
use crate::pipeline::CompletionClient;

/// Completion-backend readiness.
#[derive(Clone)]
pub enum BackendState {
    Uninitialized,
    Ready(Arc<CompletionClient>),
    Failed(String),
}

impl BackendState {
    /// Health-endpoint label for this state.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "initializing",
            Self::Ready(_) => "healthy",
            Self::Failed(_) => "unhealthy",
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("completion backend is still initializing")]
    NotReady,
    #[error("completion backend failed to initialize: {0}")]
    BackendFailed(String),
    #[error("state lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    History(#[from] crate::history::HistoryError),
}

pub struct CoreState {
    backend: RwLock<BackendState>,
    history: HistoryStore,
}

impl CoreState {
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        Ok(Self {
            backend: RwLock::new(BackendState::Uninitialized),
            history: HistoryStore::open(&config.history_db_path)?,
        })
    }

    /// Build the completion client from `GEMINI_API_KEY` and transition to
    /// `Ready`, or to `Failed` when the key is absent.
    pub fn initialize_backend(&self, config: &AppConfig) {
        let next = match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                let client = CompletionClient::new(
                    Arc::new(GeminiClient::new(key)),
                    config.model.clone(),
                    config.fallback_model.clone(),
                    config.generation.clone(),
                    config.retry.clone(),
                );
                tracing::info!(model = %config.model, fallback = %config.fallback_model, "completion backend ready");
                BackendState::Ready(Arc::new(client))
            }
            _ => {
                tracing::error!("GEMINI_API_KEY is not set, generation endpoints will return 503");
                BackendState::Failed("GEMINI_API_KEY is not set".into())
            }
        };

        if let Ok(mut state) = self.backend.write() {
            *state = next;
        }
    }

    /// Snapshot of the readiness state.
    pub fn backend_state(&self) -> BackendState {
        self.backend
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|_| BackendState::Failed("state lock poisoned".into()))
    }

    /// The completion client, or the readiness error preventing its use.
    pub fn completion(&self) -> Result<Arc<CompletionClient>, CoreError> {
        let state = self.backend.read().map_err(|_| CoreError::LockPoisoned)?;
        match &*state {
            BackendState::Uninitialized => Err(CoreError::NotReady),
            BackendState::Failed(reason) => Err(CoreError::BackendFailed(reason.clone())),
            BackendState::Ready(client) => Ok(client.clone()),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    #[cfg(test)]
    pub fn with_ready_client(config: &AppConfig, client: CompletionClient) -> Arc<Self> {
        let state = Self::new(config).unwrap();
        *state.backend.write().unwrap() = BackendState::Ready(Arc::new(client));
        Arc::new(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            history_db_path: ":memory:".into(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn starts_uninitialized() {
        let state = CoreState::new(&test_config()).unwrap();
        assert_eq!(state.backend_state().label(), "initializing");
        assert!(matches!(state.completion(), Err(CoreError::NotReady)));
    }

    #[test]
    fn missing_api_key_transitions_to_failed() {
        let state = CoreState::new(&test_config()).unwrap();
        // Key deliberately absent in the test environment
        std::env::remove_var("GEMINI_API_KEY");
        state.initialize_backend(&test_config());
        assert_eq!(state.backend_state().label(), "unhealthy");
        assert!(matches!(
            state.completion(),
            Err(CoreError::BackendFailed(_))
        ));
    }
}
