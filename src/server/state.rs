//! Application state shared across all request handlers.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::adapter::{CapabilityAdapter, CapabilityPort, HttpRelayPort, InvocationError, ProcessPort};
use crate::config::{AppConfig, HandlerTransport};
use crate::conversation::{ConversationState, SessionId};
use crate::llm::{ChatCompletionsClient, DecisionLayer, LlmError};
use crate::orchestrator::TurnOrchestrator;
use crate::router::IntentRouter;

/// Clients one session talks to.
pub struct SessionClients {
    /// Decision layer used by the session's router.
    pub decision: Arc<dyn DecisionLayer>,
    /// Handler port used by the session's adapter.
    pub port: Arc<dyn CapabilityPort>,
}

/// Builds fresh clients for each new session.
pub type ClientFactory = Box<dyn Fn(&AppConfig) -> Result<SessionClients, SessionError> + Send + Sync>;

/// A session could not be opened.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Decision layer client construction failed.
    #[error("decision layer client: {0}")]
    Llm(#[from] LlmError),
    /// Handler port construction failed.
    #[error("handler port: {0}")]
    Handler(#[from] InvocationError),
}

/// One chat session.
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Turn driver owning the session's conversation.
    pub orchestrator: TurnOrchestrator,
}

/// Shared application state.
pub struct AppState {
    config: AppConfig,
    sessions: DashMap<SessionId, Arc<Session>>,
    factory: ClientFactory,
}

impl AppState {
    /// Create state that builds real clients from `config`.
    #[must_use]
    pub fn new(config: AppConfig) -> Arc<Self> {
        Self::with_factory(config, Box::new(default_clients))
    }

    /// Create state with a custom client factory.
    #[must_use]
    pub fn with_factory(config: AppConfig, factory: ClientFactory) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: DashMap::new(),
            factory,
        })
    }

    /// Start a session with its own clients and conversation.
    ///
    /// # Errors
    /// Returns an error if a client cannot be built.
    pub fn open_session(&self) -> Result<Arc<Session>, SessionError> {
        let clients = (self.factory)(&self.config)?;
        let conversation = match self.config.greeting.as_deref().filter(|g| !g.trim().is_empty()) {
            Some(greeting) => ConversationState::with_greeting(greeting),
            None => ConversationState::new(),
        };

        let orchestrator = TurnOrchestrator::new(
            IntentRouter::new(clients.decision),
            CapabilityAdapter::new(clients.port, self.config.handlers.timeout),
            conversation,
        );
        let session = Arc::new(Session {
            id: SessionId::new(),
            orchestrator,
        });

        self.sessions.insert(session.id, Arc::clone(&session));
        tracing::info!(session = %session.id, "session opened");
        Ok(session)
    }

    /// Look up a session.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// End a session, dropping its clients. Returns whether it existed.
    pub fn close_session(&self, id: SessionId) -> bool {
        let existed = self.sessions.remove(&id).is_some();
        if existed {
            tracing::info!(session = %id, "session closed");
        }
        existed
    }

    /// Number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

fn default_clients(config: &AppConfig) -> Result<SessionClients, SessionError> {
    let decision: Arc<dyn DecisionLayer> = Arc::new(ChatCompletionsClient::new(&config.llm)?);
    let port: Arc<dyn CapabilityPort> = match config.handlers.transport {
        HandlerTransport::Relay => Arc::new(HttpRelayPort::new(&config.handlers.relay_url)?),
        HandlerTransport::Process => Arc::new(ProcessPort::from_config(&config.handlers)),
    };
    Ok(SessionClients { decision, port })
}
