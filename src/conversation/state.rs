//! Per-session conversation state.
//!
//! `ConversationState` is a plain state container. Only the turn orchestrator
//! mutates it; everything else sees it through a [`ConversationSnapshot`].
//!
//! [`TurnPhase`] only names the phases a turn can be observed in while it is
//! in flight. How a turn ended (direct reply, capability result, failure) is
//! a terminal outcome reported by the orchestrator's `TurnKind`. By the time
//! a turn returns the phase is back at `Idle`, and a failure stays visible in
//! a snapshot through `last_error`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Phase of the turn currently in flight. Terminal outcomes are not phases.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn in flight; submissions are accepted.
    #[default]
    Idle,
    /// Waiting on the decision layer.
    Routing,
    /// Waiting on a capability handler.
    Invoking,
    /// Turning a handler result into display text.
    Normalizing,
}

impl TurnPhase {
    /// Stable string form for logs and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Routing => "routing",
            Self::Invoking => "invoking",
            Self::Normalizing => "normalizing",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Messages, loading flag, and last error of one session.
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    phase: TurnPhase,
    last_error: Option<String>,
}

impl ConversationState {
    /// Create an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation seeded with an assistant greeting.
    #[must_use]
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
            ..Self::default()
        }
    }

    /// Messages in conversation order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current turn phase.
    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Whether a turn is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    /// User-facing error line of the last failed turn, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start a turn: mark it loading, clear the last error, append the user
    /// message and return the full history including it.
    pub(crate) fn begin_turn(&mut self, user_text: &str) -> Vec<Message> {
        self.phase = TurnPhase::Routing;
        self.last_error = None;
        self.messages.push(Message::user(user_text));
        self.messages.clone()
    }

    pub(crate) const fn set_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
    }

    pub(crate) fn push_assistant(&mut self, content: impl Into<String>) -> Message {
        let message = Message::assistant(content);
        self.messages.push(message.clone());
        message
    }

    pub(crate) fn set_last_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Serializable copy for the UI.
    #[must_use]
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            loading: self.is_loading(),
            phase: self.phase,
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only view of a conversation, as rendered by the UI.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// Messages in conversation order.
    pub messages: Vec<Message>,
    /// Whether a turn is in flight.
    pub loading: bool,
    /// Current turn phase.
    pub phase: TurnPhase,
    /// Error line of the last failed turn.
    pub last_error: Option<String>,
}
