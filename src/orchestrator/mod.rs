//! Turn orchestrator: one user submission through to one assistant message.
//!
//! A turn moves through `Routing`, then `Invoking` and `Normalizing` when a
//! capability is called, and always ends back at `Idle`. The phase is set
//! before the first `.await` and reset by [`LoadingGuard`] on every exit path,
//! including the turn future being dropped mid-flight.

pub mod error;

pub use error::{TurnError, TurnResult};

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;

use crate::adapter::CapabilityAdapter;
use crate::capability::Capability;
use crate::conversation::{ConversationSnapshot, ConversationState, Message, TurnPhase};
use crate::normalize::{DisplayResult, normalize};
use crate::router::{IntentRouter, RouteOutcome};

/// Line appended when the decision layer could not be consulted.
pub const ROUTING_FAILURE_LINE: &str = "Sorry, the answer could not be retrieved. Please try again.";

/// Line appended when a capability handler failed.
#[must_use]
pub const fn failure_line(capability: Capability) -> &'static str {
    match capability {
        Capability::Mail => "Sorry, the mail search failed. Please try again later.",
        Capability::Calendar => "Sorry, the calendar could not be read. Please try again later.",
        Capability::WebSearch => "Sorry, the web search failed. Please try again later.",
    }
}

/// How a turn ended.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnKind {
    /// The decision layer answered directly.
    DirectReply {
        /// Reply text.
        text: String,
    },
    /// A capability was called and its output normalized.
    Capability {
        /// Called capability.
        capability: Capability,
        /// Normalized handler output.
        display: DisplayResult,
    },
    /// Routing or invocation failed.
    Failed {
        /// Capability that failed, `None` if routing failed.
        capability: Option<Capability>,
        /// User-facing error line.
        line: String,
    },
}

impl TurnKind {
    /// Text appended to the conversation for this outcome.
    #[must_use]
    pub fn reply_text(&self) -> &str {
        match self {
            Self::DirectReply { text } => text,
            Self::Capability { display, .. } => display.text(),
            Self::Failed { line, .. } => line,
        }
    }

    /// Whether the turn produced a usable answer.
    #[must_use]
    pub const fn success(&self) -> bool {
        match self {
            Self::DirectReply { .. } => true,
            Self::Capability { display, .. } => display.success(),
            Self::Failed { .. } => false,
        }
    }

    /// Stable name for logs and API responses.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DirectReply { .. } => "direct_reply",
            Self::Capability { .. } => "capability",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Result of a completed turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Assistant message appended by the turn.
    pub reply: Message,
    /// How the turn ended.
    pub kind: TurnKind,
}

/// Drives turns for one conversation.
pub struct TurnOrchestrator {
    router: IntentRouter,
    adapter: CapabilityAdapter,
    state: Mutex<ConversationState>,
}

impl TurnOrchestrator {
    /// Create an orchestrator over an existing conversation.
    #[must_use]
    pub const fn new(router: IntentRouter, adapter: CapabilityAdapter, state: ConversationState) -> Self {
        Self {
            router,
            adapter,
            state: Mutex::new(state),
        }
    }

    /// Current conversation, as the UI renders it.
    #[must_use]
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.lock().snapshot()
    }

    /// Run one turn for `text`.
    ///
    /// # Errors
    /// `EmptyMessage` for blank input, `Busy` while another turn is in flight.
    /// In both cases the conversation is left untouched.
    pub async fn submit(&self, text: &str) -> TurnResult<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let history = {
            let mut state = self.lock();
            if state.is_loading() {
                tracing::warn!(phase = %state.phase(), "rejecting submission while a turn is in flight");
                return Err(TurnError::Busy);
            }
            state.begin_turn(text)
        };
        let _loading = LoadingGuard { state: &self.state };

        let kind = self.run_turn(&history).await;
        tracing::info!(outcome = kind.label(), success = kind.success(), "turn finished");

        let reply = {
            let mut state = self.lock();
            if let TurnKind::Failed { line, .. } = &kind {
                state.set_last_error(line.clone());
            }
            state.push_assistant(kind.reply_text())
        };

        Ok(TurnOutcome { reply, kind })
    }

    async fn run_turn(&self, history: &[Message]) -> TurnKind {
        let request = match self.router.route(history).await {
            Ok(RouteOutcome::DirectReply { text }) => return TurnKind::DirectReply { text },
            Ok(RouteOutcome::CallRequest(request)) => request,
            Err(e) => {
                tracing::error!(error = %e, "routing failed");
                return TurnKind::Failed {
                    capability: None,
                    line: ROUTING_FAILURE_LINE.to_string(),
                };
            }
        };

        let capability = request.capability;
        self.set_phase(TurnPhase::Invoking);
        let raw = match self.adapter.invoke(capability, &request.free_text, Utc::now()).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(%capability, kind = e.kind(), error = %e, "handler invocation failed");
                return TurnKind::Failed {
                    capability: Some(capability),
                    line: failure_line(capability).to_string(),
                };
            }
        };

        self.set_phase(TurnPhase::Normalizing);
        TurnKind::Capability {
            capability,
            display: normalize(capability, &raw),
        }
    }

    fn set_phase(&self, phase: TurnPhase) {
        self.lock().set_phase(phase);
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the conversation to `Idle` when dropped.
struct LoadingGuard<'a> {
    state: &'a Mutex<ConversationState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_phase(TurnPhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::adapter::InvocationError;
    use crate::adapter::testing::ScriptedPort;
    use crate::conversation::Role;
    use crate::llm::{LlmError, ModelDecision};
    use crate::router::testing::ScriptedDecision;

    fn orchestrator(
        decision: ScriptedDecision,
        port: Result<Value, InvocationError>,
    ) -> (TurnOrchestrator, Arc<ScriptedPort>) {
        let port = Arc::new(ScriptedPort::returning(port));
        (build(decision, port.clone()), port)
    }

    fn build(decision: ScriptedDecision, port: Arc<ScriptedPort>) -> TurnOrchestrator {
        TurnOrchestrator::new(
            IntentRouter::new(Arc::new(decision)),
            CapabilityAdapter::new(port, Duration::from_secs(5)),
            ConversationState::with_greeting("Hi!"),
        )
    }

    #[tokio::test]
    async fn test_direct_reply_appends_one_message() {
        let (orchestrator, port) = orchestrator(
            ScriptedDecision::answering(ModelDecision::text("Hello!")),
            Ok(json!({})),
        );

        let outcome = orchestrator.submit("  hi  ").await;

        let Ok(outcome) = outcome else {
            panic!("turn should complete");
        };
        assert_eq!(outcome.reply, Message::assistant("Hello!"));
        assert!(outcome.kind.success());
        let snapshot = orchestrator.snapshot();
        assert_eq!(
            snapshot.messages,
            vec![Message::assistant("Hi!"), Message::user("hi"), Message::assistant("Hello!")]
        );
        assert!(!snapshot.loading);
        assert_eq!(snapshot.phase, TurnPhase::Idle);
        assert!(port.calls().is_empty());
    }

    #[tokio::test]
    async fn test_capability_result_is_normalized() {
        let (orchestrator, port) = orchestrator(
            ScriptedDecision::answering(ModelDecision::call("getMail", r#"{"text":"from Anna"}"#)),
            Ok(json!({"relevante_emails": [{"betreff": "Meeting", "absender": "Anna", "id": "42"}]})),
        );

        let outcome = orchestrator.submit("any mail from Anna?").await.ok();

        let Some(TurnOutcome {
            reply,
            kind: TurnKind::Capability { capability, display },
        }) = outcome
        else {
            panic!("expected a capability outcome");
        };
        assert_eq!(capability, Capability::Mail);
        assert_eq!(reply.content, display.text());
        assert!(reply.content.contains("Meeting"));

        let calls = port.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.message, "from Anna");
        assert!(calls[0].1.time.is_some());
        assert_eq!(orchestrator.snapshot().last_error, None);
    }

    #[tokio::test]
    async fn test_handler_failure_hides_diagnostic() {
        let (orchestrator, _) = orchestrator(
            ScriptedDecision::answering(ModelDecision::call("getCalendar", r#"{"text":"today"}"#)),
            Err(InvocationError::process_failure("boom")),
        );

        let outcome = orchestrator.submit("what's on today?").await.ok();

        let Some(outcome) = outcome else {
            panic!("a failed turn still completes");
        };
        assert!(!outcome.reply.content.contains("boom"));
        assert_eq!(outcome.reply.content, failure_line(Capability::Calendar));
        assert_eq!(
            outcome.kind,
            TurnKind::Failed {
                capability: Some(Capability::Calendar),
                line: failure_line(Capability::Calendar).to_string(),
            }
        );

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.messages.len(), 3);
        assert!(snapshot.messages.iter().all(|m| !m.content.contains("boom")));
        assert_eq!(snapshot.last_error.as_deref(), Some(failure_line(Capability::Calendar)));
        assert!(!snapshot.loading);
        assert_eq!(snapshot.phase, TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_malformed_output_is_a_failure() {
        let (orchestrator, _) = orchestrator(
            ScriptedDecision::answering(ModelDecision::call("webSearch", r#"{"text":"rust"}"#)),
            Err(InvocationError::malformed("<html>", "expected value")),
        );

        let outcome = orchestrator.submit("search rust").await.ok();

        assert_eq!(
            outcome.map(|o| o.reply.content),
            Some(failure_line(Capability::WebSearch).to_string())
        );
    }

    #[tokio::test]
    async fn test_routing_failure_uses_generic_line() {
        let (orchestrator, port) = orchestrator(
            ScriptedDecision::failing(LlmError::EmptyChoices),
            Ok(json!({})),
        );

        let outcome = orchestrator.submit("hi").await.ok();

        assert_eq!(
            outcome.map(|o| o.kind),
            Some(TurnKind::Failed {
                capability: None,
                line: ROUTING_FAILURE_LINE.to_string(),
            })
        );
        assert!(port.calls().is_empty());
        assert_eq!(orchestrator.snapshot().last_error.as_deref(), Some(ROUTING_FAILURE_LINE));
    }

    #[tokio::test]
    async fn test_last_error_is_cleared_by_next_turn() {
        let (orchestrator, _) = orchestrator(
            ScriptedDecision::failing(LlmError::EmptyChoices),
            Ok(json!({})),
        );
        let _ = orchestrator.submit("first").await;
        assert!(orchestrator.snapshot().last_error.is_some());

        // The scripted layer has no answer left, so the next turn gets the fallback reply.
        let outcome = orchestrator.submit("second").await.ok();
        assert!(matches!(outcome.map(|o| o.kind), Some(TurnKind::DirectReply { .. })));
        assert_eq!(orchestrator.snapshot().last_error, None);
    }

    #[tokio::test]
    async fn test_unknown_function_is_a_direct_reply() {
        let (orchestrator, port) = orchestrator(
            ScriptedDecision::answering(ModelDecision::call("getWeather", "{}")),
            Ok(json!({})),
        );

        let outcome = orchestrator.submit("weather?").await.ok();

        let Some(TurnKind::DirectReply { text }) = outcome.map(|o| o.kind) else {
            panic!("expected a direct reply");
        };
        assert!(text.contains("getWeather"));
        assert!(port.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let (orchestrator, _) = orchestrator(
            ScriptedDecision::answering(ModelDecision::text("x")),
            Ok(json!({})),
        );

        assert_eq!(orchestrator.submit("   \n").await, Err(TurnError::EmptyMessage));
        assert_eq!(orchestrator.snapshot().messages, vec![Message::assistant("Hi!")]);
    }

    #[tokio::test]
    async fn test_submission_while_loading_is_rejected() {
        let (orchestrator, _) = orchestrator(
            ScriptedDecision::answering(ModelDecision::text("x")),
            Ok(json!({})),
        );
        let _ = orchestrator.lock().begin_turn("in flight");
        let before = orchestrator.snapshot();

        assert_eq!(orchestrator.submit("second").await, Err(TurnError::Busy));
        assert_eq!(orchestrator.snapshot(), before);
    }

    #[tokio::test]
    async fn test_concurrent_submission_is_rejected() {
        let port = Arc::new(ScriptedPort::returning(Ok(json!({}))).delayed(Duration::from_millis(200)));
        let orchestrator = Arc::new(build(
            ScriptedDecision::answering(ModelDecision::call("getCalendar", r#"{"text":"x"}"#)),
            port,
        ));

        let first = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.submit("first").await }
        });
        while !orchestrator.snapshot().loading {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(orchestrator.submit("second").await, Err(TurnError::Busy));
        let first = first.await.ok().and_then(Result::ok);
        assert!(first.is_some());

        let snapshot = orchestrator.snapshot();
        let users: Vec<_> = snapshot.messages.iter().filter(|m| m.role == Role::User).collect();
        assert_eq!(users.len(), 1);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_dropped_turn_returns_to_idle() {
        let port = Arc::new(ScriptedPort::returning(Ok(json!({}))).delayed(Duration::from_secs(30)));
        let orchestrator = build(
            ScriptedDecision::answering(ModelDecision::call("getMail", r#"{"text":"x"}"#)),
            port,
        );

        let cancelled = tokio::time::timeout(Duration::from_millis(50), orchestrator.submit("slow")).await;

        assert!(cancelled.is_err());
        let snapshot = orchestrator.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.phase, TurnPhase::Idle);
    }
}
