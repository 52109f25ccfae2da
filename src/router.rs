//! Intent router: decides per turn whether to call a capability.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::capability::{Capability, FunctionCallRequest, QUERY_PARAMETER};
use crate::conversation::Message;
use crate::llm::{DecisionLayer, LlmError, ModelDecision, ToolSelection, ToolSpec};

/// Default instruction given to the decision layer.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. When the user asks about calendar \
or mail data, or wants a web search, use a function call with a free-text argument.";

/// Reply used when the model answers without any text.
pub const NO_TEXT_FALLBACK: &str = "Sorry, something went wrong.";

/// Errors that prevent a routing decision.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Nothing to route.
    #[error("conversation history is empty")]
    EmptyHistory,
    /// The newest message is not from the user.
    #[error("last message must come from the user")]
    LastMessageNotUser,
    /// The decision layer could not be consulted.
    #[error("decision layer error: {0}")]
    Decision(#[from] LlmError),
}

/// Outcome of routing one turn.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// Answer the user directly with this text.
    DirectReply {
        /// Reply text.
        text: String,
    },
    /// Call a capability.
    CallRequest(FunctionCallRequest),
}

/// Routes turns through a decision layer advertising the three capabilities.
pub struct IntentRouter {
    decision: Arc<dyn DecisionLayer>,
    system_prompt: String,
    tools: Vec<ToolSpec>,
}

impl IntentRouter {
    /// Create a router with the default system prompt.
    #[must_use]
    pub fn new(decision: Arc<dyn DecisionLayer>) -> Self {
        Self {
            decision,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tools: ToolSpec::all(),
        }
    }

    /// Route the last user message of `history`, passing the full history as context.
    ///
    /// # Errors
    /// Returns an error if the history is empty, does not end with a user
    /// message, or the decision layer fails.
    pub async fn route(&self, history: &[Message]) -> Result<RouteOutcome, RouterError> {
        let last = history.last().ok_or(RouterError::EmptyHistory)?;
        if !last.is_user() {
            return Err(RouterError::LastMessageNotUser);
        }

        let decision = self
            .decision
            .decide(&self.system_prompt, history, &self.tools)
            .await?;

        Ok(interpret(decision))
    }
}

/// Turn a raw model decision into a routing outcome. Never fails.
#[must_use]
pub fn interpret(decision: ModelDecision) -> RouteOutcome {
    if let Some(selection) = decision.selection {
        return interpret_selection(selection);
    }

    let text = decision
        .text
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| NO_TEXT_FALLBACK.to_string());
    tracing::debug!("decision layer answered directly");
    RouteOutcome::DirectReply { text }
}

fn interpret_selection(selection: ToolSelection) -> RouteOutcome {
    let Some(capability) = Capability::from_tool_name(&selection.name) else {
        tracing::warn!(function = %selection.name, "decision layer selected an unknown function");
        return RouteOutcome::DirectReply {
            text: format!("The requested function \"{}\" is not recognized.", selection.name),
        };
    };

    let free_text = extract_free_text(&selection.arguments);
    tracing::debug!(%capability, query = %free_text, "decision layer selected a capability");
    RouteOutcome::CallRequest(FunctionCallRequest::new(capability, free_text))
}

/// Pull the query out of the argument payload; unparsable payloads count as `{}`.
fn extract_free_text(arguments: &str) -> String {
    let raw = if arguments.trim().is_empty() { "{}" } else { arguments };
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, arguments = %arguments, "unparsable function arguments, using empty query");
            Value::Object(serde_json::Map::new())
        }
    };

    parsed
        .get(QUERY_PARAMETER)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted decision layer for router, orchestrator and server tests.

    use std::sync::Mutex;

    use crate::llm::{DecisionFuture, LlmResult};

    use super::*;

    /// Answers with a fixed decision (or an error) and records the histories it saw.
    pub struct ScriptedDecision {
        pub answer: Mutex<Option<LlmResult<ModelDecision>>>,
        pub seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedDecision {
        pub fn answering(decision: ModelDecision) -> Self {
            Self {
                answer: Mutex::new(Some(Ok(decision))),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: LlmError) -> Self {
            Self {
                answer: Mutex::new(Some(Err(error))),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn seen(&self) -> Vec<Vec<Message>> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    impl DecisionLayer for ScriptedDecision {
        fn decide<'a>(
            &'a self,
            _system_prompt: &'a str,
            history: &'a [Message],
            _tools: &'a [ToolSpec],
        ) -> DecisionFuture<'a, LlmResult<ModelDecision>> {
            Box::pin(async move {
                if let Ok(mut seen) = self.seen.lock() {
                    seen.push(history.to_vec());
                }
                let scripted = self.answer.lock().ok().and_then(|mut a| a.take());
                scripted.unwrap_or_else(|| Ok(ModelDecision::default()))
            })
        }
    }
}
