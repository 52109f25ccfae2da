//! Decision layer abstraction.
//!
//! The decision layer sees the whole conversation plus the advertised
//! capabilities and answers with free text, a function selection, or both.

use std::future::Future;
use std::pin::Pin;

use serde_json::{Value, json};

use crate::capability::{Capability, QUERY_PARAMETER};
use crate::conversation::Message;

use super::error::LlmResult;

/// Boxed future type for decision layer calls.
pub type DecisionFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A function advertised to the decision layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolSpec {
    /// Function name.
    pub name: String,
    /// What the function does.
    pub description: String,
    /// Name of the single required string parameter.
    pub parameter: String,
    /// What the parameter should contain.
    pub parameter_description: String,
}

impl ToolSpec {
    /// Tool definition for one capability.
    #[must_use]
    pub fn for_capability(capability: Capability) -> Self {
        Self {
            name: capability.tool_name().to_string(),
            description: capability.description().to_string(),
            parameter: QUERY_PARAMETER.to_string(),
            parameter_description: capability.parameter_description().to_string(),
        }
    }

    /// Specs for every known capability.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Capability::ALL.into_iter().map(Self::for_capability).collect()
    }

    /// JSON schema of the parameter object.
    #[must_use]
    pub fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                self.parameter.as_str(): {
                    "type": "string",
                    "description": self.parameter_description,
                }
            },
            "required": [self.parameter],
        })
    }
}

/// A function selected by the decision layer, arguments still unparsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolSelection {
    /// Selected function name, as returned by the model.
    pub name: String,
    /// Raw argument payload, expected to be a JSON object.
    pub arguments: String,
}

/// What the decision layer answered for one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelDecision {
    /// Free text the model produced, if any.
    pub text: Option<String>,
    /// Function the model selected, if any.
    pub selection: Option<ToolSelection>,
}

impl ModelDecision {
    /// A plain text answer.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            selection: None,
        }
    }

    /// A function selection.
    #[must_use]
    pub fn call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            text: None,
            selection: Some(ToolSelection {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }
}

/// Trait abstraction over the language model that routes turns.
pub trait DecisionLayer: Send + Sync {
    /// Decide how to answer the last user message of `history`.
    ///
    /// # Errors
    /// Returns an error if the model cannot be reached or answers garbage.
    fn decide<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [Message],
        tools: &'a [ToolSpec],
    ) -> DecisionFuture<'a, LlmResult<ModelDecision>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_single_text_parameter() {
        let spec = ToolSpec::for_capability(Capability::Mail);
        let schema = spec.parameters_schema();
        assert_eq!(spec.name, "getMail");
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["required"], json!(["text"]));
    }

    #[test]
    fn test_all_specs_cover_every_capability() {
        let names: Vec<String> = ToolSpec::all().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["getCalendar", "getMail", "webSearch"]);
    }
}
