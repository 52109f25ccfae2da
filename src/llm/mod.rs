//! Decision layer: the language model that routes each turn.

pub mod decision;
pub mod error;
pub mod openai_compat;

pub use decision::{DecisionFuture, DecisionLayer, ModelDecision, ToolSelection, ToolSpec};
pub use error::{LlmError, LlmResult};
pub use openai_compat::ChatCompletionsClient;
