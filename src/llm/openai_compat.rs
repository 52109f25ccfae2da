//! OpenAI-compatible chat-completions client used as the decision layer.
//!
//! Works against OpenAI itself and against Ollama's `/v1` endpoint. Functions
//! are advertised as `tools` with `tool_choice: "auto"`; the answer may come
//! back as `tool_calls` or as the legacy single `function_call`.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::conversation::Message;

use super::decision::{DecisionFuture, DecisionLayer, ModelDecision, ToolSelection, ToolSpec};
use super::error::{LlmError, LlmResult};

/// Connection timeout for the decision layer.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct FunctionDefinition<'a> {
    name: &'a str,
    description: &'a str,
    parameters: Value,
}

#[derive(Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDefinition<'a>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    tools: Vec<ToolDefinition<'a>>,
    tool_choice: &'static str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl FunctionCall {
    /// Arguments as raw text: providers send either a JSON string or an object.
    fn into_selection(self) -> ToolSelection {
        let arguments = match self.arguments {
            Value::String(raw) => raw,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        ToolSelection {
            name: self.name,
            arguments,
        }
    }
}

/// Session-scoped chat-completions client.
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl ChatCompletionsClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        url::Url::parse(&config.base_url)?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
        })
    }

    /// Endpoint the client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_chat(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolSpec],
    ) -> LlmResult<ModelDecision> {
        let request = build_request(&self.model, self.temperature, system_prompt, history, tools);

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatusNotOk {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await?;
        parse_response(body)
    }
}

impl DecisionLayer for ChatCompletionsClient {
    fn decide<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [Message],
        tools: &'a [ToolSpec],
    ) -> DecisionFuture<'a, LlmResult<ModelDecision>> {
        Box::pin(self.post_chat(system_prompt, history, tools))
    }
}

fn build_request<'a>(
    model: &'a str,
    temperature: f32,
    system_prompt: &'a str,
    history: &'a [Message],
    tools: &'a [ToolSpec],
) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage {
        role: "system",
        content: system_prompt,
    });
    messages.extend(history.iter().map(|m| ChatMessage {
        role: m.role.as_str(),
        content: &m.content,
    }));

    let tools = tools
        .iter()
        .map(|spec| ToolDefinition {
            kind: "function",
            function: FunctionDefinition {
                name: &spec.name,
                description: &spec.description,
                parameters: spec.parameters_schema(),
            },
        })
        .collect();

    ChatRequest {
        model,
        messages,
        temperature,
        tools,
        tool_choice: "auto",
        stream: false,
    }
}

fn parse_response(body: ChatResponse) -> LlmResult<ModelDecision> {
    let choice = body.choices.into_iter().next().ok_or(LlmError::EmptyChoices)?;
    let message = choice.message;

    let selection = message
        .tool_calls
        .and_then(|calls| calls.into_iter().next())
        .map(|call| call.function)
        .or(message.function_call)
        .map(FunctionCall::into_selection);

    Ok(ModelDecision {
        text: message.content,
        selection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> LlmResult<ModelDecision> {
        let body: ChatResponse = serde_json::from_str(raw).unwrap_or(ChatResponse {
            choices: Vec::new(),
        });
        parse_response(body)
    }

    #[test]
    fn test_request_carries_system_prompt_history_and_tools() {
        let history = vec![Message::user("hi"), Message::assistant("hello"), Message::user("mails?")];
        let tools = ToolSpec::all();
        let request = build_request("m", 0.7, "be helpful", &history, &tools);
        let json = serde_json::to_value(&request).unwrap_or_default();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be helpful");
        assert_eq!(json["messages"].as_array().map(Vec::len), Some(4));
        assert_eq!(json["messages"][3]["content"], "mails?");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["tool_choice"], "auto");
    }

    #[test]
    fn test_parses_tool_call_with_string_arguments() {
        let decision = parse(
            r#"{"choices":[{"message":{"content":null,"tool_calls":[{"id":"c1","type":"function","function":{"name":"getMail","arguments":"{\"text\":\"from Anna\"}"}}]}}]}"#,
        )
        .ok();
        let selection = decision.and_then(|d| d.selection);
        assert_eq!(
            selection,
            Some(ToolSelection {
                name: "getMail".to_string(),
                arguments: r#"{"text":"from Anna"}"#.to_string(),
            })
        );
    }

    #[test]
    fn test_parses_object_arguments_and_legacy_function_call() {
        let decision = parse(
            r#"{"choices":[{"message":{"function_call":{"name":"webSearch","arguments":{"text":"rust"}}}}]}"#,
        )
        .ok()
        .and_then(|d| d.selection);
        assert_eq!(decision.map(|s| s.arguments), Some(r#"{"text":"rust"}"#.to_string()));
    }

    #[test]
    fn test_parses_plain_text() {
        let decision = parse(r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#).ok();
        assert_eq!(decision, Some(ModelDecision::text("Hello!")));
    }

    #[test]
    fn test_empty_choices_is_error() {
        assert!(matches!(parse(r#"{"choices":[]}"#), Err(LlmError::EmptyChoices)));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = LlmConfig::default().with_base_url("http://localhost:11434/v1/");
        let client = ChatCompletionsClient::new(&config).ok();
        assert_eq!(
            client.as_ref().map(ChatCompletionsClient::endpoint),
            Some("http://localhost:11434/v1/chat/completions")
        );
    }
}
