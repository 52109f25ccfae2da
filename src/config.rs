//! Configuration for the chat server and the handler relay.
//!
//! Values come from `SYNAPSE_*` environment variables; everything has a default
//! so a bare `synapse` talks to a local Ollama and a local relay.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::Capability;

/// Default chat API port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default relay port.
pub const DEFAULT_RELAY_PORT: u16 = 8000;

const DEFAULT_GREETING: &str =
    "Hi! I'm your chat assistant. I can search your mail, your calendar, or the web. How can I help?";

/// Errors raised while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A URL setting does not parse.
    #[error("invalid URL in {key}: {source}")]
    InvalidUrl {
        /// Setting name.
        key: &'static str,
        /// Parse failure.
        source: url::ParseError,
    },
    /// A setting has a value of the wrong form.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
    /// A setting is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience result alias for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Decision layer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (without `/chat/completions`).
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whole-request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/v1".to_string(),
            model: "llama3.1:8b".to_string(),
            api_key: None,
            temperature: 0.7,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl LlmConfig {
    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// How capability handlers are reached.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerTransport {
    /// Over HTTP through the relay.
    #[default]
    Relay,
    /// By spawning the handler process directly.
    Process,
}

/// A handler program and its fixed leading arguments.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HandlerCommand {
    /// Executable to run.
    pub program: String,
    /// Arguments placed before the query arguments.
    pub args: Vec<String>,
}

impl HandlerCommand {
    /// Create a command from a program and its fixed arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a POSIX-quoted command line. Returns `None` for empty or unbalanced input.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = shlex::split(line)?.into_iter();
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }
}

/// Capability handler settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Transport used by the chat server.
    pub transport: HandlerTransport,
    /// Relay base URL.
    pub relay_url: String,
    /// Mail handler command.
    pub mail: HandlerCommand,
    /// Calendar handler command.
    pub calendar: HandlerCommand,
    /// Web search handler command.
    pub web_search: HandlerCommand,
    /// Working directory for handler processes.
    pub working_dir: Option<PathBuf>,
    /// Upper bound for one invocation.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            transport: HandlerTransport::Relay,
            relay_url: format!("http://127.0.0.1:{DEFAULT_RELAY_PORT}"),
            mail: HandlerCommand::new("python3", ["mail_agent/main.py"]),
            calendar: HandlerCommand::new("python3", ["calendar_agent/main.py"]),
            web_search: HandlerCommand::new("python3", ["web_search/main.py"]),
            working_dir: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl HandlerConfig {
    /// Command configured for a capability.
    #[must_use]
    pub const fn command(&self, capability: Capability) -> &HandlerCommand {
        match capability {
            Capability::Mail => &self.mail,
            Capability::Calendar => &self.calendar,
            Capability::WebSearch => &self.web_search,
        }
    }
}

/// Listening ports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Chat API port.
    pub port: u16,
    /// Relay port.
    pub relay_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            relay_port: DEFAULT_RELAY_PORT,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Decision layer settings.
    pub llm: LlmConfig,
    /// Handler settings.
    pub handlers: HandlerConfig,
    /// Ports.
    pub server: ServerConfig,
    /// First assistant message of each session; `None` starts empty.
    pub greeting: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            handlers: HandlerConfig::default(),
            server: ServerConfig::default(),
            greeting: Some(DEFAULT_GREETING.to_string()),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable is malformed or the result fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if a variable is malformed or the result fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("SYNAPSE_LLM_URL") {
            config.llm = config.llm.with_base_url(url);
        }
        if let Some(model) = lookup("SYNAPSE_LLM_MODEL") {
            config.llm = config.llm.with_model(model);
        }
        if let Some(key) = lookup("SYNAPSE_LLM_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty())
        {
            config.llm = config.llm.with_api_key(key);
        }
        if let Some(raw) = lookup("SYNAPSE_LLM_TEMPERATURE") {
            config.llm.temperature = parse_value("SYNAPSE_LLM_TEMPERATURE", &raw)?;
        }

        if let Some(raw) = lookup("SYNAPSE_HANDLER_TRANSPORT") {
            config.handlers.transport = match raw.trim().to_ascii_lowercase().as_str() {
                "relay" | "http" => HandlerTransport::Relay,
                "process" | "exec" => HandlerTransport::Process,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SYNAPSE_HANDLER_TRANSPORT",
                        value: raw,
                    });
                }
            };
        }
        if let Some(url) = lookup("SYNAPSE_RELAY_URL") {
            config.handlers.relay_url = url;
        }
        for (key, capability) in [
            ("SYNAPSE_MAIL_HANDLER", Capability::Mail),
            ("SYNAPSE_CALENDAR_HANDLER", Capability::Calendar),
            ("SYNAPSE_WEB_SEARCH_HANDLER", Capability::WebSearch),
        ] {
            if let Some(line) = lookup(key) {
                let command = HandlerCommand::parse(&line)
                    .ok_or(ConfigError::InvalidValue { key, value: line })?;
                match capability {
                    Capability::Mail => config.handlers.mail = command,
                    Capability::Calendar => config.handlers.calendar = command,
                    Capability::WebSearch => config.handlers.web_search = command,
                }
            }
        }
        if let Some(dir) = lookup("SYNAPSE_HANDLER_DIR") {
            config.handlers.working_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup("SYNAPSE_HANDLER_TIMEOUT_SECS") {
            let secs: u64 = parse_value("SYNAPSE_HANDLER_TIMEOUT_SECS", &raw)?;
            config.handlers.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("SYNAPSE_PORT") {
            config.server.port = parse_value("SYNAPSE_PORT", &raw)?;
        }
        if let Some(raw) = lookup("SYNAPSE_RELAY_PORT") {
            config.server.relay_port = parse_value("SYNAPSE_RELAY_PORT", &raw)?;
        }

        if let Some(greeting) = lookup("SYNAPSE_GREETING") {
            config.greeting = Some(greeting).filter(|g| !g.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        url::Url::parse(&self.llm.base_url).map_err(|source| ConfigError::InvalidUrl {
            key: "llm.base_url",
            source,
        })?;
        url::Url::parse(&self.handlers.relay_url).map_err(|source| ConfigError::InvalidUrl {
            key: "handlers.relay_url",
            source,
        })?;

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(
                "llm.temperature must be within 0.0..=2.0".to_string(),
            ));
        }
        if self.handlers.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "handlers.timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.handlers.transport, HandlerTransport::Relay);
        assert_eq!(config.handlers.timeout, Duration::from_secs(60));
        assert!(config.greeting.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SYNAPSE_LLM_URL", "https://api.openai.com/v1"),
            ("SYNAPSE_LLM_MODEL", "gpt-4o-mini"),
            ("OPENAI_API_KEY", "sk-test"),
            ("SYNAPSE_HANDLER_TRANSPORT", "process"),
            ("SYNAPSE_MAIL_HANDLER", "python3 'mail agent/main.py' --json"),
            ("SYNAPSE_HANDLER_TIMEOUT_SECS", "5"),
            ("SYNAPSE_PORT", "8080"),
            ("SYNAPSE_GREETING", "  "),
        ]));
        let Ok(config) = config else {
            panic!("overrides should produce a valid config");
        };

        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.handlers.transport, HandlerTransport::Process);
        assert_eq!(
            config.handlers.mail,
            HandlerCommand::new("python3", ["mail agent/main.py", "--json"])
        );
        assert_eq!(config.handlers.timeout, Duration::from_secs(5));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.greeting, None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("SYNAPSE_PORT", "eighty")])),
            Err(ConfigError::InvalidValue { key: "SYNAPSE_PORT", .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("SYNAPSE_HANDLER_TRANSPORT", "carrier-pigeon")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("SYNAPSE_LLM_URL", "not a url")])),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("SYNAPSE_HANDLER_TIMEOUT_SECS", "0")])),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_handler_command_parse() {
        assert_eq!(HandlerCommand::parse(""), None);
        assert_eq!(HandlerCommand::parse("python3 \"unbalanced"), None);
        assert_eq!(
            HandlerCommand::parse("node relay.js"),
            Some(HandlerCommand::new("node", ["relay.js"]))
        );
    }
}
