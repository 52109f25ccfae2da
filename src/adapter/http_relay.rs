//! Capability port that talks to the handler relay over HTTP.

use std::time::Duration;

use reqwest::Client;

use crate::capability::Capability;

use super::error::{InvocationError, parse_output};
use super::{CapabilityPort, HandlerRequest, InvokeFuture};

/// Connection timeout for the relay.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay path for a capability.
#[must_use]
pub const fn relay_path(capability: Capability) -> &'static str {
    match capability {
        Capability::Mail => "/get_mail",
        Capability::Calendar => "/get_calendar",
        Capability::WebSearch => "/web_search",
    }
}

/// HTTP client for the relay, one per session.
pub struct HttpRelayPort {
    client: Client,
    base_url: String,
}

impl HttpRelayPort {
    /// Build a port for the relay at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, InvocationError> {
        url::Url::parse(base_url)
            .map_err(|e| InvocationError::process_failure(format!("invalid relay URL: {e}")))?;
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| InvocationError::process_failure(format!("HTTP client error: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL for a capability.
    #[must_use]
    pub fn url_for(&self, capability: Capability) -> String {
        format!("{}{}", self.base_url, relay_path(capability))
    }

    async fn post(&self, capability: Capability, request: &HandlerRequest) -> Result<serde_json::Value, InvocationError> {
        let url = self.url_for(capability);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| InvocationError::process_failure(format!("relay unreachable: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InvocationError::process_failure(format!("relay response unreadable: {e}")))?;

        if !status.is_success() {
            return Err(InvocationError::process_failure(format!(
                "relay returned {status}: {body}"
            )));
        }

        parse_output(&body)
    }
}

impl CapabilityPort for HttpRelayPort {
    fn search_mail<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a> {
        Box::pin(self.post(Capability::Mail, request))
    }

    fn search_calendar<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a> {
        Box::pin(self.post(Capability::Calendar, request))
    }

    fn web_search<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a> {
        Box::pin(self.post(Capability::WebSearch, request))
    }
}
