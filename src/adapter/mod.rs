//! Capability handler adapter.
//!
//! Handlers are external programs or services. They are reached through a
//! [`CapabilityPort`], one method per capability, so the mechanism (HTTP relay,
//! direct process spawn, in-memory fake) is interchangeable. The
//! [`CapabilityAdapter`] builds the per-capability request and bounds every
//! call with a timeout; it never retries and keeps no state between calls.

pub mod error;
pub mod http_relay;
pub mod process;

pub use error::{InvocationError, parse_output};
pub use http_relay::HttpRelayPort;
pub use process::ProcessPort;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::Capability;

/// Boxed future type for port operations.
pub type InvokeFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, InvocationError>> + Send + 'a>>;

/// Arguments sent to a handler.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HandlerRequest {
    /// Free-text query.
    pub message: String,
    /// Turn timestamp in RFC 3339; absent for web search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl HandlerRequest {
    /// Build the request for `capability`.
    #[must_use]
    pub fn for_capability(
        capability: Capability,
        free_text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            message: free_text.into(),
            time: capability
                .takes_time()
                .then(|| timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// Port to the three external handlers.
pub trait CapabilityPort: Send + Sync {
    /// Search the mailbox.
    ///
    /// # Errors
    /// Returns an error if the handler fails or answers with non-JSON output.
    fn search_mail<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a>;

    /// Search the calendar.
    ///
    /// # Errors
    /// Returns an error if the handler fails or answers with non-JSON output.
    fn search_calendar<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a>;

    /// Search the web.
    ///
    /// # Errors
    /// Returns an error if the handler fails or answers with non-JSON output.
    fn web_search<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a>;
}

/// Dispatch a request to the port method of `capability`.
pub fn dispatch<'a>(
    port: &'a dyn CapabilityPort,
    capability: Capability,
    request: &'a HandlerRequest,
) -> InvokeFuture<'a> {
    match capability {
        Capability::Mail => port.search_mail(request),
        Capability::Calendar => port.search_calendar(request),
        Capability::WebSearch => port.web_search(request),
    }
}

/// Uniform, timeout-bounded entry point for handler invocations.
#[derive(Clone)]
pub struct CapabilityAdapter {
    port: Arc<dyn CapabilityPort>,
    timeout: Duration,
}

impl CapabilityAdapter {
    /// Wrap a port.
    #[must_use]
    pub fn new(port: Arc<dyn CapabilityPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Invoke one handler once.
    ///
    /// # Errors
    /// `ProcessFailure` on handler failure or timeout, `MalformedOutput` on non-JSON output.
    pub async fn invoke(
        &self,
        capability: Capability,
        free_text: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Value, InvocationError> {
        let request = HandlerRequest::for_capability(capability, free_text, timestamp);
        tracing::debug!(%capability, query = %request.message, "invoking handler");

        match tokio::time::timeout(self.timeout, dispatch(self.port.as_ref(), capability, &request)).await {
            Ok(result) => result,
            Err(_) => Err(InvocationError::process_failure(format!(
                "{} handler timed out after {}s",
                capability,
                self.timeout.as_secs()
            ))),
        }
    }
}
