//! The three capabilities a chat turn can call out to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the single string parameter every capability takes.
pub const QUERY_PARAMETER: &str = "text";

/// A distinct external function the assistant can invoke for the user.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// Mailbox search.
    Mail,
    /// Calendar search.
    Calendar,
    /// Web search with an AI summary.
    WebSearch,
}

impl Capability {
    /// All capabilities, in the order they are advertised to the decision layer.
    pub const ALL: [Self; 3] = [Self::Calendar, Self::Mail, Self::WebSearch];

    /// Function name advertised to the decision layer.
    #[must_use]
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::Mail => "getMail",
            Self::Calendar => "getCalendar",
            Self::WebSearch => "webSearch",
        }
    }

    /// Resolve an advertised function name.
    #[must_use]
    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tool_name() == name)
    }

    /// Natural-language description advertised to the decision layer.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Mail => {
                "Searches the user's emails based on free text, e.g. 'show important mails from Markus'."
            }
            Self::Calendar => {
                "Searches calendar appointments based on free text, e.g. 'appointments today after 2 pm'."
            }
            Self::WebSearch => {
                "Runs a web search based on free text, e.g. 'weather Berlin today' or 'React hooks tutorial'."
            }
        }
    }

    /// Description of the free-text parameter.
    #[must_use]
    pub const fn parameter_description(self) -> &'static str {
        match self {
            Self::Mail => "Free text for the mail search, e.g. 'unanswered mails' or 'mails from Anna'.",
            Self::Calendar => {
                "Free text for the calendar search, e.g. 'appointments today after 2 pm' or 'meeting next week'."
            }
            Self::WebSearch => "Search terms as free text, e.g. 'weather Berlin today'.",
        }
    }

    /// Whether the handler receives the turn timestamp alongside the query.
    #[must_use]
    pub const fn takes_time(self) -> bool {
        matches!(self, Self::Mail | Self::Calendar)
    }

    /// Short human label used in logs and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mail => "mail",
            Self::Calendar => "calendar",
            Self::WebSearch => "web search",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A routed request to call one capability with a free-text query.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRequest {
    /// Capability to invoke.
    pub capability: Capability,
    /// Free-text query extracted by the decision layer (may be empty).
    pub free_text: String,
}

impl FunctionCallRequest {
    /// Create a new call request.
    #[must_use]
    pub fn new(capability: Capability, free_text: impl Into<String>) -> Self {
        Self {
            capability,
            free_text: free_text.into(),
        }
    }
}
