//! The user-facing result of a capability call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text used if a rendering ends up empty.
const EMPTY_FALLBACK: &str = "(empty result)";

/// Normalized, renderable result of one capability call.
///
/// `text` is never empty and holds no control characters other than
/// newline and tab.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayResult {
    text: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
}

impl DisplayResult {
    /// Build a result, sanitizing `text`.
    #[must_use]
    pub fn new(text: impl AsRef<str>, success: bool) -> Self {
        let text = sanitize(text.as_ref());
        Self {
            text: if text.trim().is_empty() {
                EMPTY_FALLBACK.to_string()
            } else {
                text
            },
            success,
            meta: None,
        }
    }

    /// Attach arbitrary metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Display text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the handler reported success.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Attached metadata.
    #[must_use]
    pub const fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// Take the display text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Drop control characters except `\n` and `\t`; `\r\n` becomes `\n`.
#[must_use]
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
