//! Error types for capability handler invocation.

use thiserror::Error;

/// Longest slice of raw handler output kept in an error.
const MAX_DIAGNOSTIC_CHARS: usize = 2_000;

/// A single handler invocation failed.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum InvocationError {
    /// Non-zero exit, transport failure, or timeout.
    #[error("handler process failed: {diagnostic}")]
    ProcessFailure {
        /// Captured stderr/stdout or transport error text.
        diagnostic: String,
    },

    /// The handler answered, but not with JSON.
    #[error("handler output is not valid JSON ({reason}): {raw}")]
    MalformedOutput {
        /// Raw output, truncated.
        raw: String,
        /// Parser message.
        reason: String,
    },
}

impl InvocationError {
    /// Build a process failure, truncating the diagnostic.
    #[must_use]
    pub fn process_failure(diagnostic: impl AsRef<str>) -> Self {
        Self::ProcessFailure {
            diagnostic: truncate(diagnostic.as_ref().trim()),
        }
    }

    /// Build a malformed-output error, truncating the raw output.
    #[must_use]
    pub fn malformed(raw: impl AsRef<str>, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            raw: truncate(raw.as_ref()),
            reason: reason.into(),
        }
    }

    /// Stable kind name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ProcessFailure { .. } => "process_failure",
            Self::MalformedOutput { .. } => "malformed_output",
        }
    }
}

/// Parse handler output as one JSON document.
///
/// # Errors
/// Returns `MalformedOutput` carrying the raw text if parsing fails.
pub fn parse_output(raw: &str) -> Result<serde_json::Value, InvocationError> {
    serde_json::from_str(raw.trim()).map_err(|e| InvocationError::malformed(raw, e.to_string()))
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DIAGNOSTIC_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_accepts_json_with_whitespace() {
        let value = parse_output("  {\"success\": true}\n").ok();
        assert_eq!(value, Some(serde_json::json!({"success": true})));
    }

    #[test]
    fn test_parse_output_keeps_raw_text() {
        let err = parse_output("Traceback (most recent call last)");
        assert!(matches!(
            err,
            Err(InvocationError::MalformedOutput { ref raw, .. }) if raw.contains("Traceback")
        ));
    }

    #[test]
    fn test_long_diagnostics_are_truncated() {
        let err = InvocationError::process_failure("x".repeat(5_000));
        let InvocationError::ProcessFailure { diagnostic } = err else {
            panic!("process_failure builds a ProcessFailure");
        };
        assert_eq!(diagnostic.chars().count(), MAX_DIAGNOSTIC_CHARS + 1);
    }
}
