//! Calendar handler output: passed through as-is.

use serde_json::Value;

use super::display::DisplayResult;

/// Calendar output has a single schema: whatever the handler sent.
#[derive(Clone, Debug, PartialEq)]
pub enum CalendarPayload {
    /// Raw payload plus the handler's own success flag, if it sent one.
    Passthrough {
        /// Unmodified handler output.
        raw: Value,
        /// `success` field when it is a boolean.
        success: Option<bool>,
    },
}

impl CalendarPayload {
    /// Classify raw output.
    #[must_use]
    pub fn classify(raw: &Value) -> Self {
        Self::Passthrough {
            raw: raw.clone(),
            success: raw.get("success").and_then(Value::as_bool),
        }
    }

    /// Render for display. A bare JSON string is shown as its content,
    /// anything else as compact JSON.
    #[must_use]
    pub fn render(&self) -> DisplayResult {
        match self {
            Self::Passthrough { raw, success } => {
                let text = match raw {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                DisplayResult::new(text, success.unwrap_or(true)).with_meta(raw.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_is_not_reformatted() {
        let raw = json!({"tasks": [{"title": "Standup", "time": "09:00"}]});
        let result = CalendarPayload::classify(&raw).render();
        assert_eq!(result.text(), raw.to_string());
        assert_eq!(result.meta(), Some(&raw));
        assert!(result.success());
    }

    #[test]
    fn test_success_flag_is_honored() {
        let raw = json!({"success": false, "message": "calendar unavailable"});
        assert!(!CalendarPayload::classify(&raw).render().success());
        let raw = json!({"success": "yes"});
        assert!(CalendarPayload::classify(&raw).render().success());
    }

    #[test]
    fn test_bare_string_is_shown_as_text() {
        let result = CalendarPayload::classify(&json!("No appointments today.")).render();
        assert_eq!(result.text(), "No appointments today.");
    }

    #[test]
    fn test_odd_shapes_still_render() {
        assert_eq!(CalendarPayload::classify(&json!(null)).render().text(), "null");
        assert_eq!(CalendarPayload::classify(&json!([])).render().text(), "[]");
        assert!(!CalendarPayload::classify(&json!("")).render().text().is_empty());
    }
}
