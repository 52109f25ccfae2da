//! Mail handler output.
//!
//! Two schemas are in the wild: the current `{success, response}` answer and
//! the older `{relevante_emails: [...]}` listing. The answer wins if both are
//! present.

use serde_json::Value;

use super::display::{DisplayResult, sanitize};
use super::text_field;

/// Text shown when the handler found nothing usable.
pub const NO_MAIL_TEXT: &str = "Sorry, no relevant mail found.";

/// One entry of the legacy listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MailEntry {
    /// `betreff`.
    pub subject: String,
    /// `absender`.
    pub sender: String,
    /// Message id.
    pub id: String,
}

/// Known mail output schemas, in precedence order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MailPayload {
    /// `{success: true, response: "..."}`.
    Answer(String),
    /// `{relevante_emails: [{betreff, absender, id}, ...]}` with at least one entry.
    Listing(Vec<MailEntry>),
    /// Anything else.
    Empty,
}

impl MailPayload {
    /// Classify raw output.
    #[must_use]
    pub fn classify(raw: &Value) -> Self {
        let succeeded = raw.get("success").and_then(Value::as_bool) == Some(true);
        if succeeded {
            if let Some(response) = raw.get("response").and_then(Value::as_str) {
                // Judge blankness on what would actually be displayed.
                if !sanitize(response).trim().is_empty() {
                    return Self::Answer(response.to_string());
                }
            }
        }

        if let Some(entries) = raw.get("relevante_emails").and_then(Value::as_array) {
            if !entries.is_empty() {
                return Self::Listing(
                    entries
                        .iter()
                        .map(|entry| MailEntry {
                            subject: text_field(entry, "betreff"),
                            sender: text_field(entry, "absender"),
                            id: text_field(entry, "id"),
                        })
                        .collect(),
                );
            }
        }

        Self::Empty
    }

    /// Render for display.
    #[must_use]
    pub fn render(&self) -> DisplayResult {
        match self {
            Self::Answer(response) => DisplayResult::new(response, true),
            Self::Listing(entries) => DisplayResult::new(render_listing(entries), true),
            Self::Empty => DisplayResult::new(NO_MAIL_TEXT, true),
        }
    }
}

fn render_listing(entries: &[MailEntry]) -> String {
    let count = entries.len();
    let noun = if count == 1 { "email" } else { "emails" };
    let body = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{}. Subject: {}\n   From: {}\n   ID: {}",
                i + 1,
                entry.subject,
                entry.sender,
                entry.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Found {count} relevant {noun}:\n\n{body}")
}
