//! Response normalizer: raw handler output to one display contract.
//!
//! Each capability's output is classified into an explicit payload enum (one
//! variant per known handler schema, tried in a fixed order, plus a fallback)
//! and then rendered. Classification never fails, so `normalize` is total.

pub mod calendar;
pub mod display;
pub mod mail;
pub mod web_search;

pub use calendar::CalendarPayload;
pub use display::DisplayResult;
pub use mail::{MailEntry, MailPayload};
pub use web_search::{SearchHit, WebSearchPayload};

use serde_json::Value;

use crate::capability::Capability;

/// Normalize raw handler output for `capability`.
#[must_use]
pub fn normalize(capability: Capability, raw: &Value) -> DisplayResult {
    match capability {
        Capability::Mail => MailPayload::classify(raw).render(),
        Capability::Calendar => CalendarPayload::classify(raw).render(),
        Capability::WebSearch => WebSearchPayload::classify(raw).render(),
    }
}

/// String form of a scalar field; empty for missing, null, or nested values.
pub(crate) fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => String::new(),
    }
}
