//! Web search handler output.
//!
//! Success: `{ai_summary, search_results: [{title, link, snippet}, ...]}`.
//! Failure: `{error}`. An `error` field always means failure, even next to a summary.

use serde_json::Value;

use super::display::DisplayResult;
use super::text_field;

/// Result entries shown under the summary.
pub const MAX_RESULTS: usize = 5;
/// Snippet characters shown per entry.
pub const SNIPPET_CHARS: usize = 100;

const GENERIC_FAILURE: &str = "no results could be retrieved";

/// One search hit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub link: String,
    /// Snippet text.
    pub snippet: String,
}

/// Known web search output schemas, in precedence order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WebSearchPayload {
    /// Summary with hits.
    Summary {
        /// AI summary text.
        summary: String,
        /// Organic results, in handler order.
        hits: Vec<SearchHit>,
    },
    /// Handler error or unrecognized output.
    Failure {
        /// Handler error text, if any.
        error: Option<String>,
    },
}

impl WebSearchPayload {
    /// Classify raw output.
    #[must_use]
    pub fn classify(raw: &Value) -> Self {
        let error = raw.get("error").filter(|e| !e.is_null());
        let summary = raw.get("ai_summary").and_then(Value::as_str);

        match (summary, error) {
            (Some(summary), None) => Self::Summary {
                summary: summary.to_string(),
                hits: raw
                    .get("search_results")
                    .and_then(Value::as_array)
                    .map(|results| {
                        results
                            .iter()
                            .map(|r| SearchHit {
                                title: text_field(r, "title"),
                                link: text_field(r, "link"),
                                snippet: text_field(r, "snippet"),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            (_, error) => Self::Failure {
                error: error
                    .map(|e| match e {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .filter(|e| !e.trim().is_empty()),
            },
        }
    }

    /// Render for display.
    #[must_use]
    pub fn render(&self) -> DisplayResult {
        match self {
            Self::Summary { summary, hits } => DisplayResult::new(render_summary(summary, hits), true),
            Self::Failure { error } => DisplayResult::new(
                format!(
                    "Web search failed: {}",
                    error.as_deref().unwrap_or(GENERIC_FAILURE)
                ),
                false,
            ),
        }
    }
}

fn render_summary(summary: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("Summary:\n{}", summary.trim());
    if hits.is_empty() {
        return out;
    }

    out.push_str("\n\nTop results:");
    for (i, hit) in hits.iter().take(MAX_RESULTS).enumerate() {
        out.push_str(&format!(
            "\n\n{}. {}\n   {}\n   {}",
            i + 1,
            hit.title,
            hit.link,
            truncate_chars(&hit.snippet, SNIPPET_CHARS)
        ));
    }
    out
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hit(n: usize) -> Value {
        json!({"title": format!("Title {n}"), "link": format!("https://example.com/{n}"), "snippet": "short"})
    }

    #[test]
    fn test_summary_with_hits() {
        let raw = json!({
            "search_query": "weather berlin",
            "ai_summary": "Sunny, 24°C.",
            "search_results": [hit(1), hit(2)]
        });
        let result = WebSearchPayload::classify(&raw).render();
        let text = result.text();
        assert!(result.success());
        assert!(text.starts_with("Summary:\nSunny, 24°C."));
        assert!(text.contains("1. Title 1\n   https://example.com/1\n   short"));
        assert!(text.contains("2. Title 2"));
    }

    #[test]
    fn test_at_most_five_hits() {
        let results: Vec<Value> = (1..=8).map(hit).collect();
        let raw = json!({"ai_summary": "s", "search_results": results});
        let text = WebSearchPayload::classify(&raw).render().into_text();
        assert!(text.contains("5. Title 5"));
        assert!(!text.contains("Title 6"));
    }

    #[test]
    fn test_snippet_is_cut_to_100_chars() {
        let snippet = "ä".repeat(150);
        let raw = json!({"ai_summary": "s", "search_results": [{"title": "t", "link": "l", "snippet": snippet}]});
        let text = WebSearchPayload::classify(&raw).render().into_text();
        let expected = format!("{}...", "ä".repeat(100));
        assert!(text.contains(&expected));
        assert!(!text.contains(&"ä".repeat(101)));
    }

    #[test]
    fn test_summary_without_results() {
        let raw = json!({"ai_summary": "No search results found.", "search_results": []});
        let result = WebSearchPayload::classify(&raw).render();
        assert_eq!(result.text(), "Summary:\nNo search results found.");
        assert!(result.success());
    }

    #[test]
    fn test_error_field_means_failure() {
        let result = WebSearchPayload::classify(&json!({"error": "quota exceeded"})).render();
        assert!(!result.success());
        assert!(result.text().contains("quota exceeded"));

        let both = json!({"ai_summary": "s", "error": "partial failure"});
        assert!(!WebSearchPayload::classify(&both).render().success());
    }

    #[test]
    fn test_unrecognized_shape_uses_generic_failure() {
        for raw in [json!({}), json!({"ai_summary": 3}), json!([1, 2]), json!({"error": ""})] {
            let result = WebSearchPayload::classify(&raw).render();
            assert!(!result.success());
            assert!(result.text().contains(GENERIC_FAILURE));
        }
    }

    #[test]
    fn test_non_string_error_is_embedded() {
        let result = WebSearchPayload::classify(&json!({"error": {"code": 429}})).render();
        assert!(result.text().contains("429"));
    }
}
