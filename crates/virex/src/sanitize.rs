//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Logs are meant to be shareable when reporting a problem, so local paths and
//! server payloads are trimmed before they are recorded.

use std::path::Path;

const MAX_BODY_CHARS: usize = 200;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Collapses whitespace and caps a server response body for logging.
pub fn truncate_body(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_BODY_CHARS {
        return collapsed;
    }

    let truncated: String = collapsed.chars().take(MAX_BODY_CHARS).collect();
    format!("{}...", truncated)
}
