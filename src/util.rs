//! Small helpers shared across the logging pipeline: correlation ids,
//! ANSI level colorizing and body formatting/truncation.

/// ANSI reset sequence.
pub const ANSI_RESET: &str = "\u{1B}[0m";
/// ANSI red.
pub const ANSI_RED: &str = "\u{1B}[31m";
/// ANSI green.
pub const ANSI_GREEN: &str = "\u{1B}[32m";
/// ANSI yellow.
pub const ANSI_YELLOW: &str = "\u{1B}[33m";

/// Generate a fresh correlation id for one request.
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Wrap a severity label in an ANSI color sequence for console output.
///
/// Cosmetic only; returns the label unchanged when coloring is disabled
/// or the label is unknown.
pub fn colorize(level: &str, enable_ansi_color: bool) -> String {
    if !enable_ansi_color {
        return level.to_string();
    }
    match level.to_ascii_uppercase().as_str() {
        "ERROR" => format!("{ANSI_RED}{level}{ANSI_RESET}"),
        "WARN" => format!("{ANSI_YELLOW}{level}{ANSI_RESET}"),
        "INFO" | "DEBUG" | "TRACE" => format!("{ANSI_GREEN}{level}{ANSI_RESET}"),
        _ => level.to_string(),
    }
}

/// Pretty-print a body for the log line when the content type says JSON.
///
/// Any parse failure returns the content unchanged; formatting is best-effort
/// and must never lose the original text.
pub fn format_content(content: &str, content_type: Option<&str>) -> String {
    if content.is_empty() {
        return content.to_string();
    }
    if let Some(ct) = content_type {
        if ct.contains("application/json") {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(content) {
                if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                    return pretty;
                }
            }
        }
    }
    content.to_string()
}

/// Truncate buffered body bytes to at most `max` bytes and decode as UTF-8.
///
/// The byte limit is applied before decoding; when the cut lands inside a
/// multibyte sequence the boundary backs off so the result is valid UTF-8.
/// Undecodable content degrades to the longest valid prefix rather than
/// failing.
pub fn truncate_utf8(content: &[u8], max: usize) -> String {
    let limit = content.len().min(max);
    let slice = &content[..limit];
    match std::str::from_utf8(slice) {
        Ok(s) => s.to_string(),
        Err(e) => {
            // Either a multibyte char split by the limit or genuinely bad
            // bytes; keep whatever decodes.
            let valid = &slice[..e.valid_up_to()];
            String::from_utf8_lossy(valid).into_owned()
        }
    }
}
