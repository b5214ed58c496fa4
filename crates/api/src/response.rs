//! Response decoding helpers.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Longest body excerpt carried inside errors.
pub const BODY_PREVIEW_LIMIT: usize = 200;

/// Return a hint for status codes that usually mean a configuration problem.
///
/// # Example
/// ```rust
/// use relay_api::response::status_error_message;
///
/// assert!(status_error_message(401).unwrap().contains("github_token"));
/// assert!(status_error_message(404).unwrap().contains("workflow_file_name"));
/// assert!(status_error_message(500).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<&'static str> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: check that github_token is set and not expired"),
        403 => Some("Forbidden (403). Hint: the token needs actions:write on the target repository"),
        404 => Some("Not Found (404). Hint: check owner, repo, and workflow_file_name, and that the token can see the repository"),
        422 => Some(
            "Unprocessable (422). Hint: the workflow must declare `workflow_dispatch`, the ref must exist, and every input must be declared",
        ),
        _ => None,
    }
}

/// Decode a JSON response body into `T`, decorating failures with the status
/// and a truncated preview of the body.
pub fn parse_response_json_strict<T>(text: &str, status: Option<StatusCode>) -> Result<T, JsonParseError>
where
    T: DeserializeOwned,
{
    serde_json::from_str::<T>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        JsonParseError::new(status_note, error, truncate_response_preview(text, BODY_PREVIEW_LIMIT))
    })
}

/// Collapse whitespace and cut `text` to roughly `limit` bytes.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of a response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

#[cfg(test)]
mod tests {
    use relay_types::RunSummary;

    use super::*;

    #[test]
    fn strict_parse_reports_status_and_preview() {
        let error = parse_response_json_strict::<RunSummary>("<html>\n\tupstream down</html>", Some(StatusCode::OK))
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("status 200 OK"));
        assert_eq!(error.body_preview(), "<html> upstream down</html>");
    }

    #[test]
    fn preview_is_truncated() {
        let body = "x".repeat(500);
        let preview = truncate_response_preview(&body, 10);
        assert_eq!(preview, "xxxxxxxxxx...");
        assert_eq!(truncate_response_preview("  ", 10), "<empty>");
    }
}
