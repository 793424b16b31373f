//! Failure classification for backend responses.
//!
//! | Source | Error |
//! |---|---|
//! | connect / timeout / transport | `NetworkUnavailable` |
//! | 401, 403 | `Unauthenticated` |
//! | 409 | `SessionConflict` |
//! | 422 | `InvalidAction(Backend)` |
//! | other non-2xx | `ServerError { code, message }` |
//! | undecodable body | `Decoding` |

use combat_core::{CombatError, InvalidAction};
use serde_json::Value;

pub fn classify_status(status: u16, body: &str) -> CombatError {
    let message = extract_message(body).unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        401 | 403 => CombatError::Unauthenticated,
        409 => CombatError::SessionConflict(message),
        422 => CombatError::InvalidAction(InvalidAction::Backend(message)),
        _ => CombatError::ServerError {
            code: status,
            message,
        },
    }
}

pub fn classify_transport(err: &reqwest::Error) -> CombatError {
    if err.is_decode() {
        return CombatError::Decoding(err.to_string());
    }
    CombatError::NetworkUnavailable(err.to_string())
}

/// Pulls a human-readable message out of an error body.
///
/// Accepts `{"message": ..}`, `{"error": ".."}`, `{"error": {"message": ..}}`,
/// or falls back to the raw text.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let nested = value.get("error").and_then(|e| e.get("message"));
        let found = value
            .get("message")
            .or(nested)
            .or_else(|| value.get("error"))
            .and_then(Value::as_str);
        if let Some(message) = found {
            return Some(message.to_string());
        }
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_distinct() {
        assert_eq!(classify_status(401, ""), CombatError::Unauthenticated);
        assert_eq!(
            classify_status(403, r#"{"message":"expired"}"#),
            CombatError::Unauthenticated
        );
    }

    #[test]
    fn conflict_and_rejection() {
        assert_eq!(
            classify_status(409, r#"{"error":"session expired"}"#),
            CombatError::SessionConflict("session expired".into())
        );
        assert_eq!(
            classify_status(422, r#"{"error":{"message":"not your turn"}}"#),
            CombatError::InvalidAction(InvalidAction::Backend("not your turn".into()))
        );
    }

    #[test]
    fn other_statuses_keep_code_and_text() {
        assert_eq!(
            classify_status(502, "bad gateway\n"),
            CombatError::server(502, "bad gateway")
        );
        assert_eq!(classify_status(500, "  "), CombatError::server(500, "HTTP 500"));
        assert_eq!(
            classify_status(404, r#"{"code":7}"#),
            CombatError::server(404, r#"{"code":7}"#)
        );
    }
}
