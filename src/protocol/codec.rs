//! Text-frame codec for protocol messages.
//!
//! Decoding is all-or-nothing: a message that parses but violates a
//! structural invariant is rejected with [`Error::Protocol`] instead of being
//! handed out partially populated.
//!
//! | Failure | Error |
//! |---------|-------|
//! | Not JSON | [`Error::Json`] |
//! | Missing or unknown `action` | [`Error::UnknownAction`] |
//! | Missing or unknown `type`, missing fields | [`Error::Protocol`] |
//! | `count` ≠ `matches.len()` | [`Error::Protocol`] |
//! | Confidence outside `[0, 1]` | [`Error::Protocol`] |
//! | `similar_element_count` > total elements | [`Error::Protocol`] |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, from_str, from_value, to_string};

use crate::error::{Error, Result};

use super::request::ClientMessage;
use super::response::ServerMessage;
use super::types::PatternAnalysis;

// ============================================================================
// Client Messages
// ============================================================================

/// Encodes a client message as a text frame.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_client(message: &ClientMessage) -> Result<String> {
    Ok(to_string(message)?)
}

/// Decodes a client text frame.
///
/// # Errors
///
/// - [`Error::Json`] if the frame is not JSON
/// - [`Error::UnknownAction`] if `action` is missing or not recognized
/// - [`Error::Protocol`] if required fields are missing, empty or mistyped
pub fn decode_client(text: &str) -> Result<ClientMessage> {
    let value: Value = from_str(text)?;

    let action = value
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !ClientMessage::ACTIONS.contains(&action) {
        return Err(Error::unknown_action(action));
    }

    let (fields, missing) = required_fields(action);
    let present = |field: &&str| {
        value
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|text| !text.trim().is_empty())
    };
    if !fields.iter().all(present) {
        return Err(Error::protocol(missing));
    }

    from_value(value).map_err(|e| Error::protocol(format!("Malformed request: {e}")))
}

/// Required string fields per action and the error reported when one is
/// absent or blank.
fn required_fields(action: &str) -> (&'static [&'static str], &'static str) {
    match action {
        "analyze_page" => (&["url"], "Missing URL"),
        _ => (&["selector", "url"], "Missing selector or URL"),
    }
}

// ============================================================================
// Server Messages
// ============================================================================

/// Encodes a server message as a text frame.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_server(message: &ServerMessage) -> Result<String> {
    Ok(to_string(message)?)
}

/// Decodes a server text frame.
///
/// # Errors
///
/// - [`Error::Json`] if the frame is not JSON
/// - [`Error::Protocol`] if the `type` is unknown, fields are missing, or an
///   invariant is violated
pub fn decode_server(text: &str) -> Result<ServerMessage> {
    let value: Value = from_str(text)?;

    let message: ServerMessage =
        from_value(value).map_err(|e| Error::protocol(format!("Malformed message: {e}")))?;
    validate_server(&message)?;
    Ok(message)
}

fn validate_server(message: &ServerMessage) -> Result<()> {
    match message {
        ServerMessage::SelectorResults { matches, count, .. } => {
            if *count != matches.len() {
                return Err(Error::protocol(format!(
                    "count {count} does not match {} matches",
                    matches.len()
                )));
            }
        }
        ServerMessage::PageAnalysis {
            pattern_analysis, ..
        } => validate_analysis(pattern_analysis)?,
        ServerMessage::Error { .. } => {}
    }
    Ok(())
}

fn validate_analysis(analysis: &PatternAnalysis) -> Result<()> {
    check_confidence("pattern_analysis.confidence", analysis.confidence)?;

    for recommendation in &analysis.recommendations {
        check_confidence("recommendation.confidence", recommendation.confidence)?;
    }

    let total = analysis.total_elements();
    if analysis.similar_element_count > total {
        return Err(Error::protocol(format!(
            "similar_element_count {} exceeds {total} elements",
            analysis.similar_element_count
        )));
    }

    Ok(())
}

fn check_confidence(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::protocol(format!("{field} {value} outside [0, 1]")))
    }
}

// ============================================================================
// Tests
// ============================================================================
