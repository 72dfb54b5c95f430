//! Client → server messages.
//!
//! # Format
//!
//! ```json
//! { "action": "test_selector", "selector": "a.next-page", "url": "https://example.com", "request_id": 3 }
//! { "action": "analyze_page", "url": "https://example.com", "request_id": 4 }
//! ```
//!
//! `request_id` is optional; the server echoes it on every reply.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::RequestSeq;

// ============================================================================
// ClientMessage
// ============================================================================

/// A request sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Evaluate a selector against the document at `url`.
    TestSelector {
        /// CSS selector.
        selector: String,
        /// Target document.
        url: String,
        /// Request sequence, echoed on replies.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestSeq>,
    },

    /// Analyze the structure of the document at `url`.
    AnalyzePage {
        /// Target document.
        url: String,
        /// Request sequence, echoed on replies.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestSeq>,
    },
}

impl ClientMessage {
    /// Action names accepted by the server.
    pub const ACTIONS: [&'static str; 2] = ["test_selector", "analyze_page"];

    /// Creates a `test_selector` request.
    #[inline]
    #[must_use]
    pub fn test_selector(
        selector: impl Into<String>,
        url: impl Into<String>,
        request_id: Option<RequestSeq>,
    ) -> Self {
        Self::TestSelector {
            selector: selector.into(),
            url: url.into(),
            request_id,
        }
    }

    /// Creates an `analyze_page` request.
    #[inline]
    #[must_use]
    pub fn analyze_page(url: impl Into<String>, request_id: Option<RequestSeq>) -> Self {
        Self::AnalyzePage {
            url: url.into(),
            request_id,
        }
    }

    /// Returns the action name.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::TestSelector { .. } => "test_selector",
            Self::AnalyzePage { .. } => "analyze_page",
        }
    }

    /// Returns the request sequence, if any.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Option<RequestSeq> {
        match self {
            Self::TestSelector { request_id, .. } | Self::AnalyzePage { request_id, .. } => {
                *request_id
            }
        }
    }

    /// Returns the target document url.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::TestSelector { url, .. } | Self::AnalyzePage { url, .. } => url,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_selector_serialization() {
        let message = ClientMessage::test_selector("#g1", "https://example.com", None);
        let json = serde_json::to_value(&message).expect("serialize");

        assert_eq!(json["action"], "test_selector");
        assert_eq!(json["selector"], "#g1");
        assert_eq!(json["url"], "https://example.com");
        assert!(json.get("request_id").is_none());
    }

    #[test]
    fn test_request_id_is_carried() {
        let message =
            ClientMessage::analyze_page("https://example.com", Some(RequestSeq::new(9)));
        let json = serde_json::to_value(&message).expect("serialize");

        assert_eq!(json["action"], "analyze_page");
        assert_eq!(json["request_id"], 9);
        assert_eq!(message.request_id(), Some(RequestSeq::new(9)));
    }

    #[test]
    fn test_parse_without_request_id() {
        let json = r#"{"action": "test_selector", "selector": ".item", "url": "u"}"#;
        let message: ClientMessage = serde_json::from_str(json).expect("parse");

        assert_eq!(message.action(), "test_selector");
        assert_eq!(message.url(), "u");
        assert_eq!(message.request_id(), None);
    }
}
