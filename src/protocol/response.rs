//! Server → client messages.
//!
//! # Format
//!
//! Results:
//! ```json
//! { "type": "selector_results", "selector": "#g1", "matches": [ ... ], "count": 1 }
//! ```
//!
//! Error:
//! ```json
//! { "type": "error", "message": "Error testing selector: ..." }
//! ```
//!
//! Analysis:
//! ```json
//! { "type": "page_analysis", "pattern_analysis": { ... } }
//! ```
//!
//! `selector_results` and `page_analysis` answering the same request arrive
//! as separate messages.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::RequestSeq;

use super::types::{MatchedElement, PatternAnalysis};

// ============================================================================
// ServerMessage
// ============================================================================

/// A message sent by the evaluation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Elements matched by a `test_selector` request.
    SelectorResults {
        /// The evaluated selector.
        selector: String,
        /// Matched elements in document order.
        matches: Vec<MatchedElement>,
        /// Number of matches.
        count: usize,
        /// Echoed request sequence.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestSeq>,
    },

    /// Evaluation-level failure.
    Error {
        /// Error description.
        message: String,
        /// Echoed request sequence.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestSeq>,
    },

    /// Structural analysis of the target document.
    PageAnalysis {
        /// Analyzed document url.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Pattern statistics.
        pattern_analysis: PatternAnalysis,
        /// Echoed request sequence.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestSeq>,
    },
}

impl ServerMessage {
    /// Creates a `selector_results` message.
    ///
    /// `count` is derived from `matches`.
    #[must_use]
    pub fn selector_results(
        selector: impl Into<String>,
        matches: Vec<MatchedElement>,
        request_id: Option<RequestSeq>,
    ) -> Self {
        Self::SelectorResults {
            selector: selector.into(),
            count: matches.len(),
            matches,
            request_id,
        }
    }

    /// Creates an `error` message.
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>, request_id: Option<RequestSeq>) -> Self {
        Self::Error {
            message: message.into(),
            request_id,
        }
    }

    /// Creates a `page_analysis` message.
    #[inline]
    #[must_use]
    pub fn page_analysis(
        url: Option<String>,
        pattern_analysis: PatternAnalysis,
        request_id: Option<RequestSeq>,
    ) -> Self {
        Self::PageAnalysis {
            url,
            pattern_analysis,
            request_id,
        }
    }

    /// Returns the `type` discriminator.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::SelectorResults { .. } => "selector_results",
            Self::Error { .. } => "error",
            Self::PageAnalysis { .. } => "page_analysis",
        }
    }

    /// Returns the echoed request sequence, if any.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Option<RequestSeq> {
        match self {
            Self::SelectorResults { request_id, .. }
            | Self::Error { request_id, .. }
            | Self::PageAnalysis { request_id, .. } => *request_id,
        }
    }

    /// Returns `true` if this message completes a pending `test_selector`.
    #[inline]
    #[must_use]
    pub fn is_completion(&self) -> bool {
        matches!(self, Self::SelectorResults { .. } | Self::Error { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
