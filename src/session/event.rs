//! Events delivered to a session's client.

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::RequestSeq;
use crate::protocol::{MatchedElement, PatternAnalysis};

use super::state::ConnectionState;

// ============================================================================
// SessionEvent
// ============================================================================

/// Notification from a session's connection actor.
///
/// | Variant | Meaning |
/// |---------|---------|
/// | `StateChanged` | Connection moved to a new state |
/// | `Results` | Selector results for the pending request |
/// | `PageAnalysis` | Pattern analysis for the pending or last request |
/// | `EvaluationError` | Server reported an evaluation error |
/// | `ProtocolError` | Unreadable frame; nothing else changed |
/// | `RequestDropped` | Pending request lost with the transport |
/// | `GaveUp` | Reconnect budget exhausted |
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Connection state changed.
    StateChanged {
        /// New state.
        state: ConnectionState,
        /// Reconnect attempt counter after the change.
        attempt: u32,
    },

    /// Selector results.
    Results {
        /// Request answered.
        seq: RequestSeq,
        /// Evaluated selector.
        selector: String,
        /// Matched elements.
        matches: Vec<MatchedElement>,
        /// Number of matches.
        count: usize,
    },

    /// Pattern analysis.
    PageAnalysis {
        /// Request answered.
        seq: RequestSeq,
        /// Analyzed document url, when reported.
        url: Option<String>,
        /// Pattern statistics.
        analysis: PatternAnalysis,
    },

    /// Evaluation-level error from the server.
    EvaluationError {
        /// Request answered.
        seq: RequestSeq,
        /// Server message.
        message: String,
    },

    /// Frame could not be decoded.
    ProtocolError {
        /// Decoder diagnostic.
        message: String,
    },

    /// Pending request lost with the transport.
    RequestDropped {
        /// Dropped request.
        seq: RequestSeq,
    },

    /// Reconnect budget exhausted.
    GaveUp {
        /// Attempts made.
        attempts: u32,
    },
}

impl SessionEvent {
    /// Returns `true` for events that complete a request.
    #[inline]
    #[must_use]
    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Results { .. } | Self::EvaluationError { .. })
    }

    /// Returns the request this event refers to, if any.
    #[must_use]
    pub fn seq(&self) -> Option<RequestSeq> {
        match self {
            Self::Results { seq, .. }
            | Self::PageAnalysis { seq, .. }
            | Self::EvaluationError { seq, .. }
            | Self::RequestDropped { seq } => Some(*seq),
            _ => None,
        }
    }
}
