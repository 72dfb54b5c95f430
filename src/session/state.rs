//! Connection state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a session's connection.
///
/// | From | Event | To |
/// |------|-------|----|
/// | CONNECTING | handshake ok | OPEN |
/// | CONNECTING | handshake failed | RECONNECTING |
/// | OPEN | transport lost | RECONNECTING |
/// | OPEN | close | CLOSED |
/// | RECONNECTING | delay elapsed, attempts left | CONNECTING |
/// | RECONNECTING | budget exhausted | FAILED |
/// | any | manual reconnect | CONNECTING |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Channel open; requests are accepted.
    Open,
    /// Closed by the client.
    Closed,
    /// Waiting to retry after a transport loss.
    Reconnecting,
    /// Reconnect budget exhausted; needs a manual reconnect.
    Failed,
}

impl ConnectionState {
    /// Returns the lower-case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` if requests can be sent.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the actor will not leave this state on its own.
    #[inline]
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Open | Self::Closed | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
