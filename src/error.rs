//! Error types for selector sessions.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use selector_session::{Result, Error};
//!
//! fn example(session: &Session) -> Result<()> {
//!     let seq = session.submit("a.next-page", "https://example.com")?;
//!     println!("submitted {seq}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidConfigId`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Session | [`Error::NotConnected`], [`Error::ReconnectExhausted`], [`Error::SessionDetached`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnknownAction`] |
//! | Selector | [`Error::InvalidSelector`], [`Error::DocumentNotFound`], [`Error::ElementNotFound`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::session::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection or engine options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Configuration id is not usable as a channel address.
    #[error("Invalid configuration id: {value:?}")]
    InvalidConfigId {
        /// The rejected value.
        value: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport could not be established or failed mid-flight.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Transport closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Request dropped because the channel is not open.
    ///
    /// The reconnect path has been triggered if attempts remain; the caller
    /// must resubmit once the session is open again.
    #[error("Channel not open (state: {state}), request dropped")]
    NotConnected {
        /// State observed at submission time.
        state: ConnectionState,
    },

    /// Reconnect budget exhausted; a manual reconnect is required.
    #[error("Gave up after {attempts} reconnect attempts")]
    ReconnectExhausted {
        /// Number of reconnect attempts made.
        attempts: u32,
    },

    /// Session has been detached from its connection.
    #[error("Session detached")]
    SessionDetached,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed or structurally invalid message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Client message carried an unrecognized action.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The unrecognized action.
        action: String,
    },

    // ========================================================================
    // Selector Errors
    // ========================================================================
    /// Selector could not be parsed.
    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// The rejected selector.
        selector: String,
        /// Parser diagnostic.
        message: String,
    },

    /// No document is available for the url.
    #[error("Document not found: {url}")]
    DocumentNotFound {
        /// Requested document url.
        url: String,
    },

    /// Element path does not resolve in the document.
    #[error("Element not found: url={url}, path={path:?}")]
    ElementNotFound {
        /// Document url.
        url: String,
        /// Child-index path from the root element.
        path: Vec<usize>,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration id error.
    #[inline]
    pub fn invalid_config_id(value: impl Into<String>) -> Self {
        Self::InvalidConfigId {
            value: value.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(state: ConnectionState) -> Self {
        Self::NotConnected { state }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates an invalid selector error.
    #[inline]
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Creates a document not found error.
    #[inline]
    pub fn document_not_found(url: impl Into<String>) -> Self {
        Self::DocumentNotFound { url: url.into() }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(url: impl Into<String>, path: impl Into<Vec<usize>>) -> Self {
        Self::ElementNotFound {
            url: url.into(),
            path: path.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a transport-level error.
    ///
    /// Transport errors drive the reconnect path and are never fatal
    /// on their own.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if this error belongs to evaluation of a selector.
    ///
    /// These are reported to the client as `error` messages.
    #[inline]
    #[must_use]
    pub fn is_selector_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSelector { .. }
                | Self::DocumentNotFound { .. }
                | Self::ElementNotFound { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry without manual action.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::Connection { .. }
                | Self::NotConnected { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
