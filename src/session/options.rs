//! Connection options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use selector_session::ConnectionOptions;
//!
//! let options = ConnectionOptions::new()
//!     .with_endpoint("ws://127.0.0.1:8000")
//!     .with_max_attempts(3)
//!     .with_reconnect_interval(Duration::from_millis(500));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::parse_endpoint;

// ============================================================================
// Constants
// ============================================================================

/// Default endpoint base url.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8000";

/// Default reconnect budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(2);

/// Default handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Per-session connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Endpoint base url (`ws://host:port`).
    pub endpoint: String,

    /// Reconnect attempts before giving up.
    pub max_attempts: u32,

    /// Delay before each reconnect attempt.
    pub reconnect_interval: Duration,

    /// Maximum time allowed for one handshake.
    pub handshake_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionOptions {
    /// Sets the endpoint base url.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the reconnect budget.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectionOptions {
    /// Validates the options.
    ///
    /// A zero `max_attempts` is allowed: the first transport loss then goes
    /// straight to FAILED.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is not a `ws`/`wss` url or
    /// the handshake timeout is zero.
    pub fn validate(&self) -> Result<()> {
        parse_endpoint(&self.endpoint)?;

        if self.handshake_timeout.is_zero() {
            return Err(Error::config("handshake_timeout must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
