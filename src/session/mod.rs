//! Reconnecting selector sessions.
//!
//! A [`Session`] attaches to the selector channel of one crawl
//! configuration, keeps it open across transport losses and tracks the
//! single in-flight evaluation request.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Session`] handle and [`SessionEvents`] receiver |
//! | `connection` | Connection actor and reconnect state machine |
//! | `event` | [`SessionEvent`] notifications |
//! | `options` | [`ConnectionOptions`] |
//! | `state` | [`ConnectionState`] |
//!
//! # Reconnect Policy
//!
//! Every transport loss or failed handshake consumes one attempt and waits
//! `reconnect_interval` before retrying. A successful handshake resets the
//! counter. Once `max_attempts` is spent the session moves to FAILED and
//! stays there until [`Session::reconnect`] is called.

// ============================================================================
// Submodules
// ============================================================================

mod connection;
mod core;
mod event;
mod options;
mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Status;
pub use core::{Session, SessionEvents};
pub use event::SessionEvent;
pub use options::{
    ConnectionOptions, DEFAULT_ENDPOINT, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RECONNECT_INTERVAL,
};
pub use state::ConnectionState;
