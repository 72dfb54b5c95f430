//! Frame transport layer.
//!
//! Both ends of a selector channel exchange JSON text frames. This module
//! abstracts the channel as a [`Transport`] (sink + stream of frames) so
//! the session state machine and the evaluation service are independent of
//! the wire.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌──────────────────┐
//! │  Session        │         WebSocket            │ EvaluationServer │
//! │  (actor)        │◄────────────────────────────►│  → service loop  │
//! │  WsConnector    │  /ws/crawling/selector/<id>/ │                  │
//! └─────────────────┘                              └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connector` | [`Transport`], [`Connector`] trait, [`WsConnector`] |
//! | `memory` | In-memory [`duplex`] pair and [`LoopbackConnector`] |
//! | `server` | [`EvaluationServer`] accept loop |

// ============================================================================
// Submodules
// ============================================================================

/// Transports and connectors.
pub mod connector;

/// In-memory transports.
pub mod memory;

/// WebSocket evaluation server.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connector::{
    Connector, FrameSink, FrameStream, Transport, WsConnector, channel_url, parse_endpoint,
};
pub use memory::{LoopbackConnector, duplex};
pub use server::EvaluationServer;
