//! Selector Session - Live CSS selector evaluation for crawl configurations.
//!
//! This library connects crawl-configuration tooling to a selector
//! evaluation service. A client submits a CSS selector against a loaded
//! document and receives the matched elements, ranked alternative
//! selectors and a structural pattern analysis of the page.
//!
//! # Architecture
//!
//! Each crawl configuration has its own selector channel:
//!
//! - **Client ([`Session`])**: Owns one channel, reconnects on loss with a
//!   bounded budget, tracks the single pending request
//! - **Server ([`EvaluationServer`])**: Routes `/ws/crawling/selector/<id>/`
//!   to a [`SelectorService`] loop per connection
//! - **Engine ([`SelectorEngine`])**: Evaluates selectors against a
//!   [`Document`] snapshot and derives suggestions
//!
//! Key design principles:
//!
//! - Text frames carry JSON tagged by `action` (client) or `type` (server)
//! - A newer request supersedes the pending one; stale replies are dropped
//! - Evaluation errors never affect the connection state
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use selector_session::{
//!     ConfigId, ConnectionOptions, ConnectionState, Result, Session, SessionEvent, WsConnector,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config_id = ConfigId::new("42")?;
//!     let options = ConnectionOptions::new().with_endpoint("ws://127.0.0.1:8000");
//!     let (session, mut events) =
//!         Session::attach(config_id, options, Arc::new(WsConnector::new()))?;
//!
//!     session.wait_for_state(ConnectionState::is_open).await?;
//!     let seq = session.submit("a.next-page", "https://example.com/list")?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let SessionEvent::Results { seq: done, count, .. } = event
//!             && done == seq
//!         {
//!             println!("{count} matches");
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | Client sessions: [`Session`], [`ConnectionState`] |
//! | [`service`] | Request handling: [`SelectorService`] |
//! | [`engine`] | Selector evaluation and pattern analysis |
//! | [`document`] | Document snapshots and accessors |
//! | [`protocol`] | Channel message types |
//! | [`transport`] | Frame transports and the WebSocket server |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Document snapshots and accessors.
///
/// [`Document`] is a read-only snapshot; [`DocumentAccessor`] supplies them
/// by url.
pub mod document;

/// Selector evaluation engine.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers for configuration ids and request sequence numbers.
pub mod identifiers;

/// Selector channel message types.
pub mod protocol;

/// Server-side request handling.
pub mod service;

/// Client sessions with bounded reconnect.
pub mod session;

/// Frame transport layer.
///
/// WebSocket and in-memory transports behind one [`Transport`] type.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Document types
pub use document::{Document, DocumentAccessor, ElementNode, ElementPick, MemoryDocuments};

// Engine types
pub use engine::{EngineOptions, Evaluation, SelectorEngine};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConfigId, RequestSeq};

// Protocol types
pub use protocol::{
    ClientMessage, MatchedElement, PatternAnalysis, Recommendation, SelectorSuggestion,
    ServerMessage, SuggestionKind,
};

// Service
pub use service::SelectorService;

// Session types
pub use session::{ConnectionOptions, ConnectionState, Session, SessionEvent, SessionEvents};

// Transport types
pub use transport::{Connector, EvaluationServer, LoopbackConnector, Transport, WsConnector};
