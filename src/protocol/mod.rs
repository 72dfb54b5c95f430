//! Selector channel protocol.
//!
//! This module defines the message format exchanged over one selector
//! channel between a client session and the evaluation service.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Discriminator |
//! |---------|-----------|---------------|
//! | `test_selector` | Client → Server | `action` |
//! | `analyze_page` | Client → Server | `action` |
//! | `selector_results` | Server → Client | `type` |
//! | `page_analysis` | Server → Client | `type` |
//! | `error` | Server → Client | `type` |
//!
//! Every message may carry an integer `request_id`. The client assigns it
//! and the server echoes it so late replies to superseded requests can be
//! recognized and dropped.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Text-frame encode/decode with validation |
//! | `request` | Client messages |
//! | `response` | Server messages |
//! | `types` | Matched elements, suggestions, pattern analysis |

// ============================================================================
// Submodules
// ============================================================================

/// Text-frame codec.
pub mod codec;

/// Client → server messages.
pub mod request;

/// Server → client messages.
pub mod response;

/// Wire data model.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{decode_client, decode_server, encode_client, encode_server};
pub use request::ClientMessage;
pub use response::ServerMessage;
pub use types::{
    MatchedElement, PatternAnalysis, Recommendation, SelectorSuggestion, SuggestionKind,
};
