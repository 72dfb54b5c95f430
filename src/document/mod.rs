//! Document accessor and snapshot model.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DocumentAccessor`] | Async source of document snapshots |
//! | [`MemoryDocuments`] | In-memory accessor keyed by url |
//! | [`Document`] | Read-only parsed snapshot |
//! | [`ElementNode`] | One element of a snapshot |

// ============================================================================
// Submodules
// ============================================================================

/// Accessor trait and in-memory implementation.
pub mod accessor;

/// Parsed document snapshot.
pub mod node;

// ============================================================================
// Re-exports
// ============================================================================

pub use accessor::{DocumentAccessor, ElementPick, MemoryDocuments, PickHandler};
pub use node::{Document, ElementNode, TEXT_LIMIT, compile};
