//! Selector evaluation engine.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `evaluator` | [`SelectorEngine`]: evaluate, analyze, describe picks |
//! | `suggest` | Ranked id / attribute / class suggestions |
//! | `pattern` | Signature frequency table and pattern analysis |
//! | `css` | Identifier and string escaping |
//! | `options` | [`EngineOptions`] |

// ============================================================================
// Submodules
// ============================================================================

/// CSS escaping helpers.
pub mod css;

/// Selector evaluation.
pub mod evaluator;

/// Engine options.
pub mod options;

/// Structural pattern analysis.
pub mod pattern;

/// Suggestion ranking.
pub mod suggest;

// ============================================================================
// Re-exports
// ============================================================================

pub use evaluator::{Evaluation, SelectorEngine};
pub use options::{
    DEFAULT_COMMON_THRESHOLD, DEFAULT_TEST_ATTRIBUTE, DEFAULT_TRANSIENT_CLASS, EngineOptions,
};
pub use pattern::{PatternAnalyzer, Signature, SignatureTable};
