//! Wire data model shared by both ends.
//!
//! These types appear inside server messages and are also what the
//! evaluation engine produces directly.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// SuggestionKind
// ============================================================================

/// Category of a suggested selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// Class-based or tag-only selector.
    Basic,
    /// Selector expected to identify this element alone.
    Unique,
    /// Selector describing structurally similar elements.
    Pattern,
}

impl SuggestionKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Unique => "unique",
            Self::Pattern => "pattern",
        }
    }
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SelectorSuggestion
// ============================================================================

/// An alternative selector for a matched element.
///
/// # Format
///
/// ```json
/// { "selector": "#g1", "type": "unique", "description": "Unique element selector" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSuggestion {
    /// CSS selector text.
    pub selector: String,

    /// Suggestion category.
    #[serde(rename = "type")]
    pub kind: SuggestionKind,

    /// Human-readable explanation.
    pub description: String,
}

impl SelectorSuggestion {
    /// Creates a suggestion.
    #[inline]
    #[must_use]
    pub fn new(
        selector: impl Into<String>,
        kind: SuggestionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            kind,
            description: description.into(),
        }
    }
}

// ============================================================================
// MatchedElement
// ============================================================================

/// An element matched by the evaluated selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedElement {
    /// Lower-case tag name.
    pub tag: String,

    /// Visible text, possibly empty.
    pub text: String,

    /// All attributes of the element.
    pub attributes: FxHashMap<String, String>,

    /// Ranked alternative selectors, most specific first.
    pub suggested_selectors: Vec<SelectorSuggestion>,
}

// ============================================================================
// Recommendation
// ============================================================================

/// Confidence-ranked selector candidates for one structural signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Tag name of the signature.
    pub element_type: String,

    /// Selector candidates, most specific first.
    pub suggested_selectors: Vec<String>,

    /// Class-distinctiveness of the signature in `[0, 1]`.
    pub confidence: f64,
}

// ============================================================================
// PatternAnalysis
// ============================================================================

/// Structural statistics for a match set against its document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    /// Element count per tag over the whole document.
    pub element_counts: FxHashMap<String, usize>,

    /// Recommendations ordered by descending confidence.
    pub recommendations: Vec<Recommendation>,

    /// Elements sharing a matched signature, excluding the matches.
    pub similar_element_count: usize,

    /// Mean recommendation confidence in `[0, 1]`.
    pub confidence: f64,
}

impl PatternAnalysis {
    /// Total number of elements counted in the document.
    #[must_use]
    pub fn total_elements(&self) -> usize {
        self.element_counts.values().sum()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_kind_wire_name() {
        let suggestion = SelectorSuggestion::new("#g1", SuggestionKind::Unique, "Unique");
        let json = serde_json::to_value(&suggestion).expect("serialize");
        assert_eq!(json["type"], "unique");
        assert_eq!(json["selector"], "#g1");
    }

    #[test]
    fn test_matched_element_field_names() {
        let element = MatchedElement {
            tag: "a".into(),
            text: "Next".into(),
            attributes: FxHashMap::default(),
            suggested_selectors: Vec::new(),
        };
        let json = serde_json::to_value(&element).expect("serialize");
        assert!(json.get("suggested_selectors").is_some());
    }

    #[test]
    fn test_pattern_analysis_total() {
        let mut analysis = PatternAnalysis::default();
        analysis.element_counts.insert("a".into(), 5);
        analysis.element_counts.insert("div".into(), 2);
        assert_eq!(analysis.total_elements(), 7);
    }
}
