//! Selector evaluation.
//!
//! [`SelectorEngine::evaluate`] runs exact CSS matching against a document
//! snapshot, describes each match with ranked selector suggestions, and
//! attaches a pattern analysis of the match set.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::document::{Document, ElementNode, ElementPick};
use crate::error::{Error, Result};
use crate::protocol::{MatchedElement, PatternAnalysis};

use super::options::EngineOptions;
use super::pattern::PatternAnalyzer;
use super::suggest;

// ============================================================================
// Evaluation
// ============================================================================

/// Outcome of evaluating one selector against one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The evaluated selector.
    pub selector: String,
    /// Matched elements in document order.
    pub matches: Vec<MatchedElement>,
    /// Number of matches.
    pub count: usize,
    /// Pattern analysis of the match set.
    pub pattern_analysis: PatternAnalysis,
}

// ============================================================================
// SelectorEngine
// ============================================================================

/// Stateless selector evaluation engine.
///
/// Holds only options; every call works on the document it is given.
#[derive(Debug, Clone, Default)]
pub struct SelectorEngine {
    options: EngineOptions,
}

impl SelectorEngine {
    /// Creates an engine with validated options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn new(options: EngineOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Returns the engine options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Evaluates `selector` against `document`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if the selector does not parse.
    /// A selector that matches nothing is not an error.
    pub fn evaluate(&self, selector: &str, document: &Document) -> Result<Evaluation> {
        let matched = document.query_all(selector)?;
        let analyzer = PatternAnalyzer::new(document, &self.options);

        let matches: Vec<MatchedElement> = matched
            .iter()
            .map(|node| self.describe(node, &analyzer))
            .collect();
        let pattern_analysis = analyzer.analyze(&matched);

        debug!(
            selector,
            url = document.url(),
            count = matches.len(),
            similar = pattern_analysis.similar_element_count,
            "Selector evaluated"
        );

        Ok(Evaluation {
            selector: selector.to_owned(),
            count: matches.len(),
            matches,
            pattern_analysis,
        })
    }

    /// Analyzes repeated structures across the whole document.
    #[must_use]
    pub fn analyze_document(&self, document: &Document) -> PatternAnalysis {
        PatternAnalyzer::new(document, &self.options).analyze_document()
    }

    /// Describes an element picked in the rendered page.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the pick refers to another document
    /// - [`Error::ElementNotFound`] if the path does not resolve
    pub fn describe_pick(&self, document: &Document, pick: &ElementPick) -> Result<MatchedElement> {
        if pick.url != document.url() {
            return Err(Error::protocol(format!(
                "pick for {} applied to {}",
                pick.url,
                document.url()
            )));
        }

        let node = document
            .resolve_path(&pick.path)
            .ok_or_else(|| Error::element_not_found(&pick.url, pick.path.clone()))?;
        let analyzer = PatternAnalyzer::new(document, &self.options);

        Ok(self.describe(node, &analyzer))
    }

    fn describe(&self, node: &ElementNode, analyzer: &PatternAnalyzer<'_>) -> MatchedElement {
        let mut suggested_selectors = suggest::rank(node, &self.options);
        suggested_selectors.extend(analyzer.suggestions(node));

        MatchedElement {
            tag: node.tag.clone(),
            text: node.text.clone(),
            attributes: node.attributes.iter().cloned().collect(),
            suggested_selectors,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
