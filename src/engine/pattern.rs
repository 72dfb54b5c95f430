//! Structural pattern analysis.
//!
//! Elements are grouped by [`Signature`] (tag plus normalized class list).
//! For a match set the analyzer reports how many other elements share the
//! matched signatures and how class-distinctive each signature is within its
//! tag population:
//!
//! ```text
//! confidence(sig) = count(sig) / count(tag(sig))
//! ```
//!
//! The frequency table is rebuilt for every analysis and never shared.

// ============================================================================
// Imports
// ============================================================================

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::document::{Document, ElementNode};
use crate::protocol::{PatternAnalysis, Recommendation, SelectorSuggestion, SuggestionKind};

use super::css::escape_ident;
use super::options::EngineOptions;
use super::suggest;

// ============================================================================
// Signature
// ============================================================================

/// Structural signature: tag plus sorted, de-duplicated classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    /// Lower-case tag name.
    pub tag: String,
    /// Sorted, unique classes without the transient marker.
    pub classes: Vec<String>,
}

impl Signature {
    /// Computes the signature of an element.
    #[must_use]
    pub fn of(node: &ElementNode, options: &EngineOptions) -> Self {
        let mut classes: Vec<String> = node
            .classes
            .iter()
            .filter(|class| !options.is_transient(class))
            .cloned()
            .collect();
        classes.sort_unstable();
        classes.dedup();

        Self {
            tag: node.tag.clone(),
            classes,
        }
    }

    /// Renders the signature as `tag.class1.class2`.
    #[must_use]
    pub fn selector(&self) -> String {
        let mut selector = escape_ident(&self.tag);
        for class in &self.classes {
            selector.push('.');
            selector.push_str(&escape_ident(class));
        }
        selector
    }
}

// ============================================================================
// SignatureTable
// ============================================================================

/// Per-tag population statistics.
#[derive(Debug, Default)]
struct TagStats {
    count: usize,
    classes: FxHashMap<String, usize>,
    data_attributes: FxHashMap<String, usize>,
}

/// Document-wide frequency table.
#[derive(Debug, Default)]
pub struct SignatureTable {
    signatures: FxHashMap<Signature, usize>,
    tags: FxHashMap<String, TagStats>,
    total: usize,
}

impl SignatureTable {
    /// Counts every element of the document.
    #[must_use]
    pub fn build(document: &Document, options: &EngineOptions) -> Self {
        let mut table = Self::default();

        for node in document.elements() {
            let signature = Signature::of(node, options);

            let stats = table.tags.entry(node.tag.clone()).or_default();
            stats.count += 1;
            for class in &signature.classes {
                *stats.classes.entry(class.clone()).or_insert(0) += 1;
            }
            for (name, _) in &node.attributes {
                if name.starts_with("data-") {
                    *stats.data_attributes.entry(name.clone()).or_insert(0) += 1;
                }
            }

            *table.signatures.entry(signature).or_insert(0) += 1;
            table.total += 1;
        }

        table
    }

    /// Returns the total element count.
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns how many elements share `signature`.
    #[inline]
    #[must_use]
    pub fn signature_count(&self, signature: &Signature) -> usize {
        self.signatures.get(signature).copied().unwrap_or(0)
    }

    /// Returns how many elements have `tag`.
    #[inline]
    #[must_use]
    pub fn tag_count(&self, tag: &str) -> usize {
        self.tags.get(tag).map_or(0, |stats| stats.count)
    }

    /// Returns the class-distinctiveness of `signature`, clamped to `[0, 1]`.
    #[must_use]
    pub fn confidence(&self, signature: &Signature) -> f64 {
        let tag_count = self.tag_count(&signature.tag);
        if tag_count == 0 {
            return 0.0;
        }
        (self.signature_count(signature) as f64 / tag_count as f64).clamp(0.0, 1.0)
    }

    /// Returns element counts per tag.
    #[must_use]
    pub fn element_counts(&self) -> FxHashMap<String, usize> {
        self.tags
            .iter()
            .map(|(tag, stats)| (tag.clone(), stats.count))
            .collect()
    }

    /// Returns classes carried by at least `threshold` of the tag population,
    /// sorted.
    fn common_classes(&self, tag: &str, threshold: f64) -> Vec<String> {
        self.tags
            .get(tag)
            .map(|stats| common_keys(&stats.classes, stats.count, threshold))
            .unwrap_or_default()
    }

    /// Returns `data-*` attributes carried by at least `threshold` of the tag
    /// population, sorted.
    fn common_data_attributes(&self, tag: &str, threshold: f64) -> Vec<String> {
        self.tags
            .get(tag)
            .map(|stats| common_keys(&stats.data_attributes, stats.count, threshold))
            .unwrap_or_default()
    }
}

fn common_keys(counts: &FxHashMap<String, usize>, population: usize, threshold: f64) -> Vec<String> {
    let minimum = population as f64 * threshold;
    let mut keys: Vec<String> = counts
        .iter()
        .filter(|&(_, &count)| count as f64 >= minimum)
        .map(|(key, _)| key.clone())
        .collect();
    keys.sort_unstable();
    keys
}

// ============================================================================
// PatternAnalyzer
// ============================================================================

/// Computes pattern suggestions and analyses against one document.
pub struct PatternAnalyzer<'a> {
    document: &'a Document,
    options: &'a EngineOptions,
    table: SignatureTable,
}

impl<'a> PatternAnalyzer<'a> {
    /// Builds the frequency table for `document`.
    #[must_use]
    pub fn new(document: &'a Document, options: &'a EngineOptions) -> Self {
        Self {
            document,
            options,
            table: SignatureTable::build(document, options),
        }
    }

    /// Returns the underlying frequency table.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    /// Returns `pattern` suggestions describing the element's structural
    /// context.
    #[must_use]
    pub fn suggestions(&self, node: &ElementNode) -> Vec<SelectorSuggestion> {
        let mut suggestions = Vec::new();
        let threshold = self.options.common_threshold;

        if self.table.tag_count(&node.tag) > 1 {
            let classes = self.table.common_classes(&node.tag, threshold);
            if !classes.is_empty() {
                let signature = Signature {
                    tag: node.tag.clone(),
                    classes,
                };
                suggestions.push(SelectorSuggestion::new(
                    signature.selector(),
                    SuggestionKind::Pattern,
                    "Pattern-based selector for similar elements",
                ));
            }

            if let Some(attribute) = self
                .table
                .common_data_attributes(&node.tag, threshold)
                .into_iter()
                .next()
            {
                suggestions.push(SelectorSuggestion::new(
                    format!("{}[{}]", escape_ident(&node.tag), escape_ident(&attribute)),
                    SuggestionKind::Pattern,
                    "Pattern-based selector on shared data attribute",
                ));
            }
        }

        if let Some(parent) = self.document.parent_of(node) {
            let scope = match parent.id.as_deref() {
                Some(id) => format!("#{}", escape_ident(id)),
                None => Signature::of(parent, self.options).selector(),
            };
            suggestions.push(SelectorSuggestion::new(
                format!("{scope} > {}", Signature::of(node, self.options).selector()),
                SuggestionKind::Pattern,
                "Scoped to parent container",
            ));
        }

        suggestions
    }

    /// Analyzes a match set.
    ///
    /// One recommendation is produced per distinct signature among `matches`.
    #[must_use]
    pub fn analyze(&self, matches: &[&ElementNode]) -> PatternAnalysis {
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let mut groups: Vec<(Signature, &ElementNode)> = Vec::new();

        for &node in matches {
            if !seen.insert(node.index) {
                continue;
            }
            let signature = Signature::of(node, self.options);
            if !groups.iter().any(|(existing, _)| *existing == signature) {
                groups.push((signature, node));
            }
        }

        let sharing: usize = groups
            .iter()
            .map(|(signature, _)| self.table.signature_count(signature))
            .sum();

        self.finish(groups, sharing.saturating_sub(seen.len()))
    }

    /// Analyzes the whole document.
    ///
    /// Every signature occurring at least twice gets a recommendation;
    /// `similar_element_count` is the number of elements in such groups.
    #[must_use]
    pub fn analyze_document(&self) -> PatternAnalysis {
        let mut groups: Vec<(Signature, &ElementNode)> = Vec::new();
        let mut grouped: FxHashSet<Signature> = FxHashSet::default();

        for node in self.document.elements() {
            let signature = Signature::of(node, self.options);
            if self.table.signature_count(&signature) < 2 || grouped.contains(&signature) {
                continue;
            }
            grouped.insert(signature.clone());
            groups.push((signature, node));
        }

        let similar: usize = groups
            .iter()
            .map(|(signature, _)| self.table.signature_count(signature))
            .sum();

        self.finish(groups, similar)
    }

    fn finish(&self, groups: Vec<(Signature, &ElementNode)>, similar: usize) -> PatternAnalysis {
        let mut ranked: Vec<(Signature, Recommendation)> = groups
            .into_iter()
            .map(|(signature, representative)| {
                let recommendation = self.recommend(&signature, representative);
                (signature, recommendation)
            })
            .collect();

        ranked.sort_by(|(sig_a, a), (sig_b, b)| {
            compare_recommendations(a, b).then_with(|| sig_a.cmp(sig_b))
        });

        let recommendations: Vec<Recommendation> =
            ranked.into_iter().map(|(_, recommendation)| recommendation).collect();

        let confidence = if recommendations.is_empty() {
            0.0
        } else {
            let sum: f64 = recommendations.iter().map(|r| r.confidence).sum();
            (sum / recommendations.len() as f64).clamp(0.0, 1.0)
        };

        PatternAnalysis {
            element_counts: self.table.element_counts(),
            recommendations,
            similar_element_count: similar.min(self.table.total()),
            confidence,
        }
    }

    fn recommend(&self, signature: &Signature, representative: &ElementNode) -> Recommendation {
        let mut selectors: Vec<String> = suggest::rank(representative, self.options)
            .into_iter()
            .map(|suggestion| suggestion.selector)
            .collect();

        let group_selector = signature.selector();
        if !selectors.contains(&group_selector) {
            selectors.push(group_selector);
        }

        Recommendation {
            element_type: signature.tag.clone(),
            suggested_selectors: selectors,
            confidence: self.table.confidence(signature),
        }
    }
}

/// Descending confidence, then ascending element type.
fn compare_recommendations(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.element_type.cmp(&b.element_type))
}

// ============================================================================
// Tests
// ============================================================================
