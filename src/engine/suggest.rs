//! Selector suggestion ranking.
//!
//! Suggestions are ordered by descending specificity:
//!
//! | Rank | Selector | Kind |
//! |------|----------|------|
//! | 1 | `#id` | `unique` |
//! | 2 | `tag.classes[test-attr="v"]` | `unique` |
//! | 3 | `tag.classes` or `tag` | `basic` |
//!
//! An element with a stable id is identified by the id alone. Pattern
//! suggestions from [`super::pattern`] follow these.

// ============================================================================
// Imports
// ============================================================================

use crate::document::ElementNode;
use crate::protocol::{SelectorSuggestion, SuggestionKind};

use super::css::{attribute_predicate, escape_ident};
use super::options::EngineOptions;
use super::pattern::Signature;

// ============================================================================
// Ranking
// ============================================================================

/// Returns the ranked id, attribute and class-based suggestions for `node`.
///
/// Never empty: an element without id or classes still yields its tag.
#[must_use]
pub fn rank(node: &ElementNode, options: &EngineOptions) -> Vec<SelectorSuggestion> {
    if let Some(id) = node.id.as_deref() {
        return vec![SelectorSuggestion::new(
            format!("#{}", escape_ident(id)),
            SuggestionKind::Unique,
            "Unique element selector",
        )];
    }

    let signature = Signature::of(node, options);
    let class_based = signature.selector();
    let mut suggestions = Vec::with_capacity(2);

    if let Some(attribute) = options.test_attribute.as_deref()
        && let Some(value) = node.attr(attribute)
    {
        suggestions.push(SelectorSuggestion::new(
            format!("{class_based}{}", attribute_predicate(attribute, value)),
            SuggestionKind::Unique,
            "Stable test-attribute selector",
        ));
    }

    let description = if signature.classes.is_empty() {
        "Tag-only selector"
    } else {
        "Class-based selector"
    };
    suggestions.push(SelectorSuggestion::new(
        class_based,
        SuggestionKind::Basic,
        description,
    ));

    suggestions
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn first<'a>(doc: &'a Document, selector: &str) -> &'a ElementNode {
        doc.query_all(selector).expect("valid selector")[0]
    }

    #[test]
    fn test_id_wins() {
        let doc = Document::parse("u", r#"<div class="gallery-image" id="g1"></div>"#);
        let suggestions = rank(first(&doc, "div"), &EngineOptions::default());

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].selector, "#g1");
        assert_eq!(suggestions[0].kind, SuggestionKind::Unique);
    }

    #[test]
    fn test_classes_sorted_deduplicated_without_marker() {
        let doc = Document::parse(
            "u",
            r#"<li class="item selector-highlight card item">x</li>"#,
        );
        let suggestions = rank(first(&doc, "li"), &EngineOptions::default());

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].selector, "li.card.item");
        assert_eq!(suggestions[0].kind, SuggestionKind::Basic);
    }

    #[test]
    fn test_test_attribute_ranks_above_class() {
        let doc = Document::parse(
            "u",
            r#"<button class="btn" data-testid="submit">Go</button>"#,
        );
        let suggestions = rank(first(&doc, "button"), &EngineOptions::default());

        let selectors: Vec<_> = suggestions.iter().map(|s| s.selector.as_str()).collect();
        assert_eq!(selectors, ["button.btn[data-testid=\"submit\"]", "button.btn"]);
        assert_eq!(suggestions[0].kind, SuggestionKind::Unique);
        assert_eq!(suggestions[1].kind, SuggestionKind::Basic);
    }

    #[test]
    fn test_tag_only() {
        let doc = Document::parse("u", "<p>plain</p>");
        let suggestions = rank(first(&doc, "p"), &EngineOptions::default());

        assert_eq!(suggestions[0].selector, "p");
        assert_eq!(suggestions[0].description, "Tag-only selector");
    }

    #[test]
    fn test_generated_selectors_match_source_element() {
        let doc = Document::parse(
            "u",
            r#"<div id="1st"></div><span class="w-1/2 a:b" data-testid='q"x'></span>"#,
        );

        for selector in ["div", "span"] {
            let node = first(&doc, selector);
            for suggestion in rank(node, &EngineOptions::default()) {
                let matched = doc.query_all(&suggestion.selector).expect("generated selector parses");
                assert!(
                    matched.iter().any(|m| m.index == node.index),
                    "{} should match its element",
                    suggestion.selector
                );
            }
        }
    }
}
