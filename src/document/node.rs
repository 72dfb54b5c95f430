//! Parsed document snapshot.
//!
//! A [`Document`] is parsed once into a flat list of [`ElementNode`]s in
//! document order. The snapshot is plain data, so it can be shared between
//! tasks and is never mutated after construction. Selector matching re-parses
//! the retained source and maps matches back onto the snapshot.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of characters kept from an element's visible text.
pub const TEXT_LIMIT: usize = 100;

/// Elements whose content is never rendered as text.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements rendered inline; their text runs on without a break.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "i", "kbd", "label",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

// ============================================================================
// ElementNode
// ============================================================================

/// One element of a document snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    /// Position in document order.
    pub index: usize,
    /// Lower-case tag name.
    pub tag: String,
    /// Non-empty `id` attribute.
    pub id: Option<String>,
    /// Class list as written in the document.
    pub classes: Vec<String>,
    /// All attributes in source order.
    pub attributes: Vec<(String, String)>,
    /// Index of the parent element.
    pub parent: Option<usize>,
    /// Child-index path from the root element.
    pub path: Vec<usize>,
    /// Visible text, whitespace-collapsed and truncated to [`TEXT_LIMIT`].
    pub text: String,
}

impl ElementNode {
    /// Returns the value of an attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if the element carries the class.
    #[inline]
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

// ============================================================================
// Document
// ============================================================================

/// Read-only document snapshot addressed by url.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    version: u64,
    source: String,
    elements: Vec<ElementNode>,
}

impl Document {
    /// Parses a document from HTML source.
    #[must_use]
    pub fn parse(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self::parse_versioned(url, source, 0)
    }

    /// Parses a document tagged with a version.
    ///
    /// Accessors bump the version when the content behind a url changes.
    #[must_use]
    pub fn parse_versioned(url: impl Into<String>, source: impl Into<String>, version: u64) -> Self {
        let url = url.into();
        let source = source.into();
        let html = Html::parse_document(&source);
        let elements = flatten(&html);

        trace!(url = %url, version, elements = elements.len(), "Document parsed");

        Self {
            url,
            version,
            source,
            elements,
        }
    }

    /// Returns the document url.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the document version.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the HTML source.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns all elements in document order.
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[ElementNode] {
        &self.elements
    }

    /// Returns the total element count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the document has no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element at a document-order index.
    #[inline]
    #[must_use]
    pub fn element(&self, index: usize) -> Option<&ElementNode> {
        self.elements.get(index)
    }

    /// Returns the parent of an element.
    #[inline]
    #[must_use]
    pub fn parent_of(&self, node: &ElementNode) -> Option<&ElementNode> {
        node.parent.and_then(|index| self.elements.get(index))
    }

    /// Resolves a child-index path from the root element.
    #[must_use]
    pub fn resolve_path(&self, path: &[usize]) -> Option<&ElementNode> {
        self.elements.iter().find(|node| node.path == path)
    }

    /// Returns all elements matching a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if the selector does not parse.
    /// An empty result is not an error.
    pub fn query_all(&self, selector: &str) -> Result<Vec<&ElementNode>> {
        let compiled = compile(selector)?;
        let html = Html::parse_document(&self.source);

        let positions: FxHashMap<_, usize> = preorder(&html)
            .into_iter()
            .enumerate()
            .map(|(index, (element, _))| (element.id(), index))
            .collect();

        let mut matched: Vec<&ElementNode> = html
            .select(&compiled)
            .filter_map(|element| positions.get(&element.id()))
            .filter_map(|&index| self.elements.get(index))
            .collect();
        matched.sort_by_key(|node| node.index);
        matched.dedup_by_key(|node| node.index);

        trace!(selector, matches = matched.len(), "Selector evaluated");

        Ok(matched)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Compiles a CSS selector.
///
/// # Errors
///
/// Returns [`Error::InvalidSelector`] for blank or unparsable input.
pub fn compile(selector: &str) -> Result<Selector> {
    if selector.trim().is_empty() {
        return Err(Error::invalid_selector(selector, "empty selector"));
    }
    Selector::parse(selector).map_err(|e| Error::invalid_selector(selector, e.to_string()))
}

/// Walks the element tree in document order, yielding each element with its
/// parent's position.
fn preorder(html: &Html) -> Vec<(ElementRef<'_>, Option<usize>)> {
    let mut ordered = Vec::new();
    let mut stack = vec![(html.root_element(), None)];

    while let Some((element, parent)) = stack.pop() {
        let index = ordered.len();
        ordered.push((element, parent));

        let children: Vec<_> = element.children().filter_map(ElementRef::wrap).collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(index)));
        }
    }

    ordered
}

fn flatten(html: &Html) -> Vec<ElementNode> {
    let ordered = preorder(html);
    let mut elements: Vec<ElementNode> = Vec::with_capacity(ordered.len());
    let mut child_counts: FxHashMap<usize, usize> = FxHashMap::default();

    for (index, (element, parent)) in ordered.into_iter().enumerate() {
        let value = element.value();

        let path = match parent {
            Some(parent_index) => {
                let position = child_counts.entry(parent_index).or_insert(0);
                let mut path = elements[parent_index].path.clone();
                path.push(*position);
                *position += 1;
                path
            }
            None => Vec::new(),
        };

        elements.push(ElementNode {
            index,
            tag: value.name().to_ascii_lowercase(),
            id: value.id().filter(|id| !id.is_empty()).map(str::to_owned),
            classes: value.classes().map(str::to_owned).collect(),
            attributes: value
                .attrs()
                .map(|(name, val)| (name.to_owned(), val.to_owned()))
                .collect(),
            parent,
            path,
            text: visible_text(rendered_text(element).into_iter(), TEXT_LIMIT),
        });
    }

    elements
}

/// Collects the text runs of an element as a browser would render them.
///
/// Hidden content is skipped and block-level children are separated by a
/// break.
fn rendered_text(element: ElementRef<'_>) -> Vec<&str> {
    let mut parts = Vec::new();
    if !is_hidden(element.value().name()) {
        push_rendered(element, &mut parts);
    }
    parts
}

fn push_rendered<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            parts.push(&**text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if is_hidden(name) {
                continue;
            }
            let block = !INLINE_TAGS.contains(&name);
            if block {
                parts.push(" ");
            }
            push_rendered(child, parts);
            if block {
                parts.push(" ");
            }
        }
    }
}

fn is_hidden(name: &str) -> bool {
    HIDDEN_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name))
}

/// Collapses whitespace runs and keeps at most `limit` characters.
fn visible_text<'a>(parts: impl Iterator<Item = &'a str>, limit: usize) -> String {
    let mut text = String::new();
    let mut length = 0;
    let mut gap = false;

    for ch in parts.flat_map(str::chars) {
        if ch.is_whitespace() {
            gap = length > 0;
            continue;
        }
        if gap {
            if length + 1 >= limit {
                break;
            }
            text.push(' ');
            length += 1;
            gap = false;
        }
        if length == limit {
            break;
        }
        text.push(ch);
        length += 1;
    }

    text
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <div id="gallery" class="grid wide">
                <div class="gallery-image" id="g1">First</div>
                <div class="gallery-image">Second</div>
            </div>
            <a class="next-page" href="/2">Next   page</a>
        </body></html>
    "#;

    #[test]
    fn test_elements_in_document_order() {
        let doc = Document::parse("https://example.com", PAGE);
        let tags: Vec<_> = doc.elements().iter().map(|n| n.tag.as_str()).collect();

        assert_eq!(tags, ["html", "head", "body", "div", "div", "div", "a"]);
        assert!(doc.elements().iter().enumerate().all(|(i, n)| n.index == i));
    }

    #[test]
    fn test_element_fields() {
        let doc = Document::parse("https://example.com", PAGE);
        let first = doc.query_all("#g1").expect("valid selector");

        assert_eq!(first.len(), 1);
        let node = first[0];
        assert_eq!(node.tag, "div");
        assert_eq!(node.id.as_deref(), Some("g1"));
        assert_eq!(node.classes, ["gallery-image"]);
        assert_eq!(node.attr("class"), Some("gallery-image"));
        assert_eq!(node.text, "First");
        assert_eq!(doc.parent_of(node).and_then(|p| p.id.as_deref()), Some("gallery"));
    }

    #[test]
    fn test_text_is_collapsed() {
        let doc = Document::parse("https://example.com", PAGE);
        let links = doc.query_all("a").expect("valid selector");
        assert_eq!(links[0].text, "Next page");
    }

    #[test]
    fn test_text_skips_hidden_content() {
        let doc = Document::parse(
            "u",
            r#"<div id="x"><p>Hello</p><p>World</p><script>var secret = 1;</script><style>.a{color:red}</style><noscript>enable js</noscript></div>"#,
        );
        let node = doc.query_all("#x").expect("valid selector")[0];
        assert_eq!(node.text, "Hello World");

        let script = doc.query_all("script").expect("valid selector")[0];
        assert_eq!(script.text, "");
    }

    #[test]
    fn test_inline_text_runs_on() {
        let doc = Document::parse("u", r#"<p id="p">Sale<b>50</b>% <a href="/">now</a></p>"#);
        let node = doc.query_all("#p").expect("valid selector")[0];
        assert_eq!(node.text, "Sale50% now");
    }

    #[test]
    fn test_visible_text_truncates() {
        let long = "word ".repeat(50);
        let text = visible_text(std::iter::once(long.as_str()), TEXT_LIMIT);
        assert!(text.chars().count() <= TEXT_LIMIT);
        assert!(!text.ends_with(' '));
    }

    #[test]
    fn test_query_all_invalid_selector() {
        let doc = Document::parse("https://example.com", PAGE);
        let err = doc.query_all("div[").expect_err("should fail");
        assert!(matches!(err, Error::InvalidSelector { .. }));

        let err = doc.query_all("   ").expect_err("should fail");
        assert!(matches!(err, Error::InvalidSelector { .. }));
    }

    #[test]
    fn test_query_all_empty_match() {
        let doc = Document::parse("https://example.com", PAGE);
        assert!(doc.query_all("table").expect("valid selector").is_empty());
    }

    #[test]
    fn test_paths_resolve() {
        let doc = Document::parse("https://example.com", PAGE);
        for node in doc.elements() {
            let resolved = doc.resolve_path(&node.path).expect("path resolves");
            assert_eq!(resolved.index, node.index);
        }
        assert_eq!(doc.resolve_path(&[1, 0, 1]).map(|n| n.text.as_str()), Some("Second"));
        assert!(doc.resolve_path(&[9, 9]).is_none());
    }

    #[test]
    fn test_empty_id_is_ignored() {
        let doc = Document::parse("u", r#"<p id="">x</p>"#);
        let paragraphs = doc.query_all("p").expect("valid selector");
        assert_eq!(paragraphs[0].id, None);
    }
}
