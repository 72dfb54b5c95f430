//! Document accessor boundary.
//!
//! The evaluation engine never fetches or renders pages. It asks a
//! [`DocumentAccessor`] for an already-loaded snapshot. Element picks made in
//! the rendered page come back as typed [`ElementPick`] events instead of
//! injected script callbacks.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};

use super::node::Document;

// ============================================================================
// Types
// ============================================================================

/// An element picked by the user in a rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPick {
    /// Document url.
    pub url: String,
    /// Child-index path from the root element.
    pub path: Vec<usize>,
}

/// Element pick callback.
///
/// Called for each element picked in a document served by the accessor.
pub type PickHandler = Box<dyn Fn(ElementPick) + Send + Sync>;

// ============================================================================
// DocumentAccessor
// ============================================================================

/// Source of read-only document snapshots.
#[async_trait]
pub trait DocumentAccessor: Send + Sync {
    /// Returns the current snapshot for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentNotFound`] if no document is loaded.
    async fn get_document(&self, url: &str) -> Result<Arc<Document>>;

    /// Registers the element pick callback, replacing any previous one.
    fn on_element_picked(&self, handler: PickHandler);
}

// ============================================================================
// MemoryDocuments
// ============================================================================

/// In-memory accessor holding parsed snapshots keyed by url.
///
/// Re-inserting a url replaces the snapshot and bumps its version.
#[derive(Default)]
pub struct MemoryDocuments {
    documents: RwLock<FxHashMap<String, Arc<Document>>>,
    pick_handler: Mutex<Option<PickHandler>>,
}

impl MemoryDocuments {
    /// Creates an empty accessor.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and stores a document, returning the new snapshot.
    pub fn insert(&self, url: impl Into<String>, source: impl Into<String>) -> Arc<Document> {
        let url = url.into();
        let mut documents = self.documents.write();

        let version = documents.get(&url).map_or(1, |doc| doc.version() + 1);
        let document = Arc::new(Document::parse_versioned(url.clone(), source, version));
        documents.insert(url.clone(), Arc::clone(&document));

        debug!(url = %url, version, "Document stored");
        document
    }

    /// Removes a document.
    pub fn remove(&self, url: &str) -> Option<Arc<Document>> {
        self.documents.write().remove(url)
    }

    /// Returns the number of stored documents.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns `true` if no documents are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Reports an element pick to the registered handler.
    ///
    /// # Errors
    ///
    /// - [`Error::DocumentNotFound`] if the url is not loaded
    /// - [`Error::ElementNotFound`] if the path does not resolve
    pub fn pick(&self, url: &str, path: &[usize]) -> Result<()> {
        let document = self
            .documents
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::document_not_found(url))?;

        if document.resolve_path(path).is_none() {
            return Err(Error::element_not_found(url, path));
        }

        let handler = self.pick_handler.lock();
        if let Some(ref handler) = *handler {
            handler(ElementPick {
                url: url.to_owned(),
                path: path.to_vec(),
            });
        }

        Ok(())
    }

    /// Clears the element pick callback.
    pub fn clear_pick_handler(&self) {
        *self.pick_handler.lock() = None;
    }
}

#[async_trait]
impl DocumentAccessor for MemoryDocuments {
    async fn get_document(&self, url: &str) -> Result<Arc<Document>> {
        self.documents
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::document_not_found(url))
    }

    fn on_element_picked(&self, handler: PickHandler) {
        *self.pick_handler.lock() = Some(handler);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_get_missing_document() {
        let documents = MemoryDocuments::new();
        let err = documents
            .get_document("https://missing")
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::DocumentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_insert_bumps_version() {
        let documents = MemoryDocuments::new();
        let first = documents.insert("https://a", "<p>1</p>");
        let second = documents.insert("https://a", "<p>2</p><p>3</p>");

        assert_eq!(first.version(), 1);
        assert_eq!(second.version(), 2);
        assert_eq!(documents.len(), 1);

        let current = documents.get_document("https://a").await.expect("stored");
        assert_eq!(current.version(), 2);
        assert_eq!(first.query_all("p").expect("valid").len(), 1);
    }

    #[test]
    fn test_pick_invokes_handler() {
        let documents = MemoryDocuments::new();
        documents.insert("https://a", "<ul><li>1</li><li>2</li></ul>");

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        documents.on_element_picked(Box::new(move |pick| {
            assert_eq!(pick.path, [1, 0, 1]);
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        documents.pick("https://a", &[1, 0, 1]).expect("pick");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pick_unknown_path() {
        let documents = MemoryDocuments::new();
        documents.insert("https://a", "<p>x</p>");

        let err = documents.pick("https://a", &[5]).expect_err("should fail");
        assert!(matches!(err, Error::ElementNotFound { .. }));

        let err = documents.pick("https://b", &[]).expect_err("should fail");
        assert!(matches!(err, Error::DocumentNotFound { .. }));
    }
}
