//! Selector engine options.
//!
//! # Example
//!
//! ```ignore
//! use selector_session::EngineOptions;
//!
//! let options = EngineOptions::new()
//!     .with_test_attribute("data-qa")
//!     .with_transient_class("is-picked");
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Class added to elements while they are hovered or picked.
pub const DEFAULT_TRANSIENT_CLASS: &str = "selector-highlight";

/// Attribute reserved for stable test hooks.
pub const DEFAULT_TEST_ATTRIBUTE: &str = "data-testid";

/// Share of a tag population that must carry a class for it to count as
/// common.
pub const DEFAULT_COMMON_THRESHOLD: f64 = 0.8;

// ============================================================================
// EngineOptions
// ============================================================================

/// Selector generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Interaction-marker class excluded from signatures and selectors.
    pub transient_class: Option<String>,

    /// Stable test attribute used for attribute-qualified selectors.
    pub test_attribute: Option<String>,

    /// Common-class threshold for pattern suggestions, in `(0, 1]`.
    pub common_threshold: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl EngineOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transient_class: Some(DEFAULT_TRANSIENT_CLASS.to_string()),
            test_attribute: Some(DEFAULT_TEST_ATTRIBUTE.to_string()),
            common_threshold: DEFAULT_COMMON_THRESHOLD,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl EngineOptions {
    /// Sets the transient interaction-marker class.
    #[inline]
    #[must_use]
    pub fn with_transient_class(mut self, class: impl Into<String>) -> Self {
        self.transient_class = Some(class.into());
        self
    }

    /// Disables transient class filtering.
    #[inline]
    #[must_use]
    pub fn without_transient_class(mut self) -> Self {
        self.transient_class = None;
        self
    }

    /// Sets the stable test attribute.
    #[inline]
    #[must_use]
    pub fn with_test_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.test_attribute = Some(attribute.into());
        self
    }

    /// Disables attribute-qualified selectors.
    #[inline]
    #[must_use]
    pub fn without_test_attribute(mut self) -> Self {
        self.test_attribute = None;
        self
    }

    /// Sets the common-class threshold.
    #[inline]
    #[must_use]
    pub fn with_common_threshold(mut self, threshold: f64) -> Self {
        self.common_threshold = threshold;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl EngineOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the threshold is outside `(0, 1]` or a
    /// configured name is blank.
    pub fn validate(&self) -> Result<()> {
        if !(self.common_threshold > 0.0 && self.common_threshold <= 1.0) {
            return Err(Error::config(format!(
                "common_threshold must be in (0, 1], got {}",
                self.common_threshold
            )));
        }

        if self
            .test_attribute
            .as_deref()
            .is_some_and(|a| a.trim().is_empty() || a.contains(char::is_whitespace))
        {
            return Err(Error::config("test_attribute must be a non-empty name"));
        }

        if self
            .transient_class
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(Error::config("transient_class must not be blank"));
        }

        Ok(())
    }

    /// Returns `true` if `class` is the transient marker.
    #[inline]
    #[must_use]
    pub fn is_transient(&self, class: &str) -> bool {
        self.transient_class.as_deref() == Some(class)
    }
}

// ============================================================================
// Tests
// ============================================================================
