//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing a configuration id with arbitrary strings
//! or a request sequence with other counters.
//!
//! | Type | Wraps | Purpose |
//! |------|-------|---------|
//! | [`ConfigId`] | `String` | Addresses one selector channel |
//! | [`RequestSeq`] | `u64` | Orders requests within one session |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// ConfigId
// ============================================================================

/// Route pattern for configuration ids.
const CONFIG_ID_PATTERN: &str = r"^\w+$";

fn config_id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(CONFIG_ID_PATTERN).expect("static pattern compiles"))
}

/// Opaque crawl-configuration identifier.
///
/// Only word characters are accepted since the id is embedded in the
/// channel path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConfigId(String);

impl ConfigId {
    /// Creates a configuration id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfigId`] if the value is empty or contains
    /// anything other than word characters.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if config_id_regex().is_match(&value) {
            Ok(Self(value))
        } else {
            Err(Error::invalid_config_id(value))
        }
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the channel path for this id.
    ///
    /// Format: `/ws/crawling/selector/{id}/`
    #[inline]
    #[must_use]
    pub fn channel_path(&self) -> String {
        format!("/ws/crawling/selector/{}/", self.0)
    }

    /// Extracts the id from a channel path.
    ///
    /// Returns `None` when the path does not follow the channel route.
    #[must_use]
    pub fn from_channel_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix("/ws/crawling/selector/")?;
        let id = rest.strip_suffix('/')?;
        Self::new(id).ok()
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConfigId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ConfigId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// RequestSeq
// ============================================================================

/// Monotonically increasing request sequence number.
///
/// Carried on the wire as `request_id`. A result is applied only if its
/// sequence matches the currently pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestSeq(u64);

impl RequestSeq {
    /// First sequence handed out by a session.
    pub const FIRST: Self = Self(1);

    /// Creates a sequence from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the following sequence.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
