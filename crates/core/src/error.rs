//! Error types for Quire operations.
//!
//! This module defines the main error type [`QuireError`] which represents
//! every failure that can reach a caller of extraction, feed parsing,
//! discovery, or sync, plus the storage-level [`StoreError`].
//!
//! Most sub-operations isolate their own failures (one probe path, one
//! hydration script, one sync item) and never surface them here. Only the
//! input-classification errors [`QuireError::SiteNotFound`] and
//! [`QuireError::NoFeedsFound`] are meant to be shown to an end user.
//!
//! # Example
//!
//! ```rust
//! use quire_core::{QuireError, Result};
//!
//! fn require_feeds(found: Vec<String>, site: &str) -> Result<Vec<String>> {
//!     if found.is_empty() {
//!         return Err(QuireError::NoFeedsFound(site.to_string()));
//!     }
//!     Ok(found)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Quire operations.
#[derive(Error, Debug)]
pub enum QuireError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures and connection issues.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The document is not a well-formed RSS or Atom feed.
    #[error("Failed to parse feed: {0}")]
    FeedParseError(String),

    /// The document is not a well-formed OPML subscription list.
    #[error("Failed to parse OPML: {0}")]
    OpmlError(String),

    /// Extraction rule file errors.
    #[error("Extractor rule error: {0}")]
    RuleError(String),

    /// A free-text discovery query could not be resolved to a website.
    #[error("Could not find a website for \"{0}\"")]
    SiteNotFound(String),

    /// Every discovery strategy came back empty.
    #[error("No RSS/Atom feeds found at {0}")]
    NoFeedsFound(String),

    /// Persistence failures.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuireError {
    /// Whether this error is meant to be shown to an end user verbatim.
    ///
    /// Everything else is a transport or internal failure and should be
    /// reported with a generic message.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, QuireError::SiteNotFound(_) | QuireError::NoFeedsFound(_))
    }
}

/// Errors surfaced by an [`ItemStore`](crate::sync::ItemStore).
///
/// `Duplicate` is the unique-constraint violation on `(user, feed, guid)`;
/// the sync layer reclassifies it as "already exists".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate key")]
    Duplicate,

    #[error("{0}")]
    Backend(String),
}

/// Result type alias for QuireError.
pub type Result<T> = std::result::Result<T, QuireError>;
