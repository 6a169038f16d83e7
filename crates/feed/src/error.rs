// ABOUTME: Error types for feed document construction and extraction.
// ABOUTME: Provides FeedError with MalformedDocument, UnrecognizedFormat, InvalidQuery and InvalidItem.

use std::fmt;
use thiserror::Error;

/// Errors that can occur while building or reading a feed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The XML could not be parsed, even after stripping control characters.
    #[error("malformed feed document: {0}")]
    MalformedDocument(String),

    /// The document parsed but no parser recognized its format.
    #[error("unrecognized feed format")]
    UnrecognizedFormat,

    /// A lookup path or namespace prefix could not be resolved.
    #[error("invalid query `{path}`: {reason}")]
    InvalidQuery { path: String, reason: String },

    /// An item node could not be turned into a valid item.
    #[error("invalid item: {0}")]
    InvalidItem(String),
}

impl FeedError {
    /// Creates a MalformedDocument error from an underlying XML error.
    pub fn malformed(err: impl fmt::Display) -> Self {
        FeedError::MalformedDocument(err.to_string())
    }

    /// Creates an InvalidQuery error for `path`.
    pub fn query(path: &str, reason: impl fmt::Display) -> Self {
        FeedError::InvalidQuery {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an InvalidItem error with a custom message.
    pub fn invalid_item(msg: impl Into<String>) -> Self {
        FeedError::InvalidItem(msg.into())
    }
}
