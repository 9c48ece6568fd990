//! Error types for gmxsync-translate.

use thiserror::Error;

/// A mirror document that cannot be merged onto a native resource.
///
/// `line` is 1-based and points at the offending line of the mirror text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}
