//! Parse diagnostics and hard failures.
//!
//! Malformed markup never fails a parse. Each recovery is recorded as a
//! [`ParseError`] on the document instead. [`HtmlError`] is reserved for
//! misuse of the API and for environment problems such as an unusable
//! encoding label.

use std::fmt;

use lax_dom::DomError;
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Kind of a recorded recovery.
///
/// Codes print and parse by their variant name, so a filter such as
/// `"TagNotClosed".parse::<ParseErrorCode>()` round-trips through text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, IntoStaticStr,
)]
pub enum ParseErrorCode {
    /// An element was still open when its parent closed or input ended.
    TagNotClosed,
    /// An end tag had no matching open element.
    TagNotOpened,
    /// An end tag was written for an element that never takes one.
    EndTagNotRequired,
    /// An end tag would have crossed a structural boundary and was dropped.
    EndTagInvalidHere,
    /// The declared charset disagrees with the encoding the bytes were read with.
    CharsetMismatch,
}

impl ParseErrorCode {
    /// Whether this code describes harmless markup rather than a real defect.
    #[must_use]
    pub const fn is_informational(self) -> bool {
        matches!(self, Self::EndTagNotRequired)
    }
}

/// One recorded recovery, positioned in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What kind of recovery happened.
    pub code: ParseErrorCode,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// 0-based byte offset.
    pub offset: usize,
    /// Source snippet; empty unless snippet extraction was enabled.
    pub source_text: String,
    /// Human-readable explanation.
    pub reason: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.code, self.line, self.column, self.reason
        )
    }
}

/// Hard failures of the parser facade.
#[derive(Debug, Error)]
pub enum HtmlError {
    /// A tree operation failed.
    #[error(transparent)]
    Dom(#[from] DomError),

    /// The charset pattern could not be compiled.
    #[error("invalid charset pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An explicitly requested encoding label is not known.
    #[error("unknown encoding label '{0}'")]
    UnknownEncoding(String),

    /// A fragment produced no node to return.
    #[error("HTML fragment contains no nodes")]
    EmptyFragment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_names_parse_back() {
        let code: ParseErrorCode = "TagNotClosed".parse().unwrap();
        assert_eq!(code, ParseErrorCode::TagNotClosed);
        let name: &'static str = ParseErrorCode::EndTagInvalidHere.into();
        assert_eq!(name, "EndTagInvalidHere");
        assert_eq!(ParseErrorCode::CharsetMismatch.to_string(), "CharsetMismatch");
    }

    #[test]
    fn test_unknown_code_name_is_rejected() {
        let result = "NotAnError".parse::<ParseErrorCode>();
        assert_eq!(result, Err(strum::ParseError::VariantNotFound));
    }
}
