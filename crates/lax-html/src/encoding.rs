//! Encoding detection and transcoding.
//!
//! Byte input is decoded in two steps:
//!
//! 1. Check for a Byte Order Mark. When one is present it decides the
//!    stream encoding and is skipped.
//! 2. Otherwise decode with the caller's default stream encoding.
//!
//! The parser later reports any `<meta>` charset declaration it meets; the
//! document facade can then re-decode the bytes with the declared encoding.

use std::borrow::Cow;

use encoding_rs::Encoding;
use regex::Regex;

use crate::error::HtmlError;

/// Extracts the charset token from a `content="text/html; charset=..."`
/// attribute value.
///
/// Constructed once and handed to the parser rather than kept in a global.
#[derive(Debug, Clone)]
pub struct CharsetMatcher {
    pattern: Regex,
}

impl CharsetMatcher {
    /// Compile the charset pattern.
    ///
    /// # Errors
    ///
    /// Returns [`HtmlError::Pattern`] if the pattern fails to compile.
    pub fn new() -> Result<Self, HtmlError> {
        Ok(Self {
            pattern: Regex::new(r#"(?i)(?:^|[;\s])charset\s*=\s*["']?\s*([^"';\s>]+)"#)?,
        })
    }

    /// The charset token of a `content` attribute value, if any.
    #[must_use]
    pub fn charset_from_content<'a>(&self, content: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Lowercase and trim a charset label, spelling `utf8` the standard way.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let label = label.trim().trim_matches(|c| c == '"' || c == '\'').to_ascii_lowercase();
    match label.as_str() {
        "utf8" => "utf-8".to_string(),
        _ => label,
    }
}

/// Resolve a charset label (after normalization) to an encoding.
#[must_use]
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(normalize_label(label).as_bytes())
}

/// Resolve a label, failing on unknown names.
///
/// # Errors
///
/// Returns [`HtmlError::UnknownEncoding`] when the label is not recognized.
pub fn require_encoding(label: &str) -> Result<&'static Encoding, HtmlError> {
    encoding_for_label(label).ok_or_else(|| HtmlError::UnknownEncoding(label.to_string()))
}

/// The encoding announced by a Byte Order Mark and the BOM length.
#[must_use]
pub fn sniff_bom(bytes: &[u8]) -> Option<(&'static Encoding, usize)> {
    Encoding::for_bom(bytes)
}

/// Bytes decoded to text, plus how the encoding was chosen.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// The decoded text, BOM removed.
    pub text: String,
    /// The encoding the bytes were decoded with.
    pub encoding: &'static Encoding,
    /// Whether a Byte Order Mark decided the encoding.
    pub from_bom: bool,
    /// Whether malformed sequences were replaced.
    pub had_errors: bool,
}

/// Decode `bytes`, letting a BOM override `fallback`.
#[must_use]
pub fn decode(bytes: &[u8], fallback: &'static Encoding) -> Decoded {
    let (encoding, skip, from_bom) = match sniff_bom(bytes) {
        Some((encoding, len)) => (encoding, len, true),
        None => (fallback, 0, false),
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[skip..]);
    Decoded {
        text: text.into_owned(),
        encoding,
        from_bom,
        had_errors,
    }
}

/// Decode `bytes` with exactly `encoding`, skipping a matching BOM.
#[must_use]
pub fn decode_with<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    let (text, _) = encoding.decode_with_bom_removal(bytes);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_from_content() {
        let matcher = CharsetMatcher::new().unwrap();
        assert_eq!(
            matcher.charset_from_content("text/html;charset=utf8"),
            Some("utf8")
        );
        assert_eq!(
            matcher.charset_from_content("text/html; CHARSET = \"ISO-8859-1\""),
            Some("ISO-8859-1")
        );
        assert_eq!(matcher.charset_from_content("text/html"), None);
    }

    #[test]
    fn test_normalize_and_resolve() {
        assert_eq!(normalize_label(" UTF8 "), "utf-8");
        assert_eq!(encoding_for_label("utf8"), Some(encoding_rs::UTF_8));
        assert_eq!(encoding_for_label("latin1"), Some(encoding_rs::WINDOWS_1252));
        assert!(encoding_for_label("x-no-such-thing").is_none());
        assert!(matches!(
            require_encoding("bogus"),
            Err(HtmlError::UnknownEncoding(label)) if label == "bogus"
        ));
    }

    #[test]
    fn test_decode_prefers_bom() {
        let decoded = decode(b"\xEF\xBB\xBFhi", encoding_rs::WINDOWS_1252);
        assert_eq!(decoded.text, "hi");
        assert_eq!(decoded.encoding, encoding_rs::UTF_8);
        assert!(decoded.from_bom);

        let decoded = decode(b"caf\xE9", encoding_rs::WINDOWS_1252);
        assert_eq!(decoded.text, "caf\u{e9}");
        assert!(!decoded.from_bom);
    }
}
