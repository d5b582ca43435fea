//! Tolerant single-pass HTML parser.
//!
//! Any input parses. Unclosed elements, stray end tags and misnested markup
//! are repaired on the fly and recorded as [`ParseError`]s next to the
//! resulting tree instead of failing the parse.
//!
//! # Example
//!
//! ```
//! use lax_html::{HtmlDocument, ParseErrorCode};
//!
//! let doc = HtmlDocument::parse("<ul><li>one<li>two</ul>").unwrap();
//! let items = doc.select("//li").unwrap();
//! assert_eq!(items.len(), 2);
//! assert!(doc.errors().iter().all(|e| e.code == ParseErrorCode::TagNotClosed));
//! ```
//!
//! # Modules
//!
//! - [`parser`]: the character-level state machine
//! - [`document`]: loading from text or bytes, encoding detection, fragments
//! - [`encoding`]: Byte Order Mark sniffing and `<meta>` charset extraction
//! - [`options`]: parse and output options
//! - [`entities`]: character reference conversion
//! - [`print`]: debug outlines of a tree

pub mod document;
pub mod encoding;
pub mod entities;
pub mod error;
pub mod options;
pub mod parser;
pub mod print;

pub use document::{HtmlDocument, Remainder};
pub use encoding::CharsetMatcher;
pub use error::{HtmlError, ParseError, ParseErrorCode};
pub use options::{ParseOptions, ResetterTable};
pub use parser::{HtmlParser, ParseState};
pub use print::{print_tree, tree_to_string};
