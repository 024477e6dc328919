//! Directive parser and configuration model.
//!
//! Turns a block of directive text such as
//!
//! ```text
//! mmark /blog {
//!     ext .md .txt
//!     template layout.html
//!     sitegen
//! }
//! ```
//!
//! into one [`Configuration`] per declared path scope.

pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;

pub use config::{
    Configuration, PageLink, PassGuard, Published, DEFAULT_EXTENSIONS, DEFAULT_STATIC_DIR,
    DEFAULT_TEMPLATE,
};
pub use error::{ParseError, ParseErrorKind, PartialParse};
pub use lexer::{tokenize, Token};
pub use parser::{apply_option, parse, parse_directive, ParseOptions};
