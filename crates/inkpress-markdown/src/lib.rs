//! Markdown documents with front matter.
//!
//! This crate splits a document into its front matter and markdown body,
//! extracts a plain-text summary for link indexes, and renders the body to
//! HTML with inter-document links rewritten.

pub mod frontmatter;
pub mod html;
pub mod parser;

pub use frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};
pub use html::{render_html, resolve_link};
pub use parser::{parse_document, ParseError, ParsedDoc};
