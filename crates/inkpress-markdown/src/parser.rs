//! Markdown document parser.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};

/// Number of words kept in a generated summary.
pub const SUMMARY_WORDS: usize = 50;

/// A parsed markdown document.
#[derive(Debug, Clone)]
pub struct ParsedDoc {
    /// Parsed front matter (default when the document has none)
    pub frontmatter: Frontmatter,

    /// Markdown content (without front matter)
    pub content: String,

    /// Plain-text summary: the front matter summary, or the opening words
    pub summary: String,
}

impl ParsedDoc {
    /// Front matter title, or `fallback`.
    pub fn title_or(&self, fallback: &str) -> String {
        self.frontmatter
            .title
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Errors that can occur when parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Front matter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Markdown extensions enabled everywhere.
pub(crate) fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Parse a markdown document.
///
/// Extracts front matter and builds a summary from the body text.
pub fn parse_document(source: &str) -> Result<ParsedDoc, ParseError> {
    let (frontmatter, content) = extract_frontmatter(source)?;
    let frontmatter = frontmatter.unwrap_or_default();

    let summary = match &frontmatter.summary {
        Some(summary) => summary.clone(),
        None => summarize(content, SUMMARY_WORDS),
    };

    Ok(ParsedDoc {
        frontmatter,
        content: content.to_string(),
        summary,
    })
}

/// First `limit` words of body text, skipping headings and code blocks.
fn summarize(content: &str, limit: usize) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut skip_depth = 0usize;

    for event in Parser::new_ext(content, options()) {
        match event {
            Event::Start(Tag::Heading { .. } | Tag::CodeBlock(_)) => skip_depth += 1,
            Event::End(TagEnd::Heading(_) | TagEnd::CodeBlock) => {
                skip_depth = skip_depth.saturating_sub(1)
            }
            Event::Text(text) | Event::Code(text) if skip_depth == 0 => {
                words.extend(text.split_whitespace().map(str::to_string));
                if words.len() >= limit {
                    break;
                }
            }
            _ => {}
        }
    }

    words.truncate(limit);
    words.join(" ")
}
