//! Front matter extraction and parsing.
//!
//! Documents may open with a YAML block fenced by `---` or a TOML block
//! fenced by `+++`.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Parsed front matter of a document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Frontmatter {
    /// Page title
    #[serde(default)]
    pub title: Option<String>,

    /// Template alias to render with
    #[serde(default)]
    pub template: Option<String>,

    /// Publication date, as written (quote it in TOML)
    #[serde(default)]
    pub date: Option<String>,

    /// Summary shown in link indexes
    #[serde(default)]
    pub summary: Option<String>,

    /// Any other keys, exposed to templates
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Errors that can occur when parsing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),

    #[error("Invalid TOML in front matter: {0}")]
    InvalidToml(String),
}

#[derive(Clone, Copy)]
enum Format {
    Yaml,
    Toml,
}

impl Format {
    fn fence(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Extract front matter from a document.
///
/// Returns the parsed front matter and the remaining content after the block.
/// A block needs an opening fence alone on the first line and a matching
/// closing fence line; anything else (such as a leading `---` thematic break)
/// is plain content.
pub fn extract_frontmatter(source: &str) -> Result<(Option<Frontmatter>, &str), FrontmatterError> {
    let trimmed = source.trim_start();
    let (first, after_open) = trimmed.split_once('\n').unwrap_or((trimmed, ""));

    let format = match first.trim_end() {
        "---" => Format::Yaml,
        "+++" => Format::Toml,
        _ => return Ok((None, source)),
    };

    let Some((block, remaining)) = split_block(after_open, format.fence()) else {
        return Ok((None, source));
    };
    let block = block.trim();

    let frontmatter: Frontmatter = if block.is_empty() {
        Frontmatter::default()
    } else {
        match format {
            Format::Yaml => serde_yaml::from_str(block)
                .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?,
            Format::Toml => {
                toml::from_str(block).map_err(|e| FrontmatterError::InvalidToml(e.to_string()))?
            }
        }
    };

    Ok((Some(frontmatter), remaining.trim_start()))
}

/// Split `text` at the first line consisting of `fence`.
fn split_block<'a>(text: &'a str, fence: &str) -> Option<(&'a str, &'a str)> {
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.trim_end() == fence {
            return Some((&text[..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }

    None
}
