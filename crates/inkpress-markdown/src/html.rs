//! Markdown to HTML rendering.

use pulldown_cmark::{html, CowStr, Event, Parser, Tag};

use crate::parser::options;

/// Render markdown to HTML.
///
/// `rewrite` sees every link destination and may return a replacement.
pub fn render_html<F>(content: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let parser = Parser::new_ext(content, options()).map(|event| match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = match rewrite(&dest_url) {
                Some(replacement) => CowStr::from(replacement),
                None => dest_url,
            };
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        other => other,
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

/// Resolve a relative link found in the document at `base` (a request path).
///
/// Returns the absolute request path with any query or fragment kept, or
/// `None` for absolute, external, and fragment-only links.
pub fn resolve_link(base: &str, dest: &str) -> Option<String> {
    if dest.is_empty()
        || dest.starts_with('/')
        || dest.starts_with('#')
        || dest.starts_with('?')
        || has_scheme(dest)
    {
        return None;
    }

    let split = dest.find(['#', '?']).unwrap_or(dest.len());
    let (path, suffix) = dest.split_at(split);

    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    // Drop the document name, links resolve against its directory.
    if !base.ends_with('/') {
        segments.pop();
    }

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    Some(format!("/{}{}", segments.join("/"), suffix))
}

fn has_scheme(dest: &str) -> bool {
    match dest.find(':') {
        Some(pos) => dest[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        None => false,
    }
}
