//! Rendering engine seam.

use inkpress_directive::Configuration;
use inkpress_markdown::{parse_document, render_html, resolve_link};

use crate::links::LinkIndex;
use crate::templates::{PageContext, TemplateSet};

/// Everything a renderer may use besides the document source.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Configuration the document belongs to
    pub config: &'a Configuration,
    /// Public request path of the document
    pub request_path: &'a str,
    /// Link index of the current pass
    pub links: &'a LinkIndex,
    /// Templates of the current pass
    pub templates: &'a TemplateSet,
}

/// Errors that can occur while rendering a document.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to parse document: {0}")]
    Parse(#[from] inkpress_markdown::ParseError),

    #[error("Failed to render template: {0}")]
    Template(#[from] minijinja::Error),

    #[error("{0}")]
    Engine(String),
}

/// Turns document source into a complete HTML page.
///
/// Implementations are shared across every configuration and must not keep
/// state between calls.
pub trait Renderer: Send + Sync {
    /// Render `source` for the document at `ctx.request_path`.
    fn render(&self, source: &str, ctx: &RenderContext<'_>) -> Result<String, RenderError>;
}

/// Default engine: front matter + pulldown-cmark + minijinja templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &str, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let doc = parse_document(source)?;
        let title = doc.title_or(&file_stem(ctx.request_path));

        let body = render_html(&doc.content, |dest| {
            let resolved = resolve_link(ctx.request_path, dest)?;
            let path = resolved.split(['#', '?']).next().unwrap_or_default();
            ctx.links.contains(path).then_some(resolved)
        });

        let page = PageContext {
            title: &title,
            date: doc.frontmatter.date.as_deref(),
            body: &body,
            doc: &doc.frontmatter.extra,
            styles: &ctx.config.styles,
            scripts: &ctx.config.scripts,
            links: ctx.links.pages(),
            request_path: ctx.request_path,
        };

        let html = ctx
            .templates
            .render(doc.frontmatter.template.as_deref(), &page)?;

        Ok(html)
    }
}

/// Last path segment without its extension (`/blog/first_post.md` -> `first_post`).
pub(crate) fn file_stem(request_path: &str) -> String {
    let name = request_path.rsplit('/').next().unwrap_or(request_path);
    match name.rfind('.') {
        Some(0) | None => name.to_string(),
        Some(dot) => name[..dot].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpress_directive::PageLink;
    use std::path::PathBuf;

    fn link(url: &str) -> PageLink {
        PageLink {
            url: url.to_string(),
            title: file_stem(url),
            date: None,
            summary: String::new(),
            source: PathBuf::from(url),
        }
    }

    #[test]
    fn stem_of_request_path() {
        assert_eq!(file_stem("/blog/first_post.md"), "first_post");
        assert_eq!(file_stem("/notes.tar.md"), "notes.tar");
        assert_eq!(file_stem("/.hidden"), ".hidden");
        assert_eq!(file_stem("/plain"), "plain");
    }

    #[test]
    fn renders_page_with_links_rewritten() {
        let mut config = Configuration::new("/srv", "/blog");
        config.styles.push("/a.css".to_string());
        config.finish();
        let links = LinkIndex::build([link("/blog/first_post.md"), link("/blog/second.md")]);
        let templates = TemplateSet::builtin("/srv");
        let ctx = RenderContext {
            config: &config,
            request_path: "/blog/first_post.md",
            links: &links,
            templates: &templates,
        };

        let html = MarkdownRenderer::new()
            .render(
                "# Test h1\n\n[next](second.md#intro) [gone](missing.md)",
                &ctx,
            )
            .unwrap();

        assert!(html.contains("<title>first_post</title>"));
        assert!(html.contains("<h1>Test h1</h1>"));
        assert!(html.contains(r#"href="/blog/second.md#intro""#));
        assert!(html.contains(r#"href="missing.md""#));
        assert!(html.contains("a.css"));
    }

    #[test]
    fn front_matter_title_wins() {
        let config = Configuration::new("/srv", "/");
        let links = LinkIndex::default();
        let templates = TemplateSet::builtin("/srv");
        let ctx = RenderContext {
            config: &config,
            request_path: "/post.md",
            links: &links,
            templates: &templates,
        };

        let html = MarkdownRenderer
            .render("---\ntitle: Hello There\n---\nBody", &ctx)
            .unwrap();

        assert!(html.contains("<title>Hello There</title>"));
    }

    #[test]
    fn bad_front_matter_is_a_render_error() {
        let config = Configuration::new("/srv", "/");
        let links = LinkIndex::default();
        let templates = TemplateSet::builtin("/srv");
        let ctx = RenderContext {
            config: &config,
            request_path: "/post.md",
            links: &links,
            templates: &templates,
        };

        let err = MarkdownRenderer.render("---\ntitle: [oops\n---\n", &ctx).unwrap_err();

        assert!(matches!(err, RenderError::Parse(_)));
    }
}
