//! Page templates.
//!
//! Templates are minijinja files registered with `template` directives.
//! `{% include %}` paths resolve against the document root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{path_loader, Environment};
use serde::Serialize;

use inkpress_directive::{Configuration, PageLink, DEFAULT_TEMPLATE};

/// Name of the built-in page template.
const BUILTIN_NAME: &str = "inkpress-page.html";

/// Values available to a page template.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext<'a> {
    /// Page title
    pub title: &'a str,
    /// Front matter date
    pub date: Option<&'a str>,
    /// Rendered document HTML
    pub body: &'a str,
    /// Remaining front matter keys
    pub doc: &'a BTreeMap<String, serde_json::Value>,
    /// Stylesheet URLs
    pub styles: &'a [String],
    /// Script URLs
    pub scripts: &'a [String],
    /// Link index of the scope
    pub links: &'a [PageLink],
    /// Request path of the page
    pub request_path: &'a str,
}

/// A template file read from disk.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    /// Template name (its resolved path)
    pub name: String,
    /// Template source
    pub source: String,
}

/// Errors that can occur while loading templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template '{alias}' from {path}: {source}")]
    Read {
        alias: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The templates of one configuration, read once per generation pass.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    root: PathBuf,
    templates: BTreeMap<String, LoadedTemplate>,
}

impl TemplateSet {
    /// A set with only the built-in template.
    pub fn builtin(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            templates: BTreeMap::new(),
        }
    }

    /// Read every template registered on `config`.
    pub fn load(config: &Configuration) -> Result<Self, TemplateError> {
        let mut set = Self::builtin(&config.root);

        for (alias, path) in &config.templates {
            let source = fs::read_to_string(path).map_err(|e| TemplateError::Read {
                alias: alias.clone(),
                path: PathBuf::from(path),
                source: e,
            })?;
            set.templates.insert(
                alias.clone(),
                LoadedTemplate {
                    name: path.clone(),
                    source,
                },
            );
        }

        Ok(set)
    }

    /// Template for `alias`, falling back to the default alias.
    ///
    /// `None` means the built-in template.
    pub fn select(&self, alias: Option<&str>) -> Option<&LoadedTemplate> {
        if let Some(alias) = alias {
            if let Some(template) = self.templates.get(alias) {
                return Some(template);
            }
            tracing::debug!("Template alias '{}' not registered, using default", alias);
        }
        self.templates.get(DEFAULT_TEMPLATE)
    }

    /// Loaded templates, by alias.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoadedTemplate)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render a page with the template picked by `alias`.
    pub fn render(
        &self,
        alias: Option<&str>,
        page: &PageContext<'_>,
    ) -> Result<String, minijinja::Error> {
        let mut env = environment(&self.root);

        let name = match self.select(alias) {
            Some(template) => {
                env.add_template(&template.name, &template.source)?;
                template.name.as_str()
            }
            None => {
                env.add_template(BUILTIN_NAME, PAGE_TEMPLATE)?;
                BUILTIN_NAME
            }
        };

        let template = env.get_template(name)?;
        template.render(page)
    }
}

fn environment<'source>(root: &Path) -> Environment<'source> {
    let mut env = Environment::new();
    env.set_loader(path_loader(root));
    env.set_keep_trailing_newline(true);
    env
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
<title>{{ title }}</title>
<meta charset="utf-8">
{% for style in styles %}<link rel="stylesheet" href="{{ style }}">
{% endfor %}{% for script in scripts %}<script src="{{ script }}"></script>
{% endfor %}</head>
<body>
{{ body | safe }}
</body>
</html>
"##;
