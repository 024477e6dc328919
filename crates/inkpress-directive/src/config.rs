//! Per-scope configuration model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;

/// Template alias used when a document does not pick one.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Directory name used by `sitegen` without an argument.
pub const DEFAULT_STATIC_DIR: &str = "generated_site";

/// Extensions assumed when a block declares none.
pub const DEFAULT_EXTENSIONS: [&str; 3] = [".md", ".markdown", ".mmark"];

/// One entry of a scope's link index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    /// Request path of the document (e.g. `/blog/first_post.md`)
    pub url: String,
    /// Front matter title, or the file stem
    pub title: String,
    /// Front matter date, as written
    pub date: Option<String>,
    /// Short plain-text summary
    pub summary: String,
    /// Source file on disk
    pub source: PathBuf,
}

/// State published by the last successful generation pass.
///
/// Always replaced as a whole, so readers never see a mix of two passes.
#[derive(Debug, Clone, Default)]
pub struct Published {
    /// Request path -> generated output file
    pub static_files: BTreeMap<String, PathBuf>,
    /// Link index of every document under the scope
    pub links: Arc<Vec<PageLink>>,
    /// Fingerprint of the source tree the pass was built from
    pub fingerprint: Option<String>,
}

/// Held for the duration of a generation pass.
pub type PassGuard<'a> = MutexGuard<'a, ()>;

/// Settings for one declared path scope.
///
/// Declared fields are filled in by the parser and then shared read-only
/// (behind an `Arc`). Only a generation pass replaces the published state.
#[derive(Debug, Serialize)]
pub struct Configuration {
    /// URL path prefix the configuration applies to
    pub path_scope: String,

    /// Document suffixes, in declaration order
    pub extensions: Vec<String>,

    /// Stylesheet URLs
    pub styles: Vec<String>,

    /// Script URLs
    pub scripts: Vec<String>,

    /// Template alias -> resolved template path
    pub templates: BTreeMap<String, String>,

    /// Where the static mirror is written, if `sitegen` was declared
    pub static_dir: Option<PathBuf>,

    /// Render on demand instead of keeping a watched mirror
    pub development: bool,

    /// Document root the configuration was parsed against
    pub root: PathBuf,

    #[serde(skip)]
    published: RwLock<Published>,

    #[serde(skip)]
    pass: Mutex<()>,
}

impl Configuration {
    /// Create an empty configuration for `path_scope` under `root`.
    pub fn new(root: impl Into<PathBuf>, path_scope: impl Into<String>) -> Self {
        Self {
            path_scope: path_scope.into(),
            extensions: Vec::new(),
            styles: Vec::new(),
            scripts: Vec::new(),
            templates: BTreeMap::new(),
            static_dir: None,
            development: false,
            root: root.into(),
            published: RwLock::new(Published::default()),
            pass: Mutex::new(()),
        }
    }

    /// Fill in defaults for anything the block left unset.
    pub fn finish(&mut self) {
        if self.extensions.is_empty() {
            self.extensions = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        }
    }

    /// Directory holding the scope's source documents.
    pub fn scope_dir(&self) -> PathBuf {
        self.root.join(self.path_scope.trim_start_matches('/'))
    }

    /// Whether `request_path` falls under this scope.
    pub fn matches(&self, request_path: &str) -> bool {
        let scope = self.path_scope.trim_end_matches('/');
        if scope.is_empty() {
            return request_path.starts_with('/');
        }

        match request_path.strip_prefix(scope) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Whether `path` carries one of the configured extensions.
    pub fn has_extension(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }

    /// Resolved path of the template registered under `alias`.
    pub fn template(&self, alias: &str) -> Option<&str> {
        self.templates.get(alias).map(String::as_str)
    }

    /// Generated file for `request_path`, if the last pass produced one.
    pub fn static_file(&self, request_path: &str) -> Option<PathBuf> {
        self.read_published().static_files.get(request_path).cloned()
    }

    /// Snapshot of the request path -> generated file mapping.
    pub fn static_files(&self) -> BTreeMap<String, PathBuf> {
        self.read_published().static_files.clone()
    }

    /// Current link index.
    pub fn links(&self) -> Arc<Vec<PageLink>> {
        Arc::clone(&self.read_published().links)
    }

    /// Fingerprint of the last successful pass.
    pub fn fingerprint(&self) -> Option<String> {
        self.read_published().fingerprint.clone()
    }

    /// Replace the published state with the result of a pass.
    pub fn publish(&self, published: Published) {
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = published;
    }

    /// Serialize generation passes for this configuration.
    pub fn begin_pass(&self) -> PassGuard<'_> {
        self.pass.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_published(&self) -> std::sync::RwLockReadGuard<'_, Published> {
        self.published.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_applies_default_extensions() {
        let mut config = Configuration::new("/srv", "/blog");
        config.finish();

        assert_eq!(config.extensions, [".md", ".markdown", ".mmark"]);
    }

    #[test]
    fn finish_keeps_declared_extensions() {
        let mut config = Configuration::new("/srv", "/blog");
        config.extensions.push(".txt".to_string());
        config.finish();

        assert_eq!(config.extensions, [".txt"]);
    }

    #[test]
    fn matches_whole_path_segments() {
        let config = Configuration::new("/srv", "/blog");

        assert!(config.matches("/blog"));
        assert!(config.matches("/blog/first_post.md"));
        assert!(!config.matches("/blogroll"));
        assert!(!config.matches("/docs/x.md"));
    }

    #[test]
    fn root_scope_matches_everything() {
        let config = Configuration::new("/srv", "/");

        assert!(config.matches("/"));
        assert!(config.matches("/anything/here.md"));
    }

    #[test]
    fn scope_dir_joins_root() {
        let config = Configuration::new("/srv/site", "/blog");

        assert_eq!(config.scope_dir(), PathBuf::from("/srv/site/blog"));
    }

    #[test]
    fn checks_extensions_by_suffix() {
        let mut config = Configuration::new("/srv", "/");
        config.finish();

        assert!(config.has_extension(Path::new("a/post.md")));
        assert!(config.has_extension(Path::new("notes.markdown")));
        assert!(!config.has_extension(Path::new("image.png")));
        assert!(!config.has_extension(Path::new(".md")));
    }

    #[test]
    fn publish_replaces_state_wholesale() {
        let config = Configuration::new("/srv", "/blog");
        assert!(config.static_files().is_empty());

        let mut first = Published::default();
        first
            .static_files
            .insert("/blog/a.md".to_string(), PathBuf::from("out/blog/a.md/index.html"));
        first.fingerprint = Some("one".to_string());
        config.publish(first);

        let mut second = Published::default();
        second
            .static_files
            .insert("/blog/b.md".to_string(), PathBuf::from("out/blog/b.md/index.html"));
        config.publish(second);

        assert_eq!(config.static_file("/blog/a.md"), None);
        assert!(config.static_file("/blog/b.md").is_some());
        assert_eq!(config.fingerprint(), None);
    }
}
