//! Static snapshot generator.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use inkpress_directive::{Configuration, PageLink, Published};
use inkpress_markdown::parse_document;

use crate::links::LinkIndex;
use crate::renderer::{file_stem, RenderContext, RenderError, Renderer};
use crate::templates::{TemplateError, TemplateSet};

/// Name of the file written for every document.
const INDEX_FILE: &str = "index.html";

/// Result of a generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Path scope of the configuration
    pub scope: String,

    /// Number of documents indexed
    pub pages: usize,

    /// Whether anything was rebuilt (false when the sources were unchanged)
    pub regenerated: bool,

    /// Pass duration in milliseconds
    pub duration_ms: u64,
}

/// Errors that can occur during a generation pass.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Failed to read source directory {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: inkpress_markdown::ParseError,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to render {path}: {source}")]
    Render { path: String, source: RenderError },

    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("No such document: {0}")]
    NotFound(String),
}

/// A source document found under a scope.
#[derive(Debug)]
struct SourceDoc {
    /// File on disk
    source_path: PathBuf,

    /// Public request path (e.g. `/blog/first_post.md`)
    request_path: String,

    /// Raw document text
    text: String,
}

/// Generates the link index and static mirror for configurations.
///
/// The renderer is shared by every configuration.
#[derive(Clone)]
pub struct SnapshotGenerator {
    renderer: Arc<dyn Renderer>,
}

impl SnapshotGenerator {
    /// Create a generator that renders through `renderer`.
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Run a pass, skipping work when the sources are unchanged.
    pub fn generate(&self, config: &Configuration) -> Result<GenerationReport, GenerateError> {
        self.run(config, false)
    }

    /// Run a full pass regardless of the last fingerprint.
    pub fn rebuild(&self, config: &Configuration) -> Result<GenerationReport, GenerateError> {
        self.run(config, true)
    }

    /// Render one document on demand against the published link index.
    ///
    /// Nothing is written; used when a configuration has no static mirror
    /// or is in development mode.
    pub fn render_page(
        &self,
        config: &Configuration,
        request_path: &str,
    ) -> Result<String, GenerateError> {
        if !is_plain_request_path(request_path)
            || !config.matches(request_path)
            || !config.has_extension(Path::new(request_path))
        {
            return Err(GenerateError::NotFound(request_path.to_string()));
        }

        let source_path = config.root.join(request_path.trim_start_matches('/'));
        let text = fs::read_to_string(&source_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => GenerateError::NotFound(request_path.to_string()),
            _ => GenerateError::Read {
                path: source_path.clone(),
                source: e,
            },
        })?;

        let templates = TemplateSet::load(config)?;
        let links = LinkIndex::from(config.links().as_slice());
        let ctx = RenderContext {
            config,
            request_path,
            links: &links,
            templates: &templates,
        };

        self.renderer
            .render(&text, &ctx)
            .map_err(|e| GenerateError::Render {
                path: request_path.to_string(),
                source: e,
            })
    }

    fn run(&self, config: &Configuration, force: bool) -> Result<GenerationReport, GenerateError> {
        let _pass = config.begin_pass();
        let start = Instant::now();

        let docs = discover_documents(config)?;
        let templates = TemplateSet::load(config)?;
        let fingerprint = fingerprint(&docs, &templates);

        let unchanged = config.fingerprint().as_deref() == Some(fingerprint.as_str())
            && config.static_files().values().all(|p| p.is_file());

        if unchanged && !force {
            tracing::debug!("Sources under {} unchanged", config.path_scope);
            return Ok(GenerationReport {
                scope: config.path_scope.clone(),
                pages: docs.len(),
                regenerated: false,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        let links = build_links(&docs)?;

        let static_files = match &config.static_dir {
            Some(static_dir) => {
                let rendered = self.render_all(config, &docs, &links, &templates)?;
                write_mirror(static_dir, &docs, rendered)?
            }
            None => BTreeMap::new(),
        };

        remove_stale(&config.static_files(), &static_files);

        let pages = docs.len();
        config.publish(Published {
            static_files,
            links: Arc::new(links.into_pages()),
            fingerprint: Some(fingerprint),
        });

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Generated {} pages for {} in {}ms",
            pages,
            config.path_scope,
            duration_ms
        );

        Ok(GenerationReport {
            scope: config.path_scope.clone(),
            pages,
            regenerated: true,
            duration_ms,
        })
    }

    /// Render every document in parallel, all or nothing.
    fn render_all(
        &self,
        config: &Configuration,
        docs: &[SourceDoc],
        links: &LinkIndex,
        templates: &TemplateSet,
    ) -> Result<Vec<String>, GenerateError> {
        docs.par_iter()
            .map(|doc| {
                let ctx = RenderContext {
                    config,
                    request_path: &doc.request_path,
                    links,
                    templates,
                };
                self.renderer
                    .render(&doc.text, &ctx)
                    .map_err(|e| GenerateError::Render {
                        path: doc.request_path.clone(),
                        source: e,
                    })
            })
            .collect()
    }
}

impl std::fmt::Debug for SnapshotGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotGenerator").finish_non_exhaustive()
    }
}

/// Output file for `request_path` under `static_dir`.
///
/// `/blog/first_post.md` -> `<static_dir>/blog/first_post.md/index.html`
pub fn output_path(static_dir: &Path, request_path: &str) -> PathBuf {
    static_dir
        .join(request_path.trim_start_matches('/'))
        .join(INDEX_FILE)
}

/// Find and read every matching document under the configuration's scope.
fn discover_documents(config: &Configuration) -> Result<Vec<SourceDoc>, GenerateError> {
    let scope_dir = config.scope_dir();
    let mut docs = Vec::new();

    let walker = WalkDir::new(&scope_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        // Never index our own output.
        .filter_entry(|e| match config.static_dir.as_deref() {
            Some(static_dir) => !same_path(e.path(), static_dir),
            None => true,
        });

    for entry in walker {
        let entry = entry.map_err(|e| GenerateError::Walk {
            path: scope_dir.clone(),
            source: e,
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() || !config.has_extension(path) {
            continue;
        }

        let text = fs::read_to_string(path).map_err(|e| GenerateError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let request_path = request_path(&config.root, path);
        tracing::debug!("Found {} at {}", request_path, path.display());

        docs.push(SourceDoc {
            source_path: path.to_path_buf(),
            request_path,
            text,
        });
    }

    Ok(docs)
}

/// Whether `request_path` stays under the document root: absolute, with no
/// `.`/`..` segments and no backslashes.
fn is_plain_request_path(request_path: &str) -> bool {
    let Some(relative) = request_path.strip_prefix('/') else {
        return false;
    };

    !relative.contains('\\')
        && relative
            .split('/')
            .all(|segment| segment != "." && segment != "..")
}

/// Path equality that ignores `.` components.
fn same_path(a: &Path, b: &Path) -> bool {
    fn parts(p: &Path) -> Vec<Component<'_>> {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    }
    parts(a) == parts(b)
}

/// Public request path of `path`: `/` + its path relative to `root`.
fn request_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    format!("/{}", segments.join("/"))
}

fn build_links(docs: &[SourceDoc]) -> Result<LinkIndex, GenerateError> {
    let mut pages = Vec::with_capacity(docs.len());

    for doc in docs {
        let parsed = parse_document(&doc.text).map_err(|e| GenerateError::Parse {
            path: doc.request_path.clone(),
            source: e,
        })?;

        pages.push(PageLink {
            url: doc.request_path.clone(),
            title: parsed.title_or(&file_stem(&doc.request_path)),
            date: parsed.frontmatter.date.clone(),
            summary: parsed.summary,
            source: doc.source_path.clone(),
        });
    }

    Ok(LinkIndex::build(pages))
}

/// Fingerprint of everything a pass reads.
fn fingerprint(docs: &[SourceDoc], templates: &TemplateSet) -> String {
    let mut hasher = Sha256::new();

    for doc in docs {
        hasher.update(doc.request_path.as_bytes());
        hasher.update([0]);
        hasher.update(doc.text.as_bytes());
        hasher.update([0]);
    }
    for (alias, template) in templates.iter() {
        hasher.update(alias.as_bytes());
        hasher.update([0]);
        hasher.update(template.source.as_bytes());
        hasher.update([0]);
    }

    hex::encode(hasher.finalize())
}

/// Write rendered pages, returning the request path -> file mapping.
///
/// Every page is staged next to its output before any is renamed into place,
/// so a failed write leaves the previous mirror untouched.
fn write_mirror(
    static_dir: &Path,
    docs: &[SourceDoc],
    rendered: Vec<String>,
) -> Result<BTreeMap<String, PathBuf>, GenerateError> {
    let mut staged = Vec::with_capacity(docs.len());

    for (doc, html) in docs.iter().zip(rendered) {
        let output = output_path(static_dir, &doc.request_path);
        match stage(&output, html.as_bytes()) {
            Ok(tmp) => staged.push((doc.request_path.clone(), tmp, output)),
            Err(e) => {
                discard(&staged);
                return Err(e);
            }
        }
    }

    let mut static_files = BTreeMap::new();
    for (i, (request_path, tmp, output)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, output) {
            discard(&staged[i..]);
            return Err(GenerateError::Write {
                path: output.clone(),
                source: e,
            });
        }
        static_files.insert(request_path.clone(), output.clone());
    }

    Ok(static_files)
}

/// Write `contents` to a temporary file beside `path`.
fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf, GenerateError> {
    let write_err = |e: io::Error| GenerateError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp = path.with_file_name(format!("{INDEX_FILE}.tmp"));
    fs::write(&tmp, contents).map_err(write_err)?;

    Ok(tmp)
}

fn discard(staged: &[(String, PathBuf, PathBuf)]) {
    for (_, tmp, _) in staged {
        if let Err(e) = fs::remove_file(tmp) {
            tracing::warn!("Failed to remove {}: {}", tmp.display(), e);
        }
    }
}

/// Remove outputs of the previous pass that the new pass no longer produces.
fn remove_stale(previous: &BTreeMap<String, PathBuf>, current: &BTreeMap<String, PathBuf>) {
    for (request_path, file) in previous {
        if current.contains_key(request_path) {
            continue;
        }

        match fs::remove_file(file) {
            Ok(()) => {
                tracing::debug!("Removed stale output {}", file.display());
                if let Some(parent) = file.parent() {
                    // Only succeeds when the directory is now empty.
                    let _ = fs::remove_dir(parent);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to remove stale output {}: {}", file.display(), e);
            }
        }
    }
}
