//! Static snapshot generator for inkpress.
//!
//! Walks the documents under a configuration's path scope, builds the link
//! index, renders every document through a [`Renderer`] and mirrors the
//! result under the configuration's static directory.

pub mod generator;
pub mod links;
pub mod renderer;
pub mod templates;

pub use generator::{output_path, GenerateError, GenerationReport, SnapshotGenerator};
pub use links::LinkIndex;
pub use renderer::{MarkdownRenderer, RenderContext, RenderError, Renderer};
pub use templates::{PageContext, TemplateError, TemplateSet};
