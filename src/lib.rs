//! metis-docs library
//!
//! Builds the Metis documentation site: every `*.papyri` literate document
//! is rendered by the `papyri` preprocessor, its `<metis>` code samples are
//! replaced with markup from the Metis syntax highlighter, and the pages
//! are written to a mirrored output tree next to a copy of the static
//! assets.
//!
//! ## Public API
//!
//! The main entry point is [`DocBuilder`], configured with a
//! [`DocgenConfig`] (usually loaded from `docgen.toml`).
//!
//! The individual stages are public as well:
//! - [`Preprocessor`] - pipes a document through the external preprocessor
//! - [`Highlighter`] - highlights one code sample
//! - [`TagPattern`], [`substitute`] - find and replace embedded samples
//! - [`discover_documents`], [`mirrored_output_path`] - input discovery and
//!   output placement

mod artifact;
mod assets;
mod config;
mod highlight;
mod pipeline;
mod preprocess;
mod process;
mod reporting;
mod tags;
mod walker;

pub use artifact::build_artifacts;
pub use assets::sync_static_assets;
pub use config::{
    BuildConfig, BuildPaths, DocgenConfig, DocumentsConfig, HighlighterConfig, PathsConfig,
    ToolConfig, CONFIG_FILE_NAME,
};
pub use highlight::Highlighter;
pub use pipeline::DocBuilder;
pub use preprocess::Preprocessor;
pub use process::ProcessError;
pub use reporting::{print_build_statistics, report_build_error, BuildStats};
pub use tags::{assemble, substitute, Blocks, EmbeddedBlock, Substituted, TagPattern};
pub use walker::{discover_documents, mirrored_output_path, write_output, Document};
