//! Common test utilities for integration tests
//!
//! Builds throwaway documentation trees and configurations whose external
//! tools are plain POSIX shell commands, so the full pipeline can run
//! without papyri or a JVM.

use anyhow::Result;
use metis_docs::{BuildStats, DocBuilder, DocgenConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Echoes the document back, but complains on stderr about any document
/// containing `BROKEN`.
pub const FAKE_PREPROCESSOR: &str = r#"input=$(cat)
case "$input" in
  *BROKEN*) echo "papyri: unknown directive 'BROKEN'" >&2 ;;
esac
printf '%s' "$input""#;

/// Wraps its single argument in a span and ends the line, like the real
/// highlighter. The newline is kept in the page.
pub const FAKE_HIGHLIGHTER: &str = r#"printf '<span>%s</span>\n' "$1""#;

/// Isolated project layout with automatic cleanup
///
/// ```text
/// <tmp>/docs/        documentation sources (docs_dir)
/// <tmp>/docs/static/ static assets
/// <tmp>/gendocs/     output root
/// ```
pub struct SiteFixture {
    _root: TempDir,
    root: PathBuf,
}

impl SiteFixture {
    pub fn new() -> Result<Self> {
        let root_dir = TempDir::new()?;
        let root = root_dir.path().canonicalize()?;
        fs::create_dir_all(root.join("docs/static"))?;

        Ok(Self {
            _root: root_dir,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("docs")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("gendocs")
    }

    /// Writes a file relative to the docs directory.
    pub fn write_doc(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.docs_dir().join(relative);
        fs::create_dir_all(path.parent().expect("doc path has a parent"))?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn remove_doc(&self, relative: &str) -> Result<()> {
        fs::remove_file(self.docs_dir().join(relative))?;
        Ok(())
    }

    /// Reads a rendered file relative to the output directory.
    pub fn read_output(&self, relative: &str) -> Result<String> {
        Ok(fs::read_to_string(self.output_dir().join(relative))?)
    }

    /// All files under the output directory, relative and sorted.
    pub fn output_files(&self) -> Vec<PathBuf> {
        let out = self.output_dir();
        let mut files: Vec<_> = walkdir::WalkDir::new(&out)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(&out).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }

    /// Configuration using the fake tools and no upstream build.
    pub fn config(&self) -> DocgenConfig {
        let mut config = DocgenConfig::default();
        config.preprocessor.command = "sh".to_string();
        config.preprocessor.args = vec!["-c".to_string(), FAKE_PREPROCESSOR.to_string()];
        config.highlighter.command = "sh".to_string();
        config.highlighter.args = vec![
            "-c".to_string(),
            FAKE_HIGHLIGHTER.to_string(),
            "highlight".to_string(),
        ];
        config.highlighter.artifact = None;
        config.build.skip = true;
        config
    }

    pub async fn build(&self) -> Result<BuildStats> {
        self.build_with(self.config()).await
    }

    pub async fn build_with(&self, config: DocgenConfig) -> Result<BuildStats> {
        DocBuilder::new(&self.docs_dir(), config)?.run_async().await
    }
}
