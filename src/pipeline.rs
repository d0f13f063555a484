use crate::artifact::build_artifacts;
use crate::assets::sync_static_assets;
use crate::config::{BuildPaths, DocgenConfig};
use crate::highlight::Highlighter;
use crate::preprocess::Preprocessor;
use crate::reporting::BuildStats;
use crate::tags::{substitute, TagPattern};
use crate::walker::{discover_documents, mirrored_output_path, write_output, Document};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Builds the documentation site.
///
/// # Overview
///
/// A build runs in four sequential phases:
///
/// 1. the upstream build steps produce the highlighter artifact and the
///    API docs,
/// 2. every `*.papyri` document (library fragments excluded) is piped
///    through the preprocessor,
/// 3. each `<metis>…</metis>` sample in the result is replaced by the
///    highlighter's markup and the page is written to the mirrored path
///    under the output root,
/// 4. the static assets directory is replaced by a fresh copy.
///
/// The first failure stops the build. Pages already written for earlier
/// documents stay; the failing document and everything after it produce no
/// output.
pub struct DocBuilder {
    config: DocgenConfig,
    paths: BuildPaths,
}

impl DocBuilder {
    /// Creates a builder for the documentation rooted at `docs_dir`.
    ///
    /// `docs_dir` must be absolute. Variables in tool commands are expanded
    /// and the configuration is validated here.
    pub fn new(docs_dir: &Path, mut config: DocgenConfig) -> Result<Self> {
        if !docs_dir.is_absolute() {
            anyhow::bail!(
                "Documentation directory must be absolute: {}",
                docs_dir.display()
            );
        }

        let paths = BuildPaths::resolve(docs_dir, &config.paths);
        config.expand(&paths);
        config.validate()?;

        Ok(Self { config, paths })
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    pub fn config(&self) -> &DocgenConfig {
        &self.config
    }

    /// Runs the whole build on a single-threaded runtime.
    pub fn run(&self) -> Result<BuildStats> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start the async runtime")?;
        runtime.block_on(self.run_async())
    }

    pub async fn run_async(&self) -> Result<BuildStats> {
        let start = Instant::now();

        build_artifacts(&self.config, &self.paths.project_root).await?;

        let mut stats = self.render_pages().await?;

        stats.assets = sync_static_assets(&self.paths.static_source, &self.paths.static_target)?;
        stats.duration = start.elapsed();

        log::info!("Documentation written to {}", self.paths.output_root.display());
        Ok(stats)
    }

    /// Renders every eligible document, one at a time.
    pub async fn render_pages(&self) -> Result<BuildStats> {
        let documents = &self.config.documents;
        let preprocessor = Preprocessor::from_config(&self.config.preprocessor);
        let highlighter = Highlighter::from_config(&self.config.highlighter);
        let pattern = TagPattern::new(&documents.open_tag, &documents.close_tag)?;

        let skip_dirs = [
            self.paths.output_root.as_path(),
            self.paths.static_source.as_path(),
        ];
        let discovered = discover_documents(&self.paths.docs_dir, documents, &skip_dirs)?;
        log::debug!("Found {} document(s) to render", discovered.len());

        let mut stats = BuildStats::default();
        for document in &discovered {
            let blocks = self
                .render_document(document, &preprocessor, &highlighter, &pattern)
                .await
                .with_context(|| format!("Failed to render {}", document.relative.display()))?;
            stats.pages += 1;
            stats.blocks += blocks;
        }

        Ok(stats)
    }

    /// Preprocesses, highlights and writes one document. Returns the number
    /// of highlighted blocks.
    async fn render_document(
        &self,
        document: &Document,
        preprocessor: &Preprocessor,
        highlighter: &Highlighter,
        pattern: &TagPattern,
    ) -> Result<usize> {
        log::info!("Processing {}", document.path.display());
        let start = Instant::now();

        let source = document.read()?;
        let rendered = preprocessor.render(&source).await?;
        let page = substitute(&rendered, pattern, highlighter).await?;

        let target = mirrored_output_path(
            &document.relative,
            &self.paths.output_root,
            &self.config.documents,
        );
        write_output(&target, &page.text)?;

        log::debug!(
            "[PAGE_TIME] {} -> {} ({} block(s)): {}ms",
            document.relative.display(),
            target.display(),
            page.blocks,
            start.elapsed().as_millis()
        );

        Ok(page.blocks)
    }
}
