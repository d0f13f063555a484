use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Name of the optional configuration file looked up in the docs directory.
pub const CONFIG_FILE_NAME: &str = "docgen.toml";

/// Configuration for a documentation build.
///
/// Deserialized from `docgen.toml` in the documentation directory. Every
/// section is optional; an absent file yields the layout the Metis
/// repository uses (`docs/` rendered into `../gendocs` with the
/// Gradle-built highlighter).
///
/// # Example
///
/// ```toml
/// [paths]
/// output = "../gendocs"
///
/// [preprocessor]
/// command = "papyri"
/// args = ["-i"]
///
/// [highlighter]
/// command = "java"
/// args = ["-jar", "${PROJECT_ROOT}/app/build/libs/app-all.jar", "--syntax-highlight", "-c"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DocgenConfig {
    pub paths: PathsConfig,
    pub documents: DocumentsConfig,
    pub preprocessor: ToolConfig,
    pub highlighter: HighlighterConfig,
    pub build: BuildConfig,
}

/// Directory layout, relative to the documentation directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Root of the upstream project; build steps run here.
    pub project_root: PathBuf,
    /// Root of the rendered output tree.
    pub output: PathBuf,
    /// Static assets copied verbatim to `<output>/<name>`.
    pub static_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from(".."),
            output: PathBuf::from("../gendocs"),
            static_dir: PathBuf::from("static"),
        }
    }
}

/// File naming and tag conventions of literate documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentsConfig {
    pub extension: String,
    /// Library fragments: includable only, never rendered standalone.
    pub fragment_extension: String,
    pub page_extension: String,
    pub open_tag: String,
    pub close_tag: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            extension: ".papyri".to_string(),
            fragment_extension: ".lib.papyri".to_string(),
            page_extension: ".html".to_string(),
            open_tag: "<metis>".to_string(),
            close_tag: "</metis>".to_string(),
        }
    }
}

/// An external tool invoked once per document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Executable (supports ${VAR} environment variable expansion)
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: "papyri".to_string(),
            args: vec!["-i".to_string()],
            timeout_secs: 60,
        }
    }
}

/// The highlighter is invoked once per embedded code block with the code
/// appended as the last argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlighterConfig {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Artifact the build steps must have produced, relative to the
    /// project root. Checked before any document is processed.
    pub artifact: Option<PathBuf>,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            command: "java".to_string(),
            args: vec![
                "-jar".to_string(),
                "${PROJECT_ROOT}/app/build/libs/app-all.jar".to_string(),
                "--syntax-highlight".to_string(),
                "-c".to_string(),
            ],
            timeout_secs: 60,
            artifact: Some(PathBuf::from("app/build/libs/app-all.jar")),
        }
    }
}

/// Upstream build steps run before any document is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub skip: bool,
    pub timeout_secs: u64,
    /// Each step is a program followed by its arguments.
    pub steps: Vec<Vec<String>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            skip: false,
            timeout_secs: 1800,
            steps: vec![
                vec!["./gradlew".to_string(), "shadowJar".to_string()],
                vec!["./gradlew".to_string(), "dokkaHtml".to_string()],
            ],
        }
    }
}

/// Absolute locations every component works from.
///
/// Resolved once at startup so nothing depends on the process's current
/// directory afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub docs_dir: PathBuf,
    pub project_root: PathBuf,
    pub output_root: PathBuf,
    pub static_source: PathBuf,
    pub static_target: PathBuf,
}

impl BuildPaths {
    /// Resolves the configured layout against `docs_dir`, which must be
    /// absolute.
    pub fn resolve(docs_dir: &Path, paths: &PathsConfig) -> Self {
        let static_name = paths
            .static_dir
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static"));
        let output_root = normalize(&docs_dir.join(&paths.output));

        Self {
            docs_dir: docs_dir.to_path_buf(),
            project_root: normalize(&docs_dir.join(&paths.project_root)),
            static_target: output_root.join(static_name),
            static_source: normalize(&docs_dir.join(&paths.static_dir)),
            output_root,
        }
    }
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

impl DocgenConfig {
    /// Loads `path` if it exists, falling back to defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Expands `${VAR}` references in every command and argument.
    ///
    /// `PROJECT_ROOT` and `DOCS_DIR` are bound to the resolved paths before
    /// the process environment is consulted.
    pub fn expand(&mut self, paths: &BuildPaths) {
        let expand = |s: &mut String| *s = expand_vars(s, paths);

        expand(&mut self.preprocessor.command);
        self.preprocessor.args.iter_mut().for_each(expand);
        expand(&mut self.highlighter.command);
        self.highlighter.args.iter_mut().for_each(expand);
        for step in self.build.steps.iter_mut() {
            step.iter_mut().for_each(expand);
        }
    }

    /// Validate the configuration for security and correctness
    pub fn validate(&self) -> Result<()> {
        validate_command(&self.preprocessor.command).context("Invalid [preprocessor] command")?;
        validate_command(&self.highlighter.command).context("Invalid [highlighter] command")?;
        for (i, step) in self.build.steps.iter().enumerate() {
            let program = step
                .first()
                .with_context(|| format!("Build step #{} is empty", i))?;
            validate_command(program).with_context(|| format!("Invalid build step #{}", i))?;
        }

        let docs = &self.documents;
        for (name, ext) in [
            ("extension", &docs.extension),
            ("fragment_extension", &docs.fragment_extension),
            ("page_extension", &docs.page_extension),
        ] {
            if ext.len() < 2 || !ext.starts_with('.') {
                anyhow::bail!("documents.{} must start with '.': {:?}", name, ext);
            }
        }
        if !docs.fragment_extension.ends_with(&docs.extension)
            || docs.fragment_extension == docs.extension
        {
            anyhow::bail!(
                "documents.fragment_extension ({}) must be a longer form of documents.extension ({})",
                docs.fragment_extension,
                docs.extension
            );
        }
        if docs.page_extension == docs.extension {
            anyhow::bail!("documents.page_extension must differ from documents.extension");
        }
        if docs.open_tag.is_empty() || docs.close_tag.is_empty() {
            anyhow::bail!("documents.open_tag and documents.close_tag cannot be empty");
        }

        if self.preprocessor.timeout_secs == 0
            || self.highlighter.timeout_secs == 0
            || self.build.timeout_secs == 0
        {
            anyhow::bail!("Timeouts must be at least one second");
        }

        Ok(())
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build.timeout_secs)
    }
}

fn validate_command(command: &str) -> Result<()> {
    if command.is_empty() {
        anyhow::bail!("Command cannot be empty");
    }

    // Ensure the command doesn't contain shell metacharacters
    let dangerous_chars = [';', '|', '&', '`', '\n', '\r'];
    for ch in dangerous_chars {
        if command.contains(ch) {
            anyhow::bail!(
                "Command contains invalid character '{}': {}",
                ch.escape_default(),
                command
            );
        }
    }

    Ok(())
}

fn expand_vars(s: &str, paths: &BuildPaths) -> String {
    expand_env_vars(s, |name| match name {
        "PROJECT_ROOT" => Some(paths.project_root.display().to_string()),
        "DOCS_DIR" => Some(paths.docs_dir.display().to_string()),
        _ => env::var(name).ok(),
    })
}

/// Expand environment variables in a string
/// Supports ${VAR_NAME} syntax
/// This function processes the string in a single pass to avoid re-processing expanded values
fn expand_env_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_name = String::new();
            let mut found_close = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    found_close = true;
                    break;
                }
                var_name.push(ch);
            }

            if found_close {
                match lookup(&var_name) {
                    Some(value) => result.push_str(&value),
                    None => {
                        log::warn!(
                            "Environment variable '{}' not found, leaving unexpanded",
                            var_name
                        );
                        result.push_str("${");
                        result.push_str(&var_name);
                        result.push('}');
                    }
                }
            } else {
                // No closing brace found, treat as literal
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}
