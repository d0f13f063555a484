use crate::config::DocumentsConfig;
use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A literate document found under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the source root.
    pub relative: PathBuf,
    pub path: PathBuf,
}

impl Document {
    /// Whether a file with this name is rendered as a standalone page.
    ///
    /// Library fragments share the document extension but are only ever
    /// included by other documents. Names need not be valid UTF-8.
    pub fn is_eligible(file_name: &OsStr, documents: &DocumentsConfig) -> bool {
        has_suffix(file_name, &documents.extension)
            && !has_suffix(file_name, &documents.fragment_extension)
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).with_context(|| format!("Failed to read {}", self.path.display()))
    }
}

fn has_suffix(file_name: &OsStr, suffix: &str) -> bool {
    file_name.as_encoded_bytes().ends_with(suffix.as_bytes())
}

/// Collects every eligible document under `source_root`.
///
/// Entries are visited in file-name order, so repeated runs process the
/// same documents in the same sequence. Directories listed in `skip_dirs`
/// (the output tree and static assets when they live under the source
/// root) are not descended into, whichever path spelling reaches them.
/// Symlinked documents are followed; symlinked directories are not.
pub fn discover_documents(
    source_root: &Path,
    documents: &DocumentsConfig,
    skip_dirs: &[&Path],
) -> Result<Vec<Document>> {
    let skip_dirs: Vec<PathBuf> = skip_dirs
        .iter()
        .filter_map(|dir| dir.canonicalize().ok())
        .collect();
    let mut found = Vec::new();

    let walker = WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && is_skipped(entry.path(), &skip_dirs))
        });

    for entry in walker {
        let entry = entry
            .with_context(|| format!("Failed to traverse {}", source_root.display()))?;
        // `path().is_file()` resolves symlinks, so linked documents count
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }

        let name = entry.file_name();
        if !Document::is_eligible(name, documents) {
            if has_suffix(name, &documents.extension) {
                log::debug!("Skipping library fragment: {}", entry.path().display());
            }
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_root)
            .with_context(|| format!("{} is outside the source root", entry.path().display()))?
            .to_path_buf();

        log::debug!("Discovered {}", relative.display());
        found.push(Document {
            relative,
            path: entry.into_path(),
        });
    }

    Ok(found)
}

fn is_skipped(dir: &Path, skip_dirs: &[PathBuf]) -> bool {
    if skip_dirs.is_empty() {
        return false;
    }
    match dir.canonicalize() {
        Ok(real) => skip_dirs.contains(&real),
        Err(_) => false,
    }
}

/// Location of the rendered page for a document at `relative`.
///
/// The relative directory is kept and the document extension is replaced
/// by the page extension.
pub fn mirrored_output_path(
    relative: &Path,
    output_root: &Path,
    documents: &DocumentsConfig,
) -> PathBuf {
    let file_name = relative.file_name().unwrap_or_default();

    let mut stem = file_name;
    if has_suffix(file_name, &documents.extension) {
        // One `file_stem` per dot in the extension
        for _ in 0..documents.extension.matches('.').count() {
            stem = Path::new(stem).file_stem().unwrap_or(stem);
        }
    }
    let mut page = OsString::from(stem);
    page.push(&documents.page_extension);

    match relative.parent() {
        Some(parent) => output_root.join(parent).join(page),
        None => output_root.join(page),
    }
}

/// Writes a rendered page, creating any missing parent directories.
///
/// The content goes to a temporary file next to `path` and is renamed into
/// place, so a page is either absent or complete. A new page gets the
/// usual mode for the process umask; rewriting a page keeps its mode.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Output path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;

    let existing = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to inspect {}", path.display()));
        }
    };

    let mut builder = tempfile::Builder::new();
    // Temporary files default to owner-only; 0o666 lets the umask decide
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut file = builder
        .tempfile_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if let Some(permissions) = existing {
        file.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    file.persist(path)
        .with_context(|| format!("Failed to move rendered page to {}", path.display()))?;

    Ok(())
}
