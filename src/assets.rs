use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Replaces `target` with a fresh recursive copy of `source`.
///
/// Whatever was in `target` before is removed first, so assets deleted from
/// `source` do not linger in the output. Returns the number of files copied.
pub fn sync_static_assets(source: &Path, target: &Path) -> Result<usize> {
    if !source.is_dir() {
        anyhow::bail!("Static assets directory not found: {}", source.display());
    }

    if target.exists() {
        log::debug!("Removing previous static assets at {}", target.display());
        fs::remove_dir_all(target)
            .with_context(|| format!("Failed to remove {}", target.display()))?;
    }

    copy_dir_all(source, target)
}

/// Recursively copy all files and directories from src to dst
fn copy_dir_all(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to traverse {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} is outside {}", entry.path().display(), src.display()))?;
        let destination = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .with_context(|| format!("Failed to create {}", destination.display()))?;
        } else {
            fs::copy(entry.path(), &destination).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    destination.display()
                )
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}
