use crate::config::DocgenConfig;
use crate::process;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;

/// Runs the upstream build steps (highlighter jar, API docs) in
/// `project_root`, one after another.
///
/// Step output goes straight to the terminal. The first failing step stops
/// the build; afterwards the configured highlighter artifact must exist.
pub async fn build_artifacts(config: &DocgenConfig, project_root: &Path) -> Result<()> {
    if config.build.skip {
        log::info!("Skipping upstream build steps");
    } else {
        for step in &config.build.steps {
            let Some((program, args)) = step.split_first() else {
                continue;
            };
            let display = step.join(" ");
            log::info!("Running {} in {}", display, project_root.display());

            let mut command = Command::new(program);
            command.args(args).current_dir(project_root);

            let start = Instant::now();
            process::run_inherited(command, config.build_timeout())
                .await
                .with_context(|| format!("Build step `{}` failed", display))?;
            log::debug!("`{}` finished in {}ms", display, start.elapsed().as_millis());
        }
    }

    if let Some(artifact) = &config.highlighter.artifact {
        let artifact = project_root.join(artifact);
        if !artifact.is_file() {
            anyhow::bail!("Highlighter artifact not found: {}", artifact.display());
        }
        log::debug!("Using highlighter artifact {}", artifact.display());
    }

    Ok(())
}
