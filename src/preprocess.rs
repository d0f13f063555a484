use crate::config::ToolConfig;
use crate::process::{self, ProcessError};
use std::time::Duration;
use tokio::process::Command;

/// Bridge to the external document preprocessor (`papyri -i`).
///
/// The preprocessor is a filter: raw document bytes go in on stdin,
/// rendered text comes out on stdout. Anything it writes to stderr means
/// the document is broken.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Preprocessor {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Runs one document through the preprocessor.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Diagnostic`] whenever the preprocessor wrote
    /// to stderr, even if it exited successfully. Also fails if it cannot be
    /// started, times out, or prints invalid UTF-8.
    pub async fn render(&self, source: &[u8]) -> Result<String, ProcessError> {
        let mut command = Command::new(&self.command);
        command.args(&self.args);

        let output = process::capture(command, Some(source), self.timeout).await?;

        if !output.stderr.is_empty() {
            return Err(ProcessError::Diagnostic {
                program: self.command.clone(),
                diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        if !output.status.success() {
            log::warn!(
                "'{}' exited with {} but reported no diagnostics",
                self.command,
                output.status
            );
        }

        process::decode_utf8(&self.command, output.stdout)
    }
}
