use crate::config::HighlighterConfig;
use crate::process::{self, ProcessError};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Turns literal Metis code into highlighted markup by running the
/// highlighter artifact once per snippet.
///
/// The configured arguments carry the mode flag (`--syntax-highlight -c`);
/// the snippet is appended as a single final argument, so no shell quoting
/// is involved.
#[derive(Debug, Clone)]
pub struct Highlighter {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Highlighter {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &HighlighterConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Highlights one snippet.
    ///
    /// # Errors
    ///
    /// Returns an error if the highlighter cannot be started, exits with a
    /// non-zero status, does not finish within the timeout, or prints
    /// something that is not UTF-8.
    pub async fn highlight(&self, code: &str) -> Result<String, ProcessError> {
        let mut command = Command::new(&self.command);
        command.args(&self.args).arg(code);

        let start = Instant::now();
        let output = process::capture(command, None, self.timeout).await?;
        log::debug!(
            "Highlighted {} byte(s) in {}ms",
            code.len(),
            start.elapsed().as_millis()
        );

        if !output.status.success() {
            return Err(ProcessError::NonZeroExit {
                program: self.command.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // Stdout is the markup, byte for byte, trailing newline included
        process::decode_utf8(&self.command, output.stdout)
    }
}
