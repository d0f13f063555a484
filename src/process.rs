use std::io;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Failure kinds of an external tool invocation.
///
/// Every subprocess the pipeline starts (build steps, the preprocessor, the
/// highlighter) reports through this type so callers can tell a tool that
/// complained apart from one that hung or could not be started at all.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The tool wrote to its diagnostic stream. Always fatal, whatever the
    /// exit status was.
    #[error("'{program}' reported diagnostics:\n{diagnostic}")]
    Diagnostic { program: String, diagnostic: String },

    #[error("'{program}' failed ({status})\n{stderr}")]
    NonZeroExit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("'{program}' did not finish within {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while talking to '{program}'")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' produced output that is not valid UTF-8")]
    InvalidUtf8 { program: String },
}

/// Name of the program a command will run, for error messages.
pub fn program_name(command: &Command) -> String {
    command.as_std().get_program().to_string_lossy().into_owned()
}

/// Runs `command` to completion, feeding it `input` on stdin and capturing
/// stdout and stderr in full.
///
/// Stdin is written while both output streams are drained, so a tool that
/// produces a lot of output before it has read all of its input cannot
/// deadlock the exchange. Stdin is closed once `input` is written. When
/// `timeout` elapses the child is killed and [`ProcessError::Timeout`] is
/// returned.
///
/// The exit status is returned as-is in the [`Output`]; interpreting it is
/// up to the caller.
pub async fn capture(
    mut command: Command,
    input: Option<&[u8]>,
    timeout: Duration,
) -> Result<Output, ProcessError> {
    let program = program_name(&command);

    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(mut stdin), Some(input)) = (stdin, input) {
            match stdin.write_all(input).await {
                // The tool may stop reading early (e.g. it bailed out with a
                // diagnostic); what it printed is still collected below.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }
        Ok::<(), io::Error>(())
    };

    let exchange = async { tokio::try_join!(feed, child.wait_with_output()) };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok(((), output))) => Ok(output),
        Ok(Err(source)) => Err(ProcessError::Io { program, source }),
        Err(_) => Err(ProcessError::Timeout { program, timeout }),
    }
}

/// Runs `command` with the parent's stdio and checks its exit status.
///
/// Used for long-running steps whose progress the operator should see.
pub async fn run_inherited(mut command: Command, timeout: Duration) -> Result<(), ProcessError> {
    let program = program_name(&command);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => return Err(ProcessError::Io { program, source }),
        Err(_) => return Err(ProcessError::Timeout { program, timeout }),
    };

    if !status.success() {
        return Err(ProcessError::NonZeroExit {
            program,
            status,
            stderr: String::new(),
        });
    }

    Ok(())
}

/// Decodes tool output as UTF-8.
pub fn decode_utf8(program: &str, bytes: Vec<u8>) -> Result<String, ProcessError> {
    String::from_utf8(bytes).map_err(|_| ProcessError::InvalidUtf8 {
        program: program.to_string(),
    })
}
