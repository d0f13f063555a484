use crate::process::ProcessError;
use chrono::Local;
use std::time::Duration;

/// Counters for one documentation build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub pages: usize,
    pub blocks: usize,
    pub assets: usize,
    pub duration: Duration,
}

/// Formats a line with mdBook-style timestamp and prefix.
fn format_line(level: &str, message: &str) -> String {
    format!(
        "{} [{}] (metis_docs): {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

/// Reports a failed build to stderr.
///
/// Each layer of the error chain gets its own line. When the chain ends in
/// preprocessor diagnostics, those are printed verbatim after a header so
/// the operator sees exactly what the tool said.
pub fn report_build_error(err: &anyhow::Error) {
    for cause in err.chain() {
        if let Some(ProcessError::Diagnostic {
            program,
            diagnostic,
        }) = cause.downcast_ref::<ProcessError>()
        {
            eprintln!(
                "{}",
                format_line("ERROR", &format!("'{}' reported diagnostics:", program))
            );
            eprint!("{}", diagnostic);
            if !diagnostic.ends_with('\n') {
                eprintln!();
            }
            break;
        }

        for line in cause.to_string().lines() {
            eprintln!("{}", format_line("ERROR", line));
        }
    }

    eprintln!("{}", format_line("ERROR", "Documentation build failed"));
}

/// Prints the build summary to stderr.
///
/// Always visible, regardless of log level.
pub fn print_build_statistics(stats: &BuildStats) {
    eprintln!(
        "{}",
        format_line(
            "INFO",
            &format!(
                "Rendered {} page(s) with {} highlighted block(s), copied {} static asset(s) in {}ms",
                stats.pages,
                stats.blocks,
                stats.assets,
                stats.duration.as_millis()
            )
        )
    );
}
