use anyhow::{Context, Result};
use clap::Parser;
use metis_docs::{
    print_build_statistics, report_build_error, DocBuilder, DocgenConfig, CONFIG_FILE_NAME,
};
use std::env;
use std::path::PathBuf;
use std::process::exit;

/// Build the Metis documentation site.
#[derive(Debug, Parser)]
#[command(name = "metis-docs", version, about)]
struct Cli {
    /// Documentation source directory [default: current directory]
    #[arg(long, value_name = "DIR")]
    docs_dir: Option<PathBuf>,

    /// Output directory [default: <DOCS_DIR>/../gendocs]
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Configuration file [default: <DOCS_DIR>/docgen.toml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not run the upstream build steps
    #[arg(long)]
    skip_build: bool,

    /// Timeout in seconds for each preprocessor and highlighter invocation
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

pub fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = build(cli) {
        report_build_error(&e);
        exit(1);
    }
}

fn build(cli: Cli) -> Result<()> {
    let cwd = env::current_dir().context("Failed to determine the current directory")?;

    let docs_dir = cli.docs_dir.map(|d| cwd.join(d)).unwrap_or_else(|| cwd.clone());
    let docs_dir = docs_dir
        .canonicalize()
        .with_context(|| format!("Documentation directory not found: {}", docs_dir.display()))?;

    let config_path = cli
        .config
        .map(|c| cwd.join(c))
        .unwrap_or_else(|| docs_dir.join(CONFIG_FILE_NAME));
    let mut config = DocgenConfig::load_or_default(&config_path)?;

    if let Some(output) = cli.output {
        config.paths.output = cwd.join(output);
    }
    if let Some(secs) = cli.timeout {
        config.preprocessor.timeout_secs = secs;
        config.highlighter.timeout_secs = secs;
    }
    if cli.skip_build {
        config.build.skip = true;
    }

    let builder = DocBuilder::new(&docs_dir, config)?;
    let stats = builder.run()?;
    print_build_statistics(&stats);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "metis-docs",
            "--docs-dir",
            "docs",
            "-o",
            "site",
            "--skip-build",
            "--timeout",
            "5",
        ]);

        assert_eq!(cli.docs_dir, Some(PathBuf::from("docs")));
        assert_eq!(cli.output, Some(PathBuf::from("site")));
        assert!(cli.skip_build);
        assert_eq!(cli.timeout, Some(5));
        assert!(!cli.verbose);
    }
}
