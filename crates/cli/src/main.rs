//! searchcheck CLI - Main Entry Point
//!
//! Runs the built-in FHIR search scenarios against a server and reports the
//! results. Exit code 0 when nothing failed, 1 when a scenario failed and 2
//! when the harness itself could not run.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use searchcheck_harness::auth::AuthConfig;
use searchcheck_harness::HarnessConfig;

mod commands;
mod output;

use commands::{list, run};

/// searchcheck - FHIR search conformance harness
#[derive(Parser)]
#[command(name = "searchcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML); defaults apply when it does not exist
    #[arg(short, long, env = "SEARCHCHECK_CONFIG", default_value = "searchcheck.toml", global = true)]
    config: PathBuf,

    /// Base URL of the FHIR endpoint under test
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Static bearer token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Log every request
    #[arg(long, global = true)]
    trace: bool,

    /// Stop after the first failing scenario
    #[arg(long, global = true)]
    fail_fast: bool,

    /// Directory for test-results.json and interactions.json
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against the server
    Run(run::RunArgs),

    /// List the built-in scenarios
    List,
}

/// Configuration file, then environment, then flags
fn build_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply_env()?;

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(token) = &cli.token {
        config.auth = AuthConfig::Static {
            token: token.clone(),
        };
    }
    if cli.trace {
        config.trace = true;
    }
    if cli.fail_fast {
        config.fail_fast = true;
    }
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn execute(cli: Cli) -> anyhow::Result<i32> {
    let config = build_config(&cli)?;

    match cli.command {
        Commands::Run(args) => run::execute(args, config, cli.format).await,
        Commands::List => {
            list::execute(&config, cli.format);
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            2
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "searchcheck",
            "--config",
            "/nonexistent/searchcheck.toml",
            "--base-url",
            "http://fhir.test/r4",
            "--fail-fast",
            "--output",
            "out",
            "run",
            "--tag",
            "paging",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.base_url, "http://fhir.test/r4");
        assert!(config.fail_fast);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(matches!(cli.command, Commands::Run(run::RunArgs { tag: Some(_), .. })));
    }

    #[test]
    fn test_name_and_tag_conflict() {
        let parsed = Cli::try_parse_from(["searchcheck", "run", "--tag", "a", "--name", "b"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let cli = Cli::parse_from([
            "searchcheck",
            "--config",
            "/nonexistent/searchcheck.toml",
            "--base-url",
            "not a url",
            "list",
        ]);
        assert!(build_config(&cli).is_err());
    }
}
