//! Checks the built-in operation catalog against a vendor action list.
//!
//! ```bash
//! # Verify against the vendor surface the catalog targets
//! twsbridge-coverage
//!
//! # Verify against a list extracted from a newer API release
//! twsbridge-coverage --actions actions.txt --ignore winError
//!
//! # Dump the registry
//! twsbridge-coverage --list
//! ```
//!
//! Exits with status 1 when unclassified actions are found.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use twsbridge_core::{vendor_surface, verify_coverage, CoverageConfig, OperationRegistry};
use twsbridge_engine::{init_tracing, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "twsbridge-coverage")]
#[command(version)]
#[command(about = "Verify that every vendor action is classified by an operation descriptor")]
struct Cli {
    /// Exposed action names: a JSON array or one name per line.
    /// Defaults to the built-in vendor surface.
    #[arg(long, env = "TWSBRIDGE_ACTIONS")]
    actions: Option<PathBuf>,

    /// Additional names to exclude from verification (repeatable)
    #[arg(long = "ignore", value_name = "NAME")]
    ignore: Vec<String>,

    /// Print the registered operations as JSON instead of verifying
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&LogConfig::from_env())?;

    let registry = OperationRegistry::builtin().context("built-in catalog failed validation")?;

    if cli.list {
        let listed = registry.list_registered_operations();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(ExitCode::SUCCESS);
    }

    let exposed = match &cli.actions {
        Some(path) => read_actions(path)?,
        None => vendor_surface().into_iter().map(str::to_string).collect(),
    };
    let mut config = CoverageConfig::default();
    config.ignored.extend(cli.ignore);

    let report = verify_coverage(&registry, &exposed, &config);
    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        exposed = exposed.len(),
        unclassified = report.unclassified.len(),
        unexposed = report.unexposed.len(),
        "coverage verified"
    );

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_actions(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read action list {}", path.display()))?;
    parse_actions(&text)
}

/// Accepts a JSON array of strings, or plain text with one name per line
/// (blank lines and `#` comments skipped).
fn parse_actions(text: &str) -> anyhow::Result<Vec<String>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("action list is not a JSON array of strings");
    }
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array() {
        let names = parse_actions(r#"["reqMktData", "tickPrice"]"#).unwrap();
        assert_eq!(names, vec!["reqMktData", "tickPrice"]);
    }

    #[test]
    fn parses_line_list() {
        let names = parse_actions("reqMktData\n\n# callbacks\n  tickPrice  \n").unwrap();
        assert_eq!(names, vec!["reqMktData", "tickPrice"]);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_actions("[1, 2]").is_err());
    }

    #[test]
    fn cli_accepts_repeated_ignore() {
        let cli = Cli::try_parse_from(["twsbridge-coverage", "--ignore", "a", "--ignore", "b"]).unwrap();
        assert_eq!(cli.ignore, vec!["a", "b"]);
        assert!(!cli.list);
    }
}
