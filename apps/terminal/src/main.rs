//! # duka
//!
//! Maintenance and export entry point for a Duka terminal database.
//!
//! ## Usage
//! ```bash
//! # Create or upgrade the database
//! duka migrate
//!
//! # Recompute every stock row from its movements
//! duka verify [--branch <id>]
//!
//! # Print the effective configuration, or write it to the config file
//! duka config [--write]
//!
//! # Reports as JSON (dates are YYYY-MM-DD, both default to today)
//! duka report fast-moving --from 2024-03-01 --to 2024-03-31
//! duka report low-stock --branch <id>
//!
//! # Any command can take an explicit config file
//! duka --config ./duka.toml report branch-performance
//! ```
//!
//! Reports run with global scope unless `--branch` narrows them.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info};

use duka_core::BranchScope;
use duka_db::{Database, DateRange};
use duka_terminal::commands::report::verify_ledger;
use duka_terminal::config::AppConfig;
use duka_terminal::state::DbState;
use duka_terminal::{init_tracing, open_database};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const USAGE: &str = "\
Usage: duka [--config <path>] <command>

Commands:
  migrate                     Create or upgrade the database
  verify [--branch <id>]      Check stock quantities against their movements
  config [--write]            Print (or save) the effective configuration
  report <kind> [options]     Print a report as JSON

Report kinds:
  fast-moving, dead-stock, out-of-stock, low-stock, branch-performance

Report options:
  --from <YYYY-MM-DD>         First day (default: today)
  --to <YYYY-MM-DD>           Last day (default: today)
  --branch <id>               Limit to one branch";

#[derive(Debug)]
enum Command {
    Migrate,
    Verify { branch: Option<String> },
    Config { write: bool },
    Report(ReportArgs),
    Help,
}

#[derive(Debug)]
struct ReportArgs {
    kind: String,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    branch: Option<String>,
}

#[derive(Debug)]
struct Cli {
    config_path: Option<PathBuf>,
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match parse_args(env::args().skip(1).collect()) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Command::Help = cli.command {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let config = match AppConfig::load(cli.config_path.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging.filter);

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> CliResult<ExitCode> {
    match cli.command {
        Command::Config { write } => {
            if write {
                let path = config.save(cli.config_path)?;
                info!(path = %path.display(), "Configuration written");
                println!("Configuration written to {}", path.display());
            } else {
                print!("{}", config.to_toml()?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Migrate => {
            let db = open_database(&config).await?;
            let status = db.migration_status().await?;
            print_json(&status)?;
            db.close().await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { branch } => {
            let db = open_database(&config).await?;
            let verification = verify_ledger(&DbState::new(db.clone()), &scope(branch)).await?;
            print_json(&verification)?;
            db.close().await;

            if verification.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Report(args) => {
            let db = open_database(&config).await?;
            let result = report(&db, args).await;
            db.close().await;
            result.map(|()| ExitCode::SUCCESS)
        }
        Command::Help => Ok(ExitCode::SUCCESS),
    }
}

async fn report(db: &Database, args: ReportArgs) -> CliResult<()> {
    let today = Utc::now().date_naive();
    let from = args.from.unwrap_or(today);
    let range = DateRange::new(from, args.to.unwrap_or(today.max(from)))?;
    let scope = scope(args.branch);
    let reports = db.reports();

    match args.kind.as_str() {
        "fast-moving" => print_json(&reports.fast_moving(&scope, range).await?),
        "dead-stock" => print_json(&reports.dead_stock(&scope, range).await?),
        "out-of-stock" => print_json(&reports.out_of_stock(&scope).await?),
        "low-stock" => print_json(&reports.low_stock(&scope).await?),
        "branch-performance" => print_json(&reports.branch_performance(&scope, range).await?),
        other => Err(format!("Unknown report: {other}").into()),
    }
}

fn scope(branch: Option<String>) -> BranchScope {
    match branch {
        Some(branch_id) => BranchScope::Branch(branch_id),
        None => BranchScope::All,
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Argument Parsing
// =============================================================================

fn parse_args(args: Vec<String>) -> Result<Cli, String> {
    let mut config_path = None;
    let mut command: Option<String> = None;
    let mut positional = Vec::new();
    let mut branch = None;
    let mut from = None;
    let mut to = None;
    let mut write = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => config_path = Some(PathBuf::from(value_of(&args, &mut i)?)),
            "--branch" | "-b" => branch = Some(value_of(&args, &mut i)?),
            "--from" => from = Some(parse_date(&value_of(&args, &mut i)?)?),
            "--to" => to = Some(parse_date(&value_of(&args, &mut i)?)?),
            "--write" => write = true,
            "--help" | "-h" => command = Some("help".to_string()),
            flag if flag.starts_with('-') => return Err(format!("Unknown option: {flag}")),
            word if command.is_none() => command = Some(word.to_string()),
            word => positional.push(word.to_string()),
        }
        i += 1;
    }

    let command = match command.as_deref() {
        None | Some("help") => Command::Help,
        Some("migrate") => Command::Migrate,
        Some("verify") => Command::Verify { branch },
        Some("config") => Command::Config { write },
        Some("report") => {
            let kind = positional
                .first()
                .cloned()
                .ok_or_else(|| "report needs a kind".to_string())?;
            Command::Report(ReportArgs {
                kind,
                from,
                to,
                branch,
            })
        }
        Some(other) => return Err(format!("Unknown command: {other}")),
    };

    Ok(Cli {
        config_path,
        command,
    })
}

/// Consumes the value following the flag at `i`.
fn value_of(args: &[String], i: &mut usize) -> Result<String, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{flag} needs a value"))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_report_with_range() {
        let cli = parse_args(args(
            "--config ./duka.toml report dead-stock --from 2024-03-01 --to 2024-03-31 --branch b1",
        ))
        .unwrap();

        assert_eq!(cli.config_path, Some(PathBuf::from("./duka.toml")));
        match cli.command {
            Command::Report(report) => {
                assert_eq!(report.kind, "dead-stock");
                assert_eq!(report.from, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(report.to, NaiveDate::from_ymd_opt(2024, 3, 31));
                assert_eq!(report.branch.as_deref(), Some("b1"));
            }
            other => panic!("expected report, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(args("report")).is_err());
        assert!(parse_args(args("report fast-moving --from 03/01/2024")).is_err());
        assert!(parse_args(args("verify --branch")).is_err());
        assert!(parse_args(args("restock")).is_err());
    }

    #[test]
    fn test_no_command_shows_help() {
        assert!(matches!(parse_args(Vec::new()).unwrap().command, Command::Help));
        assert!(matches!(
            parse_args(args("config --write")).unwrap().command,
            Command::Config { write: true }
        ));
    }
}
