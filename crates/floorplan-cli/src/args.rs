//! Command-line argument parsing.

use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "\
Usage: floorplan <plan.json> [options]

Options:
  --config <file>       Engine configuration (JSON)
  --history-dir <dir>   Persist undo history into <dir>
  --save-history        Persist undo history in the default data directory
  --json                Print the area report as JSON
  -h, --help            Show this message";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("Missing plan file")]
    MissingPlan,
    #[error("Option {0} expects a value")]
    MissingValue(String),
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Unexpected argument: {0}")]
    Unexpected(String),
}

/// Where to persist history, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryTarget {
    None,
    DefaultLocation,
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub plan: PathBuf,
    pub config: Option<PathBuf>,
    pub history: HistoryTarget,
    pub json: bool,
}

/// Outcome of parsing: either arguments to run with or a help request.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run(Args),
    Help,
}

/// Parse arguments, excluding the program name.
pub fn parse<I>(args: I) -> Result<Command, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut plan = None;
    let mut config = None;
    let mut history = HistoryTarget::None;
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--json" => json = true,
            "--save-history" => history = HistoryTarget::DefaultLocation,
            "--config" => config = Some(PathBuf::from(value(&mut args, &arg)?)),
            "--history-dir" => {
                history = HistoryTarget::Directory(PathBuf::from(value(&mut args, &arg)?))
            }
            other if other.starts_with('-') => {
                return Err(ArgsError::UnknownOption(other.to_string()));
            }
            _ if plan.is_none() => plan = Some(PathBuf::from(arg)),
            _ => return Err(ArgsError::Unexpected(arg)),
        }
    }

    Ok(Command::Run(Args {
        plan: plan.ok_or(ArgsError::MissingPlan)?,
        config,
        history,
        json,
    }))
}

fn value(args: &mut impl Iterator<Item = String>, option: &str) -> Result<String, ArgsError> {
    args.next()
        .ok_or_else(|| ArgsError::MissingValue(option.to_string()))
}
