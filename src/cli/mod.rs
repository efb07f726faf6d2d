//! Command-line front end: validates arguments and drives [`CatalogManager`].
//!
//! [`CatalogManager`]: crate::core::CatalogManager

pub mod args;
pub mod commands;
pub mod output;
pub mod table;

use std::{env, io, path::PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::core::validation::parse_date;
use crate::errors::LedgerError;

pub use args::ArgList;
pub use commands::{LoopControl, Session};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] LedgerError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

/// Options accepted before the command name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub today: Option<NaiveDate>,
}

/// Entry point used by the `billing_core_cli` binary.
pub fn run_cli() -> Result<(), CliError> {
    let args: Vec<String> = env::args().skip(1).collect();
    run(&args)
}

pub fn run(args: &[String]) -> Result<(), CliError> {
    let (options, rest) = split_global_options(args)?;
    let Some((command, command_args)) = rest.split_first() else {
        commands::print_help();
        return Ok(());
    };
    let command = command.to_ascii_lowercase();
    match command.as_str() {
        "help" | "--help" | "-h" => {
            commands::print_help();
            return Ok(());
        }
        "version" | "--version" => {
            println!("{}", crate::utils::build_info::current().summary());
            return Ok(());
        }
        _ => {}
    }

    let mut session = Session::open(&options)?;
    if command == "shell" {
        session.run_script(io::stdin().lock())?;
    } else {
        session.dispatch(&command, command_args)?;
    }
    session.close()
}

fn split_global_options(args: &[String]) -> Result<(GlobalOptions, &[String]), CliError> {
    let mut options = GlobalOptions::default();
    let mut index = 0;
    while let Some(token) = args.get(index) {
        let flag = token.as_str();
        if flag != "--data-dir" && flag != "--today" {
            break;
        }
        let value = args
            .get(index + 1)
            .ok_or_else(|| CliError::Input(format!("`{flag}` needs a value")))?;
        if flag == "--data-dir" {
            options.data_dir = Some(PathBuf::from(value));
        } else {
            options.today = Some(parse_date(value)?);
        }
        index += 2;
    }
    Ok((options, &args[index..]))
}
