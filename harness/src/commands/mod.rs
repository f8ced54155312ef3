//! Command line front end of a test binary.
//!
//! A test binary declares its classes in a [`Registry`] and hands it to
//! [`run_main`], which parses the command line and runs or lists the tests.

pub mod list;
pub mod run;

use std::ffi::OsString;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use crate::errors::Result;
use crate::runner::registry::Registry;
use crate::utils::writer::Writer;

//
// Constants
//
// Application metadata
pub const APP_NAME: &str = "unit-harness";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
// Commands
pub const RUN: &str = "run";
pub const LIST: &str = "list";

pub const SUCCESS_STATUS_CODE: i32 = 0;
pub const FAILURE_STATUS_CODE: i32 = 1;
pub const ERROR_STATUS_CODE: i32 = 5;

/// A parsed subcommand, ready to act on the tests of a registry.
pub trait Executable {
    fn execute(&self, writer: &mut Writer, registry: &Registry) -> Result<i32>;
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version = APP_VERSION)]
#[command(about = "Runs the unit tests declared in this binary.")]
pub struct HarnessCli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    Run(run::Run),
    List(list::List),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Run(..) => RUN,
            Commands::List(..) => LIST,
        }
    }
}

impl Executable for Commands {
    fn execute(&self, writer: &mut Writer, registry: &Registry) -> Result<i32> {
        match self {
            Commands::Run(run) => run.execute(writer, registry),
            Commands::List(list) => list.execute(writer, registry),
        }
    }
}

/// Entry point for test binaries: parses `std::env::args`, runs the
/// requested command against `registry` on stdout and returns the exit code.
/// Without a subcommand every test is run.
pub fn run_main(registry: &Registry) -> i32 {
    init_logging();
    run_with_args(std::env::args_os(), registry, &mut Writer::stdout())
}

pub fn run_with_args<I, T>(args: I, registry: &Registry, writer: &mut Writer) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match HarnessCli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.use_stderr() {
                true => ERROR_STATUS_CODE,
                false => SUCCESS_STATUS_CODE,
            };
            if let Err(print_err) = err.print() {
                log::error!("unable to print usage: {print_err}");
            }
            return code;
        }
    };

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Run(run::Run::default()));
    log::debug!("executing {} command", command.name());
    match command.execute(writer, registry) {
        Ok(code) => code,
        Err(err) => {
            if let Err(write_err) = writer.write_err(format!("Error occurred {err}")) {
                log::error!("unable to report {err}: {write_err}");
            }
            ERROR_STATUS_CODE
        }
    }
}

/// Diagnostics go to stderr at the level named by `RUST_LOG`, `warn` when
/// unset. A logger installed earlier by the host binary is kept.
fn init_logging() {
    if let Err(err) = SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()
    {
        log::debug!("keeping the existing logger: {err}");
    }
}
