use std::fs::File;
use std::sync::Arc;

use clap::Args;

use crate::commands::{Executable, FAILURE_STATUS_CODE, SUCCESS_STATUS_CODE};
use crate::errors::Result;
use crate::reporters::json::write_json;
use crate::reporters::text::TextReport;
use crate::reporters::xml::JunitReport;
use crate::runner::config::RunConfiguration;
use crate::runner::coordinator::Coordinator;
use crate::runner::registry::Registry;
use crate::utils::writer::{WriteBuffer, Writer};

const ABOUT: &str = "Runs the declared tests and reports the results.";
const CONFIG_HELP: &str = "JSON file with a base run configuration; flags override its values";
const VERBOSE_HELP: &str = "Print one line per test instead of one character";
const STOP_ON_FAILURE_HELP: &str = "Stop running tests after the first failure or error";
const NO_CATCH_HELP: &str =
    "Only catch assertion failures; any other error or panic aborts the whole run";
const DRY_RUN_HELP: &str = "Log the selected tests as successful without running them";
const TIMEOUT_HELP: &str = "Seconds allowed to tests that declare no timeout, 0 for none";
const FILTER_HELP: &str = "Only run tests whose `class::test` name starts with this prefix";
const TEST_HELP: &str = "Only run the test with exactly this `class::test` name";
const THREADS_HELP: &str = "Number of threads test classes are dispatched on";
const XML_HELP: &str = "Write a JUnit style XML report to this file";
const JSON_HELP: &str = "Print the results as JSON after the summary";
const MAX_STRING_LENGTH_HELP: &str = "Truncate reported messages to this many characters, 0 for no limit";
const PRECISION_HELP: &str = "Digits printed after the decimal point of durations";

#[derive(Debug, Clone, Default, PartialEq, Args)]
#[clap(about = ABOUT)]
/// .
/// The Run command executes every selected test of the registry and
/// prints the progress, the summary and any requested report.
pub struct Run {
    #[arg(short, long, help = CONFIG_HELP)]
    pub(crate) config: Option<String>,
    #[arg(short, long, help = VERBOSE_HELP)]
    pub(crate) verbose: bool,
    #[arg(short = 'x', long, help = STOP_ON_FAILURE_HELP)]
    pub(crate) stop_on_failure: bool,
    #[arg(long, help = NO_CATCH_HELP)]
    pub(crate) no_catch: bool,
    #[arg(short = 'n', long, help = DRY_RUN_HELP)]
    pub(crate) dry_run: bool,
    #[arg(short, long, help = TIMEOUT_HELP)]
    pub(crate) timeout: Option<f64>,
    #[arg(short, long, help = FILTER_HELP)]
    pub(crate) filter: Option<String>,
    #[arg(short = 'T', long, help = TEST_HELP)]
    pub(crate) test: Option<String>,
    #[arg(short = 'j', long, help = THREADS_HELP)]
    pub(crate) threads: Option<usize>,
    #[arg(long, help = XML_HELP)]
    pub(crate) xml: Option<String>,
    #[arg(long, help = JSON_HELP)]
    pub(crate) json: bool,
    #[arg(long, help = MAX_STRING_LENGTH_HELP)]
    pub(crate) max_string_length: Option<usize>,
    #[arg(long, help = PRECISION_HELP)]
    pub(crate) precision: Option<usize>,
}

impl Run {
    /// The configuration file, if any, with the flags applied on top.
    pub fn configuration(&self) -> Result<RunConfiguration> {
        let mut configuration = match &self.config {
            Some(path) => RunConfiguration::from_json_file(path)?,
            None => RunConfiguration::default(),
        };

        configuration.verbose |= self.verbose;
        configuration.stop_on_failure |= self.stop_on_failure;
        configuration.dry_run |= self.dry_run;
        configuration.json_output |= self.json;
        if self.no_catch {
            configuration.handle_exceptions = false;
        }
        if let Some(timeout) = self.timeout {
            configuration.default_timeout = timeout;
        }
        if let Some(filter) = &self.filter {
            configuration.name_filter = filter.clone();
        }
        if let Some(test) = &self.test {
            configuration.test_name = test.clone();
        }
        if let Some(threads) = self.threads {
            configuration.concurrent_threads = threads;
        }
        if let Some(xml) = &self.xml {
            configuration.xml_output = Some(xml.clone());
        }
        if let Some(max_string_length) = self.max_string_length {
            configuration.max_string_length = max_string_length;
        }
        if let Some(precision) = self.precision {
            configuration.precision = precision;
        }

        configuration.validate()?;
        Ok(configuration)
    }
}

impl Executable for Run {
    /// .
    /// Runs every selected test and reports on `writer`
    ///
    /// Returns the failure status code when any test failed or errored.
    /// This function will return an error if
    /// - the configuration file does not exist or is not valid JSON
    /// - the configuration holds illegal values
    /// - a report cannot be written
    fn execute(&self, writer: &mut Writer, registry: &Registry) -> Result<i32> {
        let configuration = self.configuration()?;
        let output = std::mem::replace(writer, Writer::capture());
        let coordinator = Coordinator::with_writer(configuration.clone(), output);

        let outcome = run_and_report(&coordinator, registry, &configuration);
        *writer = coordinator.replace_output(Writer::capture());
        outcome
    }
}

fn run_and_report(
    coordinator: &Arc<Coordinator>,
    registry: &Registry,
    configuration: &RunConfiguration,
) -> Result<i32> {
    registry.install(coordinator);
    let results = coordinator.run_registered()?;
    coordinator.with_output(|out| TextReport::new(&results, configuration).write(out))?;

    let abandoned = coordinator.join_unresolved();
    let results = match abandoned {
        0 => results,
        _ => {
            let latest = coordinator.snapshot();
            let late = latest.since(&results);
            if !late.is_empty() {
                let heading = format!("Late results from {abandoned} abandoned worker(s)");
                coordinator.with_output(|out| {
                    TextReport::new(&late, configuration)
                        .with_heading(&heading)
                        .write(out)
                })?;
            }
            latest
        }
    };

    if let Some(path) = &configuration.xml_output {
        let mut file = Writer::new(WriteBuffer::File(File::create(path)?));
        JunitReport::new(&results, configuration).serialize(&mut file)?;
        log::info!("wrote XML report to {path}");
    }
    if configuration.json_output {
        coordinator.with_output(|out| write_json(&results, out))?;
    }

    Ok(match results.successful {
        true => SUCCESS_STATUS_CODE,
        false => FAILURE_STATUS_CODE,
    })
}
