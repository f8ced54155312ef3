use std::io::Write;

use colored::Colorize;

use crate::errors::Result;
use crate::runner::config::RunConfiguration;
use crate::runner::outcome::{RunResults, TestLog, TestOutcome};
use crate::utils::truncate;
use crate::utils::writer::Writer;

const HEAVY_RULE: &str =
    "======================================================================";
const LIGHT_RULE: &str =
    "----------------------------------------------------------------------";

/// Plain text summary of a run: one detail block per unsuccessful test,
/// then the totals.
pub struct TextReport<'report> {
    results: &'report RunResults,
    precision: usize,
    max_string_length: usize,
    heading: Option<&'report str>,
}

impl<'report> TextReport<'report> {
    pub fn new(results: &'report RunResults, configuration: &RunConfiguration) -> Self {
        TextReport {
            results,
            precision: configuration.precision,
            max_string_length: configuration.max_string_length,
            heading: None,
        }
    }

    /// Prints `heading` above the report.
    pub fn with_heading(mut self, heading: &'report str) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        writeln!(writer)?;
        if let Some(heading) = self.heading {
            writeln!(writer, "{}", heading.bold())?;
        }
        for log in self.results.unsuccessful() {
            self.write_detail(log, writer)?;
        }
        writeln!(writer, "{LIGHT_RULE}")?;
        writeln!(
            writer,
            "Ran {} {} in {:.*}s",
            self.results.n_tests,
            if self.results.n_tests == 1 { "test" } else { "tests" },
            self.precision,
            self.results.duration
        )?;
        writeln!(writer)?;
        writeln!(writer, "{}", self.verdict())?;
        Ok(())
    }

    fn write_detail(&self, log: &TestLog, writer: &mut Writer) -> Result<()> {
        let label = match log.outcome {
            TestOutcome::Failure => "FAIL",
            _ => "ERROR",
        };
        writeln!(writer, "{HEAVY_RULE}")?;
        writeln!(writer, "{}: {}", label.red().bold(), log.method_id)?;
        writeln!(writer, "{LIGHT_RULE}")?;

        match (&log.outcome, &log.location) {
            (TestOutcome::Failure, Some(location)) => {
                writeln!(writer, "{} at {location}", log.assertion)?
            }
            (TestOutcome::Failure, None) => writeln!(writer, "{}", log.assertion)?,
            _ => writeln!(writer, "{}", log.error_type)?,
        }
        writeln!(writer, "{}", truncate(&log.message, self.max_string_length))?;
        if log.timed_out {
            writeln!(
                writer,
                "(timed out after {:.*}s)",
                self.precision, log.timeout
            )?;
        }
        Ok(())
    }

    fn verdict(&self) -> String {
        let results = self.results;
        if results.successful {
            let mut extras = vec![];
            if results.n_skipped > 0 {
                extras.push(format!("skipped={}", results.n_skipped));
            }
            if results.n_timeouts > 0 {
                extras.push(format!("timeouts={}", results.n_timeouts));
            }
            let ok = "OK".green().bold();
            match extras.is_empty() {
                true => ok.to_string(),
                false => format!("{ok} ({})", extras.join(", ")),
            }
        } else {
            format!(
                "{} (failures={}, errors={}, timeouts={}, skipped={})",
                "FAILED".red().bold(),
                results.n_failures,
                results.n_errors,
                results.n_timeouts,
                results.n_skipped
            )
        }
    }
}
