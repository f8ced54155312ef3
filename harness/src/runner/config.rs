use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const DEFAULT_MAX_STRING_LENGTH: usize = 500;
pub const DEFAULT_PRECISION: usize = 3;

/// Knobs consumed by the coordinator, the monitors and the reporters.
///
/// Every field is optional in a JSON configuration file; missing fields keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    /// One line per test instead of one character.
    pub verbose: bool,
    /// Stop running tests after the first failure or error.
    pub stop_on_failure: bool,
    /// When `false` only assertion failures are caught; any other error
    /// or panic escapes the run.
    pub handle_exceptions: bool,
    /// Select tests and log them as successful without running them.
    pub dry_run: bool,
    /// Seconds applied to tests that declare no timeout, `0` for none.
    pub default_timeout: f64,
    /// Prefix matched against `class::test`; empty matches everything.
    pub name_filter: String,
    /// Exact `class::test` to run; supersedes `name_filter` when non-empty.
    pub test_name: String,
    /// Width of the pool whole test classes are dispatched on.
    pub concurrent_threads: usize,
    pub xml_output: Option<String>,
    pub json_output: bool,
    pub max_string_length: usize,
    pub precision: usize,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        RunConfiguration {
            verbose: false,
            stop_on_failure: false,
            handle_exceptions: true,
            dry_run: false,
            default_timeout: 0.0,
            name_filter: String::new(),
            test_name: String::new(),
            concurrent_threads: 1,
            xml_output: None,
            json_output: false,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl RunConfiguration {
    pub fn from_json_file(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(Error::FileNotFoundError(path.to_string()));
        }
        let reader = BufReader::new(File::open(path)?);
        let config: RunConfiguration = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if Duration::try_from_secs_f64(self.default_timeout).is_err() {
            return Err(Error::IllegalArguments(format!(
                "default timeout must be a non-negative number of seconds, got {}",
                self.default_timeout
            )));
        }
        if self.concurrent_threads == 0 {
            return Err(Error::IllegalArguments(String::from(
                "concurrent threads must be at least 1",
            )));
        }
        Ok(())
    }
}
