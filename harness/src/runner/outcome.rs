//! Value types describing what happened to one test and to a whole run.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::runner::failure::Location;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TestOutcome {
    Success,
    Failure,
    Error,
    Skipped,
}

impl TestOutcome {
    /// `Success` and `Skipped` never break a run.
    pub fn is_successful(self) -> bool {
        matches!(self, TestOutcome::Success | TestOutcome::Skipped)
    }
}

impl Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TestOutcome::Success => "SUCCESS",
            TestOutcome::Failure => "FAILURE",
            TestOutcome::Error => "ERROR",
            TestOutcome::Skipped => "SKIPPED",
        };
        f.write_str(text)
    }
}

/// Builds the key identifying a test method across a run.
pub fn method_id(class_name: &str, test_name: &str) -> String {
    format!("{class_name}::{test_name}")
}

/// The record of a single test invocation.
///
/// A log starts out as the `Skipped` record of a test that was never
/// selected, is filled in by its monitor while the test runs, and is handed
/// to the coordinator exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestLog {
    pub class_name: String,
    pub test_name: String,
    pub method_id: String,
    pub outcome: TestOutcome,
    pub message: String,
    pub error_type: String,
    pub assertion: String,
    pub location: Option<Location>,
    /// Wall-clock seconds between selection and completion.
    pub duration: f64,
    pub timed_out: bool,
    /// The timeout the test ran under, `0` when unsupervised.
    pub timeout: f64,
    pub skip_reason: String,
    pub successful: bool,
    /// `false` when a name filter or fail-stop kept the test from running.
    pub selected: bool,
}

impl TestLog {
    pub fn new(class_name: &str, test_name: &str) -> Self {
        TestLog {
            class_name: class_name.to_string(),
            test_name: test_name.to_string(),
            method_id: method_id(class_name, test_name),
            outcome: TestOutcome::Skipped,
            message: String::new(),
            error_type: String::new(),
            assertion: String::new(),
            location: None,
            duration: 0.0,
            timed_out: false,
            timeout: 0.0,
            skip_reason: String::new(),
            successful: true,
            selected: false,
        }
    }
}

/// Aggregate of a run, or of a slice of one (see [`RunResults::since`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub successful: bool,
    pub n_tests: usize,
    pub n_successes: usize,
    pub n_failures: usize,
    pub n_errors: usize,
    pub n_skipped: usize,
    pub n_timeouts: usize,
    pub duration: f64,
    pub logs: Vec<TestLog>,
}

impl RunResults {
    /// Results accumulated after `earlier` was taken.
    ///
    /// Used to report workers that finished only after they had been
    /// abandoned by the watchdog and the main report was already written.
    pub fn since(&self, earlier: &RunResults) -> RunResults {
        let n_tests = self.n_tests.saturating_sub(earlier.n_tests);
        let n_successes = self.n_successes.saturating_sub(earlier.n_successes);
        RunResults {
            successful: n_tests == n_successes,
            n_tests,
            n_successes,
            n_failures: self.n_failures.saturating_sub(earlier.n_failures),
            n_errors: self.n_errors.saturating_sub(earlier.n_errors),
            n_skipped: self.n_skipped.saturating_sub(earlier.n_skipped),
            n_timeouts: self.n_timeouts.saturating_sub(earlier.n_timeouts),
            duration: (self.duration - earlier.duration).max(0.0),
            logs: self
                .logs
                .iter()
                .skip(earlier.logs.len())
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.n_tests == 0 && self.n_skipped == 0
    }

    /// Logs of tests that failed or errored, in completion order.
    pub fn unsuccessful(&self) -> impl Iterator<Item = &TestLog> {
        self.logs.iter().filter(|log| !log.successful)
    }

    pub fn find(&self, method_id: &str) -> Option<&TestLog> {
        self.logs.iter().find(|log| log.method_id == method_id)
    }
}
