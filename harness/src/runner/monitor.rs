use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::runner::coordinator::Coordinator;
use crate::runner::failure::TestFailure;
use crate::runner::outcome::{TestLog, TestOutcome};

/// Error type recorded for a selected test whose invocation was dropped unrun.
pub const NOT_RUN: &str = "not run";

/// Scope guard around one test invocation.
///
/// Construction decides whether the test is selected and starts its clock.
/// The `log_*` methods record what happened. Dropping the monitor stops the
/// clock, prints the completion notice and submits the log to the
/// coordinator, whether or not the test ran. A selected test that recorded
/// nothing is submitted as an error, never as a skip.
pub struct TestMonitor {
    coordinator: Arc<Coordinator>,
    log: TestLog,
    permitted: bool,
    dry_run: bool,
    handle_exceptions: bool,
    started: Instant,
    recorded: bool,
    timed_out: Option<Arc<AtomicBool>>,
}

impl TestMonitor {
    pub fn new(coordinator: &Arc<Coordinator>, class_name: &str, test_name: &str) -> Self {
        let mut log = TestLog::new(class_name, test_name);
        let configuration = coordinator.configuration();
        let permitted = coordinator.should_run(class_name, test_name);
        if permitted {
            log.selected = true;
            coordinator.start_timing();
            coordinator.notify_start(class_name, test_name);
        }
        TestMonitor {
            coordinator: Arc::clone(coordinator),
            log,
            permitted,
            dry_run: configuration.dry_run,
            handle_exceptions: configuration.handle_exceptions,
            started: Instant::now(),
            recorded: false,
            timed_out: None,
        }
    }

    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn handles_exceptions(&self) -> bool {
        self.handle_exceptions
    }

    /// Ties the monitor to a watchdog: the flag is checked when the monitor
    /// drops, and the log records `timeout` as the budget it ran under.
    pub fn watch(&mut self, timed_out: Arc<AtomicBool>, timeout: f64) {
        self.log.timeout = timeout;
        self.timed_out = Some(timed_out);
    }

    /// Whether an outcome has been recorded yet.
    pub fn is_recorded(&self) -> bool {
        self.recorded
    }

    pub fn log(&self) -> &TestLog {
        &self.log
    }

    pub fn log_success(&mut self) {
        self.record(TestOutcome::Success);
    }

    pub fn log_skipped(&mut self, reason: &str) {
        let log = self.record(TestOutcome::Skipped);
        log.skip_reason = reason.to_string();
        log.message = reason.to_string();
    }

    pub fn log_failure(&mut self, failure: TestFailure) {
        let log = self.record(TestOutcome::Failure);
        log.error_type = String::from("failure");
        log.assertion = failure.assertion;
        log.message = failure.message;
        log.location = failure.location;
    }

    pub fn log_error(&mut self, type_name: &str, message: &str) {
        let log = self.record(TestOutcome::Error);
        log.error_type = type_name.to_string();
        log.message = message.to_string();
    }

    /// Records a panic, the one kind of error that carries no type.
    pub fn log_unknown_error(&mut self, message: &str) {
        let log = self.record(TestOutcome::Error);
        log.error_type = String::from("unknown");
        log.message = message.to_string();
    }

    pub fn mark_timed_out(&mut self, timeout: f64) {
        self.log.timed_out = true;
        self.log.timeout = timeout;
    }

    fn record(&mut self, outcome: TestOutcome) -> &mut TestLog {
        self.recorded = true;
        self.log.outcome = outcome;
        &mut self.log
    }
}

impl Drop for TestMonitor {
    fn drop(&mut self) {
        if self.permitted {
            if !self.recorded {
                if std::thread::panicking() {
                    self.log_unknown_error("test panicked outside of exception handling");
                } else {
                    self.log_error(NOT_RUN, "the test was selected but never run");
                }
            }
            let expired = self
                .timed_out
                .as_ref()
                .map_or(false, |flag| flag.load(Ordering::Acquire));
            if expired {
                self.mark_timed_out(self.log.timeout);
            }
        }

        let placeholder = TestLog::new(&self.log.class_name, &self.log.test_name);
        let mut log = std::mem::replace(&mut self.log, placeholder);
        if self.permitted && !self.dry_run {
            self.coordinator.stop_timing();
            if log.outcome != TestOutcome::Skipped {
                log.duration = self.started.elapsed().as_secs_f64();
            }
        }
        log.successful = log.outcome.is_successful();

        if self.permitted {
            self.coordinator.notify_end(&log);
        }
        self.coordinator.note_outcome(log);
    }
}
