// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The run coordinator.
//!
//! One [`Coordinator`] exists per run. It is created by whoever drives the run
//! and shared as an `Arc` with every class dispatch, monitor and watchdog.
//! It holds three independently locked pieces of state:
//!
//! - the tally (counters, ordered logs, the fail-stop flag), mutated only by
//!   [`Coordinator::note_outcome`];
//! - the output sink used for progress notices, so concurrent notices never
//!   interleave characters and never contend with bookkeeping;
//! - the workers abandoned by the watchdog, joined at shutdown.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;
use std::time::Instant;

use colored::Colorize;
use indexmap::IndexMap;

use crate::errors::Result;
use crate::runner::config::RunConfiguration;
use crate::runner::failure::panic_message;
use crate::runner::lock;
use crate::runner::outcome::{method_id, RunResults, TestLog, TestOutcome};
use crate::runner::registry::{self, ClassEntry};
use crate::utils::writer::Writer;

#[derive(Debug, Default)]
struct Tally {
    n_tests: usize,
    n_successes: usize,
    n_failures: usize,
    n_errors: usize,
    n_skipped: usize,
    n_timeouts: usize,
    logs: Vec<TestLog>,
    halted: bool,
}

/// A watchdog worker that was still running when its test timed out.
pub struct UnresolvedWorker {
    method_id: String,
    handle: JoinHandle<()>,
    done: Arc<AtomicBool>,
}

impl UnresolvedWorker {
    pub fn new(method_id: String, handle: JoinHandle<()>, done: Arc<AtomicBool>) -> Self {
        UnresolvedWorker {
            method_id,
            handle,
            done,
        }
    }

    pub fn method_id(&self) -> &str {
        &self.method_id
    }

    pub fn is_finished(&self) -> bool {
        self.done.load(Ordering::Acquire) || self.handle.is_finished()
    }

    fn join(self) {
        match self.handle.join() {
            Ok(()) => log::debug!("joined abandoned worker for {}", self.method_id),
            Err(payload) => log::error!(
                "abandoned worker for {} panicked: {}",
                self.method_id,
                panic_message(payload.as_ref())
            ),
        }
    }
}

pub struct Coordinator {
    configuration: Mutex<Arc<RunConfiguration>>,
    tally: Mutex<Tally>,
    started: OnceLock<Instant>,
    stopped: Mutex<Option<Instant>>,
    output: Mutex<Writer>,
    unresolved: Mutex<Vec<UnresolvedWorker>>,
    classes: Mutex<IndexMap<String, ClassEntry>>,
}

impl Coordinator {
    pub fn new(configuration: RunConfiguration) -> Arc<Self> {
        Self::with_writer(configuration, Writer::stdout())
    }

    pub fn with_writer(configuration: RunConfiguration, writer: Writer) -> Arc<Self> {
        Arc::new(Coordinator {
            configuration: Mutex::new(Arc::new(configuration)),
            tally: Mutex::new(Tally::default()),
            started: OnceLock::new(),
            stopped: Mutex::new(None),
            output: Mutex::new(writer),
            unresolved: Mutex::new(vec![]),
            classes: Mutex::new(IndexMap::new()),
        })
    }

    pub fn set_configuration(&self, configuration: RunConfiguration) {
        *lock(&self.configuration) = Arc::new(configuration);
    }

    pub fn configuration(&self) -> Arc<RunConfiguration> {
        Arc::clone(&lock(&self.configuration))
    }

    /// Whether `class_name::test_name` should run now, given the name filters
    /// and whether an earlier failure tripped fail-stop.
    pub fn should_run(&self, class_name: &str, test_name: &str) -> bool {
        let configuration = self.configuration();
        if configuration.stop_on_failure && lock(&self.tally).halted {
            return false;
        }
        matches_filter(
            class_name,
            test_name,
            &configuration.name_filter,
            &configuration.test_name,
        )
    }

    /// Folds one finished test into the tally.
    pub fn note_outcome(&self, log: TestLog) {
        let stop_on_failure = self.configuration().stop_on_failure;
        let mut tally = lock(&self.tally);

        match log.outcome {
            TestOutcome::Skipped => tally.n_skipped += 1,
            outcome => {
                tally.n_tests += 1;
                match outcome {
                    TestOutcome::Success => tally.n_successes += 1,
                    TestOutcome::Failure => tally.n_failures += 1,
                    _ => tally.n_errors += 1,
                }
                if log.timed_out {
                    tally.n_timeouts += 1;
                }
            }
        }
        if stop_on_failure && !log.successful {
            tally.halted = true;
        }
        if log.selected {
            tally.logs.push(log);
        }
    }

    pub fn snapshot(&self) -> RunResults {
        let tally = lock(&self.tally);
        RunResults {
            successful: tally.n_tests == tally.n_successes,
            n_tests: tally.n_tests,
            n_successes: tally.n_successes,
            n_failures: tally.n_failures,
            n_errors: tally.n_errors,
            n_skipped: tally.n_skipped,
            n_timeouts: tally.n_timeouts,
            duration: self.elapsed(),
            logs: tally.logs.clone(),
        }
    }

    /// Marks the start of the run; only the first call has an effect.
    pub fn start_timing(&self) {
        let _ = self.started.get_or_init(Instant::now);
    }

    /// Marks the latest completion; every call moves the end of the run.
    pub fn stop_timing(&self) {
        let mut stopped = lock(&self.stopped);
        *stopped = Some(Instant::now());
    }

    fn elapsed(&self) -> f64 {
        match (self.started.get(), *lock(&self.stopped)) {
            (Some(started), Some(stopped)) => stopped
                .checked_duration_since(*started)
                .map_or(0.0, |elapsed| elapsed.as_secs_f64()),
            _ => 0.0,
        }
    }

    //
    // Abandoned watchdog workers
    //

    pub fn register_unresolved(&self, worker: UnresolvedWorker) {
        log::warn!(
            "worker for {} is still running past its timeout, deferring its join",
            worker.method_id
        );
        lock(&self.unresolved).push(worker);
    }

    pub fn unresolved_count(&self) -> usize {
        lock(&self.unresolved).len()
    }

    /// Joins the abandoned workers that have finished since, without
    /// blocking on the others. Returns how many were joined.
    pub fn reap_unresolved(&self) -> usize {
        let finished = {
            let mut unresolved = lock(&self.unresolved);
            let (finished, pending): (Vec<_>, Vec<_>) = unresolved
                .drain(..)
                .partition(UnresolvedWorker::is_finished);
            *unresolved = pending;
            finished
        };
        let count = finished.len();
        finished.into_iter().for_each(UnresolvedWorker::join);
        count
    }

    /// Joins every abandoned worker, blocking until each one returns.
    /// Meant to be called once, when the run is over.
    pub fn join_unresolved(&self) -> usize {
        let workers = std::mem::take(&mut *lock(&self.unresolved));
        let count = workers.len();
        for worker in workers {
            log::info!("waiting for abandoned worker {}", worker.method_id);
            worker.join();
        }
        count
    }

    //
    // Test classes
    //

    pub fn register_class(&self, entry: ClassEntry) {
        let mut classes = lock(&self.classes);
        if classes.contains_key(entry.name()) {
            log::warn!("test class {} registered twice, keeping the first", entry.name());
            return;
        }
        classes.insert(entry.name().to_string(), entry);
    }

    pub fn registered_classes(&self) -> Vec<ClassEntry> {
        lock(&self.classes).values().cloned().collect()
    }

    /// Runs every registered class and returns the accumulated results.
    pub fn run_registered(self: &Arc<Self>) -> Result<RunResults> {
        let classes = self.registered_classes();
        registry::dispatch(self, &classes)?;
        Ok(self.snapshot())
    }

    //
    // Output sink
    //

    pub fn with_output<R>(&self, write: impl FnOnce(&mut Writer) -> R) -> R {
        let mut output = lock(&self.output);
        write(&mut *output)
    }

    /// Swaps in a new output sink and returns the previous one.
    pub fn replace_output(&self, writer: Writer) -> Writer {
        std::mem::replace(&mut *lock(&self.output), writer)
    }

    pub(crate) fn notify_start(&self, class_name: &str, test_name: &str) {
        if !self.configuration().verbose {
            return;
        }
        let line = format!("{} ... started", method_id(class_name, test_name));
        self.emit(|out| writeln!(out, "{line}"));
    }

    pub(crate) fn notify_end(&self, log: &TestLog) {
        let configuration = self.configuration();
        if configuration.verbose {
            let status = match log.outcome {
                TestOutcome::Success => "ok".green(),
                TestOutcome::Failure => "FAIL".red(),
                TestOutcome::Error => "ERROR".red(),
                TestOutcome::Skipped => format!("skipped '{}'", log.skip_reason).as_str().yellow(),
            };
            let mut line = format!(
                "{} ... {status} ({:.*}s)",
                log.method_id, configuration.precision, log.duration
            );
            if log.timed_out {
                line.push_str(&format!(
                    " [timed out after {:.*}s]",
                    configuration.precision, log.timeout
                ));
            }
            self.emit(|out| writeln!(out, "{line}"));
        } else {
            let mark = match log.outcome {
                TestOutcome::Success => ".".normal(),
                TestOutcome::Failure => "F".red(),
                TestOutcome::Error => "E".red(),
                TestOutcome::Skipped => "s".yellow(),
            };
            self.emit(|out| write!(out, "{mark}"));
        }
    }

    pub(crate) fn notify_timeout(&self, class_name: &str, test_name: &str, timeout: f64) {
        let configuration = self.configuration();
        if configuration.verbose {
            let line = format!(
                "{} ... {} after {:.*}s, worker left running",
                method_id(class_name, test_name),
                "TIMEOUT".magenta(),
                configuration.precision,
                timeout
            );
            self.emit(|out| writeln!(out, "{line}"));
        } else {
            self.emit(|out| write!(out, "{}", "T".magenta()));
        }
    }

    fn emit(&self, write: impl FnOnce(&mut Writer) -> std::io::Result<()>) {
        let mut output = lock(&self.output);
        if let Err(err) = write(&mut *output).and_then(|()| output.flush()) {
            log::warn!("unable to write progress notice: {err}");
        }
    }
}

/// Pure name filter on `class::test`, ignoring whitespace.
///
/// A non-empty `exact` name must match in full and supersedes `prefix`;
/// otherwise the qualified name must start with `prefix`, and an empty
/// prefix matches everything.
pub fn matches_filter(class_name: &str, test_name: &str, prefix: &str, exact: &str) -> bool {
    let qualified = strip_whitespace(&method_id(class_name, test_name));
    let exact = strip_whitespace(exact);
    if !exact.is_empty() {
        return qualified == exact;
    }
    qualified.starts_with(&strip_whitespace(prefix))
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_whitespace()).collect()
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod coordinator_tests;
