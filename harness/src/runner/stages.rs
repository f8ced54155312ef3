//! Drives one test instance through its lifecycle.
//!
//! ```text
//! Construct -> SetUp -> Execute -> TearDown -> Destruct -> Complete
//!     |          |         |          |
//!     |          +---------|----------|-----> Destruct   (set_up failed)
//!     |                    +----------+-----> TearDown   (execute failed)
//!     +---------------------------------------> Complete (nothing to clean up)
//! ```
//!
//! Once construction succeeds, destruction is always attempted. The first
//! fault is the one reported; faults raised while cleaning up after it are
//! only logged.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::runner::failure::{panic_message, Fault, TestResult};
use crate::runner::monitor::TestMonitor;

/// A test class: a type with lifecycle hooks and an optional shared context.
///
/// Use `()` as the context when the tests need none. A fresh instance is
/// constructed for every test method and never leaves the thread that runs
/// it.
pub trait TestCase: Sized + 'static {
    type Context: Send + Sync + 'static;

    fn construct(context: Arc<Self::Context>) -> TestResult<Self>;

    fn set_up(&mut self) -> TestResult {
        Ok(())
    }

    fn tear_down(&mut self) -> TestResult {
        Ok(())
    }

    fn destruct(self) -> TestResult {
        Ok(())
    }
}

/// A test method bound to its class.
pub type TestMethod<T> = fn(&mut T) -> TestResult;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Stage {
    Construct,
    SetUp,
    Execute,
    TearDown,
    Destruct,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Stage::Construct => "construct",
            Stage::SetUp => "set_up",
            Stage::Execute => "execute",
            Stage::TearDown => "tear_down",
            Stage::Destruct => "destruct",
        };
        f.write_str(text)
    }
}

pub struct StageMachine<'m> {
    monitor: &'m mut TestMonitor,
    handle_exceptions: bool,
    faulted: bool,
}

impl<'m> StageMachine<'m> {
    pub fn new(monitor: &'m mut TestMonitor, handle_exceptions: bool) -> Self {
        StageMachine {
            monitor,
            handle_exceptions,
            faulted: false,
        }
    }

    pub fn drive<T: TestCase>(mut self, context: Arc<T::Context>, method: TestMethod<T>) {
        let Some(mut case) = self.attempt(Stage::Construct, move || T::construct(context)) else {
            return;
        };

        if self.attempt(Stage::SetUp, || case.set_up()).is_some() {
            self.attempt(Stage::Execute, || method(&mut case));
            self.attempt(Stage::TearDown, || case.tear_down());
        }
        self.attempt(Stage::Destruct, move || case.destruct());

        if !self.faulted {
            self.monitor.log_success();
        }
    }

    /// Runs one stage, classifying whatever it raises. `None` means the
    /// stage did not complete.
    fn attempt<R>(&mut self, stage: Stage, body: impl FnOnce() -> TestResult<R>) -> Option<R> {
        let result = if self.handle_exceptions {
            match panic::catch_unwind(AssertUnwindSafe(body)) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    self.fault(stage, |monitor| monitor.log_unknown_error(&message));
                    return None;
                }
            }
        } else {
            body()
        };

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                match err.into_fault() {
                    Fault::Failure(failure) => {
                        self.fault(stage, move |monitor| monitor.log_failure(failure))
                    }
                    Fault::Error { type_name, message } => {
                        if !self.handle_exceptions {
                            panic!(
                                "{} raised {type_name} during {stage}: {message}",
                                self.monitor.log().method_id
                            );
                        }
                        self.fault(stage, |monitor| monitor.log_error(&type_name, &message))
                    }
                }
                None
            }
        }
    }

    fn fault(&mut self, stage: Stage, record: impl FnOnce(&mut TestMonitor)) {
        if self.faulted {
            log::debug!(
                "{}: further fault during {stage} ignored",
                self.monitor.log().method_id
            );
            return;
        }
        self.faulted = true;
        record(&mut *self.monitor);
    }
}

type Body = Box<dyn for<'m> FnOnce(StageMachine<'m>) + Send>;

/// A self-contained test invocation, ready to run on the calling thread or
/// on a watchdog worker.
///
/// Running it applies the skip and dry-run shortcuts, otherwise drives the
/// stage machine, then drops the monitor (submitting the log) and finally
/// raises the done flag.
pub struct Invocation {
    monitor: TestMonitor,
    skip_reason: Option<String>,
    body: Body,
    done: Arc<AtomicBool>,
}

impl Invocation {
    pub fn new<T: TestCase>(
        monitor: TestMonitor,
        context: Arc<T::Context>,
        method: TestMethod<T>,
        skip_reason: Option<String>,
    ) -> Self {
        Invocation {
            monitor,
            skip_reason,
            body: Box::new(move |machine: StageMachine<'_>| machine.drive::<T>(context, method)),
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn done(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.done)
    }

    pub fn monitor_mut(&mut self) -> &mut TestMonitor {
        &mut self.monitor
    }

    /// Whether running this invocation executes any test code at all.
    pub fn executes(&self) -> bool {
        self.monitor.is_permitted() && self.skip_reason.is_none() && !self.monitor.is_dry_run()
    }

    pub fn run(self) {
        let Invocation {
            mut monitor,
            skip_reason,
            body,
            done,
        } = self;

        if monitor.is_permitted() {
            if let Some(reason) = skip_reason {
                monitor.log_skipped(&reason);
            } else if monitor.is_dry_run() {
                monitor.log_success();
            } else {
                let handle_exceptions = monitor.handles_exceptions();
                body(StageMachine::new(&mut monitor, handle_exceptions));
            }
        }

        drop(monitor);
        done.store(true, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "stages_tests.rs"]
mod stages_tests;
