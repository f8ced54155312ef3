//! Declaring test classes and handing them to a run.
//!
//! A [`TestClass`] collects the [`TestDef`]s of one [`TestCase`] type and
//! erases the type into a [`ClassEntry`], which is all the coordinator needs
//! to run it. A [`Registry`] keeps the entries of a test binary in
//! declaration order.

use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::errors::{Error, Result};
use crate::runner::coordinator::Coordinator;
use crate::runner::failure::panic_message;
use crate::runner::monitor::TestMonitor;
use crate::runner::outcome::method_id;
use crate::runner::stages::{Invocation, TestCase, TestMethod};
use crate::runner::supervisor::{self, Supervision};
use crate::utils::short_type_name;

pub struct TestDef<T: TestCase> {
    name: String,
    method: TestMethod<T>,
    skip_reason: Option<String>,
    timeout: Option<f64>,
}

impl<T: TestCase> TestDef<T> {
    pub fn new(name: &str, method: TestMethod<T>) -> Self {
        TestDef {
            name: name.to_string(),
            method,
            skip_reason: None,
            timeout: None,
        }
    }

    /// Declares the test as skipped; it is logged but never run.
    pub fn skipped(mut self, reason: &str) -> Self {
        self.skip_reason = Some(reason.to_string());
        self
    }

    /// Overrides the run's default timeout for this test. `0` runs it inline.
    pub fn timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self, class_name: &str) -> TestSummary {
        TestSummary {
            class_name: class_name.to_string(),
            test_name: self.name.clone(),
            skip_reason: self.skip_reason.clone(),
            timeout: self.timeout,
        }
    }
}

impl<T: TestCase> Clone for TestDef<T> {
    fn clone(&self) -> Self {
        TestDef {
            name: self.name.clone(),
            method: self.method,
            skip_reason: self.skip_reason.clone(),
            timeout: self.timeout,
        }
    }
}

/// What a listing shows about one declared test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSummary {
    pub class_name: String,
    pub test_name: String,
    pub skip_reason: Option<String>,
    pub timeout: Option<f64>,
}

impl TestSummary {
    pub fn method_id(&self) -> String {
        method_id(&self.class_name, &self.test_name)
    }
}

type ContextFactory<C> = Arc<dyn Fn() -> C + Send + Sync>;

pub struct TestClass<T: TestCase> {
    name: String,
    context: ContextFactory<T::Context>,
    tests: IndexMap<String, TestDef<T>>,
}

impl<T: TestCase<Context = ()>> TestClass<T> {
    pub fn new(name: &str) -> Self {
        Self::with_context(name, || ())
    }
}

impl<T: TestCase> TestClass<T> {
    /// A class whose tests share a context. `factory` runs once each time
    /// the class runs, before its first test.
    pub fn with_context<F>(name: &str, factory: F) -> Self
    where
        F: Fn() -> T::Context + Send + Sync + 'static,
    {
        TestClass {
            name: name.to_string(),
            context: Arc::new(factory),
            tests: IndexMap::new(),
        }
    }

    /// Appends a type parameter to the class name, so that `Stack` becomes
    /// `Stack<u32>` and then `Stack<u32, String>`.
    pub fn parameterized<P: ?Sized>(mut self) -> Self {
        let parameter = short_type_name::<P>();
        self.name = match self.name.strip_suffix('>') {
            Some(open) if open.contains('<') => format!("{open}, {parameter}>"),
            _ => format!("{}<{parameter}>", self.name),
        };
        self
    }

    pub fn test(self, name: &str, method: TestMethod<T>) -> Self {
        self.add(TestDef::new(name, method))
    }

    pub fn add(mut self, def: TestDef<T>) -> Self {
        if self.tests.contains_key(def.name()) {
            log::warn!(
                "test {} declared twice, keeping the first",
                method_id(&self.name, def.name())
            );
            return self;
        }
        self.tests.insert(def.name().to_string(), def);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_entry(self) -> ClassEntry {
        let TestClass {
            name,
            context,
            tests,
        } = self;
        let summaries = tests.values().map(|def| def.summary(&name)).collect();
        let class_name = name.clone();

        ClassEntry {
            name,
            tests: summaries,
            run: Arc::new(move |coordinator: &Arc<Coordinator>| {
                let context = match panic::catch_unwind(AssertUnwindSafe(|| context())) {
                    Ok(context) => Arc::new(context),
                    Err(payload) => {
                        if !coordinator.configuration().handle_exceptions {
                            panic::resume_unwind(payload);
                        }
                        let message = format!(
                            "context of {class_name} panicked: {}",
                            panic_message(payload.as_ref())
                        );
                        for def in tests.values() {
                            record_without_context(coordinator, &class_name, def, &message);
                        }
                        return Ok(());
                    }
                };
                for def in tests.values() {
                    run_test(coordinator, &class_name, &context, def)?;
                }
                Ok(())
            }),
        }
    }
}

type ClassRun = Arc<dyn Fn(&Arc<Coordinator>) -> Result<()> + Send + Sync>;

/// A test class with its type erased, ready to be dispatched.
#[derive(Clone)]
pub struct ClassEntry {
    name: String,
    tests: Vec<TestSummary>,
    run: ClassRun,
}

impl ClassEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tests(&self) -> &[TestSummary] {
        &self.tests
    }

    /// Runs every test of the class, in declaration order, on this thread.
    pub fn run(&self, coordinator: &Arc<Coordinator>) -> Result<()> {
        (self.run)(coordinator)
    }
}

impl Debug for ClassEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("tests", &self.tests)
            .finish()
    }
}

/// The test classes of one binary, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    classes: IndexMap<String, ClassEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn register<T: TestCase>(&mut self, class: TestClass<T>) -> &mut Self {
        self.add_entry(class.into_entry())
    }

    pub fn add_entry(&mut self, entry: ClassEntry) -> &mut Self {
        if self.classes.contains_key(entry.name()) {
            log::warn!("test class {} declared twice, keeping the first", entry.name());
        } else {
            self.classes.insert(entry.name().to_string(), entry);
        }
        self
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Every declared test, class by class.
    pub fn list(&self) -> Vec<TestSummary> {
        self.classes
            .values()
            .flat_map(|entry| entry.tests().iter().cloned())
            .collect()
    }

    /// Hands every class to `coordinator` for [`Coordinator::run_registered`].
    pub fn install(&self, coordinator: &Coordinator) {
        for entry in self.classes.values() {
            coordinator.register_class(entry.clone());
        }
    }
}

/// Runs one declared test: inline when no positive timeout applies, under
/// the watchdog otherwise. The declared timeout wins over the run default.
pub fn run_test<T: TestCase>(
    coordinator: &Arc<Coordinator>,
    class_name: &str,
    context: &Arc<T::Context>,
    def: &TestDef<T>,
) -> Result<Supervision> {
    let timeout = def
        .timeout
        .unwrap_or_else(|| coordinator.configuration().default_timeout);
    let monitor = TestMonitor::new(coordinator, class_name, &def.name);
    let invocation = Invocation::new::<T>(
        monitor,
        Arc::clone(context),
        def.method,
        def.skip_reason.clone(),
    );
    supervisor::run_invocation(coordinator, class_name, &def.name, invocation, timeout)
}

/// Logs a test whose class context could not be built. Declared skips and
/// dry runs keep their usual outcome; every other selected test is an error.
fn record_without_context<T: TestCase>(
    coordinator: &Arc<Coordinator>,
    class_name: &str,
    def: &TestDef<T>,
    message: &str,
) {
    let mut monitor = TestMonitor::new(coordinator, class_name, &def.name);
    if !monitor.is_permitted() {
        return;
    }
    match &def.skip_reason {
        Some(reason) => monitor.log_skipped(reason),
        None if monitor.is_dry_run() => monitor.log_success(),
        None => monitor.log_unknown_error(message),
    }
}

/// Runs `classes` one after the other, or across a pool of
/// `concurrent_threads` when more than one thread is configured.
/// Tests inside a class always run sequentially.
pub(crate) fn dispatch(coordinator: &Arc<Coordinator>, classes: &[ClassEntry]) -> Result<()> {
    let run_one = |entry: &ClassEntry| -> Result<()> {
        log::debug!("running test class {}", entry.name());
        let result = entry.run(coordinator);
        coordinator.reap_unresolved();
        result
    };

    let threads = coordinator.configuration().concurrent_threads;
    if threads <= 1 || classes.len() <= 1 {
        return classes.iter().try_for_each(run_one);
    }

    log::info!(
        "dispatching {} test classes on {threads} threads",
        classes.len()
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("class-dispatch-{index}"))
        .build()
        .map_err(|err| Error::ThreadPoolError {
            threads,
            message: err.to_string(),
        })?;
    pool.install(|| classes.par_iter().try_for_each(run_one))
}
