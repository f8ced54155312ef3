//! Watchdog for tests that declare a timeout.
//!
//! A supervised test runs on its own worker thread while the calling thread
//! polls the worker's done flag. Timeouts are detected, not enforced: a worker
//! that overruns is flagged, left running, and handed to the coordinator,
//! which joins it once the run is over.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::{Error, Result};
use crate::runner::coordinator::{Coordinator, UnresolvedWorker};
use crate::runner::outcome::method_id;
use crate::runner::stages::Invocation;

/// The smallest sleep the watchdog asks for between two polls.
pub const POLL_QUANTUM: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Supervision {
    /// The worker finished in time and was joined.
    Completed,
    /// The worker overran and now belongs to the coordinator.
    TimedOut,
}

/// How long a sleep of [`POLL_QUANTUM`] really takes on this machine.
pub fn calibrate_overhead() -> Duration {
    let started = Instant::now();
    thread::sleep(POLL_QUANTUM);
    started.elapsed().max(POLL_QUANTUM)
}

/// The poll budget for `timeout` seconds. Rejects anything that is not a
/// positive duration `Duration` can hold.
pub fn budget(timeout: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(timeout) {
        Ok(budget) if !budget.is_zero() => Ok(budget),
        _ => Err(Error::IllegalArguments(format!(
            "a supervised timeout must be a positive number of seconds, got {timeout}"
        ))),
    }
}

/// Runs `work` on a worker thread and races it against `timeout` seconds.
///
/// `work` must raise `done` once it has finished all of its reporting.
/// On timeout `timed_out` is raised, a notice is printed, and the worker is
/// registered with the coordinator instead of being joined, so this returns
/// promptly even if the worker never does.
pub fn supervise<F>(
    coordinator: &Coordinator,
    class_name: &str,
    test_name: &str,
    work: F,
    done: Arc<AtomicBool>,
    timed_out: Arc<AtomicBool>,
    timeout: f64,
) -> Result<Supervision>
where
    F: FnOnce() + Send + 'static,
{
    let budget = budget(timeout)?;
    let id = method_id(class_name, test_name);

    let handle = thread::Builder::new()
        .name(id.clone())
        .spawn(work)
        .map_err(|source| Error::SpawnError {
            test: id.clone(),
            source,
        })?;
    let started = Instant::now();

    if !done.load(Ordering::Acquire) {
        let overhead = calibrate_overhead();
        log::debug!("watching {id} every {overhead:?} for {budget:?}");

        loop {
            thread::sleep(overhead);
            if done.load(Ordering::Acquire) {
                break;
            }
            if started.elapsed() > budget {
                timed_out.store(true, Ordering::Release);
                coordinator.notify_timeout(class_name, test_name, timeout);
                coordinator.register_unresolved(UnresolvedWorker::new(id, handle, done));
                return Ok(Supervision::TimedOut);
            }
        }
    }

    if let Err(payload) = handle.join() {
        panic::resume_unwind(payload);
    }
    Ok(Supervision::Completed)
}

/// Runs `invocation` inline when `timeout` is not positive or when it has no
/// test code to execute, and under [`supervise`] otherwise.
///
/// A timeout that cannot be supervised, such as NaN, fails the test with an
/// error and leaves the rest of the run going.
pub fn run_invocation(
    coordinator: &Arc<Coordinator>,
    class_name: &str,
    test_name: &str,
    mut invocation: Invocation,
    timeout: f64,
) -> Result<Supervision> {
    if timeout <= 0.0 || !invocation.executes() {
        invocation.run();
        return Ok(Supervision::Completed);
    }

    if let Err(err) = budget(timeout) {
        invocation
            .monitor_mut()
            .log_error(std::any::type_name::<Error>(), &err.to_string());
        return Ok(Supervision::Completed);
    }

    let done = invocation.done();
    let timed_out = Arc::new(AtomicBool::new(false));
    invocation
        .monitor_mut()
        .watch(Arc::clone(&timed_out), timeout);

    let escaped = Arc::clone(&done);
    let work = move || {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || invocation.run())) {
            escaped.store(true, Ordering::Release);
            panic::resume_unwind(payload);
        }
    };
    supervise(
        coordinator,
        class_name,
        test_name,
        work,
        done,
        timed_out,
        timeout,
    )
}
