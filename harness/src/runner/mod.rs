pub mod config;
pub mod coordinator;
pub mod failure;
pub mod monitor;
pub mod outcome;
pub mod registry;
pub mod stages;
pub mod supervisor;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
