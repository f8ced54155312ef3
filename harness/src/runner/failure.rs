//! The signals a test body can raise.
//!
//! Test hooks return [`TestResult`]. An `Err` carrying a [`TestFailure`] is an
//! assertion that did not hold and is reported as a failure. Any other error
//! converted through `?` is reported as an unexpected error, labelled with the
//! name of its type.

use std::any::Any;
use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where an assertion was written.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: &str, line: u32) -> Self {
        Location {
            file: file.to_string(),
            line,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// An assertion that did not hold.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct TestFailure {
    pub assertion: String,
    pub message: String,
    pub location: Option<Location>,
}

impl TestFailure {
    pub fn new(assertion: &str, message: impl Into<String>) -> Self {
        TestFailure {
            assertion: assertion.to_string(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, file: &str, line: u32) -> Self {
        self.location = Some(Location::new(file, line));
        self
    }
}

/// What went wrong inside a test hook, as seen by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    Failure(TestFailure),
    Error { type_name: String, message: String },
}

/// Error type returned by test hooks.
///
/// Every `std::error::Error` converts into it, so `?` works on any fallible
/// call inside a test. `TestError` must not implement `std::error::Error`
/// itself or the blanket conversion overlaps with `From<T> for T`.
pub struct TestError(Fault);

pub type TestResult<T = ()> = std::result::Result<T, TestError>;

impl TestError {
    /// An unexpected error carrying only a message.
    pub fn msg(message: impl Display) -> Self {
        TestError(Fault::Error {
            type_name: "error".to_string(),
            message: message.to_string(),
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.0, Fault::Failure(_))
    }

    pub fn fault(&self) -> &Fault {
        &self.0
    }

    pub fn into_fault(self) -> Fault {
        self.0
    }
}

impl<E> From<E> for TestError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let type_name = std::any::type_name::<E>();
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        match boxed.downcast::<TestFailure>() {
            Ok(failure) => TestError(Fault::Failure(*failure)),
            Err(other) => TestError(Fault::Error {
                type_name: type_name.to_string(),
                message: other.to_string(),
            }),
        }
    }
}

impl Debug for TestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for TestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Fault::Failure(failure) => write!(f, "{}: {}", failure.assertion, failure.message),
            Fault::Error { type_name, message } => write!(f, "{type_name}: {message}"),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::from("unknown error")
    }
}
