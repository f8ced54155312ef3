// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A unit-testing harness.
//!
//! Test classes implement [`TestCase`], are declared with [`TestClass`] and
//! collected in a [`Registry`]. A run is driven by a [`Coordinator`], which
//! filters tests by name, counts their outcomes and times the run, while
//! tests that declare a timeout are watched from a separate thread.
//!
//! ```no_run
//! use std::sync::Arc;
//! use unit_harness::{ensure_eq, Registry, TestCase, TestClass, TestResult};
//!
//! struct Arithmetic;
//!
//! impl TestCase for Arithmetic {
//!     type Context = ();
//!
//!     fn construct(_: Arc<()>) -> TestResult<Self> {
//!         Ok(Arithmetic)
//!     }
//! }
//!
//! fn adds(_: &mut Arithmetic) -> TestResult {
//!     ensure_eq!(1 + 1, 2);
//!     Ok(())
//! }
//!
//! fn main() {
//!     let mut registry = Registry::new();
//!     registry.register(TestClass::<Arithmetic>::new("Arithmetic").test("adds", adds));
//!     std::process::exit(unit_harness::run_main(&registry));
//! }
//! ```

pub mod assertions;
pub mod commands;
pub mod errors;
pub mod reporters;
pub mod runner;
pub mod utils;

pub use crate::commands::{run_main, run_with_args};
pub use crate::errors::{Error, Result};
pub use crate::runner::config::RunConfiguration;
pub use crate::runner::coordinator::Coordinator;
pub use crate::runner::failure::{Location, TestError, TestFailure, TestResult};
pub use crate::runner::outcome::{RunResults, TestLog, TestOutcome};
pub use crate::runner::registry::{Registry, TestClass, TestDef};
pub use crate::runner::stages::TestCase;
