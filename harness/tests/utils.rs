// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use unit_harness::utils::writer::Writer;
use unit_harness::{
    ensure, ensure_eq, run_with_args, Registry, TestCase, TestClass, TestDef, TestResult,
};

#[non_exhaustive]
pub struct StatusCode;

const HARNESS_TEST_APP_NAME: &str = "unit-harness-test";

#[allow(dead_code)]
impl StatusCode {
    pub const SUCCESS: i32 = 0;
    pub const TEST_FAILURE: i32 = 1;
    pub const HARNESS_ERROR: i32 = 5;
}

pub struct Scenario;

impl TestCase for Scenario {
    type Context = ();

    fn construct(_: Arc<()>) -> TestResult<Self> {
        Ok(Scenario)
    }
}

pub fn succeeds(_: &mut Scenario) -> TestResult {
    let sum = 1 + 1;
    ensure_eq!(sum, 2);
    Ok(())
}

pub fn compares(_: &mut Scenario) -> TestResult {
    let sum = 1 + 1;
    ensure_eq!(sum, 3);
    Ok(())
}

#[allow(dead_code)]
pub fn parses(_: &mut Scenario) -> TestResult {
    let value: u8 = "300".parse()?;
    ensure!(value > 0);
    Ok(())
}

#[allow(dead_code)]
pub fn naps(_: &mut Scenario) -> TestResult {
    thread::sleep(Duration::from_millis(600));
    Ok(())
}

/// One success, one assertion failure and one declared skip.
pub fn scenario() -> TestClass<Scenario> {
    TestClass::new("Scenario")
        .test("succeeds", succeeds)
        .test("compares", compares)
        .add(TestDef::new("flaky", succeeds).skipped("flaky"))
}

pub fn registry_of(classes: Vec<TestClass<Scenario>>) -> Registry {
    let mut registry = Registry::new();
    for class in classes {
        registry.register(class);
    }
    registry
}

/// A path under the system temp directory, unique to this test process.
#[allow(dead_code)]
pub fn temp_path(name: &str) -> String {
    let mut path: PathBuf = std::env::temp_dir();
    path.push(format!("unit-harness-{}-{name}", std::process::id()));
    path.display().to_string()
}

#[allow(dead_code)]
pub fn compare_write_buffer_with_string(expected_output: &str, actual_output_writer: Writer) {
    let actual_output = actual_output_writer.stripped().unwrap();
    assert_eq!(expected_output, actual_output)
}

pub trait CommandTestRunner {
    fn build_args(&self) -> Vec<String>;

    fn run(&self, writer: &mut Writer, registry: &Registry) -> i32 {
        let args = self.build_args();
        let command_options =
            args.iter()
                .fold(vec![String::from(HARNESS_TEST_APP_NAME)], |mut res, arg| {
                    res.push(arg.to_string());
                    res
                });
        run_with_args(command_options, registry, writer)
    }
}

#[macro_export]
macro_rules! assert_output_from_str_eq {
    ($expected_output: expr, $actual_output_writer: expr) => {
        $crate::utils::compare_write_buffer_with_string($expected_output, $actual_output_writer)
    };
}
