//! JUnit style XML report.
//!
//! ```xml
//! <testsuites name=".." tests=".." failures=".." errors=".." skipped=".." time=".." timestamp="..">
//!     <testsuite name="Class" tests=".." failures=".." errors=".." skipped=".." time="..">
//!         <testcase name="test" classname="Class" time=".." timeout=".." timed_out="false"/>
//!         <testcase ...><failure message=".." type="ensure_eq">..</failure></testcase>
//!         <testcase ...><error message=".." type="..">..</error></testcase>
//!         <testcase ...><skipped message=".."/></testcase>
//!     </testsuite>
//! </testsuites>
//! ```

use std::fmt::Display;

use chrono::Local;
use indexmap::IndexMap;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::errors::Result;
use crate::runner::config::RunConfiguration;
use crate::runner::outcome::{RunResults, TestLog, TestOutcome};
use crate::utils::truncate;

pub const REPORT_NAME: &str = "unit-harness test report";

pub struct JunitReport<'report> {
    pub name: &'report str,
    pub timestamp: String,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    pub time: f64,
    pub test_suites: Vec<TestSuite<'report>>,
    precision: usize,
    max_string_length: usize,
}

#[derive(Debug, Default)]
pub struct TestSuite<'report> {
    pub name: &'report str,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    pub time: f64,
    pub test_cases: Vec<&'report TestLog>,
}

impl<'report> JunitReport<'report> {
    /// Groups the logs of `results` into one suite per class, in the order
    /// the classes first appear.
    pub fn new(results: &'report RunResults, configuration: &RunConfiguration) -> Self {
        let mut suites: IndexMap<&'report str, TestSuite<'report>> = IndexMap::new();
        for log in &results.logs {
            let suite = suites
                .entry(log.class_name.as_str())
                .or_insert_with(|| TestSuite {
                    name: &log.class_name,
                    ..Default::default()
                });
            match log.outcome {
                TestOutcome::Failure => suite.failures += 1,
                TestOutcome::Error => suite.errors += 1,
                TestOutcome::Skipped => suite.skipped += 1,
                TestOutcome::Success => {}
            }
            suite.time += log.duration;
            suite.test_cases.push(log);
        }

        JunitReport {
            name: REPORT_NAME,
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            tests: results.logs.len(),
            failures: results.n_failures,
            errors: results.n_errors,
            skipped: results
                .logs
                .iter()
                .filter(|log| log.outcome == TestOutcome::Skipped)
                .count(),
            time: results.duration,
            test_suites: suites.into_iter().map(|(_, suite)| suite).collect(),
            precision: configuration.precision,
            max_string_length: configuration.max_string_length,
        }
    }

    pub fn serialize(&self, writer: &mut crate::utils::writer::Writer) -> Result<()> {
        let mut writer = Writer::new_with_indent(writer, b' ', 4);
        let decl = BytesDecl::new("1.0", Some("UTF-8"), None);

        writer.write_event(Event::Decl(decl))?;
        EventType::TestSuites(self).serialize(&mut writer, self)?;
        Ok(writer.write_indent()?)
    }

    fn seconds(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }
}

enum EventType<'report, 'se: 'report> {
    TestSuites(&'se JunitReport<'report>),
    TestSuite(&'se TestSuite<'report>),
    TestCase(&'report TestLog),
    Failure(&'report TestLog),
    Error(&'report TestLog),
    Skipped(&'report TestLog),
}

impl<'report, 'se: 'report> EventType<'report, 'se> {
    fn start_tag(&self) -> BytesStart<'static> {
        BytesStart::new(self.to_string())
    }

    fn serialize_end_event(&self, writer: &mut Writer<impl std::io::Write>) -> Result<()> {
        Ok(writer.write_event(Event::End(BytesEnd::new(self.to_string())))?)
    }

    fn extend_attributes(&self, tag: &mut BytesStart<'_>, report: &JunitReport<'_>) {
        match self {
            EventType::TestSuites(suites) => {
                tag.extend_attributes([
                    ("name", suites.name),
                    ("tests", suites.tests.to_string().as_str()),
                    ("failures", suites.failures.to_string().as_str()),
                    ("errors", suites.errors.to_string().as_str()),
                    ("skipped", suites.skipped.to_string().as_str()),
                    ("time", report.seconds(suites.time).as_str()),
                    ("timestamp", suites.timestamp.as_str()),
                ]);
            }
            EventType::TestSuite(suite) => {
                tag.extend_attributes([
                    ("name", suite.name),
                    ("tests", suite.test_cases.len().to_string().as_str()),
                    ("failures", suite.failures.to_string().as_str()),
                    ("errors", suite.errors.to_string().as_str()),
                    ("skipped", suite.skipped.to_string().as_str()),
                    ("time", report.seconds(suite.time).as_str()),
                ]);
            }
            EventType::TestCase(log) => {
                tag.extend_attributes([
                    ("name", log.test_name.as_str()),
                    ("classname", log.class_name.as_str()),
                    ("time", report.seconds(log.duration).as_str()),
                    ("timeout", report.seconds(log.timeout).as_str()),
                    ("timed_out", log.timed_out.to_string().as_str()),
                ]);
            }
            EventType::Failure(log) => {
                tag.extend_attributes([
                    (
                        "message",
                        truncate(&log.message, report.max_string_length).as_str(),
                    ),
                    ("type", log.assertion.as_str()),
                ]);
            }
            EventType::Error(log) => {
                tag.extend_attributes([
                    (
                        "message",
                        truncate(&log.message, report.max_string_length).as_str(),
                    ),
                    ("type", log.error_type.as_str()),
                ]);
            }
            EventType::Skipped(log) => {
                tag.push_attribute(("message", log.skip_reason.as_str()));
            }
        }
    }

    fn serialize(
        &self,
        writer: &mut Writer<impl std::io::Write>,
        report: &JunitReport<'_>,
    ) -> Result<()> {
        let mut tag = self.start_tag();
        self.extend_attributes(&mut tag, report);
        match self {
            EventType::TestSuites(suites) => {
                writer.write_event(Event::Start(tag))?;
                for suite in &suites.test_suites {
                    EventType::TestSuite(suite).serialize(writer, report)?;
                }
                self.serialize_end_event(writer)?;
                writer.write_event(Event::Eof)?;
            }
            EventType::TestSuite(suite) => {
                writer.write_event(Event::Start(tag))?;
                for log in suite.test_cases.iter().copied() {
                    EventType::TestCase(log).serialize(writer, report)?;
                }
                self.serialize_end_event(writer)?;
            }
            EventType::TestCase(log) => {
                let child = match log.outcome {
                    TestOutcome::Success => None,
                    TestOutcome::Failure => Some(EventType::Failure(log)),
                    TestOutcome::Error => Some(EventType::Error(log)),
                    TestOutcome::Skipped => Some(EventType::Skipped(log)),
                };
                match child {
                    None => writer.write_event(Event::Empty(tag))?,
                    Some(child) => {
                        writer.write_event(Event::Start(tag))?;
                        child.serialize(writer, report)?;
                        self.serialize_end_event(writer)?;
                    }
                }
            }
            EventType::Failure(log) | EventType::Error(log) => {
                writer.write_event(Event::Start(tag))?;
                self.serialize_text_event(writer, log)?;
                self.serialize_end_event(writer)?;
            }
            EventType::Skipped(..) => writer.write_event(Event::Empty(tag))?,
        }

        Ok(())
    }

    fn serialize_text_event(
        &self,
        writer: &mut Writer<impl std::io::Write>,
        log: &TestLog,
    ) -> Result<()> {
        let text = match &log.location {
            Some(location) => format!("{}\nat {location}", log.message),
            None => log.message.clone(),
        };
        Ok(writer.write_event(Event::Text(BytesText::new(&text)))?)
    }
}

impl<'report, 'se: 'report> Display for EventType<'report, 'se> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            EventType::TestSuites(..) => "testsuites",
            EventType::TestSuite(..) => "testsuite",
            EventType::TestCase(..) => "testcase",
            EventType::Failure(..) => "failure",
            EventType::Error(..) => "error",
            EventType::Skipped(..) => "skipped",
        };

        f.write_str(text)
    }
}

#[cfg(test)]
#[path = "xml_tests.rs"]
mod xml_tests;
