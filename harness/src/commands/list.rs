use std::io::Write;

use clap::Args;
use colored::Colorize;

use crate::commands::{Executable, SUCCESS_STATUS_CODE};
use crate::errors::Result;
use crate::runner::coordinator::matches_filter;
use crate::runner::registry::{Registry, TestSummary};
use crate::utils::writer::Writer;

const ABOUT: &str = "Lists the declared tests without running them.";
const FILTER_HELP: &str = "Only list tests whose `class::test` name starts with this prefix";
const JSON_HELP: &str = "Print the listing as JSON";

#[derive(Debug, Clone, Default, Eq, PartialEq, Args)]
#[clap(about = ABOUT)]
pub struct List {
    #[arg(short, long, help = FILTER_HELP)]
    pub(crate) filter: Option<String>,
    #[arg(long, help = JSON_HELP)]
    pub(crate) json: bool,
}

impl Executable for List {
    fn execute(&self, writer: &mut Writer, registry: &Registry) -> Result<i32> {
        let prefix = self.filter.as_deref().unwrap_or_default();
        let tests = registry
            .list()
            .into_iter()
            .filter(|test| matches_filter(&test.class_name, &test.test_name, prefix, ""))
            .collect::<Vec<_>>();

        if self.json {
            serde_json::to_writer_pretty(&mut *writer, &tests)?;
            writeln!(writer)?;
        } else {
            for test in &tests {
                writeln!(writer, "{}", describe(test))?;
            }
        }
        Ok(SUCCESS_STATUS_CODE)
    }
}

fn describe(test: &TestSummary) -> String {
    let mut line = test.method_id();
    if let Some(reason) = &test.skip_reason {
        line.push_str(&format!(" {}", format!("[skipped: {reason}]").as_str().yellow()));
    }
    if let Some(timeout) = test.timeout {
        line.push_str(&format!(" [timeout: {timeout}s]"));
    }
    line
}
