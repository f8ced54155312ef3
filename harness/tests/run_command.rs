// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod utils;

#[cfg(test)]
mod run_command_tests {
    use crate::utils::{
        compares, naps, parses, registry_of, scenario, succeeds, temp_path, CommandTestRunner,
        Scenario, StatusCode,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::panic::AssertUnwindSafe;
    use unit_harness::commands::RUN;
    use unit_harness::utils::writer::Writer;
    use unit_harness::{Registry, TestClass, TestDef};

    #[derive(Default)]
    struct RunCommandTestRunner<'args> {
        config: Option<&'args str>,
        filter: Option<&'args str>,
        test: Option<&'args str>,
        timeout: Option<&'args str>,
        xml: Option<&'args str>,
        verbose: bool,
        no_catch: bool,
        dry_run: bool,
        stop_on_failure: bool,
    }

    impl<'args> CommandTestRunner for RunCommandTestRunner<'args> {
        fn build_args(&self) -> Vec<String> {
            let mut args = vec![String::from(RUN)];
            let options = [
                ("--config", self.config),
                ("--filter", self.filter),
                ("--test", self.test),
                ("--timeout", self.timeout),
                ("--xml", self.xml),
            ];
            for (flag, value) in options {
                if let Some(value) = value {
                    args.push(flag.to_string());
                    args.push(value.to_string());
                }
            }
            let flags = [
                ("--verbose", self.verbose),
                ("--no-catch", self.no_catch),
                ("--dry-run", self.dry_run),
                ("--stop-on-failure", self.stop_on_failure),
            ];
            for (flag, set) in flags {
                if set {
                    args.push(flag.to_string());
                }
            }
            args
        }
    }

    fn run(runner: &RunCommandTestRunner<'_>, registry: &Registry) -> (i32, String) {
        let mut writer = Writer::capture();
        let status_code = runner.run(&mut writer, registry);
        (status_code, writer.stripped().unwrap())
    }

    #[test]
    fn three_test_scenario_fails_the_run() {
        let (status_code, output) = run(
            &RunCommandTestRunner::default(),
            &registry_of(vec![scenario()]),
        );
        assert_eq!(status_code, StatusCode::TEST_FAILURE);
        assert!(output.starts_with(".Fs\n"), "{output}");
        assert!(output.contains(indoc! {"
            FAIL: Scenario::compares
            ----------------------------------------------------------------------
            ensure_eq at "}), "{output}");
        assert!(output.contains("2 not equal to 3\n"), "{output}");
        assert!(output.contains("Ran 2 tests in "), "{output}");
        assert!(
            output.ends_with("FAILED (failures=1, errors=0, timeouts=0, skipped=1)\n"),
            "{output}"
        );
    }

    #[rstest]
    #[case(Some("Scenario::succ"), None, StatusCode::SUCCESS, "OK (skipped=2)\n")]
    #[case(None, Some("Scenario::compares"), StatusCode::TEST_FAILURE, "FAILED (failures=1, errors=0, timeouts=0, skipped=2)\n")]
    #[case(Some("Nothing"), None, StatusCode::SUCCESS, "OK (skipped=3)\n")]
    fn name_filters(
        #[case] filter: Option<&str>,
        #[case] test: Option<&str>,
        #[case] expected_status_code: i32,
        #[case] expected_verdict: &str,
    ) {
        let runner = RunCommandTestRunner {
            filter,
            test,
            ..Default::default()
        };
        let (status_code, output) = run(&runner, &registry_of(vec![scenario()]));
        assert_eq!(status_code, expected_status_code);
        assert!(output.ends_with(expected_verdict), "{output}");
    }

    #[test]
    fn verbose_lines_per_test() {
        let runner = RunCommandTestRunner {
            verbose: true,
            test: Some("Scenario::flaky"),
            ..Default::default()
        };
        let (status_code, output) = run(&runner, &registry_of(vec![scenario()]));
        assert_eq!(status_code, StatusCode::SUCCESS);
        assert!(
            output.starts_with(indoc! {"
                Scenario::flaky ... started
                Scenario::flaky ... skipped 'flaky' (0.000s)
            "}),
            "{output}"
        );
    }

    #[test]
    fn dry_run_succeeds_without_running() {
        let runner = RunCommandTestRunner {
            dry_run: true,
            ..Default::default()
        };
        let (status_code, output) = run(&runner, &registry_of(vec![scenario()]));
        assert_eq!(status_code, StatusCode::SUCCESS);
        assert!(output.starts_with("..s\n"), "{output}");
    }

    #[test]
    fn stop_on_failure_halts_the_run() {
        let class = TestClass::<Scenario>::new("Halting")
            .test("first", compares)
            .test("second", succeeds);
        let runner = RunCommandTestRunner {
            stop_on_failure: true,
            ..Default::default()
        };
        let (status_code, output) = run(&runner, &registry_of(vec![class]));
        assert_eq!(status_code, StatusCode::TEST_FAILURE);
        assert!(output.starts_with("F\n"), "{output}");
        assert!(output.contains("Ran 1 test in "), "{output}");
    }

    #[test]
    fn late_results_are_reported_after_the_summary() {
        let class = TestClass::<Scenario>::new("Slow")
            .add(TestDef::new("naps", naps).timeout(0.2))
            .test("succeeds", succeeds);
        let (status_code, output) = run(
            &RunCommandTestRunner::default(),
            &registry_of(vec![class]),
        );
        assert_eq!(status_code, StatusCode::SUCCESS);
        assert!(output.starts_with("T."), "{output}");

        let summary = output.find("Ran 1 test in ").unwrap();
        let late = output.find("Late results from 1 abandoned worker(s)").unwrap();
        assert!(summary < late, "{output}");
        assert!(output.ends_with("OK (timeouts=1)\n"), "{output}");
    }

    #[test]
    fn no_catch_lets_unexpected_errors_escape() {
        let class = TestClass::<Scenario>::new("Crashing").test("parses", parses);
        let registry = registry_of(vec![class]);
        let runner = RunCommandTestRunner {
            no_catch: true,
            ..Default::default()
        };
        let escaped = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let mut writer = Writer::capture();
            runner.run(&mut writer, &registry)
        }));
        assert!(escaped.is_err());
    }

    #[test]
    fn errors_are_reported_with_their_type() {
        let class = TestClass::<Scenario>::new("Parsing").test("parses", parses);
        let (status_code, output) = run(
            &RunCommandTestRunner::default(),
            &registry_of(vec![class]),
        );
        assert_eq!(status_code, StatusCode::TEST_FAILURE);
        assert!(output.contains("ERROR: Parsing::parses"), "{output}");
        assert!(output.contains("ParseIntError\nnumber too large"), "{output}");
    }

    #[test]
    fn configuration_file_and_xml_report() {
        let config = temp_path("config.json");
        let xml = temp_path("report.xml");
        std::fs::write(&config, r#"{ "dry_run": true, "precision": 1 }"#).unwrap();

        let runner = RunCommandTestRunner {
            config: Some(config.as_str()),
            xml: Some(xml.as_str()),
            ..Default::default()
        };
        let (status_code, output) = run(&runner, &registry_of(vec![scenario()]));
        assert_eq!(status_code, StatusCode::SUCCESS);
        assert!(output.contains("Ran 2 tests in 0.0s"), "{output}");

        let report = std::fs::read_to_string(&xml).unwrap();
        assert_eq!(report.matches("<testcase ").count(), 3);
        assert!(report.contains(r#"<testcase name="succeeds" classname="Scenario" time="0.0" timeout="0.0" timed_out="false"/>"#), "{report}");
        assert!(report.contains(r#"<skipped message="flaky"/>"#), "{report}");

        std::fs::remove_file(config).unwrap();
        std::fs::remove_file(xml).unwrap();
    }

    #[rstest]
    #[case(vec!["run", "--timeout=-1"])]
    #[case(vec!["run", "--threads", "0"])]
    #[case(vec!["run", "--config", "does/not/exist.json"])]
    fn harness_errors_use_the_error_status(#[case] args: Vec<&str>) {
        struct Raw<'args>(Vec<&'args str>);
        impl<'args> CommandTestRunner for Raw<'args> {
            fn build_args(&self) -> Vec<String> {
                self.0.iter().map(|arg| arg.to_string()).collect()
            }
        }

        let mut writer = Writer::capture();
        let status_code = Raw(args).run(&mut writer, &registry_of(vec![scenario()]));
        assert_eq!(status_code, StatusCode::HARNESS_ERROR);
        assert!(writer.err_contents().unwrap().starts_with("Error occurred "));
    }

    #[test]
    fn unknown_arguments_use_the_error_status() {
        struct Unknown;
        impl CommandTestRunner for Unknown {
            fn build_args(&self) -> Vec<String> {
                vec![String::from("run"), String::from("--frobnicate")]
            }
        }
        let mut writer = Writer::capture();
        assert_eq!(
            Unknown.run(&mut writer, &registry_of(vec![scenario()])),
            StatusCode::HARNESS_ERROR
        );
    }
}
