// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod utils;

#[cfg(test)]
mod engine_tests {
    use crate::utils::{compares, naps, parses, registry_of, scenario, succeeds, Scenario};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use unit_harness::utils::writer::Writer;
    use unit_harness::{Coordinator, RunConfiguration, TestClass, TestDef, TestOutcome};

    fn coordinator(configuration: RunConfiguration) -> Arc<Coordinator> {
        Coordinator::with_writer(configuration, Writer::capture())
    }

    #[test]
    fn three_test_scenario() {
        let coordinator = coordinator(RunConfiguration::default());
        registry_of(vec![scenario()]).install(&coordinator);
        let results = coordinator.run_registered().unwrap();

        assert_eq!(results.n_tests, 2);
        assert_eq!(results.n_successes, 1);
        assert_eq!(results.n_failures, 1);
        assert_eq!(results.n_errors, 0);
        assert_eq!(results.n_skipped, 1);
        assert!(!results.successful);

        let compares = results.find("Scenario::compares").unwrap();
        assert_eq!(compares.outcome, TestOutcome::Failure);
        assert!(compares.message.contains("not equal to"), "{}", compares.message);
        assert_eq!(compares.assertion, "ensure_eq");
        assert!(compares.location.is_some());

        let flaky = results.find("Scenario::flaky").unwrap();
        assert_eq!(flaky.outcome, TestOutcome::Skipped);
        assert_eq!(flaky.skip_reason, "flaky");
        assert_eq!(flaky.message, "flaky");

        assert_eq!(
            coordinator.with_output(|out| out.contents().unwrap()),
            ".Fs"
        );
    }

    #[test]
    fn counters_stay_consistent() {
        let coordinator = coordinator(RunConfiguration {
            concurrent_threads: 3,
            ..Default::default()
        });
        let classes = (0..5)
            .map(|index| {
                TestClass::<Scenario>::new(&format!("Mixed{index}"))
                    .test("succeeds", succeeds)
                    .test("compares", compares)
                    .test("parses", parses)
                    .add(TestDef::new("later", succeeds).skipped("later"))
            })
            .collect();
        registry_of(classes).install(&coordinator);
        let results = coordinator.run_registered().unwrap();

        assert_eq!(results.n_tests, 15);
        assert_eq!(results.n_successes, 5);
        assert_eq!(results.n_failures, 5);
        assert_eq!(results.n_errors, 5);
        assert_eq!(results.n_skipped, 5);
        assert_eq!(
            results.n_successes + results.n_failures + results.n_errors,
            results.n_tests
        );
        assert_eq!(results.logs.len(), 20);
        assert!(results.n_timeouts <= results.n_tests);
        assert_eq!(results.successful, results.n_tests == results.n_successes);

        let parses = results.find("Mixed0::parses").unwrap();
        assert_eq!(parses.outcome, TestOutcome::Error);
        assert!(parses.error_type.ends_with("ParseIntError"), "{}", parses.error_type);
    }

    #[test]
    fn fail_stop_skips_everything_after_the_first_failure() {
        let coordinator = coordinator(RunConfiguration {
            stop_on_failure: true,
            ..Default::default()
        });
        let class = TestClass::<Scenario>::new("FailStop")
            .test("t1", succeeds)
            .test("t2", compares)
            .test("t3", succeeds)
            .test("t4", succeeds)
            .test("t5", succeeds);
        registry_of(vec![class]).install(&coordinator);
        let results = coordinator.run_registered().unwrap();

        assert_eq!(results.n_tests, 2);
        assert_eq!(results.n_failures, 1);
        assert_eq!(results.n_skipped, 3);
        assert_eq!(
            results
                .logs
                .iter()
                .map(|log| log.test_name.as_str())
                .collect::<Vec<_>>(),
            vec!["t1", "t2"]
        );
    }

    #[test]
    fn exact_name_runs_a_single_test() {
        let coordinator = coordinator(RunConfiguration {
            name_filter: String::from("Other"),
            test_name: String::from("Scenario::succeeds"),
            ..Default::default()
        });
        registry_of(vec![scenario()]).install(&coordinator);
        let results = coordinator.run_registered().unwrap();

        assert_eq!(results.n_tests, 1);
        assert_eq!(results.n_skipped, 2);
        assert!(results.successful);
        assert_eq!(results.logs.len(), 1);
    }

    #[test]
    fn timed_out_test_is_left_running_and_joined_later() {
        let coordinator = coordinator(RunConfiguration::default());
        let class = TestClass::<Scenario>::new("Slow")
            .add(TestDef::new("naps", naps).timeout(0.2))
            .test("succeeds", succeeds);
        registry_of(vec![class]).install(&coordinator);

        let started = Instant::now();
        let results = coordinator.run_registered().unwrap();
        assert!(started.elapsed() < Duration::from_millis(550));
        assert_eq!(results.n_tests, 1);
        assert!(results.find("Slow::naps").is_none());
        assert_eq!(coordinator.unresolved_count(), 1);

        assert_eq!(coordinator.join_unresolved(), 1);
        let late = coordinator.snapshot().since(&results);
        assert_eq!(late.n_tests, 1);
        assert_eq!(late.n_timeouts, 1);
        let naps = &late.logs[0];
        assert_eq!(naps.method_id, "Slow::naps");
        assert!(naps.timed_out);
        assert_eq!(naps.outcome, TestOutcome::Success);
        assert!(naps.duration >= 0.6, "{}", naps.duration);
    }

    #[test]
    fn dry_run_selects_without_running() {
        let coordinator = coordinator(RunConfiguration {
            dry_run: true,
            ..Default::default()
        });
        registry_of(vec![scenario()]).install(&coordinator);
        let results = coordinator.run_registered().unwrap();

        assert!(results.successful);
        assert_eq!(results.n_successes, 2);
        assert_eq!(results.n_skipped, 1);
        assert_eq!(results.duration, 0.0);
    }
}
