// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod utils;

#[cfg(test)]
mod list_command_tests {
    use crate::assert_output_from_str_eq;
    use crate::utils::{naps, registry_of, scenario, CommandTestRunner, Scenario, StatusCode};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use unit_harness::commands::LIST;
    use unit_harness::utils::writer::Writer;
    use unit_harness::{TestClass, TestDef};

    #[derive(Default)]
    struct ListCommandTestRunner<'args> {
        filter: Option<&'args str>,
        json: bool,
    }

    impl<'args> CommandTestRunner for ListCommandTestRunner<'args> {
        fn build_args(&self) -> Vec<String> {
            let mut args = vec![String::from(LIST)];
            if let Some(filter) = self.filter {
                args.push(String::from("--filter"));
                args.push(filter.to_string());
            }
            if self.json {
                args.push(String::from("--json"));
            }
            args
        }
    }

    fn registry() -> unit_harness::Registry {
        let slow = TestClass::<Scenario>::new("Slow").add(TestDef::new("naps", naps).timeout(0.5));
        registry_of(vec![scenario(), slow])
    }

    #[test]
    fn lists_tests_in_declaration_order() {
        let mut writer = Writer::capture();
        let status_code = ListCommandTestRunner::default().run(&mut writer, &registry());
        assert_eq!(status_code, StatusCode::SUCCESS);
        assert_output_from_str_eq!(
            indoc! {"
                Scenario::succeeds
                Scenario::compares
                Scenario::flaky [skipped: flaky]
                Slow::naps [timeout: 0.5s]
            "},
            writer
        );
    }

    #[test]
    fn listing_runs_nothing() {
        let mut writer = Writer::capture();
        let runner = ListCommandTestRunner {
            filter: Some("Slow"),
            ..Default::default()
        };
        let status_code = runner.run(&mut writer, &registry());
        assert_eq!(status_code, StatusCode::SUCCESS);
        assert_output_from_str_eq!("Slow::naps [timeout: 0.5s]\n", writer);
    }

    #[test]
    fn json_listing() {
        let mut writer = Writer::capture();
        let runner = ListCommandTestRunner {
            filter: Some("Scenario::fl"),
            json: true,
        };
        runner.run(&mut writer, &registry());
        let listing: serde_json::Value =
            serde_json::from_str(&writer.into_string().unwrap()).unwrap();
        assert_eq!(
            listing,
            serde_json::json!([{
                "class_name": "Scenario",
                "test_name": "flaky",
                "skip_reason": "flaky",
                "timeout": null
            }])
        );
    }
}
