//! Name-prefix convention: top-level zero-argument `test_*` callables,
//! each invoked with its own backend call.

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use super::{decode_handles, python_literal, BatchContext, BatchError, TestStrategy};
use crate::protocol::{Convention, TestHandle, TestOutcome, TestRunSummary};

pub const NO_SIMPLE_TESTS_MESSAGE: &str =
    "No test functions found (names must start with \"test_\")";

pub struct SimpleStrategy;

#[async_trait]
impl TestStrategy for SimpleStrategy {
    fn convention(&self) -> Convention {
        Convention::Simple
    }

    fn empty_message(&self) -> &'static str {
        NO_SIMPLE_TESTS_MESSAGE
    }

    async fn discover(&self, ctx: &mut BatchContext<'_>) -> Result<Vec<TestHandle>, BatchError> {
        let raw = ctx.evaluate("_pg_discover_simple()").await?;
        decode_handles(&raw)
    }

    async fn execute(
        &self,
        ctx: &mut BatchContext<'_>,
        handles: &[TestHandle],
    ) -> Result<TestRunSummary, BatchError> {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(handles.len());

        for handle in handles {
            let call = format!("_pg_run_simple_test({})", python_literal(handle.name()));
            let result = ctx.execute(&call).await?;

            let outcome = if result.success {
                let raw = result.result.unwrap_or_default();
                decode_outcome(&raw)?
            } else {
                // Exceptions the harness cannot catch, e.g. SystemExit
                let trace = result.error_text();
                TestOutcome::errored(handle.name(), exception_text(trace), trace)
            };

            debug!(test = %outcome.name, passed = outcome.passed, "test finished");
            outcomes.push(outcome);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(TestRunSummary::from_outcomes(outcomes).with_duration_ms((elapsed_ms * 100.0).round() / 100.0))
    }
}

fn decode_outcome(raw: &str) -> Result<TestOutcome, BatchError> {
    let outcome: TestOutcome = serde_json::from_str(raw)
        .map_err(|e| BatchError::Decode(format!("Could not parse test results: {}", e)))?;
    if outcome.passed == outcome.error.is_some() {
        return Err(BatchError::Decode(format!(
            "Could not parse test results: test '{}' has passed={} with error {}",
            outcome.name,
            outcome.passed,
            if outcome.error.is_some() { "set" } else { "missing" }
        )));
    }
    Ok(outcome)
}

fn last_line(trace: &str) -> &str {
    trace
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("test did not complete")
}

/// Exception text from the last traceback line, without the `Type: ` prefix
fn exception_text(trace: &str) -> &str {
    let line = last_line(trace);
    match line.split_once(": ") {
        Some((kind, text)) if is_exception_name(kind) => text,
        _ if is_exception_name(line) => "",
        _ => line,
    }
}

fn is_exception_name(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{TestRunOutcome, TestRunner};
    use super::*;
    use crate::protocol::ExecutionResult;
    use std::sync::Arc;

    const SOURCE: &str = "def test_a():\n    pass\n\ndef test_b():\n    assert x == 1, 'x must be 1'\n";

    fn passing(name: &str) -> String {
        format!(
            r#"{{"name": "{}", "passed": true, "message": "Test executed successfully", "error": null, "duration": 0.12}}"#,
            name
        )
    }

    async fn completed(backend: ScriptedBackend) -> TestRunSummary {
        let runner = TestRunner::new(Arc::new(backend));
        match runner.run(SOURCE).await.unwrap() {
            TestRunOutcome::Completed(run) => {
                assert_eq!(run.convention, Convention::Simple);
                run.summary
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_outcomes_keep_discovery_order() {
        let summary = completed(ScriptedBackend::new(|source| match source {
            "_pg_discover_simple()" => value(r#"["test_a", "test_b"]"#),
            "_pg_run_simple_test(\"test_a\")" => value(&passing("test_a")),
            "_pg_run_simple_test(\"test_b\")" => value(
                r#"{"name": "test_b", "passed": false, "message": "Assertion failed: x must be 1",
                    "error": "Traceback...\nAssertionError: x must be 1", "duration": 0.3}"#,
            ),
            _ => ok(),
        }))
        .await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, None);
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.tests[0].name, "test_a");
        assert_eq!(summary.tests[0].duration_ms, Some(0.12));
        assert_eq!(summary.tests[1].message, "Assertion failed: x must be 1");
        assert!(summary.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_uncatchable_exit_becomes_error_row() {
        let summary = completed(ScriptedBackend::new(|source| match source {
            "_pg_discover_simple()" => value(r#"["test_a", "test_b"]"#),
            "_pg_run_simple_test(\"test_a\")" => ExecutionResult::failed(
                "",
                "Traceback (most recent call last):\n  File \"<playground>\", line 2\nSystemExit: 3\n",
            ),
            "_pg_run_simple_test(\"test_b\")" => value(&passing("test_b")),
            _ => ok(),
        }))
        .await;

        assert_eq!(summary.total, 2);
        assert!(!summary.tests[0].passed);
        assert_eq!(summary.tests[0].message, "Error: 3");
        assert!(summary.tests[0].error.as_deref().unwrap().contains("SystemExit"));
        assert!(summary.tests[1].passed);
    }

    #[tokio::test]
    async fn test_inconsistent_row_is_decode_failure() {
        let backend = ScriptedBackend::new(|source| match source {
            "_pg_discover_simple()" => value(r#"["test_a"]"#),
            "_pg_run_simple_test(\"test_a\")" => value(
                r#"{"name": "test_a", "passed": false, "message": "Error: boom", "error": null}"#,
            ),
            _ => ok(),
        });
        let runner = TestRunner::new(Arc::new(backend));

        assert!(matches!(
            runner.run(SOURCE).await.unwrap(),
            TestRunOutcome::DecodeFailed { .. }
        ));
    }

    #[test]
    fn test_last_line_skips_blank_lines() {
        assert_eq!(last_line("a\nValueError: bad\n\n"), "ValueError: bad");
        assert_eq!(last_line(""), "test did not complete");
    }

    #[test]
    fn test_exception_text_drops_type_prefix() {
        assert_eq!(exception_text("Traceback\nSystemExit: 3\n"), "3");
        assert_eq!(exception_text("Traceback\nmodule.CustomError: a: b"), "a: b");
        assert_eq!(exception_text("Traceback\nKeyboardInterrupt\n"), "");
        assert_eq!(exception_text(""), "test did not complete");
    }
}
