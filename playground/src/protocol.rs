use serde::{Deserialize, Serialize};

pub use python_sandbox::ExecutionResult;

// ============ Test Conventions ============

/// How tests are discovered in user source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// Top-level zero-argument callables named `test_*`
    Simple,
    /// `unittest.TestCase` subclasses loaded by the framework's loader
    Structured,
}

impl Convention {
    pub fn label(&self) -> &'static str {
        match self {
            Convention::Simple => "test functions",
            Convention::Structured => "unittest",
        }
    }
}

/// A test found during discovery, identified by its qualified name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestHandle(pub String);

impl TestHandle {
    pub fn name(&self) -> &str {
        &self.0
    }
}

// ============ Results ============

/// One row per discovered test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,
    pub message: String,
    /// Full traceback text, present only for failing tests
    #[serde(default)]
    pub error: Option<String>,
    #[serde(
        default,
        rename = "duration",
        alias = "durationMs",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_ms: Option<f64>,
}

impl TestOutcome {
    /// Outcome for a test whose invocation never produced a result row
    pub fn errored(name: impl Into<String>, detail: &str, trace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: format!("Error: {}", detail),
            error: Some(trace.into()),
            duration_ms: None,
        }
    }
}

/// Aggregate over all outcomes of one run. Built fresh per run and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunSummary {
    pub total: usize,
    pub passed: usize,
    /// Assertion failures (and, for the simple convention, errors too)
    pub failed: usize,
    /// Uncaught non-assertion exceptions, structured convention only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<usize>,
    pub tests: Vec<TestOutcome>,
    #[serde(default, rename = "success_rate", alias = "successRate")]
    pub success_rate: f64,
    #[serde(
        default,
        rename = "duration",
        alias = "durationMs",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_ms: Option<f64>,
    /// Explanation shown when no tests were found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `round(passed / total * 100, 1)`, or 0 when nothing ran
pub fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64 * 1000.0).round() / 10.0
}

impl TestRunSummary {
    /// A run that found nothing to execute. Not an error.
    pub fn no_tests(convention: Convention, message: impl Into<String>) -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: 0,
            errors: match convention {
                Convention::Simple => None,
                Convention::Structured => Some(0),
            },
            tests: Vec::new(),
            success_rate: 0.0,
            duration_ms: None,
            message: Some(message.into()),
        }
    }

    /// Summary for the simple convention, where every non-passing row counts
    /// as failed. Row order is preserved.
    pub fn from_outcomes(tests: Vec<TestOutcome>) -> Self {
        let total = tests.len();
        let passed = tests.iter().filter(|t| t.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            errors: None,
            tests,
            success_rate: success_rate(passed, total),
            duration_ms: None,
            message: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Check the counting identities of a decoded summary
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.tests.len() != self.total {
            return Err(format!(
                "total is {} but {} test rows were reported",
                self.total,
                self.tests.len()
            ));
        }

        let errors = self.errors.unwrap_or(0);
        if self.passed + self.failed + errors != self.total {
            return Err(format!(
                "passed ({}) + failed ({}) + errors ({}) does not equal total ({})",
                self.passed, self.failed, errors, self.total
            ));
        }

        let passing_rows = self.tests.iter().filter(|t| t.passed).count();
        if passing_rows != self.passed {
            return Err(format!(
                "passed is {} but {} rows are marked as passed",
                self.passed, passing_rows
            ));
        }

        if let Some(test) = self
            .tests
            .iter()
            .find(|t| t.passed == t.error.is_some())
        {
            return Err(format!(
                "test '{}' has passed={} with error {}",
                test.name,
                test.passed,
                if test.error.is_some() { "set" } else { "missing" }
            ));
        }

        Ok(())
    }

    /// Decode a summary produced by the Python harness
    pub fn decode(raw: &str) -> Result<Self, String> {
        let mut summary: TestRunSummary =
            serde_json::from_str(raw).map_err(|e| format!("Could not parse test results: {}", e))?;
        summary
            .check_consistency()
            .map_err(|e| format!("Could not parse test results: {}", e))?;
        summary.success_rate = success_rate(summary.passed, summary.total);
        Ok(summary)
    }

    /// Wire encoding of the summary
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ============ Validation ============

/// Number of test definitions spotted in the raw text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCounts {
    pub simple: usize,
    pub structured: usize,
    pub total: usize,
}

/// Result of inspecting source text before execution.
///
/// `valid` is false iff `errors` is non-empty; warnings never block a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_simple_tests: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_structured_tests: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_counts: Option<TestCounts>,
}

impl ValidationReport {
    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            ..Default::default()
        }
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.valid = false;
    }

    /// Convention the test runner should use; structured wins when both apply
    pub fn convention(&self) -> Convention {
        if self.has_structured_tests.unwrap_or(false) {
            Convention::Structured
        } else {
            Convention::Simple
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(name: &str, passed: bool) -> TestOutcome {
        TestOutcome {
            name: name.to_string(),
            passed,
            message: if passed {
                "Test executed successfully".to_string()
            } else {
                "Assertion failed: no message".to_string()
            },
            error: if passed { None } else { Some("Traceback".to_string()) },
            duration_ms: None,
        }
    }

    #[test]
    fn test_success_rate_rounding() {
        assert_eq!(success_rate(3, 4), 75.0);
        assert_eq!(success_rate(2, 3), 66.7);
        assert_eq!(success_rate(1, 3), 33.3);
        assert_eq!(success_rate(0, 0), 0.0);
    }

    #[test]
    fn test_from_outcomes_counts() {
        let summary = TestRunSummary::from_outcomes(vec![
            outcome("test_a", true),
            outcome("test_b", false),
            outcome("test_c", true),
            outcome("test_d", true),
        ]);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success_rate, 75.0);
        assert_eq!(summary.tests[1].name, "test_b");
        assert!(summary.check_consistency().is_ok());
    }

    #[test]
    fn test_no_tests_shape() {
        let summary = TestRunSummary::no_tests(Convention::Structured, "No unittest test cases found");
        assert_eq!(summary.total, 0);
        assert_eq!(summary.errors, Some(0));
        assert!(summary.tests.is_empty());
        assert_eq!(summary.success_rate, 0.0);
        assert!(summary.check_consistency().is_ok());
    }

    #[test]
    fn test_wire_field_names() {
        let mut passing = outcome("test_a", true);
        passing.duration_ms = Some(0.5);
        let summary = TestRunSummary::from_outcomes(vec![passing]).with_duration_ms(2.0);
        let value: serde_json::Value = serde_json::from_str(&summary.encode()).unwrap();

        assert_eq!(value["success_rate"], json!(100.0));
        assert_eq!(value["duration"], json!(2.0));
        assert!(value["tests"][0]["error"].is_null());
        assert_eq!(value["tests"][0]["duration"], json!(0.5));
        assert!(value.get("errors").is_none());
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_decode_accepts_camel_case_aliases() {
        let raw = r#"{
            "total": 1, "passed": 1, "failed": 0,
            "tests": [{"name": "test_a", "passed": true, "message": "ok", "durationMs": 1.5}],
            "successRate": 100
        }"#;
        let summary = TestRunSummary::decode(raw).unwrap();
        assert_eq!(summary.tests[0].duration_ms, Some(1.5));
        assert_eq!(summary.success_rate, 100.0);
    }

    #[test]
    fn test_decode_rejects_malformed_text() {
        let err = TestRunSummary::decode("not json at all").unwrap_err();
        assert!(err.starts_with("Could not parse test results"));
    }

    #[test]
    fn test_decode_rejects_inconsistent_counts() {
        let raw = r#"{"total": 2, "passed": 2, "failed": 0, "tests": [
            {"name": "A.test_x", "passed": true, "message": "Test passed", "error": null}
        ]}"#;
        assert!(TestRunSummary::decode(raw).is_err());

        let missing_trace = r#"{"total": 1, "passed": 0, "failed": 1, "tests": [
            {"name": "A.test_x", "passed": false, "message": "Assertion failed: x", "error": null}
        ]}"#;
        assert!(TestRunSummary::decode(missing_trace).is_err());
    }

    #[test]
    fn test_report_convention_prefers_structured() {
        let mut report = ValidationReport::from_findings(vec![], vec![]);
        report.has_simple_tests = Some(true);
        report.has_structured_tests = Some(true);
        assert_eq!(report.convention(), Convention::Structured);

        report.has_structured_tests = Some(false);
        assert_eq!(report.convention(), Convention::Simple);
    }

    #[test]
    fn test_report_push_error_invalidates() {
        let mut report = ValidationReport::from_findings(vec![], vec!["warning".to_string()]);
        assert!(report.valid);
        report.push_error("No tests found");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }
}
