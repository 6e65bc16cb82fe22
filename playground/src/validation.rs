//! Pre-execution checks on raw source text.
//!
//! Pure functions of the text: errors block execution, warnings only inform.

use lazy_static::lazy_static;
use regex::Regex;

use crate::protocol::{TestCounts, ValidationReport};

/// Default ceiling on source size, in characters
pub const MAX_SOURCE_CHARS: usize = 100_000;

pub const EMPTY_CODE_ERROR: &str = "Code is empty";
pub const NO_TESTS_ERROR: &str =
    "No tests found. Define functions starting with \"test_\" or use unittest";

lazy_static! {
    static ref RISK_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"\bimport\s+os\b").unwrap(),
            "Use of the \"os\" module detected",
        ),
        (
            Regex::new(r"\bfrom\s+os\s+import\b").unwrap(),
            "Import from the \"os\" module detected",
        ),
        (
            Regex::new(r"\bimport\s+subprocess\b").unwrap(),
            "Use of the \"subprocess\" module detected",
        ),
        (
            Regex::new(r"\bwhile\s+(True|1)\s*:").unwrap(),
            "Possible infinite loop detected (while True). Make sure it has an exit condition.",
        ),
        (
            Regex::new(r"\b(eval|exec)\s*\(").unwrap(),
            "Dynamic code execution (eval/exec) detected",
        ),
    ];
    static ref SIMPLE_TEST_DEF: Regex = Regex::new(r"def\s+test_\w+\s*\(").unwrap();
    static ref SIMPLE_TEST_NAME: Regex = Regex::new(r"def\s+test_\w+").unwrap();
    static ref STRUCTURED_TEST_METHOD: Regex = Regex::new(r"def\s+test\w*\s*\(").unwrap();
    static ref FRAMEWORK_IMPORT: Regex =
        Regex::new(r"import\s+unittest|from\s+unittest").unwrap();
    static ref TEST_CLASS: Regex = Regex::new(r"class\s+\w*Test\w*\s*\(").unwrap();
}

/// Limits applied while validating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_source_chars: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_source_chars: MAX_SOURCE_CHARS,
        }
    }
}

/// Validate source before a plain run.
///
/// Empty text short-circuits with a single error. The size check does not
/// short-circuit the warning scan.
pub fn validate_code(source: &str, limits: ValidationLimits) -> ValidationReport {
    if source.trim().is_empty() {
        return ValidationReport::from_findings(vec![EMPTY_CODE_ERROR.to_string()], Vec::new());
    }

    let warnings: Vec<String> = RISK_PATTERNS
        .iter()
        .filter(|(pattern, _)| pattern.is_match(source))
        .map(|(_, message)| message.to_string())
        .collect();

    let mut errors = Vec::new();
    if source.chars().count() > limits.max_source_chars {
        errors.push(format!(
            "Code is too long (maximum {} characters)",
            limits.max_source_chars
        ));
    }

    ValidationReport::from_findings(errors, warnings)
}

/// Validate source before a test run: the plain checks plus test detection
pub fn validate_test_code(source: &str, limits: ValidationLimits) -> ValidationReport {
    let mut report = validate_code(source, limits);
    if source.trim().is_empty() {
        report.has_simple_tests = Some(false);
        report.has_structured_tests = Some(false);
        return report;
    }

    let has_simple = SIMPLE_TEST_DEF.is_match(source);
    let has_framework = FRAMEWORK_IMPORT.is_match(source);
    let has_structured = has_framework && TEST_CLASS.is_match(source);

    if !has_simple && !has_framework {
        report.push_error(NO_TESTS_ERROR);
    }

    report.has_simple_tests = Some(has_simple);
    report.has_structured_tests = Some(has_structured);
    report.test_counts = Some(count_tests(source));
    report
}

/// Rough count of test definitions in the raw text
pub fn count_tests(source: &str) -> TestCounts {
    let simple = SIMPLE_TEST_NAME.find_iter(source).count();
    let structured = STRUCTURED_TEST_METHOD.find_iter(source).count();
    TestCounts {
        simple,
        structured,
        total: simple.max(structured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    #[test]
    fn test_empty_code_short_circuits() {
        let report = validate_code("   \n\t  ", limits());
        assert!(!report.valid);
        assert_eq!(report.errors, vec![EMPTY_CODE_ERROR.to_string()]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_clean_code_is_valid() {
        let report = validate_code("print('hello')", limits());
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_risk_patterns_warn_but_do_not_block() {
        let source = "import os\nimport subprocess\nwhile True:\n    eval('1')\n    break";
        let report = validate_code(source, limits());
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 4);
        assert!(report.warnings.iter().any(|w| w.contains("infinite loop")));
    }

    #[test]
    fn test_while_one_warns() {
        let report = validate_code("while 1:\n    pass", limits());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_oversized_code_errors_and_still_warns() {
        let source = format!("import os\n{}", "x = 1\n".repeat(20));
        let report = validate_code(&source, ValidationLimits { max_source_chars: 50 });
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("too long"));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_size_limit_counts_characters() {
        let source = "é".repeat(10);
        let report = validate_code(&source, ValidationLimits { max_source_chars: 10 });
        assert!(report.valid);
    }

    #[test]
    fn test_missing_tests_is_single_error() {
        let report = validate_test_code("def helper():\n    return 1\n", limits());
        assert!(!report.valid);
        assert_eq!(report.errors, vec![NO_TESTS_ERROR.to_string()]);
        assert_eq!(report.has_simple_tests, Some(false));
        assert_eq!(report.has_structured_tests, Some(false));
    }

    #[test]
    fn test_simple_tests_detected() {
        let report = validate_test_code("def test_add():\n    assert 1 + 1 == 2\n", limits());
        assert!(report.valid);
        assert_eq!(report.has_simple_tests, Some(true));
        assert_eq!(report.has_structured_tests, Some(false));
    }

    #[test]
    fn test_structured_tests_detected() {
        let source = "import unittest\n\nclass MathTest(unittest.TestCase):\n    def test_add(self):\n        self.assertEqual(2, 1 + 1)\n";
        let report = validate_test_code(source, limits());
        assert!(report.valid);
        assert_eq!(report.has_structured_tests, Some(true));
        assert_eq!(report.has_simple_tests, Some(true));
    }

    #[test]
    fn test_framework_import_alone_is_valid() {
        let report = validate_test_code("from unittest import TestCase\n", limits());
        assert!(report.valid);
        assert_eq!(report.has_structured_tests, Some(false));
    }

    #[test]
    fn test_count_tests() {
        let source = "def test_a():\n    pass\n\ndef test_b():\n    pass\n\nclass T:\n    def testThing(self):\n        pass\n";
        let counts = count_tests(source);
        assert_eq!(counts.simple, 2);
        assert_eq!(counts.structured, 3);
        assert_eq!(counts.total, 3);
    }
}
