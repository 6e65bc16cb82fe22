use crate::protocol::ValidationReport;
use crate::settings::PlaygroundSettings;
use crate::validation::{validate_code, validate_test_code};

use super::{render_report, CommandOutput, ExitStatus};

pub fn validate(settings: &PlaygroundSettings, source: &str, tests: bool) -> CommandOutput {
    let limits = settings.validation_limits();
    let report = if tests {
        validate_test_code(source, limits)
    } else {
        validate_code(source, limits)
    };
    render_validation(&report)
}

pub fn render_validation(report: &ValidationReport) -> CommandOutput {
    let mut out = CommandOutput::default();
    render_report(report, &mut out);

    if !report.valid {
        out.status = ExitStatus::Invalid;
        return out;
    }

    out.push_stdout("✅ Code is valid");
    if let Some(counts) = report.test_counts {
        out.push_stdout(&format!(
            "Tests detected: {} (test functions: {}, unittest methods: {})",
            counts.total, counts.simple, counts.structured
        ));
        out.push_stdout(&format!("Convention: {}", report.convention().label()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_code() {
        let out = validate(&PlaygroundSettings::default(), "print(1)", false);
        assert_eq!(out.stdout, "✅ Code is valid\n");
        assert_eq!(out.status, ExitStatus::Success);
    }

    #[test]
    fn test_test_mode_reports_counts() {
        let out = validate(
            &PlaygroundSettings::default(),
            "def test_a():\n    pass\n\ndef test_b():\n    pass\n",
            true,
        );
        assert!(out.stdout.contains("Tests detected: 2"));
        assert!(out.stdout.contains("Convention: test functions"));
    }

    #[test]
    fn test_missing_tests_is_invalid() {
        let out = validate(&PlaygroundSettings::default(), "x = 1", true);
        assert_eq!(out.status, ExitStatus::Invalid);
        assert!(out.stderr.starts_with("❌ No tests found"));
    }
}
