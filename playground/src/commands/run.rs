use crate::app_state::AppState;
use crate::code_runner::CodeRunOutcome;

use super::{render_report, CommandOutput, ExitStatus};

pub async fn run_code(app: &AppState, source: &str) -> Result<CommandOutput, String> {
    let outcome = app.code_runner.run(source).await.map_err(|e| e.to_string())?;
    Ok(render_run(&outcome))
}

/// Program output on stdout, then the value of a trailing expression.
/// Errors and warnings go to stderr.
pub fn render_run(outcome: &CodeRunOutcome) -> CommandOutput {
    let mut out = CommandOutput::default();

    match outcome {
        CodeRunOutcome::Invalid(report) => {
            render_report(report, &mut out);
            out.status = ExitStatus::Invalid;
        }
        CodeRunOutcome::Executed { warnings, result } => {
            for warning in warnings {
                out.push_stderr(&format!("⚠️ {}", warning));
            }
            out.push_stdout(&result.output);

            if result.success {
                if let Some(value) = &result.result {
                    out.push_stdout(value);
                }
            } else {
                out.push_stderr(&format!("❌ {}", result.error_text()));
                out.status = ExitStatus::Failure;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ExecutionResult, ValidationReport};

    #[test]
    fn test_render_success_with_value() {
        let outcome = CodeRunOutcome::Executed {
            warnings: vec![],
            result: ExecutionResult::completed("hello\n", Some("42".to_string())),
        };
        let out = render_run(&outcome);
        assert_eq!(out.stdout, "hello\n42\n");
        assert!(out.stderr.is_empty());
        assert_eq!(out.status, ExitStatus::Success);
    }

    #[test]
    fn test_render_failure_keeps_partial_output() {
        let outcome = CodeRunOutcome::Executed {
            warnings: vec!["Use of the \"os\" module detected".to_string()],
            result: ExecutionResult::failed("partial\n", "NameError: name 'y' is not defined"),
        };
        let out = render_run(&outcome);
        assert_eq!(out.stdout, "partial\n");
        assert!(out.stderr.contains("⚠️ Use of the \"os\" module detected\n"));
        assert!(out.stderr.ends_with("❌ NameError: name 'y' is not defined\n"));
        assert_eq!(out.status, ExitStatus::Failure);
    }

    #[test]
    fn test_render_invalid() {
        let report = ValidationReport::from_findings(vec!["Code is empty".to_string()], vec![]);
        let out = render_run(&CodeRunOutcome::Invalid(report));
        assert_eq!(out.status, ExitStatus::Invalid);
        assert!(out.stdout.is_empty());
    }
}
