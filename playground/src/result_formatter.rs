//! Rendering of test run summaries.
//!
//! Both functions are pure: the same summary always renders the same way.

use serde::Serialize;

use crate::protocol::TestRunSummary;

const HEADER: &str = "🧪 TEST RESULTS";
const RULE_WIDTH: usize = 50;

/// Render a summary as the text shown in the output panel.
///
/// One line per test in run order, with the failure message indented
/// beneath failing entries and a blank line between tests.
pub fn format_test_results(summary: &TestRunSummary) -> String {
    let mut output = format!("{}\n{}\n", HEADER, "=".repeat(RULE_WIDTH));

    output.push_str(&format!(
        "Total: {} | Passed: {} | Failed: {}",
        summary.total, summary.passed, summary.failed
    ));
    if let Some(errors) = summary.errors {
        output.push_str(&format!(" | Errors: {}", errors));
    }
    output.push('\n');
    output.push_str(&format!("Success rate: {}%\n\n", summary.success_rate));

    if summary.tests.is_empty() {
        if let Some(message) = &summary.message {
            output.push_str(message);
            output.push('\n');
        }
        return output;
    }

    for (index, test) in summary.tests.iter().enumerate() {
        let status = if test.passed { "✅" } else { "❌" };
        let duration = match test.duration_ms {
            Some(ms) if ms > 0.0 => format!(" ({}ms)", ms),
            _ => String::new(),
        };
        output.push_str(&format!("{} {}{}\n", status, test.name, duration));

        if !test.passed && !test.message.is_empty() {
            output.push_str(&format!("   └─ {}\n", test.message));
        }

        if index + 1 < summary.tests.len() {
            output.push('\n');
        }
    }

    output
}

/// Overall verdict used to colour the summary panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Good,
    Fair,
    Poor,
}

impl Health {
    pub fn from_success_rate(rate: f64) -> Self {
        if rate >= 80.0 {
            Health::Good
        } else if rate >= 60.0 {
            Health::Fair
        } else {
            Health::Poor
        }
    }
}

/// The numbers shown in the summary panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryFields {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub success_rate: f64,
    pub duration_ms: f64,
    pub health: Health,
}

pub fn summary_fields(summary: &TestRunSummary) -> SummaryFields {
    SummaryFields {
        total: summary.total,
        passed: summary.passed,
        failed: summary.failed,
        errors: summary.errors.unwrap_or(0),
        success_rate: summary.success_rate,
        duration_ms: summary.duration_ms.unwrap_or(0.0),
        health: Health::from_success_rate(summary.success_rate),
    }
}
