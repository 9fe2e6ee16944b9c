//! Plain-text rendering of harness failures and summaries.

use crate::failures::HarnessResult;
use crate::runner::FieldCheck;

/// Format a failed check with the sentence it came from.
pub fn format_failure(fixture_name: &str, check: &FieldCheck, text: Option<&str>) -> String {
    let mut output = format!("\nFAIL: {}:{}\n", fixture_name, check.key);
    if let Some(text) = text {
        output.push_str(&format!("  {}\n", text));
    }
    output.push_str(&format!(
        "  \u{2717} {}: expected {:?}, got {:?}\n",
        check.key.field, check.expected, check.actual
    ));
    output
}

/// One-line status plus counts for a fixture.
pub fn format_summary(fixture_name: &str, result: &HarnessResult) -> String {
    let status = if result.success() { "PASS" } else { "FAIL" };
    format!(
        "\n{}: {}\n  {} passed, {} failed ({} expected, {} regressions)\n",
        status,
        fixture_name,
        result.passed,
        result.failed(),
        result.expected_failures,
        result.regressions
    )
}
