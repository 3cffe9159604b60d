//! Terminal output for `check`.
//!
//! One row per unguarded mutation, showing severity, diagnostic id, the
//! `path:line:column` of the call, the message and a documentation link.

use crate::ci_report::{Finding, Severity};
use prettytable::{Attr, Cell, Row, Table, format};

/// Maximum width for the message column before truncation.
const MAX_MESSAGE_WIDTH: usize = 60;

fn truncate_message(message: &str) -> String {
    if message.chars().count() > MAX_MESSAGE_WIDTH {
        let head: String = message.chars().take(MAX_MESSAGE_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}

const fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "ERR",
        Severity::Warning => "WARN",
        Severity::Note => "NOTE",
    }
}

const fn severity_color(severity: Severity) -> Attr {
    match severity {
        Severity::Error => Attr::ForegroundColor(prettytable::color::RED),
        Severity::Warning => Attr::ForegroundColor(prettytable::color::YELLOW),
        Severity::Note => Attr::ForegroundColor(prettytable::color::BLUE),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn counts(findings: &[Finding]) -> (usize, usize, usize) {
    findings
        .iter()
        .fold((0, 0, 0), |(e, w, n), f| match f.severity {
            Severity::Error => (e + 1, w, n),
            Severity::Warning => (e, w + 1, n),
            Severity::Note => (e, w, n + 1),
        })
}

/// Renders a single-line summary of findings, for pre-commit hooks.
///
/// ```rust
/// use whereguard_core::cli_report::render_summary_line;
/// use whereguard_core::ci_report::{Finding, Severity, Location};
///
/// let findings = vec![Finding {
///     rule_id: "enforce-update-with-where".to_string(),
///     rule_name: "Enforce update with where".to_string(),
///     severity: Severity::Error,
///     message: "Missing .where() clause".to_string(),
///     location: Some(Location::with_position("src/db.ts".to_string(), 4, 1)),
///     help_uri: None,
///     fingerprint: None,
/// }];
///
/// assert_eq!(
///     render_summary_line(&findings),
///     "1 unguarded mutation (1 error, 0 warnings, 0 notes)"
/// );
/// ```
#[must_use]
pub fn render_summary_line(findings: &[Finding]) -> String {
    let total = findings.len();
    let (errors, warnings, notes) = counts(findings);
    format!(
        "{} unguarded mutation{} ({} error{}, {} warning{}, {} note{})",
        total,
        plural(total),
        errors,
        plural(errors),
        warnings,
        plural(warnings),
        notes,
        plural(notes),
    )
}

/// Renders findings as a table, in the order given, followed by a summary
/// row. An empty slice renders a header-only table.
#[must_use]
pub fn render_cli_table(findings: &[Finding]) -> String {
    let mut table = Table::new();
    table.set_format(
        format::FormatBuilder::new()
            .separator(
                format::LinePosition::Top,
                format::LineSeparator::new('─', '┬', '┌', '┐'),
            )
            .separator(
                format::LinePosition::Title,
                format::LineSeparator::new('═', '╪', '╞', '╡'),
            )
            .separator(
                format::LinePosition::Intern,
                format::LineSeparator::new('─', '┼', '├', '┤'),
            )
            .separator(
                format::LinePosition::Bottom,
                format::LineSeparator::new('─', '┴', '└', '┘'),
            )
            .padding(1, 1)
            .build(),
    );

    table.set_titles(Row::new(vec![
        Cell::new("Severity").with_style(Attr::Bold),
        Cell::new("Rule").with_style(Attr::Bold),
        Cell::new("Location").with_style(Attr::Bold),
        Cell::new("Issue").with_style(Attr::Bold),
        Cell::new("Docs").with_style(Attr::Bold),
    ]));

    for finding in findings {
        let location = finding
            .location
            .as_ref()
            .map(|loc| loc.display())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(Row::new(vec![
            Cell::new(severity_label(finding.severity))
                .with_style(severity_color(finding.severity)),
            Cell::new(&finding.rule_id),
            Cell::new(&location),
            Cell::new(&truncate_message(&finding.message)),
            Cell::new(finding.help_uri.as_deref().unwrap_or("-")),
        ]));
    }

    if !findings.is_empty() {
        table.add_row(Row::new(vec![
            Cell::new(&format!("Summary: {}", render_summary_line(findings)))
                .with_style(Attr::Bold),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
        ]));
    }

    table.to_string()
}
