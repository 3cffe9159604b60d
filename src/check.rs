//! `check`: evaluates the enabled families natively over a source tree.
//!
//! Every JavaScript/TypeScript file under the target path is parsed into a
//! [`SyntaxTree`] and searched with [`find_violations`]. The result is a
//! [`CheckReport`], which converts into CI [`Finding`]s and is rendered in
//! the requested output format.

use crate::chain::find_violations;
use crate::ci_report::{
    Finding, Location, Severity, ToFindings, fingerprint, normalize_repo_relative, to_junit,
    to_sarif,
};
use crate::cli::{CheckArgs, CheckOutputFormat};
use crate::cli_report::{render_cli_table, render_summary_line};
use crate::config_hierarchy::find_git_repo_root;
use crate::error::{GuardError, Result};
use crate::family::{DiagnosticSeverity, OperationFamily, RuleKind};
use crate::file_utils::collect_all_scripts;
use crate::git_utils::{filter_script_files, get_staged_files};
use crate::receiver::ReceiverScope;
use crate::rule::Rule;
use crate::rule_error;
use crate::syntax::{SourceDialect, SyntaxTree};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One unguarded mutation found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    pub kind: RuleKind,
    /// Path relative to the check root, with forward slashes.
    pub path: String,
    pub line: usize,
    pub column: usize,
    /// Source text of the receiver bound to `$obj`.
    pub receiver: String,
}

impl ViolationRecord {
    pub fn location(&self) -> Location {
        Location::with_position(self.path.clone(), self.line, self.column)
    }
}

/// Output of [`GuardCheckRule::analyze`].
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub files_checked: usize,
    pub severity: DiagnosticSeverity,
    /// Sorted by path, line and column.
    pub violations: Vec<ViolationRecord>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        !self.violations.is_empty() && Severity::from(self.severity).is_error()
    }
}

impl ToFindings for CheckReport {
    fn to_findings(&self) -> Vec<Finding> {
        self.violations
            .iter()
            .map(|violation| {
                let definition = violation.kind.definition();
                let location = violation.location();
                Finding {
                    rule_id: definition.id.to_string(),
                    rule_name: definition.name.to_string(),
                    severity: self.severity.into(),
                    message: definition.message.to_string(),
                    fingerprint: Some(fingerprint(definition.id, &location)),
                    location: Some(location),
                    help_uri: Some(definition.help_uri.to_string()),
                }
            })
            .collect()
    }
}

/// Checks a single source text. Paths in the returned records are `label`.
///
/// Sources that only parse with recovery are still checked.
///
/// ```
/// use whereguard_core::check::check_source;
/// use whereguard_core::family::FamilySelection;
/// use whereguard_core::receiver::ReceiverScope;
/// use whereguard_core::syntax::SourceDialect;
///
/// let families = FamilySelection::default().families();
/// let records = check_source(
///     "await db.delete(users);\nawait db.delete(users).where(eq(users.id, 1));\n",
///     SourceDialect::TypeScript,
///     &families,
///     &ReceiverScope::unrestricted(),
///     "queries.ts",
/// )?;
/// assert_eq!(records.len(), 1);
/// assert_eq!((records[0].line, records[0].column), (1, 7));
/// # Ok::<(), whereguard_core::error::GuardError>(())
/// ```
pub fn check_source(
    source: &str,
    dialect: SourceDialect,
    families: &[OperationFamily],
    scope: &ReceiverScope,
    label: &str,
) -> Result<Vec<ViolationRecord>> {
    let tree = SyntaxTree::parse(source, dialect)?;
    if tree.has_errors() {
        tracing::warn!(file = label, "Source has syntax errors, checking recovered tree");
    }
    Ok(find_violations(&tree, families, scope)
        .into_iter()
        .map(|violation| ViolationRecord {
            kind: violation.kind,
            path: label.to_string(),
            line: violation.span.line,
            column: violation.span.column,
            receiver: violation.receiver,
        })
        .collect())
}

#[tracing::instrument(level = "debug", skip(families, scope), fields(file = %path.display()))]
fn check_file(
    path: &Path,
    base: &Path,
    families: &[OperationFamily],
    scope: &ReceiverScope,
) -> Result<Vec<ViolationRecord>> {
    let Some(dialect) = SourceDialect::from_path(path) else {
        return Ok(Vec::new());
    };
    let source = fs::read_to_string(path)
        .map_err(|e| GuardError::io_error_with_source("read source file", path.to_path_buf(), e))?;
    let label = normalize_repo_relative(path, base);
    check_source(&source, dialect, families, scope, &label).map_err(|e| match e {
        GuardError::ParseError { context, source, .. } => GuardError::ParseError {
            file: Some(path.to_path_buf()),
            context,
            source,
        },
        other => other,
    })
}

/// Natively checks sources for mutations with no `.where()` in their chain.
#[derive(Debug, Default)]
pub struct GuardCheckRule;

impl GuardCheckRule {
    pub fn new() -> Self {
        Self
    }

    /// Files to check, and the directory their report paths are relative to.
    fn targets(&self, args: &CheckArgs) -> Result<(Vec<PathBuf>, PathBuf)> {
        if args.staged {
            let base = find_git_repo_root()?.unwrap_or_else(|| PathBuf::from("."));
            let files = filter_script_files(&get_staged_files()?)
                .into_iter()
                .map(|file| base.join(file))
                .filter(|file| file.is_file())
                .collect();
            return Ok((files, base));
        }

        if !args.path.exists() {
            return Err(GuardError::invalid_input_with_arg(
                "path does not exist",
                args.path.display().to_string(),
            ));
        }
        let base = if args.path.is_dir() {
            args.path.clone()
        } else {
            args.path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        let mut files = Vec::new();
        collect_all_scripts(&args.path, &mut files).map_err(|e| GuardError::IoError {
            operation: format!("collect sources: {e:#}"),
            path: Some(args.path.clone()),
            source: None,
        })?;
        Ok((files, base))
    }

    /// Renders `report` in `format`.
    pub fn render(&self, report: &CheckReport, format: CheckOutputFormat) -> Result<String> {
        let findings = report.to_findings();
        let rendered = match format {
            CheckOutputFormat::Table if findings.is_empty() => format!(
                "No unguarded mutations found ({} file{} checked).\n",
                report.files_checked,
                if report.files_checked == 1 { "" } else { "s" }
            ),
            CheckOutputFormat::Table => render_cli_table(&findings),
            CheckOutputFormat::Summary => format!("{}\n", render_summary_line(&findings)),
            CheckOutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(report)?),
            CheckOutputFormat::Yaml => serde_yaml::to_string(report)?,
            CheckOutputFormat::Sarif => to_sarif(&findings)?,
            CheckOutputFormat::Junit => to_junit(&findings, "whereguard")?,
        };
        Ok(rendered)
    }
}

impl Rule for GuardCheckRule {
    type Config = CheckArgs;
    type Data = CheckReport;

    fn name() -> &'static str {
        "check"
    }

    fn description() -> &'static str {
        "Reports delete/update calls whose chain has no .where() guard"
    }

    #[tracing::instrument(level = "debug", skip_all, err)]
    fn run(&self, args: &CheckArgs) -> Result<()> {
        let report = self.analyze(args)?;
        let output = self.render(&report, args.output)?;

        match &args.output_file {
            Some(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent).map_err(|e| {
                        GuardError::io_error_with_source(
                            "create report directory",
                            parent.to_path_buf(),
                            e,
                        )
                    })?;
                }
                fs::write(path, &output).map_err(|e| {
                    GuardError::io_error_with_source("write report", path.clone(), e)
                })?;
                tracing::info!(path = %path.display(), "Wrote check report");
            }
            None => print!("{output}"),
        }

        if report.has_errors() {
            return Err(rule_error!(
                Self::name(),
                "{}",
                render_summary_line(&report.to_findings())
            ));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %args.path.display(), staged = args.staged))]
    fn analyze(&self, args: &CheckArgs) -> Result<CheckReport> {
        let families = args.rules.families().enabled_families()?;
        let scope = ReceiverScope::new(&args.rules.object_names);
        let (files, base) = self.targets(args)?;

        let mut violations = Vec::new();
        for file in &files {
            violations.extend(check_file(file, &base, &families, &scope)?);
        }
        violations.sort_by(|a, b| {
            (&a.path, a.line, a.column, a.kind).cmp(&(&b.path, b.line, b.column, b.kind))
        });

        tracing::debug!(
            files = files.len(),
            violations = violations.len(),
            "Finished check"
        );
        Ok(CheckReport {
            files_checked: files.len(),
            severity: args.rules.severity.unwrap_or_default(),
            violations,
        })
    }
}
