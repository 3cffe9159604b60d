//! CI/CD Platform-Friendly Report Generation
//!
//! Provides SARIF and JUnit XML output formats for CI/CD integration.
//!
//! # Overview
//!
//! `check` converts its violations into format-agnostic [`Finding`]s through
//! the [`ToFindings`] trait. Findings can then be serialized to SARIF (GitHub
//! code scanning) or JUnit XML (most CI test report widgets).
//!
//! # Example
//!
//! ```rust
//! use whereguard_core::ci_report::{Finding, Location, Severity, to_junit, to_sarif};
//!
//! let findings = vec![Finding {
//!     rule_id: "enforce-delete-with-where".to_string(),
//!     rule_name: "Enforce delete with where".to_string(),
//!     severity: Severity::Error,
//!     message: "Missing .where() clause".to_string(),
//!     location: Some(Location::with_position("src/db.ts".to_string(), 3, 1)),
//!     help_uri: Some("https://orm.drizzle.team/docs/delete".to_string()),
//!     fingerprint: Some("unique-id".to_string()),
//! }];
//!
//! let sarif = to_sarif(&findings)?;
//! let junit = to_junit(&findings, "whereguard")?;
//! assert!(sarif.contains("enforce-delete-with-where"));
//! assert!(junit.contains("<failure"));
//! # Ok::<(), whereguard_core::error::GuardError>(())
//! ```

use crate::error::{GuardError, Result};
use crate::family::DiagnosticSeverity;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Severity level for CI report findings.
///
/// - **Error**: Fails the build (SARIF `error`, JUnit `<failure>`)
/// - **Warning**: Informational only (SARIF `warning`, JUnit `<system-out>`)
/// - **Note**: Informational (SARIF `note`, JUnit passed test)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    /// Returns the SARIF level string for this severity.
    #[must_use]
    pub const fn to_sarif_level(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        }
    }

    /// Returns whether this severity should cause a CI failure.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl From<DiagnosticSeverity> for Severity {
    fn from(severity: DiagnosticSeverity) -> Self {
        match severity {
            DiagnosticSeverity::Error => Self::Error,
            DiagnosticSeverity::Warn => Self::Warning,
            DiagnosticSeverity::Info => Self::Note,
        }
    }
}

/// One reported unguarded mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Diagnostic identifier, e.g. `enforce-delete-with-where`.
    /// Used as `ruleId` in SARIF output.
    pub rule_id: String,

    /// Human-readable name of the rule.
    pub rule_name: String,

    pub severity: Severity,

    pub message: String,

    pub location: Option<Location>,

    /// Optional URI to documentation about this rule.
    pub help_uri: Option<String>,

    /// Stable fingerprint for deduplication.
    /// Maps to SARIF `partialFingerprints`.
    pub fingerprint: Option<String>,
}

/// Location information for a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Repo-relative file path (e.g., "src/db.ts").
    /// Paths are normalized to use forward slashes on all platforms.
    pub uri: String,

    /// Optional start line number (1-indexed).
    pub start_line: Option<usize>,

    /// Optional start column (1-indexed).
    pub start_column: Option<usize>,
}

impl Location {
    /// Creates a new location with just a URI.
    #[must_use]
    pub fn new(uri: String) -> Self {
        Self {
            uri,
            start_line: None,
            start_column: None,
        }
    }

    /// Creates a new location pointing at a line and column.
    #[must_use]
    pub fn with_position(uri: String, line: usize, column: usize) -> Self {
        Self {
            uri,
            start_line: Some(line),
            start_column: Some(column),
        }
    }

    /// `uri:line:column`, omitting the parts that are unknown.
    #[must_use]
    pub fn display(&self) -> String {
        match (self.start_line, self.start_column) {
            (Some(line), Some(column)) => format!("{}:{}:{}", self.uri, line, column),
            (Some(line), None) => format!("{}:{}", self.uri, line),
            _ => self.uri.clone(),
        }
    }
}

/// Trait for converting rule data to CI findings.
pub trait ToFindings {
    /// Converts the rule's output data into a list of findings.
    fn to_findings(&self) -> Vec<Finding>;
}

/// Normalizes a path to repo-relative format with forward slashes.
///
/// ```
/// use whereguard_core::ci_report::normalize_repo_relative;
/// use std::path::Path;
///
/// let repo_root = Path::new("/home/dev/shop");
/// let file_path = Path::new("/home/dev/shop/src/db/orders.ts");
/// assert_eq!(normalize_repo_relative(file_path, repo_root), "src/db/orders.ts");
/// ```
#[must_use]
pub fn normalize_repo_relative(path: &Path, repo_root: &Path) -> String {
    let normalized = path
        .strip_prefix(repo_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");
    match normalized.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => normalized,
    }
}

/// Stable fingerprint for a finding: SHA-256 over rule id and position.
#[must_use]
pub fn fingerprint(rule_id: &str, location: &Location) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_id.as_bytes());
    hasher.update(b":");
    hasher.update(location.display().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Converts findings to SARIF v2.1.0 format.
///
/// - `tool.driver.name` = "whereguard"
/// - `tool.driver.rules[]` = de-duplicated rule ids, sorted
/// - `results[]` = one entry per finding, in input order
/// - `results[].partialFingerprints["primaryLocation"]` = finding's fingerprint
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_sarif(findings: &[Finding]) -> Result<String> {
    let mut unique_rules: BTreeMap<String, SarifRule> = BTreeMap::new();

    for finding in findings {
        unique_rules
            .entry(finding.rule_id.clone())
            .or_insert_with(|| SarifRule {
                id: finding.rule_id.clone(),
                name: finding.rule_name.clone(),
                help_uri: finding.help_uri.clone(),
            });
    }

    let sarif_log = SarifLog {
        version: "2.1.0",
        schema: "https://json.schemastore.org/sarif-2.1.0.json",
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "whereguard".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules: unique_rules.into_values().collect(),
                },
            },
            results: findings.iter().map(SarifResult::from_finding).collect(),
        }],
    };

    serde_json::to_string_pretty(&sarif_log)
        .map_err(|e| GuardError::config_error(format!("Failed to serialize SARIF: {}", e)))
}

/// Converts findings to JUnit XML format.
///
/// - Each finding becomes a `<testcase>`
/// - Error findings add a `<failure>` element
/// - Warning findings add a `<system-out>` element
/// - Note findings produce passing tests
/// - An empty run still produces one passing placeholder test case
///
/// # Errors
///
/// Currently infallible; the `Result` mirrors [`to_sarif`].
pub fn to_junit(findings: &[Finding], suite_name: &str) -> Result<String> {
    let testcase_count = findings.len().max(1);
    let failure_count = findings.iter().filter(|f| f.severity.is_error()).count();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    let counts = format!(
        "tests=\"{}\" failures=\"{}\" errors=\"0\" skipped=\"0\"",
        testcase_count, failure_count
    );
    xml.push_str(&format!(
        "<testsuites name=\"{}\" {}>",
        escape_xml(suite_name),
        counts
    ));
    xml.push_str(&format!(
        "<testsuite name=\"{}\" {}>",
        escape_xml(suite_name),
        counts
    ));

    if findings.is_empty() {
        xml.push_str(&format!(
            "<testcase name=\"{}\" classname=\"{}\"/>",
            escape_xml(suite_name),
            escape_xml(suite_name)
        ));
    }

    for finding in findings {
        let classname = format!("whereguard.{}", finding.rule_id);
        let where_ = finding
            .location
            .as_ref()
            .map(Location::display)
            .unwrap_or_default();
        let testcase_name = truncate_testcase_name(&if where_.is_empty() {
            finding.message.clone()
        } else {
            format!("{} {}", where_, finding.rule_id)
        });

        xml.push_str(&format!(
            "<testcase name=\"{}\" classname=\"{}\"",
            escape_xml(&testcase_name),
            escape_xml(&classname)
        ));

        let mut body = String::new();
        if !where_.is_empty() {
            body.push_str(&format!("{}: ", escape_xml(&where_)));
        }
        body.push_str(&escape_xml(&finding.message));

        match finding.severity {
            Severity::Error => {
                xml.push_str(&format!("><failure message=\"{}\">", body));
                if let Some(uri) = &finding.help_uri {
                    xml.push_str(&format!("\nHelp: {}\n", escape_xml(uri)));
                }
                xml.push_str("</failure></testcase>");
            }
            Severity::Warning => {
                xml.push_str("><system-out>");
                xml.push_str(&body);
                if let Some(uri) = &finding.help_uri {
                    xml.push_str(&format!("\nHelp: {}", escape_xml(uri)));
                }
                xml.push_str("</system-out></testcase>");
            }
            Severity::Note => xml.push_str("/>"),
        }
    }

    xml.push_str("</testsuite></testsuites>");
    Ok(xml)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// JUnit parsers may have issues with very long names.
fn truncate_testcase_name(name: &str) -> String {
    if name.chars().count() > 200 {
        let head: String = name.chars().take(197).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

// SARIF types for serialization

#[derive(Debug, Serialize)]
struct SarifLog {
    version: &'static str,
    #[serde(rename = "$schema")]
    schema: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
struct SarifDriver {
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    help_uri: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: String,
    message: SarifMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    locations: Option<Vec<SarifLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial_fingerprints: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<SarifRegion>,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_column: Option<usize>,
}

impl SarifResult {
    fn from_finding(finding: &Finding) -> Self {
        let locations = finding.location.as_ref().map(|loc| {
            vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifactLocation {
                        uri: loc.uri.clone(),
                    },
                    region: loc.start_line.map(|line| SarifRegion {
                        start_line: Some(line),
                        start_column: loc.start_column,
                    }),
                },
            }]
        });

        let partial_fingerprints = finding.fingerprint.as_ref().map(|fp| {
            let mut map = BTreeMap::new();
            map.insert("primaryLocation".to_string(), fp.clone());
            map
        });

        Self {
            rule_id: finding.rule_id.clone(),
            level: finding.severity.to_sarif_level().to_string(),
            message: SarifMessage {
                text: finding.message.clone(),
            },
            locations,
            partial_fingerprints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule_id: &str, severity: Severity) -> Finding {
        let location = Location::with_position("src/db.ts".to_string(), 12, 5);
        Finding {
            rule_id: rule_id.to_string(),
            rule_name: "Enforce delete with where".to_string(),
            severity,
            message: "Missing .where() clause".to_string(),
            fingerprint: Some(fingerprint(rule_id, &location)),
            location: Some(location),
            help_uri: Some("https://orm.drizzle.team/docs/delete".to_string()),
        }
    }

    #[test]
    fn test_severity_to_sarif_level() {
        assert_eq!(Severity::Error.to_sarif_level(), "error");
        assert_eq!(Severity::Warning.to_sarif_level(), "warning");
        assert_eq!(Severity::Note.to_sarif_level(), "note");
    }

    #[test]
    fn test_severity_from_diagnostic_severity() {
        assert_eq!(Severity::from(DiagnosticSeverity::Error), Severity::Error);
        assert_eq!(Severity::from(DiagnosticSeverity::Warn), Severity::Warning);
        assert_eq!(Severity::from(DiagnosticSeverity::Info), Severity::Note);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new("a.ts".to_string()).display(), "a.ts");
        assert_eq!(
            Location::with_position("a.ts".to_string(), 3, 7).display(),
            "a.ts:3:7"
        );
    }

    #[test]
    fn test_normalize_repo_relative_without_repo_root() {
        let normalized = normalize_repo_relative(Path::new("/x/src/a.ts"), Path::new("/other"));
        assert_eq!(normalized, "/x/src/a.ts");
    }

    #[test]
    fn test_normalize_repo_relative_strips_dot_prefix() {
        assert_eq!(
            normalize_repo_relative(Path::new("./src/a.ts"), Path::new("/repo")),
            "src/a.ts"
        );
    }

    #[test]
    fn test_fingerprint_is_stable_and_position_sensitive() {
        let a = Location::with_position("a.ts".to_string(), 1, 1);
        let b = Location::with_position("a.ts".to_string(), 2, 1);
        assert_eq!(fingerprint("r", &a), fingerprint("r", &a));
        assert_ne!(fingerprint("r", &a), fingerprint("r", &b));
        assert_eq!(fingerprint("r", &a).len(), 64);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("<a & 'b'>\""), "&lt;a &amp; &apos;b&apos;&gt;&quot;");
    }

    #[test]
    fn test_truncate_testcase_name_long() {
        let name = "x".repeat(300);
        let truncated = truncate_testcase_name(&name);
        assert_eq!(truncated.len(), 200);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_to_sarif_empty() {
        let sarif = to_sarif(&[]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sarif).unwrap();
        assert_eq!(value["version"], "2.1.0");
        assert_eq!(value["runs"][0]["tool"]["driver"]["name"], "whereguard");
        assert!(value["runs"][0]["results"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_to_sarif_uses_camel_case_keys() {
        let sarif = to_sarif(&[finding("enforce-delete-with-where", Severity::Error)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sarif).unwrap();
        let result = &value["runs"][0]["results"][0];
        assert_eq!(result["ruleId"], "enforce-delete-with-where");
        assert_eq!(result["level"], "error");
        let region = &result["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 12);
        assert_eq!(region["startColumn"], 5);
        assert_eq!(
            result["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "src/db.ts"
        );
        assert!(result["partialFingerprints"]["primaryLocation"].is_string());
    }

    #[test]
    fn test_to_sarif_deduplicates_rules() {
        let findings = vec![
            finding("enforce-update-with-where", Severity::Error),
            finding("enforce-delete-with-where", Severity::Error),
            finding("enforce-delete-with-where", Severity::Error),
        ];
        let sarif = to_sarif(&findings).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sarif).unwrap();
        let rules = value["runs"][0]["tool"]["driver"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["id"], "enforce-delete-with-where");
        assert_eq!(value["runs"][0]["results"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_to_junit_empty() {
        let junit = to_junit(&[], "whereguard").unwrap();
        assert!(junit.contains("tests=\"1\" failures=\"0\""));
        assert!(junit.contains("<testcase name=\"whereguard\" classname=\"whereguard\"/>"));
    }

    #[test]
    fn test_to_junit_with_error_finding() {
        let junit = to_junit(&[finding("enforce-delete-with-where", Severity::Error)], "s").unwrap();
        assert!(junit.contains("failures=\"1\""));
        assert!(junit.contains("classname=\"whereguard.enforce-delete-with-where\""));
        assert!(junit.contains("<failure message=\"src/db.ts:12:5: Missing .where() clause\">"));
        assert!(junit.ends_with("</testsuite></testsuites>"));
    }

    #[test]
    fn test_to_junit_warning_closes_testcase() {
        let junit = to_junit(&[finding("r", Severity::Warning)], "s").unwrap();
        assert!(junit.contains("failures=\"0\""));
        assert!(junit.contains("</system-out></testcase>"));
    }

    #[test]
    fn test_to_junit_note_passes() {
        let junit = to_junit(&[finding("r", Severity::Note)], "s").unwrap();
        assert!(junit.contains("classname=\"whereguard.r\"/>"));
    }
}
