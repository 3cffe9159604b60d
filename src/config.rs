//! Configuration file support for whereguard.
//!
//! This module loads configuration from TOML files and merges it with
//! command-line arguments. CLI arguments take precedence over config file
//! values.
//!
//! ```toml
//! [rules]
//! delete = true
//! update = true
//! severity = "error"
//!
//! [scope]
//! object_names = ["db", "tx"]
//!
//! [generate]
//! out = ".biome/whereguard.grit"
//!
//! [check]
//! path = "src"
//! output = "table"
//! ```

use crate::cli::{CheckArgs, CheckOutputFormat, GenerateArgs, InitArgs, RuleSelectionArgs};
use crate::error::{GuardError, Result};
use crate::family::{DiagnosticSeverity, FamilySelection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["Whereguard.toml", ".whereguard.toml", "whereguard.toml"];

/// Main configuration structure representing a whereguard configuration file.
///
/// Values are resolved in this order:
/// 1. CLI arguments (highest priority)
/// 2. Config file values
/// 3. Default values (lowest priority)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WhereguardConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Rule toggles and diagnostic severity.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Receiver scope.
    #[serde(default)]
    pub scope: ScopeConfig,

    #[serde(default)]
    pub generate: GenerateConfig,

    #[serde(default)]
    pub check: CheckConfig,
}

/// General configuration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Enable verbose output.
    #[serde(default)]
    pub verbose: bool,

    /// Output file path for `check` reports.
    pub output_file: Option<PathBuf>,
}

/// `[rules]`: which families are enabled and how loudly they report.
///
/// Unset toggles mean "enabled".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    pub delete: Option<bool>,
    pub update: Option<bool>,
    pub severity: Option<DiagnosticSeverity>,
}

impl RulesConfig {
    pub fn selection(&self) -> FamilySelection {
        FamilySelection {
            delete: self.delete.unwrap_or(true),
            update: self.update.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    /// Receiver names rules are restricted to.
    pub object_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GenerateConfig {
    /// Where `generate` writes the plugin when `--out` is not given.
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Default path for `check`.
    pub path: Option<PathBuf>,

    /// Output format for the report.
    pub output: Option<String>,
}

/// Load configuration from a specific file path.
///
/// Returns `Ok(None)` if the file doesn't exist, and an error if it exists
/// but cannot be read or parsed.
pub fn load_config_from_path(path: &Path) -> Result<Option<WhereguardConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| GuardError::io_error_with_source("read config", path.to_path_buf(), e))?;

    let config: WhereguardConfig = toml::from_str(&content).map_err(|e| GuardError::ConfigError {
        message: format!("Failed to parse TOML: {}", e),
        path: Some(path.to_path_buf()),
        source: Some(Box::new(e)),
    })?;

    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(Some(config))
}

/// Discover and load configuration from the current directory or its
/// parents, using `Whereguard.toml`, `.whereguard.toml`, `whereguard.toml`.
pub fn discover_and_load_config() -> Result<Option<(PathBuf, WhereguardConfig)>> {
    let cwd = std::env::current_dir()?;
    discover_config_from(&cwd)
}

/// Like [`discover_and_load_config`], starting the upward search at `start`.
pub fn discover_config_from(start: &Path) -> Result<Option<(PathBuf, WhereguardConfig)>> {
    let mut current_dir = start.to_path_buf();

    loop {
        for config_name in DEFAULT_CONFIG_FILES {
            let config_path = current_dir.join(config_name);
            if let Some(config) = load_config_from_path(&config_path)? {
                return Ok(Some((config_path, config)));
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Ok(None)
}

/// Load configuration from a specified path or discover from default locations.
pub fn load_config(config_path: Option<&Path>) -> Result<Option<(PathBuf, WhereguardConfig)>> {
    if let Some(path) = config_path {
        load_config_from_path(path).map(|opt| opt.map(|config| (path.to_path_buf(), config)))
    } else {
        discover_and_load_config()
    }
}

/// Merge rule toggles, scope and severity.
///
/// A `--no-*-rule` flag always disables its family; otherwise the config
/// decides. `--object-names` replaces the configured list.
pub fn merge_rule_selection(
    cli_args: &RuleSelectionArgs,
    config: &WhereguardConfig,
) -> RuleSelectionArgs {
    let configured = config.rules.selection();
    let mut merged = cli_args.clone();

    merged.no_delete_rule = cli_args.no_delete_rule || !configured.delete;
    merged.no_update_rule = cli_args.no_update_rule || !configured.update;

    if merged.object_names.is_empty()
        && let Some(names) = &config.scope.object_names
    {
        merged.object_names = names.clone();
    }

    if merged.severity.is_none() {
        merged.severity = config.rules.severity;
    }

    merged
}

/// Merge generate CLI args with config file values.
pub fn merge_generate_args(cli_args: &GenerateArgs, config: &WhereguardConfig) -> GenerateArgs {
    GenerateArgs {
        out: cli_args.out.clone().or_else(|| config.generate.out.clone()),
        rules: merge_rule_selection(&cli_args.rules, config),
    }
}

/// Merge init CLI args with config file values.
pub fn merge_init_args(cli_args: &InitArgs, config: &WhereguardConfig) -> InitArgs {
    InitArgs {
        biome_config: cli_args.biome_config.clone(),
        out: cli_args.out.clone().or_else(|| config.generate.out.clone()),
        rules: merge_rule_selection(&cli_args.rules, config),
    }
}

/// Merge check CLI args with config file values.
pub fn merge_check_args(cli_args: &CheckArgs, config: &WhereguardConfig) -> CheckArgs {
    let mut merged = cli_args.clone();

    // CLI default is "."
    if merged.path.as_os_str() == "."
        && let Some(path) = &config.check.path
    {
        merged.path = path.clone();
    }

    // CLI default is Table
    if let Some(config_output) = &config.check.output
        && merged.output == CheckOutputFormat::Table
    {
        merged.output = parse_check_output_format(config_output).unwrap_or(CheckOutputFormat::Table);
    }

    if merged.output_file.is_none() {
        merged.output_file = config.general.output_file.clone();
    }

    merged.rules = merge_rule_selection(&cli_args.rules, config);
    merged
}

fn parse_check_output_format(s: &str) -> Option<CheckOutputFormat> {
    match s.to_lowercase().as_str() {
        "table" => Some(CheckOutputFormat::Table),
        "summary" => Some(CheckOutputFormat::Summary),
        "json" => Some(CheckOutputFormat::Json),
        "yaml" => Some(CheckOutputFormat::Yaml),
        "sarif" => Some(CheckOutputFormat::Sarif),
        "junit" => Some(CheckOutputFormat::Junit),
        _ => {
            tracing::warn!(output = s, "Unknown [check] output format, using table");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_temp_config_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file
            .write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        temp_file
    }

    #[test]
    fn test_default_config_enables_both_rules() {
        let config = WhereguardConfig::default();
        assert!(!config.general.verbose);
        assert_eq!(config.rules.selection(), FamilySelection::default());
        assert!(config.scope.object_names.is_none());
    }

    #[test]
    fn test_load_config_from_valid_toml_file() {
        let file = create_temp_config_file(
            r#"
[general]
verbose = true

[rules]
update = false
severity = "warn"

[scope]
object_names = ["db", "tx"]

[generate]
out = "lint/whereguard.grit"

[check]
path = "src"
output = "sarif"
"#,
        );

        let config = load_config_from_path(file.path()).unwrap().unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.rules.update, Some(false));
        assert_eq!(config.rules.severity, Some(DiagnosticSeverity::Warn));
        assert_eq!(
            config.scope.object_names,
            Some(vec!["db".to_string(), "tx".to_string()])
        );
        assert_eq!(config.generate.out, Some(PathBuf::from("lint/whereguard.grit")));
        assert_eq!(config.check.output.as_deref(), Some("sarif"));
    }

    #[test]
    fn test_load_config_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_config_from_path(&dir.path().join("nope.toml")).unwrap().is_none());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let file = create_temp_config_file("[rules]\ndelet = true\n");
        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, GuardError::ConfigError { path: Some(_), .. }));
    }

    #[test]
    fn test_invalid_severity_is_rejected() {
        let file = create_temp_config_file("[rules]\nseverity = \"fatal\"\n");
        assert!(load_config_from_path(file.path()).is_err());
    }

    #[test]
    fn test_discover_config_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("packages/api/src");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(".whereguard.toml"), "[scope]\nobject_names = [\"db\"]\n").unwrap();

        let (path, config) = discover_config_from(&nested).unwrap().unwrap();
        assert_eq!(path, dir.path().join(".whereguard.toml"));
        assert_eq!(config.scope.object_names, Some(vec!["db".to_string()]));
    }

    #[test]
    fn test_merge_rule_selection_cli_disables_win() {
        let cli = RuleSelectionArgs {
            no_delete_rule: true,
            ..Default::default()
        };
        let merged = merge_rule_selection(&cli, &WhereguardConfig::default());
        assert!(merged.no_delete_rule);
        assert!(!merged.no_update_rule);
    }

    #[test]
    fn test_merge_rule_selection_config_disables() {
        let config = WhereguardConfig {
            rules: RulesConfig {
                update: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = merge_rule_selection(&RuleSelectionArgs::default(), &config);
        assert_eq!(
            merged.families(),
            FamilySelection {
                delete: true,
                update: false
            }
        );
    }

    #[test]
    fn test_merge_rule_selection_cli_names_replace_config() {
        let config = WhereguardConfig {
            scope: ScopeConfig {
                object_names: Some(vec!["db".to_string(), "tx".to_string()]),
            },
            ..Default::default()
        };
        let cli = RuleSelectionArgs {
            object_names: vec!["trx".to_string()],
            ..Default::default()
        };
        assert_eq!(merge_rule_selection(&cli, &config).object_names, ["trx"]);
        assert_eq!(
            merge_rule_selection(&RuleSelectionArgs::default(), &config).object_names,
            ["db", "tx"]
        );
    }

    #[test]
    fn test_merge_generate_args_out_falls_back_to_config() {
        let config = WhereguardConfig {
            generate: GenerateConfig {
                out: Some(PathBuf::from("cfg.grit")),
            },
            ..Default::default()
        };
        let merged = merge_generate_args(&GenerateArgs::default(), &config);
        assert_eq!(merged.out, Some(PathBuf::from("cfg.grit")));

        let cli = GenerateArgs {
            out: Some(PathBuf::from("cli.grit")),
            ..Default::default()
        };
        assert_eq!(merge_generate_args(&cli, &config).out, Some(PathBuf::from("cli.grit")));
    }

    #[test]
    fn test_merge_check_args() {
        let config = WhereguardConfig {
            general: GeneralConfig {
                output_file: Some(PathBuf::from("report.sarif")),
                ..Default::default()
            },
            check: CheckConfig {
                path: Some(PathBuf::from("src")),
                output: Some("SARIF".to_string()),
            },
            ..Default::default()
        };
        let merged = merge_check_args(&CheckArgs::default(), &config);
        assert_eq!(merged.path, PathBuf::from("src"));
        assert_eq!(merged.output, CheckOutputFormat::Sarif);
        assert_eq!(merged.output_file, Some(PathBuf::from("report.sarif")));

        let cli = CheckArgs {
            path: PathBuf::from("app"),
            output: CheckOutputFormat::Json,
            ..Default::default()
        };
        let merged = merge_check_args(&cli, &config);
        assert_eq!(merged.path, PathBuf::from("app"));
        assert_eq!(merged.output, CheckOutputFormat::Json);
    }
}
