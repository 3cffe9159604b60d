//! Hierarchical configuration loading for whereguard.
//!
//! Configuration is loaded from several sources, later ones overriding
//! earlier ones:
//!
//! 1. **User-level config**: `<XDG_CONFIG_HOME>/whereguard/whereguard.toml`
//!    (or `~/.config/whereguard/whereguard.toml`)
//! 2. **Repo-local config**: `<git repo root>/.whereguard/whereguard.local.toml`
//! 3. **Project config**: `Whereguard.toml`, `.whereguard.toml`,
//!    `whereguard.toml`, searched upward from the working directory
//! 4. **CLI arguments**: override everything (handled in the CLI layer)
//!
//! An explicit `--config` path replaces steps 1 to 3.
//!
//! ```no_run
//! # use whereguard_core::config_hierarchy::load_hierarchical_config;
//! # fn main() -> whereguard_core::error::Result<()> {
//! let hierarchical = load_hierarchical_config(None)?;
//! for source in &hierarchical.sources {
//!     println!("{:?} config from {}", source.source_type, source.path.display());
//! }
//! let names = &hierarchical.merged.scope.object_names;
//! # Ok(())
//! # }
//! ```

use crate::config::{
    CheckConfig, GeneralConfig, GenerateConfig, RulesConfig, ScopeConfig, WhereguardConfig,
    load_config_from_path,
};
use crate::error::{GuardError, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "whereguard";

/// User configuration file name.
const USER_CONFIG_FILE: &str = "whereguard.toml";

/// Repo-local configuration directory and file name.
const REPO_LOCAL_CONFIG_DIR: &str = ".whereguard";
const REPO_LOCAL_CONFIG_FILE: &str = "whereguard.local.toml";

/// Which level of the hierarchy a source came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSourceType {
    User,
    RepoLocal,
    /// `Whereguard.toml` or similar, found by upward search.
    ProjectLocal,
    /// Explicitly specified via `--config`.
    CliExplicit,
}

/// One configuration file that was loaded.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub source_type: ConfigSourceType,
    pub path: PathBuf,
    pub config: WhereguardConfig,
}

impl ConfigSource {
    #[must_use]
    pub const fn new(
        source_type: ConfigSourceType,
        path: PathBuf,
        config: WhereguardConfig,
    ) -> Self {
        Self {
            source_type,
            path,
            config,
        }
    }
}

/// All loaded sources, in priority order, and their merge.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalConfig {
    pub sources: Vec<ConfigSource>,
    pub merged: WhereguardConfig,
}

impl HierarchicalConfig {
    #[must_use]
    pub const fn new(sources: Vec<ConfigSource>, merged: WhereguardConfig) -> Self {
        Self { sources, merged }
    }
}

/// Returns the user configuration directory.
///
/// Uses `XDG_CONFIG_HOME` if set, then `~/.config/whereguard`, then
/// `APPDATA/whereguard` on Windows.
///
/// # Errors
///
/// Returns an error if no home directory can be determined.
pub fn get_user_config_dir() -> Result<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Ok(PathBuf::from(xdg_config).join(APP_DIR));
    }

    #[cfg(windows)]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Ok(PathBuf::from(appdata).join(APP_DIR));
        }
    }

    if let Some(home) = home_dir() {
        return Ok(home.join(".config").join(APP_DIR));
    }

    Err(GuardError::config_error(
        "Could not determine user config directory - please set XDG_CONFIG_HOME or HOME",
    ))
}

/// Returns where the user configuration file would live. Does not check
/// that it exists.
pub fn get_user_config_path() -> Option<PathBuf> {
    get_user_config_dir()
        .ok()
        .map(|dir| dir.join(USER_CONFIG_FILE))
}

/// Finds the git repository root from the current working directory.
///
/// # Returns
///
/// * `Ok(Some(PathBuf))` - if inside a git repository with a work tree
/// * `Ok(None)` - if not in a git repository
/// * `Err(GuardError)` - if an error occurs while searching
pub fn find_git_repo_root() -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().map_err(|e| {
        GuardError::io_error_with_source("get current directory", PathBuf::from("."), e)
    })?;
    find_git_repo_root_from(&cwd)
}

/// Like [`find_git_repo_root`], starting at `start`.
pub fn find_git_repo_root_from(start: &Path) -> Result<Option<PathBuf>> {
    match git2::Repository::discover(start) {
        Ok(repo) => Ok(repo.workdir().map(PathBuf::from)),
        Err(e) if e.class() == git2::ErrorClass::Config || e.code() == git2::ErrorCode::NotFound => {
            Ok(None)
        }
        Err(e) => Err(GuardError::GitError {
            operation: "find repository root".to_string(),
            repo_path: Some(start.to_path_buf()),
            source: Some(Box::new(e)),
        }),
    }
}

/// Returns the repo-local configuration path if inside a repository. Does
/// not check that it exists.
pub fn get_repo_local_config_path() -> Option<PathBuf> {
    find_git_repo_root()
        .ok()
        .flatten()
        .map(|root| root.join(REPO_LOCAL_CONFIG_DIR).join(REPO_LOCAL_CONFIG_FILE))
}

/// Loads configuration from every level of the hierarchy.
///
/// If `cli_explicit_path` is given, only that file is loaded.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be parsed.
#[tracing::instrument(level = "debug")]
pub fn load_hierarchical_config(cli_explicit_path: Option<&Path>) -> Result<HierarchicalConfig> {
    let mut sources = Vec::new();
    let mut merged = WhereguardConfig::default();

    if let Some(explicit_path) = cli_explicit_path {
        let Some(config) = load_config_from_path(explicit_path)? else {
            return Err(GuardError::config_error_with_path(
                "config file given with --config does not exist",
                explicit_path.to_path_buf(),
            ));
        };
        merged = config.clone();
        sources.push(ConfigSource::new(
            ConfigSourceType::CliExplicit,
            explicit_path.to_path_buf(),
            config,
        ));
        return Ok(HierarchicalConfig::new(sources, merged));
    }

    if let Some(user_path) = get_user_config_path()
        && let Some(config) = load_config_from_path(&user_path)?
    {
        merged = merge_configs(&merged, &config);
        sources.push(ConfigSource::new(ConfigSourceType::User, user_path, config));
    }

    if let Some(repo_path) = get_repo_local_config_path()
        && let Some(config) = load_config_from_path(&repo_path)?
    {
        merged = merge_configs(&merged, &config);
        sources.push(ConfigSource::new(
            ConfigSourceType::RepoLocal,
            repo_path,
            config,
        ));
    }

    if let Some((path, config)) = crate::config::discover_and_load_config()? {
        merged = merge_configs(&merged, &config);
        sources.push(ConfigSource::new(
            ConfigSourceType::ProjectLocal,
            path,
            config,
        ));
    }

    tracing::debug!(sources = sources.len(), "Resolved configuration hierarchy");
    Ok(HierarchicalConfig::new(sources, merged))
}

/// Merges two configurations, with `override_` taking precedence over `base`.
#[must_use]
pub fn merge_configs(base: &WhereguardConfig, override_: &WhereguardConfig) -> WhereguardConfig {
    WhereguardConfig {
        general: base.general.merge(&override_.general),
        rules: base.rules.merge(&override_.rules),
        scope: base.scope.merge(&override_.scope),
        generate: base.generate.merge(&override_.generate),
        check: base.check.merge(&override_.check),
    }
}

/// Types that can be layered, with the other value taking precedence.
pub trait Mergeable: Sized {
    #[must_use]
    fn merge(&self, other: &Self) -> Self;
}

impl Mergeable for GeneralConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            verbose: other.verbose || self.verbose,
            output_file: other
                .output_file
                .clone()
                .or_else(|| self.output_file.clone()),
        }
    }
}

impl Mergeable for RulesConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            delete: other.delete.or(self.delete),
            update: other.update.or(self.update),
            severity: other.severity.or(self.severity),
        }
    }
}

impl Mergeable for ScopeConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            object_names: other
                .object_names
                .clone()
                .or_else(|| self.object_names.clone()),
        }
    }
}

impl Mergeable for GenerateConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            out: other.out.clone().or_else(|| self.out.clone()),
        }
    }
}

impl Mergeable for CheckConfig {
    fn merge(&self, other: &Self) -> Self {
        Self {
            path: other.path.clone().or_else(|| self.path.clone()),
            output: other.output.clone().or_else(|| self.output.clone()),
        }
    }
}

impl Mergeable for WhereguardConfig {
    fn merge(&self, other: &Self) -> Self {
        merge_configs(self, other)
    }
}

fn home_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        return Some(PathBuf::from(home));
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(userprofile) = std::env::var_os("USERPROFILE") {
            return Some(PathBuf::from(userprofile));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::DiagnosticSeverity;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_get_user_config_path_ends_with_app_file() {
        if let Some(path) = get_user_config_path() {
            assert!(path.ends_with("whereguard/whereguard.toml"));
        }
    }

    #[test]
    fn test_find_git_repo_root_from_nested_dir() {
        let dir = TempDir::new().unwrap();
        if git2::Repository::init(dir.path()).is_err() {
            return;
        }
        let nested = dir.path().join("packages/api");
        fs::create_dir_all(&nested).unwrap();

        let root = find_git_repo_root_from(&nested).unwrap().unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_merge_configs_override_takes_precedence() {
        let base = WhereguardConfig {
            rules: RulesConfig {
                delete: Some(false),
                update: Some(true),
                severity: Some(DiagnosticSeverity::Warn),
            },
            scope: ScopeConfig {
                object_names: Some(vec!["db".to_string()]),
            },
            ..Default::default()
        };
        let override_ = WhereguardConfig {
            rules: RulesConfig {
                delete: Some(true),
                ..Default::default()
            },
            scope: ScopeConfig {
                object_names: Some(vec!["tx".to_string()]),
            },
            ..Default::default()
        };

        let merged = merge_configs(&base, &override_);
        assert_eq!(merged.rules.delete, Some(true));
        assert_eq!(merged.rules.update, Some(true));
        assert_eq!(merged.rules.severity, Some(DiagnosticSeverity::Warn));
        assert_eq!(merged.scope.object_names, Some(vec!["tx".to_string()]));
    }

    #[test]
    fn test_merge_configs_default_is_neutral_element() {
        let config = WhereguardConfig {
            generate: GenerateConfig {
                out: Some(PathBuf::from("a.grit")),
            },
            check: CheckConfig {
                path: Some(PathBuf::from("src")),
                output: Some("json".to_string()),
            },
            ..Default::default()
        };
        let default = WhereguardConfig::default();
        assert_eq!(merge_configs(&default, &config), config);
        assert_eq!(merge_configs(&config, &default), config);
    }

    #[test]
    fn test_load_hierarchical_config_with_cli_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[rules]\nupdate = false\n").unwrap();

        let hierarchical = load_hierarchical_config(Some(&path)).unwrap();
        assert_eq!(hierarchical.sources.len(), 1);
        assert_eq!(hierarchical.sources[0].source_type, ConfigSourceType::CliExplicit);
        assert_eq!(hierarchical.merged.rules.update, Some(false));
    }

    #[test]
    fn test_load_hierarchical_config_missing_explicit_path_fails() {
        let dir = TempDir::new().unwrap();
        let err = load_hierarchical_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, GuardError::ConfigError { .. }));
    }
}
