//! Integration tests for hierarchical configuration loading.
//!
//! These tests change the working directory and `XDG_CONFIG_HOME`, so they
//! run serially.

use serial_test::serial;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use whereguard_core::config_hierarchy::{
    ConfigSourceType, HierarchicalConfig, find_git_repo_root, load_hierarchical_config,
};
use whereguard_core::error::Result;
use whereguard_core::family::{DiagnosticSeverity, FamilySelection};

/// Helper to get a safe fallback directory for restoring cwd.
fn get_fallback_dir() -> PathBuf {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            tempfile::TempDir::new()
                .ok()
                .map(|d| d.path().to_path_buf())
        })
        .expect("Failed to get fallback directory")
}

fn create_temp_config_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let config_path = dir.join(name);
    fs::create_dir_all(config_path.parent().expect("config has parent"))
        .expect("Failed to create config dir");
    fs::write(&config_path, content).expect("Failed to write config");
    config_path
}

fn init_git_repo(dir: &Path) {
    let status = Command::new("git")
        .arg("init")
        .current_dir(dir)
        .status()
        .expect("Failed to run git init");
    assert!(status.success(), "git init failed with status: {status:?}");
}

/// Runs `load_hierarchical_config(None)` from `cwd` with `XDG_CONFIG_HOME`
/// pointed at `xdg`, restoring both afterwards.
fn load_from(cwd: &Path, xdg: &Path) -> Result<HierarchicalConfig> {
    let fallback_dir = get_fallback_dir();
    let original_cwd = std::env::current_dir().unwrap_or(fallback_dir.clone());
    let original_xdg: Option<OsString> = std::env::var_os("XDG_CONFIG_HOME");

    unsafe { std::env::set_var("XDG_CONFIG_HOME", xdg) };
    std::env::set_current_dir(cwd).expect("Failed to cd to temp dir");

    let result = load_hierarchical_config(None);

    let _ = std::env::set_current_dir(&original_cwd)
        .or_else(|_| std::env::set_current_dir(&fallback_dir));
    match original_xdg {
        Some(xdg) => unsafe { std::env::set_var("XDG_CONFIG_HOME", xdg) },
        None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
    }
    result
}

#[test]
#[serial]
fn integration_end_to_end_hierarchy() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let project = temp_dir.path().join("project");
    let xdg = temp_dir.path().join("xdg-config");
    fs::create_dir_all(&project).unwrap();
    init_git_repo(&project);

    create_temp_config_file(
        &xdg,
        "whereguard/whereguard.toml",
        r#"
[general]
verbose = true

[rules]
severity = "info"

[scope]
object_names = ["db"]
"#,
    );
    create_temp_config_file(
        &project,
        ".whereguard/whereguard.local.toml",
        r#"
[rules]
severity = "warn"
update = false

[generate]
out = "local.grit"
"#,
    );
    create_temp_config_file(
        &project,
        "Whereguard.toml",
        r#"
[scope]
object_names = ["db", "tx"]

[generate]
out = ".biome/whereguard.grit"
"#,
    );

    let hierarchical = load_from(&project, &xdg).expect("hierarchy loads");

    let kinds: Vec<ConfigSourceType> = hierarchical
        .sources
        .iter()
        .map(|s| s.source_type.clone())
        .collect();
    assert_eq!(
        kinds,
        [
            ConfigSourceType::User,
            ConfigSourceType::RepoLocal,
            ConfigSourceType::ProjectLocal
        ]
    );

    let merged = hierarchical.merged;
    assert!(merged.general.verbose);
    assert_eq!(merged.rules.severity, Some(DiagnosticSeverity::Warn));
    assert_eq!(
        merged.rules.selection(),
        FamilySelection {
            delete: true,
            update: false
        }
    );
    assert_eq!(
        merged.scope.object_names,
        Some(vec!["db".to_string(), "tx".to_string()])
    );
    assert_eq!(merged.generate.out, Some(PathBuf::from(".biome/whereguard.grit")));
}

#[test]
#[serial]
fn integration_repo_local_found_from_subdirectory() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let project = temp_dir.path().join("project");
    let nested = project.join("packages/api/src");
    let xdg = temp_dir.path().join("empty-xdg");
    fs::create_dir_all(&nested).unwrap();
    init_git_repo(&project);
    create_temp_config_file(
        &project,
        ".whereguard/whereguard.local.toml",
        "[scope]\nobject_names = [\"trx\"]\n",
    );

    let hierarchical = load_from(&nested, &xdg).expect("hierarchy loads");
    assert_eq!(hierarchical.sources.len(), 1);
    assert_eq!(hierarchical.sources[0].source_type, ConfigSourceType::RepoLocal);
    assert_eq!(
        hierarchical.merged.scope.object_names,
        Some(vec!["trx".to_string()])
    );
}

#[test]
#[serial]
fn integration_invalid_user_config_is_an_error() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let xdg = temp_dir.path().join("xdg");
    create_temp_config_file(&xdg, "whereguard/whereguard.toml", "[rules]\nseverity = 3\n");

    assert!(load_from(temp_dir.path(), &xdg).is_err());
}

#[test]
#[serial]
fn integration_find_git_repo_root_matches_init_dir() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    init_git_repo(temp_dir.path());
    let fallback_dir = get_fallback_dir();
    let original_cwd = std::env::current_dir().unwrap_or(fallback_dir.clone());

    std::env::set_current_dir(temp_dir.path()).expect("Failed to cd to temp dir");
    let root = find_git_repo_root();
    let _ = std::env::set_current_dir(&original_cwd)
        .or_else(|_| std::env::set_current_dir(&fallback_dir));

    let root = root.expect("discovery succeeds").expect("inside a repo");
    assert_eq!(
        root.canonicalize().unwrap(),
        temp_dir.path().canonicalize().unwrap()
    );
}

/// Collects formatted log output.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
#[serial]
fn integration_loading_logs_through_scoped_subscriber() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let project = temp_dir.path().join("project");
    let xdg = temp_dir.path().join("xdg");
    fs::create_dir_all(&xdg).unwrap();
    create_temp_config_file(&project, "whereguard.toml", "[general]\nverbose = true\n");

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let loaded = tracing::subscriber::with_default(subscriber, || load_from(&project, &xdg))
        .expect("project config loads");

    assert!(loaded.merged.general.verbose);
    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Loaded configuration"), "{output}");
    assert!(output.contains("Resolved configuration hierarchy"), "{output}");
}
