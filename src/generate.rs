//! `generate`: compiles the guard program and writes it as a Biome plugin.

use crate::cli::{GenerateArgs, RuleSelectionArgs};
use crate::composer::{CompileOptions, EmittedProgram, compile};
use crate::error::{GuardError, Result};
use crate::rule::Rule;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

impl From<&RuleSelectionArgs> for CompileOptions {
    fn from(args: &RuleSelectionArgs) -> Self {
        Self {
            families: args.families(),
            object_names: args.object_names.clone(),
            severity: args.severity.unwrap_or_default(),
        }
    }
}

/// A compiled plugin and where it is going.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPlugin {
    pub path: PathBuf,
    pub options: CompileOptions,
    /// Full program text.
    pub source: String,
}

impl GeneratedPlugin {
    /// Lines printed after the plugin is written.
    pub fn summary_lines(&self) -> Vec<String> {
        let scope = self.options.scope();
        let filter = if scope.is_unrestricted() {
            "none (matches all objects)".to_string()
        } else {
            scope.allowed_names().join(", ")
        };
        let state = |enabled: bool| if enabled { "enabled" } else { "disabled" };
        vec![
            format!("Generated plugin at: {}", self.path.display()),
            format!("Object name filter: {}", filter),
            format!("Delete rule: {}", state(self.options.families.delete)),
            format!("Update rule: {}", state(self.options.families.update)),
            String::new(),
            "Add the following to your biome.json:".to_string(),
            format!("  \"plugins\": [\"{}\"]", self.path.display()),
        ]
    }
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, creating missing parent directories first.
///
/// Readers never observe a partially written file.
pub fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .map_err(|e| GuardError::io_error_with_source("create output directory", dir.clone(), e))?;

    let mut temp = NamedTempFile::new_in(&dir)
        .map_err(|e| GuardError::io_error_with_source("create temporary file", dir.clone(), e))?;
    temp.write_all(contents.as_bytes())
        .map_err(|e| GuardError::io_error_with_source("write temporary file", temp.path().to_path_buf(), e))?;
    temp.persist(path)
        .map_err(|e| GuardError::io_error_with_source("rename plugin into place", path.to_path_buf(), e.error))?;
    Ok(())
}

/// Compiles the program and writes it to `--out`.
#[derive(Debug, Default)]
pub struct GenerateRule;

impl GenerateRule {
    /// Creates the rule; it carries no state.
    pub fn new() -> Self {
        Self
    }

    /// Compiles without touching the filesystem.
    pub fn program(&self, rules: &RuleSelectionArgs) -> Result<EmittedProgram> {
        compile(&CompileOptions::from(rules))
    }
}

impl Rule for GenerateRule {
    type Config = GenerateArgs;
    type Data = GeneratedPlugin;

    fn name() -> &'static str {
        "generate"
    }

    fn description() -> &'static str {
        "Generates a GritQL plugin that flags unguarded delete/update chains"
    }

    #[tracing::instrument(level = "debug", skip_all, err)]
    fn run(&self, args: &GenerateArgs) -> Result<()> {
        let plugin = self.analyze(args)?;
        write_atomically(&plugin.path, &plugin.source)?;
        tracing::info!(path = %plugin.path.display(), "Wrote plugin");
        for line in plugin.summary_lines() {
            println!("{line}");
        }
        Ok(())
    }

    fn analyze(&self, args: &GenerateArgs) -> Result<GeneratedPlugin> {
        let options = CompileOptions::from(&args.rules);
        let program = compile(&options)?;
        let path = args.out.clone().ok_or_else(|| {
            GuardError::invalid_input_with_arg(
                "an output path is required (pass --out or set [generate] out)",
                "--out",
            )
        })?;
        Ok(GeneratedPlugin {
            path,
            options,
            source: program.render(),
        })
    }
}
