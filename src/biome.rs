//! Biome integration: `init` and `print-path`.
//!
//! `init` generates the plugin and registers it in the `plugins` array of
//! `biome.json`. The rest of the file is left as it was, key order included.

use crate::cli::{DEFAULT_PLUGIN_PATH, GenerateArgs, InitArgs, PrintPathArgs};
use crate::error::{GuardError, Result};
use crate::generate::{GenerateRule, write_atomically};
use crate::rule::Rule;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Adds `plugin` to the `plugins` array of a parsed `biome.json`.
///
/// Returns `false` when the entry was already present.
///
/// ```
/// use whereguard_core::biome::register_plugin;
/// use serde_json::json;
///
/// let mut config = json!({ "linter": { "enabled": true } });
/// assert!(register_plugin(&mut config, "./.biome/whereguard.grit")?);
/// assert!(!register_plugin(&mut config, "./.biome/whereguard.grit")?);
/// assert_eq!(config["plugins"], json!(["./.biome/whereguard.grit"]));
/// # Ok::<(), whereguard_core::error::GuardError>(())
/// ```
pub fn register_plugin(config: &mut Value, plugin: &str) -> Result<bool> {
    let Value::Object(root) = config else {
        return Err(GuardError::config_error(
            "biome.json must contain a JSON object",
        ));
    };
    let plugins = root
        .entry("plugins")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(entries) = plugins else {
        return Err(GuardError::config_error(
            "\"plugins\" in biome.json must be an array",
        ));
    };
    if entries.iter().any(|entry| entry.as_str() == Some(plugin)) {
        return Ok(false);
    }
    entries.push(Value::String(plugin.to_string()));
    Ok(true)
}

/// Reads `biome.json`, or an empty object when it does not exist.
fn read_biome_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }
    let content = fs::read_to_string(path)
        .map_err(|e| GuardError::io_error_with_source("read biome config", path.to_path_buf(), e))?;
    serde_json::from_str(&content).map_err(|e| GuardError::ConfigError {
        message: format!("Could not parse {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(Box::new(e)),
    })
}

/// Registers `plugin` in the `biome.json` at `path` and writes it back,
/// pretty-printed with a trailing newline.
#[tracing::instrument(level = "debug", err)]
pub fn update_biome_config(path: &Path, plugin: &str) -> Result<bool> {
    let mut config = read_biome_config(path)?;
    let added = register_plugin(&mut config, plugin)?;
    let mut rendered = serde_json::to_string_pretty(&config)?;
    rendered.push('\n');
    write_atomically(path, &rendered)?;
    Ok(added)
}

/// Runs `init`: writes the plugin, then registers it in `biome.json`.
///
/// Invalid `biome.json` content is rejected before the plugin is written.
pub fn init(args: &InitArgs) -> Result<()> {
    let plugin_path = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGIN_PATH));
    read_biome_config(&args.biome_config)?;

    let generate = GenerateArgs {
        out: Some(plugin_path.clone()),
        rules: args.rules.clone(),
    };
    let plugin = GenerateRule::new().analyze(&generate)?;
    write_atomically(&plugin.path, &plugin.source)?;
    for line in plugin.summary_lines().iter().take_while(|line| !line.is_empty()) {
        println!("{line}");
    }

    let entry = plugin_path.to_string_lossy();
    if !update_biome_config(&args.biome_config, &entry)? {
        tracing::info!(plugin = %entry, "Plugin already registered");
    }
    println!(
        "Updated {} with plugin configuration",
        args.biome_config.display()
    );
    println!("\nSetup complete! Run 'biome lint' to check your code.");
    Ok(())
}

/// The default plugin path, optionally resolved against the working
/// directory.
pub fn plugin_path(args: &PrintPathArgs) -> Result<PathBuf> {
    let relative = PathBuf::from(DEFAULT_PLUGIN_PATH);
    if !args.absolute {
        return Ok(relative);
    }
    let cwd = std::env::current_dir().map_err(|e| {
        GuardError::io_error_with_source("get current directory", PathBuf::from("."), e)
    })?;
    Ok(relative
        .strip_prefix(".")
        .map_or_else(|_| cwd.join(&relative), |rest| cwd.join(rest)))
}

pub fn print_path(args: &PrintPathArgs) -> Result<()> {
    println!("{}", plugin_path(args)?.display());
    Ok(())
}
