use crate::family::{DiagnosticSeverity, FamilySelection};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default location of the generated plugin, relative to the project root.
pub const DEFAULT_PLUGIN_PATH: &str = "./.biome/whereguard.grit";

/// Default location of the Biome configuration file.
pub const DEFAULT_BIOME_CONFIG: &str = "./biome.json";

/// CLI arguments for `whereguard`.
#[derive(Parser, Debug)]
#[command(
    name = "whereguard",
    version,
    about = "Flag delete/update query chains that have no .where() guard"
)]
pub struct Cli {
    /// Path to a whereguard configuration file. Disables config discovery.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a GritQL plugin file for Biome.
    Generate(GenerateArgs),
    /// Generate the plugin and register it in biome.json.
    Init(InitArgs),
    /// Print the default plugin path.
    PrintPath(PrintPathArgs),
    /// Check JavaScript/TypeScript sources for unguarded mutations.
    Check(CheckArgs),
}

/// Rule toggles and receiver scope, shared by every command that compiles
/// or evaluates rules.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSelectionArgs {
    /// Comma-separated receiver names to match (e.g. `db,tx`). Empty matches
    /// every receiver.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub object_names: Vec<String>,

    /// Exclude the enforce-delete-with-where rule.
    #[arg(long)]
    pub no_delete_rule: bool,

    /// Exclude the enforce-update-with-where rule.
    #[arg(long)]
    pub no_update_rule: bool,

    /// Severity attached to reported diagnostics (error, warn, info).
    #[arg(long, value_name = "LEVEL")]
    pub severity: Option<DiagnosticSeverity>,
}

impl RuleSelectionArgs {
    pub fn families(&self) -> FamilySelection {
        FamilySelection {
            delete: !self.no_delete_rule,
            update: !self.no_update_rule,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Output path for the generated .grit file.
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub rules: RuleSelectionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Path to the biome.json file to update.
    #[arg(short, long, default_value = DEFAULT_BIOME_CONFIG, value_name = "PATH")]
    pub biome_config: PathBuf,

    /// Output path for the generated .grit file.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub rules: RuleSelectionArgs,
}

impl Default for InitArgs {
    fn default() -> Self {
        Self {
            biome_config: PathBuf::from(DEFAULT_BIOME_CONFIG),
            out: None,
            rules: RuleSelectionArgs::default(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PrintPathArgs {
    /// Print the absolute path instead of the relative one.
    #[arg(long)]
    pub absolute: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckOutputFormat {
    #[default]
    Table,
    Summary,
    Json,
    Yaml,
    Sarif,
    Junit,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// File or directory to check.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    #[command(flatten)]
    pub rules: RuleSelectionArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = CheckOutputFormat::Table)]
    pub output: CheckOutputFormat,

    /// Write the report to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Only check files staged for commit.
    #[arg(long)]
    pub staged: bool,
}

impl Default for CheckArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            rules: RuleSelectionArgs::default(),
            output: CheckOutputFormat::Table,
            output_file: None,
            staged: false,
        }
    }
}
