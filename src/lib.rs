//! # Whereguard - unguarded mutation rules for Biome
//!
//! Whereguard builds lint rules that flag query-builder mutations with no
//! row filter: `db.delete(table)` and `db.update(table).set(values)` calls
//! whose method chain never calls `.where(...)`.
//!
//! It does this two ways:
//!
//! - **Generation**: compiles the rules into a GritQL program that Biome
//!   loads as a plugin (`generate`, `init`).
//! - **Native checking**: evaluates the same rules directly on parsed
//!   JavaScript/TypeScript sources (`check`).
//!
//! ## Architecture
//!
//! - [`family`] - Operation families (`delete`, `update`) and their shapes
//! - [`receiver`] - Receiver-name scoping
//! - [`chain_rule`] - One rule block of the emitted program
//! - [`composer`] - Assembles rule blocks into a program
//! - [`syntax`] - Arena syntax tree lowered from tree-sitter
//! - [`chain`] - Same-chain relation and violation search
//! - [`check`], [`generate`], [`biome`] - Commands
//! - [`ci_report`], [`cli_report`] - SARIF, JUnit and terminal output
//! - [`config`], [`config_hierarchy`] - Configuration files
//!
//! ## Usage as a Library
//!
//! ```rust
//! use whereguard_core::composer::{compile, CompileOptions};
//! use whereguard_core::family::FamilySelection;
//!
//! # fn main() -> whereguard_core::error::Result<()> {
//! let program = compile(&CompileOptions {
//!     families: FamilySelection { delete: true, update: false },
//!     object_names: vec!["db".to_string()],
//!     ..Default::default()
//! })?;
//! assert_eq!(program.diagnostic_ids(), ["enforce-delete-with-where"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible functions return [`Result<T>`], an alias for
//! `std::result::Result<T, GuardError>`. See the [`error`] module.

pub mod biome;
pub mod chain;
pub mod chain_rule;
pub mod check;
pub mod ci_report;
pub mod cli;
pub mod cli_report;
pub mod composer;
pub mod config;
pub mod config_hierarchy;
pub mod error;
pub mod family;
pub mod file_utils;
pub mod generate;
pub mod git_utils;
pub mod receiver;
pub mod rule;
pub mod syntax;

// Public API exports
pub use crate::check::{CheckReport, GuardCheckRule, ViolationRecord, check_source};
pub use crate::cli::{
    CheckArgs, CheckOutputFormat, Cli, Commands, GenerateArgs, InitArgs, PrintPathArgs,
    RuleSelectionArgs,
};
pub use crate::composer::{CompileOptions, EmittedProgram, ProgramBuilder, compile};
pub use crate::family::{DiagnosticSeverity, FamilySelection, OperationFamily, RuleKind};
pub use crate::generate::{GenerateRule, GeneratedPlugin};
pub use crate::receiver::ReceiverScope;

// Config exports
pub use crate::config::{
    CheckConfig, GeneralConfig, GenerateConfig, RulesConfig, ScopeConfig, WhereguardConfig,
    load_config, load_config_from_path, merge_check_args, merge_generate_args, merge_init_args,
};

// Config hierarchy exports
pub use crate::config_hierarchy::{
    ConfigSource, ConfigSourceType, HierarchicalConfig, Mergeable, find_git_repo_root,
    get_repo_local_config_path, get_user_config_path, load_hierarchical_config, merge_configs,
};

// Error exports
pub use crate::error::{GuardError as Error, Result};

// Git utils exports
pub use crate::git_utils::{filter_script_files, get_staged_files};

// CLI report exports
pub use crate::cli_report::render_summary_line;

// Rule trait exports
pub use crate::rule::Rule;

// CI report exports
pub use crate::ci_report::{Finding, Location, Severity, ToFindings, to_junit, to_sarif};
