//! Error types for whereguard.
//!
//! This module defines the error type shared by the rule compiler, the native
//! chain checker and the command layer. Each variant carries enough context to
//! render a useful message and to suggest a recovery action.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The main error type for whereguard operations.
#[derive(Debug)]
pub enum GuardError {
    /// Every operation family was disabled, so no rule could ever fire.
    ///
    /// Raised before any compilation work or I/O happens.
    NoRulesEnabled,

    /// The program composer was handed zero rules.
    ///
    /// This indicates a caller defect upstream of the composer; an empty
    /// program is never emitted.
    RenderInvariant {
        /// Description of the violated invariant.
        message: String,
    },

    /// An error occurred while parsing JavaScript or TypeScript source.
    ParseError {
        /// The file that failed to parse.
        file: Option<PathBuf>,
        /// Context about what was being parsed.
        context: String,
        /// The underlying error.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error occurred during a Git operation.
    GitError {
        /// Context about what Git operation was being performed.
        operation: String,
        /// Additional context about the repository.
        repo_path: Option<PathBuf>,
        /// The underlying error.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error occurred during file system operations.
    IoError {
        /// The operation being performed.
        operation: String,
        /// The path involved in the error.
        path: Option<PathBuf>,
        /// The underlying IO error.
        source: Option<io::Error>,
    },

    /// An error occurred while loading or parsing configuration.
    ConfigError {
        /// Description of the configuration issue.
        message: String,
        /// The config file path, if applicable.
        path: Option<PathBuf>,
        /// The underlying error.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error occurred during analysis, or the analysis found violations.
    AnalysisError {
        /// The rule that failed.
        rule: String,
        /// Description of what went wrong.
        message: String,
        /// The underlying error.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error indicating an invalid argument or input.
    InvalidInput {
        /// Description of the invalid input.
        message: String,
        /// The argument or value that was invalid.
        argument: Option<String>,
    },
}

impl GuardError {
    /// Creates a new `RenderInvariant` error.
    pub fn render_invariant(message: impl Into<String>) -> Self {
        Self::RenderInvariant {
            message: message.into(),
        }
    }

    /// Creates a new `ParseError` with the given context.
    ///
    /// # Examples
    /// ```
    /// use whereguard_core::error::GuardError;
    ///
    /// let err = GuardError::parse_error("Failed to load the TypeScript grammar");
    /// assert_eq!(err.name(), "ParseError");
    /// ```
    pub fn parse_error(context: impl Into<String>) -> Self {
        Self::ParseError {
            file: None,
            context: context.into(),
            source: None,
        }
    }

    /// Creates a new `ParseError` with a file path.
    pub fn parse_error_with_file(file: PathBuf, context: impl Into<String>) -> Self {
        Self::ParseError {
            file: Some(file),
            context: context.into(),
            source: None,
        }
    }

    /// Creates a new `GitError` with the given operation description.
    pub fn git_error(operation: impl Into<String>) -> Self {
        Self::GitError {
            operation: operation.into(),
            repo_path: None,
            source: None,
        }
    }

    /// Creates a new `GitError` with a repository path.
    pub fn git_error_with_repo(operation: impl Into<String>, repo_path: PathBuf) -> Self {
        Self::GitError {
            operation: operation.into(),
            repo_path: Some(repo_path),
            source: None,
        }
    }

    /// Creates a new `IoError` with the given operation description.
    pub fn io_error(operation: impl Into<String>) -> Self {
        Self::IoError {
            operation: operation.into(),
            path: None,
            source: None,
        }
    }

    /// Creates a new `IoError` with a path and underlying error.
    ///
    /// # Arguments
    /// * `operation` - A description of the IO operation being performed.
    /// * `path` - The path involved in the error.
    /// * `source` - The underlying IO error.
    pub fn io_error_with_source(
        operation: impl Into<String>,
        path: PathBuf,
        source: io::Error,
    ) -> Self {
        Self::IoError {
            operation: operation.into(),
            path: Some(path),
            source: Some(source),
        }
    }

    /// Creates a new `ConfigError` with the given message.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Creates a new `ConfigError` with a file path.
    pub fn config_error_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::ConfigError {
            message: message.into(),
            path: Some(path),
            source: None,
        }
    }

    /// Creates a new `AnalysisError` for the given rule.
    pub fn analysis_error(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AnalysisError {
            rule: rule.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            argument: None,
        }
    }

    /// Creates a new `InvalidInput` error with an argument name.
    pub fn invalid_input_with_arg(message: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            argument: Some(argument.into()),
        }
    }

    /// Returns the name of the error variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoRulesEnabled => "NoRulesEnabled",
            Self::RenderInvariant { .. } => "RenderInvariant",
            Self::ParseError { .. } => "ParseError",
            Self::GitError { .. } => "GitError",
            Self::IoError { .. } => "IoError",
            Self::ConfigError { .. } => "ConfigError",
            Self::AnalysisError { .. } => "AnalysisError",
            Self::InvalidInput { .. } => "InvalidInput",
        }
    }

    /// Returns suggested recovery actions for the error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NoRulesEnabled => vec![
                "Enable at least one of the delete and update rules".to_string(),
                "Drop one of --no-delete-rule / --no-update-rule".to_string(),
                "Check `[rules]` in your whereguard.toml".to_string(),
            ],
            Self::RenderInvariant { .. } => vec![
                "This is a bug in whereguard; please report it with the command you ran"
                    .to_string(),
            ],
            Self::ParseError { file, .. } => {
                let mut s = vec![
                    "Ensure the file contains valid JavaScript or TypeScript".to_string(),
                    "Check that the file extension matches its dialect".to_string(),
                ];
                if file.is_some() {
                    s.push("Verify the file passes `tsc --noEmit` or your bundler".to_string());
                }
                s
            }
            Self::GitError { .. } => vec![
                "Ensure the path is a valid Git repository".to_string(),
                "Check that you have permissions to access the repository".to_string(),
                "Verify Git is installed and accessible".to_string(),
            ],
            Self::IoError { operation, .. } => {
                let mut s = vec![
                    "Check that the path exists and is accessible".to_string(),
                    "Verify you have the necessary permissions".to_string(),
                ];
                if operation.contains("write") || operation.contains("persist") {
                    s.push("Ensure the target directory is writable".to_string());
                }
                s
            }
            Self::ConfigError { .. } => vec![
                "Check the configuration file syntax".to_string(),
                "Ensure whereguard.toml is valid TOML and biome.json is valid JSON".to_string(),
                "Review the documentation for configuration options".to_string(),
            ],
            Self::AnalysisError { rule, .. } => vec![
                format!("Review the '{}' findings above", rule),
                "Add a .where(...) call to the reported query chains".to_string(),
            ],
            Self::InvalidInput { .. } => vec![
                "Review the command-line arguments".to_string(),
                "Check the documentation for valid input formats".to_string(),
                "Verify all required arguments are provided".to_string(),
            ],
        }
    }
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRulesEnabled => write!(
                f,
                "Configuration error: both the delete and update rules are disabled, so no rule would ever fire"
            ),
            Self::RenderInvariant { message } => {
                write!(f, "Internal error while rendering the rule program: {}", message)
            }
            Self::ParseError { file, context, .. } => {
                if let Some(file) = file {
                    write!(f, "Parse error in '{}': {}", file.display(), context)
                } else {
                    write!(f, "Parse error: {}", context)
                }
            }
            Self::GitError {
                operation,
                repo_path,
                ..
            } => {
                if let Some(path) = repo_path {
                    write!(
                        f,
                        "Git error during '{}' at '{}': operation failed",
                        operation,
                        path.display()
                    )
                } else {
                    write!(f, "Git error during '{}': operation failed", operation)
                }
            }
            Self::IoError {
                operation, path, ..
            } => {
                if let Some(p) = path {
                    write!(
                        f,
                        "IO error during '{}' at '{}': operation failed",
                        operation,
                        p.display()
                    )
                } else {
                    write!(f, "IO error during '{}': operation failed", operation)
                }
            }
            Self::ConfigError { message, path, .. } => {
                if let Some(p) = path {
                    write!(f, "Configuration error in '{}': {}", p.display(), message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            Self::AnalysisError { rule, message, .. } => {
                write!(f, "Analysis error in rule '{}': {}", rule, message)
            }
            Self::InvalidInput { message, argument } => {
                if let Some(arg) = argument {
                    write!(f, "Invalid input '{}': {}", arg, message)
                } else {
                    write!(f, "Invalid input: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for GuardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError { source, .. } => source.as_ref().map(|s| s.as_ref() as _),
            Self::GitError { source, .. } => source.as_ref().map(|s| s.as_ref() as _),
            Self::IoError { source, .. } => source.as_ref().map(|e| e as _),
            Self::ConfigError { source, .. } => source.as_ref().map(|s| s.as_ref() as _),
            Self::AnalysisError { source, .. } => source.as_ref().map(|s| s.as_ref() as _),
            Self::NoRulesEnabled | Self::RenderInvariant { .. } | Self::InvalidInput { .. } => {
                None
            }
        }
    }
}

// Implement From conversions for common error types

impl From<io::Error> for GuardError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            operation: "file operation".to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<toml::de::Error> for GuardError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML: {}", err),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::ser::Error> for GuardError {
    fn from(err: toml::ser::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to serialize TOML: {}", err),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse/serialize JSON: {}", err),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for GuardError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to serialize YAML: {}", err),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<git2::Error> for GuardError {
    fn from(err: git2::Error) -> Self {
        Self::GitError {
            operation: "git operation".to_string(),
            repo_path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<walkdir::Error> for GuardError {
    fn from(err: walkdir::Error) -> Self {
        Self::IoError {
            operation: "directory traversal".to_string(),
            path: err.path().map(PathBuf::from),
            source: None,
        }
    }
}

/// A type alias for `Result<T, GuardError>`.
pub type Result<T> = std::result::Result<T, GuardError>;
