//! Rule Trait
//!
//! This module defines the [`Rule`] trait, the common interface for the
//! commands that do work in whereguard: compiling the guard program
//! (`generate`) and evaluating it natively against a source tree (`check`).
//!
//! # Overview
//!
//! - Each rule has a name for identification
//! - Each rule can analyze its input and produce serializable data
//! - Each rule can render or persist that data
//!
//! # Implementing a Rule
//!
//! ```rust,no_run
//! use whereguard_core::rule::Rule;
//! use whereguard_core::error::Result;
//! use serde::Serialize;
//! use std::path::PathBuf;
//!
//! # #[derive(Debug, Serialize)]
//! # struct FileCount {
//! #     pub files: usize,
//! # }
//! #
//! # #[derive(Clone, Debug)]
//! # struct CountConfig {
//! #     pub path: PathBuf,
//! # }
//! #
//! # struct CountRule;
//! #
//! impl Rule for CountRule {
//!     type Data = FileCount;
//!     type Config = CountConfig;
//!
//!     fn name() -> &'static str {
//!         "count"
//!     }
//!
//!     fn description() -> &'static str {
//!         "Counts source files"
//!     }
//!
//!     fn run(&self, config: &CountConfig) -> Result<()> {
//!         let data = self.analyze(config)?;
//!         println!("{} files", data.files);
//!         Ok(())
//!     }
//!
//!     fn analyze(&self, _config: &CountConfig) -> Result<FileCount> {
//!         Ok(FileCount { files: 42 })
//!     }
//! }
//! ```

use crate::error::Result;
use serde::Serialize;
use std::fmt::Debug;

/// Common trait for whereguard commands.
pub trait Rule: Sized {
    /// Arguments the rule runs with, usually CLI arguments merged with
    /// configuration.
    type Config: Clone + Debug + Send + Sync;

    /// Structured output of [`Rule::analyze`].
    type Data: Debug + Send + Sync + Serialize;

    /// Unique snake_case name, used in logs and error messages.
    fn name() -> &'static str;

    /// Human-readable description used in help text.
    fn description() -> &'static str;

    /// Runs the full pipeline: analyze, then render or persist.
    ///
    /// # Errors
    ///
    /// Returns a [`GuardError`](crate::error::GuardError) if analysis fails,
    /// output cannot be written, or the rule's failure condition is met.
    fn run(&self, config: &Self::Config) -> Result<()>;

    /// Produces the rule's data without writing any output.
    ///
    /// # Errors
    ///
    /// Returns a [`GuardError`](crate::error::GuardError) if the analysis
    /// cannot be completed.
    fn analyze(&self, config: &Self::Config) -> Result<Self::Data>;
}

/// Builds an [`AnalysisError`](crate::error::GuardError::AnalysisError)
/// tagged with a rule name.
///
/// ```rust
/// # use whereguard_core::rule_error;
/// let error = rule_error!("check", "Failed to read {}", "app.ts");
/// assert!(error.to_string().contains("check"));
/// ```
#[macro_export]
macro_rules! rule_error {
    ($rule_name:expr, $msg:expr) => {
        $crate::error::GuardError::analysis_error($rule_name, $msg)
    };
    ($rule_name:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::GuardError::analysis_error($rule_name, format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default)]
    struct TestRule;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct TestConfig {
        pub value: usize,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestData {
        pub result: String,
    }

    impl Rule for TestRule {
        type Config = TestConfig;
        type Data = TestData;

        fn name() -> &'static str {
            "test_rule"
        }

        fn description() -> &'static str {
            "A test rule for validating the Rule trait"
        }

        fn run(&self, config: &Self::Config) -> Result<()> {
            let _data = self.analyze(config)?;
            Ok(())
        }

        fn analyze(&self, config: &Self::Config) -> Result<Self::Data> {
            if config.value == 0 {
                return Err(rule_error!(Self::name(), "Config value cannot be zero"));
            }
            Ok(TestData {
                result: format!("value is {}", config.value),
            })
        }
    }

    #[test]
    fn test_rule_metadata() {
        assert_eq!(TestRule::name(), "test_rule");
        assert_eq!(
            TestRule::description(),
            "A test rule for validating the Rule trait"
        );
    }

    #[test]
    fn test_rule_run_succeeds_with_valid_config() {
        assert!(TestRule.run(&TestConfig { value: 42 }).is_ok());
    }

    #[test]
    fn test_rule_analyze_fails_with_zero_config_value() {
        let error_msg = TestRule
            .analyze(&TestConfig { value: 0 })
            .unwrap_err()
            .to_string();
        assert!(error_msg.contains("test_rule"));
        assert!(error_msg.contains("cannot be zero"));
    }

    #[test]
    fn test_rule_error_macro_formats_arguments() {
        let err = rule_error!("check", "{} violations in {}", 3, "app.ts");
        let msg = err.to_string();
        assert!(msg.contains("3 violations in app.ts"));
    }
}
