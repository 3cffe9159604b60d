//! Rule definition model.
//!
//! Each guardable operation family (delete, update) is a variant of the closed
//! [`RuleKind`] enumeration backed by an immutable [`FamilyDefinition`] in
//! [`BUILTIN_FAMILIES`]. The only thing configuration can change is whether a
//! family is enabled; its shape, guard call and message are fixed.
//!
//! # Example
//!
//! ```
//! use whereguard_core::family::{FamilySelection, RuleKind};
//!
//! let selection = FamilySelection { delete: true, update: false };
//! let families = selection.enabled_families()?;
//! assert_eq!(families.len(), 1);
//! assert_eq!(families[0].kind(), RuleKind::Delete);
//! assert_eq!(families[0].id(), "enforce-delete-with-where");
//! # Ok::<(), whereguard_core::error::GuardError>(())
//! ```

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the call whose presence in a chain makes a mutation safe.
pub const GUARD_CALL: &str = "where";

/// Closed set of guardable operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Delete,
    Update,
}

impl RuleKind {
    /// Every kind, in emission order.
    pub const ALL: [RuleKind; 2] = [RuleKind::Delete, RuleKind::Update];

    /// Returns the static definition for this kind.
    #[must_use]
    pub const fn definition(self) -> &'static FamilyDefinition {
        match self {
            Self::Delete => &DELETE_FAMILY,
            Self::Update => &UPDATE_FAMILY,
        }
    }

    /// The operation name used in diagnostic identifiers.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// One method call inside a mutating shape.
///
/// The call takes exactly one argument, bound to `argument` in the emitted
/// code snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallShape {
    /// Method name, e.g. `delete`.
    pub method: &'static str,
    /// Metavariable bound to the single argument, e.g. `$table`.
    pub argument: &'static str,
}

/// Structural description of the call that performs a mutation.
///
/// `secondary`, when present, must be invoked directly on the result of
/// `primary` (`update(...).set(...)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutatingShape {
    pub primary: CallShape,
    pub secondary: Option<CallShape>,
}

impl MutatingShape {
    /// The call a diagnostic is anchored on: the secondary call if there is
    /// one, the primary call otherwise.
    #[must_use]
    pub const fn anchor(&self) -> &CallShape {
        match &self.secondary {
            Some(secondary) => secondary,
            None => &self.primary,
        }
    }

    /// Renders the shape as a code snippet rooted at `receiver`.
    ///
    /// ```
    /// use whereguard_core::family::RuleKind;
    ///
    /// let shape = RuleKind::Update.definition().shape;
    /// assert_eq!(shape.snippet("$obj"), "$obj.update($table).set($values)");
    /// ```
    #[must_use]
    pub fn snippet(&self, receiver: &str) -> String {
        let mut code = format!(
            "{}.{}({})",
            receiver, self.primary.method, self.primary.argument
        );
        if let Some(secondary) = &self.secondary {
            code.push_str(&format!(".{}({})", secondary.method, secondary.argument));
        }
        code
    }
}

/// Immutable definition of one operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyDefinition {
    pub kind: RuleKind,
    /// Diagnostic identifier, `enforce-<operation>-with-where`.
    pub id: &'static str,
    /// Human-readable rule name used in reports.
    pub name: &'static str,
    pub shape: MutatingShape,
    pub guard_call: &'static str,
    pub message: &'static str,
    pub help_uri: &'static str,
}

impl FamilyDefinition {
    /// The full diagnostic text: the message followed by the identifier.
    #[must_use]
    pub fn diagnostic_text(&self) -> String {
        format!("{} ({})", self.message, self.id)
    }
}

const DELETE_FAMILY: FamilyDefinition = FamilyDefinition {
    kind: RuleKind::Delete,
    id: "enforce-delete-with-where",
    name: "Enforce delete with where",
    shape: MutatingShape {
        primary: CallShape {
            method: "delete",
            argument: "$table",
        },
        secondary: None,
    },
    guard_call: GUARD_CALL,
    message: "Missing .where() clause: this delete() removes every row in the table",
    help_uri: "https://orm.drizzle.team/docs/delete",
};

const UPDATE_FAMILY: FamilyDefinition = FamilyDefinition {
    kind: RuleKind::Update,
    id: "enforce-update-with-where",
    name: "Enforce update with where",
    shape: MutatingShape {
        primary: CallShape {
            method: "update",
            argument: "$table",
        },
        secondary: Some(CallShape {
            method: "set",
            argument: "$values",
        }),
    },
    guard_call: GUARD_CALL,
    message: "Missing .where() clause: this update().set() rewrites every row in the table",
    help_uri: "https://orm.drizzle.team/docs/update",
};

/// The built-in family table, in emission order. Never mutated.
pub const BUILTIN_FAMILIES: [FamilyDefinition; 2] = [DELETE_FAMILY, UPDATE_FAMILY];

/// A family together with its configured toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationFamily {
    definition: &'static FamilyDefinition,
    enabled: bool,
}

impl OperationFamily {
    /// Returns the built-in family for `kind`, enabled.
    #[must_use]
    pub const fn builtin(kind: RuleKind) -> Self {
        Self {
            definition: kind.definition(),
            enabled: true,
        }
    }

    #[must_use]
    pub const fn with_enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }

    pub const fn kind(&self) -> RuleKind {
        self.definition.kind
    }

    pub const fn id(&self) -> &'static str {
        self.definition.id
    }

    pub const fn definition(&self) -> &'static FamilyDefinition {
        self.definition
    }

    pub const fn mutating_shape(&self) -> &'static MutatingShape {
        &self.definition.shape
    }

    pub const fn guard_call_name(&self) -> &'static str {
        self.definition.guard_call
    }

    pub const fn diagnostic_message(&self) -> &'static str {
        self.definition.message
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Which families are switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySelection {
    pub delete: bool,
    pub update: bool,
}

impl Default for FamilySelection {
    fn default() -> Self {
        Self {
            delete: true,
            update: true,
        }
    }
}

impl FamilySelection {
    /// Returns whether `kind` is switched on.
    #[must_use]
    pub const fn is_enabled(&self, kind: RuleKind) -> bool {
        match kind {
            RuleKind::Delete => self.delete,
            RuleKind::Update => self.update,
        }
    }

    /// Every built-in family with its toggle applied, in table order.
    #[must_use]
    pub fn families(&self) -> Vec<OperationFamily> {
        RuleKind::ALL
            .iter()
            .map(|&kind| OperationFamily::builtin(kind).with_enabled(self.is_enabled(kind)))
            .collect()
    }

    /// The enabled families, in table order.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NoRulesEnabled`] when every family is disabled.
    pub fn enabled_families(&self) -> Result<Vec<OperationFamily>> {
        let enabled: Vec<OperationFamily> = self
            .families()
            .into_iter()
            .filter(OperationFamily::is_enabled)
            .collect();
        if enabled.is_empty() {
            return Err(GuardError::NoRulesEnabled);
        }
        Ok(enabled)
    }
}

/// Severity attached to registered diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    #[default]
    Error,
    Warn,
    Info,
}

impl DiagnosticSeverity {
    /// The level string understood by `register_diagnostic`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticSeverity {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            other => Err(GuardError::invalid_input_with_arg(
                "expected one of: error, warn, info",
                other,
            )),
        }
    }
}
