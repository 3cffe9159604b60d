//! Object-scope filter compilation.
//!
//! A [`ReceiverScope`] restricts rules to calls whose receiver is one of a
//! configured set of identifiers (`db`, `tx`, ...). An empty scope matches any
//! receiver. The scope compiles to a [`ScopePredicate`], which renders as a
//! match clause in the emitted program and is evaluated natively by
//! [`ReceiverScope::admits`].

use serde::{Deserialize, Serialize};

/// Ordered allow-list of receiver identifiers.
///
/// Names are trimmed; blank names are dropped; repeated names keep their
/// first position. Comparison is exact lexical equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverScope {
    allowed_names: Vec<String>,
}

impl ReceiverScope {
    /// A scope that admits every receiver.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Builds a scope from raw configured names.
    ///
    /// ```
    /// use whereguard_core::receiver::ReceiverScope;
    ///
    /// let scope = ReceiverScope::new(["db", "  ", " tx ", "db"]);
    /// assert_eq!(scope.allowed_names(), ["db", "tx"]);
    /// assert!(ReceiverScope::new(["", "   "]).is_unrestricted());
    /// ```
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_names: Vec<String> = Vec::new();
        for name in names {
            let trimmed = name.as_ref().trim();
            if trimmed.is_empty() {
                tracing::trace!("Dropping blank receiver name");
                continue;
            }
            if !allowed_names.iter().any(|existing| existing == trimmed) {
                allowed_names.push(trimmed.to_string());
            }
        }
        Self { allowed_names }
    }

    /// Splits a comma-separated list (`"db, tx"`) into a scope.
    #[must_use]
    pub fn from_comma_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    #[must_use]
    pub fn allowed_names(&self) -> &[String] {
        &self.allowed_names
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.allowed_names.is_empty()
    }

    /// Returns whether a receiver with the given source text is in scope.
    #[must_use]
    pub fn admits(&self, receiver: &str) -> bool {
        self.is_unrestricted() || self.allowed_names.iter().any(|name| name == receiver)
    }

    /// Compiles the scope into a predicate fragment.
    #[must_use]
    pub fn predicate(&self) -> ScopePredicate {
        match self.allowed_names.as_slice() {
            [] => ScopePredicate::Any,
            [single] => ScopePredicate::Equals(single.clone()),
            many => ScopePredicate::OneOf(many.to_vec()),
        }
    }
}

/// Receiver restriction attached to a compiled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePredicate {
    /// Trivially true.
    Any,
    /// Direct equality with one identifier.
    Equals(String),
    /// Disjunction of equality tests, in configured order.
    OneOf(Vec<String>),
}

impl ScopePredicate {
    /// Renders the predicate against `variable`, or `None` when it is
    /// trivially true and needs no clause.
    ///
    /// ```
    /// use whereguard_core::receiver::ReceiverScope;
    ///
    /// let single = ReceiverScope::new(["db"]).predicate();
    /// assert_eq!(single.render("$obj").as_deref(), Some("$obj <: `db`"));
    ///
    /// let both = ReceiverScope::new(["db", "tx"]).predicate();
    /// assert_eq!(both.render("$obj").as_deref(), Some("$obj <: or { `db`, `tx` }"));
    /// ```
    #[must_use]
    pub fn render(&self, variable: &str) -> Option<String> {
        match self {
            Self::Any => None,
            Self::Equals(name) => Some(format!("{} <: {}", variable, code_snippet(name))),
            Self::OneOf(names) => {
                let alternatives: Vec<String> = names.iter().map(|n| code_snippet(n)).collect();
                Some(format!(
                    "{} <: or {{ {} }}",
                    variable,
                    alternatives.join(", ")
                ))
            }
        }
    }
}

/// Wraps an identifier in a backtick code snippet.
///
/// Backticks and `$` are escaped so the identifier is matched literally
/// instead of closing the snippet or introducing a metavariable.
fn code_snippet(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push('`');
    for ch in name.chars() {
        if matches!(ch, '`' | '$' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('`');
    escaped
}
