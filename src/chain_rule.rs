//! Chain-scope guard matcher, emission side.
//!
//! A [`ChainGuardRule`] is the compiled form of one enabled
//! [`OperationFamily`] combined with a [`ReceiverScope`]. It renders as one
//! GritQL pattern that:
//!
//! 1. matches the family's mutating shape, binding the receiver to `$obj`
//!    and the whole call to `$mutation`;
//! 2. applies the receiver predicate, if the scope is restricted;
//! 3. rejects the match when a guard call is found on the same chain, either
//!    below the mutation (anywhere in the receiver chain of `$obj`) or above
//!    it (an enclosing guard call whose receiver chain leads back to
//!    `$mutation`);
//! 4. registers the family's diagnostic on `$mutation`.
//!
//! "Receiver chain" is walked by the named patterns from
//! [`chain_pattern_definitions`]. They step only through the receiver of a
//! method call and through parentheses, `!`, `as` and `satisfies`, never
//! into an argument list or a function body. This is the relation
//! [`crate::chain::Chain::containing`] evaluates over the syntax arena.

use crate::family::{DiagnosticSeverity, OperationFamily, RuleKind};
use crate::receiver::{ReceiverScope, ScopePredicate};

/// Metavariable bound to the receiver of the mutating call.
pub const RECEIVER_VAR: &str = "$obj";
/// Metavariable bound to the mutating call itself.
pub const MUTATION_VAR: &str = "$mutation";

/// Named pattern matching a node whose receiver chain reaches `$target`.
pub const CHAIN_REACHES_PATTERN: &str = "chain_reaches";

const INDENT: &str = "    ";

/// One receiver step, binding the next node down the chain to `$inner`.
const RECEIVER_STEPS: [&str; 5] = [
    "`($inner)`",
    "`$inner!`",
    "`$inner as $_`",
    "`$inner satisfies $_`",
    "`$inner.$_($...)`",
];

/// Structural pattern for the mutating call plus its receiver restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    /// Code snippet such as `$obj.update($table).set($values)`.
    pub snippet: String,
    pub binding: &'static str,
    pub scope: ScopePredicate,
}

/// "No guard call shares this mutation's chain."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegativeCondition {
    pub guard_call: &'static str,
}

impl NegativeCondition {
    /// Name of the helper pattern matching a receiver chain that calls the
    /// guard, e.g. `chain_calls_where`.
    pub fn guard_pattern(&self) -> String {
        guard_pattern_name(self.guard_call)
    }

    /// Clauses asserting the absence of the guard call on the chain.
    fn clauses(&self) -> Vec<Vec<String>> {
        vec![
            vec![format!("not {RECEIVER_VAR} <: {}()", self.guard_pattern())],
            vec![
                format!(
                    "not {MUTATION_VAR} <: within `$chain.{}($...)` where {{",
                    self.guard_call
                ),
                format!("{INDENT}$chain <: {CHAIN_REACHES_PATTERN}({MUTATION_VAR})"),
                "}".to_string(),
            ],
        ]
    }
}

fn guard_pattern_name(guard_call: &str) -> String {
    format!("chain_calls_{guard_call}")
}

/// Renders `pattern <signature> { or { <base>, <steps...> } }`, where each
/// step recurses into `$inner` through `recursion`.
fn receiver_walk(signature: &str, base: &str, recursion: &str) -> Vec<String> {
    let mut lines = vec![
        format!("pattern {signature} {{"),
        format!("{INDENT}or {{"),
        format!("{INDENT}{INDENT}{base},"),
    ];
    let last = RECEIVER_STEPS.len() - 1;
    for (index, step) in RECEIVER_STEPS.iter().enumerate() {
        let separator = if index == last { "" } else { "," };
        lines.push(format!(
            "{INDENT}{INDENT}{step} where {{ $inner <: {recursion} }}{separator}"
        ));
    }
    lines.push(format!("{INDENT}}}"));
    lines.push("}".to_string());
    lines
}

/// Helper pattern definitions the rule blocks refer to: one
/// [`CHAIN_REACHES_PATTERN`], then one guard pattern per distinct guard
/// call, separated by blank lines.
///
/// ```
/// use whereguard_core::chain_rule::chain_pattern_definitions;
///
/// let lines = chain_pattern_definitions(["where"]);
/// assert_eq!(lines[0], "pattern chain_reaches($target) {");
/// assert!(lines.contains(&"pattern chain_calls_where() {".to_string()));
/// ```
pub fn chain_pattern_definitions<'a>(guard_calls: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let reaches = format!("{CHAIN_REACHES_PATTERN}($target)");
    let mut lines = receiver_walk(&reaches, "$target", &reaches);
    for guard_call in guard_calls {
        let calls_guard = format!("{}()", guard_pattern_name(guard_call));
        lines.push(String::new());
        lines.extend(receiver_walk(
            &calls_guard,
            &format!("`$_.{guard_call}($...)`"),
            &calls_guard,
        ));
    }
    lines
}

/// Engine-ready rule for one operation family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGuardRule {
    kind: RuleKind,
    match_pattern: MatchPattern,
    negative_condition: NegativeCondition,
    diagnostic_id: &'static str,
    diagnostic_message: String,
    severity: DiagnosticSeverity,
}

impl ChainGuardRule {
    /// Compiles `family` against `scope`.
    pub fn compile(
        family: &OperationFamily,
        scope: &ReceiverScope,
        severity: DiagnosticSeverity,
    ) -> Self {
        let definition = family.definition();
        tracing::debug!(
            rule = definition.id,
            scoped = !scope.is_unrestricted(),
            "Compiling chain guard rule"
        );
        Self {
            kind: family.kind(),
            match_pattern: MatchPattern {
                snippet: family.mutating_shape().snippet(RECEIVER_VAR),
                binding: MUTATION_VAR,
                scope: scope.predicate(),
            },
            negative_condition: NegativeCondition {
                guard_call: family.guard_call_name(),
            },
            diagnostic_id: definition.id,
            diagnostic_message: definition.diagnostic_text(),
            severity,
        }
    }

    /// Family this rule was compiled from.
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Identifier carried by the diagnostic, e.g. `enforce-delete-with-where`.
    pub fn diagnostic_id(&self) -> &'static str {
        self.diagnostic_id
    }

    /// Message text registered with the diagnostic.
    pub fn diagnostic_message(&self) -> &str {
        &self.diagnostic_message
    }

    /// Snippet, binding and receiver predicate of the rule.
    pub fn match_pattern(&self) -> &MatchPattern {
        &self.match_pattern
    }

    /// The guard-absence condition, including the guard call name.
    pub fn negative_condition(&self) -> &NegativeCondition {
        &self.negative_condition
    }

    /// Renders the rule as unindented lines.
    ///
    /// The first line is a comment naming the diagnostic, so each branch of a
    /// combined program stays identifiable.
    pub fn render_lines(&self) -> Vec<String> {
        let mut clauses: Vec<Vec<String>> = Vec::new();
        if let Some(scope) = self.match_pattern.scope.render(RECEIVER_VAR) {
            clauses.push(vec![scope]);
        }
        clauses.extend(self.negative_condition.clauses());
        clauses.push(self.registration());

        let mut lines = vec![
            format!("// {}", self.diagnostic_id),
            format!(
                "`{}` as {} where {{",
                self.match_pattern.snippet, self.match_pattern.binding
            ),
        ];
        let last = clauses.len() - 1;
        for (index, clause) in clauses.into_iter().enumerate() {
            let clause_len = clause.len();
            for (line_index, line) in clause.into_iter().enumerate() {
                let separator = if index != last && line_index + 1 == clause_len {
                    ","
                } else {
                    ""
                };
                lines.push(format!("{INDENT}{line}{separator}"));
            }
        }
        lines.push("}".to_string());
        lines
    }

    fn registration(&self) -> Vec<String> {
        vec![
            "register_diagnostic(".to_string(),
            format!("{INDENT}span = {},", MUTATION_VAR),
            format!(
                "{INDENT}message = {},",
                grit_string(&self.diagnostic_message)
            ),
            format!("{INDENT}severity = {}", grit_string(self.severity.as_str())),
            ")".to_string(),
        ]
    }
}

/// Quotes `text` as a GritQL string literal.
fn grit_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
