//! Rule composer.
//!
//! Folds the compiled [`ChainGuardRule`]s into one [`EmittedProgram`]. A
//! single rule is emitted standalone; several rules share one top-level
//! pattern through an `or { ... }` alternative, so the engine sees exactly one
//! rule declaration regardless of how many families are enabled.
//!
//! The named chain-walking patterns the blocks refer to are emitted once,
//! between the header and the rule pattern.

use crate::chain_rule::{ChainGuardRule, chain_pattern_definitions};
use crate::error::{GuardError, Result};
use crate::family::{DiagnosticSeverity, FamilySelection};
use crate::receiver::ReceiverScope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header lines every emitted program starts with.
pub const PROGRAM_HEADER: [&str; 2] = ["engine biome(1.0)", "language js"];

/// How the rule blocks share the program's entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Exactly one rule; emitted as-is.
    PassThrough,
    /// More than one rule; wrapped in `or { ... }`.
    Alternatives,
}

/// The final rule program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedProgram {
    rule_blocks: Vec<ChainGuardRule>,
    combinator: Combinator,
}

impl EmittedProgram {
    /// Compiled rules, in emission order.
    pub fn rule_blocks(&self) -> &[ChainGuardRule] {
        &self.rule_blocks
    }

    /// How the blocks are joined; fixed by the block count.
    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Distinct guard call names across all blocks, first occurrence first.
    pub fn guard_calls(&self) -> Vec<&'static str> {
        let mut calls: Vec<&'static str> = Vec::new();
        for block in &self.rule_blocks {
            let call = block.negative_condition().guard_call;
            if !calls.contains(&call) {
                calls.push(call);
            }
        }
        calls
    }

    /// Diagnostic identifiers present in the program, in emission order.
    pub fn diagnostic_ids(&self) -> Vec<&'static str> {
        self.rule_blocks
            .iter()
            .map(ChainGuardRule::diagnostic_id)
            .collect()
    }

    /// Renders the program text, ending with exactly one newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in PROGRAM_HEADER {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        for line in chain_pattern_definitions(self.guard_calls()) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');

        match self.combinator {
            Combinator::PassThrough => {
                for block in &self.rule_blocks {
                    for line in block.render_lines() {
                        out.push_str(&line);
                        out.push('\n');
                    }
                }
            }
            Combinator::Alternatives => {
                out.push_str("or {\n");
                let last = self.rule_blocks.len() - 1;
                for (index, block) in self.rule_blocks.iter().enumerate() {
                    let lines = block.render_lines();
                    let line_count = lines.len();
                    for (line_index, line) in lines.into_iter().enumerate() {
                        out.push_str("    ");
                        out.push_str(&line);
                        if index != last && line_index + 1 == line_count {
                            out.push(',');
                        }
                        out.push('\n');
                    }
                }
                out.push_str("}\n");
            }
        }
        out
    }
}

impl fmt::Display for EmittedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Accumulates rules and folds them into a program.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    rules: Vec<ChainGuardRule>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rule`; blocks are emitted in the order they were added.
    pub fn rule(mut self, rule: ChainGuardRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// # Errors
    ///
    /// [`GuardError::RenderInvariant`] when no rule was added.
    pub fn build(self) -> Result<EmittedProgram> {
        let combinator = match self.rules.len() {
            0 => {
                return Err(GuardError::render_invariant(
                    "rule composer invoked with zero rules",
                ));
            }
            1 => Combinator::PassThrough,
            _ => Combinator::Alternatives,
        };
        Ok(EmittedProgram {
            rule_blocks: self.rules,
            combinator,
        })
    }
}

/// Everything a compilation depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub families: FamilySelection,
    pub object_names: Vec<String>,
    pub severity: DiagnosticSeverity,
}

impl CompileOptions {
    /// Normalized receiver scope built from `object_names`.
    pub fn scope(&self) -> ReceiverScope {
        ReceiverScope::new(&self.object_names)
    }
}

/// Compiles the enabled families into a program.
///
/// ```
/// use whereguard_core::composer::{compile, CompileOptions};
///
/// let program = compile(&CompileOptions::default())?;
/// let text = program.render();
/// assert!(text.starts_with("engine biome(1.0)\nlanguage js\n"));
/// assert!(text.contains("enforce-delete-with-where"));
/// assert!(text.contains("enforce-update-with-where"));
/// # Ok::<(), whereguard_core::error::GuardError>(())
/// ```
///
/// # Errors
///
/// [`GuardError::NoRulesEnabled`] when both families are disabled. The
/// check happens before anything is compiled.
#[tracing::instrument(level = "debug", skip_all)]
pub fn compile(options: &CompileOptions) -> Result<EmittedProgram> {
    let families = options.families.enabled_families()?;
    let scope = options.scope();
    let program = families
        .iter()
        .map(|family| ChainGuardRule::compile(family, &scope, options.severity))
        .fold(ProgramBuilder::new(), ProgramBuilder::rule)
        .build()?;
    tracing::debug!(rules = ?program.diagnostic_ids(), "Compiled rule program");
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{OperationFamily, RuleKind};

    fn options(delete: bool, update: bool, names: &[&str]) -> CompileOptions {
        CompileOptions {
            families: FamilySelection { delete, update },
            object_names: names.iter().map(|s| s.to_string()).collect(),
            severity: DiagnosticSeverity::Error,
        }
    }

    #[test]
    fn test_default_program_contains_both_rules() {
        let program = compile(&CompileOptions::default()).unwrap();
        assert_eq!(program.combinator(), Combinator::Alternatives);
        assert_eq!(
            program.diagnostic_ids(),
            ["enforce-delete-with-where", "enforce-update-with-where"]
        );
        let text = program.render();
        assert!(text.contains("\nor {\n"));
        assert!(text.ends_with("}\n"));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn test_single_family_drops_the_alternative_wrapper() {
        let program = compile(&options(false, true, &[])).unwrap();
        assert_eq!(program.combinator(), Combinator::PassThrough);
        let text = program.render();
        assert!(!text.contains("\nor {\n"));
        assert!(!text.contains("enforce-delete-with-where"));
        assert!(text.contains("enforce-update-with-where"));
    }

    #[test]
    fn test_both_disabled_is_rejected_before_compiling() {
        let err = compile(&options(false, false, &["db"])).unwrap_err();
        assert!(matches!(err, GuardError::NoRulesEnabled));
    }

    #[test]
    fn test_empty_builder_violates_render_invariant() {
        let err = ProgramBuilder::new().build().unwrap_err();
        assert!(matches!(err, GuardError::RenderInvariant { .. }));
    }

    #[test]
    fn test_blocks_are_separated_by_a_comma() {
        let text = compile(&options(true, true, &[])).unwrap().render();
        assert!(text.contains("    },\n    // enforce-update-with-where\n"));
    }

    #[test]
    fn test_chain_patterns_are_defined_once_before_the_rules() {
        let text = compile(&options(true, true, &[])).unwrap().render();
        assert_eq!(text.matches("pattern chain_reaches($target) {").count(), 1);
        assert_eq!(text.matches("pattern chain_calls_where() {").count(), 1);
        let definitions = text.find("pattern chain_calls_where()").unwrap();
        assert!(definitions < text.find("\nor {\n").unwrap());
    }

    #[test]
    fn test_scope_is_shared_by_every_rule() {
        let text = compile(&options(true, true, &["db"])).unwrap().render();
        assert_eq!(text.matches("$obj <: `db`,").count(), 2);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let opts = options(true, true, &["tx", "db"]);
        assert_eq!(compile(&opts).unwrap().render(), compile(&opts).unwrap().render());
    }

    #[test]
    fn test_builder_keeps_insertion_order() {
        let scope = ReceiverScope::unrestricted();
        let program = ProgramBuilder::new()
            .rule(ChainGuardRule::compile(
                &OperationFamily::builtin(RuleKind::Update),
                &scope,
                DiagnosticSeverity::Error,
            ))
            .rule(ChainGuardRule::compile(
                &OperationFamily::builtin(RuleKind::Delete),
                &scope,
                DiagnosticSeverity::Error,
            ))
            .build()
            .unwrap();
        assert_eq!(program.rule_blocks()[0].kind(), RuleKind::Update);
    }
}
