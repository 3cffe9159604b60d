//! Chain-scope guard matcher, evaluation side.
//!
//! Two method calls are on the same chain when walking from each through
//! "the call invoked on my result" reaches the same outermost call. The walk
//! only ever moves through the receiver position of a member-call, so it
//! never enters an argument list, a function body, a sibling statement or a
//! bare property access.

use crate::family::{MutatingShape, OperationFamily, RuleKind};
use crate::receiver::ReceiverScope;
use crate::syntax::{NodeId, NodeKind, Span, SyntaxTree};

/// A call of the form `receiver.name(arguments...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodCall<'a> {
    pub call: NodeId,
    /// Receiver with transparent wrappers stripped.
    pub receiver: NodeId,
    pub name: &'a str,
    pub arguments: &'a [NodeId],
}

/// Views `id` as a method call, if it is one.
pub fn method_call(tree: &SyntaxTree, id: NodeId) -> Option<MethodCall<'_>> {
    let NodeKind::Call { callee, arguments } = tree.kind(id) else {
        return None;
    };
    let NodeKind::Member { object, property } = tree.kind(tree.strip(*callee)) else {
        return None;
    };
    Some(MethodCall {
        call: id,
        receiver: tree.strip(*object),
        name: property,
        arguments,
    })
}

/// The method call invoked directly on the result of `call`, if any.
///
/// `call` must sit (through transparent wrappers) in the object position of
/// a member expression that is itself the callee of a call.
pub fn enclosing_call(tree: &SyntaxTree, call: NodeId) -> Option<NodeId> {
    let lifted = tree.lift(call);
    let member = tree.parent(lifted)?;
    let NodeKind::Member { object, .. } = tree.kind(member) else {
        return None;
    };
    if *object != lifted {
        return None;
    }
    let member = tree.lift(member);
    let outer = tree.parent(member)?;
    match tree.kind(outer) {
        NodeKind::Call { callee, .. } if *callee == member => Some(outer),
        _ => None,
    }
}

/// The outermost call of the chain `call` belongs to.
pub fn chain_top(tree: &SyntaxTree, call: NodeId) -> NodeId {
    let mut top = call;
    while let Some(outer) = enclosing_call(tree, top) {
        top = outer;
    }
    top
}

/// Returns whether `a` and `b` belong to the same chain.
pub fn same_chain(tree: &SyntaxTree, a: NodeId, b: NodeId) -> bool {
    chain_top(tree, a) == chain_top(tree, b)
}

/// The method calls of one chain, innermost first, and its root receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub root: NodeId,
    pub calls: Vec<NodeId>,
}

impl Chain {
    /// Resolves the whole chain containing `call`.
    pub fn containing(tree: &SyntaxTree, call: NodeId) -> Self {
        let mut calls = Vec::new();
        let mut current = chain_top(tree, call);
        let root = loop {
            match method_call(tree, current) {
                Some(method) => {
                    calls.push(current);
                    current = method.receiver;
                }
                None => break current,
            }
        };
        calls.reverse();
        Self { root, calls }
    }

    /// Method names in call order.
    pub fn method_names<'t>(&self, tree: &'t SyntaxTree) -> Vec<&'t str> {
        self.calls
            .iter()
            .filter_map(|id| method_call(tree, *id).map(|m| m.name))
            .collect()
    }

    pub fn has_call_named(&self, tree: &SyntaxTree, name: &str) -> bool {
        self.calls
            .iter()
            .any(|id| method_call(tree, *id).is_some_and(|m| m.name == name))
    }
}

/// A call matching a family's mutating shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSite {
    pub kind: RuleKind,
    /// The anchor call, reported as the diagnostic span.
    pub call: NodeId,
    /// The receiver bound to `$obj`.
    pub receiver: NodeId,
}

/// Matches `id` against `shape`, returning the receiver on success.
pub fn match_shape(tree: &SyntaxTree, id: NodeId, shape: &MutatingShape) -> Option<NodeId> {
    let anchor = method_call(tree, id)?;
    let primary = match &shape.secondary {
        Some(secondary) => {
            if anchor.name != secondary.method || anchor.arguments.len() != 1 {
                return None;
            }
            method_call(tree, anchor.receiver)?
        }
        None => anchor,
    };
    (primary.name == shape.primary.method && primary.arguments.len() == 1)
        .then_some(primary.receiver)
}

/// An unguarded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: RuleKind,
    pub call: NodeId,
    pub span: Span,
    pub receiver: String,
}

/// Finds every mutation of an enabled family whose receiver is in scope and
/// whose chain has no guard call.
///
/// Call sites are reported independently, in source order.
pub fn find_violations(
    tree: &SyntaxTree,
    families: &[OperationFamily],
    scope: &ReceiverScope,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for id in tree.ids() {
        for family in families.iter().filter(|f| f.is_enabled()) {
            let Some(receiver) = match_shape(tree, id, family.mutating_shape()) else {
                continue;
            };
            let site = MutationSite {
                kind: family.kind(),
                call: id,
                receiver,
            };
            let receiver_text = tree.text(site.receiver);
            if !scope.admits(receiver_text) {
                tracing::trace!(receiver = receiver_text, "Receiver out of scope");
                continue;
            }
            let chain = Chain::containing(tree, site.call);
            if chain.has_call_named(tree, family.guard_call_name()) {
                continue;
            }
            violations.push(Violation {
                kind: site.kind,
                call: site.call,
                span: tree.span(site.call),
                receiver: receiver_text.to_string(),
            });
        }
    }
    violations
}
