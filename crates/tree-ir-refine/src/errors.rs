//! Invariant violations detected while refining.
//!
//! Refinement trusts its input. A failed invariant is a bug in whoever
//! produced the tree, so with the `strict-invariants` feature it panics.
//! Without the feature the failure is logged and the rule that noticed it
//! leaves its input unchanged.

use derive_more::Display;
use tree_ir::{NodeRef, Opcode};

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum RefineError {
    #[display("Unreachable opcode {code} at {node}")]
    UnreachableOpcode { node: NodeRef, code: Opcode },

    #[display("Fold operand {_0} is not a constant")]
    NonConstOperand(NodeRef),

    #[display("Operand of {_0} is wider than 8 bytes")]
    OperandTooWide(NodeRef),

    #[display("Malformed tree at {node}: {reason}")]
    MalformedTree { node: NodeRef, reason: &'static str },

    #[display("Stale DU edge left below {_0} after rewriting")]
    StaleDu(NodeRef),

    #[display("Illegal pointer arithmetic at {_0}")]
    IllegalPointerArith(NodeRef),

    #[display("Aggregate operands of {_0} differ in size")]
    AggregateSizeMismatch(NodeRef),

    #[display("Vector operands of {_0} differ in shape")]
    VectorShapeMismatch(NodeRef),
}

impl std::error::Error for RefineError {}

/// Enforce an invariant. Returns `ok`; the error is only built on failure.
///
/// # Panics
///
/// Panics on failure when built with `strict-invariants`.
pub(crate) fn check(ok: bool, err: impl FnOnce() -> RefineError) -> bool {
    if !ok {
        report(err());
    }
    ok
}

#[cfg(feature = "strict-invariants")]
fn report(err: RefineError) {
    panic!("refine: {err}");
}

#[cfg(not(feature = "strict-invariants"))]
fn report(err: RefineError) {
    tracing::error!(%err, "refine: invariant failed, rule skipped");
}
