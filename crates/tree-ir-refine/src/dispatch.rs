//! Opcode dispatch for expressions and statements.
//!
//! Every handler refines the kids of its node first and the node itself
//! after, so rules always see refined operands.

use tracing::warn;
use tree_ir::{IrContext, NodeRef, Opcode, slot};

use crate::config::RefineCtx;
use crate::errors::{RefineError, check};
use crate::memory::{refine_array, refine_ild, refine_istore, refine_store, refine_store_array};
use crate::rewrite::fired;
use crate::simplify::{refine_binary_op, refine_cvt, refine_neg, refine_not, refine_select};
use crate::ssa_rules::refine_phi;

// ============================================================================
// Entry points
// ============================================================================

/// Refine a statement or an expression.
///
/// Returns the node standing in place of `n`, or `None` if `n` was a
/// statement that got deleted, and whether anything changed.
pub fn refine(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (Option<NodeRef>, bool) {
    if !ctx.is_stmt(n) {
        let (new, changed) = refine_exp(ctx, n, rc);
        return (Some(new), changed);
    }
    let (new, changed) = refine_stmt(ctx, n, rc);
    if let (Some(stmt), true) = (new, changed) {
        ctx.set_parent_pointer(stmt, true);
    }
    (new, changed)
}

/// Refine an expression tree bottom-up.
pub fn refine_exp(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    use Opcode::*;
    let code = ctx.code(n);
    match code {
        Const | Id | Ld | Pr | Lda => (n, false),
        Ild => refine_ild(ctx, n, rc),
        Array => refine_array(ctx, n, rc),
        Select => refine_select(ctx, n, rc),
        Neg => refine_neg(ctx, n, rc),
        Lnot | Bnot => refine_not(ctx, n, rc),
        Cvt => refine_cvt(ctx, n, rc),
        _ if code.is_binary() => refine_binary_op(ctx, n, rc, true),
        _ => {
            check(false, || RefineError::UnreachableOpcode { node: n, code });
            (n, false)
        }
    }
}

/// Refine a branch or loop condition.
///
/// A comparison at the root keeps its shape instead of being folded, and
/// the result is always a truth value.
pub fn refine_det(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    let (new, changed) = if ctx.code(n).is_relation() {
        refine_binary_op(ctx, n, rc, false)
    } else {
        refine_exp(ctx, n, rc)
    };
    if ctx.is_judge(new) {
        (new, changed)
    } else {
        (ctx.build_judge(new), true)
    }
}

/// Refine a list of statements or expressions until nothing changes.
///
/// Deleted statements are dropped from the returned list. Sweeps stop at
/// `max_list_iterations`.
pub fn refine_ir_list(
    ctx: &mut IrContext,
    list: Vec<NodeRef>,
    rc: &mut RefineCtx,
) -> (Vec<NodeRef>, bool) {
    let saved = rc.stmt_removed;
    let cap = rc.sweep_cap();
    let mut list = list;
    let mut changed = false;
    for sweep in 1..=cap {
        let mut sweep_changed = false;
        let mut out = Vec::with_capacity(list.len());
        for n in list {
            rc.stmt_removed = false;
            let (new, c) = refine(ctx, n, rc);
            sweep_changed |= c;
            out.extend(new);
        }
        list = out;
        changed |= sweep_changed;
        if !sweep_changed {
            break;
        }
        if sweep == cap {
            warn!(sweeps = sweep, "refine_ir_list: sweep cap reached before fixpoint");
        }
    }
    rc.stmt_removed = saved;
    (list, changed)
}

// ============================================================================
// Slot helpers
// ============================================================================

/// Refine the expression in slot `idx` of `n`, if any.
pub(crate) fn refine_slot(ctx: &mut IrContext, n: NodeRef, idx: usize, rc: &mut RefineCtx) -> bool {
    let Some(kid) = ctx.opt_kid(n, idx) else {
        return false;
    };
    let (new, changed) = refine_exp(ctx, kid, rc);
    if new != kid {
        ctx.set_kid(n, idx, Some(new));
    }
    changed
}

/// Refine every expression of list slot `idx` of `n`.
pub(crate) fn refine_slot_list(
    ctx: &mut IrContext,
    n: NodeRef,
    idx: usize,
    rc: &mut RefineCtx,
) -> bool {
    let kids = ctx.kids(n, idx).to_vec();
    let mut changed = false;
    let mut out = Vec::with_capacity(kids.len());
    for &k in &kids {
        let (new, c) = refine_exp(ctx, k, rc);
        changed |= c;
        out.push(new);
    }
    if out != kids {
        ctx.set_kids(n, idx, out);
    }
    changed
}

fn refine_det_slot(ctx: &mut IrContext, n: NodeRef, idx: usize, rc: &mut RefineCtx) -> bool {
    let det = ctx.kid(n, idx);
    let (new, changed) = refine_det(ctx, det, rc);
    if new != det {
        ctx.set_kid(n, idx, Some(new));
    }
    changed
}

fn refine_body(ctx: &mut IrContext, n: NodeRef, idx: usize, rc: &mut RefineCtx) -> bool {
    let body = ctx.kids(n, idx).to_vec();
    let (body, changed) = refine_ir_list(ctx, body, rc);
    if changed {
        ctx.set_kids(n, idx, body);
    }
    changed
}

/// After a rewrite below `n`, every DU edge of the subtree must still be
/// justified by the references of both its ends.
pub(crate) fn sweep_expired(ctx: &mut IrContext, n: NodeRef) {
    if ctx.has_du_mgr() {
        let stale = ctx.remove_expired_du(n);
        check(!stale, || RefineError::StaleDu(n));
    }
}

// ============================================================================
// Statements
// ============================================================================

fn refine_stmt(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (Option<NodeRef>, bool) {
    use Opcode::*;
    let code = ctx.code(n);
    match code {
        St | StPr => refine_store(ctx, n, rc),
        StArray => refine_store_array(ctx, n, rc),
        Ist => refine_istore(ctx, n, rc),
        Phi => refine_phi(ctx, n, rc),
        Call => {
            let changed = refine_slot_list(ctx, n, slot::CALL_ARGS, rc);
            after_operands(ctx, n, changed)
        }
        Icall => {
            let mut changed = refine_slot(ctx, n, slot::ICALL_CALLEE, rc);
            changed |= refine_slot_list(ctx, n, slot::ICALL_ARGS, rc);
            after_operands(ctx, n, changed)
        }
        Return => {
            let changed = refine_slot(ctx, n, slot::RET_EXP, rc);
            after_operands(ctx, n, changed)
        }
        If => {
            let mut changed = refine_det_slot(ctx, n, slot::DET, rc);
            changed |= refine_body(ctx, n, slot::IF_TRUE_BODY, rc);
            changed |= refine_body(ctx, n, slot::IF_FALSE_BODY, rc);
            (Some(n), changed)
        }
        WhileDo | DoWhile => {
            let mut changed = refine_det_slot(ctx, n, slot::DET, rc);
            changed |= refine_body(ctx, n, slot::LOOP_BODY, rc);
            (Some(n), changed)
        }
        DoLoop => {
            let mut changed = refine_det_slot(ctx, n, slot::DET, rc);
            for idx in [slot::DO_LOOP_INIT, slot::DO_LOOP_STEP, slot::DO_LOOP_BODY] {
                changed |= refine_body(ctx, n, idx, rc);
            }
            (Some(n), changed)
        }
        Switch => {
            let mut changed = refine_slot(ctx, n, slot::SWITCH_VEXP, rc);
            if changed {
                sweep_expired(ctx, n);
            }
            changed |= refine_body(ctx, n, slot::SWITCH_BODY, rc);
            (Some(n), changed)
        }
        TrueBr | FalseBr => refine_branch(ctx, n, rc),
        Igoto => {
            let changed = refine_slot(ctx, n, slot::IGOTO_VEXP, rc);
            after_operands(ctx, n, changed)
        }
        Goto | Label | Break | Continue => (Some(n), false),
        _ => {
            check(false, || RefineError::UnreachableOpcode { node: n, code });
            (Some(n), false)
        }
    }
}

fn after_operands(ctx: &mut IrContext, n: NodeRef, changed: bool) -> (Option<NodeRef>, bool) {
    if changed {
        ctx.set_parent_pointer(n, false);
        sweep_expired(ctx, n);
    }
    (Some(n), changed)
}

/// `falsebr (a != b)` becomes `truebr (a == b)`.
fn refine_branch(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (Option<NodeRef>, bool) {
    let mut changed = refine_det_slot(ctx, n, slot::DET, rc);
    let det = ctx.kid(n, slot::DET);
    if ctx.code(n) == Opcode::FalseBr && ctx.code(det) == Opcode::Ne {
        ctx.set_code(det, Opcode::Eq);
        ctx.set_code(n, Opcode::TrueBr);
        fired("falsebr_of_ne", n);
        changed = true;
    }
    after_operands(ctx, n, changed)
}
