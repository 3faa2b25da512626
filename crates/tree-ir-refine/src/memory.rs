//! Loads and stores.
//!
//! An indirect access through the address of a variable becomes a direct
//! access of that variable, and a store of a location back into itself is
//! deleted. Rewritten accesses inherit the reference info and DU edges of
//! the node they replace; where a location had to be generated afresh,
//! inherited edges that no longer overlap are dropped.

use tree_ir::{IrContext, NodeRef, Opcode, slot};

use crate::coerce::coerce_slot;
use crate::config::RefineCtx;
use crate::dispatch::{refine_slot, refine_slot_list, sweep_expired};
use crate::rewrite::{detach_stmt, discard, fired, remove_stmt};

/// `ild(lda v + a) + b` to `ld v + (a + b)`.
pub(crate) fn refine_ild(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    let changed = refine_slot(ctx, n, slot::ILD_BASE, rc);
    let base = ctx.kid(n, slot::ILD_BASE);
    let Some((var, ofst)) = lda_target(ctx, base) else {
        return (n, changed);
    };
    let ty = ctx.ty(n);
    let ld = ctx.build_load(var, ty);
    ctx.attrs_mut(ld).ofst = ofst + ctx.attrs(n).ofst;

    let generated = ctx.get_exact_ref(n).is_none() && ctx.has_du_mgr();
    if generated {
        let md = ctx.gen_md_for_load(ld);
        ctx.set_ref_md(ld, Some(md));
    } else {
        ctx.copy_ref(ld, n);
    }
    if ctx.has_du_mgr() {
        ctx.change_use(ld, n);
        if generated {
            ctx.remove_expired_du(ld);
        }
    }
    discard(ctx, n);
    fired("ild_of_lda", n);
    (ld, true)
}

/// Variable and offset addressed by an `lda`.
fn lda_target(ctx: &IrContext, n: NodeRef) -> Option<(tree_ir::VarRef, i64)> {
    if ctx.code(n) != Opcode::Lda {
        return None;
    }
    Some((ctx.attrs(n).var?, ctx.attrs(n).ofst))
}

/// `ist(lda v + a) + b = rhs` to `st v + (a + b) = rhs`.
///
/// The new store is not linked into a block; the caller puts it where the
/// indirect store was.
pub(crate) fn refine_istore(
    ctx: &mut IrContext,
    n: NodeRef,
    rc: &mut RefineCtx,
) -> (Option<NodeRef>, bool) {
    let mut changed = refine_slot(ctx, n, slot::IST_BASE, rc);
    changed |= refine_slot(ctx, n, slot::IST_RHS, rc);

    let mut stmt = n;
    let base = ctx.kid(n, slot::IST_BASE);
    if let Some((var, ofst)) = lda_target(ctx, base) {
        let ty = ctx.ty(n);
        let rhs = ctx.kid(n, slot::IST_RHS);
        ctx.take_kid(n, slot::IST_RHS);
        let st = ctx.build_store(var, ty, ofst + ctx.attrs(n).ofst, rhs);

        ctx.copy_ref(st, n);
        let maybe_expired = ctx.ref_md(st).is_none();
        if maybe_expired {
            let md = ctx.gen_md_for_store(st);
            ctx.set_ref_md(st, Some(md));
            ctx.clean_ref_mds(st);
        }
        if ctx.has_du_mgr() {
            ctx.change_def(st, n);
            if maybe_expired {
                ctx.remove_expired_du_for_stmt(st);
            }
        }
        detach_stmt(ctx, n);
        discard(ctx, n);
        fired("ist_of_lda", n);
        stmt = st;
        changed = true;
    }

    if rc.insert_cvt {
        let ty = ctx.ty(stmt);
        changed |= coerce_slot(ctx, stmt, rhs_slot(ctx, stmt), ty);
    }
    if changed {
        ctx.set_parent_pointer(stmt, false);
        sweep_expired(ctx, stmt);
    }
    (Some(stmt), changed)
}

fn rhs_slot(ctx: &IrContext, stmt: NodeRef) -> usize {
    ctx.code(stmt).rhs_slot().unwrap_or(slot::ST_RHS)
}

/// Direct and register stores.
pub(crate) fn refine_store(
    ctx: &mut IrContext,
    n: NodeRef,
    rc: &mut RefineCtx,
) -> (Option<NodeRef>, bool) {
    if rc.refine_stmt && is_self_register_copy(ctx, n) {
        fired("self_register_copy", n);
        remove_stmt(ctx, n, rc);
        return (None, true);
    }

    let mut changed = refine_slot(ctx, n, slot::ST_RHS, rc);
    let rhs = ctx.kid(n, slot::ST_RHS);
    if rc.refine_stmt && ctx.code(rhs) != Opcode::Cvt && stores_back(ctx, n, rhs) {
        fired("self_copy", n);
        remove_stmt(ctx, n, rc);
        return (None, true);
    }

    if rc.insert_cvt {
        let ty = ctx.ty(n);
        changed |= coerce_slot(ctx, n, slot::ST_RHS, ty);
    }
    if changed {
        ctx.set_parent_pointer(n, false);
        sweep_expired(ctx, n);
    }
    (Some(n), changed)
}

fn is_self_register_copy(ctx: &IrContext, n: NodeRef) -> bool {
    let rhs = ctx.kid(n, slot::ST_RHS);
    ctx.code(n) == Opcode::StPr
        && ctx.code(rhs) == Opcode::Pr
        && ctx.attrs(rhs).prno == ctx.attrs(n).prno
}

/// Whether `rhs` reads exactly the location statement `n` writes.
fn stores_back(ctx: &IrContext, n: NodeRef, rhs: NodeRef) -> bool {
    if let (Some(a), Some(b)) = (ctx.get_exact_ref(n), ctx.get_exact_ref(rhs)) {
        return a == b;
    }
    let (s, r) = (ctx.attrs(n), ctx.attrs(rhs));
    ctx.code(n) == Opcode::St
        && ctx.code(rhs) == Opcode::Ld
        && ctx.ty(n) == ctx.ty(rhs)
        && s.var.is_some()
        && s.var == r.var
        && s.ofst == r.ofst
}

/// Array element stores.
pub(crate) fn refine_store_array(
    ctx: &mut IrContext,
    n: NodeRef,
    rc: &mut RefineCtx,
) -> (Option<NodeRef>, bool) {
    let mut changed = refine_slot(ctx, n, slot::ARR_BASE, rc);
    changed |= refine_slot_list(ctx, n, slot::ARR_SUBS, rc);
    changed |= refine_slot(ctx, n, slot::STARR_RHS, rc);

    let rhs = ctx.kid(n, slot::STARR_RHS);
    if rc.refine_stmt && same_element(ctx, n, rhs) {
        fired("self_copy_element", n);
        remove_stmt(ctx, n, rc);
        return (None, true);
    }

    if rc.insert_cvt {
        let ty = ctx.ty(n);
        changed |= coerce_slot(ctx, n, slot::STARR_RHS, ty);
    }
    if changed {
        ctx.set_parent_pointer(n, false);
        sweep_expired(ctx, n);
    }
    (Some(n), changed)
}

fn same_element(ctx: &IrContext, n: NodeRef, rhs: NodeRef) -> bool {
    if let (Some(a), Some(b)) = (ctx.get_exact_ref(n), ctx.get_exact_ref(rhs)) {
        return a == b;
    }
    if ctx.code(rhs) != Opcode::Array || ctx.ty(rhs) != ctx.ty(n) {
        return false;
    }
    let (subs, rhs_subs) = (ctx.kids(n, slot::ARR_SUBS), ctx.kids(rhs, slot::ARR_SUBS));
    ctx.is_ir_equal(ctx.kid(n, slot::ARR_BASE), ctx.kid(rhs, slot::ARR_BASE))
        && subs.len() == rhs_subs.len()
        && subs.iter().zip(rhs_subs).all(|(&a, &b)| ctx.is_ir_equal(a, b))
}

/// Array element reads: base and subscripts only.
pub(crate) fn refine_array(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    let mut changed = refine_slot(ctx, n, slot::ARR_BASE, rc);
    changed |= refine_slot_list(ctx, n, slot::ARR_SUBS, rc);
    (n, changed)
}
