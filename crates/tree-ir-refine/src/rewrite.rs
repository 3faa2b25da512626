//! Ownership helpers shared by the rewrite rules.
//!
//! A rule that drops part of a tree must cut the dropped nodes out of the
//! DU and SSA graphs before releasing them; the arena refuses to release a
//! node something still refers to.

use tracing::trace;
use tree_ir::{IrContext, NodeRef};

use crate::config::RefineCtx;

/// Release a detached expression subtree whose value is no longer used.
pub(crate) fn discard(ctx: &mut IrContext, n: NodeRef) {
    if ctx.has_du_mgr() {
        ctx.remove_use_out_from_defset(n);
    }
    ctx.remove_ssa_uses_in(n);
    ctx.free_ir_tree(n);
}

/// Detach the kid in slot `idx` of `n` and release everything else of `n`.
pub(crate) fn splice_kid(ctx: &mut IrContext, n: NodeRef, idx: usize) -> NodeRef {
    let kid = ctx.kid(n, idx);
    ctx.take_kid(n, idx);
    discard(ctx, n);
    kid
}

/// Release `n` and return `replacement` in its place.
pub(crate) fn replace_with(ctx: &mut IrContext, n: NodeRef, replacement: NodeRef) -> NodeRef {
    discard(ctx, n);
    replacement
}

/// Unlink a statement from its block, if it sits in one.
pub(crate) fn detach_stmt(ctx: &mut IrContext, stmt: NodeRef) -> bool {
    match ctx.node(stmt).bb {
        Some(bb) => ctx.remove_stmt(bb, stmt),
        None => false,
    }
}

/// Delete a statement outright: cut it from the DU and SSA graphs, unlink
/// it from its block and release it.
pub(crate) fn remove_stmt(ctx: &mut IrContext, stmt: NodeRef, rc: &mut RefineCtx) {
    if ctx.has_du_mgr() {
        ctx.remove_ir_out_from_du_mgr(stmt);
    }
    if detach_stmt(ctx, stmt) {
        rc.stmt_removed = true;
    }
    ctx.remove_ssa_uses_in(stmt);
    ctx.free_ir_tree(stmt);
}

pub(crate) fn fired(rule: &'static str, n: NodeRef) {
    trace!(rule, node = %n, "rewrite");
}

/// Positive power of two.
pub(crate) fn is_pow2(v: i64) -> bool {
    v > 0 && v & (v - 1) == 0
}

pub(crate) fn log2(v: i64) -> i64 {
    i64::from(v.trailing_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_ir::{DataType, Opcode, VarData};

    #[test]
    fn pow2_helpers() {
        assert!(is_pow2(1) && is_pow2(64));
        assert!(!is_pow2(0) && !is_pow2(-4) && !is_pow2(i64::MIN) && !is_pow2(12));
        assert_eq!(log2(64), 6);
    }

    #[test]
    fn splice_cuts_du_edges_of_dropped_operand() {
        let mut ctx = IrContext::new();
        ctx.enable_du_mgr();
        let i32t = ctx.types.simplex(DataType::I32);
        let a = ctx.vars.add(VarData::new("a", i32t));
        let bb = ctx.create_bb();
        let one = ctx.build_imm_int(1, i32t);
        let def = ctx.build_store(a, i32t, 0, one);
        ctx.append_stmt(bb, def);

        let x = ctx.build_pr(1, i32t);
        let ld = ctx.build_load(a, i32t);
        let mul = ctx.build_binary(Opcode::Mul, i32t, x, ld);
        ctx.add_du_edge(def, ld);

        let kept = splice_kid(&mut ctx, mul, 0);
        assert_eq!(kept, x);
        assert_eq!(ctx.parent(x), None);
        assert!(ctx.is_released(mul) && ctx.is_released(ld));
        assert!(ctx.du_set(def).is_empty());
    }
}
