//! Rules that read SSA use/def links.

use tree_ir::{IrContext, NodeRef, Opcode, slot};

use crate::config::RefineCtx;
use crate::errors::{RefineError, check};
use crate::rewrite::{fired, remove_stmt, replace_with};

/// The common integer value of a phi whose operands are all the same
/// integer literal.
fn uniform_phi_value(ctx: &IrContext, phi: NodeRef) -> Option<i64> {
    let opnds = ctx.kids(phi, slot::PHI_OPNDS);
    let first = ctx.const_int(*opnds.first()?)?;
    opnds
        .iter()
        .all(|&o| ctx.const_int(o) == Some(first))
        .then_some(first)
}

/// A phi merging one literal everywhere is replaced by that literal at
/// each of its uses, and the phi is deleted.
pub(crate) fn refine_phi(
    ctx: &mut IrContext,
    n: NodeRef,
    rc: &mut RefineCtx,
) -> (Option<NodeRef>, bool) {
    let (Some(v), Some(info)) = (uniform_phi_value(ctx, n), ctx.ssa_of(n)) else {
        return (Some(n), false);
    };
    let uses: Vec<NodeRef> = ctx.ssa_info(info).uses.iter().copied().collect();
    for &u in &uses {
        if !check(ctx.parent(u).is_some(), || RefineError::MalformedTree {
            node: u,
            reason: "phi use has no parent",
        }) {
            return (Some(n), false);
        }
    }

    for u in uses {
        let Some(parent) = ctx.parent(u) else {
            continue;
        };
        let ty = ctx.ty(u);
        let lit = ctx.build_imm_int(ctx.types.normalize_int(ty, v), ty);
        ctx.replace_kid(parent, u, lit);
        ctx.remove_ssa_use(u);
        if ctx.has_du_mgr() {
            ctx.remove_use_out_from_defset(u);
        }
        ctx.free_ir(u);
    }
    ctx.clean_ssa_du(info);
    fired("uniform_phi", n);
    remove_stmt(ctx, n, rc);
    (None, true)
}

/// Decide `$a rel $b` where both registers are defined by phis of one
/// block that merge pairwise equal literals.
///
/// Returns the truth value replacing `n`, or `None` when the comparison
/// cannot be decided this way.
pub(crate) fn refine_det_via_ssa(ctx: &mut IrContext, n: NodeRef) -> Option<NodeRef> {
    let (op0, op1) = (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1));
    if ctx.code(op0) != Opcode::Pr || ctx.code(op1) != Opcode::Pr {
        return None;
    }
    let (d0, d1) = (ctx.ssa_def_of(op0)?, ctx.ssa_def_of(op1)?);
    if ctx.code(d0) != Opcode::Phi || ctx.code(d1) != Opcode::Phi {
        return None;
    }
    let bb = ctx.node(d0).bb;
    if bb.is_none() || bb != ctx.node(d1).bb {
        return None;
    }

    let (a, b) = (ctx.kids(d0, slot::PHI_OPNDS), ctx.kids(d1, slot::PHI_OPNDS));
    let pairwise_equal = !a.is_empty()
        && a.len() == b.len()
        && a.iter().zip(b).all(|(&x, &y)| {
            matches!((ctx.const_int(x), ctx.const_int(y)), (Some(p), Some(q)) if p == q)
        });
    if !pairwise_equal {
        return None;
    }

    let v = match ctx.code(n) {
        Opcode::Eq | Opcode::Le | Opcode::Ge => 1,
        _ => 0,
    };
    let ty = ctx.ty(n);
    let lit = ctx.build_imm_int(v, ty);
    fired("det_via_phi", n);
    Some(replace_with(ctx, n, lit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_ir::printer::print_bb_list;
    use tree_ir::{BbRef, DataType, TypeRef};

    use crate::driver::refine_stmt_list;

    /// `$prno = phi(values...)` appended to `bb`, with SSA info.
    fn phi(ctx: &mut IrContext, bb: BbRef, prno: u32, ty: TypeRef, values: &[i64]) -> NodeRef {
        let opnds: Vec<NodeRef> = values.iter().map(|&v| ctx.build_imm_int(v, ty)).collect();
        let phi = ctx.build_phi(prno, ty, opnds);
        ctx.set_parent_pointer(phi, false);
        ctx.new_ssa_info(phi);
        ctx.append_stmt(bb, phi);
        phi
    }

    fn use_of(ctx: &mut IrContext, def: NodeRef, prno: u32, ty: TypeRef) -> NodeRef {
        let pr = ctx.build_pr(prno, ty);
        let info = ctx.ssa_of(def).unwrap();
        ctx.add_ssa_use(info, pr);
        pr
    }

    #[test]
    fn uniform_phi_is_propagated_and_removed() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        let p = phi(&mut ctx, bb, 1, i32t, &[5, 5]);
        let u = use_of(&mut ctx, p, 1, i32t);
        let one = ctx.build_imm_int(1, i32t);
        let add = ctx.build_binary(Opcode::Add, i32t, u, one);
        let st = ctx.build_store_pr(2, i32t, add);
        ctx.set_parent_pointer(st, true);
        ctx.append_stmt(bb, st);

        let mut rc = RefineCtx::default();
        assert!(refine_stmt_list(&mut ctx, bb, &mut rc));
        assert!(ctx.is_released(p) && ctx.is_released(u));
        insta::assert_snapshot!(print_bb_list(&ctx), @r"
        bb0:
            stpr $2:i32
                intconst:i32 6
        ");
    }

    #[test]
    fn mixed_phi_stays() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        let p = phi(&mut ctx, bb, 1, i32t, &[5, 6]);
        let mut rc = RefineCtx::default();
        assert_eq!(refine_phi(&mut ctx, p, &mut rc), (Some(p), false));
    }

    #[test]
    fn comparison_of_matching_phis_is_decided() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        let p1 = phi(&mut ctx, bb, 1, i32t, &[1, 2]);
        let p2 = phi(&mut ctx, bb, 2, i32t, &[1, 2]);
        for (code, expect) in [(Opcode::Le, 1), (Opcode::Ne, 0)] {
            let a = use_of(&mut ctx, p1, 1, i32t);
            let b = use_of(&mut ctx, p2, 2, i32t);
            let cmp = ctx.build_cmp(code, a, b);
            let lit = refine_det_via_ssa(&mut ctx, cmp).unwrap();
            assert_eq!(ctx.const_int(lit), Some(expect));
            assert!(ctx.is_released(a) && ctx.is_released(b));
        }
        let info = ctx.ssa_of(p1).unwrap();
        assert!(ctx.ssa_info(info).uses.is_empty());
    }

    #[test]
    fn phis_of_different_blocks_are_not_compared() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let (bb0, bb1) = (ctx.create_bb(), ctx.create_bb());
        let p1 = phi(&mut ctx, bb0, 1, i32t, &[1, 2]);
        let p2 = phi(&mut ctx, bb1, 2, i32t, &[1, 2]);
        let a = use_of(&mut ctx, p1, 1, i32t);
        let b = use_of(&mut ctx, p2, 2, i32t);
        let cmp = ctx.build_cmp(Opcode::Eq, a, b);
        assert_eq!(refine_det_via_ssa(&mut ctx, cmp), None);
    }
}
