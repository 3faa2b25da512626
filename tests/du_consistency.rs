//! Def-Use and SSA links stay consistent across rewrites.

mod common;

use common::Region;
use irrefine::ir::{NodeRef, Opcode, TypeRef, VarRef, slot};
use irrefine::{IrContext, RefineCtx, refine_bb_list, validate};

fn exact_store(ctx: &mut IrContext, var: VarRef, ty: TypeRef, v: i64) -> NodeRef {
    let lit = ctx.build_imm_int(v, ty);
    let st = ctx.build_store(var, ty, 0, lit);
    let md = ctx.gen_md_for_store(st);
    ctx.set_ref_md(st, Some(md));
    st
}

fn exact_load(ctx: &mut IrContext, var: VarRef, ty: TypeRef) -> NodeRef {
    let ld = ctx.build_load(var, ty);
    let md = ctx.gen_md_for_load(ld);
    ctx.set_ref_md(ld, Some(md));
    ld
}

/// Every edge left in the region joins locations that may overlap, or
/// has an end whose location is unknown.
fn assert_edges_justified(ctx: &IrContext) {
    for n in irrefine::ir::walk::reachable_nodes(ctx) {
        for &peer in ctx.du_set(n) {
            if let (Some(a), Some(b)) = (ctx.ref_md(n), ctx.ref_md(peer)) {
                assert!(ctx.mds.overlaps(a, b), "{n} -> {peer} joins disjoint locations");
            }
        }
    }
}

#[test]
fn doubling_copies_edges_onto_the_copy() {
    let mut r = Region::with_du();
    let a = r.var("a");
    let st = exact_store(&mut r.ctx, a, r.i32t, 1);
    r.push(st);
    let ld = exact_load(&mut r.ctx, a, r.i32t);
    let two = r.ctx.build_imm_int(2, r.i32t);
    let mul = r.ctx.build_binary(Opcode::Mul, r.i32t, ld, two);
    let use_ = r.ctx.build_store_pr(1, r.i32t, mul);
    r.push(use_);
    r.ctx.add_du_edge(st, ld);

    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    let add = r.ctx.kid(use_, slot::ST_RHS);
    assert_eq!(r.ctx.code(add), Opcode::Add);
    let copy = r.ctx.kid(add, slot::OPND1);
    assert_ne!(copy, ld);
    assert_eq!(r.ctx.du_set(st).len(), 2);
    assert!(r.ctx.du_set(copy).contains(&st));
    validate(&r.ctx).unwrap();
}

#[test]
fn dropped_operand_loses_its_edges() {
    let mut r = Region::with_du();
    let a = r.var("a");
    let st = exact_store(&mut r.ctx, a, r.i32t, 1);
    r.push(st);
    let ld = exact_load(&mut r.ctx, a, r.i32t);
    let zero = r.ctx.build_imm_int(0, r.i32t);
    let mul = r.ctx.build_binary(Opcode::Mul, r.i32t, ld, zero);
    let use_ = r.ctx.build_store_pr(1, r.i32t, mul);
    r.push(use_);
    r.ctx.add_du_edge(st, ld);

    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    assert!(r.ctx.is_released(ld));
    assert!(r.ctx.du_set(st).is_empty());
    validate(&r.ctx).unwrap();
}

#[test]
fn deleted_self_copy_takes_its_edges_along() {
    let mut r = Region::with_du();
    let a = r.var("a");
    let def = exact_store(&mut r.ctx, a, r.i32t, 1);
    r.push(def);
    let ld = exact_load(&mut r.ctx, a, r.i32t);
    let copy = r.ctx.build_store(a, r.i32t, 0, ld);
    let md = r.ctx.gen_md_for_store(copy);
    r.ctx.set_ref_md(copy, Some(md));
    r.push(copy);
    let later = exact_load(&mut r.ctx, a, r.i32t);
    let use_ = r.ctx.build_store_pr(1, r.i32t, later);
    r.push(use_);
    r.ctx.add_du_edge(def, ld);
    r.ctx.add_du_edge(copy, later);

    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    assert_eq!(r.ctx.bb_stmts(r.bb), &[def, use_]);
    assert!(r.ctx.du_set(def).is_empty());
    assert!(r.ctx.du_set(later).is_empty());
    validate(&r.ctx).unwrap();
}

/// The indirect store may have defined more than the direct store it turns
/// into. Edges the direct store cannot justify are dropped, everything it
/// can justify or cannot judge is kept.
#[test]
fn narrowed_store_keeps_only_justified_edges() {
    let mut r = Region::with_du();
    let (a, b) = (r.var("a"), r.var("b"));
    let lda = r.ctx.build_lda(a, 0);
    let v = r.ctx.build_imm_int(10, r.i32t);
    let ist = r.ctx.build_ist(lda, 0, v, r.i32t);
    let whole_a = r.ctx.mds.register(irrefine::ir::MdData::whole(a));
    let whole_b = r.ctx.mds.register(irrefine::ir::MdData::whole(b));
    let may = r.ctx.mds.intern_set([whole_a, whole_b]);
    r.ctx.set_ref_mds(ist, Some(may));
    r.push(ist);

    let ld_a = exact_load(&mut r.ctx, a, r.i32t);
    let ld_b = exact_load(&mut r.ctx, b, r.i32t);
    let opaque = r.ctx.build_pr(7, r.i32t);
    let sum = r.ctx.build_binary(Opcode::Add, r.i32t, ld_a, ld_b);
    let use_ab = r.ctx.build_store_pr(1, r.i32t, sum);
    r.push(use_ab);
    let use_opaque = r.ctx.build_store_pr(2, r.i32t, opaque);
    r.push(use_opaque);
    for u in [ld_a, ld_b, opaque] {
        r.ctx.add_du_edge(ist, u);
    }

    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    let st = r.ctx.bb_stmts(r.bb)[0];
    assert_eq!(r.ctx.code(st), Opcode::St);
    assert_eq!(r.ctx.ref_mds(st), None);
    let reached: Vec<_> = r.ctx.du_set(st).iter().copied().collect();
    assert_eq!(reached, vec![ld_a, opaque]);
    assert!(r.ctx.du_set(ld_b).is_empty());
    assert_edges_justified(&r.ctx);
    validate(&r.ctx).unwrap();
}

#[test]
fn region_without_du_manager_is_refined_syntactically() {
    let mut r = Region::new();
    let a = r.var("a");
    let lda = r.ctx.build_lda(a, 4);
    let ild = r.ctx.build_ild(lda, 0, r.i32t);
    let one = r.ctx.build_imm_int(1, r.i32t);
    let sum = r.ctx.build_binary(Opcode::Add, r.i32t, one, ild);
    let st = r.ctx.build_store_pr(1, r.i32t, sum);
    r.push(st);

    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    let sum = r.ctx.kid(st, slot::ST_RHS);
    let ld = r.ctx.kid(sum, slot::OPND0);
    assert_eq!(r.ctx.code(ld), Opcode::Ld);
    assert_eq!(r.ctx.ref_md(ld), None);
    assert!(r.ctx.du_mgr().is_none());
    validate(&r.ctx).unwrap();
}
