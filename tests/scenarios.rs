//! End-to-end rewrites of small regions.

mod common;

use common::Region;
use insta::assert_snapshot;
use irrefine::ir::printer::{print_bb_list, print_ir};
use irrefine::ir::{DataType, Opcode, slot};
use irrefine::refine::{refine, refine_exp, refine_stmt_list};
use irrefine::{RefineCtx, refine_bb_list};

#[test]
fn self_assignment_is_deleted() {
    let mut r = Region::new();
    let p = r.ctx.build_pr(1, r.i32t);
    let copy = r.ctx.build_store_pr(1, r.i32t, p);
    r.push(copy);
    let v = r.ctx.build_imm_int(3, r.i32t);
    let keep = r.ctx.build_store_pr(2, r.i32t, v);
    r.push(keep);

    let mut rc = RefineCtx::default();
    assert_eq!(refine(&mut r.ctx, copy, &mut rc), (None, true));
    assert!(rc.stmt_removed);
    assert_eq!(r.ctx.bb_stmts(r.bb), &[keep]);
}

#[test]
fn self_assignment_survives_without_statement_rules() {
    let mut r = Region::new();
    let p = r.ctx.build_pr(1, r.i32t);
    let copy = r.ctx.build_store_pr(1, r.i32t, p);
    r.push(copy);
    let mut rc = RefineCtx::default().with_refine_stmt(false);
    assert!(!refine_stmt_list(&mut r.ctx, r.bb, &mut rc));
    assert_eq!(r.ctx.bb_stmts(r.bb), &[copy]);
}

#[test]
fn multiply_by_four_becomes_shift() {
    let mut r = Region::new();
    let a = r.var("a");
    let ld = r.ctx.build_load(a, r.i32t);
    let four = r.ctx.build_imm_int(4, r.i32t);
    let mul = r.ctx.build_binary(Opcode::Mul, r.i32t, ld, four);
    let (new, changed) = refine_exp(&mut r.ctx, mul, &mut RefineCtx::default());
    assert!(changed);
    assert_snapshot!(print_ir(&r.ctx, new), @r"
    lsl:i32
        ld:i32 'a'
        intconst:i32 2
    ");
}

#[test]
fn float_division_of_constants_folds() {
    let mut r = Region::new();
    let f64t = r.ctx.types.simplex(DataType::F64);
    let six = r.ctx.build_imm_fp(6.0, f64t);
    let two = r.ctx.build_imm_fp(2.0, f64t);
    let div = r.ctx.build_binary(Opcode::Div, f64t, six, two);
    let (new, _) = refine_exp(&mut r.ctx, div, &mut RefineCtx::default());
    assert_snapshot!(print_ir(&r.ctx, new), @"fpconst:f64 3.0");

    let six = r.ctx.build_imm_fp(6.0, f64t);
    let two = r.ctx.build_imm_fp(2.0, f64t);
    let div = r.ctx.build_binary(Opcode::Div, f64t, six, two);
    let mut rc = RefineCtx::default().with_opt_float(false);
    assert_eq!(refine_exp(&mut r.ctx, div, &mut rc), (div, false));
}

#[test]
fn indirect_load_of_address_becomes_load() {
    let mut r = Region::new();
    let v = r.var("v");
    let lda = r.ctx.build_lda(v, 0);
    let ild = r.ctx.build_ild(lda, 12, r.i32t);
    let st = r.ctx.build_store_pr(1, r.i32t, ild);
    r.push(st);
    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    assert_snapshot!(print_bb_list(&r.ctx), @r"
    bb0:
        stpr $1:i32
            ld:i32 'v' ofst:12
    ");
}

#[test]
fn select_of_inequality_becomes_not() {
    let mut r = Region::new();
    let p = r.ctx.build_pr(1, r.i32t);
    let zero = r.ctx.build_imm_int(0, r.i32t);
    let ne = r.ctx.build_cmp(Opcode::Ne, p, zero);
    let t = r.ctx.build_imm_int(0, r.i32t);
    let f = r.ctx.build_imm_int(1, r.i32t);
    let sel = r.ctx.build_select(ne, t, f, r.i32t);
    let (new, _) = refine_exp(&mut r.ctx, sel, &mut RefineCtx::default());
    assert_snapshot!(print_ir(&r.ctx, new), @r"
    cvt:i32
        lnot:bool
            $1:i32
    ");
}

#[test]
fn uniform_phi_feeds_its_uses() {
    let mut r = Region::new();
    let opnds: Vec<_> = (0..3).map(|_| r.ctx.build_imm_int(5, r.i32t)).collect();
    let phi = r.ctx.build_phi(1, r.i32t, opnds);
    let info = r.ctx.new_ssa_info(phi);
    r.push(phi);

    for prno in [2, 3] {
        let u = r.ctx.build_pr(1, r.i32t);
        r.ctx.add_ssa_use(info, u);
        let st = r.ctx.build_store_pr(prno, r.i32t, u);
        r.push(st);
    }

    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    assert!(r.ctx.is_released(phi));
    assert!(r.ctx.ssa_info(info).uses.is_empty());
    assert_snapshot!(print_bb_list(&r.ctx), @r"
    bb0:
        stpr $2:i32
            intconst:i32 5
        stpr $3:i32
            intconst:i32 5
    ");
    irrefine::validate(&r.ctx).unwrap();
}

#[test]
fn control_flow_conditions_and_bodies() {
    common::init_tracing();
    let mut r = Region::new();
    let x = r.var("x");
    let p = r.ctx.build_pr(1, r.i32t);
    let one = r.ctx.build_imm_int(1, r.i32t);
    let det = r.ctx.build_binary(Opcode::Band, r.i32t, p, one);

    let ld = r.ctx.build_load(x, r.i32t);
    let zero = r.ctx.build_imm_int(0, r.i32t);
    let sum = r.ctx.build_binary(Opcode::Add, r.i32t, zero, ld);
    let then_st = r.ctx.build_store_pr(2, r.i32t, sum);
    let lit = r.ctx.build_imm_int(7, r.i32t);
    let else_st = r.ctx.build_store(x, r.i32t, 0, lit);
    let if_ = r.ctx.build_if(det, [then_st], [else_st]);
    r.push(if_);

    assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
    assert_snapshot!(print_bb_list(&r.ctx), @r"
    bb0:
        if
            ne:bool
                band:i32
                    $1:i32
                    intconst:i32 1
                intconst:i32 0
            truebody:
                stpr $2:i32
                    ld:i32 'x'
            falsebody:
                st:i32 'x'
                    intconst:i32 7
    ");
    irrefine::validate(&r.ctx).unwrap();
    assert_eq!(r.ctx.parent(r.ctx.kid(if_, slot::DET)), Some(if_));
}
