//! Whole-pass properties checked over generated regions.

mod common;

use common::Region;
use irrefine::ir::printer::print_bb_list;
use irrefine::ir::{DataType, Opcode, slot};
use irrefine::{RefineCtx, refine_bb_list};
use proptest::prelude::*;

fn commutative_op() -> impl Strategy<Value = Opcode> {
    prop_oneof![
        Just(Opcode::Add),
        Just(Opcode::Mul),
        Just(Opcode::Band),
        Just(Opcode::Bor),
        Just(Opcode::Xor),
    ]
}

proptest! {
    /// A constant operand of a commutative operator ends up on the right.
    #[test]
    fn constant_moves_right(code in commutative_op(), c in -50i64..50, prno in 1u32..8) {
        let mut r = Region::new();
        let lit = r.ctx.build_imm_int(c, r.i32t);
        let x = r.ctx.build_pr(prno, r.i32t);
        let op = r.ctx.build_binary(code, r.i32t, lit, x);
        let st = r.ctx.build_store_pr(20, r.i32t, op);
        r.push(st);

        refine_bb_list(&mut r.ctx, &mut RefineCtx::default());
        let rhs = r.ctx.kid(st, slot::ST_RHS);
        if r.ctx.code(rhs).is_binary() {
            prop_assert!(!r.ctx.is_const(r.ctx.kid(rhs, slot::OPND0)));
        }
    }

    /// Nothing unsigned is below zero.
    #[test]
    fn unsigned_below_zero_is_false(prno in 1u32..8) {
        let mut r = Region::new();
        let u32t = r.ctx.types.simplex(DataType::U32);
        let x = r.ctx.build_pr(prno, u32t);
        let zero = r.ctx.build_imm_int(0, u32t);
        let lt = r.ctx.build_cmp(Opcode::Lt, x, zero);
        let st = r.ctx.build_store_pr(20, r.i32t, lt);
        r.push(st);

        prop_assert!(refine_bb_list(&mut r.ctx, &mut RefineCtx::default()));
        let rhs = r.ctx.kid(st, slot::ST_RHS);
        prop_assert_eq!(r.ctx.const_int(rhs), Some(0));
    }

    /// `x / x` is one when `x` is a nonzero literal or a register.
    #[test]
    fn self_division_is_one(prno in 1u32..8, v in prop_oneof![-9i64..-1, 1i64..9]) {
        for from_reg in [true, false] {
            let mut r = Region::new();
            let (a, b) = if from_reg {
                (r.ctx.build_pr(prno, r.i32t), r.ctx.build_pr(prno, r.i32t))
            } else {
                (r.ctx.build_imm_int(v, r.i32t), r.ctx.build_imm_int(v, r.i32t))
            };
            let div = r.ctx.build_binary(Opcode::Div, r.i32t, a, b);
            let st = r.ctx.build_store_pr(20, r.i32t, div);
            r.push(st);

            refine_bb_list(&mut r.ctx, &mut RefineCtx::default());
            let rhs = r.ctx.kid(st, slot::ST_RHS);
            prop_assert_eq!(r.ctx.const_int(rhs), Some(1));
        }
    }

    /// A second pass over a refined region changes nothing.
    #[test]
    fn refinement_is_idempotent(
        codes in prop::collection::vec(commutative_op(), 1..5),
        lits in prop::collection::vec(-4i64..4, 1..5),
    ) {
        let mut r = Region::new();
        for (i, (code, v)) in codes.iter().zip(&lits).enumerate() {
            let x = r.ctx.build_pr(i as u32 + 1, r.i32t);
            let lit = r.ctx.build_imm_int(*v, r.i32t);
            let op = r.ctx.build_binary(*code, r.i32t, lit, x);
            let st = r.ctx.build_store_pr(i as u32 + 10, r.i32t, op);
            r.push(st);
        }

        let mut rc = RefineCtx::default();
        refine_bb_list(&mut r.ctx, &mut rc);
        let once = print_bb_list(&r.ctx);
        prop_assert!(!refine_bb_list(&mut r.ctx, &mut rc));
        prop_assert_eq!(print_bb_list(&r.ctx), once);
    }
}
