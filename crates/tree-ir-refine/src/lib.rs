//! Peephole refinement of tree IR.
//!
//! Rewrites statements and expressions into simpler equivalent forms:
//! constant folding, algebraic identities, direct forms of indirect memory
//! accesses, explicit conversions between mismatched operand types, and a
//! few SSA-driven simplifications. Def-Use and SSA links are kept
//! consistent through every rewrite, so a refined region can be handed to
//! later passes without recomputing them.
//!
//! Rules are applied bottom-up; the drivers repeat sweeps over a block or
//! statement list until nothing changes.
//!
//! ```
//! use tree_ir::{DataType, IrContext, Opcode};
//! use tree_ir_refine::{RefineCtx, refine_bb_list};
//!
//! let mut ctx = IrContext::new();
//! let i32t = ctx.types.simplex(DataType::I32);
//! let bb = ctx.create_bb();
//! let x = ctx.build_pr(1, i32t);
//! let zero = ctx.build_imm_int(0, i32t);
//! let add = ctx.build_binary(Opcode::Add, i32t, x, zero);
//! let st = ctx.build_store_pr(2, i32t, add);
//! ctx.append_stmt(bb, st);
//!
//! assert!(refine_bb_list(&mut ctx, &mut RefineCtx::default()));
//! assert_eq!(ctx.kid(st, 0), x);
//! ```

pub mod coerce;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod errors;
pub mod fold;
mod memory;
mod rewrite;
mod simplify;
mod ssa_rules;

pub use coerce::{insert_cvt, insert_cvt_for_binop};
pub use config::RefineCtx;
pub use dispatch::{refine, refine_det, refine_exp, refine_ir_list};
pub use driver::{RefineResult, refine_bb_list, refine_region, refine_stmt_list};
pub use errors::RefineError;
pub use fold::{fold_const, strength_reduce};
pub use simplify::invert_condition;

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use tree_ir::eval::{Env, Value, eval};
    use tree_ir::printer::print_ir;
    use tree_ir::{DataType, IrContext, NodeRef, Opcode, TypeRef};

    use super::*;

    const INT_TYPES: [DataType; 8] = [
        DataType::I8,
        DataType::U8,
        DataType::I16,
        DataType::U16,
        DataType::I32,
        DataType::U32,
        DataType::I64,
        DataType::U64,
    ];

    /// Expression over one integer type, with conversions from others.
    #[derive(Clone, Debug)]
    enum Expr {
        Lit(i64),
        Reg(u32),
        Una(Opcode, Box<Expr>),
        Bin(Opcode, Box<Expr>, Box<Expr>),
        Cvt(DataType, Box<Expr>),
        Select(Box<Pred>, Box<Expr>, Box<Expr>),
    }

    #[derive(Clone, Debug)]
    enum Pred {
        Cmp(Opcode, Expr, Expr),
        Value(Expr),
    }

    fn int_type() -> impl Strategy<Value = DataType> {
        proptest::sample::select(INT_TYPES.to_vec())
    }

    fn relation() -> impl Strategy<Value = Opcode> {
        use Opcode::*;
        proptest::sample::select(vec![Lt, Le, Gt, Ge, Eq, Ne])
    }

    fn binary_op() -> impl Strategy<Value = Opcode> {
        use Opcode::*;
        proptest::sample::select(vec![
            Add, Sub, Mul, Div, Rem, Mod, Band, Bor, Xor, Asr, Lsr, Lsl, Land, Lor,
        ])
    }

    fn arb_expr() -> impl Strategy<Value = Expr> {
        let leaf = prop_oneof![
            prop_oneof![
                Just(0i64),
                Just(1),
                Just(-1),
                Just(2),
                Just(3),
                Just(8),
                Just(255),
                -300i64..300
            ]
            .prop_map(Expr::Lit),
            (1u32..4).prop_map(Expr::Reg),
        ];
        leaf.prop_recursive(4, 32, 3, |inner| {
            let una = proptest::sample::select(vec![Opcode::Neg, Opcode::Lnot, Opcode::Bnot]);
            prop_oneof![
                (una, inner.clone()).prop_map(|(op, a)| Expr::Una(op, Box::new(a))),
                (binary_op(), inner.clone(), inner.clone())
                    .prop_map(|(op, a, b)| Expr::Bin(op, Box::new(a), Box::new(b))),
                (int_type(), inner.clone()).prop_map(|(dt, a)| Expr::Cvt(dt, Box::new(a))),
                (
                    prop_oneof![
                        (relation(), inner.clone(), inner.clone()).prop_map(|(op, a, b)| Pred::Cmp(op, a, b)),
                        inner.clone().prop_map(Pred::Value),
                    ],
                    inner.clone(),
                    inner,
                )
                    .prop_map(|(p, t, f)| Expr::Select(Box::new(p), Box::new(t), Box::new(f))),
            ]
        })
    }

    fn build(ctx: &mut IrContext, ty: TypeRef, e: &Expr) -> NodeRef {
        match e {
            Expr::Lit(v) => {
                let v = ctx.types.normalize_int(ty, *v);
                ctx.build_imm_int(v, ty)
            }
            Expr::Reg(prno) => ctx.build_pr(*prno, ty),
            Expr::Una(op, a) => {
                let a = build(ctx, ty, a);
                ctx.build_unary_op(*op, ty, a)
            }
            Expr::Bin(op, a, b) => {
                let a = build(ctx, ty, a);
                let b = build(ctx, ty, b);
                ctx.build_binary(*op, ty, a, b)
            }
            Expr::Cvt(dt, a) => {
                let from = ctx.types.simplex(*dt);
                let a = build(ctx, from, a);
                ctx.build_cvt(a, ty)
            }
            Expr::Select(p, t, f) => {
                let pred = match &**p {
                    Pred::Cmp(op, a, b) => {
                        let a = build(ctx, ty, a);
                        let b = build(ctx, ty, b);
                        ctx.build_cmp(*op, a, b)
                    }
                    Pred::Value(a) => build(ctx, ty, a),
                };
                let t = build(ctx, ty, t);
                let f = build(ctx, ty, f);
                ctx.build_select(pred, t, f, ty)
            }
        }
    }

    fn env(regs: [i64; 3]) -> Env {
        let mut env = Env::new();
        for (prno, v) in (1..).zip(regs) {
            env.set_pr(prno, Value::Int(v));
        }
        env
    }

    fn options(div_by_pow2: bool) -> RefineCtx {
        RefineCtx::default().with_div_by_pow2(div_by_pow2)
    }

    proptest! {
        #[test]
        fn prop_refinement_preserves_value(
            e in arb_expr(),
            dt in int_type(),
            regs in any::<[i64; 3]>(),
            div_by_pow2 in any::<bool>(),
        ) {
            let mut ctx = IrContext::new();
            let ty = ctx.types.simplex(dt);
            let root = build(&mut ctx, ty, &e);
            let env = env(regs);
            let before = eval(&ctx, &env, root);

            let mut rc = options(div_by_pow2);
            let (new, _) = refine_exp(&mut ctx, root, &mut rc);
            // Refinement may give a value to an expression that had none,
            // e.g. by dropping a division by zero under `* 0`.
            if let Some(v) = before {
                prop_assert_eq!(eval(&ctx, &env, new), Some(v));
            }
        }

        #[test]
        fn prop_comparison_keeps_truth(
            a in arb_expr(),
            b in arb_expr(),
            dt in int_type(),
            regs in any::<[i64; 3]>(),
            code in relation(),
        ) {
            let mut ctx = IrContext::new();
            let ty = ctx.types.simplex(dt);
            let a = build(&mut ctx, ty, &a);
            let b = build(&mut ctx, ty, &b);
            let root = ctx.build_cmp(code, a, b);
            let env = env(regs);
            let before = eval(&ctx, &env, root);

            let mut rc = RefineCtx::default();
            let (new, _) = refine_exp(&mut ctx, root, &mut rc);
            if let Some(v) = before {
                prop_assert_eq!(eval(&ctx, &env, new), Some(v));
            }
        }

        #[test]
        fn prop_refine_exp_is_idempotent(
            e in arb_expr(),
            dt in int_type(),
            div_by_pow2 in any::<bool>(),
        ) {
            let mut ctx = IrContext::new();
            let ty = ctx.types.simplex(dt);
            let root = build(&mut ctx, ty, &e);

            let mut rc = options(div_by_pow2);
            let (once, _) = refine_exp(&mut ctx, root, &mut rc);
            let printed = print_ir(&ctx, once);
            let (twice, changed) = refine_exp(&mut ctx, once, &mut rc);
            prop_assert_eq!((twice, changed), (once, false));
            prop_assert_eq!(print_ir(&ctx, twice), printed);
        }

        #[test]
        fn prop_second_pass_finds_nothing_after_list_fixpoint(e in arb_expr(), dt in int_type()) {
            let mut ctx = IrContext::new();
            let ty = ctx.types.simplex(dt);
            let root = build(&mut ctx, ty, &e);
            let ret = ctx.build_return(Some(root));

            let mut rc = RefineCtx::default();
            let (list, _) = refine_ir_list(&mut ctx, vec![ret], &mut rc);
            let (again, changed) = refine_ir_list(&mut ctx, list.clone(), &mut rc);
            prop_assert!(!changed);
            prop_assert_eq!(again, list);
        }
    }
}
