//! Constant folding.
//!
//! Operations whose operands are constants of one numeric domain are
//! evaluated at compile time. Integer arithmetic wraps to the operand width
//! and the result is normalized to the type of the folded node; floating
//! operations are only folded under `opt_float`. A fold that would trap at
//! run time (division by zero, shift amount out of range) is skipped.
//!
//! Folding also covers a handful of substitutions that need one constant
//! operand only: unsigned comparisons against zero, equality of a string
//! literal's address with null, and shifts of or by zero.

use tree_ir::eval::{Value, calc_fp_binary, calc_fp_unary, calc_int_binary, calc_int_unary, normalize_fp};
use tree_ir::{IrContext, NodeRef, Opcode, slot};

use crate::config::RefineCtx;
use crate::errors::{RefineError, check};
use crate::rewrite::{fired, replace_with, splice_kid};

/// Fold `n` and everything below it.
///
/// Returns the node now standing in `n`'s place and whether anything
/// changed. When a new node is returned `n` has been released.
pub fn fold_const(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> (NodeRef, bool) {
    let mut changed = false;
    for idx in 0..ctx.num_slots(n) {
        let kids = ctx.kids(n, idx).to_vec();
        if kids.iter().any(|&k| ctx.is_stmt(k)) {
            continue;
        }
        let mut slot_changed = false;
        let mut folded = Vec::with_capacity(kids.len());
        for k in kids {
            let (new, c) = fold_const(ctx, k, rc);
            slot_changed |= c;
            folded.push(new);
        }
        if slot_changed {
            ctx.set_kids(n, idx, folded);
            changed = true;
        }
    }

    let code = ctx.code(n);
    let new = if code.is_binary() {
        fold_binary(ctx, n, rc).or_else(|| substitute_binary(ctx, n))
    } else if matches!(code, Opcode::Neg | Opcode::Lnot | Opcode::Bnot) {
        fold_unary(ctx, n, rc)
    } else {
        None
    };
    match new {
        Some(new) => (new, true),
        None => (n, changed),
    }
}

/// Strength reduction entry point; shares its rules with the folder.
pub fn strength_reduce(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> (NodeRef, bool) {
    fold_const(ctx, n, rc)
}

// ============================================================================
// Evaluation
// ============================================================================

fn fold_binary(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let code = ctx.code(n);
    let (op0, op1) = (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1));

    if let (true, Some(a), Some(b)) = (rc.opt_float, ctx.const_fp(op0), ctx.const_fp(op1)) {
        return fold_fp_value(ctx, n, calc_fp_binary(code, a, b)?);
    }

    let (a, b) = (ctx.const_int(op0)?, ctx.const_int(op1)?);
    let (t0, t1) = (ctx.ty(op0), ctx.ty(op1));
    let size = ctx.types.byte_size(t0).max(ctx.types.byte_size(t1));
    if !check(size <= 8, || RefineError::OperandTooWide(n)) {
        return None;
    }
    let unsigned = ctx.is_unsigned(op0) || ctx.is_unsigned(op1);
    let v = calc_int_binary(code, a, b, unsigned, size * 8)?;

    let ty = ctx.ty(n);
    let folded = if ctx.types.is_fp(ty) {
        // Integer arithmetic under a floating result keeps an explicit conversion.
        let hoisted = ctx.types.hoist_dtype_for_binop(t0, t1);
        let v = ctx.types.normalize_int(hoisted, v);
        let imm = ctx.build_imm_int(v, hoisted);
        ctx.build_cvt(imm, ty)
    } else {
        let v = ctx.types.normalize_int(ty, v);
        ctx.build_imm_int(v, ty)
    };
    fired("fold_int_binary", n);
    Some(replace_with(ctx, n, folded))
}

fn fold_unary(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let code = ctx.code(n);
    let opnd = ctx.kid(n, slot::UNA);

    if let (true, Some(a)) = (rc.opt_float, ctx.const_fp(opnd)) {
        return fold_fp_value(ctx, n, calc_fp_unary(code, a)?);
    }

    let a = ctx.const_int(opnd)?;
    if !check(ctx.dtype_size(opnd) <= 8, || RefineError::OperandTooWide(n)) {
        return None;
    }
    let ty = ctx.ty(n);
    if !ctx.types.is_int(ty) {
        return None;
    }
    let v = ctx.types.normalize_int(ty, calc_int_unary(code, a)?);
    let folded = ctx.build_imm_int(v, ty);
    fired("fold_int_unary", n);
    Some(replace_with(ctx, n, folded))
}

/// Materialize a floating evaluation result in the type of `n`.
fn fold_fp_value(ctx: &mut IrContext, n: NodeRef, v: Value) -> Option<NodeRef> {
    let ty = ctx.ty(n);
    let folded = match v {
        Value::Fp(f) if ctx.types.is_fp(ty) => {
            let f = normalize_fp(ctx, ty, f);
            ctx.build_imm_fp(f, ty)
        }
        Value::Int(i) if ctx.types.is_int(ty) => {
            let i = ctx.types.normalize_int(ty, i);
            ctx.build_imm_int(i, ty)
        }
        _ => return None,
    };
    fired("fold_fp", n);
    Some(replace_with(ctx, n, folded))
}

// ============================================================================
// Substitutions
// ============================================================================

fn substitute_binary(ctx: &mut IrContext, n: NodeRef) -> Option<NodeRef> {
    use Opcode::*;
    let code = ctx.code(n);
    let (op0, op1) = (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1));
    match code {
        // An unsigned value is never below zero.
        Lt | Ge if ctx.is_unsigned(op0) && ctx.is_const_int_equal(op1, 0) => {
            fired("unsigned_vs_zero", n);
            Some(replace_with_int(ctx, n, i64::from(code == Ge)))
        }
        Eq | Ne if addr_of_string_vs_null(ctx, op0, op1) || addr_of_string_vs_null(ctx, op1, op0) => {
            fired("string_addr_vs_null", n);
            Some(replace_with_int(ctx, n, i64::from(code == Ne)))
        }
        Asr | Lsr | Lsl if ctx.is_const_int_equal(op0, 0) || ctx.is_const_int_equal(op1, 0) => {
            fired("shift_zero", n);
            Some(splice_kid(ctx, n, slot::OPND0))
        }
        Lsl if ctx.const_int(op1) == Some(i64::from(ctx.types.bit_width(ctx.ty(op0)))) => {
            fired("shift_out_all_bits", n);
            Some(replace_with_int(ctx, n, 0))
        }
        _ => None,
    }
}

fn addr_of_string_vs_null(ctx: &IrContext, addr: NodeRef, other: NodeRef) -> bool {
    ctx.is_lda_of_string(addr) && ctx.is_const_int_equal(other, 0)
}

fn replace_with_int(ctx: &mut IrContext, n: NodeRef, v: i64) -> NodeRef {
    let ty = ctx.ty(n);
    let imm = ctx.build_imm_int(v, ty);
    replace_with(ctx, n, imm)
}
