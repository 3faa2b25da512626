//! Explicit conversions between operands of differing representation.

use tree_ir::{IrContext, NodeRef, TypeRef, slot};

use crate::errors::{RefineError, check};
use crate::rewrite::fired;

/// Make `kid` fit a parent expecting values of type `parent_ty`.
///
/// Nothing happens when the parent is untyped, either side is floating,
/// or the parent is no wider than the kid. An integer literal is
/// re-stamped with the wider type instead of being wrapped; a pointer
/// target gives the literal the pointer-width integer type.
pub fn insert_cvt(ctx: &mut IrContext, parent_ty: TypeRef, kid: NodeRef) -> (NodeRef, bool) {
    let src = ctx.ty(kid);
    let types = &ctx.types;
    if types.is_void(parent_ty) || types.is_void(src) {
        return (kid, false);
    }
    if types.is_vec(parent_ty) || types.is_vec(src) {
        check(types.byte_size(parent_ty) == types.byte_size(src), || {
            RefineError::VectorShapeMismatch(kid)
        });
        return (kid, false);
    }
    if types.is_fp(parent_ty) || types.is_fp(src) {
        return (kid, false);
    }
    if types.byte_size(parent_ty) <= types.byte_size(src) {
        return (kid, false);
    }

    if ctx.const_int(kid).is_some() && !ctx.types.is_str(parent_ty) {
        let ty = if ctx.types.is_ptr(parent_ty) {
            let dt = ctx.types.pointer_size_dtype();
            ctx.types.simplex(dt)
        } else {
            parent_ty
        };
        restamp_int(ctx, kid, ty);
        fired("restamp_literal", kid);
        return (kid, true);
    }
    fired("insert_cvt", kid);
    (ctx.build_cvt(kid, parent_ty), true)
}

/// Balance the operand types of binary node `n`.
///
/// Returns true if a conversion was inserted.
pub fn insert_cvt_for_binop(ctx: &mut IrContext, n: NodeRef) -> bool {
    let (op0, op1) = (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1));
    let (t0, t1) = (ctx.ty(op0), ctx.ty(op1));
    let types = &ctx.types;
    if types.is_void(t0) || types.is_void(t1) || t0 == t1 {
        return false;
    }
    if types.is_mc(t0) || types.is_mc(t1) {
        check(types.byte_size(t0) == types.byte_size(t1), || {
            RefineError::AggregateSizeMismatch(n)
        });
        return false;
    }
    if types.is_ptr(t0) {
        if types.byte_size(t1) <= types.byte_size(t0) {
            return false;
        }
        if !check(types.is_ptr_addend(t1), || RefineError::IllegalPointerArith(n)) {
            return false;
        }
        let dt = ctx.types.pointer_size_dtype();
        let word = ctx.types.simplex(dt);
        wrap_operand(ctx, n, slot::OPND1, word);
        return true;
    }
    // Comparing an integer against an address is fine; adding one is not.
    if !ctx.code(n).is_relation()
        && !check(!types.is_ptr(t1), || RefineError::IllegalPointerArith(n))
    {
        return false;
    }
    if types.is_vec(t0) || types.is_vec(t1) {
        check(false, || RefineError::VectorShapeMismatch(n));
        return false;
    }

    let common = ctx.types.hoist_dtype_for_binop(t0, t1);
    let size = ctx.types.byte_size(common);
    let mut changed = false;
    for (idx, t) in [(slot::OPND0, t0), (slot::OPND1, t1)] {
        if ctx.types.byte_size(t) != size {
            wrap_operand(ctx, n, idx, common);
            changed = true;
        }
    }
    changed
}

/// Coerce both operands of `n` to its result type, then to each other.
pub(crate) fn coerce_binary(ctx: &mut IrContext, n: NodeRef) -> bool {
    let ty = ctx.ty(n);
    let mut changed = false;
    for idx in [slot::OPND0, slot::OPND1] {
        changed |= coerce_slot(ctx, n, idx, ty);
    }
    changed | insert_cvt_for_binop(ctx, n)
}

/// Coerce the expression in slot `idx` of `n` to `ty`.
pub(crate) fn coerce_slot(ctx: &mut IrContext, n: NodeRef, idx: usize, ty: TypeRef) -> bool {
    let kid = ctx.kid(n, idx);
    let (new, changed) = insert_cvt(ctx, ty, kid);
    if new != kid {
        ctx.set_kid(n, idx, Some(new));
    }
    changed
}

fn wrap_operand(ctx: &mut IrContext, n: NodeRef, idx: usize, ty: TypeRef) {
    let kid = ctx.kid(n, idx);
    ctx.take_kid(n, idx);
    let cvt = ctx.build_cvt(kid, ty);
    ctx.set_kid(n, idx, Some(cvt));
    fired("balance_operands", n);
}

/// Give an integer literal a new type, wrapping its value to fit.
pub(crate) fn restamp_int(ctx: &mut IrContext, lit: NodeRef, ty: TypeRef) {
    let Some(v) = ctx.const_int(lit) else {
        check(false, || RefineError::NonConstOperand(lit));
        return;
    };
    let v = ctx.types.normalize_int(ty, v);
    ctx.attrs_mut(lit).value = Some(tree_ir::ConstValue::Int(v));
    ctx.set_ty(lit, ty);
}
