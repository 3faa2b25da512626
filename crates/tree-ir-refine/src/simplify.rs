//! Algebraic simplification of operator nodes.
//!
//! Every binary operator goes through the same skeleton:
//!
//! 1. refine both operands,
//! 2. fold if both are constants,
//! 3. move a lone constant to the right (commutation),
//! 4. merge constants of nested same-precedence operations (reassociation),
//! 5. try the opcode's identities in priority order,
//! 6. balance operand types.
//!
//! Steps 2 to 6 repeat on whatever node a rewrite leaves in place until
//! none of them fires, so a second refinement finds nothing to do.
//!
//! What differs per opcode is captured by an [`OpRules`] table entry, so
//! the order of the steps is fixed in one place.

use tree_ir::eval::{calc_int_binary, normalize_fp};
use tree_ir::{ConstValue, IrContext, NodeRef, Opcode, TypeRef, slot};

use crate::coerce::{coerce_binary, restamp_int};
use crate::config::RefineCtx;
use crate::dispatch::{refine_det, refine_slot};
use crate::errors::{RefineError, check};
use crate::fold::fold_const;
use crate::rewrite::{discard, fired, is_pow2, log2, replace_with, splice_kid};
use crate::ssa_rules::refine_det_via_ssa;

// ============================================================================
// Rule table
// ============================================================================

/// How operands of an opcode may be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Commute {
    Never,
    /// `c op X` becomes `X op c`.
    Swap,
    /// `c < X` becomes `X > c`.
    SwapRelation,
}

/// A rewrite that either fires, returning the node now standing in place
/// of its input, or leaves the tree untouched.
struct Rule {
    name: &'static str,
    apply: fn(&mut IrContext, NodeRef, &RefineCtx) -> Option<NodeRef>,
}

struct OpRules {
    commute: Commute,
    reassociate: bool,
    identities: &'static [Rule],
}

impl OpRules {
    const fn commutative(identities: &'static [Rule]) -> Self {
        Self {
            commute: Commute::Swap,
            reassociate: true,
            identities,
        }
    }

    const fn plain(identities: &'static [Rule]) -> Self {
        Self {
            commute: Commute::Never,
            reassociate: false,
            identities,
        }
    }
}

macro_rules! rule {
    ($f:ident) => {
        Rule {
            name: stringify!($f),
            apply: $f,
        }
    };
}

fn rules_for(code: Opcode) -> OpRules {
    use Opcode::*;
    match code {
        Add => OpRules::commutative(&[rule!(add_zero)]),
        Mul => OpRules::commutative(&[
            rule!(mul_fp_two),
            rule!(mul_int_two),
            rule!(mul_one),
            rule!(mul_zero),
            rule!(mul_pow2),
        ]),
        Xor => OpRules::commutative(&[rule!(xor_self)]),
        Band => OpRules::commutative(&[rule!(band_all_ones)]),
        Bor => OpRules::commutative(&[rule!(bor_zero)]),
        Eq => OpRules::commutative(&[rule!(eq_self)]),
        Ne => OpRules::commutative(&[rule!(ne_self)]),
        Sub => OpRules {
            commute: Commute::Never,
            reassociate: true,
            identities: &[rule!(sub_self)],
        },
        Div => OpRules::plain(&[rule!(div_fp_const), rule!(div_pow2), rule!(div_self)]),
        Rem | Mod => OpRules::plain(&[rule!(rem_one)]),
        Land => OpRules::plain(&[rule!(land_one)]),
        Lor => OpRules::plain(&[rule!(lor_one)]),
        Lt | Le | Gt | Ge => OpRules {
            commute: Commute::SwapRelation,
            reassociate: false,
            identities: &[],
        },
        _ => OpRules::plain(&[]),
    }
}

// ============================================================================
// Binary skeleton
// ============================================================================

/// Refine a binary operator. `fold_node` controls whether `n` itself may
/// be folded; its operands are folded according to `rc` either way.
pub(crate) fn refine_binary_op(
    ctx: &mut IrContext,
    n: NodeRef,
    rc: &mut RefineCtx,
    fold_node: bool,
) -> (NodeRef, bool) {
    let mut changed = refine_slot(ctx, n, slot::OPND0, rc);
    changed |= refine_slot(ctx, n, slot::OPND1, rc);
    let (result, c) = settle_binary(ctx, n, rc, fold_node);
    (result, changed | c)
}

/// Run the node-local steps on `n`, whose operands are already refined,
/// until none of them fires. Every rewrite may expose a shape another rule
/// matches, so the loop restarts on whatever node stands in place of `n`.
pub(crate) fn settle_binary(
    ctx: &mut IrContext,
    n: NodeRef,
    rc: &mut RefineCtx,
    fold_node: bool,
) -> (NodeRef, bool) {
    let node_rc = RefineCtx {
        fold_const: rc.fold_const && fold_node,
        ..rc.clone()
    };
    let mut cur = n;
    let mut changed = false;
    loop {
        let code = ctx.code(cur);
        if !code.is_binary() {
            break;
        }
        if node_rc.fold_const {
            let (folded, c) = fold_const(ctx, cur, &node_rc);
            if c {
                cur = folded;
                changed = true;
                continue;
            }
        }

        let rules = rules_for(code);
        if commute(ctx, cur, rules.commute) {
            changed = true;
            continue;
        }
        let reassociated = if rules.reassociate && rc.reassociate {
            reassociate(ctx, cur)
        } else {
            None
        };
        if let Some(new) = reassociated.or_else(|| apply_identities(ctx, cur, rules.identities, &node_rc)) {
            cur = new;
            changed = true;
            continue;
        }
        if code.is_relation() {
            if let Some(decided) = refine_det_via_ssa(ctx, cur) {
                cur = decided;
                changed = true;
                continue;
            }
        }

        if rc.insert_cvt && coerce_binary(ctx, cur) {
            // New conversions are refined like any other operand.
            refine_slot(ctx, cur, slot::OPND0, rc);
            refine_slot(ctx, cur, slot::OPND1, rc);
            changed = true;
            continue;
        }
        break;
    }
    (cur, changed)
}

fn apply_identities(
    ctx: &mut IrContext,
    n: NodeRef,
    identities: &[Rule],
    rc: &RefineCtx,
) -> Option<NodeRef> {
    identities.iter().find_map(|rule| {
        let new = (rule.apply)(ctx, n, rc)?;
        fired(rule.name, n);
        Some(new)
    })
}

fn commute(ctx: &mut IrContext, n: NodeRef, how: Commute) -> bool {
    if how == Commute::Never {
        return false;
    }
    let (op0, op1) = (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1));
    if !ctx.is_const(op0) || ctx.is_const(op1) {
        return false;
    }
    ctx.take_kid(n, slot::OPND0);
    ctx.take_kid(n, slot::OPND1);
    ctx.set_kid(n, slot::OPND0, Some(op1));
    ctx.set_kid(n, slot::OPND1, Some(op0));
    if how == Commute::SwapRelation {
        let code = ctx.code(n).swap_relation();
        ctx.set_code(n, code);
    }
    fired("commute", n);
    true
}

/// `(X op2 c1) op1 c2` to `X op2 (c1 op1 c2)`.
///
/// The inner operation must be associative and the outer one either
/// associative or a subtraction, with both at the same precedence and of
/// the same type.
fn reassociate(ctx: &mut IrContext, n: NodeRef) -> Option<NodeRef> {
    let outer = ctx.code(n);
    let (op0, op1) = (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1));
    let c2 = ctx.const_int(op1)?;
    let inner = ctx.code(op0);
    let shapes_fit = inner.is_associative()
        && (outer.is_associative() || outer == Opcode::Sub)
        && inner.precedence() == outer.precedence()
        && ctx.ty(op0) == ctx.ty(n);
    if !shapes_fit {
        return None;
    }
    let inner_c = ctx.kid(op0, slot::OPND1);
    let c1 = ctx.const_int(inner_c)?;

    let size = ctx.dtype_size(inner_c).max(ctx.dtype_size(op1));
    if !check(size <= 8, || RefineError::OperandTooWide(n)) {
        return None;
    }
    let unsigned = ctx.is_unsigned(inner_c) || ctx.is_unsigned(op1);
    let v = calc_int_binary(outer, c1, c2, unsigned, size * 8)?;

    let cty = if ctx.is_ptr(n) {
        let dt = ctx.types.pointer_size_dtype();
        ctx.types.simplex(dt)
    } else if ctx.is_mc(n) {
        let dt = ctx.types.word_dtype(true);
        ctx.types.simplex(dt)
    } else {
        ctx.ty(op1)
    };
    let v = ctx.types.normalize_int(cty, v);
    let merged = ctx.build_imm_int(v, cty);
    ctx.take_kid(op0, slot::OPND1);
    discard(ctx, inner_c);
    ctx.set_kid(op0, slot::OPND1, Some(merged));
    fired("reassociate", n);
    Some(splice_kid(ctx, n, slot::OPND0))
}

// ============================================================================
// Identities
// ============================================================================

fn operands(ctx: &IrContext, n: NodeRef) -> (NodeRef, NodeRef) {
    (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1))
}

fn set_const(ctx: &mut IrContext, lit: NodeRef, v: ConstValue) {
    ctx.attrs_mut(lit).value = Some(v);
}

/// Integer 0 or 1 for an operand class that has no arithmetic of its own.
fn typed_int(ctx: &mut IrContext, like: NodeRef, v: i64) -> NodeRef {
    let ty = if ctx.is_mc(like) || ctx.is_str(like) || ctx.is_ptr(like) {
        ctx.types.simplex(tree_ir::DataType::U32)
    } else {
        ctx.ty(like)
    };
    ctx.build_imm_int(v, ty)
}

/// Integer literal taking the place of `n`: in the type of `n` when that
/// is an integer type, else as [`typed_int`] of `like`.
fn result_int(ctx: &mut IrContext, n: NodeRef, like: NodeRef, v: i64) -> NodeRef {
    let ty = ctx.ty(n);
    if ctx.types.is_int(ty) {
        ctx.build_imm_int(v, ty)
    } else {
        typed_int(ctx, like, v)
    }
}

/// Make `new`, which replaces a node of type `ty`, deliver a `ty` value.
/// Truth values standing in for a wider or differently signed integer get
/// a conversion; integer literals are re-stamped.
fn retype(ctx: &mut IrContext, new: NodeRef, ty: TypeRef) -> NodeRef {
    if ctx.ty(new) == ty || ctx.types.is_bool(ty) || !ctx.types.is_int(ty) {
        return new;
    }
    if ctx.const_int(new).is_some() {
        restamp_int(ctx, new, ty);
        return new;
    }
    ctx.build_cvt(new, ty)
}

fn add_zero(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (_, op1) = operands(ctx, n);
    ctx.is_const_int_equal(op1, 0)
        .then(|| splice_kid(ctx, n, slot::OPND0))
}

fn sub_self(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    if !ctx.is_ir_equal(op0, op1) {
        return None;
    }
    let zero = if ctx.is_fp(n) {
        if !rc.opt_float {
            return None;
        }
        let ty = ctx.ty(n);
        ctx.build_imm_fp(0.0, ty)
    } else {
        let ty = ctx.ty(n);
        ctx.build_imm_int(0, ty)
    };
    Some(replace_with(ctx, n, zero))
}

/// Turn `X * c` into `X + X`, copying the DU info of `X` onto the copy.
fn mul_to_double(ctx: &mut IrContext, n: NodeRef) -> NodeRef {
    let (op0, op1) = operands(ctx, n);
    ctx.take_kid(n, slot::OPND1);
    discard(ctx, op1);
    let dup = ctx.dup_ir_tree(op0);
    if ctx.has_du_mgr() {
        ctx.copy_ir_tree_du(dup, op0);
    }
    ctx.set_code(n, Opcode::Add);
    ctx.set_kid(n, slot::OPND1, Some(dup));
    n
}

fn mul_fp_two(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    (rc.opt_float && !ctx.is_const(op0) && ctx.const_fp(op1) == Some(2.0))
        .then(|| mul_to_double(ctx, n))
}

fn mul_int_two(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (_, op1) = operands(ctx, n);
    ctx.is_const_int_equal(op1, 2)
        .then(|| mul_to_double(ctx, n))
}

fn mul_one(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (_, op1) = operands(ctx, n);
    ctx.is_const_int_equal(op1, 1)
        .then(|| splice_kid(ctx, n, slot::OPND0))
}

fn mul_zero(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (_, op1) = operands(ctx, n);
    if !ctx.is_const_int_equal(op1, 0) {
        return None;
    }
    let zero = result_int(ctx, n, op1, 0);
    Some(replace_with(ctx, n, zero))
}

fn mul_pow2(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    let c = ctx.const_int(op1).filter(|&c| is_pow2(c))?;
    if !rc.refine_mul_by_pow2 || !ctx.is_int(op0) {
        return None;
    }
    ctx.set_code(n, Opcode::Lsl);
    set_const(ctx, op1, ConstValue::Int(log2(c)));
    Some(n)
}

fn is_pow5(v: i64) -> bool {
    let mut v = v;
    while v > 1 && v % 5 == 0 {
        v /= 5;
    }
    v == 1
}

/// `X / 1.0` to `X`, and `X / c` to `X * (1 / c)` for integral `c`
/// whose magnitude is a power of 2 or 5. `X / 0.0` stays.
fn div_fp_const(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    let c = ctx.const_fp(op1)?;
    if !rc.opt_float || ctx.is_const(op0) || c == 0.0 {
        return None;
    }
    if c == 1.0 {
        return Some(splice_kid(ctx, n, slot::OPND0));
    }
    let mag = c.abs();
    if mag.fract() != 0.0 || mag >= (1u64 << 53) as f64 {
        return None;
    }
    let m = mag as i64;
    if !is_pow2(m) && !is_pow5(m) {
        return None;
    }
    let ty = ctx.ty(op1);
    let recip = normalize_fp(ctx, ty, 1.0 / c);
    ctx.set_code(n, Opcode::Mul);
    set_const(ctx, op1, ConstValue::Fp(recip));
    Some(n)
}

/// Unsigned `X / 2^k` to `X >> k`.
fn div_pow2(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    let c = ctx.const_int(op1).filter(|&c| is_pow2(c))?;
    if !rc.refine_div_by_pow2 || !ctx.is_int(op0) || !ctx.is_unsigned(op0) {
        return None;
    }
    ctx.set_code(n, Opcode::Lsr);
    set_const(ctx, op1, ConstValue::Int(log2(c)));
    Some(n)
}

fn div_self(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    if !ctx.is_ir_equal(op0, op1) {
        return None;
    }
    let one = if ctx.is_fp(op0) {
        if !rc.opt_float {
            return None;
        }
        let ty = ctx.ty(op0);
        ctx.build_imm_fp(1.0, ty)
    } else {
        result_int(ctx, n, op0, 1)
    };
    Some(replace_with(ctx, n, one))
}

fn rem_one(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (_, op1) = operands(ctx, n);
    if !ctx.is_const_int_equal(op1, 1) {
        return None;
    }
    let zero = result_int(ctx, n, op1, 0);
    Some(replace_with(ctx, n, zero))
}

fn band_all_ones(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (_, op1) = operands(ctx, n);
    let c = ctx.const_int(op1)?;
    let ty = ctx.ty(n);
    let all_ones = c == -1 || (ctx.ty(op1) == ty && c == ctx.types.normalize_int(ty, -1));
    all_ones.then(|| splice_kid(ctx, n, slot::OPND0))
}

fn bor_zero(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (_, op1) = operands(ctx, n);
    ctx.is_const_int_equal(op1, 0)
        .then(|| splice_kid(ctx, n, slot::OPND0))
}

fn xor_self(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    if !ctx.is_ir_equal(op0, op1) {
        return None;
    }
    let integral = ctx.is_int(op0) || ctx.is_ptr(op0) || ctx.is_mc(op0);
    if !check(integral, || RefineError::MalformedTree {
        node: n,
        reason: "xor of non-integer operands",
    }) {
        return None;
    }
    let zero = result_int(ctx, n, op0, 0);
    Some(replace_with(ctx, n, zero))
}

/// `1 && X` to `X`, with `X` turned into a truth value if it is not one.
fn land_one(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (op0, _) = operands(ctx, n);
    if !ctx.is_const_int_equal(op0, 1) {
        return None;
    }
    let ty = ctx.ty(n);
    let x = splice_kid(ctx, n, slot::OPND1);
    let judged = if ctx.is_judge(x) { x } else { ctx.build_judge(x) };
    Some(retype(ctx, judged, ty))
}

fn lor_one(ctx: &mut IrContext, n: NodeRef, _: &RefineCtx) -> Option<NodeRef> {
    let (op0, _) = operands(ctx, n);
    ctx.is_const_int_equal(op0, 1)
        .then(|| splice_kid(ctx, n, slot::OPND0))
}

/// `X == X` to 1. Floating operands are excluded because of NaN.
fn eq_self(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    self_compare(ctx, n, rc, 1)
}

fn ne_self(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx) -> Option<NodeRef> {
    self_compare(ctx, n, rc, 0)
}

fn self_compare(ctx: &mut IrContext, n: NodeRef, rc: &RefineCtx, v: i64) -> Option<NodeRef> {
    let (op0, op1) = operands(ctx, n);
    if !rc.fold_const || ctx.is_fp(op0) || !ctx.is_ir_equal(op0, op1) {
        return None;
    }
    let ty = ctx.ty(n);
    let lit = ctx.build_imm_int(v, ty);
    Some(replace_with(ctx, n, lit))
}

// ============================================================================
// Unary operators
// ============================================================================

/// `lnot` and `bnot`. A logical not of a comparison is absorbed by
/// inverting the comparison.
pub(crate) fn refine_not(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    let changed = refine_slot(ctx, n, slot::UNA, rc);
    let (result, c) = settle_not(ctx, n, rc);
    (result, changed | c)
}

fn settle_not(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    let opnd = ctx.kid(n, slot::UNA);
    let inverted = ctx.code(opnd).invert_relation();
    if let (Opcode::Lnot, Some(inverted)) = (ctx.code(n), inverted) {
        let ty = ctx.ty(n);
        ctx.set_code(opnd, inverted);
        ctx.take_kid(n, slot::UNA);
        ctx.free_ir(n);
        fired("lnot_of_relation", n);
        let (result, _) = settle_binary(ctx, opnd, rc, true);
        return (retype(ctx, result, ty), true);
    }
    if rc.fold_const {
        return fold_const(ctx, n, rc);
    }
    (n, false)
}

/// Fold, then `-(-X)` to `X`.
pub(crate) fn refine_neg(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    let changed = refine_slot(ctx, n, slot::UNA, rc);
    if rc.fold_const {
        let (folded, c) = fold_const(ctx, n, rc);
        if c {
            return (folded, true);
        }
    }
    let inner = ctx.kid(n, slot::UNA);
    if ctx.code(inner) != Opcode::Neg {
        return (n, changed);
    }
    let x = ctx.kid(inner, slot::UNA);
    ctx.take_kid(inner, slot::UNA);
    discard(ctx, n);
    fired("double_neg", n);
    (x, true)
}

/// Whether converting a value of `from` to `to` keeps every value intact.
fn lossless_cvt(ctx: &IrContext, from: NodeRef, to: NodeRef) -> bool {
    let types = &ctx.types;
    let (f, t) = (ctx.ty(from), ctx.ty(to));
    let (fs, ts) = (types.byte_size(f), types.byte_size(t));
    if types.is_int(f) && types.is_int(t) {
        return f == t || (ts > fs && (types.is_signed(t) || !types.is_signed(f)));
    }
    types.is_fp(f) && types.is_fp(t) && ts >= fs
}

/// Conversion node: collapse a value-preserving inner conversion, drop an
/// identity conversion, fold a conversion of a same-domain literal.
pub(crate) fn refine_cvt(ctx: &mut IrContext, n: NodeRef, rc: &mut RefineCtx) -> (NodeRef, bool) {
    let mut changed = refine_slot(ctx, n, slot::UNA, rc);

    let opnd = ctx.kid(n, slot::UNA);
    if ctx.code(opnd) == Opcode::Cvt {
        let x = ctx.kid(opnd, slot::UNA);
        if lossless_cvt(ctx, x, opnd) {
            ctx.take_kid(opnd, slot::UNA);
            ctx.take_kid(n, slot::UNA);
            ctx.free_ir(opnd);
            ctx.set_kid(n, slot::UNA, Some(x));
            fired("nested_cvt", n);
            changed = true;
        }
    }

    let opnd = ctx.kid(n, slot::UNA);
    let ty = ctx.ty(n);
    if ctx.ty(opnd) == ty {
        fired("identity_cvt", n);
        return (splice_kid(ctx, n, slot::UNA), true);
    }
    if !rc.fold_const {
        return (n, changed);
    }
    if ctx.const_int(opnd).is_some() && ctx.types.is_int(ty) {
        restamp_int(ctx, opnd, ty);
        fired("fold_cvt_int", n);
        return (splice_kid(ctx, n, slot::UNA), true);
    }
    if let (Some(v), true) = (ctx.const_fp(opnd), ctx.types.is_fp(ty)) {
        let v = normalize_fp(ctx, ty, v);
        set_const(ctx, opnd, ConstValue::Fp(v));
        ctx.set_ty(opnd, ty);
        fired("fold_cvt_fp", n);
        return (splice_kid(ctx, n, slot::UNA), true);
    }
    (n, changed)
}

// ============================================================================
// Select
// ============================================================================

pub(crate) fn refine_select(
    ctx: &mut IrContext,
    n: NodeRef,
    rc: &mut RefineCtx,
) -> (NodeRef, bool) {
    let pred = ctx.kid(n, slot::SELECT_PRED);
    let mut changed = false;
    if !ctx.is_const(pred) {
        let (new_pred, c) = refine_det(ctx, pred, rc);
        if new_pred != pred {
            ctx.set_kid(n, slot::SELECT_PRED, Some(new_pred));
        }
        changed = c;
    }
    changed |= refine_slot(ctx, n, slot::SELECT_TRUE, rc);
    changed |= refine_slot(ctx, n, slot::SELECT_FALSE, rc);

    let mut pred = ctx.kid(n, slot::SELECT_PRED);
    if rc.fold_const {
        let (folded, c) = fold_const(ctx, pred, rc);
        if c {
            ctx.set_kid(n, slot::SELECT_PRED, Some(folded));
            pred = folded;
            changed = true;
        }
    }

    let taken = if let Some(v) = ctx.const_int(pred) {
        Some(v != 0)
    } else if let Some(v) = ctx.const_fp(pred) {
        Some(v != 0.0)
    } else if ctx.is_str_const(pred) {
        Some(true)
    } else {
        None
    };
    if let Some(taken) = taken {
        let idx = if taken {
            slot::SELECT_TRUE
        } else {
            slot::SELECT_FALSE
        };
        fired("select_const_pred", n);
        return (splice_kid(ctx, n, idx), true);
    }

    if !rc.hoist_select_to_not {
        return (n, changed);
    }
    let ty = ctx.ty(n);
    match hoist_select_to_not(ctx, n) {
        Some(not) => {
            let (not, _) = settle_not(ctx, not, rc);
            (retype(ctx, not, ty), true)
        }
        None => (n, changed),
    }
}

/// `(a != 0) ? 0 : 1` and `(a == 0) ? 1 : 0` to `!a`.
fn hoist_select_to_not(ctx: &mut IrContext, n: NodeRef) -> Option<NodeRef> {
    let pred = ctx.kid(n, slot::SELECT_PRED);
    let (t, f) = (
        ctx.const_int(ctx.kid(n, slot::SELECT_TRUE))?,
        ctx.const_int(ctx.kid(n, slot::SELECT_FALSE))?,
    );
    let code = ctx.code(pred);
    let fits = match code {
        Opcode::Ne => (t, f) == (0, 1),
        Opcode::Eq => (t, f) == (1, 0),
        _ => false,
    };
    if !fits || !ctx.is_const_int_equal(ctx.kid(pred, slot::OPND1), 0) {
        return None;
    }
    let a = ctx.kid(pred, slot::OPND0);
    ctx.take_kid(pred, slot::OPND0);
    discard(ctx, n);
    fired("hoist_select_to_not", n);
    Some(ctx.build_logical_not(a))
}

// ============================================================================
// Conditions
// ============================================================================

/// Logical negation of a branch condition.
///
/// Comparisons are inverted in place; anything else is wrapped in a
/// logical not. The returned node stands in place of `det`.
pub fn invert_condition(ctx: &mut IrContext, det: NodeRef) -> NodeRef {
    match ctx.code(det).invert_relation() {
        Some(inverted) => {
            ctx.set_code(det, inverted);
            det
        }
        None => ctx.build_logical_not(det),
    }
}
