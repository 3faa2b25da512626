//! Expression evaluation under a constant environment.
//!
//! Integer values are kept as `i64` normalized to the width of their type
//! (sign-extended for signed types, zero-extended otherwise), so results
//! match what a target with wrapping arithmetic computes. Evaluation
//! yields `None` for anything without a defined value: division by zero,
//! out-of-range shifts, unbound variables, addresses and calls.

use std::collections::HashMap;

use crate::context::{ConstValue, IrContext};
use crate::opcode::{Opcode, slot};
use crate::refs::{NodeRef, TypeRef, VarRef};
use crate::types::DataType;

/// Scalar runtime value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Fp(f64),
}

impl Value {
    pub fn is_true(self) -> bool {
        match self {
            Value::Int(v) => v != 0,
            Value::Fp(v) => v != 0.0,
        }
    }
}

/// Values of memory locations and pseudo registers.
#[derive(Clone, Debug, Default)]
pub struct Env {
    vars: HashMap<(VarRef, i64), Value>,
    prs: HashMap<u32, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_var(&mut self, var: VarRef, ofst: i64, v: Value) {
        self.vars.insert((var, ofst), v);
    }

    pub fn set_pr(&mut self, prno: u32, v: Value) {
        self.prs.insert(prno, v);
    }
}

// ============================================================================
// Scalar arithmetic
// ============================================================================

fn sext(v: i64, bits: u32) -> i64 {
    if bits >= 64 {
        return v;
    }
    let shift = 64 - bits;
    (v << shift) >> shift
}

fn zext(v: i64, bits: u32) -> u64 {
    if bits >= 64 {
        return v as u64;
    }
    (v as u64) & ((1u64 << bits) - 1)
}

/// Apply an integer binary operator to operands of `bits` width.
///
/// `unsigned` selects unsigned division, remainder and comparison.
/// Returns `None` on division by zero or a shift amount outside
/// `0..bits`. The result is not normalized to any type.
pub fn calc_int_binary(code: Opcode, v0: i64, v1: i64, unsigned: bool, bits: u32) -> Option<i64> {
    use Opcode::*;
    let bits = bits.clamp(1, 64);
    let (u0, u1) = (zext(v0, bits), zext(v1, bits));
    let (s0, s1) = (sext(v0, bits), sext(v1, bits));
    Some(match code {
        Add => v0.wrapping_add(v1),
        Sub => v0.wrapping_sub(v1),
        Mul => v0.wrapping_mul(v1),
        Div | Rem | Mod => {
            if u1 == 0 {
                return None;
            }
            match (code, unsigned) {
                (Div, true) => (u0 / u1) as i64,
                (Div, false) => s0.wrapping_div(s1),
                (_, true) => (u0 % u1) as i64,
                (_, false) => s0.wrapping_rem(s1),
            }
        }
        Land => i64::from(v0 != 0 && v1 != 0),
        Lor => i64::from(v0 != 0 || v1 != 0),
        Band => v0 & v1,
        Bor => v0 | v1,
        Xor => v0 ^ v1,
        Asr | Lsr | Lsl => {
            if v1 < 0 || v1 >= i64::from(bits) {
                return None;
            }
            let k = v1 as u32;
            match code {
                Asr => s0 >> k,
                Lsr => (u0 >> k) as i64,
                _ => v0.wrapping_shl(k),
            }
        }
        Lt | Le | Gt | Ge | Eq | Ne => {
            let ord = if unsigned { u0.cmp(&u1) } else { s0.cmp(&s1) };
            i64::from(match code {
                Lt => ord.is_lt(),
                Le => ord.is_le(),
                Gt => ord.is_gt(),
                Ge => ord.is_ge(),
                Eq => ord.is_eq(),
                _ => ord.is_ne(),
            })
        }
        _ => return None,
    })
}

pub fn calc_int_unary(code: Opcode, v: i64) -> Option<i64> {
    Some(match code {
        Opcode::Neg => v.wrapping_neg(),
        Opcode::Lnot => i64::from(v == 0),
        Opcode::Bnot => !v,
        _ => return None,
    })
}

/// Apply a floating binary operator. Comparisons produce `Value::Int`.
/// Division by zero is left undefined.
pub fn calc_fp_binary(code: Opcode, a: f64, b: f64) -> Option<Value> {
    use Opcode::*;
    Some(match code {
        Add => Value::Fp(a + b),
        Sub => Value::Fp(a - b),
        Mul => Value::Fp(a * b),
        Div if b != 0.0 => Value::Fp(a / b),
        Lt => Value::Int(i64::from(a < b)),
        Le => Value::Int(i64::from(a <= b)),
        Gt => Value::Int(i64::from(a > b)),
        Ge => Value::Int(i64::from(a >= b)),
        Eq => Value::Int(i64::from(a == b)),
        Ne => Value::Int(i64::from(a != b)),
        _ => return None,
    })
}

pub fn calc_fp_unary(code: Opcode, a: f64) -> Option<Value> {
    Some(match code {
        Opcode::Neg => Value::Fp(-a),
        Opcode::Lnot => Value::Int(i64::from(a == 0.0)),
        _ => return None,
    })
}

/// Round `v` to the precision of floating type `ty`.
pub fn normalize_fp(ctx: &IrContext, ty: TypeRef, v: f64) -> f64 {
    if ctx.types.dtype(ty) == Some(DataType::F32) {
        f64::from(v as f32)
    } else {
        v
    }
}

// ============================================================================
// Tree evaluation
// ============================================================================

/// Evaluate an expression tree.
pub fn eval(ctx: &IrContext, env: &Env, n: NodeRef) -> Option<Value> {
    let ty = ctx.ty(n);
    let raw = eval_raw(ctx, env, n)?;
    Some(normalize(ctx, ty, raw))
}

fn normalize(ctx: &IrContext, ty: TypeRef, v: Value) -> Value {
    match v {
        Value::Int(i) if ctx.types.is_fp(ty) => Value::Fp(normalize_fp(ctx, ty, i as f64)),
        Value::Int(i) => Value::Int(ctx.types.normalize_int(ty, i)),
        Value::Fp(f) if ctx.types.is_fp(ty) => Value::Fp(normalize_fp(ctx, ty, f)),
        Value::Fp(f) => Value::Int(ctx.types.normalize_int(ty, f as i64)),
    }
}

fn eval_raw(ctx: &IrContext, env: &Env, n: NodeRef) -> Option<Value> {
    let code = ctx.code(n);
    let attrs = ctx.attrs(n);
    match code {
        Opcode::Const => match attrs.value.as_ref()? {
            ConstValue::Int(v) => Some(Value::Int(*v)),
            ConstValue::Fp(v) => Some(Value::Fp(*v)),
            ConstValue::Str(_) => None,
        },
        Opcode::Ld | Opcode::Id => env.vars.get(&(attrs.var?, attrs.ofst)).copied(),
        Opcode::Pr => env.prs.get(&attrs.prno).copied(),
        Opcode::Ild => {
            let base = ctx.kid(n, slot::ILD_BASE);
            if ctx.code(base) != Opcode::Lda {
                return None;
            }
            let battrs = ctx.attrs(base);
            env.vars.get(&(battrs.var?, battrs.ofst + attrs.ofst)).copied()
        }
        Opcode::Cvt => {
            let opnd = ctx.kid(n, slot::UNA);
            let v = eval(ctx, env, opnd)?;
            // Integer sources convert by their own signedness.
            Some(match v {
                Value::Int(i) if ctx.types.is_fp(ctx.ty(n)) && ctx.is_unsigned(opnd) => {
                    Value::Fp(zext(i, ctx.types.bit_width(ctx.ty(opnd))) as f64)
                }
                other => other,
            })
        }
        Opcode::Select => {
            let pred = eval(ctx, env, ctx.kid(n, slot::SELECT_PRED))?;
            let taken = if pred.is_true() {
                slot::SELECT_TRUE
            } else {
                slot::SELECT_FALSE
            };
            eval(ctx, env, ctx.kid(n, taken))
        }
        code if code.is_unary() => match eval(ctx, env, ctx.kid(n, slot::UNA))? {
            Value::Int(v) => calc_int_unary(code, v).map(Value::Int),
            Value::Fp(v) => calc_fp_unary(code, v),
        },
        code if code.is_binary() => {
            let (k0, k1) = (ctx.kid(n, slot::OPND0), ctx.kid(n, slot::OPND1));
            let a = eval(ctx, env, k0)?;
            let b = eval(ctx, env, k1)?;
            match (a, b) {
                (Value::Int(a), Value::Int(b)) => {
                    let unsigned = ctx.is_unsigned(k0) || ctx.is_unsigned(k1);
                    let bits = ctx.types.bit_width(ctx.ty(k0)).max(ctx.types.bit_width(ctx.ty(k1)));
                    calc_int_binary(code, a, b, unsigned, bits).map(Value::Int)
                }
                (Value::Fp(a), Value::Fp(b)) => calc_fp_binary(code, a, b),
                _ => None,
            }
        }
        _ => None,
    }
}
