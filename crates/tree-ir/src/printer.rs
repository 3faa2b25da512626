//! Indented text dump of trees, statement lists and blocks.
//!
//! Each node takes one line, kids follow one level deeper:
//!
//! ```text
//! stpr $2:i32
//!     add:i32
//!         $1:i32
//!         intconst:i32 4
//! ```
//!
//! Statement-list slots are introduced by a header line naming the slot.
//! Output never ends with a newline.

use std::fmt::{self, Write};

use crate::context::{ConstValue, IrContext};
use crate::opcode::Opcode;
use crate::refs::{BbRef, NodeRef};

const INDENT: &str = "    ";

// ============================================================================
// Public API
// ============================================================================

/// Print a single tree.
pub fn print_ir(ctx: &IrContext, n: NodeRef) -> String {
    let mut out = String::new();
    write_tree(ctx, &mut out, n, 0).expect("fmt::Write to String never fails");
    finish(out)
}

/// Print a list of trees one after another.
pub fn print_ir_list(ctx: &IrContext, list: &[NodeRef]) -> String {
    let mut out = String::new();
    for &n in list {
        write_tree(ctx, &mut out, n, 0).expect("fmt::Write to String never fails");
    }
    finish(out)
}

/// Print every block of the region, each under a `bbN:` header.
pub fn print_bb_list(ctx: &IrContext) -> String {
    let mut out = String::new();
    for &bb in ctx.bb_list() {
        write_bb(ctx, &mut out, bb).expect("fmt::Write to String never fails");
    }
    finish(out)
}

fn finish(mut out: String) -> String {
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

// ============================================================================
// Writers
// ============================================================================

fn write_bb(ctx: &IrContext, f: &mut impl Write, bb: BbRef) -> fmt::Result {
    writeln!(f, "{bb}:")?;
    for &stmt in ctx.bb_stmts(bb) {
        write_tree(ctx, f, stmt, 1)?;
    }
    Ok(())
}

fn write_tree(ctx: &IrContext, f: &mut impl Write, n: NodeRef, depth: usize) -> fmt::Result {
    write_indent(f, depth)?;
    write_node(ctx, f, n)?;
    f.write_char('\n')?;

    let code = ctx.code(n);
    for idx in 0..ctx.num_slots(n) {
        let kids = ctx.kids(n, idx);
        let header = code.slot_is_stmt_list(idx) || code.slot_name(idx) == "cases";
        if header {
            write_indent(f, depth + 1)?;
            writeln!(f, "{}:", code.slot_name(idx))?;
        }
        let kid_depth = if header { depth + 2 } else { depth + 1 };
        for &kid in kids {
            write_tree(ctx, f, kid, kid_depth)?;
        }
    }
    Ok(())
}

fn write_indent(f: &mut impl Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

/// One-line rendering of a node without its kids.
fn write_node(ctx: &IrContext, f: &mut impl Write, n: NodeRef) -> fmt::Result {
    let data = ctx.node(n);
    let ty = ctx.types.display(data.ty);
    let attrs = &data.attrs;
    match data.code {
        Opcode::Const => match &attrs.value {
            Some(ConstValue::Int(v)) => write!(f, "intconst:{ty} {v}"),
            Some(ConstValue::Fp(v)) => write!(f, "fpconst:{ty} {v:?}"),
            Some(ConstValue::Str(s)) => write!(f, "strconst:{ty} {s:?}"),
            None => write!(f, "const:{ty} ?"),
        },
        Opcode::Pr => write!(f, "${}:{ty}", attrs.prno),
        Opcode::StPr | Opcode::Phi => write!(f, "{} ${}:{ty}", data.code, attrs.prno),
        Opcode::Goto | Opcode::Label | Opcode::TrueBr | Opcode::FalseBr | Opcode::Case => {
            write!(f, "{}", data.code)?;
            if let Some(label) = attrs.label {
                write!(f, " {label}")?;
            }
            Ok(())
        }
        code => {
            write!(f, "{code}")?;
            if !ctx.types.is_void(data.ty) {
                write!(f, ":{ty}")?;
            }
            if let Some(var) = attrs.var {
                write!(f, " '{}'", ctx.vars.get(var).name)?;
            }
            if attrs.ofst != 0 {
                write!(f, " ofst:{}", attrs.ofst)?;
            }
            Ok(())
        }
    }
}
