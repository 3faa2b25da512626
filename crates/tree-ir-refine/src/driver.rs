//! Block-level drivers: refine the statements of basic blocks until no
//! rule fires.

use tracing::{debug, debug_span, warn};
use tree_ir::{BbRef, IrContext};

use crate::config::RefineCtx;
use crate::dispatch::refine;

/// Outcome of refining a region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefineResult {
    /// Whether any rule fired.
    pub changed: bool,
    /// Sweeps performed, summed over all blocks.
    pub sweeps: usize,
    /// False if some block hit the sweep cap while still changing.
    pub reached_fixpoint: bool,
}

/// Refine every block of the region in layout order.
///
/// Does nothing when `rc.enabled` is off.
pub fn refine_region(ctx: &mut IrContext, rc: &mut RefineCtx) -> RefineResult {
    let mut result = RefineResult {
        reached_fixpoint: true,
        ..RefineResult::default()
    };
    if !rc.enabled {
        return result;
    }
    let _span = debug_span!("refine_bb_list").entered();
    for bb in ctx.bb_list().to_vec() {
        let r = refine_block(ctx, bb, rc);
        result.changed |= r.changed;
        result.sweeps += r.sweeps;
        result.reached_fixpoint &= r.reached_fixpoint;
    }
    debug!(
        changed = result.changed,
        sweeps = result.sweeps,
        "refinement finished"
    );
    result
}

/// Refine every block of the region. Returns true if anything changed.
pub fn refine_bb_list(ctx: &mut IrContext, rc: &mut RefineCtx) -> bool {
    refine_region(ctx, rc).changed
}

/// Refine the statements of one block until a sweep changes nothing.
///
/// Statements a rule replaces take the position of the original; deleted
/// statements leave the block.
pub fn refine_stmt_list(ctx: &mut IrContext, bb: BbRef, rc: &mut RefineCtx) -> bool {
    if !rc.enabled {
        return false;
    }
    refine_block(ctx, bb, rc).changed
}

fn refine_block(ctx: &mut IrContext, bb: BbRef, rc: &mut RefineCtx) -> RefineResult {
    let saved = rc.stmt_removed;
    let cap = rc.sweep_cap();
    let mut result = RefineResult::default();
    while result.sweeps < cap {
        result.sweeps += 1;
        let mut sweep_changed = false;
        for stmt in ctx.bb_stmts(bb).to_vec() {
            let Some(pos) = ctx.bb_stmts(bb).iter().position(|&s| s == stmt) else {
                continue;
            };
            rc.stmt_removed = false;
            let (new, changed) = refine(ctx, stmt, rc);
            sweep_changed |= changed;
            match new {
                Some(new) if new != stmt => ctx.insert_stmt_at(bb, pos, new),
                Some(_) => {}
                None => debug_assert!(
                    rc.stmt_removed,
                    "refine_stmt_list: {stmt} was dropped but is not unlinked from {bb}"
                ),
            }
        }
        result.changed |= sweep_changed;
        if !sweep_changed {
            result.reached_fixpoint = true;
            break;
        }
    }
    if !result.reached_fixpoint {
        warn!(%bb, sweeps = result.sweeps, "refine_stmt_list: sweep cap reached before fixpoint");
    }
    debug!(%bb, sweeps = result.sweeps, changed = result.changed, "refined block");
    rc.stmt_removed = saved;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_ir::printer::print_bb_list;
    use tree_ir::{DataType, Opcode, VarData};

    #[test]
    fn disabled_pass_leaves_region_alone() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        let one = ctx.build_imm_int(1, i32t);
        let two = ctx.build_imm_int(2, i32t);
        let sum = ctx.build_binary(Opcode::Add, i32t, one, two);
        let st = ctx.build_store_pr(1, i32t, sum);
        ctx.append_stmt(bb, st);

        let mut rc = RefineCtx::default().with_enabled(false);
        assert_eq!(
            refine_region(&mut ctx, &mut rc),
            RefineResult {
                changed: false,
                sweeps: 0,
                reached_fixpoint: true
            }
        );
        assert!(!refine_stmt_list(&mut ctx, bb, &mut rc));
        assert_eq!(ctx.code(ctx.kid(st, 0)), Opcode::Add);
    }

    #[test]
    fn blocks_are_refined_in_order() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let a = ctx.vars.add(VarData::new("a", i32t));
        let (bb0, bb1) = (ctx.create_bb(), ctx.create_bb());

        let lda = ctx.build_lda(a, 0);
        let p = ctx.build_pr(1, i32t);
        let ist = ctx.build_ist(lda, 4, p, i32t);
        ctx.append_stmt(bb0, ist);
        let x = ctx.build_pr(2, i32t);
        let one = ctx.build_imm_int(1, i32t);
        let mul = ctx.build_binary(Opcode::Mul, i32t, x, one);
        let ret = ctx.build_return(Some(mul));
        ctx.append_stmt(bb1, ret);

        let mut rc = RefineCtx::default();
        let result = refine_region(&mut ctx, &mut rc);
        assert!(result.changed && result.reached_fixpoint);
        assert_eq!(result.sweeps, 4);
        insta::assert_snapshot!(print_bb_list(&ctx), @r"
        bb0:
            st:i32 'a' ofst:4
                $1:i32
        bb1:
            return
                $2:i32
        ");
    }

    #[test]
    fn sweep_cap_bounds_the_work() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        let one = ctx.build_imm_int(1, i32t);
        let two = ctx.build_imm_int(2, i32t);
        let sum = ctx.build_binary(Opcode::Add, i32t, one, two);
        let st = ctx.build_store_pr(1, i32t, sum);
        ctx.append_stmt(bb, st);

        let mut rc = RefineCtx::default().with_max_list_iterations(1);
        let result = refine_region(&mut ctx, &mut rc);
        assert_eq!((result.changed, result.sweeps, result.reached_fixpoint), (true, 1, false));
    }
}
