//! Recursive node traversal utilities.
//!
//! Provides `walk_*` functions for visiting every node reachable from a
//! tree, a statement list, or the block list of a region, in pre-order.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::refs::{BbRef, NodeRef};

/// Controls whether to descend into kids during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into the kids of the current node.
    Advance,
    /// Skip the kids of the current node.
    Skip,
}

/// Walk a node and every node below it.
pub fn walk_ir<B>(
    ctx: &IrContext,
    n: NodeRef,
    f: &mut dyn FnMut(NodeRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(n) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for kid in ctx.all_kids(n) {
        walk_ir(ctx, kid, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk each tree of a statement list.
pub fn walk_ir_list<B>(
    ctx: &IrContext,
    list: &[NodeRef],
    f: &mut dyn FnMut(NodeRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &n in list {
        walk_ir(ctx, n, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk every statement of a basic block.
pub fn walk_bb<B>(
    ctx: &IrContext,
    bb: BbRef,
    f: &mut dyn FnMut(NodeRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    walk_ir_list(ctx, ctx.bb_stmts(bb), f)
}

/// Walk every block of the region in layout order.
pub fn walk_bb_list<B>(
    ctx: &IrContext,
    f: &mut dyn FnMut(NodeRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &bb in ctx.bb_list() {
        walk_bb(ctx, bb, f)?;
    }
    ControlFlow::Continue(())
}

/// Every node reachable from the region's blocks.
pub fn reachable_nodes(ctx: &IrContext) -> Vec<NodeRef> {
    let mut out = Vec::new();
    let _ = walk_bb_list::<()>(ctx, &mut |n| {
        out.push(n);
        ControlFlow::Continue(WalkAction::Advance)
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;
    use crate::types::DataType;

    #[test]
    fn walk_visits_preorder() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let a = ctx.build_pr(1, i32t);
        let b = ctx.build_imm_int(2, i32t);
        let add = ctx.build_binary(Opcode::Add, i32t, a, b);
        let st = ctx.build_store_pr(2, i32t, add);

        let mut seen = Vec::new();
        let _ = walk_ir::<()>(&ctx, st, &mut |n| {
            seen.push(n);
            ControlFlow::Continue(WalkAction::Advance)
        });
        assert_eq!(seen, vec![st, add, a, b]);
    }

    #[test]
    fn walk_skip_and_early_exit() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        for i in 0..3 {
            let v = ctx.build_imm_int(i, i32t);
            let st = ctx.build_store_pr(i as u32, i32t, v);
            ctx.append_stmt(bb, st);
        }

        let mut visited = 0;
        let _ = walk_bb_list::<()>(&ctx, &mut |_| {
            visited += 1;
            ControlFlow::Continue(WalkAction::Skip)
        });
        assert_eq!(visited, 3);

        let mut visited = 0;
        let result = walk_bb_list::<()>(&ctx, &mut |_| {
            visited += 1;
            ControlFlow::Break(())
        });
        assert!(result.is_break());
        assert_eq!(visited, 1);
        assert_eq!(reachable_nodes(&ctx).len(), 6);
    }
}
