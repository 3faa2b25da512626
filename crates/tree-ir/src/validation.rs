//! Structural and reference-graph validation of a region.
//!
//! Checks, for every node reachable from the region's blocks:
//!
//! 1. **Tree links**: each kid's parent pointer names its owner, top-level
//!    statements point back to their block, and no released node is
//!    reachable.
//! 2. **DU edges**: every edge is symmetric and connects two live nodes
//!    that are both reachable.
//! 3. **SSA links**: every `pr` carrying SSA info is in that info's use
//!    set, and every use set holds only live nodes reading the value.

use std::collections::HashSet;

use derive_more::Display;

use crate::context::IrContext;
use crate::opcode::Opcode;
use crate::refs::{BbRef, NodeRef, SsaRef};

// ============================================================================
// Error types
// ============================================================================

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ValidationError {
    #[display("{kid} under {parent} has parent pointer {actual:?}")]
    ParentMismatch {
        parent: NodeRef,
        kid: NodeRef,
        actual: Option<NodeRef>,
    },

    #[display("statement {stmt} in {bb} is not linked back to it")]
    BlockMismatch { stmt: NodeRef, bb: BbRef },

    #[display("released node {node} is reachable from {from}")]
    ReleasedReachable { node: NodeRef, from: NodeRef },

    #[display("DU edge {from} -> {to} has no reverse edge")]
    AsymmetricDu { from: NodeRef, to: NodeRef },

    #[display("DU edge {from} -> {to} points at a released node")]
    DuToReleased { from: NodeRef, to: NodeRef },

    #[display("DU edge {from} -> {to} leaves the region")]
    DuToUnreachable { from: NodeRef, to: NodeRef },

    #[display("{node} reads {info} but is not in its use set")]
    SsaUseMissing { node: NodeRef, info: SsaRef },

    #[display("{info} lists {node} which does not read it")]
    SsaStaleUse { info: SsaRef, node: NodeRef },

    #[display("{info} is defined by released node {def}")]
    SsaDefReleased { info: SsaRef, def: NodeRef },
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Entry point
// ============================================================================

/// Validate every block of the region.
pub fn validate(ctx: &IrContext) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let reachable = collect_reachable(ctx, &mut errors);
    check_du_edges(ctx, &reachable, &mut errors);
    check_ssa(ctx, &reachable, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Walk the blocks checking tree links, returning the live reachable nodes.
fn collect_reachable(ctx: &IrContext, errors: &mut Vec<ValidationError>) -> Vec<NodeRef> {
    let mut out = Vec::new();
    for &bb in ctx.bb_list() {
        for &stmt in ctx.bb_stmts(bb) {
            if ctx.is_released(stmt) {
                errors.push(ValidationError::ReleasedReachable {
                    node: stmt,
                    from: stmt,
                });
                continue;
            }
            if ctx.node(stmt).bb != Some(bb) {
                errors.push(ValidationError::BlockMismatch { stmt, bb });
            }
            let mut stack = vec![stmt];
            while let Some(n) = stack.pop() {
                out.push(n);
                for kid in ctx.all_kids(n) {
                    if ctx.is_released(kid) {
                        errors.push(ValidationError::ReleasedReachable { node: kid, from: n });
                        continue;
                    }
                    let actual = ctx.parent(kid);
                    if actual != Some(n) {
                        errors.push(ValidationError::ParentMismatch {
                            parent: n,
                            kid,
                            actual,
                        });
                    }
                    stack.push(kid);
                }
            }
        }
    }
    out
}

fn check_du_edges(ctx: &IrContext, reachable: &[NodeRef], errors: &mut Vec<ValidationError>) {
    let live: HashSet<NodeRef> = reachable.iter().copied().collect();
    for &n in reachable {
        for &peer in ctx.du_set(n) {
            if ctx.is_released(peer) {
                errors.push(ValidationError::DuToReleased { from: n, to: peer });
                continue;
            }
            if !live.contains(&peer) {
                errors.push(ValidationError::DuToUnreachable { from: n, to: peer });
            }
            if !ctx.du_set(peer).contains(&n) {
                errors.push(ValidationError::AsymmetricDu { from: n, to: peer });
            }
        }
    }
}

fn check_ssa(ctx: &IrContext, reachable: &[NodeRef], errors: &mut Vec<ValidationError>) {
    let mut infos: Vec<SsaRef> = Vec::new();
    for &n in reachable {
        let Some(info) = ctx.ssa_of(n) else {
            continue;
        };
        infos.push(info);
        if ctx.code(n) == Opcode::Pr && !ctx.ssa_info(info).uses.contains(&n) {
            errors.push(ValidationError::SsaUseMissing { node: n, info });
        }
    }
    infos.sort();
    infos.dedup();
    for info in infos {
        let data = ctx.ssa_info(info);
        if let Some(def) = data.def.filter(|&d| ctx.is_released(d)) {
            errors.push(ValidationError::SsaDefReleased { info, def });
        }
        for &u in &data.uses {
            if ctx.is_released(u) || ctx.ssa_of(u) != Some(info) {
                errors.push(ValidationError::SsaStaleUse { info, node: u });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use crate::var::VarData;

    #[test]
    fn well_formed_region_passes() {
        let mut ctx = IrContext::new();
        ctx.enable_du_mgr();
        let i32t = ctx.types.simplex(DataType::I32);
        let a = ctx.vars.add(VarData::new("a", i32t));
        let bb = ctx.create_bb();
        let one = ctx.build_imm_int(1, i32t);
        let st = ctx.build_store(a, i32t, 0, one);
        let ld = ctx.build_load(a, i32t);
        let use_st = ctx.build_store_pr(1, i32t, ld);
        ctx.append_stmt(bb, st);
        ctx.append_stmt(bb, use_st);
        ctx.add_du_edge(st, ld);
        assert_eq!(validate(&ctx), Ok(()));
    }

    #[test]
    fn detects_parent_and_du_breakage() {
        let mut ctx = IrContext::new();
        ctx.enable_du_mgr();
        let i32t = ctx.types.simplex(DataType::I32);
        let a = ctx.vars.add(VarData::new("a", i32t));
        let bb = ctx.create_bb();
        let one = ctx.build_imm_int(1, i32t);
        let st = ctx.build_store(a, i32t, 0, one);
        ctx.append_stmt(bb, st);
        let stray = ctx.build_load(a, i32t);
        ctx.add_du_edge(st, stray);
        ctx.set_parent(one, None);

        let errors = validate(&ctx).unwrap_err();
        assert!(errors.contains(&ValidationError::ParentMismatch {
            parent: st,
            kid: one,
            actual: None,
        }));
        assert!(errors.contains(&ValidationError::DuToUnreachable { from: st, to: stray }));
    }

    #[test]
    fn detects_missing_ssa_use() {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        let c = ctx.build_imm_int(1, i32t);
        let def = ctx.build_store_pr(1, i32t, c);
        let info = ctx.new_ssa_info(def);
        let u = ctx.build_pr(1, i32t);
        ctx.add_ssa_use(info, u);
        let st = ctx.build_store_pr(2, i32t, u);
        ctx.append_stmt(bb, def);
        ctx.append_stmt(bb, st);
        assert_eq!(validate(&ctx), Ok(()));

        ctx.clean_ssa_du(info);
        ctx.node_mut(u).ssa = Some(info);
        let errors = validate(&ctx).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SsaUseMissing { node: u, info }]);
        assert_eq!(errors[0].to_string(), format!("{u} reads {info} but is not in its use set"));
    }
}
