//! Reference info (DU records) and the incremental DU maintenance protocol.
//!
//! A node may own a reference-info record holding its Must reference, its
//! May reference set and its Def/Use set. For a statement the Def/Use set
//! holds the expressions reading what it defines; for an expression it holds
//! the statements defining what it reads. Edges are kept symmetric.
//!
//! Records may carry Must/May references in any region, but Def/Use edges
//! only exist while the region has a `DuMgr`. Every protocol operation that
//! touches edges requires the manager to be present.

use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::context::IrContext;
use crate::md::MdData;
use crate::opcode::Opcode;
use crate::refs::{MdRef, MdSetRef, NodeRef};

static EMPTY_DUSET: BTreeSet<NodeRef> = BTreeSet::new();

/// Reference-info record of one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DuInfo {
    /// The single location the node exactly accesses, if known.
    pub md: Option<MdRef>,
    /// Locations the node might access.
    pub mds: Option<MdSetRef>,
    pub duset: BTreeSet<NodeRef>,
}

impl DuInfo {
    /// A clean record is indistinguishable from having no record.
    pub fn is_clean(&self) -> bool {
        self.md.is_none() && self.mds.is_none() && self.duset.is_empty()
    }
}

/// Counters kept by the DU manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DuStats {
    pub edges_added: usize,
    pub edges_moved: usize,
    pub edges_removed: usize,
    pub expired_removed: usize,
}

/// Presence of this manager marks a region whose DU chains are maintained.
#[derive(Clone, Debug, Default)]
pub struct DuMgr {
    pub stats: DuStats,
}

impl IrContext {
    // ========================================================================
    // Manager
    // ========================================================================

    pub fn enable_du_mgr(&mut self) {
        if self.du_mgr.is_none() {
            self.du_mgr = Some(DuMgr::default());
        }
    }

    pub fn du_mgr(&self) -> Option<&DuMgr> {
        self.du_mgr.as_ref()
    }

    pub fn has_du_mgr(&self) -> bool {
        self.du_mgr.is_some()
    }

    fn du_stats(&mut self, op: &str) -> &mut DuStats {
        match self.du_mgr.as_mut() {
            Some(mgr) => &mut mgr.stats,
            None => panic!("{op}: region has no DU manager"),
        }
    }

    // ========================================================================
    // Records
    // ========================================================================

    pub fn du_info(&self, n: NodeRef) -> Option<&DuInfo> {
        self.node(n).du.map(|du| &self.du_infos[du])
    }

    fn du_info_mut(&mut self, n: NodeRef) -> &mut DuInfo {
        let du = match self.node(n).du {
            Some(du) => du,
            None => {
                let du = self.du_infos.push(DuInfo::default());
                self.node_mut(n).du = Some(du);
                du
            }
        };
        &mut self.du_infos[du]
    }

    /// True if the node has no record or only a clean one.
    pub fn has_clean_du(&self, n: NodeRef) -> bool {
        self.du_info(n).is_none_or(DuInfo::is_clean)
    }

    pub fn ref_md(&self, n: NodeRef) -> Option<MdRef> {
        self.du_info(n).and_then(|d| d.md)
    }

    pub fn ref_mds(&self, n: NodeRef) -> Option<MdSetRef> {
        self.du_info(n).and_then(|d| d.mds)
    }

    pub fn set_ref_md(&mut self, n: NodeRef, md: Option<MdRef>) {
        self.du_info_mut(n).md = md;
    }

    pub fn set_ref_mds(&mut self, n: NodeRef, mds: Option<MdSetRef>) {
        self.du_info_mut(n).mds = mds;
    }

    pub fn clean_ref_mds(&mut self, n: NodeRef) {
        if self.node(n).du.is_some() {
            self.du_info_mut(n).mds = None;
        }
    }

    /// The Must reference if it denotes an exact location.
    pub fn get_exact_ref(&self, n: NodeRef) -> Option<MdRef> {
        self.ref_md(n).filter(|&md| self.mds.get(md).exact)
    }

    /// Def/Use set of the node; empty without a record.
    pub fn du_set(&self, n: NodeRef) -> &BTreeSet<NodeRef> {
        match self.du_info(n) {
            Some(info) => &info.duset,
            None => &EMPTY_DUSET,
        }
    }

    /// Copy Must and May references from `from` to `to`.
    pub fn copy_ref(&mut self, to: NodeRef, from: NodeRef) {
        let (md, mds) = (self.ref_md(from), self.ref_mds(from));
        if md.is_none() && mds.is_none() && self.node(to).du.is_none() {
            return;
        }
        let info = self.du_info_mut(to);
        info.md = md;
        info.mds = mds;
    }

    /// Descriptor for a direct load at its variable and offset.
    pub fn gen_md_for_load(&mut self, ld: NodeRef) -> MdRef {
        assert_eq!(self.code(ld), Opcode::Ld, "gen_md_for_load: {ld} is not a load");
        self.gen_md_for_var_access(ld)
    }

    /// Descriptor for a direct store at its variable and offset.
    pub fn gen_md_for_store(&mut self, st: NodeRef) -> MdRef {
        assert_eq!(self.code(st), Opcode::St, "gen_md_for_store: {st} is not a store");
        self.gen_md_for_var_access(st)
    }

    fn gen_md_for_var_access(&mut self, n: NodeRef) -> MdRef {
        let Some(var) = self.attrs(n).var else {
            panic!("gen_md: {n} ({}) names no variable", self.code(n));
        };
        let ofst = self.attrs(n).ofst;
        let size = self.dtype_size(n);
        self.mds.register(MdData::exact(var, ofst, size))
    }

    /// Descriptor of the pseudo register read or written by `n`.
    pub fn gen_md_for_pr(&mut self, n: NodeRef) -> MdRef {
        let prno = self.attrs(n).prno;
        let ty = self.ty(n);
        let size = self.dtype_size(n);
        let var = self.vars.pr_var(prno, ty);
        self.mds.register(MdData::exact(var, 0, size))
    }

    /// Every location `n` may touch: its Must reference plus its May set.
    fn referenced_mds(&self, n: NodeRef) -> Vec<MdRef> {
        let mut out: Vec<MdRef> = self.ref_md(n).into_iter().collect();
        if let Some(s) = self.ref_mds(n) {
            out.extend(self.mds.set(s).iter().copied());
        }
        out
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Record that statement `def` reaches expression `use_`.
    pub fn add_du_edge(&mut self, def: NodeRef, use_: NodeRef) {
        assert!(
            self.is_stmt(def) && !self.is_stmt(use_),
            "add_du_edge: expected statement -> expression, got {def} -> {use_}",
        );
        self.du_stats("add_du_edge").edges_added += 1;
        self.du_info_mut(def).duset.insert(use_);
        self.du_info_mut(use_).duset.insert(def);
    }

    pub fn remove_du_edge(&mut self, def: NodeRef, use_: NodeRef) {
        self.du_stats("remove_du_edge").edges_removed += 1;
        self.unlink_edge(def, use_);
    }

    fn unlink_edge(&mut self, a: NodeRef, b: NodeRef) {
        for (x, y) in [(a, b), (b, a)] {
            if self.is_released(x) {
                continue;
            }
            if let Some(du) = self.node(x).du {
                self.du_infos[du].duset.remove(&y);
            }
        }
    }

    fn take_duset(&mut self, n: NodeRef) -> BTreeSet<NodeRef> {
        match self.node(n).du {
            Some(du) => std::mem::take(&mut self.du_infos[du].duset),
            None => BTreeSet::new(),
        }
    }

    /// Move every edge of `old` to `new`. Afterwards `old` has no edges.
    fn move_edges(&mut self, new: NodeRef, old: NodeRef, op: &str) {
        let peers = self.take_duset(old);
        self.du_stats(op).edges_moved += peers.len();
        for peer in peers {
            let du = self.du_info_mut(peer);
            du.duset.remove(&old);
            du.duset.insert(new);
            self.du_info_mut(new).duset.insert(peer);
        }
    }

    /// Statement `new` takes over every use reached by `old`.
    pub fn change_def(&mut self, new: NodeRef, old: NodeRef) {
        assert!(
            self.is_stmt(new) && self.is_stmt(old),
            "change_def: {new} and {old} must both be statements",
        );
        self.move_edges(new, old, "change_def");
    }

    /// Expression `new` takes over every def reaching `old`.
    pub fn change_use(&mut self, new: NodeRef, old: NodeRef) {
        assert!(
            !self.is_stmt(new) && !self.is_stmt(old),
            "change_use: {new} and {old} must both be expressions",
        );
        self.move_edges(new, old, "change_use");
    }

    /// Give `to` every edge `from` has, leaving `from` untouched.
    pub fn copy_du_set(&mut self, to: NodeRef, from: NodeRef) {
        let peers: Vec<NodeRef> = self.du_set(from).iter().copied().collect();
        self.du_stats("copy_du_set").edges_added += peers.len();
        for peer in peers {
            self.du_info_mut(peer).duset.insert(to);
            self.du_info_mut(to).duset.insert(peer);
        }
    }

    /// Copy references and edges node by node between two trees of
    /// identical shape, typically an original and its `dup_ir_tree`.
    pub fn copy_ir_tree_du(&mut self, to: NodeRef, from: NodeRef) {
        let tos = self.subtree(to);
        let froms = self.subtree(from);
        assert_eq!(
            tos.len(),
            froms.len(),
            "copy_ir_tree_du: {to} and {from} differ in shape",
        );
        for (t, f) in tos.into_iter().zip(froms) {
            if self.node(f).du.is_none() {
                continue;
            }
            self.copy_ref(t, f);
            self.copy_du_set(t, f);
        }
    }

    /// Sever the outgoing use edges of every expression below `exp`, so
    /// the subtree can be discarded.
    pub fn remove_use_out_from_defset(&mut self, exp: NodeRef) {
        for x in self.subtree(exp) {
            if self.is_stmt(x) {
                continue;
            }
            let defs = self.take_duset(x);
            self.du_stats("remove_use_out_from_defset").edges_removed += defs.len();
            for d in defs {
                self.unlink_edge(d, x);
            }
        }
    }

    /// Fully detach a statement and everything below it from the DU graph.
    pub fn remove_ir_out_from_du_mgr(&mut self, stmt: NodeRef) {
        for x in self.subtree(stmt) {
            let peers = self.take_duset(x);
            self.du_stats("remove_ir_out_from_du_mgr").edges_removed += peers.len();
            for p in peers {
                self.unlink_edge(p, x);
            }
        }
    }

    /// Whether a def/use pair is still justified by the references of
    /// both ends. Unknown references keep the edge.
    fn du_edge_valid(&self, def: NodeRef, use_: NodeRef) -> bool {
        let d = self.referenced_mds(def);
        let u = self.referenced_mds(use_);
        if d.is_empty() || u.is_empty() {
            return true;
        }
        self.mds.any_overlap(&d, &u)
    }

    fn sweep_expired(&mut self, nodes: Vec<NodeRef>) -> bool {
        let mut found = false;
        for x in nodes {
            let peers: Vec<NodeRef> = self.du_set(x).iter().copied().collect();
            for p in peers {
                if self.is_released(p) {
                    self.unlink_edge(x, p);
                    found = true;
                    continue;
                }
                let (def, use_) = if self.is_stmt(x) { (x, p) } else { (p, x) };
                if !self.du_edge_valid(def, use_) {
                    trace!(%def, %use_, "dropping expired DU edge");
                    self.unlink_edge(def, use_);
                    self.du_stats("remove_expired_du").expired_removed += 1;
                    found = true;
                }
            }
        }
        found
    }

    /// Drop every edge below `n` whose ends no longer share a location.
    /// Returns true if a stale edge was found.
    pub fn remove_expired_du(&mut self, n: NodeRef) -> bool {
        let nodes = self.subtree(n);
        self.sweep_expired(nodes)
    }

    /// Like `remove_expired_du`, restricted to the statement's own defs.
    pub fn remove_expired_du_for_stmt(&mut self, stmt: NodeRef) -> bool {
        assert!(self.is_stmt(stmt), "remove_expired_du_for_stmt: {stmt} is not a statement");
        self.sweep_expired(vec![stmt])
    }

    /// Panics if anything outside `nodes` still refers to a node in it.
    pub(crate) fn check_no_outstanding_refs(&self, nodes: &[NodeRef]) {
        let set: HashSet<NodeRef> = nodes.iter().copied().collect();
        for &x in nodes {
            for &peer in self.du_set(x) {
                if set.contains(&peer) || self.is_released(peer) {
                    continue;
                }
                assert!(
                    !self.du_set(peer).contains(&x),
                    "free_ir_tree: {x} is still in the DU set of {peer}; \
                     sever DU edges before releasing",
                );
            }
            if let Some(info) = self.node(x).ssa {
                let ssa = &self.ssa_infos[info];
                assert!(
                    !ssa.uses.contains(&x),
                    "free_ir_tree: {x} is still a use of {info}; detach it before releasing",
                );
                if ssa.def == Some(x) {
                    assert!(
                        ssa.uses.iter().all(|u| set.contains(u) || self.is_released(*u)),
                        "free_ir_tree: {x} defines {info} which still has live uses",
                    );
                }
            }
        }
    }
}
