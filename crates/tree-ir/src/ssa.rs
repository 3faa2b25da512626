//! SSA use/def links of pseudo registers.
//!
//! An `SsaInfo` names the statement defining an SSA value (a `phi` or an
//! `stpr`) and the `pr` expressions reading it. Every node in the use set
//! must be live and denote that value.

use std::collections::BTreeSet;

use crate::context::IrContext;
use crate::opcode::Opcode;
use crate::refs::{NodeRef, SsaRef};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SsaInfo {
    pub def: Option<NodeRef>,
    pub uses: BTreeSet<NodeRef>,
}

impl IrContext {
    /// Create SSA info for the value defined by `def`.
    pub fn new_ssa_info(&mut self, def: NodeRef) -> SsaRef {
        assert!(
            matches!(self.code(def), Opcode::Phi | Opcode::StPr),
            "new_ssa_info: {def} ({}) does not define a register",
            self.code(def),
        );
        let info = self.ssa_infos.push(SsaInfo {
            def: Some(def),
            uses: BTreeSet::new(),
        });
        self.node_mut(def).ssa = Some(info);
        info
    }

    pub fn ssa_info(&self, info: SsaRef) -> &SsaInfo {
        &self.ssa_infos[info]
    }

    pub fn ssa_of(&self, n: NodeRef) -> Option<SsaRef> {
        self.node(n).ssa
    }

    /// Defining statement of the SSA value read by `n`.
    pub fn ssa_def_of(&self, n: NodeRef) -> Option<NodeRef> {
        self.node(n).ssa.and_then(|i| self.ssa_infos[i].def)
    }

    /// Register `use_` as a reader of `info`.
    pub fn add_ssa_use(&mut self, info: SsaRef, use_: NodeRef) {
        assert_eq!(
            self.code(use_),
            Opcode::Pr,
            "add_ssa_use: {use_} is not a pr"
        );
        self.node_mut(use_).ssa = Some(info);
        self.ssa_infos[info].uses.insert(use_);
    }

    /// Unregister `use_` from the info it reads.
    pub fn remove_ssa_use(&mut self, use_: NodeRef) {
        if let Some(info) = self.node_mut(use_).ssa.take() {
            self.ssa_infos[info].uses.remove(&use_);
        }
    }

    /// Unregister every `pr` below `n` from its SSA info.
    pub fn remove_ssa_uses_in(&mut self, n: NodeRef) {
        for x in self.subtree(n) {
            if self.code(x) == Opcode::Pr {
                self.remove_ssa_use(x);
            }
        }
    }

    /// Drop all uses of `info`.
    pub fn clean_ssa_du(&mut self, info: SsaRef) {
        let uses = std::mem::take(&mut self.ssa_infos[info].uses);
        for u in uses {
            if !self.is_released(u) && self.node(u).ssa == Some(info) {
                self.node_mut(u).ssa = None;
            }
        }
    }

    pub(crate) fn detach_ssa_def(&mut self, n: NodeRef) {
        if let Some(info) = self.node(n).ssa {
            if self.ssa_infos[info].def == Some(n) {
                self.ssa_infos[info].def = None;
            }
            self.ssa_infos[info].uses.remove(&n);
        }
    }
}
