//! IrContext: arena-based storage for one compilation region.
//!
//! All nodes, basic blocks, reference-info records and SSA infos live in
//! `PrimaryMap`s owned by `IrContext`. Releasing a node tombstones its slot:
//! the handle is never reused and any later access panics.
//!
//! Parent pointers are plain handles that are *not* maintained
//! automatically by every edit. After restructuring a subtree call
//! `set_parent_pointer` to re-derive them.

use cranelift_entity::{EntitySet, PrimaryMap};
use smallvec::SmallVec;

use crate::du::{DuInfo, DuMgr};
use crate::md::MdSystem;
use crate::opcode::Opcode;
use crate::refs::*;
use crate::ssa::SsaInfo;
use crate::target::TargetInfo;
use crate::types::TypeMgr;
use crate::var::VarTable;

// ============================================================================
// Entity data types
// ============================================================================

/// A child slot: one node for expression slots, any number for lists.
pub type Slot = SmallVec<[NodeRef; 2]>;

/// Literal payload of a constant node.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Fp(f64),
    Str(String),
}

/// Opcode-specific scalar fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeAttrs {
    /// Variable of `ld`, `st`, `lda`, `id`, and the callee of `call`.
    pub var: Option<VarRef>,
    /// Byte offset of `ld`, `st`, `lda`, `ild` and `ist`.
    pub ofst: i64,
    /// Pseudo register number of `pr`, `stpr` and `phi`.
    pub prno: u32,
    /// Payload of `const`.
    pub value: Option<ConstValue>,
    /// Target of branches and `label`.
    pub label: Option<LabelRef>,
}

/// Data for a single IR node.
#[derive(Clone, Debug)]
pub struct NodeData {
    pub code: Opcode,
    pub ty: TypeRef,
    pub attrs: NodeAttrs,
    /// Non-owning back-reference; only meaningful while attached.
    pub parent: Option<NodeRef>,
    /// Basic block holding this statement, if it is a top-level statement.
    pub bb: Option<BbRef>,
    pub du: Option<DuRef>,
    pub ssa: Option<SsaRef>,
    slots: SmallVec<[Slot; 3]>,
}

impl NodeData {
    pub fn new(code: Opcode, ty: TypeRef) -> Self {
        Self {
            code,
            ty,
            attrs: NodeAttrs::default(),
            parent: None,
            bb: None,
            du: None,
            ssa: None,
            slots: (0..code.num_slots()).map(|_| Slot::new()).collect(),
        }
    }

    /// Fill slot `idx` with the given nodes.
    pub fn with_kids(mut self, idx: usize, kids: impl IntoIterator<Item = NodeRef>) -> Self {
        self.slots[idx].extend(kids);
        self
    }

    pub fn with_kid(mut self, idx: usize, kid: NodeRef) -> Self {
        self.slots[idx].push(kid);
        self
    }

    pub fn with_attrs(mut self, attrs: NodeAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

/// Data for a basic block.
#[derive(Clone, Debug, Default)]
pub struct BbData {
    pub stmts: Vec<NodeRef>,
}

// ============================================================================
// IrContext
// ============================================================================

/// Arena-based mutable IR storage for one region.
pub struct IrContext {
    nodes: PrimaryMap<NodeRef, NodeData>,
    released: EntitySet<NodeRef>,
    bbs: PrimaryMap<BbRef, BbData>,
    bb_order: Vec<BbRef>,
    next_label: u32,

    pub types: TypeMgr,
    pub vars: VarTable,
    pub mds: MdSystem,

    pub(crate) du_infos: PrimaryMap<DuRef, DuInfo>,
    pub(crate) ssa_infos: PrimaryMap<SsaRef, SsaInfo>,
    pub(crate) du_mgr: Option<DuMgr>,
}

impl IrContext {
    /// Create a new empty context for the host target.
    pub fn new() -> Self {
        Self::with_target(TargetInfo::default())
    }

    pub fn with_target(target: TargetInfo) -> Self {
        Self {
            nodes: PrimaryMap::new(),
            released: EntitySet::new(),
            bbs: PrimaryMap::new(),
            bb_order: Vec::new(),
            next_label: 0,
            types: TypeMgr::new(target),
            vars: VarTable::new(),
            mds: MdSystem::new(),
            du_infos: PrimaryMap::new(),
            ssa_infos: PrimaryMap::new(),
            du_mgr: None,
        }
    }

    // ========================================================================
    // Node
    // ========================================================================

    /// Allocate a node. Its kids get their parent pointer set to it.
    ///
    /// # Panics
    ///
    /// Panics if `data` already has a parent or block, or if a kid was released.
    pub fn create_node(&mut self, data: NodeData) -> NodeRef {
        assert!(
            data.parent.is_none() && data.bb.is_none(),
            "create_node: fresh node must not be attached to a parent or block",
        );
        let kids: SmallVec<[NodeRef; 4]> = data.slots.iter().flatten().copied().collect();
        let n = self.nodes.push(data);
        for kid in kids {
            self.node_mut(kid).parent = Some(n);
        }
        n
    }

    /// Get immutable reference to node data.
    ///
    /// # Panics
    ///
    /// Panics if the node was released.
    pub fn node(&self, n: NodeRef) -> &NodeData {
        assert!(!self.released.contains(n), "node: {n} was released");
        &self.nodes[n]
    }

    /// Get mutable reference to node data.
    pub fn node_mut(&mut self, n: NodeRef) -> &mut NodeData {
        assert!(!self.released.contains(n), "node_mut: {n} was released");
        &mut self.nodes[n]
    }

    pub fn is_released(&self, n: NodeRef) -> bool {
        self.released.contains(n)
    }

    /// Number of nodes ever allocated, released ones included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn code(&self, n: NodeRef) -> Opcode {
        self.node(n).code
    }

    /// Change the opcode in place; both opcodes must have the same slot layout.
    pub fn set_code(&mut self, n: NodeRef, code: Opcode) {
        let data = self.node_mut(n);
        assert_eq!(
            data.code.num_slots(),
            code.num_slots(),
            "set_code: cannot turn {} into {} in place",
            data.code,
            code,
        );
        data.code = code;
    }

    pub fn ty(&self, n: NodeRef) -> TypeRef {
        self.node(n).ty
    }

    pub fn set_ty(&mut self, n: NodeRef, ty: TypeRef) {
        self.node_mut(n).ty = ty;
    }

    pub fn parent(&self, n: NodeRef) -> Option<NodeRef> {
        self.node(n).parent
    }

    pub fn set_parent(&mut self, n: NodeRef, parent: Option<NodeRef>) {
        self.node_mut(n).parent = parent;
    }

    pub fn attrs(&self, n: NodeRef) -> &NodeAttrs {
        &self.node(n).attrs
    }

    pub fn attrs_mut(&mut self, n: NodeRef) -> &mut NodeAttrs {
        &mut self.node_mut(n).attrs
    }

    // ========================================================================
    // Kids
    // ========================================================================

    pub fn num_slots(&self, n: NodeRef) -> usize {
        self.node(n).slots.len()
    }

    /// The single node in slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is empty.
    pub fn kid(&self, n: NodeRef, idx: usize) -> NodeRef {
        match self.node(n).slots[idx].first() {
            Some(&k) => k,
            None => panic!("kid: slot {idx} of {n} ({}) is empty", self.code(n)),
        }
    }

    pub fn opt_kid(&self, n: NodeRef, idx: usize) -> Option<NodeRef> {
        self.node(n).slots[idx].first().copied()
    }

    pub fn kids(&self, n: NodeRef, idx: usize) -> &[NodeRef] {
        &self.node(n).slots[idx]
    }

    /// All kids of all slots, in slot order.
    pub fn all_kids(&self, n: NodeRef) -> SmallVec<[NodeRef; 4]> {
        self.node(n).slots.iter().flatten().copied().collect()
    }

    /// Overwrite slot `idx` with `kid` and link its parent pointer.
    pub fn set_kid(&mut self, n: NodeRef, idx: usize, kid: Option<NodeRef>) {
        let slot = &mut self.node_mut(n).slots[idx];
        slot.clear();
        slot.extend(kid);
        if let Some(k) = kid {
            self.node_mut(k).parent = Some(n);
        }
    }

    /// Overwrite list slot `idx` and link every element to `n`.
    pub fn set_kids(&mut self, n: NodeRef, idx: usize, kids: impl IntoIterator<Item = NodeRef>) {
        let new: Slot = kids.into_iter().collect();
        for &k in &new {
            self.node_mut(k).parent = Some(n);
        }
        self.node_mut(n).slots[idx] = new;
    }

    /// Detach and return the node in slot `idx`, leaving the slot empty.
    pub fn take_kid(&mut self, n: NodeRef, idx: usize) -> Option<NodeRef> {
        self.take_kids(n, idx).into_iter().next()
    }

    /// Detach and return every node in slot `idx`.
    pub fn take_kids(&mut self, n: NodeRef, idx: usize) -> Slot {
        let kids = std::mem::take(&mut self.node_mut(n).slots[idx]);
        for &k in &kids {
            self.node_mut(k).parent = None;
        }
        kids
    }

    /// Replace `old` with `new` wherever it appears among the kids of `parent`.
    /// Returns false if `old` is not a kid of `parent`.
    pub fn replace_kid(&mut self, parent: NodeRef, old: NodeRef, new: NodeRef) -> bool {
        let mut found = false;
        for slot in self.node_mut(parent).slots.iter_mut() {
            for k in slot.iter_mut() {
                if *k == old {
                    *k = new;
                    found = true;
                }
            }
        }
        if found {
            self.node_mut(new).parent = Some(parent);
        }
        found
    }

    /// Re-derive the parent pointers of `n`'s kids, and of the whole
    /// subtree when `recursive` is set.
    pub fn set_parent_pointer(&mut self, n: NodeRef, recursive: bool) {
        for kid in self.all_kids(n) {
            self.node_mut(kid).parent = Some(n);
            if recursive {
                self.set_parent_pointer(kid, true);
            }
        }
    }

    /// Nodes of the subtree rooted at `n`, in pre-order.
    pub fn subtree(&self, n: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![n];
        while let Some(x) = stack.pop() {
            out.push(x);
            let kids = self.all_kids(x);
            stack.extend(kids.into_iter().rev());
        }
        out
    }

    // ========================================================================
    // Release
    // ========================================================================

    /// Release a single node whose slots are already empty.
    ///
    /// # Panics
    ///
    /// Panics if the node still owns kids or is linked into a block.
    pub fn free_ir(&mut self, n: NodeRef) {
        assert!(
            self.node(n).slots.iter().all(|s| s.is_empty()),
            "free_ir: {n} ({}) still owns kids; use free_ir_tree",
            self.code(n),
        );
        self.release_nodes(&[n]);
    }

    /// Release `n` and every node below it.
    ///
    /// In debug builds this checks that no DU record or SSA info outside
    /// the subtree still refers to a node being released.
    ///
    /// # Panics
    ///
    /// Panics if a node of the subtree is still linked into a block.
    pub fn free_ir_tree(&mut self, n: NodeRef) {
        let nodes = self.subtree(n);
        self.release_nodes(&nodes);
    }

    fn release_nodes(&mut self, nodes: &[NodeRef]) {
        for &x in nodes {
            if let Some(bb) = self.node(x).bb {
                assert!(
                    !self.bbs[bb].stmts.contains(&x),
                    "free_ir_tree: {x} is still linked into {bb}; unlink it first",
                );
            }
        }
        if cfg!(debug_assertions) {
            self.check_no_outstanding_refs(nodes);
        }
        for &x in nodes {
            self.detach_ssa_def(x);
            if let Some(du) = self.node(x).du {
                self.du_infos[du] = DuInfo::default();
            }
            self.released.insert(x);
        }
    }

    // ========================================================================
    // Copy and compare
    // ========================================================================

    /// Deep copy of a tree. Reference info is not copied; a copied `pr`
    /// that carries SSA info is registered as a further use of that info.
    pub fn dup_ir_tree(&mut self, n: NodeRef) -> NodeRef {
        let src = self.node(n).clone();
        let mut data = NodeData::new(src.code, src.ty).with_attrs(src.attrs);
        for (idx, slot) in src.slots.iter().enumerate() {
            for &k in slot {
                let dk = self.dup_ir_tree(k);
                data.slots[idx].push(dk);
            }
        }
        let dup = self.create_node(data);
        if let (Opcode::Pr, Some(info)) = (src.code, src.ssa) {
            self.add_ssa_use(info, dup);
        }
        dup
    }

    /// Structural equality: same opcodes, types, attributes and kids.
    pub fn is_ir_equal(&self, a: NodeRef, b: NodeRef) -> bool {
        if a == b {
            return true;
        }
        let (da, db) = (self.node(a), self.node(b));
        if da.code != db.code || da.ty != db.ty || da.attrs != db.attrs {
            return false;
        }
        da.slots.len() == db.slots.len()
            && da.slots.iter().zip(db.slots.iter()).all(|(sa, sb)| {
                sa.len() == sb.len() && sa.iter().zip(sb.iter()).all(|(&x, &y)| self.is_ir_equal(x, y))
            })
    }

    // ========================================================================
    // Node queries
    // ========================================================================

    pub fn is_stmt(&self, n: NodeRef) -> bool {
        self.code(n).is_stmt()
    }

    pub fn is_const(&self, n: NodeRef) -> bool {
        self.code(n) == Opcode::Const
    }

    /// Integer value of an integer-typed constant.
    pub fn const_int(&self, n: NodeRef) -> Option<i64> {
        let data = self.node(n);
        match (&data.code, &data.attrs.value) {
            (Opcode::Const, Some(ConstValue::Int(v))) if self.types.is_int(data.ty) => Some(*v),
            _ => None,
        }
    }

    /// Floating value of a floating-typed constant.
    pub fn const_fp(&self, n: NodeRef) -> Option<f64> {
        let data = self.node(n);
        match (&data.code, &data.attrs.value) {
            (Opcode::Const, Some(ConstValue::Fp(v))) if self.types.is_fp(data.ty) => Some(*v),
            _ => None,
        }
    }

    pub fn is_const_int_equal(&self, n: NodeRef, v: i64) -> bool {
        self.const_int(n) == Some(v)
    }

    /// Constant of string type.
    pub fn is_str_const(&self, n: NodeRef) -> bool {
        self.is_const(n) && self.types.is_str(self.ty(n))
    }

    pub fn is_int(&self, n: NodeRef) -> bool {
        self.types.is_int(self.ty(n))
    }

    pub fn is_fp(&self, n: NodeRef) -> bool {
        self.types.is_fp(self.ty(n))
    }

    pub fn is_signed(&self, n: NodeRef) -> bool {
        self.types.is_signed(self.ty(n))
    }

    pub fn is_unsigned(&self, n: NodeRef) -> bool {
        self.types.is_unsigned(self.ty(n))
    }

    pub fn is_ptr(&self, n: NodeRef) -> bool {
        self.types.is_ptr(self.ty(n))
    }

    pub fn is_mc(&self, n: NodeRef) -> bool {
        self.types.is_mc(self.ty(n))
    }

    pub fn is_str(&self, n: NodeRef) -> bool {
        self.types.is_str(self.ty(n))
    }

    pub fn is_vec(&self, n: NodeRef) -> bool {
        self.types.is_vec(self.ty(n))
    }

    pub fn is_void(&self, n: NodeRef) -> bool {
        self.types.is_void(self.ty(n))
    }

    pub fn is_bool(&self, n: NodeRef) -> bool {
        self.types.is_bool(self.ty(n))
    }

    pub fn dtype_size(&self, n: NodeRef) -> u32 {
        self.types.byte_size(self.ty(n))
    }

    /// Comparison or logical operation producing a truth value.
    pub fn is_judge(&self, n: NodeRef) -> bool {
        self.code(n).is_judge()
    }

    /// `lda` of a string literal.
    pub fn is_lda_of_string(&self, n: NodeRef) -> bool {
        self.code(n) == Opcode::Lda
            && self
                .attrs(n)
                .var
                .is_some_and(|v| self.vars.get(v).is_string)
    }

    // ========================================================================
    // Basic blocks
    // ========================================================================

    /// Create an empty basic block appended to the block list.
    pub fn create_bb(&mut self) -> BbRef {
        let bb = self.bbs.push(BbData::default());
        self.bb_order.push(bb);
        bb
    }

    pub fn bb(&self, bb: BbRef) -> &BbData {
        &self.bbs[bb]
    }

    /// Blocks of the region in layout order.
    pub fn bb_list(&self) -> &[BbRef] {
        &self.bb_order
    }

    pub fn bb_stmts(&self, bb: BbRef) -> &[NodeRef] {
        &self.bbs[bb].stmts
    }

    /// Append a statement to the end of a block.
    ///
    /// # Panics
    ///
    /// Panics if `stmt` is an expression or already belongs to a block.
    pub fn append_stmt(&mut self, bb: BbRef, stmt: NodeRef) {
        self.attach_stmt(bb, stmt);
        self.bbs[bb].stmts.push(stmt);
    }

    /// Insert `stmt` before position `pos` of the block.
    pub fn insert_stmt_at(&mut self, bb: BbRef, pos: usize, stmt: NodeRef) {
        self.attach_stmt(bb, stmt);
        self.bbs[bb].stmts.insert(pos, stmt);
    }

    fn attach_stmt(&mut self, bb: BbRef, stmt: NodeRef) {
        let data = self.node_mut(stmt);
        assert!(data.code.is_stmt(), "append_stmt: {stmt} ({}) is not a statement", data.code);
        assert!(
            data.bb.is_none() && data.parent.is_none(),
            "append_stmt: {stmt} is already attached; unlink it first",
        );
        data.bb = Some(bb);
    }

    /// Unlink a statement from a block without releasing it. Works on
    /// handles of already released statements as well.
    pub fn remove_stmt(&mut self, bb: BbRef, stmt: NodeRef) -> bool {
        let stmts = &mut self.bbs[bb].stmts;
        let Some(pos) = stmts.iter().position(|&s| s == stmt) else {
            return false;
        };
        stmts.remove(pos);
        if !self.released.contains(stmt) && self.nodes[stmt].bb == Some(bb) {
            self.nodes[stmt].bb = None;
        }
        true
    }

    /// Put `new` where `old` sits in the block, unlinking `old`.
    /// Returns false if `old` is not in the block.
    pub fn replace_stmt(&mut self, bb: BbRef, old: NodeRef, new: NodeRef) -> bool {
        let Some(pos) = self.bbs[bb].stmts.iter().position(|&s| s == old) else {
            return false;
        };
        self.remove_stmt(bb, old);
        self.insert_stmt_at(bb, pos, new);
        true
    }

    pub fn new_label(&mut self) -> LabelRef {
        let l = LabelRef::from_u32(self.next_label);
        self.next_label += 1;
        l
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}
