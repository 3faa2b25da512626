//! Entity references for the tree IR.
//!
//! Each ref type is a thin `u32` wrapper providing type-safe indexing
//! into `PrimaryMap` storage in `IrContext`.

use cranelift_entity::entity_impl;

/// Reference to an IR node (statement or expression) in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "ir");

/// Reference to a basic block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BbRef(u32);
entity_impl!(BbRef, "bb");

/// Reference to a variable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarRef(u32);
entity_impl!(VarRef, "var");

/// Reference to an interned type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(u32);
entity_impl!(TypeRef, "ty");

/// Reference to a memory descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MdRef(u32);
entity_impl!(MdRef, "md");

/// Reference to an interned set of memory descriptors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MdSetRef(u32);
entity_impl!(MdSetRef, "mds");

/// Reference to a reference-info (DU) record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuRef(u32);
entity_impl!(DuRef, "du");

/// Reference to an SSA info record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SsaRef(u32);
entity_impl!(SsaRef, "ssa");

/// Reference to a branch target label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelRef(u32);
entity_impl!(LabelRef, "L");
