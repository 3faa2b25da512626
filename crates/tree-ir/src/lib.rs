//! Tree IR crate.
//!
//! Arena-backed tree-shaped intermediate representation: statements and
//! expressions as nodes with ordered child slots, basic blocks of
//! statements, memory descriptors, and the Def-Use and SSA reference graph
//! kept alongside the trees.

pub mod builder;
pub mod context;
pub mod du;
pub mod eval;
pub mod md;
pub mod opcode;
pub mod printer;
pub mod refs;
pub mod ssa;
pub mod target;
pub mod types;
pub mod validation;
pub mod var;
pub mod walk;

pub use context::{BbData, ConstValue, IrContext, NodeAttrs, NodeData, Slot};
pub use du::{DuInfo, DuMgr, DuStats};
pub use md::{MdData, MdSystem};
pub use opcode::{Opcode, slot};
pub use refs::{BbRef, DuRef, LabelRef, MdRef, MdSetRef, NodeRef, SsaRef, TypeRef, VarRef};
pub use ssa::SsaInfo;
pub use target::TargetInfo;
pub use types::{DataType, TypeData, TypeMgr};
pub use validation::{ValidationError, validate};
pub use var::{VarData, VarTable};
pub use walk::WalkAction;
