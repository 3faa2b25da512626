//! Tree IR with a peephole refinement pass.
//!
//! [`ir`] is the IR model: node arena, basic blocks, types, memory
//! descriptors and the Def-Use/SSA graph. [`refine`] rewrites regions of
//! that IR into simpler equivalent forms while keeping the graph intact.

pub use tree_ir as ir;
pub use tree_ir_refine as refine;

pub use tree_ir::{IrContext, NodeRef, Opcode, validate};
pub use tree_ir_refine::{RefineCtx, RefineError, RefineResult, refine_bb_list, refine_region};
