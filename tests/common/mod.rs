//! Shared helpers for the workspace tests.

use irrefine::ir::{BbRef, DataType, IrContext, NodeRef, TypeRef, VarData, VarRef};

/// Install a log subscriber honoring `RUST_LOG`. Safe to call repeatedly.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A region with one block and an `i32` type at hand.
pub struct Region {
    pub ctx: IrContext,
    pub bb: BbRef,
    pub i32t: TypeRef,
}

impl Region {
    pub fn new() -> Self {
        let mut ctx = IrContext::new();
        let i32t = ctx.types.simplex(DataType::I32);
        let bb = ctx.create_bb();
        Self { ctx, bb, i32t }
    }

    /// Same, with DU chains maintained.
    #[allow(dead_code)]
    pub fn with_du() -> Self {
        let mut r = Self::new();
        r.ctx.enable_du_mgr();
        r
    }

    #[allow(dead_code)]
    pub fn var(&mut self, name: &str) -> VarRef {
        self.ctx.vars.add(VarData::new(name, self.i32t))
    }

    /// Append a statement, linking parent pointers of its whole tree.
    pub fn push(&mut self, stmt: NodeRef) -> NodeRef {
        self.ctx.set_parent_pointer(stmt, true);
        self.ctx.append_stmt(self.bb, stmt);
        stmt
    }
}
