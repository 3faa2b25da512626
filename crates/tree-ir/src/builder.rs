//! Node builders.
//!
//! Every builder returns a freshly allocated, parent-less node whose kids
//! are linked to it.

use crate::context::{ConstValue, IrContext, NodeAttrs, NodeData};
use crate::opcode::{Opcode, slot};
use crate::refs::{LabelRef, NodeRef, TypeRef, VarRef};

impl IrContext {
    // ========================================================================
    // Leaves
    // ========================================================================

    pub fn build_imm_int(&mut self, v: i64, ty: TypeRef) -> NodeRef {
        self.build_const(ConstValue::Int(v), ty)
    }

    pub fn build_imm_fp(&mut self, v: f64, ty: TypeRef) -> NodeRef {
        self.build_const(ConstValue::Fp(v), ty)
    }

    pub fn build_imm_str(&mut self, s: impl Into<String>, ty: TypeRef) -> NodeRef {
        self.build_const(ConstValue::Str(s.into()), ty)
    }

    fn build_const(&mut self, value: ConstValue, ty: TypeRef) -> NodeRef {
        let attrs = NodeAttrs {
            value: Some(value),
            ..NodeAttrs::default()
        };
        self.create_node(NodeData::new(Opcode::Const, ty).with_attrs(attrs))
    }

    pub fn build_pr(&mut self, prno: u32, ty: TypeRef) -> NodeRef {
        let attrs = NodeAttrs {
            prno,
            ..NodeAttrs::default()
        };
        self.create_node(NodeData::new(Opcode::Pr, ty).with_attrs(attrs))
    }

    pub fn build_id(&mut self, var: VarRef) -> NodeRef {
        let ty = self.vars.get(var).ty;
        self.create_node(NodeData::new(Opcode::Id, ty).with_attrs(var_attrs(var, 0)))
    }

    /// Direct load of `var` at offset 0.
    pub fn build_load(&mut self, var: VarRef, ty: TypeRef) -> NodeRef {
        self.create_node(NodeData::new(Opcode::Ld, ty).with_attrs(var_attrs(var, 0)))
    }

    /// Address of `var` plus `ofst`.
    pub fn build_lda(&mut self, var: VarRef, ofst: i64) -> NodeRef {
        let var_ty = self.vars.get(var).ty;
        let base_size = self.types.byte_size(var_ty);
        let ty = self.types.pointer(base_size);
        self.create_node(NodeData::new(Opcode::Lda, ty).with_attrs(var_attrs(var, ofst)))
    }

    // ========================================================================
    // Memory
    // ========================================================================

    /// Indirect load of `ty` at `base + ofst`.
    pub fn build_ild(&mut self, base: NodeRef, ofst: i64, ty: TypeRef) -> NodeRef {
        let attrs = NodeAttrs {
            ofst,
            ..NodeAttrs::default()
        };
        self.create_node(
            NodeData::new(Opcode::Ild, ty)
                .with_kid(slot::ILD_BASE, base)
                .with_attrs(attrs),
        )
    }

    pub fn build_array(
        &mut self,
        base: NodeRef,
        subs: impl IntoIterator<Item = NodeRef>,
        elem_ty: TypeRef,
    ) -> NodeRef {
        self.create_node(
            NodeData::new(Opcode::Array, elem_ty)
                .with_kid(slot::ARR_BASE, base)
                .with_kids(slot::ARR_SUBS, subs),
        )
    }

    /// Direct store `var[ofst] = rhs`.
    pub fn build_store(&mut self, var: VarRef, ty: TypeRef, ofst: i64, rhs: NodeRef) -> NodeRef {
        self.create_node(
            NodeData::new(Opcode::St, ty)
                .with_kid(slot::ST_RHS, rhs)
                .with_attrs(var_attrs(var, ofst)),
        )
    }

    /// Register store `$prno = rhs`.
    pub fn build_store_pr(&mut self, prno: u32, ty: TypeRef, rhs: NodeRef) -> NodeRef {
        let attrs = NodeAttrs {
            prno,
            ..NodeAttrs::default()
        };
        self.create_node(
            NodeData::new(Opcode::StPr, ty)
                .with_kid(slot::ST_RHS, rhs)
                .with_attrs(attrs),
        )
    }

    /// Indirect store `*(base + ofst) = rhs`.
    pub fn build_ist(&mut self, base: NodeRef, ofst: i64, rhs: NodeRef, ty: TypeRef) -> NodeRef {
        let attrs = NodeAttrs {
            ofst,
            ..NodeAttrs::default()
        };
        self.create_node(
            NodeData::new(Opcode::Ist, ty)
                .with_kid(slot::IST_BASE, base)
                .with_kid(slot::IST_RHS, rhs)
                .with_attrs(attrs),
        )
    }

    pub fn build_store_array(
        &mut self,
        base: NodeRef,
        subs: impl IntoIterator<Item = NodeRef>,
        rhs: NodeRef,
        elem_ty: TypeRef,
    ) -> NodeRef {
        self.create_node(
            NodeData::new(Opcode::StArray, elem_ty)
                .with_kid(slot::ARR_BASE, base)
                .with_kids(slot::ARR_SUBS, subs)
                .with_kid(slot::STARR_RHS, rhs),
        )
    }

    /// Call of the function named by `callee`; `ty` is the result type.
    pub fn build_call(
        &mut self,
        callee: VarRef,
        args: impl IntoIterator<Item = NodeRef>,
        ty: TypeRef,
    ) -> NodeRef {
        self.create_node(
            NodeData::new(Opcode::Call, ty)
                .with_kids(slot::CALL_ARGS, args)
                .with_attrs(var_attrs(callee, 0)),
        )
    }

    pub fn build_icall(
        &mut self,
        callee: NodeRef,
        args: impl IntoIterator<Item = NodeRef>,
        ty: TypeRef,
    ) -> NodeRef {
        self.create_node(
            NodeData::new(Opcode::Icall, ty)
                .with_kid(slot::ICALL_CALLEE, callee)
                .with_kids(slot::ICALL_ARGS, args),
        )
    }

    /// `$prno = phi(opnds...)`.
    pub fn build_phi(
        &mut self,
        prno: u32,
        ty: TypeRef,
        opnds: impl IntoIterator<Item = NodeRef>,
    ) -> NodeRef {
        let attrs = NodeAttrs {
            prno,
            ..NodeAttrs::default()
        };
        self.create_node(
            NodeData::new(Opcode::Phi, ty)
                .with_kids(slot::PHI_OPNDS, opnds)
                .with_attrs(attrs),
        )
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// # Panics
    ///
    /// Panics if `code` is not a binary operator.
    pub fn build_binary(&mut self, code: Opcode, ty: TypeRef, op0: NodeRef, op1: NodeRef) -> NodeRef {
        assert!(code.is_binary(), "build_binary: {code} is not a binary operator");
        self.create_node(
            NodeData::new(code, ty)
                .with_kid(slot::OPND0, op0)
                .with_kid(slot::OPND1, op1),
        )
    }

    /// Comparison producing a boolean.
    pub fn build_cmp(&mut self, code: Opcode, op0: NodeRef, op1: NodeRef) -> NodeRef {
        assert!(code.is_relation(), "build_cmp: {code} is not a comparison");
        let b = self.types.bool_type();
        self.build_binary(code, b, op0, op1)
    }

    /// # Panics
    ///
    /// Panics if `code` is not a unary operator.
    pub fn build_unary_op(&mut self, code: Opcode, ty: TypeRef, opnd: NodeRef) -> NodeRef {
        assert!(code.is_unary(), "build_unary_op: {code} is not a unary operator");
        self.create_node(NodeData::new(code, ty).with_kid(slot::UNA, opnd))
    }

    pub fn build_logical_not(&mut self, opnd: NodeRef) -> NodeRef {
        let b = self.types.bool_type();
        self.build_unary_op(Opcode::Lnot, b, opnd)
    }

    pub fn build_cvt(&mut self, exp: NodeRef, ty: TypeRef) -> NodeRef {
        self.build_unary_op(Opcode::Cvt, ty, exp)
    }

    pub fn build_select(&mut self, pred: NodeRef, t: NodeRef, f: NodeRef, ty: TypeRef) -> NodeRef {
        self.create_node(
            NodeData::new(Opcode::Select, ty)
                .with_kid(slot::SELECT_PRED, pred)
                .with_kid(slot::SELECT_TRUE, t)
                .with_kid(slot::SELECT_FALSE, f),
        )
    }

    /// Wrap a non-boolean expression as `exp != 0`.
    pub fn build_judge(&mut self, exp: NodeRef) -> NodeRef {
        let ty = self.ty(exp);
        let zero = if self.types.is_fp(ty) {
            self.build_imm_fp(0.0, ty)
        } else if self.types.is_int(ty) {
            self.build_imm_int(0, ty)
        } else {
            let dt = self.types.pointer_size_dtype();
            let t = self.types.simplex(dt);
            self.build_imm_int(0, t)
        };
        self.build_cmp(Opcode::Ne, exp, zero)
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn void_type(&mut self) -> TypeRef {
        self.types.simplex(crate::types::DataType::Void)
    }

    pub fn build_if(
        &mut self,
        det: NodeRef,
        true_body: impl IntoIterator<Item = NodeRef>,
        false_body: impl IntoIterator<Item = NodeRef>,
    ) -> NodeRef {
        let void = self.void_type();
        self.create_node(
            NodeData::new(Opcode::If, void)
                .with_kid(slot::DET, det)
                .with_kids(slot::IF_TRUE_BODY, true_body)
                .with_kids(slot::IF_FALSE_BODY, false_body),
        )
    }

    pub fn build_while_do(&mut self, det: NodeRef, body: impl IntoIterator<Item = NodeRef>) -> NodeRef {
        self.build_loop(Opcode::WhileDo, det, body)
    }

    pub fn build_do_while(&mut self, det: NodeRef, body: impl IntoIterator<Item = NodeRef>) -> NodeRef {
        self.build_loop(Opcode::DoWhile, det, body)
    }

    fn build_loop(
        &mut self,
        code: Opcode,
        det: NodeRef,
        body: impl IntoIterator<Item = NodeRef>,
    ) -> NodeRef {
        let void = self.void_type();
        self.create_node(
            NodeData::new(code, void)
                .with_kid(slot::DET, det)
                .with_kids(slot::LOOP_BODY, body),
        )
    }

    pub fn build_do_loop(
        &mut self,
        det: NodeRef,
        init: impl IntoIterator<Item = NodeRef>,
        step: impl IntoIterator<Item = NodeRef>,
        body: impl IntoIterator<Item = NodeRef>,
    ) -> NodeRef {
        let void = self.void_type();
        self.create_node(
            NodeData::new(Opcode::DoLoop, void)
                .with_kid(slot::DET, det)
                .with_kids(slot::DO_LOOP_INIT, init)
                .with_kids(slot::DO_LOOP_STEP, step)
                .with_kids(slot::DO_LOOP_BODY, body),
        )
    }

    pub fn build_switch(
        &mut self,
        vexp: NodeRef,
        body: impl IntoIterator<Item = NodeRef>,
        cases: impl IntoIterator<Item = NodeRef>,
    ) -> NodeRef {
        let void = self.void_type();
        self.create_node(
            NodeData::new(Opcode::Switch, void)
                .with_kid(slot::SWITCH_VEXP, vexp)
                .with_kids(slot::SWITCH_BODY, body)
                .with_kids(slot::SWITCH_CASES, cases),
        )
    }

    /// `case value: goto label`, used by `switch` and `igoto`.
    pub fn build_case(&mut self, value: NodeRef, label: LabelRef) -> NodeRef {
        let void = self.void_type();
        self.create_node(
            NodeData::new(Opcode::Case, void)
                .with_kid(slot::CASE_VEXP, value)
                .with_attrs(label_attrs(label)),
        )
    }

    pub fn build_goto(&mut self, label: LabelRef) -> NodeRef {
        let void = self.void_type();
        self.create_node(NodeData::new(Opcode::Goto, void).with_attrs(label_attrs(label)))
    }

    pub fn build_igoto(&mut self, vexp: NodeRef, cases: impl IntoIterator<Item = NodeRef>) -> NodeRef {
        let void = self.void_type();
        self.create_node(
            NodeData::new(Opcode::Igoto, void)
                .with_kid(slot::IGOTO_VEXP, vexp)
                .with_kids(slot::IGOTO_CASES, cases),
        )
    }

    pub fn build_label(&mut self, label: LabelRef) -> NodeRef {
        let void = self.void_type();
        self.create_node(NodeData::new(Opcode::Label, void).with_attrs(label_attrs(label)))
    }

    /// `truebr` when `is_true`, else `falsebr`.
    pub fn build_branch(&mut self, is_true: bool, det: NodeRef, label: LabelRef) -> NodeRef {
        let code = if is_true { Opcode::TrueBr } else { Opcode::FalseBr };
        let void = self.void_type();
        self.create_node(
            NodeData::new(code, void)
                .with_kid(slot::DET, det)
                .with_attrs(label_attrs(label)),
        )
    }

    pub fn build_return(&mut self, exp: Option<NodeRef>) -> NodeRef {
        let void = self.void_type();
        self.create_node(NodeData::new(Opcode::Return, void).with_kids(slot::RET_EXP, exp))
    }

    pub fn build_break(&mut self) -> NodeRef {
        let void = self.void_type();
        self.create_node(NodeData::new(Opcode::Break, void))
    }

    pub fn build_continue(&mut self) -> NodeRef {
        let void = self.void_type();
        self.create_node(NodeData::new(Opcode::Continue, void))
    }
}

fn var_attrs(var: VarRef, ofst: i64) -> NodeAttrs {
    NodeAttrs {
        var: Some(var),
        ofst,
        ..NodeAttrs::default()
    }
}

fn label_attrs(label: LabelRef) -> NodeAttrs {
    NodeAttrs {
        label: Some(label),
        ..NodeAttrs::default()
    }
}
