//! Opcodes and their static properties.
//!
//! Every node carries a fixed number of child slots determined by its
//! opcode. A slot holds a list of nodes: expression slots hold exactly one
//! node while attached, list slots (call arguments, array subscripts, phi
//! operands, statement bodies) hold zero or more.

use std::fmt;

/// Operation code of an IR node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    // Leaves.
    Const,
    Id,
    Ld,
    Pr,
    Lda,

    // Memory expressions.
    Ild,
    Array,

    // Memory statements.
    St,
    StPr,
    StArray,
    Ist,
    Call,
    Icall,
    Phi,

    // Binary arithmetic and logic.
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Mod,
    Land,
    Lor,
    Band,
    Bor,
    Xor,
    Asr,
    Lsr,
    Lsl,

    // Comparisons.
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,

    // Unary.
    Bnot,
    Lnot,
    Neg,
    Cvt,
    Select,

    // Control flow.
    Goto,
    Igoto,
    Label,
    If,
    WhileDo,
    DoWhile,
    DoLoop,
    Switch,
    Case,
    TrueBr,
    FalseBr,
    Return,
    Break,
    Continue,
}

/// Slot layout constants, indexed per opcode family.
pub mod slot {
    pub const OPND0: usize = 0;
    pub const OPND1: usize = 1;
    pub const UNA: usize = 0;

    pub const ILD_BASE: usize = 0;
    pub const IST_BASE: usize = 0;
    pub const IST_RHS: usize = 1;
    pub const ST_RHS: usize = 0;
    pub const ARR_BASE: usize = 0;
    pub const ARR_SUBS: usize = 1;
    pub const STARR_RHS: usize = 2;

    pub const CALL_ARGS: usize = 0;
    pub const ICALL_CALLEE: usize = 0;
    pub const ICALL_ARGS: usize = 1;
    pub const PHI_OPNDS: usize = 0;

    pub const SELECT_PRED: usize = 0;
    pub const SELECT_TRUE: usize = 1;
    pub const SELECT_FALSE: usize = 2;

    pub const DET: usize = 0;
    pub const IF_TRUE_BODY: usize = 1;
    pub const IF_FALSE_BODY: usize = 2;
    pub const LOOP_BODY: usize = 1;
    pub const DO_LOOP_INIT: usize = 1;
    pub const DO_LOOP_STEP: usize = 2;
    pub const DO_LOOP_BODY: usize = 3;
    pub const SWITCH_VEXP: usize = 0;
    pub const SWITCH_BODY: usize = 1;
    pub const SWITCH_CASES: usize = 2;
    pub const IGOTO_VEXP: usize = 0;
    pub const IGOTO_CASES: usize = 1;
    pub const CASE_VEXP: usize = 0;
    pub const RET_EXP: usize = 0;
}

impl Opcode {
    /// Printable mnemonic.
    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Const => "const",
            Id => "id",
            Ld => "ld",
            Pr => "pr",
            Lda => "lda",
            Ild => "ild",
            Array => "array",
            St => "st",
            StPr => "stpr",
            StArray => "starray",
            Ist => "ist",
            Call => "call",
            Icall => "icall",
            Phi => "phi",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Rem => "rem",
            Mod => "mod",
            Land => "land",
            Lor => "lor",
            Band => "band",
            Bor => "bor",
            Xor => "xor",
            Asr => "asr",
            Lsr => "lsr",
            Lsl => "lsl",
            Lt => "lt",
            Le => "le",
            Gt => "gt",
            Ge => "ge",
            Eq => "eq",
            Ne => "ne",
            Bnot => "bnot",
            Lnot => "lnot",
            Neg => "neg",
            Cvt => "cvt",
            Select => "select",
            Goto => "goto",
            Igoto => "igoto",
            Label => "label",
            If => "if",
            WhileDo => "whiledo",
            DoWhile => "dowhile",
            DoLoop => "doloop",
            Switch => "switch",
            Case => "case",
            TrueBr => "truebr",
            FalseBr => "falsebr",
            Return => "return",
            Break => "break",
            Continue => "continue",
        }
    }

    /// Number of child slots a node of this opcode carries.
    pub fn num_slots(self) -> usize {
        use Opcode::*;
        match self {
            Const | Id | Ld | Pr | Lda | Goto | Label | Break | Continue => 0,
            Ild | St | StPr | Call | Phi | TrueBr | FalseBr | Return | Case => 1,
            Bnot | Lnot | Neg | Cvt => 1,
            Array | Ist | Icall | WhileDo | DoWhile | Igoto => 2,
            Add | Sub | Mul | Div | Rem | Mod | Land | Lor | Band | Bor | Xor | Asr | Lsr
            | Lsl | Lt | Le | Gt | Ge | Eq | Ne => 2,
            StArray | Select | If | Switch => 3,
            DoLoop => 4,
        }
    }

    /// Name of a child slot, used by the printer for list slots.
    pub fn slot_name(self, idx: usize) -> &'static str {
        use Opcode::*;
        match (self, idx) {
            (If, 1) => "truebody",
            (If, 2) => "falsebody",
            (WhileDo | DoWhile, 1) => "body",
            (DoLoop, 1) => "init",
            (DoLoop, 2) => "step",
            (DoLoop, 3) => "body",
            (Switch, 1) => "body",
            (Switch, 2) | (Igoto, 1) => "cases",
            (Call, 0) | (Icall, 1) => "args",
            (Phi, 0) => "opnds",
            (Array | StArray, 1) => "subs",
            _ => "",
        }
    }

    /// True if the given slot holds a statement list rather than expressions.
    pub fn slot_is_stmt_list(self, idx: usize) -> bool {
        use Opcode::*;
        matches!(
            (self, idx),
            (If, 1 | 2) | (WhileDo | DoWhile, 1) | (DoLoop, 1..=3) | (Switch, 1)
        )
    }

    pub fn is_stmt(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            St | StPr
                | StArray
                | Ist
                | Call
                | Icall
                | Phi
                | Goto
                | Igoto
                | Label
                | If
                | WhileDo
                | DoWhile
                | DoLoop
                | Switch
                | TrueBr
                | FalseBr
                | Return
                | Break
                | Continue
        )
    }

    pub fn is_exp(self) -> bool {
        !self.is_stmt()
    }

    pub fn is_binary(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Add | Sub
                | Mul
                | Div
                | Rem
                | Mod
                | Land
                | Lor
                | Band
                | Bor
                | Xor
                | Asr
                | Lsr
                | Lsl
                | Lt
                | Le
                | Gt
                | Ge
                | Eq
                | Ne
        )
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Opcode::Bnot | Opcode::Lnot | Opcode::Neg | Opcode::Cvt)
    }

    /// Relational and equality comparisons.
    pub fn is_relation(self) -> bool {
        use Opcode::*;
        matches!(self, Lt | Le | Gt | Ge | Eq | Ne)
    }

    /// Operations producing a boolean judgement: comparisons and logical ops.
    pub fn is_judge(self) -> bool {
        self.is_relation() || matches!(self, Opcode::Land | Opcode::Lor | Opcode::Lnot)
    }

    pub fn is_commutative(self) -> bool {
        use Opcode::*;
        matches!(self, Add | Mul | Xor | Band | Bor | Eq | Ne)
    }

    /// Operations for which `(a op b) op c == a op (b op c)` holds under
    /// wrapping integer arithmetic.
    pub fn is_associative(self) -> bool {
        use Opcode::*;
        matches!(self, Add | Mul | Band | Bor | Xor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Opcode::Asr | Opcode::Lsr | Opcode::Lsl)
    }

    pub fn is_cond_br(self) -> bool {
        matches!(self, Opcode::TrueBr | Opcode::FalseBr)
    }

    /// C-like arithmetic precedence; lower binds tighter.
    pub fn precedence(self) -> u8 {
        use Opcode::*;
        match self {
            Array => 1,
            Neg | Bnot | Lnot | Ild | Lda | Cvt => 2,
            Mul | Div | Rem | Mod => 4,
            Add | Sub => 5,
            Asr | Lsr | Lsl => 6,
            Lt | Le | Gt | Ge => 7,
            Eq | Ne => 8,
            Band => 9,
            Xor => 10,
            Bor => 11,
            Land => 12,
            Lor => 13,
            Select => 14,
            _ => 15,
        }
    }

    /// Comparison obtained by swapping the operands: `a < b` is `b > a`.
    pub fn swap_relation(self) -> Opcode {
        use Opcode::*;
        match self {
            Lt => Gt,
            Le => Ge,
            Gt => Lt,
            Ge => Le,
            other => other,
        }
    }

    /// Logical negation of a comparison: `!(a < b)` is `a >= b`.
    pub fn invert_relation(self) -> Option<Opcode> {
        use Opcode::*;
        Some(match self {
            Lt => Ge,
            Le => Gt,
            Gt => Le,
            Ge => Lt,
            Eq => Ne,
            Ne => Eq,
            _ => return None,
        })
    }

    /// Nodes that read or write memory and may therefore carry DU edges.
    pub fn is_memory_ref(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Ld | Pr | Ild | Array | St | StPr | StArray | Ist | Call | Icall | Phi | Id
        )
    }

    /// Slot holding the right-hand side of a store-like statement.
    pub fn rhs_slot(self) -> Option<usize> {
        match self {
            Opcode::St | Opcode::StPr => Some(slot::ST_RHS),
            Opcode::Ist => Some(slot::IST_RHS),
            Opcode::StArray => Some(slot::STARR_RHS),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_inversion_is_an_involution() {
        for code in [Opcode::Lt, Opcode::Le, Opcode::Gt, Opcode::Ge, Opcode::Eq, Opcode::Ne] {
            let inv = code.invert_relation().unwrap();
            assert_eq!(inv.invert_relation(), Some(code));
        }
        assert_eq!(Opcode::Add.invert_relation(), None);
    }

    #[test]
    fn swap_keeps_equality() {
        assert_eq!(Opcode::Lt.swap_relation(), Opcode::Gt);
        assert_eq!(Opcode::Ge.swap_relation(), Opcode::Le);
        assert_eq!(Opcode::Eq.swap_relation(), Opcode::Eq);
    }

    #[test]
    fn statements_and_expressions_partition() {
        assert!(Opcode::St.is_stmt());
        assert!(Opcode::Phi.is_stmt());
        assert!(Opcode::Select.is_exp());
        assert!(!Opcode::Ld.is_stmt());
    }

    #[test]
    fn add_and_sub_share_precedence() {
        assert_eq!(Opcode::Add.precedence(), Opcode::Sub.precedence());
        assert_ne!(Opcode::Add.precedence(), Opcode::Mul.precedence());
    }
}
