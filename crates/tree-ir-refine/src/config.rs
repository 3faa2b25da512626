//! Refinement options.

use serde::{Deserialize, Serialize};

/// Option set read by every refinement entry point.
///
/// All rule families are on by default except division strength
/// reduction. The only field a pass writes is `stmt_removed`, which
/// reports back to the statement-list driver that the statement under
/// refinement was deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineCtx {
    /// Whole-pass switch. When off, the block-list driver does nothing.
    pub enabled: bool,
    /// Evaluate operations whose operands are all constants.
    pub fold_const: bool,
    /// Balance operand types with explicit conversions.
    pub insert_cvt: bool,
    /// `X / 2^k` to a right shift.
    pub refine_div_by_pow2: bool,
    /// `X * 2^k` to a left shift.
    pub refine_mul_by_pow2: bool,
    /// Delete statements that store a location back into itself.
    pub refine_stmt: bool,
    /// Turn `(a != 0) ? 0 : 1` and `(a == 0) ? 1 : 0` into `!a`.
    pub hoist_select_to_not: bool,
    /// Floating-point folding and identities.
    pub opt_float: bool,
    /// Merge constants of nested same-precedence operations.
    pub reassociate: bool,
    /// Upper bound on sweeps of one statement list.
    pub max_list_iterations: usize,
    /// Set when the statement just refined was removed from its list.
    #[serde(skip)]
    pub stmt_removed: bool,
}

impl Default for RefineCtx {
    fn default() -> Self {
        Self {
            enabled: true,
            fold_const: true,
            insert_cvt: true,
            refine_div_by_pow2: false,
            refine_mul_by_pow2: true,
            refine_stmt: true,
            hoist_select_to_not: true,
            opt_float: true,
            reassociate: true,
            max_list_iterations: 64,
            stmt_removed: false,
        }
    }
}

impl RefineCtx {
    /// Options with every rule family switched off; only the traversal runs.
    pub fn disabled_rules() -> Self {
        Self {
            fold_const: false,
            insert_cvt: false,
            refine_div_by_pow2: false,
            refine_mul_by_pow2: false,
            refine_stmt: false,
            hoist_select_to_not: false,
            opt_float: false,
            reassociate: false,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, on: bool) -> Self {
        self.enabled = on;
        self
    }

    pub fn with_fold_const(mut self, on: bool) -> Self {
        self.fold_const = on;
        self
    }

    pub fn with_insert_cvt(mut self, on: bool) -> Self {
        self.insert_cvt = on;
        self
    }

    pub fn with_div_by_pow2(mut self, on: bool) -> Self {
        self.refine_div_by_pow2 = on;
        self
    }

    pub fn with_mul_by_pow2(mut self, on: bool) -> Self {
        self.refine_mul_by_pow2 = on;
        self
    }

    pub fn with_refine_stmt(mut self, on: bool) -> Self {
        self.refine_stmt = on;
        self
    }

    pub fn with_hoist_select_to_not(mut self, on: bool) -> Self {
        self.hoist_select_to_not = on;
        self
    }

    pub fn with_opt_float(mut self, on: bool) -> Self {
        self.opt_float = on;
        self
    }

    pub fn with_reassociate(mut self, on: bool) -> Self {
        self.reassociate = on;
        self
    }

    pub fn with_max_list_iterations(mut self, n: usize) -> Self {
        self.max_list_iterations = n;
        self
    }

    /// Sweep cap actually used by the list drivers; zero means the default.
    pub(crate) fn sweep_cap(&self) -> usize {
        if self.max_list_iterations == 0 {
            64
        } else {
            self.max_list_iterations
        }
    }
}
