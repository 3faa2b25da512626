//! Variables referenced by loads, stores and address-of nodes.

use std::collections::HashMap;

use cranelift_entity::PrimaryMap;

use crate::refs::{TypeRef, VarRef};

/// Data for a single variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VarData {
    pub name: String,
    pub ty: TypeRef,
    /// Storage of a string literal; its address is never null.
    pub is_string: bool,
    pub is_array: bool,
    /// Synthesized to describe a pseudo register.
    pub is_pr: bool,
}

impl VarData {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            is_string: false,
            is_array: false,
            is_pr: false,
        }
    }

    pub fn string(mut self) -> Self {
        self.is_string = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }
}

/// Variable table of a region.
#[derive(Default)]
pub struct VarTable {
    vars: PrimaryMap<VarRef, VarData>,
    pr_vars: HashMap<u32, VarRef>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, data: VarData) -> VarRef {
        self.vars.push(data)
    }

    pub fn get(&self, v: VarRef) -> &VarData {
        &self.vars[v]
    }

    /// Variable standing for pseudo register `prno`, created on first use.
    pub fn pr_var(&mut self, prno: u32, ty: TypeRef) -> VarRef {
        if let Some(&v) = self.pr_vars.get(&prno) {
            return v;
        }
        let mut data = VarData::new(format!("${prno}"), ty);
        data.is_pr = true;
        let v = self.vars.push(data);
        self.pr_vars.insert(prno, v);
        v
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
