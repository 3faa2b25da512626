//! Memory descriptors: abstract storage locations named by variable,
//! offset and size.

use std::collections::{BTreeSet, HashMap};

use cranelift_entity::PrimaryMap;

use crate::refs::{MdRef, MdSetRef, VarRef};

/// One memory location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MdData {
    pub var: VarRef,
    pub ofst: i64,
    pub size: u32,
    /// An exact descriptor covers precisely `[ofst, ofst + size)` of `var`.
    /// An inexact one stands for some unknown part of `var`.
    pub exact: bool,
}

impl MdData {
    pub fn exact(var: VarRef, ofst: i64, size: u32) -> Self {
        Self {
            var,
            ofst,
            size,
            exact: true,
        }
    }

    pub fn whole(var: VarRef) -> Self {
        Self {
            var,
            ofst: 0,
            size: 0,
            exact: false,
        }
    }

    /// True if the two descriptors may denote overlapping storage.
    pub fn overlaps(&self, other: &MdData) -> bool {
        if self.var != other.var {
            return false;
        }
        if !self.exact || !other.exact {
            return true;
        }
        let (a0, a1) = (self.ofst, self.ofst + i64::from(self.size));
        let (b0, b1) = (other.ofst, other.ofst + i64::from(other.size));
        a0 < b1 && b0 < a1
    }
}

/// Descriptor registry and interned descriptor sets.
#[derive(Default)]
pub struct MdSystem {
    mds: PrimaryMap<MdRef, MdData>,
    dedup: HashMap<MdData, MdRef>,
    sets: PrimaryMap<MdSetRef, BTreeSet<MdRef>>,
    set_dedup: HashMap<BTreeSet<MdRef>, MdSetRef>,
}

impl MdSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning an existing ref for identical data.
    pub fn register(&mut self, data: MdData) -> MdRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.mds.push(data);
        self.dedup.insert(data, r);
        r
    }

    pub fn get(&self, md: MdRef) -> &MdData {
        &self.mds[md]
    }

    pub fn intern_set(&mut self, mds: impl IntoIterator<Item = MdRef>) -> MdSetRef {
        let set: BTreeSet<MdRef> = mds.into_iter().collect();
        if let Some(&existing) = self.set_dedup.get(&set) {
            return existing;
        }
        let r = self.sets.push(set.clone());
        self.set_dedup.insert(set, r);
        r
    }

    pub fn set(&self, s: MdSetRef) -> &BTreeSet<MdRef> {
        &self.sets[s]
    }

    pub fn overlaps(&self, a: MdRef, b: MdRef) -> bool {
        a == b || self.get(a).overlaps(self.get(b))
    }

    /// True if any member of `a` overlaps any member of `b`.
    pub fn any_overlap<'a>(
        &self,
        a: impl IntoIterator<Item = &'a MdRef>,
        b: &[MdRef],
    ) -> bool {
        a.into_iter()
            .any(|&x| b.iter().any(|&y| self.overlaps(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    #[test]
    fn exact_ranges_overlap_only_when_intersecting() {
        let v = VarRef::new(0);
        let a = MdData::exact(v, 0, 4);
        let b = MdData::exact(v, 4, 4);
        let c = MdData::exact(v, 2, 4);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(MdData::whole(v).overlaps(&b));
        assert!(!a.overlaps(&MdData::exact(VarRef::new(1), 0, 4)));
    }

    #[test]
    fn registry_and_sets_deduplicate() {
        let mut sys = MdSystem::new();
        let v = VarRef::new(0);
        let a = sys.register(MdData::exact(v, 0, 4));
        assert_eq!(a, sys.register(MdData::exact(v, 0, 4)));
        let b = sys.register(MdData::exact(v, 8, 4));
        let s1 = sys.intern_set([a, b]);
        let s2 = sys.intern_set([b, a]);
        assert_eq!(s1, s2);
        assert_eq!(sys.set(s1).len(), 2);
    }
}
