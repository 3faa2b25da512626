//! Type interning and layout queries.

use std::collections::HashMap;
use std::fmt;

use cranelift_entity::PrimaryMap;
use serde::{Deserialize, Serialize};

use crate::refs::TypeRef;
use crate::target::TargetInfo;

// ============================================================================
// DataType
// ============================================================================

/// Scalar data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    F128,
    /// String constant; laid out as a pointer.
    Str,
    Void,
    /// Placeholder type for untyped expressions.
    Any,
}

impl DataType {
    pub fn is_signed(self) -> bool {
        use DataType::*;
        matches!(self, I8 | I16 | I32 | I64 | I128)
    }

    pub fn is_unsigned(self) -> bool {
        use DataType::*;
        matches!(self, Bool | U8 | U16 | U32 | U64 | U128)
    }

    pub fn is_fp(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64 | DataType::F128)
    }

    pub fn is_int(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Byte size of the scalar, with `Str` taking `pointer_size`.
    pub fn byte_size(self, pointer_size: u32) -> u32 {
        use DataType::*;
        match self {
            Bool | I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            I64 | U64 | F64 => 8,
            I128 | U128 | F128 => 16,
            Str => pointer_size,
            Void | Any => 0,
        }
    }

    /// Integer type of the given byte width and signedness.
    pub fn int_of_size(bytes: u32, signed: bool) -> Option<DataType> {
        use DataType::*;
        Some(match (bytes, signed) {
            (1, true) => I8,
            (2, true) => I16,
            (4, true) => I32,
            (8, true) => I64,
            (16, true) => I128,
            (1, false) => U8,
            (2, false) => U16,
            (4, false) => U32,
            (8, false) => U64,
            (16, false) => U128,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use DataType::*;
        match self {
            Bool => "bool",
            I8 => "i8",
            I16 => "i16",
            I32 => "i32",
            I64 => "i64",
            I128 => "i128",
            U8 => "u8",
            U16 => "u16",
            U32 => "u32",
            U64 => "u64",
            U128 => "u128",
            F32 => "f32",
            F64 => "f64",
            F128 => "f128",
            Str => "str",
            Void => "void",
            Any => "any",
        }
    }
}

// ============================================================================
// TypeData
// ============================================================================

/// Data for a single interned type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeData {
    Simplex(DataType),
    /// Pointer; `base_size` is the byte size of the pointee.
    Pointer { base_size: u32 },
    /// Opaque memory chunk of `size` bytes.
    MemoryChunk { size: u32 },
    /// Vector of `elem`, `size` bytes in total.
    Vector { elem: DataType, size: u32 },
}

// ============================================================================
// TypeMgr
// ============================================================================

/// Deduplicating type interner with layout queries for a target.
pub struct TypeMgr {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
    target: TargetInfo,
}

impl TypeMgr {
    pub fn new(target: TargetInfo) -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: HashMap::default(),
            target,
        }
    }

    /// Intern a type, returning an existing ref if the data matches.
    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.types.push(data);
        self.dedup.insert(data, r);
        r
    }

    /// Look up type data by reference.
    pub fn get(&self, r: TypeRef) -> TypeData {
        self.types[r]
    }

    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    pub fn pointer_size(&self) -> u32 {
        self.target.pointer_size
    }

    pub fn simplex(&mut self, dt: DataType) -> TypeRef {
        self.intern(TypeData::Simplex(dt))
    }

    pub fn bool_type(&mut self) -> TypeRef {
        self.simplex(DataType::Bool)
    }

    pub fn pointer(&mut self, base_size: u32) -> TypeRef {
        self.intern(TypeData::Pointer { base_size })
    }

    pub fn memory_chunk(&mut self, size: u32) -> TypeRef {
        self.intern(TypeData::MemoryChunk { size })
    }

    pub fn vector(&mut self, elem: DataType, size: u32) -> TypeRef {
        self.intern(TypeData::Vector { elem, size })
    }

    /// Unsigned integer type as wide as a pointer.
    pub fn pointer_size_dtype(&self) -> DataType {
        DataType::int_of_size(self.pointer_size(), false).unwrap_or(DataType::U64)
    }

    /// Integer type of the target machine word.
    pub fn word_dtype(&self, signed: bool) -> DataType {
        DataType::int_of_size(self.pointer_size(), signed).unwrap_or(DataType::I64)
    }

    pub fn byte_size(&self, ty: TypeRef) -> u32 {
        match self.get(ty) {
            TypeData::Simplex(dt) => dt.byte_size(self.pointer_size()),
            TypeData::Pointer { .. } => self.pointer_size(),
            TypeData::MemoryChunk { size } | TypeData::Vector { size, .. } => size,
        }
    }

    pub fn bit_width(&self, ty: TypeRef) -> u32 {
        self.byte_size(ty) * 8
    }

    pub fn dtype(&self, ty: TypeRef) -> Option<DataType> {
        match self.get(ty) {
            TypeData::Simplex(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn is_int(&self, ty: TypeRef) -> bool {
        self.dtype(ty).is_some_and(DataType::is_int)
    }

    pub fn is_signed(&self, ty: TypeRef) -> bool {
        self.dtype(ty).is_some_and(DataType::is_signed)
    }

    /// Unsigned integers, booleans and pointers compare unsigned.
    pub fn is_unsigned(&self, ty: TypeRef) -> bool {
        self.dtype(ty).is_some_and(DataType::is_unsigned) || self.is_ptr(ty)
    }

    pub fn is_fp(&self, ty: TypeRef) -> bool {
        self.dtype(ty).is_some_and(DataType::is_fp)
    }

    pub fn is_bool(&self, ty: TypeRef) -> bool {
        self.dtype(ty) == Some(DataType::Bool)
    }

    pub fn is_str(&self, ty: TypeRef) -> bool {
        self.dtype(ty) == Some(DataType::Str)
    }

    pub fn is_void(&self, ty: TypeRef) -> bool {
        matches!(self.dtype(ty), Some(DataType::Void | DataType::Any))
    }

    pub fn is_ptr(&self, ty: TypeRef) -> bool {
        matches!(self.get(ty), TypeData::Pointer { .. })
    }

    pub fn is_mc(&self, ty: TypeRef) -> bool {
        matches!(self.get(ty), TypeData::MemoryChunk { .. })
    }

    pub fn is_vec(&self, ty: TypeRef) -> bool {
        matches!(self.get(ty), TypeData::Vector { .. })
    }

    /// Integer types that may be added to a pointer.
    pub fn is_ptr_addend(&self, ty: TypeRef) -> bool {
        self.is_int(ty) && !self.is_bool(ty)
    }

    /// Common type of two binary-operator operands.
    ///
    /// Floating point dominates; among floats the wider wins. Among
    /// integers the wider wins, and equal widths with mixed signedness
    /// yield the unsigned type. Booleans take part as `u8`.
    pub fn hoist_dtype_for_binop(&mut self, t0: TypeRef, t1: TypeRef) -> TypeRef {
        if t0 == t1 {
            return t0;
        }
        let (fp0, fp1) = (self.is_fp(t0), self.is_fp(t1));
        if fp0 || fp1 {
            return match (fp0, fp1) {
                (true, true) if self.byte_size(t1) > self.byte_size(t0) => t1,
                (true, _) => t0,
                _ => t1,
            };
        }
        if self.is_ptr(t0) {
            return t0;
        }
        if self.is_ptr(t1) {
            return t1;
        }
        let s0 = self.byte_size(t0);
        let s1 = self.byte_size(t1);
        let size = s0.max(s1);
        let signed = if s0 == s1 {
            self.is_signed(t0) && self.is_signed(t1)
        } else if s0 > s1 {
            self.is_signed(t0)
        } else {
            self.is_signed(t1)
        };
        match DataType::int_of_size(size, signed) {
            Some(dt) => self.simplex(dt),
            None if s0 >= s1 => t0,
            None => t1,
        }
    }

    /// Wrap `v` to the width of integer type `ty`, sign- or zero-extending
    /// back to 64 bits. Booleans normalize to 0 or 1; other types pass
    /// through unchanged.
    pub fn normalize_int(&self, ty: TypeRef, v: i64) -> i64 {
        let Some(dt) = self.dtype(ty) else {
            return v;
        };
        if dt == DataType::Bool {
            return i64::from(v != 0);
        }
        let bits = dt.byte_size(self.pointer_size()) * 8;
        if !dt.is_int() || bits >= 64 {
            return v;
        }
        let shift = 64 - bits;
        if dt.is_signed() {
            (v << shift) >> shift
        } else {
            ((v as u64) << shift >> shift) as i64
        }
    }

    /// Render a type for dumps.
    pub fn display(&self, ty: TypeRef) -> TypeDisplay {
        TypeDisplay(self.get(ty))
    }
}

impl Default for TypeMgr {
    fn default() -> Self {
        Self::new(TargetInfo::default())
    }
}

/// Printable form of a type.
pub struct TypeDisplay(TypeData);

impl fmt::Display for TypeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            TypeData::Simplex(dt) => f.write_str(dt.name()),
            TypeData::Pointer { base_size } => write!(f, "*<{base_size}>"),
            TypeData::MemoryChunk { size } => write!(f, "mc<{size}>"),
            TypeData::Vector { elem, size } => write!(f, "vec<{}:{size}>", elem.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_dedup() {
        let mut tm = TypeMgr::default();
        let a = tm.simplex(DataType::I32);
        let b = tm.simplex(DataType::I32);
        assert_eq!(a, b, "same TypeData must yield same TypeRef");
        assert_ne!(a, tm.simplex(DataType::U32));
    }

    #[test]
    fn hoist_prefers_wider_and_unsigned_on_tie() {
        let mut tm = TypeMgr::default();
        let i8t = tm.simplex(DataType::I8);
        let i32t = tm.simplex(DataType::I32);
        let u32t = tm.simplex(DataType::U32);
        let u8t = tm.simplex(DataType::U8);
        assert_eq!(tm.hoist_dtype_for_binop(i8t, i32t), i32t);
        assert_eq!(tm.hoist_dtype_for_binop(i32t, u32t), u32t);
        assert_eq!(tm.hoist_dtype_for_binop(u8t, i32t), i32t);
    }

    #[test]
    fn hoist_float_dominates() {
        let mut tm = TypeMgr::default();
        let i64t = tm.simplex(DataType::I64);
        let f32t = tm.simplex(DataType::F32);
        let f64t = tm.simplex(DataType::F64);
        assert_eq!(tm.hoist_dtype_for_binop(i64t, f32t), f32t);
        assert_eq!(tm.hoist_dtype_for_binop(f32t, f64t), f64t);
    }

    #[test]
    fn normalize_wraps_to_width() {
        let mut tm = TypeMgr::default();
        let i8t = tm.simplex(DataType::I8);
        let u8t = tm.simplex(DataType::U8);
        let b = tm.bool_type();
        let i64t = tm.simplex(DataType::I64);
        assert_eq!(tm.normalize_int(i8t, 200), -56);
        assert_eq!(tm.normalize_int(u8t, -1), 255);
        assert_eq!(tm.normalize_int(b, 7), 1);
        assert_eq!(tm.normalize_int(i64t, i64::MIN), i64::MIN);
    }

    #[test]
    fn layout_queries() {
        let mut tm = TypeMgr::default();
        let ptr = tm.pointer(4);
        assert_eq!(tm.byte_size(ptr), tm.pointer_size());
        assert!(tm.is_unsigned(ptr));
        let mc = tm.memory_chunk(24);
        assert_eq!(tm.byte_size(mc), 24);
        assert_eq!(tm.display(mc).to_string(), "mc<24>");
        assert_eq!(tm.display(ptr).to_string(), "*<4>");
    }
}
