//! Element type tags
//!
//! The closed set of primitive types an artifact may name for kernel
//! arguments and field elements. Tags are serialized as their lowercase
//! names (`"i32"`, `"f64"`, ...).

use std::fmt;
use std::str::FromStr;

/// Primitive element type of a kernel argument or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
}

/// A type name that is not part of [`TypeTag`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type tag `{0}`")]
pub struct UnknownTypeTag(pub String);

impl TypeTag {
    /// Every tag, in declaration order.
    pub const ALL: [TypeTag; 11] = [
        TypeTag::I8,
        TypeTag::I16,
        TypeTag::I32,
        TypeTag::I64,
        TypeTag::U8,
        TypeTag::U16,
        TypeTag::U32,
        TypeTag::U64,
        TypeTag::F16,
        TypeTag::F32,
        TypeTag::F64,
    ];

    /// Serialized name of this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::U8 => "u8",
            TypeTag::U16 => "u16",
            TypeTag::U32 => "u32",
            TypeTag::U64 => "u64",
            TypeTag::F16 => "f16",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
        }
    }

    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            TypeTag::I8 | TypeTag::U8 => 1,
            TypeTag::I16 | TypeTag::U16 | TypeTag::F16 => 2,
            TypeTag::I32 | TypeTag::U32 | TypeTag::F32 => 4,
            TypeTag::I64 | TypeTag::U64 | TypeTag::F64 => 8,
        }
    }
}

impl FromStr for TypeTag {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownTypeTag(s.to_string()))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
