//! Type handles.
//!
//! `TypeId` indexes into a `TypePool`. Primitive types sit at fixed indices so
//! converters can dispatch on them without touching the pool.

use std::fmt;

/// A 32-bit index into the type pool.
///
/// Types are compared by index equality, never structurally.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive Types (indices 0-14) ===
    pub const BOOL: Self = Self(0);
    pub const I8: Self = Self(1);
    pub const I16: Self = Self(2);
    pub const I32: Self = Self(3);
    pub const I64: Self = Self(4);
    pub const U8: Self = Self(5);
    pub const U16: Self = Self(6);
    pub const U32: Self = Self(7);
    pub const U64: Self = Self(8);
    pub const F32: Self = Self(9);
    pub const F64: Self = Self(10);
    pub const CHAR: Self = Self(11);
    pub const STR: Self = Self(12);
    pub const UNIT: Self = Self(13);
    /// Accepts any value; used for explicit type overrides.
    pub const ANY: Self = Self(14);

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 15;

    /// First index for registered (nominal or structural) types.
    pub const FIRST_DYNAMIC: u32 = 32;

    /// Sentinel: no type.
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Signed or unsigned integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        self.0 >= Self::I8.0 && self.0 <= Self::U64.0
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        self.0 == Self::F32.0 || self.0 == Self::F64.0
    }

    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Name of a primitive type, `None` for registered types.
    pub const fn primitive_name(self) -> Option<&'static str> {
        Some(match self {
            Self::BOOL => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::CHAR => "char",
            Self::STR => "str",
            Self::UNIT => "()",
            Self::ANY => "any",
            _ => return None,
        })
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primitive_name() {
            Some(name) => write!(f, "TypeId::{name}"),
            None if self.is_none() => write!(f, "TypeId::NONE"),
            None => write!(f, "TypeId({})", self.0),
        }
    }
}
