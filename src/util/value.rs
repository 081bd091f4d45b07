//! Primitive value types - the numeric storage types a column or raster can hold.

use bytemuck::{Pod, Zeroable};
use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Column;

/// Primitive numeric storage type.
///
/// Columns of a matrix, vector set or binary record stream may hold any of
/// these; the engine always reads and writes them through `f64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ValueType {
    /// Signed 8-bit integer
    Int8 = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 16-bit integer
    Int16 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 32-bit integer
    Int32 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 64-bit integer
    Int64 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// 16-bit floating point (IEEE 754 half precision)
    Float16 = 8,
    /// 32-bit floating point
    Float32 = 9,
    /// 64-bit floating point
    #[default]
    Float64 = 10,
}

impl ValueType {
    /// All value types, narrowest integers first.
    pub const ALL: [ValueType; 11] = [
        Self::Int8,
        Self::Uint8,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Int64,
        Self::Uint64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the size in bytes of a single element of this type.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 | Self::Float16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parse a value type from its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Single-letter binary record code (`c u h H i I l L e f d`).
    pub const fn code(self) -> char {
        match self {
            Self::Int8 => 'c',
            Self::Uint8 => 'u',
            Self::Int16 => 'h',
            Self::Uint16 => 'H',
            Self::Int32 => 'i',
            Self::Uint32 => 'I',
            Self::Int64 => 'l',
            Self::Uint64 => 'L',
            Self::Float16 => 'e',
            Self::Float32 => 'f',
            Self::Float64 => 'd',
        }
    }

    /// Inverse of [`ValueType::code`].
    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === Primitive trait for typed get/put ===

/// A numeric type that can back a [`Column`].
///
/// Conversions go through `f64`; integer targets saturate and map NaN to zero.
pub trait Primitive: Pod + Zeroable + Copy + Default + 'static {
    /// The corresponding ValueType enum value.
    const VALUE_TYPE: ValueType;

    /// Widen to double.
    fn to_f64(self) -> f64;

    /// Narrow from double.
    fn from_f64(v: f64) -> Self;

    /// Wrap a vector in the matching column variant.
    fn into_column(values: Vec<Self>) -> Column;

    /// View a column as a slice of this type, if the types agree.
    fn slice(column: &Column) -> Option<&[Self]>;
}

macro_rules! impl_primitive {
    ($t:ty, $vt:ident) => {
        impl Primitive for $t {
            const VALUE_TYPE: ValueType = ValueType::$vt;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            fn into_column(values: Vec<Self>) -> Column {
                Column::$vt(values)
            }

            fn slice(column: &Column) -> Option<&[Self]> {
                match column {
                    Column::$vt(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_primitive!(i8, Int8);
impl_primitive!(u8, Uint8);
impl_primitive!(i16, Int16);
impl_primitive!(u16, Uint16);
impl_primitive!(i32, Int32);
impl_primitive!(u32, Uint32);
impl_primitive!(i64, Int64);
impl_primitive!(u64, Uint64);
impl_primitive!(f32, Float32);
impl_primitive!(f64, Float64);

impl Primitive for f16 {
    const VALUE_TYPE: ValueType = ValueType::Float16;

    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }

    fn into_column(values: Vec<Self>) -> Column {
        Column::Float16(values)
    }

    fn slice(column: &Column) -> Option<&[Self]> {
        match column {
            Column::Float16(v) => Some(v),
            _ => None,
        }
    }
}
