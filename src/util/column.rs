//! Column - a typed numeric buffer read and written through `f64`.

use half::f16;

use super::{Error, Primitive, Result, ValueType};

/// One typed buffer (a matrix body, a vector, a raster band).
///
/// Whatever the storage type, values go in and come out as `f64`, so record
/// and bulk code never has to branch on the element type.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Int64(Vec<i64>),
    Uint64(Vec<u64>),
    Float16(Vec<f16>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! each_column {
    ($col:expr, $v:ident => $body:expr) => {
        match $col {
            Column::Int8($v) => $body,
            Column::Uint8($v) => $body,
            Column::Int16($v) => $body,
            Column::Uint16($v) => $body,
            Column::Int32($v) => $body,
            Column::Uint32($v) => $body,
            Column::Int64($v) => $body,
            Column::Uint64($v) => $body,
            Column::Float16($v) => $body,
            Column::Float32($v) => $body,
            Column::Float64($v) => $body,
        }
    };
}

impl Default for Column {
    fn default() -> Self {
        Self::Float64(Vec::new())
    }
}

impl Column {
    /// Empty column of the given type with reserved capacity.
    pub fn with_capacity(value_type: ValueType, capacity: usize) -> Self {
        match value_type {
            ValueType::Int8 => Self::Int8(Vec::with_capacity(capacity)),
            ValueType::Uint8 => Self::Uint8(Vec::with_capacity(capacity)),
            ValueType::Int16 => Self::Int16(Vec::with_capacity(capacity)),
            ValueType::Uint16 => Self::Uint16(Vec::with_capacity(capacity)),
            ValueType::Int32 => Self::Int32(Vec::with_capacity(capacity)),
            ValueType::Uint32 => Self::Uint32(Vec::with_capacity(capacity)),
            ValueType::Int64 => Self::Int64(Vec::with_capacity(capacity)),
            ValueType::Uint64 => Self::Uint64(Vec::with_capacity(capacity)),
            ValueType::Float16 => Self::Float16(Vec::with_capacity(capacity)),
            ValueType::Float32 => Self::Float32(Vec::with_capacity(capacity)),
            ValueType::Float64 => Self::Float64(Vec::with_capacity(capacity)),
        }
    }

    /// Zero-filled column of `len` elements.
    pub fn zeros(value_type: ValueType, len: usize) -> Self {
        let mut c = Self::with_capacity(value_type, len);
        c.resize(len, 0.0);
        c
    }

    /// Copy a typed slice into a new column.
    pub fn from_slice<T: Primitive>(values: &[T]) -> Self {
        T::into_column(values.to_vec())
    }

    /// Build a column of `value_type` from doubles.
    pub fn from_f64(value_type: ValueType, values: &[f64]) -> Self {
        let mut c = Self::with_capacity(value_type, values.len());
        for &v in values {
            c.push(v);
        }
        c
    }

    /// Decode raw native-endian bytes supplied by an external caller.
    pub fn from_bytes(value_type: ValueType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % value_type.num_bytes() != 0 {
            return Err(Error::DimensionMismatch(format!(
                "{} bytes is not a whole number of {} values",
                bytes.len(),
                value_type
            )));
        }
        Ok(match value_type {
            ValueType::Int8 => Self::Int8(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Uint8 => Self::Uint8(bytes.to_vec()),
            ValueType::Int16 => Self::Int16(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Uint16 => Self::Uint16(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Int32 => Self::Int32(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Uint32 => Self::Uint32(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Int64 => Self::Int64(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Uint64 => Self::Uint64(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Float16 => Self::Float16(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Float32 => Self::Float32(bytemuck::pod_collect_to_vec(bytes)),
            ValueType::Float64 => Self::Float64(bytemuck::pod_collect_to_vec(bytes)),
        })
    }

    /// Raw native-endian view of the storage.
    pub fn as_bytes(&self) -> &[u8] {
        each_column!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    /// Typed view, if `T` matches the storage type.
    pub fn as_slice<T: Primitive>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    /// Storage type of this column.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int8(_) => ValueType::Int8,
            Self::Uint8(_) => ValueType::Uint8,
            Self::Int16(_) => ValueType::Int16,
            Self::Uint16(_) => ValueType::Uint16,
            Self::Int32(_) => ValueType::Int32,
            Self::Uint32(_) => ValueType::Uint32,
            Self::Int64(_) => ValueType::Int64,
            Self::Uint64(_) => ValueType::Uint64,
            Self::Float16(_) => ValueType::Float16,
            Self::Float32(_) => ValueType::Float32,
            Self::Float64(_) => ValueType::Float64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        each_column!(self, v => v.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read element `i` as a double.
    #[inline]
    pub fn get(&self, i: usize) -> Option<f64> {
        each_column!(self, v => v.get(i).map(|x| x.to_f64()))
    }

    /// Overwrite element `i`.
    pub fn put(&mut self, i: usize, value: f64) -> Result<()> {
        let len = self.len();
        each_column!(self, v => match v.get_mut(i) {
            Some(slot) => {
                *slot = Primitive::from_f64(value);
                Ok(())
            }
            None => Err(Error::DimensionMismatch(format!("index {i} out of bounds (len {len})"))),
        })
    }

    /// Append one value, growing the buffer geometrically.
    #[inline]
    pub fn push(&mut self, value: f64) {
        each_column!(self, v => v.push(Primitive::from_f64(value)))
    }

    /// Resize, filling new slots with `fill`.
    pub fn resize(&mut self, len: usize, fill: f64) {
        each_column!(self, v => v.resize(len, Primitive::from_f64(fill)))
    }

    /// Drop the storage (length and capacity go to zero).
    pub fn release(&mut self) {
        each_column!(self, v => *v = Vec::new())
    }

    /// All values widened to double.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_column!(self, v => v.iter().map(|x| x.to_f64()).collect())
    }
}
