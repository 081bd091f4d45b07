//! Fixed-width binary records.
//!
//! A record is `n_columns` values of one [`ValueType`] in the configured byte
//! order. Binary tables have no headers; an all-NaN record marks a segment
//! break.

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use half::f16;
use std::io::{self, Read, Write};

use super::{Record, Values};
use crate::core::{BinaryLayout, Endian};
use crate::util::{Primitive, Result, ValueType};

fn read_value<B: ByteOrder>(r: &mut dyn Read, t: ValueType) -> io::Result<f64> {
    Ok(match t {
        ValueType::Int8 => r.read_i8()? as f64,
        ValueType::Uint8 => r.read_u8()? as f64,
        ValueType::Int16 => r.read_i16::<B>()? as f64,
        ValueType::Uint16 => r.read_u16::<B>()? as f64,
        ValueType::Int32 => r.read_i32::<B>()? as f64,
        ValueType::Uint32 => r.read_u32::<B>()? as f64,
        ValueType::Int64 => r.read_i64::<B>()? as f64,
        ValueType::Uint64 => r.read_u64::<B>()? as f64,
        ValueType::Float16 => f16::from_bits(r.read_u16::<B>()?).to_f64(),
        ValueType::Float32 => r.read_f32::<B>()? as f64,
        ValueType::Float64 => r.read_f64::<B>()?,
    })
}

fn write_value<B: ByteOrder>(w: &mut dyn Write, t: ValueType, v: f64) -> io::Result<()> {
    match t {
        ValueType::Int8 => w.write_i8(<i8 as Primitive>::from_f64(v)),
        ValueType::Uint8 => w.write_u8(<u8 as Primitive>::from_f64(v)),
        ValueType::Int16 => w.write_i16::<B>(<i16 as Primitive>::from_f64(v)),
        ValueType::Uint16 => w.write_u16::<B>(<u16 as Primitive>::from_f64(v)),
        ValueType::Int32 => w.write_i32::<B>(<i32 as Primitive>::from_f64(v)),
        ValueType::Uint32 => w.write_u32::<B>(<u32 as Primitive>::from_f64(v)),
        ValueType::Int64 => w.write_i64::<B>(<i64 as Primitive>::from_f64(v)),
        ValueType::Uint64 => w.write_u64::<B>(<u64 as Primitive>::from_f64(v)),
        ValueType::Float16 => w.write_u16::<B>(f16::from_f64(v).to_bits()),
        ValueType::Float32 => w.write_f32::<B>(v as f32),
        ValueType::Float64 => w.write_f64::<B>(v),
    }
}

fn read_with<B: ByteOrder>(r: &mut dyn Read, layout: &BinaryLayout) -> Result<Option<Record>> {
    let mut values = Values::with_capacity(layout.n_columns);
    for col in 0..layout.n_columns {
        match read_value::<B>(r, layout.value_type) {
            Ok(v) => values.push(v),
            // Clean end only between records.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && col == 0 => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(Record { values, text: None }))
}

/// Read one record; `None` at a clean end of input.
pub fn read_record(r: &mut dyn Read, layout: &BinaryLayout) -> Result<Option<Record>> {
    match layout.endian {
        Endian::Little => read_with::<LittleEndian>(r, layout),
        Endian::Big => read_with::<BigEndian>(r, layout),
    }
}

/// Write one record, NaN-padding or truncating to the layout's column count.
pub fn write_record(w: &mut dyn Write, layout: &BinaryLayout, values: &[f64]) -> Result<()> {
    for col in 0..layout.n_columns {
        let v = values.get(col).copied().unwrap_or(f64::NAN);
        match layout.endian {
            Endian::Little => write_value::<LittleEndian>(w, layout.value_type, v)?,
            Endian::Big => write_value::<BigEndian>(w, layout.value_type, v)?,
        }
    }
    Ok(())
}
