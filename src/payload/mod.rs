//! Data containers managed by a session.
//!
//! Every container lives behind a shared handle ([`Shared`]) so that two
//! registry entries can alias one payload: a producer writing through one
//! handle is seen by a consumer reading through the other. Identity is the
//! handle's address ([`PayloadAddr`]).
//!
//! - [`Dataset`] / [`TextSet`] - tables of segments of records
//! - [`Grid`] / [`Image`] - padded rasters
//! - [`Palette`] - color lookup table
//! - [`PostScript`] - vector-graphics document
//! - [`Matrix`] / [`VectorSet`] - raw buffers that can stand in for a dataset
//! - [`CoordArray`] - coordinate array

mod dataset;
mod text;
mod grid;
mod palette;
mod postscript;
mod matrix;
mod vector;

pub use dataset::{DataSegment, DataTable, Dataset};
pub use text::{TextSegment, TextSet, TextTable};
pub use grid::{Grid, GridHeader, Image, Pad, Registration};
pub use palette::{ColorSlice, Palette, Rgb};
pub use postscript::PostScript;
pub use matrix::{Matrix, Shape};
pub use vector::{CoordArray, VectorSet};

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::core::{Family, Region};
use crate::util::Result;

/// Shared, interior-mutable container handle.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wrap a value in a new shared handle.
#[inline]
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Raw address identifying a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PayloadAddr(pub usize);

impl PayloadAddr {
    #[inline]
    fn of<T>(p: &Shared<T>) -> Self {
        Self(Arc::as_ptr(p) as *const () as usize)
    }
}

impl fmt::Display for PayloadAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

macro_rules! payload_kinds {
    ($($variant:ident($ty:ty) => $accessor:ident),* $(,)?) => {
        /// A handle to one data container of any family.
        #[derive(Clone)]
        pub enum Payload {
            $($variant(Shared<$ty>),)*
        }

        impl Payload {
            /// Family of the container.
            pub fn family(&self) -> Family {
                match self {
                    $(Self::$variant(_) => Family::$variant,)*
                }
            }

            /// Address used for alias detection.
            pub fn addr(&self) -> PayloadAddr {
                match self {
                    $(Self::$variant(p) => PayloadAddr::of(p),)*
                }
            }

            /// Independent copy of the contents.
            pub fn deep_clone(&self) -> Payload {
                match self {
                    $(Self::$variant(p) => Self::$variant(shared(p.read().clone())),)*
                }
            }

            /// Free the contents; the handle stays valid but empty.
            pub fn release_storage(&self) {
                match self {
                    $(Self::$variant(p) => *p.write() = <$ty>::default(),)*
                }
            }

            /// Empty container of `family`.
            pub fn empty(family: Family) -> Payload {
                match family {
                    $(Family::$variant => Self::$variant(shared(<$ty>::default())),)*
                }
            }

            /// Overwrite `target`'s contents with a copy of ours (same family only).
            pub fn copy_into(&self, target: &Payload) -> Result<()> {
                if self.ptr_eq(target) {
                    return Ok(());
                }
                match (self, target) {
                    $((Self::$variant(src), Self::$variant(dst)) => {
                        let value = src.read().clone();
                        *dst.write() = value;
                        Ok(())
                    })*
                    _ => Err(crate::util::Error::WrongFamily {
                        expected: target.family(),
                        actual: self.family(),
                    }),
                }
            }

            $(
                #[doc = concat!("The ", stringify!($variant), " handle, if this is one.")]
                pub fn $accessor(&self) -> Option<&Shared<$ty>> {
                    match self {
                        Self::$variant(p) => Some(p),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<$ty> for Payload {
                fn from(value: $ty) -> Self {
                    Self::$variant(shared(value))
                }
            }
        )*
    };
}

payload_kinds! {
    Dataset(Dataset) => dataset,
    TextSet(TextSet) => text_set,
    Grid(Grid) => grid,
    Image(Image) => image,
    Palette(Palette) => palette,
    PostScript(PostScript) => postscript,
    Matrix(Matrix) => matrix,
    VectorSet(VectorSet) => vector_set,
    Coord(CoordArray) => coord,
}

impl Payload {
    /// True if both handles point at the same container.
    #[inline]
    pub fn ptr_eq(&self, other: &Payload) -> bool {
        self.addr() == other.addr()
    }

    /// Rough size: records, rows, nodes, slices or bytes depending on family.
    pub fn n_records(&self) -> usize {
        match self {
            Self::Dataset(p) => p.read().n_records(),
            Self::TextSet(p) => p.read().n_records(),
            Self::Grid(p) => {
                let g = p.read();
                g.header.n_rows * g.header.n_columns
            }
            Self::Image(p) => {
                let i = p.read();
                i.header.n_rows * i.header.n_columns
            }
            Self::Palette(p) => p.read().n_colors(),
            Self::PostScript(p) => p.read().n_bytes(),
            Self::Matrix(p) => p.read().n_rows,
            Self::VectorSet(p) => p.read().n_rows,
            Self::Coord(p) => p.read().values.len(),
        }
    }

    /// Narrow a raster's visible area in place; returns the header to restore.
    ///
    /// Non-raster payloads are left alone.
    pub fn narrow_view(&self, region: &Region) -> Result<Option<GridHeader>> {
        match self {
            Self::Grid(p) => p.write().narrow_view(region).map(Some),
            Self::Image(p) => p.write().narrow_view(region).map(Some),
            _ => Ok(None),
        }
    }

    /// Undo [`Payload::narrow_view`].
    pub fn restore_view(&self, original: GridHeader) {
        match self {
            Self::Grid(p) => p.write().restore_view(original),
            Self::Image(p) => p.write().restore_view(original),
            _ => {}
        }
    }

    /// Copy of the contents limited to `region` where the family supports it.
    pub fn extract(&self, region: Option<&Region>, pad: usize) -> Result<Payload> {
        match (self, region) {
            (Self::Grid(p), Some(r)) => Ok(p.read().extract(r, pad)?.into()),
            (Self::Image(p), Some(r)) => Ok(p.read().extract(r, pad)?.into()),
            _ => Ok(self.deep_clone()),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.family(), self.addr())
    }
}
