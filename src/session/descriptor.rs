//! Registry entries: one descriptor per registered data object.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::codec::{Destination, Transport};
use crate::core::{
    AllocMode, Direction, Family, Geometry, Method, ObjectId, Region, Status, Via,
};
use crate::payload::{GridHeader, Payload, PayloadAddr};
use crate::util::{Error, Result};

/// What a caller hands to `register_io`.
pub enum Resource {
    /// Nothing yet; the engine allocates on demand (memory outputs only)
    None,
    Path(PathBuf),
    Reader(Box<dyn BufRead>),
    Writer(Box<dyn Write>),
    File(File),
    /// A container the caller owns
    Memory(Payload),
}

impl Resource {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::None => "no resource",
            Self::Path(_) => "a path",
            Self::Reader(_) => "a reader",
            Self::Writer(_) => "a writer",
            Self::File(_) => "a file descriptor",
            Self::Memory(_) => "an in-memory container",
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "Path({})", p.display()),
            Self::Memory(p) => write!(f, "Memory({p:?})"),
            other => f.write_str(other.kind()),
        }
    }
}

/// Open transport handle kept by a descriptor until consumed.
pub(crate) enum Handle {
    Reader(Box<dyn BufRead>),
    Writer(Box<dyn Write>),
    File(File),
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader(_) => f.write_str("Reader"),
            Self::Writer(_) => f.write_str("Writer"),
            Self::File(file) => write!(f, "File({file:?})"),
        }
    }
}

/// The engine-side view of an object's container.
///
/// Only `Owned` releases on collection; `Borrowed` views are cleared.
#[derive(Clone, Debug, Default)]
pub enum DataSlot {
    #[default]
    Vacant,
    Owned(Payload),
    Borrowed(Payload),
}

impl DataSlot {
    #[inline]
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Vacant => None,
            Self::Owned(p) | Self::Borrowed(p) => Some(p),
        }
    }

    #[inline]
    pub fn is_vacant(&self) -> bool {
        matches!(self, Self::Vacant)
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Demote an owning slot to a borrowed view.
    pub fn disown(&mut self) {
        if let Self::Owned(p) = std::mem::take(self) {
            *self = Self::Borrowed(p);
        }
    }
}

/// One registered object.
#[derive(Debug)]
pub(crate) struct Descriptor {
    pub id: ObjectId,
    pub family: Family,
    pub actual_family: Family,
    pub geometry: Geometry,
    pub direction: Direction,
    pub method: Method,
    pub via: Via,
    pub status: Status,
    /// Caller-supplied (or caller-bound) container
    pub resource: Option<Payload>,
    /// Container the engine populated
    pub data: DataSlot,
    pub alloc_mode: AllocMode,
    pub alloc_level: u32,
    pub messenger: bool,
    pub selected: bool,
    pub region: Option<Region>,
    /// Raster header to put back before release
    pub pending_view: Option<GridHeader>,
    pub filename: Option<PathBuf>,
    pub handle: Option<Handle>,
    /// Records moved through this object by record I/O
    pub rec: usize,
}

impl Descriptor {
    pub fn new(family: Family, geometry: Geometry, direction: Direction, method: Method) -> Self {
        Self {
            id: ObjectId(0),
            family,
            actual_family: family,
            geometry,
            direction,
            method,
            via: Via::None,
            status: Status::Unused,
            resource: None,
            data: DataSlot::Vacant,
            alloc_mode: AllocMode::Internal,
            alloc_level: 0,
            messenger: false,
            selected: false,
            region: None,
            pending_view: None,
            filename: None,
            handle: None,
            rec: 0,
        }
    }

    /// The container this object currently exposes, engine side first.
    pub fn payload(&self) -> Option<&Payload> {
        self.data.payload().or(self.resource.as_ref())
    }

    /// The container this object is responsible for releasing, if any.
    pub fn owned_payload(&self) -> Option<Payload> {
        match &self.data {
            DataSlot::Owned(p) => Some(p.clone()),
            _ if self.alloc_mode == AllocMode::Internal => self.resource.clone(),
            _ => None,
        }
    }

    #[inline]
    pub fn holds_payload(&self) -> bool {
        !self.data.is_vacant() || self.resource.is_some()
    }

    /// True if either pointer field refers to `addr`.
    pub fn refers_to(&self, addr: PayloadAddr) -> bool {
        self.data.payload().is_some_and(|p| p.addr() == addr)
            || self.resource.as_ref().is_some_and(|p| p.addr() == addr)
    }

    /// Null every pointer field that refers to `addr`; true if any did.
    pub fn forget(&mut self, addr: PayloadAddr) -> bool {
        let mut hit = false;
        if self.data.payload().is_some_and(|p| p.addr() == addr) {
            self.data = DataSlot::Vacant;
            hit = true;
        }
        if self.resource.as_ref().is_some_and(|p| p.addr() == addr) {
            self.resource = None;
            hit = true;
        }
        hit
    }

    /// Hand the file-like input transport to a reader.
    ///
    /// Stream and descriptor handles can be taken once.
    pub fn take_transport(&mut self) -> Result<Transport> {
        match (self.method, self.handle.take()) {
            (Method::File, handle) => {
                self.handle = handle;
                self.filename.clone().map(Transport::Path).ok_or_else(|| Error::BadMethod {
                    method: Method::File,
                    what: "an object without a file name".into(),
                })
            }
            (Method::Stream, Some(Handle::Reader(r))) => Ok(Transport::Stream(r)),
            (Method::Descriptor, Some(Handle::File(f))) => Ok(Transport::Descriptor(f)),
            (_, handle) => {
                self.handle = handle;
                Err(Error::ReadOnce(self.id))
            }
        }
    }

    /// Hand the file-like output destination to a writer.
    pub fn take_destination(&mut self) -> Result<Destination> {
        match (self.method, self.handle.take()) {
            (Method::File, handle) => {
                self.handle = handle;
                self.filename.clone().map(Destination::Path).ok_or_else(|| Error::BadMethod {
                    method: Method::File,
                    what: "an object without a file name".into(),
                })
            }
            (Method::Stream, Some(Handle::Writer(w))) => Ok(Destination::Stream(w)),
            (Method::Descriptor, Some(Handle::File(f))) => Ok(Destination::Descriptor(f)),
            (_, handle) => {
                self.handle = handle;
                Err(Error::OnlyOnce(self.id))
            }
        }
    }

    /// Public snapshot.
    pub fn info(&self) -> ObjectInfo {
        ObjectInfo {
            id: self.id,
            family: self.family,
            actual_family: self.actual_family,
            geometry: self.geometry,
            direction: self.direction,
            method: self.method,
            via: self.via,
            status: self.status,
            alloc_mode: self.alloc_mode,
            alloc_level: self.alloc_level,
            messenger: self.messenger,
            owner: self.data.is_owned()
                || (self.resource.is_some() && self.alloc_mode == AllocMode::Internal),
            has_resource: self.resource.is_some(),
            has_data: !self.data.is_vacant(),
            filename: self.filename.clone(),
            records: self.rec,
        }
    }
}

/// Read-only snapshot of a descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub family: Family,
    pub actual_family: Family,
    pub geometry: Geometry,
    pub direction: Direction,
    pub method: Method,
    pub via: Via,
    pub status: Status,
    pub alloc_mode: AllocMode,
    pub alloc_level: u32,
    pub messenger: bool,
    /// Releasing this object frees its container
    pub owner: bool,
    pub has_resource: bool,
    pub has_data: bool,
    pub filename: Option<PathBuf>,
    pub records: usize,
}
