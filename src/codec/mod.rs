//! Format collaborators.
//!
//! The engine never decodes a format itself. File, stream and descriptor
//! transports are handed to an [`Importer`] or [`Exporter`] registered for the
//! object's family in a [`Codecs`] table. The text/binary table codec for
//! datasets and text sets is installed by default; rasters, palettes and
//! documents need a collaborator supplied by the host.
//!
//! Releasing a payload is delegated the same way, through a [`ReleaseHook`].

mod table;

pub use table::{open_sink, open_source, TableCodec};

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::{BinaryLayout, Family, Geometry, HeaderMode, Method, ObjectId, Region};
use crate::payload::Payload;
use crate::util::{Error, Result};

/// Where imported bytes come from. Handles are consumed by the import.
pub enum Transport {
    Path(PathBuf),
    Stream(Box<dyn BufRead>),
    Descriptor(File),
}

impl Transport {
    pub fn method(&self) -> Method {
        match self {
            Self::Path(_) => Method::File,
            Self::Stream(_) => Method::Stream,
            Self::Descriptor(_) => Method::Descriptor,
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "Path({})", p.display()),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Descriptor(file) => write!(f, "Descriptor({file:?})"),
        }
    }
}

/// Where exported bytes go.
pub enum Destination {
    Path(PathBuf),
    Stream(Box<dyn Write>),
    Descriptor(File),
}

impl Destination {
    pub fn method(&self) -> Method {
        match self {
            Self::Path(_) => Method::File,
            Self::Stream(_) => Method::Stream,
            Self::Descriptor(_) => Method::Descriptor,
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "Path({})", p.display()),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Descriptor(file) => write!(f, "Descriptor({file:?})"),
        }
    }
}

/// Everything an importer needs to materialize one object.
#[derive(Debug)]
pub struct ImportRequest {
    pub family: Family,
    pub geometry: Geometry,
    pub transport: Transport,
    /// Subregion to keep (rasters)
    pub region: Option<Region>,
    /// Pad rows/columns for rasters
    pub pad: usize,
    /// Binary record layout, when the input is not text
    pub binary: Option<BinaryLayout>,
}

/// Everything an exporter needs to write one object.
#[derive(Debug)]
pub struct ExportRequest {
    pub family: Family,
    pub destination: Destination,
    pub header: HeaderMode,
    pub region: Option<Region>,
    pub binary: Option<BinaryLayout>,
}

/// Reads one family from a file-like transport.
pub trait Importer {
    fn import(&self, request: ImportRequest) -> Result<Payload>;
}

/// Writes one family to a file-like destination.
pub trait Exporter {
    fn export(&self, payload: &Payload, request: ExportRequest) -> Result<()>;
}

/// Per-family importer/exporter table.
#[derive(Clone)]
pub struct Codecs {
    importers: HashMap<Family, Arc<dyn Importer>>,
    exporters: HashMap<Family, Arc<dyn Exporter>>,
}

impl Default for Codecs {
    fn default() -> Self {
        let table = Arc::new(TableCodec);
        let mut codecs = Self::empty();
        for family in [Family::Dataset, Family::TextSet] {
            codecs.importers.insert(family, table.clone());
            codecs.exporters.insert(family, table.clone());
        }
        codecs
    }
}

impl Codecs {
    /// Table with nothing installed.
    pub fn empty() -> Self {
        Self {
            importers: HashMap::new(),
            exporters: HashMap::new(),
        }
    }

    /// Install (or replace) the importer for `family`.
    pub fn set_importer(&mut self, family: Family, importer: impl Importer + 'static) {
        self.importers.insert(family, Arc::new(importer));
    }

    /// Install (or replace) the exporter for `family`.
    pub fn set_exporter(&mut self, family: Family, exporter: impl Exporter + 'static) {
        self.exporters.insert(family, Arc::new(exporter));
    }

    pub fn importer(&self, family: Family, method: Method) -> Result<Arc<dyn Importer>> {
        self.importers
            .get(&family)
            .cloned()
            .ok_or(Error::NoCodec { family, method })
    }

    pub fn exporter(&self, family: Family, method: Method) -> Result<Arc<dyn Exporter>> {
        self.exporters
            .get(&family)
            .cloned()
            .ok_or(Error::NoCodec { family, method })
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codecs")
            .field("importers", &self.importers.keys().collect::<Vec<_>>())
            .field("exporters", &self.exporters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Family-specific destructor run by the collector.
///
/// An error leaves the object registered; the collector logs it and moves on.
pub trait ReleaseHook {
    fn release(&mut self, id: ObjectId, payload: &Payload) -> Result<()>;
}

/// Default hook: empty the container in place.
#[derive(Clone, Copy, Debug, Default)]
pub struct DropStorage;

impl ReleaseHook for DropStorage {
    fn release(&mut self, id: ObjectId, payload: &Payload) -> Result<()> {
        tracing::trace!(%id, ?payload, "releasing storage");
        payload.release_storage();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_codecs() {
        let codecs = Codecs::default();
        assert!(codecs.importer(Family::Dataset, Method::File).is_ok());
        assert!(codecs.exporter(Family::TextSet, Method::Stream).is_ok());
        assert!(matches!(
            codecs.importer(Family::Grid, Method::File),
            Err(Error::NoCodec { family: Family::Grid, .. })
        ));
    }

    #[test]
    fn test_drop_storage_empties_payload() {
        let p: Payload = crate::payload::TextSet::from_lines(&["a", "b"]).into();
        DropStorage.release(ObjectId(0), &p).unwrap();
        assert_eq!(p.n_records(), 0);
    }
}
