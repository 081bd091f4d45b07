//! Bulk import and export: route an object to its transport.
//!
//! File, stream and descriptor transports go to the family's codec. Memory
//! transports copy (`Duplicate`) or alias (`Reference`) the caller's
//! container. Datasets carried by a matrix or vector set are materialized
//! into a real dataset owned by a new object.

use super::descriptor::{DataSlot, Descriptor};
use super::virtual_file::{decode_virtual_name, is_virtual_name};
use super::{record_io, Resource, Session};
use crate::codec::{ExportRequest, ImportRequest};
use crate::core::{
    AllocMode, Direction, Family, Geometry, HeaderMode, Method, ObjectId, Region, Status, Via,
};
use crate::payload::Payload;
use crate::record::{drain, memory_source, DatasetSink};
use crate::util::{Error, Result};

/// Options for one bulk transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoMode {
    /// Mark the object unused first so a file can be read (or written) again
    pub reset: bool,
    /// Pass table headers to the destination
    pub header: HeaderMode,
}

impl IoMode {
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::default()
        }
    }
}

impl Session {
    /// Read a whole object.
    ///
    /// `source` may be a virtual file name, a path (registered on the fly
    /// with `method`), or `None` for the first unused registered input of
    /// `family`. When `container` is given the result is copied into it.
    #[allow(clippy::too_many_arguments)]
    pub fn read_data(
        &mut self,
        family: Family,
        method: Method,
        geometry: Geometry,
        mode: IoMode,
        region: Option<Region>,
        source: Option<&str>,
        container: Option<&Payload>,
    ) -> Result<Payload> {
        self.ensure_live()?;
        let id = match source {
            Some(name) if is_virtual_name(name) => decode_virtual_name(name)?,
            Some(path) => self.register_io(family, method, geometry, Direction::Input, region, Resource::Path(path.into()))?,
            None => self.registry.first_unused(family, Direction::Input).ok_or(Error::NoObjects {
                family,
                direction: Direction::Input,
            })?,
        };
        let payload = self.import_object(id, family, mode)?;
        match container {
            Some(target) => {
                payload.copy_into(target)?;
                Ok(target.clone())
            }
            None => Ok(payload),
        }
    }

    /// Write a whole object.
    ///
    /// `destination` may be a virtual file name, a path, or `None` for the
    /// first unused registered output of `family`.
    #[allow(clippy::too_many_arguments)]
    pub fn write_data(
        &mut self,
        family: Family,
        method: Method,
        geometry: Geometry,
        mode: IoMode,
        region: Option<Region>,
        destination: Option<&str>,
        payload: &Payload,
    ) -> Result<()> {
        self.ensure_live()?;
        let id = match destination {
            Some(name) if is_virtual_name(name) => decode_virtual_name(name)?,
            Some(path) => self.register_io(family, method, geometry, Direction::Output, region, Resource::Path(path.into()))?,
            None => self.registry.first_unused(family, Direction::Output).ok_or(Error::NoObjects {
                family,
                direction: Direction::Output,
            })?,
        };
        self.export_object(id, family, mode, payload)
    }

    /// Import one registered input object.
    pub fn import_object(&mut self, id: ObjectId, family: Family, mode: IoMode) -> Result<Payload> {
        self.ensure_live()?;
        let d = self.registry.find_by_id(id, Some(family), Some(Direction::Input))?;
        if d.method.is_single_read() && d.handle.is_none() {
            return Err(Error::ReadOnce(id));
        }
        if mode.reset {
            d.status = Status::Unused;
        }
        if d.status == Status::Used {
            return Err(Error::ReadOnce(id));
        }
        d.status = Status::InUse;
        let via = d.via;

        let result = match via {
            Via::Matrix | Via::Vector => self.import_via(id),
            Via::None => self.import_direct(id),
        };
        let d = self.registry.get_mut(id)?;
        match &result {
            Ok(_) => d.status = Status::Used,
            Err(e) => {
                tracing::debug!(%id, error = %e, "import failed");
                d.status = Status::Unused;
            }
        }
        result
    }

    fn import_direct(&mut self, id: ObjectId) -> Result<Payload> {
        let level = self.level;
        let pad = self.config.default_pad;
        let binary = self.config.binary_input;
        let d = self.registry.get_mut(id)?;
        let family = d.family;
        match d.method {
            Method::File | Method::Stream | Method::Descriptor => {
                let request = ImportRequest {
                    family,
                    geometry: d.geometry,
                    transport: d.take_transport()?,
                    region: d.region,
                    pad,
                    binary,
                };
                let importer = self.codecs.importer(family, d.method)?;
                let payload = importer.import(request)?;
                tracing::debug!(%id, ?payload, "imported");
                d.data = DataSlot::Owned(payload.clone());
                d.alloc_mode = AllocMode::Internal;
                d.alloc_level = level;
                Ok(payload)
            }
            Method::Duplicate => {
                let source = source_payload(d)?;
                let copy = source.extract(d.region.as_ref(), pad)?;
                // Only the copy is ours; the caller's container keeps its allocation mode.
                d.data = DataSlot::Owned(copy.clone());
                d.alloc_level = level;
                Ok(copy)
            }
            Method::Reference => {
                let source = source_payload(d)?;
                if let Some(region) = d.region {
                    if let Some(original) = source.narrow_view(&region)? {
                        d.pending_view.get_or_insert(original);
                    }
                }
                if d.data.is_vacant() {
                    d.data = DataSlot::Borrowed(source.clone());
                }
                Ok(source)
            }
        }
    }

    /// Materialize a dataset from a raw matrix or vector set.
    ///
    /// The new dataset gets its own owning object; the original only keeps a
    /// borrowed view so collection reaches the new one.
    fn import_via(&mut self, id: ObjectId) -> Result<Payload> {
        let level = self.level;
        let d = self.registry.get_mut(id)?;
        let raw = source_payload(d)?;
        let geometry = d.geometry;
        let mut source = memory_source(&raw)?;
        let mut sink = DatasetSink::new(geometry);
        let dataset = drain(source.as_mut(), &mut sink)?
            .ok_or_else(|| Error::other("adapter produced no dataset"))?;
        d.data = DataSlot::Borrowed(dataset.clone());

        let mut owner = Descriptor::new(Family::Dataset, geometry, Direction::Input, Method::Duplicate);
        owner.data = DataSlot::Owned(dataset.clone());
        owner.alloc_level = level;
        owner.status = Status::Used;
        let owner_id = self.registry.register(owner)?;
        tracing::debug!(%id, %owner_id, via = ?raw.family(), "dataset materialized through adapter");
        Ok(dataset)
    }

    /// Export `payload` through one registered output object.
    pub fn export_object(&mut self, id: ObjectId, family: Family, mode: IoMode, payload: &Payload) -> Result<()> {
        self.ensure_live()?;
        let d = self.registry.find_by_id(id, Some(family), Some(Direction::Output))?;
        if mode.reset {
            d.status = Status::Unused;
        }
        if d.status == Status::Used {
            return Err(Error::OnlyOnce(id));
        }
        d.status = Status::InUse;

        let result = if d.method.is_memory() {
            self.export_memory(id, payload)
        } else {
            self.export_file(id, family, mode, payload)
        };
        let d = self.registry.get_mut(id)?;
        match &result {
            Ok(()) => {
                d.status = Status::Used;
                d.data = DataSlot::Vacant;
                tracing::debug!(%id, ?payload, "exported");
            }
            Err(e) => {
                tracing::debug!(%id, error = %e, "export failed");
                d.status = Status::Unused;
            }
        }
        result
    }

    fn export_file(&mut self, id: ObjectId, family: Family, mode: IoMode, payload: &Payload) -> Result<()> {
        let binary = self.config.binary_output;
        let d = self.registry.get_mut(id)?;
        let request = ExportRequest {
            family,
            destination: d.take_destination()?,
            header: mode.header,
            region: d.region,
            binary,
        };
        let exporter = self.codecs.exporter(family, d.method)?;
        exporter.export(payload, request)
    }

    fn export_memory(&mut self, id: ObjectId, payload: &Payload) -> Result<()> {
        let col_major = self.config.flags.col_major;
        let d = self.registry.get_mut(id)?;
        if d.messenger {
            tracing::trace!(%id, "dropping messenger placeholder");
            d.resource = None;
            d.messenger = false;
            d.alloc_mode = AllocMode::Internal;
        }
        let d_level = d.alloc_level;

        match (&d.resource, d.alloc_mode, d.via) {
            // Raw caller buffers standing in for a dataset are filled record by record.
            (Some(_), _, Via::Matrix | Via::Vector) => {
                let mut sink = record_io::memory_sink(d, col_major);
                drain(memory_source(payload)?.as_mut(), sink.as_mut())?;
                return Ok(());
            }
            (Some(target), AllocMode::External, Via::None) => return payload.copy_into(target),
            _ => {}
        }

        if d.method == Method::Duplicate {
            d.resource = Some(payload.deep_clone());
            d.alloc_mode = AllocMode::Internal;
            return Ok(());
        }

        // Reference: take over ownership from a deeper level, if it has it.
        let addr = payload.addr();
        let alloc = match self
            .registry
            .iter_mut()
            .find(|o| o.id != id && o.data.is_owned() && o.refers_to(addr) && o.alloc_level > d_level)
        {
            Some(owner) => {
                tracing::debug!(from = %owner.id, to = %id, "ownership transferred");
                owner.data.disown();
                AllocMode::Internal
            }
            None => AllocMode::External,
        };
        let d = self.registry.get_mut(id)?;
        d.resource = Some(payload.clone());
        d.alloc_mode = alloc;
        Ok(())
    }
}

/// The container an in-memory object reads from.
fn source_payload(d: &Descriptor) -> Result<Payload> {
    d.payload().cloned().ok_or_else(|| Error::BadMethod {
        method: d.method,
        what: format!("object {} without a container", d.id),
    })
}
