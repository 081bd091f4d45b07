//! Session - the object registry and every operation that works through it.
//!
//! A session owns:
//! - the registry of data objects ([`ObjectInfo`] snapshots are handed out)
//! - the nesting level and its collector ([`ModuleScope`], [`CollectReport`])
//! - the format collaborators ([`Codecs`]) and the release hook
//! - one record I/O machine per direction ([`RecordCounters`], [`RecordMode`])
//! - the virtual file bridge (`open_virtual_file` and friends)
//!
//! # Example
//!
//! ```ignore
//! use resio::prelude::*;
//!
//! let mut session = Session::create("demo", 2, ModeFlags::default(), None);
//! let id = session.register_io(
//!     Family::Dataset, Method::File, Geometry::Point, Direction::Input,
//!     None, Resource::Path("points.txt".into()),
//! )?;
//! session.begin_io(Family::Dataset, Direction::Input, HeaderMode::On)?;
//! loop {
//!     match session.get_record(RecordMode::default())? {
//!         Event::EndOfStream => break,
//!         event => println!("{event:?}"),
//!     }
//! }
//! session.end_io(Direction::Input)?;
//! session.destroy()?;
//! ```

mod descriptor;
mod registry;
mod gc;
mod dispatch;
mod record_io;
mod virtual_file;
mod scope;

pub use descriptor::{DataSlot, ObjectInfo, Resource};
pub use dispatch::IoMode;
pub use gc::CollectReport;
pub use record_io::{RecordCounters, RecordMode};
pub use scope::ModuleScope;
pub use virtual_file::{decode_virtual_name, encode_virtual_name, is_virtual_name, VIRTUAL_PREFIX};

use descriptor::{Descriptor, Handle};
use record_io::{InputState, OutputState};
use registry::Registry;

use crate::codec::{Codecs, DropStorage, ReleaseHook};
use crate::core::{
    AllocMode, Direction, Family, Geometry, Method, ModeFlags, ObjectId, Region, SessionConfig,
    Status, Via,
};
use crate::payload::{
    CoordArray, Dataset, Grid, GridHeader, Image, Matrix, Payload, Registration,
    Shape, TextSegment, TextSet, TextTable, VectorSet,
};
use crate::util::{Column, Error, Result, ValueType};

/// Receives user-facing report lines.
pub type PrintFn = Box<dyn FnMut(&str)>;

/// Shape of a container allocated by [`Session::create_data`].
#[derive(Clone, Debug, PartialEq)]
pub enum DataSpec {
    /// Default (empty) container of the family
    Empty,
    /// Tables of segments of rows (datasets and text sets)
    Table {
        tables: usize,
        segments: usize,
        rows: usize,
        columns: usize,
    },
    /// Grid or image over a region
    Raster {
        region: Region,
        inc: [f64; 2],
        registration: Registration,
        bands: usize,
    },
    Matrix {
        rows: usize,
        columns: usize,
        value_type: ValueType,
    },
    Vectors {
        types: Vec<ValueType>,
        rows: usize,
    },
    Coord {
        start: f64,
        inc: f64,
        n: usize,
    },
}

/// A resource-management session.
pub struct Session {
    config: SessionConfig,
    registry: Registry,
    codecs: Codecs,
    release: Box<dyn ReleaseHook>,
    level: u32,
    input: InputState,
    output: OutputState,
    print: Option<PrintFn>,
    live: bool,
}

impl Session {
    /// Start a session with the given tag, default raster pad and mode flags.
    pub fn create(tag: &str, default_pad: usize, flags: ModeFlags, print: Option<PrintFn>) -> Self {
        Self::with_config(SessionConfig::new(tag, default_pad, flags), print)
    }

    /// Start a session from a full configuration.
    pub fn with_config(config: SessionConfig, print: Option<PrintFn>) -> Self {
        tracing::debug!(tag = %config.tag, pad = config.default_pad, "session created");
        Self {
            config,
            registry: Registry::default(),
            codecs: Codecs::default(),
            release: Box::new(DropStorage),
            level: 0,
            input: InputState::default(),
            output: OutputState::default(),
            print,
            live: true,
        }
    }

    /// Collect everything and shut the session down.
    ///
    /// Every later call fails with [`Error::NotInitialized`].
    pub fn destroy(&mut self) -> Result<CollectReport> {
        self.ensure_live()?;
        let report = self.garbage_collect(0);
        self.live = false;
        self.input = InputState::default();
        self.output = OutputState::default();
        tracing::debug!(tag = %self.config.tag, ?report, "session destroyed");
        Ok(report)
    }

    #[inline]
    fn ensure_live(&self) -> Result<()> {
        if self.live {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current nesting level (0 = top level).
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Format collaborators; install importers/exporters here.
    pub fn codecs_mut(&mut self) -> &mut Codecs {
        &mut self.codecs
    }

    /// Replace the destructor the collector calls.
    pub fn set_release_hook(&mut self, hook: impl ReleaseHook + 'static) {
        self.release = Box::new(hook);
    }

    /// Send a line to the host.
    pub(crate) fn report(&mut self, msg: &str) {
        let line = format!("{}: {msg}", self.config.tag);
        match self.print.as_mut() {
            Some(print) => print(&line),
            None if !self.config.flags.external => eprintln!("{line}"),
            None => {}
        }
    }

    // === Registration ===

    /// Register an input or output object and return its id.
    ///
    /// Family and geometry are checked here once. A container that is already
    /// registered in the same role returns the existing id.
    pub fn register_io(
        &mut self,
        family: Family,
        method: Method,
        geometry: Geometry,
        direction: Direction,
        region: Option<Region>,
        resource: Resource,
    ) -> Result<ObjectId> {
        self.ensure_live()?;
        if !family.accepts(geometry) {
            return Err(Error::BadGeometry { family, geometry });
        }
        let mut d = Descriptor::new(family, geometry, direction, method);
        d.region = region;
        d.alloc_level = self.level;

        match (method, resource, direction) {
            (Method::File, Resource::Path(path), _) => d.filename = Some(path),
            (Method::Stream, Resource::Reader(r), Direction::Input) => d.handle = Some(Handle::Reader(r)),
            (Method::Stream, Resource::Writer(w), Direction::Output) => d.handle = Some(Handle::Writer(w)),
            (Method::Descriptor, Resource::File(f), _) => d.handle = Some(Handle::File(f)),
            (Method::Duplicate | Method::Reference, Resource::Memory(p), _) => {
                let actual = p.family();
                if actual != family && !(family == Family::Dataset && actual.can_masquerade_as_dataset()) {
                    return Err(Error::WrongFamily {
                        expected: family,
                        actual,
                    });
                }
                if let Some(id) = self.registry.find_registered(p.addr(), family, geometry, direction) {
                    tracing::debug!(%id, "container already registered");
                    return Ok(id);
                }
                d.actual_family = actual;
                d.via = Via::for_families(family, actual);
                d.resource = Some(p);
                d.alloc_mode = AllocMode::External;
            }
            (Method::Duplicate | Method::Reference, Resource::None, Direction::Output) => {}
            (method, resource, _) => {
                return Err(Error::BadMethod {
                    method,
                    what: format!("{} for {direction}", resource.kind()),
                });
            }
        }
        self.registry.register(d)
    }

    /// Remove an object from the registry without releasing its container.
    ///
    /// `family` and `direction` check the object first, as in [`Session::lookup`].
    pub fn unregister_io(
        &mut self,
        id: ObjectId,
        family: Option<Family>,
        direction: Option<Direction>,
    ) -> Result<()> {
        self.ensure_live()?;
        self.registry.unregister(id, family, direction).map(|_| ())
    }

    /// Snapshot of one object.
    pub fn object(&self, id: ObjectId) -> Result<ObjectInfo> {
        self.ensure_live()?;
        self.registry.get(id).map(Descriptor::info)
    }

    /// Look an object up with optional family and direction checks.
    ///
    /// A dataset lookup on a matrix or vector set turns it into a dataset.
    pub fn lookup(
        &mut self,
        id: ObjectId,
        family: Option<Family>,
        direction: Option<Direction>,
    ) -> Result<ObjectInfo> {
        self.ensure_live()?;
        self.registry.find_by_id(id, family, direction).map(|d| d.info())
    }

    /// Snapshots of every registered object in registration order.
    pub fn objects(&self) -> Result<Vec<ObjectInfo>> {
        self.ensure_live()?;
        Ok(self.registry.iter().map(Descriptor::info).collect())
    }

    /// Id of the object holding `payload`.
    pub fn find_by_pointer(&self, payload: &Payload, family: Option<Family>) -> Result<Option<ObjectId>> {
        self.ensure_live()?;
        Ok(self.registry.find_by_pointer(payload.addr(), family))
    }

    /// The container an object currently exposes.
    pub fn retrieve_data(&self, id: ObjectId) -> Result<Payload> {
        self.ensure_live()?;
        self.registry
            .get(id)?
            .payload()
            .cloned()
            .ok_or_else(|| Error::NotSupported(format!("object {id} holds no container")))
    }

    /// Mark an object unused so it can be read or written again.
    pub fn reset_object(&mut self, id: ObjectId) -> Result<()> {
        self.ensure_live()?;
        let d = self.registry.get_mut(id)?;
        d.status = Status::Unused;
        d.rec = 0;
        Ok(())
    }

    // === Engine-owned containers ===

    /// Allocate a container owned by the current level.
    pub fn create_data(
        &mut self,
        family: Family,
        geometry: Geometry,
        spec: DataSpec,
    ) -> Result<(ObjectId, Payload)> {
        self.ensure_live()?;
        if !family.accepts(geometry) {
            return Err(Error::BadGeometry { family, geometry });
        }
        let payload = self.allocate(family, geometry, spec)?;
        let id = self.register_owned(family, geometry, payload.clone())?;
        Ok((id, payload))
    }

    /// Deep-copy a container into a new one owned by the current level.
    pub fn duplicate_data(&mut self, payload: &Payload) -> Result<(ObjectId, Payload)> {
        self.ensure_live()?;
        let geometry = match self.registry.find_by_pointer(payload.addr(), None) {
            Some(id) => self.registry.get(id)?.geometry,
            None => default_geometry(payload.family()),
        };
        let copy = payload.deep_clone();
        let id = self.register_owned(payload.family(), geometry, copy.clone())?;
        Ok((id, copy))
    }

    /// Release a container now.
    ///
    /// Only the level that created it may do so; from any other level this
    /// returns [`Error::FreeWrongLevel`] and leaves the object alone.
    pub fn destroy_data(&mut self, payload: &Payload) -> Result<()> {
        self.ensure_live()?;
        let addr = payload.addr();
        let id = self
            .registry
            .find_by_pointer(addr, None)
            .ok_or(Error::NotRegistered(addr))?;
        let d = self.registry.get(id)?;
        if d.alloc_level != self.level {
            let err = Error::FreeWrongLevel {
                id,
                object_level: d.alloc_level,
                current_level: self.level,
            };
            tracing::warn!(error = %err, "destroy_data skipped");
            return Err(err);
        }
        if let Some(owned) = d.owned_payload() {
            self.release.release(id, &owned)?;
            let owned_addr = owned.addr();
            for other in self.registry.iter_mut() {
                other.forget(owned_addr);
            }
        }
        self.registry.remove(id);
        tracing::debug!(%id, "destroyed data");
        Ok(())
    }

    fn register_owned(&mut self, family: Family, geometry: Geometry, payload: Payload) -> Result<ObjectId> {
        let mut d = Descriptor::new(family, geometry, Direction::Input, Method::Reference);
        d.actual_family = payload.family();
        d.data = DataSlot::Owned(payload);
        d.alloc_level = self.level;
        self.registry.register(d)
    }

    fn allocate(&self, family: Family, geometry: Geometry, spec: DataSpec) -> Result<Payload> {
        let pad = self.config.default_pad;
        let shape = if self.config.flags.col_major {
            Shape::ColumnMajor
        } else {
            Shape::RowMajor
        };
        Ok(match (family, spec) {
            (_, DataSpec::Empty) => Payload::empty(family),
            (Family::Dataset, DataSpec::Table { tables, segments, rows, columns }) => {
                Dataset::with_shape(geometry, tables, segments, rows, columns).into()
            }
            (Family::TextSet, DataSpec::Table { tables, segments, rows, .. }) => {
                let segment = TextSegment {
                    header: None,
                    records: vec![String::new(); rows],
                };
                let table = TextTable {
                    header: Vec::new(),
                    segments: vec![segment; segments],
                };
                TextSet {
                    tables: vec![table; tables],
                }
                .into()
            }
            (Family::Grid, DataSpec::Raster { region, inc, registration, .. }) => {
                Grid::new(GridHeader::new(region, inc, registration, pad)?).into()
            }
            (Family::Image, DataSpec::Raster { region, inc, registration, bands }) => {
                Image::new(GridHeader::new(region, inc, registration, pad)?, bands).into()
            }
            (Family::Matrix, DataSpec::Matrix { rows, columns, value_type }) => {
                Matrix::new(value_type, rows, columns, shape).into()
            }
            (Family::VectorSet, DataSpec::Vectors { types, rows }) => {
                VectorSet::from_columns(types.iter().map(|&t| Column::zeros(t, rows)).collect())?.into()
            }
            (Family::Coord, DataSpec::Coord { start, inc, n }) => CoordArray::linspace(start, inc, n).into(),
            (family, spec) => {
                return Err(Error::NotSupported(format!("cannot create {family} from {spec:?}")));
            }
        })
    }

    // === Collection ===

    /// Sweep every object created at `level` or deeper.
    pub fn garbage_collect(&mut self, level: u32) -> CollectReport {
        let report = gc::collect(&mut self.registry, self.release.as_mut(), level);
        tracing::debug!(level, ?report, "collected");
        if report.failed > 0 {
            self.report(&format!("{} object(s) could not be released", report.failed));
        }
        report
    }

    /// Enter a module: raise the nesting level until the guard drops.
    pub fn begin_module(&mut self, name: &str) -> Result<ModuleScope<'_>> {
        self.ensure_live()?;
        self.level += 1;
        tracing::debug!(module = name, level = self.level, "entering module");
        Ok(ModuleScope::new(self, name))
    }

    pub(crate) fn end_module(&mut self, level: u32, name: &str) {
        if self.live {
            let report = self.garbage_collect(level);
            tracing::debug!(module = name, level, released = report.released, "leaving module");
        }
        self.level = level.saturating_sub(1);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.live {
            self.garbage_collect(0);
            self.live = false;
        }
    }
}

/// Geometry used when the engine registers an object on its own.
pub(crate) fn default_geometry(family: Family) -> Geometry {
    match family {
        Family::Grid | Family::Image => Geometry::Surface,
        Family::TextSet | Family::Palette | Family::PostScript | Family::Coord => Geometry::None,
        Family::Dataset | Family::Matrix | Family::VectorSet => Geometry::Plp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session() -> Session {
        Session::create("test", 2, ModeFlags::default(), Some(Box::new(|_: &str| {})))
    }

    #[test]
    fn test_register_checks_geometry_and_method() {
        let mut s = session();
        let err = s
            .register_io(Family::Grid, Method::File, Geometry::Point, Direction::Input, None, Resource::Path("g.nc".into()))
            .unwrap_err();
        assert!(matches!(err, Error::BadGeometry { .. }));
        let err = s
            .register_io(Family::Dataset, Method::File, Geometry::Point, Direction::Input, None, Resource::None)
            .unwrap_err();
        assert!(matches!(err, Error::BadMethod { .. }));
    }

    #[test]
    fn test_register_same_container_twice() {
        let mut s = session();
        let p: Payload = Dataset::from_rows(Geometry::Point, &[&[1.0]]).into();
        let a = s
            .register_io(Family::Dataset, Method::Reference, Geometry::Point, Direction::Input, None, Resource::Memory(p.clone()))
            .unwrap();
        let b = s
            .register_io(Family::Dataset, Method::Reference, Geometry::Point, Direction::Input, None, Resource::Memory(p.clone()))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(s.find_by_pointer(&p, None).unwrap(), Some(a));
        let info = s.object(a).unwrap();
        assert_eq!(info.alloc_mode, AllocMode::External);
        assert!(!info.owner);
    }

    #[test]
    fn test_create_and_destroy_data() {
        let mut s = session();
        let (id, grid) = s
            .create_data(
                Family::Grid,
                Geometry::Surface,
                DataSpec::Raster {
                    region: Region::new(0.0, 10.0, 0.0, 5.0),
                    inc: [1.0, 1.0],
                    registration: Registration::Gridline,
                    bands: 1,
                },
            )
            .unwrap();
        assert_eq!(grid.grid().unwrap().read().header.pad, [2; 4]);
        assert!(s.object(id).unwrap().owner);

        let mut scope = s.begin_module("inner").unwrap();
        let err = scope.destroy_data(&grid).unwrap_err();
        assert!(!err.is_fatal());
        drop(scope);

        s.destroy_data(&grid).unwrap();
        assert!(s.object(id).is_err());
        assert!(matches!(s.destroy_data(&grid), Err(Error::NotRegistered(_))));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut s = session();
        let (_, a) = s
            .create_data(
                Family::Matrix,
                Geometry::Surface,
                DataSpec::Matrix { rows: 2, columns: 2, value_type: ValueType::Int16 },
            )
            .unwrap();
        let (id, b) = s.duplicate_data(&a).unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(s.object(id).unwrap().geometry, Geometry::Surface);
    }

    #[test]
    fn test_destroyed_session_rejects_calls() {
        let mut s = session();
        s.destroy().unwrap();
        assert!(matches!(s.destroy(), Err(Error::NotInitialized)));
        assert!(matches!(s.object(ObjectId(0)), Err(Error::NotInitialized)));
        assert!(matches!(s.objects(), Err(Error::NotInitialized)));
        let p: Payload = Dataset::from_rows(Geometry::Point, &[&[1.0]]).into();
        assert!(matches!(s.find_by_pointer(&p, None), Err(Error::NotInitialized)));
        assert!(matches!(s.unregister_io(ObjectId(0), None, None), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_report_goes_to_callback() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = lines.clone();
        let mut s = Session::create(
            "tagged",
            0,
            ModeFlags::default(),
            Some(Box::new(move |l: &str| sink.borrow_mut().push(l.to_string()))),
        );
        s.report("hello");
        assert_eq!(lines.borrow().as_slice(), &["tagged: hello".to_string()]);
    }
}
