//! # resio
//!
//! Session resource manager and generic I/O engine.
//!
//! A [`Session`](session::Session) keeps a registry of data objects (files,
//! streams, descriptors and in-memory containers), reads and writes them in
//! bulk or record by record, and releases what it allocated when the module
//! nesting level that allocated it ends.
//!
//! ## Modules
//!
//! - [`util`] - Value types, typed columns, errors
//! - [`core`] - Object vocabulary, regions, configuration
//! - [`payload`] - Data containers (datasets, grids, matrices, ...)
//! - [`record`] - Record events, text and binary record formats, sources and sinks
//! - [`codec`] - Format collaborators and the built-in table codec
//! - [`session`] - Registry, collector, dispatcher, record I/O, virtual files
//!
//! ## Example
//!
//! ```ignore
//! use resio::prelude::*;
//!
//! let mut session = Session::create("demo", 2, ModeFlags::default(), None);
//! let data = session.read_data(
//!     Family::Dataset, Method::File, Geometry::Point, IoMode::default(),
//!     None, Some("points.txt"), None,
//! )?;
//! println!("{} records", data.n_records());
//! session.destroy()?;
//! ```

pub mod util;
pub mod core;
pub mod payload;
pub mod record;
pub mod codec;
pub mod session;

// Re-export commonly used types
pub use util::{Error, Result};
pub use session::Session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Column, Error, Result, ValueType};
    pub use crate::core::{
        AllocMode, Direction, Family, Geometry, HeaderMode, Method, ModeFlags, ObjectId, Region,
        SessionConfig, Status,
    };
    pub use crate::payload::{Dataset, Grid, Matrix, Payload, Shape, TextSet, VectorSet};
    pub use crate::record::{Event, Record};
    pub use crate::session::{
        CollectReport, DataSpec, IoMode, ModuleScope, ObjectInfo, RecordCounters, RecordMode,
        Resource, Session,
    };
}
