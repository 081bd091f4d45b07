//! Virtual files: in-memory objects published under a file-like name.
//!
//! A name is `@RESIO@-` followed by the zero-padded object id. Nested code
//! that only takes file names passes it through `read_data`/`write_data`,
//! which decode it back to the id.

use super::{DataSlot, Resource, Session};
use crate::core::{AllocMode, Direction, Family, Geometry, Method, ObjectId, Status, Via};
use crate::payload::Payload;
use crate::util::{Error, Result};

pub const VIRTUAL_PREFIX: &str = "@RESIO@-";

const ID_DIGITS: usize = 6;

/// Name under which object `id` is published.
pub fn encode_virtual_name(id: ObjectId) -> String {
    format!("{VIRTUAL_PREFIX}{:0width$}", id.0, width = ID_DIGITS)
}

#[inline]
pub fn is_virtual_name(name: &str) -> bool {
    name.starts_with(VIRTUAL_PREFIX)
}

/// Object id encoded in `name`.
pub fn decode_virtual_name(name: &str) -> Result<ObjectId> {
    let bad = || Error::BadVirtualFileName(name.to_string());
    let digits = name.strip_prefix(VIRTUAL_PREFIX).ok_or_else(bad)?;
    if digits.len() != ID_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    digits.parse().map(ObjectId).map_err(|_| bad())
}

impl Session {
    /// Publish a container (or an empty output placeholder) as a virtual file.
    ///
    /// Input needs a payload. Output without one registers a messenger whose
    /// placeholder is replaced by whatever gets written.
    pub fn open_virtual_file(
        &mut self,
        family: Family,
        geometry: Geometry,
        direction: Direction,
        payload: Option<Payload>,
    ) -> Result<String> {
        self.ensure_live()?;
        let before = self.registry.len();
        let id = match (direction, payload) {
            (Direction::Input, Some(p)) => {
                let id = self.register_io(family, Method::Reference, geometry, direction, None, Resource::Memory(p))?;
                self.registry.get_mut(id)?.status = Status::Unused;
                id
            }
            (Direction::Input, None) => {
                return Err(Error::BadMethod {
                    method: Method::Reference,
                    what: "a virtual input without a container".into(),
                });
            }
            (Direction::Output, Some(p)) => {
                self.register_io(family, Method::Reference, geometry, direction, None, Resource::Memory(p))?
            }
            (Direction::Output, None) => {
                let id = self.register_io(family, Method::Reference, geometry, direction, None, Resource::None)?;
                let d = self.registry.get_mut(id)?;
                d.resource = Some(Payload::empty(family));
                d.alloc_mode = AllocMode::Internal;
                d.messenger = true;
                id
            }
        };
        if id.0 > self.config.max_virtual_id {
            if self.registry.len() > before {
                self.registry.remove(id);
            }
            return Err(Error::OutOfMemory("virtual file ids".into()));
        }
        let name = encode_virtual_name(id);
        tracing::debug!(%id, %name, %direction, "virtual file opened");
        Ok(name)
    }

    /// Claim the container produced under `name`.
    ///
    /// Works once; the object then owns (or borrows) the container at the
    /// current level and a second claim fails.
    pub fn read_virtual_file(&mut self, name: &str) -> Result<Payload> {
        self.ensure_live()?;
        let id = decode_virtual_name(name)?;
        let level = self.level;
        let d = self.registry.get_mut(id)?;
        if !d.data.is_vacant() || d.resource.is_none() {
            return Err(Error::AlreadyClaimed(name.to_string()));
        }
        let Some(payload) = d.resource.take() else {
            return Err(Error::AlreadyClaimed(name.to_string()));
        };
        d.data = match d.alloc_mode {
            AllocMode::Internal => DataSlot::Owned(payload.clone()),
            AllocMode::External => DataSlot::Borrowed(payload.clone()),
        };
        d.alloc_level = level;
        d.messenger = false;
        tracing::debug!(%id, %name, level, "virtual file claimed");
        Ok(payload)
    }

    /// Undo the open-time changes of a virtual input.
    pub fn close_virtual_file(&mut self, name: &str) -> Result<()> {
        self.ensure_live()?;
        let id = decode_virtual_name(name)?;
        let d = self.registry.get_mut(id)?;
        if d.direction == Direction::Input {
            let data = std::mem::take(&mut d.data);
            if d.resource.is_none() {
                d.resource = data.payload().cloned();
            }
            d.family = d.actual_family;
            d.via = Via::None;
        }
        tracing::debug!(%id, %name, "virtual file closed");
        Ok(())
    }

    /// Make a virtual file readable or writable again.
    pub fn reinit_virtual_file(&mut self, name: &str) -> Result<()> {
        self.ensure_live()?;
        let id = decode_virtual_name(name)?;
        let d = self.registry.get_mut(id)?;
        d.status = Status::Unused;
        d.rec = 0;
        d.selected = false;
        Ok(())
    }
}
