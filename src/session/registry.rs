//! Object registry: descriptors keyed by a monotonic id.
//!
//! Ids come from a counter that only moves forward, so a removed entry never
//! hands its id to a later one. The map keeps registration order for
//! "first unused object" scans.

use std::collections::BTreeMap;

use super::descriptor::Descriptor;
use crate::core::{Direction, Family, Geometry, ObjectId, Status, Via};
use crate::payload::PayloadAddr;
use crate::util::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct Registry {
    objects: BTreeMap<ObjectId, Descriptor>,
    next_id: u32,
}

impl Registry {
    /// Add a descriptor and assign its id.
    pub fn register(&mut self, mut descriptor: Descriptor) -> Result<ObjectId> {
        let id = ObjectId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| Error::OutOfMemory("object ids exhausted".into()))?;
        descriptor.id = id;
        tracing::debug!(
            %id,
            family = %descriptor.family,
            geometry = %descriptor.geometry,
            direction = %descriptor.direction,
            method = %descriptor.method,
            level = descriptor.alloc_level,
            "registered object"
        );
        self.objects.insert(id, descriptor);
        Ok(id)
    }

    /// Look up `id`, checking direction and family when given.
    ///
    /// A dataset request matches a matrix or vector set and rewrites its
    /// family to dataset for good.
    pub fn find_by_id(
        &mut self,
        id: ObjectId,
        family: Option<Family>,
        direction: Option<Direction>,
    ) -> Result<&mut Descriptor> {
        let d = self.objects.get_mut(&id).ok_or(Error::NotAValidId(id))?;
        match (direction, d.direction) {
            (Some(Direction::Input), Direction::Output) => return Err(Error::NotInputObject(id)),
            (Some(Direction::Output), Direction::Input) => return Err(Error::NotOutputObject(id)),
            _ => {}
        }
        if let Some(wanted) = family {
            if wanted == Family::Dataset && d.family.can_masquerade_as_dataset() {
                tracing::debug!(%id, actual = %d.family, "object now serves as a dataset");
                d.family = Family::Dataset;
                d.via = Via::for_families(Family::Dataset, d.actual_family);
            } else if wanted != d.family {
                return Err(Error::WrongFamily {
                    expected: wanted,
                    actual: d.family,
                });
            }
        }
        Ok(d)
    }

    /// Id of the first object whose data or resource is at `addr`.
    pub fn find_by_pointer(&self, addr: PayloadAddr, family: Option<Family>) -> Option<ObjectId> {
        self.objects
            .values()
            .filter(|d| family.map_or(true, |f| f == d.family || f == d.actual_family))
            .find(|d| d.refers_to(addr))
            .map(|d| d.id)
    }

    /// Id of an object already registered for this exact container and role.
    pub fn find_registered(
        &self,
        addr: PayloadAddr,
        family: Family,
        geometry: Geometry,
        direction: Direction,
    ) -> Option<ObjectId> {
        self.objects
            .values()
            .find(|d| {
                d.family == family
                    && d.geometry == geometry
                    && d.direction == direction
                    && d.resource.as_ref().is_some_and(|p| p.addr() == addr)
            })
            .map(|d| d.id)
    }

    /// Remove a descriptor; its payload is not released.
    pub fn unregister(
        &mut self,
        id: ObjectId,
        family: Option<Family>,
        direction: Option<Direction>,
    ) -> Result<Descriptor> {
        self.find_by_id(id, family, direction)?;
        let d = self.objects.remove(&id).ok_or(Error::NotAValidId(id))?;
        tracing::debug!(%id, family = %d.family, "unregistered object");
        Ok(d)
    }

    /// First object of `family` and `direction` that has not been used yet.
    pub fn first_unused(&self, family: Family, direction: Direction) -> Option<ObjectId> {
        self.unused(family, direction).next()
    }

    /// Unused objects of `family` and `direction` in registration order.
    pub fn unused(&self, family: Family, direction: Direction) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .values()
            .filter(move |d| {
                d.direction == direction
                    && d.status == Status::Unused
                    && (d.family == family
                        || (family == Family::Dataset && d.family.can_masquerade_as_dataset()))
            })
            .map(|d| d.id)
    }

    #[inline]
    pub fn get(&self, id: ObjectId) -> Result<&Descriptor> {
        self.objects.get(&id).ok_or(Error::NotAValidId(id))
    }

    #[inline]
    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut Descriptor> {
        self.objects.get_mut(&id).ok_or(Error::NotAValidId(id))
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Descriptor> {
        self.objects.remove(&id)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.objects.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Descriptor> {
        self.objects.values_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
