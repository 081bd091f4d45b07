//! Level-scoped collection.
//!
//! Every object created at nesting level `L` or deeper is swept when level
//! `L` is torn down. An owning descriptor releases its container through the
//! [`ReleaseHook`]; every other descriptor pointing at the same address is
//! then nulled so nothing releases it twice. Borrowed and caller-owned
//! containers are only forgotten.

use super::descriptor::DataSlot;
use super::registry::Registry;
use crate::codec::ReleaseHook;
use crate::core::ObjectId;

/// What one collection pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Containers handed to the release hook
    pub released: usize,
    /// Pointer fields nulled without releasing
    pub cleared: usize,
    /// Descriptors removed from the registry
    pub removed: usize,
    /// Release failures; those descriptors stay registered
    pub failed: usize,
}

impl CollectReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub(crate) fn collect(registry: &mut Registry, hook: &mut dyn ReleaseHook, level: u32) -> CollectReport {
    let mut report = CollectReport::default();
    let ids: Vec<ObjectId> = registry
        .iter()
        .filter(|d| d.alloc_level >= level)
        .map(|d| d.id)
        .collect();
    let mut failed = Vec::new();

    for &id in &ids {
        let Ok(d) = registry.get_mut(id) else {
            continue;
        };
        if let Some(view) = d.pending_view.take() {
            if let Some(p) = d.payload() {
                p.restore_view(view);
            }
        }
        if !d.holds_payload() {
            continue;
        }
        let Some(payload) = d.owned_payload() else {
            // Borrowed view or caller-owned container.
            d.data = DataSlot::Vacant;
            d.resource = None;
            report.cleared += 1;
            tracing::trace!(%id, "cleared non-owning reference");
            continue;
        };

        if let Err(e) = hook.release(id, &payload) {
            tracing::warn!(%id, error = %e, "release failed; object left registered");
            report.failed += 1;
            failed.push(id);
            continue;
        }
        report.released += 1;
        tracing::debug!(%id, ?payload, level, "released");

        let addr = payload.addr();
        for other in registry.iter_mut() {
            if other.forget(addr) && other.id != id {
                report.cleared += 1;
            }
        }
    }

    for id in ids {
        if failed.contains(&id) {
            continue;
        }
        if registry.get(id).is_ok_and(|d| !d.holds_payload()) {
            registry.remove(id);
            report.removed += 1;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AllocMode, Direction, Family, Geometry, Method};
    use crate::payload::Payload;
    use crate::payload::TextSet;
    use crate::session::descriptor::Descriptor;
    use crate::util::{Error, Result};

    #[derive(Default)]
    struct Counting {
        calls: Vec<ObjectId>,
        fail: bool,
    }

    impl ReleaseHook for Counting {
        fn release(&mut self, id: ObjectId, payload: &Payload) -> Result<()> {
            if self.fail {
                return Err(Error::other("destructor failed"));
            }
            self.calls.push(id);
            payload.release_storage();
            Ok(())
        }
    }

    fn add(reg: &mut Registry, level: u32, data: DataSlot, resource: Option<Payload>) -> ObjectId {
        let mut d = Descriptor::new(Family::TextSet, Geometry::None, Direction::Input, Method::Reference);
        d.alloc_level = level;
        d.data = data;
        d.resource = resource;
        d.alloc_mode = AllocMode::External;
        reg.register(d).unwrap()
    }

    #[test]
    fn test_aliased_payload_released_once() {
        let mut reg = Registry::default();
        let p: Payload = TextSet::from_lines(&["x"]).into();
        add(&mut reg, 1, DataSlot::Borrowed(p.clone()), None);
        let owner = add(&mut reg, 1, DataSlot::Owned(p.clone()), None);
        add(&mut reg, 1, DataSlot::Vacant, Some(p.clone()));

        let mut hook = Counting::default();
        let report = collect(&mut reg, &mut hook, 1);
        assert_eq!(hook.calls, vec![owner]);
        assert_eq!(report.released, 1);
        assert_eq!(report.removed, 3);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_level_scope() {
        let mut reg = Registry::default();
        let keep = add(&mut reg, 0, DataSlot::Owned(TextSet::default().into()), None);
        add(&mut reg, 2, DataSlot::Owned(TextSet::default().into()), None);
        let mut hook = Counting::default();
        collect(&mut reg, &mut hook, 1);
        assert_eq!(hook.calls.len(), 1);
        assert!(reg.get(keep).is_ok());
        collect(&mut reg, &mut hook, 0);
        assert_eq!(hook.calls.len(), 2);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_failed_release_stays_registered() {
        let mut reg = Registry::default();
        let id = add(&mut reg, 0, DataSlot::Owned(TextSet::default().into()), None);
        add(&mut reg, 0, DataSlot::Vacant, None);
        let mut hook = Counting {
            fail: true,
            ..Counting::default()
        };
        let report = collect(&mut reg, &mut hook, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.removed, 1);
        assert!(reg.get(id).is_ok());
        assert!(!report.is_clean());
    }
}
