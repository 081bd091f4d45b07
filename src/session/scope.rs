//! Module scopes: one nesting level per guard.

use std::ops::{Deref, DerefMut};

use super::Session;

/// Guard for one module invocation.
///
/// Derefs to the session. Dropping it collects everything created at its
/// level and steps back out.
pub struct ModuleScope<'s> {
    session: &'s mut Session,
    level: u32,
    name: String,
}

impl<'s> ModuleScope<'s> {
    pub(crate) fn new(session: &'s mut Session, name: &str) -> Self {
        let level = session.level();
        Self {
            session,
            level,
            name: name.to_string(),
        }
    }

    /// Level this scope tears down.
    #[inline]
    pub fn scope_level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Deref for ModuleScope<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for ModuleScope<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for ModuleScope<'_> {
    fn drop(&mut self) {
        self.session.end_module(self.level, &self.name);
    }
}
