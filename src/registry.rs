//! Per-connection identity map for entity views.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{Device, Structure, User, UserSettings};

/// The kinds of entity view a connection hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    UserSettings,
    Device,
    Structure,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::UserSettings => "user_settings",
            EntityKind::Device => "device",
            EntityKind::Structure => "structure",
        }
    }

    /// Strips the `<kind>.` prefix the service puts on cross-references.
    ///
    /// ```
    /// use nest_client::EntityKind;
    ///
    /// assert_eq!(EntityKind::Structure.normalize_id("structure.abc"), "abc");
    /// assert_eq!(EntityKind::Structure.normalize_id("abc"), "abc");
    /// ```
    pub fn normalize_id(self, id: &str) -> &str {
        id.strip_prefix(self.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(id)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memoized views, at most one per kind and normalized identifier.
///
/// Callers normalize identifiers before lookup.
#[derive(Debug, Default)]
pub(crate) struct EntityRegistry {
    users: HashMap<String, Arc<User>>,
    user_settings: HashMap<String, Arc<UserSettings>>,
    devices: HashMap<String, Arc<Device>>,
    structures: HashMap<String, Arc<Structure>>,
}

impl EntityRegistry {
    pub(crate) fn user(&mut self, id: &str, make: impl FnOnce(String) -> User) -> Arc<User> {
        intern(&mut self.users, id, make)
    }

    pub(crate) fn user_settings(
        &mut self,
        id: &str,
        make: impl FnOnce(String) -> UserSettings,
    ) -> Arc<UserSettings> {
        intern(&mut self.user_settings, id, make)
    }

    pub(crate) fn device(&mut self, id: &str, make: impl FnOnce(String) -> Device) -> Arc<Device> {
        intern(&mut self.devices, id, make)
    }

    pub(crate) fn structure(
        &mut self,
        id: &str,
        make: impl FnOnce(String) -> Structure,
    ) -> Arc<Structure> {
        intern(&mut self.structures, id, make)
    }

    /// Number of live views of each kind.
    #[cfg(test)]
    fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::User => self.users.len(),
            EntityKind::UserSettings => self.user_settings.len(),
            EntityKind::Device => self.devices.len(),
            EntityKind::Structure => self.structures.len(),
        }
    }
}

fn intern<T>(views: &mut HashMap<String, Arc<T>>, id: &str, make: impl FnOnce(String) -> T) -> Arc<T> {
    if let Some(existing) = views.get(id) {
        return Arc::clone(existing);
    }

    let view = Arc::new(make(id.to_string()));
    views.insert(id.to_string(), Arc::clone(&view));
    view
}
