//! The mapping between type names and host types.

use entity::TypedName;
use std::{
    any::{type_name, Any, TypeId},
    fmt,
    sync::{Arc, RwLock},
};
use utility::{default, HashMap};

/// A Rust type implementing a named type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HostType {
    id: TypeId,
    name: &'static str,
}

impl HostType {
    pub fn of<T: Any>() -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>() }
    }

    pub fn id(self) -> TypeId {
        self.id
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A bidirectional mapping between type names and host types.
///
/// A registry created by [`Self::child`] sees the mappings of its parent. Its own
/// mappings are invisible to the parent.
#[derive(Default)]
pub struct ImplementationRegistry {
    parent: Option<Arc<ImplementationRegistry>>,
    mappings: RwLock<Mappings>,
}

#[derive(Default)]
struct Mappings {
    types: HashMap<String, (TypedName, HostType)>,
    hosts: HashMap<TypeId, TypedName>,
}

impl ImplementationRegistry {
    pub fn child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self { parent: Some(self.clone()), mappings: default() })
    }

    /// Map the given name to the given host type and vice versa.
    ///
    /// Registering a mapping again is fine. Mapping either side to something else is not.
    pub fn register(&self, name: &TypedName, host: HostType) -> Result<(), Conflict> {
        if let Some(present) = self.host_for(name) {
            if present != host {
                return Err(Conflict::Type { name: name.clone(), present });
            }
        }

        if let Some(present) = self.name_for(host.id) {
            if present.map_key() != name.map_key() {
                return Err(Conflict::Host { host, present });
            }
        }

        let mut mappings = self.mappings.write().unwrap();
        mappings
            .types
            .insert(name.map_key().to_owned(), (name.clone(), host));
        mappings.hosts.insert(host.id, name.clone());
        Ok(())
    }

    pub fn host_for(&self, name: &TypedName) -> Option<HostType> {
        let host = self
            .mappings
            .read()
            .unwrap()
            .types
            .get(name.map_key())
            .map(|&(_, host)| host);

        host.or_else(|| self.parent.as_ref()?.host_for(name))
    }

    pub fn name_for(&self, id: TypeId) -> Option<TypedName> {
        let name = self.mappings.read().unwrap().hosts.get(&id).cloned();

        name.or_else(|| self.parent.as_ref()?.name_for(id))
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Conflict {
    /// The type is already implemented by another host type.
    Type { name: TypedName, present: HostType },
    /// The host type already implements another type.
    Host { host: HostType, present: TypedName },
}
