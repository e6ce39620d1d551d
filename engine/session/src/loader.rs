//! Resolution stores and their slots.

use crate::Context;
use diagnostics::{error::Result, Diagnostic, ErasedReportedError, ErrorCode};
use entity::{runtime_authority, Entity, Namespace, Type, TypedName};
use std::sync::{Arc, RwLock};
use url::Url;
use utility::{HashMap, QuoteExt};

/// A resolver of names to entities.
///
/// A loader never returns a different entity for the same name on two calls.
pub trait Loader: Send + Sync {
    /// Resolve the given name filling the resolution slot on a cache miss.
    ///
    /// Misses are cached as well and never recomputed.
    fn load_entry(&self, cx: &mut Context, name: &TypedName) -> Entry;

    /// The resolution slot of the given name visible through this loader, without computing it.
    fn get_entry(&self, name: &TypedName) -> Option<Entry>;

    /// Register an entity under the given name.
    ///
    /// Registering an entity equal to the present one keeps the present one.
    /// Registering a different one is a hard failure.
    fn set_entry(&self, cx: &Context, name: &TypedName, entity: Entity) -> Result<Entity>;

    /// Replace the resolution slot of the given name with a hard failure.
    ///
    /// Used when the request that registered an entity fails afterwards.
    fn fail_entry(&self, name: &TypedName, error: ErasedReportedError);

    /// All names this loader could resolve that match the predicate, sorted by their map keys.
    fn discover(
        &self,
        cx: &mut Context,
        predicate: &dyn Fn(&TypedName) -> bool,
    ) -> Result<Vec<TypedName>>;

    fn has_entry(&self, name: &TypedName) -> bool {
        self.get_entry(name).is_some_and(|entry| entry.is_found())
    }

    fn resolve(&self, cx: &mut Context, name: &TypedName) -> Result<Option<Entity>> {
        self.load_entry(cx, name).into_result()
    }

    fn name_authority(&self) -> Url {
        runtime_authority()
    }
}

/// The content of a resolution slot.
#[derive(Clone, Debug)]
pub enum Entry {
    Found(Entity),
    Missing,
    /// A hard failure that was already reported.
    Failed(ErasedReportedError),
}

impl Entry {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Self::Found(entity) => Some(entity),
            Self::Missing | Self::Failed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Option<Entity>> {
        match self {
            Self::Found(entity) => Ok(Some(entity)),
            Self::Missing => Ok(None),
            Self::Failed(error) => Err(error),
        }
    }
}

impl From<Result<Option<Entity>>> for Entry {
    fn from(result: Result<Option<Entity>>) -> Self {
        match result {
            Ok(Some(entity)) => Self::Found(entity),
            Ok(None) => Self::Missing,
            Err(error) => Self::Failed(error),
        }
    }
}

/// The resolution slots of a single loader.
///
/// Slots are written at most once: concurrent writers of the same slot agree on
/// whatever was written first. The only exception is [`Self::fail`], which turns the
/// slots written by a request that failed later on into failures.
#[derive(Default)]
pub struct Entries {
    slots: RwLock<HashMap<String, Slot>>,
}

struct Slot {
    name: TypedName,
    entry: Entry,
}

impl Entries {
    pub fn get(&self, name: &TypedName) -> Option<Entry> {
        self.slots
            .read()
            .unwrap()
            .get(name.map_key())
            .map(|slot| slot.entry.clone())
    }

    /// Write the slot unless it was written before and return its content.
    pub fn settle(&self, name: &TypedName, entry: Entry) -> Entry {
        self.slots
            .write()
            .unwrap()
            .entry(name.map_key().to_owned())
            .or_insert_with(|| Slot { name: name.clone(), entry })
            .entry
            .clone()
    }

    /// Record a hard failure replacing whatever the slot holds.
    pub fn fail(&self, name: &TypedName, error: ErasedReportedError) {
        tracing::trace!(name = %name, "recording a failure");
        let slot = Slot { name: name.clone(), entry: Entry::Failed(error) };
        self.slots.write().unwrap().insert(name.map_key().to_owned(), slot);
    }

    /// Register an entity checking for conflicting definitions.
    ///
    /// An explicit definition takes precedence over a cached miss.
    pub fn define(&self, cx: &Context, name: &TypedName, entity: Entity) -> Result<Entity> {
        let mut slots = self.slots.write().unwrap();

        let present = match slots.get(name.map_key()).map(|slot| &slot.entry) {
            Some(Entry::Found(present)) => present.clone(),
            Some(&Entry::Failed(error)) => return Err(error),
            Some(Entry::Missing) | None => {
                tracing::trace!(name = %name, kind = entity.kind(), "registering");
                let slot = Slot { name: name.clone(), entry: Entry::Found(entity.clone()) };
                slots.insert(name.map_key().to_owned(), slot);
                return Ok(entity);
            }
        };
        drop(slots);

        if present.is_same(&entity) || present == entity {
            return Ok(present);
        }

        Err(redefinition_error(cx, name, &present, &entity))
    }

    /// The names of all found entries matching the predicate.
    pub fn names(&self, predicate: &dyn Fn(&TypedName) -> bool) -> Vec<TypedName> {
        self.slots
            .read()
            .unwrap()
            .values()
            .filter(|slot| slot.entry.is_found() && predicate(&slot.name))
            .map(|slot| slot.name.clone())
            .collect()
    }
}

fn redefinition_error(
    cx: &Context,
    name: &TypedName,
    present: &Entity,
    entity: &Entity,
) -> ErasedReportedError {
    Diagnostic::error()
        .code(ErrorCode::E006)
        .message(format!(
            "attempt to redefine the {} {} with a different definition",
            present.kind(),
            name.quote(),
        ))
        .location(entity.origin().clone())
        .argument("name", name)
        .argument("namespace", name.namespace())
        .argument("first_origin", present.origin())
        .argument("second_origin", entity.origin())
        .note(format!("the first definition is located at {}", present.origin()))
        .report(cx.rep())
}

/// The in-memory store holding the built-in definitions.
///
/// It never computes anything: names it does not know are misses.
pub struct StaticLoader {
    entries: Entries,
}

impl StaticLoader {
    /// Create the store seeded with the built-in types.
    pub fn new() -> Self {
        let entries = Entries::default();

        for name in BUILTIN_TYPES {
            let type_ = Type::builtin(name);
            let name = type_.name.clone();
            entries.settle(&name, Entry::Found(Entity::Type(Arc::new(type_))));
        }

        Self { entries }
    }

    pub fn empty() -> Self {
        Self { entries: Entries::default() }
    }
}

impl Default for StaticLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader for StaticLoader {
    fn load_entry(&self, _: &mut Context, name: &TypedName) -> Entry {
        self.entries.get(name).unwrap_or(Entry::Missing)
    }

    fn get_entry(&self, name: &TypedName) -> Option<Entry> {
        self.entries.get(name)
    }

    fn set_entry(&self, cx: &Context, name: &TypedName, entity: Entity) -> Result<Entity> {
        self.entries.define(cx, name, entity)
    }

    fn fail_entry(&self, name: &TypedName, error: ErasedReportedError) {
        self.entries.fail(name, error);
    }

    fn discover(
        &self,
        _: &mut Context,
        predicate: &dyn Fn(&TypedName) -> bool,
    ) -> Result<Vec<TypedName>> {
        let mut names = self.entries.names(predicate);
        names.sort();
        Ok(names)
    }
}

/// A store delegating misses to its parent.
///
/// Registrations go into the store itself and are invisible to the parent. Answers of
/// the parent are cached so that they stay stable for the lifetime of this store.
pub struct ParentedLoader {
    parent: Arc<dyn Loader>,
    entries: Entries,
}

impl ParentedLoader {
    pub fn new(parent: Arc<dyn Loader>) -> Self {
        Self { parent, entries: Entries::default() }
    }

    pub fn parent(&self) -> &Arc<dyn Loader> {
        &self.parent
    }
}

impl Loader for ParentedLoader {
    fn load_entry(&self, cx: &mut Context, name: &TypedName) -> Entry {
        if let Some(entry) = self.entries.get(name) {
            return entry;
        }

        let entry = self.parent.load_entry(cx, name);
        self.entries.settle(name, entry)
    }

    fn get_entry(&self, name: &TypedName) -> Option<Entry> {
        self.entries
            .get(name)
            .or_else(|| self.parent.get_entry(name))
    }

    fn set_entry(&self, cx: &Context, name: &TypedName, entity: Entity) -> Result<Entity> {
        self.entries.define(cx, name, entity)
    }

    fn fail_entry(&self, name: &TypedName, error: ErasedReportedError) {
        self.entries.fail(name, error);
    }

    fn discover(
        &self,
        cx: &mut Context,
        predicate: &dyn Fn(&TypedName) -> bool,
    ) -> Result<Vec<TypedName>> {
        let mut names = self.parent.discover(cx, predicate)?;
        let parent = &self.parent;
        names.extend(
            self.entries
                .names(&|name: &TypedName| predicate(name) && !parent.has_entry(name)),
        );
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn name_authority(&self) -> Url {
        self.parent.name_authority()
    }
}

const BUILTIN_TYPES: &[&str] = &[
    "Any",
    "Array",
    "Binary",
    "Boolean",
    "Callable",
    "Collection",
    "Data",
    "Default",
    "Enum",
    "Float",
    "Hash",
    "Integer",
    "Iterable",
    "Iterator",
    "NotUndef",
    "Numeric",
    "Object",
    "Optional",
    "Pattern",
    "Regexp",
    "RichData",
    "Runtime",
    "Scalar",
    "ScalarData",
    "SemVer",
    "SemVerRange",
    "Sensitive",
    "String",
    "Struct",
    "Timespan",
    "Timestamp",
    "Tuple",
    "Type",
    "TypeSet",
    "URI",
    "Undef",
    "Variant",
];

/// Whether the given type name denotes a built-in type.
pub fn is_builtin_type(name: &TypedName) -> bool {
    name.namespace() == Namespace::Type
        && !name.is_qualified()
        && BUILTIN_TYPES.iter().any(|builtin| *builtin == name.name())
}
