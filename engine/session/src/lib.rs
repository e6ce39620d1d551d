//! The execution context.
//!
//! A [`Context`] bundles the state of one thread of execution: the active [loader],
//! a stack of locations used for diagnostics, scoped variables, the implementation
//! registry and the reporter. Contexts are never shared between threads. Use
//! [`Context::fork`] to derive state for another thread.
//!
//! [loader]: Loader

use diagnostics::{error::Result, Diagnostic, ErasedReportedError, ErrorCode, Reporter};
use entity::{Entity, Namespace, TypedName};
use span::{Location, SourceMap};
use std::{
    any::Any,
    mem,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, RwLock},
};
use utility::{default, paint::ColorChoice, HashMap, QuoteExt};

pub use loader::{is_builtin_type, Entries, Entry, Loader, ParentedLoader, StaticLoader};
pub use registry::{Conflict, HostType, ImplementationRegistry};

pub mod ambient;
pub mod resolve;

mod loader;
mod registry;

#[cfg(test)]
mod test;

/// The value of a context variable.
pub type Value = Arc<dyn Any + Send + Sync>;

pub struct Context {
    loader: Arc<dyn Loader>,
    stack: Vec<Location>,
    vars: Option<HashMap<String, Value>>,
    registry: Arc<ImplementationRegistry>,
    rep: Arc<Reporter>,
    map: Arc<RwLock<SourceMap>>,
    /// Whether a fork still sees the loader and the registry.
    ///
    /// If so, they are layered before the next registration.
    shared: bool,
    /// Whether the loader was installed by [`Self::with_loader`].
    scoped: bool,
}

impl Context {
    pub fn new(loader: Arc<dyn Loader>, rep: Arc<Reporter>, map: Arc<RwLock<SourceMap>>) -> Self {
        Self {
            loader,
            stack: Vec::new(),
            vars: None,
            registry: default(),
            rep,
            map,
            shared: false,
            scoped: false,
        }
    }

    /// Create a context over the built-in definitions reporting to stderr.
    pub fn test() -> Self {
        let map: Arc<RwLock<SourceMap>> = default();

        Self::new(
            Arc::new(StaticLoader::new()),
            Arc::new(Reporter::stderr(ColorChoice::Auto).with_map(map.clone())),
            map,
        )
    }

    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    pub fn rep(&self) -> &Reporter {
        &self.rep
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.rep
    }

    pub fn map(&self) -> &Arc<RwLock<SourceMap>> {
        &self.map
    }

    pub fn registry(&self) -> &Arc<ImplementationRegistry> {
        &self.registry
    }

    /// Resolve the given name with the active loader.
    pub fn resolve(&mut self, name: &TypedName) -> Result<Option<Entity>> {
        let loader = self.loader.clone();
        loader.resolve(self, name)
    }

    pub fn resolve_type(&mut self, name: &str) -> Result<Option<Entity>> {
        self.resolve(&TypedName::new(Namespace::Type, name))
    }

    /// The active loader prepared for registrations that must stay invisible to forks.
    pub fn loader_for_registration(&mut self) -> &Arc<dyn Loader> {
        self.unshare();
        &self.loader
    }

    fn unshare(&mut self) {
        if self.scoped || !mem::take(&mut self.shared) {
            return;
        }

        tracing::trace!("layering the loader shared with a fork");
        self.loader = Arc::new(ParentedLoader::new(self.loader.clone()));
        self.registry = self.registry.child();
    }

    /// Register an entity with the active loader.
    pub fn define(&mut self, entity: Entity) -> Result<Entity> {
        let loader = self.loader_for_registration().clone();
        let name = entity.name().clone();
        loader.set_entry(self, &name, entity)
    }

    /// Run the body with the active loader temporarily replaced.
    ///
    /// The previous loader is restored on every exit path including unwinding.
    pub fn with_loader<T>(
        &mut self,
        loader: Arc<dyn Loader>,
        body: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let previous = mem::replace(&mut self.loader, loader);
        let scoped = mem::replace(&mut self.scoped, true);
        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *self)));
        self.loader = previous;
        self.scoped = scoped;

        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Derive a context for another thread of execution or for discardable work.
    ///
    /// The fork continues with a fresh delegating layer over the current loader.
    /// Registrations in either context are invisible to the other one while everything
    /// registered before the fork stays visible to both: this context layers its loader
    /// lazily, on its first registration after the fork. The same applies to the
    /// implementation registry. The location stack is copied, the variables are copied
    /// shallowly. The reporter is shared.
    ///
    /// Inside of [`Self::with_loader`], the installed loader is shared with the fork as is.
    pub fn fork(&mut self) -> Self {
        tracing::debug!(depth = self.stack.len(), "forking context");

        self.shared |= !self.scoped;

        Self {
            loader: Arc::new(ParentedLoader::new(self.loader.clone())),
            stack: self.stack.clone(),
            vars: self.vars.clone(),
            registry: self.registry.child(),
            rep: self.rep.clone(),
            map: self.map.clone(),
            shared: false,
            scoped: false,
        }
    }

    pub fn push_location(&mut self, location: Location) {
        self.stack.push(location);
    }

    pub fn pop_location(&mut self) -> Option<Location> {
        self.stack.pop()
    }

    /// The innermost location or the system location if the stack is empty.
    pub fn top_location(&self) -> Location {
        self.stack.last().cloned().unwrap_or_default()
    }

    pub fn stack(&self) -> &[Location] {
        &self.stack
    }

    pub fn with_location<T>(&mut self, location: Location, body: impl FnOnce(&mut Self) -> T) -> T {
        self.push_location(location);
        let result = body(self);
        self.pop_location();
        result
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.vars
            .get_or_insert_with(default)
            .insert(key.into(), Arc::new(value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.as_ref()?.get(key)
    }

    pub fn get_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.get(key)?.downcast_ref()
    }

    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.vars.as_mut()?.remove(key)
    }

    /// Start an error diagnostic located at the given location or else at the top of the stack.
    pub fn error(&self, code: ErrorCode, location: Option<Location>) -> Diagnostic {
        Diagnostic::error()
            .code(code)
            .location(location.unwrap_or_else(|| self.top_location()))
    }

    /// Report a failure without an error code at the top of the stack.
    pub fn fail(&self, message: impl Into<utility::Str>) -> ErasedReportedError {
        Diagnostic::error()
            .message(message)
            .location(self.top_location())
            .report(&self.rep)
    }

    /// Map the given type name to the host type `T` in both directions.
    pub fn register_implementation<T: Any>(&mut self, name: &TypedName) -> Result {
        self.unshare();
        self.registry
            .register(name, HostType::of::<T>())
            .map_err(|conflict| {
                let message = match &conflict {
                    Conflict::Type { name, present } => format!(
                        "the type {} is already implemented by {}",
                        name.quote(),
                        present.quote(),
                    ),
                    Conflict::Host { host, present } => format!(
                        "the host type {} already implements the type {}",
                        host.quote(),
                        present.quote(),
                    ),
                };

                self.error(ErrorCode::E011, None)
                    .message(message)
                    .argument("name", name)
                    .argument("host", std::any::type_name::<T>())
                    .report(&self.rep)
            })
    }
}
