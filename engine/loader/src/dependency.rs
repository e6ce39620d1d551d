use crate::FileBasedLoader;
use diagnostics::{error::Result, ErasedReportedError};
use entity::{Entity, TypedName};
use session::{Context, Entries, Entry, Loader};
use std::sync::Arc;
use url::Url;
use utility::HashMap;

/// A store routing lookups to the stores of several modules.
///
/// Qualified names go straight to the module named by their first part. Unqualified
/// names are looked up in every module in order, the first hit wins.
pub struct DependencyLoader {
    loaders: Vec<Arc<FileBasedLoader>>,
    /// Indices into the loaders keyed by the lowercase module name.
    index: HashMap<String, usize>,
    entries: Entries,
}

impl DependencyLoader {
    pub fn new(loaders: Vec<Arc<FileBasedLoader>>) -> Self {
        let mut index = HashMap::default();

        for (position, loader) in loaders.iter().enumerate() {
            let Some(module) = loader.module_name() else {
                continue;
            };
            index.entry(module.to_lowercase()).or_insert(position);
        }

        Self { loaders, index, entries: Entries::default() }
    }

    pub fn loader_for(&self, module: &str) -> Option<&Arc<FileBasedLoader>> {
        self.index
            .get(&module.to_lowercase())
            .map(|&position| &self.loaders[position])
    }

    pub fn loaders(&self) -> &[Arc<FileBasedLoader>] {
        &self.loaders
    }

    fn find(&self, cx: &mut Context, name: &TypedName) -> Entry {
        if let Some(module) = name.module_part() {
            return match self.loader_for(module) {
                Some(loader) => loader.load_entry(cx, name),
                None => Entry::Missing,
            };
        }

        for loader in &self.loaders {
            let entry = loader.load_entry(cx, name);
            if !matches!(entry, Entry::Missing) {
                return entry;
            }
        }

        Entry::Missing
    }
}

impl Loader for DependencyLoader {
    fn load_entry(&self, cx: &mut Context, name: &TypedName) -> Entry {
        if let Some(entry) = self.entries.get(name) {
            return entry;
        }

        let entry = self.find(cx, name);
        self.entries.settle(name, entry)
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

    fn has_entry(&self, name: &TypedName) -> bool {
        self.get_entry(name).is_some_and(|entry| entry.is_found())
            || self.loaders.iter().any(|loader| loader.has_entry(name))
    }

    fn discover(
        &self,
        cx: &mut Context,
        predicate: &dyn Fn(&TypedName) -> bool,
    ) -> Result<Vec<TypedName>> {
        let mut names = Vec::new();

        for loader in &self.loaders {
            names.extend(loader.discover(cx, predicate)?);
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    fn name_authority(&self) -> Url {
        self.loaders
            .first()
            .map_or_else(entity::runtime_authority, |loader| loader.name_authority())
    }
}
