//! The file-tree store.

use crate::{
    smart_path::{ENTRY_POINT, TYPE_SET_ENTRY_POINT},
    ContentProvider, SmartPath,
};
use diagnostics::{error::Result, Diagnostic, ErasedReportedError, ErrorCode};
use entity::{Entity, Namespace, TypedName};
use indexmap::IndexMap;
use session::{resolve, Context, Entries, Entry, Loader};
use span::{Location, SourceFileIndex};
use std::{
    collections::hash_map,
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, Weak,
    },
};
use url::Url;
use utility::{case, FormatError, HashMap, QuoteExt};
use walkdir::WalkDir;

/// A store serving the definitions found in a directory tree.
///
/// The tree of each namespace is walked at most once, on the first lookup in that
/// namespace. Files added afterwards are not picked up.
pub struct FileBasedLoader {
    this: Weak<Self>,
    parent: Arc<dyn Loader>,
    path: PathBuf,
    module_name: Option<String>,
    smart_paths: Vec<SmartPath>,
    entries: Entries,
    /// Held across checking for and building an index.
    indices: Mutex<HashMap<Namespace, DirectoryIndex>>,
    walks: AtomicUsize,
}

impl FileBasedLoader {
    /// Create a store for the given directory.
    ///
    /// A store without a module name serves global names.
    pub fn new(
        parent: Arc<dyn Loader>,
        path: PathBuf,
        module_name: Option<String>,
        smart_paths: Vec<SmartPath>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            parent,
            path,
            module_name,
            smart_paths,
            entries: Entries::default(),
            indices: Mutex::default(),
            walks: AtomicUsize::new(0),
        })
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> &Arc<dyn Loader> {
        &self.parent
    }

    /// The number of directory walks performed so far.
    #[cfg(test)]
    pub(crate) fn walks(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }

    fn this(&self) -> Arc<Self> {
        self.this
            .upgrade()
            .expect("the loader is alive while one of its methods runs")
    }

    fn smart_path(&self, namespace: Namespace) -> Option<&SmartPath> {
        self.smart_paths
            .iter()
            .find(|smart_path| smart_path.namespace() == namespace)
    }

    fn find(&self, cx: &mut Context, name: &TypedName) -> Result<Option<Entity>> {
        if let Some(module) = name.module_part() {
            if self
                .module_name
                .as_deref()
                .is_some_and(|own| !own.eq_ignore_ascii_case(module))
            {
                return Ok(None);
            }

            if name.namespace() == Namespace::Task && name.parts().len() > 2 {
                return Ok(None);
            }
        } else if let Some(module) = &self.module_name {
            let namespace = name.namespace();

            match namespace {
                Namespace::Plan | Namespace::Task | Namespace::Type
                    if !name.name().eq_ignore_ascii_case(module) =>
                {
                    return Ok(None);
                }
                Namespace::Plan | Namespace::Task => {
                    return self.find_entry_point(cx, name, ENTRY_POINT);
                }
                Namespace::Type => {
                    let entity = self.find_entry_point(cx, name, TYPE_SET_ENTRY_POINT)?;

                    return match entity {
                        Some(Entity::TypeSet(_)) | None => Ok(entity),
                        Some(entity) => Err(self.entry_point_error(cx, name, &entity)),
                    };
                }
                Namespace::Function => {}
                _ => return Ok(None),
            }
        }

        if let Some(candidates) = self.find_existing_path(cx, name)? {
            return self.instantiate(cx, candidates, name);
        }

        if name.namespace() == Namespace::Type && name.is_qualified() {
            return self.find_in_type_set(cx, name);
        }

        Ok(None)
    }

    /// Look up the entry point file of this module and instantiate it under the module name.
    fn find_entry_point(
        &self,
        cx: &mut Context,
        name: &TypedName,
        entry_point: &str,
    ) -> Result<Option<Entity>> {
        let namespace = name.namespace();
        let entry_point = TypedName::from_parts(namespace, self.name_authority(), [entry_point]);

        let Some(mut candidates) = self.find_existing_path(cx, &entry_point)? else {
            return Ok(None);
        };

        tracing::debug!(
            module = self.module_name.as_deref(),
            namespace = namespace.name(),
            "redirecting to the entry point",
        );

        let module = self.module_name.as_deref().unwrap_or_default();
        let module = match namespace {
            Namespace::Type => case::capitalize(module),
            _ => module.to_owned(),
        };
        candidates.name = TypedName::from_parts(namespace, self.name_authority(), [module]);

        self.instantiate(cx, candidates, name)
    }

    /// Find the type set defining the given name among the ancestors of the name.
    fn find_in_type_set(&self, cx: &mut Context, name: &TypedName) -> Result<Option<Entity>> {
        let mut ancestor = name.parent();

        while let Some(candidate) = ancestor {
            let entity = match self.get_entry(&candidate) {
                Some(entry) => entry.into_result()?,
                None => self.find(cx, &candidate)?,
            };

            if let Some(Entity::TypeSet(set)) = entity {
                tracing::trace!(name = %name, set = %set.name, "resolving the enclosing type set");

                let this = self.this();
                cx.with_loader(this, |cx| resolve::resolve_type_set(cx, &set))?;

                if let Some(entry) = self.entries.get(name) {
                    return entry.into_result();
                }
            }

            ancestor = candidate.parent();
        }

        Ok(None)
    }

    fn find_existing_path(&self, cx: &Context, name: &TypedName) -> Result<Option<Candidates>> {
        let Some(smart_path) = self.smart_path(name.namespace()) else {
            return Ok(None);
        };

        let mut indices = self.indices.lock().unwrap();
        let index = self.ensure_indexed(cx, &mut indices, smart_path)?;

        Ok(index.entries.get(name.map_key()).map(|entry| Candidates {
            name: entry.name.clone(),
            paths: entry.paths.clone(),
            smart_path: smart_path.clone(),
        }))
    }

    fn ensure_indexed<'i>(
        &self,
        cx: &Context,
        indices: &'i mut HashMap<Namespace, DirectoryIndex>,
        smart_path: &SmartPath,
    ) -> Result<&'i DirectoryIndex> {
        let index: &DirectoryIndex = match indices.entry(smart_path.namespace()) {
            hash_map::Entry::Occupied(index) => index.into_mut(),
            hash_map::Entry::Vacant(vacancy) => vacancy.insert(self.build_index(cx, smart_path)),
        };

        match index.failure {
            Some(error) => Err(error),
            None => Ok(index),
        }
    }

    /// Walk the directory of the given smart path.
    ///
    /// A failed walk is never repeated: the index keeps the failure.
    fn build_index(&self, cx: &Context, smart_path: &SmartPath) -> DirectoryIndex {
        self.walks.fetch_add(1, Ordering::SeqCst);

        let root = smart_path.root(&self.path);
        let authority = self.name_authority();
        let mut index = DirectoryIndex::default();

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) if is_not_found(&error) => continue,
                Err(error) => {
                    let error = Diagnostic::error()
                        .code(ErrorCode::E002)
                        .message(format!(
                            "could not index the directory {}",
                            root.display().quote(),
                        ))
                        .path(error.path().unwrap_or(&root).to_owned())
                        .argument("path", root.display())
                        .argument("detail", &error)
                        .report(cx.rep());
                    index.failure = Some(error);
                    return index;
                }
            };

            if !entry.file_type().is_file() || !smart_path.matches(entry.path()) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };

            if let Some(name) = smart_path.name_of(self.module_name(), &authority, relative) {
                index.add(name, entry.into_path());
            }
        }

        tracing::debug!(
            module = self.module_name(),
            namespace = smart_path.namespace().name(),
            entries = index.entries.len(),
            "built the directory index",
        );

        index
    }

    /// Run the instantiator of the candidates.
    ///
    /// Returns the entity registered under the requested name if any.
    fn instantiate(
        &self,
        cx: &mut Context,
        candidates: Candidates,
        requested: &TypedName,
    ) -> Result<Option<Entity>> {
        let Candidates { name, paths, smart_path } = candidates;
        let instantiator = smart_path.instantiator();
        let location = paths
            .first()
            .map_or_else(Location::default, |path| Location::new(path.as_path(), 1, 1));

        let this = self.this();
        cx.with_loader(this, |cx| {
            cx.with_location(location, |cx| instantiator(cx, self, &name, &paths))
        })?;

        Ok(self
            .entries
            .get(requested)
            .and_then(|entry| entry.entity().cloned()))
    }

    fn entry_point_error(
        &self,
        cx: &Context,
        name: &TypedName,
        entity: &Entity,
    ) -> ErasedReportedError {
        cx.error(ErrorCode::E005, Some(entity.origin().clone()))
            .message(format!(
                "the entry point of the module {} does not define a type set",
                name.quote(),
            ))
            .argument("name", name)
            .argument("actual", entity.kind())
            .note(format!("it defines the {entity}"))
            .report(cx.rep())
    }

    /// Build the indices of all namespaces and return their names.
    fn indexed_names(&self, cx: &Context) -> Result<Vec<TypedName>> {
        let mut indices = self.indices.lock().unwrap();
        let mut names = Vec::new();

        for smart_path in &self.smart_paths {
            let index = self.ensure_indexed(cx, &mut indices, smart_path)?;
            names.extend(index.entries.values().map(|entry| entry.name.clone()));
        }

        Ok(names)
    }
}

impl Loader for FileBasedLoader {
    fn load_entry(&self, cx: &mut Context, name: &TypedName) -> Entry {
        if let Some(entry) = self.entries.get(name) {
            return entry;
        }

        let entry = self.parent.load_entry(cx, name);
        if !matches!(entry, Entry::Missing) {
            return entry;
        }

        let result = self.find(cx, name);
        if let Ok(None) = result {
            tracing::trace!(name = %name, namespace = name.namespace().name(), "caching a miss");
        }

        match result {
            Err(error) => {
                self.entries.fail(name, error);
                Entry::Failed(error)
            }
            result => self.entries.settle(name, Entry::from(result)),
        }
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

    fn has_entry(&self, name: &TypedName) -> bool {
        if let Some(entry) = self.entries.get(name) {
            return entry.is_found();
        }

        if self.parent.has_entry(name) {
            return true;
        }

        self.indices
            .lock()
            .unwrap()
            .get(&name.namespace())
            .is_some_and(|index| index.entries.contains_key(name.map_key()))
    }

    fn discover(
        &self,
        cx: &mut Context,
        predicate: &dyn Fn(&TypedName) -> bool,
    ) -> Result<Vec<TypedName>> {
        let indexed = self.indexed_names(cx)?;
        let mut names = self.parent.discover(cx, predicate)?;
        let parent = &self.parent;
        let is_new = |name: &TypedName| predicate(name) && !parent.has_entry(name);

        names.extend(indexed.into_iter().filter(|name| is_new(name)));
        names.extend(self.entries.names(&is_new));
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn name_authority(&self) -> Url {
        self.parent.name_authority()
    }
}

impl ContentProvider for FileBasedLoader {
    fn get_content(&self, cx: &Context, path: &Path) -> Result<SourceFileIndex> {
        let content = fs::read_to_string(path).map_err(|error| {
            Diagnostic::error()
                .code(ErrorCode::E001)
                .message(format!("could not read the file {}", path.display().quote()))
                .path(path.to_owned())
                .argument("path", path.display())
                .argument("detail", error.format())
                .report(cx.rep())
        })?;

        Ok(cx.map().write().unwrap().add(path, Arc::new(content)))
    }
}

struct Candidates {
    /// The name the sources define.
    name: TypedName,
    paths: Vec<PathBuf>,
    smart_path: SmartPath,
}

/// The files of a namespace keyed by the map keys of the names they define.
#[derive(Default)]
struct DirectoryIndex {
    entries: IndexMap<String, IndexEntry>,
    failure: Option<ErasedReportedError>,
}

impl DirectoryIndex {
    fn add(&mut self, name: TypedName, path: PathBuf) {
        self.entries
            .entry(name.map_key().to_owned())
            .or_insert_with(|| IndexEntry { name, paths: Vec::new() })
            .paths
            .push(path);
    }
}

struct IndexEntry {
    name: TypedName,
    paths: Vec<PathBuf>,
}

fn is_not_found(error: &walkdir::Error) -> bool {
    error
        .io_error()
        .is_some_and(|error| error.kind() == io::ErrorKind::NotFound)
}
