use crate::{instantiate, ContentProvider};
use diagnostics::error::Result;
use entity::{Namespace, TypedName};
use session::Context;
use std::path::{Component, Path, PathBuf};
use strum::{Display, EnumIter, EnumString};
use url::Url;
use utility::{case, has_file_extension, FILE_EXTENSION};

/// Read the winning source of the given name and register what it defines.
///
/// The sources are the candidate paths of the name in the order they were found.
pub type Instantiator = fn(
    cx: &mut Context,
    provider: &dyn ContentProvider,
    name: &TypedName,
    sources: &[PathBuf],
) -> Result;

/// The kind of definitions found in a subdirectory of a module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PathKind {
    Function,
    Type,
    Plan,
    Task,
}

impl PathKind {
    pub fn namespace(self) -> Namespace {
        match self {
            Self::Function => Namespace::Function,
            Self::Type => Namespace::Type,
            Self::Plan => Namespace::Plan,
            Self::Task => Namespace::Task,
        }
    }

    pub fn directory(self) -> &'static str {
        match self {
            Self::Function => "functions",
            Self::Type => "types",
            Self::Plan => "plans",
            Self::Task => "tasks",
        }
    }

    /// The stem of the file defining the entry point of a module if there is one.
    pub fn entry_point(self) -> Option<&'static str> {
        match self {
            Self::Function => None,
            Self::Type => Some(TYPE_SET_ENTRY_POINT),
            Self::Plan | Self::Task => Some(ENTRY_POINT),
        }
    }

    fn instantiator(self) -> Instantiator {
        match self {
            Self::Function => instantiate::function,
            Self::Type => instantiate::type_,
            Self::Plan => instantiate::plan,
            Self::Task => instantiate::task,
        }
    }
}

pub(crate) const ENTRY_POINT: &str = "init";
pub(crate) const TYPE_SET_ENTRY_POINT: &str = "init_typeset";

/// A subdirectory of a module root holding the definitions of one namespace.
#[derive(Clone)]
pub struct SmartPath {
    kind: PathKind,
    extension: Option<&'static str>,
    instantiator: Instantiator,
}

impl SmartPath {
    pub fn new(kind: PathKind) -> Self {
        Self {
            kind,
            extension: Some(FILE_EXTENSION),
            instantiator: kind.instantiator(),
        }
    }

    /// Use a custom instantiator and extension, mostly for testing.
    pub fn with_instantiator(
        kind: PathKind,
        extension: Option<&'static str>,
        instantiator: Instantiator,
    ) -> Self {
        Self { kind, extension, instantiator }
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn namespace(&self) -> Namespace {
        self.kind.namespace()
    }

    pub fn instantiator(&self) -> Instantiator {
        self.instantiator
    }

    pub fn root(&self, module_root: &Path) -> PathBuf {
        module_root.join(self.kind.directory())
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.extension
            .map_or(true, |extension| has_file_extension(path, extension))
    }

    /// The name defined by the file at the given path relative to the root.
    ///
    /// Returns `None` for paths that do not map to a name.
    pub fn name_of(
        &self,
        module_name: Option<&str>,
        authority: &Url,
        relative: &Path,
    ) -> Option<TypedName> {
        let relative = match self.extension {
            Some(_) => relative.with_extension(""),
            None => relative.to_owned(),
        };

        let mut segments = Vec::new();
        for component in relative.components() {
            let Component::Normal(segment) = component else {
                return None;
            };
            segments.push(segment.to_str()?.to_owned());
        }

        if segments.is_empty() {
            return None;
        }

        // Subdirectories of tasks do not define anything.
        if self.kind == PathKind::Task && segments.len() > 1 {
            return None;
        }

        let is_entry_point =
            segments.len() == 1 && self.kind.entry_point() == Some(segments[0].as_str());

        let namespace = self.namespace();
        let mut parts = Vec::with_capacity(segments.len() + 1);

        if let Some(module_name) = module_name.filter(|_| !is_entry_point) {
            parts.push(match namespace {
                Namespace::Type => case::capitalize_segments(module_name),
                _ => module_name.to_owned(),
            });
        }

        parts.extend(segments.into_iter().map(|segment| match namespace {
            Namespace::Type if !is_entry_point => case::camel_case(&segment),
            _ => segment,
        }));

        Some(TypedName::from_parts(namespace, authority.clone(), parts))
    }
}
