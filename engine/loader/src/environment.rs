//! Assembling the stores of an environment.

use crate::{DependencyLoader, FileBasedLoader, PathKind, SmartPath};
use diagnostics::{error::Result, Diagnostic, ErrorCode, LintCode, Reporter};
use session::{ambient, Context, Loader, ParentedLoader, StaticLoader};
use span::SourceMap;
use std::{
    any::Any,
    cell::RefCell,
    env, fs,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    rc::Rc,
    sync::{Arc, Mutex, RwLock},
};
use utility::{FormatError, QuoteExt};

/// The environment variable holding the module path.
pub const MODULE_PATH_VARIABLE: &str = "STRATA_MODULE_PATH";

/// The key of the context variable holding the name of the environment.
pub const ENVIRONMENT_KEY: &str = "environment";

pub struct Settings {
    /// The directory containing one subdirectory per module.
    pub module_path: Option<PathBuf>,
    pub environment: String,
    pub path_kinds: Vec<PathKind>,
}

impl Settings {
    /// The default settings with the module path taken from the environment if it is set.
    pub fn from_env() -> Self {
        Self {
            module_path: env::var_os(MODULE_PATH_VARIABLE)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            ..Self::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            module_path: None,
            environment: "production".into(),
            path_kinds: vec![PathKind::Function, PathKind::Type, PathKind::Plan, PathKind::Task],
        }
    }
}

/// The stores of an environment and its root context.
///
/// The built-in store is wrapped by a system store which in turn is the parent of the
/// store of every module found in the module path. The root context resolves through
/// a fresh delegating layer over all of them. Work is never done on the root context
/// itself but on forks of it.
pub struct Environment {
    settings: Settings,
    modules: Vec<Arc<FileBasedLoader>>,
    dependencies: Option<Arc<DependencyLoader>>,
    loader: Arc<dyn Loader>,
    root: Mutex<Context>,
}

impl Environment {
    pub fn new(
        settings: Settings,
        rep: Arc<Reporter>,
        map: Arc<RwLock<SourceMap>>,
    ) -> Result<Self> {
        let system: Arc<dyn Loader> =
            Arc::new(ParentedLoader::new(Arc::new(StaticLoader::new())));
        let smart_paths: Vec<_> = settings
            .path_kinds
            .iter()
            .map(|&kind| SmartPath::new(kind))
            .collect();

        let mut modules = Vec::new();

        if let Some(module_path) = &settings.module_path {
            let entries = fs::read_dir(module_path).map_err(|error| {
                Diagnostic::error()
                    .code(ErrorCode::E012)
                    .message(format!(
                        "the module path {} is not a readable directory",
                        module_path.display().quote(),
                    ))
                    .path(module_path.clone())
                    .argument("path", module_path.display())
                    .argument("detail", error.format())
                    .report(&rep)
            })?;

            let mut directories: Vec<_> = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_ok_and(|type_| type_.is_dir()))
                .map(|entry| entry.path())
                .collect();
            directories.sort();

            for directory in directories {
                let Some(name) = directory.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };

                if !is_valid_module_name(name) {
                    Diagnostic::warning()
                        .code(LintCode::InvalidModuleName)
                        .message(format!(
                            "skipping the directory {} of the module path",
                            name.quote(),
                        ))
                        .path(directory.clone())
                        .note(
                            "module names start with a lowercase letter \
                             followed by lowercase letters, digits or underscores",
                        )
                        .emit(&rep);
                    continue;
                }

                let name = name.to_owned();
                tracing::debug!(module = %name, path = %directory.display(), "adding a module");
                modules.push(FileBasedLoader::new(
                    system.clone(),
                    directory,
                    Some(name),
                    smart_paths.clone(),
                ));
            }
        }

        let dependencies = (!modules.is_empty())
            .then(|| Arc::new(DependencyLoader::new(modules.clone())));
        let loader: Arc<dyn Loader> = match &dependencies {
            Some(dependencies) => dependencies.clone(),
            None => system,
        };

        let mut root = Context::new(Arc::new(ParentedLoader::new(loader.clone())), rep, map);
        root.set(ENVIRONMENT_KEY, settings.environment.clone());

        Ok(Self {
            settings,
            modules,
            dependencies,
            loader,
            root: Mutex::new(root),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn name(&self) -> &str {
        &self.settings.environment
    }

    /// The store all modules are reachable through.
    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    pub fn modules(&self) -> &[Arc<FileBasedLoader>] {
        &self.modules
    }

    /// The store of the given module ignoring the case.
    pub fn loader_for(&self, module: &str) -> Option<&Arc<FileBasedLoader>> {
        self.dependencies.as_ref()?.loader_for(module)
    }

    /// A fresh context derived from the root context.
    pub fn fork(&self) -> Context {
        self.root.lock().unwrap().fork()
    }

    /// Run the body with a fork of the root context installed as the current context.
    pub fn do_with<T>(&self, body: impl FnOnce() -> T) -> T {
        let cx = Rc::new(RefCell::new(self.fork()));
        ambient::run_with_current(cx, body)
    }

    /// Run the body on a fork of the root context turning a panic into a reported bug.
    pub fn try_with<T>(&self, body: impl FnOnce(&mut Context) -> Result<T>) -> Result<T> {
        let mut cx = self.fork();
        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&mut cx)));

        result.unwrap_or_else(|payload| {
            Err(Diagnostic::bug()
                .message(format!("the execution panicked: {}", panic_message(&*payload)))
                .location(cx.top_location())
                .report(cx.rep()))
        })
    }
}

/// Whether the given directory name is a valid module name.
pub fn is_valid_module_name(name: &str) -> bool {
    let mut characters = name.chars();

    characters.next().is_some_and(|first| first.is_ascii_lowercase())
        && characters.all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}
