//! File-based and aggregating resolution stores.
//!
//! A module is a directory with one subdirectory per namespace:
//!
//! ```text
//! shop/
//! ├── functions/greet.toml     shop::greet
//! ├── plans/init.toml          shop (plan)
//! ├── tasks/deploy.toml        shop::deploy
//! └── types/
//!     ├── init_typeset.toml    Shop (type set)
//!     └── billing/amount.toml  Shop::Billing::Amount
//! ```
//!
//! A [`FileBasedLoader`] serves one such directory, a [`DependencyLoader`] routes
//! lookups to the loaders of several modules. An [`Environment`] assembles both from
//! [`Settings`].

pub use content::ContentProvider;
pub use dependency::DependencyLoader;
pub use environment::{
    is_valid_module_name, Environment, Settings, ENVIRONMENT_KEY, MODULE_PATH_VARIABLE,
};
pub use file_based::FileBasedLoader;
pub use smart_path::{PathKind, SmartPath};

pub mod instantiate;

mod content;
mod dependency;
mod environment;
mod file_based;
mod smart_path;
