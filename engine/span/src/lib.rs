//! Source locations.
//!
//! In contrast to byte spans, a [`Location`] is self-contained: it names the file and
//! the line and column of the first character it refers to. Locations are stacked by
//! the execution context for diagnostics and attached to diagnostics directly.

use std::{fmt, path::Path};
use utility::Str;

pub use source_map::{SourceFile, SourceFileIndex, SourceMap};

pub mod source_map;

#[cfg(test)]
mod test;

/// The location of a construct in a source file.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub enum Location {
    /// The absence of a location.
    ///
    /// Used for entities defined by the system itself and as the top of an empty
    /// location stack.
    #[default]
    System,
    Source {
        file: FileName,
        /// The one-based line number.
        line: u32,
        /// The one-based column number counted in characters.
        column: u32,
        /// The amount of characters on the line that are highlighted.
        length: u32,
    },
}

impl Location {
    pub fn new(file: impl Into<FileName>, line: u32, column: u32) -> Self {
        Self::Source { file: file.into(), line, column, length: 0 }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }

    pub fn file(&self) -> Option<&FileName> {
        match self {
            Self::System => None,
            Self::Source { file, .. } => Some(file),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "⟨system⟩"),
            Self::Source { file, line, column, .. } => write!(f, "{file}:{line}:{column}"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum FileName {
    Anon,
    Str(Str),
    Path(std::path::PathBuf),
}

impl FileName {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Anon | Self::Str(_) => None,
        }
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anon => write!(f, "⟨anonymous⟩"),
            Self::Str(name) => write!(f, "{name}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<std::path::PathBuf> for FileName {
    fn from(path: std::path::PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for FileName {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_owned())
    }
}

impl From<&'static str> for FileName {
    fn from(name: &'static str) -> Self {
        Self::Str(name.into())
    }
}
