use diagnostics::error::Result;
use session::{Context, Loader};
use span::SourceFileIndex;
use std::path::Path;

/// A loader that can read the source files it indexed.
pub trait ContentProvider: Loader {
    /// Read the file at the given path and add it to the source map of the context.
    ///
    /// Fails with a reported diagnostic if the file cannot be read.
    fn get_content(&self, cx: &Context, path: &Path) -> Result<SourceFileIndex>;
}
