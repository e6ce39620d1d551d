use super::{FileName, Location};
use std::{io, ops::Range, path::Path, sync::Arc};
use unicode_width::UnicodeWidthStr;

/// A mapping from [index](SourceFileIndex) to [source file](SourceFile).
///
/// Files are only ever added, never removed, which keeps indices stable.
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Open a file given its path and add it as a [`SourceFile`] to the map.
    pub fn load(&mut self, path: &Path) -> io::Result<SourceFileIndex> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.add(path, Arc::new(source)))
    }

    /// Add text to the map creating a [`SourceFile`] in the process.
    pub fn add(&mut self, name: impl Into<FileName>, source: Arc<String>) -> SourceFileIndex {
        let index = SourceFileIndex(self.files.len());
        self.files.push(SourceFile::new(name.into(), source));
        index
    }

    pub fn add_str(&mut self, name: impl Into<FileName>, source: &str) -> SourceFileIndex {
        self.add(name, Arc::new(source.to_owned()))
    }

    /// The most recently added file of the given path.
    pub fn file_by_path(&self, path: &Path) -> Option<&SourceFile> {
        self.files
            .iter()
            .rev()
            .find(|file| file.name.path() == Some(path))
    }

    pub fn file_by_name(&self, name: &FileName) -> Option<&SourceFile> {
        self.files.iter().rev().find(|file| &file.name == name)
    }
}

impl std::ops::Index<SourceFileIndex> for SourceMap {
    type Output = SourceFile;

    #[track_caller]
    fn index(&self, index: SourceFileIndex) -> &Self::Output {
        &self.files[index.0]
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct SourceFileIndex(usize);

#[derive(Clone)]
pub struct SourceFile {
    name: FileName,
    content: Arc<String>,
}

impl SourceFile {
    fn new(name: FileName, content: Arc<String>) -> Self {
        Self { name, content }
    }

    pub fn name(&self) -> &FileName {
        &self.name
    }

    pub fn content(&self) -> &Arc<String> {
        &self.content
    }

    /// The content of the given one-based line without its line break.
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.content
            .split('\n')
            .nth(index)
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// Resolve a byte range to a location.
    ///
    /// A range crossing a line break is cut off at the end of its first line.
    pub fn location(&self, range: Range<usize>) -> Location {
        let start = floor_char_boundary(&self.content, range.start);
        let end = floor_char_boundary(&self.content, range.end.max(start));

        let before = &self.content[..start];
        let line_start = before.rfind('\n').map_or(0, |index| index + 1);
        let line = before.matches('\n').count() + 1;
        let column = self.content[line_start..start].chars().count() + 1;

        let highlight = &self.content[start..end];
        let highlight = highlight.split('\n').next().unwrap_or_default();

        Location::Source {
            file: self.name.clone(),
            line: saturate(line),
            column: saturate(column),
            length: saturate(highlight.width()),
        }
    }
}

fn floor_char_boundary(content: &str, index: usize) -> usize {
    let mut index = index.min(content.len());
    while !content.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn saturate(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
