//! Rendering diagnostics to a terminal or buffer.
//!
//! Below the header, a diagnostic is drawn as a frame attached to a left gutter:
//!
//! ```text
//! error[E004]: the type ‘Shop::Adress’ is not defined
//!   ┌─ shop/types/order.toml
//!   │
//!   ├─ shop/types/order.toml:3:12
//!   │
//! 3 │ customer = "Shop::Adress"
//!   │            ════════════
//!   │
//!  = name: Shop::Adress
//!  help: a type with a similar name exists: ‘Shop::Address’
//! ```
//!
//! The frame consists of groups of rows (the path, the location, the source line and the
//! trailer of arguments and subdiagnostics) separated by empty gutter rows.

use super::{Severity, Subdiagnostic, UnboxedUntaggedDiagnostic};
use span::{FileName, Location, SourceMap};
use std::{
    io::{self, Write},
    path::Path,
};
use unicode_width::UnicodeWidthStr;
use utility::paint::{Effects, Highlight, Painter};

const VERTICAL: &str = "│";
const HORIZONTAL: &str = "─";
const UNDERLINE: &str = "═";
const EMPTY_UNDERLINE: &str = "⟫⟪";

impl UnboxedUntaggedDiagnostic {
    pub fn render(&self, map: Option<&SourceMap>, p: &mut Painter) -> io::Result<()> {
        self.render_header(p)?;

        let snippet = self
            .location
            .as_ref()
            .and_then(|location| Snippet::resolve(location, map));
        let rows = self.rows(snippet.as_ref());

        let gutter = match snippet.as_ref().filter(|snippet| snippet.content.is_some()) {
            Some(snippet) => snippet.line.to_string().len(),
            None => 1,
        };
        let mut frame = Frame { p, gutter, highlight: self.severity.highlight(), headings: 0 };

        for (index, row) in rows.iter().enumerate() {
            writeln!(frame.p)?;
            frame.render(row, index + 1 == rows.len())?;
        }

        Ok(())
    }

    fn render_header(&self, p: &mut Painter) -> io::Result<()> {
        let highlight = self.severity.highlight();

        p.set(highlight.strong())?;
        write!(p, "{}", self.severity.name())?;
        p.unset()?;

        if let Some(code) = self.code {
            p.set(highlight)?;
            write!(p, "[{code}]")?;
            p.unset()?;
        }

        if let Some(message) = &self.message {
            write!(p, ": ")?;
            p.set(Highlight::Emphasis)?;
            write!(p, "{message}")?;
            p.unset()?;
        }

        Ok(())
    }

    fn rows<'a>(&'a self, snippet: Option<&'a Snippet<'a>>) -> Vec<Row<'a>> {
        let mut groups = Vec::new();

        if let Some(path) = &self.path {
            groups.push(vec![Row::Path(path)]);
        }

        if let Some(snippet) = snippet {
            groups.push(vec![Row::Location(snippet)]);

            if let Some(content) = snippet.content {
                groups.push(vec![Row::Source(snippet, content)]);
            }
        }

        let trailer: Vec<_> = self
            .arguments
            .iter()
            .map(|(key, value)| Row::Argument(key, value))
            .chain(self.subdiagnostics.iter().map(Row::Subdiagnostic))
            .collect();
        if !trailer.is_empty() {
            groups.push(trailer);
        }

        let mut rows = Vec::new();
        for group in groups {
            if !rows.is_empty() {
                rows.push(Row::Gap);
            }
            rows.extend(group);
        }
        rows
    }
}

enum Row<'a> {
    Path(&'a Path),
    Location(&'a Snippet<'a>),
    Source(&'a Snippet<'a>, &'a str),
    Argument(&'a str, &'a str),
    Subdiagnostic(&'a Subdiagnostic),
    Gap,
}

/// A location resolved against the source map.
struct Snippet<'a> {
    file: &'a FileName,
    line: u32,
    column: u32,
    length: u32,
    content: Option<&'a str>,
}

impl<'a> Snippet<'a> {
    fn resolve(location: &'a Location, map: Option<&'a SourceMap>) -> Option<Self> {
        let Location::Source { file, line, column, length } = location else {
            return None;
        };

        let content = map
            .and_then(|map| map.file_by_name(file))
            .and_then(|source| source.line(*line));

        Some(Self { file, line: *line, column: *column, length: *length, content })
    }
}

struct Frame<'p> {
    p: &'p mut Painter,
    /// The width of the line numbers.
    gutter: usize,
    highlight: Highlight,
    headings: usize,
}

impl Frame<'_> {
    fn render(&mut self, row: &Row<'_>, last: bool) -> io::Result<()> {
        match *row {
            Row::Path(path) => {
                self.heading(last)?;
                self.framed(|p| write!(p, "{}", path.display()))
            }
            Row::Location(snippet) => {
                self.heading(last)?;
                render_file_name(snippet.file, self.p)?;
                self.framed(|p| write!(p, ":{}:{}", snippet.line, snippet.column))
            }
            Row::Source(snippet, content) => self.source(snippet, content),
            Row::Argument(key, value) => {
                self.indent()?;
                self.framed(|p| write!(p, "="))?;
                write!(self.p, " {key}: {value}")
            }
            Row::Subdiagnostic(subdiagnostic) => self.subdiagnostic(subdiagnostic),
            Row::Gap => self.bar(),
        }
    }

    fn indent(&mut self) -> io::Result<()> {
        write!(self.p, "{:1$}", "", self.gutter)
    }

    fn framed(&mut self, write: impl FnOnce(&mut Painter) -> io::Result<()>) -> io::Result<()> {
        self.p.set(Highlight::Frame)?;
        write(self.p)?;
        self.p.unset()
    }

    fn bar(&mut self) -> io::Result<()> {
        let gutter = self.gutter;
        self.framed(|p| write!(p, "{:gutter$} {VERTICAL}", ""))
    }

    /// The start of a path or location row.
    fn heading(&mut self, last: bool) -> io::Result<()> {
        let connector = match (self.headings, last) {
            (0, true) => HORIZONTAL,
            (0, false) => "┌",
            _ => "├",
        };
        self.headings += 1;

        let gutter = self.gutter;
        self.framed(|p| write!(p, "{:gutter$} {connector}{HORIZONTAL} ", ""))
    }

    fn source(&mut self, snippet: &Snippet<'_>, content: &str) -> io::Result<()> {
        let gutter = self.gutter;
        let prefix: String = content
            .chars()
            .take(snippet.column.saturating_sub(1) as usize)
            .collect();
        let offset = prefix.width();
        let empty = snippet.length == 0;

        self.framed(|p| write!(p, "{:>gutter$} {VERTICAL}", snippet.line))?;
        // an empty highlight at the line start points in between the gutter and the content
        let shift = if empty && offset == 0 { "  " } else { " " };
        writeln!(self.p, "{shift}{content}")?;

        self.bar()?;
        write!(self.p, " {:1$}", "", if empty { offset.saturating_sub(1) } else { offset })?;
        self.p.set(self.highlight)?;
        if empty {
            write!(self.p, "{EMPTY_UNDERLINE}")?;
        } else {
            write!(self.p, "{}", UNDERLINE.repeat(snippet.length as usize))?;
        }
        self.p.unset()
    }

    fn subdiagnostic(&mut self, subdiagnostic: &Subdiagnostic) -> io::Result<()> {
        let name = subdiagnostic.severity.name();

        self.indent()?;
        self.p.set(Highlight::Help.strong())?;
        write!(self.p, "{name}")?;
        self.p.unset()?;

        let mut lines = subdiagnostic.message.split('\n');
        write!(self.p, ": {}", lines.next().unwrap_or_default())?;

        let hanging = self.gutter + name.width() + 2;
        for line in lines.filter(|line| !line.is_empty()) {
            write!(self.p, "\n{:hanging$}{line}", "")?;
        }

        Ok(())
    }
}

impl Severity {
    const fn name(self) -> &'static str {
        match self {
            Self::Bug => "internal error",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Debug => "internal debugging message",
        }
    }

    const fn highlight(self) -> Highlight {
        match self {
            Self::Bug | Self::Error => Highlight::Error,
            Self::Warning => Highlight::Warning,
            Self::Debug => Highlight::Debug,
        }
    }
}

fn render_file_name(name: &FileName, p: &mut Painter) -> io::Result<()> {
    match name {
        FileName::Anon => {
            p.set(Effects::ITALIC)?;
            write!(p, "⟨anonymous⟩")?;
            p.unset()
        }
        FileName::Path(path) => write!(p, "{}", path.display()),
        FileName::Str(name) => write!(p, "{name}"),
    }
}
