//! Colored output to terminals and buffers.
//!
//! Styles are named by the role they play in the output ([`Highlight`]) rather than by color
//! so that diagnostics and command output stay visually consistent.

use crate::{default, SmallVec};
use std::{
    io::{self, BufWriter, StderrLock, StdoutLock, Write},
    string::FromUtf8Error,
};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use supports_color::Stream;

pub use anstyle::{AnsiColor, Color, Effects, Style};

/// Paint to a `String`.
pub fn paint_to_string(
    paint: impl FnOnce(&mut Painter) -> io::Result<()>,
    choice: ColorChoice,
) -> Result<String, FromUtf8Error> {
    let mut painter = Painter::bytes(choice);
    // infallible
    let _ = paint(&mut painter);
    String::from_utf8(painter.buffer())
}

/// Paint to locked and buffered stdout.
pub fn paint(
    paint: impl FnOnce(&mut Painter) -> io::Result<()>,
    choice: ColorChoice,
) -> io::Result<()> {
    Painter::stdout(choice).run(paint)
}

/// Paint to locked and buffered stderr.
pub fn epaint(
    paint: impl FnOnce(&mut Painter) -> io::Result<()>,
    choice: ColorChoice,
) -> io::Result<()> {
    Painter::stderr(choice).run(paint)
}

/// A writer that keeps track of the styles currently in effect.
///
/// Every entry of the stack is the *effective* style at that nesting level,
/// i.e. the style set last merged onto the ones enclosing it.
pub struct Painter {
    sink: Sink,
    colorize: bool,
    stack: SmallVec<Style, 3>,
}

impl Painter {
    pub fn bytes(choice: ColorChoice) -> Self {
        Self { sink: Sink::Bytes(Vec::new()), colorize: choice.resolve(None), stack: default() }
    }

    pub fn stdout(choice: ColorChoice) -> Self {
        Self {
            sink: Sink::Stdout(BufWriter::new(io::stdout().lock())),
            colorize: choice.resolve(Some(Stream::Stdout)),
            stack: default(),
        }
    }

    pub fn stderr(choice: ColorChoice) -> Self {
        Self {
            sink: Sink::Stderr(BufWriter::new(io::stderr().lock())),
            colorize: choice.resolve(Some(Stream::Stderr)),
            stack: default(),
        }
    }

    fn run(mut self, paint: impl FnOnce(&mut Self) -> io::Result<()>) -> io::Result<()> {
        paint(&mut self)?;
        self.flush()
    }

    fn current(&self) -> Style {
        self.stack.last().copied().unwrap_or_default()
    }

    /// Apply the given style on top of the current one until the matching [`Self::unset`].
    pub fn set(&mut self, style: impl IntoStyle) -> io::Result<()> {
        if !self.colorize {
            return Ok(());
        }

        let style = merge(self.current(), style.into_style());
        self.stack.push(style);
        write!(self.sink, "{}", style.render())
    }

    /// Restore the style that was in effect before the last [`Self::set`].
    pub fn unset(&mut self) -> io::Result<()> {
        if !self.colorize {
            return Ok(());
        }

        let Some(style) = self.stack.pop() else {
            return Ok(());
        };

        write!(self.sink, "{}{}", style.render_reset(), self.current().render())
    }

    /// The painted bytes if this painter paints to a buffer.
    pub fn buffer(self) -> Vec<u8> {
        match self.sink {
            Sink::Bytes(bytes) => bytes,
            Sink::Stdout(_) | Sink::Stderr(_) => Vec::new(),
        }
    }
}

impl Write for Painter {
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        self.sink.write(buffer)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

fn merge(outer: Style, inner: Style) -> Style {
    Style::new()
        .fg_color(inner.get_fg_color().or(outer.get_fg_color()))
        .bg_color(inner.get_bg_color().or(outer.get_bg_color()))
        .effects(outer.get_effects() | inner.get_effects())
}

enum Sink {
    Stdout(BufWriter<StdoutLock<'static>>),
    Stderr(BufWriter<StderrLock<'static>>),
    Bytes(Vec<u8>),
}

impl Sink {
    fn as_write(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(stdout) => stdout,
            Self::Stderr(stderr) => stderr,
            Self::Bytes(bytes) => bytes,
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        self.as_write().write(buffer)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.as_write().flush()
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
#[derive(Display, EnumString, IntoStaticStr, VariantNames)]
#[strum(serialize_all = "kebab-case")]
pub enum ColorChoice {
    #[default]
    Auto,
    Never,
    Always,
}

impl ColorChoice {
    fn resolve(self, stream: Option<Stream>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => stream
                .and_then(supports_color::on_cached)
                .is_some_and(|level| level.has_basic),
        }
    }
}

/// The role a piece of output plays.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Highlight {
    /// The lines and locations framing a diagnostic.
    Frame,
    Error,
    Warning,
    /// Notes and help messages.
    Help,
    Debug,
    /// The kind of an entity, e.g. `type` or `task`.
    Kind,
    Namespace,
    /// An error code or a similarly important identifier.
    Emphasis,
}

impl Highlight {
    pub const fn color(self) -> Option<AnsiColor> {
        Some(match self {
            Self::Frame => AnsiColor::BrightBlue,
            Self::Error => AnsiColor::BrightRed,
            Self::Warning => AnsiColor::BrightYellow,
            Self::Help => AnsiColor::BrightCyan,
            Self::Debug => AnsiColor::BrightMagenta,
            Self::Kind => AnsiColor::Green,
            Self::Namespace => AnsiColor::Cyan,
            Self::Emphasis => return None,
        })
    }

    /// The same highlight but bold.
    pub fn strong(self) -> Style {
        self.into_style().bold()
    }
}

pub trait IntoStyle {
    fn into_style(self) -> Style;
}

impl IntoStyle for Style {
    fn into_style(self) -> Style {
        self
    }
}

impl IntoStyle for AnsiColor {
    fn into_style(self) -> Style {
        self.on_default()
    }
}

impl IntoStyle for Effects {
    fn into_style(self) -> Style {
        Style::new().effects(self)
    }
}

impl IntoStyle for Highlight {
    fn into_style(self) -> Style {
        match self.color() {
            Some(color) => color.on_default(),
            None => Style::new().bold(),
        }
    }
}
