//! The diagnostics system.

use span::Location;
use std::{fmt, ops::Deref, path::PathBuf};
use utility::Str;

pub use code::{Code, ErrorCode, LintCode};
pub use reporter::{ErasedReportedError, Reporter};

mod code;
mod render;

pub mod error;
pub mod reporter;

#[cfg(test)]
mod test;

pub type Diag = Diagnostic;

/// A complex diagnostic message, optionally with a source location.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone)]
#[must_use]
pub struct Diagnostic(UntaggedDiagnostic);

impl Diagnostic {
    fn new(severity: Severity) -> Self {
        Self(Box::new(UnboxedUntaggedDiagnostic::new(severity)))
    }

    /// Create a diagnostic for a user error.
    pub fn error() -> Self {
        Self::new(Severity::Error)
    }

    /// Create a diagnostic for a warning.
    pub fn warning() -> Self {
        Self::new(Severity::Warning)
    }

    /// Create a diagnostic for an internal error.
    pub fn bug() -> Self {
        Self::new(Severity::Bug)
    }

    /// Create a diagnostic for an internal debugging message.
    pub fn debug() -> Self {
        Self::new(Severity::Debug)
    }

    pub fn code(mut self, code: impl Into<Code>) -> Self {
        self.0.code = Some(code.into());
        self
    }

    /// Set the one-line summary of the issue.
    ///
    /// Messages are lowercase clauses without a final period that quote names with
    /// ‘…’ (U+2018 and U+2019), e.g. `the type ‘Shop::Address’ is not defined`.
    pub fn message(mut self, message: impl Into<Str>) -> Self {
        self.0.message = Some(message.into());
        self
    }

    /// Attach a machine-readable argument to the diagnostic.
    ///
    /// Arguments are kept in insertion order. Adding an argument whose key already
    /// exists replaces its value.
    pub fn argument(mut self, key: impl Into<Str>, value: impl fmt::Display) -> Self {
        let key = key.into();
        let value = value.to_string();

        match self.0.arguments.iter_mut().find(|(present, _)| *present == key) {
            Some((_, present)) => *present = value,
            None => self.0.arguments.push((key, value)),
        }
        self
    }

    /// Point at the definition or file position the issue stems from.
    ///
    /// A later call replaces the location.
    pub fn location(mut self, location: Location) -> Self {
        self.0.location = Some(location);
        self
    }

    /// Point at a whole file or folder, e.g. one that could not be read.
    pub fn path(mut self, path: PathBuf) -> Self {
        self.0.path = Some(path);
        self
    }

    fn subdiagnostic(mut self, severity: Subseverity, message: Str) -> Self {
        self.0.subdiagnostics.push(Subdiagnostic { severity, message });
        self
    }

    /// Add context that explains the issue.
    pub fn note(self, message: impl Into<Str>) -> Self {
        self.subdiagnostic(Subseverity::Note, message.into())
    }

    /// Add a suggestion for fixing the issue, stated rather than asked.
    pub fn help(self, message: impl Into<Str>) -> Self {
        self.subdiagnostic(Subseverity::Help, message.into())
    }

    pub fn with(self, builder: impl FnOnce(Self) -> Self) -> Self {
        builder(self)
    }

    /// Report the diagnostic returning a witness for the reported error.
    ///
    /// Use [`Self::emit`] for warnings and debugging messages.
    pub fn report(self, rep: &Reporter) -> ErasedReportedError {
        debug_assert!(
            matches!(self.severity, Severity::Error | Severity::Bug),
            "only errors yield an error witness"
        );
        rep.report(self.0);
        ErasedReportedError::new()
    }

    /// Report a non-error diagnostic.
    pub fn emit(self, rep: &Reporter) {
        rep.report(self.0);
    }

    pub fn into_untagged(self) -> UntaggedDiagnostic {
        self.0
    }
}

impl Deref for Diagnostic {
    type Target = UnboxedUntaggedDiagnostic;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub type UntaggedDiagnostic = Box<UnboxedUntaggedDiagnostic>;

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone)]
pub struct UnboxedUntaggedDiagnostic {
    // The location comes first since it should have the highest priority when ordering.
    // Buffered reporters thereby print diagnostics close to source order.
    pub location: Option<Location>,
    pub path: Option<PathBuf>,
    pub code: Option<Code>,
    pub message: Option<Str>,
    pub arguments: Vec<(Str, String)>,
    pub subdiagnostics: Vec<Subdiagnostic>,
    pub severity: Severity,
}

impl UnboxedUntaggedDiagnostic {
    fn new(severity: Severity) -> Self {
        Self {
            location: None,
            path: None,
            code: None,
            message: None,
            arguments: Vec::new(),
            subdiagnostics: Vec::new(),
            severity,
        }
    }

    /// The value of the argument of the given key.
    pub fn argument_value(&self, key: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(present, _)| present == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code.and_then(|code| ErrorCode::try_from(code).ok())
    }
}

/// Part of a [complex error message](Diagnostic) providing extra text messages.
#[derive(PartialEq, Eq, Clone, PartialOrd, Ord, Debug)]
pub struct Subdiagnostic {
    pub severity: Subseverity,
    pub message: Str,
}

/// Level of severity of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum Severity {
    /// An internal error.
    Bug,
    /// A user error.
    Error,
    Warning,
    Debug,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, PartialOrd, Ord, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Subseverity {
    /// An auxiliary note.
    Note,
    /// A message containing steps to solve an issue.
    Help,
}

impl Subseverity {
    pub fn name(self) -> &'static str {
        self.into()
    }
}
