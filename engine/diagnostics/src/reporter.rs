//! The diagnostic reporter.

use super::{Diagnostic, Severity, UntaggedDiagnostic};
use span::SourceMap;
use std::{
    collections::BTreeSet,
    io::Write,
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, RwLock,
    },
};
use utility::{
    default,
    paint::{epaint, ColorChoice},
    pluralize, Conjunction, ListingExt,
};

/// The destination of reported diagnostics.
///
/// A reporter is shared by every part of an environment. Reporting is thread-safe.
pub struct Reporter {
    sink: Sink,
    map: Option<Arc<RwLock<SourceMap>>>,
}

impl Reporter {
    fn new(sink: Sink) -> Self {
        Self { sink, map: None }
    }

    /// Drop every diagnostic.
    pub fn silent() -> Self {
        Self::new(Sink::Silent)
    }

    /// Collect diagnostics into a shared buffer, sorted by severity and location.
    pub fn buffer(diagnostics: Buffer) -> Self {
        Self::new(Sink::Buffer(diagnostics))
    }

    /// Print every diagnostic to stderr right away.
    pub fn stderr(choice: ColorChoice) -> Self {
        Self::new(Sink::Stderr { choice, deferred: None })
    }

    /// Print diagnostics to stderr once the reporter is dropped.
    ///
    /// Warnings are printed before errors, each followed by a summary. If any error was
    /// printed, the flag gets set.
    pub fn buffered_stderr(choice: ColorChoice, reported_any_errors: Arc<AtomicBool>) -> Self {
        Self::new(Sink::Stderr {
            choice,
            deferred: Some(Deferred { pending: default(), reported_any_errors }),
        })
    }

    #[must_use]
    pub fn with_map(mut self, map: Arc<RwLock<SourceMap>>) -> Self {
        self.map = Some(map);
        self
    }

    pub(super) fn report(&self, diagnostic: UntaggedDiagnostic) {
        tracing::trace!(
            severity = ?diagnostic.severity,
            code = diagnostic.code.map(tracing::field::display),
            message = diagnostic.message.as_deref(),
            "reported a diagnostic",
        );

        match &self.sink {
            Sink::Silent => {}
            Sink::Buffer(diagnostics) => {
                diagnostics.lock().unwrap().insert(diagnostic);
            }
            &Sink::Stderr { choice, deferred: None } => self.print(&[diagnostic], choice),
            Sink::Stderr { deferred: Some(deferred), choice } => {
                if diagnostic.severity == Severity::Debug {
                    self.print(&[diagnostic], *choice);
                } else {
                    deferred.pending.lock().unwrap().add(diagnostic);
                }
            }
        }
    }

    fn print(&self, diagnostics: &[UntaggedDiagnostic], choice: ColorChoice) {
        let map = self.map.as_ref().map(|map| map.read().unwrap());

        let _ = epaint(
            |painter| {
                for diagnostic in diagnostics {
                    diagnostic.render(map.as_deref(), painter)?;
                    write!(painter, "\n\n")?;
                }
                Ok(())
            },
            choice,
        );
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        let Sink::Stderr { choice, deferred: Some(deferred) } = &self.sink else {
            return;
        };

        let Pending { warnings, errors } = mem::take(&mut *deferred.pending.lock().unwrap());

        if !warnings.is_empty() {
            let summary = warning_summary(warnings.len());
            self.print(&warnings.into_iter().chain([summary]).collect::<Vec<_>>(), *choice);
        }

        if !errors.is_empty() {
            deferred.reported_any_errors.store(true, Ordering::SeqCst);
            let summary = error_summary(&errors);
            self.print(&errors.into_iter().chain([summary]).collect::<Vec<_>>(), *choice);
        }
    }
}

enum Sink {
    Silent,
    Buffer(Buffer),
    Stderr { choice: ColorChoice, deferred: Option<Deferred> },
}

pub type Buffer = Arc<Mutex<BTreeSet<UntaggedDiagnostic>>>;

struct Deferred {
    pending: Mutex<Pending>,
    reported_any_errors: Arc<AtomicBool>,
}

#[derive(Default)]
struct Pending {
    warnings: BTreeSet<UntaggedDiagnostic>,
    errors: BTreeSet<UntaggedDiagnostic>,
}

impl Pending {
    fn add(&mut self, diagnostic: UntaggedDiagnostic) {
        match diagnostic.severity {
            Severity::Bug | Severity::Error => self.errors.insert(diagnostic),
            Severity::Warning | Severity::Debug => self.warnings.insert(diagnostic),
        };
    }
}

pub(crate) fn error_summary(errors: &BTreeSet<UntaggedDiagnostic>) -> UntaggedDiagnostic {
    let count = errors.len();
    let explained: BTreeSet<_> = errors
        .iter()
        .filter_map(|error| error.error_code())
        .filter(|code| code.explanation().is_some())
        .collect();

    let mut summary = Diagnostic::error().message(pluralize!(
        count,
        "aborting due to previous error",
        format!("aborting due to {count} previous errors"),
    ));

    if let Some(first) = explained.first() {
        let amount = explained.len();

        summary = summary
            .note(format!(
                "the {} {} {} a detailed explanation",
                pluralize!(amount, "error"),
                explained.iter().list(Conjunction::And),
                pluralize!(amount, "has", "have"),
            ))
            .help(match amount {
                1 => format!("run ‘strata explain {first}’ to view it"),
                _ => "run ‘strata explain <CODE>’ to view a selection of them".to_owned(),
            });
    }

    summary.into_untagged()
}

fn warning_summary(amount: usize) -> UntaggedDiagnostic {
    Diagnostic::warning()
        .message(format!("emitted {amount} {}", pluralize!(amount, "warning")))
        .into_untagged()
}

/// A witness to / token for a [reported](Diagnostic::report) error.
///
/// Only [`Diagnostic::report`] and [`Self::new_unchecked`] construct one, so a function
/// returning it as its error has reported something on failure (disregarding buffering).
///
/// Values of this type are isomorphic to `()`, resolution slots cache failures by value.
///
/// # Soundness Holes
///
/// Values of this type can be obtained from a silent reporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErasedReportedError(());

impl ErasedReportedError {
    pub(crate) const fn new() -> Self {
        Self(())
    }

    /// Obtain a witness without reporting a diagnostic.
    ///
    /// Only use this if a diagnostic was reported through other means.
    pub const fn new_unchecked() -> Self {
        Self::new()
    }
}
