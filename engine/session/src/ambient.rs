//! The current context of a thread.
//!
//! Passing a [`Context`] explicitly is the norm. This registry only serves the outermost
//! entry points of callers that cannot thread a context through. Install a context with
//! [`run_with_current`] and obtain it with [`current`] or [`with_current`]. Nested
//! installations restore the previously installed context when they end, also when the
//! body unwinds.

use crate::Context;
use diagnostics::{Diagnostic, ErrorCode};
use std::{cell::RefCell, rc::Rc};

pub type Shared = Rc<RefCell<Context>>;

thread_local! {
    static CURRENT: RefCell<Option<Shared>> = const { RefCell::new(None) };
}

/// Run the body with the given context installed as the current one.
pub fn run_with_current<T>(cx: Shared, body: impl FnOnce() -> T) -> T {
    let previous = CURRENT.with(|current| current.replace(Some(cx)));
    let _restore = Restore(previous);
    body()
}

/// The current context.
///
/// # Errors
///
/// Returns an unreported diagnostic if there is no current context since there is no
/// reporter to report it to either.
pub fn current() -> Result<Shared, Diagnostic> {
    CURRENT
        .with(|current| current.borrow().clone())
        .ok_or_else(no_current_context)
}

/// Run the body with exclusive access to the current context.
///
/// # Panics
///
/// Panics if the current context is already borrowed by an enclosing call.
pub fn with_current<T>(body: impl FnOnce(&mut Context) -> T) -> Result<T, Diagnostic> {
    let cx = current()?;
    let mut cx = cx.borrow_mut();
    Ok(body(&mut cx))
}

pub fn is_set() -> bool {
    CURRENT.with(|current| current.borrow().is_some())
}

/// Uninstall any current context of this thread.
pub fn reset() {
    CURRENT.with(|current| current.replace(None));
}

struct Restore(Option<Shared>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = CURRENT.try_with(|current| current.replace(previous));
    }
}

fn no_current_context() -> Diagnostic {
    Diagnostic::error()
        .code(ErrorCode::E007)
        .message("there is no current context")
        .help("run the code inside of an environment")
}
