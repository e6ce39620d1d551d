//! Error handling mechanisms.

use crate::reporter::ErasedReportedError;

pub type Result<T = (), E = ErasedReportedError> = std::result::Result<T, E>;

/// The accumulated state of several fallible operations that do not abort each other.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[must_use]
pub enum Health {
    #[default]
    Untainted,
    Tainted(ErasedReportedError),
}

impl Health {
    pub fn taint(&mut self, error: ErasedReportedError) {
        if *self == Self::Untainted {
            *self = Self::Tainted(error);
        }
    }

    pub fn is_tainted(self) -> bool {
        matches!(self, Self::Tainted(_))
    }
}

impl From<Result> for Health {
    fn from(result: Result) -> Self {
        match result {
            Ok(()) => Self::Untainted,
            Err(error) => Self::Tainted(error),
        }
    }
}

impl From<Health> for Result {
    fn from(health: Health) -> Self {
        match health {
            Health::Untainted => Ok(()),
            Health::Tainted(error) => Err(error),
        }
    }
}

pub trait Stain<T> {
    /// Taint the given health on error.
    fn stain(self, health: &mut Health) -> Option<T>;
}

impl<T> Stain<T> for Result<T> {
    fn stain(self, health: &mut Health) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                health.taint(error);
                None
            }
        }
    }
}
