//! Utility functionality and definitions.

use std::{ffi::OsStr, fmt, path::Path};
use strum::Display;

pub use rustc_hash::FxHashMap as HashMap;

pub mod case;
pub mod paint;

#[cfg(test)]
mod test;

/// The file extension of definition documents.
pub const FILE_EXTENSION: &str = "toml";

pub type Str = std::borrow::Cow<'static, str>;

pub type SmallVec<T, const N: usize> = smallvec::SmallVec<[T; N]>;

pub fn has_file_extension(path: &Path, required_extension: &str) -> bool {
    path.extension().and_then(OsStr::to_str) == Some(required_extension)
}

#[macro_export]
macro_rules! obtain {
    ($expr:expr, $pat:pat $( if $guard:expr )? $(,)? => $mapping:expr $(,)?) => {
        match $expr {
            $pat $( if $guard )? => Some($mapping),
            _ => None
        }
    };
}

/// Use the singular or the plural form of the given word depending on the given amount.
///
/// # Examples
///
/// ```
/// # use utility::pluralize;
/// assert_eq!(pluralize!(1, "factor"), "factor");
/// assert_eq!(pluralize!(15, "factor"), "factors");
/// assert_eq!(pluralize!(0, "person", "people"), "people");
/// ```
#[macro_export]
macro_rules! pluralize {
    ($amount:expr, $singular:expr, $plural:expr $(,)?) => {
        match $amount {
            1 => std::borrow::Cow::<'_, str>::from($singular),
            _ => $plural.into(),
        }
    };
    ($amount:expr, $singular:literal $(,)?) => {
        match $amount {
            1 => $singular,
            _ => concat!($singular, "s"),
        }
    };
}

pub fn default<T: Default>() -> T {
    T::default()
}

/// Join the items as an enumeration in prose, e.g. ‘a, b and c’.
pub trait ListingExt {
    fn list(self, conjunction: Conjunction) -> String;
}

impl<I> ListingExt for I
where
    I: Iterator,
    I::Item: fmt::Display,
{
    fn list(self, conjunction: Conjunction) -> String {
        let mut items: Vec<_> = self.map(|item| item.to_string()).collect();

        match items.pop() {
            Some(last) if items.is_empty() => last,
            Some(last) => format!("{} {conjunction} {last}", items.join(", ")),
            None => String::new(),
        }
    }
}

#[derive(Clone, Copy, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Conjunction {
    And,
    Or,
}

pub trait QuoteExt {
    fn quote(self) -> String;
}

impl<D: fmt::Display> QuoteExt for D {
    fn quote(self) -> String {
        format!("‘{self}’")
    }
}

/// Render an error as the detail of a diagnostic.
pub trait FormatError {
    fn format(self) -> String;
}

impl FormatError for std::io::Error {
    fn format(self) -> String {
        match self.kind() {
            std::io::ErrorKind::NotFound => "it does not exist".into(),
            std::io::ErrorKind::PermissionDenied => "the permission was denied".into(),
            _ => self.to_string(),
        }
    }
}
