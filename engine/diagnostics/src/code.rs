use std::fmt;
use strum::{EnumIter, EnumString, IntoStaticStr};
use utility::obtain;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Code {
    Error(ErrorCode),
    Lint(LintCode),
}

impl From<ErrorCode> for Code {
    fn from(code: ErrorCode) -> Self {
        Self::Error(code)
    }
}

impl From<LintCode> for Code {
    fn from(code: LintCode) -> Self {
        Self::Lint(code)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(code) => write!(f, "{code}"),
            Self::Lint(code) => write!(f, "{code}"),
        }
    }
}

/// An error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(EnumIter, EnumString)]
#[forbid(missing_docs)]
pub enum ErrorCode {
    /// _Permanently unassigned_ (used in tests).
    E000,
    /// Unable to read a source file.
    E001,
    /// Unable to index a directory.
    E002,
    /// Malformed definition document.
    E003,
    /// Definition of a name other than the requested one.
    E004,
    /// Module entry point not defining a type set.
    E005,
    /// Redefinition with a different definition.
    E006,
    /// No current context.
    E007,
    /// Undefined parent type.
    E008,
    /// Invalid annotation.
    E009,
    /// Malformed name.
    E010,
    /// Conflicting implementation mapping.
    E011,
    /// Invalid module path.
    E012,
    /// Definition document without a body or with several bodies.
    E013,
    /// Invalid type set version.
    E014,
    /// Parent type not being an object type.
    E015,
}

impl ErrorCode {
    pub const fn explanation(self) -> Option<&'static str> {
        Some(match self {
            Self::E001 => EXPLANATION_E001,
            Self::E002 => EXPLANATION_E002,
            Self::E004 => EXPLANATION_E004,
            Self::E005 => EXPLANATION_E005,
            Self::E006 => EXPLANATION_E006,
            Self::E008 => EXPLANATION_E008,
            Self::E013 => EXPLANATION_E013,
            _ => return None,
        })
    }
}

impl TryFrom<Code> for ErrorCode {
    type Error = ();

    fn try_from(value: Code) -> Result<Self, Self::Error> {
        obtain!(value, Code::Error(code) => code).ok_or(())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum LintCode {
    /// _Permanently unassigned_ (used in tests).
    PermanentlyUnassigned,
    /// Use of a type annotated as deprecated.
    Deprecated,
    /// Module directory whose name is not a valid module name.
    InvalidModuleName,
}

impl LintCode {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for LintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const EXPLANATION_E001: &str = "\
A source file that was found while indexing the directories of a module could not be read.

The file was listed in the directory index, so it existed when the index was built. It was
either removed afterwards or its permissions do not allow reading it. Definitions are never
looked up again after such a failure for the lifetime of the process.";

const EXPLANATION_E002: &str = "\
A directory of a module could not be walked while building its index.

A missing directory is fine and yields an empty index. Any other failure, like a directory
that cannot be listed, aborts the lookup.";

const EXPLANATION_E004: &str = "\
A definition file declares a name that differs from the name derived from its path.

For example, the file `types/address.toml` of the module `shop` is expected to define the
type `Shop::Address`. Declaring `name = \"Location\"` in it is an error. The comparison is
case-insensitive and the declared name may omit the module prefix.";

const EXPLANATION_E005: &str = "\
The type entry point of a module does not define a type set.

Requesting the type named like the module itself loads the file `types/init_typeset.toml`
of the module. That file has to contain a `type_set` body.";

const EXPLANATION_E006: &str = "\
A name was registered twice with two different definitions.

Registering the same definition again is accepted and keeps the first registration. This
typically happens when two type sets define a member with the same name but a different
body, or when a type set redefines a type that already has its own definition file.";

const EXPLANATION_E008: &str = "\
An object type names a parent type that cannot be resolved.

Parent names inside a type set are first looked up relative to the type set and then as
absolute names.";

const EXPLANATION_E013: &str = "\
A definition document has to contain exactly one body.

For type documents the possible bodies are `alias`, `object` and `type_set`.";
