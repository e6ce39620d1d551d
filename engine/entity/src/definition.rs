use crate::{Annotation, Namespace, TypedName};
use indexmap::IndexMap;
use span::Location;
use std::{fmt, sync::Arc};
use url::Url;
use utility::{obtain, QuoteExt};

/// What a name resolves to.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Entity {
    Type(Arc<Type>),
    TypeSet(Arc<TypeSet>),
    Function(Arc<Function>),
    Task(Arc<Task>),
    Plan(Arc<Plan>),
}

impl Entity {
    pub fn name(&self) -> &TypedName {
        match self {
            Self::Type(type_) => &type_.name,
            Self::TypeSet(set) => &set.name,
            Self::Function(function) => &function.name,
            Self::Task(task) => &task.name,
            Self::Plan(plan) => &plan.name,
        }
    }

    pub fn origin(&self) -> &Location {
        let origin = match self {
            Self::Type(type_) => &type_.origin,
            Self::TypeSet(set) => &set.origin,
            Self::Function(function) => &function.origin,
            Self::Task(task) => &task.origin,
            Self::Plan(plan) => &plan.origin,
        };
        &origin.0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::TypeSet(_) => "type set",
            Self::Function(function) => match function.kind {
                FunctionKind::Regular => "function",
                FunctionKind::Constructor { .. } => "constructor",
            },
            Self::Task(_) => "task",
            Self::Plan(_) => "plan",
        }
    }

    /// Whether both entities are the very same allocation.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Type(this), Self::Type(other)) => Arc::ptr_eq(this, other),
            (Self::TypeSet(this), Self::TypeSet(other)) => Arc::ptr_eq(this, other),
            (Self::Function(this), Self::Function(other)) => Arc::ptr_eq(this, other),
            (Self::Task(this), Self::Task(other)) => Arc::ptr_eq(this, other),
            (Self::Plan(this), Self::Plan(other)) => Arc::ptr_eq(this, other),
            _ => false,
        }
    }

    pub fn as_type(&self) -> Option<&Arc<Type>> {
        obtain!(self, Self::Type(type_) => type_)
    }

    pub fn as_type_set(&self) -> Option<&Arc<TypeSet>> {
        obtain!(self, Self::TypeSet(set) => set)
    }

    pub fn annotations(&self) -> &[Annotation] {
        match self {
            Self::Type(type_) => &type_.annotations,
            Self::TypeSet(_) | Self::Function(_) | Self::Task(_) | Self::Plan(_) => &[],
        }
    }

    /// The constructor of a constructible object type.
    pub fn constructor(&self) -> Option<Self> {
        let type_ = self.as_type()?;
        let TypeKind::Object(object) = &type_.kind else {
            return None;
        };

        if !object.constructible {
            return None;
        }

        let parameters = object
            .attributes
            .iter()
            .map(|(name, attribute)| Parameter {
                name: name.clone(),
                ty: attribute.ty.clone(),
                optional: attribute.optional,
            })
            .collect();

        Some(Self::Function(Arc::new(Function {
            name: type_.name.with_namespace(Namespace::Constructor),
            kind: FunctionKind::Constructor { of: type_.name.clone() },
            parameters,
            returns: Some(TypeExpression(type_.name.name().to_owned())),
            origin: type_.origin.clone(),
        })))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name().quote())
    }
}

/// Where a definition comes from.
///
/// Origins never take part in structural equality: two definitions that only differ in
/// their origin are equal.
#[derive(Clone, Debug, Default)]
pub struct Origin(pub Location);

impl PartialEq for Origin {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for Origin {}

impl From<Location> for Origin {
    fn from(location: Location) -> Self {
        Self(location)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Type {
    pub name: TypedName,
    pub kind: TypeKind,
    pub annotations: Vec<Annotation>,
    pub origin: Origin,
}

impl Type {
    pub fn builtin(name: &str) -> Self {
        Self {
            name: TypedName::new(Namespace::Type, name),
            kind: TypeKind::Builtin,
            annotations: Vec::new(),
            origin: Origin::default(),
        }
    }

    pub fn object(&self) -> Option<&ObjectType> {
        obtain!(&self.kind, TypeKind::Object(object) => object)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypeKind {
    /// A type known to the system without a definition document.
    Builtin,
    /// An alias for a type expression.
    Alias(TypeExpression),
    Object(ObjectType),
}

/// The text of a type expression.
///
/// Parsing and checking type expressions is the business of the type system, names
/// merely carry them around.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeExpression(pub String);

impl TypeExpression {
    /// Create an expression with normalized whitespace.
    pub fn new(text: &str) -> Self {
        Self(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

impl fmt::Display for TypeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ObjectType {
    /// The unresolved name of the parent type.
    pub parent: Option<String>,
    pub attributes: IndexMap<String, Attribute>,
    pub constructible: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Attribute {
    pub ty: TypeExpression,
    pub optional: bool,
}

/// A named, versioned container of definitions.
///
/// Members are keyed by their name relative to the set. Their own names are fully
/// qualified.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeSet {
    pub name: TypedName,
    pub version: Version,
    pub authority: Url,
    pub types: IndexMap<String, Entity>,
    pub origin: Origin,
}

impl TypeSet {
    pub fn member(&self, relative: &str) -> Option<&Entity> {
        self.types.get(relative).or_else(|| {
            self.types
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(relative))
                .map(|(_, entity)| entity)
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Parse a version of the form `major.minor.patch`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.').map(str::parse::<u64>);

        let version = Self {
            major: parts.next()?.ok()?,
            minor: parts.next()?.ok()?,
            patch: parts.next()?.ok()?,
        };

        match parts.next() {
            Some(_) => None,
            None => Some(version),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Function {
    pub name: TypedName,
    pub kind: FunctionKind,
    pub parameters: Vec<Parameter>,
    pub returns: Option<TypeExpression>,
    pub origin: Origin,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FunctionKind {
    Regular,
    Constructor { of: TypedName },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeExpression,
    pub optional: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Task {
    pub name: TypedName,
    pub parameters: Vec<Parameter>,
    pub returns: Option<TypeExpression>,
    pub origin: Origin,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Plan {
    pub name: TypedName,
    pub parameters: Vec<Parameter>,
    /// The names of the tasks run by the plan, in order.
    pub steps: Vec<String>,
    pub origin: Origin,
}
