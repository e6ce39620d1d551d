//! Names and the entities they denote.
//!
//! An [`Entity`] is what a name resolves to: a type, a type set, a function, a task or
//! a plan. Entities are immutable once created and shared by reference counting. Two
//! entities are *the same* if they are the same allocation and *equal* if they are
//! structurally equal disregarding their [origin](Origin).

pub use annotation::{Annotation, AnnotationError};
pub use definition::{
    Attribute, Entity, Function, FunctionKind, ObjectType, Origin, Parameter, Plan, Task, Type,
    TypeExpression, TypeKind, TypeSet, Version,
};
pub use name::{runtime_authority, Namespace, TypedName, RUNTIME_AUTHORITY};

mod annotation;
mod definition;
mod name;
