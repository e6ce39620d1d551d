//! The structural resolution pass.
//!
//! Turns freshly instantiated definitions into registered and validated entities:
//!
//! 1. Every definition is registered under its own name before anything else happens,
//!    so that definitions of the same batch can refer to each other.
//! 2. Type sets are flattened: their members are registered as well, recursively.
//!    Members that already have an entry are skipped.
//! 3. Parents of object types are resolved and annotations are validated, in
//!    registration order.
//! 4. Constructors of constructible object types are registered.
//!
//! All registrations go into the active loader of the context.

use crate::{Context, Entry, Loader};
use diagnostics::{
    error::{Health, Result, Stain},
    ErrorCode,
};
use entity::{Entity, Namespace, Type, TypeKind, TypeSet, TypedName};
use std::sync::Arc;
use utility::QuoteExt;

/// Register and validate the given top-level definitions.
///
/// Returns the registered entities in registration order, members of type sets included.
pub fn add_types(cx: &mut Context, definitions: Vec<Entity>) -> Result<Vec<Entity>> {
    let mut pass = Pass::new(cx);
    let mut sets = Vec::new();

    for definition in definitions {
        let name = definition.name().clone();
        let entity = pass.loader.set_entry(cx, &name, definition)?;

        if let Entity::TypeSet(set) = &entity {
            sets.push(set.clone());
        }
        pass.registered.push(Registered { entity, scope: None });
    }

    for set in sets {
        pass.flatten(cx, &set)?;
    }

    pass.finish(cx)
}

/// Register the members of an already registered type set.
///
/// Used when a member of a type set is requested before the type set itself.
pub fn resolve_type_set(cx: &mut Context, set: &Arc<TypeSet>) -> Result<Vec<Entity>> {
    let mut pass = Pass::new(cx);
    pass.flatten(cx, set)?;
    pass.finish(cx)
}

struct Pass {
    loader: Arc<dyn Loader>,
    registered: Vec<Registered>,
}

struct Registered {
    entity: Entity,
    /// The name of the type set the entity was found in.
    scope: Option<TypedName>,
}

impl Pass {
    fn new(cx: &mut Context) -> Self {
        Self { loader: cx.loader_for_registration().clone(), registered: Vec::new() }
    }

    fn flatten(&mut self, cx: &mut Context, set: &Arc<TypeSet>) -> Result {
        tracing::debug!(set = %set.name, members = set.types.len(), "flattening type set");

        for member in set.types.values() {
            let name = member.name();

            if let Some(Entry::Found(_)) = self.loader.get_entry(name) {
                continue;
            }

            let entity = self.loader.set_entry(cx, name, member.clone())?;
            let nested = entity.as_type_set().cloned();

            self.registered
                .push(Registered { entity, scope: Some(set.name.clone()) });

            if let Some(nested) = nested {
                self.flatten(cx, &nested)?;
            }
        }

        Ok(())
    }

    fn finish(self, cx: &mut Context) -> Result<Vec<Entity>> {
        let mut health = Health::default();

        for registered in &self.registered {
            check_parent(cx, registered).stain(&mut health);
            check_annotations(cx, &registered.entity).stain(&mut health);
        }

        if let Err(error) = Result::<()>::from(health) {
            for registered in &self.registered {
                self.loader.fail_entry(registered.entity.name(), error);
            }
            return Err(error);
        }

        for registered in &self.registered {
            if let Some(constructor) = registered.entity.constructor() {
                let name = constructor.name().clone();
                self.loader.set_entry(cx, &name, constructor)?;
            }
        }

        Ok(self
            .registered
            .into_iter()
            .map(|registered| registered.entity)
            .collect())
    }
}

fn check_parent(cx: &mut Context, registered: &Registered) -> Result {
    let Some(type_) = registered.entity.as_type() else {
        return Ok(());
    };
    let Some(parent) = type_.object().and_then(|object| object.parent.as_deref()) else {
        return Ok(());
    };

    let location = Some(registered.entity.origin().clone());

    let Some(absolute) = TypedName::parse(Namespace::Type, parent) else {
        return Err(cx
            .error(ErrorCode::E010, location)
            .message(format!("the parent type name {} is malformed", parent.quote()))
            .argument("name", parent)
            .report(cx.rep()));
    };

    let mut candidates = Vec::with_capacity(2);
    if let Some(scope) = &registered.scope {
        candidates.push(scope.child(parent));
    }
    candidates.push(absolute);

    for candidate in &candidates {
        let Some(resolved) = cx.resolve(candidate)? else {
            continue;
        };

        return match &resolved {
            Entity::Type(parent_type) if is_object_type(parent_type) => Ok(()),
            _ => Err(cx
                .error(ErrorCode::E015, location)
                .message(format!(
                    "the parent of the type {} is not an object type",
                    (&type_.name).quote(),
                ))
                .argument("name", &type_.name)
                .argument("parent", resolved.name())
                .note(format!("{} is a {}", resolved.name().quote(), resolved.kind()))
                .report(cx.rep())),
        };
    }

    Err(cx
        .error(ErrorCode::E008, location)
        .message(format!(
            "the parent type {} of the type {} is not defined",
            parent.quote(),
            (&type_.name).quote(),
        ))
        .argument("name", &type_.name)
        .argument("parent", parent)
        .report(cx.rep()))
}

fn is_object_type(type_: &Type) -> bool {
    match type_.kind {
        TypeKind::Object(_) => true,
        TypeKind::Builtin => type_.name.name() == "Object",
        TypeKind::Alias(_) => false,
    }
}

fn check_annotations(cx: &Context, entity: &Entity) -> Result {
    let Some(owner) = entity.as_type() else {
        return Ok(());
    };

    let mut health = Health::default();

    for annotation in &owner.annotations {
        if let Err(error) = annotation.validate(owner) {
            let error = cx
                .error(ErrorCode::E009, Some(entity.origin().clone()))
                .message(format!(
                    "invalid annotation {} on the type {}",
                    annotation.name().quote(),
                    (&owner.name).quote(),
                ))
                .argument("name", &owner.name)
                .argument("annotation", annotation.name())
                .note(error.to_string())
                .report(cx.rep());
            health.taint(error);
        }
    }

    health.into()
}
