//! Definition documents and their instantiators.
//!
//! Definitions are TOML documents. A type document has exactly one body:
//!
//! ```toml
//! # types/address.toml
//! [object]
//! parent = "Location"
//! constructible = true
//! attributes = { street = "String", zip = { type = "String", optional = true } }
//!
//! [annotations]
//! tags = { street = ["indexed"] }
//! ```
//!
//! An `alias = "Integer[0, 65535]"` or a `[type_set]` with a `version` and nested
//! `types` are the other bodies. Function, task and plan documents list their
//! `parameters`; functions and tasks may declare what they `returns`, plans list their
//! `steps`.

use crate::ContentProvider;
use diagnostics::{error::Result, ErasedReportedError, ErrorCode};
use entity::{
    Annotation, Attribute, Entity, Function, FunctionKind, ObjectType, Origin, Parameter, Plan,
    Task, Type, TypeExpression, TypeKind, TypeSet, TypedName, Version,
};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize};
use session::{resolve, Context};
use span::{Location, SourceFile};
use std::{path::PathBuf, sync::Arc};
use url::Url;
use utility::QuoteExt;

pub fn type_(
    cx: &mut Context,
    provider: &dyn ContentProvider,
    name: &TypedName,
    sources: &[PathBuf],
) -> Result {
    let Some(source) = read::<TypeDocument>(cx, provider, sources)? else {
        return Ok(());
    };

    check_declared_name(cx, &source, name, source.document.name.as_deref())?;

    let authority = provider.name_authority();
    let entity = build_type(cx, &source, name, &source.document, &authority)?;
    resolve::add_types(cx, vec![entity])?;
    Ok(())
}

pub fn function(
    cx: &mut Context,
    provider: &dyn ContentProvider,
    name: &TypedName,
    sources: &[PathBuf],
) -> Result {
    let Some(source) = read::<FunctionDocument>(cx, provider, sources)? else {
        return Ok(());
    };

    let document = &source.document;
    check_declared_name(cx, &source, name, document.name.as_deref())?;

    let function = Function {
        name: name.clone(),
        kind: FunctionKind::Regular,
        parameters: parameters(&document.parameters),
        returns: document.returns.as_deref().map(TypeExpression::new),
        origin: source.origin(),
    };

    resolve::add_types(cx, vec![Entity::Function(Arc::new(function))])?;
    Ok(())
}

pub fn task(
    cx: &mut Context,
    provider: &dyn ContentProvider,
    name: &TypedName,
    sources: &[PathBuf],
) -> Result {
    let Some(source) = read::<TaskDocument>(cx, provider, sources)? else {
        return Ok(());
    };

    let document = &source.document;
    check_declared_name(cx, &source, name, document.name.as_deref())?;

    let task = Task {
        name: name.clone(),
        parameters: parameters(&document.parameters),
        returns: document.returns.as_deref().map(TypeExpression::new),
        origin: source.origin(),
    };

    resolve::add_types(cx, vec![Entity::Task(Arc::new(task))])?;
    Ok(())
}

pub fn plan(
    cx: &mut Context,
    provider: &dyn ContentProvider,
    name: &TypedName,
    sources: &[PathBuf],
) -> Result {
    let Some(source) = read::<PlanDocument>(cx, provider, sources)? else {
        return Ok(());
    };

    let document = &source.document;
    check_declared_name(cx, &source, name, document.name.as_deref())?;

    let plan = Plan {
        name: name.clone(),
        parameters: parameters(&document.parameters),
        steps: document.steps.clone(),
        origin: source.origin(),
    };

    resolve::add_types(cx, vec![Entity::Plan(Arc::new(plan))])?;
    Ok(())
}

/// A parsed document together with the file it was read from.
struct Source<D> {
    file: SourceFile,
    document: D,
}

impl<D> Source<D> {
    /// The start of the file.
    fn location(&self) -> Location {
        self.file.location(0..0)
    }

    fn origin(&self) -> Origin {
        Origin(self.location())
    }
}

/// Read and parse the first of the given sources.
fn read<D: DeserializeOwned>(
    cx: &Context,
    provider: &dyn ContentProvider,
    sources: &[PathBuf],
) -> Result<Option<Source<D>>> {
    let Some(path) = sources.first() else {
        return Ok(None);
    };

    if sources.len() > 1 {
        tracing::debug!(
            path = %path.display(),
            candidates = sources.len(),
            "several sources define the same name, picking the first one",
        );
    }

    let index = provider.get_content(cx, path)?;
    let file = cx.map().read().unwrap()[index].clone();

    match toml::from_str::<D>(file.content()) {
        Ok(document) => Ok(Some(Source { file, document })),
        Err(error) => {
            let location = file.location(error.span().unwrap_or(0..0));

            Err(cx
                .error(ErrorCode::E003, Some(location))
                .message(format!("malformed definition document {}", path.display().quote()))
                .argument("path", path.display())
                .argument("detail", error.message())
                .note(error.message().to_owned())
                .report(cx.rep()))
        }
    }
}

fn check_declared_name<D>(
    cx: &Context,
    source: &Source<D>,
    name: &TypedName,
    declared: Option<&str>,
) -> Result {
    let Some(declared) = declared else {
        return Ok(());
    };

    if name.is_named(declared) {
        return Ok(());
    }

    Err(cx
        .error(ErrorCode::E004, Some(source.location()))
        .message(format!(
            "expected the document to define the {} {}, but it defines {}",
            name.namespace(),
            name.quote(),
            declared.quote(),
        ))
        .argument("source", source.file.name())
        .argument("namespace", name.namespace())
        .argument("expected", name)
        .argument("actual", declared)
        .report(cx.rep()))
}

fn build_type(
    cx: &Context,
    source: &Source<TypeDocument>,
    name: &TypedName,
    document: &TypeDocument,
    authority: &Url,
) -> Result<Entity> {
    let origin = source.origin();

    let body = match (&document.alias, &document.object, &document.type_set) {
        (Some(alias), None, None) => Body::Alias(alias),
        (None, Some(object), None) => Body::Object(object),
        (None, None, Some(set)) => Body::TypeSet(set),
        _ => return Err(body_error(cx, name, document, origin.0)),
    };

    let annotations = document
        .annotations
        .as_ref()
        .map(AnnotationsDocument::lower)
        .unwrap_or_default();

    let kind = match body {
        Body::Alias(alias) => TypeKind::Alias(TypeExpression::new(alias)),
        Body::Object(object) => TypeKind::Object(ObjectType {
            parent: object.parent.clone(),
            attributes: object
                .attributes
                .iter()
                .map(|(name, attribute)| (name.clone(), attribute.lower()))
                .collect(),
            constructible: object.constructible,
        }),
        Body::TypeSet(set) => {
            return build_type_set(cx, source, name, set, authority, origin);
        }
    };

    Ok(Entity::Type(Arc::new(Type { name: name.clone(), kind, annotations, origin })))
}

fn build_type_set(
    cx: &Context,
    source: &Source<TypeDocument>,
    name: &TypedName,
    set: &TypeSetDocument,
    authority: &Url,
    origin: Origin,
) -> Result<Entity> {
    let Some(version) = Version::parse(&set.version) else {
        return Err(cx
            .error(ErrorCode::E014, Some(origin.0))
            .message(format!(
                "the version {} of the type set {} is not of the form ‘major.minor.patch’",
                (&set.version).quote(),
                name.quote(),
            ))
            .argument("name", name)
            .argument("version", &set.version)
            .report(cx.rep()));
    };

    let authority = match &set.name_authority {
        Some(authority) => Url::parse(authority).map_err(|error| {
            cx.error(ErrorCode::E003, Some(origin.0.clone()))
                .message(format!(
                    "the name authority {} of the type set {} is not a valid URL",
                    authority.quote(),
                    name.quote(),
                ))
                .argument("name", name)
                .argument("detail", error)
                .report(cx.rep())
        })?,
        None => authority.clone(),
    };

    let mut types = IndexMap::with_capacity(set.types.len());

    for (member, document) in &set.types {
        let member_name = name.child(member);

        if let Some(declared) = document.name.as_deref() {
            if !member_name.is_named(declared) {
                return Err(cx
                    .error(ErrorCode::E004, Some(origin.0.clone()))
                    .message(format!(
                        "the member {} of the type set {} declares the name {}",
                        member.quote(),
                        name.quote(),
                        declared.quote(),
                    ))
                    .argument("expected", &member_name)
                    .argument("actual", declared)
                    .report(cx.rep()));
            }
        }

        let entity = build_type(cx, source, &member_name, document, &authority)?;
        types.insert(member.clone(), entity);
    }

    Ok(Entity::TypeSet(Arc::new(TypeSet {
        name: name.clone(),
        version,
        authority,
        types,
        origin,
    })))
}

fn body_error(
    cx: &Context,
    name: &TypedName,
    document: &TypeDocument,
    location: Location,
) -> ErasedReportedError {
    let bodies: Vec<_> = [
        ("alias", document.alias.is_some()),
        ("object", document.object.is_some()),
        ("type_set", document.type_set.is_some()),
    ]
    .into_iter()
    .filter_map(|(body, present)| present.then_some(body))
    .collect();

    let message = match bodies.as_slice() {
        [] => format!("the definition of the type {} has no body", name.quote()),
        _ => format!("the definition of the type {} has several bodies", name.quote()),
    };

    cx.error(ErrorCode::E013, Some(location))
        .message(message)
        .argument("name", name)
        .argument("bodies", bodies.len())
        .help("define exactly one of ‘alias’, ‘object’ or ‘type_set’")
        .report(cx.rep())
}

fn parameters(documents: &[ParameterDocument]) -> Vec<Parameter> {
    documents
        .iter()
        .map(|parameter| Parameter {
            name: parameter.name.clone(),
            ty: TypeExpression::new(&parameter.ty),
            optional: parameter.optional,
        })
        .collect()
}

enum Body<'a> {
    Alias(&'a str),
    Object(&'a ObjectDocument),
    TypeSet(&'a TypeSetDocument),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeDocument {
    name: Option<String>,
    alias: Option<String>,
    object: Option<ObjectDocument>,
    type_set: Option<TypeSetDocument>,
    annotations: Option<AnnotationsDocument>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectDocument {
    parent: Option<String>,
    #[serde(default)]
    attributes: IndexMap<String, AttributeDocument>,
    #[serde(default)]
    constructible: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeDocument {
    Type(String),
    Full {
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        optional: bool,
    },
}

impl AttributeDocument {
    fn lower(&self) -> Attribute {
        match self {
            Self::Type(ty) => Attribute { ty: TypeExpression::new(ty), optional: false },
            Self::Full { ty, optional } => {
                Attribute { ty: TypeExpression::new(ty), optional: *optional }
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeSetDocument {
    version: String,
    name_authority: Option<String>,
    #[serde(default)]
    types: IndexMap<String, TypeDocument>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AnnotationsDocument {
    deprecated: Option<Deprecation>,
    #[serde(default)]
    tags: IndexMap<String, Vec<String>>,
}

impl AnnotationsDocument {
    fn lower(&self) -> Vec<Annotation> {
        let mut annotations: Vec<_> = self
            .tags
            .iter()
            .map(|(attribute, tags)| Annotation::Tags {
                attribute: attribute.clone(),
                tags: tags.clone(),
            })
            .collect();

        match &self.deprecated {
            Some(Deprecation::Flag(true)) => {
                annotations.push(Annotation::Deprecated { message: None });
            }
            Some(Deprecation::Message(message)) => {
                annotations.push(Annotation::Deprecated { message: Some(message.clone()) });
            }
            Some(Deprecation::Flag(false)) | None => {}
        }

        annotations
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Deprecation {
    Flag(bool),
    Message(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterDocument {
    name: String,
    #[serde(rename = "type", default = "any")]
    ty: String,
    #[serde(default)]
    optional: bool,
}

fn any() -> String {
    "Any".into()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionDocument {
    name: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterDocument>,
    returns: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskDocument {
    name: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterDocument>,
    returns: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanDocument {
    name: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterDocument>,
    #[serde(default)]
    steps: Vec<String>,
}
