use crate::{Type, TypeKind};
use std::fmt;
use utility::QuoteExt;

/// Metadata attached to a type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Annotation {
    /// Tags for an attribute of an object type.
    Tags { attribute: String, tags: Vec<String> },
    Deprecated { message: Option<String> },
}

impl Annotation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tags { .. } => "tags",
            Self::Deprecated { .. } => "deprecated",
        }
    }

    /// Check that the annotation fits the type it is attached to.
    pub fn validate(&self, owner: &Type) -> Result<(), AnnotationError> {
        match self {
            Self::Tags { attribute, tags } => {
                let TypeKind::Object(object) = &owner.kind else {
                    return Err(AnnotationError::NotAnObject);
                };

                if !object.attributes.contains_key(attribute) {
                    return Err(AnnotationError::UndefinedAttribute(attribute.clone()));
                }

                if tags.is_empty() {
                    return Err(AnnotationError::NoTags(attribute.clone()));
                }

                Ok(())
            }
            Self::Deprecated { .. } => Ok(()),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AnnotationError {
    NotAnObject,
    UndefinedAttribute(String),
    NoTags(String),
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "only object types can be annotated with tags"),
            Self::UndefinedAttribute(attribute) => {
                write!(f, "the attribute {} is not defined", attribute.quote())
            }
            Self::NoTags(attribute) => {
                write!(f, "the attribute {} is annotated with no tags", attribute.quote())
            }
        }
    }
}
