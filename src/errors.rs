use crate::fragments::{ConflictReason, InsertionPosition};
use crate::types::{DescriptorType, Type};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Grammar violation while scanning an erased descriptor
    MalformedDescriptor {
        input: String,
        offset: usize,
        message: String,
    },

    /// Grammar violation while scanning a generic signature (this includes mismatched angle
    /// brackets in source-level names)
    MalformedSignature {
        input: String,
        offset: usize,
        message: String,
    },

    /// No resolution rule matched
    ///
    /// The partially resolved raw type and type arguments are kept around for diagnostics.
    UnresolvableName {
        name: String,
        raw: Option<Type>,
        generic: Vec<Type>,
        cause: Option<Box<Error>>,
    },

    /// An unqualified name could only be resolved by assuming the default package
    AmbiguousDefaultPackageName(String),

    /// A type parameter used during resolution declares more than one bound
    InvalidTypeParameterBounds { name: String, bounds: Vec<String> },

    /// Inserting a fragment would violate fall-through or input/output invariants
    ReachabilityConflict {
        target: String,
        inserted: String,
        position: InsertionPosition,
        reason: ConflictReason,
    },

    /// Load/store selection requested for something that can't live in a slot
    UnsupportedValueCategory {
        value_type: Type,
        category: DescriptorType,
    },

    /// An annotation expression is not a marker, single-member, or normal annotation
    UnrecognizedAnnotationForm(String),

    /// Annotation member given a value more than once
    DuplicateAnnotationMember { annotation_type: Type, member: String },

    /// Unknown token in a textual access modifier list
    InvalidAccessFlag(String),

    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedDescriptor {
                input,
                offset,
                message,
            } => write!(f, "malformed descriptor '{}' at {}: {}", input, offset, message),
            Error::MalformedSignature {
                input,
                offset,
                message,
            } => write!(f, "malformed signature '{}' at {}: {}", input, offset, message),
            Error::UnresolvableName {
                name,
                raw,
                generic,
                cause,
            } => {
                write!(f, "couldn't resolve name '{}'", name)?;
                write!(f, "; found raw type: {:?}", raw)?;
                write!(f, "; generic types: {:?}", generic)?;
                if let Some(cause) = cause {
                    write!(f, "; caused by: {}", cause)?;
                }
                Ok(())
            }
            Error::AmbiguousDefaultPackageName(name) => write!(
                f,
                "'{}' has no package and default package resolution is disabled",
                name
            ),
            Error::InvalidTypeParameterBounds { name, bounds } => write!(
                f,
                "type parameter '{}' must have at most one bound, found {:?}",
                name, bounds
            ),
            Error::ReachabilityConflict {
                target,
                inserted,
                position,
                reason,
            } => write!(
                f,
                "can't insert '{}' into '{}' at position {:?}: {}",
                inserted, target, position, reason
            ),
            Error::UnsupportedValueCategory {
                value_type,
                category,
            } => write!(
                f,
                "values of type {} ({:?}) can't be loaded or stored",
                value_type, category
            ),
            Error::UnrecognizedAnnotationForm(kind) => {
                write!(f, "unknown annotation expression: {}", kind)
            }
            Error::DuplicateAnnotationMember {
                annotation_type,
                member,
            } => write!(f, "member '{}' of @{} is given more than once", member, annotation_type),
            Error::InvalidAccessFlag(token) => write!(f, "unknown access string '{}'", token),
            Error::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnresolvableName {
                cause: Some(cause), ..
            } => Some(cause.as_ref()),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
