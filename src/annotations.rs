use crate::errors::{Error, Result};
use crate::resolution::ResolutionContext;
use crate::types::{DescriptorType, Type};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the member a single-member annotation (`@Retention(RUNTIME)`) sets
pub const SINGLE_MEMBER_NAME: &str = "value";

/// An annotation with its member values
///
/// Annotations read from class files and annotations written in source end up in the same shape.
/// Marker annotations simply have no values.
#[derive(Clone, PartialEq, Debug)]
pub struct Annotation {
    annotation_type: Type,
    values: BTreeMap<String, AnnotationValue>,
}

/// Value of an annotation member
///
/// See <https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16.1>
#[derive(Clone, PartialEq, Debug)]
pub enum AnnotationValue {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),

    /// Class literal (`String.class`)
    Type(Type),

    /// Enum constant (`RetentionPolicy.RUNTIME`)
    Enum { enum_type: Type, constant: String },

    Annotation(Box<Annotation>),
    Array(Vec<AnnotationValue>),
}

/// Annotation as it appears in a parsed source file
///
/// Member values are left as unevaluated expressions of whatever type the source parser uses.
#[derive(Clone, Debug)]
pub enum AnnotationExpr<E> {
    /// `@Override`
    Marker { name: String },

    /// `@SuppressWarnings("unchecked")`
    SingleMember { name: String, value: E },

    /// `@Target(value = ElementType.METHOD)`
    Normal { name: String, pairs: Vec<(String, E)> },

    /// Any other expression kind the parser produced where an annotation was expected
    Other(String),
}

/// Evaluates the constant expressions inside source annotations
pub trait ConstantEvaluator<E> {
    fn evaluate(&self, expr: &E, ctx: &ResolutionContext<'_>) -> Result<AnnotationValue>;
}

impl<E, F> ConstantEvaluator<E> for F
where
    F: Fn(&E, &ResolutionContext<'_>) -> Result<AnnotationValue>,
{
    fn evaluate(&self, expr: &E, ctx: &ResolutionContext<'_>) -> Result<AnnotationValue> {
        self(expr, ctx)
    }
}

impl Annotation {
    /// Marker annotation of the given type
    pub fn new(annotation_type: Type) -> Annotation {
        Annotation {
            annotation_type,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: AnnotationValue) -> Annotation {
        self.values.insert(name.into(), value);
        self
    }

    /// Build an annotation from a decoded `RuntimeVisibleAnnotations` (or similar) entry
    ///
    /// Each member may only appear once.
    pub fn from_binary(
        type_descriptor: &str,
        pairs: impl IntoIterator<Item = (String, AnnotationValue)>,
    ) -> Result<Annotation> {
        let annotation_type = Type::new(type_descriptor)?;
        if annotation_type.descriptor_type() != DescriptorType::Class {
            return Err(Error::MalformedDescriptor {
                input: type_descriptor.to_owned(),
                offset: 0,
                message: String::from("Annotation types must be classes"),
            });
        }
        let mut values = BTreeMap::new();
        for (member, value) in pairs {
            insert_member(&annotation_type, &mut values, member, value)?;
        }
        Ok(Annotation {
            annotation_type,
            values,
        })
    }

    /// Build an annotation from a source expression
    ///
    /// The annotation's name is resolved like any other type reference in `ctx` and member values
    /// are handed to `evaluator`.
    pub fn from_source<E>(
        expr: &AnnotationExpr<E>,
        ctx: &ResolutionContext<'_>,
        evaluator: &dyn ConstantEvaluator<E>,
    ) -> Result<Annotation> {
        let name = match expr {
            AnnotationExpr::Marker { name }
            | AnnotationExpr::SingleMember { name, .. }
            | AnnotationExpr::Normal { name, .. } => name,
            AnnotationExpr::Other(kind) => {
                return Err(Error::UnrecognizedAnnotationForm(kind.clone()))
            }
        };
        let annotation_type = ctx.resolve(name)?;
        log::trace!("Annotation '@{}' resolved to {}", name, annotation_type);

        let mut values = BTreeMap::new();
        match expr {
            AnnotationExpr::SingleMember { value, .. } => {
                values.insert(
                    SINGLE_MEMBER_NAME.to_owned(),
                    evaluator.evaluate(value, ctx)?,
                );
            }
            AnnotationExpr::Normal { pairs, .. } => {
                for (member, value) in pairs {
                    let value = evaluator.evaluate(value, ctx)?;
                    insert_member(&annotation_type, &mut values, member.clone(), value)?;
                }
            }
            _ => (),
        }
        Ok(Annotation {
            annotation_type,
            values,
        })
    }

    pub fn annotation_type(&self) -> &Type {
        &self.annotation_type
    }

    pub fn values(&self) -> &BTreeMap<String, AnnotationValue> {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationValue> {
        self.values.get(name)
    }

    pub fn is_marker(&self) -> bool {
        self.values.is_empty()
    }
}

fn insert_member(
    annotation_type: &Type,
    values: &mut BTreeMap<String, AnnotationValue>,
    member: String,
    value: AnnotationValue,
) -> Result<()> {
    if values.contains_key(&member) {
        return Err(Error::DuplicateAnnotationMember {
            annotation_type: annotation_type.clone(),
            member,
        });
    }
    values.insert(member, value);
    Ok(())
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.annotation_type)?;
        if !self.values.is_empty() {
            f.write_str("(")?;
            for (i, (name, value)) in self.values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", name, value)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Boolean(b) => write!(f, "{}", b),
            AnnotationValue::Byte(b) => write!(f, "{}", b),
            AnnotationValue::Char(c) => write!(f, "{:?}", c),
            AnnotationValue::Short(s) => write!(f, "{}", s),
            AnnotationValue::Int(i) => write!(f, "{}", i),
            AnnotationValue::Long(l) => write!(f, "{}L", l),
            AnnotationValue::Float(x) => write!(f, "{}f", x),
            AnnotationValue::Double(x) => write!(f, "{}", x),
            AnnotationValue::String(s) => write!(f, "{:?}", s),
            AnnotationValue::Type(t) => write!(f, "{}.class", t),
            AnnotationValue::Enum {
                enum_type,
                constant,
            } => write!(f, "{}.{}", enum_type, constant),
            AnnotationValue::Annotation(a) => write!(f, "{}", a),
            AnnotationValue::Array(values) => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("}")
            }
        }
    }
}
