use crate::descriptors::{read_type, read_type_argument, BaseType, Dialect, RenderDescriptor};
use crate::errors::{Error, Result};
use crate::names::BinaryName;
use std::cmp::Ordering;
use std::fmt;

/// Descriptor of a value whose type the binary reader could not determine
const UNKNOWN_VALUE_DESCRIPTOR: &str = "?";

/// Separator between the members of a union type
const UNION_SEPARATOR: char = '|';

/// Coarse classification of a type, mostly used to pick instruction families
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DescriptorType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Void,
    Array,
    Class,

    /// Value of unknown type
    Value,

    /// One of several possible types
    Union,
}

impl From<BaseType> for DescriptorType {
    fn from(base: BaseType) -> DescriptorType {
        match base {
            BaseType::Byte => DescriptorType::Byte,
            BaseType::Char => DescriptorType::Char,
            BaseType::Double => DescriptorType::Double,
            BaseType::Float => DescriptorType::Float,
            BaseType::Int => DescriptorType::Int,
            BaseType::Long => DescriptorType::Long,
            BaseType::Short => DescriptorType::Short,
            BaseType::Boolean => DescriptorType::Boolean,
            BaseType::Void => DescriptorType::Void,
        }
    }
}

/// A resolved type: an erased descriptor, plus a generic signature when generics matter
///
/// The descriptor is always a single erased token (`Ljava/util/List;`). The signature is only
/// present when it says something the descriptor doesn't: a type variable (`TT;`) or a
/// parameterized class (`Ljava/util/List<Ljava/lang/String;>;`).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Type {
    descriptor: String,
    signature: Option<String>,
}

impl Type {
    /// Type from an erased descriptor
    pub fn new(descriptor: impl Into<String>) -> Result<Type> {
        let descriptor = descriptor.into();
        check_single_token(&descriptor, Dialect::Descriptor)?;
        Ok(Type {
            descriptor,
            signature: None,
        })
    }

    /// Type from an erased descriptor and an optional generic signature
    ///
    /// A signature that is identical to the descriptor carries no generic information and is
    /// dropped. Any other signature must erase to the descriptor. Type variables can erase to any
    /// class, so only their dimensions and category are checked.
    pub fn with_signature(
        descriptor: impl Into<String>,
        signature: Option<impl Into<String>>,
    ) -> Result<Type> {
        let mut typ = Type::new(descriptor)?;
        if let Some(signature) = signature {
            let signature = signature.into();
            check_single_token(&signature, Dialect::Signature)?;
            if signature != typ.descriptor {
                check_erasure(&typ.descriptor, &signature)?;
                typ.signature = Some(signature);
            }
        }
        Ok(typ)
    }

    pub fn primitive(base: BaseType) -> Type {
        Type {
            descriptor: base.render(),
            signature: None,
        }
    }

    pub fn of_binary_name(name: &BinaryName) -> Type {
        Type {
            descriptor: name.render(),
            signature: None,
        }
    }

    /// Class type from a dotted name (`java.util.Map$Entry`)
    pub fn of_class(dotted_name: &str) -> Result<Type> {
        let name = BinaryName::from_dotted(dotted_name).map_err(|message| {
            Error::MalformedDescriptor {
                input: dotted_name.to_owned(),
                offset: 0,
                message,
            }
        })?;
        Ok(Type::of_binary_name(&name))
    }

    /// Reference to the type variable `name`, erasing to `bound`
    pub fn type_variable(name: &str, bound: &Type) -> Type {
        Type {
            descriptor: bound.descriptor.clone(),
            signature: Some(format!("T{};", name)),
        }
    }

    /// One-dimensional array whose elements are `element`
    pub fn array_of(element: &Type) -> Type {
        Type {
            descriptor: format!("[{}", element.descriptor),
            signature: element.signature.as_ref().map(|sig| format!("[{}", sig)),
        }
    }

    /// Placeholder for a value of unknown type
    pub fn unknown_value() -> Type {
        Type {
            descriptor: UNKNOWN_VALUE_DESCRIPTOR.to_owned(),
            signature: None,
        }
    }

    /// A value that may be any one of `members`
    pub fn union_of(members: &[Type]) -> Type {
        let descriptor = members
            .iter()
            .map(|member| member.descriptor.as_str())
            .collect::<Vec<&str>>()
            .join("|");
        Type {
            descriptor,
            signature: None,
        }
    }

    pub fn object() -> Type {
        Type::of_binary_name(&BinaryName::OBJECT)
    }

    pub fn string() -> Type {
        Type::of_binary_name(&BinaryName::STRING)
    }

    pub fn void() -> Type {
        Type::primitive(BaseType::Void)
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Signature if there is one, else the descriptor
    pub fn signature_or_descriptor(&self) -> &str {
        self.signature.as_deref().unwrap_or(&self.descriptor)
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        if self.descriptor == UNKNOWN_VALUE_DESCRIPTOR {
            return DescriptorType::Value;
        }
        if self.descriptor.contains(UNION_SEPARATOR) {
            return DescriptorType::Union;
        }
        match self.descriptor.chars().next() {
            Some('[') => DescriptorType::Array,
            Some('L') => DescriptorType::Class,
            Some(c) => match BaseType::from_descriptor_char(c) {
                Some(base) => DescriptorType::from(base),
                None => DescriptorType::Value,
            },
            None => DescriptorType::Value,
        }
    }

    pub fn base_type(&self) -> Option<BaseType> {
        let mut chars = self.descriptor.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => BaseType::from_descriptor_char(c),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.base_type().is_some()
    }

    /// Java keyword of a primitive type (`int`)
    pub fn primitive_name(&self) -> Option<&'static str> {
        self.base_type().map(BaseType::keyword)
    }

    pub fn is_type_parameter(&self) -> bool {
        matches!(&self.signature, Some(sig) if sig.starts_with('T'))
    }

    pub fn type_parameter_name(&self) -> Option<&str> {
        match &self.signature {
            Some(sig) if sig.starts_with('T') => Some(&sig[1..sig.len() - 1]),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.descriptor.starts_with('[')
    }

    pub fn array_dimensions(&self) -> usize {
        self.descriptor.chars().take_while(|c| *c == '[').count()
    }

    /// Type of the elements, if this is an array type
    pub fn element_type(&self) -> Option<Type> {
        let descriptor = self.descriptor.strip_prefix('[')?;
        let signature = self
            .signature
            .as_ref()
            .and_then(|sig| sig.strip_prefix('['))
            .map(str::to_owned);
        Some(Type {
            descriptor: descriptor.to_owned(),
            signature,
        })
    }

    /// Internal name of a class type (`java/util/Map$Entry`)
    pub fn binary_name(&self) -> Option<BinaryName> {
        if self.descriptor_type() != DescriptorType::Class {
            return None;
        }
        let inner = &self.descriptor[1..self.descriptor.len() - 1];
        BinaryName::from_string(inner.to_owned()).ok()
    }

    /// Dotted binary name of a class type (`java.util.Map$Entry`)
    pub fn class_name(&self) -> Option<String> {
        self.binary_name().map(|name| name.to_dotted())
    }

    /// Name as it would be written in Java source, fully qualified
    ///
    /// Generic arguments are included (`java.util.List<java.lang.String>`) and nested classes use
    /// `.` rather than `$`.
    pub fn java_name(&self) -> String {
        match self.descriptor_type() {
            DescriptorType::Value => String::from("?"),
            DescriptorType::Union => self
                .descriptor
                .split(UNION_SEPARATOR)
                .map(|member| match Type::new(member) {
                    Ok(member) => member.java_name(),
                    Err(_) => member.to_owned(),
                })
                .collect::<Vec<String>>()
                .join(" | "),
            DescriptorType::Array => match self.element_type() {
                Some(element) => format!("{}[]", element.java_name()),
                None => self.descriptor.clone(),
            },
            DescriptorType::Class => {
                if let Some(name) = self.type_parameter_name() {
                    return name.to_owned();
                }
                let mut rendered = self
                    .class_name()
                    .unwrap_or_else(|| self.descriptor.clone())
                    .replace('$', ".");
                let arguments = self.type_arguments();
                if !arguments.is_empty() {
                    let arguments: Vec<String> =
                        arguments.iter().map(TypeArgument::java_name).collect();
                    rendered.push('<');
                    rendered.push_str(&arguments.join(", "));
                    rendered.push('>');
                }
                rendered
            }
            _ => self.primitive_name().unwrap_or("?").to_owned(),
        }
    }

    /// Generic arguments of a parameterized class type
    ///
    /// For nested generic classes (`Lpkg/Outer<TT;>.Inner<TU;>;`) these are the arguments of the
    /// innermost class. A type with no signature has no arguments.
    pub fn type_arguments(&self) -> Vec<TypeArgument> {
        let signature = match &self.signature {
            Some(sig) if sig.starts_with('L') => sig,
            _ => return vec![],
        };
        let (open, close) = match last_generic_section(signature) {
            Some(section) => section,
            None => return vec![],
        };
        let section = &signature[open + 1..close];
        let mut arguments = vec![];
        let mut pos = 0;
        while pos < section.len() {
            match read_type_argument(section, pos) {
                Ok(token) => {
                    pos += token.len();
                    if let Some(argument) = TypeArgument::from_token(token) {
                        arguments.push(argument);
                    }
                }
                Err(_) => break,
            }
        }
        arguments
    }

    /// Copy of this type with `argument` as its single generic argument
    pub fn with_type_argument(&self, argument: Type) -> Result<Type> {
        self.with_type_arguments(&[TypeArgument::Exact(argument)])
    }

    /// Copy of this type parameterized with `arguments`
    ///
    /// Only (non type variable) class types take arguments. Existing arguments on the innermost
    /// class are replaced.
    pub fn with_type_arguments(&self, arguments: &[TypeArgument]) -> Result<Type> {
        if self.descriptor_type() != DescriptorType::Class || self.is_type_parameter() {
            return Err(Error::MalformedSignature {
                input: self.signature_or_descriptor().to_owned(),
                offset: 0,
                message: String::from("Only class types can have generic arguments"),
            });
        }
        if arguments.is_empty() {
            return Ok(self.clone());
        }

        let base = self.signature_or_descriptor();
        let base = match last_generic_section(base) {
            Some((open, close)) if close + 2 == base.len() => &base[..open],
            _ => &base[..base.len() - 1],
        };

        let mut signature = String::from(base);
        signature.push('<');
        for argument in arguments {
            argument.render_to(&mut signature);
        }
        signature.push_str(">;");

        Ok(Type {
            descriptor: self.descriptor.clone(),
            signature: Some(signature),
        })
    }

    /// Do the two types have the same erasure?
    pub fn similar(&self, other: &Type) -> bool {
        self.descriptor == other.descriptor
    }
}

impl RenderDescriptor for Type {
    fn render_to(&self, write_to: &mut String) {
        write_to.push_str(&self.descriptor);
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.java_name())
    }
}

/// Argument in a generic argument list
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeArgument {
    /// `List<String>`
    Exact(Type),

    /// `List<? extends Number>`
    Extends(Type),

    /// `List<? super Integer>`
    Super(Type),

    /// `List<?>`
    Wildcard,
}

impl TypeArgument {
    fn from_token(token: &str) -> Option<TypeArgument> {
        let (wrap, rest): (fn(Type) -> TypeArgument, &str) = match token.chars().next()? {
            '*' => return Some(TypeArgument::Wildcard),
            '+' => (TypeArgument::Extends, &token[1..]),
            '-' => (TypeArgument::Super, &token[1..]),
            _ => (TypeArgument::Exact, token),
        };
        erase_signature(rest).map(wrap)
    }

    pub fn java_name(&self) -> String {
        match self {
            TypeArgument::Exact(typ) => typ.java_name(),
            TypeArgument::Extends(typ) => format!("? extends {}", typ.java_name()),
            TypeArgument::Super(typ) => format!("? super {}", typ.java_name()),
            TypeArgument::Wildcard => String::from("?"),
        }
    }
}

impl RenderDescriptor for TypeArgument {
    fn render_to(&self, write_to: &mut String) {
        let typ = match self {
            TypeArgument::Wildcard => {
                write_to.push('*');
                return;
            }
            TypeArgument::Exact(typ) => typ,
            TypeArgument::Extends(typ) => {
                write_to.push('+');
                typ
            }
            TypeArgument::Super(typ) => {
                write_to.push('-');
                typ
            }
        };
        write_to.push_str(typ.signature_or_descriptor());
    }
}

/// Subtyping relationship between types
pub trait Assignable {
    /// Is the first type assignable to the second?
    fn is_assignable(&self, super_type: &Self) -> bool;
}

/// Assignability as far as it can be decided without a class hierarchy
///
/// Class-to-class assignability only holds for identical classes or a `java/lang/Object` target.
/// The small integral types are all `int` as far as the verifier is concerned, so they may be
/// used where an `int` is expected.
impl Assignable for Type {
    fn is_assignable(&self, super_type: &Type) -> bool {
        if self.descriptor == super_type.descriptor {
            return true;
        }
        match (self.descriptor_type(), super_type.descriptor_type()) {
            (
                DescriptorType::Byte
                | DescriptorType::Char
                | DescriptorType::Short
                | DescriptorType::Boolean,
                DescriptorType::Int,
            ) => true,

            (DescriptorType::Class, DescriptorType::Class) => {
                super_type.binary_name() == Some(BinaryName::OBJECT)
            }

            // Special superclass and interfaces of all arrays
            (DescriptorType::Array, DescriptorType::Class) => match super_type.binary_name() {
                Some(name) => is_array_type_assignable(&name),
                None => false,
            },

            (DescriptorType::Array, DescriptorType::Array) => {
                let dims1 = self.array_dimensions();
                let dims2 = super_type.array_dimensions();
                let elem1 = Type::erased(&self.descriptor[dims1..]);
                let elem2 = Type::erased(&super_type.descriptor[dims2..]);
                match dims1.cmp(&dims2) {
                    Ordering::Less => false,

                    // Cursed (unsound) covariance of arrays
                    Ordering::Equal => {
                        !elem1.is_primitive()
                            && !elem2.is_primitive()
                            && elem1.is_assignable(&elem2)
                    }

                    // Higher dimensional arrays are arrays of objects
                    Ordering::Greater => match elem2.binary_name() {
                        Some(name) => is_array_type_assignable(&name),
                        None => false,
                    },
                }
            }

            _ => false,
        }
    }
}

impl Type {
    fn erased(descriptor: &str) -> Type {
        Type {
            descriptor: descriptor.to_owned(),
            signature: None,
        }
    }
}

/// Check if arrays can be assigned to a super type
///
/// This bakes in knowledge of the small, finite set of super types arrays have.
fn is_array_type_assignable(super_type: &BinaryName) -> bool {
    super_type == &BinaryName::OBJECT
        || super_type == &BinaryName::CLONEABLE
        || super_type == &BinaryName::SERIALIZABLE
}

/// Check that `input` is exactly one token of the grammar
fn check_single_token(input: &str, dialect: Dialect) -> Result<()> {
    let token = read_type(input, 0, dialect)?;
    if token.len() == input.len() {
        Ok(())
    } else {
        let message = format!("Unexpected leftover input '{}'", &input[token.len()..]);
        let input = input.to_owned();
        let offset = token.len();
        Err(match dialect {
            Dialect::Descriptor => Error::MalformedDescriptor {
                input,
                offset,
                message,
            },
            Dialect::Signature => Error::MalformedSignature {
                input,
                offset,
                message,
            },
        })
    }
}

/// Compute the erased type for a signature token
///
/// Type variables erase to `java/lang/Object` since their bounds aren't known here.
fn erase_signature(signature: &str) -> Option<Type> {
    let dims = signature.chars().take_while(|c| *c == '[').count();
    let descriptor = if signature[dims..].starts_with('T') {
        format!("{}{}", "[".repeat(dims), BinaryName::OBJECT.render())
    } else {
        erased_descriptor(signature)?
    };
    Type::with_signature(descriptor, Some(signature)).ok()
}

/// Descriptor of a signature token with no type variables at its top level
///
/// Generic arguments are dropped and inner classes (`Lpkg/Outer<TT;>.Inner;`) are joined with
/// `$` as in binary names.
fn erased_descriptor(signature: &str) -> Option<String> {
    let dims = signature.chars().take_while(|c| *c == '[').count();
    let element = &signature[dims..];
    let erased_element = match element.chars().next()? {
        'T' => return None,
        'L' => {
            let mut erased = String::with_capacity(element.len());
            let mut depth = 0usize;
            for c in element.chars() {
                match c {
                    '<' => depth += 1,
                    '>' => depth = depth.saturating_sub(1),
                    '.' if depth == 0 => erased.push('$'),
                    _ if depth == 0 => erased.push(c),
                    _ => (),
                }
            }
            erased
        }
        _ => element.to_owned(),
    };
    Some(format!("{}{}", "[".repeat(dims), erased_element))
}

/// Check that `signature` is a generic form of the erased `descriptor`
fn check_erasure(descriptor: &str, signature: &str) -> Result<()> {
    let dims = signature.chars().take_while(|c| *c == '[').count();
    let consistent = if signature[dims..].starts_with('T') {
        let descriptor_dims = descriptor.chars().take_while(|c| *c == '[').count();
        descriptor_dims == dims && descriptor[dims..].starts_with('L')
    } else {
        erased_descriptor(signature).as_deref() == Some(descriptor)
    };
    if consistent {
        Ok(())
    } else {
        Err(Error::MalformedSignature {
            input: signature.to_owned(),
            offset: 0,
            message: format!("Signature does not erase to '{}'", descriptor),
        })
    }
}

/// Find the byte range `(open, close)` of the last top-level `<...>` group in a class signature
fn last_generic_section(signature: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut open = 0;
    let mut last = None;
    for (idx, c) in signature.char_indices() {
        match c {
            '<' => {
                if depth == 0 {
                    open = idx;
                }
                depth += 1;
            }
            '>' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    last = Some((open, idx));
                }
            }
            _ => (),
        }
    }
    last
}

#[cfg(test)]
mod test {
    use super::*;

    fn class(name: &str) -> Type {
        Type::of_class(name).unwrap()
    }

    #[test]
    fn construction_validates() {
        assert!(Type::new("I").is_ok());
        assert!(Type::new("[[Ljava/lang/String;").is_ok());
        assert!(Type::new("II").is_err());
        assert!(Type::new("Ljava/util/List<TT;>;").is_err());
        assert!(Type::with_signature("Ljava/util/List;", Some("Ljava/util/List<TT;>;")).is_ok());
    }

    #[test]
    fn signature_must_erase_to_descriptor() {
        assert!(Type::with_signature("I", Some("Ljava/util/List<TT;>;")).is_err());
        assert!(Type::with_signature("Ljava/lang/Object;", Some("Ljava/util/List;")).is_err());
        assert!(Type::with_signature("Ljava/util/Map;", Some("Ljava/util/List<TT;>;")).is_err());
        assert!(Type::with_signature("[Ljava/util/List;", Some("Ljava/util/List<TT;>;")).is_err());

        // Type variables only need a class descriptor of the same dimension
        assert!(Type::with_signature("Ljava/lang/Number;", Some("TT;")).is_ok());
        assert!(Type::with_signature("[Ljava/lang/Object;", Some("[TT;")).is_ok());
        assert!(Type::with_signature("I", Some("TT;")).is_err());
        assert!(Type::with_signature("Ljava/lang/Object;", Some("[TT;")).is_err());

        let inner = Type::with_signature(
            "Lme/alec/Outer$Inner;",
            Some("Lme/alec/Outer<TT;>.Inner<Ljava/lang/String;>;"),
        )
        .unwrap();
        assert_eq!(inner.descriptor(), "Lme/alec/Outer$Inner;");
    }

    #[test]
    fn redundant_signature_is_dropped() {
        let t = Type::with_signature("Ljava/lang/String;", Some("Ljava/lang/String;")).unwrap();
        assert_eq!(t.signature(), None);
        assert_eq!(t, Type::string());
    }

    #[test]
    fn classification() {
        assert_eq!(Type::new("Z").unwrap().descriptor_type(), DescriptorType::Boolean);
        assert_eq!(Type::void().descriptor_type(), DescriptorType::Void);
        assert_eq!(Type::new("[I").unwrap().descriptor_type(), DescriptorType::Array);
        assert_eq!(Type::object().descriptor_type(), DescriptorType::Class);
        assert_eq!(Type::unknown_value().descriptor_type(), DescriptorType::Value);
        let union = Type::union_of(&[class("java.io.IOException"), class("java.lang.Error")]);
        assert_eq!(union.descriptor_type(), DescriptorType::Union);
        assert_eq!(union.java_name(), "java.io.IOException | java.lang.Error");
    }

    #[test]
    fn type_variables() {
        let t = Type::type_variable("T", &class("java.lang.StringBuilder"));
        assert_eq!(t.descriptor(), "Ljava/lang/StringBuilder;");
        assert_eq!(t.signature(), Some("TT;"));
        assert!(t.is_type_parameter());
        assert_eq!(t.type_parameter_name(), Some("T"));
        assert_eq!(t.java_name(), "T");
        assert!(t.with_type_argument(Type::string()).is_err());
    }

    #[test]
    fn arrays() {
        let t = Type::array_of(&Type::array_of(&Type::primitive(BaseType::Double)));
        assert_eq!(t.descriptor(), "[[D");
        assert_eq!(t.array_dimensions(), 2);
        assert_eq!(t.element_type().unwrap().descriptor(), "[D");
        assert_eq!(t.java_name(), "double[][]");
        assert_eq!(Type::object().element_type(), None);
    }

    #[test]
    fn class_names() {
        let entry = class("java.util.Map$Entry");
        assert_eq!(entry.descriptor(), "Ljava/util/Map$Entry;");
        assert_eq!(entry.class_name().unwrap(), "java.util.Map$Entry");
        assert_eq!(entry.java_name(), "java.util.Map.Entry");
        assert_eq!(Type::primitive(BaseType::Int).class_name(), None);
    }

    #[test]
    fn with_type_argument_keeps_erasure() {
        let consumer = class("java.util.function.Consumer");
        let parameterized = consumer.with_type_argument(Type::string()).unwrap();
        assert_eq!(parameterized.descriptor(), consumer.descriptor());
        assert_eq!(
            parameterized.signature(),
            Some("Ljava/util/function/Consumer<Ljava/lang/String;>;")
        );
        assert_eq!(
            parameterized.java_name(),
            "java.util.function.Consumer<java.lang.String>"
        );
        assert!(parameterized.similar(&consumer));
        assert_ne!(parameterized, consumer);
        // original untouched
        assert_eq!(consumer.signature(), None);
    }

    #[test]
    fn type_arguments_parse() {
        let map = class("java.util.Map")
            .with_type_arguments(&[
                TypeArgument::Exact(Type::type_variable("K", &Type::object())),
                TypeArgument::Extends(class("java.lang.Number")),
            ])
            .unwrap();
        assert_eq!(
            map.signature(),
            Some("Ljava/util/Map<TK;+Ljava/lang/Number;>;")
        );
        let arguments = map.type_arguments();
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[0].java_name(), "K");
        assert_eq!(arguments[1], TypeArgument::Extends(class("java.lang.Number")));
        assert_eq!(map.java_name(), "java.util.Map<K, ? extends java.lang.Number>");

        let replaced = map.with_type_argument(Type::string()).unwrap();
        assert_eq!(
            replaced.signature(),
            Some("Ljava/util/Map<Ljava/lang/String;>;")
        );
    }

    #[test]
    fn assignability() {
        let int = Type::primitive(BaseType::Int);
        let byte = Type::primitive(BaseType::Byte);
        let long = Type::primitive(BaseType::Long);
        assert!(byte.is_assignable(&int));
        assert!(!int.is_assignable(&byte));
        assert!(!int.is_assignable(&long));

        let object = Type::object();
        let string = Type::string();
        assert!(string.is_assignable(&object));
        assert!(!object.is_assignable(&string));
        assert!(string.is_assignable(&string));

        let int_array = Type::new("[I").unwrap();
        let string_array = Type::new("[Ljava/lang/String;").unwrap();
        let object_array = Type::new("[Ljava/lang/Object;").unwrap();
        let int_matrix = Type::new("[[I").unwrap();
        assert!(int_array.is_assignable(&object));
        assert!(int_array.is_assignable(&class("java.lang.Cloneable")));
        assert!(string_array.is_assignable(&object_array));
        assert!(!object_array.is_assignable(&string_array));
        assert!(int_matrix.is_assignable(&object_array));
        assert!(!int_array.is_assignable(&object_array));
        assert!(!Type::new("[B").unwrap().is_assignable(&int_array));
    }
}
