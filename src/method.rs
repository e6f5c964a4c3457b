use crate::access_flags::AccessFlags;
use crate::annotations::Annotation;
use crate::descriptors::{read_type, split_types, Dialect};
use crate::errors::{Error, Result};
use crate::types::Type;
use once_cell::unsync::OnceCell;
use std::fmt;

/// Supplies the annotations of a parameter when they are first asked for
pub type AnnotationSupplier = Box<dyn Fn() -> Result<Vec<Annotation>>>;

/// Method parameter
///
/// Annotations are computed on first access through [`Parameter::annotations`] and then cached,
/// since decoding them usually means resolving names or evaluating constant expressions.
pub struct Parameter {
    name: Option<String>,
    parameter_type: Type,
    annotations: OnceCell<Vec<Annotation>>,
    supplier: Option<AnnotationSupplier>,
}

impl Parameter {
    /// Parameter without annotations
    pub fn new(name: Option<String>, parameter_type: Type) -> Parameter {
        Parameter {
            name,
            parameter_type,
            annotations: OnceCell::new(),
            supplier: None,
        }
    }

    /// Parameter whose annotations come from `supplier`
    ///
    /// The supplier runs at most once successfully. If it fails, the error is returned and the
    /// next access tries again.
    pub fn with_annotations(
        name: Option<String>,
        parameter_type: Type,
        supplier: impl Fn() -> Result<Vec<Annotation>> + 'static,
    ) -> Parameter {
        Parameter {
            name,
            parameter_type,
            annotations: OnceCell::new(),
            supplier: Some(Box::new(supplier)),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parameter_type(&self) -> &Type {
        &self.parameter_type
    }

    /// Annotations on the parameter, computing them if this is the first access
    pub fn annotations(&self) -> Result<&[Annotation]> {
        let annotations = self.annotations.get_or_try_init(|| match &self.supplier {
            Some(supplier) => {
                log::trace!("Computing annotations of parameter {:?}", self.name);
                supplier()
            }
            None => Ok(vec![]),
        })?;
        Ok(annotations)
    }

    /// Have the annotations already been computed?
    pub fn annotations_computed(&self) -> bool {
        self.annotations.get().is_some()
    }
}

/// Parameters are equal if their names and types are (annotations are not compared)
impl PartialEq for Parameter {
    fn eq(&self, other: &Parameter) -> bool {
        self.name == other.name && self.parameter_type == other.parameter_type
    }
}

impl Eq for Parameter {}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("parameter_type", &self.parameter_type)
            .field("annotations", &self.annotations.get())
            .finish()
    }
}

/// Parameter and return types of a method, merged from its descriptor and generic signature
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodDescriptor {
    /// Formal type parameter section of the signature, brackets included (`<T:Ljava/lang/Object;>`)
    type_parameters: Option<String>,
    parameters: Vec<Type>,
    return_type: Type,
}

impl MethodDescriptor {
    pub fn new(parameters: Vec<Type>, return_type: Type) -> MethodDescriptor {
        MethodDescriptor {
            type_parameters: None,
            parameters,
            return_type,
        }
    }

    /// Parse a method descriptor (`(ILjava/lang/String;)V`), along with its signature if it has one
    ///
    /// A signature listing a different number of parameters than the descriptor (as happens for
    /// some synthetic constructor parameters) only contributes its return type.
    pub fn parse(descriptor: &str, signature: Option<&str>) -> Result<MethodDescriptor> {
        let (parameters, return_type) = split_method(descriptor, Dialect::Descriptor)?;

        let (type_parameters, signature_parts) = match signature {
            None => (None, None),
            Some(signature) => {
                let (type_parameters, rest) = split_type_parameters(signature)?;
                let rest = strip_throws(rest);
                let parts = split_method(rest, Dialect::Signature)?;
                (type_parameters.map(str::to_owned), Some(parts))
            }
        };

        let (parameters, return_type) = match signature_parts {
            None => (
                parameters
                    .into_iter()
                    .map(Type::new)
                    .collect::<Result<Vec<Type>>>()?,
                Type::new(return_type)?,
            ),
            Some((signature_parameters, signature_return)) => {
                let parameters = if signature_parameters.len() == parameters.len() {
                    parameters
                        .into_iter()
                        .zip(signature_parameters)
                        .map(|(desc, sig)| Type::with_signature(desc, Some(sig)))
                        .collect::<Result<Vec<Type>>>()?
                } else {
                    log::debug!(
                        "Ignoring parameters of signature for '{}': expected {} but found {}",
                        descriptor,
                        parameters.len(),
                        signature_parameters.len()
                    );
                    parameters
                        .into_iter()
                        .map(Type::new)
                        .collect::<Result<Vec<Type>>>()?
                };
                let return_type = Type::with_signature(return_type, Some(signature_return))?;
                (parameters, return_type)
            }
        };

        Ok(MethodDescriptor {
            type_parameters,
            parameters,
            return_type,
        })
    }

    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// Erased method descriptor
    pub fn descriptor(&self) -> String {
        let mut rendered = String::from("(");
        for parameter in &self.parameters {
            rendered.push_str(parameter.descriptor());
        }
        rendered.push(')');
        rendered.push_str(self.return_type.descriptor());
        rendered
    }

    /// Generic signature, if any part of the method is generic
    pub fn signature(&self) -> Option<String> {
        let generic = self.type_parameters.is_some()
            || self.return_type.signature().is_some()
            || self.parameters.iter().any(|p| p.signature().is_some());
        if !generic {
            return None;
        }
        let mut rendered = self.type_parameters.clone().unwrap_or_default();
        rendered.push('(');
        for parameter in &self.parameters {
            rendered.push_str(parameter.signature_or_descriptor());
        }
        rendered.push(')');
        rendered.push_str(self.return_type.signature_or_descriptor());
        Some(rendered)
    }
}

/// Method declaration: access flags, name, return type and parameters
#[derive(PartialEq, Eq, Debug)]
pub struct MethodInfo {
    access_flags: AccessFlags,
    name: String,
    return_type: Type,
    parameters: Vec<Parameter>,
}

impl MethodInfo {
    pub fn new(
        access_flags: AccessFlags,
        name: impl Into<String>,
        return_type: Type,
        parameters: Vec<Parameter>,
    ) -> MethodInfo {
        MethodInfo {
            access_flags,
            name: name.into(),
            return_type,
            parameters,
        }
    }

    /// Method as read from a class file, where parameters have no names
    pub fn from_descriptor(
        access_flags: AccessFlags,
        name: impl Into<String>,
        descriptor: &MethodDescriptor,
    ) -> MethodInfo {
        let parameters = descriptor
            .parameters()
            .iter()
            .map(|typ| Parameter::new(None, typ.clone()))
            .collect();
        MethodInfo::new(access_flags, name, descriptor.return_type().clone(), parameters)
    }

    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    pub fn set_access_flags(&mut self, access_flags: AccessFlags) {
        self.access_flags = access_flags;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn set_return_type(&mut self, return_type: Type) {
        self.return_type = return_type;
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Vec<Parameter>) {
        self.parameters = parameters;
    }

    /// Take over the name, flags, return type and parameters of `other`
    pub fn set_all(&mut self, other: MethodInfo) {
        let MethodInfo {
            access_flags,
            name,
            return_type,
            parameters,
        } = other;
        log::trace!("Replacing method '{}' with '{}'", self.name, name);
        self.access_flags = access_flags;
        self.name = name;
        self.return_type = return_type;
        self.parameters = parameters;
    }

    /// Parameter and return types (type parameters of the method itself are not tracked here)
    pub fn descriptor(&self) -> MethodDescriptor {
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| parameter.parameter_type().clone())
            .collect();
        MethodDescriptor::new(parameters, self.return_type.clone())
    }

    /// Could `other` be the same method?
    ///
    /// Names and parameters must match exactly, return types only up to erasure. Access flags are
    /// ignored.
    pub fn similar(&self, other: &MethodInfo) -> bool {
        self.name == other.name
            && self.return_type.similar(&other.return_type)
            && self.parameters == other.parameters
    }
}

/// Source form, such as `public static java.lang.Object get(java.util.List<T> list, int)`
impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.access_flags.to_string();
        if !flags.is_empty() {
            write!(f, "{} ", flags)?;
        }
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", parameter.parameter_type())?;
            if let Some(name) = parameter.name() {
                write!(f, " {}", name)?;
            }
        }
        f.write_str(")")
    }
}

fn malformed(input: &str, offset: usize, message: &str, dialect: Dialect) -> Error {
    let input = input.to_owned();
    let message = message.to_owned();
    match dialect {
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
    }
}

/// Split `(params)ret` into the parameter tokens and the return token
fn split_method(input: &str, dialect: Dialect) -> Result<(Vec<&str>, &str)> {
    let inner = input
        .strip_prefix('(')
        .ok_or_else(|| malformed(input, 0, "Expected '('", dialect))?;
    let close = find_top_level(inner, b')')
        .ok_or_else(|| malformed(input, input.len(), "Missing ')'", dialect))?;
    let parameters = split_types(&inner[..close], dialect)?.unwrap_or_default();

    let return_start = close + 1;
    let return_type = read_type(inner, return_start, dialect)?;
    if return_start + return_type.len() != inner.len() {
        return Err(malformed(
            input,
            return_start + return_type.len() + 1,
            "Unexpected input after return type",
            dialect,
        ));
    }
    Ok((parameters, return_type))
}

/// Split off a leading formal type parameter section (`<T:Ljava/lang/Object;>`)
fn split_type_parameters(signature: &str) -> Result<(Option<&str>, &str)> {
    if !signature.starts_with('<') {
        return Ok((None, signature));
    }
    let mut depth = 0usize;
    for (idx, c) in signature.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((Some(&signature[..=idx]), &signature[idx + 1..]));
                }
            }
            _ => (),
        }
    }
    Err(malformed(
        signature,
        signature.len(),
        "Unterminated type parameters",
        Dialect::Signature,
    ))
}

/// Drop the `^Ljava/io/IOException;` throws clauses at the end of a method signature
fn strip_throws(signature: &str) -> &str {
    match find_top_level(signature, b'^') {
        Some(idx) => &signature[..idx],
        None => signature,
    }
}

fn find_top_level(input: &str, needle: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in input.bytes().enumerate() {
        match c {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            c if c == needle && depth == 0 => return Some(idx),
            _ => (),
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptors::BaseType;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn no_parameters() {
        let method = MethodDescriptor::parse("()Ljava/lang/String;", None).unwrap();
        assert!(method.parameters().is_empty());
        assert_eq!(method.return_type(), &Type::string());
        assert_eq!(method.descriptor(), "()Ljava/lang/String;");
        assert_eq!(method.signature(), None);
    }

    #[test]
    fn descriptor_only() {
        let method = MethodDescriptor::parse("(I[JLjava/lang/Object;)V", None).unwrap();
        let descriptors: Vec<&str> = method.parameters().iter().map(Type::descriptor).collect();
        assert_eq!(descriptors, ["I", "[J", "Ljava/lang/Object;"]);
        assert_eq!(method.return_type(), &Type::void());
        assert_eq!(method.descriptor(), "(I[JLjava/lang/Object;)V");
    }

    #[test]
    fn generic_method() {
        let signature = "<T:Ljava/lang/Object;>(Ljava/util/List<TT;>;I)TT;^Ljava/io/IOException;";
        let method =
            MethodDescriptor::parse("(Ljava/util/List;I)Ljava/lang/Object;", Some(signature))
                .unwrap();
        assert_eq!(method.parameters()[0].signature(), Some("Ljava/util/List<TT;>;"));
        assert_eq!(method.parameters()[1], Type::primitive(BaseType::Int));
        assert_eq!(method.return_type().type_parameter_name(), Some("T"));
        assert_eq!(
            method.signature().unwrap(),
            "<T:Ljava/lang/Object;>(Ljava/util/List<TT;>;I)TT;"
        );
        assert_eq!(method.descriptor(), "(Ljava/util/List;I)Ljava/lang/Object;");
    }

    #[test]
    fn synthetic_parameters_skip_signature() {
        let method = MethodDescriptor::parse(
            "(Lme/Outer;Ljava/util/List;)V",
            Some("(Ljava/util/List<Ljava/lang/String;>;)V"),
        )
        .unwrap();
        assert_eq!(method.parameters().len(), 2);
        assert_eq!(method.parameters()[1].signature(), None);
    }

    #[test]
    fn malformed_methods() {
        assert!(MethodDescriptor::parse("I)V", None).is_err());
        assert!(MethodDescriptor::parse("(I", None).is_err());
        assert!(MethodDescriptor::parse("(I)VV", None).is_err());
        assert!(MethodDescriptor::parse("(Ljava/util/List<TT;>;)V", None).is_err());
        assert!(MethodDescriptor::parse("()V", Some("<T:Ljava/lang/Object;()V")).is_err());

        // Signature tokens have to erase to the descriptor tokens they are paired with
        assert!(MethodDescriptor::parse("(I)V", Some("(Ljava/util/List<TT;>;)V")).is_err());
        assert!(MethodDescriptor::parse("()I", Some("()TT;")).is_err());
    }

    #[test]
    fn annotations_computed_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let parameter = Parameter::with_annotations(
            Some(String::from("x")),
            Type::string(),
            move || {
                counter.set(counter.get() + 1);
                Ok(vec![Annotation::new(Type::of_class("me.alec.NonNull").unwrap())])
            },
        );

        assert!(!parameter.annotations_computed());
        assert_eq!(parameter.annotations().unwrap().len(), 1);
        assert_eq!(parameter.annotations().unwrap().len(), 1);
        assert_eq!(calls.get(), 1);
        assert!(parameter.annotations_computed());
    }

    #[test]
    fn failed_annotations_retry() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let parameter = Parameter::with_annotations(None, Type::object(), move || {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                Err(Error::UnrecognizedAnnotationForm(String::from("Lambda")))
            } else {
                Ok(vec![])
            }
        });
        assert!(parameter.annotations().is_err());
        assert!(parameter.annotations().unwrap().is_empty());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn equality_ignores_annotations() {
        let plain = Parameter::new(Some(String::from("x")), Type::string());
        let annotated = Parameter::with_annotations(Some(String::from("x")), Type::string(), || {
            Ok(vec![Annotation::new(Type::of_class("me.alec.NonNull").unwrap())])
        });
        assert_eq!(plain, annotated);
        assert_ne!(plain, Parameter::new(None, Type::string()));
        assert!(plain.annotations().unwrap().is_empty());
    }

    fn get_method(return_type: Type) -> MethodInfo {
        MethodInfo::new(
            AccessFlags::PUBLIC,
            "get",
            return_type,
            vec![Parameter::new(None, Type::primitive(BaseType::Int))],
        )
    }

    #[test]
    fn similar_methods() {
        let descriptor = MethodDescriptor::parse("(I)Ljava/lang/Object;", Some("(I)TT;")).unwrap();
        let from_class = MethodInfo::from_descriptor(AccessFlags::PUBLIC, "get", &descriptor);
        let from_source = get_method(Type::object());

        // Same erasure, different signatures
        assert_ne!(from_class.return_type(), from_source.return_type());
        assert!(from_class.similar(&from_source));

        let mut renamed = get_method(Type::object());
        renamed.set_name("remove");
        assert!(!renamed.similar(&from_source));

        assert!(!get_method(Type::string()).similar(&from_source));

        let named = MethodInfo::new(
            AccessFlags::PUBLIC,
            "get",
            Type::object(),
            vec![Parameter::new(Some(String::from("idx")), Type::primitive(BaseType::Int))],
        );
        assert!(!named.similar(&from_source));
    }

    #[test]
    fn replacing_everything() {
        let mut method = get_method(Type::object());
        let mut replacement = get_method(Type::string());
        replacement.set_name("name");
        replacement.set_access_flags(AccessFlags::PRIVATE | AccessFlags::STATIC);
        replacement.set_parameters(vec![]);

        method.set_all(replacement);
        assert_eq!(method.name(), "name");
        assert_eq!(method.access_flags().to_string(), "private static");
        assert_eq!(method.return_type(), &Type::string());
        assert!(method.parameters().is_empty());
        assert_eq!(method.descriptor().descriptor(), "()Ljava/lang/String;");
        assert_eq!(method.to_string(), "private static java.lang.String name()");
    }
}
