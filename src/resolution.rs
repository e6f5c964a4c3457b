//! Resolution of source-level type names into [`Type`]s
//!
//! A [`ResolutionContext`] captures everything in scope at one declaration: the package, the
//! imports of the compilation unit, and the type parameters of the enclosing declarations. Names
//! are resolved by trying, in order:
//!
//!   1. the enclosing type parameters
//!   2. exact imports
//!   3. the current package (if the class path knows the class)
//!   4. wildcard imports in declaration order, then the implicit `java.lang.*` (if the class path
//!      knows the class)
//!   5. treating the name as fully qualified, which is refused for unqualified names unless
//!      default package resolution is enabled
//!
//! The first rule that matches wins.

use crate::class_path::ClassPath;
use crate::descriptors::BaseType;
use crate::errors::{Error, Result};
use crate::names::{class_name_to_internal_heuristic, BinaryName};
use crate::types::{DescriptorType, Type, TypeArgument};
use std::fmt;

/// Environment variable enabling resolution of unqualified names into the default package
pub const ALLOW_DEFAULT_PACKAGE_VAR: &str = "CLASSPATCH_ALLOW_DEFAULT_PACKAGE";

/// Knobs controlling name resolution
#[derive(Clone, Debug)]
pub struct ResolutionSettings {
    /// Resolve unqualified names that match nothing else as classes in the default package
    ///
    /// Off by default, since an unqualified name that matches nothing usually means an import or
    /// class path entry is missing.
    pub allow_default_package: bool,

    /// Consult `java.lang` as if it were wildcard imported after all the explicit imports
    pub implicit_java_lang: bool,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        ResolutionSettings {
            allow_default_package: false,
            implicit_java_lang: true,
        }
    }
}

impl ResolutionSettings {
    /// Default settings, with `allow_default_package` taken from the environment
    pub fn from_env() -> ResolutionSettings {
        let allow_default_package = std::env::var(ALLOW_DEFAULT_PACKAGE_VAR)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        ResolutionSettings {
            allow_default_package,
            ..ResolutionSettings::default()
        }
    }
}

/// Import declaration of a compilation unit
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Import {
    /// Qualified name, without any trailing `.*`
    name: String,
    wildcard: bool,
}

impl Import {
    /// `import java.util.List;`
    pub fn exact(name: impl Into<String>) -> Import {
        Import {
            name: name.into(),
            wildcard: false,
        }
    }

    /// `import java.util.*;`
    pub fn wildcard(package: impl Into<String>) -> Import {
        Import {
            name: package.into(),
            wildcard: true,
        }
    }

    /// Parse the name part of an import declaration (`java.util.*`, `java.util.List`)
    pub fn parse(text: &str) -> Import {
        let text = text.trim();
        match text.strip_suffix(".*") {
            Some(package) => Import::wildcard(package),
            None => Import::exact(text),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Part of `qualified` left after removing what this import brings into scope
    fn strip(&self, qualified: &str) -> Option<String> {
        let rest = qualified.strip_prefix(self.name.as_str())?;
        if self.wildcard {
            rest.strip_prefix('.').map(str::to_owned)
        } else {
            let simple = self.name.rsplit('.').next().unwrap_or(&self.name);
            if rest.is_empty() {
                Some(simple.to_owned())
            } else {
                rest.strip_prefix('.')
                    .map(|nested| format!("{}.{}", simple, nested))
            }
        }
    }
}

/// Type parameter declared on an enclosing class or method
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeParameter {
    pub name: String,

    /// Bounds as written in source (`T extends Number` has bound `Number`)
    pub bounds: Vec<String>,
}

impl TypeParameter {
    pub fn new(name: impl Into<String>) -> TypeParameter {
        TypeParameter {
            name: name.into(),
            bounds: vec![],
        }
    }

    pub fn bounded(name: impl Into<String>, bound: impl Into<String>) -> TypeParameter {
        TypeParameter {
            name: name.into(),
            bounds: vec![bound.into()],
        }
    }
}

/// Everything needed to turn source-level names into types within one declaration scope
pub struct ResolutionContext<'a> {
    package_name: String,
    imports: Vec<Import>,
    type_parameters: Vec<TypeParameter>,
    class_path: &'a dyn ClassPath,
    settings: ResolutionSettings,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        package_name: impl Into<String>,
        imports: Vec<Import>,
        type_parameters: Vec<TypeParameter>,
        class_path: &'a dyn ClassPath,
        settings: ResolutionSettings,
    ) -> ResolutionContext<'a> {
        ResolutionContext {
            package_name: package_name.into(),
            imports,
            type_parameters,
            class_path,
            settings,
        }
    }

    /// Context for a nested declaration scope, which adds its own type parameters
    ///
    /// Inner type parameters shadow outer ones with the same name.
    pub fn with_type_parameters(&self, inner: Vec<TypeParameter>) -> ResolutionContext<'a> {
        let mut type_parameters = inner;
        type_parameters.extend(self.type_parameters.iter().cloned());
        ResolutionContext {
            package_name: self.package_name.clone(),
            imports: self.imports.clone(),
            type_parameters,
            class_path: self.class_path,
            settings: self.settings.clone(),
        }
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn type_parameters(&self) -> &[TypeParameter] {
        &self.type_parameters
    }

    pub fn settings(&self) -> &ResolutionSettings {
        &self.settings
    }

    /// Resolve a name as written in source
    ///
    /// Examples (given suitable imports and type parameters):
    ///
    ///   - `ArrayList` → `Ljava/util/ArrayList;`
    ///   - `T` → `Ljava/lang/Object;` with signature `TT;`
    ///   - `boolean` → `Z`
    ///   - `List<String>` → `Ljava/util/List;` with signature `Ljava/util/List<Ljava/lang/String;>;`
    pub fn resolve(&self, name: &str) -> Result<Type> {
        self.resolve_name(name.trim(), &mut vec![])
    }

    fn resolve_name(&self, name: &str, visiting: &mut Vec<String>) -> Result<Type> {
        if let Some(element) = name.strip_suffix("[]") {
            let element = self.resolve_name(element.trim_end(), visiting)?;
            return Ok(Type::array_of(&element));
        }
        if let Some(base) = BaseType::from_keyword(name) {
            return Ok(Type::primitive(base));
        }

        let (raw, generic) = split_generic(name)?;
        let generic = match generic {
            None => return self.resolve_raw(raw, visiting),
            Some(generic) => generic,
        };

        let raw_type = self.resolve_raw(raw, visiting);
        let mut arguments = vec![];
        let mut argument_error = None;
        for argument in split_arguments(generic) {
            match self.resolve_argument(argument, visiting) {
                Ok(argument) => arguments.push(argument),
                Err(err) => {
                    argument_error = Some(err);
                    break;
                }
            }
        }

        let unresolvable = |raw: Option<Type>, arguments: &[TypeArgument], cause: Error| {
            let generic = arguments
                .iter()
                .filter_map(|argument| match argument {
                    TypeArgument::Exact(typ)
                    | TypeArgument::Extends(typ)
                    | TypeArgument::Super(typ) => Some(typ.clone()),
                    TypeArgument::Wildcard => None,
                })
                .collect();
            Error::UnresolvableName {
                name: name.to_owned(),
                raw,
                generic,
                cause: Some(Box::new(cause)),
            }
        };

        match (raw_type, argument_error) {
            (Ok(raw_type), None) => raw_type
                .with_type_arguments(&arguments)
                .map_err(|err| unresolvable(Some(raw_type.clone()), &arguments, err)),
            (Ok(raw_type), Some(err)) => Err(unresolvable(Some(raw_type), &arguments, err)),
            (Err(err), _) => Err(unresolvable(None, &arguments, err)),
        }
    }

    fn resolve_argument(&self, argument: &str, visiting: &mut Vec<String>) -> Result<TypeArgument> {
        if argument == "?" {
            return Ok(TypeArgument::Wildcard);
        }
        if let Some(bound) = argument.strip_prefix('?') {
            let bound = bound.trim_start();
            if let Some(upper) = bound.strip_prefix("extends ") {
                return Ok(TypeArgument::Extends(self.resolve_name(upper.trim(), visiting)?));
            }
            if let Some(lower) = bound.strip_prefix("super ") {
                return Ok(TypeArgument::Super(self.resolve_name(lower.trim(), visiting)?));
            }
        }
        Ok(TypeArgument::Exact(self.resolve_name(argument, visiting)?))
    }

    fn resolve_raw(&self, raw: &str, visiting: &mut Vec<String>) -> Result<Type> {
        if raw.is_empty() || raw.contains(char::is_whitespace) {
            return Err(Error::UnresolvableName {
                name: raw.to_owned(),
                raw: None,
                generic: vec![],
                cause: None,
            });
        }

        if let Some(typ) = self.resolve_type_parameter(raw, visiting)? {
            log::trace!("'{}' resolved as a type parameter", raw);
            return Ok(typ);
        }
        self.resolve_class(raw)
    }

    /// If we have the type parameter `A extends StringBuilder`, then `A` is resolved to a type
    /// with descriptor `Ljava/lang/StringBuilder;` and signature `TA;`
    fn resolve_type_parameter(
        &self,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Option<Type>> {
        let parameter = match self.type_parameters.iter().find(|p| p.name == name) {
            Some(parameter) => parameter,
            None => return Ok(None),
        };

        let bound = match parameter.bounds.as_slice() {
            [] => Type::object(),
            [bound] => {
                if visiting.iter().any(|seen| seen == name) {
                    return Err(Error::UnresolvableName {
                        name: name.to_owned(),
                        raw: None,
                        generic: vec![],
                        cause: None,
                    });
                }
                // Only the erasure of the bound matters, so generic arguments are skipped (this
                // also avoids recursing on `T extends Comparable<T>`)
                let (bound_raw, _) = split_generic(bound.trim())?;
                visiting.push(name.to_owned());
                let bound = self.resolve_name(bound_raw, visiting);
                visiting.pop();
                bound?
            }
            bounds => {
                return Err(Error::InvalidTypeParameterBounds {
                    name: name.to_owned(),
                    bounds: bounds.to_vec(),
                })
            }
        };
        Ok(Some(Type::type_variable(name, &bound)))
    }

    fn resolve_class(&self, name: &str) -> Result<Type> {
        // Exact imports (`Entry` may also be reached as `Map.Entry` through `import java.util.Map`)
        let (first_segment, nested) = match name.find('.') {
            Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
            None => (name, None),
        };
        let dot_name = format!(".{}", name);
        let dot_first = format!(".{}", first_segment);
        for import in self.imports.iter().filter(|import| !import.wildcard) {
            if import.name.ends_with(&dot_name) || import.name == name {
                log::trace!("'{}' resolved through import '{}'", name, import.name);
                return self.class_type(&import.name);
            }
            if let Some(nested) = nested {
                if import.name.ends_with(&dot_first) {
                    log::trace!("'{}' resolved through outer import '{}'", name, import.name);
                    let outer = self.binary_name_for(&import.name)?;
                    let binary = format!("{}${}", outer.as_str(), nested.replace('.', "$"));
                    return binary_type(name, binary);
                }
            }
        }

        // Same package
        let same_package = self.qualify(&self.package_name, name);
        if self.class_path.has_class(&same_package) {
            log::trace!("'{}' resolved in the current package", name);
            let mut binary = self.package_name.replace('.', "/");
            if !binary.is_empty() {
                binary.push('/');
            }
            binary.push_str(&name.replace('.', "$"));
            return binary_type(name, binary);
        }

        // Wildcard imports, then `java.lang`
        let implicit = Import::wildcard("java.lang");
        let wildcards = self
            .imports
            .iter()
            .filter(|import| import.wildcard)
            .chain(Some(&implicit).filter(|_| self.settings.implicit_java_lang));
        for import in wildcards {
            let candidate = self.qualify(&import.name, name);
            if self.class_path.has_class(&candidate) {
                log::trace!("'{}' resolved through '{}.*'", name, import.name);
                return self.class_type(&candidate);
            }
        }

        if !name.contains('.') && !self.settings.allow_default_package {
            return Err(Error::AmbiguousDefaultPackageName(name.to_owned()));
        }
        self.class_type(name)
    }

    fn qualify(&self, package: &str, name: &str) -> String {
        if package.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{}", package, name)
        }
    }

    fn class_type(&self, qualified: &str) -> Result<Type> {
        let binary = self.binary_name_for(qualified)?;
        Ok(Type::of_binary_name(&binary))
    }

    /// Work out where the package ends in a fully qualified dotted name
    ///
    /// The class path is asked about each prefix of the name, shortest first: the first prefix it
    /// knows is the outermost class, and everything after it is nested. Only if it knows none of
    /// them is the capitalization heuristic used.
    fn binary_name_for(&self, qualified: &str) -> Result<BinaryName> {
        let segments: Vec<&str> = qualified.split('.').collect();
        for outer in 1..=segments.len() {
            let prefix = segments[..outer].join(".");
            if self.class_path.has_class(&prefix) {
                let package = segments[..outer - 1].join("/");
                let classes = segments[outer - 1..].join("$");
                let binary = if package.is_empty() {
                    classes
                } else {
                    format!("{}/{}", package, classes)
                };
                return BinaryName::from_string(binary).map_err(|_| unresolved(qualified));
            }
        }

        log::warn!(
            "Guessing package of '{}' from its capitalization, it isn't on the class path",
            qualified
        );
        class_name_to_internal_heuristic(qualified).map_err(|_| unresolved(qualified))
    }

    /// Shortest name for a type that resolves back to it in this context
    ///
    /// Primitives and type variables render as their bare names, class types have the longest
    /// matching import stripped off (or are left fully qualified).
    pub fn unresolve(&self, typ: &Type) -> String {
        if let Some(name) = typ.primitive_name() {
            return name.to_owned();
        }
        if let Some(name) = typ.type_parameter_name() {
            return name.to_owned();
        }
        match typ.descriptor_type() {
            DescriptorType::Array => match typ.element_type() {
                Some(element) => format!("{}[]", self.unresolve(&element)),
                None => typ.java_name(),
            },
            DescriptorType::Class => {
                let qualified = match typ.class_name() {
                    Some(name) => name.replace('$', "."),
                    None => return typ.java_name(),
                };
                let implicit = Import::wildcard("java.lang");
                let mut rendered = self
                    .imports
                    .iter()
                    .chain(Some(&implicit).filter(|_| self.settings.implicit_java_lang))
                    .filter_map(|import| {
                        let stripped = import.strip(&qualified)?;
                        // Wildcards only bring classes into scope, not subpackages
                        if import.wildcard {
                            let outer = stripped.split('.').next().unwrap_or(&stripped);
                            let outer = self.qualify(&import.name, outer);
                            if !self.class_path.has_class(&outer) {
                                return None;
                            }
                        }
                        Some((import.name.len(), stripped))
                    })
                    .max_by_key(|(len, _)| *len)
                    .map(|(_, stripped)| stripped)
                    .unwrap_or(qualified);

                let arguments = typ.type_arguments();
                if !arguments.is_empty() {
                    let arguments: Vec<String> = arguments
                        .iter()
                        .map(|argument| match argument {
                            TypeArgument::Exact(typ) => self.unresolve(typ),
                            TypeArgument::Extends(typ) => {
                                format!("? extends {}", self.unresolve(typ))
                            }
                            TypeArgument::Super(typ) => format!("? super {}", self.unresolve(typ)),
                            TypeArgument::Wildcard => String::from("?"),
                        })
                        .collect();
                    rendered.push('<');
                    rendered.push_str(&arguments.join(", "));
                    rendered.push('>');
                }
                rendered
            }
            _ => typ.java_name(),
        }
    }
}

impl<'a> fmt::Debug for ResolutionContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("package_name", &self.package_name)
            .field("imports", &self.imports)
            .field("type_parameters", &self.type_parameters)
            .field("settings", &self.settings)
            .finish()
    }
}

fn unresolved(name: &str) -> Error {
    Error::UnresolvableName {
        name: name.to_owned(),
        raw: None,
        generic: vec![],
        cause: None,
    }
}

fn binary_type(name: &str, binary: String) -> Result<Type> {
    let binary = BinaryName::from_string(binary).map_err(|_| unresolved(name))?;
    Ok(Type::of_binary_name(&binary))
}

/// Split `List<Map<K, V>>` into `List` and `Map<K, V>`
///
/// The generic part runs from the first `<` up to a `>` that must be the final character.
fn split_generic(name: &str) -> Result<(&str, Option<&str>)> {
    let mismatched = |offset: usize| Error::MalformedSignature {
        input: name.to_owned(),
        offset,
        message: String::from("Mismatched angled brackets"),
    };
    match name.find('<') {
        None => match name.find('>') {
            Some(idx) => Err(mismatched(idx)),
            None => Ok((name, None)),
        },
        Some(open) => {
            if !name.ends_with('>') {
                return Err(mismatched(name.len()));
            }
            let generic = &name[open + 1..name.len() - 1];
            let mut depth = 0usize;
            for (idx, c) in generic.char_indices() {
                match c {
                    '<' => depth += 1,
                    '>' => {
                        depth = depth
                            .checked_sub(1)
                            .ok_or_else(|| mismatched(open + 1 + idx))?
                    }
                    _ => (),
                }
            }
            if depth != 0 {
                return Err(mismatched(name.len() - 1));
            }
            Ok((name[..open].trim_end(), Some(generic)))
        }
    }
}

/// Split a generic argument list at its top-level commas
fn split_arguments(generic: &str) -> Vec<&str> {
    let mut arguments = vec![];
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in generic.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                arguments.push(generic[start..idx].trim());
                start = idx + 1;
            }
            _ => (),
        }
    }
    arguments.push(generic[start..].trim());
    arguments
}
