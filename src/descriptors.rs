//! Scanner for the JVM type grammar shared by descriptors and generic signatures
//!
//! A descriptor is a flat concatenation of erased type tokens (`I`, `[J`, `Ljava/lang/Object;`).
//! A signature uses the same tokens but additionally allows type variable references (`TT;`) and
//! generic argument lists inside class references (`Ljava/util/List<Ljava/lang/String;>;`).
//!
//! Scanning is a single forward pass with no backtracking. [`read_type`] consumes exactly one
//! token and hands back the consumed slice of the input, so callers tokenize whole lists by
//! advancing their offset by the length of each token.

use crate::errors::{Error, Result};

/// Which flavour of the type grammar is being scanned
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Dialect {
    /// Erased types only: no type variables, no generic arguments
    Descriptor,

    /// Generic-aware types
    Signature,
}

impl Dialect {
    fn error(self, input: &str, offset: usize, message: String) -> Error {
        let input = input.to_owned();
        match self {
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
}

/// Utility trait for turning a type back into its descriptor form
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

/// Primitive value types (including `void`, which is only valid as a return type)
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Void,
}

impl BaseType {
    pub const ALL: [BaseType; 9] = [
        BaseType::Byte,
        BaseType::Char,
        BaseType::Double,
        BaseType::Float,
        BaseType::Int,
        BaseType::Long,
        BaseType::Short,
        BaseType::Boolean,
        BaseType::Void,
    ];

    pub const fn descriptor_char(self) -> char {
        match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
            BaseType::Void => 'V',
        }
    }

    pub fn from_descriptor_char(c: char) -> Option<BaseType> {
        BaseType::ALL
            .iter()
            .copied()
            .find(|base| base.descriptor_char() == c)
    }

    /// Java source keyword for the primitive
    pub const fn keyword(self) -> &'static str {
        match self {
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Double => "double",
            BaseType::Float => "float",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Short => "short",
            BaseType::Boolean => "boolean",
            BaseType::Void => "void",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<BaseType> {
        BaseType::ALL
            .iter()
            .copied()
            .find(|base| base.keyword() == keyword)
    }

    /// Number of local variable or stack slots a value of this type occupies
    pub const fn width(self) -> usize {
        match self {
            BaseType::Void => 0,
            BaseType::Double | BaseType::Long => 2,
            _ => 1,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        write_to.push(self.descriptor_char());
    }
}

/// Read exactly one type token from `input` starting at byte offset `pos`
///
/// The returned slice always starts at `pos`. Running off the end of the input before the token
/// is terminated is an error, as is a generic argument list in the descriptor dialect.
pub fn read_type(input: &str, pos: usize, dialect: Dialect) -> Result<&str> {
    let bytes = input.as_bytes();
    let start = pos;
    let mut pos = pos;

    while pos < bytes.len() {
        let c = bytes[pos];
        pos += 1;
        match c {
            b'Z' | b'C' | b'B' | b'S' | b'I' | b'F' | b'J' | b'D' | b'V' => {
                return Ok(&input[start..pos]);
            }

            b'[' => (),

            b'T' if dialect == Dialect::Signature => {
                return match input[pos..].find(';') {
                    Some(end) => Ok(&input[start..pos + end + 1]),
                    None => {
                        let msg = format!("Missing terminator for '{}'", &input[start..]);
                        Err(dialect.error(input, input.len(), msg))
                    }
                };
            }

            b'L' => {
                let mut generic_depth: usize = 0;
                while pos < bytes.len() {
                    let c = bytes[pos];
                    pos += 1;
                    match c {
                        b';' if generic_depth == 0 => return Ok(&input[start..pos]),
                        b'<' => {
                            if dialect == Dialect::Descriptor {
                                let msg = "Illegal character '<' in descriptor".to_owned();
                                return Err(dialect.error(input, pos - 1, msg));
                            }
                            generic_depth += 1;
                        }
                        b'>' => {
                            generic_depth = generic_depth.checked_sub(1).ok_or_else(|| {
                                let msg = "Unbalanced '>' in class type".to_owned();
                                dialect.error(input, pos - 1, msg)
                            })?;
                        }
                        _ => (),
                    }
                }
                let msg = format!("Missing terminator for '{}'", &input[start..]);
                return Err(dialect.error(input, input.len(), msg));
            }

            _ => {
                let unexpected = input[pos - 1..].chars().next().unwrap_or('?');
                let msg = format!(
                    "Unexpected character '{}', searched section '{}'",
                    unexpected,
                    &input[start..pos - 1]
                );
                return Err(dialect.error(input, pos - 1, msg));
            }
        }
    }

    let msg = format!("Reached {} before the end of a type", pos);
    Err(dialect.error(input, pos, msg))
}

/// Read one type argument out of a generic argument list
///
/// On top of the regular signature tokens this accepts the unbounded wildcard `*` and the bounded
/// wildcard prefixes `+` (extends) and `-` (super).
pub fn read_type_argument(input: &str, pos: usize) -> Result<&str> {
    match input.as_bytes().get(pos) {
        Some(b'*') => Ok(&input[pos..pos + 1]),
        Some(b'+') | Some(b'-') => {
            let bound = read_type(input, pos + 1, Dialect::Signature)?;
            Ok(&input[pos..pos + 1 + bound.len()])
        }
        _ => read_type(input, pos, Dialect::Signature),
    }
}

/// Tokenize a complete descriptor or signature list
///
/// In the signature dialect, input producing no tokens at all comes back as `None` so that callers
/// can tell "nothing here" apart from a legitimately empty list.
pub fn split_types(input: &str, dialect: Dialect) -> Result<Option<Vec<&str>>> {
    let types = TypeTokens::new(input, dialect).collect::<Result<Vec<&str>>>()?;
    if dialect == Dialect::Signature && types.is_empty() {
        Ok(None)
    } else {
        Ok(Some(types))
    }
}

/// Lazily produce the type tokens of an input, one at a time
///
/// The sequence can be cloned to fork the scan, or restarted from the beginning. After the first
/// error no further tokens are produced.
#[derive(Clone, Debug)]
pub struct TypeTokens<'a> {
    input: &'a str,
    pos: usize,
    dialect: Dialect,
    failed: bool,
}

impl<'a> TypeTokens<'a> {
    pub fn new(input: &'a str, dialect: Dialect) -> TypeTokens<'a> {
        TypeTokens {
            input,
            pos: 0,
            dialect,
            failed: false,
        }
    }

    /// Go back to the start of the input
    pub fn restart(&mut self) {
        self.pos = 0;
        self.failed = false;
    }

    /// Byte offset of the next token
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Input not yet consumed
    pub fn remainder(&self) -> &'a str {
        &self.input[self.pos..]
    }
}

impl<'a> Iterator for TypeTokens<'a> {
    type Item = Result<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.input.len() {
            return None;
        }
        match read_type(self.input, self.pos, self.dialect) {
            Ok(token) => {
                self.pos += token.len();
                Some(Ok(token))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
