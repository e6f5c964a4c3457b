//! Resolve types and splice code into compiled JVM classes
//!
//! ### Simple example
//!
//! Consider a patch written against the following Java source:
//!
//! ```java,ignore,no_run
//! package me.alec;
//!
//! import java.util.*;
//!
//! class Patch<T> {
//!     List<String> names;
//!     T current;
//! }
//! ```
//!
//! Names in it are resolved against its imports, type parameters, and the classes on the class
//! path. Call sites can then be overwritten with code compatible with what was there before:
//!
//! ```
//! use classpatch::class_path::SearchPath;
//! use classpatch::descriptors::BaseType;
//! use classpatch::fragments::*;
//! use classpatch::resolution::*;
//! use classpatch::types::Type;
//!
//! # fn patch() -> classpatch::Result<()> {
//! let class_path = SearchPath::with_java_library();
//! let context = ResolutionContext::new(
//!     "me.alec",
//!     vec![Import::parse("java.util.*")],
//!     vec![TypeParameter::new("T")],
//!     &class_path,
//!     ResolutionSettings::default(),
//! );
//!
//! let names = context.resolve("List<String>")?;
//! assert_eq!(names.descriptor(), "Ljava/util/List;");
//! assert_eq!(names.signature(), Some("Ljava/util/List<Ljava/lang/String;>;"));
//! assert_eq!(context.unresolve(&names), "List<String>");
//!
//! let current = context.resolve("T")?;
//! assert_eq!(current.descriptor(), "Ljava/lang/Object;");
//!
//! // `names.size()`, replaced by a call that takes the list from a local variable
//! let int = Type::primitive(BaseType::Int);
//! let mut call = CodeFragment::method_call(
//!     names.clone(),
//!     "size",
//!     vec![IntermediateValue::stack(names.clone(), 0)],
//!     vec![IntermediateValue::stack(int.clone(), 0)],
//! );
//! let replacement = CodeFragment::method_call(
//!     Type::of_class("me.alec.Patch")?,
//!     "countNames",
//!     vec![IntermediateValue::local(names, 1)],
//!     vec![IntermediateValue::stack(int, 0)],
//! );
//! call.insert(replacement, InsertionPosition::Overwrite, InsertionOptions::default())?;
//! assert_eq!(call.children().len(), 2);
//! # Ok(())
//! # }
//! # patch().unwrap();
//! ```

pub mod access_flags;
pub mod annotations;
pub mod binary_format;
pub mod class_path;
pub mod descriptors;
pub mod errors;
pub mod fragments;
pub mod method;
pub mod names;
pub mod opcodes;
pub mod resolution;
pub mod types;

pub use errors::{Error, Result};
pub use fragments::{CodeFragment, InsertionOptions, InsertionPosition};
pub use resolution::ResolutionContext;
pub use types::Type;
