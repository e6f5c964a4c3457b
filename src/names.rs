use std::borrow::Cow;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Internal (slash separated) names of classes and interfaces, as they appear inside descriptors
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct BinaryName(Cow<'static, str>);

impl BinaryName {
    /// Check if a string would be a valid binary name
    pub fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(format!("Binary name '{}' is empty", name));
        }
        for segment in name.split('/') {
            if segment.is_empty() {
                return Err(format!("Binary name '{}' has an empty segment", name));
            } else if segment.contains(&['.', ';', '[', '<', '>'][..]) {
                return Err(format!(
                    "Binary name '{}' contains an illegal character",
                    name
                ));
            }
        }
        Ok(())
    }

    /// Try to construct a name from a string
    pub fn from_string(name: String) -> Result<BinaryName, String> {
        BinaryName::check_valid(&name)?;
        Ok(BinaryName(Cow::Owned(name)))
    }

    /// Convert a fully qualified dotted name by turning every `.` into `/`
    ///
    /// Nested classes must already be spelled with `$` (`java.util.Map$Entry`).
    pub fn from_dotted(name: &str) -> Result<BinaryName, String> {
        BinaryName::from_string(name.replace('.', "/"))
    }

    /// Extact the raw underlying string name
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    /// Dotted form of the name, keeping `$` for nested classes (`java.util.Map$Entry`)
    pub fn to_dotted(&self) -> String {
        self.as_str().replace('/', ".")
    }

    /// Last path segment, including any nested class suffix (`Map$Entry`)
    pub fn simple_name(&self) -> &str {
        let name = self.as_str();
        match name.rfind('/') {
            Some(idx) => &name[idx + 1..],
            None => name,
        }
    }

    /// Package portion in dotted form, empty for the default package
    pub fn package(&self) -> String {
        let name = self.as_str();
        match name.rfind('/') {
            Some(idx) => name[..idx].replace('/', "."),
            None => String::new(),
        }
    }

    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    // JDK names
    pub const ANNOTATION: Self = Self::name("java/lang/annotation/Annotation");
    pub const CLASS: Self = Self::name("java/lang/Class");
    pub const CLONEABLE: Self = Self::name("java/lang/Cloneable");
    pub const ENUM: Self = Self::name("java/lang/Enum");
    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const SERIALIZABLE: Self = Self::name("java/io/Serializable");
    pub const STRING: Self = Self::name("java/lang/String");
    pub const THROWABLE: Self = Self::name("java/lang/Throwable");
}

/// Extracts the raw underlying string name
impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Debug for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Display for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

/// Guess the binary name of a dotted class name from the capitalization of its segments
///
/// Working backwards from the last segment, segments starting with an uppercase letter are taken
/// to be (possibly nested) classes and are joined with `$`. Once a segment starting with anything
/// else is seen, it and all earlier segments are taken to be packages and joined with `/`.
///
/// This only works for code following the usual naming conventions. It guesses wrong for
/// lowercase class names (`org.foo.nested.inner` is all package but the last segment), for
/// packages with uppercase segments (`com.Acme.Widget` becomes `com/Acme$Widget`), and for
/// nested classes whose outer class is lowercase.
pub fn class_name_to_internal_heuristic(class_name: &str) -> Result<BinaryName, String> {
    let parts: Vec<&str> = class_name.split('.').collect();
    let last = parts.len() - 1;

    let mut possible_class = true;
    let mut separators = vec![None; parts.len()];
    for (i, part) in parts.iter().enumerate().rev() {
        if i == last {
            continue;
        }
        if !part.starts_with(|c: char| c.is_uppercase()) {
            possible_class = false;
        }
        separators[i] = Some(if possible_class { '$' } else { '/' });
    }

    let mut internal = String::with_capacity(class_name.len());
    for (part, separator) in parts.iter().zip(separators) {
        internal.push_str(part);
        if let Some(separator) = separator {
            internal.push(separator);
        }
    }
    BinaryName::from_string(internal)
}

/// Convert an archive or directory entry (`java/util/List.class`) into a dotted class name
pub fn file_name_to_class_name(file_name: &str) -> String {
    let name = file_name.strip_suffix(".class").unwrap_or(file_name);
    let name = name.strip_suffix(".java").unwrap_or(name);
    let name = name.replace('\\', ".").replace('/', ".");
    match name.strip_prefix('.') {
        Some(stripped) => stripped.to_owned(),
        None => name,
    }
}

/// Convert a dotted class name into the archive entry that would hold it
pub fn class_name_to_file_name(class_name: &str) -> String {
    format!("{}.class", class_name.replace('.', "/"))
}
