use crate::names::file_name_to_class_name;
use std::collections::HashMap;
use std::fmt;

/// Oracle answering whether a class exists
///
/// Names are canonical dotted names, with nested classes also separated by `.`
/// (`java.util.Map.Entry`).
pub trait ClassPath: Sync {
    fn has_class(&self, class_name: &str) -> bool;
}

impl<F: Fn(&str) -> bool + Sync> ClassPath for F {
    fn has_class(&self, class_name: &str) -> bool {
        self(class_name)
    }
}

/// Type declared in a source file, along with the types nested inside it
#[derive(Clone, Debug)]
pub struct SourceType {
    pub name: String,
    pub nested: Vec<SourceType>,
}

impl SourceType {
    pub fn new(name: impl Into<String>) -> SourceType {
        SourceType {
            name: name.into(),
            nested: vec![],
        }
    }

    pub fn with_nested(mut self, nested: SourceType) -> SourceType {
        self.nested.push(nested);
        self
    }
}

/// In-memory index from class names to the archive or directory entry they were found in
///
/// Reading archives and walking directories is left to the caller, who feeds in entry names
/// (`java/util/List.class`) or the top-level types of parsed source files.
#[derive(Clone, Debug, Default)]
pub struct SearchPath {
    class_name_to_path: HashMap<String, String>,
}

/// Commonly referenced JDK classes
const JAVA_LIBRARY_CLASSES: &[&str] = &[
    "java/io/IOException",
    "java/io/PrintStream",
    "java/io/Serializable",
    "java/lang/Boolean",
    "java/lang/Byte",
    "java/lang/CharSequence",
    "java/lang/Character",
    "java/lang/Class",
    "java/lang/Cloneable",
    "java/lang/Comparable",
    "java/lang/Deprecated",
    "java/lang/Double",
    "java/lang/Enum",
    "java/lang/Error",
    "java/lang/Exception",
    "java/lang/Float",
    "java/lang/FunctionalInterface",
    "java/lang/Integer",
    "java/lang/Iterable",
    "java/lang/Long",
    "java/lang/Math",
    "java/lang/Number",
    "java/lang/Object",
    "java/lang/Override",
    "java/lang/Runnable",
    "java/lang/RuntimeException",
    "java/lang/Short",
    "java/lang/String",
    "java/lang/StringBuilder",
    "java/lang/SuppressWarnings",
    "java/lang/System",
    "java/lang/Thread",
    "java/lang/Throwable",
    "java/lang/Void",
    "java/lang/annotation/Annotation",
    "java/lang/annotation/Retention",
    "java/lang/annotation/RetentionPolicy",
    "java/lang/annotation/Target",
    "java/util/ArrayList",
    "java/util/Collection",
    "java/util/HashMap",
    "java/util/HashSet",
    "java/util/Iterator",
    "java/util/List",
    "java/util/Map",
    "java/util/Map$Entry",
    "java/util/Objects",
    "java/util/Optional",
    "java/util/Set",
    "java/util/function/BiFunction",
    "java/util/function/Consumer",
    "java/util/function/Function",
    "java/util/function/Predicate",
    "java/util/function/Supplier",
];

impl SearchPath {
    pub fn new() -> SearchPath {
        SearchPath::default()
    }

    /// Search path preloaded with common JDK classes
    pub fn with_java_library() -> SearchPath {
        let mut search_path = SearchPath::new();
        for class in JAVA_LIBRARY_CLASSES {
            search_path.add_entry(&format!("{}.class", class));
        }
        search_path
    }

    /// Register an archive/directory entry
    ///
    /// Entries that are neither `.class` nor `.java` files are ignored. Returns whether the entry
    /// was registered.
    pub fn add_entry(&mut self, entry_name: &str) -> bool {
        if !entry_name.ends_with(".class") && !entry_name.ends_with(".java") {
            return false;
        }
        let class_name = file_name_to_class_name(entry_name).replace('$', ".");
        log::trace!("Registering '{}' from '{}'", class_name, entry_name);
        self.class_name_to_path
            .insert(class_name, entry_name.to_owned());
        true
    }

    /// Register the types declared by a source file in `package` (empty for the default package)
    pub fn add_source_types(&mut self, entry_name: &str, package: &str, types: &[SourceType]) {
        let prefix = if package.is_empty() {
            String::new()
        } else {
            format!("{}.", package)
        };
        for typ in types {
            self.add_source_type(entry_name, typ, &prefix);
        }
    }

    fn add_source_type(&mut self, entry_name: &str, typ: &SourceType, prefix: &str) {
        let name = format!("{}{}", prefix, typ.name);
        let nested_prefix = format!("{}.", name);
        self.class_name_to_path
            .insert(name, entry_name.to_owned());
        for nested in &typ.nested {
            self.add_source_type(entry_name, nested, &nested_prefix);
        }
    }

    /// Entry a class was registered from
    pub fn path_for_class(&self, class_name: &str) -> Option<&str> {
        self.class_name_to_path
            .get(class_name)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.class_name_to_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_name_to_path.is_empty()
    }

    /// Registered class names, sorted
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.class_name_to_path.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ClassPath for SearchPath {
    fn has_class(&self, class_name: &str) -> bool {
        self.class_name_to_path.contains_key(class_name)
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchPath: {} classes", self.len())?;
        for name in self.class_names() {
            write!(f, "\n{}", name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entries() {
        let mut search_path = SearchPath::new();
        assert!(search_path.add_entry("me/alec/Point.class"));
        assert!(search_path.add_entry("me/alec/Point$Inner.class"));
        assert!(!search_path.add_entry("META-INF/MANIFEST.MF"));

        assert!(search_path.has_class("me.alec.Point"));
        assert!(search_path.has_class("me.alec.Point.Inner"));
        assert!(!search_path.has_class("me.alec.Line"));
        assert_eq!(
            search_path.path_for_class("me.alec.Point"),
            Some("me/alec/Point.class")
        );
        assert_eq!(search_path.len(), 2);
    }

    #[test]
    fn source_types() {
        let mut search_path = SearchPath::new();
        let outer = SourceType::new("Outer").with_nested(SourceType::new("Inner"));
        search_path.add_source_types("src/a/Outer.java", "a", &[outer]);
        search_path.add_source_types("Loose.java", "", &[SourceType::new("Loose")]);

        assert_eq!(search_path.class_names(), ["Loose", "a.Outer", "a.Outer.Inner"]);
        assert_eq!(
            search_path.path_for_class("a.Outer.Inner"),
            Some("src/a/Outer.java")
        );
    }

    #[test]
    fn java_library() {
        let search_path = SearchPath::with_java_library();
        assert!(search_path.has_class("java.lang.String"));
        assert!(search_path.has_class("java.util.Map.Entry"));
        assert!(!search_path.has_class("java.lang.Strin"));
    }

    #[test]
    fn closures_are_class_paths() {
        let only_foo = |name: &str| name == "a.Foo";
        assert!(only_foo.has_class("a.Foo"));
        assert!(!only_foo.has_class("a.Bar"));
    }
}
