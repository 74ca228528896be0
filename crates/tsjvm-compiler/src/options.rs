//! Compiler configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tsjvm_classfile::ClassVersion;

/// Target Java release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JdkVersion {
    Jdk8,
    Jdk11,
    Jdk17,
    Jdk21,
}

impl JdkVersion {
    pub fn class_version(self) -> ClassVersion {
        match self {
            JdkVersion::Jdk8 => ClassVersion::JAVA_8,
            JdkVersion::Jdk11 => ClassVersion::JAVA_11,
            JdkVersion::Jdk17 => ClassVersion::JAVA_17,
            JdkVersion::Jdk21 => ClassVersion::JAVA_21,
        }
    }

    pub fn release(self) -> u8 {
        match self {
            JdkVersion::Jdk8 => 8,
            JdkVersion::Jdk11 => 11,
            JdkVersion::Jdk17 => 17,
            JdkVersion::Jdk21 => 21,
        }
    }
}

impl Default for JdkVersion {
    fn default() -> Self {
        JdkVersion::Jdk17
    }
}

impl TryFrom<u8> for JdkVersion {
    type Error = String;

    fn try_from(release: u8) -> Result<Self, Self::Error> {
        match release {
            8 => Ok(JdkVersion::Jdk8),
            11 => Ok(JdkVersion::Jdk11),
            17 => Ok(JdkVersion::Jdk17),
            21 => Ok(JdkVersion::Jdk21),
            other => Err(format!("unsupported JDK version {} (expected 8, 11, 17 or 21)", other)),
        }
    }
}

impl From<JdkVersion> for u8 {
    fn from(version: JdkVersion) -> u8 {
        version.release()
    }
}

impl fmt::Display for JdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JDK {}", self.release())
    }
}

/// Options recognized by [`crate::ByteCodeCompiler`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteCodeCompilerOptions {
    /// Target release; decides the class-file major version
    pub jdk_version: JdkVersion,

    /// Dotted package prepended to every generated class
    pub package_prefix: String,

    /// Source type name to Java type name (`"int"`, `"java.lang.String"`)
    pub type_alias_map: BTreeMap<String, String>,

    /// Re-read and verify every class before returning it
    pub debug: bool,
}

impl Default for ByteCodeCompilerOptions {
    fn default() -> Self {
        Self {
            jdk_version: JdkVersion::default(),
            package_prefix: String::new(),
            type_alias_map: default_type_aliases(),
            debug: false,
        }
    }
}

impl ByteCodeCompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jdk_version(mut self, version: JdkVersion) -> Self {
        self.jdk_version = version;
        self
    }

    pub fn with_package_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.package_prefix = prefix.into();
        self
    }

    pub fn with_type_alias(
        mut self,
        name: impl Into<String>,
        java_type: impl Into<String>,
    ) -> Self {
        self.type_alias_map.insert(name.into(), java_type.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn class_version(&self) -> ClassVersion {
        self.jdk_version.class_version()
    }

    /// Internal-name prefix (`com/example/`), empty without a package prefix
    pub fn internal_prefix(&self) -> String {
        let trimmed = self.package_prefix.trim_matches('.');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed.replace('.', "/"))
        }
    }

    /// Dotted class name as seen by callers of the compiler
    pub fn external_name(&self, internal_name: &str) -> String {
        internal_name.replace('/', ".")
    }
}

const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "double", "float", "int", "long", "short", "void",
];

const BOXES: [(&str, &str); 8] = [
    ("Boolean", "java.lang.Boolean"),
    ("Byte", "java.lang.Byte"),
    ("Character", "java.lang.Character"),
    ("Double", "java.lang.Double"),
    ("Float", "java.lang.Float"),
    ("Integer", "java.lang.Integer"),
    ("Long", "java.lang.Long"),
    ("Short", "java.lang.Short"),
];

const ERRORS: [&str; 8] = [
    "Error",
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "URIError",
    "EvalError",
    "AggregateError",
];

/// Package of the runtime error classes thrown by generated code
pub const RUNTIME_PACKAGE: &str = "tsjvm.runtime";

pub fn default_type_aliases() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for primitive in PRIMITIVES {
        map.insert(primitive.to_string(), primitive.to_string());
    }
    for (name, java) in BOXES {
        map.insert(name.to_string(), java.to_string());
    }
    for (name, java) in [
        ("String", "java.lang.String"),
        ("Object", "java.lang.Object"),
        ("Number", "java.lang.Number"),
        ("BigInteger", "java.math.BigInteger"),
        ("Pattern", "java.util.regex.Pattern"),
        ("any", "java.lang.Object"),
        ("unknown", "java.lang.Object"),
    ] {
        map.insert(name.to_string(), java.to_string());
    }
    for name in ERRORS {
        map.insert(name.to_string(), format!("{}.Js{}", RUNTIME_PACKAGE, name));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ByteCodeCompilerOptions::default();
        assert_eq!(options.jdk_version, JdkVersion::Jdk17);
        assert_eq!(options.class_version().major, 61);
        assert_eq!(options.type_alias_map["int"], "int");
        assert_eq!(options.type_alias_map["Integer"], "java.lang.Integer");
        assert_eq!(options.type_alias_map["TypeError"], "tsjvm.runtime.JsTypeError");
        assert!(!options.debug);
    }

    #[test]
    fn test_builder_and_prefix() {
        let options = ByteCodeCompilerOptions::new()
            .with_jdk_version(JdkVersion::Jdk8)
            .with_package_prefix("com.example.")
            .with_type_alias("Text", "java.lang.String");
        assert_eq!(options.class_version().major, 52);
        assert_eq!(options.internal_prefix(), "com/example/");
        assert_eq!(options.type_alias_map["Text"], "java.lang.String");
        assert_eq!(options.external_name("com/example/Foo"), "com.example.Foo");
    }

    #[test]
    fn test_deserialize_partial() {
        let options: ByteCodeCompilerOptions =
            serde_json::from_str(r#"{"jdk_version": 21, "package_prefix": "demo"}"#).unwrap();
        assert_eq!(options.jdk_version, JdkVersion::Jdk21);
        assert_eq!(options.package_prefix, "demo");
        assert_eq!(options.type_alias_map["String"], "java.lang.String");
    }

    #[test]
    fn test_reject_unknown_jdk() {
        let result: Result<ByteCodeCompilerOptions, _> =
            serde_json::from_str(r#"{"jdk_version": 9}"#);
        assert!(result.is_err());
    }
}
