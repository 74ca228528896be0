//! Type resolution: source types and expressions to JVM descriptors

pub mod descriptor;
pub mod infer;
pub mod members;
pub mod resolver;

pub use descriptor::*;
pub use members::{CallTarget, LibraryCall, MemberTarget};
pub use resolver::TypeResolver;

use rustc_hash::FxHashMap;
use tsjvm_classfile::Opcode;

/// What the resolver needs to know about the code surrounding an expression
pub trait TypeEnv {
    /// Dotted namespace of the declaration being compiled, empty at the root
    fn namespace(&self) -> &str;

    /// Erased descriptor of a generic parameter in scope
    fn generic(&self, name: &str) -> Option<&str>;

    /// Descriptor of a local variable or parameter
    fn variable(&self, name: &str) -> Option<&str>;

    /// Qualified name of the class whose code is being compiled
    fn this_class(&self) -> Option<&str>;

    /// Map type info recorded for a variable
    fn variable_generic(&self, _name: &str) -> Option<&GenericTypeInfo> {
        None
    }
}

/// Environment for declaration signatures: no locals, only generics
#[derive(Debug, Clone, Default)]
pub struct DeclEnv {
    pub namespace: String,
    pub generics: FxHashMap<String, String>,
    pub this_class: Option<String>,
}

impl DeclEnv {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }
}

impl TypeEnv for DeclEnv {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn generic(&self, name: &str) -> Option<&str> {
        self.generics.get(name).map(String::as_str)
    }

    fn variable(&self, _name: &str) -> Option<&str> {
        None
    }

    fn this_class(&self) -> Option<&str> {
        self.this_class.as_deref()
    }
}

/// An environment extended with extra variables, innermost last
pub struct ScopedEnv<'e> {
    parent: &'e dyn TypeEnv,
    vars: Vec<(String, String)>,
}

impl<'e> ScopedEnv<'e> {
    pub fn new(parent: &'e dyn TypeEnv) -> Self {
        Self {
            parent,
            vars: Vec::new(),
        }
    }

    pub fn bind(&mut self, name: &str, descriptor: &str) {
        self.vars.push((name.to_string(), descriptor.to_string()));
    }
}

impl TypeEnv for ScopedEnv<'_> {
    fn namespace(&self) -> &str {
        self.parent.namespace()
    }

    fn generic(&self, name: &str) -> Option<&str> {
        self.parent.generic(name)
    }

    fn variable(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_str())
            .or_else(|| self.parent.variable(name))
    }

    fn this_class(&self) -> Option<&str> {
        self.parent.this_class()
    }

    fn variable_generic(&self, name: &str) -> Option<&GenericTypeInfo> {
        if self.vars.iter().any(|(n, _)| n == name) {
            return None;
        }
        self.parent.variable_generic(name)
    }
}

/// Key and value descriptors of a map-like annotation (`Record<K, V>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTypeInfo {
    pub key: String,
    pub value: String,
    /// Present when the value is itself a map type
    pub nested: Option<Box<GenericTypeInfo>>,
}

impl GenericTypeInfo {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            nested: None,
        }
    }

    pub fn with_nested(mut self, nested: GenericTypeInfo) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    /// Number of map levels described
    pub fn depth(&self) -> usize {
        1 + self.nested.as_ref().map_or(0, |n| n.depth())
    }
}

/// Classification of a method's return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Object,
}

impl ReturnType {
    /// Instruction that leaves a method with this kind of value
    pub fn opcode(self) -> Opcode {
        match self {
            ReturnType::Void => Opcode::Return,
            ReturnType::Boolean | ReturnType::Int => Opcode::Ireturn,
            ReturnType::Long => Opcode::Lreturn,
            ReturnType::Float => Opcode::Freturn,
            ReturnType::Double => Opcode::Dreturn,
            ReturnType::String | ReturnType::Object => Opcode::Areturn,
        }
    }
}

/// Return type with the stack it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnTypeInfo {
    pub kind: ReturnType,
    /// Operand-stack slots needed to produce the value
    pub max_stack: u16,
    /// Descriptor for reference types
    pub descriptor: Option<String>,
}

impl ReturnTypeInfo {
    pub fn of(desc: &str) -> Self {
        let (kind, max_stack) = match desc {
            "V" => (ReturnType::Void, 0),
            "Z" => (ReturnType::Boolean, 1),
            "I" | "B" | "C" | "S" => (ReturnType::Int, 1),
            "J" => (ReturnType::Long, 2),
            "F" => (ReturnType::Float, 1),
            "D" => (ReturnType::Double, 2),
            STRING => (ReturnType::String, 1),
            _ => (ReturnType::Object, 1),
        };
        let descriptor = match kind {
            ReturnType::String | ReturnType::Object => Some(desc.to_string()),
            _ => None,
        };
        Self {
            kind,
            max_stack,
            descriptor,
        }
    }

    pub fn is_void(&self) -> bool {
        self.kind == ReturnType::Void
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_type_info() {
        let info = ReturnTypeInfo::of("D");
        assert_eq!(info.kind, ReturnType::Double);
        assert_eq!(info.max_stack, 2);
        assert_eq!(info.descriptor, None);

        let info = ReturnTypeInfo::of("Ljava/lang/String;");
        assert_eq!(info.kind, ReturnType::String);
        assert_eq!(info.descriptor.as_deref(), Some("Ljava/lang/String;"));

        assert!(ReturnTypeInfo::of("V").is_void());
        assert_eq!(ReturnTypeInfo::of("[I").kind, ReturnType::Object);
    }

    #[test]
    fn test_return_opcodes() {
        let cases = [
            ("V", Opcode::Return),
            ("Z", Opcode::Ireturn),
            ("C", Opcode::Ireturn),
            ("J", Opcode::Lreturn),
            ("F", Opcode::Freturn),
            ("D", Opcode::Dreturn),
            ("Ljava/lang/String;", Opcode::Areturn),
            ("[D", Opcode::Areturn),
        ];
        for (desc, opcode) in cases {
            assert_eq!(ReturnTypeInfo::of(desc).kind.opcode(), opcode, "{}", desc);
        }
    }

    #[test]
    fn test_scoped_env_shadows_parent() {
        let mut base = DeclEnv::new("a.b");
        base.generics.insert("T".into(), OBJECT.into());
        let mut scoped = ScopedEnv::new(&base);
        scoped.bind("x", "I");
        scoped.bind("x", "D");
        assert_eq!(scoped.variable("x"), Some("D"));
        assert_eq!(scoped.variable("y"), None);
        assert_eq!(scoped.generic("T"), Some(OBJECT));
        assert_eq!(scoped.namespace(), "a.b");
    }

    #[test]
    fn test_generic_depth() {
        let info = GenericTypeInfo::new(STRING, LINKED_HASH_MAP)
            .with_nested(GenericTypeInfo::new(STRING, "I"));
        assert_eq!(info.depth(), 2);
    }
}
