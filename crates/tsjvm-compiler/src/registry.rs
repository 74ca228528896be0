//! Symbol registries populated by the collection pass
//!
//! One [`TypeRegistry`] exists per compilation unit. Pass 1 fills it, pass 2
//! only reads it. Lookups by simple name walk from the innermost namespace
//! outward, so `Foo` inside `a.b` finds `a.b.Foo`, then `a.Foo`, then `Foo`.

use crate::error::{CompileError, CompileResult};
use crate::types::descriptor::{OBJECT_CLASS, THROWABLE_CLASS};
use rustc_hash::{FxHashMap, FxHashSet};
use tsjvm_ast::TsType;
use tsjvm_classfile::ClassHierarchy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    /// Synthesized holder of a namespace's free functions and globals
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    pub descriptor: String,
    pub return_descriptor: String,
    pub is_static: bool,
    pub is_abstract: bool,
}

impl MethodInfo {
    pub fn new(name: &str, descriptor: &str, is_static: bool, is_abstract: bool) -> Self {
        let return_descriptor = descriptor
            .rsplit_once(')')
            .map(|(_, ret)| ret.to_string())
            .unwrap_or_else(|| "V".to_string());
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            return_descriptor,
            is_static,
            is_abstract,
        }
    }

    pub fn param_descriptors(&self) -> Vec<String> {
        tsjvm_classfile::descriptor::parse_method(&self.descriptor)
            .map(|(params, _)| params.into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
    pub readonly: bool,
}

/// Metadata of one declared class, interface, enum or function container
#[derive(Debug, Clone, PartialEq)]
pub struct JavaTypeInfo {
    pub simple_name: String,
    /// Enclosing namespace, dotted
    pub package: String,
    pub qualified_name: String,
    pub internal_name: String,
    pub kind: TypeKind,
    /// Qualified name of a registered superclass
    pub super_class: Option<String>,
    /// Internal name written to the class file
    pub super_internal: String,
    /// Qualified names of registered interfaces (parents, for interfaces)
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub methods: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
    pub constructors: Vec<String>,
    /// Generic parameters with their erased descriptors
    pub type_params: Vec<(String, String)>,
}

impl JavaTypeInfo {
    pub fn new(simple_name: &str, package: &str, internal_name: &str, kind: TypeKind) -> Self {
        Self {
            simple_name: simple_name.to_string(),
            package: package.to_string(),
            qualified_name: qualify(package, simple_name),
            internal_name: internal_name.to_string(),
            kind,
            super_class: None,
            super_internal: match kind {
                TypeKind::Enum => "java/lang/Enum".to_string(),
                _ => OBJECT_CLASS.to_string(),
            },
            interfaces: Vec::new(),
            is_abstract: false,
            methods: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            type_params: Vec::new(),
        }
    }

    /// Register a method; the same name and descriptor overwrite
    pub fn add_method(&mut self, method: MethodInfo) {
        match self
            .methods
            .iter_mut()
            .find(|m| m.name == method.name && m.descriptor == method.descriptor)
        {
            Some(existing) => *existing = method,
            None => self.methods.push(method),
        }
    }

    pub fn add_field(&mut self, field: FieldInfo) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn method_with(&self, name: &str, arity: usize) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.param_descriptors().len() == arity)
            .or_else(|| self.method(name))
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Namespaces to search for a name used inside `namespace`, innermost first
pub fn namespace_chain(namespace: &str) -> Vec<&str> {
    let mut chain = vec![namespace];
    let mut current = namespace;
    while let Some((parent, _)) = current.rsplit_once('.') {
        chain.push(parent);
        current = parent;
    }
    if !namespace.is_empty() {
        chain.push("");
    }
    chain
}

/// Enum members in declaration order; the position is the ordinal
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    enums: FxHashMap<String, Vec<String>>,
}

impl EnumRegistry {
    pub fn register(&mut self, qualified_name: &str, members: Vec<String>) -> CompileResult<()> {
        if members.is_empty() {
            return Err(CompileError::EnumError {
                name: qualified_name.to_string(),
                message: "enum must declare at least one member".to_string(),
            });
        }
        let mut seen = FxHashSet::default();
        for member in &members {
            if !seen.insert(Self::field_name(member)) {
                return Err(CompileError::EnumError {
                    name: qualified_name.to_string(),
                    message: format!("duplicate member {}", Self::field_name(member)),
                });
            }
        }
        self.enums.insert(qualified_name.to_string(), members);
        Ok(())
    }

    pub fn members(&self, qualified_name: &str) -> Option<&[String]> {
        self.enums.get(qualified_name).map(Vec::as_slice)
    }

    pub fn ordinal(&self, qualified_name: &str, member: &str) -> Option<usize> {
        self.enums.get(qualified_name)?.iter().position(|m| m == member)
    }

    /// Static field holding a member
    pub fn field_name(member: &str) -> String {
        member.to_uppercase()
    }

    pub fn reset(&mut self) {
        self.enums.clear();
    }
}

/// Every declaration of one compilation unit, by qualified name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: FxHashMap<String, JavaTypeInfo>,
    order: Vec<String>,
    by_internal: FxHashMap<String, String>,
    namespaces: FxHashSet<String>,
    aliases: FxHashMap<String, TsType>,
    containers: FxHashMap<String, String>,
    pub enums: EnumRegistry,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, for sequential reuse
    pub fn reset(&mut self) {
        self.types.clear();
        self.order.clear();
        self.by_internal.clear();
        self.namespaces.clear();
        self.aliases.clear();
        self.containers.clear();
        self.enums.reset();
    }

    pub fn register_namespace(&mut self, namespace: &str) {
        let mut current = namespace;
        loop {
            self.namespaces.insert(current.to_string());
            match current.rsplit_once('.') {
                Some((parent, _)) => current = parent,
                None => break,
            }
        }
    }

    pub fn is_namespace(&self, path: &str) -> bool {
        self.namespaces.contains(path)
    }

    /// Resolve a dotted path used in `namespace` to a declared namespace
    pub fn lookup_namespace(&self, path: &str, namespace: &str) -> Option<String> {
        namespace_chain(namespace)
            .into_iter()
            .map(|ns| qualify(ns, path))
            .find(|candidate| self.is_namespace(candidate))
    }

    pub fn register_type(&mut self, info: JavaTypeInfo) {
        let qualified = info.qualified_name.clone();
        self.by_internal.insert(info.internal_name.clone(), qualified.clone());
        if !self.types.contains_key(&qualified) {
            self.order.push(qualified.clone());
        }
        self.types.insert(qualified, info);
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.types.contains_key(qualified_name)
    }

    pub fn get(&self, qualified_name: &str) -> Option<&JavaTypeInfo> {
        self.types.get(qualified_name)
    }

    pub fn get_mut(&mut self, qualified_name: &str) -> Option<&mut JavaTypeInfo> {
        self.types.get_mut(qualified_name)
    }

    pub fn by_internal(&self, internal_name: &str) -> Option<&JavaTypeInfo> {
        self.by_internal.get(internal_name).and_then(|q| self.types.get(q))
    }

    /// Registered types in registration order
    pub fn types(&self) -> impl Iterator<Item = &JavaTypeInfo> {
        self.order.iter().filter_map(|q| self.types.get(q))
    }

    pub fn lookup_type(&self, name: &str, namespace: &str) -> Option<&JavaTypeInfo> {
        namespace_chain(namespace)
            .into_iter()
            .find_map(|ns| self.types.get(&qualify(ns, name)))
            .filter(|info| info.kind != TypeKind::Container)
    }

    pub fn register_alias(&mut self, qualified_name: &str, target: TsType) {
        self.aliases.insert(qualified_name.to_string(), target);
    }

    pub fn lookup_alias(&self, name: &str, namespace: &str) -> Option<(String, &TsType)> {
        namespace_chain(namespace).into_iter().find_map(|ns| {
            let qualified = qualify(ns, name);
            self.aliases.get(&qualified).map(|t| (qualified, t))
        })
    }

    pub fn set_container(&mut self, namespace: &str, qualified_name: &str) {
        self.containers
            .insert(namespace.to_string(), qualified_name.to_string());
    }

    pub fn container(&self, namespace: &str) -> Option<&JavaTypeInfo> {
        self.containers.get(namespace).and_then(|q| self.types.get(q))
    }

    /// Free function visible from `namespace`
    pub fn lookup_function(
        &self,
        name: &str,
        namespace: &str,
    ) -> Option<(&JavaTypeInfo, &MethodInfo)> {
        namespace_chain(namespace).into_iter().find_map(|ns| {
            let container = self.container(ns)?;
            container.method(name).map(|m| (container, m))
        })
    }

    /// Top-level variable visible from `namespace`
    pub fn lookup_global(
        &self,
        name: &str,
        namespace: &str,
    ) -> Option<(&JavaTypeInfo, &FieldInfo)> {
        namespace_chain(namespace).into_iter().find_map(|ns| {
            let container = self.container(ns)?;
            container.field(name).map(|f| (container, f))
        })
    }

    /// Method by name on a type or its ancestors; interfaces are searched
    /// after the superclass chain
    pub fn find_method(
        &self,
        qualified_name: &str,
        name: &str,
        arity: usize,
    ) -> Option<(&JavaTypeInfo, &MethodInfo)> {
        let mut seen = FxHashSet::default();
        let mut queue = vec![qualified_name.to_string()];
        let mut interfaces = Vec::new();
        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.types.get(&current) else {
                continue;
            };
            if let Some(method) = info.method_with(name, arity) {
                return Some((info, method));
            }
            interfaces.extend(info.interfaces.iter().cloned());
            if let Some(parent) = &info.super_class {
                queue.push(parent.clone());
            } else {
                queue.append(&mut interfaces);
            }
        }
        None
    }

    /// Field by name on a class or its superclasses
    pub fn find_field(
        &self,
        qualified_name: &str,
        name: &str,
    ) -> Option<(&JavaTypeInfo, &FieldInfo)> {
        let mut current = self.types.get(qualified_name);
        let mut depth = 0;
        while let Some(info) = current {
            if let Some(field) = info.field(name) {
                return Some((info, field));
            }
            depth += 1;
            if depth > 64 {
                break;
            }
            current = info.super_class.as_ref().and_then(|s| self.types.get(s));
        }
        None
    }

    /// Registered interfaces a type implements, transitively, nearest first
    pub fn all_interfaces(&self, qualified_name: &str) -> Vec<&JavaTypeInfo> {
        let mut result: Vec<&JavaTypeInfo> = Vec::new();
        let mut queue: Vec<String> = self
            .types
            .get(qualified_name)
            .map(|info| info.interfaces.clone())
            .unwrap_or_default();
        let mut index = 0;
        while index < queue.len() {
            let name = queue[index].clone();
            index += 1;
            if let Some(info) = self.types.get(&name) {
                if result.iter().any(|r| r.qualified_name == info.qualified_name) {
                    continue;
                }
                queue.extend(info.interfaces.iter().cloned());
                result.push(info);
            }
        }
        result
    }

    /// Whether `sub` is `sup` or extends/implements it, by internal name
    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT_CLASS {
            return true;
        }
        let Some(info) = self.by_internal(sub) else {
            return false;
        };
        if info.interfaces.iter().any(|i| {
            self.get(i)
                .is_some_and(|iface| self.is_assignable(&iface.internal_name, sup))
        }) {
            return true;
        }
        if info.super_internal == sup {
            return true;
        }
        match &info.super_class {
            Some(parent) => self
                .get(parent)
                .is_some_and(|p| self.is_assignable(&p.internal_name, sup)),
            None => false,
        }
    }

    /// Whether instances of an internal class name can be thrown
    pub fn is_throwable(&self, internal_name: &str) -> bool {
        let mut current = internal_name.to_string();
        for _ in 0..64 {
            if is_builtin_throwable(&current) {
                return true;
            }
            match self.by_internal(&current) {
                Some(info) if info.kind == TypeKind::Class => current = info.super_internal.clone(),
                _ => return false,
            }
        }
        false
    }
}

fn is_builtin_throwable(internal_name: &str) -> bool {
    internal_name == THROWABLE_CLASS
        || internal_name.starts_with("tsjvm/runtime/Js")
        || (internal_name.starts_with("java/lang/")
            && (internal_name.ends_with("Exception") || internal_name.ends_with("Error")))
}

impl ClassHierarchy for TypeRegistry {
    fn super_class(&self, internal_name: &str) -> Option<String> {
        if let Some(info) = self.by_internal(internal_name) {
            return Some(info.super_internal.clone());
        }
        match internal_name {
            "tsjvm/runtime/JsError" => Some("java/lang/RuntimeException".to_string()),
            "java/lang/RuntimeException" => Some("java/lang/Exception".to_string()),
            "java/lang/Exception" | "java/lang/Error" => Some(THROWABLE_CLASS.to_string()),
            name if name.starts_with("tsjvm/runtime/Js") => {
                Some("tsjvm/runtime/JsError".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(registry: &mut TypeRegistry, ns: &str, name: &str, parent: Option<&str>) {
        let internal = qualify(ns, name).replace('.', "/");
        let mut info = JavaTypeInfo::new(name, ns, &internal, TypeKind::Class);
        if let Some(parent) = parent {
            let parent_info = registry.get(parent).cloned();
            info.super_class = Some(parent.to_string());
            info.super_internal = parent_info.map(|p| p.internal_name).unwrap_or_default();
        }
        registry.register_type(info);
    }

    #[test]
    fn test_namespace_chain() {
        assert_eq!(namespace_chain("a.b"), vec!["a.b", "a", ""]);
        assert_eq!(namespace_chain(""), vec![""]);
    }

    #[test]
    fn test_lookup_innermost_first() {
        let mut registry = TypeRegistry::new();
        class(&mut registry, "", "Foo", None);
        class(&mut registry, "a", "Foo", None);
        assert_eq!(registry.lookup_type("Foo", "a.b").unwrap().qualified_name, "a.Foo");
        assert_eq!(registry.lookup_type("Foo", "c").unwrap().qualified_name, "Foo");
        assert_eq!(registry.lookup_type("a.Foo", "").unwrap().internal_name, "a/Foo");
        assert!(registry.lookup_type("Bar", "a").is_none());
    }

    #[test]
    fn test_method_overwrite_and_inheritance() {
        let mut registry = TypeRegistry::new();
        class(&mut registry, "", "Base", None);
        class(&mut registry, "", "Derived", Some("Base"));
        let base = registry.get_mut("Base").unwrap();
        base.add_method(MethodInfo::new("area", "()D", false, false));
        base.add_method(MethodInfo::new("area", "()D", false, true));
        assert_eq!(base.methods.len(), 1);
        assert!(base.methods[0].is_abstract);

        let (owner, method) = registry.find_method("Derived", "area", 0).unwrap();
        assert_eq!(owner.qualified_name, "Base");
        assert_eq!(method.return_descriptor, "D");
        assert!(registry.is_assignable("Derived", "Base"));
        assert_eq!(registry.common_superclass("Derived", "Base"), "Base");
    }

    #[test]
    fn test_enum_registry() {
        let mut enums = EnumRegistry::default();
        enums
            .register("Color", vec!["Red".into(), "Green".into()])
            .unwrap();
        assert_eq!(enums.ordinal("Color", "Green"), Some(1));
        assert_eq!(EnumRegistry::field_name("Green"), "GREEN");
        assert!(matches!(
            enums.register("Empty", vec![]),
            Err(CompileError::EnumError { .. })
        ));
        assert!(matches!(
            enums.register("Dup", vec!["a".into(), "A".into()]),
            Err(CompileError::EnumError { .. })
        ));
    }

    #[test]
    fn test_throwable_detection() {
        let mut registry = TypeRegistry::new();
        let mut info = JavaTypeInfo::new("Oops", "", "Oops", TypeKind::Class);
        info.super_internal = "tsjvm/runtime/JsError".to_string();
        registry.register_type(info);
        assert!(registry.is_throwable("Oops"));
        assert!(registry.is_throwable("java/lang/IllegalStateException"));
        assert!(!registry.is_throwable("java/lang/String"));
    }

    #[test]
    fn test_reset() {
        let mut registry = TypeRegistry::new();
        class(&mut registry, "", "Foo", None);
        registry.register_namespace("a.b");
        registry.reset();
        assert!(registry.get("Foo").is_none());
        assert!(!registry.is_namespace("a"));
    }
}
