//! What a property access or a call resolves to
//!
//! Inference and code generation share these so a member is typed exactly
//! the way it is later emitted.

use super::descriptor::*;
use super::{TypeEnv, TypeResolver};
use crate::functional::{self, FunctionalInterface};
use crate::registry::{EnumRegistry, JavaTypeInfo, TypeKind};
use tsjvm_ast::{CallExpr, Callee, Expr, MemberExpr, MemberProp};

#[derive(Debug, Clone, PartialEq)]
pub enum MemberTarget {
    /// `Color.Red`
    EnumConstant { owner: String, field: String, descriptor: String },
    StaticField { owner: String, name: String, descriptor: String },
    Field { owner: String, name: String, descriptor: String },
    /// Property read through an accessor method
    Getter {
        owner: String,
        name: String,
        descriptor: String,
        interface: bool,
    },
    ArrayLength,
    StringLength,
    /// `err.message`
    ErrorMessage { owner: String },
    /// `map.key` / `map[key]`, read with `get`
    MapEntry { value: String },
    MapSize,
    /// `arr[i]`
    ArrayElement { element: String },
    /// `str[i]`, a one-character string
    StringChar,
}

impl MemberTarget {
    /// Descriptor of the value the access produces
    pub fn descriptor(&self) -> String {
        match self {
            MemberTarget::EnumConstant { descriptor, .. }
            | MemberTarget::StaticField { descriptor, .. }
            | MemberTarget::Field { descriptor, .. } => descriptor.clone(),
            MemberTarget::Getter { descriptor, .. } => descriptor
                .rsplit_once(')')
                .map(|(_, ret)| ret.to_string())
                .unwrap_or_else(|| OBJECT.to_string()),
            MemberTarget::ArrayLength | MemberTarget::StringLength | MemberTarget::MapSize => {
                "I".to_string()
            }
            MemberTarget::ErrorMessage { .. } | MemberTarget::StringChar => STRING.to_string(),
            MemberTarget::MapEntry { value } => value.clone(),
            MemberTarget::ArrayElement { element } => element.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Static {
        owner: String,
        name: String,
        descriptor: String,
    },
    /// Virtual or interface call on the evaluated receiver
    Instance {
        owner: String,
        name: String,
        descriptor: String,
        interface: bool,
        /// Convert the returned value to this descriptor
        cast: Option<String>,
    },
    /// `super.m()`
    Super {
        owner: String,
        name: String,
        descriptor: String,
    },
    /// Abstract method of a functional value; the callee is evaluated first
    Functional(&'static FunctionalInterface),
    Library(LibraryCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryCall {
    /// `str.charAt(i)`, returned as a string
    StringCharAt,
    /// `x.toString()` on a primitive, through `String.valueOf`
    ValueToString,
}

impl CallTarget {
    pub fn descriptor(&self) -> Option<&str> {
        match self {
            CallTarget::Static { descriptor, .. }
            | CallTarget::Instance { descriptor, .. }
            | CallTarget::Super { descriptor, .. } => Some(descriptor),
            CallTarget::Functional(fi) => Some(fi.descriptor),
            CallTarget::Library(_) => None,
        }
    }

    /// Descriptor of the call's value
    pub fn result_descriptor(&self) -> String {
        match self {
            CallTarget::Instance { cast: Some(cast), .. } => cast.clone(),
            CallTarget::Library(_) => STRING.to_string(),
            other => other
                .descriptor()
                .and_then(|d| d.rsplit_once(')'))
                .map(|(_, ret)| ret.to_string())
                .unwrap_or_else(|| "V".to_string()),
        }
    }
}

fn instance(owner: &str, name: &str, descriptor: &str) -> CallTarget {
    CallTarget::Instance {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        interface: false,
        cast: None,
    }
}

fn static_call(owner: &str, name: &str, descriptor: &str) -> CallTarget {
    CallTarget::Static {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    }
}

/// Dotted identifier chain (`a.b.C`) of an expression
pub fn static_path(expr: &Expr) -> Option<String> {
    match expr.unparen() {
        Expr::Ident(id) => Some(id.name.clone()),
        Expr::Member(m) => {
            let base = static_path(&m.obj)?;
            Some(format!("{}.{}", base, m.prop_name()?))
        }
        _ => None,
    }
}

fn first_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

impl<'a> TypeResolver<'a> {
    /// Local, then top-level variable type
    pub fn variable_type(&self, name: &str, env: &dyn TypeEnv) -> Option<String> {
        if let Some(desc) = env.variable(name) {
            return Some(desc.to_string());
        }
        self.registry
            .lookup_global(name, env.namespace())
            .map(|(_, field)| field.descriptor.clone())
    }

    /// Type named by an expression used as a value namespace (`Color`, `a.b.Foo`)
    pub fn static_type(&self, expr: &Expr, env: &dyn TypeEnv) -> Option<&'a JavaTypeInfo> {
        let path = static_path(expr)?;
        if self.variable_type(first_segment(&path), env).is_some() {
            return None;
        }
        self.registry.lookup_type(&path, env.namespace())
    }

    /// Namespace named by an expression (`a.b`)
    pub fn static_namespace(&self, expr: &Expr, env: &dyn TypeEnv) -> Option<String> {
        let path = static_path(expr)?;
        if self.variable_type(first_segment(&path), env).is_some() {
            return None;
        }
        self.registry.lookup_namespace(&path, env.namespace())
    }

    pub fn resolve_member(&self, member: &MemberExpr, env: &dyn TypeEnv) -> Option<MemberTarget> {
        if let MemberProp::Ident(prop) = &member.prop {
            if let Some(target) = self.static_member(&member.obj, &prop.name, env) {
                return Some(target);
            }
        }
        let obj_ty = self.infer(&member.obj, env)?;
        match &member.prop {
            MemberProp::Ident(prop) => self.instance_member(&member.obj, &obj_ty, &prop.name, env),
            MemberProp::Computed(_) => {
                if let Some(element) = array_element(&obj_ty) {
                    return Some(MemberTarget::ArrayElement {
                        element: element.to_string(),
                    });
                }
                if obj_ty == STRING {
                    return Some(MemberTarget::StringChar);
                }
                if obj_ty == LINKED_HASH_MAP || obj_ty == OBJECT {
                    return Some(MemberTarget::MapEntry {
                        value: self.map_value(&member.obj, env),
                    });
                }
                None
            }
        }
    }

    /// Value descriptor of a map expression's entries
    fn map_value(&self, map: &Expr, env: &dyn TypeEnv) -> String {
        if let Expr::Ident(id) = map.unparen() {
            if let Some(info) = env.variable_generic(&id.name) {
                return info.value.clone();
            }
        }
        OBJECT.to_string()
    }

    fn static_member(&self, obj: &Expr, prop: &str, env: &dyn TypeEnv) -> Option<MemberTarget> {
        if let Some(info) = self.static_type(obj, env) {
            if info.kind == TypeKind::Enum {
                if let Some(members) = self.registry.enums.members(&info.qualified_name) {
                    if members.iter().any(|m| m == prop) {
                        return Some(MemberTarget::EnumConstant {
                            owner: info.internal_name.clone(),
                            field: EnumRegistry::field_name(prop),
                            descriptor: object_of(&info.internal_name),
                        });
                    }
                }
            }
            let (owner, field) = self.registry.find_field(&info.qualified_name, prop)?;
            return field.is_static.then(|| MemberTarget::StaticField {
                owner: owner.internal_name.clone(),
                name: field.name.clone(),
                descriptor: field.descriptor.clone(),
            });
        }
        let namespace = self.static_namespace(obj, env)?;
        let container = self.registry.container(&namespace)?;
        let field = container.field(prop)?;
        Some(MemberTarget::StaticField {
            owner: container.internal_name.clone(),
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
        })
    }

    fn instance_member(
        &self,
        obj: &Expr,
        obj_ty: &str,
        prop: &str,
        env: &dyn TypeEnv,
    ) -> Option<MemberTarget> {
        if is_array(obj_ty) {
            return (prop == "length").then_some(MemberTarget::ArrayLength);
        }
        if obj_ty == STRING {
            return (prop == "length").then_some(MemberTarget::StringLength);
        }
        if obj_ty == LINKED_HASH_MAP {
            if prop == "size" {
                return Some(MemberTarget::MapSize);
            }
            return Some(MemberTarget::MapEntry {
                value: self.map_value(obj, env),
            });
        }
        let class = class_name(obj_ty);
        if let Some(info) = self.registry.by_internal(class) {
            if let Some((owner, field)) = self.registry.find_field(&info.qualified_name, prop) {
                if !field.is_static {
                    return Some(MemberTarget::Field {
                        owner: owner.internal_name.clone(),
                        name: field.name.clone(),
                        descriptor: field.descriptor.clone(),
                    });
                }
            }
            let candidates = [
                format!("get{}", capitalize(prop)),
                format!("is{}", capitalize(prop)),
                prop.to_string(),
            ];
            for name in &candidates {
                if let Some((owner, method)) =
                    self.registry.find_method(&info.qualified_name, name, 0)
                {
                    if method.is_static
                        || !method.descriptor.starts_with("()")
                        || method.return_descriptor == "V"
                    {
                        continue;
                    }
                    return Some(MemberTarget::Getter {
                        owner: owner.internal_name.clone(),
                        name: method.name.clone(),
                        descriptor: method.descriptor.clone(),
                        interface: owner.is_interface(),
                    });
                }
            }
        }
        if prop == "message" && (obj_ty == THROWABLE || self.registry.is_throwable(class)) {
            return Some(MemberTarget::ErrorMessage {
                owner: class.to_string(),
            });
        }
        None
    }

    pub fn resolve_call(&self, call: &CallExpr, env: &dyn TypeEnv) -> Option<CallTarget> {
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        let arity = call.args.len();
        match callee.unparen() {
            Expr::Ident(id) => {
                if let Some(desc) = self.variable_type(&id.name, env) {
                    return functional::by_descriptor(&desc).map(CallTarget::Functional);
                }
                let (container, method) = self.registry.lookup_function(&id.name, env.namespace())?;
                Some(static_call(&container.internal_name, &method.name, &method.descriptor))
            }
            Expr::Member(member) => {
                let Some(name) = member.prop_name() else {
                    return self.functional_value(callee, env);
                };
                if let Expr::Super(_) = member.obj.unparen() {
                    return self.super_call(name, arity, env);
                }
                if let Some(target) = self.static_call(&member.obj, name, &call.args, env) {
                    return Some(target);
                }
                let receiver = self.infer(&member.obj, env)?;
                self.instance_call(&member.obj, &receiver, name, arity, env)
                    .or_else(|| self.functional_value(callee, env))
            }
            other => self.functional_value(other, env),
        }
    }

    fn functional_value(&self, callee: &Expr, env: &dyn TypeEnv) -> Option<CallTarget> {
        let desc = self.infer(callee, env)?;
        functional::by_descriptor(&desc).map(CallTarget::Functional)
    }

    fn super_call(&self, name: &str, arity: usize, env: &dyn TypeEnv) -> Option<CallTarget> {
        let this = self.registry.get(env.this_class()?)?;
        let parent = this.super_class.as_ref()?;
        let (owner, method) = self.registry.find_method(parent, name, arity)?;
        Some(CallTarget::Super {
            owner: owner.internal_name.clone(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        })
    }

    fn static_call(
        &self,
        obj: &Expr,
        name: &str,
        args: &[Expr],
        env: &dyn TypeEnv,
    ) -> Option<CallTarget> {
        if let Some(info) = self.static_type(obj, env) {
            if info.kind == TypeKind::Enum {
                let array = format!("[L{};", info.internal_name);
                match name {
                    "values" => {
                        let desc = format!("(){}", array);
                        return Some(static_call(&info.internal_name, "values", &desc));
                    }
                    "valueOf" => {
                        let desc = format!("(Ljava/lang/String;)L{};", info.internal_name);
                        return Some(static_call(&info.internal_name, "valueOf", &desc));
                    }
                    _ => {}
                }
            }
            let (owner, method) = self
                .registry
                .find_method(&info.qualified_name, name, args.len())?;
            return method
                .is_static
                .then(|| static_call(&owner.internal_name, &method.name, &method.descriptor));
        }
        if let Some(namespace) = self.static_namespace(obj, env) {
            let container = self.registry.container(&namespace)?;
            let method = container.method_with(name, args.len())?;
            return Some(static_call(&container.internal_name, &method.name, &method.descriptor));
        }
        let path = static_path(obj)?;
        if self.variable_type(first_segment(&path), env).is_some() {
            return None;
        }
        let arg_types: Vec<String> = args.iter().map(|a| self.infer_or_object(a, env)).collect();
        if path == "Math" {
            return math_call(name, &arg_types);
        }
        let owner = self.alias_class(&path)?;
        library_static(&owner, name, &arg_types)
    }

    fn instance_call(
        &self,
        obj: &Expr,
        receiver: &str,
        name: &str,
        arity: usize,
        env: &dyn TypeEnv,
    ) -> Option<CallTarget> {
        if receiver == STRING {
            if let Some(target) = string_call(name, arity) {
                return Some(target);
            }
        }
        if receiver == LINKED_HASH_MAP {
            let value = self.map_value(obj, env);
            let cast = (value != OBJECT).then_some(value);
            let (java, desc, cast) = match (name, arity) {
                ("get", 1) => ("get", "(Ljava/lang/Object;)Ljava/lang/Object;", cast),
                ("set", 2) => (
                    "put",
                    "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
                    None,
                ),
                ("has", 1) => ("containsKey", "(Ljava/lang/Object;)Z", None),
                ("delete", 1) => ("remove", "(Ljava/lang/Object;)Ljava/lang/Object;", None),
                _ => return None,
            };
            return Some(CallTarget::Instance {
                owner: MAP_CLASS.to_string(),
                name: java.to_string(),
                descriptor: desc.to_string(),
                interface: false,
                cast,
            });
        }
        if is_primitive(receiver) {
            return (name == "toString" && arity == 0)
                .then_some(CallTarget::Library(LibraryCall::ValueToString));
        }
        let class = class_name(receiver);
        if let Some(info) = self.registry.by_internal(class) {
            if let Some((owner, method)) =
                self.registry.find_method(&info.qualified_name, name, arity)
            {
                if !method.is_static {
                    return Some(CallTarget::Instance {
                        owner: owner.internal_name.clone(),
                        name: method.name.clone(),
                        descriptor: method.descriptor.clone(),
                        interface: owner.is_interface(),
                        cast: None,
                    });
                }
            }
            if info.kind == TypeKind::Enum {
                match (name, arity) {
                    ("name", 0) | ("toString", 0) => {
                        return Some(instance(class, name, "()Ljava/lang/String;"))
                    }
                    ("ordinal", 0) => return Some(instance(class, "ordinal", "()I")),
                    _ => {}
                }
            }
        }
        if (receiver == THROWABLE || self.registry.is_throwable(class))
            && name == "getMessage"
            && arity == 0
        {
            return Some(instance(class, "getMessage", "()Ljava/lang/String;"));
        }
        match (name, arity) {
            ("toString", 0) if is_reference(receiver) => {
                Some(instance(OBJECT_CLASS, "toString", "()Ljava/lang/String;"))
            }
            ("equals", 1) if is_reference(receiver) => {
                Some(instance(OBJECT_CLASS, "equals", "(Ljava/lang/Object;)Z"))
            }
            _ => None,
        }
    }
}

fn string_call(name: &str, arity: usize) -> Option<CallTarget> {
    let (java, desc) = match (name, arity) {
        ("charAt", 1) => return Some(CallTarget::Library(LibraryCall::StringCharAt)),
        ("indexOf", 1) => ("indexOf", "(Ljava/lang/String;)I"),
        ("lastIndexOf", 1) => ("lastIndexOf", "(Ljava/lang/String;)I"),
        ("substring", 1) => ("substring", "(I)Ljava/lang/String;"),
        ("substring", 2) => ("substring", "(II)Ljava/lang/String;"),
        ("toUpperCase", 0) => ("toUpperCase", "()Ljava/lang/String;"),
        ("toLowerCase", 0) => ("toLowerCase", "()Ljava/lang/String;"),
        ("trim", 0) => ("trim", "()Ljava/lang/String;"),
        ("startsWith", 1) => ("startsWith", "(Ljava/lang/String;)Z"),
        ("endsWith", 1) => ("endsWith", "(Ljava/lang/String;)Z"),
        ("includes", 1) => ("contains", "(Ljava/lang/CharSequence;)Z"),
        ("concat", 1) => ("concat", "(Ljava/lang/String;)Ljava/lang/String;"),
        ("compareTo", 1) => ("compareTo", "(Ljava/lang/String;)I"),
        ("toString", 0) => ("toString", "()Ljava/lang/String;"),
        _ => return None,
    };
    Some(instance(STRING_CLASS, java, desc))
}

fn math_call(name: &str, args: &[String]) -> Option<CallTarget> {
    let all = |pred: fn(&str) -> bool| args.iter().all(|a| pred(unboxed(a).unwrap_or(a)));
    let desc = match (name, args.len()) {
        ("abs", 1) if all(is_int_like) => "(I)I",
        ("abs", 1) if all(|d| d == "J") => "(J)J",
        ("abs", 1) => "(D)D",
        ("max" | "min", 2) if all(is_int_like) => "(II)I",
        ("max" | "min", 2) => "(DD)D",
        ("floor" | "ceil" | "sqrt", 1) => "(D)D",
        ("pow", 2) => "(DD)D",
        ("round", 1) => "(D)J",
        _ => return None,
    };
    Some(static_call("java/lang/Math", name, desc))
}

fn library_static(owner: &str, name: &str, args: &[String]) -> Option<CallTarget> {
    let desc = match (owner, name, args) {
        ("java/lang/Integer", "parseInt", [_]) => "(Ljava/lang/String;)I".to_string(),
        ("java/lang/Double", "parseDouble", [_]) => "(Ljava/lang/String;)D".to_string(),
        ("java/lang/String", "valueOf", [arg]) => value_of_descriptor(arg).to_string(),
        (_, "valueOf", [_]) => {
            let prim = unboxed(&object_of(owner))?;
            format!("({})L{};", prim, owner)
        }
        _ => return None,
    };
    Some(static_call(owner, name, &desc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_path() {
        use tsjvm_ast::factory::*;
        assert_eq!(static_path(&member(member(ident("a"), "b"), "C")).as_deref(), Some("a.b.C"));
        assert_eq!(static_path(&member(call_fn("f", vec![]), "x")), None);
    }

    #[test]
    fn test_math_overloads() {
        let ints = vec!["I".to_string(), "I".to_string()];
        assert_eq!(math_call("max", &ints).unwrap().descriptor(), Some("(II)I"));
        let mixed = vec!["I".to_string(), "D".to_string()];
        assert_eq!(math_call("max", &mixed).unwrap().descriptor(), Some("(DD)D"));
        assert_eq!(
            math_call("round", &["D".to_string()]).unwrap().result_descriptor(),
            "J"
        );
        assert!(math_call("hypot", &mixed).is_none());
    }

    #[test]
    fn test_library_statics() {
        let parse = library_static("java/lang/Integer", "parseInt", &[STRING.to_string()]).unwrap();
        assert_eq!(parse.result_descriptor(), "I");
        let boxed = library_static("java/lang/Integer", "valueOf", &["I".to_string()]).unwrap();
        assert_eq!(boxed.descriptor(), Some("(I)Ljava/lang/Integer;"));
    }

    #[test]
    fn test_string_calls() {
        assert_eq!(
            string_call("includes", 1).unwrap().descriptor(),
            Some("(Ljava/lang/CharSequence;)Z")
        );
        assert_eq!(
            string_call("charAt", 1).unwrap().result_descriptor(),
            STRING
        );
        assert!(string_call("charAt", 0).is_none());
    }
}
