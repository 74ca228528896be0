//! Class declarations

use super::{internal_name, param_descriptors, signature_env, PendingReturn};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, FieldInfo, JavaTypeInfo, MethodInfo, TypeKind, TypeRegistry};
use crate::types::{getter_name, method_descriptor, setter_name, DeclEnv, TypeResolver, OBJECT};
use tsjvm_ast::{ClassDecl, ClassMember, ClassMethod, ClassProp, Decl, MethodKind};

/// JVM name of a method: accessors become `getX`/`isX`/`setX`
pub(crate) fn method_java_name(key: &str, kind: MethodKind, ret: &str) -> String {
    match kind {
        MethodKind::Method => key.to_string(),
        MethodKind::Getter => getter_name(key, ret),
        MethodKind::Setter => setter_name(key),
    }
}

pub(super) fn declare_type(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    namespace: &str,
    class: &ClassDecl,
) {
    let qualified = qualify(namespace, class.ident.as_str());
    let mut info = JavaTypeInfo::new(
        class.ident.as_str(),
        namespace,
        &internal_name(options, &qualified),
        TypeKind::Class,
    );
    info.is_abstract = class.is_abstract;
    registry.register_type(info);
}

fn classes<'d, 'm>(
    decls: &'d [(String, &'m Decl)],
) -> impl Iterator<Item = (&'d str, &'m ClassDecl)> + 'd {
    decls.iter().filter_map(|(ns, decl)| match decl {
        Decl::Class(class) => Some((ns.as_str(), class)),
        _ => None,
    })
}

struct Hierarchy {
    qualified: String,
    super_class: Option<String>,
    super_internal: Option<String>,
    interfaces: Vec<String>,
    type_params: Vec<(String, String)>,
}

/// Superclasses, implemented interfaces and erased generics
pub(super) fn declare_hierarchy(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    decls: &[(String, &Decl)],
) {
    let mut updates = Vec::new();
    {
        let resolver = TypeResolver::new(registry, &options.type_alias_map);
        for (namespace, class) in classes(decls) {
            let qualified = qualify(namespace, class.ident.as_str());
            let env = DeclEnv::new(namespace);
            let mut update = Hierarchy {
                qualified: qualified.clone(),
                super_class: None,
                super_internal: None,
                interfaces: Vec::new(),
                type_params: Vec::new(),
            };
            if let Some(parent) = &class.super_class {
                match registry.lookup_type(parent.as_str(), namespace) {
                    Some(info) if info.kind == TypeKind::Class => {
                        update.super_class = Some(info.qualified_name.clone());
                        update.super_internal = Some(info.internal_name.clone());
                    }
                    _ => match resolver.alias_class(parent.as_str()) {
                        Some(internal) => update.super_internal = Some(internal),
                        None => tracing::debug!(
                            target: "tsjvm::collect",
                            class = %qualified,
                            parent = parent.as_str(),
                            "unknown superclass, extending Object"
                        ),
                    },
                }
            }
            for iface in &class.implements {
                match registry.lookup_type(iface.as_str(), namespace) {
                    Some(info) if info.is_interface() => {
                        update.interfaces.push(info.qualified_name.clone())
                    }
                    _ => tracing::debug!(
                        target: "tsjvm::collect",
                        class = %qualified,
                        interface = iface.as_str(),
                        "unknown interface ignored"
                    ),
                }
            }
            match resolver.erase_type_params(&class.type_params, &env) {
                Ok(erased) => update.type_params = erased,
                Err(err) => tracing::debug!(
                    target: "tsjvm::collect",
                    class = %qualified,
                    error = %err,
                    "generic bounds skipped"
                ),
            }
            updates.push(update);
        }
    }
    for update in updates {
        if let Some(info) = registry.get_mut(&update.qualified) {
            info.super_class = update.super_class;
            if let Some(internal) = update.super_internal {
                info.super_internal = internal;
            }
            info.interfaces = update.interfaces;
            info.type_params = update.type_params;
        }
    }
}

/// Fields, constructors and methods with a known signature
pub(super) fn declare_members<'m>(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    decls: &[(String, &'m Decl)],
    pending: &mut Vec<PendingReturn<'m>>,
) {
    let mut fields: Vec<(String, FieldInfo)> = Vec::new();
    let mut methods: Vec<(String, MethodInfo)> = Vec::new();
    let mut constructors: Vec<(String, String)> = Vec::new();
    {
        let resolver = TypeResolver::new(registry, &options.type_alias_map);
        for (namespace, class) in classes(decls) {
            let qualified = qualify(namespace, class.ident.as_str());
            for member in &class.body {
                match member {
                    ClassMember::Property(prop) => {
                        if let Some(field) = field_info(&resolver, namespace, &qualified, prop) {
                            fields.push((qualified.clone(), field));
                        }
                    }
                    ClassMember::Constructor(ctor) => {
                        let desc = signature_env(&resolver, namespace, Some(&qualified), &[])
                            .and_then(|env| param_descriptors(&resolver, &ctor.params, &env));
                        match desc {
                            Ok(params) => {
                                let params: Vec<String> =
                                    params.into_iter().map(|(_, d)| d).collect();
                                constructors
                                    .push((qualified.clone(), method_descriptor(&params, "V")));
                            }
                            Err(err) => skip(&qualified, "constructor", &err.to_string()),
                        }
                    }
                    ClassMember::Method(method) => {
                        match method_signature(&resolver, namespace, &qualified, method) {
                            Ok(Signature::Known(info)) => methods.push((qualified.clone(), info)),
                            Ok(Signature::Pending(item)) => pending.push(item),
                            Err(reason) => skip(&qualified, method.key.as_str(), &reason),
                        }
                    }
                }
            }
        }
    }
    for (owner, field) in fields {
        if let Some(info) = registry.get_mut(&owner) {
            info.add_field(field);
        }
    }
    for (owner, method) in methods {
        if let Some(info) = registry.get_mut(&owner) {
            info.add_method(method);
        }
    }
    for (owner, ctor) in constructors {
        if let Some(info) = registry.get_mut(&owner) {
            if !info.constructors.contains(&ctor) {
                info.constructors.push(ctor);
            }
        }
    }
}

fn skip(owner: &str, member: &str, reason: &str) {
    tracing::debug!(target: "tsjvm::collect", %owner, member, reason, "skipped member signature");
}

fn field_info(
    resolver: &TypeResolver<'_>,
    namespace: &str,
    qualified: &str,
    prop: &ClassProp,
) -> Option<FieldInfo> {
    let env = match signature_env(resolver, namespace, Some(qualified), &[]) {
        Ok(env) => env,
        Err(err) => {
            skip(qualified, prop.key.as_str(), &err.to_string());
            return None;
        }
    };
    let descriptor = match (&prop.type_ann, &prop.value) {
        (Some(ty), _) => match resolver.resolve(ty, &env) {
            Ok(desc) => desc,
            Err(err) => {
                skip(qualified, prop.key.as_str(), &err.to_string());
                return None;
            }
        },
        (None, Some(value)) => resolver.infer_or_object(value, &env),
        (None, None) => OBJECT.to_string(),
    };
    Some(FieldInfo {
        name: prop.key.name.clone(),
        descriptor,
        is_static: prop.is_static,
        readonly: prop.readonly,
    })
}

enum Signature<'m> {
    Known(MethodInfo),
    Pending(PendingReturn<'m>),
}

fn method_signature<'m>(
    resolver: &TypeResolver<'_>,
    namespace: &str,
    qualified: &str,
    method: &'m ClassMethod,
) -> Result<Signature<'m>, String> {
    let env = signature_env(resolver, namespace, Some(qualified), &method.function.type_params)
        .map_err(|e| e.to_string())?;
    let params = param_descriptors(resolver, &method.function.params, &env)
        .map_err(|e| e.to_string())?;
    let param_descs: Vec<String> = params.iter().map(|(_, d)| d.clone()).collect();
    let key = method.key.as_str();

    let ret = match (&method.function.return_type, method.kind, &method.function.body) {
        (_, MethodKind::Setter, _) => "V".to_string(),
        (Some(ty), _, _) => resolver.resolve(ty, &env).map_err(|e| e.to_string())?,
        (None, _, Some(body)) if !method.is_abstract => {
            return Ok(Signature::Pending(PendingReturn {
                owner: qualified.to_string(),
                name: method_java_name(key, method.kind, OBJECT),
                params,
                body,
                env,
                is_static: method.is_static,
                getter_of: (method.kind == MethodKind::Getter).then(|| key.to_string()),
            }));
        }
        (None, _, _) => OBJECT.to_string(),
    };
    let name = method_java_name(key, method.kind, &ret);
    let desc = method_descriptor(&param_descs, &ret);
    Ok(Signature::Known(MethodInfo::new(
        &name,
        &desc,
        method.is_static,
        method.is_abstract || method.function.body.is_none(),
    )))
}

/// Classes without a constructor take their superclass's first one, or `()V`
pub(super) fn declare_implicit_constructors(
    registry: &mut TypeRegistry,
    decls: &[(String, &Decl)],
) {
    let implicit: Vec<String> = classes(decls)
        .filter(|(_, class)| !class.body.iter().any(|m| matches!(m, ClassMember::Constructor(_))))
        .map(|(ns, class)| qualify(ns, class.ident.as_str()))
        .collect();
    // Parents may be declared after their children; each round settles one more level
    for _ in 0..=implicit.len() {
        let mut changed = false;
        for qualified in &implicit {
            let inherited = registry
                .get(qualified)
                .and_then(|info| info.super_class.as_ref())
                .and_then(|parent| registry.get(parent))
                .and_then(|parent| parent.constructors.first().cloned());
            let ctor = inherited.unwrap_or_else(|| "()V".to_string());
            if let Some(info) = registry.get_mut(qualified) {
                if info.constructors.first() != Some(&ctor) {
                    info.constructors = vec![ctor];
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::collect_module;
    use super::*;
    use tsjvm_ast::factory::*;

    fn collect(body: Vec<tsjvm_ast::Stmt>) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        collect_module(&mut registry, &ByteCodeCompilerOptions::default(), &module(body)).unwrap();
        registry
    }

    #[test]
    fn test_fields_and_methods() {
        let registry = collect(vec![class("Counter")
            .prop("count", Some(t_int()), Some(int(0)))
            .prop("label", None, Some(str_("c")))
            .static_prop("instances", Some(t_number()), None)
            .method("inc", vec![param("by", Some(t_int()))], None, vec![expr_stmt(assign_op(
                tsjvm_ast::AssignOp::AddAssign,
                member(this(), "count"),
                ident("by"),
            ))])
            .method("get", vec![], Some(t_int()), vec![ret(member(this(), "count"))])
            .getter("doubled", None, vec![ret(mul(member(this(), "count"), int(2)))])
            .getter("empty", Some(t_boolean()), vec![ret(bool_(true))])
            .build()]);
        let info = registry.get("Counter").unwrap();
        assert_eq!(info.field("count").unwrap().descriptor, "I");
        assert_eq!(info.field("label").unwrap().descriptor, "Ljava/lang/String;");
        assert!(info.field("instances").unwrap().is_static);
        assert_eq!(info.method("get").unwrap().descriptor, "()I");
        assert_eq!(info.method("inc").unwrap().descriptor, "(I)V");
        assert_eq!(info.method("getDoubled").unwrap().descriptor, "()I");
        assert_eq!(info.method("isEmpty").unwrap().descriptor, "()Z");
        assert_eq!(info.constructors, vec!["()V".to_string()]);
    }

    #[test]
    fn test_hierarchy_and_inherited_constructor() {
        let registry = collect(vec![
            class("Dog").extends("Animal").build(),
            class("Animal")
                .ctor(vec![param("name", Some(t_string()))], vec![])
                .build(),
            class("Oops").extends("Error").build(),
        ]);
        let dog = registry.get("Dog").unwrap();
        assert_eq!(dog.super_class.as_deref(), Some("Animal"));
        assert_eq!(dog.super_internal, "Animal");
        assert_eq!(dog.constructors, vec!["(Ljava/lang/String;)V".to_string()]);
        let oops = registry.get("Oops").unwrap();
        assert_eq!(oops.super_class, None);
        assert_eq!(oops.super_internal, "tsjvm/runtime/JsError");
        assert!(registry.is_throwable("Oops"));
    }

    #[test]
    fn test_generic_class_erases_parameters() {
        let registry = collect(vec![class("Box")
            .type_param("T", None)
            .prop("value", Some(t_named("T")), None)
            .method("get", vec![], Some(t_named("T")), vec![ret(member(this(), "value"))])
            .build()]);
        let info = registry.get("Box").unwrap();
        assert_eq!(info.field("value").unwrap().descriptor, "Ljava/lang/Object;");
        assert_eq!(info.method("get").unwrap().descriptor, "()Ljava/lang/Object;");
    }

    #[test]
    fn test_abstract_methods() {
        let registry = collect(vec![class("Shape")
            .abstract_()
            .abstract_method("area", vec![], Some(t_number()))
            .build()]);
        let info = registry.get("Shape").unwrap();
        assert!(info.is_abstract);
        let area = info.method("area").unwrap();
        assert!(area.is_abstract);
        assert_eq!(area.descriptor, "()D");
    }

    #[test]
    fn test_method_java_names() {
        assert_eq!(method_java_name("size", MethodKind::Method, "I"), "size");
        assert_eq!(method_java_name("size", MethodKind::Getter, "I"), "getSize");
        assert_eq!(method_java_name("ready", MethodKind::Getter, "Z"), "isReady");
        assert_eq!(method_java_name("size", MethodKind::Setter, "V"), "setSize");
    }
}
