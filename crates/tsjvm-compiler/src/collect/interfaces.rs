//! Interface declarations
//!
//! An interface becomes a JVM interface of abstract methods only. Members map
//! as follows:
//!
//! | Member | Methods |
//! |---|---|
//! | `name: T` | `getName()T` and `setName(T)V` |
//! | `readonly name: T` | `getName()T` |
//! | `get name(): T` / `set name(v: T)` | `getName()T` / `setName(T)V` |
//! | `[k: K]: V` | `get(K)V` and `set(K, V)V` unless readonly; a `number` key becomes `I` |
//! | `(a: A): R` | `call(A)R` |
//! | `new (a: A): R` | `create(A)R` |

use super::internal_name;
use crate::error::CompileResult;
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, JavaTypeInfo, MethodInfo, TypeKind, TypeRegistry};
use crate::types::{getter_name, method_descriptor, setter_name, DeclEnv, TypeResolver, OBJECT};
use tsjvm_ast::{BindingIdent, Decl, InterfaceDecl, InterfaceMember, TsType};

/// Entry point of a call signature
pub const CALL_METHOD: &str = "call";
/// Entry point of a construct signature
pub const CREATE_METHOD: &str = "create";

pub(super) fn declare_type(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    namespace: &str,
    iface: &InterfaceDecl,
) {
    let qualified = qualify(namespace, iface.ident.as_str());
    let mut info = JavaTypeInfo::new(
        iface.ident.as_str(),
        namespace,
        &internal_name(options, &qualified),
        TypeKind::Interface,
    );
    info.is_abstract = true;
    registry.register_type(info);
}

struct Members {
    qualified: String,
    parents: Vec<String>,
    type_params: Vec<(String, String)>,
    methods: Vec<MethodInfo>,
}

pub(super) fn declare_members(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    decls: &[(String, &Decl)],
) {
    let mut updates = Vec::new();
    {
        let resolver = TypeResolver::new(registry, &options.type_alias_map);
        for (namespace, decl) in decls {
            let Decl::Interface(iface) = decl else {
                continue;
            };
            let qualified = qualify(namespace, iface.ident.as_str());
            let mut env = DeclEnv::new(namespace);
            let type_params = match resolver.erase_type_params(&iface.type_params, &env) {
                Ok(erased) => erased,
                Err(err) => {
                    tracing::debug!(
                        target: "tsjvm::collect",
                        interface = %qualified,
                        error = %err,
                        "generic bounds skipped"
                    );
                    Vec::new()
                }
            };
            env.generics.extend(type_params.iter().cloned());

            let parents = iface
                .extends
                .iter()
                .filter_map(|parent| registry.lookup_type(parent.as_str(), namespace))
                .filter(|info| info.is_interface())
                .map(|info| info.qualified_name.clone())
                .collect();

            let mut methods = Vec::new();
            for member in &iface.body {
                if let Err(err) = member_methods(&resolver, &env, member, &mut methods) {
                    tracing::debug!(
                        target: "tsjvm::collect",
                        interface = %qualified,
                        error = %err,
                        "skipped interface member"
                    );
                }
            }
            updates.push(Members {
                qualified,
                parents,
                type_params,
                methods,
            });
        }
    }
    for update in updates {
        if let Some(info) = registry.get_mut(&update.qualified) {
            info.interfaces = update.parents;
            info.type_params = update.type_params;
            for method in update.methods {
                info.add_method(method);
            }
        }
    }
}

fn abstract_method(name: &str, params: &[String], ret: &str) -> MethodInfo {
    MethodInfo::new(name, &method_descriptor(params, ret), false, true)
}

fn param_list(
    resolver: &TypeResolver<'_>,
    env: &DeclEnv,
    params: &[BindingIdent],
) -> CompileResult<Vec<String>> {
    params
        .iter()
        .map(|p| resolver.resolve_or_object(p.type_ann.as_ref(), env))
        .collect()
}

fn return_of(
    resolver: &TypeResolver<'_>,
    env: &DeclEnv,
    ty: Option<&TsType>,
) -> CompileResult<String> {
    match ty {
        Some(ty) => resolver.resolve(ty, env),
        None => Ok(OBJECT.to_string()),
    }
}

fn member_methods(
    resolver: &TypeResolver<'_>,
    env: &DeclEnv,
    member: &InterfaceMember,
    out: &mut Vec<MethodInfo>,
) -> CompileResult<()> {
    match member {
        InterfaceMember::Property(prop) => {
            let desc = resolver.resolve_or_object(prop.type_ann.as_ref(), env)?;
            out.push(abstract_method(&getter_name(prop.key.as_str(), &desc), &[], &desc));
            if !prop.readonly {
                out.push(abstract_method(&setter_name(prop.key.as_str()), &[desc], "V"));
            }
        }
        InterfaceMember::Method(method) => {
            let mut method_env = env.clone();
            method_env
                .generics
                .extend(resolver.erase_type_params(&method.type_params, env)?);
            let params = param_list(resolver, &method_env, &method.params)?;
            let ret = return_of(resolver, &method_env, method.return_type.as_ref())?;
            out.push(abstract_method(method.key.as_str(), &params, &ret));
        }
        InterfaceMember::Getter(getter) => {
            let desc = resolver.resolve_or_object(getter.type_ann.as_ref(), env)?;
            out.push(abstract_method(&getter_name(getter.key.as_str(), &desc), &[], &desc));
        }
        InterfaceMember::Setter(setter) => {
            let desc = resolver.resolve_or_object(setter.param.type_ann.as_ref(), env)?;
            out.push(abstract_method(&setter_name(setter.key.as_str()), &[desc], "V"));
        }
        InterfaceMember::Index(index) => {
            let key = resolver.resolve_or_object(index.param.type_ann.as_ref(), env)?;
            let key = match key.as_str() {
                "D" => "I".to_string(),
                other => other.to_string(),
            };
            let value = resolver.resolve_or_object(index.type_ann.as_ref(), env)?;
            out.push(abstract_method("get", &[key.clone()], &value));
            if !index.readonly {
                out.push(abstract_method("set", &[key, value], "V"));
            }
        }
        InterfaceMember::Call(signature) => {
            let params = param_list(resolver, env, &signature.params)?;
            let ret = return_of(resolver, env, signature.return_type.as_ref())?;
            out.push(abstract_method(CALL_METHOD, &params, &ret));
        }
        InterfaceMember::Construct(signature) => {
            let params = param_list(resolver, env, &signature.params)?;
            let ret = return_of(resolver, env, signature.return_type.as_ref())?;
            out.push(abstract_method(CREATE_METHOD, &params, &ret));
        }
    }
    Ok(())
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

    fn descriptor(info: &JavaTypeInfo, name: &str) -> String {
        info.method(name).map(|m| m.descriptor.clone()).unwrap_or_default()
    }

    #[test]
    fn test_property_accessors() {
        let registry = collect(vec![interface("Named")
            .prop("name", t_string())
            .readonly_prop("id", t_int())
            .prop("active", t_boolean())
            .build()]);
        let info = registry.get("Named").unwrap();
        assert!(info.is_interface());
        assert_eq!(descriptor(info, "getName"), "()Ljava/lang/String;");
        assert_eq!(descriptor(info, "setName"), "(Ljava/lang/String;)V");
        assert_eq!(descriptor(info, "getId"), "()I");
        assert!(info.method("setId").is_none());
        assert_eq!(descriptor(info, "isActive"), "()Z");
        assert!(info.methods.iter().all(|m| m.is_abstract));
    }

    #[test]
    fn test_signatures() {
        let registry = collect(vec![interface("Table")
            .method("lookup", vec![("key", t_string())], t_number())
            .index("i", t_number(), t_string(), false)
            .call_signature(vec![("x", t_int())], t_int())
            .construct_signature(vec![], t_named("Table"))
            .getter("size", t_int())
            .setter("size", "value", t_int())
            .build()]);
        let info = registry.get("Table").unwrap();
        assert_eq!(descriptor(info, "lookup"), "(Ljava/lang/String;)D");
        assert_eq!(descriptor(info, "get"), "(I)Ljava/lang/String;");
        assert_eq!(descriptor(info, "set"), "(ILjava/lang/String;)V");
        assert_eq!(descriptor(info, CALL_METHOD), "(I)I");
        assert_eq!(descriptor(info, CREATE_METHOD), "()LTable;");
        assert_eq!(descriptor(info, "getSize"), "()I");
        assert_eq!(descriptor(info, "setSize"), "(I)V");
    }

    #[test]
    fn test_readonly_index_and_parents() {
        let registry = collect(vec![
            interface("Base").method("id", vec![], t_int()).build(),
            interface("Derived")
                .extends("Base")
                .index("k", t_string(), t_int(), true)
                .build(),
        ]);
        let derived = registry.get("Derived").unwrap();
        assert_eq!(derived.interfaces, vec!["Base".to_string()]);
        assert!(derived.method("set").is_none());
        assert_eq!(descriptor(derived, "get"), "(Ljava/lang/String;)I");
        let (owner, _) = registry.find_method("Derived", "id", 0).unwrap();
        assert_eq!(owner.qualified_name, "Base");
    }
}
