//! Free functions and top-level variables
//!
//! Each namespace with executable content gets one container class named `$`.
//! When a declared type already uses that name a numeric suffix is tried
//! (`$1`, `$2`, ...).

use super::{internal_name, param_descriptors, signature_env, PendingReturn, Unit};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, FieldInfo, JavaTypeInfo, MethodInfo, TypeKind, TypeRegistry};
use crate::types::{method_descriptor, DeclEnv, TypeResolver, OBJECT};
use tsjvm_ast::{Decl, FnDecl, Pat, Stmt, VarKind};

/// Simple name of a namespace's function container
pub const CONTAINER_NAME: &str = "$";

pub(super) fn declare_container(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    namespace: &str,
) {
    if registry.container(namespace).is_some() {
        return;
    }
    let mut simple = CONTAINER_NAME.to_string();
    let mut suffix = 0;
    while registry.contains(&qualify(namespace, &simple)) {
        suffix += 1;
        simple = format!("{}{}", CONTAINER_NAME, suffix);
    }
    let qualified = qualify(namespace, &simple);
    registry.register_type(JavaTypeInfo::new(
        &simple,
        namespace,
        &internal_name(options, &qualified),
        TypeKind::Container,
    ));
    registry.set_container(namespace, &qualified);
    tracing::debug!(
        target: "tsjvm::collect",
        container = %qualified,
        "declared function container"
    );
}

pub(super) fn declare_members<'m>(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    units: &[Unit<'m>],
    pending: &mut Vec<PendingReturn<'m>>,
) {
    for unit in units {
        let Some(container) = registry
            .container(&unit.namespace)
            .map(|c| c.qualified_name.clone())
        else {
            continue;
        };
        declare_globals(registry, options, unit, &container);

        let mut methods = Vec::new();
        {
            let resolver = TypeResolver::new(registry, &options.type_alias_map);
            for function in &unit.functions {
                match function_signature(&resolver, &unit.namespace, function) {
                    Ok(Some(method)) => methods.push(method),
                    Ok(None) => {}
                    Err(reason) => tracing::debug!(
                        target: "tsjvm::collect",
                        owner = %container,
                        function = function.ident.as_str(),
                        %reason,
                        "skipped function signature"
                    ),
                }
            }
            for function in &unit.functions {
                if function.function.return_type.is_some() {
                    continue;
                }
                if let Ok(item) = pending_return(&resolver, &unit.namespace, &container, function) {
                    pending.push(item);
                }
            }
        }
        if let Some(info) = registry.get_mut(&container) {
            for method in methods {
                info.add_method(method);
            }
        }
    }
}

/// Annotated signatures register immediately; `None` leaves the return to inference
fn function_signature(
    resolver: &TypeResolver<'_>,
    namespace: &str,
    function: &FnDecl,
) -> Result<Option<MethodInfo>, String> {
    let Some(return_type) = &function.function.return_type else {
        return Ok(None);
    };
    let env = signature_env(resolver, namespace, None, &function.function.type_params)
        .map_err(|e| e.to_string())?;
    let params = param_descriptors(resolver, &function.function.params, &env)
        .map_err(|e| e.to_string())?;
    let ret = resolver.resolve(return_type, &env).map_err(|e| e.to_string())?;
    let params: Vec<String> = params.into_iter().map(|(_, d)| d).collect();
    Ok(Some(MethodInfo::new(
        function.ident.as_str(),
        &method_descriptor(&params, &ret),
        true,
        false,
    )))
}

fn pending_return<'m>(
    resolver: &TypeResolver<'_>,
    namespace: &str,
    container: &str,
    function: &'m FnDecl,
) -> Result<PendingReturn<'m>, String> {
    let body = function
        .function
        .body
        .as_ref()
        .ok_or_else(|| "function without a body".to_string())?;
    let env = signature_env(resolver, namespace, None, &function.function.type_params)
        .map_err(|e| e.to_string())?;
    let params = param_descriptors(resolver, &function.function.params, &env)
        .map_err(|e| e.to_string())?;
    Ok(PendingReturn {
        owner: container.to_string(),
        name: function.ident.name.clone(),
        params,
        body,
        env,
        is_static: true,
        getter_of: None,
    })
}

/// Top-level `var`/`let`/`const` become static fields of the container
fn declare_globals(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    unit: &Unit<'_>,
    container: &str,
) {
    for stmt in &unit.init {
        let Stmt::Decl(Decl::Var(var)) = stmt else {
            continue;
        };
        for declarator in &var.decls {
            let Pat::Ident(binding) = &declarator.name else {
                tracing::debug!(
                    target: "tsjvm::collect",
                    owner = %container,
                    "destructuring global skipped"
                );
                continue;
            };
            // Earlier globals are already registered, so initializers can refer to them
            let descriptor = {
                let resolver = TypeResolver::new(registry, &options.type_alias_map);
                let env = DeclEnv::new(&unit.namespace);
                match (&binding.type_ann, &declarator.init) {
                    (Some(ty), _) => match resolver.resolve(ty, &env) {
                        Ok(desc) => desc,
                        Err(err) => {
                            tracing::debug!(
                                target: "tsjvm::collect",
                                owner = %container,
                                global = %binding.id,
                                error = %err,
                                "global type skipped"
                            );
                            OBJECT.to_string()
                        }
                    },
                    (None, Some(init)) => resolver.infer_or_object(init, &env),
                    (None, None) => OBJECT.to_string(),
                }
            };
            if let Some(info) = registry.get_mut(container) {
                info.add_field(FieldInfo {
                    name: binding.id.name.clone(),
                    descriptor,
                    is_static: true,
                    readonly: var.kind == VarKind::Const,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::collect_module;
    use super::*;
    use tsjvm_ast::factory::*;

    fn collect(body: Vec<Stmt>) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        collect_module(&mut registry, &ByteCodeCompilerOptions::default(), &module(body)).unwrap();
        registry
    }

    #[test]
    fn test_container_name_probing() {
        let registry = collect(vec![
            class("$").build(),
            class("$1").build(),
            function("f", vec![], Some(t_void()), vec![]),
        ]);
        let container = registry.container("").unwrap();
        assert_eq!(container.qualified_name, "$2");
        assert_eq!(container.kind, TypeKind::Container);
        assert!(registry.lookup_type("$2", "").is_none());
    }

    #[test]
    fn test_annotated_functions_and_globals() {
        let registry = collect(vec![
            const_("limit", None, int(10)),
            let_("ratio", Some(t_number()), int(1)),
            let_("twice", None, mul(ident("limit"), int(2))),
            function(
                "scale",
                vec![param("x", Some(t_int())), param("y", None)],
                Some(t_number()),
                vec![ret(mul(ident("x"), ident("ratio")))],
            ),
        ]);
        let container = registry.container("").unwrap();
        assert_eq!(container.method("scale").unwrap().descriptor, "(ILjava/lang/Object;)D");
        assert!(container.method("scale").unwrap().is_static);
        let limit = container.field("limit").unwrap();
        assert_eq!(limit.descriptor, "I");
        assert!(limit.readonly && limit.is_static);
        assert_eq!(container.field("ratio").unwrap().descriptor, "D");
        assert!(!container.field("ratio").unwrap().readonly);
        assert_eq!(container.field("twice").unwrap().descriptor, "I");
    }

    #[test]
    fn test_namespaced_functions() {
        let registry = collect(vec![namespace(
            "math",
            vec![function(
                "sq",
                vec![param("x", Some(t_int()))],
                None,
                vec![ret(mul(ident("x"), ident("x")))],
            )],
        )]);
        let (container, method) = registry.lookup_function("sq", "math").unwrap();
        assert_eq!(container.internal_name, "math/$");
        assert_eq!(method.descriptor, "(I)I");
        assert!(registry.lookup_function("sq", "").is_none());
    }
}
