//! Declaration collection (pass 1)
//!
//! Populates the [`TypeRegistry`] before any code is generated, so a
//! declaration can refer to another one regardless of source order.
//!
//! # Phases
//!
//! 1. **Types**: namespaces, classes, interfaces, enums, type aliases and the
//!    per-namespace function containers
//! 2. **Members**: superclasses, fields, constructors, annotated signatures
//! 3. **Returns**: unannotated return types, inferred from bodies until no
//!    further signature can be resolved
//!
//! Analysis failures on a single member are logged and skipped; only
//! registry conflicts (such as a malformed enum) are errors.

mod classes;
mod enums;
mod functions;
mod interfaces;

use crate::error::{Analysis, CompileError, CompileResult};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, MethodInfo, TypeRegistry};
use crate::types::{getter_name, method_descriptor, DeclEnv, ScopedEnv, TypeResolver};
use rustc_hash::FxHashSet;
use tsjvm_ast::{
    walk_expr, BlockStmt, Callee, Decl, Expr, FnDecl, Module, Param, Pat, Stmt, TypeParam, Visitor,
};

pub(crate) use classes::method_java_name;
pub use functions::CONTAINER_NAME;

/// Top-level executable content of one namespace
#[derive(Debug)]
pub(crate) struct Unit<'m> {
    pub namespace: String,
    pub functions: Vec<&'m FnDecl>,
    /// Variable declarations and statements run by the container's `<clinit>`
    pub init: Vec<&'m Stmt>,
}

impl Unit<'_> {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.init.is_empty()
    }
}

/// Declarations with their enclosing namespace, in source order
///
/// Ambient declarations are left out, together with everything nested in them.
pub(crate) fn declarations<'m>(stmts: &'m [Stmt], namespace: &str) -> Vec<(String, &'m Decl)> {
    let mut out = Vec::new();
    push_declarations(stmts, namespace, &mut out);
    out
}

fn push_declarations<'m>(stmts: &'m [Stmt], namespace: &str, out: &mut Vec<(String, &'m Decl)>) {
    for stmt in stmts {
        let Stmt::Decl(decl) = stmt else {
            continue;
        };
        if decl.is_ambient() {
            continue;
        }
        out.push((namespace.to_string(), decl));
        if let Decl::Namespace(ns) = decl {
            let inner = qualify(namespace, &ns.segments().collect::<Vec<_>>().join("."));
            push_declarations(&ns.body, &inner, out);
        }
    }
}

/// Executable content grouped per namespace; namespaces declared twice merge
pub(crate) fn units(module: &Module) -> Vec<Unit<'_>> {
    let mut units: Vec<Unit<'_>> = Vec::new();
    push_units(&module.body, "", &mut units);
    units.retain(|u| !u.is_empty());
    units
}

fn push_units<'m>(stmts: &'m [Stmt], namespace: &str, units: &mut Vec<Unit<'m>>) {
    let index = match units.iter().position(|u| u.namespace == namespace) {
        Some(index) => index,
        None => {
            units.push(Unit {
                namespace: namespace.to_string(),
                functions: Vec::new(),
                init: Vec::new(),
            });
            units.len() - 1
        }
    };
    for stmt in stmts {
        match stmt {
            Stmt::Decl(decl) if decl.is_ambient() => {}
            Stmt::Decl(Decl::Function(f)) => {
                if f.function.body.is_some() {
                    units[index].functions.push(f);
                }
            }
            Stmt::Decl(Decl::Namespace(ns)) => {
                let inner = qualify(namespace, &ns.segments().collect::<Vec<_>>().join("."));
                push_units(&ns.body, &inner, units);
            }
            Stmt::Decl(Decl::Var(_)) => units[index].init.push(stmt),
            Stmt::Decl(_) | Stmt::Empty(_) => {}
            _ => units[index].init.push(stmt),
        }
    }
}

/// Internal name of a declared type
pub(crate) fn internal_name(options: &ByteCodeCompilerOptions, qualified_name: &str) -> String {
    format!("{}{}", options.internal_prefix(), qualified_name.replace('.', "/"))
}

/// Name and descriptor of each parameter
pub(crate) fn param_descriptors(
    resolver: &TypeResolver<'_>,
    params: &[Param],
    env: &DeclEnv,
) -> CompileResult<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(params.len());
    for param in params {
        let Pat::Ident(binding) = &param.pat else {
            return Err(CompileError::unsupported("destructuring parameters"));
        };
        let desc = resolver.resolve_or_object(binding.type_ann.as_ref(), env)?;
        out.push((binding.id.name.clone(), desc));
    }
    Ok(out)
}

/// Signature environment of a function or method: the namespace, the class
/// `this` refers to, and the erased generics of both
pub(crate) fn signature_env(
    resolver: &TypeResolver<'_>,
    namespace: &str,
    class: Option<&str>,
    type_params: &[TypeParam],
) -> CompileResult<DeclEnv> {
    let mut env = DeclEnv::new(namespace);
    if let Some(qualified) = class {
        env.this_class = Some(qualified.to_string());
        if let Some(info) = resolver.registry.get(qualified) {
            env.generics.extend(info.type_params.iter().cloned());
        }
    }
    let erased = resolver.erase_type_params(type_params, &env)?;
    env.generics.extend(erased);
    Ok(env)
}

/// A method whose return type still has to be inferred from its body
struct PendingReturn<'m> {
    /// Qualified name of the class or container
    owner: String,
    name: String,
    params: Vec<(String, String)>,
    body: &'m BlockStmt,
    env: DeclEnv,
    is_static: bool,
    /// Property of a `get` accessor; its name depends on the return type
    getter_of: Option<String>,
}

/// Run pass 1 over a module
pub fn collect_module(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    module: &Module,
) -> CompileResult<()> {
    let decls = declarations(&module.body, "");
    let units = units(module);

    declare_types(registry, options, &decls, &units)?;
    tracing::debug!(target: "tsjvm::collect", types = registry.types().count(), "declared types");

    let mut pending = Vec::new();
    classes::declare_hierarchy(registry, options, &decls);
    interfaces::declare_members(registry, options, &decls);
    enums::declare_members(registry, &decls);
    classes::declare_members(registry, options, &decls, &mut pending);
    classes::declare_implicit_constructors(registry, &decls);
    functions::declare_members(registry, options, &units, &mut pending);

    infer_returns(registry, options, pending);
    Ok(())
}

/// Phase 1: names only
fn declare_types(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    decls: &[(String, &Decl)],
    units: &[Unit<'_>],
) -> CompileResult<()> {
    let mut first_error: Option<CompileError> = None;
    for (namespace, decl) in decls {
        match decl {
            Decl::Namespace(ns) => {
                let path = ns.segments().collect::<Vec<_>>().join(".");
                registry.register_namespace(&qualify(namespace, &path));
            }
            Decl::Class(class) => classes::declare_type(registry, options, namespace, class),
            Decl::Interface(iface) => interfaces::declare_type(registry, options, namespace, iface),
            Decl::Enum(e) => {
                if let Err(err) = enums::declare_type(registry, options, namespace, e) {
                    tracing::debug!(target: "tsjvm::collect", error = %err, "enum rejected");
                    first_error.get_or_insert(err);
                }
            }
            Decl::TypeAlias(alias) => {
                registry.register_alias(
                    &qualify(namespace, alias.ident.as_str()),
                    alias.type_ann.clone(),
                );
            }
            Decl::Function(_) | Decl::Var(_) => {}
        }
    }
    for unit in units {
        functions::declare_container(registry, options, &unit.namespace);
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Names a body calls, as free functions or methods
#[derive(Default)]
struct CallNames {
    names: FxHashSet<String>,
}

impl Visitor for CallNames {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Call(call) = expr {
            if let Callee::Expr(callee) = &call.callee {
                match callee.unparen() {
                    Expr::Ident(id) => {
                        self.names.insert(id.name.clone());
                    }
                    Expr::Member(m) => {
                        if let Some(name) = m.prop_name() {
                            self.names.insert(name.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        walk_expr(self, expr);
    }
}

fn called_names(body: &BlockStmt) -> FxHashSet<String> {
    let mut visitor = CallNames::default();
    visitor.visit_block(body);
    visitor.names
}

/// Phase 3: infer unannotated return types until nothing changes
///
/// A body waits while it calls another body that is still pending, so
/// `outer() { return inner() + 1 }` sees the type of `inner` first. When
/// every remaining body waits on another (recursion), one best-effort round
/// runs without waiting.
fn infer_returns(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    pending: Vec<PendingReturn<'_>>,
) {
    let mut pending: Vec<(PendingReturn<'_>, FxHashSet<String>)> = pending
        .into_iter()
        .map(|item| {
            let calls = called_names(item.body);
            (item, calls)
        })
        .collect();
    let mut strict = true;
    let mut round = 0;
    while !pending.is_empty() {
        round += 1;
        let waiting: FxHashSet<String> =
            pending.iter().map(|(item, _)| item.name.clone()).collect();
        let mut resolved = Vec::new();
        let mut remaining = Vec::new();
        {
            let resolver = TypeResolver::new(registry, &options.type_alias_map);
            for (item, calls) in pending {
                if strict && calls.iter().any(|c| *c != item.name && waiting.contains(c)) {
                    remaining.push((item, calls, "depends on a pending signature".to_string()));
                    continue;
                }
                let mut scoped = ScopedEnv::new(&item.env);
                for (name, desc) in &item.params {
                    scoped.bind(name, desc);
                }
                match resolver.infer_body_return(item.body, &scoped) {
                    Analysis::Resolved(ret) => resolved.push((item, ret)),
                    Analysis::Skipped { reason } => remaining.push((item, calls, reason)),
                }
            }
        }

        if resolved.is_empty() {
            if strict {
                strict = false;
                pending = remaining.into_iter().map(|(item, calls, _)| (item, calls)).collect();
                continue;
            }
            for (item, _, reason) in &remaining {
                tracing::debug!(
                    target: "tsjvm::collect",
                    owner = %item.owner,
                    method = %item.name,
                    %reason,
                    "skipped signature registration"
                );
            }
            return;
        }

        for (item, ret) in resolved {
            let params: Vec<String> = item.params.iter().map(|(_, d)| d.clone()).collect();
            let desc = method_descriptor(&params, &ret);
            let name = match &item.getter_of {
                Some(prop) => getter_name(prop, &ret),
                None => item.name.clone(),
            };
            tracing::debug!(
                target: "tsjvm::collect",
                owner = %item.owner,
                method = %name,
                %desc,
                round,
                "inferred return type"
            );
            if let Some(info) = registry.get_mut(&item.owner) {
                info.add_method(MethodInfo::new(&name, &desc, item.is_static, false));
            }
        }
        strict = true;
        pending = remaining.into_iter().map(|(item, calls, _)| (item, calls)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeKind;
    use tsjvm_ast::factory::*;

    fn collect(body: Vec<Stmt>) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        collect_module(&mut registry, &ByteCodeCompilerOptions::default(), &module(body)).unwrap();
        registry
    }

    #[test]
    fn test_units_group_namespaces() {
        let m = module(vec![
            function("a", vec![], None, vec![]),
            namespace("util", vec![const_("k", None, int(1))]),
            expr_stmt(call_fn("a", vec![])),
            namespace("util", vec![function("b", vec![], None, vec![])]),
            namespace("types", vec![interface("I").build()]),
        ]);
        let units = units(&m);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].namespace, "");
        assert_eq!(units[0].functions.len(), 1);
        assert_eq!(units[0].init.len(), 1);
        assert_eq!(units[1].namespace, "util");
        assert_eq!(units[1].functions.len(), 1);
        assert_eq!(units[1].init.len(), 1);
    }

    #[test]
    fn test_ambient_declarations_are_skipped() {
        let registry = collect(vec![
            declare(class("Native").build()),
            declare(function("external", vec![], Some(t_number()), vec![])),
            class("Local").build(),
        ]);
        assert!(!registry.contains("Native"));
        assert!(registry.contains("Local"));
        assert!(registry.container("").is_none());
    }

    #[test]
    fn test_forward_references_resolve() {
        let registry = collect(vec![
            function("make", vec![], None, vec![ret(new_("Later", vec![]))]),
            class("Later").build(),
        ]);
        let container = registry.container("").unwrap();
        assert_eq!(container.method("make").unwrap().descriptor, "()LLater;");
    }

    #[test]
    fn test_returns_inferred_across_calls() {
        let registry = collect(vec![
            function("outer", vec![], None, vec![ret(add(call_fn("inner", vec![]), int(1)))]),
            function("inner", vec![], None, vec![ret(int(41))]),
            function("nothing", vec![], None, vec![expr_stmt(call_fn("inner", vec![]))]),
        ]);
        let container = registry.container("").unwrap();
        assert_eq!(container.method("inner").unwrap().descriptor, "()I");
        assert_eq!(container.method("outer").unwrap().descriptor, "()I");
        assert_eq!(container.method("nothing").unwrap().descriptor, "()V");
    }

    #[test]
    fn test_uninferable_return_is_skipped() {
        let registry = collect(vec![function(
            "mystery",
            vec![],
            None,
            vec![ret(ident("nowhere"))],
        )]);
        let container = registry.container("").unwrap();
        assert!(container.method("mystery").is_none());
    }

    #[test]
    fn test_enum_errors_are_reported() {
        let mut registry = TypeRegistry::new();
        let err = collect_module(
            &mut registry,
            &ByteCodeCompilerOptions::default(),
            &module(vec![enum_("Empty", vec![]), class("Fine").build()]),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::EnumError { .. }));
        assert_eq!(registry.get("Fine").unwrap().kind, TypeKind::Class);
    }

    #[test]
    fn test_package_prefix_applies_to_internal_names() {
        let options = ByteCodeCompilerOptions::default().with_package_prefix("com.example");
        let mut registry = TypeRegistry::new();
        collect_module(
            &mut registry,
            &options,
            &module(vec![namespace("geo", vec![class("Point").build()])]),
        )
        .unwrap();
        assert_eq!(registry.get("geo.Point").unwrap().internal_name, "com/example/geo/Point");
    }
}
