//! Namespace containers: free functions, globals and top-level statements
//!
//! Functions become public static methods. Top-level variables are static
//! fields initialized in `<clinit>` together with the remaining statements,
//! in source order.

use super::{ClassSink, MethodGen};
use crate::collect::{param_descriptors, signature_env, Unit};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, JavaTypeInfo, TypeRegistry};
use crate::types::*;
use tsjvm_ast::{Decl, FnDecl, Pat, Stmt, VarDecl};
use tsjvm_classfile::{access, ClassWriter};

pub(super) fn compile_container<'a>(
    registry: &'a TypeRegistry,
    options: &'a ByteCodeCompilerOptions,
    sink: &mut ClassSink<'a>,
    unit: &Unit<'_>,
) -> CompileResult<()> {
    let info = registry
        .container(&unit.namespace)
        .ok_or_else(|| {
            CompileError::internal(format!("namespace '{}' has no container", unit.namespace))
        })?;
    let internal = info.internal_name.as_str();
    let mut writer = ClassWriter::new(
        options.class_version(),
        access::PUBLIC | access::FINAL | access::SUPER,
        internal,
        OBJECT_CLASS,
    );
    for field in info.fields.iter().filter(|f| f.is_static) {
        let mut flags = access::PUBLIC | access::STATIC;
        if field.readonly {
            flags |= access::FINAL;
        }
        writer.add_field(flags, &field.name, &field.descriptor);
    }

    let resolver = TypeResolver::new(registry, &options.type_alias_map);
    let context = |is_static: bool| {
        CompilationContext::new(resolver, &unit.namespace, internal, is_static)
    };

    // Not instantiable
    {
        let mut gen = MethodGen::new(context(false), &mut writer, sink, options, registry);
        gen.load(OBJECT, 0);
        gen.invoke_special(OBJECT_CLASS, "<init>", "()V");
        gen.finish(access::PRIVATE, "<init>", "()V")?;
    }

    for function in &unit.functions {
        let gen = MethodGen::new(context(true), &mut writer, sink, options, registry);
        compile_function(gen, info, &unit.namespace, function)
            .map_err(|e| e.in_declaration(&qualify(&unit.namespace, function.ident.as_str())))?;
    }

    if !unit.init.is_empty() {
        let gen = MethodGen::new(context(true), &mut writer, sink, options, registry);
        compile_static_init(gen, info, &unit.init)?;
    }
    tracing::debug!(
        target: "tsjvm::codegen",
        container = %info.qualified_name,
        functions = unit.functions.len(),
        statements = unit.init.len(),
        "compiled container"
    );
    sink.finish(writer, internal)
}

fn compile_function(
    mut gen: MethodGen<'_, '_>,
    container: &JavaTypeInfo,
    namespace: &str,
    function: &FnDecl,
) -> CompileResult<()> {
    let name = function.ident.as_str();
    let method = container
        .method_with(name, function.function.params.len())
        .or_else(|| container.method(name))
        .ok_or_else(|| CompileError::UnknownMethod {
            owner: container.qualified_name.clone(),
            name: name.to_string(),
        })?
        .clone();
    let body = function
        .function
        .body
        .as_ref()
        .ok_or_else(|| CompileError::internal(format!("function '{}' has no body", name)))?;

    let resolver = gen.ctx.resolver;
    let env = signature_env(&resolver, namespace, None, &function.function.type_params)?;
    let params: Vec<(String, String)> =
        param_descriptors(&resolver, &function.function.params, &env)?
            .into_iter()
            .zip(method.param_descriptors())
            .map(|((name, _), desc)| (name, desc))
            .collect();

    gen.ctx.return_descriptor = method.return_descriptor.clone();
    gen.ctx.generics.extend(env.generics);
    let mut gen = gen.with_return_as(&method.return_descriptor);
    gen.declare_params(&params, &body.stmts)?;
    gen.compile_stmts(&body.stmts)?;
    gen.finish(access::PUBLIC | access::STATIC, &method.name, &method.descriptor)
}

fn compile_static_init(
    mut gen: MethodGen<'_, '_>,
    container: &JavaTypeInfo,
    init: &[&Stmt],
) -> CompileResult<()> {
    for stmt in init {
        if !gen.ctx.reachable {
            break;
        }
        match stmt {
            Stmt::Decl(Decl::Var(var)) if !var.declare => gen.init_globals(container, var)?,
            _ => gen.compile_stmt(stmt)?,
        }
    }
    gen.finish(access::STATIC, "<clinit>", "()V")
}

impl MethodGen<'_, '_> {
    /// Assign a top-level declaration to the container's static fields
    ///
    /// Declarators that did not become fields (destructuring patterns) are
    /// bound as locals of `<clinit>`.
    fn init_globals(&mut self, container: &JavaTypeInfo, var: &VarDecl) -> CompileResult<()> {
        for declarator in &var.decls {
            let field = match &declarator.name {
                Pat::Ident(binding) => container.field(binding.id.as_str()),
                _ => None,
            };
            let Some(field) = field else {
                let single = VarDecl {
                    decls: vec![declarator.clone()],
                    ..var.clone()
                };
                self.compile_var_decl(&single)?;
                continue;
            };
            match &declarator.init {
                Some(value) => self.compile_expr_as(value, &field.descriptor)?,
                None => self.push_default(&field.descriptor),
            }
            self.put_static(&container.internal_name, &field.name, &field.descriptor);
        }
        Ok(())
    }
}
