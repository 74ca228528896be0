//! Class declarations

use super::{ClassSink, MethodGen};
use crate::collect::{param_descriptors, signature_env};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, JavaTypeInfo, MethodInfo, TypeRegistry};
use crate::types::*;
use tsjvm_ast::{
    walk_expr, CallExpr, Callee, ClassDecl, ClassMember, ClassMethod, ClassProp, Constructor, Expr,
    MethodKind, Visitor,
};
use tsjvm_classfile::{access, ClassWriter, Opcode};

pub(super) fn compile_class<'a>(
    registry: &'a TypeRegistry,
    options: &'a ByteCodeCompilerOptions,
    sink: &mut ClassSink<'a>,
    namespace: &str,
    class: &'a ClassDecl,
) -> CompileResult<()> {
    let qualified = qualify(namespace, class.ident.as_str());
    let info = registry
        .get(&qualified)
        .ok_or_else(|| CompileError::internal(format!("class {} was not collected", qualified)))?;

    let mut flags = access::PUBLIC | access::SUPER;
    if class.is_abstract {
        flags |= access::ABSTRACT;
    }
    let mut writer = ClassWriter::new(
        options.class_version(),
        flags,
        &info.internal_name,
        &info.super_internal,
    );
    for iface in &info.interfaces {
        if let Some(iface) = registry.get(iface) {
            writer.add_interface(&iface.internal_name);
        }
    }

    let mut builder = ClassBuilder {
        registry,
        options,
        namespace,
        class,
        info,
        writer: &mut writer,
        sink: &mut *sink,
    };
    builder.fields();
    builder.constructor()?;
    for member in &class.body {
        if let ClassMember::Method(method) = member {
            builder
                .method(method)
                .map_err(|e| e.in_declaration(&format!("{}.{}", qualified, method.key)))?;
        }
    }
    builder.interface_accessors()?;
    builder.static_init()?;
    sink.finish(writer, &info.internal_name)
}

/// Emits the members of one class into its writer
struct ClassBuilder<'a, 'w> {
    registry: &'a TypeRegistry,
    options: &'a ByteCodeCompilerOptions,
    namespace: &'w str,
    class: &'a ClassDecl,
    info: &'a JavaTypeInfo,
    writer: &'w mut ClassWriter,
    sink: &'w mut ClassSink<'a>,
}

impl<'a> ClassBuilder<'a, '_> {
    fn context(&self, is_static: bool) -> CompilationContext<'a> {
        let resolver = TypeResolver::new(self.registry, &self.options.type_alias_map);
        CompilationContext::new(resolver, self.namespace, &self.info.internal_name, is_static)
            .with_class(Some(&self.info.qualified_name))
            .with_generics(self.info.type_params.iter().cloned())
    }

    fn method_gen(&mut self, ctx: CompilationContext<'a>) -> MethodGen<'a, '_> {
        MethodGen::new(ctx, self.writer, self.sink, self.options, self.registry)
    }

    fn props(&self) -> impl Iterator<Item = &'a ClassProp> {
        let class: &'a ClassDecl = self.class;
        class.body.iter().filter_map(|member| match member {
            ClassMember::Property(prop) => Some(prop),
            _ => None,
        })
    }

    fn fields(&mut self) {
        let props: Vec<&'a ClassProp> = self.props().collect();
        for prop in props {
            let Some(field) = self.info.field(prop.key.as_str()) else {
                tracing::debug!(
                    target: "tsjvm::codegen",
                    class = %self.info.qualified_name,
                    field = prop.key.as_str(),
                    "field without a resolved type skipped"
                );
                continue;
            };
            let mut flags = access::PUBLIC;
            if field.is_static {
                flags |= access::STATIC;
            }
            if field.readonly {
                flags |= access::FINAL;
            }
            self.writer.add_field(flags, &field.name, &field.descriptor);
        }
    }

    /// The declared constructor, or one forwarding to the superclass
    fn constructor(&mut self) -> CompileResult<()> {
        let explicit = self.class.body.iter().find_map(|member| match member {
            ClassMember::Constructor(ctor) => Some(ctor),
            _ => None,
        });
        let class = self.class;
        match explicit {
            Some(ctor) => self.explicit_constructor(ctor),
            None => {
                let descriptor = self
                    .info
                    .constructors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "()V".to_string());
                let params: Vec<(String, String)> =
                    tsjvm_classfile::descriptor::parse_method(&descriptor)
                        .map(|(params, _)| params)
                        .unwrap_or_default()
                        .into_iter()
                        .enumerate()
                        .map(|(i, desc)| (format!("$arg{}", i), desc.to_string()))
                        .collect();
                let args: Vec<Expr> = params
                    .iter()
                    .map(|(name, _)| tsjvm_ast::factory::ident(name))
                    .collect();
                let ctx = self.context(false);
                let mut gen = self.method_gen(ctx);
                gen.init_class = Some(class);
                gen.declare_params(&params, &[])?;
                gen.compile_super_constructor(&args)?;
                gen.finish(access::PUBLIC, "<init>", &descriptor)
            }
        }
    }

    fn explicit_constructor(&mut self, ctor: &'a Constructor) -> CompileResult<()> {
        let resolver = TypeResolver::new(self.registry, &self.options.type_alias_map);
        let env = signature_env(&resolver, self.namespace, Some(&self.info.qualified_name), &[])?;
        let params = param_descriptors(&resolver, &ctor.params, &env)?;
        let descs: Vec<String> = params.iter().map(|(_, d)| d.clone()).collect();
        let descriptor = method_descriptor(&descs, "V");

        let class = self.class;
        let ctx = self.context(false);
        let mut gen = self.method_gen(ctx);
        gen.init_class = Some(class);
        gen.declare_params(&params, &ctor.body.stmts)?;
        if !calls_super(ctor) {
            gen.compile_super_constructor(&[])?;
        }
        gen.compile_stmts(&ctor.body.stmts)?;
        gen.finish(access::PUBLIC, "<init>", &descriptor)
    }

    /// Registered signature of a method declaration
    fn registered(&self, method: &ClassMethod) -> Option<&'a MethodInfo> {
        let key = method.key.as_str();
        let arity = method.function.params.len();
        let names: Vec<String> = match method.kind {
            MethodKind::Method => vec![key.to_string()],
            MethodKind::Getter => vec![getter_name(key, OBJECT), getter_name(key, "Z")],
            MethodKind::Setter => vec![setter_name(key)],
        };
        self.info.methods.iter().find(|m| {
            names.contains(&m.name)
                && m.is_static == method.is_static
                && m.param_descriptors().len() == arity
        })
    }

    fn method(&mut self, method: &'a ClassMethod) -> CompileResult<()> {
        let info = self.registered(method).ok_or_else(|| CompileError::UnknownMethod {
            owner: self.info.qualified_name.clone(),
            name: method.key.name.clone(),
        })?;
        let Some(body) = method.function.body.as_ref().filter(|_| !method.is_abstract) else {
            self.writer.add_abstract_method(access::PUBLIC, &info.name, &info.descriptor);
            return Ok(());
        };

        let resolver = TypeResolver::new(self.registry, &self.options.type_alias_map);
        let env = signature_env(
            &resolver,
            self.namespace,
            Some(&self.info.qualified_name),
            &method.function.type_params,
        )?;
        let names = param_descriptors(&resolver, &method.function.params, &env)?;
        let params: Vec<(String, String)> = names
            .into_iter()
            .zip(info.param_descriptors())
            .map(|((name, _), desc)| (name, desc))
            .collect();

        let mut flags = access::PUBLIC;
        if method.is_static {
            flags |= access::STATIC;
        }
        let ctx = self
            .context(method.is_static)
            .with_return(&info.return_descriptor)
            .with_generics(env.generics);
        let mut gen = self.method_gen(ctx);
        gen.declare_params(&params, &body.stmts)?;
        gen.compile_stmts(&body.stmts)?;
        gen.finish(flags, &info.name, &info.descriptor)
    }

    /// Getters and setters required by implemented interfaces, backed by fields
    fn interface_accessors(&mut self) -> CompileResult<()> {
        let required: Vec<MethodInfo> = self
            .registry
            .all_interfaces(&self.info.qualified_name)
            .into_iter()
            .flat_map(|iface| iface.methods.iter().cloned())
            .collect();
        for method in required {
            if self.writer.has_method(&method.name, &method.descriptor) {
                continue;
            }
            // `isReady` may read a field `ready` or a field named `isReady` itself
            let mut candidates = accessor_property(&method.name)
                .into_iter()
                .chain(std::iter::once((method.name.clone(), false)));
            let found = candidates.find_map(|(prop, is_setter)| {
                let (owner, field) = self.registry.find_field(&self.info.qualified_name, &prop)?;
                Some((prop, is_setter, owner, field))
            });
            let Some((prop, is_setter, owner, field)) = found else {
                continue;
            };
            if field.is_static {
                continue;
            }
            let (owner, field) = (owner.internal_name.clone(), field.clone());
            let params = method.param_descriptors();
            let class_name = self.info.qualified_name.clone();
            let ctx = self.context(false).with_return(&method.return_descriptor);
            let mut gen = self.method_gen(ctx);
            match (is_setter, params.as_slice()) {
                (false, []) if getter_name(&prop, &field.descriptor) == method.name => {
                    gen.load(OBJECT, 0);
                    gen.get_field(&owner, &field.name, &field.descriptor);
                    gen.coerce(&field.descriptor, &method.return_descriptor)?;
                    gen.emit_return(&method.return_descriptor);
                }
                (true, [value]) => {
                    let slot = gen.ctx.locals.allocate_temp(value)?;
                    gen.load(OBJECT, 0);
                    gen.load(value, slot);
                    gen.coerce(value, &field.descriptor)?;
                    gen.put_field(&owner, &field.name, &field.descriptor);
                    gen.emit(Opcode::Return);
                }
                _ => continue,
            }
            gen.ctx.reachable = false;
            tracing::debug!(
                target: "tsjvm::codegen",
                class = %class_name,
                method = %method.name,
                "synthesized interface accessor"
            );
            gen.finish(access::PUBLIC, &method.name, &method.descriptor)?;
        }
        Ok(())
    }

    /// `<clinit>` for static field initializers
    fn static_init(&mut self) -> CompileResult<()> {
        let inits: Vec<&'a ClassProp> = self
            .props()
            .filter(|p| p.is_static && p.value.is_some())
            .collect();
        if inits.is_empty() {
            return Ok(());
        }
        let owner = self.info.internal_name.clone();
        let fields: Vec<_> = inits
            .iter()
            .filter_map(|prop| {
                let field = self.info.field(prop.key.as_str())?;
                Some((*prop, field.descriptor.clone()))
            })
            .collect();
        let ctx = self.context(true);
        let mut gen = self.method_gen(ctx);
        for (prop, desc) in fields {
            if let Some(value) = &prop.value {
                gen.compile_expr_as(value, &desc)?;
                gen.put_static(&owner, prop.key.as_str(), &desc);
            }
        }
        gen.finish(access::STATIC, "<clinit>", "()V")
    }
}

impl MethodGen<'_, '_> {
    /// Instance field initializers of the class whose constructor is being emitted
    pub(super) fn emit_field_inits(&mut self) -> CompileResult<()> {
        let Some(class) = self.init_class.take() else {
            return Ok(());
        };
        let registry = self.registry;
        let Some(info) = self.ctx.this_class().and_then(|c| registry.get(c)) else {
            return Ok(());
        };
        let owner = info.internal_name.clone();
        for member in &class.body {
            let ClassMember::Property(prop) = member else {
                continue;
            };
            let (Some(value), false) = (&prop.value, prop.is_static) else {
                continue;
            };
            let Some(field) = info.field(prop.key.as_str()) else {
                continue;
            };
            let desc = field.descriptor.clone();
            self.compile_this()?;
            self.compile_expr_as(value, &desc)?;
            self.put_field(&owner, prop.key.as_str(), &desc);
        }
        Ok(())
    }
}

/// Property behind an accessor name: `getName`/`isName` and `setName` give `name`
fn accessor_property(method: &str) -> Option<(String, bool)> {
    let (rest, is_setter) = if let Some(rest) = method.strip_prefix("set") {
        (rest, true)
    } else if let Some(rest) = method.strip_prefix("get") {
        (rest, false)
    } else {
        (method.strip_prefix("is")?, false)
    };
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some((first.to_lowercase().chain(chars).collect(), is_setter))
}

/// Whether a constructor body calls `super(...)` itself
fn calls_super(ctor: &Constructor) -> bool {
    #[derive(Default)]
    struct SuperCallFinder {
        found: bool,
    }

    impl Visitor for SuperCallFinder {
        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::Call(CallExpr {
                callee: Callee::Super(_),
                ..
            }) = expr
            {
                self.found = true;
            }
            walk_expr(self, expr);
        }
    }

    let mut finder = SuperCallFinder::default();
    finder.visit_block(&ctor.body);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsjvm_ast::factory::*;

    #[test]
    fn test_accessor_property() {
        assert_eq!(accessor_property("getName"), Some(("name".to_string(), false)));
        assert_eq!(accessor_property("isReady"), Some(("ready".to_string(), false)));
        assert_eq!(accessor_property("setName"), Some(("name".to_string(), true)));
        assert_eq!(accessor_property("get"), None);
        assert_eq!(accessor_property("settle"), None);
        assert_eq!(accessor_property("run"), None);
    }

    #[test]
    fn test_calls_super() {
        let ctor = |body| Constructor {
            params: vec![],
            body: tsjvm_ast::BlockStmt::new(body),
            span: Default::default(),
        };
        assert!(calls_super(&ctor(vec![expr_stmt(super_call(vec![int(1)]))])));
        assert!(!calls_super(&ctor(vec![expr_stmt(call_fn("setup", vec![]))])));
    }
}
