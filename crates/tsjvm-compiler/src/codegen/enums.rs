//! Enum declarations as JVM enums
//!
//! Members are constructed in `<clinit>` with ordinals in declaration order
//! and collected into `$VALUES`, which backs `values()`.

use super::{ClassSink, MethodGen};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, EnumRegistry, JavaTypeInfo, TypeRegistry};
use crate::types::*;
use tsjvm_ast::EnumDecl;
use tsjvm_classfile::{access, ClassWriter, Opcode};

const VALUES_FIELD: &str = "$VALUES";

pub(super) fn compile_enum<'a>(
    registry: &'a TypeRegistry,
    options: &'a ByteCodeCompilerOptions,
    sink: &mut ClassSink<'a>,
    namespace: &str,
    decl: &EnumDecl,
) -> CompileResult<()> {
    let qualified = qualify(namespace, decl.ident.as_str());
    let info = registry
        .get(&qualified)
        .ok_or_else(|| CompileError::internal(format!("enum {} was not collected", qualified)))?;
    let members: Vec<String> = registry
        .enums
        .members(&qualified)
        .ok_or_else(|| {
            CompileError::internal(format!("enum {} has no registered members", qualified))
        })?
        .iter()
        .map(|m| EnumRegistry::field_name(m))
        .collect();

    let internal = info.internal_name.as_str();
    let self_desc = object_of(internal);
    let values_desc = format!("[{}", self_desc);
    let mut writer = ClassWriter::new(
        options.class_version(),
        access::PUBLIC | access::FINAL | access::SUPER | access::ENUM,
        internal,
        ENUM_CLASS,
    );
    for member in &members {
        writer.add_field(
            access::PUBLIC | access::STATIC | access::FINAL | access::ENUM,
            member,
            &self_desc,
        );
    }
    writer.add_field(
        access::PRIVATE | access::STATIC | access::FINAL | access::SYNTHETIC,
        VALUES_FIELD,
        &values_desc,
    );

    let resolver = TypeResolver::new(registry, &options.type_alias_map);
    let context = |is_static: bool| {
        CompilationContext::new(resolver, namespace, internal, is_static)
            .with_class(Some(&info.qualified_name))
    };

    // private E(String name, int ordinal)
    {
        let mut gen = MethodGen::new(context(false), &mut writer, sink, options, registry);
        let name = gen.ctx.locals.allocate_temp(STRING)?;
        let ordinal = gen.ctx.locals.allocate_temp("I")?;
        gen.load(OBJECT, 0);
        gen.load(STRING, name);
        gen.load("I", ordinal);
        gen.invoke_special(ENUM_CLASS, "<init>", "(Ljava/lang/String;I)V");
        gen.finish(access::PRIVATE, "<init>", "(Ljava/lang/String;I)V")?;
    }

    // public static E[] values()
    {
        let ctx = context(true).with_return(&values_desc);
        let mut gen = MethodGen::new(ctx, &mut writer, sink, options, registry);
        gen.get_static(internal, VALUES_FIELD, &values_desc);
        gen.invoke_virtual(&values_desc, "clone", "()Ljava/lang/Object;");
        gen.checkcast(&values_desc);
        gen.emit_return(&values_desc);
        gen.ctx.reachable = false;
        gen.finish(access::PUBLIC | access::STATIC, "values", &format!("(){}", values_desc))?;
    }

    // public static E valueOf(String name)
    {
        let ctx = context(true).with_return(&self_desc);
        let mut gen = MethodGen::new(ctx, &mut writer, sink, options, registry);
        let name = gen.ctx.locals.allocate_temp(STRING)?;
        push_class(&mut gen, internal);
        gen.load(STRING, name);
        gen.invoke_static(
            ENUM_CLASS,
            "valueOf",
            "(Ljava/lang/Class;Ljava/lang/String;)Ljava/lang/Enum;",
        );
        gen.checkcast(&self_desc);
        gen.emit_return(&self_desc);
        gen.ctx.reachable = false;
        gen.finish(
            access::PUBLIC | access::STATIC,
            "valueOf",
            &format!("({}){}", STRING, self_desc),
        )?;
    }

    emit_static_init(
        MethodGen::new(context(true), &mut writer, sink, options, registry),
        info,
        &members,
    )?;
    tracing::debug!(target: "tsjvm::codegen", %qualified, members = members.len(), "compiled enum");
    sink.finish(writer, internal)
}

/// `ldc` of the class constant; the JVM resolves it to a `java.lang.Class`
fn push_class(gen: &mut MethodGen<'_, '_>, internal: &str) {
    let index = gen.writer.pool().class(internal);
    gen.code.ldc(index);
}

/// Construct every member with its ordinal, then fill `$VALUES`
fn emit_static_init(
    mut gen: MethodGen<'_, '_>,
    info: &JavaTypeInfo,
    members: &[String],
) -> CompileResult<()> {
    let internal = info.internal_name.as_str();
    let self_desc = object_of(internal);
    let values_desc = format!("[{}", self_desc);
    for (ordinal, member) in members.iter().enumerate() {
        gen.new_object(internal);
        gen.emit(Opcode::Dup);
        gen.push_string(member);
        gen.push_int(ordinal as i32);
        gen.invoke_special(internal, "<init>", "(Ljava/lang/String;I)V");
        gen.put_static(internal, member, &self_desc);
    }
    gen.push_int(members.len() as i32);
    gen.new_array(&self_desc);
    for (ordinal, member) in members.iter().enumerate() {
        gen.emit(Opcode::Dup);
        gen.push_int(ordinal as i32);
        gen.get_static(internal, member, &self_desc);
        gen.array_store(&self_desc);
    }
    gen.put_static(internal, VALUES_FIELD, &values_desc);
    gen.finish(access::STATIC, "<clinit>", "()V")
}
