//! Interface declarations: abstract methods only

use super::ClassSink;
use crate::error::{CompileError, CompileResult};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, TypeRegistry};
use crate::types::OBJECT_CLASS;
use tsjvm_ast::InterfaceDecl;
use tsjvm_classfile::{access, ClassWriter};

pub(super) fn compile_interface<'a>(
    registry: &'a TypeRegistry,
    options: &'a ByteCodeCompilerOptions,
    sink: &mut ClassSink<'a>,
    namespace: &str,
    iface: &InterfaceDecl,
) -> CompileResult<()> {
    let qualified = qualify(namespace, iface.ident.as_str());
    let info = registry
        .get(&qualified)
        .ok_or_else(|| {
            CompileError::internal(format!("interface {} was not collected", qualified))
        })?;
    let mut writer = ClassWriter::new(
        options.class_version(),
        access::PUBLIC | access::INTERFACE | access::ABSTRACT,
        &info.internal_name,
        OBJECT_CLASS,
    );
    for parent in &info.interfaces {
        if let Some(parent) = registry.get(parent) {
            writer.add_interface(&parent.internal_name);
        }
    }
    for method in &info.methods {
        if !writer.has_method(&method.name, &method.descriptor) {
            writer.add_abstract_method(access::PUBLIC, &method.name, &method.descriptor);
        }
    }
    sink.finish(writer, &info.internal_name)
}
