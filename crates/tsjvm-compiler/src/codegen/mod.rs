//! Class file generation (pass 2)
//!
//! Walks the module again with a fully populated [`TypeRegistry`] and emits
//! one class per class, interface and enum declaration, one container class
//! per namespace with executable content, and one class per arrow function.
//!
//! # Layout
//!
//! - `class`, `interface`, `enums`, `function`: one class per declaration
//! - `stmt`, `control`, `exception`: statements, loops, `try`/`finally`
//! - `expr`, `assign`, `cond`, `call`: expressions
//! - `lambda`: arrow functions as synthetic classes
//!
//! Every method body is emitted by a [`MethodGen`], which owns the
//! per-method [`CompilationContext`] and the code being built.

mod assign;
mod call;
mod class;
mod cond;
mod control;
mod enums;
mod exception;
mod expr;
mod function;
mod interface;
mod lambda;
mod stmt;

use crate::collect;
use crate::context::{CompilationContext, LabelId};
use crate::error::{CompileError, CompileResult};
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{qualify, TypeRegistry};
use crate::types::{class_name, ReturnTypeInfo, TypeEnv, OBJECT};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tsjvm_ast::{ClassDecl, Decl, Module};
use tsjvm_classfile::{
    code::array_type_code, verify_class, ClassFile, ClassWriter, CodeBuilder, LocalKind, Opcode,
};

/// Finished classes of one compilation, keyed by dotted name
pub(crate) struct ClassSink<'o> {
    options: &'o ByteCodeCompilerOptions,
    classes: BTreeMap<String, Vec<u8>>,
    /// Next lambda number per enclosing class
    lambdas: FxHashMap<String, usize>,
}

impl<'o> ClassSink<'o> {
    pub fn new(options: &'o ByteCodeCompilerOptions) -> Self {
        Self {
            options,
            classes: BTreeMap::new(),
            lambdas: FxHashMap::default(),
        }
    }

    /// Serialize a class; in debug mode it is parsed back and verified first
    pub fn finish(&mut self, mut writer: ClassWriter, internal_name: &str) -> CompileResult<()> {
        let bytes = writer.to_bytes()?;
        if self.options.debug {
            let parsed = ClassFile::parse(&bytes)
                .map_err(|e| {
                    CompileError::internal(format!("{} does not parse back: {}", internal_name, e))
                })?;
            verify_class(&parsed)
                .map_err(|e| {
                    CompileError::internal(format!("{} failed verification: {}", internal_name, e))
                })?;
        }
        let name = self.options.external_name(internal_name);
        tracing::debug!(
            target: "tsjvm::codegen",
            class = %name,
            bytes = bytes.len(),
            "emitted class"
        );
        self.classes.insert(name, bytes);
        Ok(())
    }

    pub fn next_lambda(&mut self, root: &str) -> usize {
        let counter = self.lambdas.entry(root.to_string()).or_insert(0);
        let id = *counter;
        *counter += 1;
        id
    }

    pub fn into_classes(self) -> BTreeMap<String, Vec<u8>> {
        self.classes
    }
}

/// Run pass 2 over a module whose declarations are already collected
pub fn generate(
    registry: &TypeRegistry,
    options: &ByteCodeCompilerOptions,
    module: &Module,
) -> CompileResult<BTreeMap<String, Vec<u8>>> {
    let mut sink = ClassSink::new(options);
    for (namespace, decl) in collect::declarations(&module.body, "") {
        let result = match decl {
            Decl::Class(c) => class::compile_class(registry, options, &mut sink, &namespace, c)
                .map_err(|e| e.in_declaration(&qualify(&namespace, c.ident.as_str()))),
            Decl::Interface(i) => {
                interface::compile_interface(registry, options, &mut sink, &namespace, i)
                    .map_err(|e| e.in_declaration(&qualify(&namespace, i.ident.as_str())))
            }
            Decl::Enum(e) => enums::compile_enum(registry, options, &mut sink, &namespace, e)
                .map_err(|err| err.in_declaration(&qualify(&namespace, e.ident.as_str()))),
            Decl::Namespace(_) | Decl::Function(_) | Decl::Var(_) | Decl::TypeAlias(_) => Ok(()),
        };
        result?;
    }
    for unit in collect::units(module) {
        function::compile_container(registry, options, &mut sink, &unit)?;
    }
    Ok(sink.into_classes())
}

/// Emits one method body
pub(crate) struct MethodGen<'a, 'w> {
    pub ctx: CompilationContext<'a>,
    pub code: CodeBuilder,
    writer: &'w mut ClassWriter,
    sink: &'w mut ClassSink<'a>,
    options: &'a ByteCodeCompilerOptions,
    registry: &'a TypeRegistry,
    /// Erased return descriptor of the emitted method
    return_as: String,
    /// Class whose instance field initializers run right after `super(...)`
    init_class: Option<&'a ClassDecl>,
}

impl<'a, 'w> MethodGen<'a, 'w> {
    pub fn new(
        ctx: CompilationContext<'a>,
        writer: &'w mut ClassWriter,
        sink: &'w mut ClassSink<'a>,
        options: &'a ByteCodeCompilerOptions,
        registry: &'a TypeRegistry,
    ) -> Self {
        let return_as = ctx.return_descriptor.clone();
        Self {
            ctx,
            code: CodeBuilder::new(),
            writer,
            sink,
            options,
            registry,
            return_as,
            init_class: None,
        }
    }

    /// Return descriptor of the method as declared on the JVM, when it
    /// differs from the source-level one
    pub fn with_return_as(mut self, descriptor: &str) -> Self {
        self.return_as = descriptor.to_string();
        self
    }

    /// Add the method to its class
    pub fn finish(mut self, access: u16, name: &str, descriptor: &str) -> CompileResult<()> {
        if self.ctx.reachable {
            let ret = self.return_as.clone();
            if ret != "V" {
                self.push_default(&ret);
            }
            self.emit_return(&ret);
        }
        let max_locals = self.ctx.locals.max_locals();
        let registry = self.registry;
        self.writer
            .add_method_code_with(access, name, descriptor, self.code, max_locals, registry)?;
        tracing::trace!(
            target: "tsjvm::codegen",
            owner = %self.ctx.owner,
            method = name,
            descriptor,
            "compiled method"
        );
        Ok(())
    }

    // ===== Type queries =====

    pub fn infer(&self, expr: &tsjvm_ast::Expr) -> Option<String> {
        let resolver = self.ctx.resolver;
        resolver.infer(expr, &self.ctx)
    }

    pub fn infer_or_object(&self, expr: &tsjvm_ast::Expr) -> String {
        self.infer(expr).unwrap_or_else(|| OBJECT.to_string())
    }

    /// Descriptor of `this` in the current method
    pub fn this_descriptor(&self) -> Option<String> {
        let class = self.ctx.this_class()?;
        self.registry.get(class).map(|info| format!("L{};", info.internal_name))
    }

    // ===== Emission helpers =====

    pub fn emit(&mut self, op: Opcode) {
        self.code.emit(op);
    }

    pub fn push_int(&mut self, value: i32) {
        self.code.push_int(self.writer.pool(), value);
    }

    pub fn push_long(&mut self, value: i64) {
        self.code.push_long(self.writer.pool(), value);
    }

    pub fn push_float(&mut self, value: f32) {
        self.code.push_float(self.writer.pool(), value);
    }

    pub fn push_double(&mut self, value: f64) {
        self.code.push_double(self.writer.pool(), value);
    }

    pub fn push_string(&mut self, value: &str) {
        self.code.push_string(self.writer.pool(), value);
    }

    /// Zero, false or null of a descriptor
    pub fn push_default(&mut self, desc: &str) {
        match LocalKind::from_descriptor(desc) {
            LocalKind::Int => self.emit(Opcode::Iconst0),
            LocalKind::Long => self.emit(Opcode::Lconst0),
            LocalKind::Float => self.emit(Opcode::Fconst0),
            LocalKind::Double => self.emit(Opcode::Dconst0),
            LocalKind::Reference => self.emit(Opcode::AconstNull),
        }
    }

    pub fn load(&mut self, desc: &str, slot: u16) {
        self.code.load(LocalKind::from_descriptor(desc), slot);
    }

    pub fn store(&mut self, desc: &str, slot: u16) {
        self.code.store(LocalKind::from_descriptor(desc), slot);
    }

    pub fn emit_return(&mut self, desc: &str) {
        let info = ReturnTypeInfo::of(desc);
        self.emit(info.kind.opcode());
        self.ctx.reachable = false;
    }

    /// `pop` or `pop2` for a value of this descriptor
    pub fn pop(&mut self, desc: &str) {
        match desc {
            "V" => {}
            "J" | "D" => self.emit(Opcode::Pop2),
            _ => self.emit(Opcode::Pop),
        }
    }

    pub fn dup(&mut self, desc: &str) {
        match desc {
            "V" => {}
            "J" | "D" => self.emit(Opcode::Dup2),
            _ => self.emit(Opcode::Dup),
        }
    }

    pub fn invoke_static(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().method_ref(owner, name, desc);
        self.code.invoke_static(index);
    }

    pub fn invoke_virtual(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().method_ref(owner, name, desc);
        self.code.invoke_virtual(index);
    }

    pub fn invoke_special(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().method_ref(owner, name, desc);
        self.code.invoke_special(index);
    }

    pub fn invoke_interface(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().interface_method_ref(owner, name, desc);
        let params = tsjvm_classfile::descriptor::parse_method(desc)
            .map(|(params, _)| params)
            .unwrap_or_default();
        let slots: u16 = params.iter().map(|p| LocalKind::from_descriptor(p).slots()).sum();
        self.code.invoke_interface(index, (1 + slots).min(u8::MAX as u16) as u8);
    }

    pub fn get_field(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().field_ref(owner, name, desc);
        self.code.get_field(index);
    }

    pub fn put_field(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().field_ref(owner, name, desc);
        self.code.put_field(index);
    }

    pub fn get_static(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().field_ref(owner, name, desc);
        self.code.get_static(index);
    }

    pub fn put_static(&mut self, owner: &str, name: &str, desc: &str) {
        let index = self.writer.pool().field_ref(owner, name, desc);
        self.code.put_static(index);
    }

    pub fn new_object(&mut self, class: &str) {
        let index = self.writer.pool().class(class);
        self.code.new_object(index);
    }

    /// `new C; dup; invokespecial C.<init>()V`
    pub fn new_default(&mut self, class: &str) {
        self.new_object(class);
        self.emit(Opcode::Dup);
        self.invoke_special(class, "<init>", "()V");
    }

    pub fn checkcast(&mut self, desc: &str) {
        let index = self.writer.pool().class(class_name(desc));
        self.code.checkcast(index);
    }

    /// Array of `length` (already on the stack) with this element type
    pub fn new_array(&mut self, element: &str) {
        match array_type_code(element) {
            Some(atype) => self.code.new_array(atype),
            None => {
                let index = self.writer.pool().class(class_name(element));
                self.code.new_ref_array(index);
            }
        }
    }

    pub fn array_load(&mut self, element: &str) {
        self.emit(match element {
            "Z" | "B" => Opcode::Baload,
            "C" => Opcode::Caload,
            "S" => Opcode::Saload,
            "I" => Opcode::Iaload,
            "J" => Opcode::Laload,
            "F" => Opcode::Faload,
            "D" => Opcode::Daload,
            _ => Opcode::Aaload,
        });
    }

    pub fn array_store(&mut self, element: &str) {
        self.emit(match element {
            "Z" | "B" => Opcode::Bastore,
            "C" => Opcode::Castore,
            "S" => Opcode::Sastore,
            "I" => Opcode::Iastore,
            "J" => Opcode::Lastore,
            "F" => Opcode::Fastore,
            "D" => Opcode::Dastore,
            _ => Opcode::Aastore,
        });
    }

    /// Store the value on the stack into a new one-element holder array
    pub fn store_in_new_holder(&mut self, desc: &str, slot: u16) -> CompileResult<()> {
        let temp = self.ctx.locals.allocate_temp(desc)?;
        self.store(desc, temp);
        self.emit(Opcode::Iconst1);
        self.new_array(desc);
        self.emit(Opcode::Dup);
        self.emit(Opcode::Iconst0);
        self.load(desc, temp);
        self.array_store(desc);
        self.code.store(LocalKind::Reference, slot);
        Ok(())
    }

    /// Declare a local and store the value on the stack into it
    pub fn store_new_local(&mut self, name: &str, desc: &str, mutable: bool) -> CompileResult<()> {
        let boxed = self.ctx.is_holder(name);
        let slot = self.ctx.locals.declare(name, desc, mutable, boxed)?.slot;
        if boxed {
            self.store_in_new_holder(desc, slot)
        } else {
            self.store(desc, slot);
            Ok(())
        }
    }

    /// Declare parameters in order; captured and reassigned ones move into holders
    pub fn declare_params(
        &mut self,
        params: &[(String, String)],
        body: &[tsjvm_ast::Stmt],
    ) -> CompileResult<()> {
        let names = params.iter().map(|(n, _)| n.as_str());
        self.ctx.holders = crate::capture::CaptureAnalyzer::holders_with_params(names, body);
        let mut copies = Vec::new();
        for (name, desc) in params {
            if self.ctx.is_holder(name) {
                let raw = self.ctx.locals.allocate_temp(desc)?;
                copies.push((name, desc, raw));
            } else {
                self.ctx.locals.declare(name, desc, true, false)?;
            }
        }
        for (name, desc, raw) in copies {
            self.load(desc, raw);
            self.store_new_local(name, desc, true)?;
        }
        Ok(())
    }

    // ===== Labels =====

    /// Branch to a label, patching now if it is already bound
    pub fn jump_to_label(&mut self, op: Opcode, label: LabelId) -> CompileResult<()> {
        let at = self.code.jump(op);
        if let Some(target) = self.ctx.add_patch(label, at)? {
            self.code.patch_jump(at, target)?;
        }
        if op == Opcode::Goto {
            self.ctx.reachable = false;
        }
        Ok(())
    }

    /// Bind a label at the current offset
    pub fn bind(&mut self, label: LabelId) -> CompileResult<()> {
        let offset = self.code.offset();
        let patches = self.ctx.bind_label(label, offset)?;
        for at in &patches {
            self.code.patch_jump(*at, offset)?;
        }
        if !patches.is_empty() {
            self.ctx.reachable = true;
        }
        Ok(())
    }

    /// Point pending forward branches at the current offset
    pub fn patch_here(&mut self, jumps: &[usize]) -> CompileResult<()> {
        let offset = self.code.offset();
        for at in jumps {
            self.code.patch_jump(*at, offset)?;
        }
        if !jumps.is_empty() {
            self.ctx.reachable = true;
        }
        Ok(())
    }

    /// Unconditional forward branch; returns the offset to patch
    pub fn goto_forward(&mut self) -> usize {
        let at = self.code.jump(Opcode::Goto);
        self.ctx.reachable = false;
        at
    }

    pub fn goto_back(&mut self, target: usize) -> CompileResult<()> {
        self.code.jump_to(Opcode::Goto, target)?;
        self.ctx.reachable = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeResolver;

    fn options() -> ByteCodeCompilerOptions {
        ByteCodeCompilerOptions::default().with_debug(true)
    }

    #[test]
    fn test_lambda_numbering_is_per_root() {
        let options = options();
        let mut sink = ClassSink::new(&options);
        assert_eq!(sink.next_lambda("Main"), 0);
        assert_eq!(sink.next_lambda("Main"), 1);
        assert_eq!(sink.next_lambda("Other"), 0);
    }

    #[test]
    fn test_implicit_return_is_added() {
        let options = options();
        let registry = TypeRegistry::new();
        let mut sink = ClassSink::new(&options);
        let mut writer = ClassWriter::new(
            options.class_version(),
            tsjvm_classfile::access::PUBLIC | tsjvm_classfile::access::SUPER,
            "Probe",
            "java/lang/Object",
        );
        let resolver = TypeResolver::new(&registry, &options.type_alias_map);
        let ctx = CompilationContext::new(resolver, "", "Probe", true).with_return("I");
        let gen = MethodGen::new(ctx, &mut writer, &mut sink, &options, &registry);
        gen.finish(tsjvm_classfile::access::PUBLIC | tsjvm_classfile::access::STATIC, "zero", "()I")
            .unwrap();
        sink.finish(writer, "Probe").unwrap();
        let classes = sink.into_classes();
        let parsed = ClassFile::parse(&classes["Probe"]).unwrap();
        let method = parsed.method("zero", "()I").unwrap();
        assert_eq!(
            method.code.as_ref().unwrap().code,
            vec![Opcode::Iconst0.to_u8(), Opcode::Ireturn.to_u8()]
        );
    }
}
