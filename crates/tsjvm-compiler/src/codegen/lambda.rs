//! Arrow functions as synthetic classes
//!
//! Each arrow becomes `Outer$Lambda$N`, a final class implementing the
//! functional interface picked for its signature. Captured locals are passed
//! to the constructor and kept in `captured$<name>` fields; a captured local
//! that lives in a holder is passed as the holder, so writes on either side
//! are shared. `this` is captured the same way when the body uses it.

use super::MethodGen;
use crate::capture::{arrow_captures, CaptureAnalyzer};
use crate::context::CompilationContext;
use crate::error::CompileResult;
use crate::types::infer::ArrowSignature;
use crate::types::*;
use tsjvm_ast::{ArrowBody, ArrowExpr, Pat};
use tsjvm_classfile::{access, ClassWriter, LocalKind, Opcode};

const CAPTURED_PREFIX: &str = "captured$";
const CAPTURED_THIS: &str = "captured$this";

/// A value copied into the closure
struct Capture {
    name: String,
    /// Declared type of the variable
    descriptor: String,
    /// Type of the field: the holder array for boxed variables
    field_descriptor: String,
    boxed: bool,
    mutable: bool,
    slot: u16,
}

impl MethodGen<'_, '_> {
    /// Emit the class for an arrow and leave a new instance on the stack
    ///
    /// Returns the descriptor of the functional interface it implements.
    pub fn compile_arrow(&mut self, arrow: &ArrowExpr) -> CompileResult<String> {
        let resolver = self.ctx.resolver;
        let signature = resolver.arrow_signature(arrow, &self.ctx)?;
        let fi = signature.interface;
        let id = self.sink.next_lambda(&self.ctx.lambda_root);
        let internal = format!("{}$Lambda${}", self.ctx.lambda_root, id);

        let found = arrow_captures(arrow);
        let captures: Vec<Capture> = found
            .names
            .iter()
            .filter_map(|name| self.ctx.locals.lookup(name))
            .map(|local| Capture {
                name: local.name.clone(),
                descriptor: local.descriptor.clone(),
                field_descriptor: if local.boxed {
                    local.holder_descriptor()
                } else {
                    local.descriptor.clone()
                },
                boxed: local.boxed,
                mutable: local.mutable,
                slot: local.slot,
            })
            .collect();
        let this_desc = match found.this {
            true => self.this_descriptor().filter(|_| self.ctx.this_slot.is_some()),
            false => None,
        };
        tracing::debug!(
            target: "tsjvm::codegen",
            lambda = %internal,
            interface = fi.internal_name,
            captures = captures.len(),
            this = this_desc.is_some(),
            "compiling arrow function"
        );

        let mut writer = ClassWriter::new(
            self.options.class_version(),
            access::PUBLIC | access::FINAL | access::SUPER | access::SYNTHETIC,
            &internal,
            OBJECT_CLASS,
        );
        writer.add_interface(fi.internal_name);
        let mut ctor_params: Vec<String> = Vec::new();
        for capture in &captures {
            writer.add_field(
                access::PRIVATE | access::FINAL | access::SYNTHETIC,
                &format!("{}{}", CAPTURED_PREFIX, capture.name),
                &capture.field_descriptor,
            );
            ctor_params.push(capture.field_descriptor.clone());
        }
        if let Some(this_desc) = &this_desc {
            writer.add_field(
                access::PRIVATE | access::FINAL | access::SYNTHETIC,
                CAPTURED_THIS,
                this_desc,
            );
            ctor_params.push(this_desc.clone());
        }
        let ctor_desc = method_descriptor(&ctor_params, "V");

        self.emit_lambda_constructor(
            &mut writer,
            &internal,
            &captures,
            this_desc.as_deref(),
            &ctor_desc,
        )?;
        self.emit_lambda_body(
            &mut writer,
            &internal,
            arrow,
            &signature,
            &captures,
            this_desc.as_deref(),
        )?;
        self.sink.finish(writer, &internal)?;

        // Creation site
        self.new_object(&internal);
        self.emit(Opcode::Dup);
        for capture in &captures {
            self.code.load(
                LocalKind::from_descriptor(&capture.field_descriptor),
                capture.slot,
            );
        }
        if this_desc.is_some() {
            self.compile_this()?;
        }
        self.invoke_special(&internal, "<init>", &ctor_desc);
        Ok(fi.type_descriptor())
    }

    fn emit_lambda_constructor(
        &mut self,
        writer: &mut ClassWriter,
        internal: &str,
        captures: &[Capture],
        this_desc: Option<&str>,
        descriptor: &str,
    ) -> CompileResult<()> {
        let ctx = CompilationContext::new(self.ctx.resolver, &self.ctx.namespace, internal, false);
        let mut gen = MethodGen::new(ctx, writer, &mut *self.sink, self.options, self.registry);
        gen.load(OBJECT, 0);
        gen.invoke_special(OBJECT_CLASS, "<init>", "()V");
        let fields = captures
            .iter()
            .map(|c| (format!("{}{}", CAPTURED_PREFIX, c.name), c.field_descriptor.clone()))
            .chain(this_desc.map(|desc| (CAPTURED_THIS.to_string(), desc.to_string())));
        for (name, desc) in fields {
            let slot = gen.ctx.locals.allocate_temp(&desc)?;
            gen.load(OBJECT, 0);
            gen.load(&desc, slot);
            gen.put_field(internal, &name, &desc);
        }
        gen.finish(access::PUBLIC, "<init>", descriptor)
    }

    fn emit_lambda_body(
        &mut self,
        writer: &mut ClassWriter,
        internal: &str,
        arrow: &ArrowExpr,
        signature: &ArrowSignature,
        captures: &[Capture],
        this_desc: Option<&str>,
    ) -> CompileResult<()> {
        let fi = signature.interface;
        let mut ctx =
            CompilationContext::new(self.ctx.resolver, &self.ctx.namespace, internal, false)
                .with_class(self.ctx.class_name.as_deref())
                .with_return(&signature.ret)
                .with_generics(self.ctx.generics.clone());
        ctx.lambda_root = self.ctx.lambda_root.clone();
        ctx.this_slot = None;
        ctx.holders = CaptureAnalyzer::holders_in_arrow(arrow);

        let mut gen = MethodGen::new(ctx, writer, &mut *self.sink, self.options, self.registry)
            .with_return_as(fi.return_descriptor());
        let erased = fi.params();
        let mut raw_slots = Vec::with_capacity(erased.len());
        for desc in &erased {
            raw_slots.push(gen.ctx.locals.allocate_temp(desc)?);
        }

        for capture in captures {
            gen.load(OBJECT, 0);
            gen.get_field(
                internal,
                &format!("{}{}", CAPTURED_PREFIX, capture.name),
                &capture.field_descriptor,
            );
            let slot = gen
                .ctx
                .locals
                .declare(&capture.name, &capture.descriptor, capture.mutable, capture.boxed)?
                .slot;
            gen.code
                .store(LocalKind::from_descriptor(&capture.field_descriptor), slot);
        }
        if let Some(this_desc) = this_desc {
            gen.load(OBJECT, 0);
            gen.get_field(internal, CAPTURED_THIS, this_desc);
            let slot = gen.ctx.locals.allocate_temp(this_desc)?;
            gen.store(this_desc, slot);
            gen.ctx.this_slot = Some(slot);
        }

        for ((pat, actual), (raw, erased)) in arrow
            .params
            .iter()
            .zip(&signature.params)
            .zip(raw_slots.iter().zip(&erased))
        {
            if let Pat::Ident(binding) = pat {
                gen.load(erased, *raw);
                gen.coerce(erased, actual)?;
                gen.store_new_local(binding.id.as_str(), actual, true)?;
            }
        }

        match &arrow.body {
            ArrowBody::Expr(body) => gen.compile_return(Some(body))?,
            ArrowBody::Block(block) => gen.compile_stmts(&block.stmts)?,
        }
        gen.finish(access::PUBLIC, fi.method, fi.descriptor)
    }
}
