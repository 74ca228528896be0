//! Calls and `new`

use super::MethodGen;
use crate::error::{CompileError, CompileResult};
use crate::types::members::static_path;
use crate::types::*;
use tsjvm_ast::{CallExpr, Callee, Expr, NewExpr};
use tsjvm_classfile::Opcode;

impl MethodGen<'_, '_> {
    pub fn compile_call(&mut self, call: &CallExpr) -> CompileResult<String> {
        let callee = match &call.callee {
            Callee::Super(_) => return self.compile_super_constructor(&call.args),
            Callee::Expr(callee) => callee,
        };
        let resolver = self.ctx.resolver;
        let Some(target) = resolver.resolve_call(call, &self.ctx) else {
            return Err(self.unknown_call(callee));
        };
        match &target {
            CallTarget::Static { owner, name, descriptor } => {
                self.compile_args(&call.args, descriptor)?;
                self.invoke_static(owner, name, descriptor);
            }
            CallTarget::Instance {
                owner,
                name,
                descriptor,
                interface,
                cast,
            } => {
                let receiver = receiver_of(callee)?;
                let actual = self.compile_expr(receiver)?;
                self.coerce(&actual, &object_of(owner))?;
                self.compile_args(&call.args, descriptor)?;
                if *interface {
                    self.invoke_interface(owner, name, descriptor);
                } else {
                    self.invoke_virtual(owner, name, descriptor);
                }
                if let Some(cast) = cast {
                    let ret = return_of(descriptor);
                    self.coerce(ret, cast)?;
                }
            }
            CallTarget::Super { owner, name, descriptor } => {
                self.compile_this()?;
                self.compile_args(&call.args, descriptor)?;
                self.invoke_special(owner, name, descriptor);
            }
            CallTarget::Functional(fi) => {
                let actual = self.compile_expr(callee)?;
                self.coerce(&actual, &fi.type_descriptor())?;
                self.compile_args(&call.args, fi.descriptor)?;
                self.invoke_interface(fi.internal_name, fi.method, fi.descriptor);
            }
            CallTarget::Library(LibraryCall::StringCharAt) => {
                let receiver = receiver_of(callee)?;
                self.compile_expr_as(receiver, STRING)?;
                match call.args.first() {
                    Some(index) => self.compile_expr_as(index, "I")?,
                    None => self.emit(Opcode::Iconst0),
                }
                self.invoke_virtual(STRING_CLASS, "charAt", "(I)C");
                self.invoke_static(STRING_CLASS, "valueOf", "(C)Ljava/lang/String;");
            }
            CallTarget::Library(LibraryCall::ValueToString) => {
                let receiver = receiver_of(callee)?;
                let desc = self.compile_expr(receiver)?;
                self.invoke_static(STRING_CLASS, "valueOf", value_of_descriptor(&desc));
            }
        }
        Ok(target.result_descriptor())
    }

    /// Push arguments converted to the callee's parameter types
    ///
    /// Missing arguments are passed as zero or null; extra ones are evaluated
    /// and dropped.
    pub fn compile_args(&mut self, args: &[Expr], descriptor: &str) -> CompileResult<()> {
        let params = tsjvm_classfile::descriptor::parse_method(descriptor)
            .map(|(params, _)| params)
            .ok_or_else(|| {
                CompileError::internal(format!("malformed method descriptor {}", descriptor))
            })?;
        for (i, param) in params.iter().enumerate() {
            match args.get(i) {
                Some(arg) => self.compile_expr_as(arg, param)?,
                None => self.push_default(param),
            }
        }
        for extra in args.iter().skip(params.len()) {
            self.compile_discard(extra)?;
        }
        Ok(())
    }

    fn unknown_call(&self, callee: &Expr) -> CompileError {
        match callee.unparen() {
            Expr::Ident(id) => {
                if self.infer(callee).is_some() {
                    CompileError::UnsupportedFunctionalSignature {
                        descriptor: self.infer_or_object(callee),
                    }
                } else {
                    CompileError::UndefinedVariable { name: id.name.clone() }
                }
            }
            Expr::Member(member) => {
                let owner = match self.infer(&member.obj) {
                    Some(desc) => class_name(&desc).to_string(),
                    None => static_path(&member.obj).unwrap_or_else(|| OBJECT_CLASS.to_string()),
                };
                CompileError::UnknownMethod {
                    owner,
                    name: member.prop_name().unwrap_or("[]").to_string(),
                }
            }
            other => CompileError::unsupported(format!("calling a {}", other.kind_name())),
        }
    }

    /// `super(args)` inside a constructor, followed by the field initializers
    pub(super) fn compile_super_constructor(&mut self, args: &[Expr]) -> CompileResult<String> {
        let class = self
            .ctx
            .this_class()
            .and_then(|c| self.registry.get(c))
            .ok_or_else(|| CompileError::unsupported("'super(...)' outside of a class"))?;
        let parent_internal = class.super_internal.clone();
        let parent_ctor = match class.super_class.as_deref().and_then(|p| self.registry.get(p)) {
            Some(parent) => pick_constructor(&parent.constructors, args.len()),
            None => library_constructor(&parent_internal, args.len()).to_string(),
        };
        self.compile_this()?;
        self.compile_args(args, &parent_ctor)?;
        self.invoke_special(&parent_internal, "<init>", &parent_ctor);
        self.emit_field_inits()?;
        Ok("V".to_string())
    }

    pub fn compile_new(&mut self, new: &NewExpr) -> CompileResult<String> {
        let path = static_path(&new.callee)
            .ok_or_else(|| CompileError::unsupported("'new' on a computed constructor"))?;
        let resolver = self.ctx.resolver;
        if let Some(info) = resolver.lookup_class(&path, &self.ctx) {
            if info.is_abstract || info.is_interface() {
                return Err(CompileError::unsupported(format!(
                    "instantiating abstract type {}",
                    info.qualified_name
                )));
            }
            let internal = info.internal_name.clone();
            let ctor = pick_constructor(&info.constructors, new.args.len());
            self.new_object(&internal);
            self.emit(Opcode::Dup);
            self.compile_args(&new.args, &ctor)?;
            self.invoke_special(&internal, "<init>", &ctor);
            return Ok(object_of(&internal));
        }
        if path == "Map" {
            for arg in &new.args {
                self.compile_discard(arg)?;
            }
            self.new_default(MAP_CLASS);
            return Ok(LINKED_HASH_MAP.to_string());
        }
        let Some(internal) = resolver.alias_class(&path) else {
            return Err(CompileError::UnknownType { name: path });
        };
        if !self.registry.is_throwable(&internal)
            && internal != OBJECT_CLASS
            && internal != BUILDER_CLASS
        {
            return Err(CompileError::unsupported(format!("'new {}'", path)));
        }
        let ctor = library_constructor(&internal, new.args.len());
        self.new_object(&internal);
        self.emit(Opcode::Dup);
        if ctor != "()V" {
            // Error messages are converted the way `String(x)` would
            let arg = &new.args[0];
            let desc = self.compile_expr(arg)?;
            if desc != STRING {
                self.invoke_static(STRING_CLASS, "valueOf", value_of_descriptor(&desc));
            }
        }
        for extra in new.args.iter().skip(if ctor == "()V" { 0 } else { 1 }) {
            self.compile_discard(extra)?;
        }
        self.invoke_special(&internal, "<init>", ctor);
        Ok(object_of(&internal))
    }
}

/// Receiver expression of a method call
fn receiver_of(callee: &Expr) -> CompileResult<&Expr> {
    match callee.unparen() {
        Expr::Member(member) => Ok(&member.obj),
        other => Err(CompileError::internal(format!(
            "instance call on a {} callee",
            other.kind_name()
        ))),
    }
}

fn return_of(descriptor: &str) -> &str {
    descriptor.rsplit_once(')').map(|(_, ret)| ret).unwrap_or("V")
}

/// Constructor with a matching parameter count, else the first declared one
fn pick_constructor(constructors: &[String], arity: usize) -> String {
    constructors
        .iter()
        .find(|ctor| {
            tsjvm_classfile::descriptor::parse_method(ctor)
                .is_some_and(|(params, _)| params.len() == arity)
        })
        .or_else(|| constructors.first())
        .cloned()
        .unwrap_or_else(|| "()V".to_string())
}

/// Constructor of a platform class: no arguments, or a message for throwables
fn library_constructor(internal: &str, arity: usize) -> &'static str {
    if arity == 0 || internal == OBJECT_CLASS || internal == BUILDER_CLASS {
        "()V"
    } else {
        "(Ljava/lang/String;)V"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_constructor() {
        let ctors = vec!["(I)V".to_string(), "(ILjava/lang/String;)V".to_string()];
        assert_eq!(pick_constructor(&ctors, 2), "(ILjava/lang/String;)V");
        assert_eq!(pick_constructor(&ctors, 1), "(I)V");
        assert_eq!(pick_constructor(&ctors, 5), "(I)V");
        assert_eq!(pick_constructor(&[], 0), "()V");
    }

    #[test]
    fn test_library_constructor() {
        assert_eq!(library_constructor("tsjvm/runtime/JsError", 1), "(Ljava/lang/String;)V");
        assert_eq!(library_constructor("tsjvm/runtime/JsError", 0), "()V");
        assert_eq!(library_constructor(OBJECT_CLASS, 1), "()V");
    }
}
