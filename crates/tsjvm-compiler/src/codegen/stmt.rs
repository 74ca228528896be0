//! Statements and variable declarations

use super::MethodGen;
use crate::error::{CompileError, CompileResult};
use crate::types::*;
use tsjvm_ast::factory;
use tsjvm_ast::{
    ArrowBody, ArrowExpr, BlockStmt, Decl, Expr, FnDecl, IfStmt, Pat, Stmt, VarDecl, VarKind,
};

impl MethodGen<'_, '_> {
    /// Statements in the current scope; code after an unconditional exit is skipped
    pub fn compile_stmts(&mut self, stmts: &[Stmt]) -> CompileResult<()> {
        for stmt in stmts {
            if !self.ctx.reachable {
                tracing::trace!(
                    target: "tsjvm::codegen",
                    kind = stmt_kind(stmt),
                    "skipped unreachable statement"
                );
                break;
            }
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn compile_block(&mut self, block: &BlockStmt) -> CompileResult<()> {
        self.ctx.enter_scope();
        let result = self.compile_stmts(&block.stmts);
        self.ctx.exit_scope();
        result
    }

    pub fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Decl(decl) if decl.is_ambient() => Ok(()),
            Stmt::Decl(Decl::Var(var)) => self.compile_var_decl(var),
            Stmt::Decl(Decl::Function(f)) => self.compile_local_function(f),
            Stmt::Decl(Decl::TypeAlias(_)) => Ok(()),
            Stmt::Decl(
                Decl::Class(_) | Decl::Interface(_) | Decl::Enum(_) | Decl::Namespace(_),
            ) => {
                Err(CompileError::unsupported("type declarations inside a function body"))
            }
            Stmt::Expr(e) => self.compile_discard(&e.expr),
            Stmt::Block(block) => self.compile_block(block),
            Stmt::Return(r) => self.compile_return(r.arg.as_ref()),
            Stmt::If(i) => self.compile_if(i),
            Stmt::While(w) => self.compile_while(w),
            Stmt::DoWhile(d) => self.compile_do_while(d),
            Stmt::For(f) => self.compile_for(f),
            Stmt::ForOf(f) => self.compile_for_of(f),
            Stmt::ForIn(f) => self.compile_for_in(f),
            Stmt::Labeled(l) => self.compile_labeled(l),
            Stmt::Break(b) => self.compile_break(b.label.as_ref().map(|l| l.as_str())),
            Stmt::Continue(c) => self.compile_continue(c.label.as_ref().map(|l| l.as_str())),
            Stmt::Throw(t) => self.compile_throw(&t.arg),
            Stmt::Try(t) => self.compile_try(t),
            Stmt::Switch(s) => self.compile_switch(s),
            Stmt::Empty(_) => Ok(()),
        }
    }

    fn compile_if(&mut self, stmt: &IfStmt) -> CompileResult<()> {
        let to_alt = self.branch_if(&stmt.test, false)?;
        self.compile_scoped(&stmt.cons)?;
        match &stmt.alt {
            Some(alt) => {
                let mut end = Vec::new();
                if self.ctx.reachable {
                    end.push(self.goto_forward());
                }
                self.patch_here(&to_alt)?;
                self.compile_scoped(alt)?;
                self.patch_here(&end)
            }
            None => self.patch_here(&to_alt),
        }
    }

    /// A nested statement gets its own scope even without braces
    pub fn compile_scoped(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.ctx.enter_scope();
        let result = self.compile_stmt(stmt);
        self.ctx.exit_scope();
        result
    }

    // ===== Declarations =====

    pub fn compile_var_decl(&mut self, var: &VarDecl) -> CompileResult<()> {
        if var.declare {
            return Ok(());
        }
        for declarator in &var.decls {
            match &declarator.name {
                Pat::Ident(binding) => {
                    let name = binding.id.as_str();
                    let resolver = self.ctx.resolver;
                    let desc = match (&binding.type_ann, &declarator.init) {
                        (Some(ty), _) => resolver.resolve(ty, &self.ctx)?,
                        (None, Some(init)) => self.infer_or_object(init),
                        (None, None) => OBJECT.to_string(),
                    };
                    let desc = if desc == "V" {
                        OBJECT.to_string()
                    } else {
                        desc
                    };
                    let generic = match &binding.type_ann {
                        Some(ty) => resolver.generic_info(ty, &self.ctx)?,
                        None => None,
                    };

                    if var.kind == VarKind::Var && self.redeclare_var(name, &desc) {
                        if let Some(init) = &declarator.init {
                            self.compile_expr_as(init, &desc)?;
                            self.store_to_variable(name, &desc)?;
                        }
                        continue;
                    }
                    match &declarator.init {
                        Some(init) => self.compile_expr_as(init, &desc)?,
                        None => self.push_default(&desc),
                    }
                    if var.kind == VarKind::Var {
                        self.store_hoisted(name, &desc)?;
                    } else {
                        self.store_new_local(name, &desc, var.kind != VarKind::Const)?;
                    }
                    if let Some(local) = self.ctx.locals.lookup_mut(name) {
                        local.generic = generic;
                    }
                }
                pattern => {
                    let init = declarator
                        .init
                        .as_ref()
                        .ok_or_else(|| {
                            CompileError::unsupported("destructuring without an initializer")
                        })?;
                    let desc = self.compile_expr(init)?;
                    self.destructure(pattern, &desc, var.kind != VarKind::Const)?;
                }
            }
        }
        Ok(())
    }

    /// `var x` over an existing `var x` of the same type reuses its binding
    fn redeclare_var(&mut self, name: &str, desc: &str) -> bool {
        match self.ctx.locals.lookup(name) {
            Some(existing) if existing.descriptor == desc && existing.mutable => {
                self.ctx.locals.is_declared_in_current_scope(name)
                    || self.ctx.locals.add_existing_variable_to_current_scope(name, desc)
            }
            _ => false,
        }
    }

    fn store_hoisted(&mut self, name: &str, desc: &str) -> CompileResult<()> {
        let boxed = self.ctx.is_holder(name);
        let slot = self.ctx.locals.declare_hoisted(name, desc, boxed)?.slot;
        if boxed {
            self.store_in_new_holder(desc, slot)
        } else {
            self.store(desc, slot);
            Ok(())
        }
    }

    /// Bind the names of a pattern from the value on the stack
    pub(super) fn destructure(
        &mut self,
        pattern: &Pat,
        desc: &str,
        mutable: bool,
    ) -> CompileResult<()> {
        match pattern {
            Pat::Ident(binding) => {
                let target = match &binding.type_ann {
                    Some(ty) => {
                        let resolver = self.ctx.resolver;
                        resolver.resolve(ty, &self.ctx)?
                    }
                    None => desc.to_string(),
                };
                self.coerce(desc, &target)?;
                self.store_new_local(binding.id.as_str(), &target, mutable)
            }
            Pat::Array(array) => {
                let source = self.store_source(desc)?;
                for (i, element) in array.elems.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    let read = factory::index(factory::ident(&source), factory::int(i as i64));
                    let elem_desc = self.compile_expr(&read)?;
                    self.destructure(element, &elem_desc, mutable)?;
                }
                Ok(())
            }
            Pat::Object(object) => {
                let source = self.store_source(desc)?;
                for prop in &object.props {
                    let read = factory::member(factory::ident(&source), prop.as_str());
                    let prop_desc = self.compile_expr(&read)?;
                    self.store_new_local(prop.as_str(), &prop_desc, mutable)?;
                }
                Ok(())
            }
        }
    }

    /// Keep a destructured value in a hidden local so member reads can refer to it
    fn store_source(&mut self, desc: &str) -> CompileResult<String> {
        let slot = self.ctx.locals.max_locals();
        let name = format!("$source{}", slot);
        let slot = self.ctx.locals.declare(&name, desc, false, false)?.slot;
        self.store(desc, slot);
        Ok(name)
    }

    /// A function declared inside a body becomes a local holding an arrow
    fn compile_local_function(&mut self, f: &FnDecl) -> CompileResult<()> {
        let body = f
            .function
            .body
            .clone()
            .ok_or_else(|| CompileError::unsupported("local function without a body"))?;
        let arrow = ArrowExpr {
            params: f.function.params.iter().map(|p| p.pat.clone()).collect(),
            body: ArrowBody::Block(body),
            return_type: f.function.return_type.clone(),
            span: f.span,
        };
        let desc = self.compile_arrow(&arrow)?;
        self.store_new_local(f.ident.as_str(), &desc, false)
    }

    // ===== Return =====

    /// `return` evaluates its value before any enclosing `finally` runs
    pub fn compile_return(&mut self, arg: Option<&Expr>) -> CompileResult<()> {
        let declared = self.ctx.return_descriptor.clone();
        let erased = self.return_as.clone();
        match arg {
            Some(value) if declared == "V" => self.compile_discard(value)?,
            Some(value) => self.compile_expr_as(value, &declared)?,
            None if declared != "V" => self.push_default(&declared),
            None => {}
        }
        if self.has_finalizers() {
            let snapshot = match declared.as_str() {
                "V" => None,
                _ => {
                    let temp = self.ctx.locals.allocate_temp(&declared)?;
                    self.store(&declared, temp);
                    Some(temp)
                }
            };
            self.inline_finalizers(0)?;
            if !self.ctx.reachable {
                return Ok(());
            }
            if let Some(temp) = snapshot {
                self.load(&declared, temp);
            }
        }
        self.coerce(&declared, &erased)?;
        self.emit_return(&erased);
        Ok(())
    }
}

fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Decl(_) => "declaration",
        Stmt::Expr(_) => "expression",
        Stmt::Block(_) => "block",
        Stmt::Return(_) => "return",
        Stmt::If(_) => "if",
        Stmt::While(_)
        | Stmt::DoWhile(_)
        | Stmt::For(_)
        | Stmt::ForOf(_)
        | Stmt::ForIn(_) => "loop",
        Stmt::Labeled(_) => "labeled",
        Stmt::Break(_) => "break",
        Stmt::Continue(_) => "continue",
        Stmt::Throw(_) => "throw",
        Stmt::Try(_) => "try",
        Stmt::Switch(_) => "switch",
        Stmt::Empty(_) => "empty",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stmt_kind() {
        assert_eq!(stmt_kind(&factory::break_()), "break");
        assert_eq!(stmt_kind(&factory::while_(factory::bool_(true), vec![])), "loop");
    }
}
