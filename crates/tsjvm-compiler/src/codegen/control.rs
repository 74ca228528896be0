//! Loops, labels, `break`/`continue` and `switch`
//!
//! Every loop registers a break label (after the loop) and a continue label
//! (the point that starts the next iteration) under its statement labels.
//! Jumps to labels that are not bound yet are recorded and patched when the
//! label is bound.

use super::MethodGen;
use crate::context::LabelKind;
use crate::error::{CompileError, CompileResult};
use crate::types::*;
use tsjvm_ast::factory;
use tsjvm_ast::{
    DoWhileStmt, ForHead, ForInStmt, ForInit, ForOfStmt, ForStmt, LabeledStmt, Pat, Stmt,
    SwitchStmt, VarKind, WhileStmt,
};
use tsjvm_classfile::Opcode;

impl MethodGen<'_, '_> {
    pub fn compile_while(&mut self, stmt: &WhileStmt) -> CompileResult<()> {
        let names = self.ctx.take_pending_labels();
        let (brk, cont) = (self.ctx.new_label(None), self.ctx.new_label(None));
        self.ctx.push_control(names, LabelKind::Loop, brk, Some(cont));

        let top = self.code.offset();
        self.bind(cont)?;
        let exit = self.branch_if(&stmt.test, false)?;
        let body = self.compile_scoped(&stmt.body);
        self.ctx.pop_control();
        body?;
        if self.ctx.reachable {
            self.goto_back(top)?;
        }
        self.patch_here(&exit)?;
        self.bind(brk)
    }

    pub fn compile_do_while(&mut self, stmt: &DoWhileStmt) -> CompileResult<()> {
        let names = self.ctx.take_pending_labels();
        let (brk, cont) = (self.ctx.new_label(None), self.ctx.new_label(None));
        self.ctx.push_control(names, LabelKind::Loop, brk, Some(cont));

        let top = self.code.offset();
        let body = self.compile_scoped(&stmt.body);
        self.ctx.pop_control();
        body?;
        self.bind(cont)?;
        if self.ctx.reachable {
            let again = self.branch_if(&stmt.test, true)?;
            for at in again {
                self.code.patch_jump(at, top)?;
            }
        }
        self.bind(brk)
    }

    pub fn compile_for(&mut self, stmt: &ForStmt) -> CompileResult<()> {
        self.ctx.enter_scope();
        let result = self.compile_for_inner(stmt);
        self.ctx.exit_scope();
        result
    }

    fn compile_for_inner(&mut self, stmt: &ForStmt) -> CompileResult<()> {
        let names = self.ctx.take_pending_labels();
        match &stmt.init {
            Some(ForInit::VarDecl(var)) => self.compile_var_decl(var)?,
            Some(ForInit::Expr(e)) => self.compile_discard(e)?,
            None => {}
        }
        let (brk, cont) = (self.ctx.new_label(None), self.ctx.new_label(None));
        self.ctx.push_control(names, LabelKind::Loop, brk, Some(cont));

        let top = self.code.offset();
        let exit = match &stmt.test {
            Some(test) => self.branch_if(test, false)?,
            None => Vec::new(),
        };
        let body = self.compile_scoped(&stmt.body);
        self.ctx.pop_control();
        body?;
        self.bind(cont)?;
        if self.ctx.reachable {
            if let Some(update) = &stmt.update {
                self.compile_discard(update)?;
            }
            self.goto_back(top)?;
        }
        self.patch_here(&exit)?;
        self.bind(brk)
    }

    /// `for (x of array)` and `for (c of string)`, by index
    pub fn compile_for_of(&mut self, stmt: &ForOfStmt) -> CompileResult<()> {
        self.ctx.enter_scope();
        let result = self.compile_for_of_inner(stmt);
        self.ctx.exit_scope();
        result
    }

    fn compile_for_of_inner(&mut self, stmt: &ForOfStmt) -> CompileResult<()> {
        let names = self.ctx.take_pending_labels();
        let source = self.compile_expr(&stmt.right)?;
        let element = match array_element(&source) {
            Some(element) => element.to_string(),
            None if source == STRING => STRING.to_string(),
            None => return Err(CompileError::unsupported(format!("for...of over {}", source))),
        };
        let items = self.ctx.locals.allocate_temp(&source)?;
        self.store(&source, items);
        let index = self.ctx.locals.allocate_temp("I")?;
        self.emit(Opcode::Iconst0);
        self.store("I", index);

        let (brk, cont) = (self.ctx.new_label(None), self.ctx.new_label(None));
        self.ctx.push_control(names, LabelKind::Loop, brk, Some(cont));
        let top = self.code.offset();
        self.load("I", index);
        self.load(&source, items);
        if source == STRING {
            self.invoke_virtual(STRING_CLASS, "length", "()I");
        } else {
            self.emit(Opcode::Arraylength);
        }
        let exit = self.code.jump(Opcode::IfIcmpge);

        self.ctx.enter_scope();
        let body = self
            .bind_for_of_head(&stmt.left, &source, &element, items, index)
            .and_then(|_| self.compile_stmt(&stmt.body));
        self.ctx.exit_scope();
        self.ctx.pop_control();
        body?;

        self.bind(cont)?;
        if self.ctx.reachable {
            self.code.iinc(index, 1);
            self.goto_back(top)?;
        }
        self.patch_here(&[exit])?;
        self.bind(brk)
    }

    /// Load the current element and bind it to the loop head
    fn bind_for_of_head(
        &mut self,
        head: &ForHead,
        source: &str,
        element: &str,
        items: u16,
        index: u16,
    ) -> CompileResult<()> {
        let load_element = |gen: &mut Self| {
            gen.load(source, items);
            gen.load("I", index);
            if source == STRING {
                gen.invoke_virtual(STRING_CLASS, "charAt", "(I)C");
                gen.invoke_static(STRING_CLASS, "valueOf", "(C)Ljava/lang/String;");
            } else {
                gen.array_load(element);
            }
        };
        match head {
            ForHead::VarDecl(var) => {
                let declarator = match var.decls.as_slice() {
                    [single] => single,
                    _ => return Err(CompileError::unsupported("for...of with several bindings")),
                };
                match &declarator.name {
                    Pat::Ident(binding) => {
                        let desc = match &binding.type_ann {
                            Some(ty) => {
                                let resolver = self.ctx.resolver;
                                resolver.resolve(ty, &self.ctx)?
                            }
                            None => element.to_string(),
                        };
                        load_element(self);
                        self.coerce(element, &desc)?;
                        self.store_new_local(binding.id.as_str(), &desc, var.kind != VarKind::Const)
                    }
                    pattern => {
                        load_element(self);
                        self.destructure(pattern, element, var.kind != VarKind::Const)
                    }
                }
            }
            ForHead::Pat(Pat::Ident(binding)) => {
                load_element(self);
                self.store_to_variable(binding.id.as_str(), element)
            }
            ForHead::Pat(_) => Err(CompileError::unsupported(
                "destructuring assignment in for...of",
            )),
        }
    }

    /// `for...in`: keys of a map, or indices of an array or string, as strings
    pub fn compile_for_in(&mut self, stmt: &ForInStmt) -> CompileResult<()> {
        self.ctx.enter_scope();
        let result = self.compile_for_in_inner(stmt);
        self.ctx.exit_scope();
        result
    }

    fn compile_for_in_inner(&mut self, stmt: &ForInStmt) -> CompileResult<()> {
        let names = self.ctx.take_pending_labels();
        let source = self.compile_expr(&stmt.right)?;
        if is_map(&source) {
            return self.compile_for_in_keys(stmt, names, &source);
        }
        if !is_array(&source) && source != STRING {
            return Err(CompileError::unsupported(format!("for...in over {}", source)));
        }
        let items = self.ctx.locals.allocate_temp(&source)?;
        self.store(&source, items);
        let index = self.ctx.locals.allocate_temp("I")?;
        self.emit(Opcode::Iconst0);
        self.store("I", index);

        let (brk, cont) = (self.ctx.new_label(None), self.ctx.new_label(None));
        self.ctx.push_control(names, LabelKind::Loop, brk, Some(cont));
        let top = self.code.offset();
        self.load("I", index);
        self.load(&source, items);
        if source == STRING {
            self.invoke_virtual(STRING_CLASS, "length", "()I");
        } else {
            self.emit(Opcode::Arraylength);
        }
        let exit = self.code.jump(Opcode::IfIcmpge);

        self.ctx.enter_scope();
        let body = self
            .bind_for_in_head(&stmt.left, move |gen: &mut Self| {
                gen.load("I", index);
                gen.invoke_static(STRING_CLASS, "valueOf", "(I)Ljava/lang/String;");
            })
            .and_then(|_| self.compile_stmt(&stmt.body));
        self.ctx.exit_scope();
        self.ctx.pop_control();
        body?;

        self.bind(cont)?;
        if self.ctx.reachable {
            self.code.iinc(index, 1);
            self.goto_back(top)?;
        }
        self.patch_here(&[exit])?;
        self.bind(brk)
    }

    /// Walk `keySet().iterator()` of the map on the stack
    fn compile_for_in_keys(
        &mut self,
        stmt: &ForInStmt,
        names: Vec<String>,
        source: &str,
    ) -> CompileResult<()> {
        if source == MAP_INTERFACE {
            self.invoke_interface(class_name(source), "keySet", "()Ljava/util/Set;");
        } else {
            self.invoke_virtual(class_name(source), "keySet", "()Ljava/util/Set;");
        }
        self.invoke_interface("java/util/Set", "iterator", "()Ljava/util/Iterator;");
        let iter = self.ctx.locals.allocate_temp(ITERATOR)?;
        self.store(ITERATOR, iter);

        let (brk, cont) = (self.ctx.new_label(None), self.ctx.new_label(None));
        self.ctx.push_control(names, LabelKind::Loop, brk, Some(cont));
        let top = self.code.offset();
        self.bind(cont)?;
        self.load(ITERATOR, iter);
        self.invoke_interface(ITERATOR_CLASS, "hasNext", "()Z");
        let exit = self.code.jump(Opcode::Ifeq);

        self.ctx.enter_scope();
        let body = self
            .bind_for_in_head(&stmt.left, move |gen: &mut Self| {
                gen.load(ITERATOR, iter);
                gen.invoke_interface(ITERATOR_CLASS, "next", "()Ljava/lang/Object;");
                gen.invoke_static(
                    STRING_CLASS,
                    "valueOf",
                    "(Ljava/lang/Object;)Ljava/lang/String;",
                );
            })
            .and_then(|_| self.compile_stmt(&stmt.body));
        self.ctx.exit_scope();
        self.ctx.pop_control();
        body?;

        if self.ctx.reachable {
            self.goto_back(top)?;
        }
        self.patch_here(&[exit])?;
        self.bind(brk)
    }

    /// Bind the loop head of a `for...in` to the key pushed by `load_key`
    fn bind_for_in_head(
        &mut self,
        head: &ForHead,
        load_key: impl Fn(&mut Self),
    ) -> CompileResult<()> {
        match head {
            ForHead::VarDecl(var) => {
                let declarator = match var.decls.as_slice() {
                    [single] => single,
                    _ => return Err(CompileError::unsupported("for...in with several bindings")),
                };
                let Pat::Ident(binding) = &declarator.name else {
                    return Err(CompileError::unsupported("destructuring in for...in"));
                };
                let desc = match &binding.type_ann {
                    Some(ty) => {
                        let resolver = self.ctx.resolver;
                        resolver.resolve(ty, &self.ctx)?
                    }
                    None => STRING.to_string(),
                };
                load_key(self);
                self.coerce(STRING, &desc)?;
                self.store_new_local(binding.id.as_str(), &desc, var.kind != VarKind::Const)
            }
            ForHead::Pat(Pat::Ident(binding)) => {
                load_key(self);
                self.store_to_variable(binding.id.as_str(), STRING)
            }
            ForHead::Pat(_) => Err(CompileError::unsupported(
                "destructuring assignment in for...in",
            )),
        }
    }

    // ===== Labels =====

    pub fn compile_labeled(&mut self, stmt: &LabeledStmt) -> CompileResult<()> {
        self.ctx.push_pending_label(stmt.label.as_str());
        if stmt.body.is_loop() || matches!(*stmt.body, Stmt::Labeled(_) | Stmt::Switch(_)) {
            return self.compile_stmt(&stmt.body);
        }
        let names = self.ctx.take_pending_labels();
        let brk = self.ctx.new_label(None);
        self.ctx.push_control(names, LabelKind::Block, brk, None);
        let body = self.compile_scoped(&stmt.body);
        self.ctx.pop_control();
        body?;
        self.bind(brk)
    }

    pub fn compile_break(&mut self, label: Option<&str>) -> CompileResult<()> {
        let target = self.ctx.resolve_break(label)?;
        self.inline_finalizers(target.try_depth)?;
        if self.ctx.reachable {
            self.jump_to_label(Opcode::Goto, target.label)?;
        }
        Ok(())
    }

    pub fn compile_continue(&mut self, label: Option<&str>) -> CompileResult<()> {
        let target = self.ctx.resolve_continue(label)?;
        self.inline_finalizers(target.try_depth)?;
        if self.ctx.reachable {
            self.jump_to_label(Opcode::Goto, target.label)?;
        }
        Ok(())
    }

    // ===== Switch =====

    /// `switch` as a chain of equality tests against the discriminant
    ///
    /// Case bodies follow each other in source order so fallthrough is the
    /// natural flow; `default` is taken when no test matches, wherever it is.
    pub fn compile_switch(&mut self, stmt: &SwitchStmt) -> CompileResult<()> {
        let names = self.ctx.take_pending_labels();
        self.ctx.enter_scope();
        let result = self.compile_switch_inner(stmt, names);
        self.ctx.exit_scope();
        result
    }

    fn compile_switch_inner(&mut self, stmt: &SwitchStmt, names: Vec<String>) -> CompileResult<()> {
        let desc = self.compile_expr(&stmt.discriminant)?;
        let discriminant = format!("$switch{}", self.ctx.locals.max_locals());
        let slot = self.ctx.locals.declare(&discriminant, &desc, false, false)?.slot;
        self.store(&desc, slot);

        let mut entries: Vec<Vec<usize>> = Vec::with_capacity(stmt.cases.len());
        for case in &stmt.cases {
            match &case.test {
                Some(test) => {
                    let matches = factory::eq(factory::ident(&discriminant), test.clone());
                    entries.push(self.branch_if(&matches, true)?);
                }
                None => entries.push(Vec::new()),
            }
        }
        let no_match = self.goto_forward();
        match stmt.cases.iter().position(|c| c.test.is_none()) {
            Some(default) => entries[default].push(no_match),
            None => entries.push(vec![no_match]),
        }

        let brk = self.ctx.new_label(None);
        self.ctx.push_control(names, LabelKind::Switch, brk, None);
        let mut result = Ok(());
        for (case, jumps) in stmt.cases.iter().zip(&entries) {
            // A case is entered by its own test or by falling out of the previous one
            result = self.patch_here(jumps);
            if result.is_err() {
                break;
            }
            result = self.compile_stmts(&case.cons);
            if result.is_err() {
                break;
            }
        }
        self.ctx.pop_control();
        result?;
        if let Some(after) = entries.get(stmt.cases.len()) {
            self.patch_here(after)?;
        }
        self.bind(brk)
    }
}
