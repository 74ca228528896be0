//! AST visitor pattern for traversing the syntax tree
//!
//! Each `visit_*` method has a default implementation that calls the matching
//! `walk_*` function, so an implementation only overrides the nodes it cares
//! about and calls `walk_*` itself when it still wants the children visited.
//!
//! # Example
//!
//! ```rust
//! use tsjvm_ast::*;
//!
//! struct CountIdents {
//!     count: usize,
//! }
//!
//! impl Visitor for CountIdents {
//!     fn visit_ident_ref(&mut self, _id: &Ident) {
//!         self.count += 1;
//!     }
//! }
//! ```

use crate::*;

/// AST visitor trait
pub trait Visitor: Sized {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_block(&mut self, block: &BlockStmt) {
        walk_block(self, block);
    }

    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        walk_var_decl(self, decl);
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        walk_class_decl(self, decl);
    }

    fn visit_function(&mut self, function: &Function) {
        walk_function(self, function);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_arrow(&mut self, arrow: &ArrowExpr) {
        walk_arrow(self, arrow);
    }

    fn visit_assign(&mut self, assign: &AssignExpr) {
        walk_assign(self, assign);
    }

    fn visit_update(&mut self, update: &UpdateExpr) {
        walk_update(self, update);
    }

    /// Binding pattern (declaration target or parameter)
    fn visit_pat(&mut self, pat: &Pat) {
        walk_pat(self, pat);
    }

    /// Identifier used as a value
    fn visit_ident_ref(&mut self, _id: &Ident) {}

    /// Identifier introduced by a binding pattern
    fn visit_binding(&mut self, _id: &Ident) {}
}

pub fn walk_module<V: Visitor>(visitor: &mut V, module: &Module) {
    for stmt in &module.body {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_block<V: Visitor>(visitor: &mut V, block: &BlockStmt) {
    for stmt in &block.stmts {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Decl(decl) => visitor.visit_decl(decl),
        Stmt::Expr(s) => visitor.visit_expr(&s.expr),
        Stmt::Block(block) => visitor.visit_block(block),
        Stmt::Return(s) => {
            if let Some(arg) = &s.arg {
                visitor.visit_expr(arg);
            }
        }
        Stmt::If(s) => {
            visitor.visit_expr(&s.test);
            visitor.visit_stmt(&s.cons);
            if let Some(alt) = &s.alt {
                visitor.visit_stmt(alt);
            }
        }
        Stmt::While(s) => {
            visitor.visit_expr(&s.test);
            visitor.visit_stmt(&s.body);
        }
        Stmt::DoWhile(s) => {
            visitor.visit_stmt(&s.body);
            visitor.visit_expr(&s.test);
        }
        Stmt::For(s) => {
            match &s.init {
                Some(ForInit::VarDecl(decl)) => visitor.visit_var_decl(decl),
                Some(ForInit::Expr(expr)) => visitor.visit_expr(expr),
                None => {}
            }
            if let Some(test) = &s.test {
                visitor.visit_expr(test);
            }
            if let Some(update) = &s.update {
                visitor.visit_expr(update);
            }
            visitor.visit_stmt(&s.body);
        }
        Stmt::ForOf(s) => {
            walk_for_head(visitor, &s.left);
            visitor.visit_expr(&s.right);
            visitor.visit_stmt(&s.body);
        }
        Stmt::ForIn(s) => {
            walk_for_head(visitor, &s.left);
            visitor.visit_expr(&s.right);
            visitor.visit_stmt(&s.body);
        }
        Stmt::Labeled(s) => visitor.visit_stmt(&s.body),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
        Stmt::Throw(s) => visitor.visit_expr(&s.arg),
        Stmt::Try(s) => {
            visitor.visit_block(&s.block);
            if let Some(handler) = &s.handler {
                if let Some(param) = &handler.param {
                    visitor.visit_pat(param);
                }
                visitor.visit_block(&handler.body);
            }
            if let Some(finalizer) = &s.finalizer {
                visitor.visit_block(finalizer);
            }
        }
        Stmt::Switch(s) => {
            visitor.visit_expr(&s.discriminant);
            for case in &s.cases {
                if let Some(test) = &case.test {
                    visitor.visit_expr(test);
                }
                for stmt in &case.cons {
                    visitor.visit_stmt(stmt);
                }
            }
        }
    }
}

fn walk_for_head<V: Visitor>(visitor: &mut V, head: &ForHead) {
    match head {
        ForHead::VarDecl(decl) => visitor.visit_var_decl(decl),
        // `for (x of xs)` writes an existing binding: treat the name as a reference
        ForHead::Pat(Pat::Ident(b)) => visitor.visit_ident_ref(&b.id),
        ForHead::Pat(pat) => visitor.visit_pat(pat),
    }
}

pub fn walk_decl<V: Visitor>(visitor: &mut V, decl: &Decl) {
    match decl {
        Decl::Class(class) => visitor.visit_class_decl(class),
        Decl::Function(f) => visitor.visit_function(&f.function),
        Decl::Namespace(ns) => {
            for stmt in &ns.body {
                visitor.visit_stmt(stmt);
            }
        }
        Decl::Var(var) => visitor.visit_var_decl(var),
        Decl::Enum(e) => {
            for member in &e.members {
                if let Some(init) = &member.init {
                    visitor.visit_expr(init);
                }
            }
        }
        Decl::Interface(_) | Decl::TypeAlias(_) => {}
    }
}

pub fn walk_var_decl<V: Visitor>(visitor: &mut V, decl: &VarDecl) {
    for declarator in &decl.decls {
        visitor.visit_pat(&declarator.name);
        if let Some(init) = &declarator.init {
            visitor.visit_expr(init);
        }
    }
}

pub fn walk_class_decl<V: Visitor>(visitor: &mut V, decl: &ClassDecl) {
    for member in &decl.body {
        match member {
            ClassMember::Constructor(ctor) => {
                for param in &ctor.params {
                    visitor.visit_pat(&param.pat);
                }
                visitor.visit_block(&ctor.body);
            }
            ClassMember::Method(method) => visitor.visit_function(&method.function),
            ClassMember::Property(prop) => {
                if let Some(value) = &prop.value {
                    visitor.visit_expr(value);
                }
            }
        }
    }
}

pub fn walk_function<V: Visitor>(visitor: &mut V, function: &Function) {
    for param in &function.params {
        visitor.visit_pat(&param.pat);
    }
    if let Some(body) = &function.body {
        visitor.visit_block(body);
    }
}

pub fn walk_pat<V: Visitor>(visitor: &mut V, pat: &Pat) {
    match pat {
        Pat::Ident(b) => visitor.visit_binding(&b.id),
        Pat::Array(a) => {
            for elem in a.elems.iter().flatten() {
                visitor.visit_pat(elem);
            }
        }
        Pat::Object(o) => {
            for prop in &o.props {
                visitor.visit_binding(prop);
            }
        }
    }
}

pub fn walk_arrow<V: Visitor>(visitor: &mut V, arrow: &ArrowExpr) {
    for param in &arrow.params {
        visitor.visit_pat(param);
    }
    match &arrow.body {
        ArrowBody::Block(block) => visitor.visit_block(block),
        ArrowBody::Expr(expr) => visitor.visit_expr(expr),
    }
}

pub fn walk_assign<V: Visitor>(visitor: &mut V, assign: &AssignExpr) {
    visitor.visit_expr(&assign.left);
    visitor.visit_expr(&assign.right);
}

pub fn walk_update<V: Visitor>(visitor: &mut V, update: &UpdateExpr) {
    visitor.visit_expr(&update.arg);
}

pub fn walk_expr<V: Visitor>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Lit(_) | Expr::This(_) | Expr::Super(_) => {}
        Expr::Ident(id) => visitor.visit_ident_ref(id),
        Expr::Array(a) => {
            for elem in &a.elems {
                visitor.visit_expr(elem);
            }
        }
        Expr::Object(o) => {
            for prop in &o.props {
                visitor.visit_expr(&prop.value);
            }
        }
        Expr::Unary(u) => visitor.visit_expr(&u.arg),
        Expr::Update(u) => visitor.visit_update(u),
        Expr::Bin(b) => {
            visitor.visit_expr(&b.left);
            visitor.visit_expr(&b.right);
        }
        Expr::Assign(a) => visitor.visit_assign(a),
        Expr::Cond(c) => {
            visitor.visit_expr(&c.test);
            visitor.visit_expr(&c.cons);
            visitor.visit_expr(&c.alt);
        }
        Expr::Call(c) => {
            if let Callee::Expr(callee) = &c.callee {
                visitor.visit_expr(callee);
            }
            for arg in &c.args {
                visitor.visit_expr(arg);
            }
        }
        Expr::New(n) => {
            visitor.visit_expr(&n.callee);
            for arg in &n.args {
                visitor.visit_expr(arg);
            }
        }
        Expr::Member(m) => {
            visitor.visit_expr(&m.obj);
            if let MemberProp::Computed(prop) = &m.prop {
                visitor.visit_expr(prop);
            }
        }
        Expr::Arrow(arrow) => visitor.visit_arrow(arrow),
        Expr::Paren(p) => visitor.visit_expr(&p.expr),
        Expr::As(a) => visitor.visit_expr(&a.expr),
        Expr::Tpl(t) => {
            for expr in &t.exprs {
                visitor.visit_expr(expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::*;

    #[derive(Default)]
    struct Collect {
        refs: Vec<String>,
        bindings: Vec<String>,
        arrows: usize,
    }

    impl Visitor for Collect {
        fn visit_ident_ref(&mut self, id: &Ident) {
            self.refs.push(id.name.clone());
        }

        fn visit_binding(&mut self, id: &Ident) {
            self.bindings.push(id.name.clone());
        }

        fn visit_arrow(&mut self, arrow: &ArrowExpr) {
            self.arrows += 1;
            walk_arrow(self, arrow);
        }
    }

    #[test]
    fn test_walk_separates_references_from_bindings() {
        let body = vec![
            let_("a", None, int(1)),
            let_(
                "f",
                None,
                arrow(vec![("x", None)], add(ident("x"), ident("a"))),
            ),
            expr_stmt(assign(ident("a"), int(2))),
        ];
        let mut v = Collect::default();
        for stmt in &body {
            v.visit_stmt(stmt);
        }
        assert_eq!(v.bindings, vec!["a", "f", "x"]);
        assert_eq!(v.refs, vec!["x", "a", "a"]);
        assert_eq!(v.arrows, 1);
    }

    #[test]
    fn test_member_property_names_are_not_references() {
        let mut v = Collect::default();
        v.visit_expr(&member(ident("obj"), "field"));
        assert_eq!(v.refs, vec!["obj"]);
    }
}
