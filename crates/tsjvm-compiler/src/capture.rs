//! Closure capture analysis
//!
//! A local needs a holder when it is declared in the function, referenced
//! from inside an arrow, and reassigned anywhere. Captures that are never
//! reassigned are copied into the closure by value.

use rustc_hash::FxHashSet;
use tsjvm_ast::{
    walk_arrow, walk_assign, walk_expr, walk_stmt, walk_update, ArrowBody, ArrowExpr, AssignExpr,
    Expr, ForHead, Ident, Pat, Stmt, UpdateExpr, VarDecl, VarKind, Visitor,
};

#[derive(Debug, Default)]
pub struct CaptureAnalyzer {
    /// Bound at function level, outside every arrow
    declared: FxHashSet<String>,
    /// Referenced inside an arrow without being bound there
    captured: FxHashSet<String>,
    /// Assigned, updated or used as a `for-of` target
    mutated: FxHashSet<String>,
    /// Names bound by each open arrow, innermost last
    arrow_scopes: Vec<FxHashSet<String>>,
    /// Inside the pattern of a `const` declaration
    binding_const: bool,
}

impl CaptureAnalyzer {
    /// Names in `body` that need a holder
    pub fn holders(body: &[Stmt]) -> FxHashSet<String> {
        let mut analyzer = CaptureAnalyzer::default();
        for stmt in body {
            analyzer.visit_stmt(stmt);
        }
        analyzer.result()
    }

    /// Holders for an arrow that is itself being compiled as a method
    pub fn holders_in_arrow(arrow: &ArrowExpr) -> FxHashSet<String> {
        let mut analyzer = CaptureAnalyzer::default();
        for param in &arrow.params {
            analyzer.declared.extend(param.bound_names().into_iter().map(str::to_string));
        }
        match &arrow.body {
            ArrowBody::Block(block) => {
                for stmt in &block.stmts {
                    analyzer.visit_stmt(stmt);
                }
            }
            ArrowBody::Expr(expr) => analyzer.visit_expr(expr),
        }
        analyzer.result()
    }

    /// [`CaptureAnalyzer::holders`] for a function body, parameters included
    pub fn holders_with_params<'p>(
        params: impl IntoIterator<Item = &'p str>,
        body: &[Stmt],
    ) -> FxHashSet<String> {
        let mut analyzer = CaptureAnalyzer::default();
        analyzer.declared.extend(params.into_iter().map(str::to_string));
        for stmt in body {
            analyzer.visit_stmt(stmt);
        }
        analyzer.result()
    }

    fn result(self) -> FxHashSet<String> {
        self.declared
            .into_iter()
            .filter(|name| self.captured.contains(name) && self.mutated.contains(name))
            .collect()
    }

    fn mark_target(&mut self, target: &Expr) {
        if let Expr::Ident(id) = target.unparen() {
            self.mutated.insert(id.name.clone());
        }
    }
}

impl Visitor for CaptureAnalyzer {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::ForOf(s) = stmt {
            if let ForHead::Pat(Pat::Ident(b)) = &s.left {
                self.mutated.insert(b.id.name.clone());
            }
        }
        if let Stmt::ForIn(s) = stmt {
            if let ForHead::Pat(Pat::Ident(b)) = &s.left {
                self.mutated.insert(b.id.name.clone());
            }
        }
        walk_stmt(self, stmt);
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        for declarator in &decl.decls {
            self.binding_const = decl.kind == VarKind::Const;
            self.visit_pat(&declarator.name);
            self.binding_const = false;
            if let Some(init) = &declarator.init {
                self.visit_expr(init);
            }
        }
    }

    fn visit_arrow(&mut self, arrow: &ArrowExpr) {
        self.arrow_scopes.push(FxHashSet::default());
        walk_arrow(self, arrow);
        self.arrow_scopes.pop();
    }

    fn visit_assign(&mut self, assign: &AssignExpr) {
        self.mark_target(&assign.left);
        walk_assign(self, assign);
    }

    fn visit_update(&mut self, update: &UpdateExpr) {
        self.mark_target(&update.arg);
        walk_update(self, update);
    }

    fn visit_ident_ref(&mut self, id: &Ident) {
        if self.arrow_scopes.is_empty() {
            return;
        }
        if !self.arrow_scopes.iter().any(|scope| scope.contains(&id.name)) {
            self.captured.insert(id.name.clone());
        }
    }

    fn visit_binding(&mut self, id: &Ident) {
        match self.arrow_scopes.last_mut() {
            Some(scope) => {
                scope.insert(id.name.clone());
            }
            // a `const` can never need a holder
            None if self.binding_const => {}
            None => {
                self.declared.insert(id.name.clone());
            }
        }
    }
}

/// What an arrow takes from the code around it
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captures {
    /// Free names in first-use order
    pub names: Vec<String>,
    pub this: bool,
}

/// Free variables of an arrow, nested arrows included
///
/// A name bound anywhere inside the arrow is treated as local to it.
pub fn arrow_captures(arrow: &ArrowExpr) -> Captures {
    let mut refs = FreeNames::default();
    walk_arrow(&mut refs, arrow);
    let mut captures = Captures {
        names: Vec::new(),
        this: refs.this,
    };
    for name in refs.refs {
        if !refs.bound.contains(&name) && !captures.names.contains(&name) {
            captures.names.push(name);
        }
    }
    captures
}

#[derive(Default)]
struct FreeNames {
    refs: Vec<String>,
    bound: FxHashSet<String>,
    this: bool,
}

impl Visitor for FreeNames {
    fn visit_expr(&mut self, expr: &Expr) {
        if matches!(expr, Expr::This(_) | Expr::Super(_)) {
            self.this = true;
        }
        walk_expr(self, expr);
    }

    fn visit_ident_ref(&mut self, id: &Ident) {
        self.refs.push(id.name.clone());
    }

    fn visit_binding(&mut self, id: &Ident) {
        self.bound.insert(id.name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsjvm_ast::factory::*;

    fn names(set: FxHashSet<String>) -> Vec<String> {
        let mut names: Vec<String> = set.into_iter().collect();
        names.sort();
        names
    }

    #[test]
    fn test_reassigned_capture_needs_holder() {
        let body = vec![
            let_("count", None, int(0)),
            let_("inc", None, arrow(vec![], assign(ident("count"), add(ident("count"), int(1))))),
        ];
        assert_eq!(names(CaptureAnalyzer::holders(&body)), vec!["count"]);
    }

    #[test]
    fn test_outer_reassignment_also_counts() {
        let body = vec![
            let_("x", None, int(1)),
            let_("get", None, arrow(vec![], ident("x"))),
            expr_stmt(assign(ident("x"), int(2))),
        ];
        assert_eq!(names(CaptureAnalyzer::holders(&body)), vec!["x"]);
    }

    #[test]
    fn test_read_only_and_arrow_locals_stay_direct() {
        let body = vec![
            let_("base", None, int(10)),
            let_(
                "f",
                None,
                arrow_block(
                    vec![("n", None)],
                    None,
                    vec![
                        let_("acc", None, ident("base")),
                        expr_stmt(assign(ident("acc"), add(ident("acc"), ident("n")))),
                        ret(ident("acc")),
                    ],
                ),
            ),
            let_("plain", None, int(0)),
            expr_stmt(post_inc(ident("plain"))),
        ];
        assert!(CaptureAnalyzer::holders(&body).is_empty());
    }

    #[test]
    fn test_for_of_target_counts_as_mutation() {
        let body = vec![
            let_("item", None, int(0)),
            let_("show", None, arrow(vec![], ident("item"))),
            for_of_existing("item", ident("xs")),
        ];
        assert_eq!(names(CaptureAnalyzer::holders(&body)), vec!["item"]);
    }

    fn for_of_existing(name: &str, iter: Expr) -> Stmt {
        Stmt::ForOf(tsjvm_ast::ForOfStmt {
            left: ForHead::Pat(Pat::Ident(binding(name, None))),
            right: iter,
            body: Box::new(block(vec![])),
            span: Default::default(),
        })
    }

    #[test]
    fn test_const_never_needs_holder() {
        // `x++` belongs to the arrow's own `x`
        let body = vec![
            const_("x", None, int(1)),
            let_("read", None, arrow(vec![], ident("x"))),
            let_(
                "bump",
                None,
                arrow_block(
                    vec![],
                    None,
                    vec![let_("x", None, int(2)), expr_stmt(post_inc(ident("x"))), ret(ident("x"))],
                ),
            ),
        ];
        assert!(CaptureAnalyzer::holders(&body).is_empty());
    }

    #[test]
    fn test_parameters_can_need_holders() {
        let body = vec![
            let_("bump", None, arrow(vec![], post_inc(ident("n")))),
            expr_stmt(call_fn("bump", vec![])),
        ];
        assert_eq!(names(CaptureAnalyzer::holders_with_params(["n"], &body)), vec!["n"]);
        assert!(CaptureAnalyzer::holders(&body).is_empty());
    }

    #[test]
    fn test_holders_inside_an_arrow() {
        let Expr::Arrow(outer) = arrow_block(
            vec![("step", None)],
            None,
            vec![
                let_("total", None, int(0)),
                let_(
                    "add",
                    None,
                    arrow(vec![], assign(ident("total"), add(ident("total"), ident("step")))),
                ),
                ret(ident("total")),
            ],
        ) else {
            unreachable!()
        };
        assert_eq!(names(CaptureAnalyzer::holders_in_arrow(&outer)), vec!["total"]);
    }

    #[test]
    fn test_arrow_captures() {
        let Expr::Arrow(a) = arrow_block(
            vec![("x", None)],
            None,
            vec![
                let_("local", None, add(ident("x"), ident("offset"))),
                expr_stmt(arrow(vec![], add(ident("local"), ident("scale")))),
                ret(add(member(this(), "base"), ident("offset"))),
            ],
        ) else {
            unreachable!()
        };
        let captures = arrow_captures(&a);
        assert_eq!(captures.names, vec!["offset".to_string(), "scale".to_string()]);
        assert!(captures.this);
    }
}
