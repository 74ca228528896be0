//! Expression types
//!
//! Inference never fails hard: an expression it cannot type yields `None`
//! and callers fall back to `Object` or skip the declaration.

use super::descriptor::*;
use super::members::static_path;
use super::{ScopedEnv, TypeEnv, TypeResolver};
use crate::error::{Analysis, CompileResult};
use crate::functional::{self, FunctionalInterface};
use tsjvm_ast::{
    ArrowBody, ArrowExpr, AssignOp, BinExpr, BinaryOp, BlockStmt, Decl, Expr, ForHead, ForInit, Lit,
    NewExpr, NumLit, Pat, Stmt, UnaryOp, VarDecl,
};

/// Descriptor of a numeric literal: `I` for integral values in range, `D` otherwise
pub fn literal_descriptor(lit: &NumLit) -> &'static str {
    if lit.is_integral() && lit.value >= i32::MIN as f64 && lit.value <= i32::MAX as f64 {
        "I"
    } else {
        "D"
    }
}

/// Common type of two branches
pub fn widen(a: &str, b: &str) -> String {
    if a == b {
        return a.to_string();
    }
    let ua = unboxed(a).unwrap_or(a);
    let ub = unboxed(b).unwrap_or(b);
    if is_numeric(ua) && is_numeric(ub) {
        return promote(ua, ub).to_string();
    }
    OBJECT.to_string()
}

/// Parameter and return descriptors of an arrow plus its interface
#[derive(Debug, Clone)]
pub struct ArrowSignature {
    pub params: Vec<String>,
    pub ret: String,
    pub interface: &'static FunctionalInterface,
}

impl<'a> TypeResolver<'a> {
    pub fn infer_or_object(&self, expr: &Expr, env: &dyn TypeEnv) -> String {
        self.infer(expr, env).unwrap_or_else(|| OBJECT.to_string())
    }

    pub fn infer(&self, expr: &Expr, env: &dyn TypeEnv) -> Option<String> {
        Some(match expr {
            Expr::Lit(Lit::Str(_)) => STRING.to_string(),
            Expr::Lit(Lit::Num(n)) => literal_descriptor(n).to_string(),
            Expr::Lit(Lit::Bool(_)) => "Z".to_string(),
            Expr::Lit(Lit::Null(_)) => OBJECT.to_string(),
            Expr::Ident(id) => match self.variable_type(&id.name, env) {
                Some(desc) => desc,
                None => match id.name.as_str() {
                    "undefined" => OBJECT.to_string(),
                    "NaN" | "Infinity" => "D".to_string(),
                    _ => return None,
                },
            },
            Expr::This(_) => object_of(&self.registry.get(env.this_class()?)?.internal_name),
            Expr::Super(_) => return None,
            Expr::Array(a) => {
                let elems: Vec<String> =
                    a.elems.iter().map(|e| self.infer_or_object(e, env)).collect();
                format!("[{}", widest(elems.iter().map(String::as_str)))
            }
            Expr::Object(_) => LINKED_HASH_MAP.to_string(),
            Expr::Unary(u) => match u.op {
                UnaryOp::Not => "Z".to_string(),
                UnaryOp::TypeOf => STRING.to_string(),
                UnaryOp::Void => OBJECT.to_string(),
                UnaryOp::Minus | UnaryOp::Plus => {
                    let arg = self.infer_or_object(&u.arg, env);
                    let prim = unboxed(&arg).unwrap_or(&arg);
                    if is_numeric(prim) {
                        computational(prim).to_string()
                    } else {
                        "D".to_string()
                    }
                }
                UnaryOp::BitNot => {
                    let arg = self.infer_or_object(&u.arg, env);
                    integral_kind(&arg).to_string()
                }
            },
            Expr::Update(u) => self.infer(&u.arg, env)?,
            Expr::Bin(b) => self.infer_binary(b, env),
            Expr::Assign(a) => {
                let left = self.infer(&a.left, env)?;
                if a.op == AssignOp::AddAssign
                    && left != STRING
                    && self.infer(&a.right, env).as_deref() == Some(STRING)
                {
                    STRING.to_string()
                } else {
                    left
                }
            }
            Expr::Cond(c) => widen(
                &self.infer_or_object(&c.cons, env),
                &self.infer_or_object(&c.alt, env),
            ),
            Expr::Call(c) => match &c.callee {
                tsjvm_ast::Callee::Super(_) => "V".to_string(),
                tsjvm_ast::Callee::Expr(_) => self.resolve_call(c, env)?.result_descriptor(),
            },
            Expr::New(n) => self.new_type(n, env),
            Expr::Member(m) => self.resolve_member(m, env)?.descriptor(),
            Expr::Arrow(a) => self.arrow_signature(a, env).ok()?.interface.type_descriptor(),
            Expr::Paren(p) => self.infer(&p.expr, env)?,
            Expr::As(a) => self.resolve(&a.type_ann, env).ok()?,
            Expr::Tpl(_) => STRING.to_string(),
        })
    }

    fn infer_binary(&self, b: &BinExpr, env: &dyn TypeEnv) -> String {
        if b.op.is_comparison() || b.op.is_equality() {
            return "Z".to_string();
        }
        let left = self.infer_or_object(&b.left, env);
        let right = self.infer_or_object(&b.right, env);
        match b.op {
            BinaryOp::Add if left == STRING || right == STRING => STRING.to_string(),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                if left == "Z" && right == "Z" {
                    "Z".to_string()
                } else {
                    widen(&left, &right)
                }
            }
            op if op.is_shift() => integral_kind(&left).to_string(),
            op if op.is_bitwise() => {
                if left == "Z" && right == "Z" {
                    return "Z".to_string();
                }
                integral_kind(promote(&left, &right)).to_string()
            }
            _ => promote(&left, &right).to_string(),
        }
    }

    /// Type created by a `new` expression
    pub fn new_type(&self, n: &NewExpr, env: &dyn TypeEnv) -> String {
        let Some(path) = static_path(&n.callee) else {
            return OBJECT.to_string();
        };
        if let Some(info) = self.lookup_class(&path, env) {
            return object_of(&info.internal_name);
        }
        if path == "Map" {
            return LINKED_HASH_MAP.to_string();
        }
        match self.alias_class(&path) {
            Some(internal) => object_of(&internal),
            None => OBJECT.to_string(),
        }
    }

    /// Parameter types, return type and interface of an arrow function
    pub fn arrow_signature(
        &self,
        arrow: &ArrowExpr,
        env: &dyn TypeEnv,
    ) -> CompileResult<ArrowSignature> {
        let mut scoped = ScopedEnv::new(env);
        let mut params = Vec::with_capacity(arrow.params.len());
        for pat in &arrow.params {
            let (name, ann) = match pat {
                Pat::Ident(b) => (b.id.as_str(), b.type_ann.as_ref()),
                _ => {
                    return Err(crate::error::CompileError::unsupported(
                        "destructuring arrow parameters",
                    ))
                }
            };
            let desc = self.resolve_or_object(ann, env)?;
            scoped.bind(name, &desc);
            params.push(desc);
        }
        let ret = match (&arrow.return_type, &arrow.body) {
            (Some(ty), _) => self.resolve(ty, env)?,
            (None, ArrowBody::Expr(body)) => match self.infer(body, &scoped) {
                Some(desc) if desc != "V" => desc,
                Some(_) => "V".to_string(),
                None => OBJECT.to_string(),
            },
            (None, ArrowBody::Block(block)) => match self.infer_body_return(block, &scoped) {
                Analysis::Resolved(desc) => desc,
                Analysis::Skipped { .. } => OBJECT.to_string(),
            },
        };
        let interface = functional::select(&params, &ret)?;
        Ok(ArrowSignature { params, ret, interface })
    }

    /// Widest type over every `return <expr>` in a body; `V` when there is none
    pub fn infer_body_return(&self, body: &BlockStmt, env: &dyn TypeEnv) -> Analysis<String> {
        let mut scoped = ScopedEnv::new(env);
        let mut found: Option<String> = None;
        if let Err(reason) = self.scan_returns(&body.stmts, &mut scoped, &mut found) {
            return Analysis::skipped(reason);
        }
        Analysis::Resolved(found.unwrap_or_else(|| "V".to_string()))
    }

    fn scan_returns(
        &self,
        stmts: &[Stmt],
        env: &mut ScopedEnv<'_>,
        found: &mut Option<String>,
    ) -> Result<(), String> {
        for stmt in stmts {
            self.scan_return(stmt, env, found)?;
        }
        Ok(())
    }

    fn bind_var_decl(&self, decl: &VarDecl, env: &mut ScopedEnv<'_>) {
        for declarator in &decl.decls {
            if let Pat::Ident(b) = &declarator.name {
                let desc = match &b.type_ann {
                    Some(ty) => self.resolve(ty, env).ok(),
                    None => declarator.init.as_ref().and_then(|init| self.infer(init, env)),
                };
                let desc = desc.unwrap_or_else(|| OBJECT.to_string());
                env.bind(b.id.as_str(), &desc);
            }
        }
    }

    fn scan_return(
        &self,
        stmt: &Stmt,
        env: &mut ScopedEnv<'_>,
        found: &mut Option<String>,
    ) -> Result<(), String> {
        match stmt {
            Stmt::Return(r) => {
                let desc = match &r.arg {
                    None => "V".to_string(),
                    Some(arg) => self
                        .infer(arg, env)
                        .ok_or_else(|| format!("cannot infer type of {}", arg.kind_name()))?,
                };
                *found = Some(match found.take() {
                    None => desc,
                    Some(prev) => widen(&prev, &desc),
                });
            }
            Stmt::Decl(Decl::Var(decl)) => self.bind_var_decl(decl, env),
            Stmt::Block(b) => self.scan_returns(&b.stmts, env, found)?,
            Stmt::If(s) => {
                self.scan_return(&s.cons, env, found)?;
                if let Some(alt) = &s.alt {
                    self.scan_return(alt, env, found)?;
                }
            }
            Stmt::While(s) => self.scan_return(&s.body, env, found)?,
            Stmt::DoWhile(s) => self.scan_return(&s.body, env, found)?,
            Stmt::For(s) => {
                if let Some(ForInit::VarDecl(decl)) = &s.init {
                    self.bind_var_decl(decl, env);
                }
                self.scan_return(&s.body, env, found)?;
            }
            Stmt::ForOf(s) => {
                if let ForHead::VarDecl(decl) = &s.left {
                    let iter = self.infer_or_object(&s.right, env);
                    let elem = match array_element(&iter) {
                        Some(elem) => elem.to_string(),
                        None if iter == STRING => STRING.to_string(),
                        None => OBJECT.to_string(),
                    };
                    for name in decl.decls.iter().flat_map(|d| d.name.bound_names()) {
                        env.bind(name, &elem);
                    }
                }
                self.scan_return(&s.body, env, found)?;
            }
            Stmt::ForIn(s) => {
                if let ForHead::VarDecl(decl) = &s.left {
                    for name in decl.decls.iter().flat_map(|d| d.name.bound_names()) {
                        env.bind(name, STRING);
                    }
                }
                self.scan_return(&s.body, env, found)?;
            }
            Stmt::Labeled(s) => self.scan_return(&s.body, env, found)?,
            Stmt::Try(s) => {
                self.scan_returns(&s.block.stmts, env, found)?;
                if let Some(handler) = &s.handler {
                    if let Some(Pat::Ident(b)) = &handler.param {
                        env.bind(b.id.as_str(), THROWABLE);
                    }
                    self.scan_returns(&handler.body.stmts, env, found)?;
                }
                if let Some(finalizer) = &s.finalizer {
                    self.scan_returns(&finalizer.stmts, env, found)?;
                }
            }
            Stmt::Switch(s) => {
                for case in &s.cases {
                    self.scan_returns(&case.cons, env, found)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::default_type_aliases;
    use crate::registry::{JavaTypeInfo, MethodInfo, TypeKind, TypeRegistry};
    use crate::types::DeclEnv;
    use std::collections::BTreeMap;
    use tsjvm_ast::factory::*;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        let mut container = JavaTypeInfo::new("$", "", "$", TypeKind::Container);
        container.add_method(MethodInfo::new("twice", "(I)I", true, false));
        registry.register_type(container);
        registry.set_container("", "$");
        registry
    }

    fn with<R>(f: impl FnOnce(&TypeResolver, &DeclEnv) -> R) -> R {
        let registry = registry();
        let aliases: BTreeMap<String, String> = default_type_aliases();
        let resolver = TypeResolver::new(&registry, &aliases);
        let env = DeclEnv::new("");
        f(&resolver, &env)
    }

    #[test]
    fn test_literals() {
        with(|r, env| {
            assert_eq!(r.infer(&int(3), env).as_deref(), Some("I"));
            assert_eq!(r.infer(&num(1.5), env).as_deref(), Some("D"));
            assert_eq!(r.infer(&int(5_000_000_000), env).as_deref(), Some("D"));
            assert_eq!(r.infer(&str_("x"), env).as_deref(), Some(STRING));
            assert_eq!(r.infer(&bool_(true), env).as_deref(), Some("Z"));
            assert_eq!(r.infer(&null(), env).as_deref(), Some(OBJECT));
        });
    }

    #[test]
    fn test_binary_operators() {
        with(|r, env| {
            assert_eq!(r.infer(&add(int(1), int(2)), env).as_deref(), Some("I"));
            assert_eq!(r.infer(&add(int(1), num(2.5)), env).as_deref(), Some("D"));
            assert_eq!(r.infer(&add(str_("a"), int(2)), env).as_deref(), Some(STRING));
            assert_eq!(r.infer(&lt(int(1), int(2)), env).as_deref(), Some("Z"));
            assert_eq!(r.infer(&and(bool_(true), bool_(false)), env).as_deref(), Some("Z"));
            assert_eq!(
                r.infer(&bin(BinaryOp::BitAnd, int(6), int(3)), env).as_deref(),
                Some("I")
            );
        });
    }

    #[test]
    fn test_arrays_and_calls() {
        with(|r, env| {
            let mixed = array(vec![int(1), num(2.5)]);
            assert_eq!(r.infer(&mixed, env).as_deref(), Some("[D"));
            assert_eq!(r.infer(&call_fn("twice", vec![int(2)]), env).as_deref(), Some("I"));
            assert_eq!(r.infer(&call_fn("missing", vec![]), env), None);
            assert_eq!(r.infer(&cond(bool_(true), int(1), num(2.0)), env).as_deref(), Some("D"));
        });
    }

    #[test]
    fn test_arrow_signature() {
        with(|r, env| {
            let Expr::Arrow(a) = arrow(vec![("x", Some(t_int()))], mul(ident("x"), int(2))) else {
                unreachable!()
            };
            let sig = r.arrow_signature(&a, env).unwrap();
            assert_eq!(sig.ret, "I");
            assert_eq!(sig.interface.internal_name, "java/util/function/IntUnaryOperator");

            let Expr::Arrow(b) =
                arrow_block(vec![], None, vec![expr_stmt(call_fn("twice", vec![int(1)]))])
            else {
                unreachable!()
            };
            assert_eq!(
                r.arrow_signature(&b, env).unwrap().interface.internal_name,
                "java/lang/Runnable"
            );
        });
    }

    #[test]
    fn test_body_return_tracks_locals() {
        with(|r, env| {
            let body = BlockStmt::new(vec![
                let_("s", None, str_("x")),
                if_(bool_(true), vec![ret(ident("s"))], None),
                ret(str_("y")),
            ]);
            assert_eq!(r.infer_body_return(&body, env), Analysis::Resolved(STRING.to_string()));

            let widened = BlockStmt::new(vec![
                if_(bool_(true), vec![ret(int(1))], None),
                ret(num(0.5)),
            ]);
            assert_eq!(r.infer_body_return(&widened, env), Analysis::Resolved("D".to_string()));

            let unknown = BlockStmt::new(vec![ret(call_fn("nope", vec![]))]);
            assert!(!r.infer_body_return(&unknown, env).is_resolved());

            assert_eq!(
                r.infer_body_return(&BlockStmt::new(vec![]), env),
                Analysis::Resolved("V".to_string())
            );
        });
    }
}
