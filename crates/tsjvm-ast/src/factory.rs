//! Node constructors
//!
//! Short functions for building trees by hand: tests, tools and embedders that
//! synthesize code without going through a parser. Every node gets an empty
//! span.

use crate::*;

fn bx(expr: Expr) -> Box<Expr> {
    Box::new(expr)
}

/// Build a module from top-level statements
pub fn module(body: Vec<Stmt>) -> Module {
    Module::new(body)
}

// ============================================================================
// Types
// ============================================================================

pub fn t_number() -> TsType {
    TsType::Keyword(TsKeywordType::Number)
}

pub fn t_string() -> TsType {
    TsType::Keyword(TsKeywordType::String)
}

pub fn t_boolean() -> TsType {
    TsType::Keyword(TsKeywordType::Boolean)
}

pub fn t_void() -> TsType {
    TsType::Keyword(TsKeywordType::Void)
}

pub fn t_any() -> TsType {
    TsType::Keyword(TsKeywordType::Any)
}

pub fn t_null() -> TsType {
    TsType::Keyword(TsKeywordType::Null)
}

/// `int` (resolved through the alias table)
pub fn t_int() -> TsType {
    TsType::named("int")
}

pub fn t_long() -> TsType {
    TsType::named("long")
}

pub fn t_float() -> TsType {
    TsType::named("float")
}

pub fn t_named(name: &str) -> TsType {
    TsType::named(name)
}

/// `T[]`
pub fn t_array(elem: TsType) -> TsType {
    TsType::Array(Box::new(elem))
}

/// Named reference with type arguments: `Record<K, V>`
pub fn t_generic(name: &str, args: Vec<TsType>) -> TsType {
    TsType::Ref(TsTypeRef {
        name: name.to_string(),
        type_args: args,
        span: Span::default(),
    })
}

pub fn t_union(types: Vec<TsType>) -> TsType {
    TsType::Union(types)
}

/// `(a: A, ...) => R`
pub fn t_fn(params: Vec<(&str, TsType)>, ret: TsType) -> TsType {
    TsType::Fn(TsFnType {
        params: params
            .into_iter()
            .map(|(name, ty)| binding(name, Some(ty)))
            .collect(),
        return_type: Box::new(ret),
    })
}

// ============================================================================
// Expressions
// ============================================================================

pub fn ident(name: &str) -> Expr {
    Expr::Ident(Ident::new(name))
}

/// Integral numeric literal
pub fn int(value: i64) -> Expr {
    Expr::Lit(Lit::Num(NumLit {
        value: value as f64,
        raw: Some(value.to_string()),
        span: Span::default(),
    }))
}

/// Fractional numeric literal; `num(2.0)` is spelled `2.0` and stays a double
pub fn num(value: f64) -> Expr {
    Expr::Lit(Lit::Num(NumLit {
        value,
        raw: Some(format!("{value:?}")),
        span: Span::default(),
    }))
}

pub fn str_(value: &str) -> Expr {
    Expr::Lit(Lit::Str(StrLit {
        value: value.to_string(),
        span: Span::default(),
    }))
}

pub fn bool_(value: bool) -> Expr {
    Expr::Lit(Lit::Bool(BoolLit {
        value,
        span: Span::default(),
    }))
}

pub fn null() -> Expr {
    Expr::Lit(Lit::Null(Span::default()))
}

pub fn this() -> Expr {
    Expr::This(Span::default())
}

pub fn super_() -> Expr {
    Expr::Super(Span::default())
}

pub fn array(elems: Vec<Expr>) -> Expr {
    Expr::Array(ArrayLit {
        elems,
        span: Span::default(),
    })
}

/// `` `q0${e0}q1...` ``; `quasis` must be one longer than `exprs`
pub fn tpl(quasis: Vec<&str>, exprs: Vec<Expr>) -> Expr {
    Expr::Tpl(TplExpr {
        quasis: quasis.into_iter().map(str::to_string).collect(),
        exprs,
        span: Span::default(),
    })
}

pub fn object(props: Vec<(&str, Expr)>) -> Expr {
    Expr::Object(ObjectLit {
        props: props
            .into_iter()
            .map(|(key, value)| Prop {
                key: Ident::new(key),
                value,
            })
            .collect(),
        span: Span::default(),
    })
}

pub fn unary(op: UnaryOp, arg: Expr) -> Expr {
    Expr::Unary(UnaryExpr {
        op,
        arg: bx(arg),
        span: Span::default(),
    })
}

pub fn neg(arg: Expr) -> Expr {
    unary(UnaryOp::Minus, arg)
}

pub fn not(arg: Expr) -> Expr {
    unary(UnaryOp::Not, arg)
}

pub fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Bin(BinExpr {
        op,
        left: bx(left),
        right: bx(right),
        span: Span::default(),
    })
}

pub fn add(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::Add, left, right)
}

pub fn sub(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::Sub, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::Mul, left, right)
}

pub fn div(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::Div, left, right)
}

pub fn rem(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::Mod, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::Lt, left, right)
}

pub fn le(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::LtEq, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::Gt, left, right)
}

pub fn ge(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::GtEq, left, right)
}

/// `===`
pub fn eq(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::EqEqEq, left, right)
}

/// `!==`
pub fn ne(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::NotEqEq, left, right)
}

pub fn and(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::LogicalAnd, left, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
    bin(BinaryOp::LogicalOr, left, right)
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    assign_op(AssignOp::Assign, target, value)
}

pub fn assign_op(op: AssignOp, target: Expr, value: Expr) -> Expr {
    Expr::Assign(AssignExpr {
        op,
        left: bx(target),
        right: bx(value),
        span: Span::default(),
    })
}

fn update(op: UpdateOp, prefix: bool, arg: Expr) -> Expr {
    Expr::Update(UpdateExpr {
        op,
        prefix,
        arg: bx(arg),
        span: Span::default(),
    })
}

/// `++x`
pub fn pre_inc(arg: Expr) -> Expr {
    update(UpdateOp::Incr, true, arg)
}

/// `x++`
pub fn post_inc(arg: Expr) -> Expr {
    update(UpdateOp::Incr, false, arg)
}

/// `--x`
pub fn pre_dec(arg: Expr) -> Expr {
    update(UpdateOp::Decr, true, arg)
}

/// `x--`
pub fn post_dec(arg: Expr) -> Expr {
    update(UpdateOp::Decr, false, arg)
}

pub fn cond(test: Expr, cons: Expr, alt: Expr) -> Expr {
    Expr::Cond(CondExpr {
        test: bx(test),
        cons: bx(cons),
        alt: bx(alt),
        span: Span::default(),
    })
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        callee: Callee::Expr(bx(callee)),
        args,
        span: Span::default(),
    })
}

/// `name(args)`
pub fn call_fn(name: &str, args: Vec<Expr>) -> Expr {
    call(ident(name), args)
}

/// `obj.name(args)`
pub fn method_call(obj: Expr, name: &str, args: Vec<Expr>) -> Expr {
    call(member(obj, name), args)
}

/// `super(args)`
pub fn super_call(args: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        callee: Callee::Super(Span::default()),
        args,
        span: Span::default(),
    })
}

/// `new Name(args)`
pub fn new_(class: &str, args: Vec<Expr>) -> Expr {
    Expr::New(NewExpr {
        callee: bx(ident(class)),
        args,
        span: Span::default(),
    })
}

/// `obj.prop`
pub fn member(obj: Expr, prop: &str) -> Expr {
    Expr::Member(MemberExpr {
        obj: bx(obj),
        prop: MemberProp::Ident(Ident::new(prop)),
        span: Span::default(),
    })
}

/// `obj[index]`
pub fn index(obj: Expr, index: Expr) -> Expr {
    Expr::Member(MemberExpr {
        obj: bx(obj),
        prop: MemberProp::Computed(bx(index)),
        span: Span::default(),
    })
}

fn arrow_params(params: Vec<(&str, Option<TsType>)>) -> Vec<Pat> {
    params
        .into_iter()
        .map(|(name, ty)| Pat::Ident(binding(name, ty)))
        .collect()
}

/// `(params) => expr`
pub fn arrow(params: Vec<(&str, Option<TsType>)>, body: Expr) -> Expr {
    Expr::Arrow(ArrowExpr {
        params: arrow_params(params),
        body: ArrowBody::Expr(bx(body)),
        return_type: None,
        span: Span::default(),
    })
}

/// `(params): ret => { stmts }`
pub fn arrow_block(
    params: Vec<(&str, Option<TsType>)>,
    return_type: Option<TsType>,
    body: Vec<Stmt>,
) -> Expr {
    Expr::Arrow(ArrowExpr {
        params: arrow_params(params),
        body: ArrowBody::Block(BlockStmt::new(body)),
        return_type,
        span: Span::default(),
    })
}

pub fn paren(expr: Expr) -> Expr {
    Expr::Paren(ParenExpr {
        expr: bx(expr),
        span: Span::default(),
    })
}

/// `expr as T`
pub fn as_(expr: Expr, ty: TsType) -> Expr {
    Expr::As(AsExpr {
        expr: bx(expr),
        type_ann: ty,
        span: Span::default(),
    })
}

// ============================================================================
// Statements
// ============================================================================

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(ExprStmt {
        expr,
        span: Span::default(),
    })
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    Stmt::Block(BlockStmt::new(stmts))
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(ReturnStmt {
        arg: Some(value),
        span: Span::default(),
    })
}

pub fn ret_void() -> Stmt {
    Stmt::Return(ReturnStmt {
        arg: None,
        span: Span::default(),
    })
}

pub fn binding(name: &str, ty: Option<TsType>) -> BindingIdent {
    BindingIdent {
        id: Ident::new(name),
        type_ann: ty,
    }
}

/// Variable declaration of a single binding
pub fn var_decl(kind: VarKind, name: &str, ty: Option<TsType>, init: Option<Expr>) -> VarDecl {
    VarDecl {
        kind,
        declare: false,
        decls: vec![VarDeclarator {
            name: Pat::Ident(binding(name, ty)),
            init: init.map(bx),
        }],
        span: Span::default(),
    }
}

pub fn let_(name: &str, ty: Option<TsType>, init: Expr) -> Stmt {
    Stmt::Decl(Decl::Var(var_decl(VarKind::Let, name, ty, Some(init))))
}

pub fn const_(name: &str, ty: Option<TsType>, init: Expr) -> Stmt {
    Stmt::Decl(Decl::Var(var_decl(VarKind::Const, name, ty, Some(init))))
}

pub fn var_(name: &str, ty: Option<TsType>, init: Expr) -> Stmt {
    Stmt::Decl(Decl::Var(var_decl(VarKind::Var, name, ty, Some(init))))
}

/// `let name: T;` without initializer
pub fn let_uninit(name: &str, ty: TsType) -> Stmt {
    Stmt::Decl(Decl::Var(var_decl(VarKind::Let, name, Some(ty), None)))
}

pub fn if_(test: Expr, cons: Vec<Stmt>, alt: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If(IfStmt {
        test,
        cons: Box::new(block(cons)),
        alt: alt.map(|stmts| Box::new(block(stmts))),
        span: Span::default(),
    })
}

pub fn while_(test: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While(WhileStmt {
        test,
        body: Box::new(block(body)),
        span: Span::default(),
    })
}

pub fn do_while(body: Vec<Stmt>, test: Expr) -> Stmt {
    Stmt::DoWhile(DoWhileStmt {
        body: Box::new(block(body)),
        test,
        span: Span::default(),
    })
}

/// General `for (init; test; update) { body }`
pub fn for_(
    init: Option<ForInit>,
    test: Option<Expr>,
    update: Option<Expr>,
    body: Vec<Stmt>,
) -> Stmt {
    Stmt::For(ForStmt {
        init,
        test,
        update,
        body: Box::new(block(body)),
        span: Span::default(),
    })
}

/// `for (let name = init; test; update) { body }`
pub fn for_let(name: &str, init: Expr, test: Expr, update: Expr, body: Vec<Stmt>) -> Stmt {
    for_(
        Some(ForInit::VarDecl(var_decl(VarKind::Let, name, None, Some(init)))),
        Some(test),
        Some(update),
        body,
    )
}

/// `for (let name of iter) { body }`
pub fn for_of(name: &str, iter: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::ForOf(ForOfStmt {
        left: ForHead::VarDecl(var_decl(VarKind::Let, name, None, None)),
        right: iter,
        body: Box::new(block(body)),
        span: Span::default(),
    })
}

/// `for (const name in obj) { body }`
pub fn for_in(name: &str, obj: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::ForIn(ForInStmt {
        left: ForHead::VarDecl(var_decl(VarKind::Const, name, None, None)),
        right: obj,
        body: Box::new(block(body)),
        span: Span::default(),
    })
}

pub fn labeled(label: &str, body: Stmt) -> Stmt {
    Stmt::Labeled(LabeledStmt {
        label: Ident::new(label),
        body: Box::new(body),
        span: Span::default(),
    })
}

pub fn break_() -> Stmt {
    Stmt::Break(BreakStmt {
        label: None,
        span: Span::default(),
    })
}

pub fn break_to(label: &str) -> Stmt {
    Stmt::Break(BreakStmt {
        label: Some(Ident::new(label)),
        span: Span::default(),
    })
}

pub fn continue_() -> Stmt {
    Stmt::Continue(ContinueStmt {
        label: None,
        span: Span::default(),
    })
}

pub fn continue_to(label: &str) -> Stmt {
    Stmt::Continue(ContinueStmt {
        label: Some(Ident::new(label)),
        span: Span::default(),
    })
}

pub fn throw(arg: Expr) -> Stmt {
    Stmt::Throw(ThrowStmt {
        arg,
        span: Span::default(),
    })
}

/// `try { body } catch (param) { handler } finally { finalizer }`
pub fn try_(
    body: Vec<Stmt>,
    catch: Option<(Option<&str>, Vec<Stmt>)>,
    finalizer: Option<Vec<Stmt>>,
) -> Stmt {
    Stmt::Try(TryStmt {
        block: BlockStmt::new(body),
        handler: catch.map(|(param, body)| CatchClause {
            param: param.map(|name| Pat::Ident(binding(name, None))),
            body: BlockStmt::new(body),
        }),
        finalizer: finalizer.map(BlockStmt::new),
        span: Span::default(),
    })
}

/// `switch (disc) { case test: ... default: ... }`
pub fn switch(discriminant: Expr, cases: Vec<(Option<Expr>, Vec<Stmt>)>) -> Stmt {
    Stmt::Switch(SwitchStmt {
        discriminant,
        cases: cases
            .into_iter()
            .map(|(test, cons)| SwitchCase { test, cons })
            .collect(),
        span: Span::default(),
    })
}

// ============================================================================
// Declarations
// ============================================================================

pub fn param(name: &str, ty: Option<TsType>) -> Param {
    Param {
        pat: Pat::Ident(binding(name, ty)),
        span: Span::default(),
    }
}

fn function_node(params: Vec<Param>, ret: Option<TsType>, body: Option<Vec<Stmt>>) -> Function {
    Function {
        params,
        body: body.map(BlockStmt::new),
        return_type: ret,
        type_params: Vec::new(),
    }
}

/// `function name(params): ret { body }`
pub fn function(name: &str, params: Vec<Param>, ret: Option<TsType>, body: Vec<Stmt>) -> Stmt {
    Stmt::Decl(Decl::Function(FnDecl {
        ident: Ident::new(name),
        declare: false,
        function: function_node(params, ret, Some(body)),
        span: Span::default(),
    }))
}

/// `namespace name { body }`
pub fn namespace(name: &str, body: Vec<Stmt>) -> Stmt {
    Stmt::Decl(Decl::Namespace(NamespaceDecl {
        id: Ident::new(name),
        declare: false,
        body,
        span: Span::default(),
    }))
}

/// `enum Name { A = init, B, ... }`
pub fn enum_(name: &str, members: Vec<(&str, Option<Expr>)>) -> Stmt {
    Stmt::Decl(Decl::Enum(EnumDecl {
        ident: Ident::new(name),
        declare: false,
        is_const: false,
        members: members
            .into_iter()
            .map(|(id, init)| EnumMember {
                id: Ident::new(id),
                init,
            })
            .collect(),
        span: Span::default(),
    }))
}

/// `type Name = T`
pub fn type_alias(name: &str, ty: TsType) -> Stmt {
    Stmt::Decl(Decl::TypeAlias(TypeAliasDecl {
        ident: Ident::new(name),
        declare: false,
        type_params: Vec::new(),
        type_ann: ty,
        span: Span::default(),
    }))
}

/// Mark a declaration statement as ambient (`declare ...`)
pub fn declare(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::Decl(mut decl) => {
            match &mut decl {
                Decl::Class(d) => d.declare = true,
                Decl::Interface(d) => d.declare = true,
                Decl::Enum(d) => d.declare = true,
                Decl::TypeAlias(d) => d.declare = true,
                Decl::Function(d) => d.declare = true,
                Decl::Namespace(d) => d.declare = true,
                Decl::Var(d) => d.declare = true,
            }
            Stmt::Decl(decl)
        }
        other => other,
    }
}

/// Incremental builder for class declarations
pub struct ClassBuilder {
    decl: ClassDecl,
}

/// Start a class declaration
pub fn class(name: &str) -> ClassBuilder {
    ClassBuilder {
        decl: ClassDecl {
            ident: Ident::new(name),
            declare: false,
            is_abstract: false,
            type_params: Vec::new(),
            super_class: None,
            implements: Vec::new(),
            body: Vec::new(),
            span: Span::default(),
        },
    }
}

impl ClassBuilder {
    pub fn extends(mut self, name: &str) -> Self {
        self.decl.super_class = Some(Ident::new(name));
        self
    }

    pub fn implements(mut self, name: &str) -> Self {
        self.decl.implements.push(Ident::new(name));
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.decl.is_abstract = true;
        self
    }

    pub fn type_param(mut self, name: &str, constraint: Option<TsType>) -> Self {
        self.decl.type_params.push(TypeParam {
            name: Ident::new(name),
            constraint,
        });
        self
    }

    fn property(
        mut self,
        name: &str,
        ty: Option<TsType>,
        value: Option<Expr>,
        is_static: bool,
        readonly: bool,
    ) -> Self {
        self.decl.body.push(ClassMember::Property(ClassProp {
            key: Ident::new(name),
            type_ann: ty,
            value,
            is_static,
            readonly,
            span: Span::default(),
        }));
        self
    }

    pub fn prop(self, name: &str, ty: Option<TsType>, value: Option<Expr>) -> Self {
        self.property(name, ty, value, false, false)
    }

    pub fn readonly_prop(self, name: &str, ty: Option<TsType>, value: Option<Expr>) -> Self {
        self.property(name, ty, value, false, true)
    }

    pub fn static_prop(self, name: &str, ty: Option<TsType>, value: Option<Expr>) -> Self {
        self.property(name, ty, value, true, false)
    }

    pub fn ctor(mut self, params: Vec<Param>, body: Vec<Stmt>) -> Self {
        self.decl.body.push(ClassMember::Constructor(Constructor {
            params,
            body: BlockStmt::new(body),
            span: Span::default(),
        }));
        self
    }

    fn push_method(
        mut self,
        name: &str,
        kind: MethodKind,
        function: Function,
        is_static: bool,
        is_abstract: bool,
    ) -> Self {
        self.decl.body.push(ClassMember::Method(ClassMethod {
            key: Ident::new(name),
            kind,
            function,
            is_static,
            is_abstract,
            span: Span::default(),
        }));
        self
    }

    pub fn method(
        self,
        name: &str,
        params: Vec<Param>,
        ret: Option<TsType>,
        body: Vec<Stmt>,
    ) -> Self {
        let f = function_node(params, ret, Some(body));
        self.push_method(name, MethodKind::Method, f, false, false)
    }

    pub fn static_method(
        self,
        name: &str,
        params: Vec<Param>,
        ret: Option<TsType>,
        body: Vec<Stmt>,
    ) -> Self {
        let f = function_node(params, ret, Some(body));
        self.push_method(name, MethodKind::Method, f, true, false)
    }

    pub fn abstract_method(self, name: &str, params: Vec<Param>, ret: Option<TsType>) -> Self {
        let f = function_node(params, ret, None);
        self.push_method(name, MethodKind::Method, f, false, true)
    }

    /// `get name(): ret { body }`
    pub fn getter(self, name: &str, ret: Option<TsType>, body: Vec<Stmt>) -> Self {
        let f = function_node(Vec::new(), ret, Some(body));
        self.push_method(name, MethodKind::Getter, f, false, false)
    }

    /// `set name(param) { body }`
    pub fn setter(self, name: &str, param: Param, body: Vec<Stmt>) -> Self {
        let f = function_node(vec![param], None, Some(body));
        self.push_method(name, MethodKind::Setter, f, false, false)
    }

    pub fn into_decl(self) -> ClassDecl {
        self.decl
    }

    pub fn build(self) -> Stmt {
        Stmt::Decl(Decl::Class(self.decl))
    }
}

/// Incremental builder for interface declarations
pub struct InterfaceBuilder {
    decl: InterfaceDecl,
}

/// Start an interface declaration
pub fn interface(name: &str) -> InterfaceBuilder {
    InterfaceBuilder {
        decl: InterfaceDecl {
            ident: Ident::new(name),
            declare: false,
            type_params: Vec::new(),
            extends: Vec::new(),
            body: Vec::new(),
            span: Span::default(),
        },
    }
}

fn bindings(params: Vec<(&str, TsType)>) -> Vec<BindingIdent> {
    params
        .into_iter()
        .map(|(name, ty)| binding(name, Some(ty)))
        .collect()
}

impl InterfaceBuilder {
    pub fn extends(mut self, name: &str) -> Self {
        self.decl.extends.push(Ident::new(name));
        self
    }

    pub fn prop(mut self, name: &str, ty: TsType) -> Self {
        self.decl.body.push(InterfaceMember::Property(PropSignature {
            key: Ident::new(name),
            type_ann: Some(ty),
            readonly: false,
            optional: false,
        }));
        self
    }

    pub fn readonly_prop(mut self, name: &str, ty: TsType) -> Self {
        self.decl.body.push(InterfaceMember::Property(PropSignature {
            key: Ident::new(name),
            type_ann: Some(ty),
            readonly: true,
            optional: false,
        }));
        self
    }

    pub fn method(mut self, name: &str, params: Vec<(&str, TsType)>, ret: TsType) -> Self {
        self.decl.body.push(InterfaceMember::Method(MethodSignature {
            key: Ident::new(name),
            params: bindings(params),
            return_type: Some(ret),
            type_params: Vec::new(),
        }));
        self
    }

    pub fn getter(mut self, name: &str, ty: TsType) -> Self {
        self.decl.body.push(InterfaceMember::Getter(GetterSignature {
            key: Ident::new(name),
            type_ann: Some(ty),
        }));
        self
    }

    pub fn setter(mut self, name: &str, param: &str, ty: TsType) -> Self {
        self.decl.body.push(InterfaceMember::Setter(SetterSignature {
            key: Ident::new(name),
            param: binding(param, Some(ty)),
        }));
        self
    }

    /// `[key: K]: V`
    pub fn index(mut self, key: &str, key_ty: TsType, value_ty: TsType, readonly: bool) -> Self {
        self.decl.body.push(InterfaceMember::Index(IndexSignature {
            param: binding(key, Some(key_ty)),
            type_ann: Some(value_ty),
            readonly,
        }));
        self
    }

    pub fn call_signature(mut self, params: Vec<(&str, TsType)>, ret: TsType) -> Self {
        self.decl.body.push(InterfaceMember::Call(CallSignature {
            params: bindings(params),
            return_type: Some(ret),
        }));
        self
    }

    pub fn construct_signature(mut self, params: Vec<(&str, TsType)>, ret: TsType) -> Self {
        self.decl.body.push(InterfaceMember::Construct(CallSignature {
            params: bindings(params),
            return_type: Some(ret),
        }));
        self
    }

    pub fn into_decl(self) -> InterfaceDecl {
        self.decl
    }

    pub fn build(self) -> Stmt {
        Stmt::Decl(Decl::Interface(self.decl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_stays_fractional() {
        match num(2.0) {
            Expr::Lit(Lit::Num(n)) => {
                assert_eq!(n.raw.as_deref(), Some("2.0"));
                assert!(!n.is_integral());
            }
            other => panic!("unexpected {other:?}"),
        }
        match int(2) {
            Expr::Lit(Lit::Num(n)) => assert!(n.is_integral()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_declare_marks_ambient() {
        let stmt = declare(class("Foo").build());
        match stmt {
            Stmt::Decl(decl) => assert!(decl.is_ambient()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_module_json_round_trip() {
        let m = module(vec![function(
            "answer",
            vec![],
            Some(t_int()),
            vec![ret(int(42))],
        )]);
        let json = serde_json::to_string(&m).unwrap();
        let back: Module = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
