//! Expression nodes

use crate::pat::Pat;
use crate::span::{Ident, Span};
use crate::stmt::BlockStmt;
use crate::types::TsType;
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Lit(Lit),

    /// Identifier reference
    Ident(Ident),

    /// `this`
    This(Span),

    /// `super` as a member object (`super.method()`)
    Super(Span),

    /// Array literal: `[1, 2, 3]`
    Array(ArrayLit),

    /// Object literal: `{ a: 1 }`
    Object(ObjectLit),

    /// Prefix operator: `-x`, `!x`, `~x`
    Unary(UnaryExpr),

    /// `++x`, `x--`
    Update(UpdateExpr),

    /// Binary operator
    Bin(BinExpr),

    /// Assignment, simple or compound
    Assign(AssignExpr),

    /// `test ? cons : alt`
    Cond(CondExpr),

    /// Function or method call
    Call(CallExpr),

    /// `new C(args)`
    New(NewExpr),

    /// `obj.prop` or `obj[expr]`
    Member(MemberExpr),

    /// Arrow function literal
    Arrow(ArrowExpr),

    /// Parenthesized expression
    Paren(ParenExpr),

    /// Type assertion: `x as T`
    As(AsExpr),

    /// Template literal: `` `total: ${n}` ``
    Tpl(TplExpr),
}

// ============================================================================
// Literals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    Str(StrLit),
    Num(NumLit),
    Bool(BoolLit),
    Null(Span),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrLit {
    pub value: String,

    #[serde(default)]
    pub span: Span,
}

/// Numeric literal
///
/// `raw` keeps the source spelling (`1.0` vs `1`) when the parser provides it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumLit {
    pub value: f64,

    #[serde(default)]
    pub raw: Option<String>,

    #[serde(default)]
    pub span: Span,
}

impl NumLit {
    /// True when the literal denotes an integral value written without a fraction or exponent
    pub fn is_integral(&self) -> bool {
        if let Some(raw) = &self.raw {
            let raw = raw.trim();
            let is_hex = raw.starts_with("0x") || raw.starts_with("0X");
            if raw.contains('.') || (!is_hex && (raw.contains('e') || raw.contains('E'))) {
                return false;
            }
        }
        self.value.is_finite() && self.value.fract() == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolLit {
    pub value: bool,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLit {
    pub elems: Vec<Expr>,

    #[serde(default)]
    pub span: Span,
}

/// Template literal without a tag
///
/// `quasis` holds the cooked text around the substitutions, so it always has
/// one more entry than `exprs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TplExpr {
    pub quasis: Vec<String>,
    pub exprs: Vec<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLit {
    pub props: Vec<Prop>,

    #[serde(default)]
    pub span: Span,
}

/// `key: value` entry of an object literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub key: Ident,
    pub value: Expr,
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `typeof`
    TypeOf,
    /// `void`
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub arg: Box<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateOp {
    /// `++`
    Incr,
    /// `--`
    Decr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpr {
    pub op: UpdateOp,
    pub prefix: bool,
    pub arg: Box<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `===`
    EqEqEq,
    /// `!==`
    NotEqEq,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `>>>`
    ZeroFillRShift,
}

impl BinaryOp {
    /// Relational and equality operators produce a boolean
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::EqEq
                | BinaryOp::NotEq
                | BinaryOp::EqEqEq
                | BinaryOp::NotEqEq
        )
    }

    pub fn is_equality(&self) -> bool {
        matches!(
            self,
            BinaryOp::EqEq | BinaryOp::NotEq | BinaryOp::EqEqEq | BinaryOp::NotEqEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_shift(&self) -> bool {
        matches!(
            self,
            BinaryOp::LShift | BinaryOp::RShift | BinaryOp::ZeroFillRShift
        )
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)
    }

    /// Source spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::EqEq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::EqEqEq => "===",
            BinaryOp::NotEqEq => "!==",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::ZeroFillRShift => ">>>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=`
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    LShiftAssign,
    RShiftAssign,
    ZeroFillRShiftAssign,
}

impl AssignOp {
    /// Binary operator applied by a compound assignment; `None` for plain `=`
    pub fn to_binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::BitAndAssign => Some(BinaryOp::BitAnd),
            AssignOp::BitOrAssign => Some(BinaryOp::BitOr),
            AssignOp::BitXorAssign => Some(BinaryOp::BitXor),
            AssignOp::LShiftAssign => Some(BinaryOp::LShift),
            AssignOp::RShiftAssign => Some(BinaryOp::RShift),
            AssignOp::ZeroFillRShiftAssign => Some(BinaryOp::ZeroFillRShift),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignExpr {
    pub op: AssignOp,
    /// Identifier or member expression
    pub left: Box<Expr>,
    pub right: Box<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondExpr {
    pub test: Box<Expr>,
    pub cons: Box<Expr>,
    pub alt: Box<Expr>,

    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Calls and members
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Callee {
    /// `super(...)` inside a constructor
    Super(Span),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Callee,
    pub args: Vec<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberProp {
    /// `obj.name`
    Ident(Ident),
    /// `obj[expr]`
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub obj: Box<Expr>,
    pub prop: MemberProp,

    #[serde(default)]
    pub span: Span,
}

impl MemberExpr {
    /// Property name for `obj.name` access
    pub fn prop_name(&self) -> Option<&str> {
        match &self.prop {
            MemberProp::Ident(id) => Some(id.as_str()),
            MemberProp::Computed(_) => None,
        }
    }
}

// ============================================================================
// Function literals and wrappers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrowBody {
    Block(BlockStmt),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowExpr {
    pub params: Vec<Pat>,
    pub body: ArrowBody,

    #[serde(default)]
    pub return_type: Option<TsType>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParenExpr {
    pub expr: Box<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsExpr {
    pub expr: Box<Expr>,
    pub type_ann: TsType,

    #[serde(default)]
    pub span: Span,
}

impl Expr {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Lit(Lit::Str(l)) => l.span,
            Expr::Lit(Lit::Num(l)) => l.span,
            Expr::Lit(Lit::Bool(l)) => l.span,
            Expr::Lit(Lit::Null(span)) => *span,
            Expr::Ident(id) => id.span,
            Expr::This(span) | Expr::Super(span) => *span,
            Expr::Array(e) => e.span,
            Expr::Object(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Update(e) => e.span,
            Expr::Bin(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Cond(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::New(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Arrow(e) => e.span,
            Expr::Paren(e) => e.span,
            Expr::As(e) => e.span,
            Expr::Tpl(e) => e.span,
        }
    }

    /// Strip any number of enclosing parentheses
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Paren(p) = expr {
            expr = &p.expr;
        }
        expr
    }

    /// Identifier name if this is a bare identifier
    pub fn as_ident(&self) -> Option<&str> {
        match self.unparen() {
            Expr::Ident(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Short name of the node kind for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Lit(_) => "literal",
            Expr::Ident(_) => "identifier",
            Expr::This(_) => "this",
            Expr::Super(_) => "super",
            Expr::Array(_) => "array literal",
            Expr::Object(_) => "object literal",
            Expr::Unary(_) => "unary expression",
            Expr::Update(_) => "update expression",
            Expr::Bin(_) => "binary expression",
            Expr::Assign(_) => "assignment",
            Expr::Cond(_) => "conditional expression",
            Expr::Call(_) => "call",
            Expr::New(_) => "new expression",
            Expr::Member(_) => "member expression",
            Expr::Arrow(_) => "arrow function",
            Expr::Paren(_) => "parenthesized expression",
            Expr::As(_) => "type assertion",
            Expr::Tpl(_) => "template literal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64, raw: Option<&str>) -> NumLit {
        NumLit {
            value,
            raw: raw.map(str::to_string),
            span: Span::default(),
        }
    }

    #[test]
    fn test_integral_literal_detection() {
        assert!(num(42.0, None).is_integral());
        assert!(num(42.0, Some("42")).is_integral());
        assert!(num(255.0, Some("0xFF")).is_integral());
        assert!(!num(1.0, Some("1.0")).is_integral());
        assert!(!num(1.5, None).is_integral());
        assert!(!num(100.0, Some("1e2")).is_integral());
        assert!(!num(f64::INFINITY, None).is_integral());
    }

    #[test]
    fn test_assign_op_to_binary() {
        assert_eq!(AssignOp::Assign.to_binary(), None);
        assert_eq!(AssignOp::AddAssign.to_binary(), Some(BinaryOp::Add));
        assert_eq!(
            AssignOp::ZeroFillRShiftAssign.to_binary(),
            Some(BinaryOp::ZeroFillRShift)
        );
    }

    #[test]
    fn test_unparen() {
        let inner = Expr::Ident(Ident::new("x"));
        let wrapped = Expr::Paren(ParenExpr {
            expr: Box::new(Expr::Paren(ParenExpr {
                expr: Box::new(inner.clone()),
                span: Span::default(),
            })),
            span: Span::default(),
        });
        assert_eq!(wrapped.unparen(), &inner);
        assert_eq!(wrapped.as_ident(), Some("x"));
    }
}
