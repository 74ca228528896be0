//! Statement nodes
//!
//! Control flow statements (if, loops, switch, try) plus the wrapper that lets
//! declarations appear wherever statements do.

use crate::decl::{Decl, VarDecl};
use crate::expr::Expr;
use crate::pat::Pat;
use crate::span::{Ident, Span};
use serde::{Deserialize, Serialize};

/// Top-level or block-level statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Declaration (class, function, variable, ...)
    Decl(Decl),

    /// Expression statement
    Expr(ExprStmt),

    /// `{ ... }`
    Block(BlockStmt),

    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    ForOf(ForOfStmt),
    ForIn(ForInStmt),

    /// `label: stmt`
    Labeled(LabeledStmt),

    Break(BreakStmt),
    Continue(ContinueStmt),
    Throw(ThrowStmt),
    Try(TryStmt),
    Switch(SwitchStmt),

    /// Empty statement (`;`)
    Empty(Span),
}

impl Stmt {
    /// Get the span of this statement
    pub fn span(&self) -> Span {
        match self {
            Stmt::Decl(d) => d.span(),
            Stmt::Expr(s) => s.span,
            Stmt::Block(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::DoWhile(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::ForOf(s) => s.span,
            Stmt::ForIn(s) => s.span,
            Stmt::Labeled(s) => s.span,
            Stmt::Break(s) => s.span,
            Stmt::Continue(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Empty(span) => *span,
        }
    }

    /// Loops are the only valid targets of `continue`
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Stmt::While(_) | Stmt::DoWhile(_) | Stmt::For(_) | Stmt::ForOf(_) | Stmt::ForIn(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,

    #[serde(default)]
    pub span: Span,
}

impl BlockStmt {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    #[serde(default)]
    pub arg: Option<Expr>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub test: Expr,
    pub cons: Box<Stmt>,

    #[serde(default)]
    pub alt: Option<Box<Stmt>>,

    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Loops
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Box<Stmt>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoWhileStmt {
    pub body: Box<Stmt>,
    pub test: Expr,

    #[serde(default)]
    pub span: Span,
}

/// `for (init; test; update) body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStmt {
    #[serde(default)]
    pub init: Option<ForInit>,

    #[serde(default)]
    pub test: Option<Expr>,

    #[serde(default)]
    pub update: Option<Expr>,

    pub body: Box<Stmt>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    VarDecl(VarDecl),
    Expr(Expr),
}

/// Left side of `for ... of` / `for ... in`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForHead {
    /// `for (let x of ...)`
    VarDecl(VarDecl),
    /// `for (x of ...)` assigning to an existing binding
    Pat(Pat),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForOfStmt {
    pub left: ForHead,
    pub right: Expr,
    pub body: Box<Stmt>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForInStmt {
    pub left: ForHead,
    pub right: Expr,
    pub body: Box<Stmt>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledStmt {
    pub label: Ident,
    pub body: Box<Stmt>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakStmt {
    #[serde(default)]
    pub label: Option<Ident>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueStmt {
    #[serde(default)]
    pub label: Option<Ident>,

    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Exceptions and switch
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStmt {
    pub arg: Expr,

    #[serde(default)]
    pub span: Span,
}

/// `try { } catch (e) { } finally { }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStmt {
    pub block: BlockStmt,

    #[serde(default)]
    pub handler: Option<CatchClause>,

    #[serde(default)]
    pub finalizer: Option<BlockStmt>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// `catch (e)`; absent for `catch { }`
    #[serde(default)]
    pub param: Option<Pat>,

    pub body: BlockStmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStmt {
    pub discriminant: Expr,
    pub cases: Vec<SwitchCase>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for `default:`
    #[serde(default)]
    pub test: Option<Expr>,

    pub cons: Vec<Stmt>,
}
