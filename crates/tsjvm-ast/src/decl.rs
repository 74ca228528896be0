//! Declaration nodes
//!
//! Classes, interfaces, enums, type aliases, functions, namespaces and
//! variables. Every declaration that can be ambient carries a `declare` flag;
//! ambient declarations describe shapes defined elsewhere and produce no code.

use crate::expr::Expr;
use crate::pat::{BindingIdent, Pat};
use crate::span::{Ident, Span};
use crate::stmt::{BlockStmt, Stmt};
use crate::types::{TsType, TypeParam};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Function(FnDecl),
    Namespace(NamespaceDecl),
    Var(VarDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Class(d) => d.span,
            Decl::Interface(d) => d.span,
            Decl::Enum(d) => d.span,
            Decl::TypeAlias(d) => d.span,
            Decl::Function(d) => d.span,
            Decl::Namespace(d) => d.span,
            Decl::Var(d) => d.span,
        }
    }

    /// Whether this is an ambient (`declare`) declaration
    pub fn is_ambient(&self) -> bool {
        match self {
            Decl::Class(d) => d.declare,
            Decl::Interface(d) => d.declare,
            Decl::Enum(d) => d.declare,
            Decl::TypeAlias(d) => d.declare,
            Decl::Function(d) => d.declare,
            Decl::Namespace(d) => d.declare,
            Decl::Var(d) => d.declare,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub pat: Pat,

    #[serde(default)]
    pub span: Span,
}

/// Shared shape of functions, methods and constructors
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Function {
    pub params: Vec<Param>,

    /// Absent for abstract methods and overload signatures
    #[serde(default)]
    pub body: Option<BlockStmt>,

    #[serde(default)]
    pub return_type: Option<TsType>,

    #[serde(default)]
    pub type_params: Vec<TypeParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub ident: Ident,

    #[serde(default)]
    pub declare: bool,

    pub function: Function,

    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub ident: Ident,

    #[serde(default)]
    pub declare: bool,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub type_params: Vec<TypeParam>,

    /// `extends` clause
    #[serde(default)]
    pub super_class: Option<Ident>,

    /// `implements` clause
    #[serde(default)]
    pub implements: Vec<Ident>,

    pub body: Vec<ClassMember>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMember {
    Constructor(Constructor),
    Method(ClassMethod),
    Property(ClassProp),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    pub params: Vec<Param>,
    pub body: BlockStmt,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MethodKind {
    #[default]
    Method,
    Getter,
    Setter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMethod {
    pub key: Ident,

    #[serde(default)]
    pub kind: MethodKind,

    pub function: Function,

    #[serde(default)]
    pub is_static: bool,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProp {
    pub key: Ident,

    #[serde(default)]
    pub type_ann: Option<TsType>,

    #[serde(default)]
    pub value: Option<Expr>,

    #[serde(default)]
    pub is_static: bool,

    #[serde(default)]
    pub readonly: bool,

    #[serde(default)]
    pub span: Span,
}

// ============================================================================
// Interfaces
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub ident: Ident,

    #[serde(default)]
    pub declare: bool,

    #[serde(default)]
    pub type_params: Vec<TypeParam>,

    #[serde(default)]
    pub extends: Vec<Ident>,

    pub body: Vec<InterfaceMember>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InterfaceMember {
    /// `name: T` / `readonly name: T`
    Property(PropSignature),
    /// `name(a: A): R`
    Method(MethodSignature),
    /// `get name(): T`
    Getter(GetterSignature),
    /// `set name(v: T)`
    Setter(SetterSignature),
    /// `[key: K]: V`
    Index(IndexSignature),
    /// `(a: A): R`
    Call(CallSignature),
    /// `new (a: A): R`
    Construct(CallSignature),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSignature {
    pub key: Ident,

    #[serde(default)]
    pub type_ann: Option<TsType>,

    #[serde(default)]
    pub readonly: bool,

    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub key: Ident,
    pub params: Vec<BindingIdent>,

    #[serde(default)]
    pub return_type: Option<TsType>,

    #[serde(default)]
    pub type_params: Vec<TypeParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetterSignature {
    pub key: Ident,

    #[serde(default)]
    pub type_ann: Option<TsType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetterSignature {
    pub key: Ident,
    pub param: BindingIdent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSignature {
    pub param: BindingIdent,

    #[serde(default)]
    pub type_ann: Option<TsType>,

    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSignature {
    pub params: Vec<BindingIdent>,

    #[serde(default)]
    pub return_type: Option<TsType>,
}

// ============================================================================
// Enums, aliases, namespaces, variables
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub ident: Ident,

    #[serde(default)]
    pub declare: bool,

    #[serde(default)]
    pub is_const: bool,

    pub members: Vec<EnumMember>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub id: Ident,

    /// Initializer as written; ordinals ignore it
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub ident: Ident,

    #[serde(default)]
    pub declare: bool,

    #[serde(default)]
    pub type_params: Vec<TypeParam>,

    pub type_ann: TsType,

    #[serde(default)]
    pub span: Span,
}

/// `namespace a.b { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    /// Possibly dotted name
    pub id: Ident,

    #[serde(default)]
    pub declare: bool,

    pub body: Vec<Stmt>,

    #[serde(default)]
    pub span: Span,
}

impl NamespaceDecl {
    /// Name segments of a dotted namespace id
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.id.name.split('.').filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub kind: VarKind,

    #[serde(default)]
    pub declare: bool,

    pub decls: Vec<VarDeclarator>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDeclarator {
    pub name: Pat,

    #[serde(default)]
    pub init: Option<Box<Expr>>,
}
