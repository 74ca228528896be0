//! Type annotation nodes

use crate::pat::BindingIdent;
use crate::span::{Ident, Span};
use serde::{Deserialize, Serialize};

/// Type annotation syntax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TsType {
    /// Built-in keyword type: `number`, `string`, `void`, ...
    Keyword(TsKeywordType),

    /// Named type reference with optional type arguments: `Foo`, `ns.Bar<T>`, `Record<string, int>`
    Ref(TsTypeRef),

    /// Array type: `T[]`
    Array(Box<TsType>),

    /// Union type: `T | null`
    Union(Vec<TsType>),

    /// Function type: `(x: int) => int`
    Fn(TsFnType),
}

/// Keyword types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TsKeywordType {
    Number,
    String,
    Boolean,
    BigInt,
    Void,
    Any,
    Unknown,
    Object,
    Null,
    Undefined,
    Never,
    Symbol,
}

impl TsKeywordType {
    /// Source spelling of the keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            TsKeywordType::Number => "number",
            TsKeywordType::String => "string",
            TsKeywordType::Boolean => "boolean",
            TsKeywordType::BigInt => "bigint",
            TsKeywordType::Void => "void",
            TsKeywordType::Any => "any",
            TsKeywordType::Unknown => "unknown",
            TsKeywordType::Object => "object",
            TsKeywordType::Null => "null",
            TsKeywordType::Undefined => "undefined",
            TsKeywordType::Never => "never",
            TsKeywordType::Symbol => "symbol",
        }
    }
}

/// Named type reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsTypeRef {
    /// Possibly dotted name (`ns.Foo`)
    pub name: String,

    #[serde(default)]
    pub type_args: Vec<TsType>,

    #[serde(default)]
    pub span: Span,
}

/// Function type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsFnType {
    pub params: Vec<BindingIdent>,
    pub return_type: Box<TsType>,
}

/// Generic type parameter: `T extends Bound`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: Ident,

    #[serde(default)]
    pub constraint: Option<TsType>,
}

impl TsType {
    /// Reference to a named type without type arguments
    pub fn named(name: impl Into<String>) -> Self {
        TsType::Ref(TsTypeRef {
            name: name.into(),
            type_args: Vec::new(),
            span: Span::default(),
        })
    }

    /// True for `null` / `undefined` keyword types
    pub fn is_nullish(&self) -> bool {
        matches!(
            self,
            TsType::Keyword(TsKeywordType::Null) | TsType::Keyword(TsKeywordType::Undefined)
        )
    }
}
