//! Binding patterns

use crate::span::{Ident, Span};
use crate::types::TsType;
use serde::{Deserialize, Serialize};

/// Binding target of a declaration or parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pat {
    /// Simple binding: `x` or `x: int`
    Ident(BindingIdent),

    /// Array destructuring: `[a, , b]`
    Array(ArrayPat),

    /// Object destructuring: `{ a, b }`
    Object(ObjectPat),
}

/// Identifier binding with an optional annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingIdent {
    pub id: Ident,

    #[serde(default)]
    pub type_ann: Option<TsType>,
}

/// Array destructuring pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayPat {
    /// Elements; `None` marks a hole
    pub elems: Vec<Option<Pat>>,

    #[serde(default)]
    pub type_ann: Option<TsType>,

    #[serde(default)]
    pub span: Span,
}

/// Object destructuring pattern (shorthand properties only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPat {
    pub props: Vec<Ident>,

    #[serde(default)]
    pub type_ann: Option<TsType>,

    #[serde(default)]
    pub span: Span,
}

impl Pat {
    /// Binding name when the pattern is a plain identifier
    pub fn as_ident(&self) -> Option<&BindingIdent> {
        match self {
            Pat::Ident(b) => Some(b),
            _ => None,
        }
    }

    /// Every name this pattern binds, in source order
    pub fn bound_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pat::Ident(b) => out.push(b.id.as_str()),
            Pat::Array(a) => {
                for p in a.elems.iter().flatten() {
                    p.collect_names(out);
                }
            }
            Pat::Object(o) => out.extend(o.props.iter().map(|p| p.as_str())),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Pat::Ident(b) => b.id.span,
            Pat::Array(a) => a.span,
            Pat::Object(o) => o.span,
        }
    }
}
