//! Source positions and identifiers

use serde::{Deserialize, Serialize};

/// Byte range in the original source text.
///
/// The backend never reads source text; spans only travel into diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: u32,
    /// End offset (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a span from two offsets
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn combine(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A name as written in source (`foo`, `Color`, `a.b` for dotted namespace ids)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,

    #[serde(default)]
    pub span: Span,
}

impl Ident {
    /// Create an identifier with an empty span
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
