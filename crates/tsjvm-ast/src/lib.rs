//! tsjvm syntax tree
//!
//! The tree handed to the class-file backend by an external TypeScript parser.
//! Every node category (declaration, statement, expression, pattern, type) is a
//! sum type so consumers can match exhaustively. Nodes are plain data: the
//! backend only borrows them, never mutates them.
//!
//! All nodes derive serde traits so a parser living in another process can
//! hand the tree over as JSON.

pub mod decl;
pub mod expr;
pub mod factory;
pub mod pat;
pub mod span;
pub mod stmt;
pub mod types;
pub mod visitor;

pub use decl::*;
pub use expr::*;
pub use pat::*;
pub use span::{Ident, Span};
pub use stmt::*;
pub use types::*;
pub use visitor::*;

use serde::{Deserialize, Serialize};

/// A compilation unit: the ordered statements of one source file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Module {
    /// Top-level statements
    pub body: Vec<Stmt>,

    #[serde(default)]
    pub span: Span,
}

impl Module {
    /// Create a module from its top-level statements
    pub fn new(body: Vec<Stmt>) -> Self {
        Self {
            body,
            span: Span::default(),
        }
    }
}
