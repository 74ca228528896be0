//! Compilation errors

use thiserror::Error;
use tsjvm_classfile::ClassFileError;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    #[error("Unknown method {name} on {owner}")]
    UnknownMethod { owner: String, name: String },

    #[error("Unknown field {name} on {owner}")]
    UnknownField { owner: String, name: String },

    #[error("Label '{label}' is not defined in any enclosing statement")]
    UnknownLabel { label: String },

    #[error("Invalid break statement (not in loop or switch)")]
    InvalidBreak,

    #[error("Invalid continue statement (not in loop)")]
    InvalidContinue,

    #[error("Cannot assign to constant '{name}'")]
    AssignToConst { name: String },

    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("No functional interface matches {descriptor}")]
    UnsupportedFunctionalSignature { descriptor: String },

    #[error("Enum {name}: {message}")]
    EnumError { name: String, message: String },

    #[error("Type mismatch: cannot convert {from} to {to}")]
    TypeMismatch { from: String, to: String },

    #[error("Class file assembly failed: {0}")]
    ClassFile(#[from] ClassFileError),

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },

    #[error("Failed to compile {qualified_name}: {source}")]
    InDeclaration {
        qualified_name: String,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    pub fn unsupported(feature: impl Into<String>) -> Self {
        CompileError::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::InternalError {
            message: message.into(),
        }
    }

    /// Attach the declaration being compiled; an error already carrying a
    /// name keeps the innermost one
    pub fn in_declaration(self, qualified_name: &str) -> Self {
        match self {
            CompileError::InDeclaration { .. } => self,
            other => CompileError::InDeclaration {
                qualified_name: qualified_name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any declaration context stripped
    pub fn root(&self) -> &CompileError {
        match self {
            CompileError::InDeclaration { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Outcome of a best-effort analysis during declaration collection
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis<T> {
    Resolved(T),
    Skipped { reason: String },
}

impl<T> Analysis<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Analysis::Skipped {
            reason: reason.into(),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Analysis::Resolved(value) => Some(value),
            Analysis::Skipped { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Analysis::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_declaration_keeps_innermost_name() {
        let err = CompileError::InvalidBreak
            .in_declaration("a.Foo.run")
            .in_declaration("a.Foo");
        match &err {
            CompileError::InDeclaration { qualified_name, .. } => {
                assert_eq!(qualified_name, "a.Foo.run")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.root(), &CompileError::InvalidBreak);
        assert!(err.to_string().contains("a.Foo.run"));
    }

    #[test]
    fn test_analysis_ok() {
        assert_eq!(Analysis::Resolved(3).ok(), Some(3));
        assert_eq!(Analysis::<i32>::skipped("no return").ok(), None);
    }
}
