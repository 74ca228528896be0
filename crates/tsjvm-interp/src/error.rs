//! Interpreter errors

use thiserror::Error;

/// Errors that stop execution
///
/// A Java exception that nothing catches surfaces as [`VmError::Uncaught`];
/// everything else means the bytecode asked for something this interpreter
/// cannot provide.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    /// Class bytes could not be decoded
    #[error("Malformed class: {0}")]
    Malformed(String),

    /// Class is neither loaded nor built in
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// No method with this name and descriptor
    #[error("Unknown method: {owner}.{name}{descriptor}")]
    UnknownMethod {
        /// Owner class (internal name)
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
    },

    /// No field with this name
    #[error("Unknown field: {owner}.{name}")]
    UnknownField {
        /// Owner class (internal name)
        owner: String,
        /// Field name
        name: String,
    },

    /// Operand stack popped while empty
    #[error("Stack underflow")]
    StackUnderflow,

    /// Value of the wrong kind for an instruction
    #[error("Type confusion: {0}")]
    TypeConfusion(String),

    /// Exception propagated out of the entry method
    #[error("Uncaught exception {class}: {}", .message.as_deref().unwrap_or("null"))]
    Uncaught {
        /// Dotted class name of the thrown object
        class: String,
        /// Its message, when it has one
        message: Option<String>,
    },

    /// Execution ran longer than the configured step limit
    #[error("Step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),

    /// Call depth exceeded
    #[error("Stack overflow")]
    StackOverflow,
}

/// Interpreter result
pub type VmResult<T> = Result<T, VmError>;
