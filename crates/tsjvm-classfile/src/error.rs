//! Assembly errors

use thiserror::Error;

/// Errors raised while assembling a class
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassFileError {
    #[error("Constant pool overflow: {0} entries")]
    ConstantPoolOverflow(usize),

    #[error("Branch from {from} to {to} does not fit a 16-bit offset")]
    BranchOutOfRange { from: usize, to: usize },

    #[error("Method code too large: {0} bytes")]
    CodeTooLarge(usize),

    #[error("Too many {what}: {count}")]
    TooMany { what: &'static str, count: usize },

    #[error("Frame analysis failed at offset {offset}: {message}")]
    FrameAnalysis { offset: usize, message: String },

    #[error("Bad constant pool reference {0}")]
    BadConstantRef(u16),
}

impl ClassFileError {
    pub(crate) fn frame(offset: usize, message: impl Into<String>) -> Self {
        ClassFileError::FrameAnalysis {
            offset,
            message: message.into(),
        }
    }
}
