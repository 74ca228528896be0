//! JVM class-file assembly
//!
//! This crate is the assembler underneath the tsjvm compiler:
//! - Constant pool with deduplication (`constants`)
//! - Instruction emission with jump placeholders and backpatching (`code`)
//! - Stack-map frame and max-stack computation (`stackmap`)
//! - Class serialization (`class_writer`) and decoding (`reader`)
//! - Disassembly and structural verification for tooling and tests

pub mod class_writer;
pub mod code;
pub mod constants;
pub mod descriptor;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod instruction;
pub mod opcode;
pub mod reader;
pub mod stackmap;
pub mod verify;

pub use class_writer::{access, ClassWriter, ClassVersion, CodeAttribute, FieldDef, MethodDef};
pub use code::{CodeBuilder, ExceptionEntry, LocalKind};
pub use constants::{Constant, ConstantPool};
pub use encoder::{ByteReader, ByteWriter, DecodeError};
pub use error::ClassFileError;
pub use frame::{StackMapFrame, VerificationType};
pub use instruction::{Instruction, Operand};
pub use opcode::Opcode;
pub use reader::ClassFile;
pub use stackmap::{ClassHierarchy, FrameAnalysis, FrameAnalyzer, ObjectHierarchy};
pub use verify::{verify_class, VerifyError};

/// Class-file magic number
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Largest code array the format allows
pub const MAX_CODE_LENGTH: usize = 65_535;
