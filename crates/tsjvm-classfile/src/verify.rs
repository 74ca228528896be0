//! Structural verification of decoded classes
//!
//! Not a bytecode type checker. These checks catch assembler mistakes that
//! would otherwise surface as `ClassFormatError` or `VerifyError` at load
//! time: misplaced branch targets, dangling pool references, broken
//! exception ranges, missing frames, and code that can run off its end.

use crate::constants::Constant;
use crate::instruction::{decode_all, Instruction, Operand};
use crate::opcode::Opcode;
use crate::reader::{ClassFile, Member};
use std::collections::BTreeSet;
use thiserror::Error;

/// A structural problem in one method
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerifyError {
    #[error("{method}: cannot decode code: {message}")]
    Undecodable { method: String, message: String },

    #[error("{method}: branch at {pc} targets {target}, which is not an instruction")]
    BadBranchTarget {
        method: String,
        pc: usize,
        target: usize,
    },

    #[error("{method}: instruction at {pc} uses constant #{index} of the wrong kind")]
    BadConstant { method: String, pc: usize, index: u16 },

    #[error("{method}: local {slot} at {pc} is outside max_locals {max_locals}")]
    LocalOutOfRange {
        method: String,
        pc: usize,
        slot: u16,
        max_locals: u16,
    },

    #[error("{method}: exception range {start}..{end} handler {handler} is invalid")]
    BadExceptionRange {
        method: String,
        start: u16,
        end: u16,
        handler: u16,
    },

    #[error("{method}: execution can fall off the end of the code")]
    FallsOffEnd { method: String },

    #[error("{method}: no stack map frame at {pc}")]
    MissingFrame { method: String, pc: usize },

    #[error("{method}: abstract method has code, or concrete method has none")]
    CodePresence { method: String },
}

/// Check every method of a class
pub fn verify_class(class: &ClassFile) -> Result<(), VerifyError> {
    for method in &class.methods {
        verify_method(class, method)?;
    }
    Ok(())
}

fn verify_method(class: &ClassFile, method: &Member) -> Result<(), VerifyError> {
    let name = format!("{}.{}{}", class.this_class, method.name, method.descriptor);
    let expects_code = !method.is_abstract() && method.access & crate::access::NATIVE == 0;
    let code = match (&method.code, expects_code) {
        (Some(code), true) => code,
        (None, false) => return Ok(()),
        _ => return Err(VerifyError::CodePresence { method: name }),
    };

    let insns = decode_all(&code.code).map_err(|e| VerifyError::Undecodable {
        method: name.clone(),
        message: e.to_string(),
    })?;
    let boundaries: BTreeSet<usize> = insns.iter().map(|i| i.pc).collect();

    let mut targets = BTreeSet::new();
    for insn in &insns {
        if let Some(target) = insn.branch_target() {
            if !boundaries.contains(&target) {
                return Err(VerifyError::BadBranchTarget {
                    method: name,
                    pc: insn.pc,
                    target,
                });
            }
            targets.insert(target);
        }
        check_constant(class, insn).map_err(|index| VerifyError::BadConstant {
            method: name.clone(),
            pc: insn.pc,
            index,
        })?;
        if let Some(slot) = insn.local_index() {
            let width = if matches!(
                insn.opcode,
                Opcode::Lload
                    | Opcode::Dload
                    | Opcode::Lstore
                    | Opcode::Dstore
                    | Opcode::Lload0
                    | Opcode::Lload1
                    | Opcode::Lload2
                    | Opcode::Lload3
                    | Opcode::Dload0
                    | Opcode::Dload1
                    | Opcode::Dload2
                    | Opcode::Dload3
                    | Opcode::Lstore0
                    | Opcode::Lstore1
                    | Opcode::Lstore2
                    | Opcode::Lstore3
                    | Opcode::Dstore0
                    | Opcode::Dstore1
                    | Opcode::Dstore2
                    | Opcode::Dstore3
            ) {
                2
            } else {
                1
            };
            if slot as u32 + width > code.max_locals as u32 {
                return Err(VerifyError::LocalOutOfRange {
                    method: name,
                    pc: insn.pc,
                    slot,
                    max_locals: code.max_locals,
                });
            }
        }
    }

    if let Some(last) = insns.last() {
        if !last.opcode.is_terminator() {
            return Err(VerifyError::FallsOffEnd { method: name });
        }
    }

    for entry in &code.exception_table {
        let valid = entry.start_pc < entry.end_pc
            && boundaries.contains(&(entry.start_pc as usize))
            && (boundaries.contains(&(entry.end_pc as usize))
                || entry.end_pc as usize == code.code.len())
            && boundaries.contains(&(entry.handler_pc as usize))
            && (entry.catch_type == 0 || class.pool.class_name_at(entry.catch_type).is_some());
        if !valid {
            return Err(VerifyError::BadExceptionRange {
                method: name,
                start: entry.start_pc,
                end: entry.end_pc,
                handler: entry.handler_pc,
            });
        }
        targets.insert(entry.handler_pc as usize);
    }

    if class.version.requires_stack_map() && !targets.is_empty() {
        let frames = class.frames(method).map_err(|e| VerifyError::Undecodable {
            method: name.clone(),
            message: e.to_string(),
        })?;
        let framed: BTreeSet<usize> = frames.iter().map(|f| f.offset).collect();
        if let Some(&pc) = targets.iter().find(|pc| !framed.contains(pc)) {
            return Err(VerifyError::MissingFrame { method: name, pc });
        }
    }
    Ok(())
}

/// Constant operands must point at an entry of the kind the opcode expects
fn check_constant(class: &ClassFile, insn: &Instruction) -> Result<(), u16> {
    let index = match insn.operand {
        Operand::Constant(index) | Operand::Interface { index, .. } => index,
        _ => return Ok(()),
    };
    let pool = &class.pool;
    let entry = pool.get(index).ok_or(index)?;
    let ok = match insn.opcode {
        Opcode::Ldc | Opcode::LdcW => matches!(
            entry,
            Constant::Integer(_) | Constant::Float(_) | Constant::String(_) | Constant::Class(_)
        ),
        Opcode::Ldc2W => matches!(entry, Constant::Long(_) | Constant::Double(_)),
        Opcode::Getstatic | Opcode::Putstatic | Opcode::Getfield | Opcode::Putfield => {
            matches!(entry, Constant::Fieldref { .. })
        }
        Opcode::Invokevirtual | Opcode::Invokestatic => matches!(entry, Constant::Methodref { .. }),
        Opcode::Invokespecial => matches!(
            entry,
            Constant::Methodref { .. } | Constant::InterfaceMethodref { .. }
        ),
        Opcode::Invokeinterface => matches!(entry, Constant::InterfaceMethodref { .. }),
        Opcode::New | Opcode::Anewarray | Opcode::Checkcast | Opcode::Instanceof => {
            matches!(entry, Constant::Class(_))
        }
        _ => true,
    };
    let resolvable = match entry {
        Constant::Fieldref { .. }
        | Constant::Methodref { .. }
        | Constant::InterfaceMethodref { .. } => {
            pool.member_ref_at(index).is_some()
        }
        Constant::Class(_) => pool.class_name_at(index).is_some(),
        Constant::String(_) => pool.string_at(index).is_some(),
        _ => true,
    };
    if ok && resolvable {
        Ok(())
    } else {
        Err(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_writer::{access, ClassVersion, ClassWriter};
    use crate::code::{CodeBuilder, LocalKind};
    use crate::reader::CodeInfo;

    fn build(f: impl FnOnce(&mut ClassWriter)) -> ClassFile {
        let mut class = ClassWriter::new(
            ClassVersion::JAVA_17,
            access::PUBLIC | access::SUPER,
            "Check",
            "java/lang/Object",
        );
        f(&mut class);
        ClassFile::parse(&class.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_valid_loop_passes() {
        let class = build(|class| {
            let mut code = CodeBuilder::new();
            code.push_int(class.pool(), 0);
            code.store(LocalKind::Int, 0);
            let head = code.offset();
            code.iinc(0, 1);
            code.load(LocalKind::Int, 0);
            code.push_int(class.pool(), 3);
            code.jump_to(Opcode::IfIcmplt, head).unwrap();
            code.emit(Opcode::Return);
            class
                .add_method_code(access::STATIC, "spin", "()V", code, 0)
                .unwrap();
        });
        assert_eq!(verify_class(&class), Ok(()));
    }

    #[test]
    fn test_branch_into_instruction_is_rejected() {
        let mut class = build(|class| {
            let mut code = CodeBuilder::new();
            code.emit(Opcode::Return);
            class
                .add_method_code(access::STATIC, "f", "()V", code, 0)
                .unwrap();
        });
        // goto +1 lands inside its own operand
        class.methods[0].code = Some(CodeInfo {
            max_stack: 0,
            max_locals: 0,
            code: vec![0xa7, 0x00, 0x01],
            exception_table: Vec::new(),
            stack_map: None,
        });
        assert!(matches!(
            verify_class(&class),
            Err(VerifyError::BadBranchTarget { target: 1, .. })
        ));
    }

    #[test]
    fn test_missing_return_is_rejected() {
        let mut class = build(|class| {
            let mut code = CodeBuilder::new();
            code.emit(Opcode::Return);
            class
                .add_method_code(access::STATIC, "f", "()V", code, 0)
                .unwrap();
        });
        if let Some(code) = class.methods[0].code.as_mut() {
            code.code = vec![Opcode::Nop.to_u8()];
        }
        assert!(matches!(
            verify_class(&class),
            Err(VerifyError::FallsOffEnd { .. })
        ));
    }
}
