//! Method body assembly
//!
//! `CodeBuilder` appends instructions to a code array and keeps the exception
//! table. Forward jumps are emitted with a zero placeholder; the caller keeps
//! the returned opcode offset and rewrites the operand with
//! [`CodeBuilder::patch_jump`] once the target is known.

use crate::constants::ConstantPool;
use crate::encoder::ByteWriter;
use crate::error::ClassFileError;
use crate::opcode::Opcode;
use crate::MAX_CODE_LENGTH;

/// Computational category of a local slot or stack value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl LocalKind {
    /// Kind of a field descriptor (`I`, `Z`, `J`, `Ljava/lang/String;`, `[I`, ...)
    pub fn from_descriptor(descriptor: &str) -> LocalKind {
        match descriptor.as_bytes().first() {
            Some(b'Z' | b'B' | b'C' | b'S' | b'I') => LocalKind::Int,
            Some(b'J') => LocalKind::Long,
            Some(b'F') => LocalKind::Float,
            Some(b'D') => LocalKind::Double,
            _ => LocalKind::Reference,
        }
    }

    /// Long and double values take two slots
    pub fn is_wide(self) -> bool {
        matches!(self, LocalKind::Long | LocalKind::Double)
    }

    pub fn slots(self) -> u16 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    fn load_ops(self) -> (Opcode, u8) {
        match self {
            LocalKind::Int => (Opcode::Iload, Opcode::Iload0.to_u8()),
            LocalKind::Long => (Opcode::Lload, Opcode::Lload0.to_u8()),
            LocalKind::Float => (Opcode::Fload, Opcode::Fload0.to_u8()),
            LocalKind::Double => (Opcode::Dload, Opcode::Dload0.to_u8()),
            LocalKind::Reference => (Opcode::Aload, Opcode::Aload0.to_u8()),
        }
    }

    fn store_ops(self) -> (Opcode, u8) {
        match self {
            LocalKind::Int => (Opcode::Istore, Opcode::Istore0.to_u8()),
            LocalKind::Long => (Opcode::Lstore, Opcode::Lstore0.to_u8()),
            LocalKind::Float => (Opcode::Fstore, Opcode::Fstore0.to_u8()),
            LocalKind::Double => (Opcode::Dstore, Opcode::Dstore0.to_u8()),
            LocalKind::Reference => (Opcode::Astore, Opcode::Astore0.to_u8()),
        }
    }
}

/// `newarray` element type code for a primitive descriptor
pub fn array_type_code(elem_descriptor: &str) -> Option<u8> {
    Some(match elem_descriptor {
        "Z" => 4,
        "C" => 5,
        "F" => 6,
        "D" => 7,
        "B" => 8,
        "S" => 9,
        "I" => 10,
        "J" => 11,
        _ => return None,
    })
}

/// Primitive descriptor for a `newarray` element type code
pub fn array_type_descriptor(code: u8) -> Option<&'static str> {
    Some(match code {
        4 => "Z",
        5 => "C",
        6 => "F",
        7 => "D",
        8 => "B",
        9 => "S",
        10 => "I",
        11 => "J",
        _ => return None,
    })
}

/// Exception table entry; `catch_type == 0` catches everything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// Code array under construction
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    code: ByteWriter,
    exception_table: Vec<ExceptionEntry>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next instruction will be written at
    pub fn offset(&self) -> usize {
        self.code.offset()
    }

    pub fn bytes(&self) -> &[u8] {
        self.code.buffer()
    }

    pub fn exception_table(&self) -> &[ExceptionEntry] {
        &self.exception_table
    }

    /// Consume the builder, checking the code-length limit
    pub fn finish(self) -> Result<(Vec<u8>, Vec<ExceptionEntry>), ClassFileError> {
        let len = self.code.offset();
        if len == 0 || len > MAX_CODE_LENGTH {
            return Err(ClassFileError::CodeTooLarge(len));
        }
        Ok((self.code.into_bytes(), self.exception_table))
    }

    // ===== Raw emission =====

    /// Instruction without operands
    pub fn emit(&mut self, op: Opcode) {
        self.code.emit_u8(op.to_u8());
    }

    pub fn emit_u8_operand(&mut self, op: Opcode, operand: u8) {
        self.code.emit_u8(op.to_u8());
        self.code.emit_u8(operand);
    }

    pub fn emit_u16_operand(&mut self, op: Opcode, operand: u16) {
        self.code.emit_u8(op.to_u8());
        self.code.emit_u16(operand);
    }

    // ===== Constants =====

    /// Push an int using the most compact encoding
    pub fn push_int(&mut self, pool: &mut ConstantPool, value: i32) {
        match value {
            -1..=5 => {
                let op = Opcode::from_u8((Opcode::Iconst0.to_u8() as i32 + value) as u8);
                self.emit(op.unwrap_or(Opcode::Iconst0));
            }
            -128..=127 => self.emit_u8_operand(Opcode::Bipush, value as i8 as u8),
            -32768..=32767 => self.emit_u16_operand(Opcode::Sipush, value as i16 as u16),
            _ => {
                let idx = pool.integer(value);
                self.ldc(idx);
            }
        }
    }

    pub fn push_long(&mut self, pool: &mut ConstantPool, value: i64) {
        match value {
            0 => self.emit(Opcode::Lconst0),
            1 => self.emit(Opcode::Lconst1),
            _ => {
                let idx = pool.long(value);
                self.emit_u16_operand(Opcode::Ldc2W, idx);
            }
        }
    }

    pub fn push_float(&mut self, pool: &mut ConstantPool, value: f32) {
        // compare bits so -0.0 goes through the pool
        if value.to_bits() == 0.0f32.to_bits() {
            self.emit(Opcode::Fconst0);
        } else if value == 1.0 {
            self.emit(Opcode::Fconst1);
        } else if value == 2.0 {
            self.emit(Opcode::Fconst2);
        } else {
            let idx = pool.float(value);
            self.ldc(idx);
        }
    }

    pub fn push_double(&mut self, pool: &mut ConstantPool, value: f64) {
        if value.to_bits() == 0.0f64.to_bits() {
            self.emit(Opcode::Dconst0);
        } else if value == 1.0 {
            self.emit(Opcode::Dconst1);
        } else {
            let idx = pool.double(value);
            self.emit_u16_operand(Opcode::Ldc2W, idx);
        }
    }

    pub fn push_string(&mut self, pool: &mut ConstantPool, value: &str) {
        let idx = pool.string(value);
        self.ldc(idx);
    }

    /// `ldc` or `ldc_w` depending on the index width
    pub fn ldc(&mut self, index: u16) {
        if index <= u8::MAX as u16 {
            self.emit_u8_operand(Opcode::Ldc, index as u8);
        } else {
            self.emit_u16_operand(Opcode::LdcW, index);
        }
    }

    // ===== Locals =====

    fn local_op(&mut self, (op, short_base): (Opcode, u8), slot: u16) {
        if slot <= 3 {
            self.code.emit_u8(short_base + slot as u8);
        } else if slot <= u8::MAX as u16 {
            self.emit_u8_operand(op, slot as u8);
        } else {
            self.emit(Opcode::Wide);
            self.emit_u16_operand(op, slot);
        }
    }

    pub fn load(&mut self, kind: LocalKind, slot: u16) {
        self.local_op(kind.load_ops(), slot);
    }

    pub fn store(&mut self, kind: LocalKind, slot: u16) {
        self.local_op(kind.store_ops(), slot);
    }

    pub fn iinc(&mut self, slot: u16, delta: i16) {
        if slot <= u8::MAX as u16 && (i8::MIN as i16..=i8::MAX as i16).contains(&delta) {
            self.code.emit_u8(Opcode::Iinc.to_u8());
            self.code.emit_u8(slot as u8);
            self.code.emit_i8(delta as i8);
        } else {
            self.emit(Opcode::Wide);
            self.code.emit_u8(Opcode::Iinc.to_u8());
            self.code.emit_u16(slot);
            self.code.emit_i16(delta);
        }
    }

    // ===== Branches =====

    /// Emit a branch with a placeholder offset; returns the opcode offset to patch
    pub fn jump(&mut self, op: Opcode) -> usize {
        let at = self.offset();
        self.emit_u16_operand(op, 0);
        at
    }

    /// Emit a branch to an already known target
    pub fn jump_to(&mut self, op: Opcode, target: usize) -> Result<(), ClassFileError> {
        let at = self.jump(op);
        self.patch_jump(at, target)
    }

    /// Rewrite the offset of the branch whose opcode sits at `at`
    pub fn patch_jump(&mut self, at: usize, target: usize) -> Result<(), ClassFileError> {
        let delta = target as i64 - at as i64;
        if delta < i16::MIN as i64 || delta > i16::MAX as i64 {
            return Err(ClassFileError::BranchOutOfRange {
                from: at,
                to: target,
            });
        }
        self.code.patch_i16(at + 1, delta as i16);
        Ok(())
    }

    // ===== Members and objects =====

    pub fn invoke_virtual(&mut self, method_ref: u16) {
        self.emit_u16_operand(Opcode::Invokevirtual, method_ref);
    }

    pub fn invoke_special(&mut self, method_ref: u16) {
        self.emit_u16_operand(Opcode::Invokespecial, method_ref);
    }

    pub fn invoke_static(&mut self, method_ref: u16) {
        self.emit_u16_operand(Opcode::Invokestatic, method_ref);
    }

    /// `arg_slots` counts the receiver plus two slots per long/double argument
    pub fn invoke_interface(&mut self, method_ref: u16, arg_slots: u8) {
        self.emit_u16_operand(Opcode::Invokeinterface, method_ref);
        self.code.emit_u8(arg_slots);
        self.code.emit_u8(0);
    }

    pub fn get_field(&mut self, field_ref: u16) {
        self.emit_u16_operand(Opcode::Getfield, field_ref);
    }

    pub fn put_field(&mut self, field_ref: u16) {
        self.emit_u16_operand(Opcode::Putfield, field_ref);
    }

    pub fn get_static(&mut self, field_ref: u16) {
        self.emit_u16_operand(Opcode::Getstatic, field_ref);
    }

    pub fn put_static(&mut self, field_ref: u16) {
        self.emit_u16_operand(Opcode::Putstatic, field_ref);
    }

    pub fn new_object(&mut self, class_ref: u16) {
        self.emit_u16_operand(Opcode::New, class_ref);
    }

    /// Primitive array (`atype` from [`array_type_code`])
    pub fn new_array(&mut self, atype: u8) {
        self.emit_u8_operand(Opcode::Newarray, atype);
    }

    /// Reference array with the given element class
    pub fn new_ref_array(&mut self, class_ref: u16) {
        self.emit_u16_operand(Opcode::Anewarray, class_ref);
    }

    pub fn checkcast(&mut self, class_ref: u16) {
        self.emit_u16_operand(Opcode::Checkcast, class_ref);
    }

    pub fn instance_of(&mut self, class_ref: u16) {
        self.emit_u16_operand(Opcode::Instanceof, class_ref);
    }

    // ===== Exceptions =====

    /// Protect `[start, end)` with a handler; empty ranges are dropped
    pub fn add_exception_handler(
        &mut self,
        start: usize,
        end: usize,
        handler: usize,
        catch_type: u16,
    ) {
        if start >= end {
            return;
        }
        self.exception_table.push(ExceptionEntry {
            start_pc: start as u16,
            end_pc: end as u16,
            handler_pc: handler as u16,
            catch_type,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_int_picks_compact_forms() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuilder::new();
        code.push_int(&mut pool, -1);
        code.push_int(&mut pool, 5);
        code.push_int(&mut pool, 100);
        code.push_int(&mut pool, 1000);
        code.push_int(&mut pool, 100_000);
        assert_eq!(
            code.bytes(),
            &[0x02, 0x08, 0x10, 100, 0x11, 0x03, 0xE8, 0x12, 0x01]
        );
    }

    #[test]
    fn test_local_forms() {
        let mut code = CodeBuilder::new();
        code.load(LocalKind::Int, 2);
        code.store(LocalKind::Double, 7);
        code.load(LocalKind::Reference, 300);
        assert_eq!(code.bytes(), &[0x1c, 0x39, 7, 0xc4, 0x19, 0x01, 0x2c]);
    }

    #[test]
    fn test_forward_jump_patch() {
        let mut code = CodeBuilder::new();
        let at = code.jump(Opcode::Goto);
        code.emit(Opcode::Nop);
        let target = code.offset();
        code.patch_jump(at, target).unwrap();
        assert_eq!(code.bytes(), &[0xa7, 0x00, 0x04, 0x00]);
    }

    #[test]
    fn test_backward_jump() {
        let mut code = CodeBuilder::new();
        code.emit(Opcode::Nop);
        code.jump_to(Opcode::Goto, 0).unwrap();
        assert_eq!(code.bytes(), &[0x00, 0xa7, 0xFF, 0xFF]);
    }

    #[test]
    fn test_empty_handler_range_is_dropped() {
        let mut code = CodeBuilder::new();
        code.add_exception_handler(4, 4, 8, 0);
        assert!(code.exception_table().is_empty());
    }

    #[test]
    fn test_kind_from_descriptor() {
        assert_eq!(LocalKind::from_descriptor("Z"), LocalKind::Int);
        assert_eq!(LocalKind::from_descriptor("J"), LocalKind::Long);
        assert_eq!(LocalKind::from_descriptor("[I"), LocalKind::Reference);
        assert!(LocalKind::Double.is_wide());
    }
}
