//! Instruction decoding
//!
//! Shared by the frame analyzer, the verifier, the disassembler and the
//! interpreter: every consumer of a code array walks it with
//! [`Instruction::decode`].

use crate::encoder::{ByteReader, DecodeError};
use crate::opcode::Opcode;

/// Decoded operand of a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    /// `bipush`
    Byte(i8),
    /// `sipush`
    Short(i16),
    /// Explicit local-variable index
    Local(u16),
    /// `iinc`
    Iinc { local: u16, delta: i16 },
    /// Constant-pool index (ldc, field/method refs, class refs)
    Constant(u16),
    /// `invokeinterface` pool index and argument slot count
    Interface { index: u16, count: u8 },
    /// `newarray` element type code
    ArrayType(u8),
    /// Relative branch offset
    Branch(i32),
}

/// One decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the first byte (the `wide` prefix when present)
    pub pc: usize,
    pub opcode: Opcode,
    pub operand: Operand,
    /// Total encoded length in bytes
    pub len: usize,
    /// Encoded with the `wide` prefix
    pub wide: bool,
}

impl Instruction {
    /// Decode the instruction starting at `pc`
    pub fn decode(code: &[u8], pc: usize) -> Result<Instruction, DecodeError> {
        let mut r = ByteReader::at(code, pc);
        let byte = r.read_u8()?;
        let opcode = Opcode::from_u8(byte).ok_or(DecodeError::InvalidOpcode(byte, pc))?;

        if opcode == Opcode::Wide {
            let inner_byte = r.read_u8()?;
            let inner =
                Opcode::from_u8(inner_byte).ok_or(DecodeError::InvalidOpcode(inner_byte, pc + 1))?;
            let local = r.read_u16()?;
            let operand = match inner {
                Opcode::Iinc => Operand::Iinc {
                    local,
                    delta: r.read_i16()?,
                },
                Opcode::Iload
                | Opcode::Lload
                | Opcode::Fload
                | Opcode::Dload
                | Opcode::Aload
                | Opcode::Istore
                | Opcode::Lstore
                | Opcode::Fstore
                | Opcode::Dstore
                | Opcode::Astore => Operand::Local(local),
                _ => return Err(DecodeError::InvalidOpcode(inner_byte, pc + 1)),
            };
            return Ok(Instruction {
                pc,
                opcode: inner,
                operand,
                len: r.position() - pc,
                wide: true,
            });
        }

        use Opcode::*;
        let operand = match opcode {
            Bipush => Operand::Byte(r.read_i8()?),
            Sipush => Operand::Short(r.read_i16()?),
            Ldc => Operand::Constant(r.read_u8()? as u16),
            LdcW | Ldc2W | Getstatic | Putstatic | Getfield | Putfield | Invokevirtual
            | Invokespecial | Invokestatic | New | Anewarray | Checkcast | Instanceof => {
                Operand::Constant(r.read_u16()?)
            }
            Invokeinterface => {
                let index = r.read_u16()?;
                let count = r.read_u8()?;
                let _zero = r.read_u8()?;
                Operand::Interface { index, count }
            }
            Iload | Lload | Fload | Dload | Aload | Istore | Lstore | Fstore | Dstore | Astore => {
                Operand::Local(r.read_u8()? as u16)
            }
            Iinc => Operand::Iinc {
                local: r.read_u8()? as u16,
                delta: r.read_i8()? as i16,
            },
            Newarray => Operand::ArrayType(r.read_u8()?),
            GotoW => Operand::Branch(r.read_i32()?),
            op if op.is_branch() => Operand::Branch(r.read_i16()? as i32),
            _ => Operand::None,
        };

        Ok(Instruction {
            pc,
            opcode,
            operand,
            len: r.position() - pc,
            wide: false,
        })
    }

    /// Absolute target of a branch instruction
    pub fn branch_target(&self) -> Option<usize> {
        match self.operand {
            Operand::Branch(offset) => {
                let target = self.pc as i64 + offset as i64;
                (target >= 0).then_some(target as usize)
            }
            _ => None,
        }
    }

    /// Local slot read or written, including the `_0`..`_3` short forms
    pub fn local_index(&self) -> Option<u16> {
        match self.operand {
            Operand::Local(idx) => Some(idx),
            Operand::Iinc { local, .. } => Some(local),
            _ => implicit_local(self.opcode),
        }
    }

    /// Offset of the instruction that follows
    pub fn next_pc(&self) -> usize {
        self.pc + self.len
    }
}

fn implicit_local(opcode: Opcode) -> Option<u16> {
    let byte = opcode.to_u8();
    match byte {
        0x1a..=0x2d => Some(((byte - 0x1a) % 4) as u16),
        0x3b..=0x4e => Some(((byte - 0x3b) % 4) as u16),
        _ => None,
    }
}

/// Decode a whole code array
pub fn decode_all(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut out = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let insn = Instruction::decode(code, pc)?;
        pc = insn.next_pc();
        out.push(insn);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_branch_and_locals() {
        // iload_2; ifeq +6; iinc 1 -1; goto -7
        let code = [0x1c, 0x99, 0x00, 0x06, 0x84, 0x01, 0xFF, 0xa7, 0xFF, 0xF9];
        let insns = decode_all(&code).unwrap();
        assert_eq!(insns.len(), 4);
        assert_eq!(insns[0].local_index(), Some(2));
        assert_eq!(insns[1].branch_target(), Some(7));
        assert_eq!(
            insns[2].operand,
            Operand::Iinc {
                local: 1,
                delta: -1
            }
        );
        assert_eq!(insns[3].branch_target(), Some(0));
    }

    #[test]
    fn test_decode_wide() {
        // wide iload 300; wide iinc 300 1000
        let code = [0xc4, 0x15, 0x01, 0x2c, 0xc4, 0x84, 0x01, 0x2c, 0x03, 0xE8];
        let insns = decode_all(&code).unwrap();
        assert_eq!(insns[0].opcode, Opcode::Iload);
        assert!(insns[0].wide);
        assert_eq!(insns[0].len, 4);
        assert_eq!(insns[1].len, 6);
        assert_eq!(
            insns[1].operand,
            Operand::Iinc {
                local: 300,
                delta: 1000
            }
        );
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            Instruction::decode(&[0xaa], 0),
            Err(DecodeError::InvalidOpcode(0xaa, 0))
        );
    }
}
