//! StackMapTable frames
//!
//! Frames are held in the class-file's own layout: one entry per value, so
//! a `long` local is a single `Long` entry rather than two slots. The frame
//! analyzer works on slot vectors and converts with [`StackMapFrame::from_slots`].
//!
//! The writer only emits `full_frame` entries. The decoder accepts every
//! frame kind so class files from other compilers can be disassembled.

use crate::constants::ConstantPool;
use crate::encoder::{ByteReader, ByteWriter, DecodeError};

const FULL_FRAME: u8 = 255;

/// Verification type of a local or stack entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    UninitializedThis,
    /// Internal class name or array descriptor
    Object(String),
    /// Result of the `new` instruction at this offset
    Uninitialized(u16),
}

impl VerificationType {
    /// Type of a value with the given field descriptor
    pub fn from_descriptor(descriptor: &str) -> VerificationType {
        match descriptor.as_bytes().first() {
            Some(b'Z' | b'B' | b'C' | b'S' | b'I') => VerificationType::Integer,
            Some(b'F') => VerificationType::Float,
            Some(b'J') => VerificationType::Long,
            Some(b'D') => VerificationType::Double,
            Some(b'[') => VerificationType::Object(descriptor.to_string()),
            _ => VerificationType::Object(crate::descriptor::internal_name(descriptor).to_string()),
        }
    }

    pub fn object(name: &str) -> VerificationType {
        VerificationType::Object(name.to_string())
    }

    /// Long and double occupy two slots
    pub fn is_wide(&self) -> bool {
        matches!(self, VerificationType::Long | VerificationType::Double)
    }

    pub fn size(&self) -> usize {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// Reference-typed (including null and uninitialized objects)
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            VerificationType::Null
                | VerificationType::UninitializedThis
                | VerificationType::Object(_)
                | VerificationType::Uninitialized(_)
        )
    }

    fn write(&self, w: &mut ByteWriter, pool: &mut ConstantPool) {
        match self {
            VerificationType::Top => w.emit_u8(0),
            VerificationType::Integer => w.emit_u8(1),
            VerificationType::Float => w.emit_u8(2),
            VerificationType::Double => w.emit_u8(3),
            VerificationType::Long => w.emit_u8(4),
            VerificationType::Null => w.emit_u8(5),
            VerificationType::UninitializedThis => w.emit_u8(6),
            VerificationType::Object(name) => {
                w.emit_u8(7);
                w.emit_u16(pool.class(name));
            }
            VerificationType::Uninitialized(offset) => {
                w.emit_u8(8);
                w.emit_u16(*offset);
            }
        }
    }

    fn read(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<VerificationType, DecodeError> {
        Ok(match r.read_u8()? {
            0 => VerificationType::Top,
            1 => VerificationType::Integer,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            4 => VerificationType::Long,
            5 => VerificationType::Null,
            6 => VerificationType::UninitializedThis,
            7 => {
                let index = r.read_u16()?;
                let name = pool.class_name_at(index).ok_or(DecodeError::BadConstantRef {
                    index,
                    expected: "Class",
                })?;
                VerificationType::Object(name.to_string())
            }
            8 => VerificationType::Uninitialized(r.read_u16()?),
            _ => return Err(DecodeError::MalformedAttribute("StackMapTable")),
        })
    }
}

impl std::fmt::Display for VerificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationType::Top => f.write_str("top"),
            VerificationType::Integer => f.write_str("int"),
            VerificationType::Float => f.write_str("float"),
            VerificationType::Long => f.write_str("long"),
            VerificationType::Double => f.write_str("double"),
            VerificationType::Null => f.write_str("null"),
            VerificationType::UninitializedThis => f.write_str("uninitialized_this"),
            VerificationType::Object(name) => write!(f, "class {}", name),
            VerificationType::Uninitialized(offset) => write!(f, "uninitialized {}", offset),
        }
    }
}

/// Frame at a code offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMapFrame {
    pub offset: usize,
    pub locals: Vec<VerificationType>,
    pub stack: Vec<VerificationType>,
}

impl StackMapFrame {
    /// Build a frame from slot-indexed locals
    ///
    /// The `Top` following a long/double is implied by the wide entry and
    /// dropped, as are trailing `Top` slots.
    pub fn from_slots(
        offset: usize,
        slots: &[VerificationType],
        stack: &[VerificationType],
    ) -> StackMapFrame {
        let mut end = slots.len();
        while end > 0 && slots[end - 1] == VerificationType::Top {
            end -= 1;
        }
        let mut locals = Vec::with_capacity(end);
        let mut i = 0;
        while i < end {
            let ty = &slots[i];
            locals.push(ty.clone());
            i += ty.size();
        }
        StackMapFrame {
            offset,
            locals,
            stack: stack.to_vec(),
        }
    }
}

/// Encode frames as the body of a StackMapTable attribute
pub fn encode_table(frames: &[StackMapFrame], pool: &mut ConstantPool) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.emit_u16(frames.len() as u16);
    let mut previous: Option<usize> = None;
    for frame in frames {
        let delta = match previous {
            None => frame.offset,
            Some(prev) => frame.offset - prev - 1,
        };
        previous = Some(frame.offset);
        w.emit_u8(FULL_FRAME);
        w.emit_u16(delta as u16);
        w.emit_u16(frame.locals.len() as u16);
        for ty in &frame.locals {
            ty.write(&mut w, pool);
        }
        w.emit_u16(frame.stack.len() as u16);
        for ty in &frame.stack {
            ty.write(&mut w, pool);
        }
    }
    w.into_bytes()
}

/// Decode a StackMapTable attribute body
///
/// `initial_locals` is the implicit frame derived from the method descriptor,
/// needed to resolve the compressed frame kinds.
pub fn decode_table(
    data: &[u8],
    pool: &ConstantPool,
    initial_locals: &[VerificationType],
) -> Result<Vec<StackMapFrame>, DecodeError> {
    let mut r = ByteReader::new(data);
    let count = r.read_u16()?;
    let mut frames = Vec::with_capacity(count as usize);
    let mut locals = initial_locals.to_vec();
    let mut previous: Option<usize> = None;

    for _ in 0..count {
        let kind = r.read_u8()?;
        let (delta, stack) = match kind {
            0..=63 => (kind as usize, Vec::new()),
            64..=127 => {
                let ty = VerificationType::read(&mut r, pool)?;
                ((kind - 64) as usize, vec![ty])
            }
            247 => {
                let delta = r.read_u16()? as usize;
                (delta, vec![VerificationType::read(&mut r, pool)?])
            }
            248..=250 => {
                let delta = r.read_u16()? as usize;
                let chop = (251 - kind) as usize;
                if chop > locals.len() {
                    return Err(DecodeError::MalformedAttribute("StackMapTable"));
                }
                locals.truncate(locals.len() - chop);
                (delta, Vec::new())
            }
            251 => (r.read_u16()? as usize, Vec::new()),
            252..=254 => {
                let delta = r.read_u16()? as usize;
                for _ in 0..(kind - 251) {
                    locals.push(VerificationType::read(&mut r, pool)?);
                }
                (delta, Vec::new())
            }
            FULL_FRAME => {
                let delta = r.read_u16()? as usize;
                let nlocals = r.read_u16()?;
                locals.clear();
                for _ in 0..nlocals {
                    locals.push(VerificationType::read(&mut r, pool)?);
                }
                let nstack = r.read_u16()?;
                let mut stack = Vec::with_capacity(nstack as usize);
                for _ in 0..nstack {
                    stack.push(VerificationType::read(&mut r, pool)?);
                }
                (delta, stack)
            }
            _ => return Err(DecodeError::MalformedAttribute("StackMapTable")),
        };
        let offset = match previous {
            None => delta,
            Some(prev) => prev + delta + 1,
        };
        previous = Some(offset);
        frames.push(StackMapFrame {
            offset,
            locals: locals.clone(),
            stack,
        });
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slots_collapses_wide_and_trailing_top() {
        let slots = vec![
            VerificationType::object("Foo"),
            VerificationType::Long,
            VerificationType::Top,
            VerificationType::Integer,
            VerificationType::Top,
            VerificationType::Top,
        ];
        let frame = StackMapFrame::from_slots(10, &slots, &[]);
        assert_eq!(
            frame.locals,
            vec![
                VerificationType::object("Foo"),
                VerificationType::Long,
                VerificationType::Integer
            ]
        );
    }

    #[test]
    fn test_offset_deltas() {
        let mut pool = ConstantPool::new();
        let frames = vec![
            StackMapFrame {
                offset: 5,
                locals: vec![VerificationType::Integer],
                stack: vec![],
            },
            StackMapFrame {
                offset: 12,
                locals: vec![],
                stack: vec![VerificationType::object("java/lang/Throwable")],
            },
        ];
        let bytes = encode_table(&frames, &mut pool);
        // count, then full_frame with delta 5
        assert_eq!(&bytes[..5], &[0, 2, 255, 0, 5]);
        let decoded = decode_table(&bytes, &pool, &[]).unwrap();
        assert_eq!(decoded, frames);
    }

    #[test]
    fn test_decode_compressed_kinds() {
        let pool = ConstantPool::new();
        // same_frame at 3, append_frame(+1 int) at 3+7+1, chop_frame(1) at 11+2+1
        let data = [0, 3, 3, 252, 0, 7, 1, 250, 0, 2];
        let frames = decode_table(&data, &pool, &[VerificationType::Float]).unwrap();
        assert_eq!(frames[0].offset, 3);
        assert_eq!(frames[0].locals, vec![VerificationType::Float]);
        assert_eq!(frames[1].offset, 11);
        assert_eq!(
            frames[1].locals,
            vec![VerificationType::Float, VerificationType::Integer]
        );
        assert_eq!(frames[2].offset, 14);
        assert_eq!(frames[2].locals, vec![VerificationType::Float]);
    }
}
