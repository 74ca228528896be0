//! Constant pool
//!
//! Entries are deduplicated: asking for the same constant twice returns the
//! same index. `long` and `double` entries occupy two indices, the second of
//! which is unusable. Strings are stored in the JVM's modified UTF-8.

use crate::encoder::{ByteReader, ByteWriter, DecodeError};
use crate::error::ClassFileError;
use rustc_hash::FxHashMap;

mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
}

/// A constant-pool entry
///
/// Floating-point values are kept as raw bits so entries can be hashed and
/// `-0.0`/`NaN` stay distinct from `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    /// Index of the internal name (Utf8)
    Class(u16),
    /// Index of the value (Utf8)
    String(u16),
    Fieldref { class: u16, name_and_type: u16 },
    Methodref { class: u16, name_and_type: u16 },
    InterfaceMethodref { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
}

impl Constant {
    /// Long and double constants take two pool slots
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => tag::UTF8,
            Constant::Integer(_) => tag::INTEGER,
            Constant::Float(_) => tag::FLOAT,
            Constant::Long(_) => tag::LONG,
            Constant::Double(_) => tag::DOUBLE,
            Constant::Class(_) => tag::CLASS,
            Constant::String(_) => tag::STRING,
            Constant::Fieldref { .. } => tag::FIELDREF,
            Constant::Methodref { .. } => tag::METHODREF,
            Constant::InterfaceMethodref { .. } => tag::INTERFACE_METHODREF,
            Constant::NameAndType { .. } => tag::NAME_AND_TYPE,
        }
    }
}

/// Resolved field or method reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub is_interface: bool,
}

/// Constant pool under construction or decoded from a class file
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// Entry `i` lives at pool index `i + 1`; `None` fills the slot after a wide entry
    entries: Vec<Option<Constant>>,
    index: FxHashMap<Constant, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, returning the existing index if it is already present
    pub fn add(&mut self, constant: Constant) -> u16 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }
        let idx = (self.entries.len() + 1) as u16;
        let wide = constant.is_wide();
        self.entries.push(Some(constant.clone()));
        if wide {
            self.entries.push(None);
        }
        self.index.insert(constant, idx);
        idx
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        self.add(Constant::Utf8(value.to_string()))
    }

    /// Class constant for an internal name (`java/lang/String`) or array descriptor
    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.add(Constant::Class(name))
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.add(Constant::String(utf8))
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.add(Constant::Integer(value))
    }

    pub fn float(&mut self, value: f32) -> u16 {
        self.add(Constant::Float(value.to_bits()))
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.add(Constant::Long(value))
    }

    pub fn double(&mut self, value: f64) -> u16 {
        self.add(Constant::Double(value.to_bits()))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.add(Constant::NameAndType { name, descriptor })
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.add(Constant::Fieldref {
            class,
            name_and_type,
        })
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.add(Constant::Methodref {
            class,
            name_and_type,
        })
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.add(Constant::InterfaceMethodref {
            class,
            name_and_type,
        })
    }

    // ===== Lookup =====

    /// Entry at a pool index
    pub fn get(&self, index: u16) -> Option<&Constant> {
        if index == 0 {
            return None;
        }
        self.entries.get(index as usize - 1)?.as_ref()
    }

    /// `constant_pool_count` as written in the class file
    pub fn count(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn utf8_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Internal name behind a Class entry
    pub fn class_name_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8_at(*name),
            _ => None,
        }
    }

    pub fn string_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::String(utf8) => self.utf8_at(*utf8),
            _ => None,
        }
    }

    /// Field, method or interface-method reference behind an index
    pub fn member_ref_at(&self, index: u16) -> Option<MemberRef<'_>> {
        let (class, name_and_type, is_interface) = match self.get(index)? {
            Constant::Fieldref {
                class,
                name_and_type,
            }
            | Constant::Methodref {
                class,
                name_and_type,
            } => (*class, *name_and_type, false),
            Constant::InterfaceMethodref {
                class,
                name_and_type,
            } => (*class, *name_and_type, true),
            _ => return None,
        };
        let (name, descriptor) = match self.get(name_and_type)? {
            Constant::NameAndType { name, descriptor } => (*name, *descriptor),
            _ => return None,
        };
        Some(MemberRef {
            owner: self.class_name_at(class)?,
            name: self.utf8_at(name)?,
            descriptor: self.utf8_at(descriptor)?,
            is_interface,
        })
    }

    /// Iterate `(index, constant)` pairs, skipping the unusable slots
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| ((i + 1) as u16, c)))
    }

    // ===== Serialization =====

    pub fn write(&self, w: &mut ByteWriter) -> Result<(), ClassFileError> {
        let count = self.count();
        if count > u16::MAX as usize {
            return Err(ClassFileError::ConstantPoolOverflow(count));
        }
        w.emit_u16(count as u16);
        for constant in self.entries.iter().flatten() {
            w.emit_u8(constant.tag());
            match constant {
                Constant::Utf8(s) => {
                    let bytes = encode_modified_utf8(s);
                    if bytes.len() > u16::MAX as usize {
                        return Err(ClassFileError::TooMany {
                            what: "bytes in a string constant",
                            count: bytes.len(),
                        });
                    }
                    w.emit_u16(bytes.len() as u16);
                    w.emit_bytes(&bytes);
                }
                Constant::Integer(v) => w.emit_i32(*v),
                Constant::Float(bits) => w.emit_u32(*bits),
                Constant::Long(v) => {
                    w.emit_u32((*v as u64 >> 32) as u32);
                    w.emit_u32(*v as u64 as u32);
                }
                Constant::Double(bits) => {
                    w.emit_u32((bits >> 32) as u32);
                    w.emit_u32(*bits as u32);
                }
                Constant::Class(i) | Constant::String(i) => w.emit_u16(*i),
                Constant::Fieldref {
                    class,
                    name_and_type,
                }
                | Constant::Methodref {
                    class,
                    name_and_type,
                }
                | Constant::InterfaceMethodref {
                    class,
                    name_and_type,
                } => {
                    w.emit_u16(*class);
                    w.emit_u16(*name_and_type);
                }
                Constant::NameAndType { name, descriptor } => {
                    w.emit_u16(*name);
                    w.emit_u16(*descriptor);
                }
            }
        }
        Ok(())
    }

    pub fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let count = r.read_u16()?;
        let mut pool = ConstantPool::new();
        let mut index: u16 = 1;
        while index < count {
            let tag = r.read_u8()?;
            let constant = match tag {
                tag::UTF8 => {
                    let len = r.read_u16()? as usize;
                    let bytes = r.read_bytes(len)?;
                    Constant::Utf8(
                        decode_modified_utf8(bytes).ok_or(DecodeError::InvalidUtf8(index))?,
                    )
                }
                tag::INTEGER => Constant::Integer(r.read_i32()?),
                tag::FLOAT => Constant::Float(r.read_u32()?),
                tag::LONG => Constant::Long(r.read_u64()? as i64),
                tag::DOUBLE => Constant::Double(r.read_u64()?),
                tag::CLASS => Constant::Class(r.read_u16()?),
                tag::STRING => Constant::String(r.read_u16()?),
                tag::FIELDREF => Constant::Fieldref {
                    class: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                tag::METHODREF => Constant::Methodref {
                    class: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                tag::INTERFACE_METHODREF => Constant::InterfaceMethodref {
                    class: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                tag::NAME_AND_TYPE => Constant::NameAndType {
                    name: r.read_u16()?,
                    descriptor: r.read_u16()?,
                },
                other => return Err(DecodeError::UnknownConstantTag { tag: other, index }),
            };
            let wide = constant.is_wide();
            // Decoded pools keep file order; duplicates in foreign files map to the first index
            pool.index.entry(constant.clone()).or_insert(index);
            pool.entries.push(Some(constant));
            if wide {
                pool.entries.push(None);
                index += 1;
            }
            index += 1;
        }
        Ok(pool)
    }
}

/// Encode a string in the JVM's modified UTF-8
pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8; `None` on malformed input
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let a = bytes[i] as u16;
        if a & 0x80 == 0 {
            units.push(a);
            i += 1;
        } else if a & 0xE0 == 0xC0 {
            let b = *bytes.get(i + 1)? as u16;
            units.push(((a & 0x1F) << 6) | (b & 0x3F));
            i += 2;
        } else if a & 0xF0 == 0xE0 {
            let b = *bytes.get(i + 1)? as u16;
            let c = *bytes.get(i + 2)? as u16;
            units.push(((a & 0x0F) << 12) | ((b & 0x3F) << 6) | (c & 0x3F));
            i += 3;
        } else {
            return None;
        }
    }
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_returns_same_index() {
        let mut pool = ConstantPool::new();
        let a = pool.method_ref("java/lang/Object", "<init>", "()V");
        let b = pool.method_ref("java/lang/Object", "<init>", "()V");
        assert_eq!(a, b);
        let s1 = pool.string("hello");
        let s2 = pool.string("hello");
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        let l = pool.long(7);
        let next = pool.integer(1);
        assert_eq!(l, 1);
        assert_eq!(next, 3);
        assert_eq!(pool.get(2), None);
        assert_eq!(pool.count(), 4);
    }

    #[test]
    fn test_member_ref_resolution() {
        let mut pool = ConstantPool::new();
        let idx = pool.interface_method_ref("java/lang/Runnable", "run", "()V");
        let r = pool.member_ref_at(idx).unwrap();
        assert_eq!(r.owner, "java/lang/Runnable");
        assert_eq!(r.name, "run");
        assert_eq!(r.descriptor, "()V");
        assert!(r.is_interface);
    }

    #[test]
    fn test_modified_utf8_special_cases() {
        assert_eq!(encode_modified_utf8("\0"), vec![0xC0, 0x80]);
        let emoji = "a\u{1F600}";
        let encoded = encode_modified_utf8(emoji);
        // one ASCII byte plus a surrogate pair of three bytes each
        assert_eq!(encoded.len(), 7);
        assert_eq!(decode_modified_utf8(&encoded).as_deref(), Some(emoji));
    }

    #[test]
    fn test_pool_write_then_decode() {
        let mut pool = ConstantPool::new();
        pool.double(1.5);
        pool.class("Foo");
        pool.string("x\u{e9}");
        let mut w = ByteWriter::new();
        pool.write(&mut w).unwrap();
        let bytes = w.into_bytes();
        let decoded = ConstantPool::decode(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded.count(), pool.count());
        assert_eq!(decoded.get(1), Some(&Constant::Double(1.5f64.to_bits())));
        assert_eq!(decoded.class_name_at(4), Some("Foo"));
        assert_eq!(decoded.string_at(6), Some("x\u{e9}"));
    }
}
