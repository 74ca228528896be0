//! Big-endian byte encoding and decoding
//!
//! The class-file format is big-endian throughout. `ByteWriter` appends and
//! patches, `ByteReader` consumes with bounds checks.

use thiserror::Error;

/// Errors that can occur while decoding a class file
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// Unexpected end of input
    #[error("Unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),

    /// Wrong magic number
    #[error("Bad magic number 0x{0:08X}")]
    BadMagic(u32),

    /// Unknown constant-pool tag
    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    /// Constant-pool index out of range or of the wrong kind
    #[error("Bad constant pool reference {index}: expected {expected}")]
    BadConstantRef { index: u16, expected: &'static str },

    /// Malformed modified UTF-8
    #[error("Invalid modified UTF-8 in constant {0}")]
    InvalidUtf8(u16),

    /// Unknown or unsupported opcode
    #[error("Invalid opcode 0x{0:02X} at offset {1}")]
    InvalidOpcode(u8, usize),

    /// Malformed attribute
    #[error("Malformed {0} attribute")]
    MalformedAttribute(&'static str),
}

/// Big-endian byte buffer writer
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    pub(crate) buffer: Vec<u8>,
}

impl ByteWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Current offset (number of bytes written)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    // ===== Emission =====

    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn emit_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn emit_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn emit_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    // ===== Patching =====

    /// Overwrite one byte at `pos`
    pub fn patch_u8(&mut self, pos: usize, value: u8) {
        self.buffer[pos] = value;
    }

    /// Overwrite two bytes at `pos`
    pub fn patch_i16(&mut self, pos: usize, value: i16) {
        self.buffer[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Overwrite two bytes at `pos`
    pub fn patch_u16(&mut self, pos: usize, value: u16) {
        self.buffer[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Overwrite four bytes at `pos`
    pub fn patch_u32(&mut self, pos: usize, value: u32) {
        self.buffer[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
    }
}

/// Big-endian byte reader
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader starting at `pos`
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::UnexpectedEnd(self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_is_big_endian() {
        let mut w = ByteWriter::new();
        w.emit_u16(0x1234);
        w.emit_i32(-2);
        assert_eq!(w.buffer(), &[0x12, 0x34, 0xFF, 0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn test_patch_in_place() {
        let mut w = ByteWriter::new();
        w.emit_u8(0xA7);
        w.emit_i16(0);
        w.patch_i16(1, -3);
        assert_eq!(w.buffer(), &[0xA7, 0xFF, 0xFD]);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let data = [0x00, 0x01, 0x02];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u16(), Ok(1));
        assert_eq!(r.read_u16(), Err(DecodeError::UnexpectedEnd(2)));
        assert_eq!(r.read_u8(), Ok(2));
        assert!(r.is_at_end());
    }
}
