//! Bounds-checked little-endian primitive decoding.
//!
//! All multi-byte integers in an IDA database are little-endian, and most
//! structures are length-prefixed rather than fixed-layout, so decoding is
//! expressed as a sequential [`Reader`] over a borrowed byte slice: read a
//! fixed-width prefix, compute the dependent length, read the variable-width
//! body. Every read is bounds-checked and failures name the section and the
//! offset at which the data ran out.

use byteorder::{ByteOrder, LittleEndian};

use crate::IdbError;

/// Sequential little-endian reader over a byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Section name used in error messages (e.g. `"ID0"`).
    section: &'static str,
}

impl<'a> Reader<'a> {
    /// Create a reader at offset 0 of `buf`. `section` names the enclosing
    /// structure in error messages.
    pub fn new(buf: &'a [u8], section: &'static str) -> Self {
        Reader {
            buf,
            pos: 0,
            section,
        }
    }

    /// Current byte offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], IdbError> {
        let end = self.pos.checked_add(n).ok_or_else(|| {
            IdbError::Format(format!(
                "{}: length overflow at offset {:#x}",
                self.section, self.pos
            ))
        })?;
        if end > self.buf.len() {
            return Err(IdbError::Format(format!(
                "{}: truncated at offset {:#x}: need {} bytes, {} available",
                self.section,
                self.pos,
                n,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a `u8`.
    pub fn u8(&mut self) -> Result<u8, IdbError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian `u16`.
    pub fn u16(&mut self) -> Result<u16, IdbError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Read a little-endian `u32`.
    pub fn u32(&mut self) -> Result<u32, IdbError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a little-endian `u64`.
    pub fn u64(&mut self) -> Result<u64, IdbError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read one file-word: a `u32` for 32-bit databases (`wordsize == 4`),
    /// a `u64` for 64-bit databases (`wordsize == 8`).
    pub fn word(&mut self, wordsize: usize) -> Result<u64, IdbError> {
        match wordsize {
            4 => Ok(u64::from(self.u32()?)),
            8 => self.u64(),
            other => Err(IdbError::Format(format!(
                "{}: unexpected word size {}",
                self.section, other
            ))),
        }
    }

    /// Read `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], IdbError> {
        self.take(n)
    }

    /// Skip over `n` bytes (padding).
    pub fn skip(&mut self, n: usize) -> Result<(), IdbError> {
        self.take(n).map(|_| ())
    }
}
