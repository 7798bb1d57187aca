//! NAM section: addresses of named items.
//!
//! NAM is a flat list of word-sized effective addresses, one per named item
//! in the program, stored in address order. The header shares its `VA*\0`
//! signature and constants with ID1 and is likewise padded to one
//! 0x2000-byte page before the payload.

use byteorder::{ByteOrder, LittleEndian};

use crate::idb::constants::*;
use crate::idb::decode::Reader;
use crate::IdbError;

/// Parsed NAM section.
#[derive(Debug)]
pub struct Nam {
    wordsize: usize,
    /// 1 when the name list is non-empty, 0 otherwise.
    pub non_empty: u32,
    /// Number of 0x2000-byte pages in the payload.
    pub page_count: u32,
    /// Number of addresses stored in the payload.
    pub name_count: u32,
    buffer: Vec<u8>,
}

impl Nam {
    /// Parse the NAM section from its framed payload.
    ///
    /// `wordsize` comes from the file header signature and sizes the
    /// reserved word and the stored addresses.
    pub fn parse(buf: Vec<u8>, wordsize: usize) -> Result<Self, IdbError> {
        let mut r = Reader::new(&buf, "NAM");

        let signature = r.bytes(4)?;
        if signature != VA_SIGNATURE {
            return Err(IdbError::Format(format!(
                "NAM: bad signature {:02x?}",
                signature
            )));
        }
        let magic3 = r.u32()?;
        if magic3 != VA_MAGIC_3 {
            return Err(IdbError::Format(format!(
                "NAM: unexpected constant {:#x} at offset 4",
                magic3
            )));
        }
        let non_empty = r.u32()?;
        if non_empty > 1 {
            return Err(IdbError::Format(format!(
                "NAM: unexpected non-empty flag {:#x}",
                non_empty
            )));
        }
        let magic800 = r.u32()?;
        if magic800 != VA_MAGIC_800 {
            return Err(IdbError::Format(format!(
                "NAM: unexpected constant {:#x} at offset 12",
                magic800
            )));
        }
        let page_count = r.u32()?;
        let reserved = r.word(wordsize)?;
        if reserved != 0 {
            return Err(IdbError::Format(format!(
                "NAM: unexpected reserved word {:#x}",
                reserved
            )));
        }
        let name_count = r.u32()?;

        let header_size = 6 * 4 + wordsize;
        r.skip(VA_PAGE_SIZE - header_size)?;
        let buffer_len = (page_count as usize)
            .checked_mul(VA_PAGE_SIZE)
            .ok_or_else(|| {
                IdbError::Format(format!("NAM: page count {} overflows", page_count))
            })?;
        let buffer = r.bytes(buffer_len)?.to_vec();

        Ok(Nam {
            wordsize,
            non_empty,
            page_count,
            name_count,
            buffer,
        })
    }

    /// Read the addresses of all named items, in stored order.
    pub fn names(&self) -> Result<Vec<u64>, IdbError> {
        let count = self.name_count as usize;
        let size = count.checked_mul(self.wordsize).ok_or_else(|| {
            IdbError::Format(format!("NAM: name count {} overflows", self.name_count))
        })?;
        if size > self.buffer.len() {
            return Err(IdbError::Format(format!(
                "NAM: buffer too small for {} names: need {} bytes, have {}",
                self.name_count,
                size,
                self.buffer.len()
            )));
        }
        let mut names = Vec::with_capacity(count);
        for chunk in self.buffer[..size].chunks_exact(self.wordsize) {
            names.push(if self.wordsize == WORDSIZE_64 {
                LittleEndian::read_u64(chunk)
            } else {
                u64::from(LittleEndian::read_u32(chunk))
            });
        }
        Ok(names)
    }

    /// Re-check the header flags.
    pub fn validate(&self) -> Result<(), IdbError> {
        if self.non_empty > 1 {
            return Err(IdbError::Format(format!(
                "NAM: unexpected non-empty flag {:#x}",
                self.non_empty
            )));
        }
        Ok(())
    }
}
