//! ID1 section: per-address flags.
//!
//! ID1 maps every byte of the disassembled program to a 32-bit flags word
//! (the low 8 bits keep the byte value). The section header carries a
//! segment table of `{start, end}` address bounds; the flag words of
//! consecutive segments are packed back to back in the buffer that follows,
//! so each segment descriptor records the byte offset of its first word.
//!
//! Segment bounds use the file's word size (4 bytes for `.idb`, 8 for
//! `.i64`); the flag words themselves are always 32-bit.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::idb::constants::*;
use crate::idb::decode::Reader;
use crate::IdbError;

/// Address range of one segment, half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentBounds {
    /// First address of the segment.
    pub start: u64,
    /// One past the last address of the segment.
    pub end: u64,
}

impl SegmentBounds {
    /// Returns true if `ea` falls inside the segment.
    pub fn contains(&self, ea: u64) -> bool {
        self.start <= ea && ea < self.end
    }
}

/// One segment plus the location of its flags in the buffer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SegmentDescriptor {
    /// Address bounds of the segment.
    pub bounds: SegmentBounds,
    /// Byte offset into the flags buffer of the first flags word for
    /// `bounds.start`.
    pub offset: u64,
}

/// Parsed ID1 section.
#[derive(Debug)]
pub struct Id1 {
    segments: Vec<SegmentDescriptor>,
    /// Number of 0x2000-byte pages in the flags buffer.
    pub page_count: u32,
    buffer: Vec<u8>,
}

impl Id1 {
    /// Parse the ID1 section from its framed payload.
    ///
    /// `wordsize` comes from the file header signature and sizes the
    /// segment bounds fields.
    pub fn parse(buf: Vec<u8>, wordsize: usize) -> Result<Self, IdbError> {
        let mut r = Reader::new(&buf, "ID1");

        let signature = r.bytes(4)?;
        if signature != VA_SIGNATURE {
            return Err(IdbError::Format(format!(
                "ID1: bad signature {:02x?}",
                signature
            )));
        }
        let magic3 = r.u32()?;
        if magic3 != VA_MAGIC_3 {
            return Err(IdbError::Format(format!(
                "ID1: unexpected constant {:#x} at offset 4",
                magic3
            )));
        }
        let segment_count = r.u32()?;
        let magic800 = r.u32()?;
        if magic800 != VA_MAGIC_800 {
            return Err(IdbError::Format(format!(
                "ID1: unexpected constant {:#x} at offset 12",
                magic800
            )));
        }
        let page_count = r.u32()?;

        // segments are stored in producer order and packed contiguously in
        // the flags buffer, so a running offset locates each one
        let mut segments = Vec::with_capacity(segment_count as usize);
        let mut offset: u64 = 0;
        for i in 0..segment_count {
            let start = r.word(wordsize)?;
            let end = r.word(wordsize)?;
            if start > end {
                return Err(IdbError::Format(format!(
                    "ID1: segment {} ends before it starts ({:#x} > {:#x})",
                    i, start, end
                )));
            }
            segments.push(SegmentDescriptor {
                bounds: SegmentBounds { start, end },
                offset,
            });
            let size = (end - start).checked_mul(FLAGS_WORD_SIZE).ok_or_else(|| {
                IdbError::Format(format!("ID1: segment {} is too large", i))
            })?;
            offset = offset.checked_add(size).ok_or_else(|| {
                IdbError::Format(format!("ID1: segment table overflows at segment {}", i))
            })?;
        }

        let header_size = ID1_FIXED_HEADER_SIZE + segment_count as usize * 2 * wordsize;
        if header_size > VA_PAGE_SIZE {
            return Err(IdbError::Format(format!(
                "ID1: segment table ({} segments) overflows the header page",
                segment_count
            )));
        }
        r.skip(VA_PAGE_SIZE - header_size)?;
        let buffer_len = (page_count as usize)
            .checked_mul(VA_PAGE_SIZE)
            .ok_or_else(|| {
                IdbError::Format(format!("ID1: page count {} overflows", page_count))
            })?;
        let buffer = r.bytes(buffer_len)?.to_vec();

        Ok(Id1 {
            segments,
            page_count,
            buffer,
        })
    }

    /// The segment descriptors, in file order.
    pub fn segments(&self) -> &[SegmentDescriptor] {
        &self.segments
    }

    /// Find the segment containing the given effective address.
    pub fn segment(&self, ea: u64) -> Result<&SegmentDescriptor, IdbError> {
        self.segments
            .iter()
            .find(|s| s.bounds.contains(ea))
            .ok_or_else(|| {
                IdbError::NotPresent(format!("address {:#x} is not in any segment", ea))
            })
    }

    /// Find the segment following the one containing the given address.
    ///
    /// Fails with [`IdbError::OutOfBounds`] when the address falls in the
    /// last segment.
    pub fn next_segment(&self, ea: u64) -> Result<&SegmentDescriptor, IdbError> {
        let index = self
            .segments
            .iter()
            .position(|s| s.bounds.contains(ea))
            .ok_or_else(|| {
                IdbError::NotPresent(format!("address {:#x} is not in any segment", ea))
            })?;
        self.segments.get(index + 1).ok_or_else(|| {
            IdbError::OutOfBounds(format!("no segment after address {:#x}", ea))
        })
    }

    /// Fetch the 32-bit flags word for the given effective address.
    pub fn flags_at(&self, ea: u64) -> Result<u32, IdbError> {
        let segment = self.segment(ea)?;
        let offset = segment.offset + FLAGS_WORD_SIZE * (ea - segment.bounds.start);
        let offset = usize::try_from(offset).map_err(|_| {
            IdbError::Format(format!("ID1: flags offset for {:#x} overflows", ea))
        })?;
        if offset + FLAGS_WORD_SIZE as usize > self.buffer.len() {
            return Err(IdbError::Format(format!(
                "ID1: flags for {:#x} at offset {:#x} fall outside the buffer ({} bytes)",
                ea,
                offset,
                self.buffer.len()
            )));
        }
        Ok(LittleEndian::read_u32(&self.buffer[offset..]))
    }

    /// Fetch the program byte at the given effective address (the low 8
    /// bits of its flags word).
    pub fn byte_at(&self, ea: u64) -> Result<u8, IdbError> {
        Ok((self.flags_at(ea)? & 0xFF) as u8)
    }

    /// Re-check the segment bounds invariant.
    pub fn validate(&self) -> Result<(), IdbError> {
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.bounds.start > segment.bounds.end {
                return Err(IdbError::Format(format!(
                    "ID1: segment {} ends before it starts",
                    i
                )));
            }
        }
        Ok(())
    }
}
