//! File header and section frame parsing.
//!
//! Every database starts with an 88-byte file header ([`FileHeader`])
//! carrying the signature (`IDA1` for 32-bit files, `IDA2` for 64-bit), a
//! magic word, the format version, and six section offsets with matching
//! checksums. The offsets and checksums are interleaved with reserved
//! fields in a fixed but irregular order.
//!
//! Each section referenced by the header is framed ([`Section`]) by a
//! one-byte compression flag and a 64-bit payload length. Compressed
//! sections are rejected; the checksums are recorded but not verified.

use serde::Serialize;

use crate::idb::constants::*;
use crate::idb::decode::Reader;
use crate::IdbError;

/// Parsed file header (88 bytes, at offset 0).
#[derive(Debug, Clone, Serialize)]
pub struct FileHeader {
    /// File signature: `IDA1` (32-bit) or `IDA2` (64-bit).
    pub signature: [u8; 4],
    /// Reserved field at byte 4.
    pub reserved04: u16,
    /// Reserved field at byte 22.
    pub reserved22: u32,
    /// Magic word at byte 26; always `0xAABBCCDD`.
    pub magic: u32,
    /// Container format version at byte 30; only version 6 is supported.
    pub version: u16,
    /// Byte offsets of the six sections, in slot order. 0 means the slot is
    /// absent.
    pub offsets: [u64; 6],
    /// Checksums of the six sections, in slot order. Recorded as stored,
    /// never verified.
    pub checksums: [u32; 6],
}

impl FileHeader {
    /// Parse the file header from the start of `buf`.
    ///
    /// This only decodes the fields; call [`FileHeader::validate`] to check
    /// the signature, magic, and version.
    pub fn parse(buf: &[u8]) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf, "file header");

        let mut signature = [0u8; 4];
        signature.copy_from_slice(r.bytes(4)?);
        let reserved04 = r.u16()?;
        let offset1 = r.u64()?;
        let offset2 = r.u64()?;
        let reserved22 = r.u32()?;
        let magic = r.u32()?;
        let version = r.u16()?;
        let offset3 = r.u64()?;
        let offset4 = r.u64()?;
        let offset5 = r.u64()?;
        let checksum1 = r.u32()?;
        let checksum2 = r.u32()?;
        let checksum3 = r.u32()?;
        let checksum4 = r.u32()?;
        let checksum5 = r.u32()?;
        let offset6 = r.u64()?;
        let checksum6 = r.u32()?;

        Ok(FileHeader {
            signature,
            reserved04,
            reserved22,
            magic,
            version,
            offsets: [offset1, offset2, offset3, offset4, offset5, offset6],
            checksums: [
                checksum1, checksum2, checksum3, checksum4, checksum5, checksum6,
            ],
        })
    }

    /// Check the signature, magic word, and version.
    pub fn validate(&self) -> Result<(), IdbError> {
        if &self.signature != SIGNATURE_IDA1 && &self.signature != SIGNATURE_IDA2 {
            return Err(IdbError::Format(format!(
                "file header: bad signature {:02x?}",
                self.signature
            )));
        }
        if self.magic != HEADER_MAGIC {
            return Err(IdbError::Format(format!(
                "file header: bad magic {:#010x}",
                self.magic
            )));
        }
        if self.version != SUPPORTED_VERSION {
            return Err(IdbError::Unsupported(format!(
                "file header: version {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Word size implied by the signature: 4 for `IDA1`, 8 for `IDA2`.
    ///
    /// Only meaningful once [`FileHeader::validate`] has passed.
    pub fn wordsize(&self) -> usize {
        if &self.signature == SIGNATURE_IDA2 {
            WORDSIZE_64
        } else {
            WORDSIZE_32
        }
    }
}

/// One framed section: compression flag, payload length, payload bytes.
#[derive(Debug, Clone)]
pub struct Section {
    /// Compression flag from the frame. Always 0 here; a non-zero flag is
    /// rejected at parse time.
    pub is_compressed: u8,
    /// Payload length from the frame.
    pub length: u64,
    /// The section payload.
    pub contents: Vec<u8>,
}

impl Section {
    /// Parse a section frame starting at the beginning of `buf`.
    ///
    /// `name` is the directory name of the slot (`"id0"`, `"id1"`, ...) and
    /// is used in error messages.
    pub fn parse(buf: &[u8], name: &'static str) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf, "section frame");

        let is_compressed = r.u8()?;
        let length = r.u64()?;

        if is_compressed != 0 {
            return Err(IdbError::Unsupported(format!(
                "section {}: compressed sections are not supported",
                name
            )));
        }
        if length == 0 {
            return Err(IdbError::Format(format!(
                "section {}: zero-length section",
                name
            )));
        }
        let length_usize = usize::try_from(length).map_err(|_| {
            IdbError::Format(format!("section {}: length {:#x} too large", name, length))
        })?;
        let contents = r.bytes(length_usize).map_err(|_| {
            IdbError::Format(format!(
                "section {}: truncated payload: frame declares {} bytes, {} available",
                name,
                length,
                buf.len().saturating_sub(SECTION_FRAME_SIZE)
            ))
        })?;

        Ok(Section {
            is_compressed,
            length,
            contents: contents.to_vec(),
        })
    }
}
