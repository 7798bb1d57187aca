//! ID0 section: the embedded B-tree.
//!
//! ID0 holds the key/value records describing the disassembled program in a
//! copy-on-write B-tree. The section starts with a fixed header
//! (page size, root page number, record and page counts, `B-tree v2`
//! signature); the rest of the section is an array of fixed-size pages
//! addressed by 1-based page number.
//!
//! Each page is either a leaf (`ppointer == 0`) or a branch. A page's entry
//! area begins with an index of 6-byte entry pointers followed by the entry
//! payloads. Leaf keys are front-compressed against the previous entry on
//! the same page, so entries must be decoded in order; branch entries store
//! full keys plus the page number of the child subtree on their right.
//!
//! Lookups ([`Id0::find`], [`Id0::find_prefix`], [`Id0::min`], [`Id0::max`])
//! return a [`Cursor`] that can then be stepped forward and backward in key
//! order.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use log::warn;

use crate::idb::constants::*;
use crate::idb::cursor::Cursor;
use crate::idb::decode::Reader;
use crate::util::hex::format_bytes;
use crate::IdbError;

/// Parsed ID0 section: the fixed header plus the raw page array.
#[derive(Debug)]
pub struct Id0 {
    buf: Vec<u8>,
    signature: [u8; 9],
    /// Offset of the next free page slot. Read and preserved, never
    /// consulted by queries.
    pub next_free_offset: u32,
    /// Size of every page in bytes (typically 0x2000).
    pub page_size: u16,
    /// Page number of the root page (typically 1).
    pub root_page: u32,
    /// Total number of key/value records in the tree.
    pub record_count: u32,
    /// Total number of pages in the section.
    pub page_count: u32,
    /// Reserved header byte.
    pub reserved: u8,
}

impl Id0 {
    /// Parse the ID0 section from its framed payload.
    pub fn parse(buf: Vec<u8>) -> Result<Self, IdbError> {
        if buf.len() < ID0_HEADER_SIZE {
            return Err(IdbError::Format(format!(
                "ID0: section too small for header: {} bytes, need {}",
                buf.len(),
                ID0_HEADER_SIZE
            )));
        }
        let mut r = Reader::new(&buf, "ID0");

        let next_free_offset = r.u32()?;
        let page_size = r.u16()?;
        let root_page = r.u32()?;
        let record_count = r.u32()?;
        let page_count = r.u32()?;
        let reserved = r.u8()?;
        let mut signature = [0u8; 9];
        signature.copy_from_slice(r.bytes(9)?);

        if &signature != ID0_SIGNATURE {
            return Err(IdbError::Format(format!(
                "ID0: bad b-tree signature {:02x?}",
                signature
            )));
        }
        if page_size == 0 {
            return Err(IdbError::Format("ID0: zero page size".to_string()));
        }

        Ok(Id0 {
            buf,
            signature,
            next_free_offset,
            page_size,
            root_page,
            record_count,
            page_count,
            reserved,
        })
    }

    /// Decode the page with the given 1-based page number.
    ///
    /// Page 0 is reserved for the section header. A request for it is
    /// logged and still attempted.
    pub fn page(&self, number: u32) -> Result<Page, IdbError> {
        if number < 1 {
            warn!("ID0: unexpected page number requested: {}", number);
        }
        let page_size = self.page_size as usize;
        let start = (number as usize).checked_mul(page_size).ok_or_else(|| {
            IdbError::Format(format!("ID0: page {} offset overflows", number))
        })?;
        let end = start.checked_add(page_size).ok_or_else(|| {
            IdbError::Format(format!("ID0: page {} offset overflows", number))
        })?;
        if end > self.buf.len() {
            return Err(IdbError::Format(format!(
                "ID0: page {} out of range: section holds {} bytes, page ends at {:#x}",
                number,
                self.buf.len(),
                end
            )));
        }
        Page::parse(&self.buf[start..end], number)
    }

    /// Find the entry with exactly the given key.
    ///
    /// Fails with [`IdbError::NotPresent`] when no record has the key.
    pub fn find(&self, key: &[u8]) -> Result<Cursor<'_>, IdbError> {
        Cursor::find(self, key)
    }

    /// Find the first entry whose key starts with `prefix`.
    ///
    /// Fails with [`IdbError::NotPresent`] when no key has the prefix.
    pub fn find_prefix(&self, prefix: &[u8]) -> Result<Cursor<'_>, IdbError> {
        Cursor::find_prefix(self, prefix)
    }

    /// Cursor positioned on the entry with the smallest key.
    pub fn min(&self) -> Result<Cursor<'_>, IdbError> {
        Cursor::min(self)
    }

    /// Cursor positioned on the entry with the largest key.
    pub fn max(&self) -> Result<Cursor<'_>, IdbError> {
        Cursor::max(self)
    }

    /// Check the section signature and the root page's ordering invariant.
    pub fn validate(&self) -> Result<(), IdbError> {
        if &self.signature != ID0_SIGNATURE {
            return Err(IdbError::Format(format!(
                "ID0: bad b-tree signature {:02x?}",
                self.signature
            )));
        }
        self.page(self.root_page)?.validate()
    }
}

/// One decoded B-tree page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page number this page was decoded from.
    pub number: u32,
    /// Page number of the leftmost child subtree; 0 on leaf pages.
    pub ppointer: u32,
    /// Number of entries on the page.
    pub entry_count: u16,
    entries: Vec<Entry>,
}

impl Page {
    pub(crate) fn parse(buf: &[u8], number: u32) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf, "ID0");
        let ppointer = r.u32()?;
        let entry_count = r.u16()?;
        let contents = r.bytes(r.remaining())?;

        let is_leaf = ppointer == 0;
        let index_size = entry_count as usize * SIZEOF_ENTRY_POINTER;
        if index_size > contents.len() {
            return Err(IdbError::Format(format!(
                "ID0: page {}: entry index ({} entries) overflows the page",
                number, entry_count
            )));
        }

        let mut entries: Vec<Entry> = Vec::with_capacity(entry_count as usize);
        for i in 0..entry_count as usize {
            let ptr = &contents[i * SIZEOF_ENTRY_POINTER..(i + 1) * SIZEOF_ENTRY_POINTER];
            let (child_page, common_prefix) = if is_leaf {
                // ptr[2..4] is a reserved field; treated as opaque
                (None, LittleEndian::read_u16(&ptr[0..2]) as usize)
            } else {
                (Some(LittleEndian::read_u32(&ptr[0..4])), 0)
            };
            let payload_offset = LittleEndian::read_u16(&ptr[4..6]) as usize;

            // stored offsets are page-relative; the entry area starts 6 bytes in
            let payload_start =
                payload_offset
                    .checked_sub(PAGE_PROLOGUE_SIZE)
                    .ok_or_else(|| {
                        IdbError::Format(format!(
                            "ID0: page {}: entry {}: payload offset {:#x} points into the page prologue",
                            number, i, payload_offset
                        ))
                    })?;
            if payload_start >= contents.len() {
                return Err(IdbError::Format(format!(
                    "ID0: page {}: entry {}: payload offset {:#x} out of range",
                    number, i, payload_offset
                )));
            }
            let (stored_key, value) = read_payload(&contents[payload_start..], number, i)?;

            let prev = entries.last().map(|e| e.key.as_slice()).unwrap_or(&[]);
            let shared = common_prefix.min(prev.len());
            let mut key = Vec::with_capacity(shared + stored_key.len());
            key.extend_from_slice(&prev[..shared]);
            key.extend_from_slice(stored_key);

            if let Some(last) = entries.last() {
                if last.key.as_slice() >= key.as_slice() {
                    return Err(IdbError::Format(format!(
                        "ID0: page {}: entries out of key order at index {}",
                        number, i
                    )));
                }
            }

            entries.push(Entry {
                key,
                value: value.to_vec(),
                child_page,
            });
        }

        Ok(Page {
            number,
            ppointer,
            entry_count,
            entries,
        })
    }

    /// Returns true if this page has no children.
    pub fn is_leaf(&self) -> bool {
        self.ppointer == 0
    }

    /// The decoded entries, in key order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The entry at the given index, if in range.
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Re-check the strict key ordering invariant.
    pub fn validate(&self) -> Result<(), IdbError> {
        for (i, pair) in self.entries.windows(2).enumerate() {
            if pair[0].key >= pair[1].key {
                return Err(IdbError::Format(format!(
                    "ID0: page {}: entries out of key order at index {}",
                    self.number,
                    i + 1
                )));
            }
        }
        Ok(())
    }

    /// In-page search.
    ///
    /// On a leaf: the index of the exact match, or `None`.
    /// On a branch: the index of the first entry whose key is greater than
    /// or equal to `key` (an exact hit or the least upper bound), or `None`
    /// when every entry is smaller.
    pub(crate) fn find_index(&self, key: &[u8]) -> Option<usize> {
        if self.is_leaf() {
            self.entries.iter().position(|e| e.key.as_slice() == key)
        } else {
            self.entries.iter().position(|e| key <= e.key.as_slice())
        }
    }

    /// Child page recorded on the entry at `index`.
    pub(crate) fn child(&self, index: usize) -> Result<u32, IdbError> {
        match self.entries.get(index).and_then(|e| e.child_page) {
            Some(page) => Ok(page),
            None => Err(IdbError::Format(format!(
                "ID0: page {}: entry {} has no child page",
                self.number, index
            ))),
        }
    }
}

fn read_payload<'a>(
    buf: &'a [u8],
    page_number: u32,
    index: usize,
) -> Result<(&'a [u8], &'a [u8]), IdbError> {
    let fail = |what: &str| {
        IdbError::Format(format!(
            "ID0: page {}: entry {}: truncated {}",
            page_number, index, what
        ))
    };
    if buf.len() < 2 {
        return Err(fail("key length"));
    }
    let key_len = LittleEndian::read_u16(&buf[0..2]) as usize;
    let key_end = 2 + key_len;
    if buf.len() < key_end {
        return Err(fail("key"));
    }
    if buf.len() < key_end + 2 {
        return Err(fail("value length"));
    }
    let value_len = LittleEndian::read_u16(&buf[key_end..key_end + 2]) as usize;
    let value_end = key_end + 2 + value_len;
    if buf.len() < value_end {
        return Err(fail("value"));
    }
    Ok((&buf[2..key_end], &buf[key_end + 2..value_end]))
}

/// One key/value record decoded from a page.
#[derive(Clone)]
pub struct Entry {
    key: Vec<u8>,
    value: Vec<u8>,
    child_page: Option<u32>,
}

impl Entry {
    /// The effective (decompressed) key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Page number of the child subtree to the right of this entry.
    /// `None` on leaf entries.
    pub fn child_page(&self) -> Option<u32> {
        self.child_page
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &format_bytes(&self.key))
            .field("value", &format_bytes(&self.value))
            .field("child_page", &self.child_page)
            .finish()
    }
}

pub(crate) fn not_present(key: &[u8]) -> IdbError {
    IdbError::NotPresent(format!("key {}", format_bytes(key)))
}
