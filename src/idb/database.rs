//! IDA database container.
//!
//! [`IdaDb`] is the entry point: it reads a whole `.idb`/`.i64` file into
//! memory, parses the file header, walks the six-slot section directory
//! (`id0`, `id1`, `nam`, `seg`, `til`, `id2`), and parses each present
//! section eagerly. A slot whose header offset is 0 is absent, which is not
//! an error; a present section that fails to parse fails the open.
//!
//! The `seg` and `id2` slots have no decoded form and are retained as raw
//! payload bytes.

use std::fs;
use std::path::Path;

use log::debug;

use crate::idb::constants::*;
use crate::idb::header::{FileHeader, Section};
use crate::idb::id0::Id0;
use crate::idb::id1::Id1;
use crate::idb::nam::Nam;
use crate::idb::til::Til;
use crate::IdbError;

/// An opened IDA database.
#[derive(Debug)]
pub struct IdaDb {
    header: FileHeader,
    wordsize: usize,
    id0: Option<Id0>,
    id1: Option<Id1>,
    nam: Option<Nam>,
    til: Option<Til>,
    seg: Option<Vec<u8>>,
    id2: Option<Vec<u8>>,
}

impl IdaDb {
    /// Read and parse a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IdbError> {
        let path = path.as_ref();
        let buf = fs::read(path)
            .map_err(|e| IdbError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_bytes(&buf)
    }

    /// Parse a database from an in-memory byte range.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, IdbError> {
        let header = FileHeader::parse(buf)?;
        header.validate()?;
        let wordsize = header.wordsize();

        let mut sections: [Option<Section>; SECTION_SLOT_COUNT] =
            [None, None, None, None, None, None];
        for (slot, &offset) in header.offsets.iter().enumerate() {
            let name = SECTION_NAMES[slot];
            if offset == 0 {
                debug!("missing section: {}", name);
                continue;
            }
            let offset = usize::try_from(offset).map_err(|_| {
                IdbError::Format(format!("section {}: offset {:#x} too large", name, offset))
            })?;
            if offset >= buf.len() {
                return Err(IdbError::Format(format!(
                    "section {}: offset {:#x} beyond end of file ({} bytes)",
                    name,
                    offset,
                    buf.len()
                )));
            }
            sections[slot] = Some(Section::parse(&buf[offset..], name)?);
            debug!("parsed section: {}", name);
        }

        let [id0, id1, nam, seg, til, id2] = sections;
        Ok(IdaDb {
            header,
            wordsize,
            id0: id0.map(|s| Id0::parse(s.contents)).transpose()?,
            id1: id1.map(|s| Id1::parse(s.contents, wordsize)).transpose()?,
            nam: nam.map(|s| Nam::parse(s.contents, wordsize)).transpose()?,
            til: til.map(|s| Til::parse(s.contents)).transpose()?,
            seg: seg.map(|s| s.contents),
            id2: id2.map(|s| s.contents),
        })
    }

    /// The parsed file header.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Word size of the database: 4 for `IDA1` files, 8 for `IDA2`.
    pub fn wordsize(&self) -> usize {
        self.wordsize
    }

    /// The B-tree section, if present.
    pub fn id0(&self) -> Option<&Id0> {
        self.id0.as_ref()
    }

    /// The flags section, if present.
    pub fn id1(&self) -> Option<&Id1> {
        self.id1.as_ref()
    }

    /// The name section, if present.
    pub fn nam(&self) -> Option<&Nam> {
        self.nam.as_ref()
    }

    /// The type library section, if present.
    pub fn til(&self) -> Option<&Til> {
        self.til.as_ref()
    }

    /// Raw payload of the `seg` slot, if present. Not decoded.
    pub fn seg(&self) -> Option<&[u8]> {
        self.seg.as_deref()
    }

    /// Raw payload of the `id2` slot, if present. Not decoded.
    pub fn id2(&self) -> Option<&[u8]> {
        self.id2.as_deref()
    }

    /// Validate the header and every present section.
    pub fn validate(&self) -> Result<(), IdbError> {
        self.header.validate()?;
        if let Some(id0) = &self.id0 {
            id0.validate()?;
        }
        if let Some(id1) = &self.id1 {
            id1.validate()?;
        }
        if let Some(nam) = &self.nam {
            nam.validate()?;
        }
        if let Some(til) = &self.til {
            til.validate()?;
        }
        Ok(())
    }

    fn require_id1(&self) -> Result<&Id1, IdbError> {
        self.id1
            .as_ref()
            .ok_or_else(|| IdbError::Format("database has no ID1 section".to_string()))
    }

    /// Start address of the segment containing `ea`.
    pub fn seg_start(&self, ea: u64) -> Result<u64, IdbError> {
        Ok(self.require_id1()?.segment(ea)?.bounds.start)
    }

    /// End address of the segment containing `ea`.
    pub fn seg_end(&self, ea: u64) -> Result<u64, IdbError> {
        Ok(self.require_id1()?.segment(ea)?.bounds.end)
    }

    /// Start address of the first segment.
    pub fn first_seg(&self) -> Result<u64, IdbError> {
        let id1 = self.require_id1()?;
        id1.segments()
            .first()
            .map(|s| s.bounds.start)
            .ok_or_else(|| IdbError::NotPresent("database has no segments".to_string()))
    }

    /// Start address of the segment following the one containing `ea`.
    pub fn next_seg(&self, ea: u64) -> Result<u64, IdbError> {
        Ok(self.require_id1()?.next_segment(ea)?.bounds.start)
    }

    /// The 32-bit flags word for `ea`.
    pub fn flags_at(&self, ea: u64) -> Result<u32, IdbError> {
        self.require_id1()?.flags_at(ea)
    }

    /// The program byte at `ea`.
    pub fn byte_at(&self, ea: u64) -> Result<u8, IdbError> {
        self.require_id1()?.byte_at(ea)
    }
}
